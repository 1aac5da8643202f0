//! Streaming protocols: encode the next buffered action as wire messages.
//!
//! Unlike compilers, streaming is destructive: each call releases and
//! applies one action on the cursor, so messages always reflect committed
//! state.

mod abb;
mod ur;

pub use abb::{AbbOpcode, AbbProtocol, AbbRequest};
pub use ur::{UrOpcode, UrProtocol};

use crate::action::{Action, ActionId, ActionKind};
use crate::buffers::SettingChange;
use crate::cursor::RobotCursor;

/// Scale factors for packing values into 32-bit integers.
pub mod factors {
    /// Metres.
    pub const DISTANCE: f64 = 10_000.0;
    /// Radians.
    pub const ANGLE: f64 = 10_000.0;
    /// Seconds.
    pub const TIME: f64 = 1_000.0;
    /// Kilograms.
    pub const MASS: f64 = 1_000.0;
    /// Volts.
    pub const VOLTAGE: f64 = 1_000_000.0;
}

/// One frame sent to a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireMessage {
    Text(String),
    Binary(Vec<i32>),
}

impl WireMessage {
    /// Bytes as written to the socket. Binary frames are big-endian.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            WireMessage::Text(text) => text.as_bytes().to_vec(),
            WireMessage::Binary(values) => {
                let mut bytes = Vec::with_capacity(values.len() * 4);
                for value in values {
                    bytes.extend_from_slice(&value.to_be_bytes());
                }
                bytes
            }
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            WireMessage::Text(text) => Some(text),
            WireMessage::Binary(_) => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[i32]> {
        match self {
            WireMessage::Binary(values) => Some(values),
            WireMessage::Text(_) => None,
        }
    }
}

/// A device protocol that streams actions one at a time.
pub trait StreamingProtocol {
    fn name(&self) -> &'static str;

    /// Messages for an action that has just been applied to `cursor`.
    /// An empty result means the protocol has nothing to send for it.
    fn encode(&self, action: &Action, cursor: &RobotCursor) -> Vec<WireMessage>;

    /// Message for a single restored settings field, acknowledged as `id`.
    fn encode_setting(
        &self,
        id: ActionId,
        change: &SettingChange,
        cursor: &RobotCursor,
    ) -> Option<WireMessage>;

    /// Release and apply the next action of `cursor` and encode it.
    ///
    /// Returns `None` once the buffer is empty. An action that failed to
    /// apply, or has no wire form, yields an empty list.
    fn next_messages(&self, cursor: &mut RobotCursor) -> Option<Vec<WireMessage>> {
        let outcome = cursor.apply_next_action()?;
        let action = outcome.action;
        if !outcome.success {
            tracing::warn!(
                protocol = self.name(),
                id = %action.id(),
                "not streaming an action that failed to apply"
            );
            return Some(Vec::new());
        }

        let messages = match action.kind() {
            ActionKind::PushSettings => Vec::new(),
            ActionKind::PopSettings => {
                let changes = cursor
                    .settings_buffer()
                    .settings_before_pop()
                    .map(|before| cursor.settings().changes_since(before))
                    .unwrap_or_default();
                let wired: Vec<&SettingChange> = changes
                    .iter()
                    .filter(|change| {
                        self.encode_setting(ActionId::NO_ACK, change, cursor)
                            .is_some()
                    })
                    .collect();
                // Only the last message carries the action's id.
                let last = wired.len().saturating_sub(1);
                wired
                    .into_iter()
                    .enumerate()
                    .filter_map(|(i, change)| {
                        let id = if i == last { action.id() } else { ActionId::NO_ACK };
                        self.encode_setting(id, change, cursor)
                    })
                    .collect()
            }
            _ => {
                let messages = self.encode(&action, cursor);
                if messages.is_empty() {
                    tracing::debug!(
                        protocol = self.name(),
                        id = %action.id(),
                        action = action.variant_name(),
                        "no wire message for action"
                    );
                }
                messages
            }
        };
        Some(messages)
    }
}

/// Pack `value * factor` into an i32, or `None` if it does not fit.
pub fn fixed_point(value: f64, factor: f64) -> Option<i32> {
    let scaled = (value * factor).round();
    if scaled.is_finite() && scaled >= i32::MIN as f64 && scaled <= i32::MAX as f64 {
        Some(scaled as i32)
    } else {
        tracing::warn!(value, factor, "value does not fit a 32-bit fixed-point field");
        None
    }
}

/// Raw id as a protocol integer.
pub(crate) fn wire_id(id: ActionId) -> Option<i32> {
    match i32::try_from(id.raw()) {
        Ok(raw) => Some(raw),
        Err(_) => {
            tracing::warn!(id = %id, "action id exceeds the 32-bit wire range");
            None
        }
    }
}
