use super::{factors, fixed_point, wire_id, StreamingProtocol, WireMessage};
use crate::action::{Action, ActionId, ActionKind};
use crate::buffers::SettingChange;
use crate::cursor::RobotCursor;
use crate::geometry::rotation_vector;
use crate::types::MotionType;
use glam::{DQuat, DVec3};

const MAX_VOLTS: f64 = 10.0;

/// Instruction codes understood by the UR streaming driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum UrOpcode {
    MoveL = 1,
    MoveJPose = 2,
    MoveJ = 3,
    Speed = 4,
    Acceleration = 5,
    Blend = 6,
    Wait = 7,
    SetTool = 8,
    NoTool = 9,
    SetDO = 10,
    SetToolDO = 11,
    SetAO = 12,
}

/// Binary protocol for Universal Robots: flat `[id, opcode, params...]`
/// arrays of fixed-point integers.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrProtocol;

/// Values of one frame with their fixed-point factors, in order.
#[derive(Debug, Default)]
struct Params(Vec<(f64, f64)>);

impl Params {
    fn push(mut self, value: f64, factor: f64) -> Self {
        self.0.push((value, factor));
        self
    }

    fn mm(self, value: f64) -> Self {
        self.push(value / 1000.0, factors::DISTANCE)
    }

    fn vector_mm(self, v: DVec3) -> Self {
        self.mm(v.x).mm(v.y).mm(v.z)
    }

    fn rotation(self, rotation: DQuat) -> Self {
        let r = rotation_vector(rotation);
        self.push(r.x, factors::ANGLE)
            .push(r.y, factors::ANGLE)
            .push(r.z, factors::ANGLE)
    }

    fn raw(self, value: i32) -> Self {
        self.push(f64::from(value), 1.0)
    }
}

impl UrProtocol {
    pub fn new() -> Self {
        Self
    }

    /// Parse the big-endian id the driver echoes after executing an action.
    pub fn parse_ack(bytes: &[u8]) -> Option<ActionId> {
        let head: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
        let raw = i32::from_be_bytes(head);
        u64::try_from(raw).ok().map(ActionId::from_raw)
    }

    /// Build a frame, skipping it if any value overflows the wire format.
    fn frame(id: ActionId, opcode: UrOpcode, params: Params) -> Option<WireMessage> {
        let mut values = vec![wire_id(id)?, opcode as i32];
        for (value, factor) in params.0 {
            values.push(fixed_point(value, factor)?);
        }
        Some(WireMessage::Binary(values))
    }

    fn pin(pin: &str, max: i32) -> Option<i32> {
        match pin.trim().parse::<i32>() {
            Ok(n) if (0..=max).contains(&n) => Some(n),
            _ => {
                tracing::warn!(pin, "output pin is not in 0..{max}");
                None
            }
        }
    }
}

impl StreamingProtocol for UrProtocol {
    fn name(&self) -> &'static str {
        "UR"
    }

    fn encode(&self, action: &Action, cursor: &RobotCursor) -> Vec<WireMessage> {
        let id = action.id();
        let state = cursor.state();
        let message = match action.kind() {
            ActionKind::Translation { .. }
            | ActionKind::Rotation { .. }
            | ActionKind::Transformation { .. } => match (state.position, state.rotation) {
                (Some(position), Some(rotation)) => {
                    let opcode = match cursor.settings().motion_type {
                        MotionType::Linear => UrOpcode::MoveL,
                        MotionType::Joint => UrOpcode::MoveJPose,
                    };
                    let params = Params::default().vector_mm(position).rotation(rotation);
                    Self::frame(id, opcode, params)
                }
                _ => None,
            },
            ActionKind::Axes { .. } => state.axes.and_then(|axes| {
                let params = axes
                    .to_radians()
                    .iter()
                    .fold(Params::default(), |p, v| p.push(*v, factors::ANGLE));
                Self::frame(id, UrOpcode::MoveJ, params)
            }),
            ActionKind::Speed { .. } => {
                self.encode_setting(id, &SettingChange::Speed(cursor.speed()), cursor)
            }
            ActionKind::Acceleration { .. } => self.encode_setting(
                id,
                &SettingChange::Acceleration(cursor.acceleration()),
                cursor,
            ),
            ActionKind::Precision { .. } => {
                self.encode_setting(id, &SettingChange::Precision(cursor.precision()), cursor)
            }
            ActionKind::Wait { millis } => Self::frame(
                id,
                UrOpcode::Wait,
                Params::default().push(*millis as f64 / 1000.0, factors::TIME),
            ),
            ActionKind::AttachTool { .. } => cursor.tool().and_then(|tool| {
                let params = Params::default()
                    .vector_mm(tool.tcp_position)
                    .rotation(tool.tcp_orientation)
                    .push(tool.weight, factors::MASS)
                    .vector_mm(tool.center_of_gravity);
                Self::frame(id, UrOpcode::SetTool, params)
            }),
            ActionKind::DetachTool => Self::frame(id, UrOpcode::NoTool, Params::default()),
            ActionKind::WriteDigitalIO { pin, on, tool_pin } => {
                let (opcode, max) = if *tool_pin {
                    (UrOpcode::SetToolDO, 1)
                } else {
                    (UrOpcode::SetDO, 7)
                };
                Self::pin(pin, max).and_then(|n| {
                    Self::frame(id, opcode, Params::default().raw(n).raw(i32::from(*on)))
                })
            }
            ActionKind::WriteAnalogIO { pin, value, tool_pin } => {
                if *tool_pin {
                    tracing::warn!(pin = %pin, "the tool flange has no analog outputs");
                    None
                } else if !(0.0..=MAX_VOLTS).contains(value) {
                    tracing::warn!(value = *value, "analog value must be within 0..10 V");
                    None
                } else {
                    Self::pin(pin, 1).and_then(|n| {
                        let params = Params::default().raw(n).push(*value, factors::VOLTAGE);
                        Self::frame(id, UrOpcode::SetAO, params)
                    })
                }
            }
            _ => None,
        };
        message.into_iter().collect()
    }

    fn encode_setting(
        &self,
        id: ActionId,
        change: &SettingChange,
        _cursor: &RobotCursor,
    ) -> Option<WireMessage> {
        let (opcode, mm) = match change {
            SettingChange::Speed(speed) => (UrOpcode::Speed, *speed),
            SettingChange::Acceleration(acceleration) => (UrOpcode::Acceleration, *acceleration),
            SettingChange::Precision(precision) => (UrOpcode::Blend, *precision),
            SettingChange::MotionType(_)
            | SettingChange::ReferenceCS(_)
            | SettingChange::ExtrusionRate(_) => return None,
        };
        Self::frame(id, opcode, Params::default().mm(mm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ack() {
        assert_eq!(
            UrProtocol::parse_ack(&[0, 0, 1, 0]),
            Some(ActionId::from_raw(256))
        );
        assert_eq!(
            UrProtocol::parse_ack(&[0, 0, 0, 9, 0xAA]),
            Some(ActionId::from_raw(9)),
            "trailing bytes are ignored"
        );
        assert_eq!(UrProtocol::parse_ack(&[0, 0, 1]), None);
        assert_eq!(UrProtocol::parse_ack(&[0xFF, 0xFF, 0xFF, 0xFF]), None);
    }

    #[test]
    fn test_setting_frames_use_distance_factor() {
        let cursor = RobotCursor::builder("ur").build();
        let ur = UrProtocol::new();
        assert_eq!(
            ur.encode_setting(ActionId::from_raw(3), &SettingChange::Speed(50.0), &cursor),
            Some(WireMessage::Binary(vec![3, UrOpcode::Speed as i32, 500]))
        );
        assert_eq!(
            ur.encode_setting(
                ActionId::from_raw(3),
                &SettingChange::MotionType(MotionType::Joint),
                &cursor
            ),
            None
        );
    }

    #[test]
    fn test_frame_skips_overflowing_values() {
        let params = Params::default().mm(1.0e12);
        assert!(UrProtocol::frame(ActionId::from_raw(1), UrOpcode::Blend, params).is_none());
    }
}
