use super::{StreamingProtocol, WireMessage};
use crate::action::{Action, ActionId, ActionKind};
use crate::buffers::SettingChange;
use crate::compiler::fixed;
use crate::cursor::RobotCursor;
use crate::geometry::{quaternion_wxyz, ExternalAxes};
use crate::types::{ExternalAxesTarget, MotionType, Tool};

const ID_CHAR: char = '@';
const ACK_CHAR: char = '>';
const END_CHAR: char = ';';
const MAX_STRING_LENGTH: usize = 80;
const UNSET_AXIS: &str = "9E9";

/// Instruction codes understood by the ABB streaming server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum AbbOpcode {
    MoveL = 1,
    MoveJ = 2,
    MoveAbsJ = 3,
    Speed = 4,
    Zone = 5,
    WaitTime = 6,
    TPWrite = 7,
    Tool = 8,
    NoTool = 9,
    SetDO = 10,
    SetAO = 11,
    ExtJoints = 12,
    Acceleration = 13,
}

/// Queries and commands addressed to the controller itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum AbbRequest {
    StopExecution = 100,
    GetInfo = 101,
    GetPosition = 103,
    GetJoints = 104,
    GetExternalAxes = 105,
}

/// Text protocol for ABB controllers: `@<id> <opcode> <params>;`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbbProtocol;

impl AbbProtocol {
    pub fn new() -> Self {
        Self
    }

    /// A controller request frame.
    pub fn request(&self, id: ActionId, request: AbbRequest) -> WireMessage {
        WireMessage::Text(format!("{ID_CHAR}{id} {}{END_CHAR}", request as i32))
    }

    /// Parse an acknowledgment frame `><id> ...;` into the acknowledged id.
    pub fn parse_ack(frame: &str) -> Option<ActionId> {
        let body = frame.trim().strip_prefix(ACK_CHAR)?.strip_suffix(END_CHAR)?;
        let id = body.split_whitespace().next()?.parse::<u64>().ok()?;
        Some(ActionId::from_raw(id))
    }

    fn frame(id: ActionId, opcode: AbbOpcode, params: &[String]) -> WireMessage {
        let mut text = format!("{ID_CHAR}{id} {}", opcode as i32);
        for param in params {
            text.push(' ');
            text.push_str(param);
        }
        text.push(END_CHAR);
        WireMessage::Text(text)
    }

    fn mm(value: f64) -> String {
        fixed(value, 3)
    }

    fn pose_params(cursor: &RobotCursor) -> Option<Vec<String>> {
        let state = cursor.state();
        let position = state.position?;
        let q = quaternion_wxyz(state.rotation?);
        let mut params = vec![Self::mm(position.x), Self::mm(position.y), Self::mm(position.z)];
        params.extend(q.iter().map(|v| fixed(*v, 6)));
        Some(params)
    }

    fn tool_params(tool: &Tool) -> Vec<String> {
        let q = quaternion_wxyz(tool.tcp_orientation);
        let mut params = vec![
            Self::mm(tool.tcp_position.x),
            Self::mm(tool.tcp_position.y),
            Self::mm(tool.tcp_position.z),
        ];
        params.extend(q.iter().map(|v| fixed(*v, 6)));
        params.push(fixed(tool.weight.max(0.001), 3));
        params.push(Self::mm(tool.center_of_gravity.x));
        params.push(Self::mm(tool.center_of_gravity.y));
        params.push(Self::mm(tool.center_of_gravity.z));
        params
    }

    fn external_axes_params(axes: Option<&ExternalAxes>) -> Vec<String> {
        (1..=ExternalAxes::COUNT)
            .map(|i| match axes.and_then(|a| a.get(i)) {
                Some(v) => Self::mm(v),
                None => UNSET_AXIS.to_string(),
            })
            .collect()
    }

    fn quoted(text: &str) -> String {
        let mut text = text.replace('"', "'");
        if text.chars().count() > MAX_STRING_LENGTH {
            text = text.chars().take(MAX_STRING_LENGTH).collect();
        }
        format!("\"{text}\"")
    }
}

impl StreamingProtocol for AbbProtocol {
    fn name(&self) -> &'static str {
        "ABB"
    }

    fn encode(&self, action: &Action, cursor: &RobotCursor) -> Vec<WireMessage> {
        let id = action.id();
        let state = cursor.state();
        let message = match action.kind() {
            ActionKind::Translation { .. }
            | ActionKind::Rotation { .. }
            | ActionKind::Transformation { .. } => {
                let opcode = match cursor.settings().motion_type {
                    MotionType::Linear => AbbOpcode::MoveL,
                    MotionType::Joint => AbbOpcode::MoveJ,
                };
                Self::pose_params(cursor).map(|params| Self::frame(id, opcode, &params))
            }
            ActionKind::Axes { .. } => state.axes.map(|axes| {
                let params: Vec<String> = axes.values().iter().map(|v| fixed(*v, 3)).collect();
                Self::frame(id, AbbOpcode::MoveAbsJ, &params)
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
            ActionKind::ExternalAxis { target, .. } => {
                let axes = match target {
                    ExternalAxesTarget::Joint => state.external_axes_joints.as_ref(),
                    ExternalAxesTarget::Cartesian | ExternalAxesTarget::All => {
                        state.external_axes_cartesian.as_ref()
                    }
                };
                Some(Self::frame(
                    id,
                    AbbOpcode::ExtJoints,
                    &Self::external_axes_params(axes),
                ))
            }
            ActionKind::Wait { millis } => Some(Self::frame(
                id,
                AbbOpcode::WaitTime,
                &[fixed(*millis as f64 / 1000.0, 3)],
            )),
            ActionKind::Message(text) => {
                Some(Self::frame(id, AbbOpcode::TPWrite, &[Self::quoted(text)]))
            }
            ActionKind::AttachTool { .. } => cursor
                .tool()
                .map(|tool| Self::frame(id, AbbOpcode::Tool, &Self::tool_params(tool))),
            ActionKind::DetachTool => Some(Self::frame(id, AbbOpcode::NoTool, &[])),
            ActionKind::WriteDigitalIO { pin, on, .. } => Some(Self::frame(
                id,
                AbbOpcode::SetDO,
                &[Self::quoted(pin), u8::from(*on).to_string()],
            )),
            ActionKind::WriteAnalogIO { pin, value, .. } => Some(Self::frame(
                id,
                AbbOpcode::SetAO,
                &[Self::quoted(pin), fixed(*value, 3)],
            )),
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
        match change {
            SettingChange::Speed(speed) => {
                Some(Self::frame(id, AbbOpcode::Speed, &[Self::mm(*speed)]))
            }
            SettingChange::Precision(precision) => {
                Some(Self::frame(id, AbbOpcode::Zone, &[Self::mm(*precision)]))
            }
            SettingChange::Acceleration(acceleration) => Some(Self::frame(
                id,
                AbbOpcode::Acceleration,
                &[Self::mm(*acceleration)],
            )),
            // Motion type picks the move opcode on this side of the wire.
            SettingChange::MotionType(_)
            | SettingChange::ReferenceCS(_)
            | SettingChange::ExtrusionRate(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ack() {
        assert_eq!(AbbProtocol::parse_ack(">12 done;"), Some(ActionId::from_raw(12)));
        assert_eq!(AbbProtocol::parse_ack("  >7;\r\n"), Some(ActionId::from_raw(7)));
        assert_eq!(AbbProtocol::parse_ack("@12 1;"), None);
        assert_eq!(AbbProtocol::parse_ack(">x;"), None);
        assert_eq!(AbbProtocol::parse_ack(">12"), None);
    }

    #[test]
    fn test_request_frames() {
        let abb = AbbProtocol::new();
        assert_eq!(
            abb.request(ActionId::NO_ACK, AbbRequest::GetPosition),
            WireMessage::Text("@0 103;".to_string())
        );
        assert_eq!(
            abb.request(ActionId::from_raw(5), AbbRequest::StopExecution),
            WireMessage::Text("@5 100;".to_string())
        );
    }

    #[test]
    fn test_quoted_strings_are_truncated() {
        let long = "x".repeat(200);
        let quoted = AbbProtocol::quoted(&long);
        assert_eq!(quoted.len(), MAX_STRING_LENGTH + 2);
        assert_eq!(AbbProtocol::quoted("say \"hi\""), "\"say 'hi'\"");
    }
}
