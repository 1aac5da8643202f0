use super::{Action, ActionKind};
use crate::geometry::{axis_angle_degrees, format_vector};
use std::fmt;

/// Trim float noise so `0.1 + 0.2` prints as `0.3` in instructions.
fn num(value: f64) -> String {
    let rounded = (value * 1e6).round() / 1e6;
    if rounded == 0.0 {
        // Avoid "-0".
        return "0".to_string();
    }
    format!("{rounded}")
}

fn quoted(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

fn set_or_by(relative: bool, by: &str, to: &str) -> String {
    if relative {
        by.to_string()
    } else {
        to.to_string()
    }
}

impl Action {
    /// Canonical text of the call that produces this action.
    pub fn to_instruction(&self) -> String {
        match &self.kind {
            ActionKind::Speed { value, relative } => {
                format!("{}({});", set_or_by(*relative, "Speed", "SpeedTo"), num(*value))
            }
            ActionKind::Acceleration { value, relative } => format!(
                "{}({});",
                set_or_by(*relative, "Acceleration", "AccelerationTo"),
                num(*value)
            ),
            ActionKind::Precision { value, relative } => format!(
                "{}({});",
                set_or_by(*relative, "Precision", "PrecisionTo"),
                num(*value)
            ),
            ActionKind::MotionMode(mode) => format!("MotionMode(\"{mode}\");"),
            ActionKind::ReferenceFrame(frame) => format!("CoordinateSystem(\"{frame}\");"),
            ActionKind::PushSettings => "PushSettings();".to_string(),
            ActionKind::PopSettings => "PopSettings();".to_string(),
            ActionKind::Translation { delta, relative } => format!(
                "{}({}, {}, {});",
                set_or_by(*relative, "Move", "MoveTo"),
                num(delta.x),
                num(delta.y),
                num(delta.z)
            ),
            ActionKind::Rotation { rotation, relative } => {
                let (axis, angle) = axis_angle_degrees(*rotation);
                format!(
                    "{}({}, {}, {}, {});",
                    set_or_by(*relative, "Rotate", "RotateTo"),
                    num(axis.x),
                    num(axis.y),
                    num(axis.z),
                    num(angle)
                )
            }
            ActionKind::Transformation {
                translation,
                rotation,
                relative,
                translation_first,
            } => {
                let (axis, angle) = axis_angle_degrees(*rotation);
                let name = set_or_by(*relative, "Transform", "TransformTo");
                let order = if *relative && !*translation_first {
                    ", false"
                } else {
                    ""
                };
                format!(
                    "{name}({}, {}, {}, {}, {}, {}, {}{order});",
                    num(translation.x),
                    num(translation.y),
                    num(translation.z),
                    num(axis.x),
                    num(axis.y),
                    num(axis.z),
                    num(angle)
                )
            }
            ActionKind::Axes { joints, relative } => {
                let values: Vec<String> = joints.values().iter().map(|v| num(*v)).collect();
                format!(
                    "{}({});",
                    set_or_by(*relative, "Axes", "AxesTo"),
                    values.join(", ")
                )
            }
            ActionKind::ExternalAxis {
                index,
                value,
                target,
                relative,
            } => format!(
                "{}({}, {}, \"{target}\");",
                set_or_by(*relative, "ExternalAxis", "ExternalAxisTo"),
                index,
                num(*value)
            ),
            ActionKind::DefineTool(tool) => {
                let (axis, angle) = axis_angle_degrees(tool.tcp_orientation);
                format!(
                    "DefineTool({}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {});",
                    quoted(&tool.name),
                    num(tool.tcp_position.x),
                    num(tool.tcp_position.y),
                    num(tool.tcp_position.z),
                    num(axis.x),
                    num(axis.y),
                    num(axis.z),
                    num(angle),
                    num(tool.weight),
                    num(tool.center_of_gravity.x),
                    num(tool.center_of_gravity.y),
                    num(tool.center_of_gravity.z)
                )
            }
            ActionKind::AttachTool { name } => format!("AttachTool({});", quoted(name)),
            ActionKind::DetachTool => "DetachTool();".to_string(),
            ActionKind::WriteDigitalIO { pin, on, tool_pin } => {
                format!("WriteDigital({}, {on}, {tool_pin});", quoted(pin))
            }
            ActionKind::WriteAnalogIO {
                pin,
                value,
                tool_pin,
            } => format!(
                "WriteAnalog({}, {}, {tool_pin});",
                quoted(pin),
                num(*value)
            ),
            ActionKind::Wait { millis } => format!("Wait({millis});"),
            ActionKind::Message(text) => format!("Message({});", quoted(text)),
            ActionKind::Comment(text) => format!("Comment({});", quoted(text)),
            ActionKind::Temperature {
                part,
                value,
                wait,
                relative,
            } => format!(
                "{}({}, \"{part}\", {wait});",
                set_or_by(*relative, "Temperature", "TemperatureTo"),
                num(*value)
            ),
            ActionKind::Extrusion(on) => format!("Extrude({on});"),
            ActionKind::ExtrusionRate { value, relative } => format!(
                "{}({});",
                set_or_by(*relative, "ExtrusionRate", "ExtrusionRateTo"),
                num(*value)
            ),
            ActionKind::Initialization(on) => {
                if *on {
                    "Initialize();".to_string()
                } else {
                    "Terminate();".to_string()
                }
            }
            ActionKind::CustomCode {
                code,
                is_declaration,
            } => format!("CustomCode({}, {is_declaration});", quoted(code)),
        }
    }
}

impl fmt::Display for Action {
    /// Human-readable description.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ActionKind::Speed { value, relative: true } => {
                write!(f, "Increase speed by {} mm/s", num(*value))
            }
            ActionKind::Speed { value, .. } => write!(f, "Set speed to {} mm/s", num(*value)),
            ActionKind::Acceleration { value, relative: true } => {
                write!(f, "Increase acceleration by {} mm/s^2", num(*value))
            }
            ActionKind::Acceleration { value, .. } => {
                write!(f, "Set acceleration to {} mm/s^2", num(*value))
            }
            ActionKind::Precision { value, relative: true } => {
                write!(f, "Increase precision radius by {} mm", num(*value))
            }
            ActionKind::Precision { value, .. } => {
                write!(f, "Set precision radius to {} mm", num(*value))
            }
            ActionKind::MotionMode(mode) => write!(f, "Set motion type to {mode}"),
            ActionKind::ReferenceFrame(frame) => {
                write!(f, "Set reference coordinate system to {frame}")
            }
            ActionKind::PushSettings => write!(f, "Push settings to buffer"),
            ActionKind::PopSettings => write!(f, "Pop settings from buffer"),
            ActionKind::Translation { delta, relative: true } => {
                write!(f, "Move {} mm", format_vector(*delta))
            }
            ActionKind::Translation { delta, .. } => {
                write!(f, "Move to {} mm", format_vector(*delta))
            }
            ActionKind::Rotation { rotation, relative } => {
                let (axis, angle) = axis_angle_degrees(*rotation);
                let verb = if *relative { "Rotate" } else { "Rotate to" };
                write!(f, "{verb} {} deg around {}", num(angle), format_vector(axis))
            }
            ActionKind::Transformation {
                translation,
                rotation,
                relative,
                ..
            } => {
                let (axis, angle) = axis_angle_degrees(*rotation);
                let verb = if *relative { "Transform" } else { "Transform to" };
                write!(
                    f,
                    "{verb} {} mm and {} deg around {}",
                    format_vector(*translation),
                    num(angle),
                    format_vector(axis)
                )
            }
            ActionKind::Axes { joints, relative: true } => {
                write!(f, "Increase joint rotations by {joints} deg")
            }
            ActionKind::Axes { joints, .. } => write!(f, "Set joint rotations to {joints} deg"),
            ActionKind::ExternalAxis {
                index,
                value,
                relative,
                ..
            } => {
                if *relative {
                    write!(f, "Increase external axis {index} by {}", num(*value))
                } else {
                    write!(f, "Set external axis {index} to {}", num(*value))
                }
            }
            ActionKind::DefineTool(tool) => write!(f, "Define tool \"{}\"", tool.name),
            ActionKind::AttachTool { name } => write!(f, "Attach tool \"{name}\""),
            ActionKind::DetachTool => write!(f, "Detach all tools"),
            ActionKind::WriteDigitalIO { pin, on, tool_pin } => {
                let scope = if *tool_pin { "tool " } else { "" };
                let state = if *on { "ON" } else { "OFF" };
                write!(f, "Turn {scope}digital IO \"{pin}\" {state}")
            }
            ActionKind::WriteAnalogIO {
                pin,
                value,
                tool_pin,
            } => {
                let scope = if *tool_pin { "tool " } else { "" };
                write!(f, "Set {scope}analog IO \"{pin}\" to {}", num(*value))
            }
            ActionKind::Wait { millis } => write!(f, "Wait {millis} ms"),
            ActionKind::Message(text) => write!(f, "Send message \"{text}\""),
            ActionKind::Comment(text) => write!(f, "Comment: \"{text}\""),
            ActionKind::Temperature {
                part,
                value,
                wait,
                relative,
            } => {
                let verb = if *relative { "Increase" } else { "Set" };
                let prep = if *relative { "by" } else { "to" };
                let suffix = if *wait { " and wait" } else { "" };
                write!(f, "{verb} {part} temperature {prep} {} C{suffix}", num(*value))
            }
            ActionKind::Extrusion(on) => {
                let state = if *on { "on" } else { "off" };
                write!(f, "Turn extrusion {state}")
            }
            ActionKind::ExtrusionRate { value, relative: true } => {
                write!(f, "Increase extrusion rate by {} mm/mm", num(*value))
            }
            ActionKind::ExtrusionRate { value, .. } => {
                write!(f, "Set extrusion rate to {} mm/mm", num(*value))
            }
            ActionKind::Initialization(true) => write!(f, "Initialize robot"),
            ActionKind::Initialization(false) => write!(f, "Terminate robot"),
            ActionKind::CustomCode { code, .. } => write!(f, "Custom code: \"{code}\""),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::action::{Action, ActionIdGenerator, ActionKind};
    use crate::geometry::{rotation_from_axis_angle, Joints};
    use glam::DVec3;

    fn action(kind: ActionKind) -> Action {
        Action::new(&ActionIdGenerator::new(), kind)
    }

    #[test]
    fn test_relative_and_absolute_instructions() {
        let by = action(ActionKind::Translation {
            delta: DVec3::new(100.0, 0.0, 0.0),
            relative: true,
        });
        let to = action(ActionKind::Translation {
            delta: DVec3::new(300.0, 0.0, 500.0),
            relative: false,
        });
        assert_eq!(by.to_instruction(), "Move(100, 0, 0);");
        assert_eq!(to.to_instruction(), "MoveTo(300, 0, 500);");
    }

    #[test]
    fn test_rotation_instruction_uses_axis_angle() {
        let rotate = action(ActionKind::Rotation {
            rotation: rotation_from_axis_angle(DVec3::Z, 90.0),
            relative: true,
        });
        assert_eq!(rotate.to_instruction(), "Rotate(0, 0, 1, 90);");
    }

    #[test]
    fn test_axes_and_settings_instructions() {
        let axes = action(ActionKind::Axes {
            joints: Joints([0.0, 0.0, 0.0, 0.0, 90.0, 0.0]),
            relative: false,
        });
        assert_eq!(axes.to_instruction(), "AxesTo(0, 0, 0, 0, 90, 0);");

        let speed = action(ActionKind::Speed {
            value: 50.0,
            relative: false,
        });
        assert_eq!(speed.to_instruction(), "SpeedTo(50);");
        assert_eq!(speed.to_string(), "Set speed to 50 mm/s");
    }

    #[test]
    fn test_strings_are_escaped() {
        let message = action(ActionKind::Message("say \"hi\"".into()));
        assert_eq!(message.to_instruction(), "Message(\"say \\\"hi\\\"\");");
    }

    #[test]
    fn test_float_noise_is_trimmed() {
        let speed = action(ActionKind::Speed {
            value: 0.1 + 0.2,
            relative: true,
        });
        assert_eq!(speed.to_instruction(), "Speed(0.3);");
    }
}
