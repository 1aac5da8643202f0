use super::{
    disclaimer_header, fixed, numeric_pin, replay, sanitize_name, Compiler, CompilerOptions,
    Decimals, Emitter, Program,
};
use crate::action::ActionKind;
use crate::cursor::RobotCursor;
use crate::types::{MotionType, RobotPart};

/// Marlin-flavoured G-code compiler for additive manufacturing.
///
/// G-code has no variables, so targets are always written inline. Extrusion
/// is absolute (`M82`) and its origin is re-homed with `G92 E0` every time
/// extrusion is toggled. `G0` travel moves never extrude.
#[derive(Debug, Clone)]
pub struct GCodeCompiler {
    pub decimals: Decimals,
}

impl Default for GCodeCompiler {
    fn default() -> Self {
        Self {
            decimals: Decimals {
                unitless: 5,
                ..Decimals::default()
            },
        }
    }
}

impl GCodeCompiler {
    pub fn new() -> Self {
        Self::default()
    }
}

fn temperature_code(part: RobotPart, wait: bool) -> &'static str {
    match (part, wait) {
        (RobotPart::Extruder, false) => "M104",
        (RobotPart::Extruder, true) => "M109",
        (RobotPart::Bed, false) => "M140",
        (RobotPart::Bed, true) => "M190",
        (RobotPart::Chamber, false) => "M141",
        (RobotPart::Chamber, true) => "M191",
    }
}

impl Compiler for GCodeCompiler {
    fn dialect(&self) -> &'static str {
        "G-code"
    }

    fn comment_prefix(&self) -> &'static str {
        ";"
    }

    fn generate(
        &self,
        program_name: &str,
        cursor: &RobotCursor,
        options: &CompilerOptions,
    ) -> Program {
        let name = sanitize_name(program_name);
        let d = self.decimals;
        let mut preamble = Emitter::new(";", self.dialect(), options.comments, 0);
        let mut body = Emitter::new(";", self.dialect(), options.comments, 0);
        // Extruded length at the last `G92 E0`.
        let mut e_origin = cursor.state().extruded_length;

        replay(cursor, options.block_only, |action, state, applied| {
            if !applied {
                body.failed(action);
                return;
            }
            let current = state.state();
            let settings = state.settings();
            match action.kind() {
                ActionKind::Translation { .. } | ActionKind::Transformation { .. } => {
                    let Some(position) = current.position else {
                        body.error(action, "no position available for motion");
                        return;
                    };
                    let command = match settings.motion_type {
                        MotionType::Linear => "G1",
                        MotionType::Joint => "G0",
                    };
                    let mut line = format!(
                        "{command} X{} Y{} Z{}",
                        fixed(position.x, d.mm),
                        fixed(position.y, d.mm),
                        fixed(position.z, d.mm)
                    );
                    if current.is_extruding {
                        if command == "G1" {
                            let e = current.extruded_length - e_origin;
                            line.push_str(&format!(" E{}", fixed(e, d.unitless)));
                        } else {
                            // Travel moves feed nothing.
                            e_origin += current.extruded_delta();
                        }
                    }
                    line.push_str(&format!(" F{}", fixed(settings.speed * 60.0, 0)));
                    body.action(action, vec![line]);
                }
                ActionKind::Extrusion(_) => {
                    e_origin = current.extruded_length;
                    body.action(action, vec!["G92 E0".to_string()]);
                }
                ActionKind::Temperature { part, wait, .. } => {
                    let value = current.temperatures.get(part).copied().unwrap_or(0.0);
                    body.action(
                        action,
                        vec![format!(
                            "{} S{}",
                            temperature_code(*part, *wait),
                            fixed(value, d.celsius)
                        )],
                    );
                }
                ActionKind::Acceleration { .. } => body.action(
                    action,
                    vec![format!("M204 S{}", fixed(settings.acceleration, d.mm))],
                ),
                ActionKind::PopSettings => {
                    let restored_acceleration = state
                        .settings_buffer()
                        .settings_before_pop()
                        .is_some_and(|before| before.acceleration != settings.acceleration);
                    if restored_acceleration {
                        body.action(
                            action,
                            vec![format!("M204 S{}", fixed(settings.acceleration, d.mm))],
                        );
                    }
                }
                ActionKind::WriteDigitalIO { pin, on, .. } => match numeric_pin(pin, 0..=255) {
                    Some(n) => body.action(
                        action,
                        vec![format!("M42 P{n} S{}", if *on { 255 } else { 0 })],
                    ),
                    None => body.error(action, &format!("pin \"{pin}\" is not in 0..255")),
                },
                ActionKind::WriteAnalogIO { pin, value, .. } => match numeric_pin(pin, 0..=255) {
                    None => body.error(action, &format!("pin \"{pin}\" is not in 0..255")),
                    Some(_) if !(0.0..=1.0).contains(value) => {
                        body.error(action, "analog value must be within 0..1")
                    }
                    Some(n) => body.action(
                        action,
                        vec![format!("M42 P{n} S{}", fixed(*value * 255.0, 0))],
                    ),
                },
                ActionKind::Wait { millis } => {
                    body.action(action, vec![format!("G4 P{millis}")])
                }
                ActionKind::Message(text) => body.action(action, vec![format!("M117 {text}")]),
                ActionKind::Comment(text) => body.action(action, vec![format!("; {text}")]),
                ActionKind::Initialization(true) => {
                    body.action(action, vec!["G28".to_string()])
                }
                ActionKind::Initialization(false) => {
                    body.action(action, vec!["M84".to_string()])
                }
                ActionKind::CustomCode {
                    code,
                    is_declaration: true,
                } => preamble.action(action, vec![code.clone()]),
                ActionKind::CustomCode { code, .. } => body.action(action, vec![code.clone()]),
                ActionKind::Rotation { .. }
                | ActionKind::Axes { .. }
                | ActionKind::ExternalAxis { .. }
                | ActionKind::DefineTool(_)
                | ActionKind::AttachTool { .. }
                | ActionKind::DetachTool => body.unsupported(action),
                // Feed rate is written on every move.
                ActionKind::Speed { .. }
                | ActionKind::Precision { .. }
                | ActionKind::ExtrusionRate { .. }
                | ActionKind::MotionMode(_)
                | ActionKind::ReferenceFrame(_)
                | ActionKind::PushSettings => {}
            }
        });

        let mut lines = disclaimer_header(self.comment_prefix(), &name, self.dialect());
        lines.push(String::new());
        lines.push("G21 ; millimetres".to_string());
        lines.push("G90 ; absolute positioning".to_string());
        lines.push("M82 ; absolute extrusion".to_string());
        lines.extend(preamble.lines);
        lines.push(String::new());
        lines.extend(body.lines);

        Program {
            name,
            dialect: self.dialect().to_string(),
            lines,
        }
    }
}
