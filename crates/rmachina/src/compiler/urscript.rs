use super::{
    disclaimer_header, fixed, numeric_pin, replay, sanitize_name, Compiler, CompilerOptions,
    Decimals, Emitter, Program,
};
use crate::action::ActionKind;
use crate::cursor::RobotCursor;
use crate::geometry::rotation_vector;
use crate::types::MotionType;
use glam::{DQuat, DVec3};

const MAX_VOLTS: f64 = 10.0;

/// Universal Robots URScript compiler.
///
/// URScript works in metres and radians, so every millimetre value is
/// scaled on the way out and rotations are written as rotation vectors.
#[derive(Debug, Clone, Default)]
pub struct UrScriptCompiler {
    pub decimals: Decimals,
}

impl UrScriptCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    fn metres(&self, mm: f64) -> String {
        fixed(mm / 1000.0, self.decimals.mm + 3)
    }

    fn pose(&self, position: DVec3, rotation: DQuat) -> String {
        let r = rotation_vector(rotation);
        let rad = self.decimals.radians;
        format!(
            "p[{}, {}, {}, {}, {}, {}]",
            self.metres(position.x),
            self.metres(position.y),
            self.metres(position.z),
            fixed(r.x, rad),
            fixed(r.y, rad),
            fixed(r.z, rad)
        )
    }

    fn target(&self, cursor: &RobotCursor, joint_space: bool) -> Option<String> {
        let state = cursor.state();
        if joint_space {
            let values: Vec<String> = state
                .axes?
                .to_radians()
                .iter()
                .map(|v| fixed(*v, self.decimals.radians))
                .collect();
            return Some(format!("[{}]", values.join(", ")));
        }
        Some(self.pose(state.position?, state.rotation?))
    }
}

fn script_string(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

fn python_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

impl Compiler for UrScriptCompiler {
    fn dialect(&self) -> &'static str {
        "URScript"
    }

    fn comment_prefix(&self) -> &'static str {
        "#"
    }

    fn generate(
        &self,
        program_name: &str,
        cursor: &RobotCursor,
        options: &CompilerOptions,
    ) -> Program {
        let name = sanitize_name(program_name);
        let d = self.decimals;
        let mut declarations = Emitter::new("#", self.dialect(), options.comments, 2);
        let mut body = Emitter::new("#", self.dialect(), options.comments, 2);
        let mut target_index = 0usize;

        replay(cursor, options.block_only, |action, state, applied| {
            if !applied {
                body.failed(action);
                return;
            }
            let settings = state.settings();
            match action.kind() {
                ActionKind::Translation { .. }
                | ActionKind::Rotation { .. }
                | ActionKind::Transformation { .. }
                | ActionKind::Axes { .. } => {
                    let joint_space = matches!(action.kind(), ActionKind::Axes { .. });
                    let Some(literal) = self.target(state, joint_space) else {
                        body.error(action, "no target available for motion");
                        return;
                    };
                    let target = if options.inline_targets {
                        literal
                    } else {
                        let target_name = format!("target{target_index}");
                        declarations.action(action, vec![format!("{target_name} = {literal}")]);
                        target_name
                    };
                    target_index += 1;

                    let blend = format!("r={}", self.metres(settings.precision));
                    let line = if joint_space || settings.motion_type == MotionType::Joint {
                        format!("movej({target}, {blend})")
                    } else {
                        let mut args = vec![target];
                        if settings.acceleration > 0.0 {
                            args.push(format!("a={}", self.metres(settings.acceleration)));
                        }
                        args.push(format!("v={}", self.metres(settings.speed)));
                        args.push(blend);
                        format!("movel({})", args.join(", "))
                    };
                    body.action(action, vec![line]);
                }
                ActionKind::AttachTool { .. } => {
                    let Some(tool) = state.tool() else {
                        body.error(action, "no tool attached after attach");
                        return;
                    };
                    let cog = tool.center_of_gravity;
                    body.action(
                        action,
                        vec![
                            format!(
                                "set_tcp({})",
                                self.pose(tool.tcp_position, tool.tcp_orientation)
                            ),
                            format!(
                                "set_payload({}, [{}, {}, {}])",
                                fixed(tool.weight, d.kg),
                                self.metres(cog.x),
                                self.metres(cog.y),
                                self.metres(cog.z)
                            ),
                        ],
                    );
                }
                ActionKind::DetachTool => body.action(
                    action,
                    vec![
                        format!("set_tcp({})", self.pose(DVec3::ZERO, DQuat::IDENTITY)),
                        format!("set_payload({})", fixed(0.0, d.kg)),
                    ],
                ),
                ActionKind::WriteDigitalIO { pin, on, tool_pin } => {
                    let (function, range) = if *tool_pin {
                        ("set_tool_digital_out", 0..=1)
                    } else {
                        ("set_standard_digital_out", 0..=7)
                    };
                    match numeric_pin(pin, range.clone()) {
                        Some(n) => body.action(
                            action,
                            vec![format!("{function}({n}, {})", python_bool(*on))],
                        ),
                        None => body.error(
                            action,
                            &format!(
                                "digital output \"{pin}\" is not in {}..{}",
                                range.start(),
                                range.end()
                            ),
                        ),
                    }
                }
                ActionKind::WriteAnalogIO {
                    tool_pin: true, ..
                } => body.error(action, "the tool flange has no analog outputs"),
                ActionKind::WriteAnalogIO { pin, value, .. } => match numeric_pin(pin, 0..=1) {
                    None => body.error(action, &format!("analog output \"{pin}\" is not in 0..1")),
                    Some(_) if !(0.0..=MAX_VOLTS).contains(value) => {
                        body.error(action, "analog value must be within 0..10 V")
                    }
                    Some(n) => body.action(
                        action,
                        vec![format!(
                            "set_standard_analog_out({n}, {})",
                            fixed(*value / MAX_VOLTS, d.volts + 1)
                        )],
                    ),
                },
                ActionKind::Wait { millis } => body.action(
                    action,
                    vec![format!("sleep({})", fixed(*millis as f64 / 1000.0, 3))],
                ),
                ActionKind::Message(text) => {
                    body.action(action, vec![format!("textmsg({})", script_string(text))])
                }
                ActionKind::Comment(text) => body.action(action, vec![format!("# {text}")]),
                ActionKind::CustomCode {
                    code,
                    is_declaration: true,
                } => declarations.action(action, vec![code.clone()]),
                ActionKind::CustomCode { code, .. } => body.action(action, vec![code.clone()]),
                ActionKind::Temperature { .. }
                | ActionKind::Extrusion(_)
                | ActionKind::ExtrusionRate { .. }
                | ActionKind::Initialization(_) => body.unsupported(action),
                // Motion parameters are passed with every move.
                ActionKind::Speed { .. }
                | ActionKind::Acceleration { .. }
                | ActionKind::Precision { .. }
                | ActionKind::MotionMode(_)
                | ActionKind::ReferenceFrame(_)
                | ActionKind::PushSettings
                | ActionKind::PopSettings
                | ActionKind::ExternalAxis { .. }
                | ActionKind::DefineTool(_) => {}
            }
        });

        let mut lines = disclaimer_header(self.comment_prefix(), &name, self.dialect());
        lines.push(String::new());
        lines.push(format!("def {name}():"));
        if !declarations.lines.is_empty() {
            lines.extend(declarations.lines);
            lines.push(String::new());
        }
        lines.extend(body.lines);
        lines.push("end".to_string());

        Program {
            name,
            dialect: self.dialect().to_string(),
            lines,
        }
    }
}
