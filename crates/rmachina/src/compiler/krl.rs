use super::{
    disclaimer_header, fixed, numeric_pin, replay, sanitize_name, Compiler, CompilerOptions,
    Decimals, Emitter, Program,
};
use crate::action::ActionKind;
use crate::buffers::SettingChange;
use crate::cursor::RobotCursor;
use crate::geometry::{yaw_pitch_roll, ExternalAxes};
use crate::types::MotionType;

/// KUKA KRL compiler.
#[derive(Debug, Clone, Default)]
pub struct KrlCompiler {
    pub decimals: Decimals,
}

impl KrlCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    fn external_axes(&self, axes: Option<&ExternalAxes>) -> String {
        (1..=ExternalAxes::COUNT)
            .map(|i| {
                let value = axes.and_then(|a| a.get(i)).unwrap_or(0.0);
                format!(", E{i} {}", fixed(value, self.decimals.mm))
            })
            .collect()
    }

    /// System variable assignment for a settings field, if KRL has one.
    fn setting_line(&self, change: SettingChange) -> Option<String> {
        let d = &self.decimals;
        match change {
            SettingChange::Speed(speed) => {
                Some(format!("$VEL.CP = {}", fixed(speed / 1000.0, d.mm)))
            }
            SettingChange::Acceleration(acc) => {
                Some(format!("$ACC.CP = {}", fixed(acc / 1000.0, d.mm)))
            }
            SettingChange::Precision(p) => Some(format!("$APO.CDIS = {}", fixed(p, d.mm))),
            SettingChange::MotionType(_)
            | SettingChange::ReferenceCS(_)
            | SettingChange::ExtrusionRate(_) => None,
        }
    }

    /// Cartesian target as an E6POS aggregate.
    fn pos(&self, cursor: &RobotCursor) -> Option<String> {
        let state = cursor.state();
        let position = state.position?;
        let (a, b, c) = yaw_pitch_roll(state.rotation?);
        let d = &self.decimals;
        Some(format!(
            "{{X {}, Y {}, Z {}, A {}, B {}, C {}{}}}",
            fixed(position.x, d.mm),
            fixed(position.y, d.mm),
            fixed(position.z, d.mm),
            fixed(a, d.degrees),
            fixed(b, d.degrees),
            fixed(c, d.degrees),
            self.external_axes(state.external_axes_cartesian.as_ref())
        ))
    }

    /// Joint target as an E6AXIS aggregate.
    fn axis(&self, cursor: &RobotCursor) -> Option<String> {
        let state = cursor.state();
        let axes = state.axes?;
        let values: Vec<String> = axes
            .values()
            .iter()
            .enumerate()
            .map(|(i, v)| format!("A{} {}", i + 1, fixed(*v, self.decimals.degrees)))
            .collect();
        Some(format!(
            "{{{}{}}}",
            values.join(", "),
            self.external_axes(state.external_axes_joints.as_ref())
        ))
    }
}

impl Compiler for KrlCompiler {
    fn dialect(&self) -> &'static str {
        "KRL"
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
        let mut declarations = Emitter::new(";", self.dialect(), options.comments, 2);
        let mut body = Emitter::new(";", self.dialect(), options.comments, 2);
        let mut target_index = 0usize;

        // Bind the settings in force at the start of the program.
        let start = cursor.settings();
        let mut initial = vec![SettingChange::Speed(start.speed)];
        if start.acceleration > 0.0 {
            initial.push(SettingChange::Acceleration(start.acceleration));
        }
        initial.push(SettingChange::Precision(start.precision));
        for line in initial.into_iter().filter_map(|c| self.setting_line(c)) {
            body.line(line);
        }
        body.line("");

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
                    let (kind, literal, instruction) = match action.kind() {
                        ActionKind::Axes { .. } => ("E6AXIS", self.axis(state), "PTP"),
                        _ => match settings.motion_type {
                            MotionType::Linear => ("E6POS", self.pos(state), "LIN"),
                            MotionType::Joint => ("E6POS", self.pos(state), "PTP"),
                        },
                    };
                    let Some(literal) = literal else {
                        body.error(action, "no target available for motion");
                        return;
                    };
                    let target = if options.inline_targets {
                        literal
                    } else {
                        let target_name = format!("target{target_index}");
                        declarations
                            .action(action, vec![format!("DECL {kind} {target_name} = {literal}")]);
                        target_name
                    };
                    target_index += 1;
                    let approximation = match (settings.precision > 0.0, instruction) {
                        (false, _) => "",
                        (true, "LIN") => " C_DIS",
                        (true, _) => " C_PTP",
                    };
                    body.action(action, vec![format!("{instruction} {target}{approximation}")]);
                }
                ActionKind::Speed { .. } => {
                    let lines = self.setting_line(SettingChange::Speed(settings.speed));
                    body.action(action, lines.into_iter().collect());
                }
                ActionKind::Acceleration { .. } => {
                    let lines =
                        self.setting_line(SettingChange::Acceleration(settings.acceleration));
                    body.action(action, lines.into_iter().collect());
                }
                ActionKind::Precision { .. } => {
                    let lines = self.setting_line(SettingChange::Precision(settings.precision));
                    body.action(action, lines.into_iter().collect());
                }
                ActionKind::PopSettings => {
                    // Restored values must be re-bound in the controller.
                    if let Some(before) = state.settings_buffer().settings_before_pop() {
                        let lines = settings
                            .changes_since(before)
                            .into_iter()
                            .filter_map(|c| self.setting_line(c))
                            .collect();
                        body.action(action, lines);
                    }
                }
                ActionKind::AttachTool { .. } => {
                    let Some(tool) = state.tool() else {
                        body.error(action, "no tool attached after attach");
                        return;
                    };
                    let (a, b, c) = yaw_pitch_roll(tool.tcp_orientation);
                    body.action(
                        action,
                        vec![
                            format!(
                                "$TOOL = {{X {}, Y {}, Z {}, A {}, B {}, C {}}}",
                                fixed(tool.tcp_position.x, d.mm),
                                fixed(tool.tcp_position.y, d.mm),
                                fixed(tool.tcp_position.z, d.mm),
                                fixed(a, d.degrees),
                                fixed(b, d.degrees),
                                fixed(c, d.degrees)
                            ),
                            format!("$LOAD.M = {}", fixed(tool.weight, d.kg)),
                            format!(
                                "$LOAD.CM = {{X {}, Y {}, Z {}, A 0, B 0, C 0}}",
                                fixed(tool.center_of_gravity.x, d.mm),
                                fixed(tool.center_of_gravity.y, d.mm),
                                fixed(tool.center_of_gravity.z, d.mm)
                            ),
                        ],
                    );
                }
                ActionKind::DetachTool => body.action(
                    action,
                    vec!["$TOOL = $NULLFRAME".to_string(), "$LOAD.M = 0".to_string()],
                ),
                ActionKind::WriteDigitalIO { pin, on, .. } => match numeric_pin(pin, 1..=4096) {
                    Some(n) => body.action(
                        action,
                        vec![format!("$OUT[{n}] = {}", if *on { "TRUE" } else { "FALSE" })],
                    ),
                    None => {
                        body.error(action, &format!("digital output \"{pin}\" is not in 1..4096"))
                    }
                },
                ActionKind::WriteAnalogIO { pin, value, .. } => {
                    match numeric_pin(pin, 1..=32) {
                        None => {
                            body.error(action, &format!("analog output \"{pin}\" is not in 1..32"))
                        }
                        Some(_) if !(-1.0..=1.0).contains(value) => {
                            body.error(action, "analog value must be within -1..1")
                        }
                        Some(n) => body.action(
                            action,
                            vec![format!("$ANOUT[{n}] = {}", fixed(*value, d.volts))],
                        ),
                    }
                }
                ActionKind::Wait { millis } => body.action(
                    action,
                    vec![format!("WAIT SEC {}", fixed(*millis as f64 / 1000.0, 3))],
                ),
                ActionKind::Comment(text) => body.action(action, vec![format!("; {text}")]),
                ActionKind::CustomCode {
                    code,
                    is_declaration: true,
                } => declarations.action(action, vec![code.clone()]),
                ActionKind::CustomCode { code, .. } => body.action(action, vec![code.clone()]),
                ActionKind::Message(_)
                | ActionKind::Temperature { .. }
                | ActionKind::Extrusion(_)
                | ActionKind::ExtrusionRate { .. }
                | ActionKind::Initialization(_) => body.unsupported(action),
                ActionKind::MotionMode(_)
                | ActionKind::ReferenceFrame(_)
                | ActionKind::PushSettings
                | ActionKind::ExternalAxis { .. }
                | ActionKind::DefineTool(_) => {}
            }
        });

        // `&` directives must open the file.
        let mut lines = vec!["&ACCESS RVP".to_string(), "&REL 1".to_string()];
        lines.extend(disclaimer_header(self.comment_prefix(), &name, self.dialect()));
        lines.push(String::new());
        lines.push(format!("DEF {name}()"));
        if !declarations.lines.is_empty() {
            lines.extend(declarations.lines);
            lines.push(String::new());
        }
        lines.push("  BAS(#INITMOV, 0)".to_string());
        lines.extend(body.lines);
        lines.push("END".to_string());

        Program {
            name,
            dialect: self.dialect().to_string(),
            lines,
        }
    }
}
