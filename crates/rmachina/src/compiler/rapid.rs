use super::{
    disclaimer_header, fixed, replay, sanitize_name, Compiler, CompilerOptions, Decimals, Emitter,
    Program,
};
use crate::action::{Action, ActionKind};
use crate::cursor::RobotCursor;
use crate::geometry::{quaternion_wxyz, ExternalAxes};
use crate::types::{MotionType, Tool};

/// RAPID string literals are limited to 80 characters.
const MAX_STRING_LENGTH: usize = 80;
const UNSET_AXIS: &str = "9E9";

/// ABB RAPID module compiler.
#[derive(Debug, Clone, Default)]
pub struct RapidCompiler {
    pub decimals: Decimals,
}

impl RapidCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    fn external_axes(&self, axes: Option<&ExternalAxes>) -> String {
        let values: Vec<String> = (1..=ExternalAxes::COUNT)
            .map(|i| match axes.and_then(|a| a.get(i)) {
                Some(v) => fixed(v, self.decimals.mm),
                None => UNSET_AXIS.to_string(),
            })
            .collect();
        format!("[{}]", values.join(","))
    }

    fn robtarget(&self, cursor: &RobotCursor) -> Option<String> {
        let state = cursor.state();
        let position = state.position?;
        let q = quaternion_wxyz(state.rotation?);
        let d = &self.decimals;
        Some(format!(
            "[[{},{},{}],[{},{},{},{}],[0,0,0,0],{}]",
            fixed(position.x, d.mm),
            fixed(position.y, d.mm),
            fixed(position.z, d.mm),
            fixed(q[0], d.unitless),
            fixed(q[1], d.unitless),
            fixed(q[2], d.unitless),
            fixed(q[3], d.unitless),
            self.external_axes(state.external_axes_cartesian.as_ref())
        ))
    }

    fn jointtarget(&self, cursor: &RobotCursor) -> Option<String> {
        let state = cursor.state();
        let axes = state.axes?;
        let values: Vec<String> = axes
            .values()
            .iter()
            .map(|v| fixed(*v, self.decimals.degrees))
            .collect();
        Some(format!(
            "[[{}],{}]",
            values.join(","),
            self.external_axes(state.external_axes_joints.as_ref())
        ))
    }

    fn acceleration_limit(&self, acceleration: f64) -> String {
        if acceleration > 0.0 {
            format!(
                "WorldAccLim \\Acc:={};",
                fixed(acceleration / 1000.0, self.decimals.mm)
            )
        } else {
            "WorldAccLim \\Off;".to_string()
        }
    }

    fn tooldata(&self, tool: &Tool) -> String {
        let d = &self.decimals;
        let q = quaternion_wxyz(tool.tcp_orientation);
        // RAPID rejects tools without mass.
        let weight = tool.weight.max(0.001);
        format!(
            "PERS tooldata {} := [TRUE,[[{},{},{}],[{},{},{},{}]],[{},[{},{},{}],[1,0,0,0],0,0,0]];",
            sanitize_name(&tool.name),
            fixed(tool.tcp_position.x, d.mm),
            fixed(tool.tcp_position.y, d.mm),
            fixed(tool.tcp_position.z, d.mm),
            fixed(q[0], d.unitless),
            fixed(q[1], d.unitless),
            fixed(q[2], d.unitless),
            fixed(q[3], d.unitless),
            fixed(weight, d.kg),
            fixed(tool.center_of_gravity.x, d.mm),
            fixed(tool.center_of_gravity.y, d.mm),
            fixed(tool.center_of_gravity.z, d.mm),
        )
    }
}

/// Named speeddata/zonedata declarations, deduplicated by value.
#[derive(Debug, Default)]
struct NamedData {
    entries: Vec<(String, String)>,
}

impl NamedData {
    fn name_for(&mut self, prefix: &str, value: String) -> String {
        if let Some((name, _)) = self.entries.iter().find(|(_, v)| *v == value) {
            return name.clone();
        }
        let name = format!("{prefix}{}", self.entries.len());
        self.entries.push((name.clone(), value));
        name
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn rapid_string(text: &str) -> String {
    let mut text = text.replace('"', "\"\"");
    if text.chars().count() > MAX_STRING_LENGTH {
        tracing::warn!("truncating RAPID string to {MAX_STRING_LENGTH} characters");
        text = text.chars().take(MAX_STRING_LENGTH).collect();
    }
    format!("\"{text}\"")
}

impl Compiler for RapidCompiler {
    fn dialect(&self) -> &'static str {
        "RAPID"
    }

    fn comment_prefix(&self) -> &'static str {
        "!"
    }

    fn generate(
        &self,
        program_name: &str,
        cursor: &RobotCursor,
        options: &CompilerOptions,
    ) -> Program {
        let name = sanitize_name(program_name);
        let d = self.decimals;
        let mut speeds = NamedData::default();
        let mut zones = NamedData::default();
        let mut tools: Vec<String> = Vec::new();
        let mut targets = Emitter::new("!", self.dialect(), options.comments, 2);
        let mut custom_declarations: Vec<String> = Vec::new();
        let mut body = Emitter::new("!", self.dialect(), options.comments, 4);
        let mut target_index = 0usize;

        replay(cursor, options.block_only, |action: &Action, state, applied| {
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
                    let (kind, instruction, literal) = match action.kind() {
                        ActionKind::Axes { .. } => {
                            ("jointtarget", "MoveAbsJ", self.jointtarget(state))
                        }
                        _ => {
                            let instruction = match settings.motion_type {
                                MotionType::Linear => "MoveL",
                                MotionType::Joint => "MoveJ",
                            };
                            ("robtarget", instruction, self.robtarget(state))
                        }
                    };
                    let Some(literal) = literal else {
                        body.error(action, "no target available for motion");
                        return;
                    };
                    let speed = speeds.name_for(
                        "vel",
                        format!("[{},500,5000,1000]", fixed(settings.speed, d.mm)),
                    );
                    let zone = if settings.precision <= 0.0 {
                        "fine".to_string()
                    } else {
                        let p = settings.precision;
                        zones.name_for(
                            "zone",
                            format!(
                                "[FALSE,{},{},{},{},{},{}]",
                                fixed(p, d.mm),
                                fixed(1.5 * p, d.mm),
                                fixed(1.5 * p, d.mm),
                                fixed(0.15 * p, d.mm),
                                fixed(1.5 * p, d.mm),
                                fixed(0.15 * p, d.mm)
                            ),
                        )
                    };
                    let tool = state
                        .tool()
                        .map(|t| sanitize_name(&t.name))
                        .unwrap_or_else(|| "tool0".to_string());
                    let target = if options.inline_targets {
                        literal
                    } else {
                        let target_name = format!("target{target_index}");
                        targets.action(
                            action,
                            vec![format!("CONST {kind} {target_name} := {literal};")],
                        );
                        target_name
                    };
                    target_index += 1;
                    body.action(
                        action,
                        vec![format!(
                            "{instruction} {target}, {speed}, {zone}, {tool}\\WObj:=WObj0;"
                        )],
                    );
                }
                ActionKind::Acceleration { .. } => {
                    body.action(action, vec![self.acceleration_limit(settings.acceleration)]);
                }
                ActionKind::PopSettings => {
                    let restored_acceleration = state
                        .settings_buffer()
                        .settings_before_pop()
                        .is_some_and(|before| before.acceleration != settings.acceleration);
                    if restored_acceleration {
                        body.action(action, vec![self.acceleration_limit(settings.acceleration)]);
                    }
                }
                ActionKind::DefineTool(tool) => tools.push(self.tooldata(tool)),
                ActionKind::WriteDigitalIO { pin, on, .. } => {
                    if is_identifier(pin) {
                        body.action(action, vec![format!("SetDO {pin}, {};", u8::from(*on))]);
                    } else {
                        body.error(action, &format!("\"{pin}\" is not a valid RAPID signal name"));
                    }
                }
                ActionKind::WriteAnalogIO { pin, value, .. } => {
                    if is_identifier(pin) {
                        body.action(
                            action,
                            vec![format!("SetAO {pin}, {};", fixed(*value, d.volts))],
                        );
                    } else {
                        body.error(action, &format!("\"{pin}\" is not a valid RAPID signal name"));
                    }
                }
                ActionKind::Wait { millis } => body.action(
                    action,
                    vec![format!("WaitTime {};", fixed(*millis as f64 / 1000.0, 3))],
                ),
                ActionKind::Message(text) => {
                    body.action(action, vec![format!("TPWrite {};", rapid_string(text))])
                }
                ActionKind::Comment(text) => body.action(action, vec![format!("! {text}")]),
                ActionKind::CustomCode {
                    code,
                    is_declaration: true,
                } => custom_declarations.push(code.clone()),
                ActionKind::CustomCode { code, .. } => body.action(action, vec![code.clone()]),
                ActionKind::Temperature { .. }
                | ActionKind::Extrusion(_)
                | ActionKind::ExtrusionRate { .. }
                | ActionKind::Initialization(_) => body.unsupported(action),
                // Settings and tool changes surface in later motion instructions.
                ActionKind::Speed { .. }
                | ActionKind::Precision { .. }
                | ActionKind::MotionMode(_)
                | ActionKind::ReferenceFrame(_)
                | ActionKind::PushSettings
                | ActionKind::ExternalAxis { .. }
                | ActionKind::AttachTool { .. }
                | ActionKind::DetachTool => {}
            }
        });

        let mut lines = disclaimer_header(self.comment_prefix(), &name, self.dialect());
        lines.push(String::new());
        lines.push(format!("MODULE {name}"));
        lines.push(String::new());
        for (data_name, value) in &speeds.entries {
            lines.push(format!("  CONST speeddata {data_name} := {value};"));
        }
        for (data_name, value) in &zones.entries {
            lines.push(format!("  CONST zonedata {data_name} := {value};"));
        }
        lines.extend(tools.iter().map(|t| format!("  {t}")));
        lines.extend(targets.lines);
        lines.extend(custom_declarations.iter().map(|c| format!("  {c}")));
        lines.push(String::new());
        lines.push("  PROC main()".to_string());
        lines.push("    ConfJ \\Off;".to_string());
        lines.push("    ConfL \\Off;".to_string());
        lines.push(String::new());
        lines.extend(body.lines);
        lines.push("  ENDPROC".to_string());
        lines.push(String::new());
        lines.push("ENDMODULE".to_string());

        Program {
            name,
            dialect: self.dialect().to_string(),
            lines,
        }
    }
}
