//! Program compilers: turn buffered actions into device-native program text.
//!
//! Compilation never consumes the source cursor's buffer. Actions are peeked
//! and replayed through a scratch copy of the cursor so the same actions can
//! still be streamed afterwards.

mod gcode;
mod krl;
mod machina;
mod rapid;
mod urscript;

pub use gcode::GCodeCompiler;
pub use krl::KrlCompiler;
pub use machina::MachinaCompiler;
pub use rapid::RapidCompiler;
pub use urscript::UrScriptCompiler;

use crate::action::Action;
use crate::cursor::RobotCursor;
use serde::{Deserialize, Serialize};

/// What to append to each emitted instruction line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentMode {
    #[default]
    None,
    /// The action's human-readable description.
    ActionString,
    /// The action's numeric id.
    ActionId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    /// Compile only the frozen block instead of everything pending.
    pub block_only: bool,
    /// Write targets inside instructions instead of as named declarations.
    pub inline_targets: bool,
    pub comments: CommentMode,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            block_only: false,
            inline_targets: true,
            comments: CommentMode::None,
        }
    }
}

/// A compiled program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub name: String,
    pub dialect: String,
    pub lines: Vec<String>,
}

impl Program {
    /// The program as file contents.
    pub fn to_text(&self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

/// Rounding applied per unit class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimals {
    pub mm: usize,
    pub degrees: usize,
    pub radians: usize,
    pub kg: usize,
    pub volts: usize,
    pub celsius: usize,
    /// Quaternion components, ratios, extrusion lengths.
    pub unitless: usize,
}

impl Default for Decimals {
    fn default() -> Self {
        Self {
            mm: 3,
            degrees: 3,
            radians: 6,
            kg: 3,
            volts: 3,
            celsius: 0,
            unitless: 6,
        }
    }
}

/// A device dialect that compiles a cursor's buffered actions.
pub trait Compiler {
    /// Name of the target language.
    fn dialect(&self) -> &'static str;

    /// Line comment token of the target language.
    fn comment_prefix(&self) -> &'static str;

    /// Compile the pending (or blocked) actions of `cursor` into a program.
    fn generate(&self, program_name: &str, cursor: &RobotCursor, options: &CompilerOptions)
        -> Program;
}

/// Format `value` with a fixed number of decimals, never printing `-0`.
pub fn fixed(value: f64, decimals: usize) -> String {
    let text = format!("{value:.decimals$}");
    if text.starts_with('-') && text[1..].chars().all(|c| c == '0' || c == '.') {
        return text[1..].to_string();
    }
    text
}

/// Turn an arbitrary name into an identifier accepted by every dialect.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    match cleaned.chars().next() {
        None => "Program".to_string(),
        Some(c) if c.is_ascii_digit() => format!("P_{cleaned}"),
        Some(_) => cleaned,
    }
}

const HEADER_WIDTH: usize = 72;

/// Comment-bordered block opening every generated file.
pub fn disclaimer_header(comment: &str, program_name: &str, dialect: &str) -> Vec<String> {
    let border = comment.repeat(2);
    let generated = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
    let rows = [
        "-".repeat(HEADER_WIDTH),
        format!("Program \"{program_name}\" ({dialect})"),
        format!(
            "Generated by rmachina {} on {generated}",
            env!("CARGO_PKG_VERSION")
        ),
        "Review this program before running it on a real device.".to_string(),
        "-".repeat(HEADER_WIDTH),
    ];
    rows.iter()
        .map(|row| format!("{border} {row:<HEADER_WIDTH$} {border}"))
        .collect()
}

/// Replay the actions of `cursor` through a scratch copy, calling `visit`
/// with each action, the scratch state after it, and whether it applied.
pub(crate) fn replay(
    cursor: &RobotCursor,
    block_only: bool,
    mut visit: impl FnMut(&Action, &RobotCursor, bool),
) {
    let mut scratch = cursor.replay_cursor(block_only);
    while let Some(outcome) = scratch.apply_next_action() {
        visit(&outcome.action, &scratch, outcome.success);
    }
}

/// Collects the lines of one program section, annotating them per options.
#[derive(Debug)]
pub(crate) struct Emitter<'a> {
    comment: &'a str,
    dialect: &'a str,
    mode: CommentMode,
    indent: String,
    pub lines: Vec<String>,
}

impl<'a> Emitter<'a> {
    pub fn new(comment: &'a str, dialect: &'a str, mode: CommentMode, indent: usize) -> Self {
        Self {
            comment,
            dialect,
            mode,
            indent: " ".repeat(indent),
            lines: Vec::new(),
        }
    }

    /// Emit the lines produced by one action; only the first is annotated.
    pub fn action(&mut self, action: &Action, lines: Vec<String>) {
        for (i, line) in lines.into_iter().enumerate() {
            let line = if i == 0 {
                self.annotate(line, action)
            } else {
                line
            };
            self.lines.push(format!("{}{line}", self.indent));
        }
    }

    pub fn line(&mut self, line: impl AsRef<str>) {
        let line = line.as_ref();
        if line.is_empty() {
            self.lines.push(String::new());
        } else {
            self.lines.push(format!("{}{line}", self.indent));
        }
    }

    pub fn unsupported(&mut self, action: &Action) {
        let text = format!(
            "{} unsupported by {}: {}",
            self.comment,
            self.dialect,
            action.to_instruction()
        );
        self.lines.push(format!("{}{text}", self.indent));
    }

    pub fn error(&mut self, action: &Action, message: &str) {
        tracing::warn!(id = %action.id(), dialect = self.dialect, "{message}");
        let text = format!(
            "{} ERROR: {message} ({})",
            self.comment,
            action.to_instruction()
        );
        self.lines.push(format!("{}{text}", self.indent));
    }

    pub fn failed(&mut self, action: &Action) {
        let text = format!(
            "{} ERROR: could not apply {}",
            self.comment,
            action.to_instruction()
        );
        self.lines.push(format!("{}{text}", self.indent));
    }

    fn annotate(&self, line: String, action: &Action) -> String {
        match self.mode {
            CommentMode::None => line,
            CommentMode::ActionString => format!("{line}  {} {action}", self.comment),
            CommentMode::ActionId => format!("{line}  {} [{}]", self.comment, action.id()),
        }
    }
}

/// Parse a pin identifier as a number within `range`.
pub(crate) fn numeric_pin(pin: &str, range: std::ops::RangeInclusive<i64>) -> Option<i64> {
    pin.trim().parse::<i64>().ok().filter(|n| range.contains(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_never_prints_negative_zero() {
        assert_eq!(fixed(-0.0001, 3), "0.000");
        assert_eq!(fixed(-1.5, 1), "-1.5");
        assert_eq!(fixed(2.0, 2), "2.00");
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("my program"), "my_program");
        assert_eq!(sanitize_name("3d-print"), "P_3d_print");
        assert_eq!(sanitize_name("  "), "Program");
    }

    #[test]
    fn test_header_is_bordered_and_fixed_width() {
        let header = disclaimer_header("!", "Demo", "RAPID");
        assert_eq!(header.len(), 5);
        let width = header[0].len();
        for line in &header {
            assert!(line.starts_with("!! "));
            assert!(line.ends_with(" !!"));
            assert_eq!(line.len(), width);
        }
        assert!(header[1].contains("Program \"Demo\" (RAPID)"));
    }

    #[test]
    fn test_numeric_pin() {
        assert_eq!(numeric_pin("3", 0..=7), Some(3));
        assert_eq!(numeric_pin("8", 0..=7), None);
        assert_eq!(numeric_pin("DO_1", 0..=7), None);
    }
}
