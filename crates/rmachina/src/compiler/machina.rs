use super::{disclaimer_header, replay, sanitize_name, Compiler, CompilerOptions, Emitter, Program};
use crate::cursor::RobotCursor;

/// Re-serialises actions in their own call syntax, for logs and replays.
#[derive(Debug, Clone, Default)]
pub struct MachinaCompiler;

impl MachinaCompiler {
    pub fn new() -> Self {
        Self
    }
}

impl Compiler for MachinaCompiler {
    fn dialect(&self) -> &'static str {
        "Machina"
    }

    fn comment_prefix(&self) -> &'static str {
        "//"
    }

    fn generate(
        &self,
        program_name: &str,
        cursor: &RobotCursor,
        options: &CompilerOptions,
    ) -> Program {
        let name = sanitize_name(program_name);
        let mut body = Emitter::new("//", self.dialect(), options.comments, 0);

        replay(cursor, options.block_only, |action, _, applied| {
            if applied {
                body.action(action, vec![action.to_instruction()]);
            } else {
                body.failed(action);
            }
        });

        let mut lines = disclaimer_header(self.comment_prefix(), &name, self.dialect());
        lines.push(String::new());
        lines.extend(body.lines);

        Program {
            name,
            dialect: self.dialect().to_string(),
            lines,
        }
    }
}
