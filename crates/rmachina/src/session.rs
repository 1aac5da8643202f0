use crate::action::{Action, ActionIdGenerator, ActionKind};
use crate::buffers::Settings;
use crate::compiler::{Compiler, CompilerOptions, Program};
use crate::config::SessionConfig;
use crate::cursor::{lock_cursor, InitialPose, RobotCursor, SharedCursor};
use crate::protocol::{StreamingProtocol, WireMessage};
use crate::types::Tool;
use anyhow::Result;
use std::sync::Arc;

/// One controlled device: a user-facing cursor that applies actions as they
/// are issued, chained to a write cursor that buffers them for output.
///
/// Only actions the user cursor accepts reach the write cursor.
#[derive(Debug)]
pub struct Session {
    name: String,
    ids: Arc<ActionIdGenerator>,
    user: SharedCursor,
    write: SharedCursor,
    options: CompilerOptions,
}

impl Session {
    pub fn new(name: impl Into<String>, ids: Arc<ActionIdGenerator>) -> Self {
        Self::with_tools(name.into(), ids, Vec::new())
    }

    /// Build and initialize a session from a loaded configuration.
    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        let tools = config.resolve_tools()?;
        let mut session = Self::with_tools(
            config.name.clone(),
            Arc::new(ActionIdGenerator::new()),
            tools,
        );
        session.options = config.compiler.clone();
        session.initialize(config.initial_pose.clone(), config.settings.clone())?;
        Ok(session)
    }

    fn with_tools(name: String, ids: Arc<ActionIdGenerator>, tools: Vec<Tool>) -> Self {
        let write = RobotCursor::builder(format!("{name}-write"))
            .tools(tools.clone())
            .build_shared();
        let user = RobotCursor::builder(format!("{name}-user"))
            .apply_immediately(true)
            .child(Arc::clone(&write))
            .tools(tools)
            .build_shared();
        tracing::info!(session = %name, "session created");
        Self {
            name,
            ids,
            user,
            write,
            options: CompilerOptions::default(),
        }
    }

    /// Bind the same starting pose and settings on both cursors.
    pub fn initialize(&self, pose: InitialPose, settings: Settings) -> Result<()> {
        lock_cursor(&self.user).initialize(pose.clone(), settings.clone())?;
        lock_cursor(&self.write).initialize(pose, settings)?;
        tracing::info!(session = %self.name, "session initialized");
        Ok(())
    }

    /// Create an action with the next id and issue it to the user cursor.
    ///
    /// The id is drawn while the user cursor is locked, so concurrent callers
    /// reach the buffer in id order. Returns the action if it applied; a
    /// rejected action is dropped and never reaches the write cursor.
    pub fn issue(&self, kind: ActionKind) -> Option<Arc<Action>> {
        let mut user = lock_cursor(&self.user);
        let action = Arc::new(Action::new(&self.ids, kind));
        user.issue(Arc::clone(&action)).then_some(action)
    }

    /// Compile the write cursor's buffered actions without releasing them.
    pub fn compile(
        &self,
        compiler: &dyn Compiler,
        program_name: &str,
        options: &CompilerOptions,
    ) -> Program {
        let write = lock_cursor(&self.write);
        let program = compiler.generate(program_name, &write, options);
        tracing::info!(
            session = %self.name,
            dialect = compiler.dialect(),
            lines = program.lines.len(),
            "program compiled"
        );
        program
    }

    /// Compile with the session's configured options.
    pub fn compile_default(&self, compiler: &dyn Compiler, program_name: &str) -> Program {
        self.compile(compiler, program_name, &self.options)
    }

    /// Release, apply and encode the next buffered action.
    pub fn stream_next(&self, protocol: &dyn StreamingProtocol) -> Option<Vec<WireMessage>> {
        protocol.next_messages(&mut lock_cursor(&self.write))
    }

    /// Freeze the write cursor's pending actions into a block.
    pub fn set_block(&self) {
        lock_cursor(&self.write).set_block();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ids(&self) -> &ActionIdGenerator {
        &self.ids
    }

    pub fn compiler_options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn user_cursor(&self) -> &SharedCursor {
        &self.user
    }

    pub fn write_cursor(&self) -> &SharedCursor {
        &self.write
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    fn session() -> Session {
        let session = Session::new("cell", Arc::new(ActionIdGenerator::new()));
        session
            .initialize(
                InitialPose {
                    position: Some(DVec3::ZERO),
                    rotation: Some(glam::DQuat::IDENTITY),
                    ..InitialPose::default()
                },
                Settings::default(),
            )
            .unwrap();
        session
    }

    #[test]
    fn test_rejected_actions_do_not_reach_write_cursor() {
        let session = session();
        assert!(session.issue(ActionKind::PopSettings).is_none());
        assert!(session.issue(ActionKind::Wait { millis: 10 }).is_some());

        let write = lock_cursor(session.write_cursor());
        let pending = write.buffer().peek_all();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id().raw(), 2, "the rejected action still used id 1");
    }

    #[test]
    fn test_stream_drains_write_cursor() {
        let session = session();
        session.issue(ActionKind::Translation {
            delta: DVec3::new(10.0, 0.0, 0.0),
            relative: true,
        });
        let abb = crate::protocol::AbbProtocol::new();
        let messages = session.stream_next(&abb).expect("one pending");
        assert_eq!(messages.len(), 1);
        assert!(session.stream_next(&abb).is_none());
        assert_eq!(
            lock_cursor(session.write_cursor()).position(),
            Some(DVec3::new(10.0, 0.0, 0.0))
        );
    }
}
