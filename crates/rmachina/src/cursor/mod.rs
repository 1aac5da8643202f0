mod state;
mod transitions;

pub use state::{CursorState, InitialPose};
pub use transitions::Rejection;

use crate::action::{Action, ActionId};
use crate::buffers::{ActionsBuffer, Settings, SettingsBuffer};
use crate::geometry::Joints;
use crate::types::Tool;
use anyhow::{bail, Result};
use glam::{DQuat, DVec3};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A cursor guarded for use across threads. All mutating operations on one
/// cursor go through its lock; distinct cursors lock independently.
pub type SharedCursor = Arc<Mutex<RobotCursor>>;

/// Lock a shared cursor, recovering the guard if a previous holder panicked.
pub fn lock_cursor(cursor: &SharedCursor) -> MutexGuard<'_, RobotCursor> {
    cursor.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Result of releasing and applying one buffered action.
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    pub action: Arc<Action>,
    pub success: bool,
}

/// Virtual device that replays actions into concrete state.
#[derive(Debug)]
pub struct RobotCursor {
    name: String,
    state: CursorState,
    buffer: ActionsBuffer,
    settings_buffer: SettingsBuffer,
    apply_immediately: bool,
    initialized: bool,
    child: Option<SharedCursor>,
}

/// Builder for [`RobotCursor`]. The child link can only be set here, so a
/// cursor can never end up as its own ancestor.
#[derive(Debug)]
pub struct RobotCursorBuilder {
    name: String,
    apply_immediately: bool,
    child: Option<SharedCursor>,
    tools: Vec<Tool>,
}

impl RobotCursorBuilder {
    /// Apply every issued action right away instead of only buffering it.
    pub fn apply_immediately(mut self, apply: bool) -> Self {
        self.apply_immediately = apply;
        self
    }

    /// Forward successfully applied actions to `child`.
    pub fn child(mut self, child: SharedCursor) -> Self {
        self.child = Some(child);
        self
    }

    /// Preload tools into the cursor's tool dictionary.
    pub fn tools(mut self, tools: impl IntoIterator<Item = Tool>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn build(self) -> RobotCursor {
        let mut state = CursorState::default();
        for tool in self.tools {
            state.tools.insert(tool.name.clone(), tool);
        }
        RobotCursor {
            name: self.name,
            state,
            buffer: ActionsBuffer::new(),
            settings_buffer: SettingsBuffer::new(),
            apply_immediately: self.apply_immediately,
            initialized: false,
            child: self.child,
        }
    }

    pub fn build_shared(self) -> SharedCursor {
        Arc::new(Mutex::new(self.build()))
    }
}

impl RobotCursor {
    pub fn builder(name: impl Into<String>) -> RobotCursorBuilder {
        RobotCursorBuilder {
            name: name.into(),
            apply_immediately: false,
            child: None,
            tools: Vec::new(),
        }
    }

    /// Bind the starting pose and default settings.
    ///
    /// The pose must carry either a position together with a rotation, or a
    /// set of axes (or both).
    pub fn initialize(&mut self, pose: InitialPose, settings: Settings) -> Result<()> {
        if pose.position.is_some() != pose.rotation.is_some() {
            bail!(
                "cursor '{}': position and rotation must be initialized together",
                self.name
            );
        }
        if pose.position.is_none() && pose.axes.is_none() {
            bail!(
                "cursor '{}': initial pose needs a position and rotation, or axes",
                self.name
            );
        }

        self.state.position = pose.position;
        self.state.rotation = pose.rotation.map(DQuat::normalize);
        self.state.axes = pose.axes;
        self.state.external_axes_cartesian = pose.external_axes;
        self.state.external_axes_joints = pose.external_axes;
        self.state.prev_position = pose.position;
        self.state.prev_rotation = self.state.rotation;
        self.state.prev_axes = pose.axes;
        self.state.settings = settings;
        self.initialized = true;
        tracing::debug!(cursor = %self.name, "cursor initialized");
        Ok(())
    }

    /// Buffer an action, applying it at once if configured to.
    pub fn issue(&mut self, action: Arc<Action>) -> bool {
        if !self.buffer.add(action) {
            return false;
        }
        if self.apply_immediately {
            return self.apply_next_action().is_some_and(|outcome| outcome.success);
        }
        true
    }

    /// Release and apply the oldest pending action.
    ///
    /// Returns `None` when nothing is pending. A failed application still
    /// consumes the action; the state is left untouched. Nothing applies
    /// before [`RobotCursor::initialize`].
    pub fn apply_next_action(&mut self) -> Option<ApplyOutcome> {
        let action = self.buffer.get_next()?;
        let success = self.apply(&action);
        if success {
            self.forward(&action);
        }
        Some(ApplyOutcome { action, success })
    }

    /// Release and apply every pending action up to and including `id`.
    ///
    /// Every action is attempted even after a failure; the result is true
    /// only if all of them applied.
    pub fn apply_actions_until_id(&mut self, id: ActionId) -> bool {
        let mut all_applied = true;
        for action in self.buffer.get_all_up_to_id(id) {
            if self.apply(&action) {
                self.forward(&action);
            } else {
                all_applied = false;
            }
        }
        all_applied
    }

    fn apply(&mut self, action: &Action) -> bool {
        let mut next = self.state.clone();
        let result = if self.initialized {
            transitions::transition(&mut next, &mut self.settings_buffer, action.kind())
        } else {
            Err(Rejection::NotInitialized)
        };
        match result {
            Ok(()) => {
                next.prev_position = self.state.position;
                next.prev_rotation = self.state.rotation;
                next.prev_axes = self.state.axes;
                next.prev_extruded_length = self.state.extruded_length;
                self.state = next;
                true
            }
            Err(rejection) => {
                tracing::warn!(
                    cursor = %self.name,
                    id = %action.id(),
                    action = %action.to_instruction(),
                    "could not apply action: {rejection}"
                );
                false
            }
        }
    }

    fn forward(&self, action: &Arc<Action>) {
        if let Some(child) = &self.child {
            lock_cursor(child).issue(Arc::clone(action));
        }
    }

    /// A child-less copy of this cursor whose buffer holds the pending (or
    /// blocked) actions. Replaying it leaves this cursor untouched.
    pub fn replay_cursor(&self, block_only: bool) -> RobotCursor {
        let actions = if block_only {
            self.buffer.peek_block()
        } else {
            self.buffer.peek_all()
        };
        let mut buffer = ActionsBuffer::new();
        for action in actions {
            buffer.add(action);
        }
        RobotCursor {
            name: format!("{}-replay", self.name),
            state: self.state.clone(),
            buffer,
            settings_buffer: self.settings_buffer.clone(),
            apply_immediately: false,
            initialized: self.initialized,
            child: None,
        }
    }

    /// Pending actions; with `peek == false` they are released unapplied.
    pub fn pending_actions(&mut self, peek: bool) -> Vec<Arc<Action>> {
        self.buffer.get_all_pending(peek)
    }

    /// Pending actions of the current block; with `peek == false` they are
    /// released unapplied.
    pub fn block_pending_actions(&mut self, peek: bool) -> Vec<Arc<Action>> {
        self.buffer.get_block_pending(peek)
    }

    /// Freeze the currently pending actions into a block.
    pub fn set_block(&mut self) {
        self.buffer.set_block();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &CursorState {
        &self.state
    }

    pub fn buffer(&self) -> &ActionsBuffer {
        &self.buffer
    }

    pub fn settings_buffer(&self) -> &SettingsBuffer {
        &self.settings_buffer
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn has_child(&self) -> bool {
        self.child.is_some()
    }

    pub fn child(&self) -> Option<&SharedCursor> {
        self.child.as_ref()
    }

    pub fn position(&self) -> Option<DVec3> {
        self.state.position
    }

    pub fn rotation(&self) -> Option<DQuat> {
        self.state.rotation
    }

    pub fn axes(&self) -> Option<Joints> {
        self.state.axes
    }

    pub fn settings(&self) -> &Settings {
        &self.state.settings
    }

    pub fn speed(&self) -> f64 {
        self.state.settings.speed
    }

    pub fn acceleration(&self) -> f64 {
        self.state.settings.acceleration
    }

    pub fn precision(&self) -> f64 {
        self.state.settings.precision
    }

    pub fn tool(&self) -> Option<&Tool> {
        self.state.tool.as_ref()
    }

    pub fn pending_count(&self) -> usize {
        self.buffer.pending_count()
    }

    /// The most recently released action.
    pub fn last_action(&self) -> Option<Arc<Action>> {
        self.buffer.get_last()
    }
}
