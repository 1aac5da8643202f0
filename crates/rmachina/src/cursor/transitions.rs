//! State transition rules, one per action variant.
//!
//! Transitions mutate a scratch copy of the state; the caller commits it only
//! when the transition returns `Ok`.

use super::state::CursorState;
use crate::action::ActionKind;
use crate::buffers::SettingsBuffer;
use crate::geometry::{ExternalAxes, Joints};
use crate::types::{ExternalAxesTarget, ReferenceCS, Tool};
use glam::{DQuat, DVec3};
use thiserror::Error;

/// Why an action could not be applied.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("cursor has no initial pose")]
    NotInitialized,
    #[error("relative {0} requires an absolute position and rotation")]
    NoAbsolutePose(&'static str),
    #[error("absolute translation requires a defined rotation")]
    MissingRotation,
    #[error("absolute rotation requires a defined position")]
    MissingPosition,
    #[error("relative axes require absolute axes to be defined")]
    NoAbsoluteAxes,
    #[error("external axis index {0} is out of range 1..=6")]
    ExternalAxisIndex(usize),
    #[error("relative external axis {0} has no absolute value")]
    NoAbsoluteExternalAxis(usize),
    #[error("tool \"{0}\" is not defined")]
    UnknownTool(String),
    #[error("no tool is attached")]
    NoToolAttached,
    #[error("settings stack is empty")]
    EmptySettingsStack,
}

pub(crate) fn transition(
    state: &mut CursorState,
    settings_buffer: &mut SettingsBuffer,
    kind: &ActionKind,
) -> Result<(), Rejection> {
    match kind {
        ActionKind::Speed { value, relative } => {
            state.settings.speed = non_negative(state.settings.speed, *value, *relative);
        }
        ActionKind::Acceleration { value, relative } => {
            state.settings.acceleration =
                non_negative(state.settings.acceleration, *value, *relative);
        }
        ActionKind::Precision { value, relative } => {
            state.settings.precision = non_negative(state.settings.precision, *value, *relative);
        }
        ActionKind::ExtrusionRate { value, relative } => {
            state.settings.extrusion_rate =
                non_negative(state.settings.extrusion_rate, *value, *relative);
        }
        ActionKind::MotionMode(mode) => state.settings.motion_type = *mode,
        ActionKind::ReferenceFrame(frame) => state.settings.reference_cs = *frame,
        ActionKind::PushSettings => settings_buffer.push(state.settings.clone()),
        ActionKind::PopSettings => {
            let restored = settings_buffer
                .pop(&state.settings)
                .ok_or(Rejection::EmptySettingsStack)?;
            state.settings = restored;
        }
        ActionKind::Translation { delta, relative } => translate(state, *delta, *relative)?,
        ActionKind::Rotation { rotation, relative } => rotate(state, *rotation, *relative)?,
        ActionKind::Transformation {
            translation,
            rotation,
            relative,
            translation_first,
        } => transform(state, *translation, *rotation, *relative, *translation_first)?,
        ActionKind::Axes { joints, relative } => set_axes(state, joints, *relative)?,
        ActionKind::ExternalAxis {
            index,
            value,
            target,
            relative,
        } => set_external_axis(state, *index, *value, *target, *relative)?,
        ActionKind::DefineTool(tool) => {
            if state.tools.contains_key(&tool.name) {
                tracing::debug!(tool = %tool.name, "redefining existing tool");
            }
            state.tools.insert(tool.name.clone(), tool.clone());
        }
        ActionKind::AttachTool { name } => {
            let tool = state
                .tools
                .get(name)
                .cloned()
                .ok_or_else(|| Rejection::UnknownTool(name.clone()))?;
            attach_tool(state, tool);
        }
        ActionKind::DetachTool => detach_tool(state)?,
        ActionKind::WriteDigitalIO { pin, on, .. } => {
            state.digital_outputs.insert(pin.clone(), *on);
        }
        ActionKind::WriteAnalogIO { pin, value, .. } => {
            state.analog_outputs.insert(pin.clone(), *value);
        }
        ActionKind::Temperature {
            part,
            value,
            relative,
            ..
        } => {
            let current = state.temperatures.get(part).copied().unwrap_or(0.0);
            state
                .temperatures
                .insert(*part, non_negative(current, *value, *relative));
        }
        ActionKind::Extrusion(on) => state.is_extruding = *on,
        ActionKind::Initialization(on) => state.device_initialized = *on,
        ActionKind::Wait { .. }
        | ActionKind::Message(_)
        | ActionKind::Comment(_)
        | ActionKind::CustomCode { .. } => {}
    }
    Ok(())
}

fn non_negative(current: f64, value: f64, relative: bool) -> f64 {
    let next = if relative { current + value } else { value };
    if next < 0.0 {
        tracing::debug!(requested = next, "clamping negative value to zero");
        return 0.0;
    }
    next
}

fn pose(state: &CursorState, what: &'static str) -> Result<(DVec3, DQuat), Rejection> {
    match (state.position, state.rotation) {
        (Some(position), Some(rotation)) => Ok((position, rotation)),
        _ => Err(Rejection::NoAbsolutePose(what)),
    }
}

/// Set a new cartesian pose, clearing axes and accumulating extrusion.
fn commit_pose(state: &mut CursorState, position: DVec3, rotation: DQuat) {
    if state.is_extruding {
        if let Some(previous) = state.position {
            state.extruded_length += state.settings.extrusion_rate * previous.distance(position);
        }
    }
    state.position = Some(position);
    state.rotation = Some(rotation.normalize());
    state.axes = None;
}

fn translate(state: &mut CursorState, delta: DVec3, relative: bool) -> Result<(), Rejection> {
    if relative {
        let (position, rotation) = pose(state, "translation")?;
        let world_delta = match state.settings.reference_cs {
            ReferenceCS::World => delta,
            ReferenceCS::Local => rotation * delta,
        };
        commit_pose(state, position + world_delta, rotation);
    } else {
        let rotation = state.rotation.ok_or(Rejection::MissingRotation)?;
        commit_pose(state, delta, rotation);
    }
    Ok(())
}

fn rotate(state: &mut CursorState, delta: DQuat, relative: bool) -> Result<(), Rejection> {
    if relative {
        let (position, rotation) = pose(state, "rotation")?;
        let rotated = match state.settings.reference_cs {
            ReferenceCS::World => delta * rotation,
            ReferenceCS::Local => rotation * delta,
        };
        commit_pose(state, position, rotated);
    } else {
        let position = state.position.ok_or(Rejection::MissingPosition)?;
        commit_pose(state, position, delta);
    }
    Ok(())
}

/// In world frame the translation is independent of the rotation, so
/// `translation_first` only changes the result in local frame.
fn transform(
    state: &mut CursorState,
    translation: DVec3,
    rotation: DQuat,
    relative: bool,
    translation_first: bool,
) -> Result<(), Rejection> {
    if !relative {
        commit_pose(state, translation, rotation);
        return Ok(());
    }
    let (position, current) = pose(state, "transformation")?;
    let (next_position, next_rotation) = match state.settings.reference_cs {
        ReferenceCS::World => (position + translation, rotation * current),
        ReferenceCS::Local => {
            let rotated = current * rotation;
            let frame = if translation_first { current } else { rotated };
            (position + frame * translation, rotated)
        }
    };
    commit_pose(state, next_position, next_rotation);
    Ok(())
}

fn set_axes(state: &mut CursorState, joints: &Joints, relative: bool) -> Result<(), Rejection> {
    let next = if relative {
        state.axes.ok_or(Rejection::NoAbsoluteAxes)?.add(joints)
    } else {
        *joints
    };
    state.axes = Some(next);
    state.position = None;
    state.rotation = None;
    Ok(())
}

fn set_external_axis(
    state: &mut CursorState,
    index: usize,
    value: f64,
    target: ExternalAxesTarget,
    relative: bool,
) -> Result<(), Rejection> {
    if !(1..=ExternalAxes::COUNT).contains(&index) {
        return Err(Rejection::ExternalAxisIndex(index));
    }
    let (cartesian, joint) = match target {
        ExternalAxesTarget::Cartesian => (true, false),
        ExternalAxesTarget::Joint => (false, true),
        ExternalAxesTarget::All => (true, true),
    };
    if cartesian {
        update_external_axes(&mut state.external_axes_cartesian, index, value, relative)?;
    }
    if joint {
        update_external_axes(&mut state.external_axes_joints, index, value, relative)?;
    }
    Ok(())
}

fn update_external_axes(
    slot: &mut Option<ExternalAxes>,
    index: usize,
    value: f64,
    relative: bool,
) -> Result<(), Rejection> {
    let axes = slot.get_or_insert_with(ExternalAxes::new);
    let next = if relative {
        axes.get(index)
            .ok_or(Rejection::NoAbsoluteExternalAxis(index))?
            + value
    } else {
        value
    };
    axes.set(index, next);
    Ok(())
}

/// Without an absolute pose the tool is recorded but the TCP transform is
/// not computed.
fn attach_tool(state: &mut CursorState, tool: Tool) {
    if let (Some(position), Some(rotation)) = (state.position, state.rotation) {
        let (flange_position, flange_rotation) =
            remove_tcp(position, rotation, state.tool.as_ref());
        state.position = Some(flange_position + flange_rotation * tool.tcp_position);
        state.rotation = Some((flange_rotation * tool.tcp_orientation).normalize());
    }
    state.tool = Some(tool);
}

fn detach_tool(state: &mut CursorState) -> Result<(), Rejection> {
    let tool = state.tool.take().ok_or(Rejection::NoToolAttached)?;
    if let (Some(position), Some(rotation)) = (state.position, state.rotation) {
        let (flange_position, flange_rotation) = remove_tcp(position, rotation, Some(&tool));
        state.position = Some(flange_position);
        state.rotation = Some(flange_rotation);
    }
    Ok(())
}

/// Undo a tool's TCP transform, returning the flange pose.
fn remove_tcp(position: DVec3, rotation: DQuat, tool: Option<&Tool>) -> (DVec3, DQuat) {
    match tool {
        Some(tool) => {
            let flange_rotation = (rotation * tool.tcp_orientation.inverse()).normalize();
            (position - flange_rotation * tool.tcp_position, flange_rotation)
        }
        None => (position, rotation),
    }
}
