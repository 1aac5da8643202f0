use crate::buffers::Settings;
use crate::compiler::CompilerOptions;
use crate::cursor::InitialPose;
use crate::tool_library::ToolLibrary;
use crate::types::Tool;
use anyhow::{Context, Result};
use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Everything needed to open a [`crate::Session`], stored as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub name: String,
    pub initial_pose: InitialPose,
    pub settings: Settings,
    /// Tools available for attachment from the start.
    pub tools: Vec<Tool>,
    /// Optional tool library whose tools are added to `tools`.
    pub tool_library: Option<PathBuf>,
    pub compiler: CompilerOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: "robot".to_string(),
            initial_pose: InitialPose {
                position: Some(DVec3::ZERO),
                rotation: Some(DQuat::IDENTITY),
                ..InitialPose::default()
            },
            settings: Settings::default(),
            tools: Vec::new(),
            tool_library: None,
            compiler: CompilerOptions::default(),
        }
    }
}

impl SessionConfig {
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("read session config {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("deserialize session config {}", path.display()))
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create config directory {}", parent.display()))?;
        }
        let data = serde_json::to_vec_pretty(self).context("serialize session config")?;
        fs::write(path, data).with_context(|| format!("write session config {}", path.display()))
    }

    /// Inline tools followed by those of the configured library.
    pub fn resolve_tools(&self) -> Result<Vec<Tool>> {
        let mut tools = self.tools.clone();
        if let Some(path) = &self.tool_library {
            let library = ToolLibrary::load_from_path(path)?;
            tools.extend(library.tools);
        }
        Ok(tools)
    }
}
