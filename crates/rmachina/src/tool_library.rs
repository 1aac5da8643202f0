use crate::types::Tool;
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A persisted collection of tool definitions, unique by name.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ToolLibrary {
    pub tools: Vec<Tool>,
}

impl ToolLibrary {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Load a library from `path`. Missing files yield an empty library.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }

        let data =
            fs::read(path).with_context(|| format!("read tool library {}", path.display()))?;
        let library: ToolLibrary =
            serde_json::from_slice(&data).context("deserialize tool library")?;
        if let Some(name) = library.first_duplicate() {
            bail!("tool library {} defines \"{name}\" twice", path.display());
        }
        Ok(library)
    }

    /// Persist the library to `path`, creating parent directories.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create tool library directory {}", parent.display()))?;
        }

        let data =
            serde_json::to_vec_pretty(self).context("serialize tool library to JSON bytes")?;
        fs::write(path, data).with_context(|| format!("write tool library {}", path.display()))
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    /// Add a tool. Fails if a tool with the same name exists.
    pub fn add_tool(&mut self, tool: Tool) -> Result<()> {
        if self.get(&tool.name).is_some() {
            bail!("tool \"{}\" already exists", tool.name);
        }
        self.tools.push(tool);
        Ok(())
    }

    /// Replace the definition of the tool called `name`.
    pub fn update_tool(&mut self, name: &str, tool: Tool) -> Result<()> {
        let slot = self
            .tools
            .iter_mut()
            .find(|t| t.name == name)
            .ok_or_else(|| anyhow!("unknown tool \"{name}\""))?;
        *slot = tool;
        Ok(())
    }

    pub fn remove_tool(&mut self, name: &str) -> Result<Tool> {
        let index = self
            .tools
            .iter()
            .position(|t| t.name == name)
            .ok_or_else(|| anyhow!("unknown tool \"{name}\""))?;
        Ok(self.tools.remove(index))
    }

    /// The per-user library path, `~/.rmachina/tools/library.json`.
    /// [`ToolLibrary::save_to_path`] creates its directories on first save.
    pub fn default_library_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("could not determine home directory"))?;
        Ok(home.join(".rmachina").join("tools").join("library.json"))
    }

    fn first_duplicate(&self) -> Option<&str> {
        self.tools.iter().enumerate().find_map(|(i, tool)| {
            self.tools[..i]
                .iter()
                .any(|earlier| earlier.name == tool.name)
                .then_some(tool.name.as_str())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{DQuat, DVec3};

    fn gripper() -> Tool {
        Tool::new(
            "gripper",
            DVec3::new(0.0, 0.0, 120.0),
            DQuat::IDENTITY,
            1.5,
            DVec3::new(0.0, 0.0, 50.0),
        )
    }

    #[test]
    fn test_names_are_unique() {
        let mut library = ToolLibrary::new();
        library.add_tool(gripper()).unwrap();
        assert!(library.add_tool(gripper()).is_err());
        assert_eq!(library.tools.len(), 1);
    }

    #[test]
    fn test_update_and_remove_by_name() {
        let mut library = ToolLibrary::new();
        library.add_tool(gripper()).unwrap();

        let mut heavier = gripper();
        heavier.weight = 3.0;
        library.update_tool("gripper", heavier).unwrap();
        assert_eq!(library.get("gripper").map(|t| t.weight), Some(3.0));
        assert!(library.update_tool("nozzle", gripper()).is_err());

        let removed = library.remove_tool("gripper").unwrap();
        assert_eq!(removed.name, "gripper");
        assert!(library.remove_tool("gripper").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("rmachina-tools-{}", std::process::id()));
        let path = dir.join("library.json");
        let mut library = ToolLibrary::new();
        library.add_tool(gripper()).unwrap();
        library.save_to_path(&path).unwrap();

        let loaded = ToolLibrary::load_from_path(&path).unwrap();
        assert_eq!(loaded, library);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_default_path_is_under_home() {
        if let Some(home) = dirs::home_dir() {
            let path = ToolLibrary::default_library_path().unwrap();
            assert!(path.starts_with(home));
            assert!(path.ends_with(".rmachina/tools/library.json"));
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let path = std::env::temp_dir().join("rmachina-no-such-library.json");
        let library = ToolLibrary::load_from_path(path).unwrap();
        assert!(library.tools.is_empty());
    }
}
