mod actions;
mod settings;

pub use actions::ActionsBuffer;
pub use settings::{SettingChange, Settings, SettingsBuffer};
