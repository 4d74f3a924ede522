pub mod state;

pub use state::{DashboardSettings, SettingsError, SettingsStore};
