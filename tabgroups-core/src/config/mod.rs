//! Configuration for `TabGroups`
//!
//! [`Settings`] are loaded from a TOML file in the user's config directory.
//! [`Options`] are user preferences stored inside the data document.

mod options;
mod settings;

pub use options::{BackupIntervalKey, OPTION_KEYS, Options};
pub use settings::{ExternalExtension, Settings, TimingSettings};
