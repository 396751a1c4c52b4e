//! Per-resource options and process settings.

mod options;
mod settings;

pub use options::Options;
pub use settings::Settings;
