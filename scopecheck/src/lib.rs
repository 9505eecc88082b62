#![forbid(unsafe_code)]

pub mod config;
pub mod files;
pub mod output;

pub use config::{ConfigError, ConfigFile, CONFIG_FILE};
pub use files::{collect_files, is_kotlin_file, load_files, Loaded};
pub use output::{render_json, render_text, Format};
