//! Configuration for the ShadowWalker client.
//!
//! Settings persist to disk as a RON file and can be overridden from the
//! command line. Unknown or missing fields fall back to defaults so that
//! older and newer config files keep loading.

mod cli;
mod config;
mod error;

pub use cli::{CliArgs, parse_server_url, parse_username, parse_uuid};
pub use config::{
    ClientConfig, Config, DebugConfig, NetworkConfig, ProfileConfig, default_config_dir,
};
pub use error::ConfigError;
