//! Configuration file loading for toolforge
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `TOOLFORGE_*` environment variables (`__` separates sections)
//! 2. `--config <path>` specified file
//! 3. Project root: `./toolforge.toml` or `./.toolforge.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/toolforge/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    FileAutonomousConfig, FileConfig, FileGatewayConfig, FileLoggingConfig, FileRetrievalConfig,
    FileSandboxConfig, FileStorageConfig, FileSwarmConfig, FileTaskConfig,
};
pub use loader::ConfigLoader;
