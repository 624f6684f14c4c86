//! Command handlers for the mlpipe CLI

use anyhow::Result;

use mlpipe::config::ConfigurationManager;
use mlpipe::logging;

use crate::GlobalArgs;

pub mod config;
pub mod predict;
pub mod run;

/// Install logging and load the three configuration documents.
///
/// `console` echoes log events to stdout; commands that print data there
/// keep their logs in the log file only.
pub fn load_manager(global: &GlobalArgs, console: bool) -> Result<ConfigurationManager> {
    let log_path = logging::init(&global.log_dir, global.verbose, console)?;
    tracing::debug!("Logging to {}", log_path.display());

    ConfigurationManager::new(&global.config, &global.params, &global.schema)
}
