mod config;
mod logging;

pub use config::{load_config, log_summary};
pub use logging::init_logging;
