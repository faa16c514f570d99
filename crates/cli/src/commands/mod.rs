pub mod chat;
pub mod schema;
pub mod serve;

use cypherchat_config::AppConfig;

/// Load configuration, turning failures into a printable message.
pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}
