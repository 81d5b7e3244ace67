//! Common paths for ynet data storage
//!
//! All data is stored under ~/.config/ynet/ on all platforms:
//! - config.toml - User configuration
//! - credentials.enc - Encrypted session token

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Get the ynet data directory (~/.config/ynet/)
pub fn ynet_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let dir = home.join(".config").join("ynet");
    fs::create_dir_all(&dir).context("Failed to create ynet directory")?;
    Ok(dir)
}

/// Get the config file path (~/.config/ynet/config.toml)
pub fn config_path() -> Result<PathBuf> {
    Ok(ynet_dir()?.join("config.toml"))
}

/// Get the credentials file path (~/.config/ynet/credentials.enc)
pub fn credentials_path() -> Result<PathBuf> {
    Ok(ynet_dir()?.join("credentials.enc"))
}
