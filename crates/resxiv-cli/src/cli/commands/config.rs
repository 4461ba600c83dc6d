//! `resxiv config` handlers.

use anyhow::{Context, Result};
use resxiv_core::config::{Config, paths};

pub fn path() {
    let config_path = paths::config_path();
    println!("{}", config_path.display());
    if !config_path.exists() {
        eprintln!("(not created yet; run `resxiv config init`)");
    }
}

pub fn init() -> Result<()> {
    let config_path = paths::config_path();
    Config::init(&config_path)
        .with_context(|| format!("init config at {}", config_path.display()))?;
    println!("Created config at {}", config_path.display());
    println!("  Credentials will be stored in: {}", paths::resxiv_home().display());
    Ok(())
}
