/// Configuration command handler
use anyhow::Result;
use std::path::Path;
use vigil_core::config::{Config, CONFIG_FILE_NAME};

pub fn handle_config_show(data_dir: &Path) -> Result<()> {
    let config_path = data_dir.join(CONFIG_FILE_NAME);
    let config = Config::load(data_dir)?;

    println!("Configuration:");
    println!("\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}");
    println!("  data dir = {}", data_dir.display());
    println!(
        "  config   = {}{}",
        config_path.display(),
        if config_path.exists() { "" } else { " (not found, using defaults)" }
    );
    println!("  database = {}", config.database_path(data_dir).display());
    println!();
    print!("{}", config.to_toml()?);
    Ok(())
}
