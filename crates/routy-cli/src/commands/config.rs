//! Configuration management commands

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;

/// Annotated default configuration
pub const DEFAULT_CONFIG: &str = include_str!("../../../../routy.toml.example");

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file the daemon would load
    Show,
    /// Initialize configuration file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

pub async fn run(cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Show => show(),
        ConfigCommands::Init { force } => init(Path::new("routy.toml"), force),
    }
}

/// Config file candidates in the daemon's lookup order
fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(path) = std::env::var("ROUTY_CONFIG") {
        paths.push(PathBuf::from(path));
    }
    paths.push(PathBuf::from("routy.toml"));
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".config").join("routy").join("routy.toml"));
    }
    paths
}

fn show() -> Result<()> {
    println!("Current Configuration");
    println!("=====================\n");

    let Some(path) = config_paths().into_iter().find(|p| p.exists()) else {
        println!("No configuration file found. Using defaults:\n");
        println!("{DEFAULT_CONFIG}");
        return Ok(());
    };

    println!("Config file: {}\n", path.display());
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let sections = check_config(&content)
        .with_context(|| format!("{} is not valid TOML", path.display()))?;
    println!("{content}");
    println!("Sections: {}", sections.join(", "));

    Ok(())
}

/// Parse a config file and return its top-level section names
pub fn check_config(content: &str) -> Result<Vec<String>> {
    let table: toml::Table = toml::from_str(content)?;
    Ok(table
        .iter()
        .filter(|(_, value)| value.is_table())
        .map(|(key, _)| key.clone())
        .collect())
}

fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!("Configuration file already exists: {}", path.display());
        println!("Use --force to overwrite");
        return Ok(());
    }

    std::fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Configuration file created: {}", path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let sections = check_config(DEFAULT_CONFIG).unwrap();
        for section in ["daemon", "traffic", "network", "forecast", "learning"] {
            assert!(sections.iter().any(|s| s == section), "missing {section}");
        }
    }

    #[test]
    fn test_check_config_rejects_garbage() {
        assert!(check_config("[daemon\nbind_address = ").is_err());
    }

    #[test]
    fn test_init_respects_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routy.toml");

        init(&path, false).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG);

        std::fs::write(&path, "[daemon]\n").unwrap();
        init(&path, false).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[daemon]\n");

        init(&path, true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG);
    }
}
