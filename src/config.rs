//! Configuration loading and schema definitions for nyrkio-reporter.
//!
//! Configuration lives in a TOML file (`nyrkio.toml` by default). The bearer
//! token is deliberately not part of it: the file names the environment
//! variable that holds the token, and the caller reads it and hands it to
//! the submission client.

pub mod schema;

pub use schema::*;

use std::path::Path;

use anyhow::{Context, Result};

/// Loads and validates configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read (e.g., doesn't exist or permission denied)
/// - The file contains invalid TOML syntax
/// - The configuration doesn't match the expected schema
/// - A value fails [`Config::validate`]
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("Invalid config file: {}", path.display()))?;

    Ok(config)
}

/// Loads and validates configuration from a TOML string.
///
/// ```
/// use nyrkio_reporter::config::load_config_str;
///
/// let config = load_config_str(r#"
///     [nyrkio]
///     project_name = "MyApp"
///     git_repo = "https://github.com/org/my-app"
///     request_timeout_secs = 10
/// "#)?;
///
/// assert_eq!(config.nyrkio.request_timeout_secs, 10);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn load_config_str(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse config")?;
    config.validate().context("Invalid config")?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nyrkio.toml");
        std::fs::write(
            &path,
            "[nyrkio]\nproject_name = \"MyApp\"\ngit_repo = \"https://github.com/org/app\"\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.nyrkio.project_name, "MyApp");
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_load_config_str_validates() {
        let err = load_config_str(
            "[nyrkio]\nproject_name = \"\"\ngit_repo = \"https://github.com/org/app\"\n",
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid config");
        assert!(format!("{:#}", err).contains("project_name must not be empty"));
    }
}
