//! Daemon configuration file.
//!
//! Stored as TOML at `$FILEPUSHD_CONFIG` when set, otherwise:
//! - Linux: `~/.config/filepush/filepushd.toml`
//! - Windows: `%APPDATA%/filepush/filepushd.toml`

use std::path::{Path, PathBuf};

use filepush_server::ServerConfig;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "FILEPUSHD_CONFIG";

/// Loads the configuration, writing the defaults out first if no file exists.
pub fn load() -> anyhow::Result<ServerConfig> {
    load_from(&config_path())
}

pub fn load_from(path: &Path) -> anyhow::Result<ServerConfig> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&content)?;
        Ok(config)
    } else {
        let config = ServerConfig::default();
        save_to(&config, path)?;
        tracing::info!(path = %path.display(), "wrote default configuration");
        Ok(config)
    }
}

pub fn save_to(config: &ServerConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    tracing::debug!(path = %path.display(), "configuration saved");
    Ok(())
}

fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return PathBuf::from(path);
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("filepush").join("filepushd.toml")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("filepush")
            .join("filepushd.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("filepushd.toml");

        let config = load_from(&path).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert!(path.exists());

        let written: ServerConfig = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, config);
    }

    #[test]
    fn existing_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filepushd.toml");
        std::fs::write(&path, "port = 6000\nroot_dir = \"/srv/incoming\"\n").unwrap();

        let config = load_from(&path).unwrap();
        assert_eq!(config.port, 6000);
        assert_eq!(config.root_dir, PathBuf::from("/srv/incoming"));
        assert_eq!(config.max_workers, 10);
    }

    #[test]
    fn save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filepushd.toml");
        let config = ServerConfig {
            max_workers: 3,
            socket_timeout_secs: 5,
            ..ServerConfig::default()
        };

        save_to(&config, &path).unwrap();
        assert_eq!(load_from(&path).unwrap(), config);
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filepushd.toml");
        save_to(&ServerConfig::default(), &path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filepushd.toml");
        std::fs::write(&path, "port = \"not a number\"").unwrap();
        assert!(load_from(&path).is_err());
    }
}
