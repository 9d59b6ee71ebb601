use std::fs;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use log::{debug, info, LevelFilter};
use merge::Merge;
use serde::{Deserialize, Serialize};

use crate::client::ClientOptions;
use crate::constants::*;
use crate::error::{AppError, Result};

/// Which presentation front-end to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum UiKind {
    /// Full-screen terminal UI.
    Tui,
    /// Numbered text menus.
    Menu,
}

impl FromStr for UiKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tui" => Ok(UiKind::Tui),
            "menu" | "cli" => Ok(UiKind::Menu),
            other => Err(AppError::Config(format!("unknown ui \"{}\", expected tui or menu", other))),
        }
    }
}

#[derive(Serialize, Deserialize, Merge, Clone, Debug, PartialEq)]
pub struct GeneralConfig {
    pub(crate) ui: Option<String>,
    pub(crate) log_level: Option<String>,
}

#[derive(Serialize, Deserialize, Merge, Clone, Debug, PartialEq)]
pub struct NetworkConfig {
    pub(crate) api_base_url: Option<String>,
    pub(crate) api_timeout_secs: Option<u64>,
    pub(crate) ip_lookup_timeout_secs: Option<u64>,
}

#[derive(Serialize, Deserialize, Merge, Clone, Debug, PartialEq)]
pub struct Settings {
    pub(crate) general: Option<GeneralConfig>,
    pub(crate) network: Option<NetworkConfig>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            ui: Some(DEFAULT_UI.to_string()),
            log_level: Some(DEFAULT_LOG_LEVEL.to_string()),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            api_base_url: Some(DEFAULT_API_BASE_URL.to_string()),
            api_timeout_secs: Some(DEFAULT_API_TIMEOUT_SECS),
            ip_lookup_timeout_secs: Some(DEFAULT_IP_LOOKUP_TIMEOUT_SECS),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            general: Some(GeneralConfig::default()),
            network: Some(NetworkConfig::default()),
        }
    }
}

impl Settings {
    /// Loads the settings file from the config directory, creating it with defaults if absent.
    pub fn load() -> Result<Settings> {
        let filepath = Settings::config_dir()?.join(CONFIG_FILE_NAME);
        Settings::load_from(&filepath)
    }

    pub fn load_from(filepath: &Path) -> Result<Settings> {
        if !filepath.exists() {
            debug!("Creating default settings.");
            Settings::create_default_config_file(filepath)?;
            info!("Default settings file created at {}.", filepath.display());

            return Ok(Settings::default());
        }

        debug!("Settings exist at {}, attempting to load.", filepath.display());
        let config_file = fs::File::open(filepath)?;

        let mut reader = BufReader::new(config_file);
        let mut contents = String::new();
        reader.read_to_string(&mut contents).map_err(|e| {
            AppError::Config(format!("unable to read {}: {}. Is the encoding UTF-8?", filepath.display(), e))
        })?;

        let settings = toml::from_str::<Settings>(contents.as_str())
            .map_err(|e| AppError::Config(format!("unable to parse {}: {}", filepath.display(), e)))?
            .merge_custom(Settings::default());

        Ok(settings)
    }

    pub fn ui(&self) -> Result<UiKind> {
        self.general
            .as_ref()
            .and_then(|g| g.ui.as_deref())
            .unwrap_or(DEFAULT_UI)
            .parse()
    }

    pub fn log_level(&self) -> LevelFilter {
        self.general
            .as_ref()
            .and_then(|g| g.log_level.as_deref())
            .and_then(|level| level.parse().ok())
            .unwrap_or(LevelFilter::Warn)
    }

    pub fn client_options(&self) -> ClientOptions {
        let network = self.network.clone().unwrap_or_default();

        ClientOptions {
            base_url: network
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            timeout: Duration::from_secs(network.api_timeout_secs.unwrap_or(DEFAULT_API_TIMEOUT_SECS)),
        }
    }

    pub fn ip_lookup_timeout(&self) -> Duration {
        Duration::from_secs(
            self.network
                .as_ref()
                .and_then(|n| n.ip_lookup_timeout_secs)
                .unwrap_or(DEFAULT_IP_LOOKUP_TIMEOUT_SECS),
        )
    }

    /// Initializes the default settings file.
    fn create_default_config_file(filepath: &Path) -> Result<()> {
        if let Some(dir) = filepath.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut config_file = fs::File::create(filepath)?;

        let contents = toml::to_string(&Settings::default())
            .map_err(|e| AppError::Config(e.to_string()))?;
        config_file.write_all(contents.as_bytes())?;

        Ok(())
    }

    /// Returns the configuration directory.
    pub fn config_dir() -> Result<PathBuf> {
        match dirs::config_dir() {
            Some(dir) => Ok(dir.join(Path::new(CONFIG_FOLDER_NAME))),
            None => dirs::home_dir()
                .map(|home| home.join(format!(".{}", CONFIG_FOLDER_NAME)))
                .ok_or_else(|| AppError::Config("cannot find a config folder or home directory".to_string())),
        }
    }

    /// Custom merge for the Settings object and its sections.
    fn merge_custom(self, other: Settings) -> Self {
        Settings {
            general: merge_section(self.general, other.general),
            network: merge_section(self.network, other.network),
        }
    }
}

fn merge_section<T: Merge>(mine: Option<T>, theirs: Option<T>) -> Option<T> {
    match (mine, theirs) {
        (Some(mut mine), Some(theirs)) => {
            mine.merge(theirs);
            Some(mine)
        }
        (mine, theirs) => mine.or(theirs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub/settings.toml");

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(path.exists());
        assert_eq!(Settings::load_from(&path).unwrap(), Settings::default());
    }

    #[test]
    fn partial_file_is_filled_from_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "[general]\nui = \"menu\"\n\n[network]\napi_timeout_secs = 3\n").unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.ui().unwrap(), UiKind::Menu);
        assert_eq!(settings.log_level(), LevelFilter::Warn);
        let options = settings.client_options();
        assert_eq!(options.timeout, Duration::from_secs(3));
        assert_eq!(options.base_url, DEFAULT_API_BASE_URL);
        assert_eq!(settings.ip_lookup_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "[general\nui = ").unwrap();

        assert!(matches!(Settings::load_from(&path), Err(AppError::Config(_))));
    }

    #[test]
    fn unknown_ui_is_rejected() {
        assert!("gtk".parse::<UiKind>().is_err());
        assert_eq!("TUI".parse::<UiKind>().unwrap(), UiKind::Tui);
    }
}
