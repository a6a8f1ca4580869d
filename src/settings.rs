//! Application settings, persisted as a plain `key=value` file.
//!
//! Location:
//!   Linux:    `$XDG_CONFIG_HOME/placefe/placefe_settings.cfg` (or `~/.config/...`)
//!   Windows:  `%APPDATA%\PlaceFE\placefe_settings.cfg`
//!   macOS:    `~/Library/Application Support/PlaceFE/placefe_settings.cfg`
//!
//! Unknown keys are ignored and missing keys fall back to defaults, so old
//! config files keep loading across releases.

use std::path::PathBuf;

/// When cell separator lines are drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridlineMode {
    /// Draw once cells are large enough to read (the default).
    Auto,
    AlwaysOn,
    AlwaysOff,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AppSettings {
    /// Grid service endpoint.
    pub server_url: String,
    /// Account to paint with (empty = browse anonymously).
    pub account: String,
    pub gridline_mode: GridlineMode,
    /// Show the confirm dialog before a batch save.
    pub confirm_on_save: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            server_url: "https://api.placefe.app".to_string(),
            account: String::new(),
            gridline_mode: GridlineMode::Auto,
            confirm_on_save: true,
        }
    }
}

impl AppSettings {
    fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("placefe");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("placefe_settings.cfg"));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            let config_dir = PathBuf::from(appdata).join("PlaceFE");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("placefe_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            let config_dir = PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("PlaceFE");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join("placefe_settings.cfg"));
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join("placefe_settings.cfg")))
        }
    }

    pub fn save(&self) {
        let Some(path) = Self::settings_path() else {
            return;
        };
        let _ = std::fs::write(path, self.to_config_string());
    }

    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            return Self::default();
        };
        let Ok(content) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        Self::from_config_str(&content)
    }

    fn to_config_string(&self) -> String {
        let gridlines = match self.gridline_mode {
            GridlineMode::Auto => "auto",
            GridlineMode::AlwaysOn => "on",
            GridlineMode::AlwaysOff => "off",
        };
        format!(
            "server_url={}\n\
             account={}\n\
             gridline_mode={gridlines}\n\
             confirm_on_save={}\n",
            self.server_url, self.account, self.confirm_on_save,
        )
    }

    fn from_config_str(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let Some((key, val)) = line.split_once('=') else {
                continue;
            };
            let (key, val) = (key.trim(), val.trim());
            match key {
                "server_url" if !val.is_empty() => s.server_url = val.to_string(),
                "account" => s.account = val.to_string(),
                "gridline_mode" => {
                    s.gridline_mode = match val {
                        "on" => GridlineMode::AlwaysOn,
                        "off" => GridlineMode::AlwaysOff,
                        _ => GridlineMode::Auto,
                    };
                }
                "confirm_on_save" => s.confirm_on_save = val == "true",
                _ => {}
            }
        }
        s
    }
}
