use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub db_connection_string: String,
}

pub const DEFAULT_BASE_URL: &str = "https://tiktek.com";
const APP_DIR_NAME: &str = "tiktek";
const PREFS_FILE_NAME: &str = "tiktek_prefs.sqlite";

impl Config {
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable source; unset or empty variables take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let base_url = var("TIKTEK_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.into())
            .trim_end_matches('/')
            .to_string();
        let db_connection_string =
            var("DB_CONNECTION_STRING").unwrap_or_else(default_db_connection_string);
        Config {
            base_url,
            db_connection_string,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("TIKTEK_BASE_URL is missing".into());
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(format!(
                "TIKTEK_BASE_URL must be an http(s) URL, got {}",
                self.base_url
            ));
        }
        if self.db_connection_string.is_empty() {
            return Err("DB_CONNECTION_STRING is missing".into());
        }
        Ok(())
    }

    /// Parent directory of a file-backed SQLite database, if any.
    pub fn db_dir(&self) -> Option<PathBuf> {
        let rest = self.db_connection_string.strip_prefix("sqlite://")?;
        let path = rest.split('?').next().unwrap_or(rest);
        if path.is_empty() || path.contains(":memory:") {
            return None;
        }
        PathBuf::from(path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(PathBuf::from)
    }
}

/// Preference file in the per-user data directory, falling back to the working directory.
fn default_db_connection_string() -> String {
    let path = dirs::data_dir()
        .map(|p| p.join(APP_DIR_NAME).join(PREFS_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(PREFS_FILE_NAME));
    format!("sqlite://{}?mode=rwc", path.display())
}
