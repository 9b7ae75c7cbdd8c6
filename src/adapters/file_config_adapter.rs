//! INI file configuration adapter.

use crate::domain::error::TradewindError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new();
        config.load(path).map_err(std::io::Error::other)?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    fn invalid(section: &str, key: &str, raw: &str, expected: &str) -> TradewindError {
        TradewindError::ConfigInvalid {
            section: section.into(),
            key: key.into(),
            reason: format!("'{raw}' is not {expected}"),
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str) -> Result<Option<i64>, TradewindError> {
        match self.config.get(section, key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| Self::invalid(section, key, &raw, "an integer")),
        }
    }

    fn get_double(&self, section: &str, key: &str) -> Result<Option<f64>, TradewindError> {
        match self.config.get(section, key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| Self::invalid(section, key, &raw, "a number")),
        }
    }

    fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>, TradewindError> {
        match self.config.get(section, key) {
            None => Ok(None),
            Some(raw) => match raw.trim().to_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(Some(true)),
                "false" | "no" | "0" => Ok(Some(false)),
                _ => Err(Self::invalid(section, key, &raw, "a boolean")),
            },
        }
    }
}
