use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::DatasetName;
use crate::error::DashError;
use crate::sheets::DEFAULT_BASE_URL;

pub const API_KEY_ENV: &str = "BIZDASH_API_KEY";
pub const DEFAULT_PROBE_URL: &str = "https://sheets.googleapis.com/";

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    pub spreadsheet_id: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub cache_dir: Option<String>,
    #[serde(default)]
    pub probe_url: Option<String>,
    #[serde(default)]
    pub probe_interval_secs: Option<u64>,
    #[serde(default)]
    pub datasets: Vec<DatasetEntry>,
    #[serde(default)]
    pub credentials: Option<CredentialsEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum DatasetEntry {
    Shorthand(String),
    Detailed(DatasetEntryObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DatasetEntryObject {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CredentialsEntry {
    pub spreadsheet_id: String,
    #[serde(default)]
    pub sheet: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TrackedDataset {
    pub name: DatasetName,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct CredentialsSource {
    pub spreadsheet_id: String,
    pub sheet: DatasetName,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub spreadsheet_id: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub cache_dir: Option<Utf8PathBuf>,
    pub probe_url: String,
    pub probe_interval: Duration,
    pub datasets: Vec<TrackedDataset>,
    pub credentials: Option<CredentialsSource>,
}

impl ResolvedConfig {
    pub fn dataset_names(&self) -> Vec<DatasetName> {
        self.datasets.iter().map(|entry| entry.name.clone()).collect()
    }

    pub fn title_of(&self, name: &DatasetName) -> String {
        self.datasets
            .iter()
            .find(|entry| &entry.name == name)
            .map(|entry| entry.title.clone())
            .unwrap_or_else(|| name.default_title())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, DashError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from("bizdash.json"),
        };

        if path.is_none() && !config_path.exists() {
            return Err(DashError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| DashError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| DashError::ConfigParse(err.to_string()))?;

        let mut resolved = Self::resolve_config(config)?;
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                resolved.api_key = Some(key.trim().to_string());
            }
        }
        Ok(resolved)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, DashError> {
        let schema_version = config.schema_version.unwrap_or(1);
        if config.spreadsheet_id.trim().is_empty() {
            return Err(DashError::ConfigParse(
                "spreadsheet_id must not be empty".to_string(),
            ));
        }

        let datasets = if config.datasets.is_empty() {
            default_datasets()
                .into_iter()
                .map(|name| {
                    let name: DatasetName = name.parse()?;
                    Ok(TrackedDataset {
                        title: name.default_title(),
                        name,
                    })
                })
                .collect::<Result<Vec<_>, DashError>>()?
        } else {
            config
                .datasets
                .into_iter()
                .map(|entry| match entry {
                    DatasetEntry::Shorthand(value) => {
                        let name: DatasetName = value.parse()?;
                        Ok(TrackedDataset {
                            title: name.default_title(),
                            name,
                        })
                    }
                    DatasetEntry::Detailed(obj) => {
                        let name: DatasetName = obj.name.parse()?;
                        Ok(TrackedDataset {
                            title: obj.title.unwrap_or_else(|| name.default_title()),
                            name,
                        })
                    }
                })
                .collect::<Result<Vec<_>, DashError>>()?
        };

        let credentials = config
            .credentials
            .map(|entry| {
                Ok::<_, DashError>(CredentialsSource {
                    spreadsheet_id: entry.spreadsheet_id,
                    sheet: entry.sheet.as_deref().unwrap_or("Sheet1").parse()?,
                })
            })
            .transpose()?;

        Ok(ResolvedConfig {
            schema_version,
            spreadsheet_id: config.spreadsheet_id,
            api_key: config.api_key.filter(|key| !key.trim().is_empty()),
            base_url: config
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            cache_dir: config.cache_dir.map(Utf8PathBuf::from),
            probe_url: config
                .probe_url
                .unwrap_or_else(|| DEFAULT_PROBE_URL.to_string()),
            probe_interval: Duration::from_secs(config.probe_interval_secs.unwrap_or(15).max(1)),
            datasets,
            credentials,
        })
    }
}

pub fn default_datasets() -> Vec<&'static str> {
    vec![
        "income",
        "expenses",
        "productPerformance",
        "staffDistribution",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_dataset_list_uses_defaults() {
        let config = Config {
            schema_version: None,
            spreadsheet_id: "sheet-id".to_string(),
            api_key: None,
            base_url: None,
            cache_dir: None,
            probe_url: None,
            probe_interval_secs: None,
            datasets: Vec::new(),
            credentials: None,
        };

        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.datasets.len(), default_datasets().len());
        assert_eq!(resolved.base_url, DEFAULT_BASE_URL);
        assert_eq!(resolved.probe_interval, Duration::from_secs(15));
    }
}
