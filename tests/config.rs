use std::time::Duration;

use assert_matches::assert_matches;

use bizdash::config::{
    Config, ConfigLoader, CredentialsEntry, DatasetEntry, DatasetEntryObject, default_datasets,
};
use bizdash::domain::DatasetName;
use bizdash::error::DashError;

fn base_config() -> Config {
    Config {
        schema_version: None,
        spreadsheet_id: "sheet-id".to_string(),
        api_key: Some("key".to_string()),
        base_url: None,
        cache_dir: None,
        probe_url: None,
        probe_interval_secs: None,
        datasets: Vec::new(),
        credentials: None,
    }
}

#[test]
fn parse_config_shorthand_and_detailed() {
    let mut config = base_config();
    config.datasets = vec![
        DatasetEntry::Shorthand("income".to_string()),
        DatasetEntry::Detailed(DatasetEntryObject {
            name: "staffDistribution".to_string(),
            title: Some("Staff".to_string()),
        }),
        DatasetEntry::Detailed(DatasetEntryObject {
            name: "productPerformance".to_string(),
            title: None,
        }),
    ];
    config.probe_interval_secs = Some(60);

    let resolved = ConfigLoader::resolve_config(config).unwrap();

    assert_eq!(resolved.schema_version, 1);
    assert_eq!(resolved.datasets.len(), 3);
    assert_eq!(resolved.datasets[0].title, "Income");
    assert_eq!(resolved.datasets[1].title, "Staff");
    assert_eq!(resolved.datasets[2].title, "Product Performance");
    assert_eq!(resolved.probe_interval, Duration::from_secs(60));
    assert_eq!(resolved.api_key.as_deref(), Some("key"));
}

#[test]
fn defaults_cover_the_dashboard_datasets() {
    let resolved = ConfigLoader::resolve_config(base_config()).unwrap();
    let names = resolved.dataset_names();

    assert_eq!(names.len(), default_datasets().len());
    let staff: DatasetName = "staffDistribution".parse().unwrap();
    assert!(names.contains(&staff));
    assert_eq!(resolved.title_of(&"assets".parse().unwrap()), "Assets");
}

#[test]
fn credentials_sheet_defaults_to_sheet1() {
    let mut config = base_config();
    config.credentials = Some(CredentialsEntry {
        spreadsheet_id: "accounts".to_string(),
        sheet: None,
    });

    let resolved = ConfigLoader::resolve_config(config).unwrap();
    let credentials = resolved.credentials.unwrap();

    assert_eq!(credentials.spreadsheet_id, "accounts");
    assert_eq!(credentials.sheet.as_str(), "Sheet1");
}

#[test]
fn invalid_dataset_name_is_rejected() {
    let mut config = base_config();
    config.datasets = vec![DatasetEntry::Shorthand("../etc".to_string())];

    assert_matches!(
        ConfigLoader::resolve_config(config),
        Err(DashError::InvalidDatasetName(_))
    );
}

#[test]
fn json_file_is_loaded() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("bizdash.json");
    std::fs::write(
        &path,
        r#"{
            "spreadsheet_id": "abc",
            "cache_dir": "/var/cache/bizdash",
            "datasets": ["income", {"name": "expenses", "title": "Costs"}]
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();

    assert_eq!(resolved.spreadsheet_id, "abc");
    assert_eq!(resolved.cache_dir.unwrap().as_str(), "/var/cache/bizdash");
    assert_eq!(resolved.datasets[1].title, "Costs");
}

#[test]
fn unreadable_explicit_path_is_config_read_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("missing.json");

    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(DashError::ConfigRead(_))
    );
}
