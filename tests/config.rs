use std::io::Write;
use std::time::Duration;

use assert_matches::assert_matches;

use natcap_sync::config::{CatalogTarget, ConfigLoader};
use natcap_sync::error::SyncError;

#[test]
fn reads_explicit_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "catalog_url": "https://data.naturalcapitalproject.stanford.edu/",
            "request_timeout_secs": 5,
            "fetch_workers": 8,
            "refresh_interval_secs": 600,
            "sidecar_description": "Dataset metadata",
            "schema_owned_keys": ["suggested_citation", "placenames"]
        }}"#
    )
    .unwrap();

    let config = ConfigLoader::read(file.path().to_path_buf()).unwrap();
    let resolved = ConfigLoader::resolve_config(config, |_| None);
    assert_eq!(
        resolved.catalog,
        CatalogTarget::Ckan {
            url: "https://data.naturalcapitalproject.stanford.edu".to_string(),
            api_key: None,
        }
    );
    assert_eq!(resolved.request_timeout, Duration::from_secs(5));
    assert_eq!(resolved.fetch_workers, 8);
    assert_eq!(resolved.refresh_interval, chrono::Duration::minutes(10));
    assert_eq!(resolved.sidecar_description, "Dataset metadata");
    assert_eq!(resolved.schema_owned_keys, vec!["suggested_citation", "placenames"]);
}

#[test]
fn env_catalog_url_wins_over_catalog_dir() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"catalog_dir": "/srv/catalog"}}"#).unwrap();

    let config = ConfigLoader::read(file.path().to_path_buf()).unwrap();
    let resolved = ConfigLoader::resolve_config(config, |key| {
        (key == "NATCAP_CKAN_URL").then(|| "http://ckan.internal:5000".to_string())
    });
    assert_eq!(
        resolved.catalog,
        CatalogTarget::Ckan {
            url: "http://ckan.internal:5000".to_string(),
            api_key: None,
        }
    );
}

#[test]
fn missing_explicit_file_is_an_error() {
    assert_matches!(
        ConfigLoader::resolve(Some("/nonexistent/natcap-sync.json")),
        Err(SyncError::ConfigRead(_))
    );
}

#[test]
fn invalid_json_is_a_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ not json").unwrap();
    assert_matches!(
        ConfigLoader::read(file.path().to_path_buf()),
        Err(SyncError::ConfigParse(_))
    );
}
