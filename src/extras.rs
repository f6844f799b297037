use serde::{Deserialize, Serialize};

pub const SOURCES_KEY: &str = "sources";
pub const SOURCES_RES_FORMATS_KEY: &str = "sources_res_formats";
pub const MAPPREVIEW_KEY: &str = "mappreview";
pub const LAST_UPDATED_KEY: &str = "natcap_last_updated";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extra {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Extras(Vec<Extra>);

impl Extras {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|extra| extra.key == key)
            .map(|extra| extra.value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|extra| extra.key == key)
    }

    /// Drops every entry for `key` and appends a single fresh one.
    pub fn upsert(mut self, key: &str, value: impl Into<String>) -> Self {
        self.0.retain(|extra| extra.key != key);
        self.0.push(Extra {
            key: key.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn strip_keys<S: AsRef<str>>(mut self, keys: &[S]) -> Self {
        self.0
            .retain(|extra| !keys.iter().any(|key| key.as_ref() == extra.key));
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|extra| extra.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Extra> {
        self.0.iter()
    }
}

impl From<Vec<Extra>> for Extras {
    fn from(value: Vec<Extra>) -> Self {
        Self(value)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Extras {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| Extra {
                    key: key.into(),
                    value: value.into(),
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Extras {
        [("a", "1"), ("sources", "[]"), ("b", "2")]
            .into_iter()
            .collect()
    }

    #[test]
    fn upsert_replaces_and_appends() {
        let extras = sample().upsert("sources", "[\"x.tif\"]");
        assert_eq!(extras.keys().collect::<Vec<_>>(), vec!["a", "b", "sources"]);
        assert_eq!(extras.get("sources"), Some("[\"x.tif\"]"));
    }

    #[test]
    fn upsert_is_idempotent() {
        let once = sample().upsert("c", "3");
        let twice = once.clone().upsert("c", "3");
        assert_eq!(once, twice);
        assert_eq!(twice.len(), 4);
    }

    #[test]
    fn upsert_collapses_duplicate_keys() {
        let extras: Extras = [("k", "old"), ("x", "1"), ("k", "older")]
            .into_iter()
            .collect();
        let extras = extras.upsert("k", "new");
        assert_eq!(extras.keys().collect::<Vec<_>>(), vec!["x", "k"]);
    }

    #[test]
    fn strip_keys_removes_schema_owned_entries() {
        let extras = sample()
            .upsert("suggested_citation", "cite")
            .strip_keys(&["suggested_citation"]);
        assert!(!extras.contains_key("suggested_citation"));
        assert_eq!(extras.len(), 3);
    }

    #[test]
    fn serializes_as_key_value_list() {
        let json = serde_json::to_string(&Extras::new().upsert("a", "1")).unwrap();
        assert_eq!(json, r#"[{"key":"a","value":"1"}]"#);
    }
}
