use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Untyped parameter set carried by a job request.
///
/// Keys are stored as supplied. `get` is an exact match (what the binder
/// uses); `get_ignore_case` is available to job bodies that want lenient
/// lookups of parameters they read by hand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters {
    entries: BTreeMap<String, String>,
}

/// A `key=value` pair could not be split.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid parameter '{0}': expected key=value")]
pub struct InvalidPair(pub String);

impl Parameters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `key=value` pairs. Only the first `=` splits, so values may
    /// contain `=` themselves.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, InvalidPair>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut params = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| InvalidPair(pair.to_string()))?;
            if key.is_empty() {
                return Err(InvalidPair(pair.to_string()));
            }
            params.insert(key, value);
        }
        Ok(params)
    }

    /// Later values win. Repeated keys and keys differing from an existing
    /// one only by case are kept as given but logged.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        if self.entries.contains_key(&key) {
            warn!(key = %key, "parameter repeated; later value wins");
        } else if let Some(existing) = self.entries.keys().find(|k| k.eq_ignore_ascii_case(&key)) {
            warn!(key = %key, existing = %existing, "parameter differs from an existing key only by case");
        }
        self.entries.insert(key, value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn get_ignore_case(&self, key: &str) -> Option<&str> {
        self.get(key).or_else(|| {
            self.entries
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.as_str())
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for Parameters
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

impl<'a> IntoIterator for &'a Parameters {
    type Item = (&'a String, &'a String);
    type IntoIter = std::collections::btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in &self.entries {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{k}={v}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn from_pairs_splits_on_first_equals() {
        let params = Parameters::from_pairs(["url=http://x/?a=b", "empty="]).unwrap();
        assert_eq!(params.get("url"), Some("http://x/?a=b"));
        assert_eq!(params.get("empty"), Some(""));
    }

    #[test]
    fn from_pairs_rejects_missing_separator() {
        let err = Parameters::from_pairs(["novalue"]).unwrap_err();
        assert_eq!(err, InvalidPair("novalue".to_string()));
        assert!(Parameters::from_pairs(["=x"]).is_err());
    }

    #[test]
    fn exact_and_case_insensitive_lookup() {
        let params: Parameters = [("TestParameter", "frob")].into_iter().collect();
        assert_eq!(params.get("TestParameter"), Some("frob"));
        assert_eq!(params.get("testparameter"), None);
        assert_eq!(params.get_ignore_case("testparameter"), Some("frob"));
    }

    #[test]
    fn serializes_as_plain_object() {
        let params: Parameters = [("a", "1"), ("b", "2")].into_iter().collect();
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json, serde_json::json!({"a": "1", "b": "2"}));
        let back: Parameters = serde_json::from_value(json).unwrap();
        assert_eq!(back, params);
    }

    #[test]
    #[traced_test]
    fn repeated_key_warns_and_last_wins() {
        let params = Parameters::from_pairs(["Count=1", "Count=2"]).unwrap();
        assert_eq!(params.get("Count"), Some("2"));
        assert_eq!(params.len(), 1);
        assert!(logs_contain("parameter repeated"));
    }

    #[test]
    #[traced_test]
    fn case_variant_key_warns_and_is_kept() {
        let mut params = Parameters::new();
        assert_eq!(params.insert("TestParameter", "frob"), None);
        assert_eq!(params.insert("testparameter", "other"), None);
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("TestParameter"), Some("frob"));
        assert!(logs_contain("only by case"));
    }

    #[test]
    #[traced_test]
    fn distinct_keys_do_not_warn() {
        let params = Parameters::from_pairs(["a=1", "b=2"]).unwrap();
        assert_eq!(params.len(), 2);
        assert!(!logs_contain("parameter repeated"));
        assert!(!logs_contain("only by case"));
    }

    #[test]
    fn display_lists_pairs() {
        let params: Parameters = [("b", "2"), ("a", "1")].into_iter().collect();
        assert_eq!(params.to_string(), "a=1 b=2");
    }
}
