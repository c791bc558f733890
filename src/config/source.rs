//! Named configuration values (RPC URL, private key, explorer base).

use std::collections::HashMap;

/// Lookup of named string values.
pub trait ValueSource: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;

    /// Value with surrounding whitespace removed; blank counts as absent.
    fn get_non_empty(&self, name: &str) -> Option<String> {
        self.get(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// Process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSource;

impl ValueSource for EnvSource {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Fixed set of values.
#[derive(Debug, Clone, Default)]
pub struct MapSource {
    values: HashMap<String, String>,
}

impl MapSource {
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }
}

impl ValueSource for MapSource {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

/// First non-empty value among `names`, in order.
pub fn first_non_empty(source: &dyn ValueSource, names: &[String]) -> Option<String> {
    names.iter().find_map(|name| source.get_non_empty(name))
}
