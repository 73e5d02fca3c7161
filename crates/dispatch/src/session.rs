use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

/// Server-side session state for one browser, identified by an opaque id the
/// client holds in a cookie. Loaded before dispatch and written back only when
/// something changed.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    data: Map<String, Value>,
    dirty: bool,
    fresh: bool,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            data: Map::new(),
            dirty: false,
            fresh: true,
        }
    }

    pub fn restore(id: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            data,
            dirty: false,
            fresh: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// True when the id has not been handed to the client yet.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: T) {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        if self.data.get(key) != Some(&value) {
            self.data.insert(key.to_string(), value);
            self.dirty = true;
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.data.remove(key);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
