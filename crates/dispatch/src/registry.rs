use std::{collections::BTreeMap, sync::Arc};

use crate::{
    ctx::{NavItem, SiteInfo},
    error::RegistryError,
    plugin::Endpoint,
    theme::Theme,
};

pub(crate) type EndpointFactory = Arc<dyn Fn() -> Box<dyn Endpoint> + Send + Sync>;
pub(crate) type ThemeFactory = Arc<dyn Fn() -> Box<dyn Theme> + Send + Sync>;

const MAX_KEY_LEN: usize = 32;

struct Entry<F> {
    key: String,
    factory: F,
}

/// The dispatch table: selector key → constructor. Populated once at start
/// and read-only afterwards. Lookups are case-insensitive and fail closed;
/// nothing is ever constructed from a name that was not registered here.
pub struct Registry {
    site: SiteInfo,
    plugins: BTreeMap<String, Entry<EndpointFactory>>,
    themes: BTreeMap<String, Entry<ThemeFactory>>,
    nav1: Vec<NavItem>,
    nav2: Vec<NavItem>,
    default_object: Option<String>,
    default_theme: Option<String>,
    rejected: Vec<String>,
}

impl Registry {
    pub fn new(site: SiteInfo) -> Self {
        Self {
            site,
            plugins: BTreeMap::new(),
            themes: BTreeMap::new(),
            nav1: Vec::new(),
            nav2: Vec::new(),
            default_object: None,
            default_theme: None,
            rejected: Vec::new(),
        }
    }

    /// Registers a plugin/view pair under `key`. The first registered key is
    /// the default object unless [`Registry::default_object`] says otherwise.
    pub fn plugin<E, F>(mut self, key: &str, factory: F) -> Self
    where
        E: Endpoint + 'static,
        F: Fn() -> E + Send + Sync + 'static,
    {
        if !is_selector(key) {
            self.rejected.push(key.to_string());
            return self;
        }
        let factory: EndpointFactory = Arc::new(move || Box::new(factory()));
        self.plugins.insert(
            key.to_ascii_lowercase(),
            Entry {
                key: key.to_string(),
                factory,
            },
        );
        self.default_object.get_or_insert_with(|| key.to_string());
        self
    }

    /// Registers a theme and lists it in the theme switcher.
    pub fn theme<T, F>(mut self, key: &str, factory: F) -> Self
    where
        T: Theme + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        if !is_selector(key) {
            self.rejected.push(key.to_string());
            return self;
        }
        let factory: ThemeFactory = Arc::new(move || Box::new(factory()));
        self.themes.insert(
            key.to_ascii_lowercase(),
            Entry {
                key: key.to_string(),
                factory,
            },
        );
        self.nav2.push(NavItem::new(key, key));
        self.default_theme.get_or_insert_with(|| key.to_string());
        self
    }

    /// Adds a primary navigation entry.
    pub fn menu(mut self, label: &str, key: &str) -> Self {
        self.nav1.push(NavItem::new(label, key));
        self
    }

    pub fn default_object(mut self, key: &str) -> Self {
        self.default_object = Some(key.to_string());
        self
    }

    pub fn default_theme(mut self, key: &str) -> Self {
        self.default_theme = Some(key.to_string());
        self
    }

    pub fn site(&self) -> &SiteInfo {
        &self.site
    }

    pub fn nav1(&self) -> &[NavItem] {
        &self.nav1
    }

    pub fn nav2(&self) -> &[NavItem] {
        &self.nav2
    }

    /// Registered object keys, in key order.
    pub fn objects(&self) -> impl Iterator<Item = &str> {
        self.plugins.values().map(|entry| entry.key.as_str())
    }

    pub fn canonical_object(&self, raw: &str) -> Option<&str> {
        lookup(&self.plugins, raw).map(|entry| entry.key.as_str())
    }

    pub fn canonical_theme(&self, raw: &str) -> Option<&str> {
        lookup(&self.themes, raw).map(|entry| entry.key.as_str())
    }

    pub(crate) fn endpoint(&self, key: &str) -> Option<Box<dyn Endpoint>> {
        lookup(&self.plugins, key).map(|entry| (entry.factory)())
    }

    pub(crate) fn theme_factory(&self, key: &str) -> Option<ThemeFactory> {
        lookup(&self.themes, key).map(|entry| entry.factory.clone())
    }

    /// Checks the table is usable and returns the canonical default
    /// object and theme keys.
    pub(crate) fn validate(&self) -> Result<(String, String), RegistryError> {
        if let Some(key) = self.rejected.first() {
            return Err(RegistryError::InvalidKey(key.clone()));
        }
        let theme = self.default_theme.as_deref().ok_or(RegistryError::NoTheme)?;
        let theme = self
            .canonical_theme(theme)
            .ok_or_else(|| RegistryError::UnknownDefaultTheme(theme.to_string()))?;
        let object = self.default_object.as_deref().unwrap_or_default();
        let object = self
            .canonical_object(object)
            .ok_or_else(|| RegistryError::UnknownDefaultObject(object.to_string()))?;
        Ok((object.to_string(), theme.to_string()))
    }
}

fn lookup<'a, F>(table: &'a BTreeMap<String, Entry<F>>, raw: &str) -> Option<&'a Entry<F>> {
    if !is_selector(raw) {
        return None;
    }
    table.get(&raw.to_ascii_lowercase())
}

/// Selector keys are short ASCII words.
pub(crate) fn is_selector(raw: &str) -> bool {
    !raw.is_empty()
        && raw.len() <= MAX_KEY_LEN
        && raw.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
