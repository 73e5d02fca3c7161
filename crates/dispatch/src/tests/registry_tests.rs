use super::*;
use crate::{
    ctx::{Ctx, Out},
    plugin::{ModelResult, Outcome, Plugin, Route, View},
};
use async_trait::async_trait;

struct Echo;

#[async_trait]
impl Plugin for Echo {
    type Payload = ();

    async fn list(&self, _ctx: &mut Ctx) -> ModelResult<()> {
        Ok(Outcome::Render(()))
    }
}

impl View for Echo {
    type Payload = ();

    fn list(&self, _ary: &(), _ctx: &Ctx) -> String {
        "echo".into()
    }
}

struct Bare;

impl Theme for Bare {
    fn html(&self, out: &Out) -> String {
        out.main.clone()
    }
}

#[test]
fn selector_keys_are_short_words() {
    assert!(is_selector("Contact"));
    assert!(is_selector("user_list2"));
    assert!(!is_selector(""));
    assert!(!is_selector("../etc"));
    assert!(!is_selector("Contact Model"));
    assert!(!is_selector(&"a".repeat(33)));
}

#[test]
fn lookups_are_case_insensitive_and_canonical() {
    let registry = Registry::new(SiteInfo::default())
        .plugin("Contact", || Route::new(Echo, Echo))
        .theme("Simple", || Bare);
    assert_eq!(registry.canonical_object("contact"), Some("Contact"));
    assert_eq!(registry.canonical_object("CONTACT"), Some("Contact"));
    assert_eq!(registry.canonical_object("ContactModel"), None);
    assert_eq!(registry.canonical_theme("simple"), Some("Simple"));
    assert_eq!(registry.nav2(), &[NavItem::new("Simple", "Simple")]);
}

#[test]
fn first_registrations_become_defaults() {
    let registry = Registry::new(SiteInfo::default())
        .plugin("Home", || Route::new(Echo, Echo))
        .plugin("About", || Route::new(Echo, Echo))
        .theme("Simple", || Bare)
        .theme("Dark", || Bare);
    assert_eq!(
        registry.validate(),
        Ok(("Home".to_string(), "Simple".to_string()))
    );
}

#[test]
fn validation_rejects_unusable_tables() {
    let no_theme = Registry::new(SiteInfo::default()).plugin("Home", || Route::new(Echo, Echo));
    assert_eq!(no_theme.validate(), Err(RegistryError::NoTheme));

    let bad_default = Registry::new(SiteInfo::default())
        .plugin("Home", || Route::new(Echo, Echo))
        .theme("Simple", || Bare)
        .default_object("Missing");
    assert_eq!(
        bad_default.validate(),
        Err(RegistryError::UnknownDefaultObject("Missing".into()))
    );

    let bad_key = Registry::new(SiteInfo::default())
        .plugin("Home<script>", || Route::new(Echo, Echo))
        .theme("Simple", || Bare);
    assert_eq!(
        bad_key.validate(),
        Err(RegistryError::InvalidKey("Home<script>".into()))
    );
}
