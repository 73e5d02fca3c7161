//! The site built on the dispatch core: its plugins, views and themes, and
//! the registry that wires them to selector keys.

use dispatch::{Registry, Route, SiteInfo};

pub mod plugins;
pub mod themes;

use plugins::{
    about::{AboutModel, AboutView},
    auth::{AuthModel, AuthView},
    contact::{ContactModel, ContactView},
    home::{HomeModel, HomeView},
    profile::{ProfileModel, ProfileView},
    users::{UsersModel, UsersView},
};
use themes::{DarkTheme, SimpleTheme};

pub fn registry(site: SiteInfo) -> Registry {
    Registry::new(site)
        .plugin("Home", || Route::new(HomeModel, HomeView))
        .plugin("About", || Route::new(AboutModel, AboutView))
        .plugin("Contact", || Route::new(ContactModel, ContactView))
        .plugin("Auth", || Route::new(AuthModel, AuthView))
        .plugin("Profile", || Route::new(ProfileModel, ProfileView))
        .plugin("Users", || Route::new(UsersModel, UsersView))
        .menu("Home", "Home")
        .menu("About", "About")
        .menu("Contact", "Contact")
        .menu("Users", "Users")
        .menu("Profile", "Profile")
        .menu("Sign in", "Auth")
        .theme("Simple", || SimpleTheme)
        .theme("Dark", || DarkTheme)
}
