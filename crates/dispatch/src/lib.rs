//! Request dispatch core: resolves the `o`/`m`/`t` selectors against a
//! registry of plugin/view pairs and themes, runs the selected action and
//! wraps the result in page chrome.

pub mod ctx;
pub mod error;
pub mod init;
pub mod plugin;
pub mod registry;
pub mod session;
pub mod theme;
pub mod util;

pub use ctx::{Ctx, Input, Method, NavItem, Out, Request, SiteInfo};
pub use error::{DispatchError, RegistryError};
pub use init::{Init, Response, Status};
pub use plugin::{Action, Endpoint, ModelResult, Outcome, Plugin, Redirect, Route, View};
pub use registry::Registry;
pub use session::Session;
pub use theme::Theme;
