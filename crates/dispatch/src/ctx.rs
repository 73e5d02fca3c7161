use std::{collections::HashMap, sync::Arc};

use shared::domain::Flash;
use storage::Db;

use crate::{error::DispatchError, plugin::Action, session::Session, util};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
}

/// The transport-neutral view of one HTTP request: its method and the merged
/// query-string and form fields (form fields win on conflict).
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub method: Method,
    pub params: HashMap<String, String>,
}

impl Request {
    pub fn get<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            method: Method::Get,
            params: params
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    pub fn post<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            method: Method::Post,
            ..Self::get(params)
        }
    }
}

/// Normalised routing selectors. Filled in by the dispatcher before any
/// plugin runs; `o` and `t` are always canonical registry keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Input {
    pub o: String,
    pub m: Action,
    pub t: String,
}

/// A navigation entry: label shown to the user, registry key it selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavItem {
    pub label: String,
    pub key: String,
}

impl NavItem {
    pub fn new(label: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            key: key.into(),
        }
    }
}

/// Read-only site facts injected from configuration at process start.
#[derive(Debug, Clone)]
pub struct SiteInfo {
    pub name: String,
    pub mail_from: String,
}

impl Default for SiteInfo {
    fn default() -> Self {
        Self {
            name: "Site".into(),
            mail_from: "noreply@localhost".into(),
        }
    }
}

/// Page fragments assembled by the theme for the final document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Out {
    pub doc: String,
    pub css: String,
    pub js: String,
    pub head: String,
    pub nav1: String,
    pub nav2: String,
    pub msg: String,
    pub main: String,
    pub foot: String,
}

/// Per-request context shared by reference with the plugin, view and theme.
pub struct Ctx {
    pub input: Input,
    pub session: Session,
    pub out: Out,
    pub nav1: Arc<[NavItem]>,
    pub nav2: Arc<[NavItem]>,
    pub site: Arc<SiteInfo>,
    request: Request,
    flash: Vec<Flash>,
    db: Option<Db>,
}

impl Ctx {
    /// Builds the context and takes the flash messages that were queued for
    /// this request out of the session.
    pub fn new(request: Request, mut session: Session) -> Self {
        let flash = util::take_flash(&mut session);
        Self {
            input: Input::default(),
            session,
            out: Out::default(),
            nav1: Arc::from(Vec::new()),
            nav2: Arc::from(Vec::new()),
            site: Arc::new(SiteInfo::default()),
            request,
            flash,
            db: None,
        }
    }

    pub fn with_db(mut self, db: Db) -> Self {
        self.db = Some(db);
        self
    }

    pub fn db(&self) -> Result<&Db, DispatchError> {
        self.db.as_ref().ok_or(DispatchError::NoDatabase)
    }

    pub fn method(&self) -> Method {
        self.request.method
    }

    /// A raw input field, trimmed. Empty values read as absent.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.request
            .params
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    pub fn param_or_default(&self, name: &str) -> String {
        self.param(name).unwrap_or_default().to_string()
    }

    /// Messages to show on the page being rendered now.
    pub fn flash(&self) -> &[Flash] {
        &self.flash
    }

    pub(crate) fn flash_mut(&mut self) -> &mut Vec<Flash> {
        &mut self.flash
    }

    pub fn into_session(self) -> Session {
        self.session
    }
}
