use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use futures::FutureExt;
use shared::error::ErrorCode;
use tracing::{debug, error, info, warn};

use crate::{
    ctx::{Ctx, Input, NavItem, SiteInfo},
    error::{DispatchError, RegistryError},
    plugin::{Action, Outcome},
    registry::{Registry, ThemeFactory},
    theme::Theme,
    util::{self, esc},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotFound,
    ServerError,
}

impl Status {
    pub fn as_u16(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::NotFound => 404,
            Status::ServerError => 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Page { status: Status, body: String },
    Redirect { location: String },
}

/// The dispatcher. Owns the registry and turns one [`Ctx`] into one
/// [`Response`]; every failure is rendered through the theme.
pub struct Init {
    registry: Registry,
    site: Arc<SiteInfo>,
    nav1: Arc<[NavItem]>,
    nav2: Arc<[NavItem]>,
    default_object: String,
    default_theme: String,
    fallback_theme: ThemeFactory,
}

impl Init {
    pub fn new(registry: Registry) -> Result<Self, RegistryError> {
        let (default_object, default_theme) = registry.validate()?;
        let fallback_theme = registry
            .theme_factory(&default_theme)
            .ok_or_else(|| RegistryError::UnknownDefaultTheme(default_theme.clone()))?;
        Ok(Self {
            site: Arc::new(registry.site().clone()),
            nav1: Arc::from(registry.nav1().to_vec()),
            nav2: Arc::from(registry.nav2().to_vec()),
            registry,
            default_object,
            default_theme,
            fallback_theme,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub async fn dispatch(&self, ctx: &mut Ctx) -> Response {
        let routed = self.normalize(ctx);
        let theme = self.theme(&ctx.input.t);
        debug!(o = %ctx.input.o, m = ctx.input.m.as_str(), t = %ctx.input.t, "dispatch");

        let result = match routed {
            Ok(()) => self.run(ctx).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(Outcome::Render(main)) => self.page(theme.as_ref(), ctx, Status::Ok, main),
            Ok(Outcome::Redirect(redirect)) => {
                info!(location = %redirect.location, "redirect");
                util::requeue_flash(ctx);
                Response::Redirect {
                    location: redirect.location,
                }
            }
            Err(err) => {
                let code = err.code();
                let status = match code {
                    ErrorCode::NotFound => {
                        warn!(%err, "routing failed");
                        Status::NotFound
                    }
                    ErrorCode::DataAccess | ErrorCode::Internal => {
                        error!(%err, o = %ctx.input.o, "dispatch failed");
                        Status::ServerError
                    }
                };
                let fragment = error_fragment(&err);
                self.page(theme.as_ref(), ctx, status, fragment)
            }
        }
    }

    /// Wraps `main` in the theme. A theme that panics is replaced by the
    /// default theme showing an internal error, or by a bare document when
    /// the default theme is the one that failed.
    fn page(&self, theme: &dyn Theme, ctx: &mut Ctx, status: Status, main: String) -> Response {
        let panic = match panic::catch_unwind(AssertUnwindSafe(|| theme.render(ctx, main))) {
            Ok(body) => return Response::Page { status, body },
            Err(panic) => panic,
        };
        error!(t = %ctx.input.t, panic = %panic_message(panic), "theme failed");

        let default_failed = ctx.input.t == self.default_theme;
        ctx.input.t = self.default_theme.clone();
        let fragment = error_fragment(&DispatchError::Internal(String::new()));
        let body = if default_failed {
            bare_document(ctx, &fragment)
        } else {
            let fallback = (self.fallback_theme)();
            let rendered =
                panic::catch_unwind(AssertUnwindSafe(|| fallback.render(ctx, fragment.clone())));
            rendered.unwrap_or_else(|_| bare_document(ctx, &fragment))
        };
        Response::Page {
            status: Status::ServerError,
            body,
        }
    }

    /// Resolves `o`, `m` and `t` onto the context. Missing selectors take the
    /// defaults; an `o` that names nothing registered is a routing error.
    fn normalize(&self, ctx: &mut Ctx) -> Result<(), DispatchError> {
        ctx.site = self.site.clone();
        ctx.nav1 = self.nav1.clone();
        ctx.nav2 = self.nav2.clone();

        let m = Action::parse(ctx.param("m"));
        let t = ctx
            .param("t")
            .and_then(|raw| self.registry.canonical_theme(raw))
            .unwrap_or(self.default_theme.as_str())
            .to_string();

        let (o, routed) = match ctx.param("o") {
            None => (self.default_object.clone(), Ok(())),
            Some(raw) => match self.registry.canonical_object(raw) {
                Some(key) => (key.to_string(), Ok(())),
                None => (
                    self.default_object.clone(),
                    Err(DispatchError::NotFound(raw.to_string())),
                ),
            },
        };

        ctx.input = Input { o, m, t };
        routed
    }

    fn theme(&self, key: &str) -> Box<dyn Theme> {
        let factory = self
            .registry
            .theme_factory(key)
            .unwrap_or_else(|| self.fallback_theme.clone());
        factory()
    }

    async fn run(&self, ctx: &mut Ctx) -> Result<Outcome<String>, DispatchError> {
        let Some(endpoint) = self.registry.endpoint(&ctx.input.o) else {
            return Err(DispatchError::NotFound(ctx.input.o.clone()));
        };
        let action = ctx.input.m;

        match AssertUnwindSafe(endpoint.run(action, ctx)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(DispatchError::Internal(panic_message(panic))),
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|msg| msg.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "plugin panicked".to_string())
}

/// The content fragment for a failed request. Driver and panic detail stay
/// in the log; only the routing miss names what was asked for.
fn error_fragment(err: &DispatchError) -> String {
    let code = err.code();
    let detail = match err {
        DispatchError::NotFound(name) => {
            format!(r#"<p>Nothing is registered under "{}".</p>"#, esc(name))
        }
        _ => String::new(),
    };
    format!(
        r#"<section class="error error-{code:?}"><h2>{}</h2><p>{}</p>{detail}</section>"#,
        code.title(),
        code.public_message()
    )
}

fn bare_document(ctx: &Ctx, fragment: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n<body><main>{fragment}</main></body>\n</html>\n",
        esc(&ctx.site.name)
    )
}

#[cfg(test)]
#[path = "tests/init_tests.rs"]
mod tests;
