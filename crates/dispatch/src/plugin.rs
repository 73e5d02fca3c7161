//! Model and view contracts, and the `Route` that pairs them.
//!
//! A [`Plugin`] produces a typed payload for an action; the [`View`] with the
//! same payload type turns it into an HTML fragment. The dispatcher only sees
//! the pair through the object-safe [`Endpoint`] trait, so each registry entry
//! can carry its own payload type.

use async_trait::async_trait;
use tracing::debug;

use crate::{ctx::Ctx, error::DispatchError};

/// The action selected by `m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Action {
    #[default]
    List,
    Create,
    Read,
    Update,
    Delete,
    Save,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::List,
        Action::Create,
        Action::Read,
        Action::Update,
        Action::Delete,
        Action::Save,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Save => "save",
        }
    }

    /// Unknown or missing action names read as `list`.
    pub fn parse(raw: Option<&str>) -> Self {
        raw.map(str::trim)
            .and_then(|raw| {
                Self::ALL
                    .into_iter()
                    .find(|action| action.as_str().eq_ignore_ascii_case(raw))
            })
            .unwrap_or_default()
    }
}

/// Where the browser should go next. Carried back to the dispatcher instead
/// of being emitted by the plugin, so nothing renders after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Render(T),
    Redirect(Redirect),
}

impl<T> Outcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Render(value) => Outcome::Render(f(value)),
            Outcome::Redirect(redirect) => Outcome::Redirect(redirect),
        }
    }
}

pub type ModelResult<T> = Result<Outcome<T>, DispatchError>;

/// Business logic for one routed object.
///
/// `list` is required; the other actions default to `list`. Only actions named
/// in [`Plugin::ACTIONS`] are ever dispatched, anything else falls back to
/// `list` before the plugin is called.
#[async_trait]
pub trait Plugin: Send + Sync {
    type Payload: Send + Sync;

    const ACTIONS: &'static [Action] = &[Action::List];

    async fn list(&self, ctx: &mut Ctx) -> ModelResult<Self::Payload>;

    async fn create(&self, ctx: &mut Ctx) -> ModelResult<Self::Payload> {
        self.list(ctx).await
    }

    async fn read(&self, ctx: &mut Ctx) -> ModelResult<Self::Payload> {
        self.list(ctx).await
    }

    async fn update(&self, ctx: &mut Ctx) -> ModelResult<Self::Payload> {
        self.list(ctx).await
    }

    async fn delete(&self, ctx: &mut Ctx) -> ModelResult<Self::Payload> {
        self.list(ctx).await
    }

    async fn save(&self, ctx: &mut Ctx) -> ModelResult<Self::Payload> {
        self.list(ctx).await
    }
}

/// Renders a plugin payload into an HTML fragment. Views read the context but
/// never touch the session. Values that came from user input must be escaped
/// with [`crate::util::esc`].
pub trait View: Send + Sync {
    type Payload;

    fn list(&self, ary: &Self::Payload, ctx: &Ctx) -> String;

    fn create(&self, ary: &Self::Payload, ctx: &Ctx) -> String {
        self.list(ary, ctx)
    }

    fn read(&self, ary: &Self::Payload, ctx: &Ctx) -> String {
        self.list(ary, ctx)
    }

    fn update(&self, ary: &Self::Payload, ctx: &Ctx) -> String {
        self.list(ary, ctx)
    }

    fn delete(&self, ary: &Self::Payload, ctx: &Ctx) -> String {
        self.list(ary, ctx)
    }

    fn save(&self, ary: &Self::Payload, ctx: &Ctx) -> String {
        self.list(ary, ctx)
    }
}

/// What the dispatcher stores in the registry: run an action end to end and
/// hand back the content fragment.
#[async_trait]
pub trait Endpoint: Send + Sync {
    async fn run(&self, requested: Action, ctx: &mut Ctx) -> ModelResult<String>;
}

pub struct Route<P, V> {
    plugin: P,
    view: V,
}

impl<P, V> Route<P, V>
where
    P: Plugin,
    V: View<Payload = P::Payload>,
{
    pub fn new(plugin: P, view: V) -> Self {
        Self { plugin, view }
    }

    /// The action that will actually run for `requested`.
    pub fn resolve(requested: Action) -> Action {
        if P::ACTIONS.contains(&requested) {
            requested
        } else {
            Action::List
        }
    }
}

#[async_trait]
impl<P, V> Endpoint for Route<P, V>
where
    P: Plugin,
    V: View<Payload = P::Payload>,
{
    async fn run(&self, requested: Action, ctx: &mut Ctx) -> ModelResult<String> {
        let action = Self::resolve(requested);
        if action != requested {
            debug!(requested = requested.as_str(), "action not supported, using list");
        }
        ctx.input.m = action;

        let outcome = match action {
            Action::List => self.plugin.list(ctx).await?,
            Action::Create => self.plugin.create(ctx).await?,
            Action::Read => self.plugin.read(ctx).await?,
            Action::Update => self.plugin.update(ctx).await?,
            Action::Delete => self.plugin.delete(ctx).await?,
            Action::Save => self.plugin.save(ctx).await?,
        };

        Ok(outcome.map(|ary| {
            let ctx: &Ctx = ctx;
            match action {
                Action::List => self.view.list(&ary, ctx),
                Action::Create => self.view.create(&ary, ctx),
                Action::Read => self.view.read(&ary, ctx),
                Action::Update => self.view.update(&ary, ctx),
                Action::Delete => self.view.delete(&ary, ctx),
                Action::Save => self.view.save(&ary, ctx),
            }
        }))
    }
}
