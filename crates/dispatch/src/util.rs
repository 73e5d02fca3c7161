//! Small helpers shared by plugins, views and the dispatcher.

use shared::domain::{Flash, SessionUser};

use crate::{
    ctx::{Ctx, Method},
    plugin::{Outcome, Redirect},
    session::Session,
};

pub(crate) const FLASH_KEY: &str = "_flash";
pub const USER_KEY: &str = "user";

/// Stops the current response and sends the browser to `target`.
pub fn redirect<T>(target: impl Into<String>) -> Outcome<T> {
    Outcome::Redirect(Redirect {
        location: target.into(),
    })
}

/// Queues a message for the next rendered page. A second message with the
/// same key replaces the first.
pub fn flash(session: &mut Session, key: &str, message: impl Into<String>) {
    let mut queued: Vec<Flash> = session.get(FLASH_KEY).unwrap_or_default();
    queue(&mut queued, Flash::new(key, message));
    session.set(FLASH_KEY, queued);
}

/// Shows a message on the page being rendered now, without touching the
/// session.
pub fn flash_now(ctx: &mut Ctx, key: &str, message: impl Into<String>) {
    queue(ctx.flash_mut(), Flash::new(key, message));
}

/// Removes and returns every queued message.
pub fn take_flash(session: &mut Session) -> Vec<Flash> {
    session
        .remove(FLASH_KEY)
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default()
}

/// Puts messages that were due on this request back in the queue because the
/// response is a redirect and nothing was rendered.
pub(crate) fn requeue_flash(ctx: &mut Ctx) {
    let pending: Vec<Flash> = std::mem::take(ctx.flash_mut());
    if pending.is_empty() {
        return;
    }
    let mut queued: Vec<Flash> = ctx.session.get(FLASH_KEY).unwrap_or_default();
    for message in pending {
        if !queued.iter().any(|existing| existing.key == message.key) {
            queued.push(message);
        }
    }
    ctx.session.set(FLASH_KEY, queued);
}

fn queue(queued: &mut Vec<Flash>, message: Flash) {
    match queued.iter_mut().find(|existing| existing.key == message.key) {
        Some(existing) => *existing = message,
        None => queued.push(message),
    }
}

pub fn is_post(ctx: &Ctx) -> bool {
    ctx.method() == Method::Post
}

pub fn session_user(ctx: &Ctx) -> Option<SessionUser> {
    ctx.session.get(USER_KEY)
}

pub fn is_authenticated_user(ctx: &Ctx) -> bool {
    session_user(ctx).is_some()
}

/// HTML-escapes text for element content and quoted attribute values.
pub fn esc(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Loose email shape check: one `@`, something before it, a dotted domain
/// after it, no whitespace.
pub fn is_email(input: &str) -> bool {
    let Some((local, domain)) = input.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !input.chars().any(char::is_whitespace)
}

#[cfg(test)]
#[path = "tests/util_tests.rs"]
mod tests;
