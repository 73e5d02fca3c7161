use dispatch::{
    util::{flash, redirect, session_user, USER_KEY},
    Ctx, DispatchError, Outcome,
};
use shared::domain::{Role, SessionUser};
use storage::{Params, RecordExt};

pub mod about;
pub mod auth;
pub mod contact;
pub mod home;
pub mod profile;
pub mod users;

pub(crate) const VISIT_COUNT: &str = "visit_count";
pub(crate) const LAST_PAGE: &str = "last_page";

/// A same-site link that keeps the current theme.
pub(crate) fn link(ctx: &Ctx, query: &str) -> String {
    format!("?{query}&t={}", ctx.input.t)
}

/// Guard clause for plugins that need a signed-in user. Anyone else is sent
/// to the sign-in page with a note.
pub(crate) fn signed_in<T>(ctx: &mut Ctx) -> Result<SessionUser, Outcome<T>> {
    match session_user(ctx) {
        Some(user) => Ok(user),
        None => {
            flash(&mut ctx.session, "info", "Please sign in first.");
            Err(redirect(link(ctx, "o=Auth")))
        }
    }
}

/// Like [`signed_in`], but re-reads the account so a role change or deletion
/// made by someone else applies on the next request. The session copy is
/// refreshed; a vanished account is signed out.
pub(crate) async fn signed_in_fresh<T>(
    ctx: &mut Ctx,
) -> Result<Result<SessionUser, Outcome<T>>, DispatchError> {
    let user = match signed_in(ctx) {
        Ok(user) => user,
        Err(outcome) => return Ok(Err(outcome)),
    };
    let row = ctx
        .db()?
        .read_one(
            "users",
            "username, role",
            "WHERE id = :id",
            &Params::new().with("id", user.user_id.0),
        )
        .await?;
    let Some(row) = row else {
        ctx.session.remove(USER_KEY);
        flash(&mut ctx.session, "danger", "Your account no longer exists.");
        return Ok(Err(redirect(link(ctx, "o=Auth"))));
    };

    let current = SessionUser {
        user_id: user.user_id,
        username: row.text("username").to_string(),
        role: Role::parse(row.text("role")),
    };
    ctx.session.set(USER_KEY, &current);
    Ok(Ok(current))
}

pub(crate) fn record_visit(ctx: &mut Ctx, page: &str) {
    ctx.session.set(LAST_PAGE, page);
}
