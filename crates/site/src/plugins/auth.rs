use async_trait::async_trait;
use dispatch::{
    util::{esc, flash, flash_now, is_post, redirect, session_user, USER_KEY},
    Action, Ctx, ModelResult, Outcome, Plugin, View,
};
use shared::domain::{Role, SessionUser, UserId};
use storage::{hash_password, new_salt, verify_password, Params, RecordExt};
use tracing::{info, warn};

use super::{link, signed_in};

const MIN_PASSWORD_LEN: usize = 8;

pub enum AuthPayload {
    SignIn { username: String },
    SignedIn(SessionUser),
    ChangePassword,
}

/// Sign in (`create`), change password (`update`), sign out (`delete`).
pub struct AuthModel;

#[async_trait]
impl Plugin for AuthModel {
    type Payload = AuthPayload;

    const ACTIONS: &'static [Action] = &[
        Action::List,
        Action::Create,
        Action::Update,
        Action::Delete,
    ];

    async fn list(&self, ctx: &mut Ctx) -> ModelResult<AuthPayload> {
        Ok(Outcome::Render(match session_user(ctx) {
            Some(user) => AuthPayload::SignedIn(user),
            None => AuthPayload::SignIn {
                username: String::new(),
            },
        }))
    }

    async fn create(&self, ctx: &mut Ctx) -> ModelResult<AuthPayload> {
        if !is_post(ctx) {
            return self.list(ctx).await;
        }

        let username = ctx.param_or_default("username");
        let password = ctx.param_or_default("password");
        if username.is_empty() || password.is_empty() {
            flash_now(ctx, "danger", "Username and password are required.");
            return Ok(Outcome::Render(AuthPayload::SignIn { username }));
        }

        let row = ctx
            .db()?
            .read_one(
                "users",
                "id, username, role, salt, password_hash",
                "WHERE username = :username",
                &Params::new().with("username", username.as_str()),
            )
            .await?;

        let user = row.and_then(|row| {
            verify_password(row.text("salt"), &password, row.text("password_hash")).then(|| {
                SessionUser {
                    user_id: UserId(row.int("id").unwrap_or_default()),
                    username: row.text("username").to_string(),
                    role: Role::parse(row.text("role")),
                }
            })
        });

        let Some(user) = user else {
            warn!(%username, "failed sign in");
            flash_now(ctx, "danger", "Invalid username or password.");
            return Ok(Outcome::Render(AuthPayload::SignIn { username }));
        };

        info!(user_id = user.user_id.0, "signed in");
        flash(
            &mut ctx.session,
            "success",
            format!("Welcome back, {}.", user.username),
        );
        ctx.session.set(USER_KEY, user);
        Ok(redirect(link(ctx, "o=Home")))
    }

    async fn update(&self, ctx: &mut Ctx) -> ModelResult<AuthPayload> {
        let user = match signed_in(ctx) {
            Ok(user) => user,
            Err(outcome) => return Ok(outcome),
        };
        if !is_post(ctx) {
            return Ok(Outcome::Render(AuthPayload::ChangePassword));
        }

        let current = ctx.param_or_default("current");
        let next = ctx.param_or_default("password");
        if next.chars().count() < MIN_PASSWORD_LEN {
            flash_now(
                ctx,
                "danger",
                format!("The new password needs at least {MIN_PASSWORD_LEN} characters."),
            );
            return Ok(Outcome::Render(AuthPayload::ChangePassword));
        }

        let db = ctx.db()?.clone();
        let by_id = Params::new().with("id", user.user_id.0);
        let row = db
            .read_one("users", "salt, password_hash", "WHERE id = :id", &by_id)
            .await?;
        let verified = row
            .as_ref()
            .is_some_and(|row| verify_password(row.text("salt"), &current, row.text("password_hash")));
        if !verified {
            flash_now(ctx, "danger", "The current password is not correct.");
            return Ok(Outcome::Render(AuthPayload::ChangePassword));
        }

        let salt = new_salt();
        let set = Params::new()
            .with("password_hash", hash_password(&salt, &next))
            .with("salt", salt);
        db.update("users", &set, "WHERE id = :id", &by_id).await?;
        info!(user_id = user.user_id.0, "password changed");
        flash(&mut ctx.session, "success", "Password changed.");
        Ok(redirect(link(ctx, "o=Profile")))
    }

    async fn delete(&self, ctx: &mut Ctx) -> ModelResult<AuthPayload> {
        if !is_post(ctx) {
            return self.list(ctx).await;
        }
        if ctx.session.remove(USER_KEY).is_some() {
            flash(&mut ctx.session, "info", "You have been signed out.");
        }
        Ok(redirect(link(ctx, "o=Home")))
    }
}

pub struct AuthView;

impl View for AuthView {
    type Payload = AuthPayload;

    fn list(&self, ary: &AuthPayload, ctx: &Ctx) -> String {
        match ary {
            AuthPayload::SignIn { username } => format!(
                r#"<section class="auth">
<h2>Sign in</h2>
<form method="post" action="{action}">
<label>Username <input type="text" name="username" value="{username}" required></label>
<label>Password <input type="password" name="password" required></label>
<button type="submit">Sign in</button>
</form>
</section>"#,
                action = link(ctx, "o=Auth&m=create"),
                username = esc(username),
            ),
            AuthPayload::SignedIn(user) => format!(
                r#"<section class="auth">
<h2>Signed in</h2>
<p>You are signed in as <strong>{}</strong>.</p>
<p><a href="{}">Change password</a></p>
<form method="post" action="{}">
<button type="submit">Sign out</button>
</form>
</section>"#,
                esc(&user.username),
                link(ctx, "o=Auth&m=update"),
                link(ctx, "o=Auth&m=delete"),
            ),
            AuthPayload::ChangePassword => format!(
                r#"<section class="auth">
<h2>Change password</h2>
<form method="post" action="{action}">
<label>Current password <input type="password" name="current" required></label>
<label>New password <input type="password" name="password" minlength="{MIN_PASSWORD_LEN}" required></label>
<button type="submit">Change</button>
</form>
</section>"#,
                action = link(ctx, "o=Auth&m=update"),
            ),
        }
    }
}
