use async_trait::async_trait;
use dispatch::{
    util::{esc, flash, flash_now, is_email, is_post, redirect, USER_KEY},
    Action, Ctx, ModelResult, Outcome, Plugin, View,
};
use shared::domain::SessionUser;
use storage::{Params, RecordExt};

use super::{link, signed_in};

pub struct ProfilePayload {
    pub user: SessionUser,
    pub email: String,
    pub created_at: String,
}

pub struct ProfileModel;

impl ProfileModel {
    /// Loads the stored record for the signed-in user. A session that points
    /// at a deleted account is signed out.
    async fn load(&self, ctx: &mut Ctx, user: SessionUser) -> ModelResult<ProfilePayload> {
        let row = ctx
            .db()?
            .read_one(
                "users",
                "email, created_at",
                "WHERE id = :id",
                &Params::new().with("id", user.user_id.0),
            )
            .await?;
        let Some(row) = row else {
            ctx.session.remove(USER_KEY);
            flash(&mut ctx.session, "danger", "Your account no longer exists.");
            return Ok(redirect(link(ctx, "o=Auth")));
        };
        Ok(Outcome::Render(ProfilePayload {
            user,
            email: row.text("email").to_string(),
            created_at: row.text("created_at").to_string(),
        }))
    }
}

#[async_trait]
impl Plugin for ProfileModel {
    type Payload = ProfilePayload;

    const ACTIONS: &'static [Action] = &[Action::List, Action::Update];

    async fn list(&self, ctx: &mut Ctx) -> ModelResult<ProfilePayload> {
        match signed_in(ctx) {
            Ok(user) => self.load(ctx, user).await,
            Err(outcome) => Ok(outcome),
        }
    }

    async fn update(&self, ctx: &mut Ctx) -> ModelResult<ProfilePayload> {
        let user = match signed_in(ctx) {
            Ok(user) => user,
            Err(outcome) => return Ok(outcome),
        };
        if !is_post(ctx) {
            return self.load(ctx, user).await;
        }

        let email = ctx.param_or_default("email");
        if !is_email(&email) {
            flash_now(ctx, "danger", "Please enter a valid email address.");
            return Ok(self.load(ctx, user).await?.map(|mut payload| {
                payload.email = email;
                payload
            }));
        }

        let changed = ctx
            .db()?
            .update(
                "users",
                &Params::new().with("email", email.as_str()),
                "WHERE id = :id",
                &Params::new().with("id", user.user_id.0),
            )
            .await?;
        if changed == 0 {
            return self.load(ctx, user).await;
        }
        flash(&mut ctx.session, "success", "Profile updated.");
        Ok(redirect(link(ctx, "o=Profile")))
    }
}

pub struct ProfileView;

impl View for ProfileView {
    type Payload = ProfilePayload;

    fn list(&self, ary: &ProfilePayload, ctx: &Ctx) -> String {
        format!(
            r#"<section class="profile">
<h2>Profile</h2>
<dl>
<dt>Username</dt><dd>{username}</dd>
<dt>Role</dt><dd>{role}</dd>
<dt>Member since</dt><dd>{created}</dd>
</dl>
<form method="post" action="{action}">
<label>Email <input type="email" name="email" value="{email}" required></label>
<button type="submit">Update</button>
</form>
<p><a href="{password}">Change password</a></p>
</section>"#,
            username = esc(&ary.user.username),
            role = ary.user.role.as_str(),
            created = esc(&ary.created_at),
            action = link(ctx, "o=Profile&m=update"),
            email = esc(&ary.email),
            password = link(ctx, "o=Auth&m=update"),
        )
    }
}
