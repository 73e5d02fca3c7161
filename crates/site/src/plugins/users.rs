//! Account administration over the `users` table. Any signed-in user may
//! browse; changes need the admin role.

use async_trait::async_trait;
use dispatch::{
    util::{esc, flash, flash_now, is_email, is_post, redirect},
    Action, Ctx, DispatchError, ModelResult, Outcome, Plugin, View,
};
use shared::domain::{Role, SessionUser};
use storage::{hash_password, new_salt, Params, Record, RecordExt};
use tracing::info;

use super::{link, signed_in, signed_in_fresh};

const COLUMNS: &str = "id, username, email, role, created_at";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: String,
}

impl From<Record> for UserRow {
    fn from(record: Record) -> Self {
        Self {
            id: record.int("id").unwrap_or_default(),
            username: record.text("username").to_string(),
            email: record.text("email").to_string(),
            role: Role::parse(record.text("role")),
            created_at: record.text("created_at").to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserForm {
    pub id: Option<i64>,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl UserForm {
    fn from_input(ctx: &Ctx, id: Option<i64>) -> Self {
        Self {
            id,
            username: ctx.param_or_default("username"),
            email: ctx.param_or_default("email"),
            role: Role::parse(ctx.param("role").unwrap_or_default()),
        }
    }

    fn problem(&self) -> Option<&'static str> {
        if self.username.is_empty()
            || !self
                .username
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' || ch == '-')
        {
            return Some("Usernames use letters, digits, '.', '-' and '_' only.");
        }
        if !self.email.is_empty() && !is_email(&self.email) {
            return Some("Please enter a valid email address.");
        }
        None
    }
}

pub enum UsersPayload {
    Listing { users: Vec<UserRow>, total: i64 },
    Detail(UserRow),
    Form(UserForm),
}

pub struct UsersModel;

impl UsersModel {
    /// Guard for changes. The role is checked against the stored account,
    /// not the copy taken at sign-in.
    async fn admin<T>(
        &self,
        ctx: &mut Ctx,
    ) -> Result<Result<SessionUser, Outcome<T>>, DispatchError> {
        let user = match signed_in_fresh(ctx).await? {
            Ok(user) => user,
            Err(outcome) => return Ok(Err(outcome)),
        };
        if user.is_admin() {
            Ok(Ok(user))
        } else {
            flash(&mut ctx.session, "danger", "Administrator access required.");
            Ok(Err(redirect(link(ctx, "o=Users"))))
        }
    }

    fn selected_id(ctx: &Ctx) -> Option<i64> {
        ctx.param("i").and_then(|raw| raw.parse().ok())
    }

    fn not_found<T>(ctx: &mut Ctx) -> Outcome<T> {
        flash(&mut ctx.session, "danger", "No such user.");
        redirect(link(ctx, "o=Users"))
    }

    async fn find(ctx: &Ctx, id: i64) -> Result<Option<UserRow>, DispatchError> {
        let row = ctx
            .db()?
            .read_one("users", COLUMNS, "WHERE id = :id", &Params::new().with("id", id))
            .await?;
        Ok(row.map(UserRow::from))
    }
}

#[async_trait]
impl Plugin for UsersModel {
    type Payload = UsersPayload;

    const ACTIONS: &'static [Action] = &[
        Action::List,
        Action::Create,
        Action::Read,
        Action::Update,
        Action::Delete,
    ];

    async fn list(&self, ctx: &mut Ctx) -> ModelResult<UsersPayload> {
        if let Err(outcome) = signed_in(ctx) {
            return Ok(outcome);
        }
        let db = ctx.db()?;
        let users = db
            .read_all("users", COLUMNS, "ORDER BY username", &Params::new())
            .await?
            .into_iter()
            .map(UserRow::from)
            .collect();
        let total = db
            .read_column("users", "COUNT(*)", "", &Params::new())
            .await?
            .and_then(|value| value.as_i64())
            .unwrap_or_default();
        Ok(Outcome::Render(UsersPayload::Listing { users, total }))
    }

    async fn read(&self, ctx: &mut Ctx) -> ModelResult<UsersPayload> {
        if let Err(outcome) = signed_in(ctx) {
            return Ok(outcome);
        }
        let Some(id) = Self::selected_id(ctx) else {
            return self.list(ctx).await;
        };
        let found = Self::find(ctx, id).await?;
        match found {
            Some(row) => Ok(Outcome::Render(UsersPayload::Detail(row))),
            None => Ok(Self::not_found(ctx)),
        }
    }

    async fn create(&self, ctx: &mut Ctx) -> ModelResult<UsersPayload> {
        if let Err(outcome) = self.admin(ctx).await? {
            return Ok(outcome);
        }
        if !is_post(ctx) {
            return Ok(Outcome::Render(UsersPayload::Form(UserForm::default())));
        }

        let form = UserForm::from_input(ctx, None);
        let password = ctx.param_or_default("password");
        let problem = form.problem().or_else(|| {
            password
                .is_empty()
                .then_some("A password is required for new users.")
        });
        if let Some(problem) = problem {
            flash_now(ctx, "danger", problem);
            return Ok(Outcome::Render(UsersPayload::Form(form)));
        }

        let salt = new_salt();
        let values = Params::new()
            .with("username", form.username.as_str())
            .with("email", form.email.as_str())
            .with("role", form.role.as_str())
            .with("password_hash", hash_password(&salt, &password))
            .with("salt", salt);
        let inserted = ctx.db()?.insert("users", &values).await;
        match inserted {
            Ok(id) => {
                info!(user_id = id, username = %form.username, "user created");
                flash(
                    &mut ctx.session,
                    "success",
                    format!("User {} created.", form.username),
                );
                Ok(redirect(link(ctx, &format!("o=Users&m=read&i={id}"))))
            }
            Err(err) if err.is_unique_violation() => {
                flash_now(ctx, "danger", "That username is already taken.");
                Ok(Outcome::Render(UsersPayload::Form(form)))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn update(&self, ctx: &mut Ctx) -> ModelResult<UsersPayload> {
        if let Err(outcome) = self.admin(ctx).await? {
            return Ok(outcome);
        }
        let Some(id) = Self::selected_id(ctx) else {
            return Ok(Self::not_found(ctx));
        };
        if !is_post(ctx) {
            let found = Self::find(ctx, id).await?;
            return match found {
                Some(row) => Ok(Outcome::Render(UsersPayload::Form(UserForm {
                    id: Some(row.id),
                    username: row.username,
                    email: row.email,
                    role: row.role,
                }))),
                None => Ok(Self::not_found(ctx)),
            };
        }

        let form = UserForm::from_input(ctx, Some(id));
        if let Some(problem) = form.problem() {
            flash_now(ctx, "danger", problem);
            return Ok(Outcome::Render(UsersPayload::Form(form)));
        }

        let set = Params::new()
            .with("username", form.username.as_str())
            .with("email", form.email.as_str())
            .with("role", form.role.as_str());
        let changed = ctx
            .db()?
            .update("users", &set, "WHERE id = :id", &Params::new().with("id", id))
            .await;
        match changed {
            Ok(0) => Ok(Self::not_found(ctx)),
            Ok(_) => {
                flash(
                    &mut ctx.session,
                    "success",
                    format!("User {} updated.", form.username),
                );
                Ok(redirect(link(ctx, &format!("o=Users&m=read&i={id}"))))
            }
            Err(err) if err.is_unique_violation() => {
                flash_now(ctx, "danger", "That username is already taken.");
                Ok(Outcome::Render(UsersPayload::Form(form)))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete(&self, ctx: &mut Ctx) -> ModelResult<UsersPayload> {
        let admin = match self.admin(ctx).await? {
            Ok(admin) => admin,
            Err(outcome) => return Ok(outcome),
        };
        if !is_post(ctx) {
            return self.read(ctx).await;
        }
        let Some(id) = Self::selected_id(ctx) else {
            return Ok(Self::not_found(ctx));
        };
        if id == admin.user_id.0 {
            flash(&mut ctx.session, "danger", "You cannot delete your own account.");
            return Ok(redirect(link(ctx, "o=Users")));
        }

        let removed = ctx
            .db()?
            .delete("users", "WHERE id = :id", &Params::new().with("id", id))
            .await?;
        if removed == 0 {
            return Ok(Self::not_found(ctx));
        }
        info!(user_id = id, "user deleted");
        flash(&mut ctx.session, "success", "User deleted.");
        Ok(redirect(link(ctx, "o=Users")))
    }
}

pub struct UsersView;

impl UsersView {
    fn listing(&self, users: &[UserRow], total: i64, ctx: &Ctx) -> String {
        let rows: String = users
            .iter()
            .map(|user| {
                format!(
                    r#"<tr><td><a href="{}">{}</a></td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
                    link(ctx, &format!("o=Users&m=read&i={}", user.id)),
                    esc(&user.username),
                    esc(&user.email),
                    user.role.as_str(),
                    esc(&user.created_at),
                )
            })
            .collect();
        format!(
            r#"<section class="users">
<h2>Users <small>({total})</small></h2>
<p><a href="{create}">Add user</a></p>
<table>
<thead><tr><th>Username</th><th>Email</th><th>Role</th><th>Created</th></tr></thead>
<tbody>{rows}</tbody>
</table>
</section>"#,
            create = link(ctx, "o=Users&m=create"),
        )
    }

    fn detail(&self, user: &UserRow, ctx: &Ctx) -> String {
        format!(
            r#"<section class="users">
<h2>{username}</h2>
<dl>
<dt>Email</dt><dd>{email}</dd>
<dt>Role</dt><dd>{role}</dd>
<dt>Created</dt><dd>{created}</dd>
</dl>
<p><a href="{edit}">Edit</a> &middot; <a href="{back}">All users</a></p>
<form method="post" action="{delete}">
<button type="submit">Delete</button>
</form>
</section>"#,
            username = esc(&user.username),
            email = esc(&user.email),
            role = user.role.as_str(),
            created = esc(&user.created_at),
            edit = link(ctx, &format!("o=Users&m=update&i={}", user.id)),
            back = link(ctx, "o=Users"),
            delete = link(ctx, &format!("o=Users&m=delete&i={}", user.id)),
        )
    }

    fn form(&self, form: &UserForm, ctx: &Ctx) -> String {
        let (title, action, password) = match form.id {
            Some(id) => (
                "Edit user",
                link(ctx, &format!("o=Users&m=update&i={id}")),
                String::new(),
            ),
            None => (
                "Add user",
                link(ctx, "o=Users&m=create"),
                r#"<label>Password <input type="password" name="password" required></label>"#
                    .to_string(),
            ),
        };
        let option = |role: Role| {
            let selected = if form.role == role { " selected" } else { "" };
            format!(r#"<option value="{0}"{selected}>{0}</option>"#, role.as_str())
        };
        format!(
            r#"<section class="users">
<h2>{title}</h2>
<form method="post" action="{action}">
<label>Username <input type="text" name="username" value="{username}" required></label>
<label>Email <input type="email" name="email" value="{email}"></label>
{password}
<label>Role <select name="role">{user}{admin}</select></label>
<button type="submit">Save</button>
</form>
</section>"#,
            username = esc(&form.username),
            email = esc(&form.email),
            user = option(Role::User),
            admin = option(Role::Admin),
        )
    }
}

impl View for UsersView {
    type Payload = UsersPayload;

    fn list(&self, ary: &UsersPayload, ctx: &Ctx) -> String {
        match ary {
            UsersPayload::Listing { users, total } => self.listing(users, *total, ctx),
            UsersPayload::Detail(user) => self.detail(user, ctx),
            UsersPayload::Form(form) => self.form(form, ctx),
        }
    }
}
