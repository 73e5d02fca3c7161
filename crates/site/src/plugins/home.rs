use async_trait::async_trait;
use dispatch::{
    util::{esc, session_user},
    Ctx, ModelResult, Outcome, Plugin, View,
};
use shared::domain::SessionUser;

use super::{link, LAST_PAGE, VISIT_COUNT};

pub struct HomePayload {
    pub visits: u64,
    pub last_page: Option<String>,
    pub user: Option<SessionUser>,
}

pub struct HomeModel;

#[async_trait]
impl Plugin for HomeModel {
    type Payload = HomePayload;

    async fn list(&self, ctx: &mut Ctx) -> ModelResult<HomePayload> {
        let visits = ctx.session.get::<u64>(VISIT_COUNT).unwrap_or(0) + 1;
        ctx.session.set(VISIT_COUNT, visits);
        Ok(Outcome::Render(HomePayload {
            visits,
            last_page: ctx.session.get(LAST_PAGE),
            user: session_user(ctx),
        }))
    }
}

pub struct HomeView;

impl View for HomeView {
    type Payload = HomePayload;

    fn list(&self, ary: &HomePayload, ctx: &Ctx) -> String {
        let greeting = match &ary.user {
            Some(user) => format!("Welcome back, {}.", esc(&user.username)),
            None => format!(
                r#"Welcome, guest. <a href="{}">Sign in</a> to manage your profile."#,
                link(ctx, "o=Auth")
            ),
        };
        let last_page = ary
            .last_page
            .as_deref()
            .map(|page| format!("<p>Last page you looked at: {}.</p>", esc(page)))
            .unwrap_or_default();
        format!(
            r#"<section class="home">
<h2>Home</h2>
<p>{greeting}</p>
<p>You have visited this page {} time{} this session.</p>
{last_page}
</section>"#,
            ary.visits,
            if ary.visits == 1 { "" } else { "s" }
        )
    }
}
