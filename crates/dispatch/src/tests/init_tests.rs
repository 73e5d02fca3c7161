use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use super::*;
use crate::{
    ctx::{Out, Request},
    plugin::{ModelResult, Plugin, Route, View},
    session::Session,
};
use async_trait::async_trait;

struct NotesModel;

#[async_trait]
impl Plugin for NotesModel {
    type Payload = Vec<String>;

    const ACTIONS: &'static [Action] = &[Action::List, Action::Read, Action::Delete];

    async fn list(&self, _ctx: &mut Ctx) -> ModelResult<Vec<String>> {
        Ok(Outcome::Render(vec!["first".into(), "<b>second</b>".into()]))
    }

    async fn read(&self, ctx: &mut Ctx) -> ModelResult<Vec<String>> {
        Ok(Outcome::Render(vec![ctx.param_or_default("i")]))
    }

    async fn delete(&self, ctx: &mut Ctx) -> ModelResult<Vec<String>> {
        util::flash(&mut ctx.session, "success", "deleted");
        Ok(util::redirect("?o=Notes"))
    }
}

struct NotesView;

impl View for NotesView {
    type Payload = Vec<String>;

    fn list(&self, ary: &Vec<String>, _ctx: &Ctx) -> String {
        let items: String = ary.iter().map(|item| format!("<li>{}</li>", esc(item))).collect();
        format!("<ul>{items}</ul>")
    }

    fn read(&self, ary: &Vec<String>, _ctx: &Ctx) -> String {
        format!("<p>note {}</p>", esc(ary.first().map(String::as_str).unwrap_or_default()))
    }
}

struct Broken;

#[async_trait]
impl Plugin for Broken {
    type Payload = ();

    async fn list(&self, ctx: &mut Ctx) -> ModelResult<()> {
        ctx.db()?;
        Ok(Outcome::Render(()))
    }
}

struct Panicky;

#[async_trait]
impl Plugin for Panicky {
    type Payload = ();

    async fn list(&self, _ctx: &mut Ctx) -> ModelResult<()> {
        panic!("boom")
    }
}

struct Empty;

impl View for Empty {
    type Payload = ();

    fn list(&self, _ary: &(), _ctx: &Ctx) -> String {
        "unreachable".into()
    }
}

struct Plain;

impl Theme for Plain {
    fn html(&self, out: &Out) -> String {
        format!(
            "<title>{}</title><nav>{}</nav><nav>{}</nav>{}<main>{}</main>",
            out.doc, out.nav1, out.nav2, out.msg, out.main
        )
    }
}

struct Loud;

impl Theme for Loud {
    fn html(&self, out: &Out) -> String {
        format!("LOUD{}", out.main)
    }
}

fn init() -> Init {
    let registry = Registry::new(SiteInfo::default())
        .plugin("Notes", || Route::new(NotesModel, NotesView))
        .plugin("Broken", || Route::new(Broken, Empty))
        .plugin("Panicky", || Route::new(Panicky, Empty))
        .menu("Notes", "Notes")
        .theme("Plain", || Plain)
        .theme("Loud", || Loud);
    Init::new(registry).expect("registry")
}

fn page(response: Response) -> (Status, String) {
    match response {
        Response::Page { status, body } => (status, body),
        Response::Redirect { location } => panic!("unexpected redirect to {location}"),
    }
}

#[tokio::test]
async fn every_registered_object_renders() {
    let init = init();
    for object in ["Notes"] {
        let mut ctx = Ctx::new(Request::get([("o", object)]), Session::new());
        let (status, body) = page(init.dispatch(&mut ctx).await);
        assert_eq!(status, Status::Ok);
        assert!(!body.is_empty());
        assert!(body.contains("&lt;b&gt;second&lt;/b&gt;"));
    }
}

#[tokio::test]
async fn missing_object_uses_the_default() {
    let init = init();
    let mut ctx = Ctx::new(Request::default(), Session::new());
    let (status, _) = page(init.dispatch(&mut ctx).await);
    assert_eq!(status, Status::Ok);
    assert_eq!(
        ctx.input,
        Input {
            o: "Notes".into(),
            m: Action::List,
            t: "Plain".into()
        }
    );
}

#[tokio::test]
async fn unknown_object_is_a_themed_not_found_without_building_a_plugin() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();
    let registry = Registry::new(SiteInfo::default())
        .plugin("Notes", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Route::new(NotesModel, NotesView)
        })
        .menu("Notes", "Notes")
        .theme("Plain", || Plain);
    let init = Init::new(registry).expect("registry");

    let mut ctx = Ctx::new(Request::get([("o", "Bogus<x>")]), Session::new());
    let (status, body) = page(init.dispatch(&mut ctx).await);

    assert_eq!(status, Status::NotFound);
    assert_eq!(status.as_u16(), 404);
    assert!(body.contains("Not Found"));
    assert!(body.contains("Bogus&lt;x&gt;"));
    assert!(body.contains(r#"href="?o=Notes&t=Plain""#), "chrome missing: {body}");
    assert_eq!(built.load(Ordering::SeqCst), 0);

    let mut ctx = Ctx::new(Request::get([("o", "Notes")]), Session::new());
    init.dispatch(&mut ctx).await;
    assert_eq!(built.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unsupported_action_falls_back_to_list() {
    let init = init();
    let mut ctx = Ctx::new(Request::get([("o", "notes"), ("m", "update")]), Session::new());
    let (status, body) = page(init.dispatch(&mut ctx).await);
    assert_eq!(status, Status::Ok);
    assert_eq!(ctx.input.m, Action::List);
    assert_eq!(ctx.input.o, "Notes");
    assert!(body.contains("<li>first</li>"));
}

#[tokio::test]
async fn supported_action_reaches_matching_view() {
    let init = init();
    let mut ctx = Ctx::new(
        Request::get([("o", "Notes"), ("m", "read"), ("i", "42")]),
        Session::new(),
    );
    let (_, body) = page(init.dispatch(&mut ctx).await);
    assert!(body.contains("<p>note 42</p>"));
}

#[tokio::test]
async fn theme_selector_falls_back_to_default() {
    let init = init();
    let mut ctx = Ctx::new(Request::get([("t", "loud")]), Session::new());
    let (_, body) = page(init.dispatch(&mut ctx).await);
    assert!(body.starts_with("LOUD"));

    let mut ctx = Ctx::new(Request::get([("t", "Neon")]), Session::new());
    let (_, body) = page(init.dispatch(&mut ctx).await);
    assert!(body.starts_with("<title>"));
    assert_eq!(ctx.input.t, "Plain");
}

#[tokio::test]
async fn redirect_stops_rendering_and_keeps_flash_for_next_page() {
    let init = init();
    let mut ctx = Ctx::new(Request::post([("o", "Notes"), ("m", "delete")]), Session::new());
    let response = init.dispatch(&mut ctx).await;
    assert_eq!(
        response,
        Response::Redirect {
            location: "?o=Notes".into()
        }
    );
    assert!(ctx.out.main.is_empty());

    let mut next = Ctx::new(Request::get([("o", "Notes")]), ctx.into_session());
    let (_, body) = page(init.dispatch(&mut next).await);
    assert!(body.contains("flash-success"));
    assert!(body.contains("deleted"));

    let mut third = Ctx::new(Request::get([("o", "Notes")]), next.into_session());
    let (_, body) = page(init.dispatch(&mut third).await);
    assert!(!body.contains("deleted"));
}

#[tokio::test]
async fn data_failures_render_generic_themed_error() {
    let init = init();
    let mut ctx = Ctx::new(Request::get([("o", "Broken")]), Session::new());
    let (status, body) = page(init.dispatch(&mut ctx).await);
    assert_eq!(status, Status::ServerError);
    assert!(body.contains(ErrorCode::DataAccess.public_message()));
    assert!(!body.contains("no database attached"));
    assert!(body.contains("<nav>"));
}

#[tokio::test]
async fn plugin_panic_is_contained() {
    let init = init();
    let mut ctx = Ctx::new(Request::get([("o", "Panicky")]), Session::new());
    let (status, body) = page(init.dispatch(&mut ctx).await);
    assert_eq!(status, Status::ServerError);
    assert!(body.contains(ErrorCode::Internal.title()));
    assert!(!body.contains("boom"));
}

struct Shaky;

impl Theme for Shaky {
    fn html(&self, _out: &Out) -> String {
        panic!("theme exploded")
    }
}

#[tokio::test]
async fn theme_panic_falls_back_to_default_theme() {
    let registry = Registry::new(SiteInfo::default())
        .plugin("Notes", || Route::new(NotesModel, NotesView))
        .menu("Notes", "Notes")
        .theme("Plain", || Plain)
        .theme("Shaky", || Shaky);
    let init = Init::new(registry).expect("registry");

    let mut ctx = Ctx::new(Request::get([("o", "Notes"), ("t", "Shaky")]), Session::new());
    let (status, body) = page(init.dispatch(&mut ctx).await);
    assert_eq!(status, Status::ServerError);
    assert!(body.starts_with("<title>"));
    assert!(body.contains(ErrorCode::Internal.title()));
    assert!(body.contains(r#"href="?o=Notes&t=Plain""#));
    assert!(!body.contains("theme exploded"));
    assert_eq!(ctx.input.t, "Plain");
}

#[tokio::test]
async fn default_theme_panic_still_answers() {
    let registry = Registry::new(SiteInfo::default())
        .plugin("Notes", || Route::new(NotesModel, NotesView))
        .theme("Shaky", || Shaky);
    let init = Init::new(registry).expect("registry");

    let mut ctx = Ctx::new(Request::get([("o", "Notes")]), Session::new());
    let (status, body) = page(init.dispatch(&mut ctx).await);
    assert_eq!(status, Status::ServerError);
    assert!(body.starts_with("<!DOCTYPE html>"));
    assert!(body.contains("<title>Site</title>"));
    assert!(body.contains(ErrorCode::Internal.title()));
}
