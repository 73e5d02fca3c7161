use super::*;
use crate::ctx::Request;

#[test]
fn esc_neutralises_markup() {
    assert_eq!(
        esc(r#"<script>alert("x")</script> & 'y'"#),
        "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; &#39;y&#39;"
    );
}

#[test]
fn email_shape_check() {
    assert!(is_email("a@example.com"));
    assert!(!is_email("a@example"));
    assert!(!is_email("@example.com"));
    assert!(!is_email("a b@example.com"));
    assert!(!is_email("a@@example.com"));
}

#[test]
fn flash_is_read_once_across_requests() {
    // request N queues the message
    let mut session = Session::new();
    let ctx = Ctx::new(Request::default(), session.clone());
    assert!(ctx.flash().is_empty());
    flash(&mut session, "success", "saved");

    // request N+1 shows it
    let ctx = Ctx::new(Request::default(), session);
    assert_eq!(ctx.flash(), &[Flash::new("success", "saved")]);
    let session = ctx.into_session();
    assert!(session.is_dirty());

    // request N+2 does not
    let ctx = Ctx::new(Request::default(), session);
    assert!(ctx.flash().is_empty());
}

#[test]
fn flash_with_same_key_replaces() {
    let mut session = Session::new();
    flash(&mut session, "danger", "first");
    flash(&mut session, "danger", "second");
    flash(&mut session, "info", "other");
    assert_eq!(
        take_flash(&mut session),
        vec![Flash::new("danger", "second"), Flash::new("info", "other")]
    );
    assert!(take_flash(&mut session).is_empty());
}

#[test]
fn requeue_keeps_newer_messages() {
    let mut session = Session::new();
    flash(&mut session, "success", "old");
    flash(&mut session, "info", "kept");
    let mut ctx = Ctx::new(Request::default(), session);

    flash(&mut ctx.session, "success", "new");
    requeue_flash(&mut ctx);

    let mut session = ctx.into_session();
    assert_eq!(
        take_flash(&mut session),
        vec![Flash::new("success", "new"), Flash::new("info", "kept")]
    );
}

#[test]
fn flash_now_only_touches_the_current_page() {
    let mut ctx = Ctx::new(Request::default(), Session::new());
    flash_now(&mut ctx, "danger", "bad email");
    assert_eq!(ctx.flash().len(), 1);
    assert!(!ctx.session.is_dirty());
}

#[test]
fn guards_read_method_and_session_user() {
    let mut ctx = Ctx::new(Request::post([("o", "Auth")]), Session::new());
    assert!(is_post(&ctx));
    assert!(!is_authenticated_user(&ctx));

    ctx.session.set(
        USER_KEY,
        SessionUser {
            user_id: shared::domain::UserId(7),
            username: "ada".into(),
            role: shared::domain::Role::User,
        },
    );
    assert!(is_authenticated_user(&ctx));
    assert_eq!(session_user(&ctx).map(|user| user.username), Some("ada".into()));
}

#[test]
fn redirect_is_a_sentinel() {
    let outcome: Outcome<()> = redirect("?o=Auth");
    assert_eq!(
        outcome,
        Outcome::Redirect(Redirect {
            location: "?o=Auth".into()
        })
    );
}
