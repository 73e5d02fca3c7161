use async_trait::async_trait;
use dispatch::{
    util::{esc, flash, flash_now, is_email, is_post, redirect},
    Action, Ctx, ModelResult, Outcome, Plugin, View,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{link, record_visit};

pub(crate) const CONTACT_DRAFT: &str = "contact_draft";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDraft {
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl ContactDraft {
    fn from_input(ctx: &Ctx) -> Self {
        Self {
            email: ctx.param_or_default("email"),
            subject: ctx.param_or_default("subject"),
            message: ctx.param_or_default("message"),
        }
    }
}

/// Keeps a contact-form draft in the session until it is cleared.
pub struct ContactModel;

#[async_trait]
impl Plugin for ContactModel {
    type Payload = ContactDraft;

    const ACTIONS: &'static [Action] = &[Action::List, Action::Save, Action::Delete];

    async fn list(&self, ctx: &mut Ctx) -> ModelResult<ContactDraft> {
        record_visit(ctx, "Contact");
        Ok(Outcome::Render(
            ctx.session.get(CONTACT_DRAFT).unwrap_or_default(),
        ))
    }

    async fn save(&self, ctx: &mut Ctx) -> ModelResult<ContactDraft> {
        if !is_post(ctx) {
            return self.list(ctx).await;
        }

        let draft = ContactDraft::from_input(ctx);
        if !draft.email.is_empty() && !is_email(&draft.email) {
            flash_now(ctx, "danger", "Please enter a valid email address.");
            return Ok(Outcome::Render(draft));
        }
        if draft.subject.is_empty() || draft.message.is_empty() {
            flash_now(ctx, "danger", "Both subject and message are required.");
            return Ok(Outcome::Render(draft));
        }

        info!(subject_len = draft.subject.len(), "contact draft saved");
        ctx.session.set(CONTACT_DRAFT, &draft);
        flash(&mut ctx.session, "success", "Your message has been saved.");
        Ok(redirect(link(ctx, "o=Contact")))
    }

    async fn delete(&self, ctx: &mut Ctx) -> ModelResult<ContactDraft> {
        if !is_post(ctx) {
            return self.list(ctx).await;
        }
        ctx.session.remove(CONTACT_DRAFT);
        flash(&mut ctx.session, "info", "Draft cleared.");
        Ok(redirect(link(ctx, "o=Contact")))
    }
}

pub struct ContactView;

impl View for ContactView {
    type Payload = ContactDraft;

    fn list(&self, ary: &ContactDraft, ctx: &Ctx) -> String {
        format!(
            r#"<section class="contact">
<h2>Contact</h2>
<form method="post" action="{save}">
<label>Email <input type="email" name="email" value="{email}"></label>
<label>Subject <input type="text" name="subject" value="{subject}" required></label>
<label>Message <textarea name="message" rows="6" required>{message}</textarea></label>
<button type="submit">Save</button>
</form>
<form method="post" action="{clear}">
<button type="submit">Clear draft</button>
</form>
<p>Replies are sent from {from}.</p>
</section>"#,
            save = link(ctx, "o=Contact&m=save"),
            clear = link(ctx, "o=Contact&m=delete"),
            email = esc(&ary.email),
            subject = esc(&ary.subject),
            message = esc(&ary.message),
            from = esc(&ctx.site.mail_from),
        )
    }
}
