use async_trait::async_trait;
use dispatch::{Ctx, ModelResult, Outcome, Plugin, View};

use super::record_visit;

pub struct AboutModel;

#[async_trait]
impl Plugin for AboutModel {
    type Payload = ();

    async fn list(&self, ctx: &mut Ctx) -> ModelResult<()> {
        record_visit(ctx, "About");
        Ok(Outcome::Render(()))
    }
}

pub struct AboutView;

impl View for AboutView {
    type Payload = ();

    fn list(&self, _ary: &(), ctx: &Ctx) -> String {
        format!(
            r#"<section class="about">
<h2>About</h2>
<p>{} routes every request through two query keys: <code>o</code> picks the
object and <code>m</code> the action. A model produces the data, a view turns it
into markup and the theme wraps it in the page you are reading.</p>
</section>"#,
            ctx.site.name
        )
    }
}
