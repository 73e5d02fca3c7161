use crate::{
    ctx::{Ctx, NavItem, Out},
    util::esc,
};

/// Page chrome. A theme never sees the plugin payload, only the finished
/// content fragment and the static navigation on the context.
///
/// Implementors supply [`Theme::html`]; the other pieces have working
/// defaults a theme can override one at a time.
pub trait Theme: Send + Sync {
    fn html(&self, out: &Out) -> String;

    fn css(&self) -> String {
        String::new()
    }

    fn js(&self) -> String {
        String::new()
    }

    fn head(&self, ctx: &Ctx) -> String {
        format!(r#"<header><h1><a href="?">{}</a></h1></header>"#, ctx.site.name)
    }

    /// Primary navigation: one link per routed object.
    fn nav1(&self, ctx: &Ctx) -> String {
        nav_links(&ctx.nav1, &ctx.input.o, |item| {
            format!("?o={}&t={}", item.key, ctx.input.t)
        })
    }

    /// Theme switcher: stays on the current object.
    fn nav2(&self, ctx: &Ctx) -> String {
        nav_links(&ctx.nav2, &ctx.input.t, |item| {
            format!("?o={}&t={}", ctx.input.o, item.key)
        })
    }

    fn msg(&self, ctx: &Ctx) -> String {
        ctx.flash()
            .iter()
            .map(|flash| {
                format!(
                    r#"<p class="flash flash-{}">{}</p>"#,
                    esc(&flash.key),
                    esc(&flash.message)
                )
            })
            .collect()
    }

    fn foot(&self, ctx: &Ctx) -> String {
        format!(
            r#"<footer><p>{} &middot; contact {}</p></footer>"#,
            ctx.site.name,
            esc(&ctx.site.mail_from)
        )
    }

    fn title(&self, ctx: &Ctx) -> String {
        format!("{} - {}", ctx.site.name, ctx.input.o)
    }

    /// Fills [`Ctx::out`] around `main` and assembles the document.
    fn render(&self, ctx: &mut Ctx, main: String) -> String {
        ctx.out = Out {
            doc: self.title(ctx),
            css: self.css(),
            js: self.js(),
            head: self.head(ctx),
            nav1: self.nav1(ctx),
            nav2: self.nav2(ctx),
            msg: self.msg(ctx),
            main,
            foot: self.foot(ctx),
        };
        self.html(&ctx.out)
    }
}

fn nav_links(items: &[NavItem], current: &str, href: impl Fn(&NavItem) -> String) -> String {
    let links: String = items
        .iter()
        .map(|item| {
            let class = if item.key == current { r#" class="active""# } else { "" };
            format!(r#"<li><a{class} href="{}">{}</a></li>"#, href(item), item.label)
        })
        .collect();
    format!("<ul>{links}</ul>")
}
