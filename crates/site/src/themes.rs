use dispatch::{Out, Theme};

const BASE_CSS: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; line-height: 1.5; }
header, nav, main, footer { padding: 0.5rem 1.5rem; }
nav ul { list-style: none; display: flex; gap: 1rem; margin: 0; padding: 0; }
nav a.active { font-weight: bold; text-decoration: none; }
form label { display: block; margin: 0.5rem 0; }
table { border-collapse: collapse; }
td, th { padding: 0.25rem 0.75rem; text-align: left; }
.flash { padding: 0.5rem 1rem; border-radius: 4px; }
"#;

const SIMPLE_CSS: &str = r#"
body { background: #fafafa; color: #222; }
header { background: #2c5282; color: #fff; }
header a { color: #fff; text-decoration: none; }
.flash-success { background: #c6f6d5; }
.flash-info { background: #bee3f8; }
.flash-danger { background: #fed7d7; }
"#;

const DARK_CSS: &str = r#"
body { background: #1a202c; color: #e2e8f0; }
a { color: #90cdf4; }
header { background: #000; }
header a { color: #e2e8f0; text-decoration: none; }
.flash-success { background: #22543d; }
.flash-info { background: #2a4365; }
.flash-danger { background: #742a2a; }
"#;

fn document(out: &Out) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{doc}</title>
<style>{css}</style>
</head>
<body>
{head}
<nav class="primary">{nav1}</nav>
<main>
{msg}
{main}
</main>
<nav class="themes">{nav2}</nav>
{foot}
<script>{js}</script>
</body>
</html>
"#,
        doc = out.doc,
        css = out.css,
        head = out.head,
        nav1 = out.nav1,
        msg = out.msg,
        main = out.main,
        nav2 = out.nav2,
        foot = out.foot,
        js = out.js,
    )
}

pub struct SimpleTheme;

impl Theme for SimpleTheme {
    fn css(&self) -> String {
        format!("{BASE_CSS}{SIMPLE_CSS}")
    }

    fn html(&self, out: &Out) -> String {
        document(out)
    }
}

pub struct DarkTheme;

impl Theme for DarkTheme {
    fn css(&self) -> String {
        format!("{BASE_CSS}{DARK_CSS}")
    }

    fn html(&self, out: &Out) -> String {
        document(out)
    }
}
