//! Dashboard HTML page.

use crate::config::MapConfig;
use crate::dashboard::DashboardView;
use crate::render::{esc, render_map_svg};
use crate::types::{MergedRow, TableRow};
use std::fmt::Write as _;

pub const PAGE_TITLE: &str = "Sündimus ja suremus Eestis";
pub const NO_DATA_WARNING: &str = "Andmeid ei õnnestunud laadida.";
pub const GREETING: &str = "Tere tulemast Mirjam Reino Eesti iibe dashboardile!";

const CSS: &str = r#"
body { margin: 0; font-family: system-ui, sans-serif; color: #222; display: flex; }
aside { width: 220px; min-height: 100vh; padding: 1.5rem; background: #f0f2f6; box-sizing: border-box; }
main { flex: 1; padding: 1.5rem 2.5rem; }
select { width: 100%; padding: 0.3rem; font-size: 1rem; }
table { border-collapse: collapse; margin: 1rem 0 2rem; }
th, td { padding: 0.35rem 0.9rem; border-bottom: 1px solid #ddd; }
td.num { text-align: right; font-variant-numeric: tabular-nums; }
.error { background: #ffe9e9; color: #7d1a1a; padding: 0.8rem 1rem; border-radius: 4px; margin-bottom: 0.6rem; }
.warning { background: #fffbe6; color: #6b5400; padding: 0.8rem 1rem; border-radius: 4px; }
"#;

pub fn empty_year_warning(year: i32) -> String {
    format!("Aastaks {} andmed puuduvad.", year)
}

fn render_year_selector(years: &[i32], selected: i32) -> String {
    let mut html = String::from(
        r#"<form method="get" action="/"><label for="year">Vali aasta</label><select id="year" name="year" onchange="this.form.submit()">"#,
    );
    for year in years {
        let _ = write!(
            html,
            r#"<option value="{year}"{}>{year}</option>"#,
            if *year == selected { " selected" } else { "" }
        );
    }
    html.push_str(r#"</select><noscript><button type="submit">Näita</button></noscript></form>"#);
    html
}

pub fn render_table(rows: &[TableRow]) -> String {
    let mut html = String::from(
        "<table><thead><tr><th>Maakond</th><th>Elussünnid</th><th>Surmad</th><th>Loomulik iive</th></tr></thead><tbody>",
    );
    for row in rows {
        let _ = write!(
            html,
            r#"<tr><td>{}</td><td class="num">{}</td><td class="num">{}</td><td class="num">{}</td></tr>"#,
            esc(&row.region),
            row.births,
            row.deaths,
            row.natural_change
        );
    }
    html.push_str("</tbody></table>");
    html
}

fn render_body(view: &DashboardView, map: &MapConfig) -> String {
    match view {
        DashboardView::NoData { error } => {
            let mut html = String::new();
            if let Some(error) = error {
                let _ = write!(html, r#"<div class="error">{}</div>"#, esc(error));
            }
            let _ = write!(html, r#"<div class="warning">{}</div>"#, NO_DATA_WARNING);
            html
        }
        DashboardView::EmptyYear { year } => {
            format!(r#"<div class="warning">{}</div>"#, esc(&empty_year_warning(*year)))
        }
        DashboardView::Ready { year, rows, bounds } => {
            let table: Vec<TableRow> = rows.iter().map(MergedRow::table_row).collect();
            format!(
                "<h2>Loomulik iive maakonniti ({year})</h2>{}<figure>{}</figure>",
                render_table(&table),
                render_map_svg(rows, *bounds, *year, map)
            )
        }
    }
}

pub fn render_page(view: &DashboardView, years: &[i32], selected: i32, map: &MapConfig) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="et">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<style>{css}</style>
</head>
<body>
<aside>{selector}</aside>
<main>
<h1>{title}</h1>
<p>{greeting}</p>
{body}
</main>
</body>
</html>"#,
        title = PAGE_TITLE,
        greeting = GREETING,
        css = CSS,
        selector = render_year_selector(years, selected),
        body = render_body(view, map),
    )
}
