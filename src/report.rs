use crate::dashboard::{Card, DashboardView, Panel, TableView};
use crate::locale::{LabelKey, Theme};
use crate::metric::TrendPolicy;
use crate::navigation::{BreadcrumbSegment, NavNode, Sidebar};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use csv::Writer;
use flate2::Compression;
use flate2::write::GzEncoder;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs;

const LOG_TARGET: &str = "    report";

pub struct HtmlReportContext<'a> {
    pub view: &'a DashboardView,
    pub generated_at: &'a DateTime<Local>,
    pub minify: bool,
}

pub async fn save_html_report(
    output_path: &Path,
    context: &HtmlReportContext<'_>,
) -> Result<()> {
    let html = render_page(context.view, context.generated_at);
    let bytes = if context.minify {
        minify_page(&html)
    } else {
        html.into_bytes()
    };
    write_output_file(output_path, &bytes).await?;
    log::info!(target: LOG_TARGET, "wrote HTML dashboard to {}", output_path.display());
    Ok(())
}

pub fn minify_page(html: &str) -> Vec<u8> {
    let mut cfg = minify_html::Cfg::default();
    cfg.minify_css = true;
    minify_html::minify(html.as_bytes(), &cfg)
}

pub fn render_page(view: &DashboardView, generated_at: &DateTime<Local>) -> String {
    let locale = view.locale;
    let page_title = view.navigation.breadcrumbs.last().map_or_else(
        || LabelKey::Dashboard.label(locale).to_string(),
        |crumb| crumb.label.clone(),
    );

    let markup = html! {
        (DOCTYPE)
        html lang=(locale.code()) data-theme=(view.theme.name()) {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (page_title) " · " (LabelKey::Dashboard.label(locale)) }
                style { (PreEscaped(REPORT_STYLE)) }
            }
            body {
                div.shell {
                    (render_sidebar(&view.sidebar))
                    main.content {
                        header.topbar {
                            (render_breadcrumbs(&view.navigation.breadcrumbs))
                            (render_toggles(view))
                        }
                        div.meta {
                            span.label { (LabelKey::DateRange.label(locale)) }
                            span.value.mono { (view.range.to_string()) }
                            span.label { (LabelKey::PreviousPeriod.label(locale)) }
                            span.value.mono { (view.range.previous_period().to_string()) }
                        }
                        @if view.panels.is_empty() {
                            p.muted { (LabelKey::NoData.label(locale)) }
                        }
                        @for panel in &view.panels {
                            (render_panel(panel))
                        }
                        footer.footer {
                            "metricdash v" (env!("CARGO_PKG_VERSION")) " · "
                            (generated_at.format("%Y-%m-%d %H:%M:%S %Z").to_string())
                        }
                    }
                }
            }
        }
    };
    markup.into_string()
}

fn render_sidebar(sidebar: &Sidebar) -> Markup {
    let current = sidebar.current_path();
    html! {
        nav.sidebar {
            ul.nav {
                @for node in sidebar.tree() {
                    @if node.has_children() {
                        li.nav-group.active[node.is_branch_active(current)] {
                            details open[sidebar.is_expanded(&node.url)] {
                                summary { (node.title) }
                                ul.nav-children {
                                    @for child in &node.children {
                                        (render_nav_link(child, current))
                                    }
                                }
                            }
                        }
                    } @else {
                        (render_nav_link(node, current))
                    }
                }
            }
        }
    }
}

fn render_nav_link(node: &NavNode, current_path: &str) -> Markup {
    html! {
        li.nav-item.active[node.is_active(current_path)] {
            a href=(node.url) { (node.title) }
        }
    }
}

fn render_breadcrumbs(crumbs: &[BreadcrumbSegment]) -> Markup {
    html! {
        ol.breadcrumb {
            @for crumb in crumbs {
                @if crumb.current {
                    li.crumb.current aria-current="page" { (crumb.label) }
                } @else {
                    li.crumb { a href=(crumb.href) { (crumb.label) } }
                }
            }
        }
    }
}

fn render_toggles(view: &DashboardView) -> Markup {
    let theme_label = match view.theme.toggled() {
        Theme::Light => LabelKey::ThemeLight,
        Theme::Dark => LabelKey::ThemeDark,
    };
    html! {
        div.toggles {
            span.toggle data-locale=(view.locale.toggled().code()) {
                (LabelKey::Language.label(view.locale))
            }
            span.toggle data-theme=(view.theme.toggled().name()) {
                (theme_label.label(view.locale))
            }
        }
    }
}

fn render_panel(panel: &Panel) -> Markup {
    html! {
        section.panel id=(panel.section.endpoint()) {
            h2 { (panel.title) }
            div.cards {
                @for card in &panel.cards {
                    (render_card(card))
                }
            }
            @for table in &panel.tables {
                (render_table(table))
            }
        }
    }
}

fn render_table(table: &TableView) -> Markup {
    html! {
        div.table-wrap {
            h3 { (table.title) }
            table.ranking {
                thead {
                    tr {
                        @for header in &table.headers {
                            th { (header) }
                        }
                    }
                }
                tbody {
                    @for row in &table.rows {
                        tr {
                            @for value in row {
                                td.mono { (value) }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn render_card(card: &Card) -> Markup {
    let presentation = &card.presentation;
    let direction = presentation.direction();
    html! {
        div.card data-metric=(card.key) {
            div.card-label { (card.title) }
            div.card-value { (presentation.formatted_value) }
            span class={ "trend " (direction.css_class()) } {
                @if !direction.arrow().is_empty() {
                    span.arrow { (direction.arrow()) } " "
                }
                (presentation.formatted_delta)
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    section: &'a str,
    metric: &'a str,
    title: &'a str,
    value: Option<f64>,
    prev_value: Option<f64>,
    formatted_value: &'a str,
    delta_percent: Option<f64>,
    direction: &'a str,
    formatted_delta: &'a str,
    policy: &'a str,
}

pub fn serialize_metrics_csv(view: &DashboardView) -> Result<Vec<u8>> {
    let mut writer = Writer::from_writer(Vec::new());
    for panel in &view.panels {
        for card in &panel.cards {
            let presentation = &card.presentation;
            let row = CsvRow {
                section: panel.section.endpoint(),
                metric: card.key,
                title: card.title,
                value: card.record.value,
                prev_value: card.record.prev_value,
                formatted_value: &presentation.formatted_value,
                delta_percent: presentation.delta.percent(),
                direction: presentation.direction().css_class(),
                formatted_delta: &presentation.formatted_delta,
                policy: match presentation.policy {
                    TrendPolicy::TwoWay => "two-way",
                    TrendPolicy::ThreeWay => "three-way",
                },
            };
            writer
                .serialize(row)
                .context("failed to serialize metric record")?;
        }
    }
    finalize_writer(writer, "metrics CSV writer")
}

/// Writes the CSV, gzip-compressed to `<path>.gz` when `archive` is set.
/// Returns the path actually written.
pub async fn save_metrics_csv(
    path: &Path,
    view: &DashboardView,
    archive: bool,
) -> Result<PathBuf> {
    let serialized = serialize_metrics_csv(view)?;
    if !archive {
        write_output_file(path, &serialized).await?;
        return Ok(path.to_path_buf());
    }
    let mut archived = path.as_os_str().to_owned();
    archived.push(".gz");
    let archived = PathBuf::from(archived);
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&serialized)
        .context("failed to compress metrics CSV")?;
    let compressed = encoder.finish().context("failed to finish metrics archive")?;
    write_output_file(&archived, &compressed).await?;
    Ok(archived)
}

fn finalize_writer(mut writer: Writer<Vec<u8>>, label: &str) -> Result<Vec<u8>> {
    writer
        .flush()
        .with_context(|| format!("failed to flush {label}"))?;
    writer
        .into_inner()
        .with_context(|| format!("failed to finalize {label}"))
}

pub async fn write_output_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    fs::write(path, bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;

    Ok(())
}

const REPORT_STYLE: &str = r#"
:root {
  color-scheme: light;
  --bg: #f6f3ec;
  --ink: #1f1b16;
  --muted: #6b635b;
  --card: #ffffff;
  --accent: #3d405b;
  --border: #e2d6c6;
  --up-bg: rgba(129, 178, 154, 0.2);
  --up-ink: #2f6f54;
  --down-bg: rgba(224, 122, 95, 0.22);
  --down-ink: #8b2d17;
}

[data-theme="dark"] {
  color-scheme: dark;
  --bg: #16171d;
  --ink: #ece8e1;
  --muted: #9a948c;
  --card: #20222b;
  --accent: #a9b1ff;
  --border: #2f323d;
  --up-ink: #8fd6b0;
  --down-ink: #f4a58e;
}

* { box-sizing: border-box; }

body {
  margin: 0;
  font-family: "Manrope", "Segoe UI", sans-serif;
  color: var(--ink);
  background: var(--bg);
}

.shell { display: flex; min-height: 100vh; }

.sidebar {
  width: 240px;
  flex-shrink: 0;
  padding: 24px 16px;
  border-right: 1px solid var(--border);
  background: var(--card);
}

.nav, .nav-children { list-style: none; margin: 0; padding: 0; }
.nav-children { padding-left: 14px; }
.nav-item a, .nav-group summary {
  display: block;
  padding: 8px 12px;
  border-radius: 10px;
  color: inherit;
  text-decoration: none;
  cursor: pointer;
}
.nav-item.active > a, .nav-group.active > details > summary {
  background: rgba(61, 64, 91, 0.12);
  color: var(--accent);
  font-weight: 600;
}

.content { flex: 1; padding: 28px 32px 48px; }

.topbar {
  display: flex;
  justify-content: space-between;
  align-items: center;
  gap: 16px;
  flex-wrap: wrap;
}

.breadcrumb { display: flex; list-style: none; margin: 0; padding: 0; gap: 8px; }
.crumb + .crumb::before { content: "/"; margin-right: 8px; color: var(--muted); }
.crumb a { color: var(--muted); text-decoration: none; }
.crumb.current { font-weight: 600; }

.toggles { display: flex; gap: 8px; }
.toggle {
  padding: 6px 12px;
  border-radius: 999px;
  border: 1px solid var(--border);
  font-size: 13px;
}

.meta { display: flex; gap: 12px; flex-wrap: wrap; margin: 20px 0; align-items: baseline; }
.label {
  font-size: 12px;
  text-transform: uppercase;
  letter-spacing: 0.1em;
  color: var(--muted);
}
.value { font-weight: 600; }
.mono { font-family: "JetBrains Mono", ui-monospace, monospace; }

.panel h2 { margin: 28px 0 12px; font-size: 1.4rem; }

.cards {
  display: grid;
  grid-template-columns: repeat(auto-fit, minmax(200px, 1fr));
  gap: 16px;
}

.card {
  background: var(--card);
  border-radius: 18px;
  padding: 18px 20px;
  border: 1px solid var(--border);
}

.card-label {
  font-size: 12px;
  text-transform: uppercase;
  letter-spacing: 0.1em;
  color: var(--muted);
  margin-bottom: 8px;
}

.card-value {
  font-size: 24px;
  font-weight: 600;
  font-variant-numeric: tabular-nums;
  margin-bottom: 8px;
}

.trend {
  display: inline-flex;
  padding: 2px 8px;
  border-radius: 999px;
  font-size: 12px;
  font-weight: 600;
}
.trend.up { background: var(--up-bg); color: var(--up-ink); }
.trend.down { background: var(--down-bg); color: var(--down-ink); }
.trend.neutral, .trend.unavailable { background: rgba(61, 64, 91, 0.12); color: var(--muted); }

.table-wrap {
  margin-top: 20px;
  background: var(--card);
  border: 1px solid var(--border);
  border-radius: 18px;
  padding: 16px 20px;
  overflow-x: auto;
}
.table-wrap h3 { margin: 0 0 10px; font-size: 1rem; }
.ranking { width: 100%; border-collapse: collapse; font-size: 13px; }
.ranking th {
  text-align: left;
  font-size: 12px;
  text-transform: uppercase;
  letter-spacing: 0.08em;
  color: var(--muted);
  padding: 6px 8px;
  border-bottom: 1px solid var(--border);
}
.ranking td { padding: 6px 8px; border-bottom: 1px solid var(--border); }
.ranking tr:last-child td { border-bottom: none; }

.muted { color: var(--muted); }
.footer { margin-top: 36px; color: var(--muted); font-size: 13px; }

@media (max-width: 720px) {
  .shell { flex-direction: column; }
  .sidebar { width: auto; border-right: none; border-bottom: 1px solid var(--border); }
  .content { padding: 20px 16px 40px; }
}
"#;
