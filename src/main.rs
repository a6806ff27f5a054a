use crate::cli::{Cli, handle_command, settings_path};
use crate::progress::DashboardProgress;
use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use clap::Parser;
use colored::Colorize;
use metricdash::catalog::Section;
use metricdash::dashboard::{DashboardView, ViewOptions};
use metricdash::data::{HttpProvider, SnapshotProvider, fetch_sections};
use metricdash::dates::{DEFAULT_WINDOW_DAYS, DateRange, parse_date};
use metricdash::navigation::{LOGIN_URL, RoutePath};
use metricdash::report::{HtmlReportContext, save_html_report, save_metrics_csv};
use metricdash::state::{KeyValueStore, RouteDecision, Settings, guard_route};
use metricdash::summary::{SummaryContext, SummaryPaths, print_summary};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

mod cli;
mod progress;

const LOG_TARGET: &str = "      main";
const HTTP_TIMEOUT_SECONDS: u64 = 20;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let use_color = std::io::stderr().is_terminal();
    colored::control::set_override(use_color);

    let mut cli = Cli::parse();
    let store = KeyValueStore::new(settings_path(cli.settings.take())?);

    if let Some(command) = cli.command.take() {
        return handle_command(command, &store);
    }

    let run_started_at = Local::now();
    let mut settings = Settings::load(&store);
    settings.persist_changes(&store);
    if let Some(locale) = cli.locale {
        settings.locale.set(locale);
    }
    if let Some(theme) = cli.theme {
        settings.theme.set(theme);
    }

    let route = RoutePath::parse(&cli.path).to_url();
    let path = match guard_route(&route, settings.session.get()) {
        RouteDecision::Render(path) => path,
        RouteDecision::Redirect(target) if target == LOGIN_URL => {
            bail!("{route} requires a session; run `metricdash login <TOKEN>` first");
        }
        RouteDecision::Redirect(target) => {
            log::info!(target: LOG_TARGET, "{route} redirects to {target}");
            target
        }
    };

    let range = resolve_range(&cli, settings.date_range.value(), Local::now().date_naive())?;
    if cli.start.is_some() || cli.end.is_some() || cli.days.is_some() {
        settings.date_range.set(Some(range));
    }
    log::info!(target: LOG_TARGET, "rendering {path} for {range}");

    let source = cli.snapshot.as_deref().map_or_else(
        || cli.api_url.clone(),
        |snapshot| snapshot.display().to_string(),
    );
    let progress = DashboardProgress::new(settings.locale.value(), &source, !cli.no_progress);
    let sections = Section::for_path(&path);
    let fetched = if let Some(snapshot) = cli.snapshot.as_deref() {
        let provider = SnapshotProvider::load(snapshot).await?;
        fetch_sections(&provider, &sections, &range, &progress).await
    } else {
        let token = settings.session.get().token.clone();
        let provider = HttpProvider::new(
            cli.api_url.as_str(),
            token,
            Duration::from_secs(HTTP_TIMEOUT_SECONDS),
        )?;
        fetch_sections(&provider, &sections, &range, &progress).await
    }
    .with_context(|| format!("failed to fetch metrics from {source}"))?;

    let view = DashboardView::build(
        ViewOptions {
            path: &path,
            locale: settings.locale.value(),
            theme: settings.theme.value(),
            range,
            policy: cli.policy,
        },
        &fetched,
    );

    let html_path = cli.save_html.clone();
    let csv_path = progress.render(&path, async {
        if let Some(path) = html_path.as_deref() {
            let context = HtmlReportContext {
                view: &view,
                generated_at: &run_started_at,
                minify: cli.minify,
            };
            save_html_report(path, &context).await?;
        }
        let csv_path: Option<PathBuf> = match cli.save_csv.as_deref() {
            Some(path) => Some(save_metrics_csv(path, &view, cli.archive_csv).await?),
            None => None,
        };
        Ok::<_, anyhow::Error>(csv_path)
    })
    .await?;
    progress.clear();

    print_summary(&SummaryContext {
        view: &view,
        run_started_at: &run_started_at,
        paths: SummaryPaths {
            html: html_path.as_deref(),
            csv: csv_path.as_deref(),
        },
    });

    if view.card_count() == 0 && !sections.is_empty() {
        eprintln!("{}", "No metrics were returned for this page.".bright_black());
    }

    Ok(())
}

/// `--start` wins (ending at `--end` or today). Otherwise `--end` and/or
/// `--days` give a trailing window. Otherwise the stored range, falling back
/// to the default trailing window ending today.
fn resolve_range(cli: &Cli, stored: Option<DateRange>, today: NaiveDate) -> Result<DateRange> {
    let end = cli.end.as_deref().map(parse_date).transpose()?;
    if let Some(start) = cli.start.as_deref() {
        return DateRange::new(parse_date(start)?, end.unwrap_or(today));
    }
    let days = cli.days.unwrap_or(DEFAULT_WINDOW_DAYS);
    Ok(match (end, cli.days, stored) {
        (Some(end), _, _) => DateRange::trailing(end, days),
        (None, Some(days), _) => DateRange::trailing(today, days),
        (None, None, Some(stored)) => stored,
        (None, None, None) => DateRange::trailing(today, days),
    })
}
