use crate::dashboard::{DashboardView, Panel, TableView};
use crate::locale::LabelKey;
use crate::metric::Direction;
use chrono::{DateTime, Local};
use colored::{ColoredString, Colorize};
use std::path::Path;

pub struct SummaryPaths<'a> {
    pub html: Option<&'a Path>,
    pub csv: Option<&'a Path>,
}

pub struct SummaryContext<'a> {
    pub view: &'a DashboardView,
    pub run_started_at: &'a DateTime<Local>,
    pub paths: SummaryPaths<'a>,
}

pub fn print_summary(context: &SummaryContext<'_>) {
    let view = context.view;
    println!();
    print_summary_header(context);
    print_summary_paths(&context.paths);

    let mut width = 0;
    if view.panels.is_empty() {
        let message = LabelKey::NoData.label(view.locale);
        println!("{}", message.bright_black());
        width = message.chars().count();
    }
    for panel in &view.panels {
        println!();
        println!("{}", panel.title.bold().bright_magenta());
        width = width.max(print_panel_table(panel));
        for table in &panel.tables {
            width = width.max(print_ranking_table(table));
        }
    }
    if width > 0 {
        println!("{}", "=".repeat(width).bright_cyan());
    }
}

fn print_summary_header(context: &SummaryContext<'_>) {
    let view = context.view;
    println!(
        "{}",
        "===================== Metric Dashboard ====================="
            .bold()
            .bright_cyan()
    );
    println!(
        "{} {}",
        "Run started".bright_yellow().bold(),
        context
            .run_started_at
            .format("%Y-%m-%d %H:%M:%S %Z")
            .to_string()
            .bright_white()
    );
    let trail = view
        .navigation
        .breadcrumbs
        .iter()
        .map(|crumb| crumb.label.as_str())
        .collect::<Vec<_>>()
        .join(" / ");
    println!("{} {}", "Page".bright_yellow().bold(), trail.bright_white());
    println!(
        "{} {} | {} {}",
        LabelKey::DateRange.label(view.locale).bright_yellow().bold(),
        view.range.to_string().bright_white(),
        LabelKey::PreviousPeriod.label(view.locale).bright_yellow().bold(),
        view.range.previous_period().to_string().bright_white()
    );
}

fn print_summary_paths(paths: &SummaryPaths<'_>) {
    print_path_line("HTML Report", paths.html, "not saved (use --save-html)");
    print_path_line("Metrics CSV", paths.csv, "not saved (use --save-csv)");
}

fn print_path_line(label: &str, path: Option<&Path>, hint: &str) {
    let label_colored = label.bright_yellow().bold();
    match path {
        Some(path) => println!(
            "{} {}",
            label_colored,
            path.display().to_string().bright_white()
        ),
        None => println!("{} {}", label_colored, hint.bright_black()),
    }
}

fn print_panel_table(panel: &Panel) -> usize {
    let title_width = panel
        .cards
        .iter()
        .map(|card| card.title.chars().count())
        .max()
        .unwrap_or(0)
        .max("Metric".len());
    let header = format!(
        "{:<title_width$} | {:>18} | {:>10}",
        "Metric", "Value", "Change"
    );
    let separator = format!(
        "{}-+-{}-+-{}",
        "-".repeat(title_width),
        "-".repeat(18),
        "-".repeat(10)
    );
    println!("{}", header.bold().bright_white());
    println!("{}", separator.bright_black());

    for card in &panel.cards {
        let presentation = &card.presentation;
        let change = format!(
            "{:>10}",
            format!("{} {}", presentation.direction().arrow(), presentation.formatted_delta)
                .trim()
        );
        println!(
            "{:<title_width$} | {:>18} | {}",
            card.title,
            presentation.formatted_value,
            colorize_change(&change, presentation.direction())
        );
    }

    header.chars().count()
}

/// First column left aligned, the rest right aligned like the metric table.
fn print_ranking_table(table: &TableView) -> usize {
    let widths: Vec<usize> = table
        .headers
        .iter()
        .enumerate()
        .map(|(column, header)| {
            table
                .rows
                .iter()
                .filter_map(|row| row.get(column))
                .map(|value| value.chars().count())
                .chain([header.chars().count()])
                .max()
                .unwrap_or(0)
        })
        .collect();

    println!();
    println!("{}", table.title.bold().bright_blue());
    let header = format_row(table.headers.iter().copied(), &widths);
    println!("{}", header.bold().bright_white());
    let separator = widths
        .iter()
        .map(|&width| "-".repeat(width))
        .collect::<Vec<_>>()
        .join("-+-");
    println!("{}", separator.bright_black());
    for row in &table.rows {
        println!("{}", format_row(row.iter().map(String::as_str), &widths));
    }
    header.chars().count()
}

fn format_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .enumerate()
        .map(|(column, (value, &width))| pad_cell(value, width, column == 0))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Pads by character count.
fn pad_cell(value: &str, width: usize, left: bool) -> String {
    let padding = " ".repeat(width.saturating_sub(value.chars().count()));
    if left {
        format!("{value}{padding}")
    } else {
        format!("{padding}{value}")
    }
}

fn colorize_change(change: &str, direction: Direction) -> ColoredString {
    match direction {
        Direction::Up => change.bright_green(),
        Direction::Down => change.bright_red(),
        Direction::Flat => change.bright_white(),
        Direction::Unavailable => change.bright_black(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_pad_by_character_count() {
        assert_eq!(pad_cell("地址", 4, true), "地址  ");
        assert_eq!(pad_cell("12", 5, false), "   12");
        assert_eq!(pad_cell("toolong", 3, false), "toolong");
    }

    #[test]
    fn first_column_is_left_aligned() {
        let row = format_row(["1", "0xaa", "5"].into_iter(), &[2, 6, 3]);
        assert_eq!(row, "1  |   0xaa |   5");
    }
}
