//! Stderr spinners: one line per section request, one for rendering.

use anyhow::Result;
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use metricdash::catalog::Section;
use metricdash::data::{FetchProgress, SectionData};
use metricdash::locale::Locale;
use rustc_hash::FxHashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const LOG_TARGET: &str = "  progress";

// The last tick is shown once a line has finished.
const TICKS_BRAILLE: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏✔";
const TICKS_ASCII: &str = "|/-\\*";
const TICK_INTERVAL: Duration = Duration::from_millis(90);

/// Spinner board for one dashboard run. A disabled board draws nothing
/// but still logs.
pub struct DashboardProgress {
    board: MultiProgress,
    style: ProgressStyle,
    locale: Locale,
    source: String,
    in_flight: Mutex<FxHashMap<Section, ProgressBar>>,
}

impl DashboardProgress {
    pub(crate) fn new(locale: Locale, source: impl Into<String>, enabled: bool) -> Self {
        let target = if enabled {
            ProgressDrawTarget::stderr_with_hz(15)
        } else {
            ProgressDrawTarget::hidden()
        };
        let ticks = if is_dumb_term() { TICKS_ASCII } else { TICKS_BRAILLE };
        let style = ProgressStyle::with_template("{spinner:.cyan.bold} {prefix:.bold} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars(ticks);
        Self {
            board: MultiProgress::with_draw_target(target),
            style,
            locale,
            source: source.into(),
            in_flight: Mutex::new(FxHashMap::default()),
        }
    }

    fn start_line(&self, prefix: String, message: String) -> ProgressBar {
        let bar = self.board.add(ProgressBar::new_spinner());
        bar.set_style(self.style.clone());
        bar.set_prefix(prefix);
        bar.set_message(message);
        bar.enable_steady_tick(TICK_INTERVAL);
        bar
    }

    fn in_flight(&self) -> MutexGuard<'_, FxHashMap<Section, ProgressBar>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs the render/save step under its own spinner line.
    pub(crate) async fn render<T>(
        &self,
        path: &str,
        work: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let bar = self.start_line(path.to_string(), "rendering".bright_white().to_string());
        let result = work.await;
        match &result {
            Ok(_) => bar.finish_with_message("rendered".bright_green().bold().to_string()),
            Err(err) => {
                log::debug!(target: LOG_TARGET, "rendering {path} failed: {err:#}");
                bar.abandon_with_message("failed".bright_red().bold().to_string());
            }
        }
        result
    }

    pub(crate) fn clear(&self) {
        let _ = self.board.clear();
    }
}

impl FetchProgress for DashboardProgress {
    fn section_started(&self, section: Section) {
        log::debug!(target: LOG_TARGET, "{section}: request started against {}", self.source);
        let bar = self.start_line(
            section.label_key().label(self.locale).to_string(),
            format!("fetching from {}", self.source).bright_white().to_string(),
        );
        self.in_flight().insert(section, bar);
    }

    fn section_finished(&self, section: Section, outcome: Result<&SectionData, &anyhow::Error>) {
        let Some(bar) = self.in_flight().remove(&section) else {
            return;
        };
        match outcome {
            Ok(data) => bar.finish_with_message(fetch_summary(data).bright_green().to_string()),
            Err(err) => {
                log::debug!(target: LOG_TARGET, "{section}: request failed: {err:#}");
                bar.abandon_with_message("failed".bright_red().bold().to_string());
            }
        }
    }
}

fn fetch_summary(data: &SectionData) -> String {
    let metrics = match data.metrics.len() {
        1 => "1 metric".to_string(),
        count => format!("{count} metrics"),
    };
    if data.tables.is_empty() {
        metrics
    } else {
        format!("{metrics} and tables")
    }
}

fn is_dumb_term() -> bool {
    std::env::var("TERM").is_ok_and(|term| term.eq_ignore_ascii_case("dumb"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use metricdash::data::{MetricRecord, RevenueShare, SectionMetrics};

    #[test]
    fn summary_counts_metrics_and_notes_tables() {
        let metrics: SectionMetrics = [("totalRevenue", MetricRecord::new(Some(1.0), None))]
            .into_iter()
            .collect();
        let mut data = SectionData::from(metrics);
        assert_eq!(fetch_summary(&data), "1 metric");
        data.tables.composition.push(RevenueShare {
            source: "TS".to_string(),
            amount: Some(1.0),
        });
        assert_eq!(fetch_summary(&data), "1 metric and tables");
        assert_eq!(fetch_summary(&SectionData::default()), "0 metrics");
    }

    #[test]
    fn hidden_board_tracks_sections_in_flight() {
        let progress = DashboardProgress::new(Locale::En, "snapshot.json", false);
        progress.section_started(Section::Pos);
        progress.section_started(Section::Ts);
        assert_eq!(progress.in_flight().len(), 2);

        progress.section_finished(Section::Pos, Ok(&SectionData::default()));
        let err = anyhow::anyhow!("boom");
        progress.section_finished(Section::Ts, Err(&err));
        assert!(progress.in_flight().is_empty());

        // finishing twice is harmless
        progress.section_finished(Section::Ts, Err(&err));
    }
}
