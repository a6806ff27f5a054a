use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate, generate_to};

use metricdash::locale::{Locale, Theme};
use metricdash::metric::TrendPolicy;
use metricdash::navigation::ROOT_URL;
use metricdash::state::{KeyValueStore, Session, Settings};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_HTML_PATH: &str = "data/output/dashboard.html";
pub const DEFAULT_CSV_PATH: &str = "data/output/metrics.csv";
pub const SETTINGS_RELATIVE_PATH: &str = ".config/metricdash/settings.json";

pub const SAVE_HTML_HELP: &str = "Save the rendered dashboard page to the given file \
    (defaults to data/output/dashboard.html when no path is provided).";
pub const SAVE_CSV_HELP: &str = "Save the presented metrics to the given CSV file \
    (defaults to data/output/metrics.csv when no path is provided). \
    Use --archive-csv to store a .gz instead.";
pub const ARCHIVE_CSV_HELP: &str = "Archive the saved metrics CSV into a .gz file.";
pub const DAYS_HELP: &str = "Trailing window length in days, ending at --end or today \
    (default 7 when no range is stored).";
pub const POLICY_HELP: &str = "Trend policy applied to every card; \
    each metric's own policy is used when omitted.";
const ABOUT: &str = "Render the analytics dashboard (staking, claims, revenue, DeFi) \
    for a route and date range.";

#[derive(Debug, Parser)]
#[command(
    name = "metricdash",
    about = ABOUT,
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Cli {
    #[arg(
        long,
        value_name = "ROUTE",
        default_value = ROOT_URL,
        help = "Route path of the page to render, e.g. /statistics/staking."
    )]
    pub path: String,
    #[arg(long, value_enum, help = "Display locale; overrides the stored setting.")]
    pub locale: Option<Locale>,
    #[arg(long, value_enum, help = "Color theme; overrides the stored setting.")]
    pub theme: Option<Theme>,
    #[arg(long, value_name = "YYYY-MM-DD", help = "First day of the reporting window.")]
    pub start: Option<String>,
    #[arg(
        long,
        value_name = "YYYY-MM-DD",
        help = "Last day of the reporting window (defaults to today)."
    )]
    pub end: Option<String>,
    #[arg(long, value_name = "N", help = DAYS_HELP)]
    pub days: Option<u32>,
    #[arg(
        long,
        value_name = "URL",
        default_value = DEFAULT_API_URL,
        help = "Base URL of the metrics service."
    )]
    pub api_url: String,
    #[arg(
        long,
        value_name = "FILE",
        conflicts_with = "api_url",
        help = "Read metrics from a JSON snapshot instead of the service."
    )]
    pub snapshot: Option<PathBuf>,
    #[arg(long, value_enum, help = POLICY_HELP)]
    pub policy: Option<TrendPolicy>,
    #[arg(
        long,
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = DEFAULT_HTML_PATH,
        help = SAVE_HTML_HELP
    )]
    pub save_html: Option<PathBuf>,
    #[arg(long, requires = "save_html", help = "Minify the saved HTML page.")]
    pub minify: bool,
    #[arg(
        long,
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = DEFAULT_CSV_PATH,
        help = SAVE_CSV_HELP
    )]
    pub save_csv: Option<PathBuf>,
    #[arg(long, help = ARCHIVE_CSV_HELP)]
    pub archive_csv: bool,
    #[arg(
        long,
        value_name = "FILE",
        global = true,
        help = "Settings file (defaults to ~/.config/metricdash/settings.json)."
    )]
    pub settings: Option<PathBuf>,
    #[arg(long, help = "Disable progress spinner output.")]
    pub no_progress: bool,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate shell completion scripts, optionally installing them for the current user.
    Completions {
        #[arg(value_enum, help = "Shell to generate completions for.")]
        shell: Shell,
        #[arg(
            long,
            value_name = "DIR",
            help = "Directory to write the completion script to."
        )]
        output_dir: Option<PathBuf>,
        #[arg(
            long,
            help = "Install the completion script into the default location for the selected shell."
        )]
        install: bool,
    },
    /// Store the display locale; toggles it when none is given.
    Locale {
        #[arg(value_enum)]
        locale: Option<Locale>,
    },
    /// Store the color theme; toggles it when none is given.
    Theme {
        #[arg(value_enum)]
        theme: Option<Theme>,
    },
    /// Mark the session as authenticated with the given bearer token.
    Login {
        #[arg(value_name = "TOKEN")]
        token: String,
    },
    /// Clear the stored session.
    Logout,
}

/// Settings file from `--settings`, else under `$HOME`.
pub fn settings_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    let home = std::env::var_os("HOME").ok_or_else(|| {
        anyhow!("HOME environment variable is not set; use --settings to specify a path")
    })?;
    Ok(PathBuf::from(home).join(SETTINGS_RELATIVE_PATH))
}

pub fn handle_command(command: Commands, store: &KeyValueStore) -> Result<()> {
    match command {
        Commands::Completions {
            shell,
            output_dir,
            install,
        } => generate_completions(shell, output_dir, install),
        other => update_settings(other, store),
    }
}

fn update_settings(command: Commands, store: &KeyValueStore) -> Result<()> {
    let mut settings = Settings::load(store);
    settings.persist_changes(store);
    match command {
        Commands::Locale { locale } => {
            let locale = locale.unwrap_or_else(|| settings.locale.value().toggled());
            settings.locale.set(locale);
            println!("Locale set to {locale}");
        }
        Commands::Theme { theme } => {
            let theme = theme.unwrap_or_else(|| settings.theme.value().toggled());
            settings.theme.set(theme);
            println!("Theme set to {theme}");
        }
        Commands::Login { token } => {
            settings.session.update(|session| session.login(token));
            println!("Logged in; settings saved to {}", store.path().display());
        }
        Commands::Logout => {
            settings.session.update(Session::logout);
            println!("Logged out");
        }
        Commands::Completions { .. } => {}
    }
    Ok(())
}

fn generate_completions(shell: Shell, output_dir: Option<PathBuf>, install: bool) -> Result<()> {
    let mut command = Cli::command();
    let bin_name = command.get_name().to_string();

    let target_dir = if let Some(dir) = output_dir {
        Some(dir)
    } else if install {
        Some(default_install_dir(shell)?)
    } else {
        None
    };

    if let Some(dir) = target_dir {
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create completion directory {}", dir.display()))?;
        let path = generate_to(shell, &mut command, bin_name, &dir)
            .context("failed to write completion file")?;
        println!("Installed {shell:?} completions to {}", path.display());
    } else {
        let mut stdout = io::stdout().lock();
        generate(shell, &mut command, bin_name, &mut stdout);
        stdout
            .flush()
            .context("failed to flush completion output")?;
    }

    Ok(())
}

fn default_install_dir(shell: Shell) -> Result<PathBuf> {
    let home = std::env::var_os("HOME").ok_or_else(|| {
        anyhow!("HOME environment variable is not set; use --output-dir to specify a path")
    })?;
    let mut path = PathBuf::from(home);

    match shell {
        Shell::Bash => {
            path.push(".local/share/bash-completion/completions");
            Ok(path)
        }
        Shell::Elvish => {
            path.push(".elvish/lib/completions");
            Ok(path)
        }
        Shell::Fish => {
            path.push(".config/fish/completions");
            Ok(path)
        }
        Shell::PowerShell => {
            path.push(".local/share/powershell/Scripts");
            Ok(path)
        }
        Shell::Zsh => {
            path.push(".local/share/zsh/site-functions");
            Ok(path)
        }
        other => Err(anyhow!(
            "no default install location for {other:?}; specify --output-dir"
        )),
    }
}
