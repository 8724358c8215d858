// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use medroute::app_config::{self, Config};
use medroute::thresholds::{FeedbackIssue, ThresholdContext};
use medroute::{ConfidenceLevel, Controller, ResolutionRequest, SqliteThresholdStore, UserFeedback};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for ConfidenceLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliConfidenceLevel {
    High,
    Medium,
    Low,
    Insufficient,
}

impl From<CliConfidenceLevel> for ConfidenceLevel {
    fn from(cli_level: CliConfidenceLevel) -> Self {
        match cli_level {
            CliConfidenceLevel::High => ConfidenceLevel::High,
            CliConfidenceLevel::Medium => ConfidenceLevel::Medium,
            CliConfidenceLevel::Low => ConfidenceLevel::Low,
            CliConfidenceLevel::Insufficient => ConfidenceLevel::Insufficient,
        }
    }
}

/// Languages and domain shared by every request-shaped command
#[derive(Parser, Debug)]
struct RequestArgs {
    /// Source language code (e.g., 'en', 'eng')
    #[arg(short, long)]
    source: String,

    /// Target language code (e.g., 'es', 'spa')
    #[arg(short, long)]
    target: String,

    /// Subject-matter domain (e.g., 'cardiology')
    #[arg(short, long, default_value = "general")]
    domain: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the fallback chain for a request
    Resolve {
        #[command(flatten)]
        request: RequestArgs,

        /// Backend family to try first
        #[arg(long)]
        family: Option<String>,
    },

    /// Print the thresholds computed for a request as JSON
    Thresholds {
        #[command(flatten)]
        request: RequestArgs,

        /// Source text the thresholds are computed for
        #[arg(long, default_value = "")]
        text: String,
    },

    /// Score a translation and print the assessment as JSON
    Assess {
        #[command(flatten)]
        request: RequestArgs,

        /// Backend that produced the translation
        #[arg(short, long)]
        backend: String,

        /// Text that was translated
        #[arg(long)]
        source_text: String,

        /// Translation to score
        #[arg(long)]
        translated_text: String,
    },

    /// Fold a user rating into the stored thresholds
    Feedback {
        #[command(flatten)]
        request: RequestArgs,

        /// Confidence level that was assigned to the translation
        #[arg(short, long, value_enum)]
        level: CliConfidenceLevel,

        /// Rating from 1 (wrong) to 5 (perfect)
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=5))]
        rating: u8,

        /// Issue tags (terminology, meaning, omission, fluency, formatting, other)
        #[arg(short, long = "issue")]
        issues: Vec<String>,

        /// Free-text comment
        #[arg(long)]
        comment: Option<String>,

        /// Backend that produced the translation
        #[arg(short, long)]
        backend: Option<String>,
    },

    /// Generate shell completions for medroute
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// medroute - Confidence-aware routing for medical translation
#[derive(Parser, Debug)]
#[command(name = "medroute")]
#[command(version)]
#[command(about = "Routes medical translations across language-model backends and scores the results")]
#[command(long_about = "medroute picks the backend chain for a translation, scores produced translations and
adapts its confidence thresholds from user feedback.

EXAMPLES:
    medroute resolve -s en -t es -d cardiology
    medroute thresholds -s en -t zh -d oncology --text \"Metastatic lesion in the liver.\"
    medroute assess -s en -t es -d cardiology -b claude-3-sonnet \\
        --source-text \"Acute myocardial infarction.\" --translated-text \"Infarto agudo de miocardio.\"
    medroute feedback -s en -t es -d cardiology -l high -r 1 -i terminology
    medroute completions bash > medroute.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config: PathBuf,

    /// SQLite database path (overrides the configuration)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Set logging level
    #[arg(long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color of a log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Trace lets the configured level take over without reinstalling the logger
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "medroute", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli)?;
    log::set_max_level(config.log_level.to_level_filter());

    let database_path = config.database_path()?;
    let store = SqliteThresholdStore::open(&database_path)
        .with_context(|| format!("Failed to open threshold database at {:?}", database_path))?;
    info!("Using threshold database {:?}", database_path);

    let controller = Controller::with_config(config, Arc::new(store))?;
    run_command(&controller, cli.command)
}

/// Load the configuration, writing the default one if the file is missing
fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let mut config = if Path::new(&cli.config).exists() {
        Config::from_file(&cli.config)?
    } else {
        warn!("Config file not found at {:?}, creating default config.", cli.config);
        let config = Config::default();
        config.save(&cli.config)?;
        config
    };

    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }
    if let Some(database) = &cli.database {
        config.storage.database_path = Some(database.clone());
    }

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

fn run_command(controller: &Controller, command: Commands) -> Result<()> {
    match command {
        Commands::Resolve { request, family } => {
            let mut resolution = ResolutionRequest::new(&request.source, &request.target, &request.domain);
            if let Some(family) = &family {
                resolution = resolution.with_preferred_family(family);
            }
            for (index, candidate) in controller.resolve(&resolution).iter().enumerate() {
                println!("{}. {}", index + 1, candidate);
            }
        }

        Commands::Thresholds { request, text } => {
            let thresholds = controller.compute_thresholds(
                &request.domain,
                &request.source,
                &request.target,
                &text,
                &ThresholdContext::default(),
            )?;
            println!("{}", serde_json::to_string_pretty(&thresholds)?);
        }

        Commands::Assess {
            request,
            backend,
            source_text,
            translated_text,
        } => {
            let assessment = controller.assess(
                &source_text,
                &translated_text,
                &request.source,
                &request.target,
                &request.domain,
                &backend,
            );
            println!("{}", serde_json::to_string_pretty(&assessment)?);
        }

        Commands::Feedback {
            request,
            level,
            rating,
            issues,
            comment,
            backend,
        } => {
            let mut feedback = UserFeedback::new(rating);
            for issue in &issues {
                let issue: FeedbackIssue = issue.parse()?;
                feedback = feedback.with_issue(issue);
            }
            if let Some(comment) = &comment {
                feedback = feedback.with_comment(comment);
            }
            if let Some(backend) = &backend {
                feedback = feedback.for_backend(backend);
            }

            let outcome = controller
                .feedback_loop()
                .apply(&request.domain, &request.source, &request.target, level.into(), &feedback)
                .map_err(|e| anyhow!("Feedback was not applied: {}", e))?;

            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "changed": outcome.changed,
                    "adjustment": outcome.adjustment,
                    "domain": outcome.domain_thresholds,
                    "pair": outcome.pair_thresholds,
                }))?
            );
        }

        Commands::Completions { .. } => {}
    }

    Ok(())
}
