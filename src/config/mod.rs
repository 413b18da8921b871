//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{num::NonZeroU32, path::PathBuf, str::FromStr};

use clap::{Args, Parser, Subcommand, ValueEnum, builder::BoolishValueParser};
use config::{Config, Environment, File};
use cron::Schedule;
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "palaver";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_VIEW_FLUSH_CRON: &str = "0 */2 * * * *";
const DEFAULT_LIKE_FLUSH_CRON: &str = "20 */3 * * * *";
const DEFAULT_RATE_FLUSH_CRON: &str = "40 */3 * * * *";
const DEFAULT_RANK_CRON: &str = "0 0 * * * *";
const DEFAULT_RANK_WINDOW_DAYS: u32 = 15;
const DEFAULT_RANK_SIZE: u32 = 10;

/// Command-line arguments for the Palaver binary.
#[derive(Debug, Parser)]
#[command(name = "palaver", version, about = "Palaver aggregation engine")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "PALAVER_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the reconciliation scheduler.
    Serve(Box<ServeArgs>),
    /// Run a single reconciliation pass and exit.
    #[command(name = "run-job")]
    RunJob(RunJobArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct RunJobArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,

    /// Which reconciliation job to run.
    #[arg(value_enum, value_name = "JOB")]
    pub job: JobName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum JobName {
    /// Drain staged view counts into the database.
    FlushViews,
    /// Drain the like toggle queue.
    FlushLikes,
    /// Drain the comment-rate toggle queue.
    FlushRates,
    /// Recompute and publish the hot ranking.
    RecomputeRank,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the view flush cron expression.
    #[arg(long = "engine-view-flush-cron", value_name = "CRON")]
    pub view_flush_cron: Option<String>,

    /// Override the like flush cron expression.
    #[arg(long = "engine-like-flush-cron", value_name = "CRON")]
    pub like_flush_cron: Option<String>,

    /// Override the comment-rate flush cron expression.
    #[arg(long = "engine-rate-flush-cron", value_name = "CRON")]
    pub rate_flush_cron: Option<String>,

    /// Override the rank recompute cron expression.
    #[arg(long = "engine-rank-cron", value_name = "CRON")]
    pub rank_cron: Option<String>,

    /// Override the rank candidate window in days.
    #[arg(long = "engine-rank-window-days", value_name = "DAYS")]
    pub rank_window_days: Option<u32>,

    /// Override the published ranking size.
    #[arg(long = "engine-rank-size", value_name = "COUNT")]
    pub rank_size: Option<u32>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub engine: EngineSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub view_flush_cron: Schedule,
    pub like_flush_cron: Schedule,
    pub rate_flush_cron: Schedule,
    pub rank_cron: Schedule,
    pub rank_window_days: NonZeroU32,
    pub rank_size: NonZeroU32,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("PALAVER").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::RunJob(args)) => raw.apply_serve_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    engine: RawEngineSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(cron) = overrides.view_flush_cron.as_ref() {
            self.engine.view_flush_cron = Some(cron.clone());
        }
        if let Some(cron) = overrides.like_flush_cron.as_ref() {
            self.engine.like_flush_cron = Some(cron.clone());
        }
        if let Some(cron) = overrides.rate_flush_cron.as_ref() {
            self.engine.rate_flush_cron = Some(cron.clone());
        }
        if let Some(cron) = overrides.rank_cron.as_ref() {
            self.engine.rank_cron = Some(cron.clone());
        }
        if let Some(days) = overrides.rank_window_days {
            self.engine.rank_window_days = Some(days);
        }
        if let Some(size) = overrides.rank_size {
            self.engine.rank_size = Some(size);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            database,
            engine,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let database = build_database_settings(database)?;
        let engine = build_engine_settings(engine)?;

        Ok(Self {
            logging,
            database,
            engine,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let max_value = database
        .max_connections
        .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);
    let max_connections = non_zero_u32(max_value.into(), "database.max_connections")?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_engine_settings(engine: RawEngineSettings) -> Result<EngineSettings, LoadError> {
    let view_flush_cron = parse_cron(
        engine.view_flush_cron.as_deref(),
        DEFAULT_VIEW_FLUSH_CRON,
        "engine.view_flush_cron",
    )?;
    let like_flush_cron = parse_cron(
        engine.like_flush_cron.as_deref(),
        DEFAULT_LIKE_FLUSH_CRON,
        "engine.like_flush_cron",
    )?;
    let rate_flush_cron = parse_cron(
        engine.rate_flush_cron.as_deref(),
        DEFAULT_RATE_FLUSH_CRON,
        "engine.rate_flush_cron",
    )?;
    let rank_cron = parse_cron(
        engine.rank_cron.as_deref(),
        DEFAULT_RANK_CRON,
        "engine.rank_cron",
    )?;

    let window_value = engine.rank_window_days.unwrap_or(DEFAULT_RANK_WINDOW_DAYS);
    let rank_window_days = non_zero_u32(window_value.into(), "engine.rank_window_days")?;

    let size_value = engine.rank_size.unwrap_or(DEFAULT_RANK_SIZE);
    let rank_size = non_zero_u32(size_value.into(), "engine.rank_size")?;

    Ok(EngineSettings {
        view_flush_cron,
        like_flush_cron,
        rate_flush_cron,
        rank_cron,
        rank_window_days,
        rank_size,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawEngineSettings {
    view_flush_cron: Option<String>,
    like_flush_cron: Option<String>,
    rate_flush_cron: Option<String>,
    rank_cron: Option<String>,
    rank_window_days: Option<u32>,
    rank_size: Option<u32>,
}

fn parse_cron(
    value: Option<&str>,
    default: &str,
    key: &'static str,
) -> Result<Schedule, LoadError> {
    let expr = value.unwrap_or(default);
    Schedule::from_str(expr)
        .map_err(|err| LoadError::invalid(key, format!("invalid cron expression `{expr}`: {err}")))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_take_highest_precedence() {
        let mut raw = RawSettings::default();
        raw.logging.level = Some("info".to_string());
        raw.engine.rank_size = Some(20);

        let overrides = ServeOverrides {
            log_level: Some("debug".to_string()),
            rank_size: Some(5),
            ..Default::default()
        };

        raw.apply_serve_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(settings.logging.level, LevelFilter::DEBUG);
        assert_eq!(settings.engine.rank_size.get(), 5);
    }

    #[test]
    fn defaults_cover_every_engine_knob() {
        let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
        assert_eq!(settings.engine.rank_window_days.get(), 15);
        assert_eq!(settings.engine.rank_size.get(), 10);
        assert_eq!(settings.database.max_connections.get(), 8);
    }

    #[test]
    fn invalid_cron_expression_is_rejected() {
        let mut raw = RawSettings::default();
        raw.engine.rank_cron = Some("not a cron".to_string());
        let err = Settings::from_raw(raw).expect_err("invalid cron");
        assert!(matches!(
            err,
            LoadError::Invalid {
                key: "engine.rank_cron",
                ..
            }
        ));
    }

    #[test]
    fn zero_rank_window_is_rejected() {
        let mut raw = RawSettings::default();
        raw.engine.rank_window_days = Some(0);
        assert!(Settings::from_raw(raw).is_err());
    }

    #[test]
    fn blank_database_url_is_treated_as_unset() {
        let mut raw = RawSettings::default();
        raw.database.url = Some("   ".to_string());
        let settings = Settings::from_raw(raw).expect("valid settings");
        assert!(settings.database.url.is_none());
    }

    #[test]
    fn cli_json_logging_enforces_format() {
        let mut raw = RawSettings::default();
        let overrides = ServeOverrides {
            log_json: Some(true),
            ..Default::default()
        };

        raw.apply_serve_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert!(matches!(settings.logging.format, LogFormat::Json));
    }

    #[test]
    fn default_to_serve_command() {
        let args = CliArgs::parse_from(["palaver"]);
        let command = args
            .command
            .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
        assert!(matches!(command, Command::Serve(_)));
    }

    #[test]
    fn parse_run_job_arguments() {
        let args = CliArgs::parse_from([
            "palaver",
            "run-job",
            "--database-url",
            "postgres://example",
            "flush-views",
        ]);

        match args.command.expect("run-job command") {
            Command::RunJob(run) => {
                assert_eq!(
                    run.overrides.database_url.as_deref(),
                    Some("postgres://example")
                );
                assert_eq!(run.job, JobName::FlushViews);
            }
            _ => panic!("wrong command parsed"),
        }
    }

    #[test]
    fn parse_serve_overrides() {
        let args = CliArgs::parse_from([
            "palaver",
            "serve",
            "--engine-rank-size",
            "25",
            "--database-url",
            "postgres://override",
        ]);

        match args.command.expect("serve command") {
            Command::Serve(serve) => {
                assert_eq!(serve.overrides.rank_size, Some(25));
                assert_eq!(
                    serve.overrides.database_url.as_deref(),
                    Some("postgres://override")
                );
            }
            _ => panic!("wrong command parsed"),
        }
    }
}
