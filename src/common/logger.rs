use std::path::Path;
use std::str::FromStr;

use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::filter::threshold::ThresholdFilter;
use log4rs::Handle;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::common::errors::TextIndexError;

const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} {l} [{T}] {t} - {m}{n}";
const LOG_FILE_NAME: &str = "text_index.log";
const CONSOLE_APPENDER: &str = "console";
const FILE_APPENDER: &str = "file";

/// Global log4rs handle, only set once and reconfigured afterwards.
pub static LOG4RS_HANDLE: Lazy<Mutex<Option<Handle>>> = Lazy::new(|| Mutex::new(None));

/// Logger configuration for the text_index lib.
///
/// - `log_directory`: where `text_index.log` is written when `log_in_file` is set.
/// - `log_level`: one of `trace`, `debug`, `info`, `warn`, `error`, `off`.
/// - `console_display`: also log to stdout.
/// - `only_record_text_index`: only record `target=text_index` log content.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub log_directory: String,
    pub log_level: String,
    pub log_in_file: bool,
    pub console_display: bool,
    pub only_record_text_index: bool,
}

impl LoggerConfig {
    pub fn new(
        log_directory: String,
        log_level: String,
        log_in_file: bool,
        console_display: bool,
        only_record_text_index: bool,
    ) -> Self {
        Self { log_directory, log_level, log_in_file, console_display, only_record_text_index }
    }

    fn level_filter(&self) -> crate::Result<LevelFilter> {
        LevelFilter::from_str(&self.log_level).map_err(|_| {
            TextIndexError::InvalidArgument(format!("unknown log level `{}`", self.log_level))
        })
    }

    pub fn build_logger_config(&self) -> crate::Result<Config> {
        let level = self.level_filter()?;
        let mut builder = Config::builder();
        let mut appenders: Vec<&str> = Vec::new();

        if self.console_display {
            let console = ConsoleAppender::builder()
                .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
                .build();
            builder = builder.appender(
                Appender::builder()
                    .filter(Box::new(ThresholdFilter::new(level)))
                    .build(CONSOLE_APPENDER, Box::new(console)),
            );
            appenders.push(CONSOLE_APPENDER);
        }
        if self.log_in_file {
            let log_path = Path::new(&self.log_directory).join(LOG_FILE_NAME);
            let file = FileAppender::builder()
                .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
                .append(true)
                .build(log_path)?;
            builder = builder.appender(
                Appender::builder()
                    .filter(Box::new(ThresholdFilter::new(level)))
                    .build(FILE_APPENDER, Box::new(file)),
            );
            appenders.push(FILE_APPENDER);
        }

        let config = if self.only_record_text_index {
            builder
                .logger(
                    Logger::builder()
                        .appenders(appenders)
                        .additive(false)
                        .build(env!("CARGO_CRATE_NAME"), level),
                )
                .build(Root::builder().build(LevelFilter::Off))
        } else {
            builder.build(Root::builder().appenders(appenders).build(level))
        };
        config.map_err(|e| TextIndexError::SystemError(format!("invalid log4rs config: {e}")))
    }
}

pub struct TextIndexLogger;

impl TextIndexLogger {
    /// Install `config` as the global logger, or swap it in when a logger is already installed.
    pub fn update_log4rs_handler(
        handle: &Lazy<Mutex<Option<Handle>>>,
        config: Config,
    ) -> crate::Result<()> {
        let mut guard = handle.lock();
        match guard.as_ref() {
            Some(existing) => existing.set_config(config),
            None => {
                let new_handle = log4rs::init_config(config)
                    .map_err(|e| TextIndexError::SystemError(e.to_string()))?;
                *guard = Some(new_handle);
            }
        }
        Ok(())
    }

    pub fn initialize(logger_config: &LoggerConfig) -> crate::Result<()> {
        let config = logger_config.build_logger_config()?;
        Self::update_log4rs_handler(&LOG4RS_HANDLE, config)
    }
}
