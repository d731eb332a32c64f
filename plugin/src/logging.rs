// src/logging.rs

//! Global logger for the plugin.
//!
//! One `fern` dispatch, formatted as
//! `[timestamp][LEVEL][component][pid=..][tid=..] message`, chained to
//! `FE.log` under the host's log directory and to any extra sink the caller
//! provides (the host's own log callback on Windows).

use crate::config::model::LoggingSettings;
use chrono::Local;
use fern::Dispatch;
use log::LevelFilter;
use std::{fs, path::Path, process, thread};

/// File name of the plugin log inside the log directory.
pub const LOG_FILE: &str = "FE.log";

/// Map a configured level name to a filter. Unknown names mean INFO.
pub fn level_filter(name: &str) -> LevelFilter {
    match name.trim().to_uppercase().as_str() {
        "OFF" => LevelFilter::Off,
        "ERROR" => LevelFilter::Error,
        "WARN" | "WARNING" => LevelFilter::Warn,
        "DEBUG" => LevelFilter::Debug,
        "TRACE" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Build the dispatch without installing it.
pub fn build_dispatch(
    log_dir: &Path,
    cfg: &LoggingSettings,
    extra: Option<fern::Output>,
) -> Result<Dispatch, fern::InitError> {
    let mut dispatch = Dispatch::new()
        .format(|out, msg, record| {
            out.finish(format_args!(
                "[{}][{:5}][{}][pid={}][tid={:?}] {}",
                Local::now().to_rfc3339(),
                record.level(),
                record.target(),
                process::id(),
                thread::current().id(),
                msg
            ))
        })
        .level(level_filter(&cfg.level));

    if cfg.enable {
        fs::create_dir_all(log_dir)?;
        dispatch = dispatch.chain(fern::log_file(log_dir.join(LOG_FILE))?);
    }

    if let Some(sink) = extra {
        dispatch = dispatch.chain(sink);
    }

    Ok(dispatch)
}

/// Configure and install the global logger.
pub fn setup_logging(
    log_dir: &Path,
    cfg: &LoggingSettings,
    extra: Option<fern::Output>,
) -> Result<(), fern::InitError> {
    build_dispatch(log_dir, cfg, extra)?.apply()?;
    Ok(())
}
