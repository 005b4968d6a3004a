use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use log::{debug, warn};
#[cfg(debug_assertions)]
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use simplelog::{CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger, WriteLogger};

/// Verbose runs record resolution details; quiet runs keep warnings and
/// errors only.
fn level_for(debug_enabled: bool) -> LevelFilter {
    if debug_enabled {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    }
}

fn open_log(log_path: &Path) -> io::Result<File> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(log_path)
}

/// Shrink the log to its newest lines once it grows past `max_bytes`,
/// keeping at most half the budget and never splitting a line.
fn cap_log_file(log_path: &Path, max_bytes: u64) -> io::Result<bool> {
    let len = match std::fs::metadata(log_path) {
        Ok(metadata) => metadata.len(),
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(error) => return Err(error),
    };
    if len <= max_bytes {
        return Ok(false);
    }

    let contents = std::fs::read(log_path)?;
    let budget = usize::try_from(max_bytes / 2).unwrap_or(usize::MAX);
    let cut = contents.len().saturating_sub(budget);
    let keep_from = contents[cut..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(contents.len(), |pos| cut + pos + 1);

    std::fs::write(log_path, &contents[keep_from..])?;
    Ok(true)
}

/// Send `log` output from the `fra` crates to `log_path`, plus stderr in
/// debug builds. A log that cannot be opened leaves the updater running
/// without a file logger.
pub fn init_logging(log_path: &Path, debug_enabled: bool, max_log_size: u64) {
    let level = level_for(debug_enabled);
    let capped = cap_log_file(log_path, max_log_size);

    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .add_filter_allow_str("fra")
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    let open_error = match open_log(log_path) {
        Ok(file) => {
            loggers.push(WriteLogger::new(level, config.clone(), file));
            None
        }
        Err(error) => Some(error),
    };

    #[cfg(debug_assertions)]
    loggers.push(TermLogger::new(
        level,
        config,
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ));

    if !loggers.is_empty() {
        let _ = CombinedLogger::init(loggers);
    }
    log::set_max_level(level);

    if let Some(error) = open_error {
        eprintln!("fra-updater: cannot open {}: {error}", log_path.display());
    }
    match capped {
        Ok(true) => debug!("Trimmed {} to its newest entries", log_path.display()),
        Ok(false) => {}
        Err(error) => warn!("Could not trim {}: {error}", log_path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::{LevelFilter, cap_log_file, level_for, open_log};

    #[test]
    fn quiet_runs_still_record_warnings() {
        assert_eq!(level_for(true), LevelFilter::Debug);
        assert_eq!(level_for(false), LevelFilter::Warn);
    }

    #[test]
    fn open_log_creates_missing_parent_directories() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let log_path = temp_dir.path().join("data").join("debug.log");

        open_log(&log_path).expect("log should open");

        assert!(log_path.is_file());
    }

    #[test]
    fn oversized_log_keeps_newest_whole_lines() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let log_path = temp_dir.path().join("debug.log");
        std::fs::write(&log_path, "line-1\nline-2\nline-3\nline-4\nline-5\n")
            .expect("test log file should be written");

        let trimmed = cap_log_file(&log_path, 20).expect("cap should succeed");

        assert!(trimmed);
        let contents = std::fs::read_to_string(&log_path).expect("log should be readable");
        assert_eq!(contents, "line-5\n");
    }

    #[test]
    fn small_or_missing_logs_are_left_alone() {
        let temp_dir = tempfile::tempdir().expect("temporary directory should be created");
        let log_path = temp_dir.path().join("debug.log");

        assert!(!cap_log_file(&log_path, 10).expect("missing log is fine"));

        std::fs::write(&log_path, "short\n").expect("test log file should be written");
        assert!(!cap_log_file(&log_path, 1024).expect("cap should succeed"));
        let contents = std::fs::read_to_string(&log_path).expect("log should be readable");
        assert_eq!(contents, "short\n");
    }
}
