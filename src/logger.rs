use ansi_term::Colour;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use env_logger::{Builder, Env};
use log::Record;
use std::fmt::Display;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Installs the global logger.
///
/// Every line is prefixed with a timestamp in `timezone`, the colored level
/// and the module path. When `log_file` is given the same lines, minus the
/// colors, are appended to it. A failed write to the file never costs the
/// console its line.
pub fn init(log_file: Option<&Path>, timezone: Tz) -> io::Result<()> {
    let log_file = log_file.map(open_log_file).transpose()?;

    Builder::from_env(Env::default().default_filter_or("info"))
        .format(move |buf, record| {
            let timestamp = timestamp(Utc::now(), timezone);

            let level = match record.level() {
                log::Level::Error => Colour::Red.paint(record.level().to_string()),
                log::Level::Warn => Colour::Yellow.paint(record.level().to_string()),
                log::Level::Info => Colour::Green.paint(record.level().to_string()),
                log::Level::Debug => Colour::Blue.paint(record.level().to_string()),
                log::Level::Trace => Colour::Purple.paint(record.level().to_string()),
            };

            if let Some(mut file) = log_file.as_ref() {
                let _ = writeln!(file, "{}", format_line(&timestamp, record.level(), record));
            }

            writeln!(buf, "{}", format_line(&timestamp, level, record))
        })
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e))
}

fn open_log_file(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn timestamp(now: DateTime<Utc>, timezone: Tz) -> String {
    now.with_timezone(&timezone)
        .format("%Y-%m-%dT%H:%M:%S%:z")
        .to_string()
}

/// `[timestamp LEVEL module::path] message`
fn format_line(timestamp: &str, level: impl Display, record: &Record) -> String {
    format!(
        "[{} {} {}] {}",
        timestamp,
        level,
        record.module_path().unwrap_or_default(),
        record.args()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use log::Level;

    #[test]
    fn test_timestamp_in_timezone() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();
        assert_eq!(timestamp(now, Tz::UTC), "2026-10-18T09:30:00+00:00");
        assert_eq!(timestamp(now, Tz::Europe__Moscow), "2026-10-18T12:30:00+03:00");
    }

    #[test]
    fn test_plain_line_format() {
        let line = format_line(
            "2026-10-18T09:30:00+00:00",
            Level::Info,
            &Record::builder()
                .args(format_args!("User said: {}", "hello"))
                .level(Level::Info)
                .module_path(Some("static_server::server::handlers"))
                .build(),
        );

        assert_eq!(
            line,
            "[2026-10-18T09:30:00+00:00 INFO static_server::server::handlers] User said: hello"
        );
    }

    #[test]
    fn test_line_without_module_path() {
        let line = format_line(
            "t",
            Level::Warn,
            &Record::builder().args(format_args!("x")).level(Level::Warn).build(),
        );
        assert_eq!(line, "[t WARN ] x");
    }

    #[test]
    fn test_open_log_file_appends() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("server.log");

        writeln!(open_log_file(&path).unwrap(), "first").unwrap();
        writeln!(open_log_file(&path).unwrap(), "second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
        assert!(open_log_file(&temp.path().join("missing/dir/server.log")).is_err());
    }
}
