//! A small leveled logger, styled after the teacher's hand-rolled
//! `RedisServer::log` (no external logging facade: none of this crate's
//! reference pack reaches for one for a component this size).

use std::{
    fmt::Display,
    fs::OpenOptions,
    io::{self, BufWriter, Write},
    path::PathBuf,
    process::id,
};

use crate::util::timestamp;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum LogLevel {
    Debug,
    Verbose,
    Notice,
    Warning,
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ch = match self {
            Self::Debug => '.',
            Self::Verbose => '-',
            Self::Notice => '*',
            Self::Warning => '#',
        };
        write!(f, "{ch}")
    }
}

/// Where a `Logger` writes. Kept as an explicit value on the struct rather
/// than reopening the file per line, unlike the teacher's version, since
/// the reactor may log once per iteration and shouldn't pay an `open()`
/// per line.
enum Sink {
    Stderr,
    File(PathBuf),
}

pub struct Logger {
    sink: Sink,
    verbosity: LogLevel,
}

impl Logger {
    pub fn stderr(verbosity: LogLevel) -> Self {
        Logger { sink: Sink::Stderr, verbosity }
    }

    pub fn to_file(path: impl Into<PathBuf>, verbosity: LogLevel) -> Self {
        Logger { sink: Sink::File(path.into()), verbosity }
    }

    pub fn log(&self, level: LogLevel, body: &str) {
        if level < self.verbosity {
            return;
        }

        let line = format!("[{}] {} {}: {}\n", id(), timestamp().as_millis(), level, body);
        let result = match &self.sink {
            Sink::Stderr => {
                let mut w = io::stderr();
                w.write_all(line.as_bytes())
            }
            Sink::File(path) => match OpenOptions::new().create(true).append(true).open(path) {
                Ok(f) => {
                    let mut w = BufWriter::new(f);
                    w.write_all(line.as_bytes()).and_then(|_| w.flush())
                }
                Err(e) => Err(e),
            },
        };
        if let Err(e) = result {
            eprintln!("log write failed: {e}");
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Logger::stderr(LogLevel::Notice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Verbose);
        assert!(LogLevel::Verbose < LogLevel::Notice);
        assert!(LogLevel::Notice < LogLevel::Warning);
    }

    #[test]
    fn display_tags() {
        assert_eq!(format!("{}", LogLevel::Debug), ".");
        assert_eq!(format!("{}", LogLevel::Warning), "#");
    }

    #[test]
    fn gated_by_verbosity_does_not_panic() {
        let logger = Logger::stderr(LogLevel::Warning);
        logger.log(LogLevel::Debug, "should be suppressed");
        logger.log(LogLevel::Warning, "should print");
    }
}
