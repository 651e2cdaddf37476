use ::log::{Record, Level, Metadata, SetLoggerError};

/// Cible de tous les logs de l'application.
pub const TARGET: &str = "helpdesk";

#[macro_use]
pub mod macros {
    #[doc(alias = "log::error")]
    #[macro_export]
    macro_rules! log_error {
        ($($arg:tt)*) => {
            ::log::error!(target: $crate::log::TARGET, $($arg)*)
        };
    }
    #[doc(alias = "log::warn")]
    #[macro_export]
    macro_rules! log_warn {
        ($($arg:tt)*) => {
            ::log::warn!(target: $crate::log::TARGET, $($arg)*)
        };
    }
    #[doc(alias = "log::info")]
    #[macro_export]
    macro_rules! log_info {
        ($($arg:tt)*) => {
            ::log::info!(target: $crate::log::TARGET, $($arg)*)
        };
    }
    #[doc(alias = "log::debug")]
    #[macro_export]
    macro_rules! log_debug {
        ($($arg:tt)*) => {
            ::log::debug!(target: $crate::log::TARGET, $($arg)*)
        };
    }
}

struct SimpleLogger;

impl ::log::Log for SimpleLogger {
    #[inline]
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= ::log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) || record.target() != TARGET {
            return;
        }
        let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S");
        if cfg!(feature = "verbose") {
            println!("{} [{}] {}: {}", now, record.level(), record.module_path().unwrap_or_default(), record.args());
        } else {
            println!("{} [{}] {}", now, record.level(), record.args());
        }
    }
    #[inline]
    fn flush(&self) {}
}

/// Convertit le niveau de log de la configuration.
///
/// Un niveau inconnu retombe sur `info`.
pub fn parse_level(level: &str) -> Level {
    match level.to_ascii_lowercase().as_str() {
        "error" => Level::Error,
        "warn" | "warning" => Level::Warn,
        "debug" => Level::Debug,
        "trace" => Level::Trace,
        _ => Level::Info,
    }
}

static LOGGER: SimpleLogger = SimpleLogger;

/// Installe le logger global. Ne peut être appelé qu'une seule fois.
pub fn init(level: Level) -> Result<(), SetLoggerError> {
    ::log::set_logger(&LOGGER)
        .map(|_| ::log::set_max_level(level.to_level_filter()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_from_config() {
        assert_eq!(parse_level("WARN"), Level::Warn);
        assert_eq!(parse_level("debug"), Level::Debug);
        assert_eq!(parse_level("n'importe quoi"), Level::Info);
    }
}
