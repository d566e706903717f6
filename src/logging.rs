//! Tracing subscriber setup for embedders.
//!
//! The library only emits `tracing` events; nothing is printed until the
//! host installs a subscriber, either its own or the one from [`init`].

use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directives.
pub const LOG_ENV: &str = "SKILLFORGE_LOG";

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl LogFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "human" => Some(LogFormat::Text),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

/// Build the filter: `$SKILLFORGE_LOG` when set and valid, else `default_filter`.
pub fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install a global stderr subscriber.
///
/// Returns false when a global subscriber was already set, in which case
/// nothing changes.
pub fn init(default_filter: &str, format: LogFormat) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_filter))
        .with_writer(std::io::stderr);
    let installed = match format {
        LogFormat::Text => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    };
    if installed {
        tracing::debug!(version = %crate::build_info(), "logging initialised");
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("human"), Some(LogFormat::Text));
        assert_eq!(LogFormat::parse("xml"), None);
    }

    #[test]
    fn test_bad_default_filter_falls_back() {
        let filter = env_filter("skillforge=[[[");
        assert!(!filter.to_string().is_empty());
    }

    #[test]
    fn test_init_is_idempotent() {
        let first = init("skillforge=debug", LogFormat::Text);
        let second = init("skillforge=debug", LogFormat::Json);
        // Another test may have installed the subscriber first.
        assert!(!(first && second));
        assert!(!second);
    }
}
