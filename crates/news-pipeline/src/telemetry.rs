use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// `RUST_LOG_FORMAT=json` switches to JSON lines; anything else is text.
    pub fn from_env() -> Self {
        match std::env::var("RUST_LOG_FORMAT") {
            Ok(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Install the global subscriber. Filter comes from `RUST_LOG`, default `info`.
pub fn init_tracing() {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match LogFormat::from_env() {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter()).init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter()).init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn json_format_is_opt_in() {
        std::env::remove_var("RUST_LOG_FORMAT");
        assert_eq!(LogFormat::from_env(), LogFormat::Text);

        std::env::set_var("RUST_LOG_FORMAT", "JSON");
        assert_eq!(LogFormat::from_env(), LogFormat::Json);

        std::env::set_var("RUST_LOG_FORMAT", "pretty");
        assert_eq!(LogFormat::from_env(), LogFormat::Text);

        std::env::remove_var("RUST_LOG_FORMAT");
    }
}
