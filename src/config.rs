use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_OUTPUT_DIR: &str = "pewpew";
const DEFAULT_WAIT_MS: u64 = 15_000;
const DEFAULT_PARALLELISM: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// External demo parser. `.dem` inputs are rejected when unset.
    pub parser_exe: Option<PathBuf>,
    pub parser_output_dir: PathBuf,
    pub parser_wait: Duration,
    pub parallelism: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            parser_exe: None,
            parser_output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            parser_wait: Duration::from_millis(DEFAULT_WAIT_MS),
            parallelism: DEFAULT_PARALLELISM,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let wait_ms = opt_env("CS2_PARSER_WAIT_MS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_WAIT_MS)
            .clamp(100, 120_000);
        let parallelism = opt_env("ANALYZE_PARALLELISM")
            .and_then(|val| val.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_PARALLELISM)
            .clamp(1, 32);
        Self {
            parser_exe: opt_env("CS2_PARSER_EXE").map(PathBuf::from),
            parser_output_dir: opt_env("CS2_PARSER_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.parser_output_dir),
            parser_wait: Duration::from_millis(wait_ms),
            parallelism,
        }
    }
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .and_then(|val| if val.trim().is_empty() { None } else { Some(val) })
}

#[cfg(test)]
mod tests {
    use super::AppConfig;

    #[test]
    fn defaults_are_sane() {
        let cfg = AppConfig::default();
        assert!(cfg.parser_exe.is_none());
        assert_eq!(cfg.parallelism, 4);
        assert_eq!(cfg.parser_wait.as_millis(), 15_000);
        assert!(cfg.parser_output_dir.ends_with("pewpew"));
    }
}
