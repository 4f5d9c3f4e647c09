use std::{
    env, fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use crate::{errors::Error, Result};

/// Largest number of ids Telegram accepts in a single delete request.
pub const MAX_BATCH_SIZE: usize = 100;

pub const DEFAULT_MESSAGE_LIMIT: usize = 1000;
pub const DEFAULT_MAX_RATE_LIMIT_RETRIES: u32 = 10;
pub const DEFAULT_SESSION_FILE: &str = "default.session";

/// Values that come from the command line (or their env fallbacks, resolved by clap).
#[derive(Clone, Debug, Default)]
pub struct CliValues {
    pub api_id: String,
    pub api_hash: String,
    pub phone: Option<String>,
    pub session_file: Option<PathBuf>,
    pub dry_run: bool,
    pub list_only: bool,
    pub json: bool,
}

/// Typed configuration for a cleaner run.
#[derive(Clone, Debug)]
pub struct Config {
    // Credentials
    pub api_id: i32,
    pub api_hash: String,
    pub phone: Option<String>,
    pub session_file: PathBuf,

    // Behavior flags
    pub dry_run: bool,
    pub list_only: bool,
    pub json: bool,

    // Limits
    pub message_limit: usize,
    pub batch_size: usize,
    pub max_rate_limit_retries: u32,
    pub delete_interval: Duration,
}

impl Config {
    pub fn load(cli: CliValues) -> Result<Self> {
        let api_id = cli
            .api_id
            .trim()
            .parse::<i32>()
            .map_err(|_| Error::Config(format!("--api-id must be an integer, got {:?}", cli.api_id)))?;

        let api_hash = cli.api_hash.trim().to_string();
        if api_hash.is_empty() {
            return Err(Error::Config("--api-hash must not be empty".to_string()));
        }

        let phone = cli
            .phone
            .and_then(non_empty)
            .or_else(|| env_str("TG_PHONE").and_then(non_empty));

        let session_file = cli
            .session_file
            .or_else(|| env_path("TGC_SESSION_FILE"))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE));

        let message_limit = env_parse("TGC_MESSAGE_LIMIT").unwrap_or(DEFAULT_MESSAGE_LIMIT);
        let batch_size = env_parse("TGC_BATCH_SIZE")
            .unwrap_or(MAX_BATCH_SIZE)
            .clamp(1, MAX_BATCH_SIZE);
        let max_rate_limit_retries =
            env_parse("TGC_MAX_RATE_LIMIT_RETRIES").unwrap_or(DEFAULT_MAX_RATE_LIMIT_RETRIES);
        let delete_interval =
            Duration::from_millis(env_parse("TGC_DELETE_INTERVAL_MS").unwrap_or(0));

        Ok(Self {
            api_id,
            api_hash,
            phone,
            session_file,
            dry_run: cli.dry_run,
            list_only: cli.list_only,
            json: cli.json,
            message_limit,
            batch_size,
            max_rate_limit_retries,
            delete_interval,
        })
    }
}

/// Load `KEY=value` pairs from a `.env` file into the process environment.
///
/// Existing variables are never overridden. Must run before argument parsing
/// so clap's env fallbacks can see the values.
pub fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue;
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Numeric knob from the environment; unset or unparsable falls back to the default.
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env_str(key).and_then(|s| s.trim().parse().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.trim().to_string())
    }
}
