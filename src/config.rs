use crate::error::{AppError, Result};

/// Delay between one cycle finishing and the next producer launch (ms).
pub const DEFAULT_COOLDOWN_MS: u64 = 500;

/// Grace period after asking the producer to terminate before killing it (ms).
pub const DEFAULT_KILL_GRACE_MS: u64 = 3000;

/// Seeds for the synthetic id counters. The event seed sits in a disjoint
/// range so the two id spaces can never collide within one process lifetime.
pub const DEFAULT_MATCH_ID_SEED: i64 = 100_000;
pub const DEFAULT_EVENT_ID_SEED: i64 = 1_000_000;

/// Extension of producer output documents in the data directory.
pub const DOCUMENT_EXT: &str = "json";

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    /// Interpreter used to run the producer (PRODUCER_PROGRAM).
    pub producer_program: String,
    /// Script argument passed to the interpreter (PRODUCER_SCRIPT).
    pub producer_script: String,
    /// Working directory the producer is launched from (PRODUCER_DIR).
    pub producer_dir: String,
    /// Directory scanned non-recursively for output documents (DATA_DIR).
    pub data_dir: String,
    pub cooldown_ms: u64,
    pub kill_grace_ms: u64,
    pub match_id_seed: i64,
    pub event_id_seed: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "linebet.db".to_string()),
            producer_program: std::env::var("PRODUCER_PROGRAM")
                .unwrap_or_else(|_| "python3".to_string()),
            producer_script: std::env::var("PRODUCER_SCRIPT")
                .unwrap_or_else(|_| "parsak.py".to_string()),
            producer_dir: std::env::var("PRODUCER_DIR").unwrap_or_else(|_| ".".to_string()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            cooldown_ms: parse_env_u64("COOLDOWN_MS", DEFAULT_COOLDOWN_MS)?,
            kill_grace_ms: parse_env_u64("KILL_GRACE_MS", DEFAULT_KILL_GRACE_MS)?,
            match_id_seed: parse_env_i64("MATCH_ID_SEED", DEFAULT_MATCH_ID_SEED)?,
            event_id_seed: parse_env_i64("EVENT_ID_SEED", DEFAULT_EVENT_ID_SEED)?,
        })
    }
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<u64>()
            .map_err(|_| AppError::Config(format!("{name} must be a non-negative integer"))),
        Err(_) => Ok(default),
    }
}

fn parse_env_i64(name: &str, default: i64) -> Result<i64> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<i64>()
            .map_err(|_| AppError::Config(format!("{name} must be an integer"))),
        Err(_) => Ok(default),
    }
}
