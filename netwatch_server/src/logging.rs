use anyhow::Result;
use flexi_logger::{Age, Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming};

use crate::config::AppConfig;

/// Initialize file logging; keep the returned handle alive for the process lifetime
pub fn init_logging(config: &AppConfig) -> Result<LoggerHandle> {
    std::fs::create_dir_all(&config.log_dir)?;

    let handle = Logger::try_with_str(&config.log_spec)?
        .log_to_file(
            FileSpec::default()
                .directory(&config.log_dir)
                .basename("netwatch_server")
                .suffix("log"),
        )
        .rotate(
            Criterion::Age(Age::Day),
            Naming::Numbers,
            Cleanup::KeepLogFiles(7),
        )
        .duplicate_to_stderr(Duplicate::Info)
        .start()?;

    Ok(handle)
}
