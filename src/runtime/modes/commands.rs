//! 一次性命令

use anyhow::{Context, Result, bail};
use std::path::Path;
use tracing::info;

use crate::config::StaticConfig;
use crate::runtime::lifetime::{prepare_startup, shutdown_background_tasks};

/// 执行一轮过期清理后退出
pub async fn run_sweep(config: &StaticConfig) -> Result<()> {
    let startup = prepare_startup(config).await?;
    let result = startup.content_service.cleanup_expired().await;
    shutdown_background_tasks(startup.tasks, startup.database).await;

    let report = result.context("Expired content sweep failed")?;
    info!(
        records_deleted = report.records_deleted,
        files_removed = report.files_removed,
        "Sweep finished"
    );
    println!(
        "Removed {} expired records ({} files deleted, {} already missing, {} errors)",
        report.records_deleted, report.files_removed, report.files_missing, report.file_errors
    );
    Ok(())
}

/// 写出示例配置
pub fn run_config_gen(output_path: Option<&str>, force: bool) -> Result<()> {
    let path = output_path.unwrap_or("config.example.toml");
    if Path::new(path).exists() && !force {
        bail!("{} already exists, use --force to overwrite", path);
    }

    StaticConfig::default()
        .save_to_file(path)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path, e))?;
    println!("Sample configuration written to {}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_gen_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let path_str = path.to_str().unwrap();

        run_config_gen(Some(path_str), false).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("[database]"));

        assert!(run_config_gen(Some(path_str), false).is_err());
        assert!(run_config_gen(Some(path_str), true).is_ok());
    }
}
