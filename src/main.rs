use clap::Parser;
use std::process::ExitCode;

use stashlink::cli::{Cli, Commands};
use stashlink::config::{StaticConfig, get_config, init_config, replace_config};
use stashlink::errors::StashError;
use stashlink::runtime::modes::{run_config_gen, run_server, run_sweep};
use stashlink::system::init_logging;

/// 启动失败时输出错误；领域错误使用彩色格式
fn report_failure(err: &anyhow::Error) {
    match err.downcast_ref::<StashError>() {
        Some(stash_err) => eprintln!("{}", stash_err.format_colored()),
        None => eprintln!("[ERROR] {:#}", err),
    }
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Commands::ConfigGen { output_path, force } = cli.command() {
        return match run_config_gen(output_path.as_deref(), force) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                report_failure(&e);
                ExitCode::FAILURE
            }
        };
    }

    match &cli.config {
        Some(path) => replace_config(StaticConfig::load_from(path)),
        None => init_config(),
    }
    let config = get_config();
    let _guard = init_logging(&config.logging);

    let command = cli.command();
    let result = actix_web::rt::System::new().block_on(async move {
        match command {
            Commands::Sweep => run_sweep(&config).await,
            _ => run_server(&config).await,
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Fatal error: {:#}", e);
            report_failure(&e);
            ExitCode::FAILURE
        }
    }
}
