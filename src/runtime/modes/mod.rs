//! Mode routing
//!
//! - `server`：HTTP 服务（默认）
//! - `commands`：一次性命令（清理、生成配置）

pub mod commands;
pub mod server;

pub use commands::{run_config_gen, run_sweep};
pub use server::run_server;
