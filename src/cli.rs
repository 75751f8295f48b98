//! Command-line interface definitions using clap
//!
//! Without a subcommand the HTTP server is started.

use clap::{Parser, Subcommand};

/// stashlink - ephemeral file, note and short-URL exchange
#[derive(Parser, Debug)]
#[command(name = "stashlink")]
#[command(version)]
#[command(about = "Ephemeral file, note and short-URL exchange", long_about = None)]
pub struct Cli {
    /// Configuration file path (default: config.toml)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Run one expiry sweep and exit
    Sweep,

    /// Write a sample configuration file
    ConfigGen {
        /// Output path (default: config.example.toml)
        output_path: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    /// 未指定子命令时按 `serve` 处理
    pub fn command(&self) -> Commands {
        match &self.command {
            Some(Commands::ConfigGen { output_path, force }) => Commands::ConfigGen {
                output_path: output_path.clone(),
                force: *force,
            },
            Some(Commands::Sweep) => Commands::Sweep,
            Some(Commands::Serve) | None => Commands::Serve,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_serve() {
        let cli = Cli::try_parse_from(["stashlink"]).unwrap();
        assert_eq!(cli.command(), Commands::Serve);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_sweep_with_config() {
        let cli = Cli::try_parse_from(["stashlink", "sweep", "-c", "prod.toml"]).unwrap();
        assert_eq!(cli.command(), Commands::Sweep);
        assert_eq!(cli.config.as_deref(), Some("prod.toml"));
    }

    #[test]
    fn test_config_gen() {
        let cli = Cli::try_parse_from(["stashlink", "config-gen", "out.toml", "--force"]).unwrap();
        assert_eq!(
            cli.command(),
            Commands::ConfigGen {
                output_path: Some("out.toml".to_string()),
                force: true,
            }
        );
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(Cli::try_parse_from(["stashlink", "tui"]).is_err());
    }
}
