use clap::{CommandFactory, Parser, Subcommand};
use libregproxy::config::UpstreamScheme;
use std::net::SocketAddr;
use std::path::PathBuf;

mod commands;
mod context;
mod logging;

/// Regproxy - Authenticating Registry Proxy
///
/// Forwards OCI/Docker registry reads to the registry named by the `upstream`
/// query parameter and answers Bearer token challenges on the client's behalf.
#[derive(Parser, Debug)]
#[command(name = "regproxy")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file (YAML)
    #[arg(long, global = true, env = "REGPROXY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the proxy
    Serve {
        /// Address to listen on, e.g. 0.0.0.0:8080
        #[arg(long)]
        bind: Option<SocketAddr>,
        /// Scheme used to reach upstream registries: https, http
        #[arg(long)]
        upstream_scheme: Option<UpstreamScheme>,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Display version information
    Version,
    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the resolved configuration
    Show {
        /// Output format: yaml, json
        #[arg(short, long, value_enum, default_value_t)]
        format: commands::config::OutputFormat,
    },
    /// Print the default configuration file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            commands::version::print_version();
            Ok(())
        }
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
            Ok(())
        }
        Commands::Config {
            command: ConfigCommands::Path,
        } => commands::config::handle_path(),
        Commands::Config {
            command: ConfigCommands::Show { format },
        } => {
            let ctx = context::AppContext::build(
                cli.config.as_deref(),
                &context::CliOverrides::default(),
                cli.verbose,
            )?;
            commands::config::handle_show(&ctx, format)
        }
        Commands::Serve {
            bind,
            upstream_scheme,
        } => {
            // Build context with precedence: defaults > config file > env vars > CLI flags
            let overrides = context::CliOverrides {
                bind,
                upstream_scheme,
            };
            let ctx = context::AppContext::build(cli.config.as_deref(), &overrides, cli.verbose)?;
            logging::init(&ctx.config.log.level, ctx.verbose);
            commands::serve::handle_serve(&ctx).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve_flags() {
        let cli = Cli::try_parse_from([
            "regproxy",
            "-vv",
            "serve",
            "--bind",
            "127.0.0.1:5000",
            "--upstream-scheme",
            "http",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Serve {
                bind,
                upstream_scheme,
            } => {
                assert_eq!(bind, Some("127.0.0.1:5000".parse().unwrap()));
                assert_eq!(upstream_scheme, Some(UpstreamScheme::Http));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_bad_bind() {
        assert!(Cli::try_parse_from(["regproxy", "serve", "--bind", "nowhere"]).is_err());
    }

    #[test]
    fn test_parse_config_show_format() {
        let cli = Cli::try_parse_from(["regproxy", "config", "show", "--format", "json"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: ConfigCommands::Show {
                    format: commands::config::OutputFormat::Json
                }
            }
        ));
    }
}
