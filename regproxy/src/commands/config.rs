use crate::context::{self, AppContext};
use anyhow::{Context, Result};
use libregproxy::Config;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Output format for `config show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

/// Serializes the resolved configuration.
pub fn render(config: &Config, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => serde_yaml::to_string(config).context("Failed to render YAML"),
        OutputFormat::Json => {
            serde_json::to_string_pretty(config).context("Failed to render JSON")
        }
    }
}

/// Handle the config show subcommand
pub fn handle_show(ctx: &AppContext, format: OutputFormat) -> Result<()> {
    let output = render(&ctx.config, format)?;
    println!("{}", output.trim_end());
    Ok(())
}

/// Handle the config path subcommand
pub fn handle_path() -> Result<()> {
    let path = context::get_config_path().context("No configuration directory on this platform")?;
    println!("{}", path.display());
    Ok(())
}
