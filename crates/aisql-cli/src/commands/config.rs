use std::path::Path;

use clap::Parser;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};

use aisql::config::Config;

use crate::error::CliResult;
use crate::output::OutputFormat;

#[derive(Parser)]
pub struct ConfigCommand {
    #[clap(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Parser)]
pub enum ConfigSubcommand {
    #[clap(about = "Show current configuration")]
    Show,
}

impl ConfigCommand {
    pub async fn execute(
        &self,
        config_path: Option<&Path>,
        config: &Config,
        format: OutputFormat,
    ) -> CliResult<()> {
        match &self.command {
            ConfigSubcommand::Show => Self::show(config_path, config, format),
        }
    }

    fn show(config_path: Option<&Path>, config: &Config, format: OutputFormat) -> CliResult<()> {
        let key_set = std::env::var(&config.provider.api_key_env).is_ok();

        match format {
            OutputFormat::Json => {
                let mut output = serde_json::to_value(config)?;
                output["provider"]["api_key_set"] = serde_json::Value::Bool(key_set);
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                match config_path {
                    Some(path) => println!("Configuration from: {}", path.display()),
                    None => println!("Configuration: (default locations or defaults)"),
                }
                println!("==============================\n");

                println!("[Provider]");
                let mut provider_table = Table::new();
                provider_table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["Setting", "Value"]);

                provider_table.add_row(["api_url", config.provider.api_url.as_str()]);
                provider_table.add_row([
                    "native_api_url",
                    config.provider.native_api_url.as_str(),
                ]);
                provider_table.add_row([
                    "api_key_env",
                    &format!(
                        "{} ({})",
                        config.provider.api_key_env,
                        if key_set { "set" } else { "not set" }
                    ),
                ]);
                provider_table.add_row(["timeout_secs", &config.provider.timeout_secs.to_string()]);
                provider_table.add_row(["stream", &config.provider.stream.to_string()]);
                println!("{provider_table}\n");

                println!("[Models]");
                let mut models_table = Table::new();
                models_table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["Slot", "Model"]);

                models_table.add_row(["text", config.models.text.as_str()]);
                models_table.add_row(["embedding", config.models.embedding.as_str()]);
                models_table.add_row(["vision", config.models.vision.as_str()]);
                models_table.add_row([
                    "image_embedding",
                    config.models.image_embedding.as_str(),
                ]);
                println!("{models_table}");
            }
        }

        Ok(())
    }
}
