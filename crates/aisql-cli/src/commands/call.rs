use std::sync::Arc;

use clap::Parser;
use tracing::warn;

use aisql::config::Config;
use aisql::functions::{AiFunction, FunctionArgs, FunctionRunner, UdfResponse};
use aisql::provider::{CompletionProvider, RemoteProvider};

use crate::error::{CliError, CliResult};
use crate::output::OutputFormat;

#[derive(Parser)]
pub struct CallCommand {
    #[clap(help = "Function name, e.g. ai_text_summarize")]
    pub name: String,

    #[clap(
        long = "arg",
        short = 'a',
        value_parser = parse_key_val,
        help = "Function argument as key=value (repeatable)"
    )]
    pub args: Vec<(String, String)>,

    #[clap(long, help = "API key, overriding the configured environment variable")]
    pub api_key: Option<String>,
}

/// Parse a `key=value` pair; the value may itself contain `=`
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty argument name in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

impl CallCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> CliResult<()> {
        let function: AiFunction = self.name.parse()?;
        let runner = FunctionRunner::new(self.provider(config), config.models.clone());

        let args: FunctionArgs = self.args.iter().cloned().collect();
        let response = runner.call(function, &args).await;

        match format {
            OutputFormat::Json => println!("{}", response.to_wire()),
            OutputFormat::Table => println!(
                "{}",
                serde_json::to_string_pretty(&response.clone().into_value())?
            ),
        }

        match response {
            UdfResponse::Success(_) => Ok(()),
            UdfResponse::Error { message } => Err(CliError(format!("{function}: {message}"))),
        }
    }

    /// Without a usable key the runner is built without a provider
    fn provider(&self, config: &Config) -> Option<Arc<dyn CompletionProvider>> {
        let provider = match &self.api_key {
            Some(key) => RemoteProvider::with_api_key(&config.provider, key.as_str()),
            None => RemoteProvider::new(&config.provider),
        };

        match provider {
            Ok(provider) => Some(Arc::new(provider)),
            Err(e) => {
                warn!("Remote provider unavailable: {}", e);
                None
            }
        }
    }
}
