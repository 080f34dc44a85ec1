use std::path::PathBuf;

use clap::Parser;
use serde_json::{Value, json};

use aisql::{ExtractionResult, extract};

use crate::error::CliResult;
use crate::output::{OutputFormat, read_input};

#[derive(Parser)]
pub struct ExtractCommand {
    #[clap(help = "File holding the model output (defaults to stdin)")]
    pub file: Option<PathBuf>,

    #[clap(
        long,
        help = "Always print an object, wrapping non-object results under this field"
    )]
    pub field: Option<String>,
}

impl ExtractCommand {
    pub async fn execute(&self, format: OutputFormat) -> CliResult<()> {
        let input = read_input(self.file.as_deref())?;
        let output = self.render(extract(&input));

        match format {
            OutputFormat::Json => println!("{output}"),
            OutputFormat::Table => println!("{}", serde_json::to_string_pretty(&output)?),
        }

        Ok(())
    }

    fn render(&self, result: ExtractionResult) -> Value {
        if let Some(field) = &self.field {
            return Value::Object(result.into_object_or(field));
        }

        match result {
            ExtractionResult::Structured(value) => json!({
                "structured": true,
                "value": value,
            }),
            ExtractionResult::Fallback { raw_text, reason } => json!({
                "structured": false,
                "reason": reason.as_str(),
                "raw_text": raw_text,
            }),
        }
    }
}
