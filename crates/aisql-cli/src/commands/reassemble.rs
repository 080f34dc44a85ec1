use std::path::PathBuf;

use clap::Parser;
use serde_json::json;

use aisql::stream::{ReassembledContent, StreamReassembler, reassemble_sse};

use crate::error::CliResult;
use crate::output::{OutputFormat, read_input};

#[derive(Parser)]
pub struct ReassembleCommand {
    #[clap(long, help = "Input is a raw server-sent event capture")]
    pub sse: bool,

    #[clap(help = "Input file (defaults to stdin); a JSON array of fragments unless --sse")]
    pub file: Option<PathBuf>,
}

impl ReassembleCommand {
    pub async fn execute(&self, format: OutputFormat) -> CliResult<()> {
        let input = read_input(self.file.as_deref())?;
        let reassembled = if self.sse {
            reassemble_sse(&input)?
        } else {
            reassemble_fragments(&input)?
        };

        match format {
            OutputFormat::Json => {
                let output = json!({
                    "content": reassembled.content,
                    "mode": reassembled.mode.as_str(),
                    "event_count": reassembled.event_count,
                    "is_complete": reassembled.is_complete,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                println!("{}", reassembled.content);
                eprintln!(
                    "({} fragments, {} delivery{})",
                    reassembled.event_count,
                    reassembled.mode,
                    if reassembled.is_complete { ", complete" } else { "" }
                );
            }
        }

        Ok(())
    }
}

/// Fold a JSON array of fragment strings
pub fn reassemble_fragments(input: &str) -> CliResult<ReassembledContent> {
    let fragments: Vec<String> = serde_json::from_str(input)
        .map_err(|e| format!("Expected a JSON array of strings: {e}"))?;

    let reassembler: StreamReassembler = fragments.iter().collect();
    Ok(ReassembledContent {
        event_count: fragments.len(),
        is_complete: true,
        mode: reassembler.mode(),
        content: reassembler.into_text(),
    })
}
