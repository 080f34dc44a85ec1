use clap::Parser;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use serde_json::{Value, json};

use aisql::functions::{AiFunction, Category, FunctionSpec, ModelSlot, Param, ParamKind};

use crate::error::CliResult;
use crate::output::{OutputFormat, truncate_string};

#[derive(Parser)]
pub struct FunctionsCommand {
    #[clap(
        long,
        help = "Only list one category (text, embedding, multimodal, business)"
    )]
    pub category: Option<String>,
}

impl FunctionsCommand {
    pub async fn execute(&self, format: OutputFormat) -> CliResult<()> {
        let specs = self.selected()?;

        match format {
            OutputFormat::Json => {
                let output: Vec<Value> = specs.iter().map(spec_json).collect();
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["Function", "Category", "Model", "Parameters", "Description"]);

                for spec in &specs {
                    let params: Vec<String> = spec.params.iter().map(param_signature).collect();
                    table.add_row([
                        spec.name,
                        spec.category.as_str(),
                        model_slot(spec.model),
                        &params.join(", "),
                        &truncate_string(spec.summary, 60),
                    ]);
                }

                println!("{table}");
                println!("\n{} functions", specs.len());
            }
        }

        Ok(())
    }

    fn selected(&self) -> CliResult<Vec<FunctionSpec>> {
        let category = match self.category.as_deref() {
            None => None,
            Some(name) => Some(parse_category(name)?),
        };

        Ok(AiFunction::ALL
            .iter()
            .map(|f| f.spec())
            .filter(|spec| category.is_none_or(|c| spec.category == c))
            .collect())
    }
}

fn parse_category(name: &str) -> CliResult<Category> {
    match name.to_ascii_lowercase().as_str() {
        "text" => Ok(Category::Text),
        "embedding" => Ok(Category::Embedding),
        "multimodal" => Ok(Category::Multimodal),
        "business" => Ok(Category::Business),
        other => Err(format!("Unknown category: {other}").into()),
    }
}

fn model_slot(slot: ModelSlot) -> &'static str {
    match slot {
        ModelSlot::Text => "text",
        ModelSlot::Embedding => "embedding",
        ModelSlot::Vision => "vision",
        ModelSlot::ImageEmbedding => "image_embedding",
    }
}

fn kind_name(kind: ParamKind) -> &'static str {
    match kind {
        ParamKind::Text => "string",
        ParamKind::Integer => "integer",
        ParamKind::Float => "number",
        ParamKind::Bool => "boolean",
        ParamKind::JsonArray => "json array",
    }
}

fn param_signature(param: &Param) -> String {
    match param.default {
        Some(default) => format!("{}={}", param.name, default),
        None => param.name.to_string(),
    }
}

fn spec_json(spec: &FunctionSpec) -> Value {
    let params: Vec<Value> = spec
        .params
        .iter()
        .map(|p| {
            json!({
                "name": p.name,
                "type": kind_name(p.kind),
                "required": p.default.is_none(),
                "default": p.default,
            })
        })
        .collect();

    json!({
        "name": spec.name,
        "category": spec.category.as_str(),
        "model": model_slot(spec.model),
        "description": spec.summary,
        "params": params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_filter() {
        let command = FunctionsCommand {
            category: Some("Multimodal".to_string()),
        };
        let specs = command.selected().unwrap();
        assert_eq!(specs.len(), 8);
        assert!(specs.iter().all(|s| s.category == Category::Multimodal));

        let command = FunctionsCommand {
            category: Some("audio".to_string()),
        };
        assert!(command.selected().is_err());
    }

    #[test]
    fn test_param_signature() {
        let spec = AiFunction::FindSimilarText.spec();
        let signature: Vec<String> = spec.params.iter().map(param_signature).collect();
        assert_eq!(signature, vec!["query_text", "candidate_texts_json", "top_k=5"]);
    }

    #[test]
    fn test_image_embedding_listing() {
        let value = spec_json(&AiFunction::ImageSimilarity.spec());
        assert_eq!(value["model"], json!("image_embedding"));
        assert_eq!(value["category"], json!("multimodal"));
    }

    #[test]
    fn test_spec_json() {
        let value = spec_json(&AiFunction::TextSummarize.spec());
        assert_eq!(value["name"], json!("ai_text_summarize"));
        assert_eq!(value["params"][1], json!({
            "name": "max_length",
            "type": "integer",
            "required": false,
            "default": "200"
        }));
    }
}
