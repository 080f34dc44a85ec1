//! Executes catalogue functions against a completion provider

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Local;
use futures::{StreamExt, TryStreamExt, stream};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::config::ModelsConfig;
use crate::error::{AisqlError, Result};
use crate::extract::{ExtractionResult, extract};
use crate::functions::catalog::{
    AiFunction, Echo, Fallback, FunctionSpec, ModelSlot, OutputShape, Param, ParamKind,
};
use crate::functions::embedding::{DocumentHit, ScoredText, cosine_similarity, snippet, top_k};
use crate::functions::prompts::{self, render};
use crate::functions::response::{PROVIDER_UNAVAILABLE, UdfResponse};
use crate::functions::{FunctionArgs, MODEL_ARG};
use crate::provider::{ChatMessage, CompletionProvider, CompletionRequest, ProviderError};

/// Embedding requests in flight at once for array arguments
const EMBED_CONCURRENCY: usize = 8;

const INDUSTRY_L1: &str = "一级行业";
const INDUSTRY_L2: &str = "二级行业";
const INDUSTRY_RAW: &str = "原始内容";

/// Runs catalogue functions.
///
/// The provider is optional: a runner built without one answers every call
/// with an error response instead of failing to construct.
#[derive(Clone)]
pub struct FunctionRunner {
    provider: Option<Arc<dyn CompletionProvider>>,
    models: ModelsConfig,
}

impl FunctionRunner {
    pub fn new(provider: Option<Arc<dyn CompletionProvider>>, models: ModelsConfig) -> Self {
        Self { provider, models }
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub fn models(&self) -> &ModelsConfig {
        &self.models
    }

    /// Call a function by its SQL name
    pub async fn call_by_name(&self, name: &str, args: &FunctionArgs) -> UdfResponse {
        match name.parse::<AiFunction>() {
            Ok(function) => self.call(function, args).await,
            Err(e) => e.into(),
        }
    }

    /// Call a function; failures come back as [`UdfResponse::Error`]
    pub async fn call(&self, function: AiFunction, args: &FunctionArgs) -> UdfResponse {
        let Some(provider) = self.provider.as_deref() else {
            return UdfResponse::error(PROVIDER_UNAVAILABLE);
        };

        match self.run(provider, function, args).await {
            Ok(value) => UdfResponse::Success(value),
            Err(e) => {
                warn!("{} failed: {}", function, e);
                e.into()
            }
        }
    }

    async fn run(
        &self,
        provider: &dyn CompletionProvider,
        function: AiFunction,
        args: &FunctionArgs,
    ) -> Result<Value> {
        let bound = BoundArgs::bind(function, args, &self.models)?;
        debug!(
            "Calling {} on {} (model: {})",
            function,
            provider.name(),
            bound.model
        );

        let mut result = match bound.spec.output {
            OutputShape::Text(field) => {
                let text = provider.complete(&chat_request(function, &bound)?).await?;
                single(field, Value::String(text))
            }
            OutputShape::Object(fallback) => {
                let text = provider.complete(&chat_request(function, &bound)?).await?;
                object_result(fallback, &text)
            }
            OutputShape::Vectors => vector_result(provider, function, &bound).await?,
        };

        apply_echo(&mut result, &bound)?;
        Ok(Value::Object(result))
    }
}

/// Arguments of one call, checked against the function's parameters
#[derive(Debug)]
struct BoundArgs {
    spec: FunctionSpec,
    values: BTreeMap<&'static str, String>,
    model: String,
}

impl BoundArgs {
    fn bind(function: AiFunction, args: &FunctionArgs, models: &ModelsConfig) -> Result<Self> {
        let spec = function.spec();

        if let Some(unknown) = args
            .keys()
            .find(|k| k.as_str() != MODEL_ARG && spec.param(k).is_none())
        {
            return Err(AisqlError::InvalidArgument(format!(
                "unknown argument '{}' for {}",
                unknown, spec.name
            )));
        }

        let mut values = BTreeMap::new();
        for param in spec.params {
            let value = match (args.get(param.name), param.default) {
                (Some(value), _) => value.clone(),
                (None, Some(default)) => default.to_string(),
                (None, None) => {
                    return Err(AisqlError::InvalidArgument(format!(
                        "missing required argument '{}'",
                        param.name
                    )));
                }
            };
            check_kind(param, &value)?;
            values.insert(param.name, value);
        }

        let model = args
            .get(MODEL_ARG)
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| match spec.model {
                ModelSlot::Text => models.text.clone(),
                ModelSlot::Embedding => models.embedding.clone(),
                ModelSlot::Vision => models.vision.clone(),
                ModelSlot::ImageEmbedding => models.image_embedding.clone(),
            });

        Ok(Self {
            spec,
            values,
            model,
        })
    }

    fn text(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or_default()
    }

    fn integer(&self, name: &str) -> Result<i64> {
        parse_integer(name, self.text(name))
    }

    /// A non-negative count; negative values clamp to zero
    fn count(&self, name: &str) -> Result<usize> {
        Ok(usize::try_from(self.integer(name)?).unwrap_or(0))
    }

    fn float(&self, name: &str) -> Result<f64> {
        parse_float(name, self.text(name))
    }

    fn flag(&self, name: &str) -> Result<bool> {
        parse_bool(name, self.text(name))
    }

    fn array<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        serde_json::from_str(self.text(name)).map_err(|e| {
            AisqlError::InvalidArgument(format!("argument '{name}' has unexpected shape: {e}"))
        })
    }

    /// The argument as JSON, typed by its declared kind
    fn typed(&self, name: &str) -> Result<Value> {
        let kind = self.spec.param(name).map(|p| p.kind);
        Ok(match kind {
            Some(ParamKind::Integer) => json!(self.integer(name)?),
            Some(ParamKind::Float) => json!(self.float(name)?),
            Some(ParamKind::Bool) => json!(self.flag(name)?),
            _ => Value::String(self.text(name).to_string()),
        })
    }
}

fn parse_integer(name: &str, value: &str) -> Result<i64> {
    value.trim().parse().map_err(|_| {
        AisqlError::InvalidArgument(format!("argument '{name}' must be an integer, got '{value}'"))
    })
}

fn parse_float(name: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .ok_or_else(|| {
            AisqlError::InvalidArgument(format!("argument '{name}' must be a number, got '{value}'"))
        })
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(AisqlError::InvalidArgument(format!(
            "argument '{name}' must be true or false, got '{value}'"
        ))),
    }
}

fn check_kind(param: &Param, value: &str) -> Result<()> {
    match param.kind {
        ParamKind::Text => {}
        ParamKind::Integer => {
            parse_integer(param.name, value)?;
        }
        ParamKind::Float => {
            parse_float(param.name, value)?;
        }
        ParamKind::Bool => {
            parse_bool(param.name, value)?;
        }
        ParamKind::JsonArray => match serde_json::from_str::<Value>(value) {
            Ok(Value::Array(_)) => {}
            Ok(_) => {
                return Err(AisqlError::InvalidArgument(format!(
                    "argument '{}' must be a JSON array",
                    param.name
                )));
            }
            Err(e) => {
                return Err(AisqlError::InvalidArgument(format!(
                    "argument '{}' is not valid JSON: {e}",
                    param.name
                )));
            }
        },
    }
    Ok(())
}

fn text_chat(model: &str, system: String, user: String, temperature: f32) -> CompletionRequest {
    CompletionRequest::new(
        model,
        vec![ChatMessage::system(system), ChatMessage::user(user)],
    )
    .with_temperature(temperature)
}

fn vision_chat(model: &str, image_urls: Vec<String>, prompt: &str) -> CompletionRequest {
    CompletionRequest::new(model, vec![ChatMessage::user_with_images(image_urls, prompt)])
}

/// Build the chat request for a completion-backed function
fn chat_request(function: AiFunction, args: &BoundArgs) -> Result<CompletionRequest> {
    use AiFunction::*;

    let model = args.model.as_str();
    let arg = |name| args.text(name);
    let system = |template, name: &'static str| render(template, &[(name, arg(name))]);

    let request = match function {
        TextSummarize => text_chat(
            model,
            system(prompts::SUMMARIZE, "max_length"),
            arg("text").to_string(),
            0.7,
        ),
        TextTranslate => text_chat(
            model,
            system(prompts::TRANSLATE, "target_language"),
            arg("text").to_string(),
            0.3,
        ),
        TextSentimentAnalyze => text_chat(
            model,
            prompts::SENTIMENT.to_string(),
            format!("分析情感：{}", arg("text")),
            0.1,
        ),
        TextExtractEntities => text_chat(
            model,
            prompts::ENTITIES.to_string(),
            format!("提取实体（类型：{}）：{}", arg("entity_types"), arg("text")),
            0.2,
        ),
        TextExtractKeywords => text_chat(
            model,
            system(prompts::KEYWORDS, "max_keywords"),
            arg("text").to_string(),
            0.3,
        ),
        TextClassify => text_chat(
            model,
            system(prompts::CLASSIFY, "categories"),
            arg("text").to_string(),
            0.2,
        ),
        TextCleanNormalize => text_chat(
            model,
            system(prompts::CLEAN_NORMALIZE, "operations"),
            arg("text").to_string(),
            0.1,
        ),
        AutoTagGenerate => text_chat(
            model,
            system(prompts::AUTO_TAG, "max_tags"),
            arg("text").to_string(),
            0.5,
        ),
        ImageDescribe => vision_chat(model, vec![arg("image_url").to_string()], arg("prompt")),
        ImageOcr => vision_chat(
            model,
            vec![arg("image_url").to_string()],
            &system(prompts::IMAGE_OCR, "language"),
        ),
        ImageAnalyze => vision_chat(
            model,
            vec![arg("image_url").to_string()],
            prompts::image_analysis(arg("analysis_type")),
        ),
        VideoSummarize => vision_chat(
            model,
            args.array("video_frames_json")?,
            prompts::VIDEO_SUMMARY,
        ),
        ChartAnalyze => vision_chat(
            model,
            vec![arg("chart_image_url").to_string()],
            prompts::chart_analysis(arg("analysis_focus")),
        ),
        DocumentParse => vision_chat(
            model,
            args.array("doc_images_json")?,
            prompts::document_parse(arg("parse_type")),
        ),
        CustomerIntentAnalyze => text_chat(
            model,
            system(prompts::CUSTOMER_INTENT, "business_context"),
            arg("customer_text").to_string(),
            0.2,
        ),
        SalesLeadScore => text_chat(
            model,
            system(prompts::SALES_LEAD_SCORE, "scoring_criteria"),
            format!("线索信息：{}", arg("lead_info")),
            0.1,
        ),
        ReviewAnalyze => text_chat(
            model,
            system(prompts::REVIEW, "product_type"),
            format!("评论内容：{}", arg("review_text")),
            0.2,
        ),
        RiskTextDetect => text_chat(
            model,
            system(prompts::RISK_DETECT, "risk_types"),
            arg("text").to_string(),
            0.1,
        ),
        ContractExtract => text_chat(
            model,
            system(prompts::CONTRACT, "extract_fields"),
            format!("合同内容：{}", arg("contract_text")),
            0.1,
        ),
        ResumeParse => text_chat(
            model,
            system(prompts::RESUME, "parse_depth"),
            format!("简历内容：{}", arg("resume_text")),
            0.1,
        ),
        CustomerSegment => text_chat(
            model,
            system(prompts::CUSTOMER_SEGMENT, "segmentation_model"),
            format!("客户数据：{}", arg("customer_data")),
            0.2,
        ),
        ProductDescriptionGenerate => text_chat(
            model,
            system(prompts::PRODUCT_DESCRIPTION, "style"),
            format!("产品信息：{}", arg("product_info")),
            0.6,
        ),
        IndustryClassification => CompletionRequest::new(
            model,
            vec![
                ChatMessage::system(arg("prompt")),
                ChatMessage::user(arg("text")),
            ],
        )
        .with_temperature(args.float("temperature")? as f32)
        .with_top_p(0.8)
        .with_search(args.flag("enable_search")?),
        TextToEmbedding | SemanticSimilarity | TextClusteringPrepare | FindSimilarText
        | DocumentSearch | ImageToEmbedding | ImageSimilarity => {
            return Err(AisqlError::InvalidArgument(format!(
                "{function} is computed from embeddings, not a chat completion"
            )));
        }
    };

    Ok(request)
}

fn single(field: &str, value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(field.to_string(), value);
    map
}

/// Shape the model's reply for a structured function
fn object_result(fallback: Fallback, text: &str) -> Map<String, Value> {
    let extracted = extract(text);
    if !extracted.is_structured() {
        debug!("Reply was not JSON, using {:?} fallback", fallback);
    }

    match fallback {
        Fallback::Field(field) => extracted.into_object_or(field),
        Fallback::List(field) => match extracted {
            ExtractionResult::Fallback { raw_text, .. } => single(
                field,
                raw_text
                    .split('、')
                    .map(|s| Value::String(s.to_string()))
                    .collect(),
            ),
            structured => structured.into_object_or(field),
        },
        Fallback::Segment => match extracted {
            ExtractionResult::Structured(Value::Object(map)) => map,
            _ => {
                let mut map = Map::new();
                map.insert("segment".to_string(), json!("未知"));
                map.insert("scores".to_string(), json!({}));
                map.insert("analysis".to_string(), json!(text));
                map
            }
        },
        Fallback::Industry => industry_levels(extracted, text),
    }
}

/// Both industry levels are always present in the result
fn industry_levels(extracted: ExtractionResult, text: &str) -> Map<String, Value> {
    let mut map = match extracted {
        ExtractionResult::Structured(Value::Object(map)) => map,
        _ => {
            let mut map = Map::new();
            map.insert(INDUSTRY_L1.to_string(), json!("未能解析"));
            map.insert(INDUSTRY_L2.to_string(), json!("未能解析"));
            map.insert(INDUSTRY_RAW.to_string(), json!(text));
            return map;
        }
    };

    if map.contains_key(INDUSTRY_L1) && map.contains_key(INDUSTRY_L2) {
        return map;
    }

    let mut level = |key: &str| map.remove(key).unwrap_or_else(|| json!("未知"));
    let l1 = level(INDUSTRY_L1);
    let l2 = level(INDUSTRY_L2);

    let mut normalized = Map::new();
    normalized.insert(INDUSTRY_L1.to_string(), l1);
    normalized.insert(INDUSTRY_L2.to_string(), l2);
    normalized.insert(INDUSTRY_RAW.to_string(), json!(text));
    normalized
}

#[derive(Debug, Deserialize)]
struct SearchDocument {
    id: Value,
    text: String,
}

async fn embed_all(
    provider: &dyn CompletionProvider,
    model: &str,
    texts: &[String],
) -> std::result::Result<Vec<Vec<f32>>, ProviderError> {
    let requests: Vec<_> = texts.iter().map(|text| provider.embed(model, text)).collect();
    stream::iter(requests)
        .buffered(EMBED_CONCURRENCY)
        .try_collect()
        .await
}

/// Results of the embedding-backed functions
async fn vector_result(
    provider: &dyn CompletionProvider,
    function: AiFunction,
    args: &BoundArgs,
) -> Result<Map<String, Value>> {
    let model = args.model.as_str();
    let mut result = Map::new();

    match function {
        AiFunction::TextToEmbedding => {
            let embedding = provider.embed(model, args.text("text")).await?;
            result.insert("dimension".to_string(), json!(embedding.len()));
            result.insert("embedding".to_string(), json!(embedding));
        }
        AiFunction::SemanticSimilarity => {
            let (a, b) = tokio::try_join!(
                provider.embed(model, args.text("text1")),
                provider.embed(model, args.text("text2"))
            )?;
            result.insert("similarity".to_string(), json!(cosine_similarity(&a, &b)));
        }
        AiFunction::ImageToEmbedding => {
            let embedding = provider.embed_image(model, args.text("image_url")).await?;
            result.insert("dimension".to_string(), json!(embedding.len()));
            result.insert("embedding".to_string(), json!(embedding));
        }
        AiFunction::ImageSimilarity => {
            let (a, b) = tokio::try_join!(
                provider.embed_image(model, args.text("image_url1")),
                provider.embed_image(model, args.text("image_url2"))
            )?;
            result.insert("similarity".to_string(), json!(cosine_similarity(&a, &b)));
        }
        AiFunction::TextClusteringPrepare => {
            let texts: Vec<String> = args.array("texts_json")?;
            let embeddings = embed_all(provider, model, &texts).await?;
            let dimension = embeddings.first().map_or(0, Vec::len);
            result.insert("count".to_string(), json!(embeddings.len()));
            result.insert("dimension".to_string(), json!(dimension));
            result.insert("embeddings".to_string(), json!(embeddings));
        }
        AiFunction::FindSimilarText => {
            let candidates: Vec<String> = args.array("candidate_texts_json")?;
            let k = args.count("top_k")?;
            let (query, embeddings) = tokio::try_join!(
                provider.embed(model, args.text("query_text")),
                embed_all(provider, model, &candidates)
            )?;

            let total = candidates.len();
            let scored = candidates
                .into_iter()
                .zip(&embeddings)
                .map(|(text, emb)| ScoredText {
                    similarity: cosine_similarity(&query, emb),
                    text,
                })
                .collect();
            let ranked = top_k(scored, k, |s: &ScoredText| s.similarity);

            result.insert("similar_texts".to_string(), serde_json::to_value(ranked)?);
            result.insert("total_candidates".to_string(), json!(total));
        }
        AiFunction::DocumentSearch => {
            let documents: Vec<SearchDocument> = args.array("documents_json")?;
            let k = args.count("top_k")?;
            let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
            let (query, embeddings) = tokio::try_join!(
                provider.embed(model, args.text("query")),
                embed_all(provider, model, &texts)
            )?;

            let total = documents.len();
            let hits = documents
                .into_iter()
                .zip(&embeddings)
                .map(|(doc, emb)| DocumentHit {
                    score: cosine_similarity(&query, emb),
                    snippet: snippet(&doc.text),
                    doc_id: doc.id,
                })
                .collect();
            let ranked = top_k(hits, k, |h: &DocumentHit| h.score);

            result.insert("results".to_string(), serde_json::to_value(ranked)?);
            result.insert("total_docs".to_string(), json!(total));
        }
        other => {
            return Err(AisqlError::InvalidArgument(format!(
                "{other} is not an embedding function"
            )));
        }
    }

    Ok(result)
}

/// Merge echoed metadata over the result
fn apply_echo(result: &mut Map<String, Value>, args: &BoundArgs) -> Result<()> {
    for echo in args.spec.echo {
        let (field, value) = match *echo {
            Echo::Arg(arg) => (arg, args.typed(arg)?),
            Echo::Renamed { field, arg } => (field, args.typed(arg)?),
            Echo::CharCount { field, arg } => (field, json!(args.text(arg).chars().count())),
            Echo::ArrayLen { field, arg } => (field, json!(args.array::<Value>(arg)?.len())),
            Echo::Model => ("model", json!(args.model)),
            Echo::Timestamp => ("timestamp", json!(Local::now().to_rfc3339())),
        };
        result.insert(field.to_string(), value);
    }
    Ok(())
}
