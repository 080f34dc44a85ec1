//! The function catalogue
//!
//! Every SQL function is described by a static [`FunctionSpec`]: its
//! parameters and defaults, which model it runs on, where its output lands
//! and which inputs are echoed back beside the result.

use std::fmt;
use std::str::FromStr;

use crate::error::AisqlError;

/// Function family, used for grouping in listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Text,
    Embedding,
    Multimodal,
    Business,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Text => "text",
            Category::Embedding => "embedding",
            Category::Multimodal => "multimodal",
            Category::Business => "business",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which configured model a function runs on when no `model_name` is given
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSlot {
    Text,
    Embedding,
    Vision,
    /// Multimodal embedding model for image vectors
    ImageEmbedding,
}

/// How an argument string is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Text,
    Integer,
    Float,
    Bool,
    /// A JSON array encoded as a string
    JsonArray,
}

/// One declared function parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    pub kind: ParamKind,
    /// `None` marks a required parameter
    pub default: Option<&'static str>,
}

const fn required(name: &'static str, kind: ParamKind) -> Param {
    Param {
        name,
        kind,
        default: None,
    }
}

const fn optional(name: &'static str, kind: ParamKind, default: &'static str) -> Param {
    Param {
        name,
        kind,
        default: Some(default),
    }
}

/// What a structured function returns when the reply is not a JSON object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// The value or raw text under this field
    Field(&'static str),
    /// Raw text split on `、` into a list under this field
    List(&'static str),
    /// `{"segment": "未知", "scores": {}, "analysis": raw}`
    Segment,
    /// Industry levels defaulted, raw text under `原始内容`
    Industry,
}

/// Where a function's result comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputShape {
    /// The completion text under this field
    Text(&'static str),
    /// The extracted JSON object, or the fallback
    Object(Fallback),
    /// Built from embedding vectors
    Vectors,
}

/// Metadata merged into the result after the model output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Echo {
    /// The argument under its own name
    Arg(&'static str),
    /// The argument under another field name
    Renamed {
        field: &'static str,
        arg: &'static str,
    },
    /// Character count of the argument
    CharCount {
        field: &'static str,
        arg: &'static str,
    },
    /// Element count of a JSON array argument
    ArrayLen {
        field: &'static str,
        arg: &'static str,
    },
    /// The model that served the call
    Model,
    /// Local time of the call
    Timestamp,
}

/// Static description of one catalogue function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub category: Category,
    pub summary: &'static str,
    pub params: &'static [Param],
    pub model: ModelSlot,
    pub output: OutputShape,
    pub echo: &'static [Echo],
}

impl FunctionSpec {
    pub fn param(&self, name: &str) -> Option<&'static Param> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// Every function in the catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AiFunction {
    TextSummarize,
    TextTranslate,
    TextSentimentAnalyze,
    TextExtractEntities,
    TextExtractKeywords,
    TextClassify,
    TextCleanNormalize,
    AutoTagGenerate,
    TextToEmbedding,
    SemanticSimilarity,
    TextClusteringPrepare,
    FindSimilarText,
    DocumentSearch,
    ImageDescribe,
    ImageOcr,
    ImageAnalyze,
    ImageToEmbedding,
    ImageSimilarity,
    VideoSummarize,
    ChartAnalyze,
    DocumentParse,
    CustomerIntentAnalyze,
    SalesLeadScore,
    ReviewAnalyze,
    RiskTextDetect,
    ContractExtract,
    ResumeParse,
    CustomerSegment,
    ProductDescriptionGenerate,
    IndustryClassification,
}

use Echo::{Arg, Model};
use ParamKind::{Bool, Float, Integer, JsonArray, Text};

impl AiFunction {
    pub const ALL: [AiFunction; 30] = [
        AiFunction::TextSummarize,
        AiFunction::TextTranslate,
        AiFunction::TextSentimentAnalyze,
        AiFunction::TextExtractEntities,
        AiFunction::TextExtractKeywords,
        AiFunction::TextClassify,
        AiFunction::TextCleanNormalize,
        AiFunction::AutoTagGenerate,
        AiFunction::TextToEmbedding,
        AiFunction::SemanticSimilarity,
        AiFunction::TextClusteringPrepare,
        AiFunction::FindSimilarText,
        AiFunction::DocumentSearch,
        AiFunction::ImageDescribe,
        AiFunction::ImageOcr,
        AiFunction::ImageAnalyze,
        AiFunction::ImageToEmbedding,
        AiFunction::ImageSimilarity,
        AiFunction::VideoSummarize,
        AiFunction::ChartAnalyze,
        AiFunction::DocumentParse,
        AiFunction::CustomerIntentAnalyze,
        AiFunction::SalesLeadScore,
        AiFunction::ReviewAnalyze,
        AiFunction::RiskTextDetect,
        AiFunction::ContractExtract,
        AiFunction::ResumeParse,
        AiFunction::CustomerSegment,
        AiFunction::ProductDescriptionGenerate,
        AiFunction::IndustryClassification,
    ];

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    pub fn category(self) -> Category {
        self.spec().category
    }

    pub fn spec(self) -> FunctionSpec {
        match self {
            AiFunction::TextSummarize => FunctionSpec {
                name: "ai_text_summarize",
                category: Category::Text,
                summary: "Summarize text within a length limit",
                params: const { &[required("text", Text), optional("max_length", Integer, "200")] },
                model: ModelSlot::Text,
                output: OutputShape::Text("summary"),
                echo: &[
                    Echo::CharCount {
                        field: "original_length",
                        arg: "text",
                    },
                    Model,
                    Echo::Timestamp,
                ],
            },
            AiFunction::TextTranslate => FunctionSpec {
                name: "ai_text_translate",
                category: Category::Text,
                summary: "Translate text into a target language",
                params: const { &[required("text", Text), required("target_language", Text)] },
                model: ModelSlot::Text,
                output: OutputShape::Text("translated_text"),
                echo: &[
                    Echo::Renamed {
                        field: "original_text",
                        arg: "text",
                    },
                    Arg("target_language"),
                    Model,
                ],
            },
            AiFunction::TextSentimentAnalyze => FunctionSpec {
                name: "ai_text_sentiment_analyze",
                category: Category::Text,
                summary: "Sentiment, confidence and emotions of a text",
                params: const { &[required("text", Text)] },
                model: ModelSlot::Text,
                output: OutputShape::Object(Fallback::Field("sentiment_analysis")),
                echo: &[Model],
            },
            AiFunction::TextExtractEntities => FunctionSpec {
                name: "ai_text_extract_entities",
                category: Category::Text,
                summary: "Named entities with type and confidence",
                params: const { &[
                    required("text", Text),
                    optional("entity_types", Text, "all"),
                ] },
                model: ModelSlot::Text,
                output: OutputShape::Object(Fallback::Field("entities")),
                echo: &[Arg("entity_types")],
            },
            AiFunction::TextExtractKeywords => FunctionSpec {
                name: "ai_text_extract_keywords",
                category: Category::Text,
                summary: "Weighted keywords of a text",
                params: const { &[
                    required("text", Text),
                    optional("max_keywords", Integer, "10"),
                ] },
                model: ModelSlot::Text,
                output: OutputShape::Object(Fallback::List("keywords")),
                echo: &[Arg("max_keywords")],
            },
            AiFunction::TextClassify => FunctionSpec {
                name: "ai_text_classify",
                category: Category::Text,
                summary: "Classify text into candidate categories",
                params: const { &[required("text", Text), optional("categories", Text, "auto")] },
                model: ModelSlot::Text,
                output: OutputShape::Object(Fallback::Field("classification")),
                echo: &[Arg("categories")],
            },
            AiFunction::TextCleanNormalize => FunctionSpec {
                name: "ai_text_clean_normalize",
                category: Category::Text,
                summary: "Clean and normalize text",
                params: const { &[required("text", Text), optional("operations", Text, "all")] },
                model: ModelSlot::Text,
                output: OutputShape::Object(Fallback::Field("cleaned_text")),
                echo: &[Arg("operations")],
            },
            AiFunction::AutoTagGenerate => FunctionSpec {
                name: "ai_auto_tag_generate",
                category: Category::Text,
                summary: "Generate relevance-scored tags",
                params: const { &[required("text", Text), optional("max_tags", Integer, "10")] },
                model: ModelSlot::Text,
                output: OutputShape::Object(Fallback::List("tags")),
                echo: &[Arg("max_tags")],
            },
            AiFunction::TextToEmbedding => FunctionSpec {
                name: "ai_text_to_embedding",
                category: Category::Embedding,
                summary: "Embedding vector of a text",
                params: const { &[required("text", Text)] },
                model: ModelSlot::Embedding,
                output: OutputShape::Vectors,
                echo: &[
                    Model,
                    Echo::CharCount {
                        field: "text_length",
                        arg: "text",
                    },
                ],
            },
            AiFunction::SemanticSimilarity => FunctionSpec {
                name: "ai_semantic_similarity",
                category: Category::Embedding,
                summary: "Cosine similarity of two texts",
                params: const { &[required("text1", Text), required("text2", Text)] },
                model: ModelSlot::Embedding,
                output: OutputShape::Vectors,
                echo: &[
                    Echo::CharCount {
                        field: "text1_length",
                        arg: "text1",
                    },
                    Echo::CharCount {
                        field: "text2_length",
                        arg: "text2",
                    },
                    Model,
                ],
            },
            AiFunction::TextClusteringPrepare => FunctionSpec {
                name: "ai_text_clustering_prepare",
                category: Category::Embedding,
                summary: "Embeddings of a JSON array of texts",
                params: const { &[required("texts_json", JsonArray)] },
                model: ModelSlot::Embedding,
                output: OutputShape::Vectors,
                echo: &[],
            },
            AiFunction::FindSimilarText => FunctionSpec {
                name: "ai_find_similar_text",
                category: Category::Embedding,
                summary: "Top-k candidates most similar to a query",
                params: const { &[
                    required("query_text", Text),
                    required("candidate_texts_json", JsonArray),
                    optional("top_k", Integer, "5"),
                ] },
                model: ModelSlot::Embedding,
                output: OutputShape::Vectors,
                echo: &[],
            },
            AiFunction::DocumentSearch => FunctionSpec {
                name: "ai_document_search",
                category: Category::Embedding,
                summary: "Rank {id, text} documents against a query",
                params: const { &[
                    required("query", Text),
                    required("documents_json", JsonArray),
                    optional("top_k", Integer, "3"),
                ] },
                model: ModelSlot::Embedding,
                output: OutputShape::Vectors,
                echo: &[Arg("query")],
            },
            AiFunction::ImageDescribe => FunctionSpec {
                name: "ai_image_describe",
                category: Category::Multimodal,
                summary: "Describe an image",
                params: const { &[
                    required("image_url", Text),
                    optional("prompt", Text, "描述这张图片"),
                ] },
                model: ModelSlot::Vision,
                output: OutputShape::Text("description"),
                echo: &[Arg("image_url"), Arg("prompt"), Model],
            },
            AiFunction::ImageOcr => FunctionSpec {
                name: "ai_image_ocr",
                category: Category::Multimodal,
                summary: "Recognize the text in an image",
                params: const { &[required("image_url", Text), optional("language", Text, "auto")] },
                model: ModelSlot::Vision,
                output: OutputShape::Text("text"),
                echo: &[Arg("image_url"), Arg("language"), Model],
            },
            AiFunction::ImageAnalyze => FunctionSpec {
                name: "ai_image_analyze",
                category: Category::Multimodal,
                summary: "Analyze objects, scene, people or text in an image",
                params: const { &[
                    required("image_url", Text),
                    optional("analysis_type", Text, "general"),
                ] },
                model: ModelSlot::Vision,
                output: OutputShape::Text("analysis"),
                echo: &[Arg("analysis_type"), Arg("image_url"), Model],
            },
            AiFunction::ImageToEmbedding => FunctionSpec {
                name: "ai_image_to_embedding",
                category: Category::Multimodal,
                summary: "Embedding vector of an image",
                params: const { &[required("image_url", Text)] },
                model: ModelSlot::ImageEmbedding,
                output: OutputShape::Vectors,
                echo: &[Arg("image_url"), Model],
            },
            AiFunction::ImageSimilarity => FunctionSpec {
                name: "ai_image_similarity",
                category: Category::Multimodal,
                summary: "Cosine similarity of two images",
                params: const { &[required("image_url1", Text), required("image_url2", Text)] },
                model: ModelSlot::ImageEmbedding,
                output: OutputShape::Vectors,
                echo: &[
                    Echo::Renamed {
                        field: "image1",
                        arg: "image_url1",
                    },
                    Echo::Renamed {
                        field: "image2",
                        arg: "image_url2",
                    },
                    Model,
                ],
            },
            AiFunction::VideoSummarize => FunctionSpec {
                name: "ai_video_summarize",
                category: Category::Multimodal,
                summary: "Summarize a video from a JSON array of frame URLs",
                params: const { &[required("video_frames_json", JsonArray)] },
                model: ModelSlot::Vision,
                output: OutputShape::Text("summary"),
                echo: &[
                    Echo::ArrayLen {
                        field: "frame_count",
                        arg: "video_frames_json",
                    },
                    Model,
                ],
            },
            AiFunction::ChartAnalyze => FunctionSpec {
                name: "ai_chart_analyze",
                category: Category::Multimodal,
                summary: "Read data, trends or insights from a chart image",
                params: const { &[
                    required("chart_image_url", Text),
                    optional("analysis_focus", Text, "data"),
                ] },
                model: ModelSlot::Vision,
                output: OutputShape::Text("analysis"),
                echo: &[
                    Echo::Renamed {
                        field: "focus",
                        arg: "analysis_focus",
                    },
                    Echo::Renamed {
                        field: "chart_url",
                        arg: "chart_image_url",
                    },
                    Model,
                ],
            },
            AiFunction::DocumentParse => FunctionSpec {
                name: "ai_document_parse",
                category: Category::Multimodal,
                summary: "Parse document page images into structure or content",
                params: const { &[
                    required("doc_images_json", JsonArray),
                    optional("parse_type", Text, "structure"),
                ] },
                model: ModelSlot::Vision,
                output: OutputShape::Text("parsed_content"),
                echo: &[
                    Arg("parse_type"),
                    Echo::ArrayLen {
                        field: "page_count",
                        arg: "doc_images_json",
                    },
                    Model,
                ],
            },
            AiFunction::CustomerIntentAnalyze => FunctionSpec {
                name: "ai_customer_intent_analyze",
                category: Category::Business,
                summary: "Intent, urgency and required action of a customer message",
                params: const { &[
                    required("customer_text", Text),
                    optional("business_context", Text, "general"),
                ] },
                model: ModelSlot::Text,
                output: OutputShape::Object(Fallback::Field("intent_analysis")),
                echo: &[Arg("customer_text"), Arg("business_context"), Model],
            },
            AiFunction::SalesLeadScore => FunctionSpec {
                name: "ai_sales_lead_score",
                category: Category::Business,
                summary: "Score and grade a sales lead",
                params: const { &[
                    required("lead_info", Text),
                    optional("scoring_criteria", Text, "RFM"),
                ] },
                model: ModelSlot::Text,
                output: OutputShape::Object(Fallback::Field("lead_score")),
                echo: &[Arg("lead_info"), Arg("scoring_criteria"), Model],
            },
            AiFunction::ReviewAnalyze => FunctionSpec {
                name: "ai_review_analyze",
                category: Category::Business,
                summary: "Aspect-level analysis of a product review",
                params: const { &[
                    required("review_text", Text),
                    optional("product_type", Text, "general"),
                ] },
                model: ModelSlot::Text,
                output: OutputShape::Object(Fallback::Field("review_analysis")),
                echo: &[Arg("review_text"), Arg("product_type"), Model],
            },
            AiFunction::RiskTextDetect => FunctionSpec {
                name: "ai_risk_text_detect",
                category: Category::Business,
                summary: "Detect fraud, compliance and other risks in text",
                params: const { &[required("text", Text), optional("risk_types", Text, "all")] },
                model: ModelSlot::Text,
                output: OutputShape::Object(Fallback::Field("risk_assessment")),
                echo: &[
                    Echo::Renamed {
                        field: "original_text",
                        arg: "text",
                    },
                    Arg("risk_types"),
                    Model,
                ],
            },
            AiFunction::ContractExtract => FunctionSpec {
                name: "ai_contract_extract",
                category: Category::Business,
                summary: "Parties, amounts, dates and terms of a contract",
                params: const { &[
                    required("contract_text", Text),
                    optional("extract_fields", Text, "all"),
                ] },
                model: ModelSlot::Text,
                output: OutputShape::Object(Fallback::Field("contract_info")),
                echo: &[
                    Arg("extract_fields"),
                    Echo::CharCount {
                        field: "contract_length",
                        arg: "contract_text",
                    },
                    Model,
                ],
            },
            AiFunction::ResumeParse => FunctionSpec {
                name: "ai_resume_parse",
                category: Category::Business,
                summary: "Education, experience and skills from a resume",
                params: const { &[
                    required("resume_text", Text),
                    optional("parse_depth", Text, "standard"),
                ] },
                model: ModelSlot::Text,
                output: OutputShape::Object(Fallback::Field("resume_info")),
                echo: &[
                    Arg("parse_depth"),
                    Echo::CharCount {
                        field: "resume_length",
                        arg: "resume_text",
                    },
                    Model,
                ],
            },
            AiFunction::CustomerSegment => FunctionSpec {
                name: "ai_customer_segment",
                category: Category::Business,
                summary: "Segment a customer with an RFM-style model",
                params: const { &[
                    required("customer_data", Text),
                    optional("segmentation_model", Text, "RFM"),
                ] },
                model: ModelSlot::Text,
                output: OutputShape::Object(Fallback::Segment),
                echo: &[Arg("segmentation_model"), Arg("customer_data"), Model],
            },
            AiFunction::ProductDescriptionGenerate => FunctionSpec {
                name: "ai_product_description_generate",
                category: Category::Business,
                summary: "Marketing copy for a product",
                params: const { &[
                    required("product_info", Text),
                    optional("style", Text, "professional"),
                ] },
                model: ModelSlot::Text,
                output: OutputShape::Object(Fallback::Field("product_description")),
                echo: &[Arg("style"), Arg("product_info"), Model],
            },
            AiFunction::IndustryClassification => FunctionSpec {
                name: "ai_industry_classification",
                category: Category::Business,
                summary: "Two-level industry classification with a caller prompt",
                params: const { &[
                    required("text", Text),
                    required("prompt", Text),
                    optional("temperature", Float, "0.7"),
                    optional("enable_search", Bool, "false"),
                ] },
                model: ModelSlot::Text,
                output: OutputShape::Object(Fallback::Industry),
                echo: &[],
            },
        }
    }
}

impl fmt::Display for AiFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AiFunction {
    type Err = AisqlError;

    /// Accepts the SQL name, with or without the `ai_` prefix
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        AiFunction::ALL
            .into_iter()
            .find(|f| {
                let name = f.name();
                name == wanted || name.strip_prefix("ai_") == Some(wanted.as_str())
            })
            .ok_or_else(|| AisqlError::UnknownFunction(s.to_string()))
    }
}
