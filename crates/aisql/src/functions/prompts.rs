//! System prompts for the catalogue functions
//!
//! Structured prompts pin the reply to a single JSON object; the extractor
//! still copes when a model ignores that. Placeholders are written as
//! `{name}` and filled by [`render`].

pub const SUMMARIZE: &str = "你是专业的文本摘要专家。请将文本总结为不超过{max_length}字的摘要。";

pub const TRANSLATE: &str = "你是专业翻译专家，请将文本翻译成{target_language}。";

pub const SENTIMENT: &str = r#"你是专业情感分析专家。分析文本情感倾向。
严格按照以下JSON格式返回，不要包含任何解释文字：
{"sentiment": "positive|negative|neutral", "confidence": 0.95, "emotions": ["joy", "anger"], "keywords": ["关键词1"]}"#;

pub const ENTITIES: &str = r#"你是专业信息提取专家。从文本中提取实体信息。
严格按照以下JSON格式返回，不要包含任何解释文字：
{"entities": [{"text": "实体名", "type": "PERSON|ORG|LOC|MISC", "confidence": 0.95}]}"#;

pub const KEYWORDS: &str = r#"你是关键词提取专家。提取文本的核心关键词。
严格按照以下JSON格式返回，不要包含任何解释文字：
{"keywords": [{"word": "关键词", "weight": 0.95, "category": "核心概念"}]}（最多提取{max_keywords}个关键词）"#;

pub const CLASSIFY: &str = r#"你是文本分类专家。将文本分类到合适类别。
严格按照以下JSON格式返回，不要包含任何解释文字：
{"category": "分类名称", "confidence": 0.95, "subcategory": "子分类", "categories_considered": ["类别1", "类别2"]}（候选类别：{categories}）"#;

pub const CLEAN_NORMALIZE: &str = r#"你是文本清洗专家。执行文本清洗和标准化操作。
严格按照以下JSON格式返回，不要包含任何解释文字：
{"cleaned_text": "清洗后文本", "operations_applied": ["去重", "标准化"], "changes_count": 5}（执行操作：{operations}）"#;

pub const AUTO_TAG: &str = r#"你是智能标签生成专家。为文本生成相关标签。
严格按照以下JSON格式返回，不要包含任何解释文字：
{"tags": [{"tag": "标签名", "relevance": 0.95, "category": "主题"}]}（生成{max_tags}个标签）"#;

pub const CUSTOMER_INTENT: &str = r#"你是客户意图分析专家。分析客户文本的真实意图。
严格按照以下JSON格式返回，不要包含任何解释文字：
{"intent": "购买意向|咨询|投诉|建议", "confidence": 0.95, "urgency": "high|medium|low", "emotions": ["satisfied"], "action_required": "立即处理"}（业务背景：{business_context}）"#;

pub const SALES_LEAD_SCORE: &str = r#"你是销售线索评分专家。根据标准评估线索价值。
严格按照以下JSON格式返回，不要包含任何解释文字：
{"score": 85, "grade": "A|B|C|D", "probability": 0.85, "factors": [{"factor": "预算充足", "impact": "positive", "weight": 0.3}], "next_action": "立即跟进"}（评分标准：{scoring_criteria}）"#;

pub const REVIEW: &str = r#"你是评论分析专家。分析用户评论的多维度信息。
严格按照以下JSON格式返回，不要包含任何解释文字：
{"sentiment": "positive|negative|neutral", "rating_predicted": 4.5, "aspects": [{"aspect": "服务", "sentiment": "positive", "score": 4.2}], "key_issues": ["待改进点"]}（产品类型：{product_type}）"#;

pub const RISK_DETECT: &str = r#"你是风险检测专家。检测文本中的各类风险内容。
严格按照以下JSON格式返回，不要包含任何解释文字：
{"risk_level": "high|medium|low|none", "risk_types": ["欺诈", "违规"], "confidence": 0.95, "flagged_content": ["具体风险文本"], "action_required": true}（风险类型：{risk_types}）"#;

pub const CONTRACT: &str = r#"你是合同信息提取专家。提取合同的关键信息字段。
严格按照以下JSON格式返回，不要包含任何解释文字：
{"parties": ["甲方", "乙方"], "amount": "1000000", "start_date": "2024-01-01", "end_date": "2024-12-31", "key_terms": ["重要条款"], "risk_points": ["风险点"]}（提取字段：{extract_fields}）"#;

pub const RESUME: &str = r#"你是简历解析专家。解析简历的结构化信息。
严格按照以下JSON格式返回，不要包含任何解释文字：
{"name": "姓名", "education": [{"degree": "本科", "school": "大学", "major": "专业"}], "experience": [{"title": "职位", "company": "公司", "duration": "2年"}], "skills": ["技能1"]}（解析深度：{parse_depth}）"#;

pub const CUSTOMER_SEGMENT: &str = r#"你是客户细分专家。根据模型进行客户细分分析。
严格按照以下JSON格式返回，不要包含任何解释文字：
{"segment": "高价值客户", "scores": {"R": 5, "F": 4, "M": 5}, "total_score": 85, "characteristics": ["购买频繁"], "recommendations": ["VIP服务"], "retention_probability": 0.92}（使用模型：{segmentation_model}）"#;

pub const PRODUCT_DESCRIPTION: &str = r#"你是产品文案专家。生成吸引人的产品描述。
严格按照以下JSON格式返回，不要包含任何解释文字：
{"title": "产品标题", "description": "详细描述", "features": ["特色1", "特色2"], "benefits": ["优势1"], "target_audience": "目标用户", "selling_points": ["卖点1"]}（文案风格：{style}）"#;

pub const IMAGE_OCR: &str = "请识别图片中的文字内容（语言：{language}）";

pub const VIDEO_SUMMARY: &str = "请基于这些视频帧生成视频内容摘要";

/// Prompt for `ai_image_analyze`; unknown kinds get the general analysis
pub fn image_analysis(kind: &str) -> &'static str {
    match kind {
        "objects" => "请识别图片中的所有对象和物品",
        "scene" => "请描述图片的场景和环境",
        "people" => "请分析图片中的人物信息",
        "text" => "请提取图片中的所有文字信息",
        _ => "请全面分析这张图片，包括内容、场景、对象等",
    }
}

/// Prompt for `ai_chart_analyze`; unknown focuses get the data analysis
pub fn chart_analysis(focus: &str) -> &'static str {
    match focus {
        "trend" => "请分析图表显示的趋势变化",
        "comparison" => "请比较图表中不同数据系列的差异",
        "insight" => "请从图表中提取商业洞察和结论",
        _ => "请分析图表中的数据趋势和关键数值",
    }
}

/// Prompt for `ai_document_parse`; unknown types get the structure parse
pub fn document_parse(parse_type: &str) -> &'static str {
    match parse_type {
        "content" => "请提取文档中的所有文字内容",
        "table" => "请提取文档中的表格数据",
        "form" => "请识别并提取表单字段和内容",
        _ => "请解析文档结构，包括标题、段落、表格等",
    }
}

/// Fill `{name}` placeholders in a template.
///
/// Only the listed names are replaced; literal JSON braces in the template
/// are left alone.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{name}}}"), value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_fills_placeholders() {
        let prompt = render(SUMMARIZE, &[("max_length", "100")]);
        assert_eq!(prompt, "你是专业的文本摘要专家。请将文本总结为不超过100字的摘要。");
    }

    #[test]
    fn test_render_keeps_json_braces() {
        let prompt = render(KEYWORDS, &[("max_keywords", "5")]);
        assert!(prompt.contains(r#"{"keywords": [{"word": "关键词""#));
        assert!(prompt.ends_with("（最多提取5个关键词）"));
        assert!(!prompt.contains("{max_keywords}"));
    }

    #[test]
    fn test_structured_prompts_show_a_parseable_example() {
        for template in [SENTIMENT, ENTITIES, CUSTOMER_SEGMENT, SALES_LEAD_SCORE] {
            let example = template.lines().nth(2).unwrap();
            let example = crate::extract::find_balanced_object(example).unwrap();
            assert!(serde_json::from_str::<serde_json::Value>(example).is_ok());
        }
    }

    #[test]
    fn test_prompt_variants_fall_back() {
        assert_eq!(image_analysis("unknown"), image_analysis("general"));
        assert_eq!(chart_analysis("unknown"), chart_analysis("data"));
        assert_eq!(document_parse("unknown"), document_parse("structure"));
        assert_ne!(image_analysis("scene"), image_analysis("general"));
    }
}
