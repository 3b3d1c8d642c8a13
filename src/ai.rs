//! AI query expansion client / AI 查询扩展客户端
//!
//! Talks to any OpenAI-compatible chat-completions endpoint. Expansion is
//! strictly best-effort: every failure (missing config, network, non-200,
//! unparseable reply) degrades to an empty term list so search keeps
//! working without AI.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Expansion results are capped like local fuzzy expansion / 扩展词上限
const MAX_AI_TERMS: usize = 5;
const REQUEST_TIMEOUT_SECS: u64 = 30;

const SYSTEM_PROMPT: &str = "你是专业的搜索关键词扩展助手。根据用户的搜索词，智能识别其所属领域，生成最相关的同义词和扩展词。只返回JSON数组。";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

/// Connectivity check result returned to the UI / 连接测试结果
#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectionTest {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct AiClient {
    base_url: String,
    api_key: String,
    model: String,
    http: reqwest::Client,
}

impl AiClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: if model.is_empty() { "gpt-3.5-turbo".to_string() } else { model.to_string() },
            http: reqwest::Client::new(),
        }
    }

    /// Expand one query into related terms / 扩展查询词
    ///
    /// `custom_prompt` may carry a `{{query}}` placeholder. Returns at most
    /// five terms; an empty vec on any failure.
    pub async fn expand_query(&self, query: &str, custom_prompt: Option<&str>) -> Vec<String> {
        let prompt = match custom_prompt {
            Some(p) => p.replace("{{query}}", query),
            None => default_expansion_prompt(query),
        };

        let content = match self
            .call_api(
                vec![
                    ChatMessage { role: "system", content: SYSTEM_PROMPT },
                    ChatMessage { role: "user", content: &prompt },
                ],
                0.3,
                150,
            )
            .await
        {
            Ok(content) => content,
            Err(e) => {
                tracing::error!("AI query expansion failed: {}", e);
                return Vec::new();
            }
        };

        match parse_term_array(&content) {
            Some(terms) => terms,
            None => {
                tracing::error!("AI reply was not a JSON term array: {}", content);
                Vec::new()
            }
        }
    }

    /// Round-trip probe against the configured endpoint / 测试连接
    pub async fn test_connection(&self) -> ConnectionTest {
        let reply = self
            .call_api(vec![ChatMessage { role: "user", content: "回复'OK'" }], 0.3, 10)
            .await;
        match reply {
            Ok(_) => ConnectionTest { success: true, message: "连接成功".to_string() },
            Err(e) => ConnectionTest { success: false, message: e },
        }
    }

    async fn call_api(
        &self,
        messages: Vec<ChatMessage<'_>>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, String> {
        if self.base_url.is_empty() || self.api_key.is_empty() {
            return Err("AI 配置缺失（Base URL 或 API Key 未设置）".to_string());
        }

        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest { model: &self.model, messages, temperature, max_tokens };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("请求失败: {}", e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| e.to_string())?;
        if !status.is_success() {
            tracing::error!("AI API error: {}", text);
            return Err(format!("API 返回错误 {}: {}", status.as_u16(), truncate(&text, 200)));
        }

        let data: Value = serde_json::from_str(&text).map_err(|e| e.to_string())?;
        extract_reply(&data)
            .ok_or_else(|| format!("API 响应格式不兼容。响应: {}", truncate(&text, 300)))
    }
}

/// Pull the assistant text out of the several shapes providers use.
fn extract_reply(data: &Value) -> Option<String> {
    if let Some(choice) = data.get("choices").and_then(|c| c.get(0)) {
        if let Some(content) = choice.pointer("/message/content").and_then(Value::as_str) {
            return Some(content.to_string());
        }
        if let Some(text) = choice.get("text").and_then(Value::as_str) {
            return Some(text.to_string());
        }
    }
    if let Some(content) = data.get("content").and_then(Value::as_str) {
        return Some(content.to_string());
    }
    if let Some(result) = data.get("result").and_then(Value::as_str) {
        return Some(result.to_string());
    }
    match data.get("data") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Object(o)) => o.get("content").and_then(Value::as_str).map(String::from),
        _ => None,
    }
}

/// Strip markdown fences and decode the JSON term array / 解析扩展词数组
fn parse_term_array(raw: &str) -> Option<Vec<String>> {
    let mut content = raw.trim();
    content = content
        .strip_prefix("```json")
        .or_else(|| content.strip_prefix("```"))
        .unwrap_or(content)
        .trim_start();
    content = content.strip_suffix("```").unwrap_or(content).trim_end();

    let parsed: Value = serde_json::from_str(content).ok()?;
    let items = parsed.as_array()?;
    let terms: Vec<String> = items
        .iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s.trim().to_string()),
            other => Some(other.to_string()),
        })
        .filter(|t| !t.is_empty())
        .take(MAX_AI_TERMS)
        .collect();
    Some(terms)
}

fn default_expansion_prompt(query: &str) -> String {
    format!(
        r#"你是一个专业的文档搜索助手。请为以下搜索关键词生成 3-5 个最相关的扩展词，帮助用户找到更多相关文档。

搜索词：{query}

扩展规则：
1. 优先生成该词在**专业领域**中的同义词（如医学、统计、法律、金融等）
2. 包含该词的**中英文对应词**
3. 包含该词的**常见缩写或全称**
4. 不要生成过于宽泛或偏离原意的词
5. 不要包含原始搜索词本身

示例：
- "样本" → ["sample", "样本量", "sample size", "受试者", "n值"]
- "随机" → ["randomization", "随机化", "random", "随机分配", "RCT"]
- "盲法" → ["blinding", "双盲", "单盲", "double-blind", "设盲"]

请只返回 JSON 数组格式，如 ["词1", "词2", "词3"]，不要其他解释。"#
    )
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
