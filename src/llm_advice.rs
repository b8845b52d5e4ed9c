// src/llm_advice.rs

use crate::calculator::EmissionResult;
use crate::config::{LlmBackend, LlmSection};
use crate::recommend;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

const ADVICE_SYSTEM_PROMPT: &str = "You are a carbon footprint expert who provides personalized \
recommendations for reducing carbon emissions. Your recommendations should be specific, \
actionable, and tailored to the user's carbon footprint data. Return ONLY valid JSON.";

const TIPS_SYSTEM_PROMPT: &str = "You are a sustainability expert who provides practical, \
actionable tips for sustainable living. Your tips should be specific, easy to implement, and \
have a positive environmental impact.";

/// Personalised reduction plan written by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvicePlan {
    #[serde(default)]
    pub top_categories: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<AdviceItem>,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdviceItem {
    pub category: String,
    pub action: String,
    /// kg CO2 per month, as estimated by the model.
    #[serde(default)]
    pub potential_reduction: f64,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub time_frame: String,
}

#[derive(Debug, Error)]
pub enum AdviceError {
    #[error("LLM advice is disabled (backend = static)")]
    Disabled,
    #[error("LLM_API_KEY env var required for remote backend")]
    MissingApiKey,
    #[error("Ollama is not running at {0}. Start it with: ollama serve")]
    OllamaUnreachable(String),
    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("LLM API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Empty response from LLM")]
    EmptyResponse,
    #[error("Malformed JSON in LLM response: {0}")]
    MalformedJson(String),
    #[error("Failed to parse advice plan: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

struct ResolvedEndpoint {
    base_url: String,
    model: String,
    api_key: String,
}

fn resolve_endpoint(llm: &LlmSection) -> Result<ResolvedEndpoint, AdviceError> {
    match llm.backend {
        LlmBackend::Static => Err(AdviceError::Disabled),
        LlmBackend::Ollama => {
            info!(
                url = %llm.ollama.base_url,
                model = %llm.ollama.model,
                "Using Ollama (local) backend"
            );
            Ok(ResolvedEndpoint {
                base_url: llm.ollama.base_url.clone(),
                model: llm.ollama.model.clone(),
                api_key: "ollama".to_string(), // required by API but ignored
            })
        }
        LlmBackend::Remote => {
            let api_key = std::env::var("LLM_API_KEY").map_err(|_| AdviceError::MissingApiKey)?;
            info!(
                url = %llm.remote.base_url,
                model = %llm.remote.model,
                "Using remote API backend"
            );
            Ok(ResolvedEndpoint {
                base_url: llm.remote.base_url.clone(),
                model: llm.remote.model.clone(),
                api_key,
            })
        }
    }
}

/// Check if the Ollama server is reachable.
async fn check_ollama_health(client: &Client, base_url: &str) -> bool {
    // The health endpoint is the server root, not under /v1
    let health_url = base_url.trim_end_matches('/').trim_end_matches("/v1");

    match client
        .get(health_url)
        .timeout(std::time::Duration::from_secs(3))
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => {
            info!("Ollama server is reachable");
            true
        }
        Ok(resp) => {
            warn!(status = %resp.status(), "Ollama server returned non-OK status");
            false
        }
        Err(e) => {
            warn!(error = %e, "Ollama server not reachable");
            false
        }
    }
}

/// Resolve the endpoint and, for Ollama, make sure the server is up.
async fn connect(llm: &LlmSection) -> Result<(Client, ResolvedEndpoint), AdviceError> {
    let endpoint = resolve_endpoint(llm)?;
    let client = Client::new();
    if llm.backend == LlmBackend::Ollama && !check_ollama_health(&client, &endpoint.base_url).await
    {
        return Err(AdviceError::OllamaUnreachable(endpoint.base_url));
    }
    Ok((client, endpoint))
}

async fn chat(
    client: &Client,
    endpoint: &ResolvedEndpoint,
    system: &str,
    user: String,
    max_tokens: u32,
) -> Result<String, AdviceError> {
    let request = ChatRequest {
        model: endpoint.model.clone(),
        messages: vec![
            ChatMessage {
                role: "system".to_string(),
                content: system.to_string(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: user,
            },
        ],
        temperature: 0.2,
        max_tokens,
    };

    let url = format!("{}/chat/completions", endpoint.base_url.trim_end_matches('/'));
    let response = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", endpoint.api_key))
        .json(&request)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(AdviceError::Api { status, body });
    }

    let chat_response: ChatResponse = response.json().await?;
    chat_response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or(AdviceError::EmptyResponse)
}

fn advice_prompt(result: &EmissionResult) -> String {
    let top: Vec<&str> = recommend::rank_categories(result)
        .iter()
        .take(2)
        .map(|(c, _)| c.as_str())
        .collect();

    format!(
        "Based on the following carbon footprint data (tons CO2e per year), provide personalized \
recommendations for reducing carbon emissions:

Total Emissions: {total}
Energy Emissions: {energy}
Transportation Emissions: {transport}
Waste Emissions: {waste}
Water Emissions: {water}
Per Person: {per_person}
Regional Average: {avg}
The two highest categories are: {top}

Please provide 3 specific, actionable recommendations for each of the top 2 emission categories.
For each recommendation include the action, the potential carbon reduction in kg CO2 per month,
the difficulty level (easy, medium, hard) and a time frame.

Format your response as a JSON object with the following structure:
{{
  \"topCategories\": [\"string\", \"string\"],
  \"recommendations\": [
    {{
      \"category\": \"string\",
      \"action\": \"string\",
      \"potentialReduction\": number,
      \"difficulty\": \"string\",
      \"timeFrame\": \"string\"
    }}
  ],
  \"summary\": \"string\"
}}",
        total = result.total_emission,
        energy = result.energy_emission,
        transport = result.transportation_emission,
        waste = result.waste_emission,
        water = result.water_emission,
        per_person = result.per_person_emission,
        avg = result.regional_average,
        top = top.join(", "),
    )
}

fn tips_prompt(category: Option<&str>) -> String {
    match category.map(str::trim).filter(|c| !c.is_empty()) {
        Some(c) => format!(
            "Provide 5 practical tips for sustainable living related to {c} that are easy to implement in daily life."
        ),
        None => "Provide 5 practical tips for sustainable living that are easy to implement in daily life."
            .to_string(),
    }
}

/// Ask the configured model for a reduction plan for this footprint.
pub async fn carbon_advice(
    result: &EmissionResult,
    llm: &LlmSection,
) -> Result<AdvicePlan, AdviceError> {
    let (client, endpoint) = connect(llm).await?;
    let content = chat(
        &client,
        &endpoint,
        ADVICE_SYSTEM_PROMPT,
        advice_prompt(result),
        1000,
    )
    .await?;
    let plan = parse_advice(&content)?;
    info!(
        recommendations = plan.recommendations.len(),
        top = ?plan.top_categories,
        "Advice plan received"
    );
    Ok(plan)
}

/// Five general (or category-specific) sustainable living tips.
pub async fn sustainable_tips(
    category: Option<&str>,
    llm: &LlmSection,
) -> Result<Vec<String>, AdviceError> {
    let (client, endpoint) = connect(llm).await?;
    let content = chat(&client, &endpoint, TIPS_SYSTEM_PROMPT, tips_prompt(category), 500).await?;
    let tips = parse_tip_lines(&content);
    if tips.is_empty() {
        return Err(AdviceError::EmptyResponse);
    }
    Ok(tips)
}

/// Decode a model reply into an [`AdvicePlan`], tolerating fences and
/// chatter around the object.
pub fn parse_advice(content: &str) -> Result<AdvicePlan, AdviceError> {
    let json_str = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    let json_str = extract_json_object(json_str)?;
    Ok(serde_json::from_str(json_str)?)
}

/// The outermost JSON object in `s`, e.g. after reasoning text.
fn extract_json_object(s: &str) -> Result<&str, AdviceError> {
    let start = s
        .find('{')
        .ok_or_else(|| AdviceError::MalformedJson("no '{' found".into()))?;
    let end = s
        .rfind('}')
        .ok_or_else(|| AdviceError::MalformedJson("no '}' found".into()))?;
    if end <= start {
        return Err(AdviceError::MalformedJson("unbalanced braces".into()));
    }
    Ok(&s[start..=end])
}

static LIST_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\s*").expect("static list-number pattern must compile"));

/// One tip per non-blank line, with any leading "N." numbering removed.
pub fn parse_tip_lines(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| LIST_NUMBER.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}
