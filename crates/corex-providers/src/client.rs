use crate::error::{Error, Result};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

/// One message in a chat-completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A model turn request. Shared across all provider variants; each variant
/// translates it to its own wire shape.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// One increment of a streamed model turn.
#[derive(Debug, Clone)]
pub enum ChatDelta {
    Text(String),
    Done { input_tokens: u64, output_tokens: u64 },
    Error(String),
}

/// Configuration for a single named provider endpoint. The same shape
/// serves Anthropic's native API and any OpenAI-compatible gateway; the
/// difference is entirely in wire framing, handled by `ModelProvider::stream`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

/// Canned responses for deterministic tests and offline runs.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    pub scripted_text: Vec<String>,
}

/// The sum type of supported model providers. Each variant implements the
/// same chat-complete + stream capability; callers never match on it
/// themselves, they call `ModelProvider::stream`.
#[derive(Debug, Clone)]
pub enum ModelProvider {
    Anthropic(EndpointConfig),
    OpenAiCompatible(EndpointConfig),
    Mock(MockConfig),
}

impl ModelProvider {
    /// Stream a chat turn. Returns a channel of deltas terminated by exactly
    /// one `ChatDelta::Done` or `ChatDelta::Error`.
    pub async fn stream(&self, request: ChatRequest) -> Result<mpsc::Receiver<ChatDelta>> {
        match self {
            ModelProvider::Anthropic(cfg) => stream_anthropic(cfg.clone(), request).await,
            ModelProvider::OpenAiCompatible(cfg) => stream_openai_compatible(cfg.clone(), request).await,
            ModelProvider::Mock(cfg) => Ok(stream_mock(cfg.clone())),
        }
    }
}

fn anthropic_body(cfg: &EndpointConfig, request: &ChatRequest) -> Value {
    serde_json::json!({
        "model": cfg.model,
        "system": request.system,
        "max_tokens": request.max_tokens,
        "temperature": request.temperature,
        "stream": true,
        "messages": request.messages.iter().map(|m| serde_json::json!({
            "role": match m.role {
                ChatRole::System => "user",
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            },
            "content": m.content,
        })).collect::<Vec<_>>(),
    })
}

async fn stream_anthropic(cfg: EndpointConfig, request: ChatRequest) -> Result<mpsc::Receiver<ChatDelta>> {
    let client = reqwest::Client::new();
    let body = anthropic_body(&cfg, &request);
    let response = client
        .post(format!("{}/v1/messages", cfg.base_url))
        .header("x-api-key", &cfg.api_key)
        .header("anthropic-version", "2023-06-01")
        .json(&body)
        .send()
        .await?
        .error_for_status()?;

    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(async move {
        let mut bytes = response.bytes_stream();
        let mut input_tokens = 0u64;
        let mut output_tokens = 0u64;
        let mut buf = String::new();
        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    let _ = tx.send(ChatDelta::Error(e.to_string())).await;
                    return;
                }
            };
            buf.push_str(&String::from_utf8_lossy(&chunk));
            while let Some(pos) = buf.find("\n\n") {
                let frame = buf[..pos].to_string();
                buf.drain(..pos + 2);
                for line in frame.lines() {
                    let Some(data) = line.strip_prefix("data: ") else { continue };
                    let Ok(event): std::result::Result<Value, _> = serde_json::from_str(data) else { continue };
                    match event.get("type").and_then(Value::as_str) {
                        Some("content_block_delta") => {
                            if let Some(text) = event
                                .pointer("/delta/text")
                                .and_then(Value::as_str)
                            {
                                if tx.send(ChatDelta::Text(text.to_string())).await.is_err() {
                                    return;
                                }
                            }
                        }
                        Some("message_start") => {
                            input_tokens = event
                                .pointer("/message/usage/input_tokens")
                                .and_then(Value::as_u64)
                                .unwrap_or(0);
                        }
                        Some("message_delta") => {
                            output_tokens = event
                                .pointer("/usage/output_tokens")
                                .and_then(Value::as_u64)
                                .unwrap_or(output_tokens);
                        }
                        _ => {}
                    }
                }
            }
        }
        let _ = tx.send(ChatDelta::Done { input_tokens, output_tokens }).await;
    });
    Ok(rx)
}

fn openai_body(cfg: &EndpointConfig, request: &ChatRequest) -> Value {
    let mut messages: Vec<Value> = Vec::new();
    if let Some(system) = &request.system {
        messages.push(serde_json::json!({"role": "system", "content": system}));
    }
    for m in &request.messages {
        let role = match m.role {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        };
        messages.push(serde_json::json!({"role": role, "content": m.content}));
    }
    serde_json::json!({
        "model": cfg.model,
        "messages": messages,
        "max_tokens": request.max_tokens,
        "temperature": request.temperature,
        "stream": true,
    })
}

async fn stream_openai_compatible(cfg: EndpointConfig, request: ChatRequest) -> Result<mpsc::Receiver<ChatDelta>> {
    let client = reqwest::Client::new();
    let body = openai_body(&cfg, &request);
    let response = client
        .post(format!("{}/chat/completions", cfg.base_url))
        .bearer_auth(&cfg.api_key)
        .json(&body)
        .send()
        .await?
        .error_for_status()?;

    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(async move {
        let mut bytes = response.bytes_stream();
        let mut buf = String::new();
        loop {
            let chunk = match bytes.next().await {
                Some(Ok(c)) => c,
                Some(Err(e)) => {
                    let _ = tx.send(ChatDelta::Error(e.to_string())).await;
                    return;
                }
                None => break,
            };
            buf.push_str(&String::from_utf8_lossy(&chunk));
            while let Some(pos) = buf.find('\n') {
                let line = buf[..pos].trim().to_string();
                buf.drain(..pos + 1);
                let Some(data) = line.strip_prefix("data: ") else { continue };
                if data == "[DONE]" {
                    let _ = tx.send(ChatDelta::Done { input_tokens: 0, output_tokens: 0 }).await;
                    return;
                }
                let Ok(event): std::result::Result<Value, _> = serde_json::from_str(data) else { continue };
                if let Some(text) = event
                    .pointer("/choices/0/delta/content")
                    .and_then(Value::as_str)
                {
                    if tx.send(ChatDelta::Text(text.to_string())).await.is_err() {
                        return;
                    }
                }
                if let Some(usage) = event.get("usage") {
                    let input_tokens = usage.get("prompt_tokens").and_then(Value::as_u64).unwrap_or(0);
                    let output_tokens = usage.get("completion_tokens").and_then(Value::as_u64).unwrap_or(0);
                    let _ = tx.send(ChatDelta::Done { input_tokens, output_tokens }).await;
                    return;
                }
            }
        }
        let _ = tx.send(ChatDelta::Done { input_tokens: 0, output_tokens: 0 }).await;
    });
    Ok(rx)
}

fn stream_mock(cfg: MockConfig) -> mpsc::Receiver<ChatDelta> {
    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(async move {
        for chunk in cfg.scripted_text {
            if tx.send(ChatDelta::Text(chunk)).await.is_err() {
                return;
            }
        }
        let _ = tx
            .send(ChatDelta::Done { input_tokens: 0, output_tokens: 0 })
            .await;
    });
    rx
}

/// Collects a stream into a single buffered text and the final usage pair.
/// Used by call sites that don't need incremental deltas.
pub async fn collect(mut rx: mpsc::Receiver<ChatDelta>) -> Result<(String, u64, u64)> {
    let mut text = String::new();
    while let Some(delta) = rx.recv().await {
        match delta {
            ChatDelta::Text(chunk) => text.push_str(&chunk),
            ChatDelta::Done { input_tokens, output_tokens } => return Ok((text, input_tokens, output_tokens)),
            ChatDelta::Error(msg) => return Err(Error::Protocol(msg)),
        }
    }
    Ok((text, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_provider_replays_scripted_text_then_done() {
        let provider = ModelProvider::Mock(MockConfig {
            scripted_text: vec!["Hello".into(), ", world".into()],
        });
        let request = ChatRequest {
            model: "mock".into(),
            system: None,
            messages: vec![ChatMessage { role: ChatRole::User, content: "hi".into() }],
            max_tokens: 64,
            temperature: 0.0,
        };
        let rx = provider.stream(request).await.unwrap();
        let (text, _, _) = collect(rx).await.unwrap();
        assert_eq!(text, "Hello, world");
    }
}
