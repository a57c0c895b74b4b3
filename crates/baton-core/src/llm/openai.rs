//! OpenAI-compatible chat completions backend with SSE streaming.

use async_trait::async_trait;
use serde_json::Value;
use tokio_stream::{Stream, StreamExt};

use super::{ChatModel, ChatRequest, Fragment, FragmentStream};
use crate::config::ModelSettings;
use crate::error::WorkflowError;

pub struct OpenAiCompatModel {
    client: reqwest::Client,
    settings: ModelSettings,
}

impl OpenAiCompatModel {
    pub fn new(settings: ModelSettings) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(300))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            settings,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    fn body(&self, request: &ChatRequest) -> Value {
        let mut body = serde_json::json!({
            "model": self.settings.model,
            "messages": request.messages,
            "stream": true,
        });
        if request.json_output {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }
        body
    }
}

/// Parse one SSE `data:` payload. `Ok(None)` means the line carried nothing.
fn parse_sse_data(data: &str) -> Result<Option<Fragment>, WorkflowError> {
    let json: Value = serde_json::from_str(data)
        .map_err(|e| WorkflowError::Backend(format!("Invalid stream chunk: {}", e)))?;
    if let Some(error) = json.get("error") {
        return Err(WorkflowError::Backend(format!("Stream error: {}", error)));
    }
    let Some(delta) = json.pointer("/choices/0/delta") else {
        return Ok(None);
    };
    let fragment = Fragment {
        content: delta
            .get("content")
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .to_string(),
        reasoning_content: delta
            .get("reasoning_content")
            .and_then(|c| c.as_str())
            .map(|s| s.to_string()),
    };
    Ok((!fragment.is_empty()).then_some(fragment))
}

/// Splits raw SSE bytes into lines. Lines are decoded only once complete, so
/// a multi-byte character split across chunks survives.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line).trim().to_string());
        }
        lines
    }
}

/// Turn an SSE byte stream into fragments, stopping at `[DONE]`.
fn sse_fragments<S, B, E>(bytes: S) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let mut bytes = Box::pin(bytes);
    let stream = async_stream::stream! {
        let mut buffer = LineBuffer::default();
        'outer: while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(WorkflowError::Backend(format!("Stream read failed: {}", e)));
                    return;
                }
            };

            for line in buffer.push(chunk.as_ref()) {
                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();
                if data == "[DONE]" {
                    break 'outer;
                }
                match parse_sse_data(data) {
                    Ok(Some(fragment)) => yield Ok(fragment),
                    Ok(None) => {}
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }
    };
    Box::pin(stream)
}

#[async_trait]
impl ChatModel for OpenAiCompatModel {
    fn name(&self) -> &str {
        &self.settings.model
    }

    async fn stream(&self, request: ChatRequest) -> Result<FragmentStream, WorkflowError> {
        let url = self.endpoint();
        tracing::debug!(
            "[OpenAiCompat] POST {} (model: {}, messages: {})",
            url,
            self.settings.model,
            request.messages.len()
        );

        let mut builder = self.client.post(&url).json(&self.body(&request));
        if !self.settings.api_key.is_empty() {
            builder = builder.bearer_auth(&self.settings.api_key);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| WorkflowError::Backend(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(WorkflowError::Backend(format!(
                "API returned {}: {}",
                status, text
            )));
        }

        Ok(sse_fragments(response.bytes_stream()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sse_content_and_reasoning() {
        let fragment = parse_sse_data(r#"{"choices":[{"delta":{"content":"Hi"}}]}"#)
            .unwrap()
            .unwrap();
        assert_eq!(fragment.content, "Hi");

        let fragment =
            parse_sse_data(r#"{"choices":[{"delta":{"reasoning_content":"hmm","content":null}}]}"#)
                .unwrap()
                .unwrap();
        assert_eq!(fragment.reasoning_content.as_deref(), Some("hmm"));
        assert!(fragment.content.is_empty());
    }

    #[test]
    fn test_parse_sse_skips_empty_and_reports_errors() {
        assert!(parse_sse_data(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#)
            .unwrap()
            .is_none());
        assert!(parse_sse_data(r#"{"error":{"message":"quota"}}"#).is_err());
        assert!(parse_sse_data("not json").is_err());
    }

    #[test]
    fn test_line_buffer_keeps_split_characters() {
        let bytes = "data: caf\u{e9}\n".as_bytes();
        let split = bytes.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let mut buffer = LineBuffer::default();
        assert!(buffer.push(&bytes[..split]).is_empty());
        assert_eq!(buffer.push(&bytes[split..]), vec!["data: caf\u{e9}".to_string()]);
    }

    #[tokio::test]
    async fn test_stream_decodes_character_split_across_chunks() {
        let payload = "data: {\"choices\":[{\"delta\":{\"content\":\"caf\u{e9}\"}}]}\n\ndata: [DONE]\n\n";
        let bytes = payload.as_bytes();
        let split = bytes.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let chunks: Vec<Result<Vec<u8>, std::convert::Infallible>> =
            vec![Ok(bytes[..split].to_vec()), Ok(bytes[split..].to_vec())];

        let fragments: Vec<Fragment> = sse_fragments(tokio_stream::iter(chunks))
            .map(|f| f.unwrap())
            .collect()
            .await;
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].content, "caf\u{e9}");
    }

    #[test]
    fn test_body_requests_json_object() {
        let model = OpenAiCompatModel::new(ModelSettings {
            model: "gpt-test".into(),
            base_url: "http://localhost:1234/v1/".into(),
            api_key: String::new(),
        });
        assert_eq!(model.endpoint(), "http://localhost:1234/v1/chat/completions");
        let body = model.body(&ChatRequest::default().json());
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["stream"], true);
    }
}
