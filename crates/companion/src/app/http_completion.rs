use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::debug;

use super::chat::{ChatError, ChatRequest, ChatSettings, CompletionClient};

const USER_AGENT: &str = concat!("buddy-companion/", env!("CARGO_PKG_VERSION"));
const ERROR_SNIPPET_CHARS: usize = 200;

/// Chat-completions client over blocking HTTP. Runs on the chat worker
/// thread, so blocking here never stalls the frame loop.
pub(crate) struct HttpCompletion {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl HttpCompletion {
    pub(crate) fn new(settings: &ChatSettings, api_key: String) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_seconds))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|error| ChatError::Request(format!("failed to build HTTP client: {error}")))?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_key,
        })
    }
}

impl CompletionClient for HttpCompletion {
    fn complete(&mut self, request: &ChatRequest) -> Result<String, ChatError> {
        let body = serde_json::to_string(request)
            .map_err(|error| ChatError::Request(format!("failed to encode request: {error}")))?;
        let response = self
            .client
            .post(self.endpoint.as_str())
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(transport_error)?;

        let status = response.status();
        let text = response.text().map_err(transport_error)?;
        debug!(
            status = status.as_u16(),
            bytes = text.len(),
            "chat_completion_response"
        );
        if !status.is_success() {
            return Err(ChatError::Request(describe_http_failure(status.as_u16(), &text)));
        }
        parse_completion_response(&text)
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Text of the first choice. A missing or blank message is an empty response.
fn parse_completion_response(body: &str) -> Result<String, ChatError> {
    let response: CompletionResponse = serde_json::from_str(body).map_err(|error| {
        ChatError::Request(format!("malformed completion response: {error}"))
    })?;
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(ChatError::EmptyResponse)?;
    let content = content.trim();
    if content.is_empty() {
        return Err(ChatError::EmptyResponse);
    }
    Ok(content.to_string())
}

fn describe_http_failure(status: u16, body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => format!("HTTP {status}: {}", parsed.error.message),
        Err(_) if body.trim().is_empty() => format!("HTTP {status}"),
        Err(_) => {
            let snippet = body.trim().chars().take(ERROR_SNIPPET_CHARS).collect::<String>();
            format!("HTTP {status}: {snippet}")
        }
    }
}

fn transport_error(error: reqwest::Error) -> ChatError {
    if error.is_timeout() {
        ChatError::Request(format!("request timed out: {error}"))
    } else {
        ChatError::Request(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_choice_content_is_the_reply() {
        let body = r#"{
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": " Hi there! "}},
                {"index": 1, "message": {"role": "assistant", "content": "ignored"}}
            ]
        }"#;
        assert_eq!(parse_completion_response(body).expect("reply"), "Hi there!");
    }

    #[test]
    fn missing_or_blank_content_is_empty_response() {
        assert_eq!(
            parse_completion_response(r#"{"choices": []}"#),
            Err(ChatError::EmptyResponse)
        );
        assert_eq!(
            parse_completion_response(r#"{"choices": [{"message": {"role": "assistant"}}]}"#),
            Err(ChatError::EmptyResponse)
        );
        assert_eq!(
            parse_completion_response(r#"{"choices": [{"message": {"content": "  "}}]}"#),
            Err(ChatError::EmptyResponse)
        );
    }

    #[test]
    fn malformed_body_is_a_request_error() {
        match parse_completion_response("<html>bad gateway</html>") {
            Err(ChatError::Request(message)) => {
                assert!(message.starts_with("malformed completion response"), "{message}")
            }
            other => panic!("expected request error, got {other:?}"),
        }
    }

    #[test]
    fn http_failure_prefers_api_error_message() {
        let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
        assert_eq!(
            describe_http_failure(401, body),
            "HTTP 401: Incorrect API key provided"
        );
        assert_eq!(describe_http_failure(502, ""), "HTTP 502");
        assert_eq!(describe_http_failure(503, "upstream down\n"), "HTTP 503: upstream down");
    }

    #[test]
    fn unusable_endpoint_maps_to_request_error() {
        let settings = ChatSettings {
            endpoint: "not a url".to_string(),
            ..ChatSettings::default()
        };
        let mut client = HttpCompletion::new(&settings, "test-key".to_string()).expect("client");
        let request = ChatRequest {
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            messages: Vec::new(),
        };
        assert!(matches!(
            client.complete(&request),
            Err(ChatError::Request(_))
        ));
    }
}
