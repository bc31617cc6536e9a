//! OpenAI-compatible chat completion provider

use super::error_hints::{http_failure, send_failure};
use super::request_builder::{apply_model_rules, max_stop_words, merge_extra_body, to_chat_body};
use crate::config::{Config, RequestOptions};
use crate::error::{SmileError, SmileResult};
use crate::llm::sse::{SseDecoder, SseEvent};
use crate::llm::streaming::{ChatProvider, ProviderStream, StreamChunk, ToolCallDelta};
use crate::types::{ChatMessage, CompletionOptions};
use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Certificate, Client, Identity, NoProxy, Proxy, Url};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::future::ready;
use tracing::{debug, info, instrument, warn};

/// Provider for any endpoint speaking the OpenAI chat completions protocol
pub struct OpenAiProvider {
    name: String,
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    max_stop_words: Option<usize>,
    headers: BTreeMap<String, String>,
    extra_body: Map<String, Value>,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint.as_str())
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

impl OpenAiProvider {
    /// Create a provider for `api_base` (the URL that `chat/completions` is
    /// resolved against).
    pub fn new(
        api_base: &str,
        api_key: Option<String>,
        options: &RequestOptions,
    ) -> SmileResult<Self> {
        let base = normalize_base(api_base)?;
        let endpoint = base
            .join("chat/completions")
            .map_err(|e| SmileError::config(format!("Invalid api_base '{}': {}", api_base, e)))?;

        Ok(Self {
            name: "openai".to_string(),
            client: build_client(options)?,
            max_stop_words: max_stop_words(&base, false),
            endpoint,
            api_key,
            headers: options.headers.clone(),
            extra_body: options.extra_body_properties.clone(),
        })
    }

    /// Create the provider described by a configuration
    pub fn from_config(config: &Config) -> SmileResult<Self> {
        let mut provider = Self::new(
            config.api_base_or_default(),
            config.api_key.clone(),
            &config.request,
        )?;
        provider.name = config.provider.to_ascii_lowercase();
        if config.is_azure() {
            provider.max_stop_words = Some(4);
        }
        Ok(provider)
    }

    pub fn with_max_stop_words(mut self, limit: Option<usize>) -> Self {
        self.max_stop_words = limit;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The exact JSON body sent for a request
    pub fn build_body(&self, messages: &[ChatMessage], options: &CompletionOptions) -> Value {
        let mut body = to_chat_body(messages, options);
        apply_model_rules(&mut body, self.max_stop_words);
        merge_extra_body(&mut body, &self.extra_body);
        body
    }
}

/// Parse the base URL, rewrite `localhost` and make sure relative joins keep the path
fn normalize_base(api_base: &str) -> SmileResult<Url> {
    let mut base = Url::parse(api_base)
        .map_err(|e| SmileError::config(format!("Invalid api_base '{}': {}", api_base, e)))?;
    if base.host_str() == Some("localhost") {
        base.set_host(Some("127.0.0.1"))
            .map_err(|e| SmileError::config(format!("Invalid api_base '{}': {}", api_base, e)))?;
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}

fn build_client(options: &RequestOptions) -> SmileResult<Client> {
    let mut builder = Client::builder()
        .timeout(options.timeout)
        .danger_accept_invalid_certs(!options.verify_ssl);

    if let Some(proxy) = &options.proxy {
        let mut proxy = Proxy::all(proxy.as_str())
            .map_err(|e| SmileError::config(format!("Invalid proxy '{}': {}", proxy, e)))?;
        if !options.no_proxy.is_empty() {
            proxy = proxy.no_proxy(NoProxy::from_string(&options.no_proxy.join(",")));
        }
        builder = builder.proxy(proxy);
    }

    for path in &options.ca_bundle_path {
        let pem = fs::read(path)
            .map_err(|e| SmileError::io_with_path(e.to_string(), path.display().to_string()))?;
        let certs = Certificate::from_pem_bundle(&pem).map_err(|e| {
            SmileError::config(format!("Invalid CA bundle '{}': {}", path.display(), e))
        })?;
        for cert in certs {
            builder = builder.add_root_certificate(cert);
        }
    }

    if let Some(client_cert) = &options.client_certificate {
        let mut pem = fs::read(&client_cert.cert).map_err(|e| {
            SmileError::io_with_path(e.to_string(), client_cert.cert.display().to_string())
        })?;
        let key = fs::read(&client_cert.key).map_err(|e| {
            SmileError::io_with_path(e.to_string(), client_cert.key.display().to_string())
        })?;
        pem.push(b'\n');
        pem.extend_from_slice(&key);
        let identity = Identity::from_pem(&pem)
            .map_err(|e| SmileError::config(format!("Invalid client certificate: {}", e)))?;
        builder = builder.identity(identity);
    }

    builder
        .build()
        .map_err(|e| SmileError::config(format!("Failed to build HTTP client: {}", e)))
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip_all, fields(provider = %self.name, model = %options.model), level = "debug")]
    async fn open_stream(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> SmileResult<ProviderStream> {
        let body = self.build_body(messages, options);
        let streaming = body.get("stream").and_then(Value::as_bool).unwrap_or(true);
        let url = self.endpoint.as_str();

        info!(
            messages = messages.len(),
            stream = streaming,
            "sending completion request"
        );

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key).header("api-key", key.as_str());
        }
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(|e| send_failure(e, url))?;
        let status = response.status();
        if !status.is_success() {
            let final_url = response.url().to_string();
            let text = response.text().await.unwrap_or_default();
            return Err(http_failure(status, &final_url, &text));
        }

        if !streaming {
            let json: Value = response.json().await?;
            let chunk = parse_full_response(&json, &self.name)?;
            return Ok(Box::pin(stream::iter(vec![Ok(chunk)])));
        }

        let provider = self.name.clone();
        let chunks = sse_events(response.bytes_stream())
            .take_while(|event| ready(!matches!(event, Ok(event) if event.is_done())))
            .filter_map(move |event| {
                ready(match event {
                    Ok(event) => parse_stream_payload(&event.data, &provider).transpose(),
                    Err(e) => Some(Err(e)),
                })
            });
        Ok(Box::pin(chunks))
    }
}

/// Decode a byte stream into SSE events, flushing a trailing event on close
fn sse_events<S, B>(bytes: S) -> impl Stream<Item = SmileResult<SseEvent>> + Send
where
    S: Stream<Item = reqwest::Result<B>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    struct State<B> {
        bytes: BoxStream<'static, reqwest::Result<B>>,
        decoder: SseDecoder,
        queue: VecDeque<SseEvent>,
        closed: bool,
    }

    let state = State {
        bytes: bytes.boxed(),
        decoder: SseDecoder::new(),
        queue: VecDeque::new(),
        closed: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.queue.pop_front() {
                return Some((Ok(event), state));
            }
            if state.closed {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.feed(chunk.as_ref());
                    state.queue.extend(events);
                }
                Some(Err(e)) => {
                    state.closed = true;
                    return Some((Err(SmileError::from(e)), state));
                }
                None => {
                    state.closed = true;
                    let trailing = state.decoder.finish();
                    state.queue.extend(trailing);
                }
            }
        }
    })
}

fn error_in(json: &Value, provider: &str) -> Option<SmileError> {
    let error = json.get("error")?;
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string());
    Some(SmileError::llm_with_provider(message, provider))
}

fn tool_call_deltas(calls: &[Value]) -> Vec<ToolCallDelta> {
    calls
        .iter()
        .enumerate()
        .map(|(position, call)| ToolCallDelta {
            index: call
                .get("index")
                .and_then(Value::as_u64)
                .map(|i| i as usize)
                .unwrap_or(position),
            id: call.get("id").and_then(Value::as_str).map(str::to_string),
            name: call
                .pointer("/function/name")
                .and_then(Value::as_str)
                .map(str::to_string),
            arguments: call
                .pointer("/function/arguments")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
        .collect()
}

/// Parse one `data:` payload. `Ok(None)` means the event carried nothing useful.
pub fn parse_stream_payload(data: &str, provider: &str) -> SmileResult<Option<StreamChunk>> {
    let json: Value = match serde_json::from_str(data) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "skipping malformed stream event");
            return Ok(None);
        }
    };
    if let Some(error) = error_in(&json, provider) {
        return Err(error);
    }

    let Some(choice) = json.pointer("/choices/0") else {
        debug!("stream event without choices");
        return Ok(None);
    };

    let chunk = StreamChunk {
        content: choice
            .pointer("/delta/content")
            .and_then(Value::as_str)
            .map(str::to_string),
        tool_calls: choice
            .pointer("/delta/tool_calls")
            .and_then(Value::as_array)
            .map(|calls| tool_call_deltas(calls))
            .unwrap_or_default(),
        finish_reason: choice
            .get("finish_reason")
            .and_then(Value::as_str)
            .map(str::to_string),
        is_final: false,
    };

    if chunk.content.is_none() && chunk.tool_calls.is_empty() && chunk.finish_reason.is_none() {
        return Ok(None);
    }
    Ok(Some(StreamChunk {
        is_final: chunk.finish_reason.is_some(),
        ..chunk
    }))
}

/// Turn a non-streaming response into a single final chunk
pub fn parse_full_response(json: &Value, provider: &str) -> SmileResult<StreamChunk> {
    if let Some(error) = error_in(json, provider) {
        return Err(error);
    }
    let choice = json.pointer("/choices/0").ok_or_else(|| {
        SmileError::llm_with_provider("Response contained no choices", provider)
    })?;

    Ok(StreamChunk {
        content: choice
            .pointer("/message/content")
            .and_then(Value::as_str)
            .map(str::to_string),
        tool_calls: choice
            .pointer("/message/tool_calls")
            .and_then(Value::as_array)
            .map(|calls| tool_call_deltas(calls))
            .unwrap_or_default(),
        finish_reason: choice
            .get("finish_reason")
            .and_then(Value::as_str)
            .map(str::to_string),
        is_final: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn localhost_is_rewritten() {
        let provider =
            OpenAiProvider::new("http://localhost:11434/v1", None, &RequestOptions::default())
                .unwrap();
        assert_eq!(
            provider.endpoint().as_str(),
            "http://127.0.0.1:11434/v1/chat/completions"
        );
    }

    #[test]
    fn trailing_slash_is_optional() {
        let a = OpenAiProvider::new("https://api.openai.com/v1/", None, &RequestOptions::default())
            .unwrap();
        let b = OpenAiProvider::new("https://api.openai.com/v1", None, &RequestOptions::default())
            .unwrap();
        assert_eq!(a.endpoint(), b.endpoint());
    }

    #[test]
    fn invalid_base_is_a_config_error() {
        let err = OpenAiProvider::new("nope", None, &RequestOptions::default()).unwrap_err();
        assert!(matches!(err, SmileError::Config { .. }));
    }

    #[test]
    fn body_applies_host_limits_and_extra_properties() {
        let mut options = RequestOptions::default();
        options
            .extra_body_properties
            .insert("user".into(), json!("tester"));
        let provider = OpenAiProvider::new("https://api.openai.com/v1", None, &options).unwrap();

        let stop = (0..8).map(|i| format!("s{i}")).collect();
        let body = provider.build_body(
            &[ChatMessage::user("hi")],
            &CompletionOptions::new("gpt-4o").with_stop(stop),
        );
        assert_eq!(body["stop"].as_array().unwrap().len(), 4);
        assert_eq!(body["user"], "tester");
    }

    #[test]
    fn parses_content_delta() {
        let data = r#"{"choices":[{"index":0,"delta":{"content":"Hel"},"finish_reason":null}]}"#;
        let chunk = parse_stream_payload(data, "openai").unwrap().unwrap();
        assert_eq!(chunk.content.as_deref(), Some("Hel"));
        assert!(!chunk.is_final);
    }

    #[test]
    fn role_only_delta_is_skipped() {
        let data = r#"{"choices":[{"index":0,"delta":{"role":"assistant"}}]}"#;
        assert!(parse_stream_payload(data, "openai").unwrap().is_none());
        assert!(parse_stream_payload("{not json", "openai").unwrap().is_none());
        assert!(parse_stream_payload(r#"{"choices":[]}"#, "openai").unwrap().is_none());
    }

    #[test]
    fn parses_tool_call_delta_and_finish() {
        let data = r#"{"choices":[{"delta":{"tool_calls":[{"index":1,"id":"call_9","function":{"name":"clock","arguments":"{"}}]},"finish_reason":"tool_calls"}]}"#;
        let chunk = parse_stream_payload(data, "openai").unwrap().unwrap();
        assert_eq!(chunk.tool_calls[0].index, 1);
        assert_eq!(chunk.tool_calls[0].id.as_deref(), Some("call_9"));
        assert_eq!(chunk.tool_calls[0].arguments.as_deref(), Some("{"));
        assert_eq!(chunk.finish_reason.as_deref(), Some("tool_calls"));
        assert!(chunk.is_final);
    }

    #[test]
    fn in_stream_error_fails() {
        let data = r#"{"error":{"message":"overloaded"}}"#;
        let err = parse_stream_payload(data, "openai").unwrap_err();
        assert!(err.to_string().contains("overloaded"));
    }

    #[test]
    fn full_response_becomes_one_chunk() {
        let json = json!({
            "choices": [{
                "message": {"role": "assistant", "content": "done", "tool_calls": [
                    {"id": "call_1", "type": "function", "function": {"name": "clock", "arguments": "{}"}}
                ]},
                "finish_reason": "stop"
            }]
        });
        let chunk = parse_full_response(&json, "openai").unwrap();
        assert_eq!(chunk.content.as_deref(), Some("done"));
        assert_eq!(chunk.tool_calls[0].index, 0);
        assert_eq!(chunk.tool_calls[0].name.as_deref(), Some("clock"));
        assert!(chunk.is_final);

        assert!(parse_full_response(&json!({"choices": []}), "openai").is_err());
    }

    #[tokio::test]
    async fn sse_events_flush_trailing_data() {
        let parts: Vec<reqwest::Result<&'static [u8]>> =
            vec![Ok(&b"data: {\"a\":1}\n\nda"[..]), Ok(&b"ta: [DONE]"[..])];
        let events: Vec<_> = sse_events(stream::iter(parts)).collect().await;
        assert_eq!(events.len(), 2);
        assert!(events[1].as_ref().unwrap().is_done());
    }
}
