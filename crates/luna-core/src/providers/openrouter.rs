use super::provider::{CompletionProvider, Message};
use crate::config::{Credentials, LunaConfig};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Chat-completions client for OpenRouter and compatible endpoints.
pub struct OpenRouterProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    referer: String,
    title: String,
    timeout: Duration,
}

impl OpenRouterProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let defaults = LunaConfig::default();
        let timeout = defaults.request_timeout();
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: defaults.max_tokens,
            referer: defaults.referer,
            title: defaults.title,
            timeout,
        }
    }

    pub fn from_config(config: &LunaConfig, creds: &Credentials) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.clone(),
            api_key: creds.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            referer: config.referer.clone(),
            title: config.title.clone(),
            timeout: config.request_timeout(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: &'a [Message],
}

/// The part of a chat-completions response we read. Every level is optional
/// so a JSON body missing any of them falls through to `None`.
#[derive(Debug, Default, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    pub fn first_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
    }
}

#[async_trait]
impl CompletionProvider for OpenRouterProvider {
    async fn complete(&self, messages: &[Message]) -> Result<Option<String>> {
        let body = ChatCompletionRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages,
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!(%url, model = %self.model, "requesting completion");
        let raw_resp = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.title)
            .json(&body)
            .send()
            .await?;
        if !raw_resp.status().is_success() {
            let status = raw_resp.status();
            let body_text = raw_resp.text().await.unwrap_or_default();
            anyhow::bail!("status {status}: {body_text}");
        }

        let text = raw_resp.text().await?;
        let data: ChatCompletionResponse =
            serde_json::from_str(&text).context("completion response is not valid JSON")?;
        Ok(data.first_content())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::{BodyExt, Full};
    use hyper::body::Bytes;
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper::{Request, Response};
    use hyper_util::rt::TokioIo;
    use serde_json::Value;
    use std::convert::Infallible;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tokio::net::TcpListener;
    use tokio::sync::Mutex;

    async fn serve_once<F, Fut>(handler: F) -> SocketAddr
    where
        F: Fn(Request<hyper::body::Incoming>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<Response<Full<Bytes>>, Infallible>>
            + Send
            + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service_fn(handler))
                .await
                .ok();
        });

        addr
    }

    fn respond_with(status: u16, body: &'static str) -> Response<Full<Bytes>> {
        Response::builder()
            .status(status)
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from(body)))
            .unwrap()
    }

    fn provider(addr: SocketAddr) -> OpenRouterProvider {
        OpenRouterProvider::new(format!("http://{addr}/api/v1"), "sk-test", "test-model")
    }

    #[tokio::test]
    async fn sends_auth_headers_and_body() {
        #[derive(Default)]
        struct Seen {
            path: String,
            auth: String,
            referer: String,
            title: String,
            body: Value,
        }

        let seen = Arc::new(Mutex::new(Seen::default()));
        let seen_inner = Arc::clone(&seen);
        let addr = serve_once(move |req| {
            let seen = Arc::clone(&seen_inner);
            async move {
                let (path, auth, referer, title) = {
                    let header = |name: &str| {
                        req.headers()
                            .get(name)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("")
                            .to_string()
                    };
                    (
                        req.uri().path().to_string(),
                        header("authorization"),
                        header("http-referer"),
                        header("x-title"),
                    )
                };
                let bytes = req.collect().await.unwrap().to_bytes();
                *seen.lock().await = Seen {
                    path,
                    auth,
                    referer,
                    title,
                    body: serde_json::from_slice(&bytes).unwrap(),
                };
                Ok::<_, Infallible>(respond_with(
                    200,
                    r#"{"choices":[{"message":{"role":"assistant","content":"hello"}}]}"#,
                ))
            }
        })
        .await;

        let config = LunaConfig {
            base_url: format!("http://{addr}/api/v1"),
            model: "test-model".into(),
            max_tokens: 64,
            ..LunaConfig::default()
        };
        let creds = Credentials {
            api_key: "sk-test".into(),
        };
        let reply = OpenRouterProvider::from_config(&config, &creds)
            .complete(&[Message::user("hi there")])
            .await
            .unwrap();
        assert_eq!(reply.as_deref(), Some("hello"));

        let s = seen.lock().await;
        assert_eq!(s.path, "/api/v1/chat/completions");
        assert_eq!(s.auth, "Bearer sk-test");
        assert_eq!(s.referer, "https://www.menstrual-health-chatbot.com");
        assert_eq!(s.title, "menstrual-health-chatbot");
        assert_eq!(s.body["model"], "test-model");
        assert_eq!(s.body["max_tokens"], 64);
        assert_eq!(s.body["messages"][0]["role"], "user");
        assert_eq!(s.body["messages"][0]["content"], "hi there");
    }

    #[tokio::test]
    async fn missing_choices_is_none() {
        let addr = serve_once(|_req| async { Ok::<_, Infallible>(respond_with(200, r#"{"id":"x"}"#)) })
            .await;
        assert_eq!(provider(addr).complete(&[Message::user("q")]).await.unwrap(), None);
    }

    #[tokio::test]
    async fn empty_choices_or_null_content_is_none() {
        let addr =
            serve_once(|_req| async { Ok::<_, Infallible>(respond_with(200, r#"{"choices":[]}"#)) })
                .await;
        assert_eq!(provider(addr).complete(&[Message::user("q")]).await.unwrap(), None);

        let addr = serve_once(|_req| async {
            Ok::<_, Infallible>(respond_with(200, r#"{"choices":[{"message":{"content":null}}]}"#))
        })
        .await;
        assert_eq!(provider(addr).complete(&[Message::user("q")]).await.unwrap(), None);
    }

    #[tokio::test]
    async fn error_status_is_err_with_body() {
        let addr = serve_once(|_req| async {
            Ok::<_, Infallible>(respond_with(
                401,
                r#"{"error":{"message":"No auth credentials found","code":401}}"#,
            ))
        })
        .await;

        let err = provider(addr).complete(&[Message::user("q")]).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("401"), "unexpected: {msg}");
        assert!(msg.contains("No auth credentials found"));
    }

    #[tokio::test]
    async fn non_json_body_is_err() {
        let addr = serve_once(|_req| async {
            Ok::<_, Infallible>(respond_with(200, "<html>gateway hiccup</html>"))
        })
        .await;

        let err = provider(addr).complete(&[Message::user("q")]).await.unwrap_err();
        assert!(err.to_string().contains("not valid JSON"), "unexpected: {err}");
    }

    #[test]
    fn new_uses_default_settings() {
        let p = OpenRouterProvider::new("https://openrouter.ai/api/v1", "sk-test", "m");
        assert_eq!(p.model(), "m");
        assert_eq!(p.max_tokens, 1000);
        assert_eq!(p.referer, "https://www.menstrual-health-chatbot.com");
        assert_eq!(p.title, "menstrual-health-chatbot");
        assert_eq!(p.timeout, Duration::from_secs(30));
    }

    #[test]
    fn first_content_takes_first_choice() {
        let data: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"content":"one"}},{"message":{"content":"two"}}]}"#,
        )
        .unwrap();
        assert_eq!(data.first_content().as_deref(), Some("one"));
    }
}
