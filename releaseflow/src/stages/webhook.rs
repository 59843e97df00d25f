//! HTTP POST release announcer.

use crate::context::ReleaseContext;
use crate::core::StageError;
use crate::stages::Stage;
use crate::template::TemplateResolver;
use anyhow::Context as _;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Default message body.
pub const DEFAULT_MESSAGE_TEMPLATE: &str =
    r#"{ "message": "{{ .ProjectName }} {{ .Tag }} is out! Check it out at {{ .ReleaseURL }}"}"#;

const BASIC_AUTH_ENV: &str = "BASIC_AUTH_HEADER_VALUE";
const BEARER_TOKEN_ENV: &str = "BEARER_TOKEN_HEADER_VALUE";

/// Configuration for [`WebhookAnnouncer`].
///
/// Unset fields are filled from [`HttpDefaults`](crate::config::HttpDefaults)
/// in `apply_defaults`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Templated boolean; the announcer only runs when it resolves to `true`.
    #[serde(default)]
    pub enabled: String,
    /// Endpoint; templated.
    #[serde(default)]
    pub endpoint_url: String,
    /// Request body; templated.
    #[serde(default)]
    pub message_template: String,
    /// Content-Type header.
    #[serde(default)]
    pub content_type: String,
    /// Extra headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Status codes that count as success.
    #[serde(default)]
    pub expected_status_codes: Vec<u16>,
    /// Accept invalid TLS certificates.
    #[serde(default)]
    pub skip_tls_verify: bool,
}

impl WebhookConfig {
    /// Creates an enabled configuration posting to `endpoint_url`.
    #[must_use]
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            enabled: "true".to_string(),
            endpoint_url: endpoint_url.into(),
            ..Self::default()
        }
    }

    /// Sets the enable template.
    #[must_use]
    pub fn with_enabled(mut self, enabled: impl Into<String>) -> Self {
        self.enabled = enabled.into();
        self
    }

    /// Sets the message template.
    #[must_use]
    pub fn with_message(mut self, template: impl Into<String>) -> Self {
        self.message_template = template.into();
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the expected status codes.
    #[must_use]
    pub fn with_expected_status_codes(mut self, codes: Vec<u16>) -> Self {
        self.expected_status_codes = codes;
        self
    }
}

/// Announces the release with an HTTP POST.
///
/// The `Authorization` header comes from `BASIC_AUTH_HEADER_VALUE`, or failing
/// that `BEARER_TOKEN_HEADER_VALUE`, in the context environment.
#[derive(Debug, Clone)]
pub struct WebhookAnnouncer {
    name: String,
    config: WebhookConfig,
    user_agent: String,
    timeout: std::time::Duration,
}

impl WebhookAnnouncer {
    /// Creates an announcer named `webhook`.
    #[must_use]
    pub fn new(config: WebhookConfig) -> Self {
        Self::named("webhook", config)
    }

    /// Creates an announcer with a custom name.
    #[must_use]
    pub fn named(name: impl Into<String>, config: WebhookConfig) -> Self {
        let http = crate::config::HttpDefaults::default();
        Self {
            name: name.into(),
            config,
            user_agent: http.user_agent.clone(),
            timeout: http.timeout(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }

    fn authorization<'c>(&self, ctx: &'c ReleaseContext) -> Option<&'c str> {
        let env = ctx.env();
        env.get(BASIC_AUTH_ENV)
            .filter(|v| !v.is_empty())
            .or_else(|| env.get(BEARER_TOKEN_ENV).filter(|v| !v.is_empty()))
    }
}

#[async_trait]
impl Stage for WebhookAnnouncer {
    fn name(&self) -> &str {
        &self.name
    }

    fn skip(&self, ctx: &ReleaseContext) -> Result<bool, StageError> {
        let enabled = TemplateResolver::new(ctx).apply_bool(&self.config.enabled)?;
        Ok(!enabled)
    }

    fn skip_reason(&self) -> String {
        format!("{}: announcing is disabled", self.name)
    }

    fn apply_defaults(&mut self, ctx: &ReleaseContext) -> Result<(), StageError> {
        let http = &ctx.config().http;
        if self.config.message_template.is_empty() {
            self.config.message_template = DEFAULT_MESSAGE_TEMPLATE.to_string();
        }
        if self.config.content_type.is_empty() {
            self.config.content_type.clone_from(&http.content_type);
        }
        if self.config.expected_status_codes.is_empty() {
            self.config.expected_status_codes.clone_from(&http.expected_status_codes);
        }
        self.user_agent.clone_from(&http.user_agent);
        self.timeout = http.timeout();
        Ok(())
    }

    async fn run(&self, ctx: &ReleaseContext) -> Result<(), StageError> {
        let resolver = TemplateResolver::new(ctx);
        let endpoint = resolver.apply(&self.config.endpoint_url)?;
        if endpoint.trim().is_empty() {
            return Err(StageError::msg("no endpoint url"));
        }
        let url = reqwest::Url::parse(endpoint.trim())
            .with_context(|| format!("invalid endpoint url '{endpoint}'"))?;
        let message = resolver.apply(&self.config.message_template)?;

        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(self.config.skip_tls_verify)
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .build()
            .context("building http client")?;

        let mut request = client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, self.config.content_type.as_str())
            .body(message.clone());
        if let Some(auth) = self.authorization(ctx) {
            debug!("authorization header set");
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }
        for (key, value) in &self.config.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        info!(stage = %self.name, "posting: '{}'", message);
        let response = request
            .send()
            .await
            .context("request failed")?;

        let status = response.status();
        if !self.config.expected_status_codes.contains(&status.as_u16()) {
            return Err(StageError::msg(format!("request failed with status {status}")));
        }

        let body = response.text().await.unwrap_or_default();
        info!(stage = %self.name, status = status.as_u16(), response = %body, "post ok");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{StageOutcome, StagePhase};
    use crate::testing::TestContext;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn announcer(ctx: &ReleaseContext, config: WebhookConfig) -> WebhookAnnouncer {
        let mut stage = WebhookAnnouncer::new(config);
        stage.apply_defaults(ctx).unwrap();
        stage
    }

    #[tokio::test]
    async fn test_defaults_are_applied() {
        let ctx = TestContext::new().build();
        let stage = announcer(&ctx, WebhookConfig::new("http://localhost")).await;

        assert_eq!(stage.config().message_template, DEFAULT_MESSAGE_TEMPLATE);
        assert_eq!(stage.config().content_type, "application/json; charset=utf-8");
        assert_eq!(stage.config().expected_status_codes, vec![200, 201, 202, 204]);
    }

    #[tokio::test]
    async fn test_enable_flag() {
        let ctx = TestContext::new().build();
        let disabled = announcer(&ctx, WebhookConfig::default()).await;
        assert!(disabled.skip(&ctx).unwrap());

        let enabled = announcer(&ctx, WebhookConfig::new("http://x").with_enabled("{{ eq .Tag \"v1.2.3\" }}")).await;
        assert!(!enabled.skip(&ctx).unwrap());

        let broken = announcer(&ctx, WebhookConfig::new("http://x").with_enabled("{{ .Nope }}")).await;
        assert!(broken.skip(&ctx).is_err());
    }

    #[tokio::test]
    async fn test_posts_message_with_headers_and_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("content-type", "application/json; charset=utf-8"))
            .and(header("user-agent", "releaseflow"))
            .and(header("authorization", "Basic abc"))
            .and(header("x-custom", "yes"))
            .and(body_string(
                r#"{ "message": "demo v1.2.3 is out! Check it out at https://example.com/v1.2.3"}"#,
            ))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = TestContext::new()
            .with_env("BASIC_AUTH_HEADER_VALUE", "Basic abc")
            .with_env("BEARER_TOKEN_HEADER_VALUE", "Bearer ignored")
            .build();
        ctx.values().set("ReleaseURL", "https://example.com/v1.2.3").unwrap();

        let config = WebhookConfig::new(format!("{}/hook", server.uri())).with_header("X-Custom", "yes");
        let stage = announcer(&ctx, config).await;
        stage.run(&ctx).await.unwrap();
    }

    #[tokio::test]
    async fn test_bearer_token_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer t0ken"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = TestContext::new()
            .with_env("BEARER_TOKEN_HEADER_VALUE", "Bearer t0ken")
            .build();
        let config = WebhookConfig::new(server.uri()).with_message("{}");
        announcer(&ctx, config).await.run(&ctx).await.unwrap();
    }

    #[tokio::test]
    async fn test_unexpected_status_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let ctx = TestContext::new().build();
        let config = WebhookConfig::new(server.uri()).with_message("{}");
        let err = announcer(&ctx, config).await.run(&ctx).await.unwrap_err();

        assert!(!err.is_skip());
        assert!(err.to_string().starts_with("request failed with status 500"));
    }

    #[tokio::test]
    async fn test_custom_expected_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(302))
            .mount(&server)
            .await;

        let ctx = TestContext::new().build();
        let config = WebhookConfig::new(server.uri())
            .with_message("{}")
            .with_expected_status_codes(vec![302]);
        announcer(&ctx, config).await.run(&ctx).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_endpoint_fails() {
        let ctx = TestContext::new().build();
        let config = WebhookConfig::new("").with_message("{}");
        let err = announcer(&ctx, config).await.run(&ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "no endpoint url");

        let outcome = StageOutcome::from_result("webhook", StagePhase::Run, Err(err));
        assert_eq!(outcome.reason().as_deref(), Some("webhook: no endpoint url"));
    }
}
