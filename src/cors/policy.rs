//! Origin policy evaluation
//!
//! Decides the `Access-Control-Allow-*` headers for a request and whether the
//! request is a preflight that must be answered immediately. Evaluation never
//! fails; the least-secure outcome is the wildcard fallback.

use crate::config::{CorsConfig, RuntimeMode};
use crate::cors::patterns::OriginPatterns;
use crate::error::ConfigError;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use tracing::{debug, warn};

/// Value of `Access-Control-Allow-Methods`
pub const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";

/// Value of `Access-Control-Allow-Headers`
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization, X-Requested-With";

const WILDCARD: &str = "*";

/// Immutable origin rules, built once per process
#[derive(Debug)]
pub struct OriginRules {
    allow_all: bool,
    allowed: Vec<String>,
    preview: OriginPatterns,
}

impl OriginRules {
    /// Build rules from configuration
    ///
    /// The effective allow-list is the static list followed by the deployment
    /// origin, deduplicated with insertion order preserved.
    pub fn new(config: &CorsConfig, mode: RuntimeMode) -> Result<Self, ConfigError> {
        let mut allowed: Vec<String> = Vec::new();
        let mut push = |origin: String| {
            if !origin.is_empty() && !allowed.contains(&origin) {
                allowed.push(origin);
            }
        };

        for origin in &config.allowed_origins {
            push(origin.trim().trim_end_matches('/').to_string());
        }

        let deployment = config.deployment_url.as_deref().map(deployment_origin);
        if let Some(origin) = &deployment {
            push(origin.clone());
        }
        // Preview builds must always accept their own deployment origin.
        if mode == RuntimeMode::Preview
            && let Some(origin) = deployment
        {
            push(origin);
        }

        Ok(Self {
            allow_all: config.allow_all,
            allowed,
            preview: OriginPatterns::new(&config.preview_patterns)?,
        })
    }

    /// Rules that answer every origin with `*`
    pub fn allow_all() -> Self {
        Self {
            allow_all: true,
            allowed: Vec::new(),
            preview: OriginPatterns::empty(),
        }
    }

    /// The effective static allow-list
    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed
    }

    /// Evaluate a request's origin and method
    pub fn evaluate(&self, origin: Option<&str>, method: &Method) -> CorsDecision {
        let (allow_origin, source) = self.resolve_origin(origin);
        debug!(?origin, allow_origin = %allow_origin, source, "Resolved CORS origin");
        CorsDecision::new(allow_origin, *method == Method::OPTIONS)
    }

    fn resolve_origin(&self, origin: Option<&str>) -> (String, &'static str) {
        if self.allow_all {
            return (WILDCARD.to_string(), "allow_all");
        }

        if let Some(origin) = origin {
            if self.preview.matches(origin) {
                return (origin.to_string(), "preview_pattern");
            }
            if self.allowed.iter().any(|a| a == origin) {
                return (origin.to_string(), "allow_list");
            }
        }

        match self.allowed.first() {
            Some(first) => (first.clone(), "allow_list_fallback"),
            None => (WILDCARD.to_string(), "wildcard_fallback"),
        }
    }
}

/// Turn a deployment host (`app-abc.vercel.app`) into an origin
fn deployment_origin(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.is_empty() || url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// Outcome of origin evaluation, applied by the transport layer
#[derive(Debug, Clone)]
pub struct CorsDecision {
    /// Headers to add to the response
    pub headers: HeaderMap,
    /// Status to answer with when terminating
    pub status: Option<StatusCode>,
    /// Whether the request was a preflight and must not be processed further
    pub terminate: bool,
}

impl CorsDecision {
    fn new(allow_origin: String, preflight: bool) -> Self {
        let mut headers = HeaderMap::with_capacity(4);

        match HeaderValue::from_str(&allow_origin) {
            Ok(value) => {
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
            }
            Err(_) => {
                warn!(allow_origin = %allow_origin, "Configured origin is not a valid header value");
                headers.insert(
                    header::ACCESS_CONTROL_ALLOW_ORIGIN,
                    HeaderValue::from_static(WILDCARD),
                );
            }
        }
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );

        Self {
            headers,
            status: preflight.then_some(StatusCode::OK),
            terminate: preflight,
        }
    }

    /// The `Access-Control-Allow-Origin` value
    pub fn allow_origin(&self) -> Option<&str> {
        self.headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok())
    }

    /// Copy the CORS headers onto a response's header map
    pub fn apply(&self, headers: &mut HeaderMap) {
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_rules(allowed: &[&str], deployment: Option<&str>, mode: RuntimeMode) -> OriginRules {
        let config = CorsConfig {
            allowed_origins: allowed.iter().map(|s| s.to_string()).collect(),
            deployment_url: deployment.map(str::to_string),
            ..Default::default()
        };
        OriginRules::new(&config, mode).unwrap()
    }

    #[test]
    fn test_allow_all_returns_wildcard() {
        let config = CorsConfig {
            allow_all: true,
            allowed_origins: vec!["https://app.example.com".to_string()],
            ..Default::default()
        };
        let rules = OriginRules::new(&config, RuntimeMode::Production).unwrap();
        let decision = rules.evaluate(Some("https://evil.example"), &Method::POST);
        assert_eq!(decision.allow_origin(), Some("*"));
    }

    #[test]
    fn test_allowed_origin_is_echoed() {
        let rules = build_rules(
            &["https://a.example.com", "https://b.example.com"],
            None,
            RuntimeMode::Production,
        );
        let decision = rules.evaluate(Some("https://b.example.com"), &Method::POST);
        assert_eq!(decision.allow_origin(), Some("https://b.example.com"));
        assert!(!decision.terminate);
        assert!(decision.status.is_none());
    }

    #[test]
    fn test_unknown_origin_falls_back_to_first_entry() {
        let rules = build_rules(
            &["https://a.example.com", "https://b.example.com"],
            None,
            RuntimeMode::Production,
        );
        let decision = rules.evaluate(Some("https://evil.example"), &Method::POST);
        assert_eq!(decision.allow_origin(), Some("https://a.example.com"));

        let decision = rules.evaluate(None, &Method::GET);
        assert_eq!(decision.allow_origin(), Some("https://a.example.com"));
    }

    #[test]
    fn test_empty_list_falls_back_to_wildcard() {
        let rules = build_rules(&[], None, RuntimeMode::Production);
        let decision = rules.evaluate(Some("https://evil.example"), &Method::POST);
        assert_eq!(decision.allow_origin(), Some("*"));
    }

    #[test]
    fn test_preview_pattern_takes_priority() {
        let rules = build_rules(&["https://a.example.com"], None, RuntimeMode::Production);
        let decision = rules.evaluate(
            Some("https://unigraph-git-feature-x.vercel.app"),
            &Method::POST,
        );
        assert_eq!(
            decision.allow_origin(),
            Some("https://unigraph-git-feature-x.vercel.app")
        );
        assert_eq!(
            decision
                .headers
                .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
                .unwrap(),
            "true"
        );
    }

    #[test]
    fn test_deployment_origin_added_and_deduplicated() {
        let rules = build_rules(
            &["https://a.example.com", "https://unigraph.vercel.app"],
            Some("unigraph.vercel.app"),
            RuntimeMode::Preview,
        );
        assert_eq!(
            rules.allowed_origins(),
            &["https://a.example.com", "https://unigraph.vercel.app"]
        );

        let rules = build_rules(&[], Some("https://deploy-abc.vercel.app/"), RuntimeMode::Production);
        assert_eq!(rules.allowed_origins(), &["https://deploy-abc.vercel.app"]);
    }

    #[test]
    fn test_static_headers_always_set() {
        let rules = build_rules(&[], None, RuntimeMode::Production);
        let decision = rules.evaluate(None, &Method::GET);
        assert_eq!(
            decision
                .headers
                .get(header::ACCESS_CONTROL_ALLOW_METHODS)
                .unwrap(),
            ALLOW_METHODS
        );
        assert_eq!(
            decision
                .headers
                .get(header::ACCESS_CONTROL_ALLOW_HEADERS)
                .unwrap(),
            ALLOW_HEADERS
        );
        assert_eq!(
            decision
                .headers
                .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
                .unwrap(),
            "true"
        );
    }

    #[test]
    fn test_options_terminates_with_ok() {
        let rules = build_rules(&["https://a.example.com"], None, RuntimeMode::Production);
        let decision = rules.evaluate(Some("https://a.example.com"), &Method::OPTIONS);
        assert!(decision.terminate);
        assert_eq!(decision.status, Some(StatusCode::OK));

        let decision = rules.evaluate(
            Some("https://unigraph-git-feature-x.vercel.app"),
            &Method::OPTIONS,
        );
        assert!(decision.terminate);
    }

    #[test]
    fn test_apply_copies_headers() {
        let rules = OriginRules::allow_all();
        let decision = rules.evaluate(None, &Method::POST);
        let mut headers = HeaderMap::new();
        decision.apply(&mut headers);
        assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
        assert_eq!(headers.len(), 4);
    }
}
