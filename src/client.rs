use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::Endpoints;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnalyzeRequest {
    pub code: String,
    pub intent: String,
}

pub trait AnalysisBackend: Send + Sync {
    fn analyze(&self, request: &AnalyzeRequest) -> Result<Value>;
}

pub trait ExplanationBackend: Send + Sync {
    fn explain(&self, node_info: &str) -> Result<Value>;
}

#[derive(Serialize)]
struct ExplainRequest<'a> {
    #[serde(rename = "nodeInfo")]
    node_info: &'a str,
    #[serde(rename = "nodeLabel")]
    node_label: &'a str,
}

pub struct HttpBackend {
    client: Client,
    endpoints: Endpoints,
}

impl HttpBackend {
    pub fn new(endpoints: Endpoints) -> Result<Self> {
        let client = Client::builder()
            .timeout(endpoints.timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, endpoints })
    }

    fn post_json(&self, url: &str, body: &impl Serialize) -> Result<Value> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .with_context(|| format!("failed to reach {url}"))?;

        let status = response.status();
        let text = response
            .text()
            .with_context(|| format!("failed to read response body from {url}"))?;
        debug!(url, %status, bytes = text.len(), "backend responded");

        if !status.is_success() {
            return Err(anyhow!("{url} returned {status}: {}", failure_detail(&text)));
        }

        serde_json::from_str(&text).with_context(|| format!("{url} returned invalid JSON"))
    }
}

impl AnalysisBackend for HttpBackend {
    fn analyze(&self, request: &AnalyzeRequest) -> Result<Value> {
        self.post_json(&self.endpoints.analyze_url, request)
            .context("analysis request failed")
    }
}

impl ExplanationBackend for HttpBackend {
    fn explain(&self, node_info: &str) -> Result<Value> {
        let body = ExplainRequest {
            node_info,
            node_label: node_info,
        };
        self.post_json(&self.endpoints.explain_url, &body)
            .with_context(|| format!("explanation request for {node_info:?} failed"))
    }
}

fn failure_detail(body: &str) -> String {
    const MAX_CHARS: usize = 200;

    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("error").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "empty response body".to_owned()
            } else {
                trimmed.chars().take(MAX_CHARS).collect()
            }
        })
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use anyhow::{Result, anyhow};
    use serde_json::{Value, json};

    use super::{AnalysisBackend, AnalyzeRequest, ExplanationBackend};

    #[derive(Default)]
    pub(crate) struct FakeExplainer {
        pub(crate) failing: Vec<String>,
        pub(crate) calls: Mutex<Vec<String>>,
    }

    impl FakeExplainer {
        pub(crate) fn failing_on(labels: &[&str]) -> Self {
            Self {
                failing: labels.iter().map(|label| (*label).to_owned()).collect(),
                calls: Mutex::default(),
            }
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ExplanationBackend for FakeExplainer {
        fn explain(&self, node_info: &str) -> Result<Value> {
            self.calls.lock().unwrap().push(node_info.to_owned());
            if self.failing.iter().any(|label| label == node_info) {
                return Err(anyhow!("503 Service Unavailable"));
            }
            Ok(json!({ "explanation": format!("{node_info} explained") }))
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeAnalyzer {
        pub(crate) script: Mutex<Vec<Result<Value, String>>>,
        pub(crate) requests: Mutex<Vec<AnalyzeRequest>>,
    }

    impl FakeAnalyzer {
        pub(crate) fn scripted(script: Vec<Result<Value, String>>) -> Self {
            Self {
                script: Mutex::new(script.into_iter().rev().collect()),
                requests: Mutex::default(),
            }
        }

        pub(crate) fn requests(&self) -> Vec<AnalyzeRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl AnalysisBackend for FakeAnalyzer {
        fn analyze(&self, request: &AnalyzeRequest) -> Result<Value> {
            self.requests.lock().unwrap().push(request.clone());
            match self.script.lock().unwrap().pop() {
                Some(Ok(payload)) => Ok(payload),
                Some(Err(message)) => Err(anyhow!(message)),
                None => Err(anyhow!("no scripted response left")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn explain_request_carries_both_field_names() {
        let body = serde_json::to_value(ExplainRequest {
            node_info: "Move Up",
            node_label: "Move Up",
        })
        .unwrap();

        assert_eq!(body, json!({ "nodeInfo": "Move Up", "nodeLabel": "Move Up" }));
    }

    #[test]
    fn analyze_request_shape() {
        let body = serde_json::to_value(AnalyzeRequest {
            code: "print(1)".to_owned(),
            intent: "print one".to_owned(),
        })
        .unwrap();

        assert_eq!(body, json!({ "code": "print(1)", "intent": "print one" }));
    }

    #[test]
    fn failure_detail_prefers_error_field() {
        assert_eq!(
            failure_detail(r#"{"error": "Missing nodeLabel in request body"}"#),
            "Missing nodeLabel in request body"
        );
        assert_eq!(failure_detail("  Internal Server Error \n"), "Internal Server Error");
        assert_eq!(failure_detail(""), "empty response body");
        assert_eq!(failure_detail(&"x".repeat(500)).len(), 200);
    }
}
