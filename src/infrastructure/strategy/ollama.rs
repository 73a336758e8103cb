use crate::domain::entities::product::Product;
use crate::domain::error::DomainError;
use crate::domain::ports::strategy_advisor::{StrategyAdvisor, StrategyPlan};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Asks a local Ollama model for a promotion plan.
pub struct OllamaAdvisor {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaAdvisor {
    pub fn new(base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
            base_url: base_url.unwrap_or_else(|| "http://localhost:11434".to_string()),
            model: model.unwrap_or_else(|| "llama3".to_string()),
        }
    }

    fn prompt(product: &Product) -> String {
        format!(
            "You plan affiliate promotion. Product: {} (niche: {}). \
             Lifecycle status: {}. Estimated conversion: {:.2}%. Days tracked: {}. \
             Reply with three short, concrete next actions.",
            product.name,
            product.niche,
            product.status,
            product.score.mean_probability,
            product.days_active()
        )
    }
}

#[async_trait]
impl StrategyAdvisor for OllamaAdvisor {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn advise(&self, product: &Product) -> Result<StrategyPlan, DomainError> {
        let resp = self
            .client
            .post(format!("{}/api/generate", self.base_url.trim_end_matches('/')))
            .json(&GenerateRequest {
                model: self.model.clone(),
                prompt: Self::prompt(product),
                stream: false,
            })
            .send()
            .await
            .map_err(|e| DomainError::Strategy(format!("Ollama request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(DomainError::Strategy(format!("Ollama {status}: {body}")));
        }

        let result: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| DomainError::Parse(format!("Ollama response: {e}")))?;

        Ok(StrategyPlan {
            product_id: product.id.clone(),
            advisor: self.name().to_string(),
            recommendation: result.response.trim().to_string(),
            generated_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn product() -> Product {
        Product::discovered("42".into(), "Rust Async".into(), "programming".into(), None)
    }

    #[tokio::test]
    async fn test_advise_uses_model_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(serde_json::json!({ "model": "tiny", "stream": false })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "response": "  Post twice a week.\n" })),
            )
            .mount(&server)
            .await;

        let advisor = OllamaAdvisor::new(Some(server.uri()), Some("tiny".into()));
        let plan = advisor.advise(&product()).await.unwrap();
        assert_eq!(plan.recommendation, "Post twice a week.");
        assert_eq!(plan.advisor, "ollama");
        assert_eq!(plan.product_id, "42");
    }

    #[tokio::test]
    async fn test_advise_surfaces_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("model loading"))
            .mount(&server)
            .await;

        let advisor = OllamaAdvisor::new(Some(server.uri()), None);
        let err = advisor.advise(&product()).await.unwrap_err();
        assert!(err.to_string().contains("model loading"));
    }

    #[test]
    fn test_prompt_mentions_status_and_score() {
        let prompt = OllamaAdvisor::prompt(&product());
        assert!(prompt.contains("testing"));
        assert!(prompt.contains("50.00%"));
    }
}
