//! Narrative summaries of a provenance trace
//!
//! The text-generation service is an optional external collaborator. It sits
//! behind [`Summarizer`]; [`summarize_or_fallback`] guarantees the consumer
//! flow never fails or blocks on it.

use crate::{chain::TraceEntry, Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Consumer transparency card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Authenticity score, 1 to 10
    pub authenticity_score: u8,

    /// Free-text summary
    pub summary: String,

    /// Sustainability highlights
    #[serde(default)]
    pub sustainability_highs: Vec<String>,
}

impl Summary {
    /// Card shown when no summary service is configured
    pub fn simulated() -> Self {
        Self {
            authenticity_score: 8,
            summary: "Simulated Analysis: no narrative service configured. Configure \
                      one to see generated insights."
                .to_string(),
            sustainability_highs: vec![
                "Geo-tagged source".to_string(),
                "Lab Verified (Simulated)".to_string(),
            ],
        }
    }

    /// Card shown when the summary service fails
    pub fn fallback() -> Self {
        Self {
            authenticity_score: 8,
            summary: "AI analysis unavailable. Displaying cached estimation: Product \
                      appears authentic with verifiable lab trails."
                .to_string(),
            sustainability_highs: vec![
                "Geo-tagged source".to_string(),
                "Lab Verified".to_string(),
            ],
        }
    }
}

/// Narrative summary capability
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize a projected trace
    async fn summarize(&self, trace: &[TraceEntry]) -> Result<Summary>;
}

/// Summarizer that never leaves the process
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineSummarizer;

#[async_trait]
impl Summarizer for OfflineSummarizer {
    async fn summarize(&self, _trace: &[TraceEntry]) -> Result<Summary> {
        Ok(Summary::simulated())
    }
}

#[derive(Debug, Serialize)]
struct SummaryRequest<'a> {
    instructions: &'static str,
    trace: &'a [TraceEntry],
}

const INSTRUCTIONS: &str = "Analyze this Ayurvedic supply chain data. Identify the \
    authenticity of the product based on lab tests, any sustainability concerns \
    (location, wild-crafting vs cultivation), and a summary suitable for a consumer \
    transparency card. Respond with a JSON object with keys \"authenticityScore\" \
    (1-10), \"summary\" (string) and \"sustainabilityHighs\" (array of strings).";

/// Summarizer backed by an HTTP text-generation endpoint
///
/// POSTs the projected trace as JSON and expects the summary JSON back,
/// optionally wrapped in a markdown code fence.
#[derive(Debug, Clone)]
pub struct HttpSummarizer {
    endpoint: String,
    client: Client,
}

impl HttpSummarizer {
    /// Create a client for `endpoint`
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    /// Target endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Summarizer for HttpSummarizer {
    async fn summarize(&self, trace: &[TraceEntry]) -> Result<Summary> {
        let request = SummaryRequest {
            instructions: INSTRUCTIONS,
            trace,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Summary(format!("Summary request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Summary(format!(
                "Summary service returned {}: {}",
                status, error_text
            )));
        }

        let text = response.text().await?;
        parse_summary(&text)
    }
}

/// Parse service output, tolerating a markdown code fence around the JSON
pub fn parse_summary(raw: &str) -> Result<Summary> {
    let cleaned = raw.replace("```json", "").replace("```", "");
    let summary: Summary = serde_json::from_str(cleaned.trim())
        .map_err(|e| Error::Summary(format!("Unparseable summary: {}", e)))?;

    if !(1..=10).contains(&summary.authenticity_score) {
        return Err(Error::Summary(format!(
            "authenticity score {} outside 1-10",
            summary.authenticity_score
        )));
    }

    Ok(summary)
}

/// Summarize, substituting [`Summary::fallback`] on any failure
pub async fn summarize_or_fallback(summarizer: &dyn Summarizer, trace: &[TraceEntry]) -> Summary {
    match summarizer.summarize(trace).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::warn!("Narrative summary unavailable, using fallback: {}", e);
            Summary::fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenSummarizer;

    #[async_trait]
    impl Summarizer for BrokenSummarizer {
        async fn summarize(&self, _trace: &[TraceEntry]) -> Result<Summary> {
            Err(Error::Summary("service down".to_string()))
        }
    }

    struct GarbageSummarizer;

    #[async_trait]
    impl Summarizer for GarbageSummarizer {
        async fn summarize(&self, _trace: &[TraceEntry]) -> Result<Summary> {
            parse_summary("Sure! Here is your analysis: looks great.")
        }
    }

    #[test]
    fn test_parse_fenced_json() {
        let raw = "```json\n{\"authenticityScore\": 9, \"summary\": \"Authentic root.\", \
                   \"sustainabilityHighs\": [\"Cultivated\"]}\n```";
        let summary = parse_summary(raw).unwrap();
        assert_eq!(summary.authenticity_score, 9);
        assert_eq!(summary.summary, "Authentic root.");
        assert_eq!(summary.sustainability_highs, vec!["Cultivated".to_string()]);
    }

    #[test]
    fn test_parse_without_highlights() {
        let summary = parse_summary(r#"{"authenticityScore": 7, "summary": "ok"}"#).unwrap();
        assert!(summary.sustainability_highs.is_empty());
    }

    #[test]
    fn test_parse_rejects_prose() {
        assert!(matches!(
            parse_summary("not json at all"),
            Err(Error::Summary(_))
        ));
    }

    #[test]
    fn test_parse_rejects_out_of_range_score() {
        assert!(parse_summary(r#"{"authenticityScore": 0, "summary": "?"}"#).is_err());
        assert!(parse_summary(r#"{"authenticityScore": 11, "summary": "?"}"#).is_err());
    }

    #[tokio::test]
    async fn test_offline_summarizer() {
        let summary = summarize_or_fallback(&OfflineSummarizer, &[]).await;
        assert_eq!(summary, Summary::simulated());
    }

    #[tokio::test]
    async fn test_failure_degrades_to_fallback() {
        assert_eq!(
            summarize_or_fallback(&BrokenSummarizer, &[]).await,
            Summary::fallback()
        );
        assert_eq!(
            summarize_or_fallback(&GarbageSummarizer, &[]).await,
            Summary::fallback()
        );
    }

    #[tokio::test]
    async fn test_http_summarizer_parses_fenced_reply() {
        use wiremock::matchers::{body_partial_json, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/summarize"))
            .and(body_partial_json(serde_json::json!({ "trace": [] })))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "```json\n{\"authenticityScore\": 9, \"summary\": \"Lab verified root.\", \
                 \"sustainabilityHighs\": [\"Cultivated\"]}\n```",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let summarizer = HttpSummarizer::new(format!("{}/summarize", server.uri()), 5).unwrap();
        let summary = summarizer.summarize(&[]).await.unwrap();
        assert_eq!(summary.authenticity_score, 9);
        assert_eq!(summary.summary, "Lab verified root.");
        assert_eq!(summary.sustainability_highs, vec!["Cultivated".to_string()]);
    }

    #[tokio::test]
    async fn test_http_error_status_degrades_to_fallback() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let summarizer = HttpSummarizer::new(server.uri(), 5).unwrap();
        assert!(matches!(
            summarizer.summarize(&[]).await,
            Err(Error::Summary(_))
        ));
        assert_eq!(
            summarize_or_fallback(&summarizer, &[]).await,
            Summary::fallback()
        );
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_degrades_to_fallback() {
        let summarizer = HttpSummarizer::new("http://127.0.0.1:9/summarize", 1).unwrap();
        let summary = summarize_or_fallback(&summarizer, &[]).await;
        assert_eq!(summary, Summary::fallback());
    }
}
