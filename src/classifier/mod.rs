//! Classifier adapter - turns a free-text expense description into an
//! amount and a spending category.
//!
//! # Design
//! - `Classifier` is the seam the expense manager depends on, so tests can
//!   substitute a scripted implementation.
//! - `LlmClassifier` asks a chat model for a two-field JSON object. Each
//!   attempt runs under a deadline; transient failures are retried with
//!   backoff (once, by default). Output is all-or-nothing: anything that
//!   does not parse into a positive amount is a `ClassificationError`.

mod category;

pub use category::Category;

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::{ChatMessage, ChatOptions, LlmClient, LlmError, ResponseFormat, RetryConfig};

/// Instruction prompt sent with every description.
const SYSTEM_PROMPT: &str = r#"You are an expense categorization assistant.
Given an input string describing a transaction, do two things:

1. Extract the amount (a number).
2. Categorize the expense into exactly one of these categories:
   Food, Clothes, Transport, Entertainment, Bills, Health, Education, Travel, Gadgets,
   Friends, Miscellaneous.
   - If none of these categories fit, choose "Miscellaneous".

Return the result strictly in this JSON format:
{
  "amount": <number>,
  "category": "<category>"
}

Example:
Input: "200 paneer tikka"
Output: { "amount": 200, "category": "Food" }

Input: "2100 nomad jacket"
Output: { "amount": 2100, "category": "Clothes" }
"#;

/// Errors from the classifier. Never carries partial data.
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("description is empty")]
    EmptyDescription,

    #[error("classifier did not answer within {0:?}")]
    Timeout(std::time::Duration),

    #[error("classifier provider failed: {0}")]
    Provider(String),

    #[error("classifier returned an unusable response: {0}")]
    Malformed(String),
}

/// Structured result of a classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub amount: Decimal,
    pub category: Category,
    /// Label exactly as returned by the provider.
    pub raw_category: String,
}

/// Converts a description to a [`Classification`].
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn categorize(&self, description: &str) -> Result<Classification, ClassificationError>;
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    amount: Option<Decimal>,
    category: Option<String>,
}

/// Parse the model's JSON output.
pub fn parse_classification(content: &str) -> Result<Classification, ClassificationError> {
    let raw: RawClassification = serde_json::from_str(content.trim())
        .map_err(|e| ClassificationError::Malformed(format!("invalid JSON: {}", e)))?;

    let amount = raw
        .amount
        .ok_or_else(|| ClassificationError::Malformed("missing amount".to_string()))?;
    if amount <= Decimal::ZERO {
        return Err(ClassificationError::Malformed(format!(
            "amount must be positive, got {}",
            amount
        )));
    }

    let raw_category = raw
        .category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| Category::Miscellaneous.as_str().to_string());

    Ok(Classification {
        amount: amount.normalize(),
        category: Category::normalize(&raw_category),
        raw_category,
    })
}

/// Classifier backed by a chat-completion model.
pub struct LlmClassifier {
    llm: Arc<dyn LlmClient>,
    model: String,
    retry: RetryConfig,
}

impl LlmClassifier {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>, retry: RetryConfig) -> Self {
        Self {
            llm,
            model: model.into(),
            retry,
        }
    }

    /// One attempt, bounded by the configured deadline.
    async fn attempt(&self, description: &str) -> Result<String, AttemptError> {
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(description),
        ];
        let options = ChatOptions {
            temperature: Some(0.0),
            response_format: ResponseFormat::JsonObject,
        };

        let call = self
            .llm
            .chat_completion_with_options(&self.model, &messages, options);

        match tokio::time::timeout(self.retry.timeout, call).await {
            Err(_) => Err(AttemptError::Timeout),
            Ok(Err(e)) => {
                let transient = e
                    .downcast_ref::<LlmError>()
                    .map(LlmError::is_transient)
                    .unwrap_or(false);
                Err(AttemptError::Provider {
                    message: e.to_string(),
                    transient,
                })
            }
            Ok(Ok(response)) => {
                if let Some(usage) = &response.usage {
                    tracing::debug!(
                        prompt_tokens = usage.prompt_tokens,
                        completion_tokens = usage.completion_tokens,
                        total_tokens = usage.total_tokens,
                        "Classifier token usage"
                    );
                }
                response
                    .content
                    .filter(|c| !c.trim().is_empty())
                    .ok_or(AttemptError::Empty)
            }
        }
    }
}

enum AttemptError {
    Timeout,
    Provider { message: String, transient: bool },
    Empty,
}

impl AttemptError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::Provider { transient, .. } => *transient,
            Self::Empty => false,
        }
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    async fn categorize(&self, description: &str) -> Result<Classification, ClassificationError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(ClassificationError::EmptyDescription);
        }

        let mut retries = 0;
        let content = loop {
            match self.attempt(description).await {
                Ok(content) => break content,
                Err(err) if err.is_transient() && retries < self.retry.max_retries => {
                    retries += 1;
                    let delay = self.retry.backoff_for(retries);
                    tracing::warn!(
                        retry = retries,
                        delay_ms = delay.as_millis() as u64,
                        "Classifier attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(AttemptError::Timeout) => {
                    return Err(ClassificationError::Timeout(self.retry.timeout))
                }
                Err(AttemptError::Provider { message, .. }) => {
                    return Err(ClassificationError::Provider(message))
                }
                Err(AttemptError::Empty) => {
                    return Err(ClassificationError::Malformed(
                        "empty completion".to_string(),
                    ))
                }
            }
        };

        let classification = parse_classification(&content)?;
        tracing::debug!(
            amount = %classification.amount,
            category = %classification.category,
            raw_category = %classification.raw_category,
            "Classified expense"
        );
        Ok(classification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmErrorKind;
    use crate::testing::ScriptedLlm;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            timeout: Duration::from_millis(200),
            max_retries: 1,
            initial_backoff: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_parse_classification() {
        let c = parse_classification(r#"{ "amount": 200, "category": "Food" }"#).unwrap();
        assert_eq!(c.amount, dec!(200));
        assert_eq!(c.category, Category::Food);
        assert_eq!(c.raw_category, "Food");

        let c = parse_classification(r#"{"amount": 12.50, "category": "pets"}"#).unwrap();
        assert_eq!(c.amount, dec!(12.5));
        assert_eq!(c.category, Category::Miscellaneous);
        assert_eq!(c.raw_category, "pets");
    }

    #[test]
    fn test_parse_rejects_bad_output() {
        for content in [
            "not json",
            r#"{"category": "Food"}"#,
            r#"{"amount": 0, "category": "Food"}"#,
            r#"{"amount": -3, "category": "Food"}"#,
            r#"{"amount": "lots", "category": "Food"}"#,
        ] {
            let err = parse_classification(content).unwrap_err();
            assert!(
                matches!(err, ClassificationError::Malformed(_)),
                "{} -> {:?}",
                content,
                err
            );
        }
    }

    #[test]
    fn test_missing_category_is_miscellaneous() {
        let c = parse_classification(r#"{"amount": 40}"#).unwrap();
        assert_eq!(c.category, Category::Miscellaneous);
        assert_eq!(c.raw_category, "Miscellaneous");
    }

    #[tokio::test]
    async fn test_categorize_sends_prompt_and_description() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.push_content(r#"{"amount": 200, "category": "Food"}"#);
        let classifier = LlmClassifier::new(llm.clone(), "gpt-4o-mini", fast_retry());

        let c = classifier.categorize("  200 paneer tikka ").await.unwrap();
        assert_eq!(c.amount, dec!(200));
        assert_eq!(c.category, Category::Food);

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, "gpt-4o-mini");
        assert!(requests[0].1[0].content.contains("Miscellaneous"));
        assert_eq!(requests[0].1[1].content, "200 paneer tikka");
    }

    #[tokio::test]
    async fn test_empty_description_never_calls_provider() {
        let llm = Arc::new(ScriptedLlm::new());
        let classifier = LlmClassifier::new(llm.clone(), "m", fast_retry());

        let err = classifier.categorize("   ").await.unwrap_err();
        assert!(matches!(err, ClassificationError::EmptyDescription));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_transient_failure_retried_once() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.push_error(LlmError::from_status(503, "overloaded"));
        llm.push_content(r#"{"amount": 60, "category": "Transport"}"#);
        let classifier = LlmClassifier::new(llm.clone(), "m", fast_retry());

        let c = classifier.categorize("60 bus ticket").await.unwrap();
        assert_eq!(c.category, Category::Transport);
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_single_retry() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.push_error(LlmError::new(LlmErrorKind::Network, "reset"));
        llm.push_error(LlmError::new(LlmErrorKind::Network, "reset again"));
        llm.push_content(r#"{"amount": 60, "category": "Transport"}"#);
        let classifier = LlmClassifier::new(llm.clone(), "m", fast_retry());

        let err = classifier.categorize("60 bus ticket").await.unwrap_err();
        assert!(matches!(err, ClassificationError::Provider(_)));
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_auth_failure_not_retried() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.push_error(LlmError::from_status(401, "invalid api key"));
        let classifier = LlmClassifier::new(llm.clone(), "m", fast_retry());

        let err = classifier.categorize("60 bus ticket").await.unwrap_err();
        assert!(matches!(err, ClassificationError::Provider(_)));
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_output_not_retried() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.push_content("I think this is food");
        llm.push_content(r#"{"amount": 60, "category": "Food"}"#);
        let classifier = LlmClassifier::new(llm.clone(), "m", fast_retry());

        let err = classifier.categorize("60 samosa").await.unwrap_err();
        assert!(matches!(err, ClassificationError::Malformed(_)));
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_deadline_then_retry() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.push_delayed_content(
            Duration::from_secs(5),
            r#"{"amount": 1, "category": "Food"}"#,
        );
        llm.push_content(r#"{"amount": 900, "category": "Gadgets"}"#);
        let classifier = LlmClassifier::new(llm.clone(), "m", fast_retry());

        let c = classifier.categorize("900 earbuds").await.unwrap();
        assert_eq!(c.category, Category::Gadgets);
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_deadline_exhausted() {
        let llm = Arc::new(ScriptedLlm::new());
        for _ in 0..2 {
            llm.push_delayed_content(
                Duration::from_secs(5),
                r#"{"amount": 1, "category": "Food"}"#,
            );
        }
        let classifier = LlmClassifier::new(llm.clone(), "m", fast_retry());

        let err = classifier.categorize("slow").await.unwrap_err();
        assert!(matches!(err, ClassificationError::Timeout(_)));
    }
}
