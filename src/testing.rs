//! Test doubles and fixtures shared by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::accounts::{AccountManager, PasswordHashing, TokenIssuer};
use crate::classifier::{Category, Classification, ClassificationError, Classifier};
use crate::config::Config;
use crate::context::ServiceContext;
use crate::llm::{ChatMessage, ChatResponse, LlmClient, LlmError};
use crate::models::{Expense, User};
use crate::store::Store;

enum Scripted {
    Content(String),
    Error(LlmError),
    Delayed(Duration, String),
}

/// `LlmClient` that replays queued responses in order.
#[derive(Default)]
pub struct ScriptedLlm {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<(String, Vec<ChatMessage>)>>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_content(&self, content: &str) {
        self.push(Scripted::Content(content.to_string()));
    }

    pub fn push_error(&self, error: LlmError) {
        self.push(Scripted::Error(error));
    }

    /// Answer with `content` only after `delay`.
    pub fn push_delayed_content(&self, delay: Duration, content: &str) {
        self.push(Scripted::Delayed(delay, content.to_string()));
    }

    fn push(&self, item: Scripted) {
        self.script.lock().unwrap().push_back(item);
    }

    pub fn requests(&self) -> Vec<(String, Vec<ChatMessage>)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn response(content: String) -> ChatResponse {
    ChatResponse {
        content: Some(content),
        usage: None,
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> anyhow::Result<ChatResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((model.to_string(), messages.to_vec()));

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Content(content)) => Ok(response(content)),
            Some(Scripted::Error(e)) => Err(e.into()),
            Some(Scripted::Delayed(delay, content)) => {
                tokio::time::sleep(delay).await;
                Ok(response(content))
            }
            None => anyhow::bail!("no scripted response left"),
        }
    }
}

/// `Classifier` that replays queued results in order.
#[derive(Default)]
pub struct ScriptedClassifier {
    script: Mutex<VecDeque<Result<Classification, ClassificationError>>>,
    descriptions: Mutex<Vec<String>>,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, amount: Decimal, label: &str) {
        self.script.lock().unwrap().push_back(Ok(Classification {
            amount,
            category: Category::normalize(label),
            raw_category: label.to_string(),
        }));
    }

    pub fn push_err(&self) {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(ClassificationError::Provider("scripted failure".to_string())));
    }

    pub fn descriptions(&self) -> Vec<String> {
        self.descriptions.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.descriptions.lock().unwrap().len()
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn categorize(&self, description: &str) -> Result<Classification, ClassificationError> {
        self.descriptions
            .lock()
            .unwrap()
            .push(description.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClassificationError::Provider("script exhausted".to_string())))
    }
}

pub fn sample_user(name: &str, monthly_budget: Decimal) -> User {
    User {
        id: Uuid::new_v4(),
        name: name.to_string(),
        monthly_budget,
        password_hash: "not-a-hash".to_string(),
        created_at: Utc::now(),
    }
}

pub fn sample_expense(
    user_id: Uuid,
    description: &str,
    amount: Decimal,
    category: Category,
) -> Expense {
    Expense {
        id: Uuid::new_v4(),
        user_id,
        description: description.to_string(),
        amount,
        category,
        raw_category: category.as_str().to_string(),
        created_at: Utc::now(),
    }
}

pub fn test_accounts() -> (AccountManager, Store) {
    let store = Store::open_in_memory().unwrap();
    let accounts = AccountManager::new(
        store.clone(),
        PasswordHashing::new(1_000),
        TokenIssuer::new("test-secret", Duration::from_secs(3600)),
    );
    (accounts, store)
}

pub fn test_config() -> Config {
    Config::from_lookup(|name| match name {
        "JWT_SECRET" => Some("test-secret".to_string()),
        "OPENAI_API_KEY" => Some("sk-test".to_string()),
        "PASSWORD_HASH_ROUNDS" => Some("1000".to_string()),
        _ => None,
    })
    .unwrap()
}

/// Full service graph over an in-memory store and a scripted classifier.
pub fn test_context() -> (Arc<ServiceContext>, Arc<ScriptedClassifier>) {
    let classifier = Arc::new(ScriptedClassifier::new());
    let ctx = ServiceContext::new(
        &test_config(),
        Store::open_in_memory().unwrap(),
        classifier.clone(),
    );
    (Arc::new(ctx), classifier)
}
