//! Wiring of the service components.

use std::sync::Arc;

use anyhow::Context as _;

use crate::accounts::{AccountManager, PasswordHashing, TokenIssuer};
use crate::budget::Ledger;
use crate::classifier::{Classifier, LlmClassifier};
use crate::config::Config;
use crate::expenses::ExpenseManager;
use crate::llm::{OpenAiClient, RetryConfig};
use crate::store::Store;

/// Every service, sharing one store. Cheap to clone.
#[derive(Clone)]
pub struct ServiceContext {
    pub accounts: AccountManager,
    pub expenses: ExpenseManager,
    pub ledger: Ledger,
}

impl ServiceContext {
    pub fn new(config: &Config, store: Store, classifier: Arc<dyn Classifier>) -> Self {
        let ledger = Ledger::new(store.clone(), config.budget_policy);
        let accounts = AccountManager::new(
            store.clone(),
            PasswordHashing::new(config.password_hash_rounds),
            TokenIssuer::new(&config.jwt_secret, config.token_ttl),
        );
        let expenses = ExpenseManager::new(store, ledger.clone(), classifier);
        Self {
            accounts,
            expenses,
            ledger,
        }
    }

    /// Open the database and build the production classifier.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store = Store::open(&config.database_path).with_context(|| {
            format!("Failed to open database at {}", config.database_path.display())
        })?;

        let settings = &config.classifier;
        // The HTTP timeout is a backstop; the per-attempt deadline is enforced by the classifier
        let llm = OpenAiClient::new(
            settings.api_key.clone(),
            settings.base_url.clone(),
            settings.timeout.saturating_mul(2),
        )?;
        let classifier = LlmClassifier::new(
            Arc::new(llm),
            settings.model.clone(),
            RetryConfig {
                timeout: settings.timeout,
                max_retries: settings.max_retries,
                initial_backoff: settings.backoff,
            },
        );

        tracing::info!(
            database = %config.database_path.display(),
            model = %settings.model,
            budget_policy = %config.budget_policy,
            "Service context initialized"
        );
        Ok(Self::new(config, store, Arc::new(classifier)))
    }
}
