//! Telegram bot.
//!
//! Every text message is read as an expense and stored through a
//! [`TransactionRepository`]. Edits rewrite the stored row and `/remove`, sent
//! as a reply, deletes it. The outcome is acknowledged with a reaction on the
//! message it refers to.

use std::sync::Arc;

use engine::{GridStore, TransactionRepository};
use teloxide::prelude::*;

pub use teloxide::types::UserId;

mod handlers;

pub struct ConfigParameters<S> {
    allowed_users: Option<Vec<UserId>>,
    repository: Arc<TransactionRepository<S>>,
}

// Not derived: that would require `S: Clone`.
impl<S> Clone for ConfigParameters<S> {
    fn clone(&self) -> Self {
        Self {
            allowed_users: self.allowed_users.clone(),
            repository: Arc::clone(&self.repository),
        }
    }
}

pub struct Bot<S> {
    token: String,
    allowed_users: Option<Vec<UserId>>,
    repository: Arc<TransactionRepository<S>>,
}

impl<S: GridStore + 'static> Bot<S> {
    pub fn new(
        token: &str,
        allowed_users: Option<Vec<UserId>>,
        repository: TransactionRepository<S>,
    ) -> Result<Self, String> {
        if token.trim().is_empty() {
            return Err("telegram token is empty".to_string());
        }

        Ok(Self {
            token: token.to_string(),
            allowed_users,
            repository: Arc::new(repository),
        })
    }

    pub fn builder() -> BotBuilder<S> {
        BotBuilder {
            token: String::new(),
            allowed_users: None,
            repository: None,
        }
    }

    pub async fn run(&self) {
        tracing::info!(sheet = self.repository.sheet(), "Starting telegram bot...");

        let bot = teloxide::Bot::new(&self.token);

        let parameters = ConfigParameters {
            allowed_users: self.allowed_users.clone(),
            repository: Arc::clone(&self.repository),
        };

        let handler = dptree::entry()
            .branch(Update::filter_message().endpoint(handlers::handle_message::<S>))
            .branch(
                Update::filter_edited_message().endpoint(handlers::handle_edited_message::<S>),
            );

        Dispatcher::builder(bot, handler)
            .dependencies(dptree::deps![parameters])
            .default_handler(|upd| async move {
                tracing::debug!("Unhandled update: {:?}", upd);
            })
            .error_handler(LoggingErrorHandler::with_custom_text(
                "An error has occurred in the dispatcher",
            ))
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }
}

pub struct BotBuilder<S> {
    token: String,
    allowed_users: Option<Vec<UserId>>,
    repository: Option<TransactionRepository<S>>,
}

impl<S: GridStore + 'static> BotBuilder<S> {
    pub fn token(mut self, token: &str) -> BotBuilder<S> {
        self.token = token.to_string();
        self
    }

    /// An empty list lets everybody in.
    pub fn allowed_users(mut self, allowed_users: Vec<UserId>) -> BotBuilder<S> {
        if !allowed_users.is_empty() {
            self.allowed_users = Some(allowed_users);
        }
        self
    }

    pub fn repository(mut self, repository: TransactionRepository<S>) -> BotBuilder<S> {
        self.repository = Some(repository);
        self
    }

    pub fn build(self) -> Result<Bot<S>, String> {
        tracing::info!("Initializing telegram bot...");
        let repository = self
            .repository
            .ok_or_else(|| "transaction repository is not set".to_string())?;
        Bot::new(&self.token, self.allowed_users, repository)
    }
}
