//! One-time messages carried across the post-login redirect
//!
//! The login endpoint never renders a page; whatever went wrong is pushed
//! into the session and shown by the page the browser lands on.

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::error::Error;

pub(crate) const FLASH_SESSION_KEY: &str = "_flash_messages";

/// Flash message severity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Success,
    Info,
    Warning,
    Error,
}

/// A single flash message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlashMessage {
    /// The severity of the message.
    pub kind: FlashKind,
    /// The message content.
    pub message: String,
}

impl FlashMessage {
    #[must_use]
    pub fn new(kind: FlashKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(FlashKind::Success, message)
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(FlashKind::Info, message)
    }

    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(FlashKind::Warning, message)
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(FlashKind::Error, message)
    }
}

/// Flash messages extractor.
///
/// Extraction consumes the messages: they are removed from the session.
#[derive(Debug, Default)]
pub struct FlashMessages {
    messages: Vec<FlashMessage>,
}

impl FlashMessages {
    #[must_use]
    pub fn messages(&self) -> &[FlashMessage] {
        &self.messages
    }

    #[must_use]
    pub fn into_messages(self) -> Vec<FlashMessage> {
        self.messages
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Check if there are any error messages.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|m| m.kind == FlashKind::Error)
    }

    /// Append a flash message to the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be accessed.
    pub async fn push(session: &Session, message: FlashMessage) -> Result<(), Error> {
        let mut messages: Vec<FlashMessage> = session
            .get(FLASH_SESSION_KEY)
            .await
            .map_err(|e| Error::Session(format!("Failed to read flash messages: {e}")))?
            .unwrap_or_default();

        messages.push(message);

        session
            .insert(FLASH_SESSION_KEY, &messages)
            .await
            .map_err(|e| Error::Session(format!("Failed to write flash messages: {e}")))
    }

    /// Remove and return every pending message.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be accessed.
    pub async fn take(session: &Session) -> Result<Vec<FlashMessage>, Error> {
        let messages: Option<Vec<FlashMessage>> = session
            .remove(FLASH_SESSION_KEY)
            .await
            .map_err(|e| Error::Session(format!("Failed to read flash messages: {e}")))?;
        Ok(messages.unwrap_or_default())
    }
}

impl<S> FromRequestParts<S> for FlashMessages
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts.extensions.get::<Session>().cloned().ok_or_else(|| {
            Error::Session("Session not found in request extensions for flash messages".to_string())
        })?;

        let messages = Self::take(&session).await?;
        Ok(Self { messages })
    }
}
