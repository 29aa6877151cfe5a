use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::ids::{MotivationalTextId, NotificationId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MaterialError {
    #[error("motivational text needs a title and content")]
    EmptyText,

    #[error("notification message cannot be empty")]
    EmptyMessage,
}

/// Supporting passage that several exam questions may refer to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MotivationalText {
    id: MotivationalTextId,
    title: String,
    content: String,
    source: String,
}

impl MotivationalText {
    /// # Errors
    ///
    /// Returns `MaterialError::EmptyText` when title or content is blank.
    pub fn new(
        id: MotivationalTextId,
        title: impl Into<String>,
        content: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<Self, MaterialError> {
        let title = title.into().trim().to_string();
        let content = content.into();
        if title.is_empty() || content.trim().is_empty() {
            return Err(MaterialError::EmptyText);
        }
        Ok(Self {
            id,
            title,
            content,
            source: source.into(),
        })
    }

    #[must_use]
    pub fn id(&self) -> MotivationalTextId {
        self.id
    }

    #[must_use]
    pub fn with_id(mut self, id: MotivationalTextId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    id: NotificationId,
    message: String,
    read: bool,
    created_at: DateTime<Utc>,
}

impl Notification {
    /// # Errors
    ///
    /// Returns `MaterialError::EmptyMessage` for a blank message.
    pub fn new(
        id: NotificationId,
        message: impl Into<String>,
        read: bool,
        created_at: DateTime<Utc>,
    ) -> Result<Self, MaterialError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(MaterialError::EmptyMessage);
        }
        Ok(Self {
            id,
            message,
            read,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> NotificationId {
        self.id
    }

    #[must_use]
    pub fn with_id(mut self, id: NotificationId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn is_read(&self) -> bool {
        self.read
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn mark_read(&mut self) {
        self.read = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn motivational_text_requires_content() {
        let err = MotivationalText::new(MotivationalTextId::new(1), "Title", " ", "exam.pdf")
            .unwrap_err();
        assert_eq!(err, MaterialError::EmptyText);
    }

    #[test]
    fn notification_marks_read() {
        let mut n = Notification::new(NotificationId::new(1), "hello", false, fixed_now()).unwrap();
        n.mark_read();
        assert!(n.is_read());
    }
}
