//! Collaborator interfaces.
//!
//! The engine's only points of contact with the rest of the platform: the
//! email provider, the subscriber/tag store and the course-enrollment store.
//! Collaborator failures surface as ordinary step failures, never crashes.
//!
//! In-memory implementations are provided for tests and the demo binary.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::ActionError;

/// Outbound email delivery.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Dispatch a single email.
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), ActionError>;
}

/// Subscriber tag management.
#[async_trait]
pub trait SubscriberDirectory: Send + Sync {
    /// Append a tag to the subscriber's tag set.
    async fn add_tag(&self, email: &str, tag: &str) -> Result<(), ActionError>;

    /// Remove a tag from the subscriber's tag set; no-op if absent.
    async fn remove_tag(&self, email: &str, tag: &str) -> Result<(), ActionError>;
}

/// Course enrollment upserts.
#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    /// Idempotent upsert keyed by (course_id, email).
    ///
    /// Returns true when a new enrollment record was created, false when
    /// one already existed.
    async fn upsert_enrollment(
        &self,
        course_id: &str,
        email: &str,
        name: Option<&str>,
    ) -> Result<bool, ActionError>;
}

/// Shared handle to the full collaborator set.
#[derive(Clone)]
pub struct Collaborators {
    pub email: Arc<dyn EmailSender>,
    pub subscribers: Arc<dyn SubscriberDirectory>,
    pub enrollments: Arc<dyn EnrollmentStore>,
}

/// A sent email captured by the in-memory sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// In-memory email sender that records every dispatched message.
#[derive(Default)]
pub struct InMemoryEmailSender {
    sent: Mutex<Vec<SentEmail>>,
}

impl InMemoryEmailSender {
    /// Create a new in-memory sender.
    pub fn new() -> Self {
        Self::default()
    }

    /// All emails sent so far.
    pub async fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl EmailSender for InMemoryEmailSender {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), ActionError> {
        self.sent.lock().await.push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// In-memory subscriber directory.
#[derive(Default)]
pub struct InMemorySubscriberDirectory {
    tags: Mutex<HashMap<String, BTreeSet<String>>>,
}

impl InMemorySubscriberDirectory {
    /// Create a new in-memory directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags currently attached to a subscriber.
    pub async fn tags(&self, email: &str) -> Vec<String> {
        self.tags
            .lock()
            .await
            .get(email)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SubscriberDirectory for InMemorySubscriberDirectory {
    async fn add_tag(&self, email: &str, tag: &str) -> Result<(), ActionError> {
        self.tags
            .lock()
            .await
            .entry(email.to_string())
            .or_default()
            .insert(tag.to_string());
        Ok(())
    }

    async fn remove_tag(&self, email: &str, tag: &str) -> Result<(), ActionError> {
        if let Some(set) = self.tags.lock().await.get_mut(email) {
            set.remove(tag);
        }
        Ok(())
    }
}

/// In-memory enrollment store.
#[derive(Default)]
pub struct InMemoryEnrollmentStore {
    enrollments: Mutex<HashSet<(String, String)>>,
}

impl InMemoryEnrollmentStore {
    /// Create a new in-memory enrollment store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of enrollment records.
    pub async fn count(&self) -> usize {
        self.enrollments.lock().await.len()
    }

    /// Whether an enrollment exists for (course_id, email).
    pub async fn is_enrolled(&self, course_id: &str, email: &str) -> bool {
        self.enrollments
            .lock()
            .await
            .contains(&(course_id.to_string(), email.to_string()))
    }
}

#[async_trait]
impl EnrollmentStore for InMemoryEnrollmentStore {
    async fn upsert_enrollment(
        &self,
        course_id: &str,
        email: &str,
        _name: Option<&str>,
    ) -> Result<bool, ActionError> {
        let created = self
            .enrollments
            .lock()
            .await
            .insert((course_id.to_string(), email.to_string()));
        Ok(created)
    }
}

impl Collaborators {
    /// Build a full in-memory collaborator set.
    pub fn in_memory() -> (
        Self,
        Arc<InMemoryEmailSender>,
        Arc<InMemorySubscriberDirectory>,
        Arc<InMemoryEnrollmentStore>,
    ) {
        let email = Arc::new(InMemoryEmailSender::new());
        let subscribers = Arc::new(InMemorySubscriberDirectory::new());
        let enrollments = Arc::new(InMemoryEnrollmentStore::new());
        let collaborators = Self {
            email: email.clone(),
            subscribers: subscribers.clone(),
            enrollments: enrollments.clone(),
        };
        (collaborators, email, subscribers, enrollments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_email_sender_records_messages() {
        let sender = InMemoryEmailSender::new();
        sender
            .send_email("s@x.com", "Welcome", "Hello!")
            .await
            .unwrap();

        let sent = sender.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "s@x.com");
        assert_eq!(sent[0].subject, "Welcome");
    }

    #[tokio::test]
    async fn test_subscriber_tags_add_remove() {
        let directory = InMemorySubscriberDirectory::new();
        directory.add_tag("s@x.com", "new-enrollee").await.unwrap();
        directory.add_tag("s@x.com", "vip").await.unwrap();
        assert_eq!(directory.tags("s@x.com").await, vec!["new-enrollee", "vip"]);

        directory.remove_tag("s@x.com", "vip").await.unwrap();
        assert_eq!(directory.tags("s@x.com").await, vec!["new-enrollee"]);

        // Removing an absent tag is a no-op
        directory.remove_tag("s@x.com", "ghost").await.unwrap();
        directory.remove_tag("other@x.com", "ghost").await.unwrap();
    }

    #[tokio::test]
    async fn test_enrollment_upsert_is_idempotent() {
        let store = InMemoryEnrollmentStore::new();
        assert!(store.upsert_enrollment("c1", "s@x.com", None).await.unwrap());
        assert!(!store.upsert_enrollment("c1", "s@x.com", None).await.unwrap());
        assert_eq!(store.count().await, 1);
        assert!(store.is_enrolled("c1", "s@x.com").await);
    }
}
