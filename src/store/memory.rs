use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use super::mailbox::{MailItem, Mailbox};

/// Keeps every message in process memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    mailboxes: Mutex<HashMap<String, Vec<Arc<[u8]>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a message directly into a user's mailbox.
    pub fn deposit(&self, user: &str, message: &[u8]) {
        let mut mailboxes = self.mailboxes.lock().unwrap_or_else(PoisonError::into_inner);
        mailboxes
            .entry(user.to_string())
            .or_default()
            .push(Arc::from(message));
    }

    /// Copies of a user's stored messages, oldest first.
    pub fn messages(&self, user: &str) -> Vec<Vec<u8>> {
        let mailboxes = self.mailboxes.lock().unwrap_or_else(PoisonError::into_inner);
        mailboxes
            .get(user)
            .map(|messages| messages.iter().map(|message| message.to_vec()).collect())
            .unwrap_or_default()
    }

    pub async fn load_user_mail(&self, user: &str) -> anyhow::Result<Option<Mailbox>> {
        let mailboxes = self.mailboxes.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(mailboxes.get(user).map(|messages| {
            Mailbox::new(
                messages
                    .iter()
                    .map(|message| MailItem::from_bytes(Arc::clone(message)))
                    .collect(),
            )
        }))
    }

    pub async fn save_user_mail(&self, message: &Path, recipients: &[String]) -> anyhow::Result<()> {
        let contents = tokio::fs::read(message).await?;
        for recipient in recipients {
            self.deposit(recipient, &contents);
        }
        Ok(())
    }
}
