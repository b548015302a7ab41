pub mod filesystem;
pub mod mailbox;
pub mod memory;

use std::path::Path;

use crate::config::StoreConfig;
use filesystem::FilesystemStore;
use memory::MemoryStore;

pub use mailbox::{MailItem, Mailbox};

/// Enum representing all available mailbox backends
#[derive(Debug)]
pub enum MailStore {
    Filesystem(FilesystemStore),
    Memory(MemoryStore),
}

impl MailStore {
    /// Snapshot a user's mailbox. `None` when the user has no mailbox at all.
    pub async fn load_user_mail(&self, user: &str) -> anyhow::Result<Option<Mailbox>> {
        match self {
            MailStore::Filesystem(s) => s.load_user_mail(user).await,
            MailStore::Memory(s) => s.load_user_mail(user).await,
        }
    }

    /// Deliver a finished message file to every recipient.
    pub async fn save_user_mail(&self, message: &Path, recipients: &[String]) -> anyhow::Result<()> {
        match self {
            MailStore::Filesystem(s) => s.save_user_mail(message, recipients).await,
            MailStore::Memory(s) => s.save_user_mail(message, recipients).await,
        }
    }

    /// Get the name of this backend
    pub fn name(&self) -> &'static str {
        match self {
            MailStore::Filesystem(_) => "filesystem",
            MailStore::Memory(_) => "memory",
        }
    }
}

/// Factory function to create a store from configuration
pub fn create_store(config: &StoreConfig) -> anyhow::Result<MailStore> {
    match config.store_type.as_str() {
        "filesystem" | "directory" => {
            let path = config.path.clone().unwrap_or_else(|| "mail".to_string());
            Ok(MailStore::Filesystem(FilesystemStore::new(path)?))
        }
        "memory" => Ok(MailStore::Memory(MemoryStore::new())),
        _ => {
            anyhow::bail!("Unknown mail store: {}", config.store_type)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_configured_store() {
        let root = tempfile::TempDir::new().unwrap();
        let config = StoreConfig {
            store_type: "directory".to_string(),
            path: Some(root.path().join("mail").display().to_string()),
        };
        assert_eq!(create_store(&config).unwrap().name(), "filesystem");

        let config = StoreConfig {
            store_type: "memory".to_string(),
            path: None,
        };
        assert_eq!(create_store(&config).unwrap().name(), "memory");
    }

    #[test]
    fn unknown_store_type_is_an_error() {
        let config = StoreConfig {
            store_type: "s3".to_string(),
            path: None,
        };
        assert!(create_store(&config).is_err());
    }
}
