use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, BufReader};

#[derive(Debug, Clone)]
enum Contents {
    File(PathBuf),
    Memory(Arc<[u8]>),
}

/// One stored message as seen by a POP3 session.
#[derive(Debug, Clone)]
pub struct MailItem {
    size: u64,
    deleted: bool,
    contents: Contents,
}

impl MailItem {
    pub fn from_file(path: PathBuf, size: u64) -> Self {
        Self {
            size,
            deleted: false,
            contents: Contents::File(path),
        }
    }

    pub fn from_bytes(bytes: Arc<[u8]>) -> Self {
        Self {
            size: bytes.len() as u64,
            deleted: false,
            contents: Contents::Memory(bytes),
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Open the message body for line-by-line reading.
    pub async fn open(&self) -> std::io::Result<Box<dyn AsyncBufRead + Send + Unpin>> {
        match &self.contents {
            Contents::File(path) => {
                let file = tokio::fs::File::open(path).await?;
                Ok(Box::new(BufReader::new(file)))
            }
            Contents::Memory(bytes) => Ok(Box::new(Cursor::new(Arc::clone(bytes)))),
        }
    }
}

/// A user's messages, loaded once at login.
///
/// Deletion only flips a flag on this snapshot; nothing is written back to
/// the store.
#[derive(Debug, Clone, Default)]
pub struct Mailbox {
    items: Vec<MailItem>,
}

impl Mailbox {
    pub fn new(items: Vec<MailItem>) -> Self {
        Self { items }
    }

    pub fn count(&self, include_deleted: bool) -> usize {
        self.items
            .iter()
            .filter(|item| include_deleted || !item.is_deleted())
            .count()
    }

    /// Total octets of the messages not marked deleted.
    pub fn total_size(&self) -> u64 {
        self.live().map(|(_, item)| item.size).sum()
    }

    /// Look up a message by zero-based position. Deleted messages are hidden.
    pub fn get(&self, index: usize) -> Option<&MailItem> {
        self.items.get(index).filter(|item| !item.is_deleted())
    }

    /// Messages not marked deleted, paired with their 1-based number.
    pub fn live(&self) -> impl Iterator<Item = (usize, &MailItem)> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| !item.is_deleted())
            .map(|(index, item)| (index + 1, item))
    }

    /// Returns false only when no message exists at `index`.
    pub fn mark_deleted(&mut self, index: usize) -> bool {
        match self.items.get_mut(index) {
            Some(item) => {
                item.deleted = true;
                true
            }
            None => false,
        }
    }

    /// Clear every deletion flag, returning how many were set.
    pub fn reset_deleted(&mut self) -> usize {
        let mut restored = 0;
        for item in self.items.iter_mut().filter(|item| item.is_deleted()) {
            item.deleted = false;
            restored += 1;
        }
        restored
    }
}
