use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use super::mailbox::{MailItem, Mailbox};

/// Per-process counter so two deliveries in the same nanosecond get distinct names.
static DELIVERY_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Stores each user's mail as one file per message under `<root>/<user>/`.
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    root: PathBuf,
}

impl FilesystemStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> anyhow::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn user_dir(&self, user: &str) -> Option<PathBuf> {
        is_safe_name(user).then(|| self.root.join(user))
    }

    pub async fn load_user_mail(&self, user: &str) -> anyhow::Result<Option<Mailbox>> {
        let Some(dir) = self.user_dir(user) else {
            tracing::warn!("Refusing to open mailbox for unsafe user name {:?}", user);
            return Ok(None);
        };
        if !tokio::fs::try_exists(&dir).await? {
            return Ok(None);
        }

        let mut entries = tokio::fs::read_dir(&dir).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if metadata.is_file() {
                files.push((entry.path(), metadata.len()));
            }
        }
        files.sort_by(|(a, _), (b, _)| a.cmp(b));

        let items = files
            .into_iter()
            .map(|(path, size)| MailItem::from_file(path, size))
            .collect();
        Ok(Some(Mailbox::new(items)))
    }

    pub async fn save_user_mail(&self, message: &Path, recipients: &[String]) -> anyhow::Result<()> {
        let name = next_message_name()?;

        for recipient in recipients {
            let dir = self
                .user_dir(recipient)
                .ok_or_else(|| anyhow::anyhow!("Unsafe recipient name: {:?}", recipient))?;
            tokio::fs::create_dir_all(&dir).await?;
            tokio::fs::copy(message, dir.join(&name)).await?;
            tracing::debug!("Stored message {} for {}", name, recipient);
        }

        Ok(())
    }
}

/// File names sort in delivery order.
fn next_message_name() -> anyhow::Result<String> {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
    let sequence = DELIVERY_COUNTER.fetch_add(1, Ordering::Relaxed);
    Ok(format!("{:024}-{:08}.mail", nanos, sequence))
}

/// Rejects names that could escape the store root or hide files.
fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && !name.contains(|c: char| c < ' ' || c == '\x7F')
}
