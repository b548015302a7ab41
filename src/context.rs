use std::path::PathBuf;

use crate::config::Config;
use crate::directory::UserDirectory;
use crate::line::MAX_LINE_LENGTH;
use crate::store::{create_store, MailStore};

/// Everything a session shares with the rest of the server.
#[derive(Debug)]
pub struct ServerContext {
    pub hostname: String,
    pub max_line_length: usize,
    pub scratch_dir: PathBuf,
    pub users: UserDirectory,
    pub store: MailStore,
}

impl ServerContext {
    pub fn new(hostname: impl Into<String>, users: UserDirectory, store: MailStore) -> Self {
        Self {
            hostname: hostname.into(),
            max_line_length: MAX_LINE_LENGTH,
            scratch_dir: std::env::temp_dir(),
            users,
            store,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let users = UserDirectory::load(&config.users_file)?;
        let store = create_store(&config.store)?;
        let scratch_dir = config
            .scratch_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);
        std::fs::create_dir_all(&scratch_dir)?;

        Ok(Self {
            hostname: config.hostname.clone(),
            max_line_length: config.max_line_length,
            scratch_dir,
            users,
            store,
        })
    }

    pub fn with_scratch_dir(mut self, scratch_dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = scratch_dir.into();
        self
    }
}
