pub mod address;
pub mod config;
pub mod context;
pub mod directory;
pub mod line;
pub mod pop3;
pub mod server;
pub mod smtp;
pub mod store;

pub use config::{Config, StoreConfig};
pub use context::ServerContext;
pub use directory::UserDirectory;
pub use store::{create_store, MailStore};
