use std::sync::Arc;
use tokio::net::TcpListener;

use simple_mail_server::{pop3, server, smtp, Config, ServerContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // Load configuration from JSON file
    let config = Config::load()?;

    let context = Arc::new(ServerContext::from_config(&config)?);
    tracing::info!("Mail store: {}", context.store.name());

    let pop3_listener = TcpListener::bind((config.bind_address.as_str(), config.pop3_port)).await?;
    let smtp_listener = TcpListener::bind((config.bind_address.as_str(), config.smtp_port)).await?;

    tokio::try_join!(
        server::serve(pop3_listener, "POP3", Arc::clone(&context), pop3::handle_connection),
        server::serve(smtp_listener, "SMTP", Arc::clone(&context), smtp::handle_connection),
    )?;

    Ok(())
}
