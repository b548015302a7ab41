mod common;

use common::{context, Client};
use simple_mail_server::store::memory::MemoryStore;
use simple_mail_server::{pop3, smtp, MailStore, ServerContext};
use std::sync::Arc;
use tempfile::TempDir;

fn memory(context: &ServerContext) -> &MemoryStore {
    match &context.store {
        MailStore::Memory(store) => store,
        other => panic!("expected memory store, got {}", other.name()),
    }
}

async fn connect(context: Arc<ServerContext>) -> Client {
    let mut client = Client::connect(context, smtp::serve_session);
    assert_eq!(
        client.read_line().await,
        "220 mail.example.com Simple Mail Transfer Service Ready"
    );
    client
}

#[tokio::test]
async fn submit_message() {
    let scratch = TempDir::new().unwrap();
    let context = context(MemoryStore::new(), scratch.path());
    let mut client = connect(context.clone()).await;

    assert_eq!(
        client.command("HELO client.example").await,
        "250 mail.example.com greets client.example"
    );
    assert_eq!(client.command("MAIL FROM:<a@x.com>").await, "250 OK");
    assert_eq!(
        client.command("RCPT TO:<unknown@x.com>").await,
        "551 Recipient is not a registered user in this server"
    );
    assert_eq!(client.command("RCPT TO:<bob@x.com>").await, "250 OK");
    assert_eq!(
        client.command("DATA").await,
        "354 Ready to accept mail. End with '.' to end the message"
    );
    client.send("Subject: hi").await;
    client.send("").await;
    client.send("..dotted").await;
    client.send("Hello").await;
    assert_eq!(client.command(".").await, "250 Mail accepted for delivery");

    assert_eq!(
        memory(&context).messages("bob@x.com"),
        vec![b"Subject: hi\r\n\r\n.dotted\r\nHello\r\n".to_vec()]
    );

    // The envelope is closed, the greeting is not.
    assert_eq!(
        client.command("DATA").await,
        "503 No recipient(s) set. Must call RCPT first"
    );
    assert_eq!(client.command("MAIL FROM:<b@x.com>").await, "250 OK");

    assert_eq!(
        client.command("QUIT").await,
        "221 mail.example.com Service closing transmission channel"
    );
    assert!(client.at_eof().await);
    client.server.await.unwrap().unwrap();
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn fan_out_to_every_recipient() {
    let scratch = TempDir::new().unwrap();
    let context = context(MemoryStore::new(), scratch.path());
    let mut client = connect(context.clone()).await;

    client.command("EHLO client.example").await;
    client.command("MAIL FROM:<a@x.com>").await;
    client.command("RCPT TO:<bob@x.com>").await;
    client.command("RCPT TO:<carol@x.com>").await;
    client.command("DATA").await;
    client.send("Hello").await;
    assert_eq!(client.command(".").await, "250 Mail accepted for delivery");

    assert_eq!(memory(&context).messages("bob@x.com"), vec![b"Hello\r\n".to_vec()]);
    assert_eq!(memory(&context).messages("carol@x.com"), vec![b"Hello\r\n".to_vec()]);
}

#[tokio::test]
async fn interrupted_transfer_drops_connection() {
    let scratch = TempDir::new().unwrap();
    let context = context(MemoryStore::new(), scratch.path());
    let mut client = connect(context.clone()).await;

    client.command("HELO client.example").await;
    client.command("MAIL FROM:<a@x.com>").await;
    client.command("RCPT TO:<bob@x.com>").await;
    client.command("DATA").await;
    client.send("half a message").await;

    client.disconnect().await.unwrap().unwrap();
    assert!(memory(&context).messages("bob@x.com").is_empty());
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn sequencing_errors() {
    let scratch = TempDir::new().unwrap();
    let mut client = connect(context(MemoryStore::new(), scratch.path())).await;

    client.send_raw(b"\r\n").await;
    assert_eq!(
        client.command("RCPT TO:<bob@x.com>").await,
        "503 No sender is set. Must call MAIL first"
    );
    assert_eq!(
        client.command("MAIL FROM:<a@x.com>").await,
        "503 HELO/EHLO command was not called. Must call HELO/EHLO first"
    );
    client.command("HELO c").await;
    client.command("MAIL FROM:<a@x.com>").await;
    assert_eq!(
        client.command("MAIL FROM:<a@x.com>").await,
        "503 Sender already exists! Must reset (RSET) to change it"
    );
    assert_eq!(client.command("RSET").await, "250 OK");
    assert_eq!(client.command("MAIL FROM:<a@x.com>").await, "250 OK");
    assert_eq!(client.command("VRFY carol@x.com").await, "250 User found");
    assert_eq!(client.command("NOOP").await, "250 OK");
    assert_eq!(
        client.command("HELP").await,
        "502 \"HELP\" is unsupported in this SMTP server"
    );
    assert_eq!(
        client.command("BDAT 10").await,
        "500 \"BDAT\" is not a valid command"
    );
}

#[tokio::test]
async fn submitted_mail_is_retrievable_over_pop3() {
    let scratch = TempDir::new().unwrap();
    let context = context(MemoryStore::new(), scratch.path());

    let mut submission = connect(context.clone()).await;
    submission.command("HELO client.example").await;
    submission.command("MAIL FROM:<a@x.com>").await;
    submission.command("RCPT TO:<bob@x.com>").await;
    submission.command("DATA").await;
    submission.send("Subject: relay").await;
    submission.send("").await;
    submission.send("..ends with a dot").await;
    submission.command(".").await;
    submission.command("QUIT").await;

    let mut pop = Client::connect(context, pop3::serve_session);
    pop.read_line().await;
    pop.command("USER bob@x.com").await;
    assert_eq!(pop.command("PASS builder").await, "+OK User authenticated.");
    assert_eq!(pop.command("STAT").await, "+OK 1 36");
    assert_eq!(pop.command("RETR 1").await, "+OK 36 octets");
    assert_eq!(
        pop.read_multiline().await,
        vec!["Subject: relay", "", "..ends with a dot"]
    );
}

#[tokio::test]
async fn long_data_lines_keep_their_dots() {
    let scratch = TempDir::new().unwrap();
    let context = context(MemoryStore::new(), scratch.path());
    let mut client = connect(context.clone()).await;

    client.command("HELO client.example").await;
    client.command("MAIL FROM:<a@x.com>").await;
    client.command("RCPT TO:<bob@x.com>").await;
    client.command("DATA").await;

    let padding = "a".repeat(1024);
    client.send(&format!("{}.", padding)).await;
    client.send(&format!("{}.com", padding)).await;
    assert_eq!(client.command(".").await, "250 Mail accepted for delivery");

    let expected = format!("{padding}.\r\n{padding}.com\r\n");
    assert_eq!(
        memory(&context).messages("bob@x.com"),
        vec![expected.into_bytes()]
    );
}

#[tokio::test]
async fn overlong_command_is_rejected_whole() {
    let scratch = TempDir::new().unwrap();
    let mut client = connect(context(MemoryStore::new(), scratch.path())).await;

    let line = format!("{}QUIT", "X".repeat(1024));
    assert_eq!(client.command(&line).await, "500 Line too long");
    assert_eq!(client.command("NOOP").await, "250 OK");
}
