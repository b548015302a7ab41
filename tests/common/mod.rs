//! In-process client for driving a session over `tokio::io::duplex`.

#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;

use simple_mail_server::store::memory::MemoryStore;
use simple_mail_server::{MailStore, ServerContext, UserDirectory};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;

pub const HOSTNAME: &str = "mail.example.com";

/// A memory-backed context with alice, bob and carol registered.
pub fn context(store: MemoryStore, scratch_dir: &std::path::Path) -> Arc<ServerContext> {
    let users = UserDirectory::from_pairs([
        ("alice", "correct"),
        ("bob@x.com", "builder"),
        ("carol@x.com", "secret"),
    ]);
    Arc::new(ServerContext::new(HOSTNAME, users, MailStore::Memory(store)).with_scratch_dir(scratch_dir))
}

pub struct Client {
    stream: BufReader<DuplexStream>,
    pub server: JoinHandle<anyhow::Result<()>>,
}

impl Client {
    /// Start `serve` on one end of an in-memory pipe and return the other end.
    pub fn connect<S, F>(context: Arc<ServerContext>, serve: S) -> Self
    where
        S: FnOnce(DuplexStream, Arc<ServerContext>) -> F,
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let server = tokio::spawn(serve(server, context));
        Self {
            stream: BufReader::new(client),
            server,
        }
    }

    pub async fn send(&mut self, line: &str) {
        let stream = self.stream.get_mut();
        stream.write_all(line.as_bytes()).await.unwrap();
        stream.write_all(b"\r\n").await.unwrap();
        stream.flush().await.unwrap();
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        let stream = self.stream.get_mut();
        stream.write_all(bytes).await.unwrap();
        stream.flush().await.unwrap();
    }

    /// Read one reply line, CRLF stripped.
    pub async fn read_line(&mut self) -> String {
        let mut line = String::new();
        self.stream.read_line(&mut line).await.unwrap();
        assert!(line.ends_with("\r\n"), "unterminated line: {:?}", line);
        line.truncate(line.len() - 2);
        line
    }

    /// Read lines up to and including the lone `.`, which is not returned.
    pub async fn read_multiline(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line().await;
            if line == "." {
                return lines;
            }
            lines.push(line);
        }
    }

    pub async fn command(&mut self, line: &str) -> String {
        self.send(line).await;
        self.read_line().await
    }

    /// Drop the client side and hand back the server task.
    pub fn disconnect(self) -> JoinHandle<anyhow::Result<()>> {
        self.server
    }

    /// True once the server has closed its side.
    pub async fn at_eof(&mut self) -> bool {
        let mut rest = String::new();
        self.stream.read_line(&mut rest).await.unwrap() == 0
    }
}
