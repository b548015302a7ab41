use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;

use super::codes::*;
use crate::address::{extract_address, has_prefix};
use crate::context::ServerContext;
use crate::line::Tokens;

const FROM_PREFIX: &str = "FROM:";
const TO_PREFIX: &str = "TO:";

const OK_MESSAGE: &str = "OK";
const INVALID_ARGS: &str = "Invalid arguments:";
const HELO_INVALID_ARGS: &str = "expected a single argument with a domain identifier";
const VRFY_INVALID_ARGS: &str = "expected a username with a domain name only <user@domain.com>";
const MAIL_INVALID_ARGS: &str =
    "expected a 'FROM:' and the sender's email address <FROM:<sender@domain.com>>";
const MAIL_SENDER_EXISTS: &str = "Sender already exists! Must reset (RSET) to change it";
const MAIL_NO_HELO: &str = "HELO/EHLO command was not called. Must call HELO/EHLO first";
const RCPT_INVALID_ARGS: &str =
    "expected a 'TO:' and the recipient's email address <TO:<recipient@domain.com>>";
const RCPT_USER_NOT_FOUND: &str = "Recipient is not a registered user in this server";
const RCPT_NO_SENDER: &str = "No sender is set. Must call MAIL first";
const DATA_NO_RCPT: &str = "No recipient(s) set. Must call RCPT first";
const DATA_READY: &str = "Ready to accept mail. End with '.' to end the message";
const DATA_SUCCESS: &str = "Mail accepted for delivery";
const DATA_FAILURE: &str = "Message denied";
const USER_EXISTS: &str = "User found";
const USER_NOT_FOUND: &str = "User not found";

/// What the connection loop should do after one command.
#[derive(Debug, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    /// Send the 354 line, then capture the message body.
    StartData(String),
    /// Send the line and end the connection.
    Close(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Helo,
    Noop,
    Quit,
    Vrfy,
    Mail,
    Rcpt,
    Data,
    Rset,
    Unsupported,
    Invalid,
}

impl Command {
    fn parse(verb: &str) -> Self {
        match verb.to_ascii_uppercase().as_str() {
            "HELO" | "EHLO" => Command::Helo,
            "NOOP" => Command::Noop,
            "QUIT" => Command::Quit,
            "VRFY" => Command::Vrfy,
            "MAIL" => Command::Mail,
            "RCPT" => Command::Rcpt,
            "DATA" => Command::Data,
            "RSET" => Command::Rset,
            "EXPN" | "HELP" => Command::Unsupported,
            _ => Command::Invalid,
        }
    }
}

pub fn reply(code: u16, message: impl Display) -> String {
    format!("{} {}\r\n", code, message)
}

fn text(code: u16, message: impl Display) -> Reply {
    Reply::Text(reply(code, message))
}

fn invalid_args(detail: &str) -> Reply {
    text(PARAMETER_SYNTAX_ERROR, format!("{} {}", INVALID_ARGS, detail))
}

/// Envelope and greeting state of one SMTP connection.
pub struct SmtpSession {
    context: Arc<ServerContext>,
    greeted: bool,
    sender: Option<String>,
    recipients: Vec<String>,
}

impl SmtpSession {
    pub fn new(context: Arc<ServerContext>) -> Self {
        Self {
            context,
            greeted: false,
            sender: None,
            recipients: Vec::new(),
        }
    }

    /// The line sent as soon as a client connects.
    pub fn greeting(&self) -> String {
        reply(
            SERVICE_READY,
            format!("{} Simple Mail Transfer Service Ready", self.context.hostname),
        )
    }

    pub fn is_greeted(&self) -> bool {
        self.greeted
    }

    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    /// Drop the envelope; the greeting survives.
    fn reset(&mut self) {
        self.sender = None;
        self.recipients.clear();
    }

    pub fn handle_command(&mut self, tokens: &Tokens<'_>) -> Reply {
        match Command::parse(tokens.verb()) {
            Command::Helo => self.helo(tokens),
            Command::Noop => text(OK, OK_MESSAGE),
            Command::Quit => Reply::Close(reply(
                SERVICE_CLOSING,
                format!("{} Service closing transmission channel", self.context.hostname),
            )),
            Command::Vrfy => self.vrfy(tokens),
            Command::Mail => self.mail(tokens),
            Command::Rcpt => self.rcpt(tokens),
            Command::Data => self.data(),
            Command::Rset => {
                self.reset();
                text(OK, OK_MESSAGE)
            }
            Command::Unsupported => text(
                COMMAND_NOT_IMPLEMENTED,
                format!("\"{}\" is unsupported in this SMTP server", tokens.verb()),
            ),
            Command::Invalid => text(
                COMMAND_SYNTAX_ERROR,
                format!("\"{}\" is not a valid command", tokens.verb()),
            ),
        }
    }

    fn helo(&mut self, tokens: &Tokens<'_>) -> Reply {
        let Some(domain) = tokens.single_argument() else {
            return invalid_args(HELO_INVALID_ARGS);
        };

        self.greeted = true;
        text(OK, format!("{} greets {}", self.context.hostname, domain))
    }

    fn vrfy(&self, tokens: &Tokens<'_>) -> Reply {
        let Some(name) = tokens.single_argument() else {
            return invalid_args(VRFY_INVALID_ARGS);
        };

        if self.context.users.is_valid_user(name, None) {
            text(OK, USER_EXISTS)
        } else {
            text(ACTION_NOT_TAKEN, USER_NOT_FOUND)
        }
    }

    fn mail(&mut self, tokens: &Tokens<'_>) -> Reply {
        if !self.greeted {
            return text(BAD_SEQUENCE_OF_COMMANDS, MAIL_NO_HELO);
        }
        if self.sender.is_some() {
            return text(BAD_SEQUENCE_OF_COMMANDS, MAIL_SENDER_EXISTS);
        }
        let Some(address) = tokens
            .single_argument()
            .filter(|arg| has_prefix(arg, FROM_PREFIX))
            .and_then(extract_address)
        else {
            return invalid_args(MAIL_INVALID_ARGS);
        };

        tracing::debug!("Envelope sender: {}", address);
        self.sender = Some(address.to_string());
        text(OK, OK_MESSAGE)
    }

    fn rcpt(&mut self, tokens: &Tokens<'_>) -> Reply {
        if self.sender.is_none() {
            return text(BAD_SEQUENCE_OF_COMMANDS, RCPT_NO_SENDER);
        }
        let Some(address) = tokens
            .single_argument()
            .filter(|arg| has_prefix(arg, TO_PREFIX))
            .and_then(extract_address)
        else {
            return invalid_args(RCPT_INVALID_ARGS);
        };
        if !self.context.users.is_valid_user(address, None) {
            tracing::debug!("Rejected non-local recipient: {}", address);
            return text(USER_NOT_LOCAL, RCPT_USER_NOT_FOUND);
        }

        if !self.recipients.iter().any(|r| r == address) {
            self.recipients.push(address.to_string());
        }
        text(OK, OK_MESSAGE)
    }

    fn data(&self) -> Reply {
        if self.recipients.is_empty() {
            return text(BAD_SEQUENCE_OF_COMMANDS, DATA_NO_RCPT);
        }
        Reply::StartData(reply(START_MAIL_INPUT, DATA_READY))
    }

    /// Hand a captured message to the store and close the envelope.
    pub async fn deliver(&mut self, message: &Path) -> String {
        let result = self
            .context
            .store
            .save_user_mail(message, &self.recipients)
            .await;

        let response = match result {
            Ok(()) => {
                tracing::info!(
                    "Mail from {} delivered to {:?}",
                    self.sender.as_deref().unwrap_or_default(),
                    self.recipients
                );
                reply(OK, DATA_SUCCESS)
            }
            Err(err) => {
                tracing::error!("Failed to deliver mail to {:?}: {:?}", self.recipients, err);
                reply(TRANSACTION_FAILED, DATA_FAILURE)
            }
        };

        self.reset();
        response
    }

    /// The body transfer broke off; nothing is delivered.
    pub fn abort_data(&mut self) {
        tracing::warn!("Mail transfer interrupted, discarding envelope");
        self.reset();
    }
}
