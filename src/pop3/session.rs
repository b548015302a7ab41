use std::sync::Arc;

use crate::context::ServerContext;
use crate::line::Tokens;
use crate::store::{MailItem, Mailbox};

const OK: &str = "+OK";
const ERR: &str = "-ERR";

const USER_FOUND: &str = "Welcome,";
const USER_NOT_FOUND: &str = "No mailbox is found for";
const PASS_CORRECT: &str = "User authenticated.";
const PASS_INCORRECT: &str = "Wrong password, try again.";
const PASS_USER_UNDEFINED: &str = "Must call USER first.";
const ALREADY_AUTHENTICATED: &str = "Already logged in.";
const DELE_SUCCESS: &str = "Message deleted";
const DELE_INVALID: &str = "Invalid message";
const RETR_INVALID: &str = "Invalid message name. Message name should be a number";
const NOT_FOUND: &str = "Item does not exist";
const RSET_RESTORED: &str = "messages restored";
const BAD_FORMAT: &str = "Bad format for the command.";
const NOT_AUTHENTICATED: &str = "Log in first.";
const UNKNOWN_COMMAND: &str = "Unknown command. Try again";
const LINE_TOO_LONG: &str = "Line too long.";

/// What the connection loop should send back for one command.
#[derive(Debug)]
pub enum Reply {
    /// One or more complete lines.
    Text(String),
    /// A status line followed by a message body and the terminator.
    Message { status: String, item: MailItem },
    /// Final line; the connection ends after it is sent.
    Close(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    User,
    Pass,
    Noop,
    Quit,
    Stat,
    List,
    Retr,
    Dele,
    Rset,
    Unknown,
}

impl Command {
    fn parse(verb: &str) -> Self {
        match verb.to_ascii_uppercase().as_str() {
            "USER" => Command::User,
            "PASS" => Command::Pass,
            "NOOP" => Command::Noop,
            "QUIT" => Command::Quit,
            "STAT" => Command::Stat,
            "LIST" => Command::List,
            "RETR" => Command::Retr,
            "DELE" => Command::Dele,
            "RSET" => Command::Rset,
            _ => Command::Unknown,
        }
    }
}

fn ok(message: impl std::fmt::Display) -> Reply {
    Reply::Text(format!("{} {}\r\n", OK, message))
}

fn err(message: impl std::fmt::Display) -> Reply {
    Reply::Text(format!("{} {}\r\n", ERR, message))
}

/// Reply for a command line longer than the configured limit.
pub fn line_too_long() -> String {
    format!("{} {}\r\n", ERR, LINE_TOO_LONG)
}

/// Message numbers are strictly decimal digits. Numbers too large to
/// represent can never name a message, so they saturate instead of failing.
fn parse_message_number(arg: &str) -> Option<usize> {
    if arg.is_empty() || !arg.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(arg.parse().unwrap_or(usize::MAX))
}

/// State of one POP3 connection.
pub struct Pop3Session {
    context: Arc<ServerContext>,
    username: Option<String>,
    authenticated: bool,
    mailbox: Option<Mailbox>,
}

impl Pop3Session {
    pub fn new(context: Arc<ServerContext>) -> Self {
        Self {
            context,
            username: None,
            authenticated: false,
            mailbox: None,
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn mailbox(&self) -> Option<&Mailbox> {
        self.mailbox.as_ref()
    }

    pub async fn handle_command(&mut self, tokens: &Tokens<'_>) -> Reply {
        let command = Command::parse(tokens.verb());
        tracing::debug!("POP3 command: {:?}", command);

        match command {
            Command::User => self.user(tokens),
            Command::Pass => self.pass(tokens).await,
            Command::Quit => Reply::Close(format!(
                "{} {} POP3 server signing off\r\n",
                OK, self.context.hostname
            )),
            Command::Unknown => err(UNKNOWN_COMMAND),
            _ if !self.authenticated => err(NOT_AUTHENTICATED),
            Command::Noop => Reply::Text(format!("{}\r\n", OK)),
            Command::Stat => self.stat(),
            Command::List => self.list(tokens),
            Command::Retr => self.retr(tokens),
            Command::Dele => self.dele(tokens),
            Command::Rset => self.rset(),
        }
    }

    fn user(&mut self, tokens: &Tokens<'_>) -> Reply {
        if self.authenticated {
            return err(ALREADY_AUTHENTICATED);
        }
        let Some(name) = tokens.single_argument() else {
            return err(BAD_FORMAT);
        };

        // An unknown name is still kept; the following PASS simply fails.
        self.username = Some(name.to_string());
        if self.context.users.is_valid_user(name, None) {
            ok(format!("{} {}", USER_FOUND, name))
        } else {
            err(format!("{} {}", USER_NOT_FOUND, name))
        }
    }

    async fn pass(&mut self, tokens: &Tokens<'_>) -> Reply {
        if self.authenticated {
            return err(ALREADY_AUTHENTICATED);
        }
        let Some(password) = tokens.single_argument() else {
            return err(BAD_FORMAT);
        };
        let Some(username) = self.username.as_deref() else {
            return err(PASS_USER_UNDEFINED);
        };

        if !self.context.users.is_valid_user(username, Some(password)) {
            tracing::info!("Failed POP3 login for {}", username);
            return err(PASS_INCORRECT);
        }

        self.authenticated = true;
        self.mailbox = match self.context.store.load_user_mail(username).await {
            Ok(mailbox) => mailbox,
            Err(error) => {
                tracing::error!("Failed to load mailbox for {}: {:?}", username, error);
                None
            }
        };
        tracing::info!(
            "User {} logged in with {} messages",
            username,
            self.mailbox.as_ref().map(|m| m.count(false)).unwrap_or(0)
        );
        ok(PASS_CORRECT)
    }

    fn stat(&self) -> Reply {
        let (count, size) = self
            .mailbox
            .as_ref()
            .map(|m| (m.count(false), m.total_size()))
            .unwrap_or((0, 0));
        ok(format!("{} {}", count, size))
    }

    fn list(&self, tokens: &Tokens<'_>) -> Reply {
        match tokens.argument_count() {
            0 => self.list_all(),
            1 => match tokens.single_argument() {
                Some(arg) => self.list_one(arg),
                None => err(BAD_FORMAT),
            },
            _ => err(BAD_FORMAT),
        }
    }

    fn list_all(&self) -> Reply {
        let Some(mailbox) = self.mailbox.as_ref().filter(|m| m.count(false) > 0) else {
            return Reply::Text(format!("{} 0 0\r\n.\r\n", OK));
        };

        let mut response = format!(
            "{} {} messages, ({} octets)\r\n",
            OK,
            mailbox.count(false),
            mailbox.total_size()
        );
        for (number, item) in mailbox.live() {
            response.push_str(&format!("{} {}\r\n", number, item.size()));
        }
        response.push_str(".\r\n");
        Reply::Text(response)
    }

    fn list_one(&self, arg: &str) -> Reply {
        match parse_message_number(arg).and_then(|number| self.item(number).map(|item| (number, item))) {
            Some((number, item)) => ok(format!("{} {}", number, item.size())),
            None => err(NOT_FOUND),
        }
    }

    fn retr(&self, tokens: &Tokens<'_>) -> Reply {
        let Some(arg) = tokens.single_argument() else {
            return err(BAD_FORMAT);
        };
        let Some(number) = parse_message_number(arg) else {
            return err(RETR_INVALID);
        };

        match self.item(number) {
            Some(item) => Reply::Message {
                status: format!("{} {} octets\r\n", OK, item.size()),
                item: item.clone(),
            },
            None => err(NOT_FOUND),
        }
    }

    fn dele(&mut self, tokens: &Tokens<'_>) -> Reply {
        let Some(arg) = tokens.single_argument() else {
            return err(BAD_FORMAT);
        };
        let Some(number) = parse_message_number(arg) else {
            return err(DELE_INVALID);
        };

        let deleted = match (self.mailbox.as_mut(), number.checked_sub(1)) {
            (Some(mailbox), Some(index)) => mailbox.mark_deleted(index),
            _ => false,
        };
        if deleted {
            ok(DELE_SUCCESS)
        } else {
            err(NOT_FOUND)
        }
    }

    fn rset(&mut self) -> Reply {
        let restored = self
            .mailbox
            .as_mut()
            .map(|m| m.reset_deleted())
            .unwrap_or(0);
        ok(format!("{} {}", restored, RSET_RESTORED))
    }

    /// Look up a message by its 1-based number.
    fn item(&self, number: usize) -> Option<&MailItem> {
        let index = number.checked_sub(1)?;
        self.mailbox.as_ref()?.get(index)
    }
}
