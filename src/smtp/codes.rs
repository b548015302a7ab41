//! Reply codes from RFC 5321 used by the submission server.

pub const SERVICE_READY: u16 = 220;
pub const SERVICE_CLOSING: u16 = 221;
pub const OK: u16 = 250;
pub const START_MAIL_INPUT: u16 = 354;
pub const COMMAND_SYNTAX_ERROR: u16 = 500;
pub const PARAMETER_SYNTAX_ERROR: u16 = 501;
pub const COMMAND_NOT_IMPLEMENTED: u16 = 502;
pub const BAD_SEQUENCE_OF_COMMANDS: u16 = 503;
pub const ACTION_NOT_TAKEN: u16 = 550;
pub const USER_NOT_LOCAL: u16 = 551;
pub const TRANSACTION_FAILED: u16 = 554;
