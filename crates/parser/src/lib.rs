//! Text formats for `twopl_core` histories and schedules.
//!
//! - [`parse_history`] reads the line-based input format
//!   (`<op> <txn> [<page>]`, one operation per line).
//! - [`parse_schedule`] reads schedules in their rendered token form
//!   (`wl_1(x) w_1(x) rl_2(x)* wu_1(x) c_1`), tokenized by [`tokenize`].

pub mod error;
pub mod lexer;
pub mod parser;
pub mod schedule;

pub use error::MalformedHistory;
pub use lexer::{tokenize, tokenize_with_text, Token, TokenKind};
pub use parser::{parse_history, validate_history};
pub use schedule::parse_schedule;
