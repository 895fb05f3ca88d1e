//! Winnow-based parser for the line-based history format.
//!
//! Grammar (one operation per line):
//! ```text
//! history     = (line NEWLINE)* line?
//! line        = WS* (comment | operation)? WS*
//! comment     = ("//" | "#") REST_OF_LINE
//! operation   = kind WS+ transaction (WS+ page)?     -- page required for r/w
//! kind        = "read" | "r" | "write" | "w" | "commit" | "c"
//! transaction = INTEGER                              -- strictly positive
//! page        = [A-Za-z0-9_]+
//! ```

use twopl_core::operation::{Operation, OperationKind, TransactionId};
use winnow::ascii::dec_uint;
use winnow::combinator::{alt, cut_err, preceded};
use winnow::error::{ContextError, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::take_while;
use winnow::ModalResult;

use crate::error::MalformedHistory;

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Parse a history in the line-based format into its operations.
///
/// # Errors
///
/// Returns [`MalformedHistory`] with line/column information for an unknown
/// operation kind, a missing or non-positive transaction id, a read or write
/// without a page, or trailing input on a line.
pub fn parse_history(input: &str) -> Result<Vec<Operation>, MalformedHistory> {
    let mut operations = Vec::new();
    for (index, line) in input.split('\n').enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if is_blank_or_comment(line) {
            continue;
        }
        let operation = operation_line.parse(line).map_err(|e| {
            MalformedHistory::new(describe(e.inner()), index + 1, e.offset() + 1)
        })?;
        operations.push(operation);
    }
    Ok(operations)
}

/// Check operations built by other means (e.g. deserialized) against the
/// rules [`parse_history`] enforces. `line` in the error is the 1-based
/// position of the offending operation.
///
/// # Errors
///
/// Returns [`MalformedHistory`] for the first invalid operation.
pub fn validate_history(operations: &[Operation]) -> Result<(), MalformedHistory> {
    for (index, operation) in operations.iter().enumerate() {
        let fail = |message: &str| Err(MalformedHistory::new(message, index + 1, 1));
        if !operation.kind().is_input() {
            return fail("only read, write and commit operations may appear in a history");
        }
        if operation.transaction() == TransactionId(0) {
            return fail("transaction ids must be positive");
        }
        match operation.kind() {
            OperationKind::Commit if !operation.page().is_empty() => {
                return fail("a commit does not take a page");
            }
            OperationKind::Read | OperationKind::Write if !is_page_name(operation.page()) => {
                return fail("reads and writes need a page name of letters, digits or `_`");
            }
            _ => {}
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn is_blank_or_comment(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with("//") || trimmed.starts_with('#')
}

fn is_page_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_page_name(page: &str) -> bool {
    !page.is_empty() && page.chars().all(is_page_char)
}

/// Flatten winnow's context report into a single line.
fn describe(error: &ContextError) -> String {
    let message = error.to_string();
    if message.is_empty() {
        "unexpected input".to_string()
    } else {
        message.replace('\n', "; ")
    }
}

/// Spaces and tabs.
fn inline_ws(input: &mut &str) -> ModalResult<()> {
    take_while(1.., |c: char| c == ' ' || c == '\t')
        .void()
        .parse_next(input)
}

fn opt_inline_ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., |c: char| c == ' ' || c == '\t')
        .void()
        .parse_next(input)
}

// ---------------------------------------------------------------------------
// Leaf parsers
// ---------------------------------------------------------------------------

/// Long names first so that `read` is not taken as `r` + `ead`.
fn operation_kind(input: &mut &str) -> ModalResult<OperationKind> {
    alt((
        "read".value(OperationKind::Read),
        "write".value(OperationKind::Write),
        "commit".value(OperationKind::Commit),
        "r".value(OperationKind::Read),
        "w".value(OperationKind::Write),
        "c".value(OperationKind::Commit),
    ))
    .context(StrContext::Label("operation"))
    .context(StrContext::Expected(StrContextValue::Description(
        "r, w or c",
    )))
    .parse_next(input)
}

/// `WS+ INTEGER`, rejecting zero.
fn transaction_id(input: &mut &str) -> ModalResult<u64> {
    preceded(inline_ws, dec_uint::<_, u64, _>.verify(|id: &u64| *id > 0))
        .context(StrContext::Label("transaction id"))
        .context(StrContext::Expected(StrContextValue::Description(
            "positive integer",
        )))
        .parse_next(input)
}

/// `WS+ page`
fn page(input: &mut &str) -> ModalResult<String> {
    preceded(inline_ws, take_while(1.., is_page_char).map(str::to_string))
        .context(StrContext::Label("page"))
        .context(StrContext::Expected(StrContextValue::Description(
            "page name",
        )))
        .parse_next(input)
}

// ---------------------------------------------------------------------------
// Line parser
// ---------------------------------------------------------------------------

/// `kind WS+ transaction (WS+ page)?`, surrounded by optional whitespace.
fn operation_line(input: &mut &str) -> ModalResult<Operation> {
    opt_inline_ws.parse_next(input)?;
    let kind = operation_kind.parse_next(input)?;
    let transaction = cut_err(transaction_id).parse_next(input)?;
    let operation = if kind == OperationKind::Commit {
        Operation::commit(transaction)
    } else {
        let page = cut_err(page).parse_next(input)?;
        Operation::new(TransactionId(transaction), page, kind)
    };
    opt_inline_ws.parse_next(input)?;
    Ok(operation)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
