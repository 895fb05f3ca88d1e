use twopl_core::operation::{LockMode, Operation, OperationKind, TransactionId};

use crate::error::MalformedHistory;
use crate::lexer::{lex, Token, TokenKind};

/// Parse a rendered schedule back into its events.
///
/// Events are separated by whitespace, commas or newlines; `//` comments and
/// enclosing brackets are ignored. Page-scoped events need a page directly
/// after the head (`w_1(x)`), transaction-wide ones (`c_1`, `a_1`,
/// `wait_1`, `restart_1`) take none. Only lock requests may carry the `*`
/// marker.
///
/// # Errors
///
/// Returns [`MalformedHistory`] pointing at the first token that does not
/// form a valid event.
pub fn parse_schedule(input: &str) -> Result<Vec<Operation>, MalformedHistory> {
    let tokens = lex(input)
        .map(|token| {
            token.map_err(|span| {
                MalformedHistory::at_offset("unrecognised input", input, span.start)
            })
        })
        .collect::<Result<Vec<Token>, _>>()?;

    let mut events = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        i += 1;
        match token.kind {
            TokenKind::Whitespace
            | TokenKind::Newline
            | TokenKind::Comment
            | TokenKind::Comma
            | TokenKind::BracketOpen
            | TokenKind::BracketClose => continue,
            TokenKind::Head => {}
            TokenKind::Page | TokenKind::Star => {
                return Err(MalformedHistory::at_offset(
                    "expected an event such as `w_1(x)`",
                    input,
                    token.span.start,
                ));
            }
        }
        let fail = |message: &str| Err(MalformedHistory::at_offset(message, input, token.span.start));

        let (name, id) = token
            .text(input)
            .split_once('_')
            .unwrap_or_default();
        let Ok(transaction) = id.parse::<u64>() else {
            return fail("transaction id out of range");
        };
        if transaction == 0 {
            return fail("transaction ids must be positive");
        }

        let page = match tokens.get(i) {
            Some(next) if next.kind == TokenKind::Page => {
                i += 1;
                let text = next.text(input);
                Some(&text[1..text.len() - 1])
            }
            _ => None,
        };
        let pending = matches!(tokens.get(i), Some(next) if next.kind == TokenKind::Star);
        if pending {
            i += 1;
        }

        let Some(kind) = event_kind(name, pending) else {
            return fail("unknown event");
        };
        let page = match (kind.is_transaction_wide(), page) {
            (true, None) => "",
            (false, Some(page)) if !page.is_empty() => page,
            (true, Some(_)) => return fail("this event does not take a page"),
            (false, _) => return fail("this event needs a page"),
        };
        events.push(Operation::new(TransactionId(transaction), page, kind));
    }
    Ok(events)
}

fn event_kind(name: &str, pending: bool) -> Option<OperationKind> {
    let kind = match (name, pending) {
        ("rl", true) => OperationKind::PendingLockRequest(LockMode::Read),
        ("wl", true) => OperationKind::PendingLockRequest(LockMode::Write),
        (_, true) => return None,
        ("r", false) => OperationKind::Read,
        ("w", false) => OperationKind::Write,
        ("c", false) => OperationKind::Commit,
        ("a", false) => OperationKind::Abort,
        ("rl", false) => OperationKind::ReadLock,
        ("wl", false) => OperationKind::WriteLock,
        ("ru", false) => OperationKind::ReadUnlock,
        ("wu", false) => OperationKind::WriteUnlock,
        ("wait", false) => OperationKind::Wait,
        ("restart", false) => OperationKind::Restart,
        _ => return None,
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use twopl_core::{schedule, Policy, SchedulerConfig};

    use super::*;

    #[test]
    fn test_parse_plain_sequence() {
        let events = parse_schedule("wl_1(x) w_1(x) rl_2(x)* wu_1(x) c_1").expect("should parse");
        assert_eq!(
            events,
            vec![
                Operation::lock(TransactionId(1), "x", LockMode::Write),
                Operation::write(1, "x"),
                Operation::pending(TransactionId(2), "x", LockMode::Read),
                Operation::unlock(TransactionId(1), "x", LockMode::Write),
                Operation::commit(1),
            ]
        );
    }

    #[test]
    fn test_parse_bracketed_list_with_comment() {
        let input = "// wound-wait\n[rl_3(z), r_3(z),\n ru_3(z), c_3, wait_4, restart_5, a_6]\n";
        let events = parse_schedule(input).expect("should parse");
        assert_eq!(events.len(), 7);
        assert_eq!(events[4], Operation::wait(TransactionId(4)));
        assert_eq!(events[5], Operation::restart(TransactionId(5)));
        assert_eq!(events[6], Operation::abort(6));
    }

    #[test]
    fn test_render_then_parse() {
        let history = vec![
            Operation::write(2, "x"),
            Operation::read(1, "x"),
            Operation::write(3, "x"),
            Operation::commit(2),
            Operation::commit(1),
        ];
        let outcome = schedule(
            history,
            SchedulerConfig::new(Policy::WaitDie).with_annotations(true),
        );
        let parsed = parse_schedule(&outcome.schedule.to_string()).expect("should parse");
        assert_eq!(parsed, outcome.schedule.events());
    }

    #[test]
    fn test_unknown_event() {
        let err = parse_schedule("c_1 x_2(y)").unwrap_err();
        assert_eq!((err.line, err.column), (1, 5));
        assert_eq!(err.message, "unknown event");
    }

    #[test]
    fn test_star_only_on_lock_requests() {
        let err = parse_schedule("r_1(x)*").unwrap_err();
        assert_eq!(err.message, "unknown event");
    }

    #[test]
    fn test_page_rules() {
        assert_eq!(
            parse_schedule("c_1(x)").unwrap_err().message,
            "this event does not take a page"
        );
        assert_eq!(
            parse_schedule("w_1").unwrap_err().message,
            "this event needs a page"
        );
        assert_eq!(
            parse_schedule("w_1()").unwrap_err().message,
            "this event needs a page"
        );
        // the page must follow the head directly
        assert_eq!(
            parse_schedule("w_1 (x)").unwrap_err().message,
            "this event needs a page"
        );
    }

    #[test]
    fn test_zero_transaction() {
        let err = parse_schedule("\nc_0").unwrap_err();
        assert_eq!((err.line, err.column), (2, 1));
    }

    #[test]
    fn test_unrecognised_input() {
        let err = parse_schedule("c_1 ; c_2").unwrap_err();
        assert_eq!((err.line, err.column), (1, 5));
        assert_eq!(err.message, "unrecognised input");
    }
}
