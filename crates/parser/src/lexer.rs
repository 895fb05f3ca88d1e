//! Logos-based lexer for rendered schedules.
//!
//! A schedule is a sequence of event tokens such as `wl_1(x)`, `r_1(x)`,
//! `rl_2(x)*` or `c_1`, separated by whitespace or commas and optionally
//! enclosed in brackets.
//!
//! # Example input
//!
//! ```text
//! // wait-die
//! [wl_1(x), w_1(x), rl_2(x)*, wu_1(x), c_1]
//! ```

use core::ops::Range;

/// All token kinds produced by the schedule lexer.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(::logos::Logos, Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// A line comment starting with `//` and running to end of line.
    #[regex(r"//[^\n]*", allow_greedy = true)]
    Comment,

    /// Event name and transaction id, e.g. `wl_12`.
    #[regex(r"[a-z]+_[0-9]+")]
    Head,

    /// Parenthesised page name, e.g. `(x)`.
    #[regex(r"\([A-Za-z0-9_]*\)")]
    Page,

    /// Denied-request marker `*`.
    #[token("*")]
    Star,

    /// Opening bracket `[`.
    #[token("[")]
    BracketOpen,

    /// Closing bracket `]`.
    #[token("]")]
    BracketClose,

    /// Separator `,`.
    #[token(",")]
    Comma,

    /// A newline (`\n` or `\r\n`).
    #[regex(r"\r?\n")]
    Newline,

    /// Spaces or tabs. Emitted so the tokenizer can be used for syntax
    /// highlighting where whitespace positioning matters.
    #[regex(r"[ \t]+")]
    Whitespace,
}

/// A single token with its kind and the byte-offset span in the source.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// What kind of token this is.
    pub kind: TokenKind,
    /// Byte range `start..end` into the original input string.
    pub span: Range<usize>,
}

impl Token {
    #[must_use]
    pub const fn new(kind: TokenKind, span: Range<usize>) -> Self {
        Self { kind, span }
    }

    /// Return the source text for this token given the original input.
    #[must_use]
    pub fn text<'a>(&self, input: &'a str) -> &'a str {
        &input[self.span.clone()]
    }
}

/// Tokenize `input`, keeping unrecognised input as `Err(span)` so callers
/// can report it.
pub fn lex(input: &str) -> impl Iterator<Item = Result<Token, Range<usize>>> + '_ {
    use logos::Logos as _;
    TokenKind::lexer(input)
        .spanned()
        .map(|(result, span)| result.map(|kind| Token::new(kind, span.clone())).map_err(|()| span))
}

/// Tokenize `input` and return all valid tokens.
///
/// Tokens that the lexer cannot recognise are silently skipped.
/// Use [`tokenize_with_text`] if you also need the source slice for each token.
#[must_use]
pub fn tokenize(input: &str) -> Vec<Token> {
    lex(input).filter_map(Result::ok).collect()
}

/// Tokenize `input` and return tokens paired with their source text slices.
///
/// Tokens that the lexer cannot recognise are silently skipped.
#[must_use]
pub fn tokenize_with_text(input: &str) -> Vec<(Token, &str)> {
    lex(input)
        .filter_map(Result::ok)
        .map(|token| {
            let text = token.text(input);
            (token, text)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{lex, tokenize, tokenize_with_text, TokenKind};

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_basic_schedule() {
        let input = "wl_1(x) w_1(x) rl_2(x)*\n";
        let expected_kinds = [
            TokenKind::Head, // wl_1
            TokenKind::Page, // (x)
            TokenKind::Whitespace,
            TokenKind::Head, // w_1
            TokenKind::Page,
            TokenKind::Whitespace,
            TokenKind::Head, // rl_2
            TokenKind::Page,
            TokenKind::Star,
            TokenKind::Newline,
        ];
        assert_eq!(kinds(input), expected_kinds);
    }

    #[test]
    fn test_bracketed_list() {
        let ks = kinds("[c_1, restart_2]");
        assert_eq!(
            ks,
            [
                TokenKind::BracketOpen,
                TokenKind::Head,
                TokenKind::Comma,
                TokenKind::Whitespace,
                TokenKind::Head,
                TokenKind::BracketClose,
            ]
        );
    }

    #[test]
    fn test_comment_tokenization() {
        let ks = kinds("// immediate restart\nc_1\n");
        assert_eq!(ks[0], TokenKind::Comment);
        assert_eq!(ks[1], TokenKind::Newline);
        assert_eq!(ks[2], TokenKind::Head);
    }

    #[test]
    fn test_tokenize_with_text_spans() {
        let pairs = tokenize_with_text("wu_12(acct_7)");
        let texts: Vec<&str> = pairs.iter().map(|(_, s)| *s).collect();
        assert_eq!(texts, &["wu_12", "(acct_7)"]);
        assert_eq!(pairs[0].0.span, 0..5);
        assert_eq!(pairs[1].0.span, 5..13);
    }

    #[test]
    fn test_unrecognised_input_is_reported() {
        let results: Vec<_> = lex("c_1 ?").collect();
        assert_eq!(results.len(), 3);
        assert_eq!(results[2], Err(4..5));
        assert_eq!(tokenize("c_1 ?").len(), 2);
    }
}
