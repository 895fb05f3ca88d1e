/// Input that is not a well-formed history or schedule.
///
/// `line` and `column` are 1-based and point at the offending character.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedHistory {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl MalformedHistory {
    pub(crate) fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }

    /// Builds an error from a byte offset into `input`.
    pub(crate) fn at_offset(message: impl Into<String>, input: &str, offset: usize) -> Self {
        let (line, column) = offset_to_line_col(input, offset);
        Self::new(message, line, column)
    }
}

impl core::fmt::Display for MalformedHistory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "malformed history at line {}, column {}: {}",
            self.line, self.column, self.message
        )
    }
}

impl std::error::Error for MalformedHistory {}

/// Convert a byte offset into the original input to 1-based (line, column).
fn offset_to_line_col(input: &str, offset: usize) -> (usize, usize) {
    let safe_offset = offset.min(input.len());
    let prefix = &input[..safe_offset];
    let line = prefix.bytes().filter(|&b| b == b'\n').count() + 1;
    let column = prefix
        .rfind('\n')
        .map_or_else(|| prefix.len() + 1, |pos| prefix.len() - pos);
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_to_line_col() {
        let input = "r 1 x\nw 2 y\n";
        assert_eq!(offset_to_line_col(input, 0), (1, 1));
        assert_eq!(offset_to_line_col(input, 4), (1, 5));
        assert_eq!(offset_to_line_col(input, 6), (2, 1));
        assert_eq!(offset_to_line_col(input, 8), (2, 3));
        assert_eq!(offset_to_line_col(input, 999), (3, 1));
    }

    #[test]
    fn test_display() {
        let err = MalformedHistory::new("unknown operation", 3, 1);
        assert_eq!(
            err.to_string(),
            "malformed history at line 3, column 1: unknown operation"
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serialize() {
        let err = MalformedHistory::new("unknown operation", 2, 1);
        let json = serde_json::to_value(&err).expect("should serialize");
        assert_eq!(
            json,
            serde_json::json!({"message": "unknown operation", "line": 2, "column": 1})
        );
    }
}
