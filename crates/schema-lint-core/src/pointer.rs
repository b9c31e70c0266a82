//! JSON Pointer path state used while walking a token stream.
//!
//! Segments are joined with `/` without escaping. Field names that contain
//! `/` or `~` therefore produce pointers that do not round-trip; this is a
//! known limitation.

use std::fmt::Write;

/// One entry of the path stack kept by the position indexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathFrame {
    /// The member name whose value is currently being read.
    Field(String),
    /// Array element counter. `-1` means no element has been entered yet.
    Index(i64),
}

/// Serializes a path stack (plus an optional trailing segment) as a pointer.
///
/// The root pointer is the empty string.
///
/// ```
/// use schema_lint_core::pointer::{join, PathFrame};
///
/// let stack = vec![PathFrame::Field("Products".into()), PathFrame::Index(0)];
/// assert_eq!(join(&stack, Some("Name")), "/Products/0/Name");
/// assert_eq!(join(&[], None), "");
/// ```
#[must_use]
pub fn join(stack: &[PathFrame], leaf: Option<&str>) -> String {
    let mut pointer = String::new();
    for frame in stack {
        match frame {
            PathFrame::Field(name) => {
                pointer.push('/');
                pointer.push_str(name);
            }
            PathFrame::Index(i) => {
                let _ = write!(pointer, "/{i}");
            }
        }
    }
    if let Some(leaf) = leaf {
        pointer.push('/');
        pointer.push_str(leaf);
    }
    pointer
}

/// Extracts the pointer embedded in a free-text validator message.
///
/// The validator contract opens the message with a double quote, then the
/// pointer, then a closing quote. The first character is skipped without
/// being checked and the pointer runs up to the next double quote. Returns
/// `None` when no such quote follows.
///
/// ```
/// use schema_lint_core::pointer::extract_from_message;
///
/// assert_eq!(
///     extract_from_message("\"/Products/0/Name\": is not a string"),
///     Some("/Products/0/Name")
/// );
/// assert_eq!(extract_from_message("no pointer here"), None);
/// ```
#[must_use]
pub fn extract_from_message(message: &str) -> Option<&str> {
    let first = message.chars().next()?;
    let rest = &message[first.len_utf8()..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str) -> PathFrame {
        PathFrame::Field(name.to_string())
    }

    #[test]
    fn join_mixed_frames() {
        let stack = vec![field("a"), PathFrame::Index(3), field("b")];
        assert_eq!(join(&stack, None), "/a/3/b");
        assert_eq!(join(&stack, Some("c")), "/a/3/b/c");
    }

    #[test]
    fn join_nested_indexes() {
        let stack = vec![field("grid"), PathFrame::Index(1), PathFrame::Index(2)];
        assert_eq!(join(&stack, None), "/grid/1/2");
    }

    #[test]
    fn join_does_not_escape() {
        let stack = vec![field("a/b")];
        assert_eq!(join(&stack, Some("c~d")), "/a/b/c~d");
    }

    #[test]
    fn extract_empty_pointer() {
        assert_eq!(extract_from_message("\"\": is required"), Some(""));
    }

    #[test]
    fn extract_skips_first_character_unchecked() {
        assert_eq!(extract_from_message("'/a\": bad"), Some("/a"));
        assert_eq!(extract_from_message("x\"/a\": bad"), Some(""));
        assert_eq!(extract_from_message("\u{e9}/a\""), Some("/a"));
    }

    #[test]
    fn extract_requires_closing_quote() {
        assert_eq!(extract_from_message("\"/a: bad"), None);
        assert_eq!(extract_from_message("\""), None);
        assert_eq!(extract_from_message(""), None);
    }
}
