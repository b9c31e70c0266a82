//! Position indexing: JSON Pointer to source line.
//!
//! [`index`] pulls the fragment stream of a document once through
//! [`json_session`], keeping only a stack of [`PathFrame`]s, and records the
//! line on which every object member and array element begins.

use std::collections::BTreeMap;

use json_session::{JsonFragment, JsonSession};
use serde::Serialize;
use tracing::{debug, trace};

use crate::pointer::{join, PathFrame};

/// Mapping from JSON Pointer to the 1-based line where that location starts.
///
/// Built once per read of a document and never updated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PositionMap {
    lines: BTreeMap<String, usize>,
}

impl PositionMap {
    /// Returns the line recorded for `pointer`, if any.
    #[must_use]
    pub fn line_of(&self, pointer: &str) -> Option<usize> {
        self.lines.get(pointer).copied()
    }

    /// Number of recorded pointers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    // Later visits win, so duplicate keys resolve to their last occurrence.
    fn record(&mut self, pointer: String, line: usize) {
        trace!("{line} {pointer}");
        self.lines.insert(pointer, line);
    }
}

/// Byte offsets at which each line of a document starts.
struct LineStarts(Vec<usize>);

impl LineStarts {
    fn new(content: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(content.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self(starts)
    }

    /// 1-based line containing byte `offset`.
    fn line_at(&self, offset: u64) -> usize {
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        self.0.partition_point(|&start| start <= offset)
    }
}

/// Builds the position map for `content`.
///
/// Never fails: empty input, a root that is not an object, and malformed
/// JSON all produce an empty map. Callers treat a missing pointer as an
/// unknown line. Indexing stops once the root object closes; anything after
/// it is left for the full parse to report.
///
/// ```
/// let map = schema_lint_core::positions::index("{\n  \"a\": [10,\n  20]\n}");
/// assert_eq!(map.line_of("/a"), Some(2));
/// assert_eq!(map.line_of("/a/1"), Some(3));
/// assert!(schema_lint_core::positions::index("[1, 2]").is_empty());
/// ```
#[must_use]
pub fn index(content: &str) -> PositionMap {
    build(content).unwrap_or_else(|| {
        let head: String = content.chars().take(33).collect();
        debug!("Syntax error in document starting with: {head:?}");
        PositionMap::default()
    })
}

/// Returns `None` when the fragment stream breaks off before the root closes.
fn build(content: &str) -> Option<PositionMap> {
    let lines = LineStarts::new(content);
    let mut session = JsonSession::new(content.bytes());
    let mut map = PositionMap::default();

    let root = match session.next() {
        Ok(Some(root)) => root,
        Ok(None) => return Some(map),
        Err(e) => {
            trace!("{e:?}");
            return None;
        }
    };
    if !matches!(root.fragment, JsonFragment::BeginObject) {
        debug!("Document root is {:?}, not an object", root.fragment);
        return Some(map);
    }
    map.record(String::new(), lines.line_at(root.span.start.byte_offset));

    let mut stack: Vec<PathFrame> = Vec::new();
    let mut depth = 1usize;
    while depth > 0 {
        let next = match session.next() {
            Ok(Some(next)) => next,
            Ok(None) => return None,
            Err(e) => {
                trace!("{e:?}");
                return None;
            }
        };
        let line = lines.line_at(next.span.start.byte_offset);
        match next.fragment {
            JsonFragment::ObjectProperty(name) => {
                map.record(join(&stack, Some(&name)), line);
                stack.push(PathFrame::Field(name));
            }
            JsonFragment::BeginObject => {
                depth += 1;
                enter_element(&mut stack, &mut map, line);
            }
            JsonFragment::BeginArray => {
                depth += 1;
                enter_element(&mut stack, &mut map, line);
                stack.push(PathFrame::Index(-1));
            }
            JsonFragment::PrimitiveValue(_) => {
                enter_element(&mut stack, &mut map, line);
                leave_value(&mut stack);
            }
            JsonFragment::EndObject => {
                depth -= 1;
                leave_value(&mut stack);
            }
            JsonFragment::EndArray => {
                depth -= 1;
                if matches!(stack.last(), Some(PathFrame::Index(_))) {
                    stack.pop();
                }
                leave_value(&mut stack);
            }
        }
    }

    Some(map)
}

/// Advances the enclosing array counter, if any, and records the element.
fn enter_element(stack: &mut [PathFrame], map: &mut PositionMap, line: usize) {
    if let Some(PathFrame::Index(i)) = stack.last_mut() {
        *i += 1;
        map.record(join(stack, None), line);
    }
}

/// Closes a member value. Array elements are closed by their array instead.
fn leave_value(stack: &mut Vec<PathFrame>) {
    if matches!(stack.last(), Some(PathFrame::Field(_))) {
        stack.pop();
    }
}
