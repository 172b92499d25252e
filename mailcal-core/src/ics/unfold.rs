//! Line unfolding (RFC 5545 section 3.1).

use std::iter::Peekable;
use std::str::Lines;

/// One logical property line and the physical lines it was built from.
///
/// The physical lines are kept so that callers can copy an event through
/// untouched, or swap out exactly the lines belonging to one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine<'a> {
    pub physical: Vec<&'a str>,
    pub text: String,
}

/// Lazy iterator over the logical lines of a calendar body.
pub struct Unfold<'a> {
    lines: Peekable<Lines<'a>>,
}

/// Unfold `content` into logical lines.
///
/// A physical line starting with a space or tab continues the previous one;
/// it is trimmed and appended without a separator.
pub fn unfold(content: &str) -> Unfold<'_> {
    Unfold {
        lines: content.lines().peekable(),
    }
}

fn is_continuation(line: &str) -> bool {
    line.starts_with(' ') || line.starts_with('\t')
}

fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

impl<'a> Iterator for Unfold<'a> {
    type Item = LogicalLine<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = strip_cr(self.lines.next()?);

        // A stray continuation at the very start has nothing to attach to.
        let text = if is_continuation(first) {
            first.trim().to_string()
        } else {
            first.to_string()
        };
        let mut logical = LogicalLine {
            physical: vec![first],
            text,
        };

        while let Some(next) = self.lines.next_if(|l| is_continuation(l)) {
            let next = strip_cr(next);
            logical.physical.push(next);
            logical.text.push_str(next.trim());
        }

        Some(logical)
    }
}
