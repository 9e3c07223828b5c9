use std::{fmt, ops::Range};

/// A byte range in the original source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    start: usize,
    end: usize,
}

impl Span {
    pub fn new(range: Range<usize>) -> Self {
        Self {
            start: range.start,
            end: range.end.max(range.start),
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The smallest span covering both.
    pub fn union(&self, other: Span) -> Span {
        Self::new(self.start.min(other.start)..self.end.max(other.end))
    }

    /// A sub-span given relative to the start of this span, clamped to it.
    pub fn sub(&self, range: Range<usize>) -> Span {
        let start = (self.start + range.start).min(self.end);
        let end = (self.start + range.end).min(self.end);
        Self::new(start..end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union() {
        let span = Span::new(10..20).union(Span::new(5..12));
        assert_eq!(span, Span::new(5..20));
        assert_eq!(span.len(), 15);
    }

    #[test]
    fn test_sub_is_clamped() {
        let span = Span::new(10..20);
        assert_eq!(span.sub(2..4), Span::new(12..14));
        assert_eq!(span.sub(5..50), Span::new(15..20));
    }
}
