use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// A half-open `[start, end)` byte range into a document's text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start {start} after end {end}");
        Self { start, end }
    }

    /// Zero-width span at `offset`, used as an insertion point
    pub fn empty(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Check whether `other` lies entirely inside this span
    pub fn encloses(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Smallest span covering both
    pub fn cover(&self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Express this span relative to `base` (which must not lie after it)
    pub fn relative_to(&self, base: usize) -> Range<usize> {
        (self.start - base)..(self.end - base)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A value together with the span it was read from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(value: T, span: Span) -> Self {
        Self { value, span }
    }
}

impl Spanned<String> {
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

/// Change in text length produced by a splice
///
/// Offsets at or after the end of the replaced region move by this amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delta {
    Grow(usize),
    Shrink(usize),
}

impl Delta {
    /// Delta for replacing `removed` bytes with `inserted` bytes
    pub fn between(removed: usize, inserted: usize) -> Self {
        if inserted >= removed {
            Delta::Grow(inserted - removed)
        } else {
            Delta::Shrink(removed - inserted)
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Delta::Grow(0) | Delta::Shrink(0))
    }

    pub fn apply(&self, offset: usize) -> usize {
        match *self {
            Delta::Grow(n) => offset + n,
            Delta::Shrink(n) => offset.saturating_sub(n),
        }
    }
}

/// Shift every span held by a value after an edit earlier in the document
pub trait Rebase {
    fn rebase(&mut self, delta: Delta);
}

impl Rebase for Span {
    fn rebase(&mut self, delta: Delta) {
        self.start = delta.apply(self.start);
        self.end = delta.apply(self.end);
    }
}

impl<T> Rebase for Spanned<T> {
    fn rebase(&mut self, delta: Delta) {
        self.span.rebase(delta);
    }
}

impl<T: Rebase> Rebase for Option<T> {
    fn rebase(&mut self, delta: Delta) {
        if let Some(inner) = self {
            inner.rebase(delta);
        }
    }
}

impl<T: Rebase> Rebase for Vec<T> {
    fn rebase(&mut self, delta: Delta) {
        for item in self.iter_mut() {
            item.rebase(delta);
        }
    }
}

impl<T: Rebase + ?Sized> Rebase for Box<T> {
    fn rebase(&mut self, delta: Delta) {
        (**self).rebase(delta);
    }
}
