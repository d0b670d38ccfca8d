use std::cmp::Ordering;
use std::ops::{Add, Sub};

/// Code size of a build: `text` (code segment) and `data` (initialized data).
///
/// The same type holds absolute sizes and deltas between two builds, so both
/// components are signed. Equality and ordering look at `total()` only; the
/// components are kept for reporting.
#[derive(Debug, Clone, Copy, Default)]
pub struct Size {
    pub text: i64,
    pub data: i64,
}

impl Size {
    pub const fn new(text: i64, data: i64) -> Self {
        Self { text, data }
    }

    pub const fn total(&self) -> i64 {
        self.text + self.data
    }
}

impl Add for Size {
    type Output = Size;

    fn add(self, rhs: Size) -> Size {
        Size::new(self.text + rhs.text, self.data + rhs.data)
    }
}

impl Sub for Size {
    type Output = Size;

    fn sub(self, rhs: Size) -> Size {
        Size::new(self.text - rhs.text, self.data - rhs.data)
    }
}

impl PartialEq for Size {
    fn eq(&self, other: &Self) -> bool {
        self.total() == other.total()
    }
}

impl Eq for Size {}

impl PartialOrd for Size {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Size {
    fn cmp(&self, other: &Self) -> Ordering {
        self.total().cmp(&other.total())
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (text {}, data {})", self.total(), self.text, self.data)
    }
}
