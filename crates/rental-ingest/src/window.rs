//! Offset windows over the upstream's 1-based, inclusive pagination.

use std::fmt;

use serde::Serialize;

/// Page length used by the upstream dataset.
pub const DEFAULT_PAGE_SIZE: u64 = 100;

/// A contiguous, 1-based, inclusive offset window `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PageRange {
    pub start: u64,
    pub end: u64,
}

impl PageRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Number of offsets covered by the window.
    pub fn len(&self) -> u64 {
        if self.end < self.start {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Iterator over disjoint windows exhaustively covering `[1, total]`.
///
/// The last window is clipped to `total`. A zero total yields no windows,
/// and a zero page size is treated as one.
#[derive(Debug, Clone)]
pub struct Windows {
    /// `None` once the window ending at `u64::MAX` has been yielded.
    next_start: Option<u64>,
    total: u64,
    page_size: u64,
}

impl Iterator for Windows {
    type Item = PageRange;

    fn next(&mut self) -> Option<PageRange> {
        let start = self.next_start.filter(|start| *start <= self.total)?;
        let end = start.saturating_add(self.page_size - 1).min(self.total);
        self.next_start = end.checked_add(1);
        Some(PageRange::new(start, end))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match self.next_start {
            Some(start) if start <= self.total => (self.total - start) / self.page_size + 1,
            _ => 0,
        };
        let remaining = usize::try_from(remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

/// Windows of `page_size` offsets covering `[1, total]`.
pub fn windows(total: u64, page_size: u64) -> Windows {
    Windows {
        next_start: Some(1),
        total,
        page_size: page_size.max(1),
    }
}

/// `ceil(total / page_size)`.
pub fn window_count(total: u64, page_size: u64) -> u64 {
    let page_size = page_size.max(1);
    total / page_size + u64::from(total % page_size != 0)
}
