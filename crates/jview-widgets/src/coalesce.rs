#![forbid(unsafe_code)]

//! Per-frame scroll coalescing.
//!
//! Scroll events can arrive far faster than frames. [`ScrollCoalescer`]
//! keeps only the most recent offset; the render loop calls
//! [`ScrollCoalescer::flush`] once per frame and recomputes the visible range
//! at most once, for the latest position.
//!
//! ```
//! use jview_widgets::coalesce::ScrollCoalescer;
//!
//! let mut scroll = ScrollCoalescer::new();
//! scroll.push(100);
//! scroll.push(240);
//! scroll.push(180);
//! assert_eq!(scroll.flush(), Some(180));
//! assert_eq!(scroll.flush(), None);
//! assert_eq!(scroll.coalesced(), 2);
//! ```

/// Latest-wins holder for a pending scroll offset.
///
/// All operations are O(1). Not thread-safe; use from the render thread.
#[derive(Debug, Clone, Default)]
pub struct ScrollCoalescer {
    pending: Option<usize>,
    coalesced: u64,
    flushed: u64,
}

impl ScrollCoalescer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a scroll position. Replaces any position not yet flushed.
    pub fn push(&mut self, offset: usize) {
        if self.pending.replace(offset).is_some() {
            self.coalesced += 1;
        }
    }

    /// Take the latest position, once per frame.
    pub fn flush(&mut self) -> Option<usize> {
        let offset = self.pending.take()?;
        self.flushed += 1;
        Some(offset)
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop the pending position without applying it.
    pub fn clear(&mut self) {
        self.pending = None;
    }

    /// Positions replaced before they were flushed.
    #[must_use]
    pub fn coalesced(&self) -> u64 {
        self.coalesced
    }

    /// Positions delivered by [`flush`](Self::flush).
    #[must_use]
    pub fn flushed(&self) -> u64 {
        self.flushed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_yields_one_recompute() {
        let mut coalescer = ScrollCoalescer::new();
        for offset in (0..1000).step_by(10) {
            coalescer.push(offset);
        }
        assert!(coalescer.has_pending());
        assert_eq!(coalescer.flush(), Some(990));
        assert_eq!(coalescer.flushed(), 1);
        assert_eq!(coalescer.coalesced(), 99);
        assert!(!coalescer.has_pending());
    }

    #[test]
    fn each_frame_sees_its_own_latest() {
        let mut coalescer = ScrollCoalescer::new();
        coalescer.push(1);
        assert_eq!(coalescer.flush(), Some(1));
        coalescer.push(2);
        coalescer.push(3);
        assert_eq!(coalescer.flush(), Some(3));
        assert_eq!(coalescer.flushed(), 2);
    }

    #[test]
    fn clear_discards() {
        let mut coalescer = ScrollCoalescer::new();
        coalescer.push(5);
        coalescer.clear();
        assert_eq!(coalescer.flush(), None);
        assert_eq!(coalescer.flushed(), 0);
    }
}
