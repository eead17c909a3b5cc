use std::sync::atomic::{AtomicU32, Ordering};

use more_asserts::{assert_gt, assert_lt, debug_assert_gt, debug_assert_lt};

/// Tracks which of the in-flight frames is currently being recorded.
/// Shared between the device and the per-frame resources it creates.
#[derive(Debug)]
pub struct FrameCounter {
    frames_in_flight: u32,
    current: AtomicU32,
}

impl FrameCounter {
    /// `frames_in_flight` is nonzero; the device validates it before
    /// building a counter.
    pub(crate) fn new(frames_in_flight: u32) -> Self {
        debug_assert_gt!(frames_in_flight, 0);
        Self { frames_in_flight, current: AtomicU32::new(0) }
    }

    pub fn frames_in_flight(&self) -> u32 {
        self.frames_in_flight
    }

    pub fn current(&self) -> u32 {
        self.current.load(Ordering::Acquire)
    }

    /// Moves on to the next frame, wrapping around, and returns the new
    /// frame index.
    pub fn advance(&self) -> u32 {
        let frames = self.frames_in_flight.max(1);
        let prev = self.current.fetch_update(Ordering::AcqRel,
            Ordering::Acquire, |cur| Some((cur + 1) % frames));
        // The closure never returns None.
        let next = (prev.unwrap_or_else(|cur| cur) + 1) % frames;
        debug_assert_lt!(next, frames);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps() {
        let frames = FrameCounter::new(3);
        assert_eq!(frames.current(), 0);
        assert_eq!(frames.advance(), 1);
        assert_eq!(frames.advance(), 2);
        assert_eq!(frames.advance(), 0);
        assert_eq!(frames.current(), 0);
    }

    #[test]
    fn single_frame() {
        let frames = FrameCounter::new(1);
        assert_eq!(frames.advance(), 0);
        assert_eq!(frames.current(), 0);
    }
}
