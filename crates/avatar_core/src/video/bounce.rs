//! Forward/reverse frame ordering.
//!
//! For a clip of `F` frames the order is:
//!
//! ```text
//! 0 1 .. F-1 | F-2 .. 1 | 0 1 .. F-1 | F-2 .. 1 | ...
//! ```
//!
//! Reverse segments drop both endpoints so no frame is shown twice at a
//! turn. The sequence stops as soon as the target count is reached, even
//! inside a segment.

/// Index cursor producing the bounce order.
#[derive(Debug, Clone)]
pub struct BouncePlan {
    frame_count: usize,
    len: usize,
    position: usize,
}

impl BouncePlan {
    /// Plan covering `target` frames from a clip of `frame_count` frames.
    ///
    /// The whole first forward pass is always emitted, so the plan is never
    /// shorter than the clip.
    pub fn new(frame_count: usize, target: usize) -> Self {
        let len = if frame_count == 0 {
            0
        } else {
            frame_count.max(target)
        };
        Self {
            frame_count,
            len,
            position: 0,
        }
    }

    /// Plan of exactly `target` frames (at least one), cutting the first
    /// forward pass short when the clip already covers the target.
    pub fn truncated(frame_count: usize, target: usize) -> Self {
        let len = if frame_count == 0 { 0 } else { target.max(1) };
        Self {
            frame_count,
            len,
            position: 0,
        }
    }

    /// Total number of indices the plan yields.
    pub fn total(&self) -> usize {
        self.len
    }

    /// Source index of output frame `n`.
    fn index_at(&self, n: usize) -> usize {
        let f = self.frame_count;
        if n < f {
            return n;
        }
        if f == 1 {
            return 0;
        }

        let reverse_len = f - 2;
        let cycle = reverse_len + f;
        let k = (n - f) % cycle;
        if k < reverse_len {
            f - 2 - k
        } else {
            k - reverse_len
        }
    }
}

impl Iterator for BouncePlan {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.position >= self.len {
            return None;
        }
        let index = self.index_at(self.position);
        self.position += 1;
        Some(index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.position;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for BouncePlan {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounces_without_repeating_turn_frames() {
        let order: Vec<usize> = BouncePlan::new(4, 12).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 2, 1, 0, 1, 2, 3, 2, 1]);

        for pair in order.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn stops_mid_segment() {
        let order: Vec<usize> = BouncePlan::new(5, 7).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4, 3, 2]);
    }

    #[test]
    fn first_pass_is_always_complete() {
        let plan = BouncePlan::new(50, 10);
        assert_eq!(plan.len(), 50);
        assert_eq!(plan.collect::<Vec<_>>(), (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn truncated_plan_hits_target_exactly() {
        assert_eq!(BouncePlan::truncated(50, 10).collect::<Vec<_>>(), (0..10).collect::<Vec<_>>());
        assert_eq!(BouncePlan::truncated(3, 6).collect::<Vec<_>>(), vec![0, 1, 2, 1, 0, 1]);
        assert_eq!(BouncePlan::truncated(3, 0).total(), 1);
    }

    #[test]
    fn two_second_clip_covers_four_seconds() {
        // 50 frames at 25 fps, 4 s of audio
        let plan = BouncePlan::new(50, 100);
        assert_eq!(plan.total(), 100);
        let order: Vec<usize> = plan.collect();
        assert_eq!(order[49], 49);
        assert_eq!(order[50], 48);
        assert_eq!(order[97], 1);
        assert_eq!(order[98], 0);
    }

    #[test]
    fn degenerate_clips() {
        assert_eq!(BouncePlan::new(1, 3).collect::<Vec<_>>(), vec![0, 0, 0]);
        assert_eq!(BouncePlan::new(2, 5).collect::<Vec<_>>(), vec![0, 1, 0, 1, 0]);
        assert_eq!(BouncePlan::new(0, 5).count(), 0);
    }

    #[test]
    fn plans_are_deterministic() {
        let a: Vec<usize> = BouncePlan::new(7, 40).collect();
        let b: Vec<usize> = BouncePlan::new(7, 40).collect();
        assert_eq!(a, b);
    }
}
