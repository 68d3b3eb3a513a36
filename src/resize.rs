//! Workspace capacity policy: power-of-two growth and shrink with
//! quarter-full hysteresis.
//!
//! Pure arithmetic, shared by the stack and the hash map. A limit only ever
//! moves to the next power of two up or down, so capacities stay cheap to
//! mask against and resize churn is bounded.

/// Minimum workspace capacity; shrinking never goes below this.
pub(crate) const MIN_ELEMS: usize = 4;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum ResizeOp {
    Grow,
    Shrink,
}

/// Next capacity for a workspace currently at `limit`: round up to a power
/// of two, then double or halve.
pub(crate) fn next_limit(limit: usize, op: ResizeOp) -> usize {
    let pow2 = limit.next_power_of_two();
    match op {
        ResizeOp::Grow => pow2 * 2,
        ResizeOp::Shrink => pow2 / 2,
    }
}

/// Shrink target after a removal, or `None` when the container should keep
/// its workspace.
///
/// Two conditions gate the shrink: the halved candidate must stay at or
/// above [`MIN_ELEMS`], and usage must be strictly below a quarter of the
/// current limit. The quarter-full rule leaves headroom so a shrink is not
/// immediately undone by the next insert.
pub(crate) fn shrink_target(elems_curr: usize, elems_limit: usize) -> Option<usize> {
    let candidate = next_limit(elems_limit, ResizeOp::Shrink);
    if candidate < MIN_ELEMS {
        return None;
    }
    if elems_curr < elems_limit / 4 {
        Some(candidate)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grow_doubles_a_power_of_two() {
        assert_eq!(next_limit(4, ResizeOp::Grow), 8);
        assert_eq!(next_limit(8, ResizeOp::Grow), 16);
        assert_eq!(next_limit(1024, ResizeOp::Grow), 2048);
    }

    #[test]
    fn shrink_halves_a_power_of_two() {
        assert_eq!(next_limit(8, ResizeOp::Shrink), 4);
        assert_eq!(next_limit(4, ResizeOp::Shrink), 2);
        assert_eq!(next_limit(2048, ResizeOp::Shrink), 1024);
    }

    #[test]
    fn odd_limits_round_up_before_stepping() {
        assert_eq!(next_limit(5, ResizeOp::Grow), 16);
        assert_eq!(next_limit(5, ResizeOp::Shrink), 4);
        assert_eq!(next_limit(9, ResizeOp::Shrink), 8);
    }

    #[test]
    fn shrink_trigger_is_strictly_quarter_full() {
        // limit 16: quarter is 4; exactly 4 live elements must not shrink.
        assert_eq!(shrink_target(4, 16), None);
        assert_eq!(shrink_target(3, 16), Some(8));
        assert_eq!(shrink_target(0, 16), Some(8));
    }

    #[test]
    fn shrink_never_undershoots_the_minimum() {
        assert_eq!(shrink_target(0, MIN_ELEMS), None);
        assert_eq!(shrink_target(1, 8), Some(4));
        assert_eq!(shrink_target(0, 8), Some(4));
    }
}
