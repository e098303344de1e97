// Stop predicates for the heading-hold loop.
//
// A predicate is a zero-argument closure owning whatever state it needs;
// the drive loop calls it once per iteration and keeps going while it
// returns true.

use std::time::{Duration, Instant};

use super::WheelEncoder;
use crate::BoxError;

/// Keep going until the drive wheel has covered `distance_degrees` of
/// shaft rotation from its position at construction time.
///
/// Works in magnitudes, so the same predicate serves forward and reverse
/// travel. An encoder read failure stops the run (the predicate returns
/// false) rather than letting the base drift on.
pub fn for_distance<E>(
    mut encoder: E,
    distance_degrees: i32,
) -> Result<impl FnMut() -> bool, BoxError>
where
    E: WheelEncoder,
{
    let initial = encoder.position_degrees()?.abs();
    let target = distance_degrees.abs();
    Ok(move || {
        let Ok(position) = encoder.position_degrees() else {
            return false;
        };
        (position.abs() - initial).abs() < target
    })
}

/// Keep going until `limit` has elapsed since construction.
pub fn for_duration(limit: Duration) -> impl FnMut() -> bool {
    let started = Instant::now();
    move || started.elapsed() < limit
}

/// Keep going for exactly `n` iterations.
pub fn for_iterations(n: u32) -> impl FnMut() -> bool {
    let mut remaining = n;
    move || {
        if remaining == 0 {
            false
        } else {
            remaining -= 1;
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    /// Replays a scripted position sequence, repeating the last value —
    /// or erroring once the script runs dry when `fail_when_empty` is set.
    struct FakeEncoder {
        positions: VecDeque<i32>,
        last: i32,
        fail_when_empty: bool,
    }

    impl FakeEncoder {
        fn new(positions: &[i32]) -> Self {
            Self {
                positions: positions.iter().copied().collect(),
                last: 0,
                fail_when_empty: false,
            }
        }

        fn failing_after(positions: &[i32]) -> Self {
            Self {
                fail_when_empty: true,
                ..Self::new(positions)
            }
        }
    }

    impl WheelEncoder for FakeEncoder {
        fn position_degrees(&mut self) -> Result<i32, BoxError> {
            match self.positions.pop_front() {
                Some(position) => {
                    self.last = position;
                    Ok(position)
                }
                None if self.fail_when_empty => Err("encoder offline".into()),
                None => Ok(self.last),
            }
        }
    }

    #[test]
    fn test_distance_predicate_snapshots_initial_position() {
        // Snapshot at 100; covered distance reaches 360 on the last read.
        let encoder = FakeEncoder::new(&[100, 150, 240, 300, 460]);
        let mut keep_going = for_distance(encoder, 360).unwrap();

        assert!(keep_going());
        assert!(keep_going());
        assert!(keep_going());
        assert!(!keep_going());
    }

    #[test]
    fn test_distance_predicate_handles_reverse_travel() {
        let encoder = FakeEncoder::new(&[-100, -300, -500]);
        let mut keep_going = for_distance(encoder, 360).unwrap();

        assert!(keep_going());
        assert!(!keep_going());
    }

    #[test]
    fn test_distance_predicate_stops_on_encoder_failure() {
        // Construction snapshot succeeds, every later read fails.
        let encoder = FakeEncoder::failing_after(&[0]);
        let mut keep_going = for_distance(encoder, 360).unwrap();

        assert!(!keep_going());
    }

    #[test]
    fn test_distance_predicate_construction_fails_without_encoder() {
        assert!(for_distance(FakeEncoder::failing_after(&[]), 360).is_err());
    }

    #[test]
    fn test_duration_predicate_expires() {
        let mut keep_going = for_duration(Duration::ZERO);
        assert!(!keep_going());
    }

    #[test]
    fn test_iteration_predicate_counts_down() {
        let mut keep_going = for_iterations(2);
        assert!(keep_going());
        assert!(keep_going());
        assert!(!keep_going());
        assert!(!keep_going());
    }
}
