// Mix-wide progress aggregation
//
// Tracks in a mix may have different lengths. Progress is measured against the
// longest one, and the mix counts as playing while any layer is still sounding.

use serde::Serialize;

use crate::audio::resource::PlaybackStatus;

/// Last known playback state of one loaded track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrackStatus {
    pub position_ms: u64,
    pub duration_ms: u64,
    pub is_playing: bool,
}

impl From<PlaybackStatus> for TrackStatus {
    fn from(status: PlaybackStatus) -> Self {
        Self {
            position_ms: status.position_ms,
            duration_ms: status.duration_ms,
            is_playing: status.is_playing,
        }
    }
}

/// Derived mix-wide values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Aggregate {
    /// Fraction of the longest track played, in [0, 1]
    pub progress: f64,
    pub is_playing: bool,
}

/// Fold track statuses into the mix aggregate. Order independent.
pub fn aggregate<'a, I>(statuses: I) -> Aggregate
where
    I: IntoIterator<Item = &'a TrackStatus>,
{
    let mut max_position = 0u64;
    let mut max_duration = 0u64;
    let mut is_playing = false;

    for status in statuses {
        max_position = max_position.max(status.position_ms);
        max_duration = max_duration.max(status.duration_ms);
        is_playing |= status.is_playing;
    }

    let progress = if max_duration > 0 {
        (max_position as f64 / max_duration as f64).min(1.0)
    } else {
        0.0
    };

    Aggregate {
        progress,
        is_playing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(position_ms: u64, duration_ms: u64, is_playing: bool) -> TrackStatus {
        TrackStatus {
            position_ms,
            duration_ms,
            is_playing,
        }
    }

    #[test]
    fn test_progress_against_longest_track() {
        let statuses = [status(500, 1000, true), status(800, 2000, false)];
        let result = aggregate(&statuses);
        assert!((result.progress - 0.4).abs() < 1e-9);
        assert!(result.is_playing);
    }

    #[test]
    fn test_order_does_not_matter() {
        let a = status(500, 1000, false);
        let b = status(800, 2000, false);
        let c = status(1900, 1500, true);

        let orders = [
            [a, b, c],
            [a, c, b],
            [b, a, c],
            [b, c, a],
            [c, a, b],
            [c, b, a],
        ];
        let expected = aggregate(&orders[0]);
        for order in &orders[1..] {
            assert_eq!(aggregate(order), expected);
        }
        assert!((expected.progress - 0.95).abs() < 1e-9);
        assert!(expected.is_playing);
    }

    #[test]
    fn test_empty_mix() {
        let result = aggregate(std::iter::empty());
        assert_eq!(result.progress, 0.0);
        assert!(!result.is_playing);
    }

    #[test]
    fn test_unknown_duration_is_zero_progress() {
        let result = aggregate(&[status(1200, 0, true)]);
        assert_eq!(result.progress, 0.0);
        assert!(result.is_playing);
    }

    #[test]
    fn test_progress_is_clamped() {
        let result = aggregate(&[status(3000, 2000, false)]);
        assert_eq!(result.progress, 1.0);
    }

    #[test]
    fn test_finished_short_layer_keeps_mix_playing() {
        // Short layer finished and stopped, long layer still going
        let result = aggregate(&[status(1000, 1000, false), status(1500, 4000, true)]);
        assert!(result.is_playing);
        assert!((result.progress - 0.375).abs() < 1e-9);
    }
}
