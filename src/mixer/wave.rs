// Waveform indicator
// Bar heights are seeded from the current selection so each mix gets a
// stable shape; bars fill from the left as the mix progresses.

use std::collections::BTreeSet;

/// Default number of bars in the indicator
pub const DEFAULT_BAR_COUNT: usize = 28;

const EMPTY_SEED: &str = "empty";

/// Seed string for a selection: sorted ids joined with `|`.
pub fn selection_seed<'a, I>(ids: I) -> String
where
    I: IntoIterator<Item = &'a String>,
{
    let sorted: BTreeSet<&str> = ids.into_iter().map(String::as_str).collect();
    if sorted.is_empty() {
        return EMPTY_SEED.to_string();
    }
    sorted.into_iter().collect::<Vec<_>>().join("|")
}

/// Deterministic bar heights in [0.2, 1] for `seed`.
pub fn seeded_wave(seed: &str, count: usize) -> Vec<f32> {
    let mut state: u32 = 0;
    for unit in seed.encode_utf16() {
        state = state.wrapping_mul(31).wrapping_add(u32::from(unit));
    }

    let mut next = || {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        f64::from(state % 1000) / 1000.0
    };

    let raw: Vec<f64> = (0..count).map(|_| 0.35 + next() * 0.65).collect();

    (0..count)
        .map(|i| {
            let a = raw[i.saturating_sub(1)];
            let b = raw[i];
            let c = raw[(i + 1).min(count - 1)];
            ((a + 2.0 * b + c) / 4.0).clamp(0.2, 1.0) as f32
        })
        .collect()
}

/// Number of bars to draw as played.
pub fn filled_bars(progress: f64, count: usize) -> usize {
    let filled = (progress.clamp(0.0, 1.0) * count as f64).floor() as usize;
    filled.min(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wave_is_deterministic() {
        assert_eq!(seeded_wave("gulls|ship_bell", 28), seeded_wave("gulls|ship_bell", 28));
    }

    #[test]
    fn test_wave_shape() {
        for seed in ["empty", "gulls", "blacksmith_hammer|coin_clinking|dog_barking"] {
            let wave = seeded_wave(seed, DEFAULT_BAR_COUNT);
            assert_eq!(wave.len(), DEFAULT_BAR_COUNT);
            assert!(wave.iter().all(|h| (0.2..=1.0).contains(h)), "{seed}: {wave:?}");
        }
    }

    #[test]
    fn test_different_selections_differ() {
        assert_ne!(seeded_wave("gulls", 28), seeded_wave("ship_bell", 28));
    }

    #[test]
    fn test_zero_bars() {
        assert!(seeded_wave("gulls", 0).is_empty());
    }

    #[test]
    fn test_selection_seed_is_sorted() {
        let ids = vec!["waves_splash".to_string(), "gulls".to_string()];
        assert_eq!(selection_seed(&ids), "gulls|waves_splash");
        assert_eq!(selection_seed(&Vec::new()), "empty");
    }

    #[test]
    fn test_filled_bars() {
        assert_eq!(filled_bars(0.0, 28), 0);
        assert_eq!(filled_bars(0.4, 28), 11);
        assert_eq!(filled_bars(0.999, 28), 27);
        assert_eq!(filled_bars(1.0, 28), 28);
        assert_eq!(filled_bars(1.5, 28), 28);
    }
}
