//! Weighted random choice among candidate sounds.

use super::Sound;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex, PoisonError};

/// Walk `candidates` accumulating weights and return the first sound whose
/// running total exceeds `roll`.
///
/// `roll` is expected in `[0, sum of weights)`. Returns `None` for an empty
/// slice or an out-of-range roll.
pub fn pick_weighted<S: AsRef<Sound>>(candidates: &[S], roll: u64) -> Option<&S> {
    let mut running = 0u64;
    candidates.iter().find(|sound| {
        running += u64::from(sound.as_ref().weight);
        roll < running
    })
}

/// Picks one sound with probability `weight / total_weight`.
///
/// Owns a single generator seeded once at construction.
pub struct WeightedSelector {
    rng: Mutex<StdRng>,
}

impl WeightedSelector {
    /// Selector seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Selector with a fixed seed, for reproducible draws.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Build from an optional configured seed.
    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map(Self::seeded).unwrap_or_default()
    }

    /// Choose one of `candidates`. `None` only when `candidates` is empty.
    pub fn select(&self, candidates: &[Arc<Sound>]) -> Option<Arc<Sound>> {
        match candidates {
            [] => None,
            [only] => Some(Arc::clone(only)),
            _ => {
                let total: u64 = candidates.iter().map(|s| u64::from(s.weight)).sum();
                let roll = self
                    .rng
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .gen_range(0..total);
                pick_weighted(candidates, roll).cloned()
            }
        }
    }
}

impl Default for WeightedSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WeightedSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeightedSelector").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sound::AudioRef;
    use proptest::prelude::*;

    fn sound(name: &str, weight: u32) -> Arc<Sound> {
        Arc::new(Sound::new(name, AudioRef::File(format!("{name}.dca").into()), weight))
    }

    fn abc() -> Vec<Arc<Sound>> {
        vec![sound("a", 10), sound("b", 20), sound("c", 70)]
    }

    #[test]
    fn test_boundary_rolls() {
        let candidates = abc();
        let name = |roll| pick_weighted(&candidates, roll).map(|s| s.name.clone());

        assert_eq!(name(0).as_deref(), Some("a"));
        assert_eq!(name(9).as_deref(), Some("a"));
        assert_eq!(name(10).as_deref(), Some("b"));
        assert_eq!(name(29).as_deref(), Some("b"));
        assert_eq!(name(30).as_deref(), Some("c"));
        assert_eq!(name(99).as_deref(), Some("c"));
        assert_eq!(name(100), None);
    }

    #[test]
    fn test_uniform_rolls_match_weights_exactly() {
        let candidates = abc();
        let mut counts = [0usize; 3];
        for _ in 0..1000 {
            for roll in 0..100 {
                let picked = pick_weighted(&candidates, roll).unwrap();
                let idx = candidates.iter().position(|c| Arc::ptr_eq(c, picked)).unwrap();
                counts[idx] += 1;
            }
        }
        assert_eq!(counts, [10_000, 20_000, 70_000]);
    }

    #[test]
    fn test_empirical_frequencies_converge() {
        let selector = WeightedSelector::seeded(0xA1_2B0E);
        let candidates = abc();
        let draws = 100_000;
        let mut counts = [0usize; 3];

        for _ in 0..draws {
            let picked = selector.select(&candidates).unwrap();
            let idx = candidates.iter().position(|c| c.name == picked.name).unwrap();
            counts[idx] += 1;
        }

        for (count, expected) in counts.iter().zip([0.10, 0.20, 0.70]) {
            let freq = *count as f64 / draws as f64;
            assert!(
                (freq - expected).abs() < 0.01,
                "frequency {freq} too far from {expected}"
            );
        }
    }

    #[test]
    fn test_single_candidate_always_returned() {
        let selector = WeightedSelector::new();
        let only = vec![sound("solo", 1)];
        for _ in 0..50 {
            assert_eq!(selector.select(&only).unwrap().name, "solo");
        }
    }

    #[test]
    fn test_empty_candidates() {
        let selector = WeightedSelector::new();
        assert!(selector.select(&[]).is_none());
        assert!(pick_weighted::<Arc<Sound>>(&[], 0).is_none());
    }

    proptest! {
        #[test]
        fn prop_pick_lands_in_its_weight_window(
            weights in prop::collection::vec(1u32..500, 1..20),
            seed in any::<u64>(),
        ) {
            let candidates: Vec<Arc<Sound>> = weights
                .iter()
                .enumerate()
                .map(|(i, w)| sound(&i.to_string(), *w))
                .collect();
            let total: u64 = weights.iter().map(|w| u64::from(*w)).sum();
            let roll = seed % total;

            let picked = pick_weighted(&candidates, roll).unwrap();
            let idx = candidates.iter().position(|c| Arc::ptr_eq(c, picked)).unwrap();
            let lower: u64 = weights[..idx].iter().map(|w| u64::from(*w)).sum();
            let upper = lower + u64::from(weights[idx]);
            prop_assert!(lower <= roll && roll < upper);
        }
    }
}
