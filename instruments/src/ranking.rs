//! Risk-adjusted ranking
//!
//! Two pieces of state live here, both owned by the caller:
//! - [`RiskDecayState`]: per-tier selection counters that periodically
//!   shrink every expected return in the catalog
//! - [`RankingEngine`]: orders the catalog view by expected return

use crate::catalog::Catalog;
use crate::config::DecayConfig;
use crate::error::{Result, StoreError};
use crate::instrument::RiskTier;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Per-tier decay counters
///
/// The first selection of a tier only marks it as seen; every later
/// selection advances the tier's counter, and whenever the counter reaches a
/// multiple of the tier's period all expected returns are multiplied by the
/// tier's factor. The mutation is global and cumulative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskDecayState {
    counters: [u64; 3],
    seen: [bool; 3],
}

impl RiskDecayState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a selection of `tier`, decaying `catalog` if its period is
    /// reached. Returns the factor applied, if any.
    pub fn apply(
        &mut self,
        tier: RiskTier,
        catalog: &mut Catalog,
        config: &DecayConfig,
    ) -> Option<f64> {
        let slot = tier.slot();
        let mut applied = None;

        if self.seen[slot] {
            self.counters[slot] += 1;
            let schedule = config.schedule(tier);
            if schedule.period > 0 && self.counters[slot] % u64::from(schedule.period) == 0 {
                catalog.scale_returns(schedule.factor);
                info!(
                    tier = %tier,
                    counter = self.counters[slot],
                    factor = schedule.factor,
                    "Applied risk decay to all expected returns"
                );
                applied = Some(schedule.factor);
            }
        }

        self.seen[slot] = true;
        applied
    }

    pub fn counter(&self, tier: RiskTier) -> u64 {
        self.counters[tier.slot()]
    }

    pub fn was_seen(&self, tier: RiskTier) -> bool {
        self.seen[tier.slot()]
    }

    /// Forget all counters. Returns already decayed stay decayed.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Orders the catalog view by expected return
#[derive(Debug, Clone, Default)]
pub struct RankingEngine {
    rank_cursor: usize,
}

impl RankingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort the view by descending expected return. Equal returns end up in
    /// random relative order. Advances the rank cursor.
    pub fn rank_by_return<R: Rng + ?Sized>(
        &mut self,
        catalog: &mut Catalog,
        rng: &mut R,
    ) -> Result<()> {
        if catalog.is_empty() {
            return Err(StoreError::EmptyCatalog);
        }

        let mut order = catalog.order().to_vec();
        order.shuffle(rng);
        // stable sort keeps the shuffled order among ties
        order.sort_by(|a, b| {
            let ra = catalog.get(*a).map_or(f64::NEG_INFINITY, |inv| inv.expected_return);
            let rb = catalog.get(*b).map_or(f64::NEG_INFINITY, |inv| inv.expected_return);
            rb.total_cmp(&ra)
        });
        catalog.set_order(order);

        self.rank_cursor = (self.rank_cursor + 1) % catalog.len();
        debug!(cursor = self.rank_cursor, "Ranked catalog by expected return");
        Ok(())
    }

    /// Position the next selection pass is meant to start from
    pub fn rank_cursor(&self) -> usize {
        self.rank_cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CatalogConfig;
    use crate::instrument::{InstrumentId, InstrumentRecord};
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn catalog(lines: &[&str]) -> Catalog {
        let records: Vec<_> = lines
            .iter()
            .map(|line| InstrumentRecord::from_delimited(line, ','))
            .collect();
        Catalog::load(&records, &CatalogConfig::default()).unwrap()
    }

    fn sample() -> Catalog {
        catalog(&[
            "A,Bond,100,Low,5,0.1",
            "B,Stock,200,High,12,0.4",
            "C,Stock,150,High,9,0.3",
            "D,Gold,80,Medium,6,-0.2",
        ])
    }

    fn returns(catalog: &Catalog) -> Vec<f64> {
        catalog.iter().map(|i| i.expected_return).collect()
    }

    #[test]
    fn test_first_selection_only_marks_seen() {
        let mut catalog = sample();
        let mut state = RiskDecayState::new();
        let config = DecayConfig::default();

        assert_eq!(state.apply(RiskTier::High, &mut catalog, &config), None);
        assert!(state.was_seen(RiskTier::High));
        assert_eq!(state.counter(RiskTier::High), 0);
        assert_eq!(returns(&catalog), vec![5.0, 12.0, 9.0, 6.0]);
    }

    #[test]
    fn test_high_decay_halves_every_other_repeat() {
        let mut catalog = sample();
        let mut state = RiskDecayState::new();
        let config = DecayConfig::default();

        state.apply(RiskTier::High, &mut catalog, &config);
        assert_eq!(state.apply(RiskTier::High, &mut catalog, &config), None);
        assert_eq!(state.apply(RiskTier::High, &mut catalog, &config), Some(0.5));
        assert_eq!(returns(&catalog), vec![2.5, 6.0, 4.5, 3.0]);

        state.apply(RiskTier::High, &mut catalog, &config);
        state.apply(RiskTier::High, &mut catalog, &config);
        assert_eq!(returns(&catalog), vec![1.25, 3.0, 2.25, 1.5]);
        assert_eq!(state.counter(RiskTier::High), 4);
    }

    #[test]
    fn test_decay_compounds_across_tiers() {
        let mut catalog = sample();
        let mut state = RiskDecayState::new();
        let config = DecayConfig::default();

        // Medium: seen + 4 counted selections -> one 0.75 decay
        for _ in 0..5 {
            state.apply(RiskTier::Medium, &mut catalog, &config);
        }
        // Low: seen + 9 counted selections -> one 0.9 decay
        for _ in 0..10 {
            state.apply(RiskTier::Low, &mut catalog, &config);
        }

        assert_relative_eq!(
            catalog.get(InstrumentId(1)).unwrap().expected_return,
            12.0 * 0.75 * 0.9
        );
        assert_eq!(state.counter(RiskTier::High), 0);
        assert!(!state.was_seen(RiskTier::High));
    }

    #[test]
    fn test_reset_keeps_decayed_returns() {
        let mut catalog = sample();
        let mut state = RiskDecayState::new();
        let config = DecayConfig::default();

        for _ in 0..3 {
            state.apply(RiskTier::High, &mut catalog, &config);
        }
        state.reset();
        assert_eq!(state, RiskDecayState::default());
        assert_eq!(returns(&catalog), vec![2.5, 6.0, 4.5, 3.0]);

        // after a reset the tier must be seen again before counting
        assert_eq!(state.apply(RiskTier::High, &mut catalog, &config), None);
        assert_eq!(state.counter(RiskTier::High), 0);
    }

    #[test]
    fn test_rank_by_return_sorts_descending() {
        let mut catalog = sample();
        let mut engine = RankingEngine::new();
        let mut rng = StdRng::seed_from_u64(7);

        engine.rank_by_return(&mut catalog, &mut rng).unwrap();
        let names: Vec<_> = catalog.ordered().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C", "D", "A"]);
        assert_eq!(engine.rank_cursor(), 1);
    }

    #[test]
    fn test_rank_cursor_wraps() {
        let mut catalog = sample();
        let mut engine = RankingEngine::new();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..5 {
            engine.rank_by_return(&mut catalog, &mut rng).unwrap();
        }
        assert_eq!(engine.rank_cursor(), 1);
        // rotation uses its own cursor
        assert_eq!(catalog.rotation_cursor(), 0);
    }

    #[test]
    fn test_rank_ties_form_valid_permutation() {
        let mut catalog = catalog(&[
            "A,Bond,100,Low,5,0.1",
            "B,Stock,200,High,5,0.4",
            "C,Stock,150,High,5,0.3",
            "D,Gold,80,Medium,7,-0.2",
        ]);
        let mut engine = RankingEngine::new();

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            engine.rank_by_return(&mut catalog, &mut rng).unwrap();
            let mut ids: Vec<usize> = catalog.order().iter().map(|id| id.index()).collect();
            assert_eq!(catalog.at_position(0).unwrap().name, "D");
            ids.sort_unstable();
            assert_eq!(ids, vec![0, 1, 2, 3]);
        }
    }

    #[test]
    fn test_rank_same_seed_is_deterministic() {
        let lines = ["A,Bond,100,Low,5,0.1", "B,Stock,200,High,5,0.4", "C,Stock,150,High,5,0.3"];
        let mut first = catalog(&lines);
        let mut second = catalog(&lines);

        RankingEngine::new()
            .rank_by_return(&mut first, &mut StdRng::seed_from_u64(99))
            .unwrap();
        RankingEngine::new()
            .rank_by_return(&mut second, &mut StdRng::seed_from_u64(99))
            .unwrap();
        assert_eq!(first.order(), second.order());
    }

    #[test]
    fn test_rank_empty_catalog() {
        let mut catalog = Catalog::default();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            RankingEngine::new().rank_by_return(&mut catalog, &mut rng),
            Err(StoreError::EmptyCatalog)
        ));
    }

    proptest! {
        #[test]
        fn prop_decay_follows_period(
            tier in proptest::sample::select(RiskTier::ALL.to_vec()),
            k in 0u32..40,
        ) {
            let mut catalog = sample();
            let before = returns(&catalog);
            let mut state = RiskDecayState::new();
            let config = DecayConfig::default();
            let schedule = config.schedule(tier);

            for _ in 0..k {
                state.apply(tier, &mut catalog, &config);
            }

            // the first selection only marks the tier
            let fired = k.saturating_sub(1) / schedule.period;
            let scale = schedule.factor.powi(fired as i32);
            for (after, original) in returns(&catalog).into_iter().zip(before) {
                let expected = original * scale;
                prop_assert!((after - expected).abs() <= 1e-9 * expected.abs().max(1.0));
            }
            prop_assert_eq!(state.counter(tier), u64::from(k.saturating_sub(1)));
        }
    }
}
