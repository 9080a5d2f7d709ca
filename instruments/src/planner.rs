//! Allocation planner
//!
//! Splits a budget across instruments in one of two modes:
//! - automatic (`recommend`): tier-matched picks, one per category, each
//!   getting a random 15-25% slice of what is left (capped at the price)
//! - manual (`choose` / [`ManualSession`]): caller-picked ids and amounts,
//!   checked only against the remaining budget unless tier enforcement is on
//!
//! Both modes keep `remaining = initial - invested` at all times.

use crate::catalog::Catalog;
use crate::config::{CandidateOrder, PlannerConfig, SelectionMode};
use crate::error::{Result, StoreError};
use crate::instrument::{Instrument, InstrumentId, RiskTier};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// One allocation: a snapshot of the instrument at selection time and the
/// amount put into it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioEntry {
    pub instrument: Instrument,
    pub amount_invested: f64,
}

impl PortfolioEntry {
    /// Expected annual return of this entry in currency units
    pub fn expected_return(&self) -> f64 {
        self.instrument.expected_return / 100.0 * self.amount_invested
    }
}

/// Aggregate figures for a portfolio
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub total_invested: f64,

    /// Σ return% / 100 × amount
    pub expected_return: f64,

    /// Expected return as a percentage of the amount invested; 0 when
    /// nothing was invested
    pub return_pct: f64,
}

/// Session-scoped set of allocations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub tier: RiskTier,
    pub mode: SelectionMode,
    pub initial_budget: f64,
    pub entries: Vec<PortfolioEntry>,
    pub created_at: DateTime<Utc>,
}

impl Portfolio {
    fn new(tier: RiskTier, mode: SelectionMode, budget: f64) -> Self {
        Self {
            tier,
            mode,
            initial_budget: budget,
            entries: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_invested(&self) -> f64 {
        self.entries.iter().map(|e| e.amount_invested).sum()
    }

    pub fn remaining_budget(&self) -> f64 {
        self.initial_budget - self.total_invested()
    }

    pub fn contains_category(&self, category: &str) -> bool {
        self.entries.iter().any(|e| e.instrument.category == category)
    }

    pub fn summary(&self) -> PortfolioSummary {
        let total_invested = self.total_invested();
        let expected_return: f64 = self.entries.iter().map(PortfolioEntry::expected_return).sum();
        let return_pct = if total_invested > 0.0 {
            expected_return / total_invested * 100.0
        } else {
            0.0
        };

        PortfolioSummary {
            total_invested,
            expected_return,
            return_pct,
        }
    }

    fn push(&mut self, instrument: Instrument, amount: f64) {
        self.entries.push(PortfolioEntry {
            instrument,
            amount_invested: amount,
        });
    }
}

/// Result of a whole manual run
#[derive(Debug)]
pub struct ManualOutcome {
    pub portfolio: Portfolio,

    /// Rejected selections by position in the input, with the reason
    pub rejections: Vec<(usize, StoreError)>,

    /// Selections never looked at because the budget ran out
    pub skipped: usize,
}

/// Incremental manual selection, one pick at a time
#[derive(Debug, Clone)]
pub struct ManualSession {
    portfolio: Portfolio,
    enforce_risk_match: bool,
}

impl ManualSession {
    /// Add `amount` of instrument `id`.
    ///
    /// Every failure leaves the session unchanged, so the caller can simply
    /// ask again.
    pub fn select(
        &mut self,
        catalog: &Catalog,
        id: InstrumentId,
        amount: f64,
    ) -> Result<&PortfolioEntry> {
        let instrument = catalog.get(id)?;

        if !amount.is_finite() || amount < 0.0 {
            return Err(StoreError::InvalidAmount(amount));
        }

        let remaining = self.remaining_budget();
        if amount > remaining {
            return Err(StoreError::InsufficientBudget {
                requested: amount,
                remaining,
            });
        }

        if self.enforce_risk_match && instrument.risk_level != self.portfolio.tier {
            return Err(StoreError::RiskTierMismatch {
                expected: self.portfolio.tier,
                actual: instrument.risk_level,
            });
        }

        debug!(
            name = %instrument.name,
            amount,
            remaining = remaining - amount,
            "Manual selection accepted"
        );
        self.portfolio.push(instrument.clone(), amount);

        let last = self.portfolio.entries.len() - 1;
        Ok(&self.portfolio.entries[last])
    }

    pub fn remaining_budget(&self) -> f64 {
        self.portfolio.remaining_budget()
    }

    /// No budget left to allocate
    pub fn is_exhausted(&self) -> bool {
        self.remaining_budget() <= 0.0
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn finish(self) -> Portfolio {
        self.portfolio
    }
}

#[derive(Debug, Clone, Default)]
pub struct AllocationPlanner {
    config: PlannerConfig,
}

impl AllocationPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Build a diversified portfolio for `tier` automatically.
    ///
    /// Visits N candidates (N = catalog size), either by uniform random draw
    /// over the current view or in view order, accepting an instrument when
    /// its tier matches and its category is not yet in the portfolio.
    pub fn recommend<R: Rng + ?Sized>(
        &self,
        catalog: &Catalog,
        tier: RiskTier,
        budget: f64,
        rng: &mut R,
    ) -> Result<Portfolio> {
        validate_budget(budget)?;
        if catalog.is_empty() {
            return Err(StoreError::EmptyCatalog);
        }
        if self.config.min_fraction_pct > self.config.max_fraction_pct {
            return Err(StoreError::ConfigError(format!(
                "planner fraction bounds {}..={} are out of order",
                self.config.min_fraction_pct, self.config.max_fraction_pct
            )));
        }

        let n = catalog.len();
        let mut portfolio = Portfolio::new(tier, SelectionMode::Recommend, budget);
        let mut categories: HashSet<&str> = HashSet::new();
        let mut remaining = budget;

        for step in 0..n {
            if remaining <= 0.0 {
                break;
            }

            let position = match self.config.candidate_order {
                CandidateOrder::RandomPick => rng.gen_range(0..n),
                CandidateOrder::Ranked => step,
            };
            let Some(candidate) = catalog.at_position(position) else {
                continue;
            };

            if candidate.risk_level != tier || categories.contains(candidate.category.as_str()) {
                continue;
            }

            let pct = rng.gen_range(self.config.min_fraction_pct..=self.config.max_fraction_pct);
            let amount = (remaining * f64::from(pct) / 100.0).min(candidate.price);

            categories.insert(candidate.category.as_str());
            portfolio.push(candidate.clone(), amount);
            remaining = portfolio.remaining_budget();

            debug!(
                name = %candidate.name,
                category = %candidate.category,
                pct,
                amount,
                remaining,
                "Recommended instrument"
            );
        }

        info!(
            tier = %tier,
            budget,
            picks = portfolio.len(),
            invested = portfolio.total_invested(),
            "Recommendation complete"
        );
        Ok(portfolio)
    }

    /// Open a manual session for `tier` with `budget`
    pub fn start_manual(&self, tier: RiskTier, budget: f64) -> Result<ManualSession> {
        validate_budget(budget)?;
        Ok(ManualSession {
            portfolio: Portfolio::new(tier, SelectionMode::Choose, budget),
            enforce_risk_match: self.config.enforce_risk_match_in_manual_mode,
        })
    }

    /// Run a sequence of manual selections.
    ///
    /// Rejected selections are collected and the run continues; the run
    /// stops early once the budget is used up.
    pub fn choose<I>(
        &self,
        catalog: &Catalog,
        tier: RiskTier,
        budget: f64,
        selections: I,
    ) -> Result<ManualOutcome>
    where
        I: IntoIterator<Item = (InstrumentId, f64)>,
    {
        if catalog.is_empty() {
            return Err(StoreError::EmptyCatalog);
        }

        let mut session = self.start_manual(tier, budget)?;
        let mut rejections = Vec::new();
        let mut skipped = 0;

        for (position, (id, amount)) in selections.into_iter().enumerate() {
            if session.is_exhausted() {
                skipped += 1;
                continue;
            }
            if let Err(e) = session.select(catalog, id, amount) {
                warn!(position, id = %id, amount, error = %e, "Manual selection rejected");
                rejections.push((position, e));
            }
        }

        let portfolio = session.finish();
        info!(
            tier = %tier,
            budget,
            picks = portfolio.len(),
            rejected = rejections.len(),
            "Manual selection complete"
        );

        Ok(ManualOutcome {
            portfolio,
            rejections,
            skipped,
        })
    }
}

pub(crate) fn validate_budget(budget: f64) -> Result<()> {
    if budget.is_finite() && budget > 0.0 {
        Ok(())
    } else {
        Err(StoreError::InvalidBudget(budget))
    }
}
