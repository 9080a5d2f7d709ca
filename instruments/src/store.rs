//! Instrument store
//!
//! Owns the catalog and both indexes built over it, the risk decay state
//! and the random source, and runs the session flow:
//! decay for the chosen tier, then ranking and automatic planning, or manual
//! selection.

use crate::catalog::Catalog;
use crate::config::{DecayLifecycle, SelectionMode, StoreConfig};
use crate::error::{Result, StoreError};
use crate::graph::{Correlation, CorrelationGraph};
use crate::instrument::{parse_delimited, InstrumentId, InstrumentRecord, RiskTier};
use crate::planner::{validate_budget, AllocationPlanner, ManualOutcome, ManualSession, Portfolio};
use crate::price_index::PriceIndex;
use crate::ranking::{RankingEngine, RiskDecayState};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Everything one session asks of the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRequest {
    pub tier: RiskTier,
    pub budget: f64,
    pub mode: SelectionMode,

    /// Manual picks; ignored in `Recommend` mode
    #[serde(default)]
    pub selections: Vec<(InstrumentId, f64)>,
}

#[derive(Debug)]
pub enum SessionOutcome {
    Recommended(Portfolio),
    Chosen(ManualOutcome),
}

impl SessionOutcome {
    pub fn portfolio(&self) -> &Portfolio {
        match self {
            SessionOutcome::Recommended(portfolio) => portfolio,
            SessionOutcome::Chosen(outcome) => &outcome.portfolio,
        }
    }
}

/// Indexed instrument store
pub struct InstrumentStore {
    config: StoreConfig,
    catalog: Catalog,
    price_index: PriceIndex,
    graph: CorrelationGraph,
    decay: RiskDecayState,
    ranking: RankingEngine,
    planner: AllocationPlanner,
    rng: StdRng,
}

impl InstrumentStore {
    /// Build the catalog and both indexes from parsed rows
    pub fn load(records: &[InstrumentRecord], config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let catalog = Catalog::load(records, &config.catalog)?;

        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut store = Self {
            planner: AllocationPlanner::new(config.planner.clone()),
            config,
            catalog: Catalog::default(),
            price_index: PriceIndex::new(),
            graph: CorrelationGraph::default(),
            decay: RiskDecayState::new(),
            ranking: RankingEngine::new(),
            rng,
        };
        store.install(catalog);
        Ok(store)
    }

    /// Build from delimited text using the configured delimiter and header
    /// policy
    ///
    /// # Example
    ///
    /// ```
    /// use ag_instruments::{InstrumentStore, StoreConfig};
    ///
    /// let csv = "Name,Type,Price,Risk,Return,Correlation\nA,Bond,100,Low,5,0.1\n";
    /// let store = InstrumentStore::from_delimited(csv, StoreConfig::default()).unwrap();
    /// assert_eq!(store.catalog().len(), 1);
    /// ```
    pub fn from_delimited(text: &str, config: StoreConfig) -> Result<Self> {
        let records = parse_delimited(text, config.catalog.delimiter, config.catalog.header);
        Self::load(&records, config)
    }

    /// Load a delimited file from disk
    pub fn from_delimited_file(path: &str, config: StoreConfig) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_delimited(&text, config)
    }

    /// Replace the random source (e.g. a fixed seed in tests)
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Rebuild everything from new rows. On error the current contents are
    /// kept. Decay counters survive unless sessions reset them anyway.
    pub fn reload(&mut self, records: &[InstrumentRecord]) -> Result<()> {
        let catalog = Catalog::load(records, &self.config.catalog)?;
        self.install(catalog);
        Ok(())
    }

    fn install(&mut self, catalog: Catalog) {
        self.price_index = PriceIndex::build(&catalog);
        self.graph = CorrelationGraph::build(&catalog);
        self.ranking = RankingEngine::new();
        self.catalog = catalog;

        info!(
            instruments = self.catalog.len(),
            indexed_prices = self.price_index.len(),
            edges = self.graph.edge_count(),
            "Instrument store built"
        );
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn price_index(&self) -> &PriceIndex {
        &self.price_index
    }

    pub fn graph(&self) -> &CorrelationGraph {
        &self.graph
    }

    pub fn decay_state(&self) -> &RiskDecayState {
        &self.decay
    }

    pub fn reset_decay_state(&mut self) {
        self.decay.reset();
    }

    pub fn rank_cursor(&self) -> usize {
        self.ranking.rank_cursor()
    }

    /// Correlations of the instrument called `name` with every other one
    pub fn correlates_with(&self, name: &str) -> Result<impl Iterator<Item = Correlation<'_>>> {
        self.graph.correlates_with(&self.catalog, name)
    }

    pub fn rank_by_return(&mut self) -> Result<()> {
        self.ranking.rank_by_return(&mut self.catalog, &mut self.rng)
    }

    pub fn rotate(&mut self) {
        self.catalog.rotate();
    }

    /// Decay bookkeeping that opens every session
    fn begin_session(&mut self, tier: RiskTier, budget: f64) -> Result<()> {
        validate_budget(budget)?;
        if self.catalog.is_empty() {
            return Err(StoreError::EmptyCatalog);
        }

        if self.config.decay.lifecycle == DecayLifecycle::PerSession {
            self.decay.reset();
        }
        let applied = self.decay.apply(tier, &mut self.catalog, &self.config.decay);
        debug!(tier = %tier, budget, decay = ?applied, "Session started");
        Ok(())
    }

    /// Automatic mode: decay, rank, then plan
    pub fn recommend(&mut self, tier: RiskTier, budget: f64) -> Result<Portfolio> {
        self.begin_session(tier, budget)?;
        self.ranking.rank_by_return(&mut self.catalog, &mut self.rng)?;
        self.planner.recommend(&self.catalog, tier, budget, &mut self.rng)
    }

    /// Manual mode over a full list of picks
    pub fn choose<I>(&mut self, tier: RiskTier, budget: f64, selections: I) -> Result<ManualOutcome>
    where
        I: IntoIterator<Item = (InstrumentId, f64)>,
    {
        self.begin_session(tier, budget)?;
        self.planner.choose(&self.catalog, tier, budget, selections)
    }

    /// Manual mode driven pick by pick; pass [`InstrumentStore::catalog`] to
    /// [`ManualSession::select`]
    pub fn start_manual(&mut self, tier: RiskTier, budget: f64) -> Result<ManualSession> {
        self.begin_session(tier, budget)?;
        self.planner.start_manual(tier, budget)
    }

    pub fn run(&mut self, request: SessionRequest) -> Result<SessionOutcome> {
        match request.mode {
            SelectionMode::Recommend => self
                .recommend(request.tier, request.budget)
                .map(SessionOutcome::Recommended),
            SelectionMode::Choose => self
                .choose(request.tier, request.budget, request.selections)
                .map(SessionOutcome::Chosen),
        }
    }
}
