//! # ag-instruments: Indexed Instrument Store
//!
//! This library keeps a catalog of financial instruments in memory together
//! with two indexes built over it in one pass, and plans budget allocations
//! for a risk preference on top of them.
//!
//! ## Core Components
//!
//! - **Catalog**: the instruments, with stable positional ids
//! - **PriceIndex**: AVL tree ordered by price
//! - **CorrelationGraph**: complete directed graph of market correlations
//! - **RiskDecayState / RankingEngine**: risk-dependent return decay and
//!   ranking by expected return
//! - **AllocationPlanner**: automatic (diversified) and manual portfolios
//! - **InstrumentStore**: ties the above into the session flow
//!
//! ## Example Usage
//!
//! ```rust
//! use ag_instruments::{InstrumentStore, RiskTier, StoreConfig};
//!
//! let csv = "\
//! Name,Type,Price,Risk,Return,Correlation
//! A,Bond,100,Low,5,0.1
//! B,Stock,200,High,12,0.4
//! C,Stock,150,High,9,0.3
//! ";
//!
//! let config = StoreConfig {
//!     random_seed: Some(42),
//!     ..StoreConfig::default()
//! };
//! let mut store = InstrumentStore::from_delimited(csv, config).unwrap();
//!
//! // Price order
//! let prices: Vec<f64> = store.price_index().iter().map(|i| i.price).collect();
//! assert_eq!(prices, vec![100.0, 150.0, 200.0]);
//!
//! // Every other instrument, never A itself
//! assert_eq!(store.correlates_with("A").unwrap().count(), 2);
//!
//! // At most one of the two High-risk stocks is picked
//! let portfolio = store.recommend(RiskTier::High, 300.0).unwrap();
//! assert!(portfolio.len() <= 1);
//! assert!(portfolio.total_invested() <= 300.0);
//! ```

mod catalog;
mod config;
mod error;
mod graph;
mod instrument;
mod planner;
mod price_index;
mod ranking;
mod store;

pub use catalog::Catalog;
pub use config::{
    CandidateOrder, CatalogConfig, DecayConfig, DecayLifecycle, DecaySchedule, PlannerConfig,
    SelectionMode, StoreConfig,
};
pub use error::{Result, StoreError};
pub use graph::{Correlation, CorrelationGraph, Edge};
pub use instrument::{
    parse_delimited, HeaderPolicy, Instrument, InstrumentId, InstrumentRecord, RiskTier,
    RECORD_FIELDS,
};
pub use planner::{
    AllocationPlanner, ManualOutcome, ManualSession, Portfolio, PortfolioEntry, PortfolioSummary,
};
pub use price_index::{PriceIndex, PriceIter};
pub use ranking::{RankingEngine, RiskDecayState};
pub use store::{InstrumentStore, SessionOutcome, SessionRequest};
