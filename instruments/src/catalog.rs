//! Instrument catalog
//!
//! The catalog owns every [`Instrument`]. Storage is indexed by
//! [`InstrumentId`]; a separate view order is what ranking and rotation
//! rearrange, so ids stay valid for the graph and for manual selections.

use crate::config::CatalogConfig;
use crate::error::{Result, StoreError};
use crate::instrument::{Instrument, InstrumentId, InstrumentRecord, RiskTier};
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// Instruments by id
    instruments: Vec<Instrument>,

    /// Current view order (a permutation of all ids)
    order: Vec<InstrumentId>,

    /// name -> id
    names: HashMap<String, InstrumentId>,

    /// Offset applied by the next `rotate()`
    rotation_cursor: usize,
}

impl Catalog {
    /// Validate `records` and assign sequential ids in input order.
    ///
    /// Any bad row aborts the whole load. Rows are numbered from 0 in the
    /// offered sequence.
    pub fn load(records: &[InstrumentRecord], config: &CatalogConfig) -> Result<Self> {
        if records.len() > config.max_instruments {
            return Err(StoreError::CapacityExceeded {
                max: config.max_instruments,
                offered: records.len(),
            });
        }

        let mut instruments = Vec::with_capacity(records.len());
        let mut names = HashMap::with_capacity(records.len());

        for (row, record) in records.iter().enumerate() {
            let id = InstrumentId(instruments.len());
            let instrument = Instrument::from_record(id, record)
                .map_err(|reason| StoreError::malformed(row, reason))?;

            if names.contains_key(&instrument.name) {
                return Err(StoreError::malformed(
                    row,
                    format!("duplicate instrument name {:?}", instrument.name),
                ));
            }

            if !(-1.0..=1.0).contains(&instrument.market_correlation) {
                warn!(
                    name = %instrument.name,
                    correlation = instrument.market_correlation,
                    "Market correlation outside [-1, 1]"
                );
            }

            names.insert(instrument.name.clone(), id);
            instruments.push(instrument);
        }

        info!("Loaded {} instruments into catalog", instruments.len());

        Ok(Self {
            order: (0..instruments.len()).map(InstrumentId).collect(),
            instruments,
            names,
            rotation_cursor: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    pub fn get(&self, id: InstrumentId) -> Result<&Instrument> {
        self.instruments.get(id.index()).ok_or(StoreError::InvalidIndex {
            index: id.index(),
            len: self.instruments.len(),
        })
    }

    /// Exact, case-sensitive name lookup
    pub fn find_by_name(&self, name: &str) -> Result<&Instrument> {
        self.names
            .get(name)
            .map(|id| &self.instruments[id.index()])
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    /// Instruments in id order
    pub fn iter(&self) -> impl Iterator<Item = &Instrument> {
        self.instruments.iter()
    }

    /// Instruments in the current view order
    pub fn ordered(&self) -> impl Iterator<Item = &Instrument> {
        self.order.iter().map(move |id| &self.instruments[id.index()])
    }

    /// Instrument at `position` in the current view
    pub fn at_position(&self, position: usize) -> Option<&Instrument> {
        self.order.get(position).map(|id| &self.instruments[id.index()])
    }

    pub fn order(&self) -> &[InstrumentId] {
        &self.order
    }

    /// Owned copy of the current view, for listing
    pub fn snapshot(&self) -> Vec<Instrument> {
        self.ordered().cloned().collect()
    }

    /// Instruments of one tier, in view order
    pub fn by_tier(&self, tier: RiskTier) -> impl Iterator<Item = &Instrument> {
        self.ordered().filter(move |inv| inv.risk_level == tier)
    }

    pub fn rotation_cursor(&self) -> usize {
        self.rotation_cursor
    }

    /// Shift the view left by the rotation cursor, then advance the cursor.
    ///
    /// The first call leaves the order as is; the n-th call moves the
    /// instrument at position n-1 to the front.
    pub fn rotate(&mut self) {
        if self.order.is_empty() {
            return;
        }
        self.order.rotate_left(self.rotation_cursor);
        self.rotation_cursor = (self.rotation_cursor + 1) % self.order.len();
        debug!(cursor = self.rotation_cursor, "Rotated catalog view");
    }

    /// Replace the view order. `order` must be a permutation of all ids.
    pub(crate) fn set_order(&mut self, order: Vec<InstrumentId>) {
        debug_assert_eq!(order.len(), self.instruments.len());
        self.order = order;
    }

    /// Multiply every instrument's expected return by `factor`
    pub(crate) fn scale_returns(&mut self, factor: f64) {
        for instrument in &mut self.instruments {
            instrument.expected_return *= factor;
        }
    }
}
