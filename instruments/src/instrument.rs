//! Instrument records and risk tiers
//!
//! An [`InstrumentRecord`] is one raw row handed over by the ingestion layer;
//! an [`Instrument`] is the validated value the store works with.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of fields in an instrument row:
/// name, category, price, risk level, expected return, market correlation.
pub const RECORD_FIELDS: usize = 6;

/// Stable positional identifier assigned at load time
///
/// Dense and 0-based; the only valid key into the correlation graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrumentId(pub usize);

impl InstrumentId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Risk tier of an instrument or of a user's preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub const ALL: [RiskTier; 3] = [RiskTier::Low, RiskTier::Medium, RiskTier::High];

    pub fn name(&self) -> &'static str {
        match self {
            RiskTier::Low => "Low",
            RiskTier::Medium => "Medium",
            RiskTier::High => "High",
        }
    }

    /// Annual chance, in percent, that a portfolio of this tier returns less
    /// than expected. Shown to the user as a disclosure before planning.
    pub fn downside_probability_pct(&self) -> f64 {
        match self {
            RiskTier::Low => 10.0,
            RiskTier::Medium => 25.0,
            RiskTier::High => 50.0,
        }
    }

    pub(crate) fn slot(&self) -> usize {
        match self {
            RiskTier::Low => 0,
            RiskTier::Medium => 1,
            RiskTier::High => 2,
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RiskTier {
    type Err = StoreError;

    /// Parses a tier name in any letter case (`"hIGH"` is `High`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        RiskTier::ALL
            .into_iter()
            .find(|tier| tier.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| StoreError::UnknownRiskTier(trimmed.to_string()))
    }
}

/// One investable asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    /// Position in the catalog's backing storage
    pub id: InstrumentId,

    /// Unique display key
    pub name: String,

    /// Asset type (e.g. "Stock", "Bond")
    pub category: String,

    /// Current price, always positive
    pub price: f64,

    pub risk_level: RiskTier,

    /// Expected annual return in percent; the only field that changes
    /// after load (risk decay)
    pub expected_return: f64,

    /// Correlation with the market, nominally in [-1, 1]
    pub market_correlation: f64,
}

impl Instrument {
    /// Validate a raw row and assign it `id`.
    ///
    /// Returns the reason on failure; the catalog attaches the row number.
    pub fn from_record(id: InstrumentId, record: &InstrumentRecord) -> Result<Self, String> {
        let fields = record.fields();
        if fields.len() != RECORD_FIELDS {
            return Err(format!(
                "expected {} fields, found {}",
                RECORD_FIELDS,
                fields.len()
            ));
        }

        let name = fields[0].trim();
        if name.is_empty() {
            return Err("name is empty".to_string());
        }
        let category = fields[1].trim();
        if category.is_empty() {
            return Err("category is empty".to_string());
        }

        let price = parse_number("price", &fields[2])?;
        if price <= 0.0 {
            return Err(format!("price must be positive, got {}", price));
        }

        let risk_level = fields[3]
            .parse::<RiskTier>()
            .map_err(|e| e.to_string())?;
        let expected_return = parse_number("expected return", &fields[4])?;
        let market_correlation = parse_number("market correlation", &fields[5])?;

        Ok(Self {
            id,
            name: name.to_string(),
            category: category.to_string(),
            price,
            risk_level,
            expected_return,
            market_correlation,
        })
    }
}

fn parse_number(field: &str, raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("{} is not numeric: {:?}", field, raw.trim()))?;
    if !value.is_finite() {
        return Err(format!("{} is not finite: {}", field, value));
    }
    Ok(value)
}

/// Raw, unvalidated instrument row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrumentRecord {
    fields: Vec<String>,
}

impl InstrumentRecord {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Split one line on `delimiter`. Fields are trimmed; embedded
    /// delimiters are not supported.
    pub fn from_delimited(line: &str, delimiter: char) -> Self {
        Self::new(
            line.trim_end_matches(['\r', '\n'])
                .split(delimiter)
                .map(str::trim),
        )
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

/// How the first row of a delimited document is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HeaderPolicy {
    /// Always discard the first non-blank row
    Skip,
    /// Every row is data
    None,
    /// Discard the first non-blank row only if it cannot be read as data:
    /// full width, no numeric column and no risk tier. Anything else is kept
    /// so a broken first record is reported by the catalog.
    #[default]
    Detect,
}

/// Split a delimited document into rows, honoring the header policy.
///
/// Blank lines are ignored.
pub fn parse_delimited(
    text: &str,
    delimiter: char,
    header: HeaderPolicy,
) -> Vec<InstrumentRecord> {
    let mut rows = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| InstrumentRecord::from_delimited(line, delimiter))
        .peekable();

    let discard_first = match header {
        HeaderPolicy::Skip => true,
        HeaderPolicy::None => false,
        HeaderPolicy::Detect => rows.peek().is_some_and(looks_like_header),
    };
    if discard_first {
        rows.next();
    }

    rows.collect()
}

fn looks_like_header(record: &InstrumentRecord) -> bool {
    let fields = record.fields();
    if fields.len() != RECORD_FIELDS {
        return false;
    }
    let numeric = |field: &String| field.parse::<f64>().is_ok();
    !numeric(&fields[2])
        && !numeric(&fields[4])
        && !numeric(&fields[5])
        && fields[3].parse::<RiskTier>().is_err()
}
