//! Bank coins and denomination metadata.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::denom::{validate_denom, DenomError};

/// An amount of a single bank denomination.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    /// Bank denomination.
    pub denom: String,
    /// Amount in base units.
    pub amount: U256,
}

impl Coin {
    /// Creates a coin.
    pub fn new(denom: impl Into<String>, amount: U256) -> Self {
        Self { denom: denom.into(), amount }
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

/// A unit of a denomination, `1 {denom} = 10^exponent {base}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DenomUnit {
    /// Unit name.
    pub denom: String,
    /// Power of ten relative to the base unit.
    pub exponent: u32,
    /// Alternative names.
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl DenomUnit {
    /// Creates a unit without aliases.
    pub fn new(denom: impl Into<String>, exponent: u32) -> Self {
        Self { denom: denom.into(), exponent, aliases: Vec::new() }
    }
}

/// Bank metadata describing a denomination.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Metadata {
    /// Free-form description.
    pub description: String,
    /// Units, starting with the base unit at exponent zero.
    pub denom_units: Vec<DenomUnit>,
    /// Base denomination stored in balances.
    pub base: String,
    /// Unit used for display.
    pub display: String,
    /// Human readable name.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
}

/// Reasons a [`Metadata`] value is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    /// Base or unit denom is syntactically invalid.
    #[error(transparent)]
    Denom(#[from] DenomError),
    /// Name or symbol is blank.
    #[error("metadata {0} cannot be blank")]
    Blank(&'static str),
    /// No unit matches the base at exponent zero.
    #[error("first denom unit must be the base denom '{0}' with exponent 0")]
    BaseUnit(String),
    /// Unit exponents are not strictly increasing.
    #[error("denom units must be sorted by strictly increasing exponent")]
    Unsorted,
    /// Display does not name a unit.
    #[error("display denom '{0}' is not one of the denom units")]
    Display(String),
    /// Stored metadata differs from the supplied metadata.
    #[error("metadata for '{0}' does not match the registered metadata")]
    Mismatch(String),
}

impl Metadata {
    /// Checks the structural rules the bank enforces for metadata.
    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.name.trim().is_empty() {
            return Err(MetadataError::Blank("name"));
        }
        if self.symbol.trim().is_empty() {
            return Err(MetadataError::Blank("symbol"));
        }
        validate_denom(&self.base)?;

        match self.denom_units.first() {
            Some(unit) if unit.denom == self.base && unit.exponent == 0 => {}
            _ => return Err(MetadataError::BaseUnit(self.base.clone())),
        }
        for unit in &self.denom_units {
            validate_denom(&unit.denom)?;
        }
        if self.denom_units.windows(2).any(|w| w[0].exponent >= w[1].exponent) {
            return Err(MetadataError::Unsorted);
        }
        if !self.denom_units.iter().any(|unit| unit.denom == self.display) {
            return Err(MetadataError::Display(self.display.clone()));
        }
        Ok(())
    }

    /// Returns the exponent of the display unit, used as ERC20 decimals.
    pub fn display_exponent(&self) -> u32 {
        self.denom_units
            .iter()
            .find(|unit| unit.denom == self.display)
            .map_or(0, |unit| unit.exponent)
    }
}

/// Turns an ERC20 token name into a bank unit name.
///
/// Lowercases the name, drops a trailing "token"/"coin" word, joins words with `_` and strips
/// characters the denom syntax does not allow.
pub fn sanitize_erc20_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let mut words: Vec<&str> = lowered.split_whitespace().collect();
    if words.len() > 1 && matches!(words.last(), Some(&"token" | &"coin")) {
        words.pop();
    }
    let joined: String = words
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | ':' | '.' | '_' | '-'))
        .collect();
    joined.trim_start_matches(|c: char| !c.is_ascii_alphabetic()).to_string()
}
