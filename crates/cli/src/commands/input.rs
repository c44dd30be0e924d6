//! JSON input records and loaders.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use parlay_risk_core::{Leg, MarketCategory, ParlaySimulation};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// One leg as written by hand: the implied probability is derived, not supplied.
#[derive(Debug, Clone, Deserialize)]
pub struct LegInput {
    pub description: String,
    pub american_odds: i32,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub player: Option<String>,
    #[serde(default)]
    pub category: Option<MarketCategory>,
}

impl LegInput {
    pub fn into_leg(self) -> Result<Leg> {
        let mut leg = Leg::new(self.description.clone(), self.american_odds)
            .with_context(|| format!("Invalid leg '{}'", self.description))?;
        leg.event = self.event;
        leg.player = self.player;
        leg.category = self.category;
        Ok(leg)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParlayInput {
    #[serde(default)]
    pub label: Option<String>,
    pub stake: Decimal,
    pub legs: Vec<LegInput>,
}

impl ParlayInput {
    pub fn into_parlay(self) -> Result<ParlaySimulation> {
        let legs = self
            .legs
            .into_iter()
            .map(LegInput::into_leg)
            .collect::<Result<Vec<_>>>()?;
        let parlay = ParlaySimulation::new(legs, self.stake).context("Invalid parlay")?;
        Ok(match self.label {
            Some(label) => parlay.with_label(label),
            None => parlay,
        })
    }
}

/// Reads and deserializes a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse JSON in {}", path.display()))
}

pub fn load_parlay(path: &Path) -> Result<ParlaySimulation> {
    read_json::<ParlayInput>(path)?.into_parlay()
}

pub fn load_parlays(path: &Path) -> Result<Vec<ParlaySimulation>> {
    read_json::<Vec<ParlayInput>>(path)?
        .into_iter()
        .map(ParlayInput::into_parlay)
        .collect()
}
