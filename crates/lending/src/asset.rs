//! Asset registry: the catalog of lendable items.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use serde::{Deserialize, Serialize};

use toolcrib_core::{DomainError, Entity};

use crate::error::{LedgerError, LedgerResult};

/// Unique, immutable asset number (e.g. `DK-047`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetNumber(String);

impl AssetNumber {
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, DomainError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_id("AssetNumber: cannot be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for AssetNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AssetNumber {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AssetNumber {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<AssetNumber> for String {
    fn from(value: AssetNumber) -> Self {
        value.0
    }
}

/// Physical condition of a tool.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Excellent,
    Good,
    Fair,
    NeedsRepair,
}

impl Condition {
    pub const ALL: [Condition; 4] = [
        Condition::Excellent,
        Condition::Good,
        Condition::Fair,
        Condition::NeedsRepair,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Condition::Excellent => "excellent",
            Condition::Good => "good",
            Condition::Fair => "fair",
            Condition::NeedsRepair => "needs_repair",
        }
    }

    /// Whether the tool should be pulled from circulation until serviced.
    pub fn needs_service(self) -> bool {
        match self {
            Condition::Excellent | Condition::Good | Condition::Fair => false,
            Condition::NeedsRepair => true,
        }
    }
}

impl core::fmt::Display for Condition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Condition::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| DomainError::validation(format!("unknown condition '{s}'")))
    }
}

/// A lendable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub number: AssetNumber,
    pub name: String,
    pub condition: Condition,
}

impl Entity for Asset {
    type Id = AssetNumber;

    fn id(&self) -> &Self::Id {
        &self.number
    }
}

/// Keyed store of assets.
///
/// Lookups take a shared lock and never block each other. Condition changes
/// go through [`AssetRegistry::set_condition`], which only the ledger calls
/// from inside its return critical section.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    assets: RwLock<HashMap<AssetNumber, Asset>>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(
        &self,
        number: AssetNumber,
        name: impl Into<String>,
        condition: Condition,
    ) -> LedgerResult<Asset> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("asset name cannot be empty").into());
        }

        let mut assets = self.assets.write().unwrap_or_else(PoisonError::into_inner);
        if assets.contains_key(&number) {
            return Err(LedgerError::DuplicateAsset(number));
        }

        let asset = Asset {
            number: number.clone(),
            name,
            condition,
        };
        assets.insert(number, asset.clone());
        Ok(asset)
    }

    pub fn lookup(&self, number: &AssetNumber) -> LedgerResult<Asset> {
        self.read()
            .get(number)
            .cloned()
            .ok_or_else(|| LedgerError::UnknownAsset(number.clone()))
    }

    pub fn contains(&self, number: &AssetNumber) -> bool {
        self.read().contains_key(number)
    }

    /// All assets, ordered by asset number.
    pub fn list(&self) -> Vec<Asset> {
        let mut assets: Vec<Asset> = self.read().values().cloned().collect();
        assets.sort_by(|a, b| a.number.cmp(&b.number));
        assets
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub(crate) fn set_condition(&self, number: &AssetNumber, condition: Condition) -> LedgerResult<()> {
        let mut assets = self.assets.write().unwrap_or_else(PoisonError::into_inner);
        let asset = assets
            .get_mut(number)
            .ok_or_else(|| LedgerError::UnknownAsset(number.clone()))?;
        asset.condition = condition;
        Ok(())
    }

    /// Shared view of the whole table, for queries that must see the catalog
    /// and the ledger at the same instant.
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, HashMap<AssetNumber, Asset>> {
        self.assets.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the whole table; used when rebuilding from a snapshot.
    pub(crate) fn from_assets(assets: impl IntoIterator<Item = Asset>) -> Self {
        let table = assets
            .into_iter()
            .map(|asset| (asset.number.clone(), asset))
            .collect();
        Self {
            assets: RwLock::new(table),
        }
    }
}
