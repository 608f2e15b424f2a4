//! E-commerce entity kinds tracked by the sync-state store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kind of platform entity mirrored into the remote e-commerce model.
///
/// The short tag (`CUS`, `ORD`, ...) is the persisted form and is also
/// embedded in batch ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum EntityType {
    Customer,
    Order,
    Product,
    Cart,
    Subscriber,
    PromoRule,
    PromoCode,
}

impl EntityType {
    pub const ALL: [EntityType; 7] = [
        EntityType::Customer,
        EntityType::Order,
        EntityType::Product,
        EntityType::Cart,
        EntityType::Subscriber,
        EntityType::PromoRule,
        EntityType::PromoCode,
    ];

    /// Returns the persisted tag.
    pub fn tag(self) -> &'static str {
        match self {
            EntityType::Customer => "CUS",
            EntityType::Order => "ORD",
            EntityType::Product => "PRO",
            EntityType::Cart => "QUO",
            EntityType::Subscriber => "SUB",
            EntityType::PromoRule => "PRL",
            EntityType::PromoCode => "PCD",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown entity type tag: {0}")]
pub struct ParseEntityTypeError(pub String);

impl FromStr for EntityType {
    type Err = ParseEntityTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityType::ALL
            .into_iter()
            .find(|t| t.tag() == s)
            .ok_or_else(|| ParseEntityTypeError(s.to_string()))
    }
}

impl From<EntityType> for String {
    fn from(value: EntityType) -> Self {
        value.tag().to_string()
    }
}

impl TryFrom<String> for EntityType {
    type Error = ParseEntityTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
