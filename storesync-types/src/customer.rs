//! Customer rows as produced by the platform read model.

use serde::{Deserialize, Serialize};

/// A loosely typed column value.
///
/// Aggregates (order count, total spent) come back from the read model as
/// whatever the underlying query produced, which may be text or null.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Scalar {
    /// Coerces to a non-negative count. Null and unparsable text yield 0.
    pub fn as_count(&self) -> u32 {
        let value = match self {
            Scalar::Null => 0,
            Scalar::Integer(v) => *v,
            Scalar::Real(v) => *v as i64,
            Scalar::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .or_else(|_| s.parse::<f64>().map(|f| f as i64))
                    .unwrap_or(0)
            }
        };
        value.clamp(0, u32::MAX as i64) as u32
    }

    /// Coerces to a non-negative amount. Null and unparsable text yield 0.
    /// NaN passes through unchanged.
    pub fn as_amount(&self) -> f64 {
        let value = match self {
            Scalar::Null => 0.0,
            Scalar::Integer(v) => *v as f64,
            Scalar::Real(v) => *v,
            Scalar::Text(s) => s.trim().parse().unwrap_or(0.0),
        };
        if value < 0.0 {
            0.0
        } else {
            value
        }
    }
}

/// One customer joined with its default billing address and order aggregates.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerRow {
    pub id: i64,
    pub email: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub orders_count: Scalar,
    pub total_spent: Scalar,
    /// Multi-line street, lines separated by `\n`.
    pub street: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub region_id: Option<i64>,
    pub postcode: Option<String>,
    pub country_id: Option<String>,
    pub company: Option<String>,
}
