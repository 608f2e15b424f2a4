//! Joins address and order aggregates onto selected customers.

use crate::error::SyncResult;
use crate::source::CustomerSource;
use std::collections::HashMap;
use std::sync::Arc;
use storesync_types::CustomerRow;

/// A customer with coerced aggregates, ready for payload building.
///
/// Missing or empty text columns are `None`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnrichedCustomer {
    pub id: i64,
    pub email: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub orders_count: u32,
    pub total_spent: f64,
    pub street: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub region_id: Option<i64>,
    pub postcode: Option<String>,
    pub country_id: Option<String>,
    pub company: Option<String>,
}

impl From<CustomerRow> for EnrichedCustomer {
    fn from(row: CustomerRow) -> Self {
        Self {
            id: row.id,
            email: non_empty(row.email),
            firstname: non_empty(row.firstname),
            lastname: non_empty(row.lastname),
            orders_count: row.orders_count.as_count(),
            total_spent: row.total_spent.as_amount(),
            street: non_empty(row.street),
            city: non_empty(row.city),
            region: non_empty(row.region),
            region_id: row.region_id,
            postcode: non_empty(row.postcode),
            country_id: non_empty(row.country_id),
            company: non_empty(row.company),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[derive(Clone)]
pub struct RecordEnricher {
    source: Arc<dyn CustomerSource>,
}

impl RecordEnricher {
    pub fn new(source: Arc<dyn CustomerSource>) -> Self {
        Self { source }
    }

    /// One enriched customer per id, in the order of `ids`.
    /// Ids unknown to the source are dropped.
    pub fn enrich(&self, ids: &[i64]) -> SyncResult<Vec<EnrichedCustomer>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_id: HashMap<i64, CustomerRow> = HashMap::with_capacity(ids.len());
        for row in self.source.load_customers(ids)? {
            by_id.entry(row.id).or_insert(row);
        }

        Ok(ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .map(EnrichedCustomer::from)
            .collect())
    }
}
