//! Wire types for the remote e-commerce API.

use serde::{Deserialize, Serialize, Serializer};

/// A customer in the remote e-commerce schema.
///
/// Field order is the serialized order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerPayload {
    /// Hex MD5 of the email address; stable across syncs.
    pub id: String,
    pub email_address: String,
    pub first_name: String,
    pub last_name: String,
    pub opt_in_status: bool,
    pub orders_count: u32,
    #[serde(serialize_with = "serialize_amount")]
    pub total_spent: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub address: Option<CustomerAddress>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub company: Option<String>,
}

/// Address block of a remote customer. Unset fields are omitted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerAddress {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub address1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub address2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub province: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub province_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub country_code: Option<String>,
}

impl CustomerAddress {
    pub fn is_empty(&self) -> bool {
        *self == CustomerAddress::default()
    }
}

/// Writes whole amounts as JSON integers (`0`, not `0.0`).
/// Non-finite amounts cannot be represented and fail serialization.
fn serialize_amount<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    use serde::ser::Error;

    if !value.is_finite() {
        return Err(S::Error::custom(format!("non-finite amount: {value}")));
    }
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

/// One upsert instruction inside a remote batch job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOperation {
    pub method: String,
    pub path: String,
    pub operation_id: String,
    /// Serialized payload.
    pub body: String,
}

/// Status of a batch as reported by the remote API.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchResponse {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub total_operations: u64,
    #[serde(default)]
    pub finished_operations: u64,
    #[serde(default)]
    pub errored_operations: u64,
}

/// Body of a store creation request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStore {
    pub id: String,
    pub list_id: String,
    pub name: String,
    pub platform: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub email_address: String,
    pub currency_code: String,
    pub is_syncing: bool,
}

/// Partial store update; only present fields are sent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreEdit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_syncing: Option<bool>,
}

/// A remote store resource. The API can be asked for a subset of fields,
/// so everything but the id is optional.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RemoteStore {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub list_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub is_syncing: Option<bool>,
    #[serde(default)]
    pub connected_site: Option<ConnectedSite>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConnectedSite {
    #[serde(default)]
    pub site_foreign_id: Option<String>,
    #[serde(default)]
    pub site_script: Option<SiteScript>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SiteScript {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub fragment: Option<String>,
}
