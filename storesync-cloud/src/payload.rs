//! Mapping of platform customers into the remote customer schema.

use crate::countries::CountryNames;
use crate::enricher::EnrichedCustomer;
use crate::source::RegionDirectory;
use crate::types::{CustomerAddress, CustomerPayload};
use md5::{Digest, Md5};
use std::sync::Arc;

/// Lowercase hex MD5 of `value`.
pub fn md5_hex(value: &str) -> String {
    hex::encode(Md5::digest(value.as_bytes()))
}

#[derive(Clone)]
pub struct PayloadBuilder {
    regions: Arc<dyn RegionDirectory>,
    countries: Arc<dyn CountryNames>,
}

impl PayloadBuilder {
    pub fn new(regions: Arc<dyn RegionDirectory>, countries: Arc<dyn CountryNames>) -> Self {
        Self { regions, countries }
    }

    /// Builds the payload. `opt_in_status` always starts out false.
    pub fn build(&self, customer: &EnrichedCustomer) -> CustomerPayload {
        let email = customer.email.clone().unwrap_or_default();
        let address = self.address(customer);

        CustomerPayload {
            id: md5_hex(&email),
            email_address: email,
            first_name: customer.firstname.clone().unwrap_or_default(),
            last_name: customer.lastname.clone().unwrap_or_default(),
            opt_in_status: false,
            orders_count: customer.orders_count,
            total_spent: customer.total_spent,
            address: (!address.is_empty()).then_some(address),
            company: present(&customer.company),
        }
    }

    fn address(&self, customer: &EnrichedCustomer) -> CustomerAddress {
        let mut address = CustomerAddress::default();

        if let Some(street) = &customer.street {
            let lines: Vec<&str> = street.split('\n').collect();
            if lines.len() > 1 {
                address.address1 = Some(lines[0].to_string());
                address.address2 = Some(lines[1].to_string());
            } else if !lines[0].is_empty() {
                address.address1 = Some(lines[0].to_string());
            }
        }

        address.city = present(&customer.city);
        address.province = present(&customer.region);
        address.province_code = customer
            .region_id
            .and_then(|id| self.regions.region_code(id))
            .filter(|code| !code.is_empty());
        address.postal_code = present(&customer.postcode);

        if let Some(code) = present(&customer.country_id) {
            address.country = Some(
                self.countries
                    .country_name(&code)
                    .unwrap_or_else(|| code.clone()),
            );
            address.country_code = Some(code);
        }

        address
    }
}

fn present(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}
