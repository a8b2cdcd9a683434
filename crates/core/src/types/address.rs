//! Postal address used for shipping and saved in the customer's address book.

use serde::{Deserialize, Serialize};

/// Default country for new addresses.
pub const DEFAULT_COUNTRY_CODE: &str = "AR";

/// A shipping address as typed by the customer.
///
/// The same shape is sent to the backend when fetching shipping options,
/// placing an order, and managing saved addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub first_name: String,
    pub last_name: String,
    pub street: String,
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apartment: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(default = "default_country_code")]
    pub country_code: String,
    pub phone: String,
}

fn default_country_code() -> String {
    DEFAULT_COUNTRY_CODE.to_string()
}

impl Default for ShippingAddress {
    fn default() -> Self {
        Self {
            first_name: String::new(),
            last_name: String::new(),
            street: String::new(),
            number: String::new(),
            apartment: None,
            city: String::new(),
            state: String::new(),
            postal_code: String::new(),
            country_code: default_country_code(),
            phone: String::new(),
        }
    }
}

impl ShippingAddress {
    /// Trim every field, uppercase the country and postal code, and drop an
    /// empty apartment.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let country_code = self.country_code.trim().to_ascii_uppercase();
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            street: self.street.trim().to_string(),
            number: self.number.trim().to_string(),
            apartment: self
                .apartment
                .as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(String::from),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            postal_code: self.postal_code.trim().to_ascii_uppercase(),
            country_code: if country_code.is_empty() {
                default_country_code()
            } else {
                country_code
            },
            phone: self.phone.trim().to_string(),
        }
    }

    /// Recipient full name.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Single-line rendering, e.g. `"Av. Corrientes 1234, 5B, CABA, Buenos Aires C1043 AR"`.
    #[must_use]
    pub fn one_line(&self) -> String {
        let mut line = format!("{} {}", self.street, self.number);
        if let Some(apartment) = &self.apartment {
            line.push_str(", ");
            line.push_str(apartment);
        }
        format!(
            "{line}, {}, {} {} {}",
            self.city, self.state, self.postal_code, self.country_code
        )
    }
}
