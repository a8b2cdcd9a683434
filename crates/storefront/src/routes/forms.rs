//! Form payloads shared by several pages.

use serde::Deserialize;

use vitrina_core::ShippingAddress;
use vitrina_core::types::address::DEFAULT_COUNTRY_CODE;

use crate::backend::SavedAddress;

/// Address fields as posted by the checkout and address book forms.
///
/// Every field defaults to empty so a partial post re-renders with
/// validation messages instead of a 422 from the extractor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AddressForm {
    pub label: String,
    pub first_name: String,
    pub last_name: String,
    pub street: String,
    pub number: String,
    pub apartment: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country_code: String,
    pub phone: String,
    /// Checkbox; present when ticked.
    pub is_default: Option<String>,
}

impl AddressForm {
    /// Normalized address built from the posted fields.
    #[must_use]
    pub fn to_address(&self) -> ShippingAddress {
        ShippingAddress {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            street: self.street.clone(),
            number: self.number.clone(),
            apartment: Some(self.apartment.clone()),
            city: self.city.clone(),
            state: self.state.clone(),
            postal_code: self.postal_code.clone(),
            country_code: self.country_code.clone(),
            phone: self.phone.clone(),
        }
        .normalized()
    }

    /// Optional label, trimmed.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        Some(self.label.trim()).filter(|l| !l.is_empty())
    }

    #[must_use]
    pub const fn wants_default(&self) -> bool {
        self.is_default.is_some()
    }

    /// Prefill from an existing address.
    #[must_use]
    pub fn from_address(address: &ShippingAddress) -> Self {
        Self {
            label: String::new(),
            first_name: address.first_name.clone(),
            last_name: address.last_name.clone(),
            street: address.street.clone(),
            number: address.number.clone(),
            apartment: address.apartment.clone().unwrap_or_default(),
            city: address.city.clone(),
            state: address.state.clone(),
            postal_code: address.postal_code.clone(),
            country_code: address.country_code.clone(),
            phone: address.phone.clone(),
            is_default: None,
        }
    }

    /// Prefill from an address book entry.
    #[must_use]
    pub fn from_saved(saved: &SavedAddress) -> Self {
        Self {
            label: saved.label.clone().unwrap_or_default(),
            is_default: saved.is_default.then(|| "on".to_string()),
            ..Self::from_address(&saved.address)
        }
    }

    /// Empty form with the recipient's name filled in.
    #[must_use]
    pub fn for_recipient(first_name: &str, last_name: &str) -> Self {
        Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
            ..Self::default()
        }
    }
}
