//! Form validation.
//!
//! Validators never stop at the first problem: they collect one message per
//! field into [`FieldErrors`] so a form can be re-rendered with every error
//! next to its input.

use std::collections::HashMap;

use crate::types::{Email, ShippingAddress};

/// Largest quantity a single cart line may hold.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Maximum length for free-text name and address fields.
pub const MAX_FIELD_LENGTH: usize = 120;

/// Maximum length of a contact message.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Field name → message, in the order errors were found.
///
/// Only the first message per field is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    entries: Vec<(String, String)>,
}

impl FieldErrors {
    /// An empty error set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Record an error unless the field already has one.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        if self.get(field).is_none() {
            self.entries.push((field.to_string(), message.into()));
        }
    }

    /// Message for a field, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, message)| message.as_str())
    }

    /// Whether a field has an error.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate `(field, message)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(field, message)| (field.as_str(), message.as_str()))
    }

    /// Messages only, for a summary banner.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.entries.iter().map(|(_, m)| m.clone()).collect()
    }

    /// `Ok(value)` when no errors were recorded.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one field failed.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl From<HashMap<String, Vec<String>>> for FieldErrors {
    /// Build from a backend `{"errors": {field: [messages]}}` payload.
    fn from(map: HashMap<String, Vec<String>>) -> Self {
        let mut fields: Vec<_> = map.into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let mut errors = Self::new();
        for (field, messages) in fields {
            if let Some(first) = messages.into_iter().next() {
                errors.add(&field, first);
            }
        }
        errors
    }
}

fn require(errors: &mut FieldErrors, field: &str, value: &str, label: &str) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, format!("{label} is required."));
    } else if trimmed.chars().count() > MAX_FIELD_LENGTH {
        errors.add(
            field,
            format!("{label} must be at most {MAX_FIELD_LENGTH} characters."),
        );
    }
}

fn check_email(errors: &mut FieldErrors, value: &str) -> Option<Email> {
    match Email::parse(value) {
        Ok(email) => Some(email),
        Err(_) => {
            errors.add("email", "Please enter a valid email address.");
            None
        }
    }
}

/// Validate a shipping address as submitted by a form.
#[must_use]
pub fn validate_address(address: &ShippingAddress) -> FieldErrors {
    let mut errors = FieldErrors::new();

    require(&mut errors, "first_name", &address.first_name, "First name");
    require(&mut errors, "last_name", &address.last_name, "Last name");
    require(&mut errors, "street", &address.street, "Street");
    require(&mut errors, "number", &address.number, "Street number");
    require(&mut errors, "city", &address.city, "City");
    require(&mut errors, "state", &address.state, "State");
    require(&mut errors, "postal_code", &address.postal_code, "Postal code");
    require(&mut errors, "phone", &address.phone, "Phone");

    if let Some(apartment) = &address.apartment
        && apartment.trim().chars().count() > MAX_FIELD_LENGTH
    {
        errors.add(
            "apartment",
            format!("Apartment must be at most {MAX_FIELD_LENGTH} characters."),
        );
    }

    let postal_code = address.postal_code.trim();
    if !postal_code.is_empty() && !is_valid_postal_code(postal_code) {
        errors.add("postal_code", "Please enter a valid postal code.");
    }

    let phone = address.phone.trim();
    if !phone.is_empty() && !is_valid_phone(phone) {
        errors.add("phone", "Please enter a phone number with 8 to 15 digits.");
    }

    let country = address.country_code.trim();
    if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
        errors.add("country_code", "Please choose a country.");
    }

    errors
}

/// 4 to 10 characters of letters, digits, spaces or hyphens, with at least
/// one digit (covers AR CPA, BR CEP, MX CP, CL, UY and US ZIP formats).
fn is_valid_postal_code(value: &str) -> bool {
    let len = value.chars().count();
    (4..=10).contains(&len)
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-')
        && value.chars().any(|c| c.is_ascii_digit())
}

/// 8 to 15 digits once `+ - ( )` and spaces are removed.
fn is_valid_phone(value: &str) -> bool {
    let mut digits = 0usize;
    for c in value.chars() {
        match c {
            '0'..='9' => digits += 1,
            '+' | '-' | '(' | ')' | ' ' => {}
            _ => return false,
        }
    }
    (8..=15).contains(&digits)
}

/// Validate login credentials.
///
/// # Errors
///
/// Returns the field errors when the email is malformed or the password
/// is empty.
pub fn validate_login(email: &str, password: &str) -> Result<Email, FieldErrors> {
    let mut errors = FieldErrors::new();
    let email = check_email(&mut errors, email);
    if password.is_empty() {
        errors.add("password", "Password is required.");
    }
    match email {
        Some(email) => errors.into_result(email),
        None => Err(errors),
    }
}

/// Registration form fields.
#[derive(Debug, Clone, Copy)]
pub struct RegistrationFields<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub password_confirm: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
}

/// Validate a registration form.
///
/// # Errors
///
/// Returns every field error found.
pub fn validate_registration(fields: RegistrationFields<'_>) -> Result<Email, FieldErrors> {
    let mut errors = FieldErrors::new();
    let email = check_email(&mut errors, fields.email);

    require(&mut errors, "first_name", fields.first_name, "First name");
    require(&mut errors, "last_name", fields.last_name, "Last name");

    if fields.password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.add(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters."),
        );
    } else if !fields.password.chars().any(char::is_alphabetic)
        || !fields.password.chars().any(|c| c.is_ascii_digit())
    {
        errors.add("password", "Password must contain letters and numbers.");
    }

    if fields.password != fields.password_confirm {
        errors.add("password_confirm", "Passwords do not match.");
    }

    match email {
        Some(email) => errors.into_result(email),
        None => Err(errors),
    }
}

/// Validate the contact form.
///
/// # Errors
///
/// Returns every field error found.
pub fn validate_contact(name: &str, email: &str, message: &str) -> Result<Email, FieldErrors> {
    let mut errors = FieldErrors::new();
    require(&mut errors, "name", name, "Name");
    let email = check_email(&mut errors, email);

    let message = message.trim();
    if message.is_empty() {
        errors.add("message", "Message is required.");
    } else if message.chars().count() > MAX_MESSAGE_LENGTH {
        errors.add(
            "message",
            format!("Message must be at most {MAX_MESSAGE_LENGTH} characters."),
        );
    }

    match email {
        Some(email) => errors.into_result(email),
        None => Err(errors),
    }
}

/// Validate a cart line quantity.
///
/// # Errors
///
/// Returns a user-facing message when the quantity is out of range.
pub fn validate_quantity(quantity: u32) -> Result<u32, String> {
    if (1..=MAX_LINE_QUANTITY).contains(&quantity) {
        Ok(quantity)
    } else {
        Err(format!(
            "Quantity must be between 1 and {MAX_LINE_QUANTITY}."
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn valid_address() -> ShippingAddress {
        ShippingAddress {
            first_name: "Ana".to_string(),
            last_name: "Pérez".to_string(),
            street: "Av. Corrientes".to_string(),
            number: "1234".to_string(),
            apartment: None,
            city: "CABA".to_string(),
            state: "Buenos Aires".to_string(),
            postal_code: "C1043AAZ".to_string(),
            country_code: "AR".to_string(),
            phone: "+54 (11) 5555-1234".to_string(),
        }
    }

    #[test]
    fn test_valid_address_has_no_errors() {
        assert!(validate_address(&valid_address()).is_empty());
    }

    #[test]
    fn test_address_reports_every_missing_field() {
        let errors = validate_address(&ShippingAddress::default());
        for field in [
            "first_name",
            "last_name",
            "street",
            "number",
            "city",
            "state",
            "postal_code",
            "phone",
        ] {
            assert!(errors.has(field), "expected error for {field}");
        }
        assert_eq!(errors.get("city"), Some("City is required."));
        assert!(!errors.has("country_code"));
    }

    #[test]
    fn test_address_postal_code_and_phone_format() {
        let mut address = valid_address();
        address.postal_code = "ABC".to_string();
        address.phone = "12-34".to_string();
        let errors = validate_address(&address);
        assert_eq!(errors.get("postal_code"), Some("Please enter a valid postal code."));
        assert!(errors.has("phone"));

        address.postal_code = "01310-100".to_string();
        address.phone = "11987654321".to_string();
        assert!(validate_address(&address).is_empty());
    }

    #[test]
    fn test_address_country_code() {
        let mut address = valid_address();
        address.country_code = "ARG".to_string();
        assert!(validate_address(&address).has("country_code"));
    }

    #[test]
    fn test_login_validation() {
        assert!(validate_login("ana@example.com", "secret").is_ok());

        let errors = validate_login("not-an-email", "").unwrap_err();
        assert!(errors.has("email"));
        assert!(errors.has("password"));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_registration_validation() {
        let fields = RegistrationFields {
            email: "ana@example.com",
            password: "abc12345",
            password_confirm: "abc12345",
            first_name: "Ana",
            last_name: "Pérez",
        };
        assert_eq!(
            validate_registration(fields).unwrap().as_str(),
            "ana@example.com"
        );

        let errors = validate_registration(RegistrationFields {
            password: "short1",
            password_confirm: "other",
            ..fields
        })
        .unwrap_err();
        assert!(errors.get("password").unwrap().contains("at least 8"));
        assert!(errors.has("password_confirm"));

        let errors = validate_registration(RegistrationFields {
            password: "onlyletters",
            password_confirm: "onlyletters",
            ..fields
        })
        .unwrap_err();
        assert_eq!(
            errors.get("password"),
            Some("Password must contain letters and numbers.")
        );
    }

    #[test]
    fn test_contact_validation() {
        assert!(validate_contact("Ana", "ana@example.com", "Hola").is_ok());

        let errors = validate_contact(" ", "ana@example.com", &"x".repeat(2001)).unwrap_err();
        assert!(errors.has("name"));
        assert!(errors.get("message").unwrap().contains("2000"));
    }

    #[test]
    fn test_quantity_bounds() {
        assert_eq!(validate_quantity(1), Ok(1));
        assert_eq!(validate_quantity(MAX_LINE_QUANTITY), Ok(MAX_LINE_QUANTITY));
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_field_errors_keep_first_message() {
        let mut errors = FieldErrors::new();
        errors.add("email", "first");
        errors.add("email", "second");
        assert_eq!(errors.get("email"), Some("first"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_field_errors_from_backend_map() {
        let mut map = HashMap::new();
        map.insert("postal_code".to_string(), vec!["not served".to_string()]);
        map.insert("city".to_string(), vec![]);
        let errors = FieldErrors::from(map);
        assert_eq!(errors.get("postal_code"), Some("not served"));
        assert!(!errors.has("city"));
    }
}
