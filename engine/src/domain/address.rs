//! Normalized address text used as the place cache key.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Address text as typed by the user, trimmed of surrounding whitespace.
///
/// Two waypoints with identical address text share cache entries, so the
/// normalized form is the only identity an address has.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Normalize and validate address text.
    ///
    /// # Examples
    /// ```
    /// use quickroute_engine::domain::Address;
    ///
    /// let address = Address::new("  221B Baker Street ").expect("valid address");
    /// assert_eq!(address.as_str(), "221B Baker Street");
    /// ```
    pub fn new(value: impl AsRef<str>) -> Result<Self, AddressValidationError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(AddressValidationError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Parse one address per line, skipping blank lines.
    ///
    /// This is the bulk-edit and paste format of the editor.
    pub fn parse_lines(text: &str) -> Vec<Self> {
        text.lines().filter_map(|line| Self::new(line).ok()).collect()
    }

    /// Borrow the normalized text.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<String> for Address {
    type Error = AddressValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

/// Validation errors returned when constructing [`Address`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressValidationError {
    /// Address is empty after trimming whitespace.
    #[error("address must not be empty")]
    Empty,
}

#[cfg(test)]
mod tests {
    //! Validates address normalization and bulk parsing.
    use super::{Address, AddressValidationError};
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\t\n")]
    fn address_rejects_blank(#[case] value: &str) {
        let err = Address::new(value).expect_err("blank addresses rejected");
        assert_eq!(err, AddressValidationError::Empty);
    }

    #[rstest]
    #[case(" leading", "leading")]
    #[case("trailing ", "trailing")]
    #[case("10 Downing St", "10 Downing St")]
    fn address_trims_surrounding_whitespace(#[case] raw: &str, #[case] expected: &str) {
        let address = Address::new(raw).expect("valid address");
        assert_eq!(address.as_str(), expected);
    }

    #[rstest]
    fn trimmed_variants_share_identity() {
        let a = Address::new("1 Main St").expect("valid address");
        let b = Address::new("  1 Main St  ").expect("valid address");
        assert_eq!(a, b);
    }

    #[rstest]
    fn parse_lines_skips_blank_entries() {
        let parsed = Address::parse_lines("A\n\n  B  \n   \nC");
        let texts: Vec<&str> = parsed.iter().map(Address::as_str).collect();
        assert_eq!(texts, vec!["A", "B", "C"]);
    }

    #[rstest]
    fn deserialization_validates_input() {
        let ok: Address = serde_json::from_str("\" Elm Row \"").expect("valid json address");
        assert_eq!(ok.as_str(), "Elm Row");
        assert!(serde_json::from_str::<Address>("\"  \"").is_err());
    }
}
