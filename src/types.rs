//! Core types for OnlineSIM operations.

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// OperationId
// =============================================================================

/// Identifier the service assigns to one number request (`tzid`).
///
/// Returned by the number request and used to poll the operation's state.
/// The service sends it either as an integer or as a numeric string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(i64);

impl OperationId {
    /// Create a new OperationId.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw id.
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl Display for OperationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for OperationId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl FromStr for OperationId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl Serialize for OperationId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(self.0)
    }
}

impl<'de> Deserialize<'de> for OperationId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        crate::response::lenient_int(d).map(Self)
    }
}

// =============================================================================
// SmsCode (OTP)
// =============================================================================

/// Verification code extracted from a received message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsCode(pub String);

impl SmsCode {
    /// Create a new SmsCode.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Get the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SmsCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SmsCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// FullNumber
// =============================================================================

/// Allocated phone number as returned by the service (e.g., "79991234567").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullNumber(String);

impl FullNumber {
    /// Create a new FullNumber.
    pub fn new(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    /// Get the number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The number in international format with a leading '+'.
    pub fn with_plus_prefix(&self) -> String {
        format!("+{}", self.0.trim_start_matches('+'))
    }
}

impl Display for FullNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for FullNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for FullNumber {
    fn from(number: String) -> Self {
        Self(number)
    }
}

impl From<&str> for FullNumber {
    fn from(number: &str) -> Self {
        Self(number.to_string())
    }
}

impl PartialEq<&str> for FullNumber {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

// =============================================================================
// DialCode
// =============================================================================

/// Error when parsing a dial code.
#[derive(Debug, Clone, Error)]
pub enum DialCodeError {
    /// Dial code contains non-digit characters.
    #[error("dial code must contain only digits")]
    NonDigit,
    /// Dial code is empty.
    #[error("dial code cannot be empty")]
    Empty,
}

/// Country dial code sent as the `country` parameter (e.g., "7" for Russia).
///
/// Dial codes are stored without the leading '+' sign.
///
/// # Example
///
/// ```rust
/// use onlinesim::DialCode;
///
/// let dc = DialCode::new("+7").unwrap();
/// assert_eq!(dc.to_string(), "7");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DialCode(String);

impl DialCode {
    /// Create a new DialCode from a string.
    ///
    /// The input can include a leading '+' which will be stripped.
    pub fn new(s: impl AsRef<str>) -> Result<Self, DialCodeError> {
        let n = s.as_ref().trim().trim_start_matches('+');
        if n.is_empty() {
            return Err(DialCodeError::Empty);
        }
        if !n.chars().all(|c| c.is_ascii_digit()) {
            return Err(DialCodeError::NonDigit);
        }
        Ok(Self(n.to_string()))
    }

    /// Get the dial code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DialCode {
    fn default() -> Self {
        Self("7".to_string())
    }
}

impl From<u16> for DialCode {
    fn from(code: u16) -> Self {
        Self(code.to_string())
    }
}

impl FromStr for DialCode {
    type Err = DialCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Display for DialCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for DialCode {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        DialCode::new(raw).map_err(de::Error::custom)
    }
}

impl Serialize for DialCode {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0)
    }
}

// =============================================================================
// NumberAllocation
// =============================================================================

/// Result of provisioning a number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberAllocation {
    /// Numbers the operation currently holds, in the order the service lists them.
    pub numbers: Vec<FullNumber>,
    /// Operation to poll for messages.
    pub operation_id: OperationId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_id_from_int_or_string() {
        let id: OperationId = serde_json::from_str("42").unwrap();
        assert_eq!(id, OperationId::new(42));

        let id: OperationId = serde_json::from_str(r#""42""#).unwrap();
        assert_eq!(id.get(), 42);

        assert!(serde_json::from_str::<OperationId>(r#""abc""#).is_err());
        assert_eq!(serde_json::to_string(&OperationId::new(7)).unwrap(), "7");
    }

    #[test]
    fn test_operation_id_parse() {
        assert_eq!(" 15 ".parse::<OperationId>().unwrap(), OperationId::new(15));
        assert!("x".parse::<OperationId>().is_err());
    }

    #[test]
    fn test_full_number() {
        let num = FullNumber::new("79991234567");
        assert_eq!(num.as_str(), "79991234567");
        assert_eq!(num.with_plus_prefix(), "+79991234567");
        assert_eq!(FullNumber::new("+79991234567").with_plus_prefix(), "+79991234567");
        assert_eq!(num, "79991234567");
    }

    #[test]
    fn test_dial_code_valid() {
        assert_eq!(DialCode::new("7").unwrap().as_str(), "7");
        assert_eq!(DialCode::new("  +86  ").unwrap().as_str(), "86");
        assert_eq!(DialCode::default().as_str(), "7");
        assert_eq!(DialCode::from(380u16).as_str(), "380");
    }

    #[test]
    fn test_dial_code_invalid() {
        assert!(matches!(DialCode::new(""), Err(DialCodeError::Empty)));
        assert!(matches!(DialCode::new("+"), Err(DialCodeError::Empty)));
        assert!(matches!(DialCode::new("7a"), Err(DialCodeError::NonDigit)));
    }

    #[test]
    fn test_dial_code_serde() {
        let dc: DialCode = serde_json::from_str(r#""+7""#).unwrap();
        assert_eq!(dc.as_str(), "7");
        assert_eq!(serde_json::to_string(&dc).unwrap(), r#""7""#);
    }
}
