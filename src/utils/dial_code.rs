//! Dial code mapping utilities.

use crate::types::DialCode;
use keshvar::Country;

/// Convert a country to the dial code OnlineSIM expects as `country`.
pub fn country_to_dial_code(country: &Country) -> DialCode {
    DialCode::from(country.country_code() as u16)
}
