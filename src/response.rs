//! Response classification and payload shapes for the OnlineSIM API.

use crate::types::{OperationId, SmsCode};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt::{self, Display, Formatter};

/// Classification of the `response` field returned by every OnlineSIM call.
///
/// The service mixes a numeric success literal with symbolic status tokens in
/// the same field. Decoding maps both into this closed set; any token not in
/// the table becomes [`OutcomeCode::GenericFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutcomeCode {
    /// The call succeeded (`1`).
    Success,
    /// Any failure the service does not name more precisely.
    #[default]
    GenericFailure,
    /// A number is allocated and waiting for an SMS (`TZ_NUM_WAIT`).
    WaitingForAnswer,
    /// No numbers match the request (`WARNING_NO_NUMS`).
    NoMatchingNumbers,
    /// The operation waits for a number to be allocated (`TZ_INPOOL`).
    PendingAllocation,
    /// No SMS arrived within the allotted time (`TZ_OVER_EMPTY`).
    TimedOutNoAnswer,
    /// An SMS arrived (`TZ_NUM_ANSWER`).
    AnswerReceived,
    /// The operation is finished (`TZ_OVER_OK`).
    AllocationComplete,
    /// The request lacked an operation id (`ERROR_NO_TZID`).
    MissingOperationId,
    /// The account has no operations (`ERROR_NO_OPERATIONS`).
    NoOperationsFound,
    /// The account must be verified before ordering (`ACCOUNT_IDENTIFICATION_REQUIRED`).
    IdentificationRequired,
}

impl OutcomeCode {
    /// Classify a symbolic token. Matching is exact: padded or lowercased
    /// tokens are generic failures.
    pub fn classify(token: &str) -> Self {
        match token {
            "1" => Self::Success,
            "TZ_NUM_WAIT" => Self::WaitingForAnswer,
            "WARNING_NO_NUMS" => Self::NoMatchingNumbers,
            "TZ_INPOOL" => Self::PendingAllocation,
            "TZ_OVER_EMPTY" => Self::TimedOutNoAnswer,
            "TZ_NUM_ANSWER" => Self::AnswerReceived,
            "TZ_OVER_OK" => Self::AllocationComplete,
            "ERROR_NO_TZID" => Self::MissingOperationId,
            "ERROR_NO_OPERATIONS" => Self::NoOperationsFound,
            "ACCOUNT_IDENTIFICATION_REQUIRED" => Self::IdentificationRequired,
            _ => Self::GenericFailure,
        }
    }

    /// Returns the API token for this code.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Success => "1",
            Self::GenericFailure => "ERROR",
            Self::WaitingForAnswer => "TZ_NUM_WAIT",
            Self::NoMatchingNumbers => "WARNING_NO_NUMS",
            Self::PendingAllocation => "TZ_INPOOL",
            Self::TimedOutNoAnswer => "TZ_OVER_EMPTY",
            Self::AnswerReceived => "TZ_NUM_ANSWER",
            Self::AllocationComplete => "TZ_OVER_OK",
            Self::MissingOperationId => "ERROR_NO_TZID",
            Self::NoOperationsFound => "ERROR_NO_OPERATIONS",
            Self::IdentificationRequired => "ACCOUNT_IDENTIFICATION_REQUIRED",
        }
    }

    /// Returns true for the states an operation may leave on its own.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::WaitingForAnswer | Self::PendingAllocation)
    }

    /// Returns true for the catch-all failure.
    pub fn is_generic_failure(&self) -> bool {
        matches!(self, Self::GenericFailure)
    }
}

impl Display for OutcomeCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

impl Serialize for OutcomeCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Success => serializer.serialize_u8(1),
            other => serializer.serialize_str(other.token()),
        }
    }
}

struct OutcomeCodeVisitor;

impl Visitor<'_> for OutcomeCodeVisitor {
    type Value = OutcomeCode;

    fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("the number 1 or a response token")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(if v == 1 {
            OutcomeCode::Success
        } else {
            OutcomeCode::GenericFailure
        })
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(if v == 1 {
            OutcomeCode::Success
        } else {
            OutcomeCode::GenericFailure
        })
    }

    fn visit_f64<E: de::Error>(self, _v: f64) -> Result<Self::Value, E> {
        Ok(OutcomeCode::GenericFailure)
    }

    fn visit_bool<E: de::Error>(self, _v: bool) -> Result<Self::Value, E> {
        Ok(OutcomeCode::GenericFailure)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(OutcomeCode::GenericFailure)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(OutcomeCode::classify(v))
    }
}

impl<'de> Deserialize<'de> for OutcomeCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(OutcomeCodeVisitor)
    }
}

/// Scalar that the service sends either as a JSON string or a number.
#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient {
    Text(String),
    Int(i64),
    Float(f64),
    Null(()),
}

/// Decode a string field that may arrive as a number.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Lenient::deserialize(deserializer)? {
        Lenient::Text(s) => s,
        Lenient::Int(i) => i.to_string(),
        Lenient::Float(f) => f.to_string(),
        Lenient::Null(()) => String::new(),
    })
}

/// Decode an integer field that may arrive as a numeric string.
pub(crate) fn lenient_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Lenient::deserialize(deserializer)? {
        Lenient::Int(i) => Ok(i),
        Lenient::Text(s) if s.trim().is_empty() => Ok(0),
        Lenient::Text(s) => s.trim().parse().map_err(de::Error::custom),
        Lenient::Float(f) => Err(de::Error::custom(format!("expected integer, got {f}"))),
        Lenient::Null(()) => Ok(0),
    }
}

/// Response from the `getBalance` action.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BalanceResponse {
    #[serde(alias = "Response", default)]
    pub response: OutcomeCode,
    /// Spendable balance as sent by the service.
    #[serde(alias = "Balance", default, deserialize_with = "lenient_string")]
    pub balance: String,
    /// Balance frozen by open operations.
    #[serde(alias = "Zbalance", default, deserialize_with = "lenient_string")]
    pub zbalance: String,
}

/// Response from the `getNum` action.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NumberResponse {
    #[serde(alias = "Response", default)]
    pub response: OutcomeCode,
    #[serde(alias = "Tzid", default)]
    pub tzid: Option<OperationId>,
}

/// One message delivered to an allocated number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsMessage {
    /// Sender or service name the message came from.
    #[serde(alias = "Service", default, deserialize_with = "lenient_string")]
    pub service: String,
    /// Message body, or only the code when `message_to_code` is set.
    #[serde(rename = "msg", alias = "Msg", default, deserialize_with = "lenient_string")]
    pub text: String,
}

static CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4,8})\b").expect("code pattern is valid"));

impl SmsMessage {
    /// Extract the first 4 to 8 digit run from the message text.
    pub fn code(&self) -> Option<SmsCode> {
        CODE_PATTERN
            .captures(&self.text)
            .and_then(|cap| cap.get(1))
            .map(|m| SmsCode::new(m.as_str()))
    }
}

/// State of one number held by the account, as returned by `getState`.
///
/// Every poll produces fresh entries; they are never updated in place.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct StateEntry {
    #[serde(alias = "Response")]
    pub response: OutcomeCode,
    #[serde(alias = "Tzid")]
    pub tzid: Option<OperationId>,
    /// Service the number was requested for.
    #[serde(alias = "Service", deserialize_with = "lenient_string")]
    pub service: String,
    /// Allocated phone number, empty while still in the pool.
    #[serde(alias = "Number", deserialize_with = "lenient_string")]
    pub number: String,
    /// Messages received so far.
    #[serde(alias = "Msg")]
    pub msg: Vec<SmsMessage>,
    /// Seconds left before the operation expires.
    #[serde(alias = "Time", deserialize_with = "lenient_int")]
    pub time: i64,
    #[serde(alias = "Form", deserialize_with = "lenient_string")]
    pub form: String,
    #[serde(alias = "ForwardStatus", deserialize_with = "lenient_string")]
    pub forward_status: String,
    #[serde(alias = "ForwardNumber", deserialize_with = "lenient_string")]
    pub forward_number: String,
    #[serde(alias = "Country", deserialize_with = "lenient_int")]
    pub country: i64,
}

impl StateEntry {
    /// Message texts in the order the service listed them.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.msg.iter().map(|m| m.text.as_str())
    }
}

/// Body of a `getState` response.
///
/// The service returns an array with one entry per held number, but answers
/// account-level conditions such as `ERROR_NO_OPERATIONS` with a bare object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StateReply {
    Many(Vec<StateEntry>),
    One(StateEntry),
}

impl StateReply {
    /// Flatten into the ordered entry sequence.
    pub fn into_entries(self) -> Vec<StateEntry> {
        match self {
            Self::Many(entries) => entries,
            Self::One(entry) => vec![entry],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> OutcomeCode {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_numeric_success_marker() {
        assert_eq!(decode("1"), OutcomeCode::Success);
        assert_eq!(decode(r#""1""#), OutcomeCode::Success);
    }

    #[test]
    fn test_defined_tokens() {
        let test_cases = vec![
            ("TZ_NUM_WAIT", OutcomeCode::WaitingForAnswer),
            ("WARNING_NO_NUMS", OutcomeCode::NoMatchingNumbers),
            ("TZ_INPOOL", OutcomeCode::PendingAllocation),
            ("TZ_OVER_EMPTY", OutcomeCode::TimedOutNoAnswer),
            ("TZ_NUM_ANSWER", OutcomeCode::AnswerReceived),
            ("TZ_OVER_OK", OutcomeCode::AllocationComplete),
            ("ERROR_NO_TZID", OutcomeCode::MissingOperationId),
            ("ERROR_NO_OPERATIONS", OutcomeCode::NoOperationsFound),
            (
                "ACCOUNT_IDENTIFICATION_REQUIRED",
                OutcomeCode::IdentificationRequired,
            ),
        ];

        for (token, expected) in test_cases {
            assert_eq!(OutcomeCode::classify(token), expected);
            assert_eq!(decode(&format!("\"{token}\"")), expected);
            assert_eq!(expected.token(), token);
        }
    }

    #[test]
    fn test_unknown_tokens_are_generic_failure() {
        for raw in [
            r#""ERROR_WRONG_KEY""#,
            r#""tz_num_wait""#,
            r#""""#,
            "0",
            "-1",
            "2",
            "1.5",
            "true",
            "null",
        ] {
            assert_eq!(decode(raw), OutcomeCode::GenericFailure, "input {raw}");
        }
    }

    #[test]
    fn test_padded_tokens_are_not_matched() {
        assert_eq!(
            OutcomeCode::classify(" TZ_NUM_WAIT "),
            OutcomeCode::GenericFailure
        );
        assert_eq!(OutcomeCode::classify("1 "), OutcomeCode::GenericFailure);
        assert_eq!(
            decode(r#"" TZ_NUM_ANSWER""#),
            OutcomeCode::GenericFailure
        );
        assert_eq!(OutcomeCode::classify("TZ_NUM_WAIT"), OutcomeCode::WaitingForAnswer);
    }

    #[test]
    fn test_pending_codes() {
        assert!(OutcomeCode::WaitingForAnswer.is_pending());
        assert!(OutcomeCode::PendingAllocation.is_pending());
        assert!(!OutcomeCode::AnswerReceived.is_pending());
        assert!(!OutcomeCode::GenericFailure.is_pending());
    }

    #[test]
    fn test_balance_response() {
        let response: BalanceResponse =
            serde_json::from_str(r#"{"response":"1","balance":"123.45","zbalance":0}"#).unwrap();
        assert_eq!(response.response, OutcomeCode::Success);
        assert_eq!(response.balance, "123.45");
        assert_eq!(response.zbalance, "0");

        let response: BalanceResponse =
            serde_json::from_str(r#"{"Response":1,"Balance":50}"#).unwrap();
        assert_eq!(response.response, OutcomeCode::Success);
        assert_eq!(response.balance, "50");
    }

    #[test]
    fn test_number_response_numeric_string_id() {
        let response: NumberResponse =
            serde_json::from_str(r#"{"response":1,"tzid":"42"}"#).unwrap();
        assert_eq!(response.tzid, Some(OperationId::new(42)));

        let response: NumberResponse =
            serde_json::from_str(r#"{"response":"WARNING_NO_NUMS"}"#).unwrap();
        assert_eq!(response.response, OutcomeCode::NoMatchingNumbers);
        assert_eq!(response.tzid, None);
    }

    #[test]
    fn test_state_reply_array() {
        let json = r#"[{
            "response": "TZ_NUM_ANSWER",
            "tzid": 42,
            "service": "telegram",
            "number": "+79991234567",
            "msg": [
                {"service": "telegram", "msg": "CODE:123"},
                {"service": "telegram", "msg": "ignore"}
            ],
            "time": "587",
            "form": "index",
            "forward_status": "0",
            "forward_number": "",
            "country": 7
        }]"#;

        let entries = serde_json::from_str::<StateReply>(json)
            .unwrap()
            .into_entries();
        assert_eq!(entries.len(), 1);

        let entry = &entries[0];
        assert_eq!(entry.response, OutcomeCode::AnswerReceived);
        assert_eq!(entry.tzid, Some(OperationId::new(42)));
        assert_eq!(entry.time, 587);
        assert_eq!(entry.country, 7);
        assert_eq!(entry.texts().collect::<Vec<_>>(), vec!["CODE:123", "ignore"]);
    }

    #[test]
    fn test_state_reply_bare_object() {
        let entries = serde_json::from_str::<StateReply>(r#"{"response":"ERROR_NO_OPERATIONS"}"#)
            .unwrap()
            .into_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].response, OutcomeCode::NoOperationsFound);
        assert!(entries[0].msg.is_empty());
    }

    #[test]
    fn test_sms_code_extraction() {
        let message = SmsMessage {
            service: "telegram".to_string(),
            text: "Telegram code 58213. Do not share it.".to_string(),
        };
        assert_eq!(message.code(), Some(SmsCode::new("58213")));

        let message = SmsMessage {
            service: "telegram".to_string(),
            text: "no digits here".to_string(),
        };
        assert_eq!(message.code(), None);
    }
}
