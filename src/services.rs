//! Service identifiers understood by the OnlineSIM `getNum` action.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::Infallible;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Target application a number is requested for.
///
/// Unknown identifiers are carried through verbatim as [`Service::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Service {
    /// Telegram (code: "telegram").
    Telegram,
    /// WhatsApp (code: "whatsapp").
    Whatsapp,
    /// VKontakte (code: "vkcom").
    VKontakte,
    /// Google (code: "google").
    Google,
    /// Instagram (code: "instagram").
    Instagram,
    /// Other/custom service.
    Other { code: String },
}

impl Service {
    /// Get the service code for the API.
    pub fn code(&self) -> &str {
        match self {
            Service::Telegram => "telegram",
            Service::Whatsapp => "whatsapp",
            Service::VKontakte => "vkcom",
            Service::Google => "google",
            Service::Instagram => "instagram",
            Service::Other { code } => code.as_str(),
        }
    }

    /// Create a Service from a code string.
    pub fn from_code<S: AsRef<str>>(code: S) -> Self {
        match code.as_ref() {
            "telegram" => Service::Telegram,
            "whatsapp" => Service::Whatsapp,
            "vkcom" => Service::VKontakte,
            "google" => Service::Google,
            "instagram" => Service::Instagram,
            other => Service::Other {
                code: other.to_string(),
            },
        }
    }
}

impl FromStr for Service {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Service::from_code(s))
    }
}

impl From<&str> for Service {
    fn from(code: &str) -> Self {
        Service::from_code(code)
    }
}

impl Display for Service {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for Service {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for Service {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let code = String::deserialize(d)?;
        Ok(Service::from_code(code))
    }
}
