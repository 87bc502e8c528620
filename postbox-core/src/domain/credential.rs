//! Sender credential records resolved from the parameter store

use serde::{Deserialize, Deserializer};
use std::fmt;

/// Token lifetime hint attached to OAuth2 credentials, in seconds
pub const OAUTH2_EXPIRES_HINT_SECS: u64 = 3599;

/// How a copy of each sent message is retained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuditMode {
    #[default]
    None,
    /// The sender is added as a bcc recipient
    Bcc,
    /// The message is archived to the audit bucket
    S3,
}

impl AuditMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bcc => "bcc",
            Self::S3 => "s3",
        }
    }
}

impl<'de> Deserialize<'de> for AuditMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(match value.as_deref() {
            Some("bcc") => Self::Bcc,
            Some("s3") => Self::S3,
            _ => Self::None,
        })
    }
}

/// A parsed parameter-store record
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    pub host: String,

    #[serde(deserialize_with = "lenient::port")]
    pub port: u16,

    /// Implicit TLS from the first byte
    #[serde(default, deserialize_with = "lenient::flag")]
    pub secure: bool,

    /// Never upgrade a plaintext connection with STARTTLS
    #[serde(default, rename = "ignoreTLS", deserialize_with = "lenient::flag")]
    pub ignore_tls: bool,

    pub username: String,

    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub audit: AuditMode,

    #[serde(flatten)]
    pub auth: CredentialAuth,
}

/// Authentication material, selected by the record's `type` field
#[derive(Clone, Deserialize)]
#[serde(tag = "type")]
pub enum CredentialAuth {
    #[serde(rename = "login")]
    Login { password: String },

    #[serde(rename = "OAuth2", rename_all = "camelCase")]
    OAuth2 {
        client_id: String,
        client_secret: String,
        refresh_token: String,
        #[serde(default)]
        access_token: Option<String>,
        /// Token endpoint override
        #[serde(default)]
        access_url: Option<String>,
    },
}

impl CredentialAuth {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Login { .. } => "login",
            Self::OAuth2 { .. } => "OAuth2",
        }
    }
}

impl CredentialRecord {
    pub fn parse(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// `"<displayName>" <username>`
    pub fn from_address(&self) -> String {
        format_from_address(&self.display_name, &self.username)
    }
}

pub fn format_from_address(display_name: &str, address: &str) -> String {
    format!("\"{}\" <{}>", display_name.replace('"', "'"), address)
}

// Passwords and tokens stay out of logs
impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("type", &self.auth.kind())
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("ignore_tls", &self.ignore_tls)
            .field("username", &self.username)
            .field("display_name", &self.display_name)
            .field("audit", &self.audit)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for CredentialAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialAuth")
            .field("type", &self.kind())
            .finish_non_exhaustive()
    }
}

/// Parameter values are hand-written JSON: numbers and booleans often arrive as strings.
mod lenient {
    use serde::{de::Error, Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        String(String),
    }

    pub fn port<'de, D>(deserializer: D) -> Result<u16, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = match NumberOrString::deserialize(deserializer)? {
            NumberOrString::Number(n) => n,
            NumberOrString::String(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| D::Error::custom(format!("invalid port '{}'", s)))?,
        };
        u16::try_from(value).map_err(|_| D::Error::custom(format!("port {} out of range", value)))
    }

    pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<BoolOrString>::deserialize(deserializer)? {
            Some(BoolOrString::Bool(b)) => b,
            Some(BoolOrString::String(s)) => s == "true",
            None => false,
        })
    }
}
