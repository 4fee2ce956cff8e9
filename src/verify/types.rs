use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationResult {
    Valid,
    Invalid,
}

impl ValidationResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "Valid",
            Self::Invalid => "Invalid",
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The only reasons ever shown to callers. Finer causes go to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reason {
    #[serde(rename = "Invalid email format")]
    InvalidFormat,
    #[serde(rename = "Domain does not have valid mail servers")]
    NoMailServer,
    #[serde(rename = "Email format and mail server verified")]
    Verified,
    #[serde(rename = "Unable to verify mail server")]
    Unverifiable,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidFormat => "Invalid email format",
            Self::NoMailServer => "Domain does not have valid mail servers",
            Self::Verified => "Email format and mail server verified",
            Self::Unverifiable => "Unable to verify mail server",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final classification of one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub email: String,
    pub validation_result: ValidationResult,
    pub validation_reason: Reason,
}

impl Verdict {
    pub fn valid(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            validation_result: ValidationResult::Valid,
            validation_reason: Reason::Verified,
        }
    }

    pub fn invalid(email: impl Into<String>, reason: Reason) -> Self {
        Self {
            email: email.into(),
            validation_result: ValidationResult::Invalid,
            validation_reason: reason,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validation_result == ValidationResult::Valid
    }
}

/// Pipeline position of an address, used in log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Unvalidated,
    FormatChecked,
    ExchangerResolved,
    Probed,
    Done,
}
