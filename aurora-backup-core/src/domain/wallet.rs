//! Wallet identity domain model

use std::fmt;

use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Public identifier of a wallet, stored as lower-case hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletIdentity(String);

impl WalletIdentity {
    /// Parse a hex public identity
    pub fn parse(hex: &str) -> Result<Self> {
        let trimmed = hex.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidIdentity("empty identity".to_string()));
        }
        if trimmed.len() % 2 != 0 {
            return Err(Error::InvalidIdentity(format!(
                "odd number of hex digits ({})",
                trimmed.len()
            )));
        }
        if let Some(c) = trimmed.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(Error::InvalidIdentity(format!("unexpected character '{}'", c)));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }

    /// Shortened form for display: first and last 6 digits
    pub fn short(&self) -> String {
        if self.0.len() <= 12 {
            return self.0.clone();
        }
        format!("{}…{}", &self.0[..6], &self.0[self.0.len() - 6..])
    }
}

impl fmt::Display for WalletIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for WalletIdentity {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<WalletIdentity> for String {
    fn from(id: WalletIdentity) -> Self {
        id.0
    }
}
