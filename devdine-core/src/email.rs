//! Email addresses and the policy deciding which ones we accept

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::{Validate, ValidationError, ValidationErrors};

/// A structurally valid, lowercased email address.
///
/// The check is intentionally shallow: exactly one `@`, something on
/// both sides of it, no whitespace, and a domain with at least one dot
/// that has characters on either side. Whether the address actually
/// exists is proven by the verification code, not by parsing.
///
/// Parsing trims surrounding whitespace and lowercases, so two spellings
/// of the same address compare equal.
#[derive(Clone, Serialize, Deserialize, Validate, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct Email {
    #[validate(length(min = 5, max = 254))]
    #[validate(custom = "structural_email")]
    inner: String,
}

impl std::fmt::Debug for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Email").field(&self.inner).finish()
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_str().fmt(f)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for Email {
    type Err = ValidationErrors;

    fn from_str(s: &str) -> Result<Self, ValidationErrors> {
        let email = Self {
            inner: s.trim().to_lowercase(),
        };
        email.validate()?;
        Ok(email)
    }
}

impl TryFrom<String> for Email {
    type Error = ValidationErrors;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.inner
    }
}

impl Email {
    /// The normalized address.
    pub fn as_str(&self) -> &str {
        self.inner.as_str()
    }

    /// Everything after the `@`.
    pub fn domain(&self) -> &str {
        self.inner
            .split_once('@')
            .map(|(_, domain)| domain)
            .unwrap_or_default()
    }

    /// The last label of the domain, without the dot (`com` for `a@b.com`).
    pub fn tld(&self) -> &str {
        self.domain()
            .rsplit_once('.')
            .map(|(_, tld)| tld)
            .unwrap_or_default()
    }
}

fn structural_email(s: &str) -> Result<(), ValidationError> {
    let err = ValidationError::new("not a structurally valid email address");

    if s.chars().any(char::is_whitespace) {
        return Err(err);
    }

    let mut parts = s.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(err);
    };

    if local.is_empty() || domain.is_empty() {
        return Err(err);
    }

    let has_inner_dot = domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len());

    if !has_inner_dot {
        return Err(err);
    }

    Ok(())
}

/// Reasons an address is turned away by an [`EmailPolicy`].
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// The address isn't shaped like an email address.
    #[error("malformed email address: {0}")]
    Malformed(#[from] ValidationErrors),
    /// The address is fine but its top-level domain isn't on the allow-list.
    #[error("top-level domain .{0} is not accepted")]
    DisallowedTld(String),
}

/// Which email addresses are accepted.
///
/// Structural validity is always required. On top of that, the top-level
/// domain has to be on `allowed_tlds`, unless that list is empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailPolicy {
    /// Accepted top-level domains, without the leading dot.
    pub allowed_tlds: Vec<String>,
}

impl Default for EmailPolicy {
    fn default() -> Self {
        Self::new(["com", "net", "org"])
    }
}

impl EmailPolicy {
    /// A policy accepting the given top-level domains. Dots and case are ignored.
    pub fn new<I, T>(allowed_tlds: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        Self {
            allowed_tlds: allowed_tlds
                .into_iter()
                .map(|tld| tld.as_ref().trim().trim_start_matches('.').to_lowercase())
                .filter(|tld| !tld.is_empty())
                .collect(),
        }
    }

    /// A policy that only checks the structure of addresses.
    pub fn any_tld() -> Self {
        Self {
            allowed_tlds: Vec::new(),
        }
    }

    /// Parse and check an address against this policy.
    pub fn parse(&self, raw: &str) -> Result<Email, EmailError> {
        let email = Email::from_str(raw)?;

        if !self.allowed_tlds.is_empty() && !self.allowed_tlds.iter().any(|t| t == email.tld()) {
            return Err(EmailError::DisallowedTld(email.tld().to_string()));
        }

        Ok(email)
    }
}
