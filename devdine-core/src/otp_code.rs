//! Six digit one-time codes

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Number of digits in every code.
pub const OTP_CODE_LENGTH: usize = 6;

/// A one-time verification code: exactly six ASCII digits.
///
/// Leading zeros are significant, `007123` and `7123` are different
/// (and the latter isn't a code at all).
#[derive(Clone, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct OtpCode(String);

/// The submitted value isn't a six digit code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("verification codes are exactly {OTP_CODE_LENGTH} digits")]
pub struct OtpCodeError;

impl OtpCode {
    /// Draw a code uniformly from `000000..=999999`.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code = rng.gen_range(0..1_000_000u32);
        Self(format!("{code:0>6}"))
    }

    /// Draw a code using the thread-local CSPRNG.
    pub fn random() -> Self {
        Self::generate(&mut rand::thread_rng())
    }

    /// The digits as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Codes are secrets, keep them out of debug logs.
impl std::fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OtpCode(******)")
    }
}

impl std::fmt::Display for OtpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for OtpCode {
    type Err = OtpCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == OTP_CODE_LENGTH && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(s.to_string()))
        } else {
            Err(OtpCodeError)
        }
    }
}

impl TryFrom<String> for OtpCode {
    type Error = OtpCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OtpCode> for String {
    fn from(code: OtpCode) -> Self {
        code.0
    }
}
