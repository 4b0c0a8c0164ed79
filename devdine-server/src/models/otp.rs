//! Verification code challenges

use chrono::{DateTime, Duration, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use devdine_core::{email::Email, otp_code::OtpCode};

/// Why a submitted code was turned down.
///
/// The display strings go out to the client verbatim, none of them
/// may mention the expected code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OtpError {
    /// Nothing was issued for this email, or it was already thrown away.
    #[error("No verification code was requested for this email")]
    NoChallenge,
    /// The code was already used once.
    #[error("Verification code was already used")]
    Consumed,
    /// The code outlived its time to live.
    #[error("Verification code expired, please request a new one")]
    Expired,
    /// Wrong code.
    #[error("Invalid OTP")]
    Mismatch,
    /// Wrong code, and that was the last allowed try.
    #[error("Too many failed attempts, please request a new code")]
    AttemptsExhausted,
}

impl OtpError {
    /// Short label for metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            OtpError::NoChallenge => "no_challenge",
            OtpError::Consumed => "consumed",
            OtpError::Expired => "expired",
            OtpError::Mismatch => "mismatch",
            OtpError::AttemptsExhausted => "exhausted",
        }
    }
}

/// A code issued for an email address, awaiting verification.
#[derive(Debug, Clone)]
pub struct OtpChallenge {
    /// Address the code was issued for
    pub email: Email,
    /// The code itself
    pub code: OtpCode,
    /// Issued at timestamp
    pub created_at: DateTime<Utc>,
    /// The code is refused from this moment on
    pub expires_at: DateTime<Utc>,
    /// Set once the code verified successfully
    pub consumed: bool,
    /// Mismatching submissions so far
    pub failed_attempts: u32,
}

impl OtpChallenge {
    /// Whether the challenge has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Lifetime rules for challenges.
#[derive(Debug, Clone, Copy)]
pub struct OtpPolicy {
    /// How long a code stays valid
    pub ttl: Duration,
    /// Mismatches after which the challenge is dropped. Zero disables the limit.
    pub max_attempts: u32,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(10),
            max_attempts: 5,
        }
    }
}

/// In-memory store of pending challenges, one per email address.
///
/// Challenges are ephemeral: a restart drops them and users simply
/// request a new code.
#[derive(Debug, Default)]
pub struct OtpStore {
    challenges: DashMap<Email, OtpChallenge>,
    policy: OtpPolicy,
}

impl OtpStore {
    /// An empty store applying `policy`.
    pub fn new(policy: OtpPolicy) -> Self {
        Self {
            challenges: DashMap::new(),
            policy,
        }
    }

    /// The policy this store applies.
    pub fn policy(&self) -> &OtpPolicy {
        &self.policy
    }

    /// Issue a fresh code for `email`, replacing whatever was pending.
    pub fn issue(&self, email: &Email) -> OtpChallenge {
        self.issue_at(email, OtpCode::random(), Utc::now())
    }

    /// Like [`OtpStore::issue`], with the code and clock supplied by the caller.
    pub fn issue_at(&self, email: &Email, code: OtpCode, now: DateTime<Utc>) -> OtpChallenge {
        let challenge = OtpChallenge {
            email: email.clone(),
            code,
            created_at: now,
            expires_at: now + self.policy.ttl,
            consumed: false,
            failed_attempts: 0,
        };

        if self
            .challenges
            .insert(email.clone(), challenge.clone())
            .is_some()
        {
            tracing::debug!(%email, "replaced pending verification code");
        }

        challenge
    }

    /// Check `code` against the pending challenge for `email`.
    pub fn verify(&self, email: &Email, code: &OtpCode) -> Result<(), OtpError> {
        self.verify_at(email, code, Utc::now())
    }

    /// Like [`OtpStore::verify`], at a caller supplied time.
    pub fn verify_at(
        &self,
        email: &Email,
        code: &OtpCode,
        now: DateTime<Utc>,
    ) -> Result<(), OtpError> {
        let Entry::Occupied(mut entry) = self.challenges.entry(email.clone()) else {
            return Err(OtpError::NoChallenge);
        };

        let challenge = entry.get_mut();

        if challenge.consumed {
            return Err(OtpError::Consumed);
        }

        if challenge.is_expired(now) {
            entry.remove();
            return Err(OtpError::Expired);
        }

        if challenge.code == *code {
            challenge.consumed = true;
            return Ok(());
        }

        challenge.failed_attempts += 1;
        if self.policy.max_attempts > 0 && challenge.failed_attempts >= self.policy.max_attempts {
            tracing::info!(%email, "verification code dropped after too many attempts");
            entry.remove();
            return Err(OtpError::AttemptsExhausted);
        }

        Err(OtpError::Mismatch)
    }

    /// Drop the challenge for `email` if it still holds `code`.
    /// A newer challenge issued in the meantime is kept.
    pub fn discard(&self, email: &Email, code: &OtpCode) -> bool {
        self.challenges
            .remove_if(email, |_, challenge| challenge.code == *code)
            .is_some()
    }

    /// Drop every challenge that is expired or already used.
    /// Returns how many were removed.
    pub fn purge(&self, now: DateTime<Utc>) -> usize {
        let before = self.challenges.len();
        self.challenges
            .retain(|_, challenge| !challenge.consumed && !challenge.is_expired(now));
        before.saturating_sub(self.challenges.len())
    }

    /// Number of challenges currently held.
    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    /// Whether no challenge is held.
    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn email(s: &str) -> Email {
        s.parse().unwrap()
    }

    fn code(s: &str) -> OtpCode {
        s.parse().unwrap()
    }

    fn store() -> OtpStore {
        OtpStore::new(OtpPolicy {
            ttl: Duration::minutes(10),
            max_attempts: 3,
        })
    }

    #[test]
    fn test_verify_once() {
        let store = store();
        let alice = email("alice@example.com");
        let now = Utc::now();

        store.issue_at(&alice, code("007123"), now);

        assert_matches!(store.verify_at(&alice, &code("007123"), now), Ok(()));
        assert_matches!(
            store.verify_at(&alice, &code("007123"), now),
            Err(OtpError::Consumed)
        );
    }

    #[test]
    fn test_reissue_replaces_code() {
        let store = store();
        let alice = email("alice@example.com");
        let now = Utc::now();

        store.issue_at(&alice, code("111111"), now);
        store.issue_at(&alice, code("222222"), now);

        assert_eq!(store.len(), 1);
        assert_matches!(
            store.verify_at(&alice, &code("111111"), now),
            Err(OtpError::Mismatch)
        );
        assert_matches!(store.verify_at(&alice, &code("222222"), now), Ok(()));
    }

    #[test]
    fn test_reissue_after_consumed() {
        let store = store();
        let alice = email("alice@example.com");
        let now = Utc::now();

        store.issue_at(&alice, code("111111"), now);
        store.verify_at(&alice, &code("111111"), now).unwrap();

        store.issue_at(&alice, code("333333"), now);
        assert_matches!(store.verify_at(&alice, &code("333333"), now), Ok(()));
    }

    #[test]
    fn test_discard_only_matching_code() {
        let store = store();
        let alice = email("alice@example.com");
        let now = Utc::now();

        store.issue_at(&alice, code("111111"), now);
        store.issue_at(&alice, code("222222"), now);

        assert!(!store.discard(&alice, &code("111111")));
        assert_eq!(store.len(), 1);

        assert!(store.discard(&alice, &code("222222")));
        assert!(store.is_empty());
        assert_matches!(
            store.verify_at(&alice, &code("222222"), now),
            Err(OtpError::NoChallenge)
        );
    }

    #[test]
    fn test_no_challenge() {
        let store = store();
        assert_matches!(
            store.verify_at(&email("bob@example.com"), &code("123456"), Utc::now()),
            Err(OtpError::NoChallenge)
        );
    }

    #[test]
    fn test_challenges_are_per_email() {
        let store = store();
        let now = Utc::now();

        store.issue_at(&email("alice@example.com"), code("123456"), now);

        assert_matches!(
            store.verify_at(&email("bob@example.com"), &code("123456"), now),
            Err(OtpError::NoChallenge)
        );
    }

    #[test]
    fn test_expired() {
        let store = store();
        let alice = email("alice@example.com");
        let issued = Utc::now();

        store.issue_at(&alice, code("123456"), issued);

        let just_before = issued + Duration::minutes(10) - Duration::seconds(1);
        assert_matches!(
            store.verify_at(&alice, &code("000000"), just_before),
            Err(OtpError::Mismatch)
        );

        let at_expiry = issued + Duration::minutes(10);
        assert_matches!(
            store.verify_at(&alice, &code("123456"), at_expiry),
            Err(OtpError::Expired)
        );
        assert!(store.is_empty());
        assert_matches!(
            store.verify_at(&alice, &code("123456"), at_expiry),
            Err(OtpError::NoChallenge)
        );
    }

    #[test]
    fn test_attempts_exhausted() {
        let store = store();
        let alice = email("alice@example.com");
        let now = Utc::now();

        store.issue_at(&alice, code("123456"), now);

        assert_matches!(
            store.verify_at(&alice, &code("000001"), now),
            Err(OtpError::Mismatch)
        );
        assert_matches!(
            store.verify_at(&alice, &code("000002"), now),
            Err(OtpError::Mismatch)
        );
        assert_matches!(
            store.verify_at(&alice, &code("000003"), now),
            Err(OtpError::AttemptsExhausted)
        );
        // even the right code is refused now
        assert_matches!(
            store.verify_at(&alice, &code("123456"), now),
            Err(OtpError::NoChallenge)
        );
    }

    #[test]
    fn test_unlimited_attempts() {
        let store = OtpStore::new(OtpPolicy {
            ttl: Duration::minutes(10),
            max_attempts: 0,
        });
        let alice = email("alice@example.com");
        let now = Utc::now();

        store.issue_at(&alice, code("123456"), now);
        for _ in 0..50 {
            assert_matches!(
                store.verify_at(&alice, &code("654321"), now),
                Err(OtpError::Mismatch)
            );
        }
        assert_matches!(store.verify_at(&alice, &code("123456"), now), Ok(()));
    }

    #[test]
    fn test_purge() {
        let store = store();
        let now = Utc::now();

        store.issue_at(&email("old@example.com"), code("111111"), now - Duration::hours(1));
        store.issue_at(&email("used@example.com"), code("222222"), now);
        store.issue_at(&email("fresh@example.com"), code("333333"), now);
        store
            .verify_at(&email("used@example.com"), &code("222222"), now)
            .unwrap();

        assert_eq!(store.purge(now), 2);
        assert_eq!(store.len(), 1);
        assert_matches!(
            store.verify_at(&email("fresh@example.com"), &code("333333"), now),
            Ok(())
        );
    }

    #[test]
    fn test_error_messages_never_contain_code() {
        for err in [
            OtpError::NoChallenge,
            OtpError::Consumed,
            OtpError::Expired,
            OtpError::Mismatch,
            OtpError::AttemptsExhausted,
        ] {
            assert!(!err.to_string().chars().any(|c| c.is_ascii_digit()));
        }
    }
}
