//! Rate-limit policies, identity keys and admission decisions.

use std::fmt;
use std::time::Duration;

use crate::error::PolicyError;

/// Immutable limit for one route class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicy {
    name: String,
    window: Duration,
    max_requests: u32,
    rejection_message: String,
}

impl RateLimitPolicy {
    /// Build a policy, rejecting a zero window or a zero request budget.
    pub fn new(
        name: impl Into<String>,
        window: Duration,
        max_requests: u32,
        rejection_message: impl Into<String>,
    ) -> Result<Self, PolicyError> {
        let name = name.into();
        if window.is_zero() {
            return Err(PolicyError::ZeroWindow(name));
        }
        if max_requests == 0 {
            return Err(PolicyError::ZeroMaxRequests(name));
        }

        Ok(Self {
            name,
            window,
            max_requests,
            rejection_message: rejection_message.into(),
        })
    }

    /// Route discriminator, also used as the identity key prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn rejection_message(&self) -> &str {
        &self.rejection_message
    }

    /// Window length in whole seconds, rounded up.
    pub fn window_secs_ceil(&self) -> u64 {
        ceil_secs(self.window)
    }
}

/// The policies the API applies, one per route class.
#[derive(Debug, Clone)]
pub struct RateLimitPolicies {
    pub general: RateLimitPolicy,
    pub auth: RateLimitPolicy,
    pub upload: RateLimitPolicy,
    pub comment: RateLimitPolicy,
    pub listing: RateLimitPolicy,
}

impl RateLimitPolicies {
    pub fn standard() -> Result<Self, PolicyError> {
        Ok(Self {
            general: RateLimitPolicy::new(
                "general",
                Duration::from_secs(15 * 60),
                100,
                "Too many requests, please try again later.",
            )?,
            auth: RateLimitPolicy::new(
                "auth",
                Duration::from_secs(15 * 60),
                5,
                "Too many authentication attempts, please try again later.",
            )?,
            upload: RateLimitPolicy::new(
                "upload",
                Duration::from_secs(10 * 60),
                5,
                "Too many uploads, please try again later.",
            )?,
            comment: RateLimitPolicy::new(
                "comment",
                Duration::from_secs(60),
                10,
                "Too many comments, please slow down.",
            )?,
            listing: RateLimitPolicy::new(
                "listing",
                Duration::from_secs(60 * 60),
                10,
                "Too many marketplace listings, please try again later.",
            )?,
        })
    }
}

/// Who is being limited, for which route class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Prefer the authenticated subject, then the client address, then `unknown`.
    pub fn new(route: &str, subject: Option<&str>, origin: Option<&str>) -> Self {
        let subject = subject.filter(|s| !s.is_empty());
        let origin = origin.filter(|s| !s.is_empty());

        match (subject, origin) {
            (Some(subject), _) => Self(format!("{route}:user:{subject}")),
            (None, Some(origin)) => Self(format!("{route}:ip:{origin}")),
            (None, None) => Self(format!("{route}:ip:unknown")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Admit,
    Reject { retry_after_secs: u64 },
}

impl Decision {
    /// Reject with the time left in the window, kept within `1..=window`.
    pub fn reject_after(reset_after: Duration, policy: &RateLimitPolicy) -> Self {
        let retry_after_secs = ceil_secs(reset_after).clamp(1, policy.window_secs_ceil());
        Decision::Reject { retry_after_secs }
    }

    pub fn is_admit(&self) -> bool {
        matches!(self, Decision::Admit)
    }
}

/// Round a duration up to whole seconds.
fn ceil_secs(duration: Duration) -> u64 {
    let millis = duration.as_millis();
    millis.div_ceil(1000) as u64
}
