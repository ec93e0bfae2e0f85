//! Freshness policy for stored artifacts.
//!
//! Two independent thresholds decide what happens to an artifact found on
//! disk:
//!
//! - **max age**: the artifact is served only while `now - mtime < max_age`.
//!   Without a max age every artifact is served.
//! - **refresh age**: once `now - mtime > refresh_age` the artifact is still
//!   served (if max age allows) but the host is told to rebuild it in the
//!   background. Without a refresh age nothing is ever flagged.
//!
//! Both thresholds may be constants or functions of the host and request,
//! which lets a host apply different policies per layer or per zoom level.
//!
//! A max age of exactly zero disables the cache: reads and writes are skipped
//! before touching the filesystem.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::error::ConfigError;
use crate::request::TileRequest;

/// Per-request threshold function. Returning `None` means "no constraint".
pub type AgeFn<H> = Arc<dyn Fn(&H, &TileRequest) -> Option<Duration> + Send + Sync>;

/// Which threshold to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeKind {
    MaxAge,
    RefreshAge,
}

/// How a threshold is determined.
pub enum AgePolicy<H> {
    /// No threshold configured
    Unset,

    /// The same threshold for every request
    Fixed(Duration),

    /// Threshold computed from the host and request on every check
    Dynamic(AgeFn<H>),
}

impl<H> AgePolicy<H> {
    /// Build a dynamic policy from a closure.
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&H, &TileRequest) -> Option<Duration> + Send + Sync + 'static,
    {
        AgePolicy::Dynamic(Arc::new(f))
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, AgePolicy::Unset)
    }

    /// Evaluate the threshold for one request.
    pub fn tolerance(&self, host: &H, request: &TileRequest) -> Option<Duration> {
        match self {
            AgePolicy::Unset => None,
            AgePolicy::Fixed(age) => Some(*age),
            AgePolicy::Dynamic(f) => f(host, request),
        }
    }
}

impl<H> Default for AgePolicy<H> {
    fn default() -> Self {
        AgePolicy::Unset
    }
}

impl<H> Clone for AgePolicy<H> {
    fn clone(&self) -> Self {
        match self {
            AgePolicy::Unset => AgePolicy::Unset,
            AgePolicy::Fixed(age) => AgePolicy::Fixed(*age),
            AgePolicy::Dynamic(f) => AgePolicy::Dynamic(Arc::clone(f)),
        }
    }
}

impl<H> From<Duration> for AgePolicy<H> {
    fn from(age: Duration) -> Self {
        AgePolicy::Fixed(age)
    }
}

impl<H> fmt::Debug for AgePolicy<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgePolicy::Unset => f.write_str("Unset"),
            AgePolicy::Fixed(age) => f.debug_tuple("Fixed").field(age).finish(),
            AgePolicy::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Outcome of checking one artifact against the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessVerdict {
    /// The artifact may be returned to the caller
    pub serve: bool,

    /// The artifact should be rebuilt in the background
    pub refresh: bool,
}

/// Age of an artifact. A modification time in the future counts as age zero.
pub fn artifact_age(now: SystemTime, mtime: SystemTime) -> Duration {
    now.duration_since(mtime).unwrap_or(Duration::ZERO)
}

fn within_max_age(age: Duration, max_age: Option<Duration>) -> bool {
    max_age.map_or(true, |max_age| age < max_age)
}

fn past_refresh_age(age: Duration, refresh_age: Option<Duration>) -> bool {
    refresh_age.is_some_and(|refresh_age| age > refresh_age)
}

/// Serve and refresh thresholds for a cache.
pub struct FreshnessPolicy<H> {
    max_age: AgePolicy<H>,
    refresh_age: AgePolicy<H>,
}

impl<H> FreshnessPolicy<H> {
    /// Create a policy, rejecting a refresh age without a max age.
    pub fn new(max_age: AgePolicy<H>, refresh_age: AgePolicy<H>) -> Result<Self, ConfigError> {
        if refresh_age.is_set() && !max_age.is_set() {
            return Err(ConfigError::RefreshAgeWithoutMaxAge);
        }
        Ok(Self {
            max_age,
            refresh_age,
        })
    }

    /// A policy that serves everything and never asks for a refresh.
    pub fn always_fresh() -> Self {
        Self {
            max_age: AgePolicy::Unset,
            refresh_age: AgePolicy::Unset,
        }
    }

    /// Evaluate one of the thresholds; `None` means unconstrained.
    pub fn age_tolerance(&self, kind: AgeKind, host: &H, request: &TileRequest) -> Option<Duration> {
        match kind {
            AgeKind::MaxAge => self.max_age.tolerance(host, request),
            AgeKind::RefreshAge => self.refresh_age.tolerance(host, request),
        }
    }

    /// Should an artifact modified at `mtime` be served?
    pub fn should_serve(&self, mtime: SystemTime, host: &H, request: &TileRequest) -> bool {
        self.should_serve_at(SystemTime::now(), mtime, host, request)
    }

    pub fn should_serve_at(
        &self,
        now: SystemTime,
        mtime: SystemTime,
        host: &H,
        request: &TileRequest,
    ) -> bool {
        let max_age = self.age_tolerance(AgeKind::MaxAge, host, request);
        within_max_age(artifact_age(now, mtime), max_age)
    }

    /// Should an artifact modified at `mtime` be rebuilt in the background?
    pub fn should_refresh(&self, mtime: SystemTime, host: &H, request: &TileRequest) -> bool {
        self.should_refresh_at(SystemTime::now(), mtime, host, request)
    }

    pub fn should_refresh_at(
        &self,
        now: SystemTime,
        mtime: SystemTime,
        host: &H,
        request: &TileRequest,
    ) -> bool {
        let refresh_age = self.age_tolerance(AgeKind::RefreshAge, host, request);
        past_refresh_age(artifact_age(now, mtime), refresh_age)
    }

    /// Compute both decisions, reusing an already evaluated max age.
    ///
    /// The refresh threshold is only evaluated when the artifact is servable.
    pub fn verdict_at(
        &self,
        now: SystemTime,
        mtime: SystemTime,
        max_age: Option<Duration>,
        host: &H,
        request: &TileRequest,
    ) -> FreshnessVerdict {
        let age = artifact_age(now, mtime);
        if !within_max_age(age, max_age) {
            return FreshnessVerdict {
                serve: false,
                refresh: false,
            };
        }
        let refresh_age = self.age_tolerance(AgeKind::RefreshAge, host, request);
        FreshnessVerdict {
            serve: true,
            refresh: past_refresh_age(age, refresh_age),
        }
    }
}

impl<H> Clone for FreshnessPolicy<H> {
    fn clone(&self) -> Self {
        Self {
            max_age: self.max_age.clone(),
            refresh_age: self.refresh_age.clone(),
        }
    }
}

impl<H> fmt::Debug for FreshnessPolicy<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FreshnessPolicy")
            .field("max_age", &self.max_age)
            .field("refresh_age", &self.refresh_age)
            .finish()
    }
}
