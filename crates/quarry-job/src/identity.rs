//! Job identity derivation.
//!
//! A job id names a remote job and doubles as the idempotency key for
//! retries: a retry of the same task execution re-derives the same id and
//! collides onto the already-submitted job instead of creating a duplicate.
//! Setting force-rerun swaps the content hash for a fresh random token,
//! guaranteeing a new remote job on every attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use ulid::Ulid;

use crate::config::JobConfiguration;
use crate::error::{Error, Result};

/// Maximum job id length accepted by the remote job API.
pub const MAX_JOB_ID_LEN: usize = 1024;

/// A validated remote job identifier.
///
/// Job ids contain only ASCII letters, digits, underscores, and hyphens,
/// and are at most [`MAX_JOB_ID_LEN`] characters long.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Creates a new job id, validating the charset and length constraint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidJobId`] if the value is empty, too long, or
    /// contains characters outside `[A-Za-z0-9_-]`. Invalid characters fail
    /// the operation; they are never silently stripped.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Creates a job id without validation.
    ///
    /// Use only for values already known to satisfy the constraint, such as
    /// identifiers echoed back by the remote service.
    #[must_use]
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(id: &str) -> Result<()> {
        if id.is_empty() {
            return Err(Error::invalid_job_id("job id cannot be empty"));
        }
        if id.len() > MAX_JOB_ID_LEN {
            return Err(Error::invalid_job_id(format!(
                "job id is {} characters long (maximum is {MAX_JOB_ID_LEN})",
                id.len()
            )));
        }
        if let Some(c) = id.chars().find(|c| !is_job_id_char(*c)) {
            return Err(Error::invalid_job_id(format!(
                "job id contains invalid character {c:?} \
                 (only letters, digits, '_', and '-' are allowed)"
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for JobId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

const fn is_job_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Derives the job id for one task execution.
///
/// The uniqueness suffix is a truncated SHA-256 over the canonical bytes of
/// the configuration, so identical configurations submitted by retries of
/// the same task instance collide deterministically onto the same remote
/// job. With `force_rerun` the suffix hashes a fresh random token instead.
///
/// The base is the caller-supplied id when present, otherwise the canonical
/// combination `quarry_{pipeline_id}_{task_id}_{logical_date}`. Timestamp
/// punctuation (`:`, `-`, `+`, `.`) is rewritten to `_` in the derived form
/// only; a caller-supplied id is used verbatim and must already satisfy the
/// charset constraint.
///
/// # Errors
///
/// Returns [`Error::InvalidJobId`] if the final identity violates the
/// charset or length constraint, or a serialization error if the
/// configuration cannot be canonically encoded.
pub fn derive_job_id(
    caller_job_id: Option<&str>,
    pipeline_id: &str,
    task_id: &str,
    logical_date: DateTime<Utc>,
    configuration: &JobConfiguration,
    force_rerun: bool,
) -> Result<JobId> {
    let suffix = if force_rerun {
        hash_suffix(b"rerun:", Ulid::new().to_string().as_bytes())
    } else {
        let bytes = configuration
            .canonical_bytes()
            .map_err(quarry_core::Error::from)?;
        hash_suffix(b"config:", &bytes)
    };

    match caller_job_id {
        Some(caller) => JobId::new(format!("{caller}_{suffix}")),
        None => {
            let derived = format!(
                "quarry_{pipeline_id}_{task_id}_{}_{suffix}",
                logical_date.to_rfc3339()
            );
            JobId::new(sanitize_derived(&derived))
        }
    }
}

/// Rewrites the punctuation a canonical timestamp introduces to `_`.
///
/// Applied to the derived base form only, never to caller-supplied ids.
fn sanitize_derived(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            ':' | '-' | '+' | '.' => '_',
            other => other,
        })
        .collect()
}

/// Hashes `payload` under a domain prefix and truncates to 32 hex chars.
///
/// 16 bytes of SHA-256 output = 128 bits, matching the collision resistance
/// the idempotent-retry contract needs.
fn hash_suffix(domain: &[u8], payload: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(payload);
    let hash = hasher.finalize();

    hex::encode(hash.get(..16).unwrap_or(&hash))
}
