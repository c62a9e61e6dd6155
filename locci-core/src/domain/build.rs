//! Build domain types

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Last identifier handed out in this process.
static LAST_BUILD_ID: AtomicU64 = AtomicU64::new(0);

/// Unique identifier of one pipeline run
///
/// Derived from the wall clock in nanoseconds. Values are strictly
/// increasing within a process, so two runs started in the same
/// nanosecond still receive distinct identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BuildId(u64);

impl BuildId {
    /// Generates a fresh identifier
    pub fn generate() -> Self {
        let now = chrono::Utc::now()
            .timestamp_nanos_opt()
            .map(|n| n.max(0) as u64)
            .unwrap_or_default();

        let mut prev = LAST_BUILD_ID.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match LAST_BUILD_ID.compare_exchange_weak(
                prev,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Self(next),
                Err(actual) => prev = actual,
            }
        }
    }

    /// Wraps an existing raw value
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for BuildId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BuildId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(Self)
    }
}

/// Remote repository and branch to build from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReference {
    pub repository: String,
    pub branch: String,
}

impl SourceReference {
    pub fn new(repository: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            branch: branch.into(),
        }
    }
}

impl std::fmt::Display for SourceReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.repository, self.branch)
    }
}

/// Parameters of the two-stage build
///
/// The builder stage runs `commands` in `workdir` of `build_image`.
/// The runtime stage copies `output_dir` from the builder into `serve_dir`
/// of `runtime_image` and serves it with `entrypoint`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecipe {
    pub build_image: String,
    pub workdir: String,
    pub commands: Vec<Vec<String>>,
    pub output_dir: String,
    pub runtime_image: String,
    pub serve_dir: String,
    pub entrypoint: Vec<String>,
}

impl Default for BuildRecipe {
    fn default() -> Self {
        Self {
            build_image: "node:18.18.2-alpine".to_string(),
            workdir: "/app".to_string(),
            commands: vec![
                vec!["npm".to_string(), "install".to_string()],
                vec!["npm".to_string(), "run".to_string(), "build".to_string()],
            ],
            output_dir: "/app/dist".to_string(),
            runtime_image: "nginx:alpine".to_string(),
            serve_dir: "/usr/share/nginx/html".to_string(),
            entrypoint: vec![
                "/usr/sbin/nginx".to_string(),
                "-g".to_string(),
                "daemon off;".to_string(),
            ],
        }
    }
}

/// Image pushed to a registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedImage {
    /// Resolved reference, including the digest when the registry reported one
    pub reference: String,
    /// Expiry hint embedded in the tag (e.g. "1h")
    pub ttl: String,
}
