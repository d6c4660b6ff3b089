//! Platform detection and OS/architecture normalization.
//!
//! Vendors spell the same platform in different ways: `amd64`, `x86_64`
//! and `64bit` all describe the same CPU, `darwin` and `macos` the same OS.
//! Requests are expressed with one token; release metadata is matched
//! against every equivalent spelling.

use serde::{Deserialize, Serialize};
use std::fmt;

const ARCH_CLASSES: &[&[&str]] = &[&["x86_64", "amd64", "64bit"], &["arm64", "aarch64"]];
const OS_CLASSES: &[&[&str]] = &[&["darwin", "macos"]];

/// A requested platform: operating system and CPU architecture tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    /// Operating system (darwin, linux, ...).
    pub os: String,
    /// Architecture (amd64, arm64, ...).
    pub arch: String,
}

impl Platform {
    /// Create a new platform. Tokens are lowercased.
    #[must_use]
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into().to_lowercase(),
            arch: arch.into().to_lowercase(),
        }
    }

    /// The platform this process runs on.
    #[must_use]
    pub fn current() -> Self {
        let os = match std::env::consts::OS {
            "macos" => "darwin",
            other => other,
        };
        let arch = match std::env::consts::ARCH {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            other => other,
        };
        Self::new(os, arch)
    }

    /// Equivalent spellings of this platform's OS.
    #[must_use]
    pub fn os_variations(&self) -> Vec<String> {
        os_variations(&self.os)
    }

    /// Equivalent spellings of this platform's architecture.
    #[must_use]
    pub fn arch_variations(&self) -> Vec<String> {
        arch_variations(&self.arch)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

fn variations(token: &str, classes: &[&[&str]]) -> Vec<String> {
    let token = token.to_lowercase();
    let mut out = vec![token.clone()];
    if let Some(class) = classes.iter().find(|class| class.contains(&token.as_str())) {
        out.extend(
            class
                .iter()
                .filter(|member| **member != token)
                .map(|member| (*member).to_string()),
        );
    }
    out
}

/// All spellings equivalent to an architecture token, requested token first.
#[must_use]
pub fn arch_variations(arch: &str) -> Vec<String> {
    variations(arch, ARCH_CLASSES)
}

/// All spellings equivalent to an OS token, requested token first.
#[must_use]
pub fn os_variations(os: &str) -> Vec<String> {
    variations(os, OS_CLASSES)
}

/// True iff `actual` contains, case-insensitively, any spelling of the
/// expected architecture.
#[must_use]
pub fn arch_matches(expected: &str, actual: &str) -> bool {
    contains_any(actual, &arch_variations(expected))
}

/// True iff `actual` contains, case-insensitively, any spelling of the
/// expected OS.
#[must_use]
pub fn os_matches(expected: &str, actual: &str) -> bool {
    contains_any(actual, &os_variations(expected))
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    let haystack = haystack.to_lowercase();
    needles.iter().any(|needle| haystack.contains(needle.as_str()))
}
