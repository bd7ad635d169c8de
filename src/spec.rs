// src/spec.rs

//! Package and feature identities.
//!
//! A [`PackageSpec`] names one package on one triplet. A [`FeatureSpec`]
//! additionally names a feature of that package. A [`DependencySpec`] is the
//! unresolved form found in port metadata and installed-state records: the
//! triplet is not yet known and an optional platform qualifier may restrict
//! the dependency to one triplet.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// The implicit feature every port has.
pub const CORE_FEATURE: &str = "core";

/// Identity of one package on one triplet.
///
/// Triplets are opaque labels; the planner never inspects their structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageSpec {
    name: String,
    triplet: String,
}

impl PackageSpec {
    pub fn new(name: impl Into<String>, triplet: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            triplet: triplet.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn triplet(&self) -> &str {
        &self.triplet
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.triplet)
    }
}

/// One feature of one package on one triplet.
///
/// The empty feature name is a synonym for `"core"`. The name `"*"` means
/// "all features of the port" and is only valid in user input; it never
/// appears inside the planner's graphs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureSpec {
    spec: PackageSpec,
    feature: String,
}

impl FeatureSpec {
    pub fn new(spec: PackageSpec, feature: impl Into<String>) -> Self {
        Self {
            spec,
            feature: feature.into(),
        }
    }

    pub fn spec(&self) -> &PackageSpec {
        &self.spec
    }

    pub fn feature(&self) -> &str {
        &self.feature
    }

    /// The feature name with the empty-string synonym resolved to `"core"`.
    pub fn feature_or_core(&self) -> &str {
        if self.feature.is_empty() {
            CORE_FEATURE
        } else {
            &self.feature
        }
    }
}

impl fmt::Display for FeatureSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.feature.is_empty() {
            write!(f, "{}", self.spec)
        } else {
            write!(f, "{}[{}]:{}", self.spec.name(), self.feature, self.spec.triplet())
        }
    }
}

/// An unresolved dependency reference from port metadata or an installed
/// record: `name`, `name[feature]`, optionally suffixed with a platform
/// qualifier in parentheses, e.g. `openssl (linux)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySpec {
    pub name: String,
    pub feature: Option<String>,
    pub platform: Option<String>,
}

impl DependencySpec {
    /// Parse the textual form.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();

        // Split off a trailing " (platform)" qualifier first.
        let (body, platform) = match raw.strip_suffix(')') {
            Some(prefix) => match prefix.rfind('(') {
                Some(open) => {
                    let platform = prefix[open + 1..].trim();
                    if platform.is_empty() {
                        return Err(malformed(raw, "empty platform qualifier"));
                    }
                    (prefix[..open].trim(), Some(platform.to_string()))
                }
                None => return Err(malformed(raw, "unmatched ')'")),
            },
            None => (raw, None),
        };

        let (name, feature) = match body.find('[') {
            Some(open) => {
                let close = body
                    .rfind(']')
                    .ok_or_else(|| malformed(raw, "unmatched '['"))?;
                if close != body.len() - 1 || close <= open + 1 {
                    return Err(malformed(raw, "malformed feature reference"));
                }
                (
                    body[..open].trim(),
                    Some(body[open + 1..close].trim().to_string()),
                )
            }
            None => (body, None),
        };

        if name.is_empty() {
            return Err(malformed(raw, "empty package name"));
        }

        Ok(Self {
            name: name.to_string(),
            feature,
            platform,
        })
    }

    /// The package name of a raw dependency reference, ignoring any feature
    /// or platform suffix.
    pub fn name_of(raw: &str) -> &str {
        let end = raw.find(['[', '(']).unwrap_or(raw.len());
        raw[..end].trim()
    }

    /// True when this dependency applies on the given triplet.
    ///
    /// An absent qualifier applies everywhere; a present one must equal the
    /// triplet name exactly.
    pub fn matches_triplet(&self, triplet: &str) -> bool {
        match &self.platform {
            Some(platform) => platform == triplet,
            None => true,
        }
    }

    /// Resolve against a concrete triplet, producing a [`FeatureSpec`].
    ///
    /// An absent feature resolves to the empty feature (the core synonym).
    pub fn to_feature_spec(&self, triplet: &str) -> FeatureSpec {
        FeatureSpec::new(
            PackageSpec::new(self.name.clone(), triplet),
            self.feature.clone().unwrap_or_default(),
        )
    }
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(feature) = &self.feature {
            write!(f, "[{}]", feature)?;
        }
        if let Some(platform) = &self.platform {
            write!(f, " ({})", platform)?;
        }
        Ok(())
    }
}

fn malformed(raw: &str, message: &str) -> Error {
    Error::Parse {
        name: raw.to_string(),
        message: message.to_string(),
    }
}
