//! Supported distribution families and family-name matching

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of distribution families the sampler can draw from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionFamily {
    /// Normal (Gaussian) with mean and standard deviation
    Normal,
    /// Single Bernoulli trial yielding 0 or 1
    Bernoulli,
    /// Continuous uniform on [low, high)
    Uniform,
    /// Weighted choice among labels
    Categorical,
}

/// How a family string was recognized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FamilyMatch {
    /// The string was one of the canonical constants
    Exact(DistributionFamily),
    /// The string contained a known keyword (legacy free-text data)
    Keyword(DistributionFamily),
}

impl FamilyMatch {
    /// The recognized family
    pub fn family(&self) -> DistributionFamily {
        match self {
            Self::Exact(f) | Self::Keyword(f) => *f,
        }
    }
}

impl DistributionFamily {
    /// All families, in keyword-matching precedence order
    pub const ALL: [DistributionFamily; 4] = [
        DistributionFamily::Normal,
        DistributionFamily::Bernoulli,
        DistributionFamily::Uniform,
        DistributionFamily::Categorical,
    ];

    /// Canonical constant accepted by the strict parser
    pub fn id(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Bernoulli => "bernoulli",
            Self::Uniform => "uniform",
            Self::Categorical => "categorical",
        }
    }

    /// Lower-case keywords (Chinese and English) that identify this family
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Normal => &["正态", "normal", "gaussian", "高斯"],
            Self::Bernoulli => &["伯努利", "bernoulli"],
            Self::Uniform => &["均匀", "uniform"],
            Self::Categorical => &["分类", "categorical"],
        }
    }

    /// Parse one of the canonical constants, ignoring case and surrounding whitespace
    pub fn parse_strict(text: &str) -> Option<Self> {
        let normalized = text.trim().to_lowercase();
        Self::ALL.into_iter().find(|f| f.id() == normalized)
    }

    /// Case-insensitive keyword search; the first family in `ALL` order wins
    pub fn match_keywords(text: &str) -> Option<Self> {
        let normalized = text.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.keywords().iter().any(|k| normalized.contains(k)))
    }

    /// Recognize a family string; keyword matching is skipped when `strict` is set
    pub fn recognize(text: &str, strict: bool) -> Option<FamilyMatch> {
        if let Some(family) = Self::parse_strict(text) {
            return Some(FamilyMatch::Exact(family));
        }
        if strict {
            return None;
        }
        Self::match_keywords(text).map(FamilyMatch::Keyword)
    }
}

impl fmt::Display for DistributionFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
