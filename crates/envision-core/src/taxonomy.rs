//! Closed category vocabularies used by the four tree layers.
//!
//! The sub-harm to harm-theme mapping is global, read-only lookup data.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UseCaseCategory {
    #[serde(rename = "Intended")]
    Intended,
    #[serde(rename = "High-stakes")]
    HighStakes,
    #[serde(rename = "Misuse")]
    Misuse,
}

impl UseCaseCategory {
    pub const ALL: [Self; 3] = [Self::Intended, Self::HighStakes, Self::Misuse];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Intended => "Intended",
            Self::HighStakes => "High-stakes",
            Self::Misuse => "Misuse",
        }
    }
}

impl fmt::Display for UseCaseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StakeholderCategory {
    Direct,
    Indirect,
}

impl StakeholderCategory {
    pub const ALL: [Self; 2] = [Self::Direct, Self::Indirect];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "Direct",
            Self::Indirect => "Indirect",
        }
    }

    /// Parses the attribute/tag spelling used in generation responses.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "direct" => Some(Self::Direct),
            "indirect" => Some(Self::Indirect),
            _ => None,
        }
    }
}

impl fmt::Display for StakeholderCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse stakeholder relevance: `relevant` (1) or `very relevant` (2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Relevance {
    Relevant = 1,
    VeryRelevant = 2,
}

impl Relevance {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "relevant" => Some(Self::Relevant),
            "very relevant" => Some(Self::VeryRelevant),
            _ => None,
        }
    }

    pub fn score(self) -> u8 {
        self as u8
    }
}

impl From<Relevance> for u8 {
    fn from(value: Relevance) -> Self {
        value.score()
    }
}

impl TryFrom<u8> for Relevance {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Relevant),
            2 => Ok(Self::VeryRelevant),
            other => Err(format!("relevance out of range: {other}")),
        }
    }
}

/// Model-estimated harm severity, 1 (not severe) to 3 (very severe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Severity {
    NotSevere = 1,
    Severe = 2,
    VerySevere = 3,
}

impl Severity {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "not severe" => Some(Self::NotSevere),
            "severe" => Some(Self::Severe),
            "very severe" => Some(Self::VerySevere),
            _ => None,
        }
    }

    pub fn score(self) -> u8 {
        self as u8
    }
}

impl From<Severity> for u8 {
    fn from(value: Severity) -> Self {
        value.score()
    }
}

impl TryFrom<u8> for Severity {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::NotSevere),
            2 => Ok(Self::Severe),
            3 => Ok(Self::VerySevere),
            other => Err(format!("severity out of range: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HarmTheme {
    #[serde(rename = "Representational harms")]
    Representational,
    #[serde(rename = "Allocative harms")]
    Allocative,
    #[serde(rename = "Quality of service harms")]
    QualityOfService,
    #[serde(rename = "Interpersonal harms")]
    Interpersonal,
    #[serde(rename = "Societal harms")]
    Societal,
}

impl HarmTheme {
    pub const ALL: [Self; 5] = [
        Self::Representational,
        Self::Allocative,
        Self::QualityOfService,
        Self::Interpersonal,
        Self::Societal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Representational => "Representational harms",
            Self::Allocative => "Allocative harms",
            Self::QualityOfService => "Quality of service harms",
            Self::Interpersonal => "Interpersonal harms",
            Self::Societal => "Societal harms",
        }
    }

    /// Sub-harms of this theme, in vocabulary order.
    pub fn sub_harms(self) -> impl Iterator<Item = SubHarmCategory> {
        SubHarmCategory::ALL
            .into_iter()
            .filter(move |s| s.theme() == self)
    }
}

impl fmt::Display for HarmTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SubHarmCategory {
    #[serde(rename = "Stereotyping")]
    Stereotyping,
    #[serde(rename = "Demeaning and alienating social groups")]
    Demeaning,
    #[serde(rename = "Denying people opportunity to self-identify")]
    DenyingSelfIdentity,
    #[serde(rename = "Opportunity loss")]
    OpportunityLoss,
    #[serde(rename = "Economic loss")]
    EconomicLoss,
    #[serde(rename = "Alienation")]
    Alienation,
    #[serde(rename = "Increased labor")]
    IncreasedLabor,
    #[serde(rename = "Service or benefit loss")]
    ServiceLoss,
    #[serde(rename = "Loss of agency or social control")]
    LossOfAgency,
    #[serde(rename = "Technology-facilitated violence")]
    FacilitatedViolence,
    #[serde(rename = "Diminished health and well-being")]
    DiminishedHealth,
    #[serde(rename = "Privacy violations")]
    PrivacyViolations,
    #[serde(rename = "Information harms")]
    Information,
    #[serde(rename = "Cultural harms")]
    Cultural,
    #[serde(rename = "Political and civic harms")]
    Political,
    #[serde(rename = "Macro socio-economic harms")]
    MacroSocioEconomic,
    #[serde(rename = "Environmental harms")]
    Environmental,
}

impl SubHarmCategory {
    pub const ALL: [Self; 17] = [
        Self::Stereotyping,
        Self::Demeaning,
        Self::DenyingSelfIdentity,
        Self::OpportunityLoss,
        Self::EconomicLoss,
        Self::Alienation,
        Self::IncreasedLabor,
        Self::ServiceLoss,
        Self::LossOfAgency,
        Self::FacilitatedViolence,
        Self::DiminishedHealth,
        Self::PrivacyViolations,
        Self::Information,
        Self::Cultural,
        Self::Political,
        Self::MacroSocioEconomic,
        Self::Environmental,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stereotyping => "Stereotyping",
            Self::Demeaning => "Demeaning and alienating social groups",
            Self::DenyingSelfIdentity => "Denying people opportunity to self-identify",
            Self::OpportunityLoss => "Opportunity loss",
            Self::EconomicLoss => "Economic loss",
            Self::Alienation => "Alienation",
            Self::IncreasedLabor => "Increased labor",
            Self::ServiceLoss => "Service or benefit loss",
            Self::LossOfAgency => "Loss of agency or social control",
            Self::FacilitatedViolence => "Technology-facilitated violence",
            Self::DiminishedHealth => "Diminished health and well-being",
            Self::PrivacyViolations => "Privacy violations",
            Self::Information => "Information harms",
            Self::Cultural => "Cultural harms",
            Self::Political => "Political and civic harms",
            Self::MacroSocioEconomic => "Macro socio-economic harms",
            Self::Environmental => "Environmental harms",
        }
    }

    /// Compact label used for placeholder hints.
    pub fn short_label(self) -> &'static str {
        match self {
            Self::Stereotyping => "Stereotyping",
            Self::Demeaning => "Demeaning groups",
            Self::DenyingSelfIdentity => "Loss self-identity",
            Self::OpportunityLoss => "Opportunity loss",
            Self::EconomicLoss => "Economic loss",
            Self::Alienation => "Alienation",
            Self::IncreasedLabor => "Increased labor",
            Self::ServiceLoss => "Service loss",
            Self::LossOfAgency => "Loss of agency",
            Self::FacilitatedViolence => "Facilitated violence",
            Self::DiminishedHealth => "Diminished health",
            Self::PrivacyViolations => "Privacy violations",
            Self::Information => "Information harms",
            Self::Cultural => "Cultural harms",
            Self::Political => "Political harms",
            Self::MacroSocioEconomic => "Macro-economic harms",
            Self::Environmental => "Environmental harms",
        }
    }

    pub fn theme(self) -> HarmTheme {
        match self {
            Self::Stereotyping | Self::Demeaning | Self::DenyingSelfIdentity => {
                HarmTheme::Representational
            }
            Self::OpportunityLoss | Self::EconomicLoss => HarmTheme::Allocative,
            Self::Alienation | Self::IncreasedLabor | Self::ServiceLoss => {
                HarmTheme::QualityOfService
            }
            Self::LossOfAgency
            | Self::FacilitatedViolence
            | Self::DiminishedHealth
            | Self::PrivacyViolations => HarmTheme::Interpersonal,
            Self::Information
            | Self::Cultural
            | Self::Political
            | Self::MacroSocioEconomic
            | Self::Environmental => HarmTheme::Societal,
        }
    }

    /// Exact (case-insensitive) lookup against the vocabulary.
    pub fn from_label(label: &str) -> Option<Self> {
        let needle = label.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().to_lowercase() == needle)
    }

    /// Resolves a free-form type string to the vocabulary entry sharing the most
    /// words with it. Ties keep the earliest entry; an empty string resolves to
    /// [`SubHarmCategory::EconomicLoss`].
    pub fn nearest(label: &str) -> Self {
        if label.trim().is_empty() {
            return Self::EconomicLoss;
        }
        let mut best = Self::EconomicLoss;
        let mut best_count: Option<usize> = None;
        for candidate in Self::ALL {
            let count = common_word_count(&candidate.as_str().to_lowercase(), label);
            if best_count.is_none_or(|b| count > b) {
                best = candidate;
                best_count = Some(count);
            }
        }
        best
    }
}

impl fmt::Display for SubHarmCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of distinct lowercase words shared by two phrases.
pub fn common_word_count(a: &str, b: &str) -> usize {
    let words = |s: &str| {
        s.to_lowercase()
            .split(|c: char| !c.is_alphanumeric() && c != '-')
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect::<rustc_hash::FxHashSet<String>>()
    };
    let a = words(a);
    let b = words(b);
    a.intersection(&b).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_theme_owns_at_least_one_sub_harm() {
        for theme in HarmTheme::ALL {
            assert!(theme.sub_harms().next().is_some(), "{theme} has no sub-harms");
        }
        let total: usize = HarmTheme::ALL.iter().map(|t| t.sub_harms().count()).sum();
        assert_eq!(total, SubHarmCategory::ALL.len());
    }

    #[test]
    fn nearest_prefers_the_most_shared_words() {
        assert_eq!(
            SubHarmCategory::nearest("loss of social agency"),
            SubHarmCategory::LossOfAgency
        );
        assert_eq!(
            SubHarmCategory::nearest("health harms"),
            SubHarmCategory::DiminishedHealth
        );
        assert_eq!(SubHarmCategory::nearest(""), SubHarmCategory::EconomicLoss);
    }

    #[test]
    fn label_lookup_is_case_insensitive() {
        assert_eq!(
            SubHarmCategory::from_label("privacy VIOLATIONS"),
            Some(SubHarmCategory::PrivacyViolations)
        );
        assert_eq!(SubHarmCategory::from_label("privacy"), None);
    }

    #[test]
    fn severity_and_relevance_labels() {
        assert_eq!(Severity::from_label("Very Severe"), Some(Severity::VerySevere));
        assert_eq!(Severity::from_label("mild"), None);
        assert_eq!(Relevance::from_label("very relevant"), Some(Relevance::VeryRelevant));
        assert_eq!(Relevance::VeryRelevant.score(), 2);
    }
}
