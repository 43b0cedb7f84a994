use std::fmt;

use serde::{Deserialize, Serialize};

/// The four developmental categories every question belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionDomain {
    Communication,
    Motor,
    SocialEmotional,
    Cognitive,
}

impl QuestionDomain {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Communication,
            Self::Motor,
            Self::SocialEmotional,
            Self::Cognitive,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Communication => "Communication",
            Self::Motor => "Motor",
            Self::SocialEmotional => "Social & Emotional",
            Self::Cognitive => "Cognitive",
        }
    }
}

/// Identifier wrapper for questions in the bank.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub String);

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inclusive month range a question applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub start: u16,
    pub end: u16,
}

impl AgeRange {
    pub const fn contains(self, age_months: u16) -> bool {
        self.start <= age_months && age_months <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub domain: QuestionDomain,
    pub prompt: String,
    pub age_range_months: AgeRange,
    /// Domain-local sort key.
    pub order: u16,
}

/// Coarse classification of an overall screening score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    High,
}

impl RiskLevel {
    /// Scores at or above this value classify as [`RiskLevel::High`].
    pub const HIGH_THRESHOLD: f64 = 50.0;

    pub fn classify(score: f64) -> Self {
        if score >= Self::HIGH_THRESHOLD {
            Self::High
        } else {
            Self::Low
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::High => "High",
        }
    }
}

/// Per-domain scores produced by the external scorer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainScores {
    pub communication: f64,
    pub motor: f64,
    pub social_emotional: f64,
    pub cognitive: f64,
}

impl DomainScores {
    pub fn get(&self, domain: QuestionDomain) -> f64 {
        match domain {
            QuestionDomain::Communication => self.communication,
            QuestionDomain::Motor => self.motor,
            QuestionDomain::SocialEmotional => self.social_emotional,
            QuestionDomain::Cognitive => self.cognitive,
        }
    }

    pub fn set(&mut self, domain: QuestionDomain, score: f64) {
        let slot = match domain {
            QuestionDomain::Communication => &mut self.communication,
            QuestionDomain::Motor => &mut self.motor,
            QuestionDomain::SocialEmotional => &mut self.social_emotional,
            QuestionDomain::Cognitive => &mut self.cognitive,
        };
        *slot = score;
    }
}
