//! Query intent: what the user is asking for
//!
//! An [`ExtractedIntent`] is produced once per request, either by parsing a
//! model's structured reply or by the local keyword scan, and is never mutated
//! afterwards.

pub mod classifier;
pub mod parser;

pub use classifier::IntentClassifier;
pub use parser::{ReplyParseError, keyword_scan, parse_reply};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Closed set of intent categories
///
/// Declaration order is the match order used when parsing model replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    ProductRecommendation,
    ProductComparison,
    RiskAssessment,
    InvestmentGoals,
    PortfolioReview,
    GeneralQuestion,
    #[default]
    Unknown,
}

impl IntentType {
    pub const ALL: [IntentType; 7] = [
        Self::ProductRecommendation,
        Self::ProductComparison,
        Self::RiskAssessment,
        Self::InvestmentGoals,
        Self::PortfolioReview,
        Self::GeneralQuestion,
        Self::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProductRecommendation => "product_recommendation",
            Self::ProductComparison => "product_comparison",
            Self::RiskAssessment => "risk_assessment",
            Self::InvestmentGoals => "investment_goals",
            Self::PortfolioReview => "portfolio_review",
            Self::GeneralQuestion => "general_question",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for IntentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk appetite stated or implied by the query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Low,
    Medium,
    High,
}

impl RiskTolerance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Exact, case-insensitive match against `low`/`medium`/`high`
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Closed set of investment goals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentGoal {
    Retirement,
    Education,
    HomePurchase,
    EmergencyFund,
    WealthBuilding,
    IncomeGeneration,
    TaxEfficiency,
}

impl InvestmentGoal {
    pub const ALL: [InvestmentGoal; 7] = [
        Self::Retirement,
        Self::Education,
        Self::HomePurchase,
        Self::EmergencyFund,
        Self::WealthBuilding,
        Self::IncomeGeneration,
        Self::TaxEfficiency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retirement => "retirement",
            Self::Education => "education",
            Self::HomePurchase => "home_purchase",
            Self::EmergencyFund => "emergency_fund",
            Self::WealthBuilding => "wealth_building",
            Self::IncomeGeneration => "income_generation",
            Self::TaxEfficiency => "tax_efficiency",
        }
    }
}

/// Budget bounds; at least one side is present whenever a range exists
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct BudgetRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl BudgetRange {
    /// `None` when both sides are absent
    pub fn new(min: Option<f64>, max: Option<f64>) -> Option<Self> {
        if min.is_none() && max.is_none() {
            None
        } else {
            Some(Self { min, max })
        }
    }
}

/// Structured interpretation of one query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedIntent {
    pub intent_type: IntentType,
    confidence: f64,
    pub risk_tolerance: Option<RiskTolerance>,
    pub investment_goals: Vec<InvestmentGoal>,
    pub investment_horizon: Option<String>,
    pub preferred_product_types: Vec<String>,
    pub budget_range: Option<BudgetRange>,
    pub keywords: Vec<String>,
    pub entities: BTreeMap<String, String>,
}

impl ExtractedIntent {
    /// Empty intent of the given category; confidence is clamped to [0, 1]
    pub fn new(intent_type: IntentType, confidence: f64) -> Self {
        Self {
            intent_type,
            confidence: clamp_unit(confidence),
            risk_tolerance: None,
            investment_goals: Vec::new(),
            investment_horizon: None,
            preferred_product_types: Vec::new(),
            budget_range: None,
            keywords: Vec::new(),
            entities: BTreeMap::new(),
        }
    }

    /// `unknown`, zero confidence, keywords from the local scan of `query`
    pub fn fallback(query: &str) -> Self {
        let mut intent = Self::new(IntentType::Unknown, 0.0);
        intent.keywords = keyword_scan(query);
        intent
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Consistency check used before trusting an intent
    ///
    /// Rejects low confidence (< 0.3), the `unknown` category, and a low risk
    /// tolerance paired with an "aggressive" keyword.
    pub fn validate(&self) -> bool {
        if self.confidence < 0.3 {
            return false;
        }
        if self.intent_type == IntentType::Unknown {
            return false;
        }
        if self.risk_tolerance == Some(RiskTolerance::Low)
            && self.keywords.iter().any(|k| k == "aggressive")
        {
            return false;
        }
        true
    }
}

/// Clamp into [0, 1]; NaN reads as 0
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
