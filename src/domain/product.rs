//! Financial product catalog entries

use serde::{Deserialize, Serialize};
use std::fmt;

/// Types of financial products
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    MutualFund,
    Etf,
    Bond,
    Stock,
    Option,
    Future,
    Crypto,
    RealEstate,
}

impl ProductType {
    /// Catalog label, identical to the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MutualFund => "mutual_fund",
            Self::Etf => "etf",
            Self::Bond => "bond",
            Self::Stock => "stock",
            Self::Option => "option",
            Self::Future => "future",
            Self::Crypto => "crypto",
            Self::RealEstate => "real_estate",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog risk rating of a product (also used for a user's stated tolerance)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryLow => "very_low",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::VeryHigh => "very_high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single catalog entry
///
/// Identified by `product_id`. Only `product_id`, `name`, `type` and
/// `risk_level` are required when deserializing; everything else defaults.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FinancialProduct {
    pub product_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub issuer: String,
    /// Free-text range such as "5-8%"
    #[serde(default)]
    pub expected_return: String,
    #[serde(default)]
    pub minimum_investment: f64,
    /// Fraction, e.g. `0.0125` for 1.25%
    #[serde(default)]
    pub expense_ratio: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl FinancialProduct {
    /// Create a product with the required fields; optional fields start empty
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        product_type: ProductType,
        risk_level: RiskLevel,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            product_type,
            risk_level,
            description: String::new(),
            issuer: String::new(),
            expected_return: String::new(),
            minimum_investment: 0.0,
            expense_ratio: None,
            tags: Vec::new(),
            categories: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_expected_return(mut self, expected_return: impl Into<String>) -> Self {
        self.expected_return = expected_return.into();
        self
    }

    pub fn with_minimum_investment(mut self, amount: f64) -> Self {
        self.minimum_investment = amount;
        self
    }

    pub fn with_expense_ratio(mut self, ratio: f64) -> Self {
        self.expense_ratio = Some(ratio);
        self
    }

    /// Minimum investment as whole dollars with thousands separators ("$1,000")
    pub fn minimum_investment_display(&self) -> String {
        format_currency(self.minimum_investment)
    }

    /// Expense ratio as a percentage with two decimals ("1.25%"); missing reads as 0
    pub fn expense_ratio_display(&self) -> String {
        format!("{:.2}%", self.expense_ratio.unwrap_or(0.0) * 100.0)
    }
}

/// Format an amount as `$12,345` (rounded to whole units)
pub fn format_currency(amount: f64) -> String {
    let whole = format!("{:.0}", amount.abs());
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0.0 && whole != "0" { "-" } else { "" };
    format!("{sign}${grouped}")
}
