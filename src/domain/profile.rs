//! User profile and conversation history records

use crate::domain::{ProductType, RiskLevel};
use serde::{Deserialize, Serialize};

/// Investment profile of the person asking
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UserProfile {
    pub user_id: String,
    pub risk_tolerance: RiskLevel,
    #[serde(default)]
    pub investment_goals: Vec<String>,
    #[serde(default)]
    pub time_horizon: String,
    #[serde(default)]
    pub preferred_product_types: Vec<ProductType>,
}

impl UserProfile {
    /// Comma-separated preferred product labels, as rendered into prompts
    pub fn preferred_products_label(&self) -> String {
        self.preferred_product_types
            .iter()
            .map(ProductType::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// Wire role for chat-style APIs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }

    /// Speaker label used when history is flattened into prompt text
    pub fn speaker(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
            Self::System => "System",
        }
    }
}

/// One past message, oldest first in any history slice
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}
