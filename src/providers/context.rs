//! System preamble rendering shared by every backend

use crate::domain::{ConversationTurn, FinancialProduct, UserProfile};
use crate::providers::GenerationContext;

/// Default advisor persona opening every system preamble
pub const ADVISOR_PERSONA: &str = "You are a financial product recommendation assistant. \
Provide helpful, accurate, and personalized financial product recommendations based on user \
queries and available products. Always consider risk tolerance, investment goals, and \
regulatory compliance.";

/// Number of most recent conversation turns forwarded to a backend
pub const HISTORY_WINDOW: usize = 5;

/// The last [`HISTORY_WINDOW`] turns, oldest first
pub fn recent_history(history: &[ConversationTurn]) -> &[ConversationTurn] {
    let start = history.len().saturating_sub(HISTORY_WINDOW);
    &history[start..]
}

/// Build the system preamble for a generation call
///
/// Sections for products, profile and history appear only when the context
/// carries them. Chat-style backends that send history as role messages pass
/// `include_history = false`.
pub fn system_preamble(context: &GenerationContext<'_>, include_history: bool) -> String {
    let mut preamble = String::from(ADVISOR_PERSONA);

    if !context.products.is_empty() {
        preamble.push_str("\n\nAvailable financial products:\n");
        preamble.push_str(&render_products(context.products));
    }

    if let Some(profile) = context.profile {
        preamble.push_str("\n\nUser profile:\n");
        preamble.push_str(&render_profile(profile));
    }

    if include_history && !context.history.is_empty() {
        preamble.push_str("\n\nConversation history:\n");
        preamble.push_str(&render_history(context.history));
    }

    preamble
}

/// One line per product: `- name (type): Risk: .., Expected Return: .., Min Investment: .., Expense Ratio: ..`
pub fn render_products(products: &[FinancialProduct]) -> String {
    products
        .iter()
        .map(|p| {
            format!(
                "- {} ({}): Risk: {}, Expected Return: {}, Min Investment: {}, Expense Ratio: {}",
                p.name,
                p.product_type,
                p.risk_level,
                p.expected_return,
                p.minimum_investment_display(),
                p.expense_ratio_display()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_profile(profile: &UserProfile) -> String {
    format!(
        "User ID: {}\nRisk Tolerance: {}\nInvestment Goals: {}\nTime Horizon: {}\nPreferred Products: {}",
        profile.user_id,
        profile.risk_tolerance,
        profile.investment_goals.join(", "),
        profile.time_horizon,
        profile.preferred_products_label()
    )
}

/// Recent history as `Speaker: content` lines, newest last
pub fn render_history(history: &[ConversationTurn]) -> String {
    recent_history(history)
        .iter()
        .map(|turn| format!("{}: {}", turn.role.speaker(), turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}
