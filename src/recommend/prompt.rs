//! Recommendation prompt templates
//!
//! The formatting block is appended to every prompt unchanged; downstream
//! renderers depend on its headings.

use crate::domain::{FinancialProduct, UserProfile};
use crate::intent::{ExtractedIntent, IntentType};

pub const FORMATTING_BLOCK: &str = "\
**RESPONSE FORMATTING REQUIREMENTS:**

Please format your response in a clear, professional structure:

1. **Executive Summary** (2-3 sentences)
   - Brief overview of your recommendation
   - Key points for the user

2. **Analysis Section**
   - Market context and conditions
   - Risk assessment and considerations
   - Product suitability analysis

3. **Recommendations**
   - Specific product recommendations with clear reasoning
   - Allocation percentages and strategy
   - Implementation timeline

4. **Next Steps**
   - Clear action items for the user
   - Follow-up recommendations
   - Important considerations

**FORMATTING GUIDELINES:**
- Use clear headings with **bold** formatting
- Use bullet points (•) for lists
- Keep paragraphs concise (2-3 sentences max)
- Use professional, conversational tone
- Include specific numbers and percentages
- Add disclaimers where appropriate

**EXAMPLE STRUCTURE:**
**Executive Summary**
Brief overview here...

**Market Analysis**
• Current market conditions
• Key factors affecting recommendations

**Risk Assessment**
• Risk level: [Low/Medium/High]
• Key risk factors to consider

**Product Recommendations**
• **Product Name** (XX% allocation)
  - Expected return: X-X%
  - Risk level: [Low/Medium/High]
  - Reasoning: [Clear explanation]

**Implementation Strategy**
• Immediate actions
• Timeline for implementation
• Monitoring recommendations

**Important Disclaimers**
• Risk warnings
• Professional advice notice
";

const CLOSING_INSTRUCTIONS: &str = "\
Please provide a comprehensive response that includes:
1. A personalized recommendation based on the user's needs
2. Clear reasoning for your recommendations
3. Key considerations and risks
4. Next steps or additional questions if needed

Format your response using the structure above with clear headings, bullet points, and professional formatting.";

const EMPTY_CATALOG: &str = "No products available for recommendation.";

/// Advisor role statement for the intent category
pub fn base_prompt(intent_type: IntentType) -> &'static str {
    match intent_type {
        IntentType::ProductRecommendation => {
            "You are a financial advisor providing personalized product recommendations. \
             Based on the user's query and profile, recommend the most suitable financial products."
        }
        IntentType::ProductComparison => {
            "You are a financial advisor comparing financial products. \
             Provide a detailed comparison of the relevant products based on the user's needs."
        }
        IntentType::RiskAssessment => {
            "You are a financial advisor assessing risk tolerance and recommending \
             appropriate products based on the user's risk profile."
        }
        _ => {
            "You are a financial advisor providing helpful information about \
             financial products and investment strategies."
        }
    }
}

/// "Focus on" bullets for the intent category
pub fn intent_instructions(intent_type: IntentType) -> &'static str {
    match intent_type {
        IntentType::ProductRecommendation => {
            "Focus on:\n\
             - Matching products to user's risk tolerance and goals\n\
             - Explaining why each recommendation is suitable\n\
             - Providing clear next steps for the user"
        }
        IntentType::ProductComparison => {
            "Focus on:\n\
             - Comparing key features of relevant products\n\
             - Highlighting differences in risk, return, and costs\n\
             - Helping user understand trade-offs"
        }
        IntentType::RiskAssessment => {
            "Focus on:\n\
             - Understanding the user's risk tolerance\n\
             - Explaining risk-return relationships\n\
             - Recommending products appropriate for their risk level"
        }
        _ => {
            "Focus on:\n\
             - Providing helpful, accurate information\n\
             - Addressing the user's specific question\n\
             - Suggesting relevant products when appropriate"
        }
    }
}

/// Full composition prompt; the catalog is listed in full
pub fn recommendation_prompt(
    query: &str,
    intent: &ExtractedIntent,
    catalog: &[FinancialProduct],
    profile: Option<&UserProfile>,
) -> String {
    let user_context = profile.map(render_profile).unwrap_or_default();

    format!(
        "{base}\n\n{instructions}\n\n{FORMATTING_BLOCK}\nUser Query: \"{query}\"\n\n{user_context}\n\nAvailable Products:\n{products}\n\n{CLOSING_INSTRUCTIONS}\n",
        base = base_prompt(intent.intent_type),
        instructions = intent_instructions(intent.intent_type),
        products = render_catalog(catalog),
    )
}

fn render_profile(profile: &UserProfile) -> String {
    format!(
        "User Profile:\n- Risk Tolerance: {}\n- Investment Goals: {}\n- Time Horizon: {}\n- Preferred Products: {}",
        profile.risk_tolerance,
        profile.investment_goals.join(", "),
        profile.time_horizon,
        profile.preferred_products_label()
    )
}

/// Bulleted catalog listing, one block per product separated by blank lines
pub fn render_catalog(catalog: &[FinancialProduct]) -> String {
    if catalog.is_empty() {
        return EMPTY_CATALOG.to_string();
    }

    catalog
        .iter()
        .map(|p| {
            format!(
                "• {} ({})\n  - Risk Level: {}\n  - Expected Return: {}\n  - Minimum Investment: {}\n  - Expense Ratio: {}\n  - Description: {}",
                p.name,
                p.product_type,
                p.risk_level,
                p.expected_return,
                p.minimum_investment_display(),
                p.expense_ratio_display(),
                p.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
