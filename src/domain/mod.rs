//! Read-only records supplied by the caller
//!
//! The catalog, the user profile and the conversation history are owned by
//! external storage. The orchestration layer only reads and echoes them.

pub mod product;
pub mod profile;

pub use product::{FinancialProduct, ProductType, RiskLevel};
pub use profile::{ConversationTurn, Role, UserProfile};
