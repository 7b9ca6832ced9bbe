pub mod flow;
pub mod reply;
pub mod session;

pub use flow::MessageFlow;
pub use reply::{extract_api_error, sanitize_reply, FALLBACK_REPLY};
pub use session::{
    ChatLog, ChatMessage, ChatSession, FlowState, PendingTurn, Reply, SendOutcome, Sender,
    NEEDS_SETUP_REPLY,
};
