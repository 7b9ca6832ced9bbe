pub mod openrouter;
pub mod provider;

pub use openrouter::{ChatCompletionResponse, OpenRouterProvider};
pub use provider::{CompletionProvider, Message, Role};
