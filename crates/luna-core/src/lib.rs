pub mod chat;
pub mod config;
pub mod cycle;
pub mod prompts;
pub mod providers;
pub mod storage;

pub use chat::{ChatLog, ChatMessage, ChatSession, FlowState, MessageFlow, Reply, SendOutcome, Sender};
pub use config::config::LunaConfig;
pub use config::credentials::Credentials;
pub use cycle::{
    calculate_cycle_day_and_phase, CalculateCycleRequest, CyclePhaseFetcher, CyclePhaseResult,
    CycleServiceError, CycleSetup, HttpCycleFetcher, Phase, SetupError, SetupForm, SetupHandler,
};
pub use prompts::{PersonaPromptBuilder, LUNA_PERSONA};
pub use providers::provider::{CompletionProvider, Message, Role};
pub use providers::OpenRouterProvider;
pub use storage::{InMemoryStore, KeyValueStore, SqliteStore};
