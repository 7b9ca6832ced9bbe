pub mod persona;

pub use persona::{PersonaPromptBuilder, LUNA_PERSONA};
