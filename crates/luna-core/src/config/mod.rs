#[allow(clippy::module_inception)]
pub mod config;
pub mod credentials;
pub use config::LunaConfig;
pub use credentials::Credentials;
