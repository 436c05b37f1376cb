pub mod config;
pub mod llm;
pub mod render;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use llm::GroqClient;
pub use store::Store;
