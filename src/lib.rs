pub mod config;
pub mod corpus;
pub mod embeddings;
pub mod errors;
pub mod llm;
pub mod logging;
pub mod models;
pub mod rag;
pub mod session;
pub mod translate;

pub use config::AppConfig;
pub use errors::*;
pub use rag::ChatResponse;
pub use rag::ChatService;
