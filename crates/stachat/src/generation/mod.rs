//! Text generation: model allow-list, prompt template and the OpenAI backend.

pub mod models;
pub mod openai;
pub mod prompt;

pub use models::ModelAllowList;
pub use openai::OpenAiChatBackend;
pub use prompt::{PromptTemplate, DEFAULT_TEMPLATE};
