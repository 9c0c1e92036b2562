//! Command-line host for the hiring pipeline.
//!
//! Wires the pipeline library to a real chat-completions endpoint
//! ([`llm_client`]), a JSON-lines store ([`store`]) and layered
//! configuration ([`config`]).

pub mod config;
pub mod llm_client;
pub mod store;

pub use config::{AgentConfig, FileConfig, LlmEndpoint};
pub use llm_client::HttpLanguageModel;
pub use store::{FileStore, Row};
