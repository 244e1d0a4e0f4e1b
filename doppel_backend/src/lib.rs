pub mod commands;
pub mod config;
pub mod engine;
pub mod gateway;
pub mod http_client;
pub mod llm_client;
pub mod memory;
pub mod prompt;
pub mod random;
pub mod trigger;
