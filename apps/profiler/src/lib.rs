//! HR profile generator: turns a natural-language job description request into
//! a structured JSON profile using a hosted completion API.

pub mod config;
pub mod errors;
pub mod llm_client;
pub mod profile;
pub mod routes;
pub mod state;
