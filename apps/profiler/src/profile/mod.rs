// HR profile generation: schema loading, instruction building, tolerant JSON
// extraction and the pipeline that ties them together.
// All completion calls go through llm_client.

pub mod extractor;
pub mod generator;
pub mod handlers;
pub mod prompts;
pub mod schema;
