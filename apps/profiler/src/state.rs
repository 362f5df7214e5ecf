use std::sync::Arc;

use crate::profile::generator::ProfileGenerator;

/// Shared application state injected into all route handlers via Axum extractors.
/// Requests share nothing mutable; the generator only holds the HTTP
/// connection pool and immutable defaults.
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<ProfileGenerator>,
}

impl AppState {
    pub fn new(generator: ProfileGenerator) -> Self {
        Self {
            generator: Arc::new(generator),
        }
    }
}
