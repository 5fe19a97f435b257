//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the orchestrator and
//! the stateless analyzers shared by every handler.

use std::sync::Arc;
use talkativ_core::{
    orchestrator::SessionOrchestrator, persona::PersonaCatalog, register::RegisterScorer,
    topic::TopicClassifier,
};

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub orchestrator: SessionOrchestrator,
    pub catalog: Arc<PersonaCatalog>,
    pub scorer: RegisterScorer,
    pub topics: TopicClassifier,
}

impl AppState {
    pub fn new(catalog: Arc<PersonaCatalog>, orchestrator: SessionOrchestrator) -> Self {
        Self {
            orchestrator,
            catalog,
            scorer: RegisterScorer::new(),
            topics: TopicClassifier::new(),
        }
    }
}
