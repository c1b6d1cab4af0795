// Assistant registry
//
// Registration order matters: the first registered assistant is the default
// for runs that do not name one.

use std::sync::Arc;
use uiforge_core::{LlmDriver, LlmSettings, SupervisorConfig};
use uiforge_storage::ThreadValues;

use crate::assistants::{Assistant, ScaffoldAssistant, SupervisorAssistant};
use crate::error::{Result, RunError};
use crate::models::AssistantSummary;

#[derive(Clone, Default)]
pub struct AssistantRegistry {
    assistants: Vec<Arc<dyn Assistant>>,
}

impl AssistantRegistry {
    /// Registry with both pipelines: `v0-generator` (default) and
    /// `v0-generator-subgraphs`
    pub fn new(llm: Arc<dyn LlmDriver>, settings: &LlmSettings, config: &SupervisorConfig) -> Self {
        let mut registry = Self::default();
        registry.register(Arc::new(ScaffoldAssistant::new(Arc::clone(&llm), settings)));
        registry.register(Arc::new(SupervisorAssistant::new(llm, config)));
        registry
    }

    /// Add an assistant; a later registration with the same id replaces it in place
    pub fn register(&mut self, assistant: Arc<dyn Assistant>) {
        let id = assistant.assistant_id();
        match self.assistants.iter().position(|a| a.assistant_id() == id) {
            Some(index) => self.assistants[index] = assistant,
            None => self.assistants.push(assistant),
        }
    }

    pub fn get(&self, assistant_id: &str) -> Result<Arc<dyn Assistant>> {
        self.assistants
            .iter()
            .find(|a| a.assistant_id() == assistant_id)
            .cloned()
            .ok_or_else(|| RunError::AssistantNotFound(assistant_id.to_string()))
    }

    pub fn default_assistant(&self) -> Result<Arc<dyn Assistant>> {
        self.assistants
            .first()
            .cloned()
            .ok_or_else(|| RunError::AssistantNotFound("default".to_string()))
    }

    /// Explicit id, or the default when none is given
    pub fn resolve(&self, assistant_id: Option<&str>) -> Result<Arc<dyn Assistant>> {
        match assistant_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => self.get(id),
            None => self.default_assistant(),
        }
    }

    /// The assistant whose pipeline produced `values`
    pub fn owner_of(&self, values: &ThreadValues) -> Option<Arc<dyn Assistant>> {
        self.assistants.iter().find(|a| a.owns(values)).cloned()
    }

    /// Summaries, optionally filtered by graph id
    pub fn search(&self, graph_id: Option<&str>) -> Vec<AssistantSummary> {
        self.assistants
            .iter()
            .map(|a| a.summary())
            .filter(|summary| graph_id.map_or(true, |id| summary.graph_id == id))
            .collect()
    }
}
