// Error types for the generator engine

use thiserror::Error;

/// Result type alias for generator operations
pub type Result<T> = std::result::Result<T, GeneratorError>;

/// Errors that can occur while running a generation workflow
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// No user message available to parse
    #[error("No user message found in session")]
    MissingInput,

    /// A step ran without the state produced by an earlier step
    #[error("Step '{step}' requires {missing}, which has not been produced yet")]
    MissingPrecursor {
        step: &'static str,
        missing: &'static str,
    },

    /// LLM output could not be parsed into the expected shape
    #[error("Malformed LLM response: {reason}")]
    MalformedLlmResponse { reason: String, excerpt: String },

    /// LLM or network failure while generating component code
    #[error("Code generation failed: {0}")]
    CodeGeneration(String),

    /// Router encountered an unrecognized step name (logged, never returned by route)
    #[error("Unknown step '{0}', restarting at requirements")]
    UnknownStep(String),

    /// Feedback arrived after the configured number of revision rounds
    #[error("Iteration limit ({0}) reached; approve the current component or start a new thread")]
    IterationLimit(u32),

    /// The engine dispatched more steps in one run than allowed
    #[error("Step limit ({0}) exceeded in a single run")]
    StepLimitExceeded(usize),

    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Event emission error
    #[error("Event emission error: {0}")]
    EventEmission(String),

    /// State persistence error
    #[error("State sink error: {0}")]
    StateSink(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl GeneratorError {
    /// Create an LLM error
    pub fn llm(msg: impl Into<String>) -> Self {
        GeneratorError::Llm(msg.into())
    }

    /// Create a precondition error for a step
    pub fn missing(step: &'static str, missing: &'static str) -> Self {
        GeneratorError::MissingPrecursor { step, missing }
    }

    /// Create a malformed response error, keeping a short excerpt for logs
    pub fn malformed(reason: impl Into<String>, raw: &str) -> Self {
        GeneratorError::MalformedLlmResponse {
            reason: reason.into(),
            excerpt: raw.chars().take(200).collect(),
        }
    }

    /// Create a code generation error
    pub fn code(msg: impl Into<String>) -> Self {
        GeneratorError::CodeGeneration(msg.into())
    }

    /// Create an event emission error
    pub fn event(msg: impl Into<String>) -> Self {
        GeneratorError::EventEmission(msg.into())
    }

    /// Create a state sink error
    pub fn sink(msg: impl Into<String>) -> Self {
        GeneratorError::StateSink(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        GeneratorError::Configuration(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_truncates_excerpt() {
        let raw = "x".repeat(500);
        match GeneratorError::malformed("bad json", &raw) {
            GeneratorError::MalformedLlmResponse { excerpt, .. } => assert_eq!(excerpt.len(), 200),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_precursor_message() {
        let err = GeneratorError::missing("component-designer", "requirements");
        assert_eq!(
            err.to_string(),
            "Step 'component-designer' requires requirements, which has not been produced yet"
        );
    }
}
