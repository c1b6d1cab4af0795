// Supervisor generation steps
//
// Four steps, each a GenerationStep over SessionState:
// - requirements: LLM parses the latest user message into Requirements
// - design: deterministic mapping from Requirements to a DesignSpec
// - code: LLM renders the DesignSpec as self-contained HTML/Tailwind
// - preview: the human-in-the-loop gate (approve, feedback, or wait)

mod code;
mod design;
mod preview;
mod requirements;

pub use code::CodeGenerator;
pub use design::{design_from_requirements, ComponentDesigner};
pub use preview::{PreviewIteration, APPROVED_MESSAGE, READY_MESSAGE};
pub use requirements::{parse_requirements, RequirementsParser};

use serde::{Deserialize, Serialize};

use crate::step::StepKey;

/// Step keys of the supervisor table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupervisorStep {
    Requirements,
    Design,
    Code,
    Preview,
}

impl SupervisorStep {
    pub const ALL: [SupervisorStep; 4] = [
        SupervisorStep::Requirements,
        SupervisorStep::Design,
        SupervisorStep::Code,
        SupervisorStep::Preview,
    ];
}

impl StepKey for SupervisorStep {
    fn id(&self) -> &'static str {
        match self {
            SupervisorStep::Requirements => "requirements",
            SupervisorStep::Design => "design",
            SupervisorStep::Code => "code",
            SupervisorStep::Preview => "preview",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            SupervisorStep::Requirements => "Requirements Parser",
            SupervisorStep::Design => "Component Designer",
            SupervisorStep::Code => "Code Generator",
            SupervisorStep::Preview => "Preview & Iteration",
        }
    }
}
