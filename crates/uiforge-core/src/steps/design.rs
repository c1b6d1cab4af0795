// Component designer step (deterministic, no LLM)

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::channels::StateUpdate;
use crate::error::{GeneratorError, Result};
use crate::events::GeneratorEvent;
use crate::state::{
    DesignSpec, DesignStyling, Interaction, LayoutSpec, LayoutType, Requirements, SessionState,
    Stage, Theme,
};
use crate::step::{GenerationStep, StepContext, StepOutcome};

/// Maps requirements to a design spec
#[derive(Debug, Default, Clone, Copy)]
pub struct ComponentDesigner;

#[async_trait]
impl GenerationStep<SessionState> for ComponentDesigner {
    fn name(&self) -> &'static str {
        "component-designer"
    }

    async fn execute(
        &self,
        state: &SessionState,
        ctx: &StepContext<'_>,
    ) -> Result<StepOutcome<StateUpdate>> {
        let requirements = state
            .requirements
            .as_ref()
            .ok_or_else(|| GeneratorError::missing(self.name(), "requirements"))?;

        let design = design_from_requirements(requirements);
        ctx.emit(GeneratorEvent::log(format!(
            "Design ready: {:?} layout, {} element(s), {} interaction(s)",
            design.layout.kind,
            design.component_hierarchy.len(),
            design.interactions.len()
        )))
        .await?;

        Ok(StepOutcome::proceed(
            StateUpdate::new()
                .design_spec(design)
                .current_step(Stage::Code)
                .touch(),
        ))
    }
}

/// Derive the design spec from requirements
pub fn design_from_requirements(requirements: &Requirements) -> DesignSpec {
    let styling = &requirements.styling;
    let dark = styling.theme == Theme::Dark;

    let kind = match styling.layout.as_str() {
        "modern" => LayoutType::Flex,
        "minimal" => LayoutType::Grid,
        _ => LayoutType::Stack,
    };

    let component_hierarchy = if requirements.components.is_empty() {
        vec!["Container".to_string(), "Content".to_string()]
    } else {
        requirements.components.clone()
    };

    let mut classes = BTreeMap::new();
    classes.insert(
        "Container".to_string(),
        to_strings(&[
            "min-h-screen",
            if dark { "bg-gray-900" } else { "bg-gray-50" },
            "flex",
            "items-center",
            "justify-center",
            "p-6",
        ]),
    );
    classes.insert(
        "Content".to_string(),
        to_strings(&[
            if dark { "bg-gray-800" } else { "bg-white" },
            "rounded-2xl",
            "shadow-xl",
            "p-8",
            "max-w-md",
            "w-full",
        ]),
    );

    let interactions = requirements
        .features
        .iter()
        .map(|feature| Interaction {
            trigger: "click".to_string(),
            action: format!(
                "handle{}",
                feature.split_whitespace().collect::<String>()
            ),
            target: feature.clone(),
        })
        .collect();

    DesignSpec {
        component_hierarchy,
        layout: LayoutSpec {
            kind,
            direction: "column".to_string(),
            spacing: "md".to_string(),
            padding: "lg".to_string(),
        },
        styling: DesignStyling {
            framework: "tailwind".to_string(),
            theme: styling.theme,
            color_scheme: styling.color_scheme.clone(),
            classes,
        },
        interactions,
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Styling;
    use crate::traits::NoopEventEmitter;

    fn requirements(layout: &str, theme: Theme, features: &[&str]) -> Requirements {
        Requirements {
            raw_input: "x".to_string(),
            features: to_strings(features),
            styling: Styling {
                theme,
                color_scheme: "emerald".to_string(),
                layout: layout.to_string(),
            },
            components: vec![],
            clarification_needed: false,
            clarification_questions: vec![],
        }
    }

    #[test]
    fn test_layout_selection() {
        let kind = |layout| design_from_requirements(&requirements(layout, Theme::Light, &[])).layout.kind;
        assert_eq!(kind("modern"), LayoutType::Flex);
        assert_eq!(kind("minimal"), LayoutType::Grid);
        assert_eq!(kind("classic"), LayoutType::Stack);
    }

    #[test]
    fn test_dark_theme_classes() {
        let design = design_from_requirements(&requirements("modern", Theme::Dark, &[]));
        assert!(design.styling.classes["Container"].contains(&"bg-gray-900".to_string()));
        assert!(design.styling.classes["Content"].contains(&"bg-gray-800".to_string()));
        assert!(!design.styling.classes["Content"].contains(&"bg-white".to_string()));
        assert_eq!(design.styling.color_scheme, "emerald");
        assert_eq!(design.component_hierarchy, vec!["Container", "Content"]);
    }

    #[test]
    fn test_one_interaction_per_feature() {
        let design =
            design_from_requirements(&requirements("modern", Theme::Light, &["add todo", "Filter"]));
        assert_eq!(design.interactions.len(), 2);
        assert_eq!(design.interactions[0].action, "handleaddtodo");
        assert_eq!(design.interactions[0].target, "add todo");
        assert_eq!(design.interactions[1].trigger, "click");
    }

    #[tokio::test]
    async fn test_missing_requirements_is_precondition_error() {
        let state = SessionState::new("s");
        let emitter = NoopEventEmitter;
        let result = ComponentDesigner
            .execute(&state, &StepContext::new(&emitter))
            .await;
        assert!(matches!(
            result,
            Err(GeneratorError::MissingPrecursor {
                missing: "requirements",
                ..
            })
        ));
    }
}
