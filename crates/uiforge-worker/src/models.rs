// Assistant descriptors
//
// Static metadata the HTTP layer publishes for each registered pipeline.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AssistantSummary {
    pub assistant_id: String,
    pub graph_id: String,
    pub name: String,
    pub description: String,
    #[schema(value_type = Object)]
    pub metadata: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl GraphNode {
    pub fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            description: None,
        }
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

impl GraphEdge {
    pub fn new(source: &str, target: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
        }
    }
}

/// Node/edge view of a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GraphInfo {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphInfo {
    /// Steps chained in order, each pointing at the next
    pub fn chain(steps: &[(&str, &str)]) -> Self {
        let nodes: Vec<GraphNode> = steps
            .iter()
            .map(|(id, label)| GraphNode::new(id, label))
            .collect();
        let edges = nodes
            .windows(2)
            .map(|pair| GraphEdge::new(&pair[0].id, &pair[1].id))
            .collect();
        Self { nodes, edges }
    }
}

/// JSON schemas of a pipeline's input, output, state and config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GraphSchemas {
    pub graph_id: String,
    #[schema(value_type = Object)]
    pub input_schema: Value,
    #[schema(value_type = Object)]
    pub output_schema: Value,
    #[schema(value_type = Object)]
    pub state_schema: Value,
    #[schema(value_type = Object)]
    pub config_schema: Value,
}
