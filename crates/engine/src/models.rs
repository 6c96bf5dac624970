//! Core domain models for the workflow engine.
//!
//! These types are the source of truth for what a workflow looks like
//! in memory.  They are supplied by an external definition layer and are
//! read-only to the engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Parameter values
// ---------------------------------------------------------------------------

/// A node parameter: either literal text or the result of another node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ParameterValue {
    Static(String),
    /// Id of the node whose result is read.
    Reference(String),
}

impl ParameterValue {
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Static(text.into())
    }

    pub fn reference(node_id: impl Into<String>) -> Self {
        Self::Reference(node_id.into())
    }

    /// The node this value reads from, if it is a reference.
    pub fn referenced_node(&self) -> Option<&str> {
        match self {
            Self::Reference(id) => Some(id),
            Self::Static(_) => None,
        }
    }
}

impl Default for ParameterValue {
    fn default() -> Self {
        Self::Static(String::new())
    }
}

// ---------------------------------------------------------------------------
// Operators and modes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionOperator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    NotContains,
    In,
    NotIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogicOperator {
    And,
    Or,
}

/// How an `Extract` node derives its value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtractMode {
    #[default]
    Regex,
    Json,
    Sub,
    Concat,
    RandomInt,
    RandomString,
}

impl ExtractMode {
    /// Random modes never read their `source`.
    pub fn reads_source(self) -> bool {
        !matches!(self, Self::RandomInt | Self::RandomString)
    }
}

// ---------------------------------------------------------------------------
// Node kinds
// ---------------------------------------------------------------------------

/// Entry point of a run; never gated by incoming edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerNode {
    /// `manual`, `schedule`, ...; only `manual` is started implicitly.
    pub trigger_type: String,
    #[serde(default)]
    pub trigger_config: BTreeMap<String, String>,
}

/// Delegates to an external action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteNode {
    #[serde(default)]
    pub action_type: String,
    #[serde(default)]
    pub action_config: BTreeMap<String, ParameterValue>,
}

/// Binary predicate over two resolved values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionNode {
    pub left: ParameterValue,
    pub operator: ConditionOperator,
    pub right: ParameterValue,
}

/// Aggregates the boolean results of its incoming edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicNode {
    pub operator: LogicOperator,
}

/// Value derivation.  Which fields matter depends on `mode`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractNode {
    pub mode: ExtractMode,
    pub source: ParameterValue,
    /// Regex pattern (`REGEX`) or dotted path (`JSON`).
    pub expression: String,
    pub group: usize,
    pub default_value: String,
    pub others: Vec<ParameterValue>,
    pub start_index: i64,
    /// Negative means "to the end".
    pub length: i64,
    pub use_fixed: bool,
    pub fixed_value: String,
    pub random_min: i64,
    pub random_max: i64,
    pub random_string_length: i64,
    pub random_string_charset: String,
}

impl Default for ExtractNode {
    fn default() -> Self {
        Self {
            mode: ExtractMode::Regex,
            source: ParameterValue::default(),
            expression: String::new(),
            group: 0,
            default_value: String::new(),
            others: Vec::new(),
            start_index: 0,
            length: -1,
            use_fixed: false,
            fixed_value: String::new(),
            random_min: 0,
            random_max: 100,
            random_string_length: 8,
            random_string_charset: String::new(),
        }
    }
}

/// The closed set of node kinds, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Trigger(TriggerNode),
    Execute(ExecuteNode),
    Condition(ConditionNode),
    Logic(LogicNode),
    Extract(ExtractNode),
    /// Any kind the engine does not evaluate; always skipped, never a failure.
    #[serde(other)]
    Unsupported,
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A single step in the workflow graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier within this workflow (referenced by connections).
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
        }
    }

    pub fn trigger(id: impl Into<String>, trigger_type: impl Into<String>) -> Self {
        let id = id.into();
        Self::new(
            id.clone(),
            id,
            NodeKind::Trigger(TriggerNode {
                trigger_type: trigger_type.into(),
                trigger_config: BTreeMap::new(),
            }),
        )
    }

    pub fn execute(
        id: impl Into<String>,
        action_type: impl Into<String>,
        action_config: BTreeMap<String, ParameterValue>,
    ) -> Self {
        let id = id.into();
        Self::new(
            id.clone(),
            id,
            NodeKind::Execute(ExecuteNode {
                action_type: action_type.into(),
                action_config,
            }),
        )
    }

    pub fn condition(
        id: impl Into<String>,
        left: ParameterValue,
        operator: ConditionOperator,
        right: ParameterValue,
    ) -> Self {
        let id = id.into();
        Self::new(
            id.clone(),
            id,
            NodeKind::Condition(ConditionNode {
                left,
                operator,
                right,
            }),
        )
    }

    pub fn logic(id: impl Into<String>, operator: LogicOperator) -> Self {
        let id = id.into();
        Self::new(id.clone(), id, NodeKind::Logic(LogicNode { operator }))
    }

    pub fn extract(id: impl Into<String>, extract: ExtractNode) -> Self {
        let id = id.into();
        Self::new(id.clone(), id, NodeKind::Extract(extract))
    }

    /// Display name, falling back to the id for unnamed nodes.
    pub fn label(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    pub fn trigger_type(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Trigger(t) => Some(&t.trigger_type),
            _ => None,
        }
    }

    pub fn is_trigger(&self) -> bool {
        matches!(self.kind, NodeKind::Trigger(_))
    }

    /// `Condition` and `Logic` nodes produce booleans; their unconditioned
    /// outgoing edges behave as `"true"` edges.
    pub fn is_boolean(&self) -> bool {
        matches!(self.kind, NodeKind::Condition(_) | NodeKind::Logic(_))
    }

    /// Ids of every node whose result this node's parameters read.
    pub fn references(&self) -> Vec<&str> {
        let values: Vec<&ParameterValue> = match &self.kind {
            NodeKind::Execute(e) => e.action_config.values().collect(),
            NodeKind::Condition(c) => vec![&c.left, &c.right],
            NodeKind::Extract(x) => std::iter::once(&x.source).chain(&x.others).collect(),
            NodeKind::Trigger(_) | NodeKind::Logic(_) | NodeKind::Unsupported => Vec::new(),
        };
        values
            .into_iter()
            .filter_map(ParameterValue::referenced_node)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// Directed edge from one node to another, optionally gated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    pub source_node_id: String,
    pub target_node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl Connection {
    /// Unconditional edge.
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: format!("{source}->{target}"),
            source_node_id: source,
            target_node_id: target,
            condition: None,
        }
    }

    /// Edge gated by `condition`.
    pub fn when(
        source: impl Into<String>,
        target: impl Into<String>,
        condition: impl Into<String>,
    ) -> Self {
        Self {
            condition: Some(condition.into()),
            ..Self::new(source, target)
        }
    }
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// A complete workflow definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl Workflow {
    /// Convenience constructor for testing.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        nodes: Vec<Node>,
        connections: Vec<Connection>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            nodes,
            connections,
        }
    }
}
