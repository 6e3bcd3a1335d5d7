//! Graph data model shared by every engine.
//!
//! Positions are mutated in place by the engines. A coordinate that is `None` (or NaN) is treated
//! as "not laid out yet" and is initialized before the first force step.

use serde::{Deserialize, Serialize};

mod index;

pub(crate) use index::{GraphIndex, ResolvedEdge};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub combos: Vec<Combo>,
}

impl Graph {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self {
            nodes,
            edges,
            combos: Vec::new(),
        }
    }

    pub fn with_combos(mut self, combos: Vec<Combo>) -> Self {
        self.combos = combos;
        self
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn combo(&self, id: &str) -> Option<&Combo> {
        self.combos.iter().find(|c| c.id == id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    /// Pinned x coordinate. The node is pinned only when both `fx` and `fy` are set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<NodeSizeValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combo_id: Option<String>,
    /// Hierarchy depth used by the combo engine. When unset it is one below the owning combo's
    /// depth, or 0 for nodes outside any combo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
}

impl Node {
    pub const DEFAULT_SIZE: f64 = 10.0;

    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn at(id: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    pub fn with_combo(mut self, combo_id: impl Into<String>) -> Self {
        self.combo_id = Some(combo_id.into());
        self
    }

    pub fn with_size(mut self, size: NodeSizeValue) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = Some(mass);
        self
    }

    pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = Some(cluster.into());
        self
    }

    pub fn pinned_at(mut self, x: f64, y: f64) -> Self {
        self.fx = Some(x);
        self.fy = Some(y);
        self
    }

    /// Current position, if both coordinates are finite.
    pub fn position(&self) -> Option<Point> {
        match (self.x, self.y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some(Point { x, y }),
            _ => None,
        }
    }

    /// Pinned position, if both `fx` and `fy` are finite.
    pub fn pinned(&self) -> Option<Point> {
        match (self.fx, self.fy) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some(Point { x, y }),
            _ => None,
        }
    }

    /// Width/height of the node, falling back to [`Node::DEFAULT_SIZE`].
    pub fn dimensions(&self) -> (f64, f64) {
        self.size
            .as_ref()
            .map(NodeSizeValue::dimensions)
            .unwrap_or((Self::DEFAULT_SIZE, Self::DEFAULT_SIZE))
    }

    pub(crate) fn set_position(&mut self, x: f64, y: f64) {
        self.x = Some(x);
        self.y = Some(y);
    }
}

/// Explicit node size: a scalar, a `[width, height]` pair, or `{ "width": .., "height": .. }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeSizeValue {
    Scalar(f64),
    Pair([f64; 2]),
    Dims { width: f64, height: f64 },
}

impl NodeSizeValue {
    pub fn dimensions(&self) -> (f64, f64) {
        let (w, h) = match *self {
            Self::Scalar(s) => (s, s),
            Self::Pair([w, h]) => (w, h),
            Self::Dims { width, height } => (width, height),
        };
        (sanitize_size(w), sanitize_size(h))
    }

    /// The larger of the two dimensions.
    pub fn extent(&self) -> f64 {
        let (w, h) = self.dimensions();
        w.max(h)
    }
}

fn sanitize_size(v: f64) -> f64 {
    if v.is_finite() && v >= 0.0 {
        v
    } else {
        Node::DEFAULT_SIZE
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: None,
            source: source.into(),
            target: target.into(),
        }
    }

    pub fn label(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!("{}->{}", self.source, self.target),
        }
    }
}

/// A group of nodes and sub-combos. `parent_id` links must form a forest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Combo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    /// Minimum extent used when sizing the combo for collision checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
}

impl Combo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn position(&self) -> Option<Point> {
        match (self.x, self.y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some(Point { x, y }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// How a layout run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayoutStatus {
    /// Zero or one node: nothing to simulate.
    Trivial,
    /// The convergence criterion was met before the iteration budget ran out.
    Converged,
    /// The iteration budget was spent.
    IterationLimit,
    /// A cancellation request stopped the run.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutOutcome {
    pub status: LayoutStatus,
    pub iterations: usize,
}

impl LayoutOutcome {
    pub fn trivial() -> Self {
        Self {
            status: LayoutStatus::Trivial,
            iterations: 0,
        }
    }
}
