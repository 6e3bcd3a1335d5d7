//! Per-item option values.
//!
//! Options such as strengths and sizes accept either a constant or a callback. Engines resolve a
//! selector once per invocation into a plain `Vec<f64>` indexed like the graph's nodes (or edges,
//! or combos) and never call back into user code from the inner loops.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer};

use crate::error::{Result, ensure_finite, ensure_non_negative, ensure_positive};
use crate::graph::{Edge, Node, NodeSizeValue};

/// A numeric option that may vary per item of type `T`.
pub enum Selector<T: ?Sized> {
    Fixed(f64),
    Custom(Arc<dyn Fn(&T) -> f64 + Send + Sync>),
}

impl<T: ?Sized> Selector<T> {
    pub fn custom(f: impl Fn(&T) -> f64 + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    /// Value for a single item. Non-finite callback results become `0`.
    pub fn value(&self, item: &T) -> f64 {
        match self {
            Self::Fixed(v) => *v,
            Self::Custom(f) => {
                let v = f(item);
                if v.is_finite() { v } else { 0.0 }
            }
        }
    }

    pub(crate) fn resolve<'a>(&self, items: impl IntoIterator<Item = &'a T>) -> Vec<f64>
    where
        T: 'a,
    {
        items.into_iter().map(|item| self.value(item)).collect()
    }

    pub(crate) fn validate_finite(&self, name: &'static str) -> Result<()> {
        match self {
            Self::Fixed(v) => ensure_finite(name, *v),
            Self::Custom(_) => Ok(()),
        }
    }

    pub(crate) fn validate_non_negative(&self, name: &'static str) -> Result<()> {
        match self {
            Self::Fixed(v) => ensure_non_negative(name, *v),
            Self::Custom(_) => Ok(()),
        }
    }

    pub(crate) fn validate_positive(&self, name: &'static str) -> Result<()> {
        match self {
            Self::Fixed(v) => ensure_positive(name, *v),
            Self::Custom(_) => Ok(()),
        }
    }
}

impl<T: ?Sized> Clone for Selector<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Fixed(v) => Self::Fixed(*v),
            Self::Custom(f) => Self::Custom(Arc::clone(f)),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Selector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(v) => f.debug_tuple("Fixed").field(v).finish(),
            Self::Custom(_) => f.write_str("Custom(<fn>)"),
        }
    }
}

impl<T: ?Sized> From<f64> for Selector<T> {
    fn from(v: f64) -> Self {
        Self::Fixed(v)
    }
}

impl<'de, T: ?Sized> Deserialize<'de> for Selector<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        f64::deserialize(deserializer).map(Self::Fixed)
    }
}

/// Accepts a number or a list of numbers; a list resolves to its largest element.
pub(crate) fn number_or_max_of_list<'de, D, T>(
    deserializer: D,
) -> std::result::Result<Selector<T>, D::Error>
where
    D: Deserializer<'de>,
    T: ?Sized,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        List(Vec<f64>),
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::Number(v) => Selector::Fixed(v),
        Repr::List(values) => {
            Selector::Fixed(values.into_iter().fold(0.0_f64, |acc, v| acc.max(v)))
        }
    })
}

/// Node size used by the collision terms. Resolves to the node's extent (its larger dimension).
#[derive(Clone, Default)]
pub enum NodeSize {
    /// Use each node's own `size` field (default 10).
    #[default]
    FromNode,
    Fixed(f64),
    Box {
        width: f64,
        height: f64,
    },
    Custom(Arc<dyn Fn(&Node) -> f64 + Send + Sync>),
}

impl NodeSize {
    pub fn custom(f: impl Fn(&Node) -> f64 + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    pub fn extent(&self, node: &Node) -> f64 {
        let v = match self {
            Self::FromNode => node
                .size
                .as_ref()
                .map(NodeSizeValue::extent)
                .unwrap_or(Node::DEFAULT_SIZE),
            Self::Fixed(v) => *v,
            Self::Box { width, height } => width.max(*height),
            Self::Custom(f) => f(node),
        };
        if v.is_finite() && v >= 0.0 {
            v
        } else {
            Node::DEFAULT_SIZE
        }
    }

    pub(crate) fn resolve(&self, nodes: &[Node]) -> Vec<f64> {
        nodes.iter().map(|n| self.extent(n)).collect()
    }

    pub(crate) fn validate(&self, name: &'static str) -> Result<()> {
        match self {
            Self::Fixed(v) => ensure_non_negative(name, *v),
            Self::Box { width, height } => {
                ensure_non_negative(name, *width)?;
                ensure_non_negative(name, *height)
            }
            Self::FromNode | Self::Custom(_) => Ok(()),
        }
    }
}

impl fmt::Debug for NodeSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FromNode => f.write_str("FromNode"),
            Self::Fixed(v) => f.debug_tuple("Fixed").field(v).finish(),
            Self::Box { width, height } => f
                .debug_struct("Box")
                .field("width", width)
                .field("height", height)
                .finish(),
            Self::Custom(_) => f.write_str("Custom(<fn>)"),
        }
    }
}

impl<'de> Deserialize<'de> for NodeSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Option::<NodeSizeValue>::deserialize(deserializer).map(|v| match v {
            None => Self::FromNode,
            Some(NodeSizeValue::Scalar(s)) => Self::Fixed(s),
            Some(NodeSizeValue::Pair([width, height])) => Self::Box { width, height },
            Some(NodeSizeValue::Dims { width, height }) => Self::Box { width, height },
        })
    }
}

/// Desired length of an edge.
#[derive(Clone)]
pub enum EdgeLength {
    Fixed(f64),
    /// `base` plus the mean of both endpoints' extents.
    FromEndpointSizes { base: f64 },
    Custom(Arc<dyn Fn(&Edge, &Node, &Node) -> f64 + Send + Sync>),
}

impl EdgeLength {
    pub fn custom(f: impl Fn(&Edge, &Node, &Node) -> f64 + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    /// `extents` are the already-resolved sizes of `source` and `target`.
    pub fn length(&self, edge: &Edge, source: &Node, target: &Node, extents: (f64, f64)) -> f64 {
        let v = match self {
            Self::Fixed(v) => *v,
            Self::FromEndpointSizes { base } => base + (extents.0 + extents.1) / 2.0,
            Self::Custom(f) => f(edge, source, target),
        };
        if v.is_finite() { v.max(0.0) } else { 0.0 }
    }

    pub(crate) fn validate(&self, name: &'static str) -> Result<()> {
        match self {
            Self::Fixed(v) | Self::FromEndpointSizes { base: v } => ensure_non_negative(name, *v),
            Self::Custom(_) => Ok(()),
        }
    }
}

impl fmt::Debug for EdgeLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(v) => f.debug_tuple("Fixed").field(v).finish(),
            Self::FromEndpointSizes { base } => f
                .debug_struct("FromEndpointSizes")
                .field("base", base)
                .finish(),
            Self::Custom(_) => f.write_str("Custom(<fn>)"),
        }
    }
}

impl<'de> Deserialize<'de> for EdgeLength {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Fixed(f64),
            FromEndpointSizes { base: f64 },
        }

        Repr::deserialize(deserializer).map(|r| match r {
            Repr::Fixed(v) => Self::Fixed(v),
            Repr::FromEndpointSizes { base } => Self::FromEndpointSizes { base },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Combo;

    #[test]
    fn selector_resolves_constants_and_callbacks() {
        let nodes = vec![Node::new("a"), Node::new("bb")];
        let fixed: Selector<Node> = Selector::Fixed(3.0);
        assert_eq!(fixed.resolve(&nodes), vec![3.0, 3.0]);

        let by_id: Selector<Node> = Selector::custom(|n: &Node| n.id.len() as f64);
        assert_eq!(by_id.resolve(&nodes), vec![1.0, 2.0]);

        let broken: Selector<Node> = Selector::custom(|_: &Node| f64::NAN);
        assert_eq!(broken.value(&nodes[0]), 0.0);
    }

    #[test]
    fn node_size_normalizes_every_shape() {
        let plain = Node::new("a");
        let sized = Node::new("b").with_size(NodeSizeValue::Pair([4.0, 30.0]));

        assert_eq!(NodeSize::FromNode.extent(&plain), Node::DEFAULT_SIZE);
        assert_eq!(NodeSize::FromNode.extent(&sized), 30.0);
        assert_eq!(NodeSize::Fixed(7.0).extent(&sized), 7.0);
        assert_eq!(
            NodeSize::Box {
                width: 2.0,
                height: 9.0
            }
            .extent(&plain),
            9.0
        );
        assert_eq!(NodeSize::custom(|_| -1.0).extent(&plain), Node::DEFAULT_SIZE);
    }

    #[test]
    fn node_size_deserializes_from_json_shapes() {
        let v: NodeSize = serde_json::from_str("12").unwrap();
        assert!(matches!(v, NodeSize::Fixed(s) if s == 12.0));
        let v: NodeSize = serde_json::from_str("[3, 8]").unwrap();
        assert!(matches!(v, NodeSize::Box { width, height } if width == 3.0 && height == 8.0));
        let v: NodeSize = serde_json::from_str(r#"{"width": 5, "height": 1}"#).unwrap();
        assert!(matches!(v, NodeSize::Box { width, .. } if width == 5.0));
        let v: NodeSize = serde_json::from_str("null").unwrap();
        assert!(matches!(v, NodeSize::FromNode));
    }

    #[test]
    fn edge_length_from_endpoint_sizes() {
        let e = Edge::new("a", "b");
        let (a, b) = (Node::new("a"), Node::new("b"));
        let len = EdgeLength::FromEndpointSizes { base: 10.0 };
        assert_eq!(len.length(&e, &a, &b, (10.0, 20.0)), 25.0);

        let v: EdgeLength = serde_json::from_str(r#"{"base": 4}"#).unwrap();
        assert!(matches!(v, EdgeLength::FromEndpointSizes { base } if base == 4.0));
    }

    #[test]
    fn padding_list_uses_its_maximum() {
        #[derive(Deserialize)]
        struct Wrapper {
            #[serde(deserialize_with = "number_or_max_of_list")]
            padding: Selector<Combo>,
        }

        let w: Wrapper = serde_json::from_str(r#"{"padding": [2, 9, 4]}"#).unwrap();
        assert_eq!(w.padding.value(&Combo::new("c")), 9.0);
        let w: Wrapper = serde_json::from_str(r#"{"padding": 3}"#).unwrap();
        assert_eq!(w.padding.value(&Combo::new("c")), 3.0);
    }
}
