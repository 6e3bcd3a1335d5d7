pub mod combo_force;
pub mod forces;
pub mod gforce;
pub mod quadtree;
pub(crate) mod rng;
pub mod selector;

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{Result, ensure_finite, ensure_non_negative, ensure_positive};
use crate::graph::{Combo, Edge, Node, Point};
use crate::scheduler::LayoutHooks;
use selector::{EdgeLength, NodeSize, Selector, number_or_max_of_list};

#[derive(Debug, Clone)]
pub enum Algorithm {
    /// Flat force simulation with optional Barnes-Hut repulsion.
    GForce(GForceOptions),
    /// Hierarchical simulation that keeps combo members together.
    ComboForce(ComboForceOptions),
}

/// Per-node gravity target returned by [`CenterFn`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravityTarget {
    pub x: f64,
    pub y: f64,
    pub strength: f64,
}

/// Callback receiving a node and its degree. `None` keeps the global center and gravity.
#[derive(Clone)]
pub struct CenterFn(Arc<dyn Fn(&Node, usize) -> Option<GravityTarget> + Send + Sync>);

impl CenterFn {
    pub fn new(f: impl Fn(&Node, usize) -> Option<GravityTarget> + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub(crate) fn call(&self, node: &Node, degree: usize) -> Option<GravityTarget> {
        (self.0)(node, degree).filter(|t| {
            t.x.is_finite() && t.y.is_finite() && t.strength.is_finite()
        })
    }
}

impl fmt::Debug for CenterFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CenterFn(<fn>)")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GForceOptions {
    /// Defaults to `(width / 2, height / 2)`.
    pub center: Option<Point>,
    pub width: f64,
    pub height: f64,
    pub max_iteration: usize,
    pub link_distance: EdgeLength,
    pub edge_strength: Selector<Edge>,
    pub node_strength: Selector<Node>,
    /// Per-node mass. Non-positive values fall back to the node's `mass` field, then its degree.
    pub mass: Option<Selector<Node>>,
    pub coulomb_dis_scale: f64,
    pub factor: f64,
    pub damping: f64,
    pub max_speed: f64,
    /// Mean per-node displacement below which the run is considered converged.
    pub min_movement: f64,
    pub interval: f64,
    pub gravity: f64,
    #[serde(skip)]
    pub center_fn: Option<CenterFn>,
    pub prevent_overlap: bool,
    pub node_size: NodeSize,
    pub node_spacing: Selector<Node>,
    pub collide_strength: f64,
    /// Pull nodes sharing a `cluster` tag toward that cluster's mean position.
    pub clustering: bool,
    pub cluster_node_strength: f64,
    /// Springs pull with `ln(1 + d)` instead of `d`.
    pub linlog: bool,
    /// Lay out without leaves (degree <= 1) first, then drop each leaf onto its neighbor and
    /// settle for [`GForceOptions::PRUNE_SETTLE_ITERATIONS`] more steps.
    pub prune: bool,
    /// `None` enables Barnes-Hut repulsion above [`GForceOptions::BARNES_HUT_THRESHOLD`] nodes.
    pub barnes_hut: Option<bool>,
    pub barnes_hut_theta: f64,
    pub never_ending: bool,
    pub seed: u64,
    #[serde(skip)]
    pub hooks: LayoutHooks,
}

impl GForceOptions {
    pub const BARNES_HUT_THRESHOLD: usize = 250;
    pub const PRUNE_SETTLE_ITERATIONS: usize = 100;

    pub fn from_json_str(s: &str) -> Result<Self> {
        let opts: Self = serde_json::from_str(s)?;
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(c) = self.center {
            ensure_finite("center.x", c.x)?;
            ensure_finite("center.y", c.y)?;
        }
        ensure_non_negative("width", self.width)?;
        ensure_non_negative("height", self.height)?;
        self.link_distance.validate("linkDistance")?;
        self.edge_strength.validate_finite("edgeStrength")?;
        self.node_strength.validate_finite("nodeStrength")?;
        if let Some(mass) = &self.mass {
            mass.validate_positive("mass")?;
        }
        ensure_positive("coulombDisScale", self.coulomb_dis_scale)?;
        ensure_finite("factor", self.factor)?;
        ensure_non_negative("damping", self.damping)?;
        ensure_positive("maxSpeed", self.max_speed)?;
        ensure_non_negative("minMovement", self.min_movement)?;
        ensure_positive("interval", self.interval)?;
        ensure_finite("gravity", self.gravity)?;
        self.node_size.validate("nodeSize")?;
        self.node_spacing.validate_finite("nodeSpacing")?;
        ensure_non_negative("collideStrength", self.collide_strength)?;
        ensure_finite("clusterNodeStrength", self.cluster_node_strength)?;
        ensure_non_negative("barnesHutTheta", self.barnes_hut_theta)?;
        Ok(())
    }

    pub(crate) fn center_point(&self) -> Point {
        self.center
            .unwrap_or_else(|| Point::new(self.width / 2.0, self.height / 2.0))
    }

    pub(crate) fn uses_barnes_hut(&self, node_count: usize) -> bool {
        self.barnes_hut
            .unwrap_or(node_count > Self::BARNES_HUT_THRESHOLD)
    }
}

impl Default for GForceOptions {
    fn default() -> Self {
        Self {
            center: None,
            width: 300.0,
            height: 300.0,
            max_iteration: 500,
            link_distance: EdgeLength::Fixed(1.0),
            edge_strength: Selector::Fixed(200.0),
            node_strength: Selector::Fixed(1000.0),
            mass: None,
            coulomb_dis_scale: 0.005,
            factor: 1.0,
            damping: 0.9,
            max_speed: 1000.0,
            min_movement: 0.5,
            interval: 0.02,
            gravity: 10.0,
            center_fn: None,
            prevent_overlap: true,
            node_size: NodeSize::FromNode,
            node_spacing: Selector::Fixed(0.0),
            collide_strength: 1.0,
            clustering: false,
            cluster_node_strength: 20.0,
            linlog: false,
            prune: false,
            barnes_hut: None,
            barnes_hut_theta: quadtree::DEFAULT_THETA,
            never_ending: false,
            seed: 1,
            hooks: LayoutHooks::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComboForceOptions {
    pub center: Point,
    pub width: f64,
    pub height: f64,
    pub max_iteration: usize,
    pub gravity: f64,
    pub combo_gravity: f64,
    pub link_distance: EdgeLength,
    pub alpha: f64,
    pub alpha_min: f64,
    pub alpha_decay: f64,
    pub alpha_target: f64,
    pub velocity_decay: f64,
    pub edge_strength: Selector<Edge>,
    pub node_strength: Selector<Node>,
    /// Turns on both node and combo overlap prevention.
    pub prevent_overlap: bool,
    pub prevent_node_overlap: bool,
    pub prevent_combo_overlap: bool,
    /// When set, overrides both collide strengths.
    pub collide_strength: Option<f64>,
    pub node_collide_strength: f64,
    pub combo_collide_strength: f64,
    pub node_size: NodeSize,
    pub node_spacing: Selector<Node>,
    pub combo_spacing: Selector<Combo>,
    #[serde(deserialize_with = "number_or_max_of_list")]
    pub combo_padding: Selector<Combo>,
    /// Repulsion is skipped for pairs farther apart than `width * optimize_range_factor`.
    pub optimize_range_factor: f64,
    pub depth_attractive_force_scale: f64,
    pub depth_repulsive_force_scale: f64,
    pub never_ending: bool,
    #[serde(skip)]
    pub hooks: LayoutHooks,
}

impl ComboForceOptions {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let opts: Self = serde_json::from_str(s)?;
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> Result<()> {
        ensure_finite("center.x", self.center.x)?;
        ensure_finite("center.y", self.center.y)?;
        ensure_non_negative("width", self.width)?;
        ensure_non_negative("height", self.height)?;
        ensure_finite("gravity", self.gravity)?;
        ensure_finite("comboGravity", self.combo_gravity)?;
        self.link_distance.validate("linkDistance")?;
        ensure_non_negative("alpha", self.alpha)?;
        ensure_non_negative("alphaMin", self.alpha_min)?;
        ensure_finite("alphaDecay", self.alpha_decay)?;
        if !(0.0..=1.0).contains(&self.alpha_decay) {
            return Err(crate::Error::InvalidOption {
                name: "alphaDecay",
                reason: format!("expected a value in [0, 1], got {}", self.alpha_decay),
            });
        }
        ensure_non_negative("alphaTarget", self.alpha_target)?;
        ensure_non_negative("velocityDecay", self.velocity_decay)?;
        self.edge_strength.validate_finite("edgeStrength")?;
        self.node_strength.validate_finite("nodeStrength")?;
        if let Some(s) = self.collide_strength {
            ensure_non_negative("collideStrength", s)?;
        }
        ensure_non_negative("nodeCollideStrength", self.node_collide_strength)?;
        ensure_non_negative("comboCollideStrength", self.combo_collide_strength)?;
        self.node_size.validate("nodeSize")?;
        self.node_spacing.validate_finite("nodeSpacing")?;
        self.combo_spacing.validate_non_negative("comboSpacing")?;
        self.combo_padding.validate_non_negative("comboPadding")?;
        ensure_non_negative("optimizeRangeFactor", self.optimize_range_factor)?;
        ensure_positive(
            "depthAttractiveForceScale",
            self.depth_attractive_force_scale,
        )?;
        ensure_positive("depthRepulsiveForceScale", self.depth_repulsive_force_scale)?;
        Ok(())
    }

    pub(crate) fn node_overlap(&self) -> bool {
        self.prevent_overlap || self.prevent_node_overlap
    }

    pub(crate) fn combo_overlap(&self) -> bool {
        self.prevent_overlap || self.prevent_combo_overlap
    }

    pub(crate) fn node_collide(&self) -> f64 {
        self.collide_strength.unwrap_or(self.node_collide_strength)
    }

    pub(crate) fn combo_collide(&self) -> f64 {
        self.collide_strength.unwrap_or(self.combo_collide_strength)
    }
}

impl Default for ComboForceOptions {
    fn default() -> Self {
        Self {
            center: Point::new(0.0, 0.0),
            width: 300.0,
            height: 300.0,
            max_iteration: 100,
            gravity: 10.0,
            combo_gravity: 10.0,
            link_distance: EdgeLength::Fixed(10.0),
            alpha: 1.0,
            alpha_min: 0.001,
            alpha_decay: 1.0 - 0.001_f64.powf(1.0 / 300.0),
            alpha_target: 0.0,
            velocity_decay: 0.6,
            edge_strength: Selector::Fixed(0.6),
            node_strength: Selector::Fixed(30.0),
            prevent_overlap: false,
            prevent_node_overlap: true,
            prevent_combo_overlap: true,
            collide_strength: None,
            node_collide_strength: 0.5,
            combo_collide_strength: 0.5,
            node_size: NodeSize::FromNode,
            node_spacing: Selector::Fixed(0.0),
            combo_spacing: Selector::Fixed(20.0),
            combo_padding: Selector::Fixed(10.0),
            optimize_range_factor: 1.0,
            depth_attractive_force_scale: 1.0,
            depth_repulsive_force_scale: 2.0,
            never_ending: false,
            hooks: LayoutHooks::default(),
        }
    }
}
