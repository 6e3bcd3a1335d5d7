//! Combo-aware force layout.
//!
//! Nodes are grouped by a forest of combos. On top of depth-scaled repulsion and attraction, each
//! step pulls members toward their combo centroids and pushes overlapping sibling combos apart.
//! The engine keeps a [`Session`] so a second run on the same instance starts warm.

mod tree;

use crate::algo::ComboForceOptions;
use crate::algo::forces::{self, MIN_DISTANCE, Vec2};
use crate::error::Result;
use crate::graph::{Graph, GraphIndex, LayoutOutcome, Node};
use crate::scheduler::{self, CancelToken, FrameClock, LayoutHooks, Simulation, StepOutcome};
use tree::{ComboRecord, ComboTree, sunflower};

const SEED_SPREAD: f64 = 10.0;

/// Cross-invocation state of a [`ComboForce`] engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    laid_out: bool,
}

impl Session {
    /// Whether a previous run on this engine finished.
    pub fn is_warm(&self) -> bool {
        self.laid_out
    }
}

#[derive(Debug, Clone, Default)]
pub struct ComboForce {
    options: ComboForceOptions,
    session: Session,
}

impl ComboForce {
    pub fn new(options: ComboForceOptions) -> Self {
        Self {
            options,
            session: Session::default(),
        }
    }

    pub fn options(&self) -> &ComboForceOptions {
        &self.options
    }

    pub fn session(&self) -> Session {
        self.session
    }

    /// Forgets previous runs; the next layout starts cold.
    pub fn reset(&mut self) {
        self.session = Session::default();
    }

    pub fn simulation<'a>(&'a mut self, graph: &'a mut Graph) -> Result<ComboForceSimulation<'a>> {
        self.options.validate()?;
        Ok(ComboForceSimulation::new(
            graph,
            self.options.clone(),
            &mut self.session,
        ))
    }

    pub fn layout(&mut self, graph: &mut Graph) -> Result<LayoutOutcome> {
        let mut sim = self.simulation(graph)?;
        Ok(scheduler::run_batch(&mut sim, None))
    }

    /// Batch layout that stops early once `cancel` is triggered.
    pub fn layout_with_cancel(
        &mut self,
        graph: &mut Graph,
        cancel: &CancelToken,
    ) -> Result<LayoutOutcome> {
        let mut sim = self.simulation(graph)?;
        Ok(scheduler::run_batch(&mut sim, Some(cancel)))
    }

    pub async fn layout_animated<C: FrameClock>(
        &mut self,
        graph: &mut Graph,
        clock: &mut C,
        cancel: Option<&CancelToken>,
    ) -> Result<LayoutOutcome> {
        let mut sim = self.simulation(graph)?;
        Ok(scheduler::run_animated(&mut sim, clock, cancel).await)
    }
}

/// Gravity multiplier toward the centroid of a combo at `depth`.
pub fn depth_scale(depth: u32) -> f64 {
    0.1 / (depth as f64 + 2.0)
}

/// Repulsion multiplier exponent for two nodes `depth_delta` levels apart.
fn repulsive_depth_exponent(depth_delta: u32, same_combo: bool) -> f64 {
    let base = (depth_delta as f64 / 10.0).ln() + 1.0;
    let base = base.max(1.0);
    if same_combo { base } else { base + 1.0 }
}

/// Attraction multiplier for an edge between nodes `depth_delta` levels apart.
fn attractive_depth_param(depth_delta: u32, same_combo: bool, scale: f64) -> f64 {
    if same_combo {
        return 2.0;
    }
    let exponent = if depth_delta == 0 {
        0.0
    } else {
        (depth_delta as f64 / 10.0).ln()
    };
    let param = if exponent == 0.0 { 1.0 } else { scale.powf(exponent) };
    if param == 1.0 { scale / 2.0 } else { param }
}

/// Pushes the members of two overlapping sibling combos apart.
///
/// Each member of `v` moves by the share `r_u² / (r_v² + r_u²)` of the overlap correction and
/// each member of `u` by the rest, so the larger combo moves less.
pub(crate) fn collide_siblings(
    v: &ComboRecord,
    u: &ComboRecord,
    handles: (usize, usize),
    strength: f64,
    disp: &mut [Vec2],
) {
    if v.is_empty() || u.is_empty() {
        return;
    }
    let sep = forces::separation(v.centroid, u.centroid, handles.0, handles.1);
    let rv = if v.radius > 0.0 { v.radius } else { 1.0 };
    let ru = if u.radius > 0.0 { u.radius } else { 1.0 };
    let r = rv + ru;
    if sep.distance >= r {
        return;
    }
    let shift = sep.vector * ((r - sep.distance) / sep.distance * strength);
    let (rv2, ru2) = (rv * rv, ru * ru);
    let share_v = ru2 / (rv2 + ru2);
    let share_u = 1.0 - share_v;
    for &vn in &v.members {
        for &un in &u.members {
            disp[vn] += shift * share_v;
            disp[un] -= shift * share_u;
        }
    }
}

pub struct ComboForceSimulation<'a> {
    graph: &'a mut Graph,
    session: &'a mut Session,
    opts: ComboForceOptions,
    index: GraphIndex,
    tree: ComboTree,
    center: Vec2,
    positions: Vec<Vec2>,
    disp: Vec<Vec2>,
    pinned: Vec<Option<Vec2>>,
    depths: Vec<u32>,
    strengths: Vec<f64>,
    /// Node radius for the combo bounding boxes.
    radii: Vec<f64>,
    /// Node radius plus spacing, for node collisions.
    collide_radii: Vec<f64>,
    edge_lengths: Vec<f64>,
    edge_strengths: Vec<f64>,
    /// Per resolved edge: the source's share of the edge degree.
    bias: Vec<f64>,
    alpha: f64,
    budget: usize,
    iteration: usize,
    movement: f64,
}

impl<'a> ComboForceSimulation<'a> {
    fn new(graph: &'a mut Graph, opts: ComboForceOptions, session: &'a mut Session) -> Self {
        let n = graph.nodes.len();
        let index = GraphIndex::build(graph);
        let center = Vec2::new(opts.center.x, opts.center.y);
        let warm = session.is_warm();
        let budget = if warm {
            opts.max_iteration / 5
        } else {
            opts.max_iteration
        };

        let spacing = opts.combo_spacing.resolve(&graph.combos);
        let padding = opts.combo_padding.resolve(&graph.combos);
        let margins: Vec<f64> = spacing
            .iter()
            .zip(&padding)
            .map(|(s, p)| s / 2.0 + p)
            .collect();
        let mut tree = ComboTree::build(graph, &margins);

        tracing::debug!(
            nodes = n,
            edges = index.edges.len(),
            combos = tree.combos.len(),
            warm,
            budget,
            "starting combo force layout"
        );

        let pinned: Vec<Option<Vec2>> = graph
            .nodes
            .iter()
            .map(|node| node.pinned().map(|p| Vec2::new(p.x, p.y)))
            .collect();
        let positions = if n == 1 {
            vec![pinned[0].unwrap_or(center)]
        } else {
            seed_positions(&graph.nodes, &pinned, &tree, center, warm)
        };

        let depths = graph
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| tree.node_depth(i, node.depth))
            .collect();
        let strengths = opts.node_strength.resolve(&graph.nodes);
        let radii: Vec<f64> = opts
            .node_size
            .resolve(&graph.nodes)
            .into_iter()
            .map(|extent| extent / 2.0)
            .collect();
        let collide_radii = radii
            .iter()
            .zip(opts.node_spacing.resolve(&graph.nodes))
            .map(|(r, s)| {
                let r = r + s;
                if r > 0.0 { r } else { 1.0 }
            })
            .collect();

        let mut edge_lengths = Vec::with_capacity(index.edges.len());
        let mut edge_strengths = Vec::with_capacity(index.edges.len());
        let mut bias = Vec::with_capacity(index.edges.len());
        for e in &index.edges {
            let edge = &graph.edges[e.edge];
            edge_lengths.push(opts.link_distance.length(
                edge,
                &graph.nodes[e.source],
                &graph.nodes[e.target],
                (radii[e.source] * 2.0, radii[e.target] * 2.0),
            ));
            edge_strengths.push(opts.edge_strength.value(edge));
            let (ds, dt) = (
                index.degrees[e.source] as f64,
                index.degrees[e.target] as f64,
            );
            bias.push(if ds + dt > 0.0 { ds / (ds + dt) } else { 0.5 });
        }

        tree.update(&positions, &index.masses, &radii, center);

        let mut sim = Self {
            graph,
            session,
            alpha: opts.alpha,
            opts,
            index,
            tree,
            center,
            disp: vec![Vec2::zeros(); n],
            positions,
            pinned,
            depths,
            strengths,
            radii,
            collide_radii,
            edge_lengths,
            edge_strengths,
            bias,
            budget,
            iteration: 0,
            movement: 0.0,
        };
        sim.write_back();
        sim
    }

    fn write_back(&mut self) {
        for (node, p) in self.graph.nodes.iter_mut().zip(&self.positions) {
            node.set_position(p.x, p.y);
        }
    }

    fn same_combo(&self, i: usize, j: usize) -> bool {
        self.tree.owner[i] == self.tree.owner[j]
    }

    fn apply_center_gravity(&mut self) {
        let strength = self.opts.gravity * self.alpha;
        if strength == 0.0 {
            return;
        }
        for (d, p) in self.disp.iter_mut().zip(&self.positions) {
            let v = p - self.center;
            let l = v.norm();
            if l < MIN_DISTANCE {
                continue;
            }
            *d -= v * (strength / l);
        }
    }

    fn apply_repulsion(&mut self) {
        let n = self.positions.len();
        let range = self.opts.width * self.opts.optimize_range_factor;
        let scale = self.opts.depth_repulsive_force_scale;
        let alpha = self.alpha;
        let node_overlap = self.opts.node_overlap();
        let collide = self.opts.node_collide();

        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let sep = forces::separation(self.positions[i], self.positions[j], i, j);
                if sep.distance > range {
                    continue;
                }
                let same = self.same_combo(i, j);
                let exponent =
                    repulsive_depth_exponent(self.depths[i].abs_diff(self.depths[j]), same);
                let d2 = sep.distance_sq();
                let denom = if d2 < 1.0 { sep.distance } else { d2 };
                let param = self.strengths[j] * alpha / denom * scale.powf(exponent);
                self.disp[i] += sep.vector * param;

                if node_overlap && i < j {
                    let (ri, rj) = (self.collide_radii[i], self.collide_radii[j]);
                    let r = ri + rj;
                    if d2 < r * r {
                        let shift = sep.vector * ((r - sep.distance) / sep.distance * collide);
                        let share_i = rj * rj / (ri * ri + rj * rj);
                        self.disp[i] += shift * share_i;
                        self.disp[j] -= shift * (1.0 - share_i);
                    }
                }
            }
        }
    }

    fn apply_attraction(&mut self) {
        let scale = self.opts.depth_attractive_force_scale;
        let alpha = self.alpha;
        for k in 0..self.index.edges.len() {
            let e = self.index.edges[k];
            if e.is_self_loop() {
                continue;
            }
            let (u, v) = (e.source, e.target);
            let param = attractive_depth_param(
                self.depths[u].abs_diff(self.depths[v]),
                self.same_combo(u, v),
                scale,
            );
            let sep = forces::separation(self.positions[v], self.positions[u], v, u);
            let l = (sep.distance - self.edge_lengths[k]) / sep.distance
                * alpha
                * self.edge_strengths[k]
                * param;
            let pull = sep.vector * l;
            let b = self.bias[k];
            self.disp[v] -= pull * b;
            self.disp[u] += pull * (1.0 - b);
        }
    }

    fn apply_combo_collision(&mut self) {
        if !self.opts.combo_overlap() {
            return;
        }
        let strength = self.opts.combo_collide();
        let tree = &self.tree;
        let disp = &mut self.disp;
        for group in tree.sibling_groups() {
            for (a, &v) in group.iter().enumerate() {
                for &u in &group[..a] {
                    collide_siblings(&tree.combos[v], &tree.combos[u], (v, u), strength, disp);
                }
            }
        }
    }

    fn apply_combo_gravity(&mut self) {
        let gravity = self.opts.combo_gravity * self.alpha;
        if gravity == 0.0 {
            return;
        }
        for &idx in &self.tree.post_order {
            let combo = &self.tree.combos[idx];
            if combo.is_empty() {
                continue;
            }
            let strength = gravity * depth_scale(combo.depth);
            for &n in &combo.members {
                let v = self.positions[n] - combo.centroid;
                let l = v.norm();
                if l < MIN_DISTANCE {
                    continue;
                }
                self.disp[n] -= v * (strength / l);
            }
        }
    }

    fn integrate(&mut self) {
        let decay = self.opts.velocity_decay;
        let mut total = 0.0;
        for i in 0..self.positions.len() {
            let before = self.positions[i];
            match self.pinned[i] {
                Some(p) => self.positions[i] = p,
                None => self.positions[i] += forces::finite_or_zero(self.disp[i] * decay),
            }
            total += (self.positions[i] - before).norm();
        }
        self.movement = total / self.positions.len().max(1) as f64;
        self.alpha += (self.opts.alpha_target - self.alpha) * self.opts.alpha_decay;
    }

    /// Moves the node set so its mean sits on the configured center.
    fn recenter(&mut self) {
        if self.positions.is_empty() || self.pinned.iter().any(Option::is_some) {
            return;
        }
        let mean = self.positions.iter().sum::<Vec2>() / self.positions.len() as f64;
        let offset = self.center - mean;
        for p in &mut self.positions {
            *p += offset;
        }
    }
}

impl Simulation for ComboForceSimulation<'_> {
    fn is_trivial(&self) -> bool {
        self.positions.len() <= 1
    }

    fn step(&mut self) -> StepOutcome {
        self.disp.fill(Vec2::zeros());
        self.tree
            .update(&self.positions, &self.index.masses, &self.radii, self.center);
        self.apply_center_gravity();
        self.apply_repulsion();
        self.apply_attraction();
        if !self.tree.is_empty() {
            self.apply_combo_collision();
            self.apply_combo_gravity();
        }
        self.integrate();
        self.write_back();
        self.iteration += 1;

        if self.opts.never_ending {
            StepOutcome::Continue
        } else if self.alpha < self.opts.alpha_min {
            StepOutcome::Converged
        } else if self.iteration >= self.budget {
            StepOutcome::Exhausted
        } else {
            StepOutcome::Continue
        }
    }

    fn iteration(&self) -> usize {
        self.iteration
    }

    fn budget(&self) -> usize {
        self.budget
    }

    fn never_ending(&self) -> bool {
        self.opts.never_ending
    }

    fn nodes(&self) -> &[Node] {
        &self.graph.nodes
    }

    fn last_movement(&self) -> f64 {
        self.movement
    }

    fn alpha(&self) -> Option<f64> {
        Some(self.alpha)
    }

    fn finish(&mut self) {
        self.recenter();
        self.tree
            .update(&self.positions, &self.index.masses, &self.radii, self.center);
        for record in &self.tree.combos {
            if !record.reachable || record.is_empty() {
                continue;
            }
            let combo = &mut self.graph.combos[record.source];
            combo.x = Some(record.centroid.x);
            combo.y = Some(record.centroid.y);
        }
        self.write_back();
        self.session.laid_out = true;
    }

    fn hooks(&self) -> &LayoutHooks {
        &self.opts.hooks
    }
}

/// Initial positions. Pinned nodes sit on their pin. A warm run keeps every placed node; a cold
/// run re-seeds all of them. Seeded nodes are laid out on a sunflower around their combo's anchor
/// (ownerless nodes around `center`).
fn seed_positions(
    nodes: &[Node],
    pinned: &[Option<Vec2>],
    tree: &ComboTree,
    center: Vec2,
    warm: bool,
) -> Vec<Vec2> {
    let known: Vec<Option<Vec2>> = nodes
        .iter()
        .map(|n| n.position().map(|p| Vec2::new(p.x, p.y)))
        .collect();
    let anchors = tree.anchors(&known, center);
    let mut seeded = vec![0usize; tree.combos.len() + 1];
    let ownerless = tree.combos.len();

    nodes
        .iter()
        .enumerate()
        .map(|(i, _)| {
            if let Some(p) = pinned[i] {
                return p;
            }
            if warm {
                if let Some(p) = known[i] {
                    return p;
                }
            }
            let (slot, anchor) = match tree.owner[i] {
                Some(c) => (c, anchors[c]),
                None => (ownerless, center),
            };
            let k = seeded[slot];
            seeded[slot] += 1;
            anchor + sunflower(k, SEED_SPREAD)
        })
        .collect()
}
