//! Flat force-directed layout.
//!
//! Every step accumulates Coulomb-style repulsion between all node pairs (exact, or through the
//! Barnes-Hut quadtree), spring attraction along edges and gravity toward the center, then
//! integrates a damped, speed-limited velocity. The step size shrinks with the iteration count.
//!
//! With `prune`, leaves (degree <= 1) are frozen while the rest of the graph settles. Each leaf is
//! then dropped onto its neighbor and the whole graph runs a short settling phase.

use indexmap::IndexMap;

use crate::algo::GForceOptions;
use crate::algo::forces::{self, Vec2};
use crate::algo::quadtree::{Body, Interaction, QuadTree};
use crate::algo::rng::XorShift64Star;
use crate::error::Result;
use crate::graph::{Graph, GraphIndex, LayoutOutcome, Node};
use crate::scheduler::{self, CancelToken, FrameClock, LayoutHooks, Simulation, StepOutcome};

const MIN_STEP_INTERVAL: f64 = 0.02;
const STEP_INTERVAL_DECAY: f64 = 0.002;

#[derive(Debug, Clone, Default)]
pub struct GForce {
    options: GForceOptions,
}

impl GForce {
    pub fn new(options: GForceOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &GForceOptions {
        &self.options
    }

    /// Prepares a simulation over `graph`: unpositioned nodes are scattered and every per-node
    /// option is resolved.
    pub fn simulation<'g>(&self, graph: &'g mut Graph) -> Result<GForceSimulation<'g>> {
        self.options.validate()?;
        Ok(GForceSimulation::new(graph, self.options.clone()))
    }

    pub fn layout(&self, graph: &mut Graph) -> Result<LayoutOutcome> {
        let mut sim = self.simulation(graph)?;
        Ok(scheduler::run_batch(&mut sim, None))
    }

    /// Batch layout that stops early once `cancel` is triggered.
    pub fn layout_with_cancel(
        &self,
        graph: &mut Graph,
        cancel: &CancelToken,
    ) -> Result<LayoutOutcome> {
        let mut sim = self.simulation(graph)?;
        Ok(scheduler::run_batch(&mut sim, Some(cancel)))
    }

    pub async fn layout_animated<C: FrameClock>(
        &self,
        graph: &mut Graph,
        clock: &mut C,
        cancel: Option<&CancelToken>,
    ) -> Result<LayoutOutcome> {
        let mut sim = self.simulation(graph)?;
        Ok(scheduler::run_animated(&mut sim, clock, cancel).await)
    }
}

#[derive(Debug, Clone, Copy)]
struct Gravity {
    target: Vec2,
    strength: f64,
}

pub struct GForceSimulation<'g> {
    graph: &'g mut Graph,
    opts: GForceOptions,
    index: GraphIndex,
    positions: Vec<Vec2>,
    previous: Vec<Vec2>,
    acc: Vec<Vec2>,
    pinned: Vec<Option<Vec2>>,
    strengths: Vec<f64>,
    /// Collision diameter: extent plus spacing.
    sizes: Vec<f64>,
    /// Per resolved edge.
    edge_lengths: Vec<f64>,
    edge_strengths: Vec<f64>,
    gravity: Vec<Gravity>,
    clusters: Vec<Option<usize>>,
    cluster_count: usize,
    barnes_hut: bool,
    /// Leaves held in place during the pruned phase; `None` once every node is live.
    frozen: Option<Vec<bool>>,
    /// Last iteration of the settling phase that follows the pruned one.
    settle_end: Option<usize>,
    iteration: usize,
    movement: f64,
}

impl<'g> GForceSimulation<'g> {
    fn new(graph: &'g mut Graph, opts: GForceOptions) -> Self {
        let n = graph.nodes.len();
        let mut index = GraphIndex::build(graph);
        if let Some(mass) = &opts.mass {
            for (m, node) in index.masses.iter_mut().zip(&graph.nodes) {
                let v = mass.value(node);
                if v > 0.0 {
                    *m = v;
                }
            }
        }
        let c = opts.center_point();
        let center = Vec2::new(c.x, c.y);
        let barnes_hut = opts.uses_barnes_hut(n);
        tracing::debug!(
            nodes = n,
            edges = index.edges.len(),
            barnes_hut,
            prune = opts.prune,
            "starting gforce layout"
        );

        let pinned: Vec<Option<Vec2>> = graph
            .nodes
            .iter()
            .map(|node| node.pinned().map(|p| Vec2::new(p.x, p.y)))
            .collect();
        let positions = if n == 1 {
            vec![pinned[0].unwrap_or(center)]
        } else {
            scatter(&graph.nodes, &pinned, center, &opts)
        };

        let strengths = opts.node_strength.resolve(&graph.nodes);
        let spacing = opts.node_spacing.resolve(&graph.nodes);
        let sizes: Vec<f64> = opts
            .node_size
            .resolve(&graph.nodes)
            .into_iter()
            .zip(spacing)
            .map(|(extent, spacing)| extent + spacing)
            .collect();

        let mut edge_lengths = Vec::with_capacity(index.edges.len());
        let mut edge_strengths = Vec::with_capacity(index.edges.len());
        for e in &index.edges {
            let edge = &graph.edges[e.edge];
            let (source, target) = (&graph.nodes[e.source], &graph.nodes[e.target]);
            edge_lengths.push(opts.link_distance.length(
                edge,
                source,
                target,
                (sizes[e.source], sizes[e.target]),
            ));
            edge_strengths.push(opts.edge_strength.value(edge));
        }

        let gravity = graph
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let custom = opts
                    .center_fn
                    .as_ref()
                    .and_then(|f| f.call(node, index.degrees[i]));
                match custom {
                    Some(t) => Gravity {
                        target: Vec2::new(t.x, t.y),
                        strength: t.strength,
                    },
                    None => Gravity {
                        target: center,
                        strength: opts.gravity,
                    },
                }
            })
            .collect();

        let (clusters, cluster_count) = if opts.clustering {
            cluster_ids(&graph.nodes)
        } else {
            (vec![None; n], 0)
        };

        let frozen: Option<Vec<bool>> = opts
            .prune
            .then(|| index.degrees.iter().map(|&d| d <= 1).collect());

        let mut sim = Self {
            graph,
            opts,
            index,
            previous: positions.clone(),
            acc: vec![Vec2::zeros(); n],
            positions,
            pinned,
            strengths,
            sizes,
            edge_lengths,
            edge_strengths,
            gravity,
            clusters,
            cluster_count,
            barnes_hut,
            frozen,
            settle_end: None,
            iteration: 0,
            movement: 0.0,
        };
        sim.write_back();
        sim
    }

    fn is_frozen(&self, i: usize) -> bool {
        self.frozen.as_ref().is_some_and(|f| f[i])
    }

    /// Ends the pruned phase: every frozen leaf is moved onto its neighbor.
    fn release_leaves(&mut self) {
        let Some(frozen) = self.frozen.take() else {
            return;
        };
        for e in &self.index.edges {
            if e.is_self_loop() {
                continue;
            }
            let (leaf, anchor) = if frozen[e.source] {
                (e.source, e.target)
            } else if frozen[e.target] {
                (e.target, e.source)
            } else {
                continue;
            };
            if self.pinned[leaf].is_none() {
                self.positions[leaf] = self.positions[anchor];
            }
        }
        let end = self.iteration + GForceOptions::PRUNE_SETTLE_ITERATIONS;
        tracing::debug!(
            iteration = self.iteration,
            leaves = frozen.iter().filter(|&&f| f).count(),
            "releasing pruned leaves"
        );
        self.settle_end = Some(end);
        self.write_back();
    }

    fn write_back(&mut self) {
        for (node, p) in self.graph.nodes.iter_mut().zip(&self.positions) {
            node.set_position(p.x, p.y);
        }
    }

    fn apply_repulsion(&mut self) {
        if self.barnes_hut {
            self.apply_repulsion_barnes_hut();
        } else {
            self.apply_repulsion_exact();
        }
    }

    fn apply_repulsion_exact(&mut self) {
        let n = self.positions.len();
        let factor = self.opts.factor;
        let scale = self.opts.coulomb_dis_scale;
        for i in 0..n {
            if self.is_frozen(i) {
                continue;
            }
            for j in (i + 1)..n {
                if self.is_frozen(j) {
                    continue;
                }
                let sep = forces::separation(self.positions[i], self.positions[j], i, j);
                let dir = sep.direction();
                let strength_sum = self.strengths[i] + self.strengths[j];
                let push = dir * forces::coulomb(strength_sum, sep.distance, factor, scale);
                self.acc[i] += push;
                self.acc[j] -= push;

                if let Some(overlap) = self.overlap(i, j, strength_sum, sep.distance) {
                    self.acc[i] += dir * (overlap / self.index.masses[i]);
                    self.acc[j] -= dir * (overlap / self.index.masses[j]);
                }
            }
        }
    }

    fn apply_repulsion_barnes_hut(&mut self) {
        let n = self.positions.len();
        let bodies = self
            .positions
            .iter()
            .zip(&self.strengths)
            .enumerate()
            .filter(|&(index, _)| !self.is_frozen(index))
            .map(|(index, (&position, &s))| Body {
                index,
                position,
                mass: s.max(0.0),
            })
            .collect();
        let tree = QuadTree::build(bodies);
        let theta = self.opts.barnes_hut_theta;
        let factor = self.opts.factor;
        let scale = self.opts.coulomb_dis_scale;

        for i in 0..n {
            if self.is_frozen(i) {
                continue;
            }
            let at = self.positions[i];
            let s_i = self.strengths[i];
            let mut a = Vec2::zeros();
            tree.visit(i, theta, |interaction| match interaction {
                Interaction::Body(body) => {
                    let j = body.index;
                    let sep = forces::separation(at, body.position, i, j);
                    let dir = sep.direction();
                    let strength_sum = s_i + self.strengths[j];
                    a += dir * forces::coulomb(strength_sum, sep.distance, factor, scale);
                    if let Some(overlap) = self.overlap(i, j, strength_sum, sep.distance) {
                        a += dir * (overlap / self.index.masses[i]);
                    }
                }
                Interaction::Cluster {
                    centroid,
                    mass,
                    count,
                } => {
                    let sep = forces::separation(at, centroid, i, n);
                    let strength_sum = count as f64 * s_i + mass;
                    a += sep.direction()
                        * forces::coulomb(strength_sum, sep.distance, factor, scale);
                }
            });
            self.acc[i] += a;
        }
    }

    /// Extra push for overlapping nodes, before the per-side mass division.
    fn overlap(&self, i: usize, j: usize, strength_sum: f64, distance: f64) -> Option<f64> {
        if !self.opts.prevent_overlap || (self.sizes[i] + self.sizes[j]) / 2.0 <= distance {
            return None;
        }
        Some(self.opts.collide_strength * strength_sum * 0.5 / (distance * distance))
    }

    fn apply_attraction(&mut self) {
        for (k, e) in self.index.edges.iter().enumerate() {
            if e.is_self_loop() || self.is_frozen(e.source) || self.is_frozen(e.target) {
                continue;
            }
            let (s, t) = (e.source, e.target);
            let sep = forces::separation(self.positions[t], self.positions[s], t, s);
            let dir = sep.direction();
            let stretch = if self.opts.linlog {
                self.edge_lengths[k].ln_1p() - sep.distance.ln_1p()
            } else {
                self.edge_lengths[k] - sep.distance
            };
            let param = stretch * self.edge_strengths[k];
            self.acc[s] -= dir * (param / self.index.masses[s]);
            self.acc[t] += dir * (param / self.index.masses[t]);
        }
    }

    fn apply_gravity(&mut self) {
        for (i, g) in self.gravity.iter().enumerate() {
            if g.strength == 0.0 || self.is_frozen(i) {
                continue;
            }
            self.acc[i] -= (self.positions[i] - g.target) * g.strength;
        }

        if self.cluster_count == 0 || self.opts.cluster_node_strength == 0.0 {
            return;
        }
        let mut sums = vec![(Vec2::zeros(), 0usize); self.cluster_count];
        for (p, c) in self.positions.iter().zip(&self.clusters) {
            if let Some(c) = *c {
                sums[c].0 += p;
                sums[c].1 += 1;
            }
        }
        let strength = self.opts.cluster_node_strength;
        for (i, c) in self.clusters.iter().enumerate() {
            let Some(c) = *c else {
                continue;
            };
            if self.is_frozen(i) {
                continue;
            }
            let (sum, count) = sums[c];
            let mean = sum / count as f64;
            self.acc[i] -= (self.positions[i] - mean) * strength;
        }
    }

    fn integrate(&mut self) {
        let dt = (self.opts.interval - self.iteration as f64 * STEP_INTERVAL_DECAY)
            .max(MIN_STEP_INTERVAL);
        let damping = self.opts.damping;
        let max_speed = self.opts.max_speed;
        self.previous.copy_from_slice(&self.positions);

        let mut total = 0.0;
        let mut live = 0usize;
        for i in 0..self.positions.len() {
            if self.is_frozen(i) {
                continue;
            }
            live += 1;
            if let Some(p) = self.pinned[i] {
                self.positions[i] = p;
            } else {
                let v = forces::finite_or_zero(self.acc[i] * (dt * damping));
                let v = forces::clamp_length(v, max_speed);
                self.positions[i] += v * dt;
            }
            total += (self.positions[i] - self.previous[i]).norm();
        }
        self.movement = total / live.max(1) as f64;
    }
}

impl Simulation for GForceSimulation<'_> {
    fn is_trivial(&self) -> bool {
        self.positions.len() <= 1
    }

    fn step(&mut self) -> StepOutcome {
        self.acc.fill(Vec2::zeros());
        self.apply_repulsion();
        self.apply_attraction();
        self.apply_gravity();
        self.integrate();
        self.write_back();
        self.iteration += 1;

        if self.frozen.is_some() {
            let settled = !self.opts.never_ending && self.movement < self.opts.min_movement;
            if settled || self.iteration >= self.opts.max_iteration {
                self.release_leaves();
            }
            return StepOutcome::Continue;
        }

        if self.opts.never_ending {
            StepOutcome::Continue
        } else if self.movement < self.opts.min_movement {
            StepOutcome::Converged
        } else if self.iteration >= self.budget() {
            StepOutcome::Exhausted
        } else {
            StepOutcome::Continue
        }
    }

    fn iteration(&self) -> usize {
        self.iteration
    }

    fn budget(&self) -> usize {
        match self.settle_end {
            Some(end) => end,
            None if self.opts.prune => {
                self.opts.max_iteration + GForceOptions::PRUNE_SETTLE_ITERATIONS
            }
            None => self.opts.max_iteration,
        }
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

    fn finish(&mut self) {
        self.write_back();
    }

    fn hooks(&self) -> &LayoutHooks {
        &self.opts.hooks
    }
}

/// Initial positions: pinned nodes at their pin, positioned nodes where they are, and missing
/// coordinates drawn uniformly from the `width x height` box around `center`.
fn scatter(nodes: &[Node], pinned: &[Option<Vec2>], center: Vec2, opts: &GForceOptions) -> Vec<Vec2> {
    let mut rng = XorShift64Star::new(opts.seed);
    let (hw, hh) = (opts.width / 2.0, opts.height / 2.0);
    nodes
        .iter()
        .zip(pinned)
        .map(|(node, pin)| {
            if let Some(p) = pin {
                return *p;
            }
            let x = match node.x {
                Some(x) if x.is_finite() => x,
                _ => center.x + rng.next_f64_signed() * hw,
            };
            let y = match node.y {
                Some(y) if y.is_finite() => y,
                _ => center.y + rng.next_f64_signed() * hh,
            };
            Vec2::new(x, y)
        })
        .collect()
}

fn cluster_ids(nodes: &[Node]) -> (Vec<Option<usize>>, usize) {
    let mut ids: IndexMap<&str, usize> = IndexMap::new();
    let clusters = nodes
        .iter()
        .map(|node| {
            node.cluster.as_deref().map(|tag| {
                let next = ids.len();
                *ids.entry(tag).or_insert(next)
            })
        })
        .collect();
    (clusters, ids.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Edge;

    fn seeded_graph(n: usize, seed: u64) -> Graph {
        let mut rng = XorShift64Star::new(seed);
        let nodes = (0..n)
            .map(|i| {
                Node::at(
                    format!("n{i}"),
                    rng.next_f64_signed() * 300.0,
                    rng.next_f64_signed() * 300.0,
                )
            })
            .collect();
        let edges = (1..n)
            .map(|i| Edge::new(format!("n{}", i / 2), format!("n{i}")))
            .collect();
        Graph::new(nodes, edges)
    }

    #[test]
    fn pair_repulsion_is_antisymmetric() {
        let mut g = Graph::new(
            vec![Node::at("a", 0.0, 0.0), Node::at("b", 3.0, 4.0)],
            Vec::new(),
        );
        let mut sim = GForce::new(GForceOptions::default())
            .simulation(&mut g)
            .unwrap();
        sim.apply_repulsion();
        assert!(sim.acc[0].norm() > 0.0);
        assert!((sim.acc[0] + sim.acc[1]).norm() < 1e-9 * sim.acc[0].norm());
        // a is pushed away from b
        assert!(sim.acc[0].x < 0.0 && sim.acc[0].y < 0.0);
    }

    #[test]
    fn coincident_nodes_are_separated_without_nan() {
        let mut g = Graph::new(
            vec![Node::at("a", 1.0, 1.0), Node::at("b", 1.0, 1.0)],
            vec![Edge::new("a", "b")],
        );
        let opts = GForceOptions {
            max_iteration: 5,
            ..Default::default()
        };
        GForce::new(opts).layout(&mut g).unwrap();
        let (a, b) = (g.nodes[0].position().unwrap(), g.nodes[1].position().unwrap());
        assert!(a.distance(&b) > 0.0);
    }

    #[test]
    fn barnes_hut_with_zero_theta_matches_exact_repulsion() {
        let mut exact_graph = seeded_graph(40, 9);
        let mut bh_graph = exact_graph.clone();

        let mut exact = GForce::new(GForceOptions {
            barnes_hut: Some(false),
            ..Default::default()
        })
        .simulation(&mut exact_graph)
        .unwrap();
        let mut bh = GForce::new(GForceOptions {
            barnes_hut: Some(true),
            barnes_hut_theta: 0.0,
            ..Default::default()
        })
        .simulation(&mut bh_graph)
        .unwrap();

        exact.apply_repulsion();
        bh.apply_repulsion();
        for (e, b) in exact.acc.iter().zip(&bh.acc) {
            assert!((e - b).norm() <= 1e-7 * e.norm().max(1.0), "{e:?} vs {b:?}");
        }
    }

    #[test]
    fn custom_center_overrides_gravity_per_node() {
        use crate::algo::{CenterFn, GravityTarget};

        let mut g = Graph::new(
            vec![Node::at("a", 10.0, 0.0), Node::at("b", -10.0, 0.0)],
            Vec::new(),
        );
        let opts = GForceOptions {
            center: Some(crate::graph::Point::new(0.0, 0.0)),
            center_fn: Some(CenterFn::new(|node, _degree| {
                (node.id == "a").then_some(GravityTarget {
                    x: 100.0,
                    y: 0.0,
                    strength: 5.0,
                })
            })),
            ..Default::default()
        };
        let mut sim = GForce::new(opts).simulation(&mut g).unwrap();
        sim.apply_gravity();
        assert_eq!(sim.acc[0], Vec2::new(450.0, 0.0));
        assert_eq!(sim.acc[1], Vec2::new(100.0, 0.0));
    }

    #[test]
    fn clustering_pulls_toward_the_cluster_mean() {
        let mut g = Graph::new(
            vec![
                Node::at("a", 0.0, 0.0).with_cluster("x"),
                Node::at("b", 10.0, 0.0).with_cluster("x"),
                Node::at("c", 50.0, 0.0),
            ],
            Vec::new(),
        );
        let opts = GForceOptions {
            gravity: 0.0,
            clustering: true,
            cluster_node_strength: 2.0,
            ..Default::default()
        };
        let mut sim = GForce::new(opts).simulation(&mut g).unwrap();
        sim.apply_gravity();
        assert_eq!(sim.acc[0], Vec2::new(10.0, 0.0));
        assert_eq!(sim.acc[1], Vec2::new(-10.0, 0.0));
        assert_eq!(sim.acc[2], Vec2::zeros());
    }

    #[test]
    fn mass_selector_overrides_degree_mass() {
        use crate::algo::selector::Selector;

        let mut g = Graph::new(
            vec![
                Node::at("a", 0.0, 0.0),
                Node::at("b", 10.0, 0.0).with_mass(4.0),
                Node::at("c", 20.0, 0.0),
            ],
            vec![Edge::new("a", "b"), Edge::new("b", "c")],
        );
        let opts = GForceOptions {
            mass: Some(Selector::custom(|node: &Node| match node.id.as_str() {
                "a" => 5.0,
                _ => -1.0,
            })),
            ..Default::default()
        };
        let sim = GForce::new(opts).simulation(&mut g).unwrap();
        assert_eq!(sim.index.masses, vec![5.0, 4.0, 1.0]);
    }

    #[test]
    fn linlog_springs_grow_logarithmically() {
        let graph = || {
            Graph::new(
                vec![Node::at("a", 0.0, 0.0), Node::at("b", 100.0, 0.0)],
                vec![Edge::new("a", "b")],
            )
        };
        let (mut linear_graph, mut linlog_graph) = (graph(), graph());
        let mut linear = GForce::new(GForceOptions::default())
            .simulation(&mut linear_graph)
            .unwrap();
        let mut linlog = GForce::new(GForceOptions {
            linlog: true,
            ..Default::default()
        })
        .simulation(&mut linlog_graph)
        .unwrap();
        linear.apply_attraction();
        linlog.apply_attraction();

        // length 1, strength 200, unit masses
        assert!((linear.acc[0].x - 99.0 * 200.0).abs() < 1e-9);
        let expected = (101f64.ln() - 2f64.ln()) * 200.0;
        assert!((linlog.acc[0].x - expected).abs() < 1e-9);
        assert_eq!(linlog.acc[0], -linlog.acc[1]);
    }

    #[test]
    fn prune_freezes_leaves_then_drops_them_on_their_neighbor() {
        let mut g = Graph::new(
            vec![
                Node::at("hub", 0.0, 0.0),
                Node::at("mid", 50.0, 0.0),
                Node::at("leaf1", 200.0, 200.0),
                Node::at("leaf2", -200.0, 100.0),
            ],
            vec![
                Edge::new("hub", "mid"),
                Edge::new("leaf1", "hub"),
                Edge::new("mid", "leaf2"),
            ],
        );
        let opts = GForceOptions {
            prune: true,
            max_iteration: 20,
            min_movement: 0.0,
            ..Default::default()
        };
        let mut sim = GForce::new(opts).simulation(&mut g).unwrap();
        assert_eq!(sim.budget(), 20 + GForceOptions::PRUNE_SETTLE_ITERATIONS);

        for _ in 0..19 {
            assert_eq!(sim.step(), StepOutcome::Continue);
        }
        assert_eq!(sim.positions[2], Vec2::new(200.0, 200.0));
        assert_eq!(sim.positions[3], Vec2::new(-200.0, 100.0));
        assert_ne!(sim.positions[0], Vec2::new(0.0, 0.0));

        assert_eq!(sim.step(), StepOutcome::Continue);
        assert!(sim.frozen.is_none());
        assert_eq!(sim.positions[2], sim.positions[0]);
        assert_eq!(sim.positions[3], sim.positions[1]);

        let outcome = scheduler::run_batch(&mut sim, None);
        assert_eq!(outcome.iterations, 20 + GForceOptions::PRUNE_SETTLE_ITERATIONS);
        drop(sim);
        let (hub, leaf) = (g.nodes[0].position().unwrap(), g.nodes[2].position().unwrap());
        assert!(hub.distance(&leaf) > 0.0);
    }

    #[test]
    fn scatter_is_seeded_and_keeps_known_coordinates() {
        let nodes = vec![Node::new("a"), Node::at("b", 7.0, 8.0), Node::new("c")];
        let pinned = vec![None, None, Some(Vec2::new(1.0, 2.0))];
        let opts = GForceOptions::default();
        let first = scatter(&nodes, &pinned, Vec2::new(150.0, 150.0), &opts);
        let second = scatter(&nodes, &pinned, Vec2::new(150.0, 150.0), &opts);
        assert_eq!(first, second);
        assert_eq!(first[1], Vec2::new(7.0, 8.0));
        assert_eq!(first[2], Vec2::new(1.0, 2.0));
        assert!((first[0].x - 150.0).abs() <= 150.0);
        assert!((first[0].y - 150.0).abs() <= 150.0);
    }
}
