//! Combo forest stored as an arena of records addressed by index.

use rustc_hash::FxHashMap;

use crate::algo::forces::Vec2;
use crate::graph::Graph;

#[derive(Debug, Clone)]
pub(crate) struct ComboRecord {
    /// Index into `Graph::combos`.
    pub(crate) source: usize,
    pub(crate) parent: Option<usize>,
    pub(crate) children: Vec<usize>,
    /// Nodes whose `combo_id` names this combo.
    pub(crate) nodes: Vec<usize>,
    /// Every node below this combo, at any depth.
    pub(crate) members: Vec<usize>,
    pub(crate) depth: u32,
    pub(crate) reachable: bool,
    pub(crate) external: Option<Vec2>,
    /// Lower bound for the collision extent.
    pub(crate) min_size: f64,
    /// `spacing / 2 + padding`, added to the half extent.
    pub(crate) margin: f64,
    pub(crate) centroid: Vec2,
    pub(crate) mass: f64,
    pub(crate) min: Vec2,
    pub(crate) max: Vec2,
    pub(crate) radius: f64,
}

impl ComboRecord {
    pub(crate) fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ComboTree {
    pub(crate) combos: Vec<ComboRecord>,
    pub(crate) roots: Vec<usize>,
    /// Reachable combos, children before parents.
    pub(crate) post_order: Vec<usize>,
    /// Owning combo per node; `None` for ownerless nodes and nodes of unreachable combos.
    pub(crate) owner: Vec<Option<usize>>,
}

impl ComboTree {
    pub(crate) const DEFAULT_MIN_SIZE: f64 = 10.0;
    const ANCHOR_SPREAD: f64 = 60.0;

    /// `margins` holds `spacing / 2 + padding` per entry of `graph.combos`.
    pub(crate) fn build(graph: &Graph, margins: &[f64]) -> Self {
        let mut id_to_idx: FxHashMap<&str, usize> = FxHashMap::default();
        let mut combos: Vec<ComboRecord> = Vec::with_capacity(graph.combos.len());
        for (source, c) in graph.combos.iter().enumerate() {
            if id_to_idx.contains_key(c.id.as_str()) {
                tracing::warn!(combo = %c.id, "duplicate combo id; keeping the first occurrence");
                continue;
            }
            id_to_idx.insert(c.id.as_str(), combos.len());
            let min_size = match c.size {
                Some(s) if s.is_finite() && s >= 0.0 => s,
                _ => Self::DEFAULT_MIN_SIZE,
            };
            combos.push(ComboRecord {
                source,
                parent: None,
                children: Vec::new(),
                nodes: Vec::new(),
                members: Vec::new(),
                depth: 0,
                reachable: false,
                external: c.position().map(|p| Vec2::new(p.x, p.y)),
                min_size,
                margin: margins.get(source).copied().unwrap_or(0.0),
                centroid: Vec2::zeros(),
                mass: 0.0,
                min: Vec2::zeros(),
                max: Vec2::zeros(),
                radius: 0.0,
            });
        }

        let mut roots = Vec::new();
        for idx in 0..combos.len() {
            let c = &graph.combos[combos[idx].source];
            let parent = match c.parent_id.as_deref() {
                None => None,
                Some(pid) => match id_to_idx.get(pid) {
                    Some(&p) => Some(p),
                    None => {
                        tracing::warn!(combo = %c.id, parent = pid, "unknown parent combo; treating as root");
                        None
                    }
                },
            };
            combos[idx].parent = parent;
            match parent {
                Some(p) => combos[p].children.push(idx),
                None => roots.push(idx),
            }
        }

        // Combos on a parent cycle are never reached from a root and keep `reachable = false`.
        let mut stack: Vec<(usize, u32)> = roots.iter().rev().map(|&r| (r, 0)).collect();
        while let Some((idx, depth)) = stack.pop() {
            let explicit = graph.combos[combos[idx].source].depth;
            let depth = explicit.unwrap_or(depth);
            combos[idx].depth = depth;
            combos[idx].reachable = true;
            for &child in combos[idx].children.iter().rev() {
                stack.push((child, depth.saturating_add(1)));
            }
        }
        let post_order = post_order_of(&combos, &roots);

        let mut owner: Vec<Option<usize>> = vec![None; graph.nodes.len()];
        for (i, node) in graph.nodes.iter().enumerate() {
            let Some(cid) = node.combo_id.as_deref() else {
                continue;
            };
            match id_to_idx.get(cid) {
                Some(&c) if combos[c].reachable => {
                    owner[i] = Some(c);
                    combos[c].nodes.push(i);
                }
                Some(_) => {}
                None => {
                    tracing::warn!(node = %node.id, combo = cid, "node references an unknown combo");
                }
            }
        }

        for &idx in &post_order {
            let mut members = combos[idx].nodes.clone();
            for k in 0..combos[idx].children.len() {
                let child = combos[idx].children[k];
                members.extend_from_slice(&combos[child].members);
            }
            combos[idx].members = members;
        }

        Self {
            combos,
            roots,
            post_order,
            owner,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.combos.is_empty()
    }

    /// Depth of node `i`: explicit, else one below its combo, else 0.
    pub(crate) fn node_depth(&self, i: usize, explicit: Option<u32>) -> u32 {
        explicit.unwrap_or_else(|| {
            self.owner[i].map_or(0, |c| self.combos[c].depth.saturating_add(1))
        })
    }

    /// Recomputes centroids, aggregate masses, bounding boxes and radii bottom-up.
    ///
    /// `radii` are the per-node collision radii; empty combos stay at their external position or
    /// at `fallback`.
    pub(crate) fn update(&mut self, positions: &[Vec2], masses: &[f64], radii: &[f64], fallback: Vec2) {
        for k in 0..self.post_order.len() {
            let idx = self.post_order[k];
            let mut mass = 0.0;
            let mut weighted = Vec2::zeros();
            let mut min = Vec2::new(f64::INFINITY, f64::INFINITY);
            let mut max = Vec2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);

            for &n in &self.combos[idx].nodes {
                let m = masses[n];
                weighted += positions[n] * m;
                mass += m;
                let r = Vec2::new(radii[n], radii[n]);
                min = min.inf(&(positions[n] - r));
                max = max.sup(&(positions[n] + r));
            }
            for &child in &self.combos[idx].children {
                let c = &self.combos[child];
                if c.is_empty() {
                    continue;
                }
                weighted += c.centroid * c.mass;
                mass += c.mass;
                min = min.inf(&c.min);
                max = max.sup(&c.max);
            }

            let record = &mut self.combos[idx];
            if record.is_empty() || mass <= 0.0 {
                record.centroid = record.external.unwrap_or(fallback);
                record.mass = 0.0;
                record.min = record.centroid;
                record.max = record.centroid;
            } else {
                record.centroid = weighted / mass;
                record.mass = mass;
                record.min = min;
                record.max = max;
            }
            let extent = (record.max.x - record.min.x)
                .max(record.max.y - record.min.y)
                .max(record.min_size);
            record.radius = extent / 2.0 + record.margin;
        }
    }

    /// Groups of sibling combos, root-level combos included.
    pub(crate) fn sibling_groups(&self) -> impl Iterator<Item = &[usize]> {
        std::iter::once(self.roots.as_slice()).chain(
            self.post_order
                .iter()
                .map(|&idx| self.combos[idx].children.as_slice()),
        )
    }

    /// Seed anchor per combo: external position, else the mean of already-placed members, else
    /// a sunflower slot (by sibling rank) around the parent's anchor or `fallback`.
    pub(crate) fn anchors(&self, known: &[Option<Vec2>], fallback: Vec2) -> Vec<Vec2> {
        let mut rank = vec![0usize; self.combos.len()];
        for (k, &r) in self.roots.iter().enumerate() {
            rank[r] = k;
        }
        for c in &self.combos {
            for (k, &child) in c.children.iter().enumerate() {
                rank[child] = k;
            }
        }

        let mut out = vec![fallback; self.combos.len()];
        for &idx in self.post_order.iter().rev() {
            let c = &self.combos[idx];
            let placed: Vec<Vec2> = c.members.iter().filter_map(|&n| known[n]).collect();
            out[idx] = if let Some(p) = c.external {
                p
            } else if !placed.is_empty() {
                placed.iter().sum::<Vec2>() / placed.len() as f64
            } else {
                let parent = c.parent.map_or(fallback, |p| out[p]);
                parent + sunflower(rank[idx], Self::ANCHOR_SPREAD)
            };
        }
        out
    }
}

/// Offset of slot `k` on a golden-angle spiral whose first ring has radius `spread`.
pub(crate) fn sunflower(k: usize, spread: f64) -> Vec2 {
    const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;
    let r = spread * ((k + 1) as f64).sqrt();
    let angle = k as f64 * GOLDEN_ANGLE;
    Vec2::new(r * angle.cos(), r * angle.sin())
}

fn post_order_of(combos: &[ComboRecord], roots: &[usize]) -> Vec<usize> {
    let mut out = Vec::with_capacity(combos.len());
    let mut stack: Vec<(usize, bool)> = roots.iter().rev().map(|&r| (r, false)).collect();
    while let Some((idx, expanded)) = stack.pop() {
        if expanded {
            out.push(idx);
            continue;
        }
        stack.push((idx, true));
        for &child in combos[idx].children.iter().rev() {
            stack.push((child, false));
        }
    }
    out
}
