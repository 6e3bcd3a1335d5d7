//! Arena Barnes-Hut quadtree.
//!
//! The tree is rebuilt from scratch every step. Quads live in one `Vec` and refer to their
//! children by `u32` handle; bodies are stored once and leaves keep their slots.

use super::forces::{MIN_DISTANCE, Vec2};

/// Smallest side of the root square.
pub const MIN_QUAD_SIDE: f64 = 1.0;

/// Past this depth a leaf accepts further bodies instead of subdividing, so any number of
/// collocated bodies terminates.
pub const MAX_DEPTH: usize = 24;

/// Default opening ratio.
pub const DEFAULT_THETA: f64 = 1.0;

const ROOT: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    /// Caller-side index (the node index for the force engines).
    pub index: usize,
    pub position: Vec2,
    /// Non-negative weight used for the centroid and the aggregate.
    pub mass: f64,
}

/// What a query reports for one part of the tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interaction<'a> {
    Body(&'a Body),
    Cluster {
        centroid: Vec2,
        mass: f64,
        count: usize,
    },
}

#[derive(Debug, Clone)]
enum QuadKind {
    Empty,
    Leaf(Vec<u32>),
    Internal([u32; 4]),
}

#[derive(Debug, Clone)]
struct Quad {
    center: Vec2,
    half: f64,
    mass: f64,
    weighted: Vec2,
    sum: Vec2,
    count: usize,
    kind: QuadKind,
}

impl Quad {
    fn new(center: Vec2, half: f64) -> Self {
        Self {
            center,
            half,
            mass: 0.0,
            weighted: Vec2::zeros(),
            sum: Vec2::zeros(),
            count: 0,
            kind: QuadKind::Empty,
        }
    }

    fn accumulate(&mut self, body: &Body) {
        self.mass += body.mass;
        self.weighted += body.position * body.mass;
        self.sum += body.position;
        self.count += 1;
    }

    fn centroid(&self) -> Vec2 {
        if self.mass > f64::EPSILON {
            self.weighted / self.mass
        } else if self.count > 0 {
            self.sum / self.count as f64
        } else {
            self.center
        }
    }

    fn quadrant(&self, p: &Vec2) -> usize {
        let x_bit = (p.x >= self.center.x) as usize;
        let y_bit = (p.y >= self.center.y) as usize;
        x_bit | (y_bit << 1)
    }

    fn contains(&self, p: &Vec2) -> bool {
        (p.x - self.center.x).abs() <= self.half && (p.y - self.center.y).abs() <= self.half
    }
}

#[derive(Debug, Clone)]
pub struct QuadTree {
    bodies: Vec<Body>,
    quads: Vec<Quad>,
}

impl QuadTree {
    /// Builds a tree over `bodies`. Bodies with non-finite positions are kept addressable by slot
    /// but are not inserted.
    pub fn build(bodies: Vec<Body>) -> Self {
        let (center, half) = root_square(&bodies);
        let mut tree = Self {
            quads: Vec::with_capacity(bodies.len().saturating_mul(2).max(1)),
            bodies,
        };
        tree.quads.push(Quad::new(center, half));
        for slot in 0..tree.bodies.len() {
            let p = tree.bodies[slot].position;
            if p.x.is_finite() && p.y.is_finite() {
                tree.insert_at(ROOT, 0, slot as u32);
            }
        }
        tree
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// Number of inserted bodies.
    pub fn len(&self) -> usize {
        self.quads[ROOT as usize].count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total mass and centroid of every inserted body.
    pub fn total(&self) -> (f64, Vec2) {
        let root = &self.quads[ROOT as usize];
        (root.mass, root.centroid())
    }

    fn insert_at(&mut self, start: u32, start_depth: usize, slot: u32) {
        let body = self.bodies[slot as usize];
        let mut q = start as usize;
        let mut depth = start_depth;
        loop {
            self.quads[q].accumulate(&body);
            let kind = std::mem::replace(&mut self.quads[q].kind, QuadKind::Empty);
            match kind {
                QuadKind::Empty => {
                    self.quads[q].kind = QuadKind::Leaf(vec![slot]);
                    return;
                }
                QuadKind::Leaf(mut slots) if depth >= MAX_DEPTH => {
                    slots.push(slot);
                    self.quads[q].kind = QuadKind::Leaf(slots);
                    return;
                }
                QuadKind::Leaf(slots) => {
                    let children = self.split(q);
                    self.quads[q].kind = QuadKind::Internal(children);
                    for old in slots {
                        let quadrant = self.quads[q].quadrant(&self.bodies[old as usize].position);
                        self.insert_at(children[quadrant], depth + 1, old);
                    }
                    q = children[self.quads[q].quadrant(&body.position)] as usize;
                }
                QuadKind::Internal(children) => {
                    self.quads[q].kind = QuadKind::Internal(children);
                    q = children[self.quads[q].quadrant(&body.position)] as usize;
                }
            }
            depth += 1;
        }
    }

    fn split(&mut self, q: usize) -> [u32; 4] {
        let Quad { center, half, .. } = self.quads[q];
        let h = half / 2.0;
        let mut children = [0u32; 4];
        for (quadrant, child) in children.iter_mut().enumerate() {
            let dx = if quadrant & 1 != 0 { h } else { -h };
            let dy = if quadrant & 2 != 0 { h } else { -h };
            *child = self.quads.len() as u32;
            self.quads.push(Quad::new(center + Vec2::new(dx, dy), h));
        }
        children
    }

    /// Walks the tree on behalf of the body in `target` (a slot into [`QuadTree::bodies`]).
    ///
    /// Leaf bodies other than the target are reported one by one. An internal quad that does not
    /// contain the target and whose `side / distance` is below `theta` is reported as one
    /// [`Interaction::Cluster`]. Quads containing the target are always opened.
    pub fn visit<'a>(&'a self, target: usize, theta: f64, mut f: impl FnMut(Interaction<'a>)) {
        let Some(target_body) = self.bodies.get(target) else {
            return;
        };
        let at = target_body.position;
        let mut stack: Vec<u32> = vec![ROOT];
        while let Some(q) = stack.pop() {
            let quad = &self.quads[q as usize];
            if quad.count == 0 {
                continue;
            }
            match &quad.kind {
                QuadKind::Empty => {}
                QuadKind::Leaf(slots) => {
                    for &slot in slots {
                        if slot as usize != target {
                            f(Interaction::Body(&self.bodies[slot as usize]));
                        }
                    }
                }
                QuadKind::Internal(children) => {
                    if !quad.contains(&at) {
                        let centroid = quad.centroid();
                        let d = (centroid - at).norm();
                        if d >= MIN_DISTANCE && (quad.half * 2.0) / d < theta {
                            f(Interaction::Cluster {
                                centroid,
                                mass: quad.mass,
                                count: quad.count,
                            });
                            continue;
                        }
                    }
                    stack.extend_from_slice(children);
                }
            }
        }
    }
}

fn root_square(bodies: &[Body]) -> (Vec2, f64) {
    let mut min = Vec2::new(f64::INFINITY, f64::INFINITY);
    let mut max = Vec2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for b in bodies {
        let p = b.position;
        if !(p.x.is_finite() && p.y.is_finite()) {
            continue;
        }
        min = min.inf(&p);
        max = max.sup(&p);
    }
    if !(min.x.is_finite() && max.x.is_finite()) {
        return (Vec2::zeros(), MIN_QUAD_SIDE / 2.0);
    }
    let side = (max.x - min.x).max(max.y - min.y).max(MIN_QUAD_SIDE);
    let padded = side * (1.0 + 1e-6) + MIN_DISTANCE;
    ((min + max) / 2.0, padded / 2.0)
}
