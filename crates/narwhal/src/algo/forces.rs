//! Pairwise force primitives shared by the engines.

use nalgebra::Vector2;

pub type Vec2 = Vector2<f64>;

/// Separations shorter than this are replaced by a jitter vector.
pub const MIN_DISTANCE: f64 = 1e-4;

/// Magnitude of the jitter vector used for coincident positions.
const JITTER: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Separation {
    /// `a - b`, never shorter than [`MIN_DISTANCE`].
    pub vector: Vec2,
    pub distance: f64,
}

impl Separation {
    pub fn direction(&self) -> Vec2 {
        self.vector / self.distance
    }

    pub fn distance_sq(&self) -> f64 {
        self.distance * self.distance
    }
}

/// Separation between `a` (node `i`) and `b` (node `j`).
///
/// Coincident positions get a deterministic jitter derived from the unordered pair, so
/// `separation(a, b, i, j).vector == -separation(b, a, j, i).vector` always holds.
pub fn separation(a: Vec2, b: Vec2, i: usize, j: usize) -> Separation {
    let mut vector = a - b;
    if !(vector.x.is_finite() && vector.y.is_finite()) || vector.norm() < MIN_DISTANCE {
        vector = pair_jitter(i, j);
    }
    let distance = vector.norm();
    Separation { vector, distance }
}

/// Deterministic, antisymmetric jitter for the pair `(i, j)`.
pub fn pair_jitter(i: usize, j: usize) -> Vec2 {
    let (lo, hi) = if i <= j { (i, j) } else { (j, i) };
    let h = splitmix64((lo as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ (hi as u64));
    let angle = ((h >> 11) as f64 / (1u64 << 53) as f64) * std::f64::consts::TAU;
    let v = Vec2::new(angle.cos(), angle.sin()) * JITTER;
    if i <= j { v } else { -v }
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Edge-count per node from resolved `(source, target)` index pairs. Self-loops count once.
pub fn degrees(node_count: usize, edges: impl IntoIterator<Item = (usize, usize)>) -> Vec<usize> {
    let mut out = vec![0usize; node_count];
    for (s, t) in edges {
        if s >= node_count || t >= node_count {
            continue;
        }
        out[s] += 1;
        if s != t {
            out[t] += 1;
        }
    }
    out
}

/// Explicit mass when it is a positive finite number, otherwise the degree (minimum 1).
pub fn masses(explicit: impl IntoIterator<Item = Option<f64>>, degrees: &[usize]) -> Vec<f64> {
    explicit
        .into_iter()
        .zip(degrees)
        .map(|(m, &deg)| match m {
            Some(m) if m.is_finite() && m > 0.0 => m,
            _ => (deg as f64).max(1.0),
        })
        .collect()
}

/// Scales `v` down to `max` when its length exceeds it.
pub fn clamp_length(v: Vec2, max: f64) -> Vec2 {
    let len = v.norm();
    if len > max && len > 0.0 { v * (max / len) } else { v }
}

/// Replaces non-finite components with zero.
pub fn finite_or_zero(v: Vec2) -> Vec2 {
    Vec2::new(
        if v.x.is_finite() { v.x } else { 0.0 },
        if v.y.is_finite() { v.y } else { 0.0 },
    )
}

/// The flat engine's Coulomb-style repulsion coefficient for one interaction.
///
/// `strength_sum` is the summed node strength of both sides (for an aggregate, the target
/// strength times the body count plus the aggregate strength).
pub fn coulomb(strength_sum: f64, distance: f64, factor: f64, dis_scale: f64) -> f64 {
    let scaled = (distance + 0.1) * dis_scale;
    strength_sum * 0.5 * factor / (scaled * scaled).max(f64::MIN_POSITIVE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separation_replaces_coincident_points_with_jitter() {
        let p = Vec2::new(3.0, 4.0);
        let s = separation(p, p, 2, 7);
        assert!(s.distance >= MIN_DISTANCE);
        assert!(s.distance.is_finite());

        let r = separation(p, p, 7, 2);
        assert_eq!(s.vector, -r.vector);
    }

    #[test]
    fn separation_keeps_regular_vectors() {
        let s = separation(Vec2::new(3.0, 4.0), Vec2::new(0.0, 0.0), 0, 1);
        assert_eq!(s.vector, Vec2::new(3.0, 4.0));
        assert!((s.distance - 5.0).abs() < 1e-12);
        assert!((s.direction().norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn degrees_count_self_loops_once() {
        let d = degrees(3, [(0, 1), (1, 1), (1, 2), (0, 1)]);
        assert_eq!(d, vec![2, 4, 1]);
    }

    #[test]
    fn masses_fall_back_to_degree_then_one() {
        let m = masses([Some(5.0), None, Some(-1.0), Some(f64::NAN)], &[1, 3, 0, 2]);
        assert_eq!(m, vec![5.0, 3.0, 1.0, 2.0]);
    }

    #[test]
    fn clamp_length_limits_speed() {
        let v = clamp_length(Vec2::new(30.0, 40.0), 10.0);
        assert!((v.norm() - 10.0).abs() < 1e-12);
        assert_eq!(clamp_length(Vec2::new(1.0, 0.0), 10.0), Vec2::new(1.0, 0.0));
    }
}
