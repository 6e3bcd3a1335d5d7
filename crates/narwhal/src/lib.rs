#![forbid(unsafe_code)]

//! Headless force-directed graph layouts.
//!
//! `narwhal` positions graph nodes with an iterative physical simulation: springs along edges,
//! repulsion between nodes and gravity toward a center. Two engines are provided:
//!
//! - [`GForce`], a flat engine with optional Barnes-Hut repulsion for large graphs;
//! - [`ComboForce`], a hierarchical engine that keeps members of nested groups ("combos") together.
//!
//! Layouts mutate node positions in place. They run either back-to-back ([`layout`]) or one step
//! per frame of a caller-supplied [`FrameClock`] ([`layout_animated`]), and can be stopped through a
//! [`CancelToken`].

pub mod algo;
pub mod error;
pub mod graph;
pub mod scheduler;

pub use algo::combo_force::{ComboForce, ComboForceSimulation, Session};
pub use algo::gforce::{GForce, GForceSimulation};
pub use algo::selector::{EdgeLength, NodeSize, Selector};
pub use algo::{Algorithm, CenterFn, ComboForceOptions, GForceOptions, GravityTarget};
pub use error::{Error, Result};
pub use graph::{Combo, Edge, Graph, LayoutOutcome, LayoutStatus, Node, NodeSizeValue, Point};
pub use scheduler::{
    CancelToken, FrameClock, LayoutHooks, Progress, Simulation, StepOutcome, YieldFrames,
    frames_from_fn,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runs `algorithm` over `graph` to completion without yielding.
pub fn layout(graph: &mut Graph, algorithm: Algorithm) -> Result<LayoutOutcome> {
    match algorithm {
        Algorithm::GForce(opts) => GForce::new(opts).layout(graph),
        Algorithm::ComboForce(opts) => ComboForce::new(opts).layout(graph),
    }
}

/// Runs `algorithm` over `graph`, suspending on `clock` between iterations.
pub async fn layout_animated<C: FrameClock>(
    graph: &mut Graph,
    algorithm: Algorithm,
    clock: &mut C,
    cancel: Option<&CancelToken>,
) -> Result<LayoutOutcome> {
    match algorithm {
        Algorithm::GForce(opts) => {
            let engine = GForce::new(opts);
            engine.layout_animated(graph, clock, cancel).await
        }
        Algorithm::ComboForce(opts) => {
            let mut engine = ComboForce::new(opts);
            engine.layout_animated(graph, clock, cancel).await
        }
    }
}
