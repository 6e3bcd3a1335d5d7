//! Drives a [`Simulation`] either back-to-back or one step per frame.
//!
//! The async driver does not depend on any runtime: it suspends through a caller-supplied
//! [`FrameClock`] and observes cancellation through a [`CancelToken`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use futures::channel::oneshot;

use crate::graph::{LayoutOutcome, LayoutStatus, Node};

/// Result of a single simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Converged,
    /// The step used the last iteration of the budget.
    Exhausted,
}

/// Snapshot handed to [`LayoutHooks::on_tick`] after every step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub iteration: usize,
    pub budget: usize,
    /// Mean per-node displacement of the last step.
    pub movement: f64,
    /// Current cooling parameter, for engines that have one.
    pub alpha: Option<f64>,
}

pub type TickFn = Arc<dyn Fn(&Progress, &[Node]) + Send + Sync>;
pub type LayoutEndFn = Arc<dyn Fn(&LayoutOutcome) + Send + Sync>;

#[derive(Clone, Default)]
pub struct LayoutHooks {
    pub on_tick: Option<TickFn>,
    pub on_layout_end: Option<LayoutEndFn>,
}

impl LayoutHooks {
    pub fn on_tick(mut self, f: impl Fn(&Progress, &[Node]) + Send + Sync + 'static) -> Self {
        self.on_tick = Some(Arc::new(f));
        self
    }

    pub fn on_layout_end(mut self, f: impl Fn(&LayoutOutcome) + Send + Sync + 'static) -> Self {
        self.on_layout_end = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for LayoutHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutHooks")
            .field("on_tick", &self.on_tick.is_some())
            .field("on_layout_end", &self.on_layout_end.is_some())
            .finish()
    }
}

/// A running layout over a mutably borrowed graph.
pub trait Simulation {
    /// Zero or one node: [`Simulation::step`] must not be called.
    fn is_trivial(&self) -> bool;

    /// Runs one iteration and writes the new positions back into the graph.
    fn step(&mut self) -> StepOutcome;

    /// Completed iterations.
    fn iteration(&self) -> usize;

    fn budget(&self) -> usize;

    /// When set, convergence is never reported and animated runs stop only on cancellation.
    fn never_ending(&self) -> bool {
        false
    }

    fn nodes(&self) -> &[Node];

    fn last_movement(&self) -> f64;

    fn alpha(&self) -> Option<f64> {
        None
    }

    /// Final bookkeeping after the last step (recentering, combo positions).
    fn finish(&mut self);

    fn hooks(&self) -> &LayoutHooks;
}

/// Suspension point between animated iterations.
pub trait FrameClock {
    fn next_frame(&mut self) -> impl Future<Output = ()>;
}

/// Yields to the executor once per frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct YieldFrames;

impl FrameClock for YieldFrames {
    fn next_frame(&mut self) -> impl Future<Output = ()> {
        YieldNow { yielded: false }
    }
}

/// Adapts any `FnMut() -> impl Future<Output = ()>` (a timer, an animation-frame callback).
#[derive(Debug, Clone)]
pub struct FnFrames<F>(pub F);

pub fn frames_from_fn<F, Fut>(f: F) -> FnFrames<F>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    FnFrames(f)
}

impl<F, Fut> FrameClock for FnFrames<F>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    fn next_frame(&mut self) -> impl Future<Output = ()> {
        (self.0)()
    }
}

struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// Cooperative, one-shot cancellation shared between a running layout and its controllers.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Default)]
struct CancelInner {
    requested: AtomicBool,
    state: Mutex<RunState>,
}

#[derive(Default)]
struct RunState {
    running: bool,
    waiters: Vec<oneshot::Sender<()>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.requested.load(Ordering::Acquire)
    }

    /// Requests cancellation. The returned future resolves once the in-flight step has completed
    /// and the run has stopped; it resolves immediately when no run is attached.
    pub async fn cancel(&self) {
        self.inner.requested.store(true, Ordering::Release);
        let rx = {
            let mut state = self
                .inner
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !state.running {
                None
            } else {
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                Some(rx)
            }
        };
        if let Some(rx) = rx {
            let _ = rx.await;
        }
    }

    fn attach(&self) -> RunGuard<'_> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .running = true;
        RunGuard { token: self }
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Marks a run as finished and releases pending `cancel()` futures, also on unwind.
struct RunGuard<'a> {
    token: &'a CancelToken,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let waiters = {
            let mut state = self
                .token
                .inner
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            state.running = false;
            std::mem::take(&mut state.waiters)
        };
        for tx in waiters {
            let _ = tx.send(());
        }
    }
}

fn cancelled(cancel: Option<&CancelToken>) -> bool {
    cancel.is_some_and(CancelToken::is_cancelled)
}

fn tick<S: Simulation + ?Sized>(sim: &S) {
    let iteration = sim.iteration();
    let movement = sim.last_movement();
    tracing::trace!(iteration, movement, alpha = ?sim.alpha(), "layout step");
    if let Some(on_tick) = &sim.hooks().on_tick {
        let progress = Progress {
            iteration,
            budget: sim.budget(),
            movement,
            alpha: sim.alpha(),
        };
        on_tick(&progress, sim.nodes());
    }
}

fn conclude<S: Simulation + ?Sized>(sim: &mut S, status: LayoutStatus) -> LayoutOutcome {
    sim.finish();
    let outcome = LayoutOutcome {
        status,
        iterations: sim.iteration(),
    };
    tracing::debug!(status = ?outcome.status, iterations = outcome.iterations, "layout finished");
    if let Some(on_end) = &sim.hooks().on_layout_end {
        on_end(&outcome);
    }
    outcome
}

/// Runs iterations back to back until convergence, the budget, or cancellation.
///
/// The budget always applies here, including for never-ending simulations.
pub fn run_batch<S: Simulation + ?Sized>(
    sim: &mut S,
    cancel: Option<&CancelToken>,
) -> LayoutOutcome {
    if sim.is_trivial() {
        return conclude(sim, LayoutStatus::Trivial);
    }
    let _guard = cancel.map(CancelToken::attach);
    let status = loop {
        if cancelled(cancel) {
            break LayoutStatus::Cancelled;
        }
        if sim.iteration() >= sim.budget() {
            break LayoutStatus::IterationLimit;
        }
        let outcome = sim.step();
        tick(&*sim);
        match outcome {
            StepOutcome::Continue => {}
            StepOutcome::Converged => break LayoutStatus::Converged,
            StepOutcome::Exhausted => break LayoutStatus::IterationLimit,
        }
    };
    conclude(sim, status)
}

/// Runs one iteration per frame of `clock`.
///
/// Suspends exactly once between consecutive iterations. Cancellation is observed before every
/// step and after every resumption; the step in flight always completes.
pub async fn run_animated<S, C>(
    sim: &mut S,
    clock: &mut C,
    cancel: Option<&CancelToken>,
) -> LayoutOutcome
where
    S: Simulation + ?Sized,
    C: FrameClock,
{
    if sim.is_trivial() {
        return conclude(sim, LayoutStatus::Trivial);
    }
    let _guard = cancel.map(CancelToken::attach);
    let status = loop {
        if cancelled(cancel) {
            break LayoutStatus::Cancelled;
        }
        if !sim.never_ending() && sim.iteration() >= sim.budget() {
            break LayoutStatus::IterationLimit;
        }
        let outcome = sim.step();
        tick(&*sim);
        match outcome {
            StepOutcome::Continue => {}
            StepOutcome::Converged => break LayoutStatus::Converged,
            StepOutcome::Exhausted if !sim.never_ending() => break LayoutStatus::IterationLimit,
            StepOutcome::Exhausted => {}
        }
        clock.next_frame().await;
        if cancelled(cancel) {
            break LayoutStatus::Cancelled;
        }
    };
    conclude(sim, status)
}
