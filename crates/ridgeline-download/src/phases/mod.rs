//! Phase handler contract and registry.
//!
//! A phase handler is one unit of pipeline work. It reports progress through
//! its [`PhaseContext`], checks [`PhaseContext::should_stop`] at each natural
//! suspension point, returns `Ok(())` early on pause and
//! `Err(DownloadError::Cancelled)` on cancel. Any other error is a phase
//! failure the manager may retry.
//!
//! The last phase is different: `Ok(())` from it completes the job, so a
//! handler there stops for a pause with `Err(DownloadError::Paused)`.

mod context;
mod dem;
mod finalise;

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use ridgeline_core::download::{DownloadError, Phase};

pub use context::{PhaseContext, ProgressSink, RunControl};
pub use dem::DemPhaseHandler;
pub use finalise::FinalisePhaseHandler;

/// One step of the download pipeline.
#[async_trait]
pub trait PhaseHandler: Send + Sync {
    async fn run(&self, ctx: &PhaseContext) -> Result<(), DownloadError>;
}

/// Handler that does nothing, for phases a deployment does not need.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPhaseHandler;

#[async_trait]
impl PhaseHandler for NoopPhaseHandler {
    async fn run(&self, _ctx: &PhaseContext) -> Result<(), DownloadError> {
        Ok(())
    }
}

/// Adapter turning an async closure into a [`PhaseHandler`].
pub struct FnPhaseHandler<F>(F);

/// Wrap `f` as a phase handler. The closure receives an owned context.
///
/// ```ignore
/// let tiles = phase_fn(|ctx| async move {
///     ctx.report(ProgressPatch::message("fetching tiles")).await;
///     Ok(())
/// });
/// ```
pub const fn phase_fn<F, Fut>(f: F) -> FnPhaseHandler<F>
where
    F: Fn(PhaseContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), DownloadError>> + Send + 'static,
{
    FnPhaseHandler(f)
}

#[async_trait]
impl<F, Fut> PhaseHandler for FnPhaseHandler<F>
where
    F: Fn(PhaseContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), DownloadError>> + Send + 'static,
{
    async fn run(&self, ctx: &PhaseContext) -> Result<(), DownloadError> {
        (self.0)(ctx.clone()).await
    }
}

/// Map from phase to handler, injected into the manager.
#[derive(Clone, Default)]
pub struct PhaseHandlers {
    handlers: HashMap<Phase, Arc<dyn PhaseHandler>>,
}

impl fmt::Debug for PhaseHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut phases: Vec<_> = self.handlers.keys().copied().collect();
        phases.sort_by_key(|p| p.index());
        f.debug_struct("PhaseHandlers")
            .field("phases", &phases)
            .finish()
    }
}

impl PhaseHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every phase mapped to [`NoopPhaseHandler`].
    pub fn noop() -> Self {
        Phase::ALL
            .into_iter()
            .fold(Self::new(), |handlers, phase| {
                handlers.with(phase, NoopPhaseHandler)
            })
    }

    /// Register `handler` for `phase`, replacing any previous one.
    #[must_use]
    pub fn with(self, phase: Phase, handler: impl PhaseHandler + 'static) -> Self {
        self.with_arc(phase, Arc::new(handler))
    }

    #[must_use]
    pub fn with_arc(mut self, phase: Phase, handler: Arc<dyn PhaseHandler>) -> Self {
        self.handlers.insert(phase, handler);
        self
    }

    pub fn get(&self, phase: Phase) -> Option<Arc<dyn PhaseHandler>> {
        self.handlers.get(&phase).cloned()
    }

    /// Phases with no handler, in pipeline order.
    pub fn missing(&self) -> Vec<Phase> {
        Phase::ALL
            .into_iter()
            .filter(|p| !self.handlers.contains_key(p))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridgeline_core::download::{JobId, ProgressPatch};
    use ridgeline_core::region::RegionId;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct NullSink;

    #[async_trait]
    impl ProgressSink for NullSink {
        async fn report(&self, _phase: Phase, _patch: ProgressPatch) {}
    }

    fn ctx() -> PhaseContext {
        PhaseContext::new(
            JobId::new("j1"),
            RegionId::new("r1").unwrap(),
            Phase::Overlays,
            RunControl::new(),
            Arc::new(NullSink),
        )
    }

    #[tokio::test]
    async fn closure_handlers_receive_the_context() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let handler = phase_fn(move |ctx: PhaseContext| {
            let counter = Arc::clone(&counter);
            async move {
                assert_eq!(ctx.phase(), Phase::Overlays);
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        handler.run(&ctx()).await.unwrap();
        handler.run(&ctx()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn registry_reports_missing_phases() {
        let handlers = PhaseHandlers::new()
            .with(Phase::Estimating, NoopPhaseHandler)
            .with(Phase::Finalise, NoopPhaseHandler);
        assert_eq!(
            handlers.missing(),
            vec![Phase::Tiles, Phase::Dem, Phase::Overlays, Phase::Index]
        );
        assert!(PhaseHandlers::noop().missing().is_empty());
        assert!(handlers.get(Phase::Tiles).is_none());
    }
}
