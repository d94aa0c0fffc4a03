//! Finalise phase: validate the staged package and promote it.

use std::sync::Arc;

use async_trait::async_trait;
use ridgeline_core::download::{DownloadError, ProgressPatch};
use ridgeline_core::ports::RegionPackagePort;

use super::{PhaseContext, PhaseHandler};

pub struct FinalisePhaseHandler {
    store: Arc<dyn RegionPackagePort>,
}

impl FinalisePhaseHandler {
    pub fn new(store: Arc<dyn RegionPackagePort>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PhaseHandler for FinalisePhaseHandler {
    async fn run(&self, ctx: &PhaseContext) -> Result<(), DownloadError> {
        // Last phase: Ok means installed, so a pause must surface as a signal.
        ctx.control().check()?;
        ctx.report(ProgressPatch::message("Installing region package"))
            .await;
        self.store.finalise_temp_to_final(ctx.region_id()).await?;
        Ok(())
    }
}
