//! Elevation providers bundled with the pipeline.
//!
//! Real providers live outside this workspace and plug in through
//! [`ElevationProviderPort`].

mod synthetic;

use async_trait::async_trait;
use ridgeline_core::download::DownloadError;
use ridgeline_core::ports::{DemProgress, DemRequest, DemResult, ElevationProviderPort};

pub use synthetic::SyntheticElevationProvider;

/// Placeholder used when no elevation source is configured. Always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredElevationProvider;

#[async_trait]
impl ElevationProviderPort for UnconfiguredElevationProvider {
    async fn fetch_dem(
        &self,
        _request: &DemRequest,
        _on_progress: &(dyn Fn(DemProgress) + Send + Sync),
    ) -> Result<DemResult, DownloadError> {
        Err(DownloadError::not_configured("elevation provider"))
    }
}
