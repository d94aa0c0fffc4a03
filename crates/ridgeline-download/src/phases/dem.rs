//! DEM phase: fetch an elevation grid for the region and stage it.

use std::sync::Arc;

use async_trait::async_trait;
use ridgeline_core::download::{DownloadError, ProgressPatch};
use ridgeline_core::paths::Artifact;
use ridgeline_core::ports::{
    Bounds, DemEncoding, DemProgress, DemRequest, ElevationProviderPort, RegionPackagePort,
};
use ridgeline_core::region::PackageError;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::debug;

use super::{PhaseContext, PhaseHandler};

/// Key under which DEM metadata is merged into `region.json`.
pub const ELEVATION_KEY: &str = "elevation";

/// Fetches elevation for the staged region bounds.
///
/// Reads `bounds` from the staged `region.json`, asks the provider for a
/// grid, writes it to `elevation.dem` and records the grid metadata in
/// `region.json` under `"elevation"`.
pub struct DemPhaseHandler {
    provider: Arc<dyn ElevationProviderPort>,
    store: Arc<dyn RegionPackagePort>,
    encoding: DemEncoding,
    target_resolution_meters: Option<f64>,
}

impl DemPhaseHandler {
    pub fn new(provider: Arc<dyn ElevationProviderPort>, store: Arc<dyn RegionPackagePort>) -> Self {
        Self {
            provider,
            store,
            encoding: DemEncoding::default(),
            target_resolution_meters: None,
        }
    }

    #[must_use]
    pub const fn with_encoding(mut self, encoding: DemEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    #[must_use]
    pub const fn with_target_resolution(mut self, meters: f64) -> Self {
        self.target_resolution_meters = Some(meters);
        self
    }
}

#[async_trait]
impl PhaseHandler for DemPhaseHandler {
    async fn run(&self, ctx: &PhaseContext) -> Result<(), DownloadError> {
        let region_id = ctx.region_id();
        let region_file = Artifact::Region.file_name();

        self.store.ensure_temp_region_dir(region_id).await?;
        if ctx.should_stop()? {
            return Ok(());
        }

        let region = self
            .store
            .read_temp_json(region_id, region_file)
            .await?
            .ok_or_else(|| PackageError::MissingFile {
                name: region_file.to_string(),
            })?;
        let bounds = read_bounds(&region)?;

        let request = DemRequest {
            region_id: region_id.clone(),
            bounds,
            encoding: self.encoding,
            target_resolution_meters: self.target_resolution_meters,
        };
        ctx.report(ProgressPatch::message("Fetching elevation data"))
            .await;

        // Provider callbacks are synchronous; forward them so each report is
        // awaited on this task in order.
        let (tx, mut rx) = mpsc::unbounded_channel::<DemProgress>();
        let on_progress = move |progress: DemProgress| {
            let _ = tx.send(progress);
        };
        let fetch = self.provider.fetch_dem(&request, &on_progress);
        tokio::pin!(fetch);

        let result = loop {
            tokio::select! {
                biased;
                Some(progress) = rx.recv() => {
                    ctx.report(ProgressPatch::bytes(progress.downloaded, progress.total)).await;
                }
                result = &mut fetch => break result?,
            }
        };
        while let Ok(progress) = rx.try_recv() {
            ctx.report(ProgressPatch::bytes(progress.downloaded, progress.total))
                .await;
        }
        if ctx.should_stop()? {
            return Ok(());
        }

        let expected = result.metadata.expected_len();
        if result.data.len() != expected {
            return Err(DownloadError::other(format!(
                "elevation provider returned {} bytes for a {}x{} {} grid, expected {expected}",
                result.data.len(),
                result.metadata.width,
                result.metadata.height,
                result.metadata.encoding,
            )));
        }

        self.store
            .write_temp_file(region_id, Artifact::Dem.file_name(), &result.data)
            .await?;
        if ctx.should_stop()? {
            return Ok(());
        }

        let mut elevation = serde_json::to_value(&result.metadata)?;
        if let Value::Object(fields) = &mut elevation {
            fields.insert(
                "file".to_string(),
                Value::String(Artifact::Dem.file_name().to_string()),
            );
        }
        let mut updated = region;
        if let Value::Object(fields) = &mut updated {
            fields.insert(ELEVATION_KEY.to_string(), elevation);
        }
        self.store
            .write_temp_json(region_id, region_file, &updated)
            .await?;

        debug!(
            target: "ridgeline.download",
            job_id = %ctx.job_id(),
            region_id = %region_id,
            width = result.metadata.width,
            height = result.metadata.height,
            "Elevation data staged"
        );
        ctx.report(ProgressPatch::message("Elevation data stored"))
            .await;
        Ok(())
    }
}

/// Bounds from the `bounds` object of `region.json`.
fn read_bounds(region: &Value) -> Result<Bounds, PackageError> {
    let invalid = |message: String| PackageError::InvalidJson {
        name: Artifact::Region.file_name().to_string(),
        message,
    };

    let fields: &Map<String, Value> = region
        .as_object()
        .ok_or_else(|| invalid("expected a JSON object".to_string()))?;
    let raw = fields
        .get("bounds")
        .ok_or_else(|| invalid("missing bounds".to_string()))?;
    let bounds: Bounds =
        serde_json::from_value(raw.clone()).map_err(|e| invalid(format!("bounds: {e}")))?;
    if !bounds.is_valid() {
        return Err(invalid("bounds are outside WGS84 limits or inverted".to_string()));
    }
    Ok(bounds)
}
