//! Full pipeline against the real storage adapters in a temp directory.

use std::sync::Arc;

use ridgeline_core::download::{DownloadError, JobId, JobStatus, Phase};
use ridgeline_core::paths::{DOWNLOAD_STATE_FILE, RegionPaths};
use ridgeline_core::ports::{
    DownloadRequest, DownloadStateRepositoryPort, RegionDownloadPort, RegionPackagePort,
};
use ridgeline_core::region::{Manifest, RegionId};
use ridgeline_download::{
    DemPhaseHandler, DownloadManager, FinalisePhaseHandler, NoopPhaseHandler, PhaseContext,
    PhaseHandlers, RetryOptions, SyntheticElevationProvider, phase_fn,
};
use ridgeline_storage::{JsonDownloadStateRepository, RegionPackageStore};
use serde_json::{Value, json};
use tempfile::TempDir;

struct Harness {
    _dir: TempDir,
    paths: RegionPaths,
    store: Arc<RegionPackageStore>,
    repo: Arc<JsonDownloadStateRepository>,
}

impl Harness {
    async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let paths = RegionPaths::new(dir.path());
        let store = Arc::new(RegionPackageStore::new(paths.clone()));
        store.init().await.unwrap();
        let repo = Arc::new(JsonDownloadStateRepository::new(paths.clone()));
        Self {
            _dir: dir,
            paths,
            store,
            repo,
        }
    }

    fn port(&self) -> Arc<dyn RegionPackagePort> {
        Arc::clone(&self.store) as Arc<dyn RegionPackagePort>
    }

    fn manager(&self, handlers: PhaseHandlers) -> DownloadManager {
        DownloadManager::new(
            handlers,
            Arc::clone(&self.repo) as Arc<dyn DownloadStateRepositoryPort>,
            RetryOptions {
                jitter: false,
                ..RetryOptions::default()
            },
        )
    }
}

/// Estimating writes `region.json`; tiles writes the remaining required files.
fn staging_handlers(store: &Arc<dyn RegionPackagePort>) -> PhaseHandlers {
    let estimating = {
        let store = Arc::clone(store);
        phase_fn(move |ctx: PhaseContext| {
            let store = Arc::clone(&store);
            async move {
                let region = json!({
                    "id": ctx.region_id().as_str(),
                    "name": "Test Valley",
                    "bounds": {"minLat": 46.0, "minLon": 7.0, "maxLat": 46.5, "maxLon": 7.5},
                });
                store
                    .write_temp_json(ctx.region_id(), "region.json", &region)
                    .await?;
                Ok::<(), DownloadError>(())
            }
        })
    };
    let tiles = {
        let store = Arc::clone(store);
        phase_fn(move |ctx: PhaseContext| {
            let store = Arc::clone(&store);
            async move {
                let id = ctx.region_id();
                store
                    .write_temp_file(id, "tiles.mbtiles", b"SQLite format 3\0")
                    .await?;
                for name in ["water.json", "cities.json", "roads.json"] {
                    store
                        .write_temp_json(id, name, &json!({"type": "FeatureCollection", "features": []}))
                        .await?;
                }
                Ok::<(), DownloadError>(())
            }
        })
    };

    PhaseHandlers::noop()
        .with(Phase::Estimating, estimating)
        .with(Phase::Tiles, tiles)
        .with(
            Phase::Dem,
            DemPhaseHandler::new(
                Arc::new(SyntheticElevationProvider::new(8, 4)),
                Arc::clone(store),
            ),
        )
        .with(Phase::Finalise, FinalisePhaseHandler::new(Arc::clone(store)))
}

#[tokio::test]
async fn completed_job_installs_a_validated_package() {
    let h = Harness::new().await;
    let id = RegionId::new("test-valley").unwrap();
    let job = JobId::new("job-1");
    let manager = h.manager(staging_handlers(&h.port()));

    manager
        .start(DownloadRequest::new(job.clone(), id.clone()))
        .await
        .unwrap();
    assert_eq!(manager.wait_settled(&job).await, Some(JobStatus::Completed));

    let final_dir = h.paths.region_dir(&id).unwrap();
    assert!(final_dir.join("elevation.dem").is_file());
    assert!(!final_dir.join(DOWNLOAD_STATE_FILE).exists());

    let manifest: Value =
        serde_json::from_slice(&std::fs::read(final_dir.join("manifest.json")).unwrap()).unwrap();
    let manifest = Manifest::from_value(&manifest).unwrap();
    assert_eq!(manifest.region_id, id.as_str());
    let names: Vec<&str> = manifest.files.iter().map(|f| f.name.as_str()).collect();
    assert!(names.contains(&"elevation.dem"));
    assert!(names.contains(&"tiles.mbtiles"));
    assert!(!names.contains(&DOWNLOAD_STATE_FILE));

    let region: Value =
        serde_json::from_slice(&std::fs::read(final_dir.join("region.json")).unwrap()).unwrap();
    assert_eq!(region["elevation"]["width"], 8);
    assert_eq!(region["elevation"]["file"], "elevation.dem");

    // The completed record stays behind so a restarted resume is a no-op.
    let persisted = h.repo.load(&job, &id).await.unwrap().unwrap();
    assert_eq!(persisted.status, JobStatus::Completed);

    assert_eq!(h.store.list_regions().await.unwrap(), vec![id]);
}

#[tokio::test]
async fn invalid_package_fails_in_finalise_and_keeps_staging() {
    let h = Harness::new().await;
    let id = RegionId::new("half-done").unwrap();
    let job = JobId::new("job-2");

    // Tiles never runs, so the required files are missing.
    let handlers = staging_handlers(&h.port()).with(Phase::Tiles, NoopPhaseHandler);
    let manager = h.manager(handlers);

    manager
        .start(DownloadRequest::new(job.clone(), id.clone()))
        .await
        .unwrap();
    assert_eq!(manager.wait_settled(&job).await, Some(JobStatus::Error));

    let error = manager.snapshot(&job).await.unwrap().error.unwrap();
    assert_eq!(error.phase, Phase::Finalise);
    assert!(error.message.contains("tiles.mbtiles"), "{}", error.message);

    assert!(!h.paths.region_dir(&id).unwrap().exists());
    assert!(h.paths.tmp_region_dir(&id).unwrap().join("region.json").is_file());

    let persisted = h.repo.load(&job, &id).await.unwrap().unwrap();
    assert_eq!(persisted.status, JobStatus::Error);
    assert_eq!(persisted.phase_index, Phase::Finalise.index());
}

#[tokio::test]
async fn state_survives_a_new_manager_instance() {
    let h = Harness::new().await;
    let id = RegionId::new("restart").unwrap();
    let job = JobId::new("job-3");

    let first = h.manager(staging_handlers(&h.port()).with(
        Phase::Overlays,
        phase_fn(|_ctx: PhaseContext| async {
            Err::<(), _>(DownloadError::other("overlay host down"))
        }),
    ));
    first
        .start(DownloadRequest::new(job.clone(), id.clone()))
        .await
        .unwrap();
    assert_eq!(first.wait_settled(&job).await, Some(JobStatus::Error));
    drop(first);

    let second = h.manager(staging_handlers(&h.port()));
    second.resume(&job, &id).await.unwrap();
    assert_eq!(second.wait_settled(&job).await, Some(JobStatus::Completed));
    assert!(h.paths.region_dir(&id).unwrap().join("manifest.json").is_file());
}
