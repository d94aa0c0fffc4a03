//! Deterministic gradient elevation grid for tests and offline checks.

use async_trait::async_trait;
use ridgeline_core::download::DownloadError;
use ridgeline_core::ports::{
    DemEncoding, DemMetadata, DemProgress, DemRequest, DemResult, ElevationProviderPort,
};

const DEFAULT_SIZE: u32 = 64;
const LOW_METERS: f64 = 0.0;
const HIGH_METERS: f64 = 3_000.0;

/// Generates a diagonal ramp from 0 m at the south-west corner to 3000 m at
/// the north-east corner.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticElevationProvider {
    width: u32,
    height: u32,
}

impl SyntheticElevationProvider {
    /// Grid of `width` x `height` samples. Zero dimensions are raised to 1.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    fn sample(&self, row: u32, col: u32) -> f64 {
        let span = f64::from(self.width + self.height - 2);
        if span == 0.0 {
            return LOW_METERS;
        }
        let t = f64::from(row + col) / span;
        (HIGH_METERS - LOW_METERS).mul_add(t, LOW_METERS)
    }
}

impl Default for SyntheticElevationProvider {
    fn default() -> Self {
        Self::new(DEFAULT_SIZE, DEFAULT_SIZE)
    }
}

#[async_trait]
impl ElevationProviderPort for SyntheticElevationProvider {
    #[allow(clippy::cast_possible_truncation)]
    async fn fetch_dem(
        &self,
        request: &DemRequest,
        on_progress: &(dyn Fn(DemProgress) + Send + Sync),
    ) -> Result<DemResult, DownloadError> {
        let sample_len = request.encoding.bytes_per_sample();
        let row_len = self.width as usize * sample_len;
        let total = (row_len * self.height as usize) as u64;

        let mut data = Vec::with_capacity(row_len * self.height as usize);
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;

        on_progress(DemProgress {
            downloaded: 0,
            total: Some(total),
        });
        for row in 0..self.height {
            for col in 0..self.width {
                let value = self.sample(row, col);
                min = min.min(value);
                max = max.max(value);
                match request.encoding {
                    DemEncoding::Int16Le => {
                        data.extend_from_slice(&(value.round() as i16).to_le_bytes());
                    }
                    DemEncoding::Float32Le => {
                        data.extend_from_slice(&(value as f32).to_le_bytes());
                    }
                }
            }
            on_progress(DemProgress {
                downloaded: data.len() as u64,
                total: Some(total),
            });
            tokio::task::yield_now().await;
        }

        Ok(DemResult {
            metadata: DemMetadata {
                encoding: request.encoding,
                width: self.width,
                height: self.height,
                bounds: request.bounds,
                resolution_meters: request.target_resolution_meters,
                min_elevation: min,
                max_elevation: max,
            },
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridgeline_core::ports::Bounds;
    use ridgeline_core::region::RegionId;
    use std::sync::Mutex;

    fn request(encoding: DemEncoding) -> DemRequest {
        DemRequest {
            region_id: RegionId::new("r1").unwrap(),
            bounds: Bounds {
                min_lat: 0.0,
                min_lon: 0.0,
                max_lat: 1.0,
                max_lon: 1.0,
            },
            encoding,
            target_resolution_meters: Some(30.0),
        }
    }

    #[tokio::test]
    async fn int16_grid_is_a_diagonal_ramp() {
        let provider = SyntheticElevationProvider::new(3, 2);
        let result = provider
            .fetch_dem(&request(DemEncoding::Int16Le), &|_| {})
            .await
            .unwrap();

        assert_eq!(result.data.len(), result.metadata.expected_len());
        let samples: Vec<i16> = result
            .data
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(samples, [0, 1000, 2000, 1000, 2000, 3000]);
        assert!((result.metadata.max_elevation - 3000.0).abs() < f64::EPSILON);
        assert_eq!(result.metadata.resolution_meters, Some(30.0));
    }

    #[tokio::test]
    async fn float32_grid_reports_progress_per_row() {
        let provider = SyntheticElevationProvider::new(4, 3);
        let seen = Mutex::new(Vec::new());
        let result = provider
            .fetch_dem(&request(DemEncoding::Float32Le), &|p| {
                seen.lock().unwrap().push(p.downloaded);
            })
            .await
            .unwrap();

        assert_eq!(result.data.len(), 4 * 3 * 4);
        assert_eq!(*seen.lock().unwrap(), [0, 16, 32, 48]);
    }

    #[tokio::test]
    async fn single_sample_grid_is_flat() {
        let provider = SyntheticElevationProvider::new(0, 0);
        let result = provider
            .fetch_dem(&request(DemEncoding::Int16Le), &|_| {})
            .await
            .unwrap();
        assert_eq!(result.data, vec![0, 0]);
    }
}
