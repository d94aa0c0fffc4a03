//! Main commands enum.
//!
//! This module defines the available commands for the CLI tool.

use clap::Subcommand;
use ridgeline_core::ports::DemEncoding;
use ridgeline_core::region::RegionId;

/// Available commands.
///
/// Region ids are validated while parsing, so handlers only ever see ids
/// that are safe to join onto the data directory.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Show resolved paths for the data directory layout
    Paths,

    /// Show the persisted state of a download job
    Status {
        /// Job id the download was started with
        job_id: String,
        /// Region the job downloads
        region_id: RegionId,
    },

    /// Validate a staged region package without installing it
    Validate {
        /// Region to validate
        region_id: RegionId,
    },

    /// Validate a staged region package and install it
    Finalise {
        /// Region to install
        region_id: RegionId,
    },

    /// Delete an installed region package
    Delete {
        /// Region to delete
        region_id: RegionId,
        /// Delete the staging directory instead of the installed package
        #[arg(long)]
        temp: bool,
    },

    /// Show the on-disk size of a region
    Size {
        /// Region to measure
        region_id: RegionId,
    },

    /// List installed regions
    Regions,

    /// Restore or remove backups left by interrupted installs
    Reconcile,

    /// Remove the persisted state of a download job
    Forget {
        /// Job id the download was started with
        job_id: String,
        /// Region the job downloads
        region_id: RegionId,
    },

    /// Stage a synthetic elevation model for a region
    ///
    /// Runs the pipeline with the DEM phase only; every other phase is a
    /// no-op. Useful to check the staging path without network access.
    Dem {
        /// Region to stage elevation data for
        region_id: RegionId,
        /// Job id to run under (defaults to `dem-<region>`)
        #[arg(long)]
        job_id: Option<String>,
        /// Bounds as `minLat,minLon,maxLat,maxLon`; writes `region.json` if missing
        #[arg(long, allow_hyphen_values = true)]
        bounds: Option<String>,
        /// Grid width in samples
        #[arg(long, default_value_t = 64)]
        width: u32,
        /// Grid height in samples
        #[arg(long, default_value_t = 64)]
        height: u32,
        /// Sample encoding: int16 or float32
        #[arg(long, default_value = "int16")]
        encoding: DemEncoding,
        /// Target ground resolution in meters, recorded in `region.json`
        #[arg(long)]
        resolution: Option<f64>,
    },
}

#[cfg(test)]
mod tests {
    use crate::parser::Cli;
    use clap::Parser;

    use super::*;

    #[test]
    fn test_region_ids_are_validated_while_parsing() {
        let err = Cli::try_parse_from(["ridgeline", "validate", "../etc"]).unwrap_err();
        assert!(err.to_string().contains("region id"), "{err}");
    }

    #[test]
    fn test_dem_defaults() {
        let cli = Cli::parse_from(["ridgeline", "dem", "alps"]);
        let Some(Commands::Dem {
            region_id,
            job_id,
            bounds,
            width,
            height,
            encoding,
            resolution,
        }) = cli.command
        else {
            panic!("expected dem command");
        };
        assert_eq!(region_id.as_str(), "alps");
        assert!(job_id.is_none());
        assert!(bounds.is_none());
        assert_eq!((width, height), (64, 64));
        assert_eq!(encoding, DemEncoding::Int16Le);
        assert!(resolution.is_none());
    }

    #[test]
    fn test_dem_resolution_flag() {
        let cli = Cli::parse_from(["ridgeline", "dem", "alps", "--resolution", "30"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Dem { resolution: Some(r), .. }) if (r - 30.0).abs() < f64::EPSILON
        ));
    }

    #[test]
    fn test_delete_temp_flag() {
        let cli = Cli::parse_from(["ridgeline", "delete", "alps", "--temp"]);
        assert!(matches!(cli.command, Some(Commands::Delete { temp: true, .. })));
    }
}
