//! Paths command handler.
//!
//! Displays the resolved data layout for diagnostics.

use ridgeline_core::paths::RegionPaths;

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Execute the paths command.
pub fn execute(ctx: &CliContext) -> Result<(), CliError> {
    print!("{}", format_paths(&ctx.paths));
    Ok(())
}

fn format_paths(paths: &RegionPaths) -> String {
    format!(
        "data_dir    = {}\nregions_dir = {}\ntmp_dir     = {}\n",
        paths.base_dir().display(),
        paths.regions_dir().display(),
        paths.tmp_dir().display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_listed_one_per_line() {
        let text = format_paths(&RegionPaths::new("/srv/maps"));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "data_dir    = /srv/maps",
                "regions_dir = /srv/maps/regions",
                "tmp_dir     = /srv/maps/tmp",
            ]
        );
    }
}
