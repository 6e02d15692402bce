//! JSON output for scraped tables.
//!
//! # Output Structure
//!
//! A single pretty-printed array, one object per cell:
//! ```text
//! [
//!   { "row": 1, "anchors": ["/techniques/T1595"], "text": "T1595" },
//!   ...
//! ]
//! ```

use crate::models::TableCell;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `cells` to `path`, creating parent directories as needed.
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = cells.len()))]
pub async fn write_cells(cells: &[TableCell], path: &Path) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(cells)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent).await {
            error!(dir = %parent.display(), error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }

    fs::write(path, json).await?;
    info!("Wrote JSON file");
    Ok(())
}
