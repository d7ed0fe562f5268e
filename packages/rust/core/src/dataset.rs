//! Dataset serialization.
//!
//! One collection run produces three artifacts under the output
//! directory: the snapshot (`xrefs-data.json`), a script-assignment
//! variant consumable by rendered pages (`xrefs-data.js`), and a
//! timestamped history copy under `xrefs-history/` that is never
//! mutated or pruned afterwards.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info};

use termweave_shared::{Result, TermweaveError, XrefDataset};

/// Snapshot file name.
pub const DATASET_JSON_NAME: &str = "xrefs-data.json";

/// Script-assignment variant file name.
pub const DATASET_JS_NAME: &str = "xrefs-data.js";

/// Per-run history subdirectory.
pub const HISTORY_DIR_NAME: &str = "xrefs-history";

/// Paths of the files one `write_dataset` call produced.
#[derive(Debug)]
pub struct DatasetPaths {
    pub json: PathBuf,
    pub js: PathBuf,
    pub history: PathBuf,
}

/// Serialize the dataset to all three output files.
///
/// The output directory and its history subdirectory are created when
/// missing. Snapshot and script variant are whole-file overwrites; the
/// history file is new per run.
pub fn write_dataset(output_dir: &Path, dataset: &XrefDataset) -> Result<DatasetPaths> {
    let history_dir = output_dir.join(HISTORY_DIR_NAME);
    std::fs::create_dir_all(&history_dir).map_err(|e| TermweaveError::io(&history_dir, e))?;

    let json = serde_json::to_string_pretty(dataset)
        .map_err(|e| TermweaveError::parse(format!("dataset serialization: {e}")))?;
    let js = format!("const allXrefs = {json};\n");

    let json_path = output_dir.join(DATASET_JSON_NAME);
    std::fs::write(&json_path, &json).map_err(|e| TermweaveError::io(&json_path, e))?;

    let js_path = output_dir.join(DATASET_JS_NAME);
    std::fs::write(&js_path, &js).map_err(|e| TermweaveError::io(&js_path, e))?;

    let history_path =
        history_dir.join(format!("xrefs-data-{}.js", Utc::now().timestamp_millis()));
    std::fs::write(&history_path, &js).map_err(|e| TermweaveError::io(&history_path, e))?;
    debug!(path = %history_path.display(), "wrote history file");

    info!(
        count = dataset.xrefs.len(),
        path = %json_path.display(),
        "wrote reference dataset"
    );

    Ok(DatasetPaths {
        json: json_path,
        js: js_path,
        history: history_path,
    })
}

/// Read a previously written snapshot back.
pub fn load_dataset(output_dir: &Path) -> Result<XrefDataset> {
    let path = output_dir.join(DATASET_JSON_NAME);
    let content = std::fs::read_to_string(&path).map_err(|e| TermweaveError::io(&path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| TermweaveError::parse(format!("{}: {e}", path.display())))
}
