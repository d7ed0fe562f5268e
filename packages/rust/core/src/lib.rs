//! End-to-end reference collection: extraction, resolution, dataset.

mod dataset;
mod pipeline;

pub use dataset::{
    DATASET_JS_NAME, DATASET_JSON_NAME, DatasetPaths, HISTORY_DIR_NAME, load_dataset,
    write_dataset,
};
pub use pipeline::{CollectConfig, CollectResult, collect};
