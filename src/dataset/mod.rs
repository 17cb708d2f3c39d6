pub mod fetcher;
pub mod table;

pub use fetcher::{DatasetFetcher, DEFAULT_DATASET_URL};
pub use table::Table;
