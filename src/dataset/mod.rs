//! Dataset provider.

pub mod loader;

pub use loader::{coordinate_conflicts, load_dataset, Dataset, DatasetSource, LoadOptions};
