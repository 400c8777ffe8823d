pub mod csv_loader;
pub mod json_loader;

pub use csv_loader::{FsNeo4jCsvLoader, FsNeo4jCsvLoaderConfig};
pub use json_loader::{FileMode, FsElasticsearchJsonLoader, FsElasticsearchJsonLoaderConfig};
