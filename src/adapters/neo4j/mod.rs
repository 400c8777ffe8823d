pub mod client;
pub mod csv_publisher;
pub mod search_extractor;

pub use client::{CypherRunner, Neo4jClient, Neo4jConnection, Statement};
pub use csv_publisher::{Neo4jCsvPublisher, Neo4jCsvPublisherConfig};
pub use search_extractor::{Neo4jSearchDataExtractor, Neo4jSearchDataExtractorConfig};
