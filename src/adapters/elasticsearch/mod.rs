pub mod client;
pub mod index_map;
pub mod publisher;

pub use client::ElasticsearchClient;
pub use publisher::{ElasticsearchPublisher, ElasticsearchPublisherConfig};
