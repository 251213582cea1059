pub mod types;
pub mod traits;
pub mod batcher;
pub mod type_resolver;
pub mod age;
pub mod filter;
pub mod aggregator;
pub mod manifest;
pub mod presenter;
pub mod pipeline;
pub mod soap;
pub mod client;

pub use types::*;
pub use traits::MetadataApi;
pub use aggregator::ChangeAggregator;
pub use client::SalesforceClient;
pub use filter::{Ages, ChangeFilter};
pub use manifest::ManifestIndex;
pub use pipeline::{resolve_current_user, ChangeScan, ScanPlan};
pub use type_resolver::{resolve_types, TypeSelection, DEFAULT_METADATA_TYPES};
