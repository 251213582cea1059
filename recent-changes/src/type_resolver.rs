use crate::traits::MetadataApi;
use crate::types::{ChangesError, Result};
use tracing::{debug, info};

/// Types checked when the caller does not name any.
pub const DEFAULT_METADATA_TYPES: [&str; 15] = [
    "ApexClass",
    "ApexTrigger",
    "AuraDefinitionBundle",
    "CustomField",
    "CustomObject",
    "CustomTab",
    "FlexiPage",
    "Flow",
    "GlobalValueSet",
    "Layout",
    "LightningComponentBundle",
    "ListView",
    "QuickAction",
    "RecordType",
    "ValidationRule",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSelection {
    Default,
    All,
    Explicit(Vec<String>),
}

impl TypeSelection {
    /// The mode is chosen on the raw argument; only list segments are trimmed.
    pub fn parse(spec: &str) -> Self {
        if spec.is_empty() {
            TypeSelection::Default
        } else if spec.eq_ignore_ascii_case("all") {
            TypeSelection::All
        } else {
            let types = spec
                .split(',')
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .map(|t| t.to_string())
                .collect();
            TypeSelection::Explicit(types)
        }
    }
}

/// Turn a `--types` argument into the concrete list of types to scan.
///
/// Only the `all` form talks to the org, and its failure is fatal.
pub async fn resolve_types<A: MetadataApi + ?Sized>(api: &A, spec: &str) -> Result<Vec<String>> {
    match TypeSelection::parse(spec) {
        TypeSelection::Default => {
            debug!("Using {} default metadata types", DEFAULT_METADATA_TYPES.len());
            Ok(DEFAULT_METADATA_TYPES.iter().map(|t| t.to_string()).collect())
        }
        TypeSelection::All => {
            info!("Fetching all metadata types from org");
            let described = api
                .describe_types()
                .await
                .map_err(|e| ChangesError::TypeDiscovery(e.to_string()))?;
            let types: Vec<String> = described.into_iter().map(|t| t.xml_name).collect();
            info!("Found {} types", types.len());
            Ok(types)
        }
        TypeSelection::Explicit(types) => Ok(types),
    }
}
