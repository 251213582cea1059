use crate::aggregator::ChangeAggregator;
use crate::batcher::{chunk, LIST_QUERY_LIMIT};
use crate::filter::ChangeFilter;
use crate::traits::MetadataApi;
use crate::type_resolver::resolve_types;
use crate::types::{ChangeReport, ListQuery, Result, ScanOptions};
use chrono::Local;
use tracing::{debug, info, warn};

/// What a scan settled on before listing anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPlan {
    pub types: Vec<String>,
    pub author_filter: Option<String>,
    pub warnings: Vec<String>,
}

/// One point-in-time scan of an org for recent metadata changes.
pub struct ChangeScan<'a, A: MetadataApi + ?Sized> {
    api: &'a A,
    options: ScanOptions,
}

impl<'a, A: MetadataApi + ?Sized> ChangeScan<'a, A> {
    pub fn new(api: &'a A, options: ScanOptions) -> Self {
        Self { api, options }
    }

    /// Resolve types, list them batch by batch, filter, and write the manifest.
    ///
    /// Only a failed `all` type discovery or a failed manifest write aborts
    /// the scan. Identity and per-batch failures degrade instead.
    pub async fn run(&self) -> Result<ChangeReport> {
        let plan = self.prepare().await?;
        self.execute(plan).await
    }

    /// Resolve the type list and, when asked for, the current user.
    pub async fn prepare(&self) -> Result<ScanPlan> {
        let mut plan = ScanPlan {
            types: resolve_types(self.api, &self.options.types).await?,
            ..ScanPlan::default()
        };

        if self.options.mine {
            match resolve_current_user(self.api).await {
                Ok(name) => {
                    info!("Filtering for user: {}", name);
                    plan.author_filter = Some(name);
                }
                Err(e) => {
                    let message = format!("Could not determine current user: {}", e);
                    warn!("{}", message);
                    plan.warnings.push(message);
                }
            }
        }

        Ok(plan)
    }

    /// List and filter everything `plan` names, then write the manifest.
    pub async fn execute(&self, plan: ScanPlan) -> Result<ChangeReport> {
        let filter = ChangeFilter::new(self.options.days, self.options.mode)
            .with_author(plan.author_filter.clone());

        info!("Checking for metadata changes in the last {} days", self.options.days);
        let aggregator = self.collect(&plan.types, &filter).await;
        let (records, manifest) = aggregator.into_parts();

        let report = ChangeReport {
            manifest_path: manifest.write_to(&self.options.output_dir, &self.api.api_version())?,
            records,
            warnings: plan.warnings,
            author_filter: plan.author_filter,
        };

        info!("Found {} changed components", report.records.len());
        Ok(report)
    }

    /// List every batch of `types` in turn and keep what `filter` admits.
    ///
    /// A batch whose listing call fails contributes nothing.
    pub async fn collect(&self, types: &[String], filter: &ChangeFilter) -> ChangeAggregator {
        let mut aggregator = ChangeAggregator::new();

        for batch in chunk(types, LIST_QUERY_LIMIT) {
            let queries: Vec<ListQuery> = batch.iter().map(ListQuery::of_type).collect();

            match self.api.list_items(&queries).await {
                Ok(items) => {
                    let now = Local::now();
                    let kept = aggregator.absorb_batch(&items, filter, &now);
                    debug!("Batch [{}]: {} listed, {} kept", batch.join(", "), items.len(), kept);
                }
                Err(e) => {
                    debug!("Error listing metadata for {}: {}", batch.join(","), e);
                }
            }
        }

        aggregator
    }
}

/// Display name of the user the connection is authenticated as.
pub async fn resolve_current_user<A: MetadataApi + ?Sized>(api: &A) -> Result<String> {
    let identity = api.resolve_identity().await?;
    let record = api.query_display_name(&identity.user_id).await?;
    Ok(record.name)
}
