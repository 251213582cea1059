use crate::filter::{Ages, ChangeFilter};
use crate::manifest::ManifestIndex;
use crate::types::{ChangeRecord, ItemDescriptor};
use chrono::{DateTime, TimeZone};
use tracing::debug;

/// Sole owner of the result list and the manifest index during a scan.
#[derive(Debug, Default)]
pub struct ChangeAggregator {
    records: Vec<ChangeRecord>,
    manifest: ManifestIndex,
}

impl ChangeAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one qualifying item in both the result list and the manifest.
    pub fn absorb(&mut self, item: &ItemDescriptor, ages: Ages) {
        self.manifest.add(&item.type_name, &item.full_name);
        self.records.push(ChangeRecord {
            type_name: item.type_name.clone(),
            name: item.full_name.clone(),
            modification_age: ages.modification,
            creation_age: ages.creation,
            last_modified_date: item.last_modified_date.clone(),
            created_date: item.created_date.clone(),
            last_modified_by_name: item.last_modified_by_name.clone(),
            created_by_name: item.created_by_name.clone(),
        });
    }

    /// Run one batch of listed items through `filter`, keeping the ones that
    /// pass. Returns how many were kept.
    pub fn absorb_batch<Tz: TimeZone>(
        &mut self,
        items: &[ItemDescriptor],
        filter: &ChangeFilter,
        now: &DateTime<Tz>,
    ) -> usize {
        let mut kept = 0;
        for item in items {
            match filter.evaluate(item, now) {
                Ok(Some(ages)) => {
                    self.absorb(item, ages);
                    kept += 1;
                }
                Ok(None) => {}
                Err(e) => {
                    debug!("Skipping {} {}: {}", item.type_name, item.full_name, e);
                }
            }
        }
        kept
    }

    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn manifest(&self) -> &ManifestIndex {
        &self.manifest
    }

    pub fn into_parts(self) -> (Vec<ChangeRecord>, ManifestIndex) {
        (self.records, self.manifest)
    }
}
