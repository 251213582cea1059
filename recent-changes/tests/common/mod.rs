#![allow(dead_code)]

// Shared fixtures for the change scan tests
pub use recent_changes::types::*;
pub use recent_changes::MetadataApi;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::{Mutex, Once};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Timestamp `days` and a half ago, in the API's format. The extra half day
/// keeps the whole-day age stable regardless of the local time zone.
pub fn days_ago(days: i64) -> String {
    let instant = Utc::now() - Duration::days(days) - Duration::hours(12);
    instant.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

pub fn item(type_name: &str, name: &str, modified_days_ago: i64, modified_by: &str) -> ItemDescriptor {
    ItemDescriptor {
        type_name: type_name.to_string(),
        full_name: name.to_string(),
        last_modified_date: days_ago(modified_days_ago),
        created_date: days_ago(modified_days_ago + 100),
        last_modified_by_name: modified_by.to_string(),
        created_by_name: "Admin User".to_string(),
    }
}

pub fn created_item(type_name: &str, name: &str, created_days_ago: i64, created_by: &str) -> ItemDescriptor {
    ItemDescriptor {
        type_name: type_name.to_string(),
        full_name: name.to_string(),
        last_modified_date: days_ago(1),
        created_date: days_ago(created_days_ago),
        last_modified_by_name: "Admin User".to_string(),
        created_by_name: created_by.to_string(),
    }
}

pub fn options_in(dir: &std::path::Path) -> ScanOptions {
    ScanOptions {
        output_dir: dir.join("output"),
        ..ScanOptions::default()
    }
}

/// In-memory org. Listing returns the configured items whose type was
/// queried; any batch naming a type in `failing_types` fails as a whole.
#[derive(Default)]
pub struct FakeOrg {
    pub items: Vec<ItemDescriptor>,
    pub described_types: Vec<String>,
    pub describe_fails: bool,
    pub failing_types: Vec<String>,
    pub current_user: Option<(String, String)>,
    pub calls: Mutex<Vec<Vec<String>>>,
}

impl FakeOrg {
    pub fn with_items(items: Vec<ItemDescriptor>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn listed_batches(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataApi for FakeOrg {
    async fn describe_types(&self) -> Result<Vec<MetadataTypeInfo>> {
        if self.describe_fails {
            return Err(ChangesError::Api {
                status: 500,
                message: "describe unavailable".to_string(),
            });
        }
        Ok(self
            .described_types
            .iter()
            .map(|t| MetadataTypeInfo {
                xml_name: t.clone(),
                ..MetadataTypeInfo::default()
            })
            .collect())
    }

    async fn list_items(&self, queries: &[ListQuery]) -> Result<Vec<ItemDescriptor>> {
        let types: Vec<String> = queries.iter().map(|q| q.type_name.clone()).collect();
        self.calls.lock().unwrap().push(types.clone());

        if let Some(bad) = types.iter().find(|t| self.failing_types.contains(t)) {
            return Err(ChangesError::Soap {
                code: "sf:INVALID_TYPE".to_string(),
                message: format!("INVALID_TYPE: Unknown type name '{}' specified", bad),
            });
        }

        Ok(self
            .items
            .iter()
            .filter(|i| types.contains(&i.type_name))
            .cloned()
            .collect())
    }

    async fn resolve_identity(&self) -> Result<UserIdentity> {
        match &self.current_user {
            Some((id, _)) => Ok(UserIdentity {
                user_id: id.clone(),
                organization_id: None,
                username: None,
            }),
            None => Err(ChangesError::Api {
                status: 401,
                message: "Session expired or invalid".to_string(),
            }),
        }
    }

    async fn query_display_name(&self, user_id: &str) -> Result<UserRecord> {
        match &self.current_user {
            Some((id, name)) if id == user_id => Ok(UserRecord {
                id: Some(id.clone()),
                name: name.clone(),
            }),
            _ => Err(ChangesError::Api {
                status: 404,
                message: "The requested resource does not exist".to_string(),
            }),
        }
    }

    fn api_version(&self) -> String {
        "60.0".to_string()
    }
}
