use serde::{Deserialize, Serialize};

/// One concrete component as reported by a metadata listing call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDescriptor {
    #[serde(rename = "type")]
    pub type_name: String,
    pub full_name: String,
    pub last_modified_date: String,
    pub created_date: String,
    pub last_modified_by_name: String,
    pub created_by_name: String,
}

/// One entry of the org's metadata catalog.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataTypeInfo {
    pub xml_name: String,
    pub directory_name: Option<String>,
    pub suffix: Option<String>,
    pub in_folder: bool,
    pub meta_file: bool,
    pub child_xml_names: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "type")]
    pub type_name: String,
    pub folder: Option<String>,
}

impl ListQuery {
    pub fn of_type(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            folder: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_id: String,
    pub organization_id: Option<String>,
    pub username: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "Id")]
    pub id: Option<String>,
    #[serde(rename = "Name")]
    pub name: String,
}

// Object style note:
// These are the shapes exchanged with the remote org. The API client builds
// them from wire responses and the change scan only ever reads them.
