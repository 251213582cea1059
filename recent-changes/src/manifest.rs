use crate::types::Result;
use quick_xml::escape::escape;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const MANIFEST_FILE_NAME: &str = "new.xml";
pub const METADATA_NAMESPACE: &str = "http://soap.sforce.com/2006/04/metadata";

/// Type name to member names, in the order they were discovered.
///
/// Members are not deduplicated; ordering is only imposed when rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestIndex {
    entries: HashMap<String, Vec<String>>,
}

impl ManifestIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, type_name: &str, member: &str) {
        self.entries
            .entry(type_name.to_string())
            .or_default()
            .push(member.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct types
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn members(&self, type_name: &str) -> Option<&[String]> {
        self.entries.get(type_name).map(|m| m.as_slice())
    }

    pub fn contains(&self, type_name: &str, member: &str) -> bool {
        self.members(type_name)
            .map(|members| members.iter().any(|m| m == member))
            .unwrap_or(false)
    }

    /// Type names in ascending order
    pub fn sorted_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.entries.keys().map(|t| t.as_str()).collect();
        types.sort_unstable_by(|a, b| utf16_order(a, b));
        types
    }

    /// Render the package descriptor. Types and members are sorted, so the
    /// output only depends on the index contents.
    pub fn render(&self, api_version: &str) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str(&format!("<Package xmlns=\"{}\">\n", METADATA_NAMESPACE));

        for type_name in self.sorted_types() {
            let mut members: Vec<&str> = self.entries[type_name].iter().map(|m| m.as_str()).collect();
            members.sort_unstable_by(|a, b| utf16_order(a, b));

            xml.push_str("    <types>\n");
            for member in members {
                xml.push_str(&format!("        <members>{}</members>\n", escape(member)));
            }
            xml.push_str(&format!("        <name>{}</name>\n", escape(type_name)));
            xml.push_str("    </types>\n");
        }

        xml.push_str(&format!("    <version>{}</version>\n", escape(api_version)));
        xml.push_str("</Package>\n");
        xml
    }

    /// Write `new.xml` under `output_dir`, creating the directory if needed.
    ///
    /// An empty index writes nothing and leaves any existing file alone.
    pub fn write_to(&self, output_dir: &Path, api_version: &str) -> Result<Option<PathBuf>> {
        if self.is_empty() {
            debug!("Manifest index is empty, skipping {}", MANIFEST_FILE_NAME);
            return Ok(None);
        }

        fs::create_dir_all(output_dir)?;
        let path = output_dir.join(MANIFEST_FILE_NAME);
        fs::write(&path, self.render(api_version))?;

        info!("Wrote manifest with {} types to {}", self.len(), path.display());
        Ok(Some(path))
    }
}

/// Orders names by UTF-16 code units, the order package tooling sorts in.
/// Differs from byte order only for characters above U+FFFF.
pub fn utf16_order(a: &str, b: &str) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}
