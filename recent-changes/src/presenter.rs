use crate::types::{ChangeMode, ChangeRecord};
use comfy_table::{presets, Cell, ContentArrangement, Table};
use std::collections::BTreeMap;

pub const REPORT_HEADING: &str = "=== Recently Modified Metadata ===";
pub const NO_CHANGES_NOTICE: &str = "No metadata changes found in the specified period.";

/// Group records by type (types in alphabetical order), each group sorted by
/// the mode's age. The sort is stable, so equal ages keep discovery order.
pub fn group_by_type(records: &[ChangeRecord], mode: ChangeMode) -> BTreeMap<&str, Vec<&ChangeRecord>> {
    let mut groups: BTreeMap<&str, Vec<&ChangeRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.type_name.as_str()).or_default().push(record);
    }
    for group in groups.values_mut() {
        group.sort_by_key(|record| record.effective_age(mode));
    }
    groups
}

pub fn column_headers(mode: ChangeMode) -> [&'static str; 4] {
    match mode {
        ChangeMode::Created => ["Name", "Cr. Age", "Cr. Date", "Cr. By"],
        ChangeMode::Modified => ["Name", "Mod. Age", "Mod. Date", "Mod. By"],
    }
}

/// One table for one type group.
pub fn build_table(records: &[&ChangeRecord], mode: ChangeMode) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(column_headers(mode).to_vec());

    for record in records {
        table.add_row(vec![
            Cell::new(&record.name),
            Cell::new(record.effective_age(mode).map(|age| age.to_string()).unwrap_or_default()),
            Cell::new(record.effective_date(mode)),
            Cell::new(record.effective_author(mode)),
        ]);
    }
    table
}

/// Full console report: a heading and one titled table per type, or the
/// "no changes" notice alone when there is nothing to show.
pub fn render_report(records: &[ChangeRecord], mode: ChangeMode) -> String {
    if records.is_empty() {
        return NO_CHANGES_NOTICE.to_string();
    }

    let mut out = String::new();
    out.push_str(REPORT_HEADING);
    out.push('\n');

    for (type_name, group) in group_by_type(records, mode) {
        out.push_str(&format!("\n--- {} ---\n", type_name));
        out.push_str(&build_table(&group, mode).to_string());
        out.push('\n');
    }
    out
}
