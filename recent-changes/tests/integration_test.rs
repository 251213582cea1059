mod common;

use common::*;
use recent_changes::presenter::{render_report, NO_CHANGES_NOTICE};
use recent_changes::{ChangeFilter, ChangeScan, DEFAULT_METADATA_TYPES};
use std::fs;
use tracing::info;

fn scenario_a_org() -> FakeOrg {
    FakeOrg::with_items(vec![
        item("ApexClass", "Foo", 5, "Jane Doe"),
        item("ApexClass", "Bar", 20, "Jane Doe"),
    ])
}

#[tokio::test]
async fn test_recent_modification_is_reported_and_manifested() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let org = scenario_a_org();

    let report = ChangeScan::new(&org, options_in(dir.path())).run().await?;

    let names: Vec<&str> = report.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Foo"]);
    assert_eq!(report.records[0].modification_age, Some(5));
    assert!(report.warnings.is_empty());

    let path = report.manifest_path.expect("manifest should be written");
    assert_eq!(path, dir.path().join("output").join("new.xml"));
    let xml = fs::read_to_string(&path)?;
    assert_eq!(xml.matches("<types>").count(), 1);
    assert!(xml.contains("        <members>Foo</members>\n        <name>ApexClass</name>\n"));
    assert!(!xml.contains("Bar"));
    assert!(xml.contains("<version>60.0</version>"));

    info!("Scenario A report: {:?}", report.records);
    Ok(())
}

#[tokio::test]
async fn test_failed_type_discovery_aborts_without_manifest() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let mut org = scenario_a_org();
    org.describe_fails = true;

    let options = ScanOptions {
        types: "ALL".to_string(),
        ..options_in(dir.path())
    };
    let outcome = ChangeScan::new(&org, options).run().await;

    match outcome {
        Err(ChangesError::TypeDiscovery(message)) => assert!(message.contains("describe unavailable")),
        other => panic!("expected a type discovery failure, got {:?}", other),
    }
    assert!(org.listed_batches().is_empty());
    assert!(!dir.path().join("output").exists());
    Ok(())
}

#[tokio::test]
async fn test_identity_failure_degrades_to_unfiltered_scan() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let org = scenario_a_org();

    let options = ScanOptions {
        mine: true,
        ..options_in(dir.path())
    };
    let report = ChangeScan::new(&org, options).run().await?;

    assert_eq!(report.author_filter, None);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].starts_with("Could not determine current user:"));

    let baseline_dir = tempfile::tempdir()?;
    let baseline = ChangeScan::new(&org, options_in(baseline_dir.path())).run().await?;
    assert_eq!(report.records, baseline.records);
    Ok(())
}

#[tokio::test]
async fn test_mine_keeps_only_current_users_changes() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let mut org = FakeOrg::with_items(vec![
        item("ApexClass", "Mine", 2, "Jane Doe"),
        item("ApexClass", "Theirs", 2, "Bob Smith"),
        item("ApexClass", "Lowercase", 2, "jane doe"),
    ]);
    org.current_user = Some(("005000000000001AAA".to_string(), "Jane Doe".to_string()));

    let options = ScanOptions {
        mine: true,
        ..options_in(dir.path())
    };
    let report = ChangeScan::new(&org, options).run().await?;

    assert_eq!(report.author_filter.as_deref(), Some("Jane Doe"));
    let names: Vec<&str> = report.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Mine"]);
    Ok(())
}

#[tokio::test]
async fn test_current_user_is_known_before_listing() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let mut org = FakeOrg::with_items(vec![
        item("ApexClass", "Mine", 2, "Jane Doe"),
        item("ApexClass", "Theirs", 2, "Bob Smith"),
    ]);
    org.current_user = Some(("005000000000001AAA".to_string(), "Jane Doe".to_string()));

    let scan = ChangeScan::new(
        &org,
        ScanOptions {
            mine: true,
            ..options_in(dir.path())
        },
    );
    let plan = scan.prepare().await?;

    assert_eq!(plan.author_filter.as_deref(), Some("Jane Doe"));
    assert_eq!(plan.types.len(), DEFAULT_METADATA_TYPES.len());
    assert!(org.listed_batches().is_empty());

    let report = scan.execute(plan).await?;
    assert_eq!(report.author_filter.as_deref(), Some("Jane Doe"));
    assert_eq!(org.listed_batches().len(), 5);
    let names: Vec<&str> = report.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Mine"]);
    Ok(())
}

#[tokio::test]
async fn test_identity_warning_is_known_before_listing() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let org = scenario_a_org();

    let scan = ChangeScan::new(
        &org,
        ScanOptions {
            mine: true,
            ..options_in(dir.path())
        },
    );
    let plan = scan.prepare().await?;

    assert_eq!(plan.author_filter, None);
    assert_eq!(plan.warnings.len(), 1);
    assert!(org.listed_batches().is_empty());

    let report = scan.execute(plan).await?;
    assert_eq!(report.warnings.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_empty_result_leaves_existing_manifest_untouched() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let output_dir = dir.path().join("output");
    fs::create_dir_all(&output_dir)?;
    let existing = output_dir.join("new.xml");
    fs::write(&existing, "previous run")?;

    let org = FakeOrg::with_items(vec![item("ApexClass", "Old", 40, "Jane Doe")]);
    let report = ChangeScan::new(&org, options_in(dir.path())).run().await?;

    assert!(report.records.is_empty());
    assert_eq!(report.manifest_path, None);
    assert_eq!(fs::read_to_string(&existing)?, "previous run");
    assert_eq!(render_report(&report.records, ChangeMode::Modified), NO_CHANGES_NOTICE);
    Ok(())
}

#[tokio::test]
async fn test_empty_result_creates_no_output_directory() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let org = FakeOrg::default();

    let report = ChangeScan::new(&org, options_in(dir.path())).run().await?;

    assert!(report.records.is_empty());
    assert!(!dir.path().join("output").exists());
    Ok(())
}

#[tokio::test]
async fn test_failed_batch_contributes_nothing() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let mut org = FakeOrg::with_items(vec![
        item("ApexClass", "InFailedBatch", 1, "Jane Doe"),
        item("CustomObject", "Invoice__c", 1, "Jane Doe"),
    ]);
    org.failing_types = vec!["NotAType".to_string()];

    let options = ScanOptions {
        types: "ApexClass, NotAType ,Flow,CustomObject".to_string(),
        ..options_in(dir.path())
    };
    let report = ChangeScan::new(&org, options).run().await?;

    assert_eq!(
        org.listed_batches(),
        vec![
            vec!["ApexClass".to_string(), "NotAType".to_string(), "Flow".to_string()],
            vec!["CustomObject".to_string()],
        ]
    );
    let names: Vec<&str> = report.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Invoice__c"]);
    assert!(report.warnings.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_default_types_are_listed_in_batches_of_three() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let org = FakeOrg::default();

    ChangeScan::new(&org, options_in(dir.path())).run().await?;

    let batches = org.listed_batches();
    assert_eq!(batches.len(), 5);
    assert!(batches.iter().all(|b| b.len() == 3));
    let flattened: Vec<String> = batches.into_iter().flatten().collect();
    let expected: Vec<String> = DEFAULT_METADATA_TYPES.iter().map(|t| t.to_string()).collect();
    assert_eq!(flattened, expected);
    Ok(())
}

#[tokio::test]
async fn test_all_types_come_from_describe() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let mut org = FakeOrg::with_items(vec![item("Workflow", "Case", 3, "Jane Doe")]);
    org.described_types = vec!["Workflow", "ApexPage", "EmailTemplate", "Report"]
        .into_iter()
        .map(String::from)
        .collect();

    let options = ScanOptions {
        types: "all".to_string(),
        ..options_in(dir.path())
    };
    let report = ChangeScan::new(&org, options).run().await?;

    assert_eq!(org.listed_batches().len(), 2);
    assert_eq!(org.listed_batches()[1], vec!["Report".to_string()]);
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].type_name, "Workflow");
    Ok(())
}

#[tokio::test]
async fn test_created_mode_uses_creation_age_and_creator() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let org = FakeOrg::with_items(vec![
        created_item("Flow", "New_Flow", 3, "Jane Doe"),
        created_item("Flow", "Old_Flow", 30, "Jane Doe"),
    ]);

    let options = ScanOptions {
        mode: ChangeMode::Created,
        days: 7,
        ..options_in(dir.path())
    };
    let report = ChangeScan::new(&org, options).run().await?;

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].name, "New_Flow");
    assert_eq!(report.records[0].creation_age, Some(3));
    assert_eq!(report.records[0].modification_age, Some(1));
    Ok(())
}

#[tokio::test]
async fn test_created_mode_keeps_item_without_modified_date() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let mut undated = created_item("Flow", "New_Flow", 3, "Jane Doe");
    undated.last_modified_date = String::new();
    let org = FakeOrg::with_items(vec![undated]);

    let options = ScanOptions {
        mode: ChangeMode::Created,
        days: 7,
        ..options_in(dir.path())
    };
    let report = ChangeScan::new(&org, options).run().await?;

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].creation_age, Some(3));
    assert_eq!(report.records[0].modification_age, None);
    assert!(report.manifest_path.is_some());

    let json = serde_json::to_value(&report.records)?;
    assert!(json[0]["modificationAge"].is_null());
    Ok(())
}

#[tokio::test]
async fn test_modified_mode_keeps_item_without_created_date() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let mut undated = item("ApexClass", "Foo", 2, "Jane Doe");
    undated.created_date = "unknown".to_string();
    let org = FakeOrg::with_items(vec![undated]);

    let report = ChangeScan::new(&org, options_in(dir.path())).run().await?;

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].modification_age, Some(2));
    assert_eq!(report.records[0].creation_age, None);
    Ok(())
}

#[tokio::test]
async fn test_unparseable_and_future_timestamps() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let mut broken = item("ApexClass", "Broken", 1, "Jane Doe");
    broken.last_modified_date = "not a date".to_string();
    let mut future = item("ApexClass", "Future", 0, "Jane Doe");
    future.last_modified_date = (chrono::Utc::now() + chrono::Duration::days(3))
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string();
    let org = FakeOrg::with_items(vec![broken, future, item("ApexClass", "Fine", 1, "Jane Doe")]);

    let report = ChangeScan::new(&org, options_in(dir.path())).run().await?;

    let names: Vec<&str> = report.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Future", "Fine"]);
    assert!(matches!(report.records[0].modification_age, Some(age) if age < 0));
    Ok(())
}

#[tokio::test]
async fn test_refiltering_a_report_changes_nothing() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let org = FakeOrg::with_items(vec![
        item("ApexClass", "A", 0, "Jane Doe"),
        item("ApexClass", "B", 15, "Jane Doe"),
        item("ApexClass", "C", 16, "Jane Doe"),
        item("Layout", "Account-Account Layout", 7, "Bob Smith"),
    ]);

    let report = ChangeScan::new(&org, options_in(dir.path())).run().await?;
    let filter = ChangeFilter::new(15, ChangeMode::Modified);

    let refiltered: Vec<_> = report
        .records
        .iter()
        .filter(|r| filter.accepts_record(r))
        .cloned()
        .collect();
    assert_eq!(refiltered, report.records);
    assert_eq!(report.records.len(), 3);
    Ok(())
}
