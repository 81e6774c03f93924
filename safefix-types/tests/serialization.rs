//! Serialization shape of the records written to disk or printed with `--json`.

use pretty_assertions::assert_eq;
use safefix_types::candidate::FixCategory;
use safefix_types::change::{ChangeSet, Edit};
use safefix_types::outcome::{Phase, TransactionResult};
use safefix_types::validation::{CheckOutcome, ValidationOutcome};
use camino::Utf8Path;

#[test]
fn transaction_result_omits_empty_optionals() {
    let result = TransactionResult::new(Phase::Collect).finish();
    let v = serde_json::to_value(&result).unwrap();

    assert_eq!(v["schema"], "safefix.result.v1");
    assert_eq!(v["success"], true);
    assert_eq!(v["phase"], "collect");
    assert!(v.get("backup_id").is_none());
    assert!(v.get("restore_failures").is_none());
    assert!(v.get("ended_at").is_some());
}

#[test]
fn failed_result_maps_to_exit_code_one() {
    let mut result = TransactionResult::new(Phase::Validate);
    assert_eq!(result.exit_code(), 0);
    result.fail("validation failed: tests");
    assert_eq!(result.exit_code(), 1);
    assert_eq!(result.errors, vec!["validation failed: tests"]);
}

#[test]
fn summary_category_keys_serialize_as_strings() {
    let cs = ChangeSet::from_edits(vec![Edit::remove(
        Utf8Path::new("a.js"),
        2,
        "  console.log(1);",
        FixCategory::ConsoleLogs,
        "Remove console_logs statement",
    )]);
    let mut result = TransactionResult::new(Phase::Commit);
    result.summary = Some(cs.summary());
    result.validation = Some(ValidationOutcome::from_checks(vec![CheckOutcome::skipped(
        "tests",
        "no command",
    )]));

    let json = serde_json::to_string(&result).unwrap();
    let back: TransactionResult = serde_json::from_str(&json).unwrap();
    let summary = back.summary.unwrap();
    assert_eq!(summary.per_category[&FixCategory::ConsoleLogs].edits, 1);
    assert!(json.contains("\"console_logs\""));
    assert!(back.validation.unwrap().success);
}
