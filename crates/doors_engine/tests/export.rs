mod common;

use std::fs;

use common::fixed_clock;
use doors_core::{
    reconcile, Record, ReconcileOptions, ResultSet, UnmatchedSecondaryPolicy, FIELD_ACCOUNT,
    FIELD_CLIENT, FIELD_EMAIL, FIELD_PHONE,
};
use doors_engine::{
    export_details, export_details_unreconciled, export_listing, ExportSettings, ListingColumns,
};
use pretty_assertions::assert_eq;
use serde_json::Value;
use tempfile::TempDir;

fn record(pairs: &[(&str, &str)]) -> Record {
    pairs.iter().copied().collect()
}

fn settings(temp: &TempDir) -> ExportSettings {
    ExportSettings::new(temp.path().join("out")).with_clock(fixed_clock())
}

fn columns() -> ListingColumns {
    ListingColumns {
        city: "Laval".to_string(),
        street: "Boul. des Laurentides".to_string(),
        rta: String::new(),
    }
}

#[test]
fn listing_csv_uses_the_label_union() {
    let temp = TempDir::new().unwrap();
    let records: ResultSet = vec![
        record(&[(FIELD_CLIENT, "Alpha"), ("Ville", "Laval")]),
        record(&[(FIELD_CLIENT, "Beta"), (FIELD_ACCOUNT, "0012345")]),
    ]
    .into_iter()
    .collect();

    let export = export_listing(&settings(&temp), "laval", &columns(), &records).unwrap();

    assert_eq!(export.record_count, 2);
    assert_eq!(
        export.json_path.file_name().unwrap(),
        "doors_laval_20240102-030405.json"
    );
    let csv = fs::read_to_string(&export.csv_path).unwrap();
    assert_eq!(
        csv.lines().collect::<Vec<_>>(),
        vec![
            "city,street,rta,Client,Compte client,Ville",
            "Laval,Boul. des Laurentides,,Alpha,,Laval",
            "Laval,Boul. des Laurentides,,Beta,0012345,",
        ]
    );

    let json: Value =
        serde_json::from_str(&fs::read_to_string(&export.json_path).unwrap()).unwrap();
    assert_eq!(json[1][FIELD_ACCOUNT], "0012345");
}

#[test]
fn empty_listing_still_writes_both_files() {
    let temp = TempDir::new().unwrap();

    let export = export_listing(&settings(&temp), "laval", &columns(), &ResultSet::new()).unwrap();

    assert_eq!(export.record_count, 0);
    assert_eq!(fs::read_to_string(&export.json_path).unwrap().trim(), "[]");
    assert_eq!(
        fs::read_to_string(&export.csv_path).unwrap().lines().collect::<Vec<_>>(),
        vec!["city,street,rta"]
    );
}

#[test]
fn details_write_template_and_reports() {
    let temp = TempDir::new().unwrap();
    let primary: ResultSet = vec![
        record(&[(FIELD_CLIENT, "Alpha"), (FIELD_ACCOUNT, "123-4567"), ("Résidence", "1 rue A")]),
        record(&[(FIELD_CLIENT, "Beta"), (FIELD_ACCOUNT, "2345678")]),
    ]
    .into_iter()
    .collect();
    let secondary: ResultSet = vec![
        record(&[(FIELD_ACCOUNT, "1234567"), (FIELD_PHONE, "418 555-0101"), (FIELD_EMAIL, "")]),
        record(&[(FIELD_ACCOUNT, "9999999"), (FIELD_PHONE, "514 555-0000")]),
    ]
    .into_iter()
    .collect();
    let options = ReconcileOptions {
        unmatched_secondary: UnmatchedSecondaryPolicy::Report,
        ..ReconcileOptions::default()
    };
    let reconciliation = reconcile(&primary, &secondary, &options).unwrap();

    let export = export_details(&settings(&temp), "laval", &reconciliation).unwrap();

    assert_eq!(export.record_count, 2);
    assert_eq!(
        export.csv_path.file_name().unwrap(),
        "specifics_laval_20240102-030405.csv"
    );
    let csv = fs::read_to_string(&export.csv_path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "ADRESSE,CLIENT,NUMÉRO DE TÉLÉPHONE,COURRIEL,NUMÉRO DE COMPTE,\
         SERVICES ACTUELS,DERNIER STATUT,SERVICE AVANT DEBRANCHEMENT"
    );
    assert_eq!(lines[1], "1 rue A,Alpha,418 555-0101,N/A,123-4567,N/A,N/A,N/A");
    assert_eq!(lines[2], "N/A,Beta,N/A,N/A,2345678,N/A,N/A,N/A");

    let missing = fs::read_to_string(export.missing_path.unwrap()).unwrap();
    assert_eq!(missing.lines().count(), 2);
    assert!(missing.contains("Beta"));

    let unmatched_path = export.unmatched_path.unwrap();
    assert_eq!(
        unmatched_path.file_name().unwrap(),
        "unmatched_accounts_20240102-030405.csv"
    );
    assert!(fs::read_to_string(unmatched_path).unwrap().contains("9999999"));
}

#[test]
fn unreconciled_export_keeps_both_sets() {
    let temp = TempDir::new().unwrap();
    let primary: ResultSet = vec![record(&[(FIELD_CLIENT, "Alpha"), (FIELD_ACCOUNT, "1234567")])]
        .into_iter()
        .collect();
    let secondary: ResultSet = vec![
        record(&[(FIELD_ACCOUNT, "1234567"), (FIELD_PHONE, "1")]),
        record(&[(FIELD_ACCOUNT, "123-4567"), (FIELD_PHONE, "2")]),
    ]
    .into_iter()
    .collect();

    let export =
        export_details_unreconciled(&settings(&temp), "laval", &primary, &secondary).unwrap();

    let json: Value =
        serde_json::from_str(&fs::read_to_string(&export.json_path).unwrap()).unwrap();
    assert_eq!(json["primary"].as_array().unwrap().len(), 1);
    assert_eq!(json["secondary"].as_array().unwrap().len(), 2);
    assert!(export.missing_path.is_none());
    let csv = fs::read_to_string(&export.csv_path).unwrap();
    assert_eq!(csv.lines().nth(1), Some("N/A,Alpha,N/A,N/A,1234567,N/A,N/A,N/A"));
}

#[test]
fn blocked_side_reports_are_skipped() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("out");
    fs::create_dir_all(out.join("missing_after_merge_20240102-030405.csv")).unwrap();
    fs::create_dir_all(out.join("unmatched_accounts_20240102-030405.csv")).unwrap();
    let primary: ResultSet = vec![record(&[(FIELD_CLIENT, "Beta"), (FIELD_ACCOUNT, "2345678")])]
        .into_iter()
        .collect();
    let secondary: ResultSet = vec![record(&[(FIELD_ACCOUNT, "9999999"), (FIELD_PHONE, "1")])]
        .into_iter()
        .collect();
    let options = ReconcileOptions {
        unmatched_secondary: UnmatchedSecondaryPolicy::Report,
        ..ReconcileOptions::default()
    };
    let reconciliation = reconcile(&primary, &secondary, &options).unwrap();

    let export = export_details(&settings(&temp), "laval", &reconciliation).unwrap();

    assert!(export.missing_path.is_none());
    assert!(export.unmatched_path.is_none());
    let csv = fs::read_to_string(&export.csv_path).unwrap();
    assert_eq!(csv.lines().nth(1), Some("N/A,Beta,N/A,N/A,2345678,N/A,N/A,N/A"));
}
