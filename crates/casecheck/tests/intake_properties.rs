use casecheck::checks::behavior::{EDUCATION, NATIONAL_ID};
use casecheck::checks::{
    normalize_key, CandidateInfo, CheckRegistry, FileRef, RawCheckEntry, SELF_SECTION,
};
use casecheck::intake::{
    parse_candidates, parse_upload, validate_checks, BulkIntakeError, BulkSendRequest,
    CaseCreationPayload, EducationField, SubmissionDraft, SubmissionError,
};
use serde_json::json;

fn raw_entries(value: serde_json::Value) -> Vec<RawCheckEntry> {
    serde_json::from_value(value).expect("catalog entries decode")
}

fn candidate() -> CandidateInfo {
    CandidateInfo {
        candidate_name: "Asha Rao".to_string(),
        email: "asha@example.com".to_string(),
        ..CandidateInfo::default()
    }
}

#[test]
fn normalized_slugs_are_fixed_points() {
    for name in [
        "National ID Verification",
        "  Court   Record -- Check ",
        "Drug Panel (12)",
        "already_normalized",
        "Ünïcode Name",
        "___",
        "",
    ] {
        let once = normalize_key(name);
        assert_eq!(normalize_key(&once), once, "renormalizing {name:?}");
    }
}

#[test]
fn duplicate_catalog_entries_keep_the_schema_in_either_order() {
    let with_schema = json!({
        "name": "Reference Checks",
        "schema": { "_self": [{ "name": "refName", "label": "Referee" }] }
    });
    let bare = json!({ "name": "reference  checks", "category": "Employment" });

    let forward = CheckRegistry::from_raw(raw_entries(json!([with_schema, bare])));
    let reverse = CheckRegistry::from_raw(raw_entries(json!([bare, with_schema])));

    for registry in [&forward, &reverse] {
        assert_eq!(registry.len(), 1);
        let schema = registry.definitions()[0]
            .schema
            .as_ref()
            .expect("schema kept");
        assert_eq!(schema.self_fields()[0].name, "refName");
    }
    assert_eq!(forward.definitions()[0].schema, reverse.definitions()[0].schema);
}

#[test]
fn updating_one_field_leaves_the_rest_untouched() {
    let mut draft = SubmissionDraft::new();
    draft.select_check("address_verification");
    draft.select_check("uan");
    draft.set_value("address_verification", "current", "city", "Pune");
    draft.set_value("address_verification", "permanent", "city", "Nagpur");
    draft.set_value("uan", SELF_SECTION, "uan", "100200300400");

    let address_before = draft.section_values("address_verification");
    let uan_before = draft.section_values("uan");

    draft.set_value("address_verification", "current", "pincode", "411001");

    assert_eq!(draft.section_values("uan"), uan_before);
    let address_after = draft.section_values("address_verification");
    assert_eq!(address_after["permanent"], address_before["permanent"]);
    assert_eq!(address_after["current"]["city"], "Pune");
    assert_eq!(address_after["current"]["pincode"], "411001");
}

#[test]
fn attachments_and_descriptors_stay_aligned() {
    let registry = CheckRegistry::builtin();
    let mut draft = SubmissionDraft::new();
    draft.select_check("address_verification");
    draft.attach_file(
        "address_verification",
        "current",
        FileRef::new("lease.pdf", vec![1; 8]),
    );
    draft.attach_file(
        "address_verification",
        "permanent",
        FileRef::new("utility.pdf", vec![2; 5]),
    );
    draft.select_check("credit_history_check");
    draft.attach_file(
        "credit_history_check",
        SELF_SECTION,
        FileRef::new("cibil.pdf", vec![3; 3]),
    );
    draft.add_general_file(FileRef::new("resume.pdf", vec![4; 2]));

    let payload = CaseCreationPayload::build(candidate(), None, &draft, &registry);
    let files: Vec<&FileRef> = payload.attachments.files().collect();
    let descriptors = payload.attachments.descriptors();

    assert_eq!(files.len(), descriptors.len());
    assert_eq!(files.len(), payload.attachments.len());
    for (file, descriptor) in files.iter().zip(&descriptors) {
        assert_eq!(file.name, descriptor.filename);
    }
}

#[test]
fn bulk_sheet_parses_and_requires_a_check() {
    let sheet = "candidateName,email\nJohn Doe,john@example.com";
    let candidates = parse_candidates(sheet.as_bytes()).expect("sheet parses");
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].candidate_name, "John Doe");
    assert_eq!(candidates[0].email, "john@example.com");

    let error = BulkSendRequest::new(candidates, &[], None).expect_err("no checks selected");
    assert!(matches!(error, BulkIntakeError::NoChecks));
    assert!(error
        .to_string()
        .contains("select at least one verification check"));

    assert!(matches!(
        parse_upload("people.xlsx", b"PK"),
        Err(BulkIntakeError::ExcelUnsupported)
    ));
}

#[test]
fn half_filled_education_rows_block_submission() {
    let mut draft = SubmissionDraft::new();
    draft.select_check(EDUCATION);
    draft.set_education_field(0, EducationField::University, "X");
    draft.set_education_field(0, EducationField::Year, "2020");

    let error = validate_checks(&draft, &[EDUCATION.to_string()], &[])
        .expect_err("degree missing");
    assert_eq!(error, SubmissionError::IncompleteEducation { index: 0 });
    let message = error.to_string();
    for field in ["University", "Degree", "Year"] {
        assert!(message.contains(field), "{message} names {field}");
    }

    draft.set_education_field(0, EducationField::Degree, "BSc");
    validate_checks(&draft, &[EDUCATION.to_string()], &[]).expect("complete row accepted");
}

#[test]
fn national_id_sends_one_number_and_one_file() {
    let registry = CheckRegistry::builtin();
    let mut draft = SubmissionDraft::new();
    draft.select_check(NATIONAL_ID);
    draft.set_value(NATIONAL_ID, SELF_SECTION, "aadhaar", "123");
    draft.set_value(NATIONAL_ID, SELF_SECTION, "pan", "");
    draft.attach_file(NATIONAL_ID, SELF_SECTION, FileRef::new("id.pdf", vec![7; 4]));

    let payload = CaseCreationPayload::build(candidate(), None, &draft, &registry);

    assert_eq!(payload.checks.len(), 1);
    let params = &payload.checks[0].params;
    assert_eq!(params["_self"]["aadhaar"], "123");
    assert_eq!(payload.attachments.len(), 1);
    let descriptors = payload.attachments.descriptors();
    assert_eq!(descriptors[0].check_type, NATIONAL_ID);
    assert_eq!(descriptors[0].filename, "id.pdf");
}
