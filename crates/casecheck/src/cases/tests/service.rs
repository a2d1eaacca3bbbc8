use super::common::*;
use std::sync::Arc;

use crate::backend::BackendError;
use crate::cases::{CaseDeskService, CheckEdit, Operation, ServiceError, REPORT_TIMEOUT_MESSAGE};
use crate::checks::{CatalogState, CheckRegistry, CheckStatus, FileRef, SELF_SECTION};
use crate::config::BackendConfig;
use crate::intake::{BulkIntakeError, EducationField, SubmissionDraft, SubmissionError};
use crate::review::EditState;

fn national_id_draft(number: &str) -> SubmissionDraft {
    let mut draft = SubmissionDraft::new();
    draft.select_check("national_id_verification");
    draft.set_value("national_id_verification", SELF_SECTION, "aadhaar", number);
    draft
}

#[test]
fn load_catalog_reports_failure_without_panicking() {
    let (service, backend) = build_service();
    assert!(service.load_catalog().selectable());

    backend.fail_catalog();
    match service.load_catalog() {
        CatalogState::Failed { message } => {
            assert_eq!(message, "Failed to load checks/clients. Try refreshing.")
        }
        other => panic!("expected failed catalog, got {other:?}"),
    }
}

#[test]
fn create_case_posts_selected_checks() {
    let (service, backend) = build_service();
    let mut draft = national_id_draft("1234 5678 9012");
    draft.select_check("court_record_check");
    draft.attach_file("court_record_check", SELF_SECTION, FileRef::new("fir.pdf", vec![1, 2, 3]));

    let record = service
        .create_case(candidate(), Some("org-1".to_string()), &draft)
        .expect("case created");

    let types: Vec<_> = record.checks.iter().map(|check| check.check_type.as_str()).collect();
    assert_eq!(types, ["national_id_verification", "court_record_check"]);
    let forms = backend.forms_for("create");
    assert_eq!(forms.len(), 1);
    assert_eq!(forms[0].text_value("clientOrganization"), Some("org-1"));
    assert_eq!(forms[0].files("caseDocuments").len(), 1);
}

#[test]
fn create_case_blocks_national_id_without_number() {
    let (service, backend) = build_service();
    let draft = national_id_draft("");

    match service.create_case(candidate(), None, &draft) {
        Err(ServiceError::Submission(SubmissionError::MissingNationalId)) => {}
        other => panic!("expected missing national id, got {other:?}"),
    }
    assert!(backend.forms_for("create").is_empty());
}

#[test]
fn create_case_without_checks_survives_catalog_outage() {
    let (service, backend) = build_service();
    backend.fail_catalog();

    let record = service
        .create_case(candidate(), None, &SubmissionDraft::new())
        .expect("check-free case still created");
    assert!(record.checks.is_empty());

    match service.create_case(candidate(), None, &national_id_draft("1234")) {
        Err(ServiceError::CatalogUnavailable(message)) => {
            assert!(message.contains("Failed to load checks"))
        }
        other => panic!("expected catalog outage, got {other:?}"),
    }
}

#[test]
fn send_link_requires_client_and_trims_checks() {
    let (service, backend) = build_service();
    let checks = vec![" uan ".to_string(), "".to_string()];

    match service.send_link(candidate(), None, &checks, &SubmissionDraft::new()) {
        Err(ServiceError::Submission(SubmissionError::MissingClientOrganization)) => {}
        other => panic!("expected missing client, got {other:?}"),
    }

    service
        .send_link(candidate(), Some("org-1"), &checks, &SubmissionDraft::new())
        .expect("link sent");
    let links = backend.links.lock().expect("link mutex poisoned");
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].checks, ["uan"]);
    assert_eq!(links[0].client_organization, "org-1");
}

#[test]
fn send_link_falls_back_to_draft_selection() {
    let (service, backend) = build_service();
    let mut draft = SubmissionDraft::new();
    draft.select_check("gap_analysis");
    draft.toggle_sub_option("gap_analysis", "Education Gap", true);

    service
        .send_link(candidate(), Some("org-1"), &[], &draft)
        .expect("link sent");
    let links = backend.links.lock().expect("link mutex poisoned");
    assert_eq!(links[0].checks, ["gap_analysis"]);
}

#[test]
fn bulk_send_itemizes_each_row() {
    let (service, _) = build_service();
    let csv = "candidateName,email,contactNumber\nJohn Doe,john@example.com,1\nJane Smith,,2\n";

    let outcome = service
        .bulk_send("people.csv", csv.as_bytes(), &["uan".to_string()], None)
        .expect("bulk processed");
    assert_eq!(outcome.summary(), "1 successful, 1 failed");
    assert_eq!(outcome.failed[0].candidate, "Jane Smith");

    match service.bulk_send("people.csv", csv.as_bytes(), &[], None) {
        Err(ServiceError::Bulk(BulkIntakeError::NoChecks)) => {}
        other => panic!("expected missing checks, got {other:?}"),
    }
    match service.bulk_send("people.xlsx", b"PK", &["uan".to_string()], None) {
        Err(ServiceError::Bulk(BulkIntakeError::ExcelUnsupported)) => {}
        other => panic!("expected excel rejection, got {other:?}"),
    }
}

#[test]
fn portal_form_lays_out_requested_checks() {
    let (service, _) = build_service();
    let form = service.portal_form(PORTAL_TOKEN).expect("portal loads");

    assert_eq!(form.client_name, "Acme");
    let slugs: Vec<_> = form.checks.iter().map(|plan| plan.slug.as_str()).collect();
    assert_eq!(slugs, ["national_id_verification", "education_verification"]);

    let error = service.portal_form("expired").expect_err("unknown token");
    assert_eq!(error.user_message(), Operation::LoadPortal.fallback_message());
}

#[test]
fn candidate_upload_validates_and_posts_files() {
    let (service, backend) = build_service();
    let mut draft = national_id_draft("");
    draft.set_education_field(0, EducationField::University, "IIT Bombay");
    draft.attach_education_file(0, FileRef::new("degree.pdf", vec![9; 4]));

    match service.submit_candidate_upload(PORTAL_TOKEN, &draft) {
        Err(ServiceError::Submission(SubmissionError::MissingNationalId)) => {}
        other => panic!("expected missing national id, got {other:?}"),
    }

    draft.set_value("national_id_verification", SELF_SECTION, "pan", "ABCDE1234F");
    match service.submit_candidate_upload(PORTAL_TOKEN, &draft) {
        Err(ServiceError::Submission(SubmissionError::IncompleteEducation { index: 0 })) => {}
        other => panic!("expected incomplete education, got {other:?}"),
    }

    draft.set_education_field(0, EducationField::Degree, "BTech");
    draft.set_education_field(0, EducationField::Year, "2019");
    service
        .submit_candidate_upload(PORTAL_TOKEN, &draft)
        .expect("upload accepted");

    let forms = backend.forms_for("upload");
    assert_eq!(forms.len(), 1);
    assert_eq!(forms[0].files("education_verification_0").len(), 1);
    let details = forms[0].json_value("checkDetails").expect("details sent");
    assert_eq!(details["education_verification"]["_self"][0]["degree"], "BTech");
}

#[test]
fn review_save_cycle_updates_the_check() {
    let (service, _) = build_service();
    let view = service.open_review("case-7").expect("review opens");
    let registry = CheckRegistry::builtin();
    let court_name = registry
        .find("court_record_check")
        .map(|definition| definition.display_name.clone())
        .expect("court check is built in");
    assert_eq!(view.checks[0].display_name, court_name);
    assert_eq!(view.checks[0].candidate_documents.len(), 1);
    assert_eq!(view.checks[1].sections, ["current", "permanent"]);

    let edit: CheckEdit = serde_json::from_value(serde_json::json!({
        "status": "Clear",
        "observations": { "_default": { "detail1": "No records found" } },
        "comments": { "_default": "Verified at district court" }
    }))
    .expect("edit parses");
    let staged = service.edit_check("case-7", 0, &edit).expect("edit staged");
    assert_eq!(staged.checks[0].state, EditState::Staged);

    let saved = service.save_check("case-7", 0).expect("check saved");
    assert_eq!(saved.checks[0].state, EditState::Saved);
    assert_eq!(saved.checks[0].status, CheckStatus::Clear);
    assert_eq!(saved.checks[0].display_name, court_name);
    assert_eq!(saved.checks[1].status, CheckStatus::Pending);
}

#[test]
fn failed_save_keeps_staged_edits() {
    let (service, backend) = build_service();
    service.open_review("case-7").expect("review opens");
    let edit = CheckEdit {
        status: Some(CheckStatus::Discrepant),
        ..CheckEdit::default()
    };
    service.edit_check("case-7", 1, &edit).expect("edit staged");
    backend.reject_updates_with("Case is locked");

    let error = service.save_all("case-7").expect_err("save rejected");
    assert_eq!(error.user_message(), "Case is locked");

    let view = service.review("case-7").expect("review still open");
    assert_eq!(view.checks[1].status, CheckStatus::Discrepant);
    assert_eq!(
        view.checks[1].state,
        EditState::SaveFailed {
            message: "Case is locked".to_string()
        }
    );
}

#[test]
fn saving_requires_an_open_review() {
    let (service, _) = build_service();
    match service.save_check("case-7", 0) {
        Err(ServiceError::ReviewNotOpen(case_id)) => assert_eq!(case_id, "case-7"),
        other => panic!("expected closed review, got {other:?}"),
    }
}

#[test]
fn report_timeout_has_its_own_message() {
    let (service, _) = build_service();
    let report = service.download_report("case-7").expect("report downloads");
    assert_eq!(report.filename, "Case_case-7_Report.pdf");

    let error = service.download_report("slow-case").expect_err("report times out");
    assert_eq!(error.user_message(), REPORT_TIMEOUT_MESSAGE);
}

#[test]
fn unavailable_backend_falls_back_to_generic_messages() {
    let service = CaseDeskService::new(Arc::new(UnavailableBackend), BackendConfig::default());
    assert!(!service.load_catalog().selectable());

    let error = service
        .create_case(candidate(), None, &SubmissionDraft::new())
        .expect_err("backend down");
    match &error {
        ServiceError::Backend {
            operation: Operation::CreateCase,
            source: BackendError::Unavailable(_),
        } => {}
        other => panic!("expected backend failure, got {other:?}"),
    }
    assert_eq!(error.user_message(), "An error occurred.");

    let error = service.open_review("case-7").expect_err("backend down");
    assert_eq!(error.user_message(), "Failed to load case details. Please try again.");
}
