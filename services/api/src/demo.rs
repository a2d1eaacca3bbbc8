use crate::infra::InMemoryCaseBackend;
use casecheck::cases::{CaseDeskService, CheckEdit};
use casecheck::checks::behavior::{EDUCATION, NATIONAL_ID};
use casecheck::checks::registry::LOAD_FAILURE_MESSAGE;
use casecheck::checks::{CandidateInfo, CheckRegistry, CheckStatus, FileRef, SELF_SECTION};
use casecheck::config::BackendConfig;
use casecheck::error::AppError;
use casecheck::intake::{parse_upload, BulkSendRequest, EducationField, SubmissionDraft};
use casecheck::review::ReviewView;
use chrono::Local;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

const DEMO_CLIENT: &str = "Acme Staffing";

#[derive(Args, Debug, Default)]
pub(crate) struct CatalogArgs {
    /// Catalog JSON as returned by the checks endpoint. Defaults to the built-in checks.
    #[arg(long)]
    pub(crate) json: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct BulkArgs {
    /// Candidate sheet (CSV) to validate
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Check slug to request from every candidate (repeatable)
    #[arg(long = "check")]
    pub(crate) checks: Vec<String>,
    /// Client organization the links are sent for
    #[arg(long)]
    pub(crate) client: Option<String>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Write the downloaded report to this path.
    #[arg(long)]
    pub(crate) report_out: Option<PathBuf>,
    /// Stop after the candidate upload step.
    #[arg(long)]
    pub(crate) skip_review: bool,
}

pub(crate) fn run_catalog(args: CatalogArgs) -> Result<(), AppError> {
    let registry = match args.json {
        Some(path) => CheckRegistry::from_json(&std::fs::read_to_string(path)?)?,
        None => CheckRegistry::builtin(),
    };

    println!("{} checks", registry.len());
    for group in registry.grouped_by_category() {
        println!("\n{}", group.category);
        for check in &group.checks {
            let marker = if check.only_upload() { " [upload only]" } else { "" };
            println!("  - {} ({}){}", check.display_name, check.slug, marker);
        }
    }
    Ok(())
}

pub(crate) fn run_bulk_preview(args: BulkArgs) -> Result<(), AppError> {
    let filename = args
        .csv
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let contents = std::fs::read(&args.csv)?;
    let candidates = parse_upload(&filename, &contents)?;
    let request = BulkSendRequest::new(candidates, &args.checks, args.client.as_deref())?;

    println!(
        "{} candidates | checks: {}",
        request.candidates.len(),
        request.checks.join(", ")
    );
    for candidate in &request.candidates {
        let email = if candidate.email.trim().is_empty() {
            "missing email, would fail"
        } else {
            candidate.email.as_str()
        };
        println!("  - {} <{}>", candidate.candidate_name, email);
    }
    if request.client_organization.is_none() {
        println!("No client organization given; the backend default applies.");
    }
    Ok(())
}

fn demo_candidate(name: &str, email: &str) -> CandidateInfo {
    CandidateInfo {
        candidate_name: name.to_string(),
        email: email.to_string(),
        designation: "Analyst".to_string(),
        ..CandidateInfo::default()
    }
}

fn render_review(view: &ReviewView) {
    println!(
        "- Review of {} for {}",
        view.case_id, view.candidate_info.candidate_name
    );
    for check in &view.checks {
        let sections = if check.sections.is_empty() {
            String::new()
        } else {
            format!(" | sections: {}", check.sections.join(", "))
        };
        println!(
            "  [{}] {} -> {} | {} candidate docs, {} verified docs{}",
            check.index,
            check.display_name,
            check.status.label(),
            check.candidate_documents.len(),
            check.verified_documents.len(),
            sections
        );
    }
}

/// Walks one case through the whole desk against the in-memory backend.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let backend = Arc::new(InMemoryCaseBackend::seeded());
    let service = CaseDeskService::new(backend.clone(), BackendConfig::default());

    println!("Case desk demo ({})", Local::now().format("%Y-%m-%d %H:%M"));
    let catalog = service.load_catalog();
    match catalog.registry() {
        Some(registry) => println!(
            "- Catalog loaded: {} checks in {} categories",
            registry.len(),
            registry.grouped_by_category().len()
        ),
        None => {
            println!(
                "- {}",
                catalog.error_message().unwrap_or(LOAD_FAILURE_MESSAGE)
            );
            return Ok(());
        }
    }

    let mut draft = SubmissionDraft::new();
    draft.select_check(NATIONAL_ID);
    draft.set_value(NATIONAL_ID, SELF_SECTION, "aadhaar", "123412341234");
    draft.attach_file(
        NATIONAL_ID,
        SELF_SECTION,
        FileRef::new("aadhaar.pdf", b"%PDF-1.4 aadhaar".to_vec()),
    );
    draft.select_check("court_record_check");
    draft.set_value("court_record_check", SELF_SECTION, "address", "12 MG Road, Pune");
    let record = service.create_case(
        demo_candidate("Asha Rao", "asha@example.com"),
        Some(DEMO_CLIENT.to_string()),
        &draft,
    )?;
    println!(
        "- Created case {} with {} checks and {} documents",
        record.id,
        record.checks.len(),
        record.documents.len()
    );

    let requested = [NATIONAL_ID.to_string(), EDUCATION.to_string()];
    let reply = service.send_link(
        demo_candidate("Ravi Kumar", "ravi@example.com"),
        Some(DEMO_CLIENT),
        &requested,
        &SubmissionDraft::new(),
    )?;
    let case_id = reply["caseId"].as_str().unwrap_or_default().to_string();
    let Some(token) = backend.link_for(&case_id) else {
        println!("- No upload link was issued for {case_id}");
        return Ok(());
    };
    println!("- Upload link {token} sent for case {case_id}");

    let form = service.portal_form(&token)?;
    println!(
        "- Portal for {} ({}) asks for:",
        form.candidate_name, form.client_name
    );
    for plan in &form.checks {
        println!(
            "  - {} ({} upload slots)",
            plan.display_name,
            plan.file_slot_count()
        );
    }

    let mut upload = SubmissionDraft::new();
    upload.select_check(NATIONAL_ID);
    upload.set_value(NATIONAL_ID, SELF_SECTION, "pan", "ABCDE1234F");
    upload.attach_file(
        NATIONAL_ID,
        SELF_SECTION,
        FileRef::new("pan.jpg", vec![0xFF, 0xD8, 0xFF]),
    );
    upload.set_education_field(0, EducationField::University, "University of Pune");
    upload.set_education_field(0, EducationField::Degree, "BCom");
    upload.set_education_field(0, EducationField::Year, "2018");
    upload.attach_education_file(0, FileRef::new("bcom.pdf", b"%PDF-1.4 degree".to_vec()));
    service.submit_candidate_upload(&token, &upload)?;
    println!("- Candidate documents submitted");

    if args.skip_review {
        return Ok(());
    }

    render_review(&service.open_review(&case_id)?);
    let edit = CheckEdit {
        status: Some(CheckStatus::Clear),
        ..CheckEdit::default()
    };
    service.edit_check(&case_id, 0, &edit)?;
    let saved = service.save_check(&case_id, 0)?;
    println!("- Saved check 0");
    render_review(&saved);

    let report = service.download_report(&case_id)?;
    println!("- Report {} ({} bytes)", report.filename, report.bytes.len());
    if let Some(path) = args.report_out {
        std::fs::write(&path, &report.bytes)?;
        println!("  Written to {}", path.display());
    }
    Ok(())
}
