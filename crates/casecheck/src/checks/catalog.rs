use super::domain::{CheckDefinition, CheckSchema, FieldSpec, SchemaMeta, SchemaSection, SELF_SECTION};
use super::keys::normalize_key;

/// Laboratory panels offered for drug tests.
pub const DRUG_PANEL_LEVELS: [&str; 8] = ["5", "6", "7", "8", "9", "10", "11", "12"];

/// Locally known schemas for the standard check types.
pub fn builtin_definitions() -> Vec<CheckDefinition> {
    vec![
        definition(
            "National ID Verification",
            "Identity",
            vec![self_section(vec![
                FieldSpec::text("aadhaar", "Aadhaar Number"),
                FieldSpec::text("pan", "PAN Number"),
                FieldSpec::text("passport", "Passport Number"),
                FieldSpec::text("voter", "Voter ID Number"),
                FieldSpec::text("drivingLicence", "Driving Licence Number"),
                FieldSpec::file("_file", "Upload ID Document (Aadhaar/PAN/Any)"),
            ])],
        ),
        definition(
            "Address Verification",
            "Address",
            vec![
                address_section("Current Address", "_file_current", "Upload Current Address Proof"),
                address_section(
                    "Permanent Address",
                    "_file_permanent",
                    "Upload Permanent Address Proof",
                ),
            ],
        ),
        definition(
            "Employment Verification",
            "Employment",
            vec![
                employment_section(
                    "Current Employment",
                    "_file_current",
                    "Upload Current Employment Proof",
                ),
                employment_section(
                    "Previous Employment",
                    "_file_previous",
                    "Upload Previous Employment Proof",
                ),
            ],
        ),
        definition(
            "Education Verification",
            "Education",
            vec![self_section(vec![
                FieldSpec::text("university", "University"),
                FieldSpec::text("degree", "Degree"),
                FieldSpec::text("year", "Year of Passing"),
                FieldSpec::file("_file", "Upload Certificate / Transcript"),
            ])],
        ),
        definition(
            "Court Record Check",
            "Legal",
            vec![self_section(vec![
                FieldSpec::text("candidateName", "Candidate Name"),
                FieldSpec::text("fatherName", "Father's Name"),
                FieldSpec::text("address", "Address"),
                FieldSpec::date("dob", "Date of Birth"),
            ])],
        ),
        definition(
            "Police Verification",
            "Legal",
            vec![self_section(vec![
                FieldSpec::text("candidateName", "Candidate Name"),
                FieldSpec::text("address", "Address"),
                FieldSpec::date("dob", "Date of Birth"),
            ])],
        ),
        definition(
            "Reference Checks",
            "Employment",
            vec![
                section(
                    "Professional Reference",
                    vec![
                        FieldSpec::text("refName", "Referee Name"),
                        FieldSpec::text("refEmail", "Referee Email"),
                        FieldSpec::text("refPhone", "Referee Contact Number"),
                        FieldSpec::text("refDesignation", "Referee Designation"),
                    ],
                ),
                section(
                    "Personal Reference",
                    vec![
                        FieldSpec::text("name", "Name"),
                        FieldSpec::text("phone", "Contact Number"),
                        FieldSpec::text("relation", "Relation"),
                    ],
                ),
            ],
        ),
        definition(
            "Global Database",
            "Legal",
            vec![self_section(vec![
                FieldSpec::text("candidateName", "Candidate Name"),
                FieldSpec::text("address", "Address"),
                FieldSpec::file("_file", "Upload Supporting Document"),
            ])],
        ),
        definition(
            "Gap Analysis",
            "Employment",
            vec![self_section(vec![
                FieldSpec::text("from", "From (MM/YYYY)"),
                FieldSpec::text("to", "To (MM/YYYY)"),
                FieldSpec::text("reason", "Reason"),
            ])],
        ),
        definition(
            "Credit History Check",
            "Financial",
            vec![self_section(vec![
                FieldSpec::text("candidateName", "Candidate Name"),
                FieldSpec::text("address", "Address"),
                FieldSpec::date("dob", "Date of Birth"),
                FieldSpec::file("_file", "Upload Credit Report"),
            ])],
        ),
        definition(
            "UAN",
            "Identity",
            vec![self_section(vec![
                FieldSpec::text("uan", "UAN Number or Aadhaar"),
                FieldSpec::file("_file", "Upload UAN Proof"),
            ])],
        ),
        definition(
            "Social Media Screening",
            "Digital",
            vec![self_section(vec![
                FieldSpec::text("candidateName", "Candidate Name"),
                FieldSpec::text("handles", "Social Handles (comma separated)"),
            ])],
        ),
        definition(
            "Directorship Check",
            "Legal",
            vec![self_section(vec![
                FieldSpec::text("candidateName", "Candidate Name"),
                FieldSpec::text("pan", "PAN Number"),
                FieldSpec::text("aadhaar", "Aadhaar Number"),
                FieldSpec::date("dob", "Date of Birth"),
            ])],
        ),
        definition(
            "Drug Panel Tests",
            "Health",
            vec![self_section(vec![
                FieldSpec::text("candidateName", "Candidate Name"),
                FieldSpec::text("contactNumber", "Contact Number"),
                FieldSpec::radio(
                    "labTestLevel",
                    "Panel (5/6/7/8/9/10/11/12)",
                    &DRUG_PANEL_LEVELS,
                ),
            ])],
        ),
        CheckDefinition {
            slug: normalize_key("Other Documents"),
            display_name: "Other Documents".to_string(),
            category: "Other".to_string(),
            description: String::new(),
            schema: Some(CheckSchema {
                sections: vec![self_section(vec![
                    FieldSpec::text("note", "Describe the document"),
                    FieldSpec::file("_file", "Upload Document"),
                ])],
                meta: SchemaMeta {
                    only_upload: true,
                    upload_label: Some("Supporting document".to_string()),
                },
            }),
        },
    ]
}

fn definition(name: &str, category: &str, sections: Vec<SchemaSection>) -> CheckDefinition {
    CheckDefinition {
        slug: normalize_key(name),
        display_name: name.to_string(),
        category: category.to_string(),
        description: String::new(),
        schema: Some(CheckSchema {
            sections,
            meta: SchemaMeta::default(),
        }),
    }
}

fn section(key: &str, fields: Vec<FieldSpec>) -> SchemaSection {
    SchemaSection {
        key: key.to_string(),
        fields,
    }
}

fn self_section(fields: Vec<FieldSpec>) -> SchemaSection {
    section(SELF_SECTION, fields)
}

fn address_section(key: &str, file_name: &str, file_label: &str) -> SchemaSection {
    section(
        key,
        vec![
            FieldSpec::text("line1", "Address Line 1"),
            FieldSpec::text("line2", "Address Line 2"),
            FieldSpec::text("city", "City"),
            FieldSpec::text("state", "State"),
            FieldSpec::text("pincode", "Pincode"),
            FieldSpec::file(file_name, file_label),
        ],
    )
}

fn employment_section(key: &str, file_name: &str, file_label: &str) -> SchemaSection {
    section(
        key,
        vec![
            FieldSpec::text("organization", "Organization Name"),
            FieldSpec::text("designation", "Designation"),
            FieldSpec::text("tenure", "Tenure"),
            FieldSpec::file(file_name, file_label),
        ],
    )
}
