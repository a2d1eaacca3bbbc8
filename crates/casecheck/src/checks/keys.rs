/// Canonical slug form: lower-cased, whitespace runs become `_`, anything
/// outside `[a-z0-9_]` is dropped.
pub fn normalize_key(value: &str) -> String {
    let lowered = value.trim().to_lowercase();
    let joined = lowered.split_whitespace().collect::<Vec<_>>().join("_");
    joined
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        .collect()
}

/// Alphanumeric-only identity used when matching checks and upload keys loosely.
pub fn compact_key(value: &str) -> String {
    value
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

/// Turns `drivingLicence`, `credit_history-check` and similar keys into labels.
pub fn humanize_key(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "Untitled Check".to_string();
    }

    let mut spaced = String::with_capacity(trimmed.len() + 8);
    let mut previous: Option<char> = None;
    for ch in trimmed.chars() {
        let ch = if ch == '_' || ch == '-' { ' ' } else { ch };
        if ch.is_uppercase() {
            if let Some(prev) = previous {
                if prev.is_lowercase() || prev.is_ascii_digit() {
                    spaced.push(' ');
                }
            }
        }
        spaced.push(ch);
        previous = Some(ch);
    }

    spaced
        .split_whitespace()
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace_and_strips_punctuation() {
        assert_eq!(
            normalize_key("  National ID  Verification "),
            "national_id_verification"
        );
        assert_eq!(normalize_key("Father's Name"), "fathers_name");
        assert_eq!(normalize_key("Credit-History (v2)"), "credithistory_v2");
        assert_eq!(normalize_key(""), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            "Drug Panel Tests",
            "UAN",
            "  Über Check\t2 ",
            "employment_verification",
            "Address / Proof",
            "__already__normal__",
        ];
        for sample in samples {
            let once = normalize_key(sample);
            assert_eq!(normalize_key(&once), once, "sample {sample:?}");
        }
    }

    #[test]
    fn compact_ignores_separators_and_case() {
        assert_eq!(compact_key("Employment Verification"), "employmentverification");
        assert_eq!(compact_key("employment_verification"), "employmentverification");
    }

    #[test]
    fn humanize_splits_camel_case_and_separators() {
        assert_eq!(humanize_key("drivingLicence"), "Driving Licence");
        assert_eq!(humanize_key("credit_history-check"), "Credit History Check");
        assert_eq!(humanize_key("refPhone2"), "Ref Phone2");
        assert_eq!(humanize_key("   "), "Untitled Check");
    }
}
