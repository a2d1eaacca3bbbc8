//! Merging the check list returned by a save into the list on screen.

use std::collections::HashMap;

use crate::checks::{compact_key, humanize_key, CheckInstance};

/// Identity of a check across saves: its display name, else its type.
pub fn identity_key(check: &CheckInstance) -> Option<String> {
    let raw = check
        .display_name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(&check.check_type);
    Some(compact_key(raw)).filter(|key| !key.is_empty())
}

fn type_key(check: &CheckInstance) -> String {
    compact_key(&check.check_type)
}

/// Server fields win; the previous display name survives, else the server's,
/// else one derived from the check type.
fn merge_entry(previous: Option<&CheckInstance>, server: &CheckInstance) -> CheckInstance {
    let display_name = previous
        .and_then(|check| check.display_name.clone())
        .or_else(|| server.display_name.clone())
        .unwrap_or_else(|| humanize_key(&server.check_type));
    CheckInstance {
        display_name: Some(display_name),
        ..server.clone()
    }
}

/// Previous order is kept, entries the server did not echo stay as they were
/// and checks only the server knows are appended in server order.
pub fn merge_checks(previous: &[CheckInstance], server: &[CheckInstance]) -> Vec<CheckInstance> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    for (index, check) in previous.iter().enumerate() {
        let key = identity_key(check)
            .filter(|key| !slots.contains_key(key))
            .unwrap_or_else(|| format!("__prev_{index}"));
        slots.insert(key, index);
    }

    let mut merged: Vec<CheckInstance> = previous.to_vec();
    let mut matched = vec![false; previous.len()];
    let mut appended = Vec::new();

    for check in server {
        let by_identity = identity_key(check)
            .and_then(|key| slots.get(&key).copied())
            .filter(|index| !matched[*index]);
        let slot = by_identity.or_else(|| {
            let wanted = type_key(check);
            (!wanted.is_empty())
                .then(|| {
                    previous
                        .iter()
                        .enumerate()
                        .position(|(index, prev)| !matched[index] && type_key(prev) == wanted)
                })
                .flatten()
        });
        match slot {
            Some(index) => {
                matched[index] = true;
                merged[index] = merge_entry(previous.get(index), check);
            }
            None => appended.push(merge_entry(None, check)),
        }
    }

    merged.extend(appended);
    merged
}

/// The server's copy of `saved`, matched by identity, then by type, then by
/// being the only check returned.
pub fn find_saved<'a>(saved: &CheckInstance, server: &'a [CheckInstance]) -> Option<&'a CheckInstance> {
    let by_identity = identity_key(saved).and_then(|key| {
        server
            .iter()
            .find(|check| identity_key(check).as_deref() == Some(key.as_str()))
    });
    by_identity
        .or_else(|| {
            let wanted = type_key(saved);
            server
                .iter()
                .find(|check| !wanted.is_empty() && type_key(check) == wanted)
        })
        .or_else(|| match server {
            [only] => Some(only),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::CheckStatus;
    use serde_json::Map;

    fn check(check_type: &str, display: Option<&str>) -> CheckInstance {
        CheckInstance {
            display_name: display.map(str::to_string),
            ..CheckInstance::pending(check_type, Map::new())
        }
    }

    #[test]
    fn keeps_order_and_display_names() {
        let previous = vec![
            check("uan", Some("UAN")),
            check("court_record_check", Some("Court Records")),
            check("address_verification", Some("Address Verification")),
        ];
        let mut saved = check("court_record_check", None);
        saved.status = CheckStatus::Clear;
        let server = vec![
            check("address_verification", None),
            saved,
            check("gap_analysis", None),
        ];

        let merged = merge_checks(&previous, &server);
        let names: Vec<_> = merged
            .iter()
            .map(|check| check.display_name.as_deref().unwrap_or(""))
            .collect();
        assert_eq!(names, ["UAN", "Court Records", "Address Verification", "Gap Analysis"]);
        assert_eq!(merged[1].status, CheckStatus::Clear);
        assert_eq!(merged[0], previous[0]);
    }

    #[test]
    fn identity_falls_back_for_unnamed_checks() {
        let previous = vec![check("", None), check("", None)];
        let merged = merge_checks(&previous, &[]);
        assert_eq!(merged.len(), 2);
        assert_eq!(identity_key(&previous[0]), None);
    }

    #[test]
    fn saved_check_found_by_type_or_single_reply() {
        let previous = check("court_record_check", Some("Court Records"));
        let server = vec![check("uan", None), check("court_record_check", None)];
        assert_eq!(
            find_saved(&previous, &server).map(|check| check.check_type.as_str()),
            Some("court_record_check")
        );

        let lone = vec![check("renamed_by_server", None)];
        assert_eq!(
            find_saved(&previous, &lone).map(|check| check.check_type.as_str()),
            Some("renamed_by_server")
        );
        let unrelated = vec![check("uan", None), check("gap_analysis", None)];
        assert!(find_saved(&previous, &unrelated).is_none());
    }
}
