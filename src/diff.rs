use crate::desired::DesiredSpec;
use crate::existing::ExistingCsrSnapshot;
use crate::san::SanEntry;
use crate::subject::FieldCode;
use std::fmt::{Display, Formatter};

/// The first reason found for regenerating a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    MissingFile,
    Forced,
    Subject {
        field: FieldCode,
        desired: String,
        existing: String,
    },
    MissingSubjectAltNameExtension,
    SubjectAltNameCount { desired: usize, existing: usize },
    MissingSubjectAltName(SanEntry),
}

impl Display for Mismatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Mismatch::MissingFile => write!(f, "request file does not exist"),
            Mismatch::Forced => write!(f, "regeneration forced"),
            Mismatch::Subject {
                field,
                desired,
                existing,
            } => write!(f, "subject {field} is \"{existing}\", expected \"{desired}\""),
            Mismatch::MissingSubjectAltNameExtension => {
                write!(f, "request has no subjectAltName extension")
            }
            Mismatch::SubjectAltNameCount { desired, existing } => write!(
                f,
                "request has {existing} alternative names, expected {desired}"
            ),
            Mismatch::MissingSubjectAltName(entry) => {
                write!(f, "alternative name {entry} is missing")
            }
        }
    }
}

/// Returns the first rule that calls for regeneration, or `None` when the
/// existing request already matches.
///
/// Subject fields are compared one way only: a declared field that the
/// existing request lacks does not count as a difference. Alternative names
/// are compared by count and membership, never by position.
pub fn first_mismatch(
    desired: &DesiredSpec,
    existing: Option<&ExistingCsrSnapshot>,
) -> Option<Mismatch> {
    let Some(existing) = existing else {
        return Some(Mismatch::MissingFile);
    };
    if desired.force {
        return Some(Mismatch::Forced);
    }
    for (field, value) in desired.subject.iter() {
        match existing.subject.get(field) {
            Some(current) if current != value => {
                return Some(Mismatch::Subject {
                    field,
                    desired: value.to_string(),
                    existing: current.to_string(),
                });
            }
            _ => {}
        }
    }
    let Some(current) = existing.subject_alt_names.as_ref() else {
        return if desired.subject_alt_names.is_empty() {
            None
        } else {
            Some(Mismatch::MissingSubjectAltNameExtension)
        };
    };
    if current.len() != desired.subject_alt_names.len() {
        return Some(Mismatch::SubjectAltNameCount {
            desired: desired.subject_alt_names.len(),
            existing: current.len(),
        });
    }
    desired
        .subject_alt_names
        .iter()
        .find(|it| !current.contains(*it))
        .map(|it| Mismatch::MissingSubjectAltName(it.clone()))
}

pub fn needs_regeneration(desired: &DesiredSpec, existing: Option<&ExistingCsrSnapshot>) -> bool {
    first_mismatch(desired, existing).is_some()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::san::SubjectAltNames;
    use crate::subject::SubjectAttributes;

    fn desired(subject: &[(FieldCode, &str)], san: &str) -> DesiredSpec {
        DesiredSpec::build(
            subject.iter().map(|(code, value)| (*code, Some(*value))),
            Some(san),
            "sha256",
            3,
            "key.pem",
            false,
        )
        .unwrap()
    }

    fn existing(subject: &[(FieldCode, &str)], san: Option<&str>) -> ExistingCsrSnapshot {
        ExistingCsrSnapshot {
            subject: subject.iter().cloned().collect::<SubjectAttributes>(),
            subject_alt_names: san.map(|it| SubjectAltNames::parse(it).unwrap()),
        }
    }

    const CN: FieldCode = FieldCode::CommonName;
    const O: FieldCode = FieldCode::Organization;

    #[test]
    fn test_missing_file() {
        let desired = desired(&[(CN, "www.example.com")], "");
        assert_eq!(first_mismatch(&desired, None), Some(Mismatch::MissingFile));
    }

    #[test]
    fn test_force_short_circuits() {
        let mut desired = desired(&[(CN, "www.example.com")], "");
        let existing = existing(&[(CN, "www.example.com")], Some("DNS:www.example.com"));
        assert_eq!(first_mismatch(&desired, Some(&existing)), None);
        desired.force = true;
        assert_eq!(
            first_mismatch(&desired, Some(&existing)),
            Some(Mismatch::Forced)
        );
    }

    #[test]
    fn test_identical_state() {
        let desired = desired(&[(CN, "www.example.com"), (O, "Example")], "DNS:m.example.com");
        let existing = existing(
            &[(CN, "www.example.com"), (O, "Example")],
            Some("DNS:www.example.com,DNS:m.example.com"),
        );
        assert!(!needs_regeneration(&desired, Some(&existing)));
        assert!(!needs_regeneration(&desired, Some(&existing)));
    }

    #[test]
    fn test_changed_subject_field() {
        let desired = desired(&[(CN, "www.example.com"), (O, "New Org")], "");
        let existing = existing(
            &[(CN, "www.example.com"), (O, "Old Org")],
            Some("DNS:www.example.com"),
        );
        assert_eq!(
            first_mismatch(&desired, Some(&existing)),
            Some(Mismatch::Subject {
                field: O,
                desired: "New Org".to_string(),
                existing: "Old Org".to_string(),
            })
        );
    }

    #[test]
    fn test_field_missing_from_existing_is_not_a_mismatch() {
        let desired = desired(&[(CN, "www.example.com"), (O, "Example")], "");
        let existing = existing(&[(CN, "www.example.com")], Some("DNS:www.example.com"));
        assert_eq!(first_mismatch(&desired, Some(&existing)), None);
    }

    #[test]
    fn test_field_only_in_existing_is_ignored() {
        let desired = desired(&[(CN, "www.example.com")], "");
        let existing = existing(
            &[(CN, "www.example.com"), (O, "Example")],
            Some("DNS:www.example.com"),
        );
        assert_eq!(first_mismatch(&desired, Some(&existing)), None);
    }

    #[test]
    fn test_missing_san_extension() {
        let desired = desired(&[(CN, "www.example.com")], "");
        let existing = existing(&[(CN, "www.example.com")], None);
        assert_eq!(
            first_mismatch(&desired, Some(&existing)),
            Some(Mismatch::MissingSubjectAltNameExtension)
        );
    }

    #[test]
    fn test_missing_san_extension_with_no_declared_names() {
        let mut desired = desired(&[(CN, "www.example.com")], "");
        desired.subject_alt_names = SubjectAltNames::new();
        let existing = existing(&[(CN, "www.example.com")], None);
        assert_eq!(first_mismatch(&desired, Some(&existing)), None);
    }

    #[test]
    fn test_san_count_differs() {
        let desired = desired(&[(CN, "www.example.com")], "");
        let existing = existing(
            &[(CN, "www.example.com")],
            Some("DNS:www.example.com,DNS:m.example.com"),
        );
        assert_eq!(
            first_mismatch(&desired, Some(&existing)),
            Some(Mismatch::SubjectAltNameCount {
                desired: 1,
                existing: 2
            })
        );
    }

    #[test]
    fn test_san_entry_differs() {
        let desired = desired(&[(CN, "www.example.com")], "DNS:api.example.com");
        let existing = existing(
            &[(CN, "www.example.com")],
            Some("DNS:www.example.com,DNS:m.example.com"),
        );
        assert_eq!(
            first_mismatch(&desired, Some(&existing)),
            Some(Mismatch::MissingSubjectAltName(SanEntry::dns(
                "api.example.com"
            )))
        );
    }

    #[test]
    fn test_san_order_is_not_significant() {
        let desired = desired(&[], "DNS:a.example.com,DNS:b.example.com,IP:10.0.0.1");
        let existing = existing(&[], Some("IP:10.0.0.1,DNS:b.example.com,DNS:a.example.com"));
        assert_eq!(first_mismatch(&desired, Some(&existing)), None);
    }

    #[test]
    fn test_subject_checked_before_san() {
        let desired = desired(&[(CN, "www.example.com"), (O, "New Org")], "");
        let existing = existing(&[(O, "Old Org")], None);
        assert!(matches!(
            first_mismatch(&desired, Some(&existing)),
            Some(Mismatch::Subject { field: O, .. })
        ));
    }

    #[test]
    fn test_mismatch_display() {
        assert_eq!(
            Mismatch::MissingSubjectAltName(SanEntry::dns("a.com")).to_string(),
            "alternative name DNS:a.com is missing"
        );
        assert_eq!(
            Mismatch::Subject {
                field: O,
                desired: "B".to_string(),
                existing: "A".to_string()
            }
            .to_string(),
            "subject O is \"A\", expected \"B\""
        );
    }
}
