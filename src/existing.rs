use crate::errors::{ErrorKind, Result};
use crate::san::{SanEntry, SubjectAltNames};
use crate::subject::{FieldCode, SubjectAttributes};
use std::io::ErrorKind as IoErrorKind;
use std::path::Path;
use x509_parser::certification_request::X509CertificationRequest;
use x509_parser::extensions::ParsedExtension;
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::FromDer;

const PEM_LABELS: [&str; 2] = ["CERTIFICATE REQUEST", "NEW CERTIFICATE REQUEST"];

/// What an on-disk request currently asserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingCsrSnapshot {
    pub subject: SubjectAttributes,
    /// `None` when the request carries no SAN extension at all.
    pub subject_alt_names: Option<SubjectAltNames>,
}

impl ExistingCsrSnapshot {
    /// Reads the request at `path`. A missing file is `Ok(None)`; a file
    /// that is not a PEM encoded request is a parse error.
    #[cfg_attr(feature = "tracing", tracing::instrument(
        name = "read_existing_csr",
        level = tracing::Level::DEBUG,
        err(level = tracing::Level::WARN)
    ))]
    pub fn read(path: &Path) -> Result<Option<Self>> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(ErrorKind::Parse {
                    path: path.to_path_buf(),
                }
                .with_msg(format!("the file could not be read: {err}")));
            }
        };
        Self::from_pem(&bytes)
            .map(Some)
            .map_err(|msg| ErrorKind::Parse {
                path: path.to_path_buf(),
            }
            .with_msg(msg))
    }

    pub(crate) fn from_pem(bytes: &[u8]) -> core::result::Result<Self, String> {
        let (_, pem) = parse_x509_pem(bytes).map_err(|err| format!("invalid PEM: {err}"))?;
        if !PEM_LABELS.contains(&pem.label.as_str()) {
            return Err(format!("unexpected PEM block \"{}\"", pem.label));
        }
        let (_, csr) = X509CertificationRequest::from_der(&pem.contents)
            .map_err(|err| format!("invalid DER: {err}"))?;
        Ok(Self::from_request(&csr))
    }

    fn from_request(csr: &X509CertificationRequest) -> Self {
        let mut subject = SubjectAttributes::new();
        for attribute in csr.certification_request_info.subject.iter_attributes() {
            let code = FieldCode::from_dotted_oid(&attribute.attr_type().to_id_string());
            if let (Some(code), Ok(value)) = (code, attribute.as_str()) {
                subject.set(code, value);
            }
        }
        let subject_alt_names = csr.requested_extensions().and_then(|mut extensions| {
            extensions.find_map(|extension| match extension {
                ParsedExtension::SubjectAlternativeName(san) => Some(
                    san.general_names
                        .iter()
                        .map(SanEntry::from_general_name)
                        .collect::<SubjectAltNames>(),
                ),
                _ => None,
            })
        });
        ExistingCsrSnapshot {
            subject,
            subject_alt_names,
        }
    }
}
