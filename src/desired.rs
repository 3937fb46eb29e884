use crate::config::Parameters;
use crate::errors::{Error, ErrorKind, Result};
use crate::san::{SanEntry, SubjectAltNames};
use crate::subject::{FieldCode, SubjectAttributes};
use std::path::PathBuf;

/// The declared target of a run. Built once, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredSpec {
    pub subject: SubjectAttributes,
    pub subject_alt_names: SubjectAltNames,
    pub digest: String,
    pub version: u32,
    pub privatekey_path: PathBuf,
    pub force: bool,
}

impl DesiredSpec {
    /// Normalizes raw subject fields and a raw SAN string.
    ///
    /// A non-empty common name always ends up as the first `DNS:` entry.
    /// Fails when neither a common name nor any alternative name is given.
    pub fn build<'a>(
        fields: impl IntoIterator<Item = (FieldCode, Option<&'a str>)>,
        subject_alt_name: Option<&str>,
        digest: impl Into<String>,
        version: u32,
        privatekey_path: impl Into<PathBuf>,
        force: bool,
    ) -> Result<Self> {
        let subject: SubjectAttributes = fields
            .into_iter()
            .filter_map(|(code, value)| value.map(|it| (code, it)))
            .collect();
        let mut subject_alt_names = match subject_alt_name {
            Some(raw) => SubjectAltNames::parse(raw)?,
            None => SubjectAltNames::new(),
        };
        if let Some(common_name) = subject.common_name() {
            subject_alt_names.ensure_first(SanEntry::dns(common_name));
        }
        if subject_alt_names.is_empty() {
            return Err(ErrorKind::Configuration
                .with_msg("one of commonName or subjectAltName must be specified"));
        }
        Ok(DesiredSpec {
            subject,
            subject_alt_names,
            digest: digest.into(),
            version,
            privatekey_path: privatekey_path.into(),
            force,
        })
    }
}

impl TryFrom<&Parameters> for DesiredSpec {
    type Error = Error;
    fn try_from(parameters: &Parameters) -> Result<Self> {
        DesiredSpec::build(
            FieldCode::ALL.map(|code| (code, parameters.field(code))),
            parameters.subject_alt_name.as_deref(),
            parameters.digest.as_str(),
            parameters.version,
            parameters.privatekey_path.as_path(),
            parameters.force,
        )
    }
}
