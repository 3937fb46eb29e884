use crate::subject::FieldCode;
use serde::Deserialize;
use std::path::PathBuf;

/// Lifecycle state the request file should end up in.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    #[default]
    #[serde(rename = "present")]
    Present,
    #[serde(rename = "absent")]
    Absent,
}

impl std::str::FromStr for State {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(State::Present),
            "absent" => Ok(State::Absent),
            other => Err(format!("invalid state \"{other}\" (expected present or absent)")),
        }
    }
}

pub const DEFAULT_DIGEST: &str = "sha256";
pub const DEFAULT_VERSION: u32 = 3;

fn default_digest() -> String {
    DEFAULT_DIGEST.to_string()
}

fn default_version() -> u32 {
    DEFAULT_VERSION
}

/// Caller supplied inputs, read once at the start of a run.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Parameters {
    pub path: PathBuf,
    pub privatekey_path: PathBuf,
    #[serde(default)]
    pub state: State,
    #[serde(default = "default_digest")]
    pub digest: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub force: bool,
    #[serde(default, rename = "subjectAltName")]
    pub subject_alt_name: Option<String>,
    #[serde(default, rename = "countryName", alias = "C")]
    pub country_name: Option<String>,
    #[serde(default, rename = "stateOrProvinceName", alias = "ST")]
    pub state_or_province_name: Option<String>,
    #[serde(default, rename = "localityName", alias = "L")]
    pub locality_name: Option<String>,
    #[serde(default, rename = "organizationName", alias = "O")]
    pub organization_name: Option<String>,
    #[serde(default, rename = "organizationalUnitName", alias = "OU")]
    pub organizational_unit_name: Option<String>,
    #[serde(default, rename = "commonName", alias = "CN")]
    pub common_name: Option<String>,
    #[serde(default, rename = "emailAddress", alias = "E")]
    pub email_address: Option<String>,
    #[serde(default)]
    pub check_mode: bool,
}

impl Parameters {
    pub fn new(path: impl Into<PathBuf>, privatekey_path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            privatekey_path: privatekey_path.into(),
            state: State::default(),
            digest: default_digest(),
            version: default_version(),
            force: false,
            subject_alt_name: None,
            country_name: None,
            state_or_province_name: None,
            locality_name: None,
            organization_name: None,
            organizational_unit_name: None,
            common_name: None,
            email_address: None,
            check_mode: false,
        }
    }

    pub fn field(&self, code: FieldCode) -> Option<&str> {
        match code {
            FieldCode::Country => self.country_name.as_deref(),
            FieldCode::StateOrProvince => self.state_or_province_name.as_deref(),
            FieldCode::Locality => self.locality_name.as_deref(),
            FieldCode::Organization => self.organization_name.as_deref(),
            FieldCode::OrganizationalUnit => self.organizational_unit_name.as_deref(),
            FieldCode::CommonName => self.common_name.as_deref(),
            FieldCode::EmailAddress => self.email_address.as_deref(),
        }
    }

    pub fn field_mut(&mut self, code: FieldCode) -> &mut Option<String> {
        match code {
            FieldCode::Country => &mut self.country_name,
            FieldCode::StateOrProvince => &mut self.state_or_province_name,
            FieldCode::Locality => &mut self.locality_name,
            FieldCode::Organization => &mut self.organization_name,
            FieldCode::OrganizationalUnit => &mut self.organizational_unit_name,
            FieldCode::CommonName => &mut self.common_name,
            FieldCode::EmailAddress => &mut self.email_address,
        }
    }

    pub fn with_field(mut self, code: FieldCode, value: impl Into<String>) -> Self {
        *self.field_mut(code) = Some(value.into());
        self
    }

    pub fn with_subject_alt_name(mut self, value: impl Into<String>) -> Self {
        self.subject_alt_name = Some(value.into());
        self
    }
}
