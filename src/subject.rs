use rcgen::string::Ia5String;
use rcgen::{DistinguishedName, DnType, DnValue};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// The closed set of subject fields a request may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldCode {
    Country,
    StateOrProvince,
    Locality,
    Organization,
    OrganizationalUnit,
    CommonName,
    EmailAddress,
}

struct FieldEntry {
    code: FieldCode,
    short_name: &'static str,
    oid: &'static [u64],
}

static FIELDS: [FieldEntry; 7] = [
    FieldEntry {
        code: FieldCode::Country,
        short_name: "C",
        oid: &[2, 5, 4, 6],
    },
    FieldEntry {
        code: FieldCode::StateOrProvince,
        short_name: "ST",
        oid: &[2, 5, 4, 8],
    },
    FieldEntry {
        code: FieldCode::Locality,
        short_name: "L",
        oid: &[2, 5, 4, 7],
    },
    FieldEntry {
        code: FieldCode::Organization,
        short_name: "O",
        oid: &[2, 5, 4, 10],
    },
    FieldEntry {
        code: FieldCode::OrganizationalUnit,
        short_name: "OU",
        oid: &[2, 5, 4, 11],
    },
    FieldEntry {
        code: FieldCode::CommonName,
        short_name: "CN",
        oid: &[2, 5, 4, 3],
    },
    FieldEntry {
        code: FieldCode::EmailAddress,
        short_name: "emailAddress",
        oid: &[1, 2, 840, 113549, 1, 9, 1],
    },
];

impl FieldCode {
    pub const ALL: [FieldCode; 7] = [
        FieldCode::Country,
        FieldCode::StateOrProvince,
        FieldCode::Locality,
        FieldCode::Organization,
        FieldCode::OrganizationalUnit,
        FieldCode::CommonName,
        FieldCode::EmailAddress,
    ];

    fn entry(self) -> &'static FieldEntry {
        // FIELDS is declared in the same order as the enum
        &FIELDS[self as usize]
    }

    pub fn short_name(self) -> &'static str {
        self.entry().short_name
    }

    pub fn oid(self) -> &'static [u64] {
        self.entry().oid
    }

    /// Looks a field up by its dotted OID, e.g. `2.5.4.3`.
    pub fn from_dotted_oid(oid: &str) -> Option<FieldCode> {
        FIELDS
            .iter()
            .find(|it| {
                let mut arcs = oid.split('.');
                it.oid
                    .iter()
                    .all(|arc| arcs.next().and_then(|it| it.parse::<u64>().ok()) == Some(*arc))
                    && arcs.next().is_none()
            })
            .map(|it| it.code)
    }

    fn dn_type(self) -> DnType {
        match self {
            FieldCode::Country => DnType::CountryName,
            FieldCode::StateOrProvince => DnType::StateOrProvinceName,
            FieldCode::Locality => DnType::LocalityName,
            FieldCode::Organization => DnType::OrganizationName,
            FieldCode::OrganizationalUnit => DnType::OrganizationalUnitName,
            FieldCode::CommonName => DnType::CommonName,
            FieldCode::EmailAddress => DnType::CustomDnType(self.oid().to_vec()),
        }
    }

    fn dn_value(self, value: &str) -> DnValue {
        match self {
            FieldCode::EmailAddress => match Ia5String::try_from(value) {
                Ok(ia5) => DnValue::Ia5String(ia5),
                Err(_) => DnValue::Utf8String(value.to_string()),
            },
            _ => DnValue::Utf8String(value.to_string()),
        }
    }
}

impl Display for FieldCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.short_name())
    }
}

impl Serialize for FieldCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.short_name())
    }
}

/// Subject fields with a value. Absent or empty values are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SubjectAttributes(BTreeMap<FieldCode, String>);

impl SubjectAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `code` to `value`, ignoring empty values. A later value for the
    /// same field replaces the earlier one.
    pub fn set(&mut self, code: FieldCode, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() {
            self.0.insert(code, value);
        }
    }

    pub fn get(&self, code: FieldCode) -> Option<&str> {
        self.0.get(&code).map(String::as_str)
    }

    pub fn common_name(&self) -> Option<&str> {
        self.get(FieldCode::CommonName)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldCode, &str)> {
        self.0.iter().map(|(code, value)| (*code, value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn to_distinguished_name(&self) -> DistinguishedName {
        let mut dn = DistinguishedName::new();
        for (code, value) in self.iter() {
            dn.push(code.dn_type(), code.dn_value(value));
        }
        dn
    }
}

impl<S: Into<String>> FromIterator<(FieldCode, S)> for SubjectAttributes {
    fn from_iter<T: IntoIterator<Item = (FieldCode, S)>>(iter: T) -> Self {
        let mut attributes = SubjectAttributes::new();
        iter.into_iter()
            .for_each(|(code, value)| attributes.set(code, value));
        attributes
    }
}
