use crate::errors::{ErrorKind, Result};
use der::asn1::{Ia5String, OctetString};
use std::fmt::{Display, Formatter};
use std::net::IpAddr;
use x509_cert::ext::pkix::name::GeneralName as RequestedName;
use x509_parser::extensions::GeneralName;

/// A single typed Subject Alternative Name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SanEntry {
    Dns(String),
    Ip(IpAddr),
    Email(String),
    Uri(String),
    /// A name type that can be read from a request but never declared.
    Other(String),
}

impl SanEntry {
    pub fn dns(name: impl Into<String>) -> Self {
        SanEntry::Dns(name.into())
    }

    /// Parses one `TYPE:value` entry. Whitespace must already be stripped.
    pub fn parse(entry: &str) -> Result<Self> {
        let (prefix, value) = entry.split_once(':').ok_or_else(|| {
            ErrorKind::Configuration
                .with_msg(format!("subjectAltName entry \"{entry}\" has no type prefix"))
        })?;
        if value.is_empty() {
            return Err(ErrorKind::Configuration
                .with_msg(format!("subjectAltName entry \"{entry}\" has no value")));
        }
        match prefix.to_ascii_lowercase().as_str() {
            "dns" => Ok(SanEntry::Dns(value.to_string())),
            "ip" | "ipaddress" => value.parse::<IpAddr>().map(SanEntry::Ip).map_err(|_| {
                ErrorKind::Configuration
                    .with_msg(format!("\"{value}\" is not a valid IP address"))
            }),
            "email" => Ok(SanEntry::Email(value.to_string())),
            "uri" => Ok(SanEntry::Uri(value.to_string())),
            _ => Err(ErrorKind::Configuration
                .with_msg(format!("unsupported subjectAltName type \"{prefix}\""))),
        }
    }

    pub(crate) fn from_general_name(name: &GeneralName) -> Self {
        match name {
            GeneralName::DNSName(dns) => SanEntry::Dns(dns.to_string()),
            GeneralName::RFC822Name(email) => SanEntry::Email(email.to_string()),
            GeneralName::URI(uri) => SanEntry::Uri(uri.to_string()),
            GeneralName::IPAddress(bytes) => match ip_from_bytes(bytes) {
                Some(ip) => SanEntry::Ip(ip),
                None => SanEntry::Other(format!("{name:?}")),
            },
            other => SanEntry::Other(format!("{other:?}")),
        }
    }

    /// The entry as an encodable X.509 `GeneralName`.
    pub(crate) fn to_general_name(&self) -> Result<RequestedName> {
        let invalid = |err: der::Error| {
            ErrorKind::Configuration.with_msg(format!("{self} cannot be encoded: {err}"))
        };
        match self {
            SanEntry::Dns(name) => Ia5String::new(name)
                .map(RequestedName::DnsName)
                .map_err(invalid),
            SanEntry::Ip(ip) => {
                let octets = match ip {
                    IpAddr::V4(ip) => ip.octets().to_vec(),
                    IpAddr::V6(ip) => ip.octets().to_vec(),
                };
                OctetString::new(octets)
                    .map(RequestedName::IpAddress)
                    .map_err(invalid)
            }
            SanEntry::Email(email) => Ia5String::new(email)
                .map(RequestedName::Rfc822Name)
                .map_err(invalid),
            SanEntry::Uri(uri) => Ia5String::new(uri)
                .map(RequestedName::UniformResourceIdentifier)
                .map_err(invalid),
            SanEntry::Other(_) => Err(ErrorKind::Configuration
                .with_msg(format!("{self} cannot be written to a request"))),
        }
    }
}

fn ip_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => <[u8; 4]>::try_from(bytes).ok().map(IpAddr::from),
        16 => <[u8; 16]>::try_from(bytes).ok().map(IpAddr::from),
        _ => None,
    }
}

impl Display for SanEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SanEntry::Dns(name) => write!(f, "DNS:{name}"),
            SanEntry::Ip(ip) => write!(f, "IP:{ip}"),
            SanEntry::Email(email) => write!(f, "email:{email}"),
            SanEntry::Uri(uri) => write!(f, "URI:{uri}"),
            SanEntry::Other(raw) => write!(f, "other:{raw}"),
        }
    }
}

/// Ordered list of alternative names. Order only matters for output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectAltNames(Vec<SanEntry>);

impl SubjectAltNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a comma separated list such as `DNS:a.com, DNS:b.com`.
    /// All whitespace is dropped and empty segments are skipped.
    pub fn parse(raw: &str) -> Result<Self> {
        let stripped: String = raw.chars().filter(|it| !it.is_whitespace()).collect();
        stripped
            .split(',')
            .filter(|it| !it.is_empty())
            .map(SanEntry::parse)
            .collect::<Result<Vec<_>>>()
            .map(SubjectAltNames)
    }

    /// Moves `entry` to the front of the list, keeping a single copy of it.
    pub fn ensure_first(&mut self, entry: SanEntry) {
        self.0.retain(|it| it != &entry);
        self.0.insert(0, entry);
    }

    pub fn contains(&self, entry: &SanEntry) -> bool {
        self.0.contains(entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SanEntry> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Comma joined form, as reported in the result record.
    pub fn joined(&self) -> String {
        self.0
            .iter()
            .map(|it| it.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl FromIterator<SanEntry> for SubjectAltNames {
    fn from_iter<T: IntoIterator<Item = SanEntry>>(iter: T) -> Self {
        SubjectAltNames(iter.into_iter().collect())
    }
}
