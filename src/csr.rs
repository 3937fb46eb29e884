use crate::config::DEFAULT_VERSION;
use crate::desired::DesiredSpec;
use crate::digest::{DigestAlgorithm, KeyType, signature_algorithm};
use crate::errors::{Error, ErrorKind, Result};
use crate::key::to_pkcs8_pem;
use crate::san::SanEntry;
use der::Encode;
use rcgen::{CertificateParams, CustomExtension, KeyPair};
use x509_cert::ext::pkix::SubjectAltName;

const SUBJECT_ALT_NAME_OID: &[u64] = &[2, 5, 29, 17];

/// Builds and signs a request for `desired`, returning its PEM encoding.
///
/// Nothing is written to disk. The request version is always encoded as
/// PKCS#10 v1, the only version rcgen produces; `desired.version` is only
/// recorded on the span.
#[cfg_attr(feature = "tracing", tracing::instrument(
    name = "generate_csr",
    skip(desired),
    fields(key = %desired.privatekey_path.display(), digest = %desired.digest, version = desired.version),
    level = tracing::Level::DEBUG,
    err(level = tracing::Level::WARN)
))]
pub fn generate(desired: &DesiredSpec) -> Result<String> {
    if !is_encoded_version(desired.version) {
        #[cfg(feature = "tracing")]
        tracing::warn!(
            version = desired.version,
            "requested version is not encoded, the request is written as PKCS#10 v1"
        );
    }
    let key_pem = std::fs::read_to_string(&desired.privatekey_path)
        .map_err(|err| key_load_error(desired).with_msg(err.to_string()))?;
    let key_pair = signing_key(&key_pem, desired)?;
    sign_request(desired, &key_pair)
}

/// Versions that need no warning: the default and the PKCS#10 v1 number.
pub(crate) fn is_encoded_version(version: u32) -> bool {
    version == DEFAULT_VERSION || version == 1
}

fn key_load_error(desired: &DesiredSpec) -> ErrorKind {
    ErrorKind::KeyLoad {
        path: desired.privatekey_path.clone(),
    }
}

fn signing_error(desired: &DesiredSpec) -> ErrorKind {
    ErrorKind::Signing {
        digest: desired.digest.clone(),
    }
}

/// Loads a PEM key (PKCS#8, PKCS#1 or SEC1) and binds it to the signature
/// algorithm that matches the requested digest.
pub(crate) fn signing_key(key_pem: &str, desired: &DesiredSpec) -> Result<KeyPair> {
    let key_pem = to_pkcs8_pem(key_pem).map_err(|msg| key_load_error(desired).with_msg(msg))?;
    let key_pair = KeyPair::from_pem(&key_pem)
        .map_err(|err| key_load_error(desired).with_msg(err.to_string()))?;
    let digest = desired
        .digest
        .parse::<DigestAlgorithm>()
        .map_err(|_| signing_error(desired).with_msg("unsupported digest algorithm"))?;
    let key_type = KeyType::of(key_pair.algorithm())
        .ok_or_else(|| signing_error(desired).with_msg("unsupported key type"))?;
    let alg = signature_algorithm(key_type, digest).ok_or_else(|| {
        signing_error(desired).with_msg(format!("digest not supported by {key_type:?} keys"))
    })?;
    if alg == key_pair.algorithm() {
        return Ok(key_pair);
    }
    KeyPair::from_pem_and_sign_algo(&key_pem, alg)
        .map_err(|err| signing_error(desired).with_msg(err.to_string()))
}

/// The SAN extension. Never critical, also when the subject is empty.
fn subject_alt_name_extension(desired: &DesiredSpec) -> Result<CustomExtension> {
    let names = desired
        .subject_alt_names
        .iter()
        .map(SanEntry::to_general_name)
        .collect::<Result<Vec<_>>>()?;
    let content = SubjectAltName(names)
        .to_der()
        .map_err(|err| signing_error(desired).with_msg(err.to_string()))?;
    let mut extension = CustomExtension::from_oid_content(SUBJECT_ALT_NAME_OID, content);
    extension.set_criticality(false);
    Ok(extension)
}

pub(crate) fn sign_request(desired: &DesiredSpec, key_pair: &KeyPair) -> Result<String> {
    let mut params = CertificateParams::default();
    params.distinguished_name = desired.subject.to_distinguished_name();
    if !desired.subject_alt_names.is_empty() {
        params
            .custom_extensions
            .push(subject_alt_name_extension(desired)?);
    }
    params
        .serialize_request(key_pair)
        .and_then(|csr| csr.pem())
        .map_err(|err| -> Error { signing_error(desired).with_msg(err.to_string()) })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::diff::needs_regeneration;
    use crate::existing::ExistingCsrSnapshot;
    use crate::subject::FieldCode;
    use rcgen::{
        PKCS_ECDSA_P256_SHA256, PKCS_ECDSA_P384_SHA384, PKCS_ED25519, PKCS_RSA_SHA256,
        PKCS_RSA_SHA512, SignatureAlgorithm,
    };
    use std::path::Path;
    use x509_parser::certification_request::X509CertificationRequest;
    use x509_parser::cri_attributes::ParsedCriAttribute;
    use x509_parser::extensions::ParsedExtension;
    use x509_parser::pem::parse_x509_pem;
    use x509_parser::prelude::FromDer;

    fn write_key(dir: &Path, alg: &'static SignatureAlgorithm) -> std::path::PathBuf {
        let path = dir.join("key.pem");
        let key = KeyPair::generate_for(alg).unwrap();
        std::fs::write(&path, key.serialize_pem()).unwrap();
        path
    }

    fn desired(key: &Path, digest: &str) -> DesiredSpec {
        DesiredSpec::build(
            [
                (FieldCode::CommonName, Some("www.example.com")),
                (FieldCode::Organization, Some("Example")),
                (FieldCode::Country, Some("FR")),
                (FieldCode::EmailAddress, Some("admin@example.com")),
                (FieldCode::Locality, None),
            ],
            Some("DNS:m.example.com, IP:192.0.2.1, email:admin@example.com"),
            digest,
            3,
            key,
            false,
        )
        .unwrap()
    }

    #[test_tracing::test]
    fn test_generated_request_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let key = write_key(dir.path(), &PKCS_ECDSA_P256_SHA256);
        let desired = desired(&key, "sha256");
        let pem = generate(&desired).unwrap();
        assert!(pem.starts_with("-----BEGIN CERTIFICATE REQUEST-----"));
        let snapshot = ExistingCsrSnapshot::from_pem(pem.as_bytes()).unwrap();
        assert_eq!(snapshot.subject, desired.subject);
        assert_eq!(snapshot.subject.get(FieldCode::Locality), None);
        assert_eq!(
            snapshot.subject_alt_names.as_ref().map(|it| it.joined()),
            Some(
                "DNS:www.example.com,DNS:m.example.com,IP:192.0.2.1,email:admin@example.com"
                    .to_string()
            )
        );
        assert!(!needs_regeneration(&desired, Some(&snapshot)));
    }

    #[test_tracing::test]
    fn test_digest_selects_algorithm() {
        let dir = tempfile::tempdir().unwrap();
        let key = write_key(dir.path(), &PKCS_ECDSA_P384_SHA384);
        let desired = desired(&key, "sha384");
        let key_pem = std::fs::read_to_string(&key).unwrap();
        let key_pair = signing_key(&key_pem, &desired).unwrap();
        assert_eq!(key_pair.algorithm(), &PKCS_ECDSA_P384_SHA384);
        assert!(generate(&desired).is_ok());
    }

    #[test_tracing::test]
    fn test_ed25519_accepts_default_digest() {
        let dir = tempfile::tempdir().unwrap();
        let key = write_key(dir.path(), &PKCS_ED25519);
        let pem = generate(&desired(&key, "sha256")).unwrap();
        assert!(ExistingCsrSnapshot::from_pem(pem.as_bytes()).is_ok());
    }

    #[test_tracing::test]
    fn test_unsupported_digest_is_a_signing_error() {
        let dir = tempfile::tempdir().unwrap();
        let key = write_key(dir.path(), &PKCS_ECDSA_P256_SHA256);
        for digest in ["sha384", "md5"] {
            let err = generate(&desired(&key, digest)).unwrap_err();
            assert_eq!(
                err.kind(),
                &ErrorKind::Signing {
                    digest: digest.to_string()
                }
            );
        }
    }

    #[test_tracing::test]
    fn test_invalid_key_is_a_key_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("key.pem");
        std::fs::write(&key, "not a key").unwrap();
        let err = generate(&desired(&key, "sha256")).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::KeyLoad { path: key });

        let missing = dir.path().join("missing.pem");
        let err = generate(&desired(&missing, "sha256")).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::KeyLoad { path: missing });
    }

    #[test]
    fn test_request_state_is_stable() {
        let key_pair = KeyPair::generate().unwrap();
        let desired = desired(Path::new("unused.pem"), "sha256");
        let first = sign_request(&desired, &key_pair).unwrap();
        let second = sign_request(&desired, &key_pair).unwrap();
        let first = ExistingCsrSnapshot::from_pem(first.as_bytes()).unwrap();
        let second = ExistingCsrSnapshot::from_pem(second.as_bytes()).unwrap();
        assert_eq!(first, second);
    }

    fn subject_alt_name_criticality(pem: &str) -> Vec<bool> {
        let (_, pem) = parse_x509_pem(pem.as_bytes()).unwrap();
        let (_, csr) = X509CertificationRequest::from_der(&pem.contents).unwrap();
        csr.certification_request_info
            .iter_attributes()
            .filter_map(|attr| match attr.parsed_attribute() {
                ParsedCriAttribute::ExtensionRequest(request) => Some(request),
                _ => None,
            })
            .flat_map(|request| request.extensions.iter())
            .filter(|ext| {
                matches!(
                    ext.parsed_extension(),
                    ParsedExtension::SubjectAlternativeName(_)
                )
            })
            .map(|ext| ext.critical)
            .collect()
    }

    #[test]
    fn test_subject_alt_name_extension_is_never_critical() {
        let key_pair = KeyPair::generate().unwrap();
        let with_subject = desired(Path::new("unused.pem"), "sha256");
        let pem = sign_request(&with_subject, &key_pair).unwrap();
        assert_eq!(subject_alt_name_criticality(&pem), vec![false]);

        let names_only = DesiredSpec::build(
            [(FieldCode::CommonName, None)],
            Some("DNS:a.example.com"),
            "sha256",
            3,
            "unused.pem",
            false,
        )
        .unwrap();
        let pem = sign_request(&names_only, &key_pair).unwrap();
        assert_eq!(subject_alt_name_criticality(&pem), vec![false]);
        let snapshot = ExistingCsrSnapshot::from_pem(pem.as_bytes()).unwrap();
        assert!(snapshot.subject.is_empty());
        assert_eq!(
            snapshot.subject_alt_names.map(|it| it.joined()),
            Some("DNS:a.example.com".to_string())
        );
        assert!(!needs_regeneration(
            &names_only,
            ExistingCsrSnapshot::from_pem(pem.as_bytes()).ok().as_ref()
        ));
    }

    #[test_tracing::test]
    fn test_traditional_pem_keys_sign() {
        let dir = tempfile::tempdir().unwrap();
        for (fixture, digest, alg) in [
            (include_str!("../testdata/rsa-pkcs1.pem"), "sha256", &PKCS_RSA_SHA256),
            (include_str!("../testdata/rsa-pkcs1.pem"), "sha512", &PKCS_RSA_SHA512),
            (include_str!("../testdata/ec-p256-sec1.pem"), "sha256", &PKCS_ECDSA_P256_SHA256),
            (include_str!("../testdata/ec-p384-sec1.pem"), "sha384", &PKCS_ECDSA_P384_SHA384),
        ] {
            let key = dir.path().join("traditional.pem");
            std::fs::write(&key, fixture).unwrap();
            let desired = desired(&key, digest);
            assert_eq!(signing_key(fixture, &desired).unwrap().algorithm(), alg);
            let pem = generate(&desired).unwrap();
            let snapshot = ExistingCsrSnapshot::from_pem(pem.as_bytes()).unwrap();
            assert!(!needs_regeneration(&desired, Some(&snapshot)));
        }
    }

    #[test]
    fn test_encoded_versions() {
        assert!(is_encoded_version(DEFAULT_VERSION));
        assert!(is_encoded_version(1));
        assert!(!is_encoded_version(2));
        assert!(!is_encoded_version(4));
    }
}
