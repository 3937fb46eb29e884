use der::asn1::AnyRef;
use der::{Decode, Encode};
use pkcs8::{AlgorithmIdentifierRef, ObjectIdentifier, PrivateKeyInfo};
use sec1::EcPrivateKey;

const PKCS8_LABEL: &str = "PRIVATE KEY";
const PKCS1_LABEL: &str = "RSA PRIVATE KEY";
const SEC1_LABEL: &str = "EC PRIVATE KEY";

const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");

/// Re-encodes a PEM private key as PKCS#8 PEM.
///
/// Traditional `RSA PRIVATE KEY` (PKCS#1) and `EC PRIVATE KEY` (SEC1) files
/// are wrapped into a `PrivateKeyInfo`. PKCS#8 input is returned unchanged.
pub(crate) fn to_pkcs8_pem(key_pem: &str) -> Result<String, String> {
    let pem = pem::parse(key_pem).map_err(|err| err.to_string())?;
    let der = match pem.tag() {
        PKCS8_LABEL => return Ok(key_pem.to_string()),
        PKCS1_LABEL => wrap(RSA_ENCRYPTION, Some(AnyRef::NULL), pem.contents())?,
        SEC1_LABEL => sec1_to_pkcs8(pem.contents())?,
        other => return Err(format!("unsupported PEM label \"{other}\"")),
    };
    Ok(pem::encode(&pem::Pem::new(PKCS8_LABEL, der)))
}

fn sec1_to_pkcs8(sec1_der: &[u8]) -> Result<Vec<u8>, String> {
    let key = EcPrivateKey::from_der(sec1_der).map_err(|err| err.to_string())?;
    let curve = key
        .parameters
        .and_then(|it| it.named_curve())
        .ok_or("EC private key does not name its curve")?;
    // the curve moves to the outer algorithm identifier
    let inner = EcPrivateKey {
        private_key: key.private_key,
        parameters: None,
        public_key: key.public_key,
    }
    .to_der()
    .map_err(|err| err.to_string())?;
    wrap(EC_PUBLIC_KEY, Some(AnyRef::from(&curve)), &inner)
}

fn wrap(
    oid: ObjectIdentifier,
    parameters: Option<AnyRef<'_>>,
    private_key: &[u8],
) -> Result<Vec<u8>, String> {
    PrivateKeyInfo::new(AlgorithmIdentifierRef { oid, parameters }, private_key)
        .to_der()
        .map_err(|err| err.to_string())
}
