use rcgen::{
    PKCS_ECDSA_P256_SHA256, PKCS_ECDSA_P384_SHA384, PKCS_ED25519, PKCS_RSA_SHA256,
    PKCS_RSA_SHA384, PKCS_RSA_SHA512, SignatureAlgorithm,
};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DigestAlgorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl FromStr for DigestAlgorithm {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "sha256" => Ok(DigestAlgorithm::Sha256),
            "sha384" => Ok(DigestAlgorithm::Sha384),
            "sha512" => Ok(DigestAlgorithm::Sha512),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyType {
    Rsa,
    EcdsaP256,
    EcdsaP384,
    Ed25519,
}

impl KeyType {
    /// Classifies the algorithm rcgen detected while loading a key.
    pub(crate) fn of(alg: &SignatureAlgorithm) -> Option<KeyType> {
        if alg == &PKCS_ED25519 {
            Some(KeyType::Ed25519)
        } else if alg == &PKCS_ECDSA_P256_SHA256 {
            Some(KeyType::EcdsaP256)
        } else if alg == &PKCS_ECDSA_P384_SHA384 {
            Some(KeyType::EcdsaP384)
        } else if [&PKCS_RSA_SHA256, &PKCS_RSA_SHA384, &PKCS_RSA_SHA512].contains(&alg) {
            Some(KeyType::Rsa)
        } else {
            None
        }
    }
}

/// The signature algorithm for a key type and digest, if the pair is usable.
/// Ed25519 hashes internally and accepts any known digest name.
pub(crate) fn signature_algorithm(
    key_type: KeyType,
    digest: DigestAlgorithm,
) -> Option<&'static SignatureAlgorithm> {
    match (key_type, digest) {
        (KeyType::Rsa, DigestAlgorithm::Sha256) => Some(&PKCS_RSA_SHA256),
        (KeyType::Rsa, DigestAlgorithm::Sha384) => Some(&PKCS_RSA_SHA384),
        (KeyType::Rsa, DigestAlgorithm::Sha512) => Some(&PKCS_RSA_SHA512),
        (KeyType::EcdsaP256, DigestAlgorithm::Sha256) => Some(&PKCS_ECDSA_P256_SHA256),
        (KeyType::EcdsaP384, DigestAlgorithm::Sha384) => Some(&PKCS_ECDSA_P384_SHA384),
        (KeyType::Ed25519, _) => Some(&PKCS_ED25519),
        _ => None,
    }
}
