//! Serving certificate generation for the front proxy (§4.F step 3): a leaf
//! certificate with SANs `{localhost, <hostIP>}` signed by the serving CA.

use ecdsa::elliptic_curve::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey};
use p256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use thiserror::Error;
use time::Duration;
use x509_cert::{
    builder::{Builder, CertificateBuilder, Profile},
    der::{asn1::Ia5String, DecodePem},
    ext::pkix::{name::GeneralName, SubjectAltName},
    name::Name,
    serial_number::SerialNumber,
    spki::SubjectPublicKeyInfoOwned,
    time::Validity,
    Certificate,
};

#[derive(Debug, Error)]
pub enum CertError {
    #[error("failed to parse subject name {subject:?}: {source}")]
    Subject { subject: String, source: x509_cert::der::Error },
    #[error("failed to parse validity window: {0}")]
    Validity(x509_cert::der::Error),
    #[error("{0:?} is not a valid DNS SAN")]
    SanDnsName(String),
    #[error("failed to build certificate: {0}")]
    Build(x509_cert::builder::Error),
    #[error("failed to encode or decode key material: {0}")]
    Key(String),
    #[error("failed to encode certificate to PEM: {0}")]
    Pem(#[from] x509_cert::der::Error),
}

const DEFAULT_LEAF_VALIDITY_SECS: u64 = Duration::days(365).whole_seconds() as u64;
const DEFAULT_CA_VALIDITY_SECS: u64 = Duration::days(3650).whole_seconds() as u64;

/// A PEM-encoded certificate and its private key, ready to be persisted.
pub struct CertificatePair {
    pub cert_pem: String,
    pub key_pem: String,
}

/// A self-signed certificate authority used to sign proxy-serving leaf certs.
pub struct ServingCa {
    cert: Certificate,
    signing_key: SigningKey,
}

impl ServingCa {
    /// Generate a fresh self-signed CA. Used when no external PKI supplies one.
    pub fn generate(subject: &str) -> Result<Self, CertError> {
        let signing_key = SigningKey::random(&mut OsRng);
        let name: Name = subject.parse().map_err(|source| CertError::Subject {
            subject: subject.to_owned(),
            source,
        })?;
        let serial_number = SerialNumber::from(rand::random::<u64>());
        let validity = Validity::from_now(std::time::Duration::from_secs(DEFAULT_CA_VALIDITY_SECS))
            .map_err(CertError::Validity)?;
        let spki = public_key_info(&signing_key)?;

        let builder =
            CertificateBuilder::new(Profile::Root, serial_number, validity, name, spki, &signing_key)
                .map_err(CertError::Build)?;

        let cert = builder.build().map_err(CertError::Build)?;
        Ok(ServingCa { cert, signing_key })
    }

    /// Load a CA from an existing PEM-encoded cert and PKCS#8 private key.
    pub fn from_pem(cert_pem: &str, key_pem: &str) -> Result<Self, CertError> {
        let cert = Certificate::from_pem(cert_pem.as_bytes())?;
        let signing_key =
            SigningKey::from_pkcs8_pem(key_pem).map_err(|e| CertError::Key(e.to_string()))?;
        Ok(ServingCa { cert, signing_key })
    }

    pub fn cert_pem(&self) -> Result<String, CertError> {
        use x509_cert::der::Encode;
        Ok(self.cert.to_der().map(|der| pem::encode(&pem::Pem::new("CERTIFICATE", der)))?)
    }

    pub fn key_pem(&self) -> Result<String, CertError> {
        Ok(self
            .signing_key
            .to_pkcs8_pem(Default::default())
            .map_err(|e| CertError::Key(e.to_string()))?
            .to_string())
    }

    /// Sign a leaf certificate for `subject` with the given DNS/IP SANs.
    pub fn sign_leaf(&self, subject: &str, sans: &[String]) -> Result<CertificatePair, CertError> {
        let leaf_key = SigningKey::random(&mut OsRng);
        let name: Name = subject.parse().map_err(|source| CertError::Subject {
            subject: subject.to_owned(),
            source,
        })?;
        let serial_number = SerialNumber::from(rand::random::<u64>());
        let validity = Validity::from_now(std::time::Duration::from_secs(DEFAULT_LEAF_VALIDITY_SECS))
            .map_err(CertError::Validity)?;
        let spki = public_key_info(&leaf_key)?;

        let mut builder = CertificateBuilder::new(
            Profile::Leaf {
                issuer: self.cert.tbs_certificate.subject.clone(),
                enable_key_agreement: false,
                enable_key_encipherment: true,
            },
            serial_number,
            validity,
            name,
            spki,
            &self.signing_key,
        )
        .map_err(CertError::Build)?;

        let general_names = sans.iter().map(|san| san_for(san)).collect::<Result<Vec<_>, CertError>>()?;
        builder
            .add_extension(&SubjectAltName(general_names))
            .map_err(CertError::Build)?;

        let certificate = builder.build().map_err(CertError::Build)?;
        use x509_cert::der::Encode;
        let cert_pem = pem::encode(&pem::Pem::new("CERTIFICATE", certificate.to_der()?));
        let key_pem = leaf_key
            .to_pkcs8_pem(Default::default())
            .map_err(|e| CertError::Key(e.to_string()))?
            .to_string();

        Ok(CertificatePair { cert_pem, key_pem })
    }
}

/// A DNS-name or dotted-quad SAN entry; dotted quads become `GeneralName::IpAddress`.
fn san_for(value: &str) -> Result<GeneralName, CertError> {
    if let Ok(ip) = value.parse::<std::net::IpAddr>() {
        let octets = match ip {
            std::net::IpAddr::V4(v4) => v4.octets().to_vec(),
            std::net::IpAddr::V6(v6) => v6.octets().to_vec(),
        };
        return Ok(GeneralName::IpAddress(x509_cert::der::asn1::OctetString::new(octets)?));
    }
    Ok(GeneralName::DnsName(
        Ia5String::new(value).map_err(|_| CertError::SanDnsName(value.to_owned()))?,
    ))
}

fn public_key_info(key: &SigningKey) -> Result<SubjectPublicKeyInfoOwned, CertError> {
    let pem = key
        .verifying_key()
        .to_public_key_pem(Default::default())
        .map_err(|e| CertError::Key(e.to_string()))?;
    Ok(SubjectPublicKeyInfoOwned::from_pem(pem.as_bytes())?)
}

/// The proxy's serving-certificate SAN set: `localhost` plus the advertised host IP.
pub fn serving_sans(host_ip: std::net::IpAddr) -> Vec<String> {
    vec!["localhost".to_owned(), host_ip.to_string()]
}

/// Discover the IP this host would use to reach the outside world, without
/// sending any traffic (a UDP "connect" only resolves a route).
pub fn local_host_ip() -> std::io::Result<std::net::IpAddr> {
    let socket = std::net::UdpSocket::bind("0.0.0.0:0")?;
    socket.connect("8.8.8.8:80")?;
    Ok(socket.local_addr()?.ip())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_self_signed_ca_and_leaf() {
        let ca = ServingCa::generate("CN=workspace-gateway-ca").unwrap();
        let pair = ca
            .sign_leaf("CN=workspace-proxy", &serving_sans(std::net::IpAddr::from([127, 0, 0, 1])))
            .unwrap();
        assert!(pair.cert_pem.contains("BEGIN CERTIFICATE"));
        assert!(pair.key_pem.contains("PRIVATE KEY"));
    }

    #[test]
    fn serving_sans_always_includes_localhost() {
        let sans = serving_sans(std::net::IpAddr::from([10, 0, 0, 5]));
        assert!(sans.iter().any(|s| s == "localhost"));
        assert!(sans.iter().any(|s| s == "10.0.0.5"));
    }
}
