use crate::error::ConfigError;

/// Extract the `CERTIFICATE`-tagged PEM blocks from a PEM bundle.
pub fn certs(data: &[u8]) -> Result<Vec<Vec<u8>>, ConfigError> {
    let blocks = pem::parse_many(data).map_err(ConfigError::ParseCertificates)?;
    Ok(blocks
        .into_iter()
        .filter(|p| p.tag() == "CERTIFICATE")
        .map(|p| p.into_contents())
        .collect())
}
