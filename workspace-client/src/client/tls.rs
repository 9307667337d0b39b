#[cfg(feature = "rustls-tls")]
pub mod rustls_tls {
    use std::sync::Arc;

    use rustls::{
        client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
        pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime},
        ClientConfig, DigitallySignedStruct, RootCertStore,
    };
    use thiserror::Error;

    /// Errors from Rustls.
    #[derive(Debug, Error)]
    pub enum Error {
        /// Identity PEM is invalid.
        #[error("identity PEM is invalid: {0}")]
        InvalidIdentityPem(#[source] std::io::Error),

        /// Identity PEM is missing a private key.
        #[error("identity PEM is missing a private key: the key must be PKCS8, SEC1, or PKCS1")]
        MissingPrivateKey,

        /// Identity PEM is missing a certificate.
        #[error("identity PEM is missing certificate")]
        MissingCertificate,

        /// Invalid private key.
        #[error("invalid private key: {0}")]
        InvalidPrivateKey(#[source] rustls::Error),

        /// Failed to add a root certificate.
        #[error("failed to add a root certificate: {0}")]
        AddRootCertificate(#[source] rustls::Error),
    }

    /// Create a [`rustls::ClientConfig`].
    pub fn rustls_client_config(
        identity_pem: Option<&[u8]>,
        root_certs: Option<&[Vec<u8>]>,
        accept_invalid: bool,
    ) -> Result<ClientConfig, Error> {
        let config_builder = ClientConfig::builder();
        let config_builder = if let Some(certs) = root_certs {
            config_builder.with_root_certificates(root_store(certs)?)
        } else {
            let mut roots = RootCertStore::empty();
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            config_builder.with_root_certificates(roots)
        };

        let mut client_config = if let Some((chain, pkey)) = identity_pem.map(client_auth).transpose()? {
            config_builder
                .with_client_auth_cert(chain, pkey)
                .map_err(Error::InvalidPrivateKey)?
        } else {
            config_builder.with_no_client_auth()
        };

        if accept_invalid {
            client_config
                .dangerous()
                .set_certificate_verifier(Arc::new(NoCertificateVerification));
        }
        Ok(client_config)
    }

    fn root_store(root_certs: &[Vec<u8>]) -> Result<RootCertStore, Error> {
        let mut root_store = RootCertStore::empty();
        for der in root_certs {
            root_store
                .add(CertificateDer::from(der.clone()))
                .map_err(Error::AddRootCertificate)?;
        }
        Ok(root_store)
    }

    fn client_auth(
        data: &[u8],
    ) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), Error> {
        let mut cert_chain = Vec::new();
        let mut private_key = None;
        let mut reader = std::io::Cursor::new(data);
        for item in rustls_pemfile::read_all(&mut reader) {
            use rustls_pemfile::Item;
            match item.map_err(Error::InvalidIdentityPem)? {
                Item::X509Certificate(cert) => cert_chain.push(cert),
                Item::Pkcs8Key(key) => private_key = Some(PrivateKeyDer::Pkcs8(key)),
                Item::Pkcs1Key(key) => private_key = Some(PrivateKeyDer::Pkcs1(key)),
                Item::Sec1Key(key) => private_key = Some(PrivateKeyDer::Sec1(key)),
                _ => continue,
            }
        }

        let private_key = private_key.ok_or(Error::MissingPrivateKey)?;
        if cert_chain.is_empty() {
            return Err(Error::MissingCertificate);
        }
        Ok((cert_chain, private_key))
    }

    #[derive(Debug)]
    struct NoCertificateVerification;

    impl ServerCertVerifier for NoCertificateVerification {
        fn verify_server_cert(
            &self,
            _end_entity: &CertificateDer<'_>,
            _intermediates: &[CertificateDer<'_>],
            _server_name: &ServerName<'_>,
            _ocsp_response: &[u8],
            _now: UnixTime,
        ) -> Result<ServerCertVerified, rustls::Error> {
            Ok(ServerCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            _message: &[u8],
            _cert: &CertificateDer<'_>,
            _dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, rustls::Error> {
            Ok(HandshakeSignatureValid::assertion())
        }

        fn verify_tls13_signature(
            &self,
            _message: &[u8],
            _cert: &CertificateDer<'_>,
            _dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, rustls::Error> {
            Ok(HandshakeSignatureValid::assertion())
        }

        fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
            rustls::crypto::ring::default_provider()
                .signature_verification_algorithms
                .supported_schemes()
        }
    }
}
