//! TLS configuration and certificate loading
//!
//! Loads a PEM certificate chain and private key into a rustls server
//! config. Any failure here is a startup error; the process must not come
//! up half-configured with a broken HTTPS listener.

use std::fs::File;
use std::io::{self, BufReader};
use std::sync::Arc;

use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;

/// Build a TLS acceptor from PEM certificate chain and private key files
pub fn build_acceptor(cert_file: &str, key_file: &str) -> io::Result<TlsAcceptor> {
    let certs = load_certs(cert_file)?;
    let key = load_key(key_file)?;

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid certificate/key pair: {e}"),
            )
        })?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}

fn load_certs(path: &str) -> io::Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path)
        .map_err(|e| io::Error::new(e.kind(), format!("certificate file '{path}': {e}")))?;
    let certs: Vec<_> = rustls_pemfile::certs(&mut BufReader::new(file)).collect::<Result<_, _>>()?;
    if certs.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("no certificates found in '{path}'"),
        ));
    }
    Ok(certs)
}

fn load_key(path: &str) -> io::Result<PrivateKeyDer<'static>> {
    let file = File::open(path)
        .map_err(|e| io::Error::new(e.kind(), format!("private key file '{path}': {e}")))?;
    rustls_pemfile::private_key(&mut BufReader::new(file))?.ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("no private key found in '{path}'"),
        )
    })
}
