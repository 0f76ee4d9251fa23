use std::sync::OnceLock;

use tracing::debug;

/// Install the aws-lc-rs rustls provider once per process.
///
/// reqwest is built with `rustls-tls-webpki-roots-no-provider`, so a
/// CryptoProvider must be installed before the first TLS connection.
pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Safe to ignore: can happen if another crate installed it first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}
