use admission_server::{
    AdmissionServer,
    config::{Config, TlsConfig},
};
use axum::Router;
use rcgen::{CertifiedKey, generate_simple_self_signed};
use std::{net::SocketAddr, time::Duration};
use tempfile::TempDir;

pub(crate) fn default_test_config(certs_dir: &TempDir) -> Config {
    let CertifiedKey { cert, signing_key } =
        generate_simple_self_signed(vec!["gateway-admission.default.svc".to_owned()]).unwrap();
    let cert_file = certs_dir.path().join("tls.crt");
    let key_file = certs_dir.path().join("tls.key");
    std::fs::write(&cert_file, cert.pem()).unwrap();
    std::fs::write(&key_file, signing_key.serialize_pem()).unwrap();

    Config {
        addr: SocketAddr::from(([127, 0, 0, 1], 8443)),
        tls_config: TlsConfig {
            cert_file,
            key_file,
        },
        shutdown_timeout: Duration::from_secs(5),
        log_level: "info".to_owned(),
        log_fmt: "json".to_owned(),
        log_no_color: false,
    }
}

pub(crate) async fn app() -> Router {
    let certs_dir = tempfile::tempdir().unwrap();
    let config = default_test_config(&certs_dir);

    let server = AdmissionServer::new_from_config(config).await.unwrap();

    server.router()
}
