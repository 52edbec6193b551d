//! # minihttpd - Entry Point
//! src/main.rs
//!
//! Lee la configuración, instala el logging y las señales, y corre el
//! servidor hasta recibir SIGINT/SIGTERM.

use minihttpd::config::Config;
use minihttpd::server::Server;
use minihttpd::tls::CertProvisioner;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    let config = Config::new();

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    config.log_summary();

    if config.tls && config.generate_cert {
        if let Err(e) = CertProvisioner::default().ensure(&config.cert_file, &config.key_file) {
            error!(error = %e, "failed to provision TLS certificate");
            std::process::exit(1);
        }
    }

    let server = match Server::bind(config) {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "failed to start server");
            std::process::exit(1);
        }
    };

    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("received shutdown signal");
        shutdown.shutdown();
    }) {
        error!(error = %e, "failed to install signal handler");
        std::process::exit(1);
    }

    if let Err(e) = server.run() {
        error!(error = %e, "server error");
        std::process::exit(1);
    }
}
