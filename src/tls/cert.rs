//! # Provisión de Certificados
//! src/tls/cert.rs
//!
//! Genera un par clave/certificado autofirmado con `openssl` cuando falta
//! alguno de los dos archivos. Si ya existen, no se tocan. Un par a medias
//! cuenta como ausente: se regenera entero y el archivo presente se
//! sobrescribe sólo si la generación llega a escribirlo.
//!
//! ```text
//! openssl genrsa -out server.key 2048
//! openssl req -new -x509 -key server.key -out server.crt -days 365 -subj ...
//! ```

use super::TlsError;
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{info, warn};

/// Subject del certificado autofirmado
pub const DEFAULT_SUBJECT: &str = "/C=US/ST=State/L=City/O=Organization/CN=localhost";

/// Invoca la herramienta externa que genera el material TLS
#[derive(Debug, Clone)]
pub struct CertProvisioner {
    program: String,
    subject: String,
    days: u32,
}

impl Default for CertProvisioner {
    fn default() -> Self {
        Self {
            program: "openssl".to_string(),
            subject: DEFAULT_SUBJECT.to_string(),
            days: 365,
        }
    }
}

impl CertProvisioner {
    /// Usa otro ejecutable en vez de `openssl`
    pub fn with_program(mut self, program: &str) -> Self {
        self.program = program.to_string();
        self
    }

    /// Se asegura de que existan `cert` y `key`
    ///
    /// Si la generación falla, borra sólo los archivos que creó esta misma
    /// corrida; lo que ya estaba en disco antes se conserva.
    pub fn ensure(&self, cert: &Path, key: &Path) -> Result<(), TlsError> {
        let cert_existed = cert.exists();
        let key_existed = key.exists();
        if cert_existed && key_existed {
            info!(cert = %cert.display(), key = %key.display(), "using existing TLS certificate");
            return Ok(());
        }

        info!(cert = %cert.display(), "generating self-signed TLS certificate");

        match self.generate(cert, key) {
            Ok(()) => {
                info!(cert = %cert.display(), key = %key.display(), "TLS certificate generated");
                Ok(())
            }
            Err(e) => {
                if !key_existed {
                    remove_partial(key);
                }
                if !cert_existed {
                    remove_partial(cert);
                }
                Err(e)
            }
        }
    }

    fn generate(&self, cert: &Path, key: &Path) -> Result<(), TlsError> {
        let key_arg = key.to_string_lossy();
        let cert_arg = cert.to_string_lossy();
        let days = self.days.to_string();

        self.run(&["genrsa", "-out", &key_arg, "2048"])?;
        self.run(&[
            "req", "-new", "-x509", "-key", &key_arg, "-out", &cert_arg, "-days", &days, "-subj",
            &self.subject,
        ])?;

        if !key.exists() || !cert.exists() {
            return Err(TlsError::Provisioning(format!(
                "{} did not produce {} and {}",
                self.program,
                key.display(),
                cert.display()
            )));
        }
        Ok(())
    }

    fn run(&self, args: &[&str]) -> Result<(), TlsError> {
        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| TlsError::Provisioning(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TlsError::Provisioning(format!(
                "{} {} exited with {}: {}",
                self.program,
                args.first().copied().unwrap_or_default(),
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

fn remove_partial(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "failed to remove partial TLS file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existing_files_are_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("server.crt");
        let key = dir.path().join("server.key");
        fs::write(&cert, "cert").unwrap();
        fs::write(&key, "key").unwrap();

        CertProvisioner::default()
            .with_program("/nonexistent/openssl")
            .ensure(&cert, &key)
            .unwrap();

        assert_eq!(fs::read_to_string(&cert).unwrap(), "cert");
        assert_eq!(fs::read_to_string(&key).unwrap(), "key");
    }

    #[test]
    fn test_missing_program_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("server.crt");
        let key = dir.path().join("server.key");

        let result = CertProvisioner::default()
            .with_program("/nonexistent/openssl")
            .ensure(&cert, &key);

        assert!(matches!(result, Err(TlsError::Provisioning(_))));
        assert!(!cert.exists());
        assert!(!key.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_program_that_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("server.crt");
        let key = dir.path().join("server.key");

        let err = CertProvisioner::default()
            .with_program("true")
            .ensure(&cert, &key)
            .unwrap_err();

        assert!(err.to_string().contains("did not produce"));
    }

    // Sólo falta la clave: el certificado del usuario sobrevive al fallo
    #[cfg(unix)]
    #[test]
    fn test_failure_keeps_preexisting_certificate() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("server.crt");
        let key = dir.path().join("server.key");
        fs::write(&cert, "user cert").unwrap();

        let result = CertProvisioner::default().with_program("false").ensure(&cert, &key);

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&cert).unwrap(), "user cert");
        assert!(!key.exists());
    }

    // `true` no escribe nada; la clave que sí existía tampoco se borra
    #[cfg(unix)]
    #[test]
    fn test_failure_keeps_preexisting_key() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("server.crt");
        let key = dir.path().join("server.key");
        fs::write(&key, "user key").unwrap();

        let result = CertProvisioner::default().with_program("true").ensure(&cert, &key);

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&key).unwrap(), "user key");
        assert!(!cert.exists());
    }
}
