//! Connection settings for the SQL Server pool.

use std::fmt;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

/// Everything the pool needs to open and manage connections.
#[derive(Clone)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<SecretString>,
    /// Require TLS for the whole session (Azure SQL).
    pub encrypt: bool,
    /// Accept self-signed server certificates.
    pub trust_cert: bool,
    /// Maximum number of concurrently checked-out connections.
    pub pool_size: usize,
    pub query_timeout: Duration,
    pub acquire_timeout: Duration,
    /// Maximum connection attempts when opening a physical connection
    pub connect_retries: u32,
    /// Initial backoff duration, doubles on each retry
    pub connect_backoff: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1433,
            database: None,
            user: None,
            password: None,
            encrypt: false,
            trust_cert: false,
            pool_size: 10,
            query_timeout: Duration::from_secs(30),
            acquire_timeout: Duration::from_secs(30),
            connect_retries: 3,
            connect_backoff: Duration::from_millis(500),
        }
    }
}

impl ConnectionConfig {
    /// Build the driver configuration.
    pub fn to_tiberius(&self) -> tiberius::Config {
        let mut config = tiberius::Config::new();
        config.host(&self.host);
        config.port(self.port);
        config.application_name(env!("CARGO_PKG_NAME"));

        if let Some(ref database) = self.database {
            config.database(database);
        }

        if let Some(ref user) = self.user {
            let password = self
                .password
                .as_ref()
                .map(|p| p.expose_secret().to_string())
                .unwrap_or_default();
            config.authentication(tiberius::AuthMethod::sql_server(user, password));
        }

        if self.encrypt {
            config.encryption(tiberius::EncryptionLevel::Required);
        } else {
            config.encryption(tiberius::EncryptionLevel::Off);
        }

        if self.trust_cert {
            config.trust_cert();
        }

        config
    }

    /// Replace any occurrence of the configured password in `message`.
    ///
    /// Driver error text is forwarded to callers, so it must never carry the
    /// credential.
    pub fn sanitize(&self, message: &str) -> String {
        match self.password.as_ref().map(|p| p.expose_secret()) {
            Some(secret) if !secret.is_empty() => message.replace(secret, "*****"),
            _ => message.to_string(),
        }
    }
}

/// Mask all but the last three characters.
fn mask_password(password: &str) -> String {
    let tail: String = password
        .chars()
        .rev()
        .take(3)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("*****{tail}")
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field(
                "password",
                &self.password.as_ref().map(|p| mask_password(p.expose_secret())),
            )
            .field("encrypt", &self.encrypt)
            .field("trust_cert", &self.trust_cert)
            .field("pool_size", &self.pool_size)
            .field("query_timeout", &self.query_timeout)
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}
