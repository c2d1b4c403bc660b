use crate::config::locate_config_file;
use sqlx::postgres::PgConnectOptions;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Single-line `host:…,user:…,password:…,database:…` file.
pub const CREDENTIALS_FILE: &str = "connectionstring.txt";

#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    #[error("connectionstring.txt not found in any of {0:?}")]
    NotFound(Vec<PathBuf>),
    #[error("read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed credentials entry {0:?}, expected key:value")]
    Malformed(String),
    #[error("credentials have no {0:?} entry")]
    MissingKey(&'static str),
    #[error("invalid database port {0:?}")]
    InvalidPort(String),
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub host: String,
    pub port: Option<u16>,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

impl FromStr for Credentials {
    type Err = CredentialsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.replace(['\r', '\n'], "");
        let mut entries: HashMap<&str, &str> = HashMap::new();
        for item in line.split(',').map(str::trim).filter(|i| !i.is_empty()) {
            // Values may contain ':' (passwords), keys never do.
            let (key, value) = item
                .split_once(':')
                .ok_or_else(|| CredentialsError::Malformed(item.to_string()))?;
            entries.insert(key.trim(), value.trim());
        }

        let take = |key: &'static str| {
            entries
                .get(key)
                .map(|v| v.to_string())
                .ok_or(CredentialsError::MissingKey(key))
        };
        let port = entries
            .get("port")
            .map(|p| p.parse().map_err(|_| CredentialsError::InvalidPort(p.to_string())))
            .transpose()?;

        Ok(Credentials {
            host: take("host")?,
            port,
            user: take("user")?,
            password: take("password")?,
            database: take("database")?,
        })
    }
}

impl Credentials {
    pub fn connect_options(&self) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&self.host)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database);
        match self.port {
            Some(port) => options.port(port),
            None => options,
        }
    }
}

/// Find and parse the credentials file.
pub fn load_credentials(dirs: &[PathBuf]) -> Result<Credentials, CredentialsError> {
    let path = locate_config_file(CREDENTIALS_FILE, dirs)
        .ok_or_else(|| CredentialsError::NotFound(dirs.to_vec()))?;
    let text = std::fs::read_to_string(&path)
        .map_err(|source| CredentialsError::Read { path, source })?;
    text.parse()
}
