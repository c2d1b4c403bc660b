//! Run configuration and lookup of the small side files (resource group,
//! credentials) that live next to the benchmark scripts.

use anyhow::bail;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Destination table when `--table` is not given.
pub const DEFAULT_TABLE: &str = "Tbl_VnetLatency";

/// Instance metadata endpoint, version-pinned.
pub const DEFAULT_METADATA_URL: &str =
    "http://169.254.169.254/metadata/instance?api-version=2017-04-02";

/// Install location used by the benchmark provisioning scripts.
const INSTALL_DIR: &str = "/usr/local/bin";

/// Everything a pipeline stage may need to know about this invocation.
#[derive(Debug, Clone)]
pub struct Config {
    pub table: String,
    pub verbose: bool,
    pub dry_run: bool,
    pub metadata_url: String,
    /// Searched in order; first hit wins.
    pub search_dirs: Vec<PathBuf>,
}

impl Config {
    pub fn new(
        table: String,
        verbose: bool,
        dry_run: bool,
        metadata_url: String,
        search_dirs: Vec<PathBuf>,
    ) -> anyhow::Result<Self> {
        validate_table_name(&table)?;
        let search_dirs = if search_dirs.is_empty() {
            default_search_dirs()
        } else {
            search_dirs
        };
        Ok(Self {
            table,
            verbose,
            dry_run,
            metadata_url,
            search_dirs,
        })
    }
}

/// Current directory, the install directory, then the executable's directory.
pub fn default_search_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![PathBuf::from("."), PathBuf::from(INSTALL_DIR)];
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir);
    }
    dirs
}

/// Return the first `dir/name` that exists as a regular file.
pub fn locate_config_file(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// The table name is spliced into the statement text, so it must be a bare
/// (optionally schema-qualified) identifier.
fn validate_table_name(table: &str) -> anyhow::Result<()> {
    let re = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")?;
    if !re.is_match(table) {
        bail!("invalid table name: {:?}", table);
    }
    Ok(())
}
