use crate::config::locate_config_file;
use anyhow::Context;
use log::{debug, warn};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// One-line file holding the resource group name.
pub const RESOURCE_GROUP_FILE: &str = "resgrp.txt";

/// Resource group the VM belongs to. Never empty-handed: when the file is
/// missing the result names the missing file instead.
pub fn resource_group(dirs: &[PathBuf]) -> String {
    let Some(path) = locate_config_file(RESOURCE_GROUP_FILE, dirs) else {
        debug!("{} not found in {:?}", RESOURCE_GROUP_FILE, dirs);
        return not_found();
    };
    match read_first_line(&path) {
        Ok(name) => name,
        Err(e) => {
            warn!("{:#}", e);
            not_found()
        }
    }
}

fn not_found() -> String {
    format!("ResGrp.txt_NOT_FOUND_{}", RESOURCE_GROUP_FILE)
}

fn read_first_line(path: &Path) -> anyhow::Result<String> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut line = String::new();
    BufReader::new(file)
        .read_line(&mut line)
        .with_context(|| format!("read {}", path.display()))?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_everywhere_yields_sentinel() {
        let root = tempfile::tempdir().unwrap();
        let dirs: Vec<PathBuf> = ["cwd", "install", "exe"]
            .iter()
            .map(|name| root.path().join(name))
            .collect();
        for dir in &dirs {
            fs::create_dir(dir).unwrap();
        }
        assert_eq!(resource_group(&dirs), "ResGrp.txt_NOT_FOUND_resgrp.txt");
    }

    #[test]
    fn first_line_of_first_hit() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::write(second.path().join(RESOURCE_GROUP_FILE), "rg-second\n").unwrap();
        fs::write(
            first.path().join(RESOURCE_GROUP_FILE),
            "  rg-latency-westus2  \nsecond line\n",
        )
        .unwrap();

        let dirs = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        assert_eq!(resource_group(&dirs), "rg-latency-westus2");
    }
}
