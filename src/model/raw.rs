//! Inlining of the raw sockperf output into the summary row.

use log::warn;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Largest raw output stored verbatim; longer files are cut to this size.
pub const RAW_DATA_CEILING: u64 = 6 * 1024;

/// Contents of the raw output, at most [`RAW_DATA_CEILING`] bytes.
pub fn inline_raw_data(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    let size = file.metadata()?.len();

    let mut bytes = Vec::with_capacity(size.min(RAW_DATA_CEILING) as usize);
    file.take(RAW_DATA_CEILING).read_to_end(&mut bytes)?;

    let truncated = size > RAW_DATA_CEILING;
    if truncated {
        warn!(
            "{} is {} bytes, storing only the first {}",
            path.display(),
            size,
            RAW_DATA_CEILING
        );
    }
    Ok(into_text(bytes, truncated))
}

fn into_text(mut bytes: Vec<u8>, truncated: bool) -> String {
    // Drop a multi-byte character split by the cut.
    if truncated {
        if let Err(e) = std::str::from_utf8(&bytes) {
            if e.error_len().is_none() {
                bytes.truncate(e.valid_up_to());
            }
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}
