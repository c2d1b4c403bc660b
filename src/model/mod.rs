//! Summary row model: merge run parameters and sockperf metrics into the
//! columns of the latency table.

pub mod params;
pub mod raw;

pub use params::RunParameters;

use crate::sockperf::ParsedMetrics;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("sockperf output has no value for {0}")]
    MissingField(&'static str),
    #[error("{column} is not a number: {value:?}")]
    NotANumber { column: &'static str, value: String },
    #[error("read raw data file {}: {source}", .path.display())]
    RawData {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One row of the latency table, minus the test date which is stamped when
/// the statement is generated. Fields are named after their columns.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRow {
    pub vm_size: String,
    /// Unknown when the metadata service did not answer.
    pub is_linux: Option<bool>,
    pub os_distro: String,
    pub accel_net_on: bool,
    pub placement_mode: String,
    pub msg_size: i64,
    pub iterations: i64,
    pub duration_sec: f64,
    pub avg_latency_usec: f64,
    pub std_deviation: f64,
    pub max_latency_usec: f64,
    /// 99.999th percentile.
    pub p59s_usec: f64,
    /// 99.990th percentile.
    pub p49s_usec: f64,
    /// 99.900th percentile.
    pub p39s_usec: f64,
    pub p99_usec: f64,
    pub p90_usec: f64,
    pub p50_usec: f64,
    pub p25_usec: f64,
    pub min_latency_usec: f64,
    pub region: String,
    pub os_sku: String,
    pub patch_version: String,
    pub resource_group: String,
    pub vm_id: String,
    pub vm_sender: String,
    pub vm_receiver: String,
    pub test_tool: String,
    pub is_full_rtt: bool,
    pub raw_data_file: String,
}

/// Build the row for one run, reading the raw output file for `RawDataFile`.
pub fn normalize(
    params: &RunParameters,
    metrics: &ParsedMetrics,
) -> Result<CanonicalRow, NormalizeError> {
    let raw_data_file =
        raw::inline_raw_data(&params.input_file).map_err(|source| NormalizeError::RawData {
            path: params.input_file.clone(),
            source,
        })?;
    build_row(params, metrics, raw_data_file)
}

/// Pure part of [`normalize`].
pub fn build_row(
    params: &RunParameters,
    metrics: &ParsedMetrics,
    raw_data_file: String,
) -> Result<CanonicalRow, NormalizeError> {
    let percentile = |label: &str, column: &'static str| float(metrics.percentile(label), column);

    Ok(CanonicalRow {
        vm_size: params.host.vm_size.clone(),
        is_linux: os_family_flag(&params.host.is_linux),
        os_distro: params.host.os_distro.clone(),
        accel_net_on: params.accel_net,
        placement_mode: params.placement_mode.clone(),
        msg_size: i64::from(params.msg_size),
        iterations: integer(metrics.observations.as_deref(), "Iterations")?,
        duration_sec: float(metrics.run_time.as_deref(), "Duration_Sec")?,
        avg_latency_usec: float(metrics.avg_latency.as_deref(), "Avg_Latency_usec")?,
        std_deviation: float(metrics.std_deviation.as_deref(), "std_Deviation")?,
        max_latency_usec: float(metrics.max_latency.as_deref(), "Max_Latency_usec")?,
        p59s_usec: percentile("99.999", "P59s_usec")?,
        p49s_usec: percentile("99.990", "P49s_usec")?,
        p39s_usec: percentile("99.900", "P39s_usec")?,
        p99_usec: percentile("99.000", "P99_usec")?,
        p90_usec: percentile("90.000", "P90_usec")?,
        p50_usec: percentile("50.000", "P50_usec")?,
        p25_usec: percentile("25.000", "P25_usec")?,
        min_latency_usec: float(metrics.min_latency.as_deref(), "Min_Latency_usec")?,
        region: params.host.region.clone(),
        os_sku: params.host.os_sku.clone(),
        patch_version: params.patch_version.clone(),
        resource_group: params.resource_group.clone(),
        vm_id: params.host.vm_id.clone(),
        vm_sender: params.vm_sender.clone(),
        vm_receiver: params.vm_receiver.clone(),
        test_tool: required(metrics.test_tool.as_deref(), "TestTool")?.to_string(),
        is_full_rtt: metrics.round_trip,
        raw_data_file,
    })
}

/// "True"/"False" as reported by the metadata gatherer; anything else is unknown.
fn os_family_flag(value: &str) -> Option<bool> {
    match value {
        "True" => Some(true),
        "False" => Some(false),
        _ => None,
    }
}

fn required<'a>(value: Option<&'a str>, column: &'static str) -> Result<&'a str, NormalizeError> {
    value.ok_or(NormalizeError::MissingField(column))
}

fn float(value: Option<&str>, column: &'static str) -> Result<f64, NormalizeError> {
    let value = required(value, column)?;
    value.parse().map_err(|_| NormalizeError::NotANumber {
        column,
        value: value.to_string(),
    })
}

fn integer(value: Option<&str>, column: &'static str) -> Result<i64, NormalizeError> {
    let value = required(value, column)?;
    value.parse().map_err(|_| NormalizeError::NotANumber {
        column,
        value: value.to_string(),
    })
}
