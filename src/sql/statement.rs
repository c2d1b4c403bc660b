//! INSERT generation for the latency table.

use crate::model::CanonicalRow;
use chrono::{Local, NaiveDateTime, Timelike};
use std::fmt;

pub const COLUMN_COUNT: usize = 30;

/// Destination columns, in bind order.
pub const COLUMNS: [&str; COLUMN_COUNT] = [
    "TestDate",
    "VMSize",
    "IsLinux",
    "OS_Distro",
    "AccelNetOn",
    "PlacementMode",
    "Msg_Size",
    "Iterations",
    "Duration_Sec",
    "Avg_Latency_usec",
    "std_Deviation",
    "Max_Latency_usec",
    "P59s_usec",
    "P49s_usec",
    "P39s_usec",
    "P99_usec",
    "P90_usec",
    "P50_usec",
    "P25_usec",
    "Min_Latency_usec",
    "Region",
    "OS_SKU",
    "PatchVersion",
    "ResourceGroup",
    "vmId",
    "vmSender",
    "vmReceiver",
    "TestTool",
    "isFullRTT",
    "RawDataFile",
];

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Bound as a typed NULL when unknown.
    NullableBool(Option<bool>),
    Timestamp(NaiveDateTime),
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Text(v) => write!(f, "{:?}", v),
            SqlValue::Int(v) => write!(f, "{}", v),
            SqlValue::Float(v) => write!(f, "{}", v),
            SqlValue::Bool(v) => write!(f, "{}", v),
            SqlValue::NullableBool(Some(v)) => write!(f, "{}", v),
            SqlValue::NullableBool(None) => write!(f, "NULL"),
            SqlValue::Timestamp(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// A single-row INSERT with its values kept apart from the statement text.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    table: String,
    pub values: [SqlValue; COLUMN_COUNT],
}

impl InsertStatement {
    /// Statement text with `$n` placeholders.
    pub fn sql(&self) -> String {
        let placeholders: Vec<String> = (1..=COLUMN_COUNT).map(|i| format!("${}", i)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            COLUMNS.join(", "),
            placeholders.join(", ")
        )
    }

    #[cfg(test)]
    pub fn value(&self, column: &str) -> Option<&SqlValue> {
        COLUMNS
            .iter()
            .position(|c| *c == column)
            .map(|idx| &self.values[idx])
    }
}

/// Column per line; the raw data is shown by size only.
impl fmt::Display for InsertStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "INSERT INTO {}", self.table)?;
        for (column, value) in COLUMNS.iter().zip(self.values.iter()) {
            match value {
                SqlValue::Text(raw) if *column == "RawDataFile" => {
                    writeln!(f, "  {} = <{} bytes>", column, raw.len())?
                }
                _ => writeln!(f, "  {} = {}", column, value)?,
            }
        }
        Ok(())
    }
}

/// Generate the INSERT for `row`, dated now (local time, whole seconds).
pub fn generate(table: &str, row: &CanonicalRow) -> InsertStatement {
    generate_at(table, row, Local::now().naive_local())
}

pub fn generate_at(table: &str, row: &CanonicalRow, now: NaiveDateTime) -> InsertStatement {
    let test_date = now.with_nanosecond(0).unwrap_or(now);
    let text = |v: &String| SqlValue::Text(v.clone());

    InsertStatement {
        table: table.to_string(),
        values: [
            SqlValue::Timestamp(test_date),
            text(&row.vm_size),
            SqlValue::NullableBool(row.is_linux),
            text(&row.os_distro),
            SqlValue::Bool(row.accel_net_on),
            text(&row.placement_mode),
            SqlValue::Int(row.msg_size),
            SqlValue::Int(row.iterations),
            SqlValue::Float(row.duration_sec),
            SqlValue::Float(row.avg_latency_usec),
            SqlValue::Float(row.std_deviation),
            SqlValue::Float(row.max_latency_usec),
            SqlValue::Float(row.p59s_usec),
            SqlValue::Float(row.p49s_usec),
            SqlValue::Float(row.p39s_usec),
            SqlValue::Float(row.p99_usec),
            SqlValue::Float(row.p90_usec),
            SqlValue::Float(row.p50_usec),
            SqlValue::Float(row.p25_usec),
            SqlValue::Float(row.min_latency_usec),
            text(&row.region),
            text(&row.os_sku),
            text(&row.patch_version),
            text(&row.resource_group),
            text(&row.vm_id),
            text(&row.vm_sender),
            text(&row.vm_receiver),
            text(&row.test_tool),
            SqlValue::Bool(row.is_full_rtt),
            text(&row.raw_data_file),
        ],
    }
}
