use std::collections::BTreeMap;

/// Summary values scraped from one sockperf client run.
///
/// Values are the text tokens exactly as sockperf printed them; a field stays
/// `None` until a line carrying it has been seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedMetrics {
    /// Set once any `sockperf:` line is seen.
    pub test_tool: Option<String>,
    pub observations: Option<String>,
    pub run_time: Option<String>,
    pub sent_messages: Option<String>,
    pub received_messages: Option<String>,
    pub avg_latency: Option<String>,
    pub std_deviation: Option<String>,
    /// `avg-rtt` reports round trip, `avg-lat` one way.
    pub round_trip: bool,
    /// Percentile label (e.g. "99.900") to latency.
    pub percentiles: BTreeMap<String, String>,
    pub max_latency: Option<String>,
    pub min_latency: Option<String>,
}

impl ParsedMetrics {
    pub fn percentile(&self, label: &str) -> Option<&str> {
        self.percentiles.get(label).map(String::as_str)
    }
}
