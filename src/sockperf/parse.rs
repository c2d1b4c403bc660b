use crate::sockperf::metrics::ParsedMetrics;
use anyhow::{Context, anyhow};
use log::{debug, warn};
use std::fs;
use std::path::Path;

/// Name recorded for runs whose output this module understands.
pub const TEST_TOOL: &str = "SockPerf";

/// Every line sockperf itself prints starts with this.
const PREFIX: &str = "sockperf:";
const STAT_MARKER: &str = "sockperf: ---> ";
const PERCENTILE_MARKER: &str = "sockperf: ---> percentile";
const MAX_MARKER: &str = "sockperf: ---> <MAX>";
const VALID_DURATION_MARKER: &str = "sockperf: [Valid Duration] ";

/// Parse a sockperf client output file.
///
/// Expected lines (other lines are ignored):
///
/// ```text
/// sockperf: [Valid Duration] RunTime=10.000 sec; SentMessages=81719; ReceivedMessages=81719
/// sockperf: ====> avg-lat= 61.130 (std-dev=12.447)
/// sockperf: Total 81719 observations; each percentile contains 817.19 observations
/// sockperf: ---> <MAX> observation =  437.625
/// sockperf: ---> percentile 99.999 =  424.113
/// sockperf: ---> <MIN> observation =   40.384
/// ```
pub fn parse_log_file(path: &Path) -> anyhow::Result<ParsedMetrics> {
    let bytes = fs::read(path).with_context(|| format!("read sockperf output {}", path.display()))?;
    Ok(parse_log(&String::from_utf8_lossy(&bytes)))
}

/// Scan sockperf output text. Never fails: lines that look like a known
/// shape but cannot be read are skipped with a warning.
pub fn parse_log(text: &str) -> ParsedMetrics {
    let mut out = ParsedMetrics::default();
    let mut recognized = 0usize;
    let mut skipped = 0usize;

    for (lineno, line) in text.lines().enumerate() {
        let lno = lineno + 1;
        let line = line.trim_end();

        if !line.starts_with(PREFIX) {
            if !line.trim().is_empty() {
                debug!("unrecognized input at line {}: {:?}", lno, line);
            }
            continue;
        }
        out.test_tool.get_or_insert_with(|| TEST_TOOL.to_string());

        match parse_line(line, &mut out) {
            Ok(true) => recognized += 1,
            Ok(false) => {}
            Err(e) => {
                warn!("skipping malformed sockperf line {}: {:#}", lno, e);
                skipped += 1;
            }
        }
    }

    debug!(
        "sockperf output: {} lines recognized, {} skipped: {:?}",
        recognized, skipped, out
    );
    out
}

/// Returns whether the line carried any metric.
fn parse_line(line: &str, out: &mut ParsedMetrics) -> anyhow::Result<bool> {
    let mut matched = false;

    if line.starts_with(STAT_MARKER) {
        let value = last_token(line)?;
        if line.starts_with(PERCENTILE_MARKER) {
            let label = line
                .split_whitespace()
                .nth(3)
                .ok_or_else(|| anyhow!("percentile line without a label"))?;
            out.percentiles.insert(label.to_string(), value);
        } else if line.starts_with(MAX_MARKER) {
            out.max_latency = Some(value);
        } else {
            out.min_latency = Some(value);
        }
        matched = true;
    }

    if line.contains("observations") {
        let count = line
            .split_whitespace()
            .nth(2)
            .ok_or_else(|| anyhow!("observations line without a count"))?;
        out.observations = Some(count.to_string());
        return Ok(true);
    }

    if line.starts_with(VALID_DURATION_MARKER) {
        parse_valid_duration(line, out)?;
        matched = true;
    }

    if line.contains("avg-lat") {
        parse_average(line, "avg-lat", out)?;
        out.round_trip = false;
        matched = true;
    }

    if line.contains("avg-rtt") {
        parse_average(line, "avg-rtt", out)?;
        out.round_trip = true;
        matched = true;
    }

    Ok(matched)
}

fn last_token(line: &str) -> anyhow::Result<String> {
    line.split_whitespace()
        .last()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("empty line"))
}

/// `[Valid Duration] RunTime=12.000 sec; SentMessages=500; ReceivedMessages=499;`
///
/// Splitting on `=` then `;` leaves the three values at positions 1, 3 and 5.
fn parse_valid_duration(line: &str, out: &mut ParsedMetrics) -> anyhow::Result<()> {
    let fields: Vec<&str> = line
        .split('=')
        .flat_map(|segment| segment.split(';'))
        .map(str::trim)
        .collect();

    let field = |idx: usize, name: &str| {
        fields
            .get(idx)
            .copied()
            .filter(|f| !f.is_empty())
            .ok_or_else(|| anyhow!("valid duration line has no {}", name))
    };

    // "12.000 sec" -> "12.000"
    let run_time = field(1, "RunTime")?
        .split_whitespace()
        .next()
        .ok_or_else(|| anyhow!("valid duration line has no RunTime"))?;
    let sent = field(3, "SentMessages")?;
    let received = field(5, "ReceivedMessages")?;

    out.run_time = Some(run_time.to_string());
    out.sent_messages = Some(sent.to_string());
    out.received_messages = Some(received.to_string());
    Ok(())
}

/// `avg-lat= 61.130 (std-dev=12.447)` or `avg-lat=123.456 (std-dev=20.001)`.
fn parse_average(line: &str, key: &str, out: &mut ParsedMetrics) -> anyhow::Result<()> {
    let marker = format!("{}=", key);
    let start = line
        .find(&marker)
        .ok_or_else(|| anyhow!("{} without a value", key))?
        + marker.len();
    let rest = &line[start..];

    // sockperf prints `%7.3lf`: below 100 usec the value is space padded after
    // `=`, from 100 usec up it follows `=` directly.
    let value = match rest.strip_prefix(' ') {
        Some(padded) => padded.trim_start(),
        None => rest,
    };
    let value = value
        .split([' ', '('])
        .next()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow!("{} without a value", key))?;

    let std_dev = line
        .split_once("std-dev=")
        .and_then(|(_, tail)| tail.split([')', ',']).next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow!("{} line without std-dev", key))?;

    out.avg_latency = Some(value.to_string());
    out.std_deviation = Some(std_dev.to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    const ONE_WAY_RUN: &str = "\
sockperf: == version #3.7-no.git ==
sockperf[CLIENT] send on:sockperf: using recvfrom() to block on socket(s)

[ 0] IP = 10.0.0.5        PORT = 12345 # TCP
sockperf: Warmup stage (sending a few dummy messages)...
sockperf: Starting test...
sockperf: Test end (interrupted by timer)
sockperf: Test ended
sockperf: [Total Run] RunTime=10.100 sec; Warm up time=400 msec; SentMessages=82534; ReceivedMessages=82533
sockperf: ========= Printing statistics for Server No: 0
sockperf: [Valid Duration] RunTime=10.000 sec; SentMessages=81719; ReceivedMessages=81719
sockperf: ====> avg-lat= 61.130 (std-dev=12.447)
sockperf: # dropped messages = 0; # duplicated messages = 0; # out-of-order messages = 0
sockperf: Summary: Latency is 61.130 usec
sockperf: Total 81719 observations; each percentile contains 817.19 observations
sockperf: ---> <MAX> observation =  437.625
sockperf: ---> percentile 99.999 =  424.113
sockperf: ---> percentile 99.990 =  299.384
sockperf: ---> percentile 99.900 =  167.823
sockperf: ---> percentile 99.000 =  111.451
sockperf: ---> percentile 90.000 =   74.512
sockperf: ---> percentile 75.000 =   64.844
sockperf: ---> percentile 50.000 =   58.513
sockperf: ---> percentile 25.000 =   54.246
sockperf: ---> <MIN> observation =   40.384
";

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn parses_complete_one_way_run() {
        let metrics = parse_log(ONE_WAY_RUN);

        let percentiles: BTreeMap<String, String> = [
            ("99.999", "424.113"),
            ("99.990", "299.384"),
            ("99.900", "167.823"),
            ("99.000", "111.451"),
            ("90.000", "74.512"),
            ("75.000", "64.844"),
            ("50.000", "58.513"),
            ("25.000", "54.246"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        assert_eq!(
            metrics,
            ParsedMetrics {
                test_tool: s("SockPerf"),
                observations: s("81719"),
                run_time: s("10.000"),
                sent_messages: s("81719"),
                received_messages: s("81719"),
                avg_latency: s("61.130"),
                std_deviation: s("12.447"),
                round_trip: false,
                percentiles,
                max_latency: s("437.625"),
                min_latency: s("40.384"),
            }
        );
    }

    #[test]
    fn unpadded_average_is_extracted() {
        let metrics = parse_log("sockperf: ====> avg-lat=12.345 usec (std-dev=1.002)\n");
        assert_eq!(metrics.avg_latency, s("12.345"));
        assert_eq!(metrics.std_deviation, s("1.002"));
    }

    #[test]
    fn three_digit_average_without_padding() {
        let metrics = parse_log("sockperf: ====> avg-lat=123.456 (std-dev=20.001)\n");
        assert_eq!(metrics.avg_latency, s("123.456"));
        assert_eq!(metrics.std_deviation, s("20.001"));
    }

    #[test]
    fn single_digit_average_with_wide_padding() {
        let metrics = parse_log("sockperf: ====> avg-lat=  5.125 (std-dev=0.512)\n");
        assert_eq!(metrics.avg_latency, s("5.125"));
    }

    #[test]
    fn percentile_labels_map_to_trailing_values() {
        let metrics = parse_log(ONE_WAY_RUN);
        for (label, value) in [
            ("99.999", "424.113"),
            ("99.990", "299.384"),
            ("99.900", "167.823"),
            ("99.000", "111.451"),
            ("90.000", "74.512"),
            ("50.000", "58.513"),
            ("25.000", "54.246"),
        ] {
            assert_eq!(metrics.percentile(label), Some(value), "percentile {}", label);
        }
    }

    #[test]
    fn valid_duration_line() {
        let metrics = parse_log(
            "sockperf: [Valid Duration] RunTime=12.000 sec; SentMessages=500; ReceivedMessages=499;\n",
        );
        assert_eq!(metrics.run_time, s("12.000"));
        assert_eq!(metrics.sent_messages, s("500"));
        assert_eq!(metrics.received_messages, s("499"));
    }

    #[test]
    fn round_trip_flag_follows_average_kind() {
        let one_way = parse_log("sockperf: ====> avg-lat= 61.130 (std-dev=12.447)\n");
        assert!(!one_way.round_trip);

        let round_trip = parse_log(
            "sockperf: ====> avg-rtt= 92.260 (std-dev=10.112, mean-ad=7.013, median-ad=5.960)\n",
        );
        assert!(round_trip.round_trip);
        assert_eq!(round_trip.avg_latency, s("92.260"));
        assert_eq!(round_trip.std_deviation, s("10.112"));
    }

    #[test]
    fn missing_lines_stay_unset() {
        let metrics = parse_log("sockperf: Starting test...\nnot sockperf output\n");
        assert_eq!(metrics.test_tool, s("SockPerf"));
        assert_eq!(metrics.avg_latency, None);
        assert_eq!(metrics.max_latency, None);
        assert!(metrics.percentiles.is_empty());

        let nothing = parse_log("ping: 64 bytes from 10.0.0.5\n");
        assert_eq!(nothing, ParsedMetrics::default());
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let metrics = parse_log(
            "sockperf: [Valid Duration] RunTime=\n\
             sockperf: ====> avg-lat= 61.130 (no deviation here)\n\
             sockperf: ---> <MIN> observation =   40.384\n",
        );
        assert_eq!(metrics.run_time, None);
        assert_eq!(metrics.avg_latency, None);
        assert_eq!(metrics.min_latency, s("40.384"));
    }

    #[test]
    fn reads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sockperf.out");
        fs::write(&path, ONE_WAY_RUN).unwrap();
        let metrics = parse_log_file(&path).unwrap();
        assert_eq!(metrics.observations, s("81719"));

        assert!(parse_log_file(&dir.path().join("missing.out")).is_err());
    }
}
