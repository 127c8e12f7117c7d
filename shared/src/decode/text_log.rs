//! Free-text log line dialect, the last resort of the detection chain.
//!
//! Each non-empty line must match:
//!
//! ```text
//! <timestamp> <host> <process>[<pid>]: <message>
//! ```
//!
//! where `<timestamp>` is RFC 3339 or `YYYY-MM-DD HH:MM:SS` (UTC) and
//! `[<pid>]` is optional. A leading level word in the message sets the
//! severity; otherwise it is `INFO`.

use super::{DecodeError, DecodedBatch, Dialect};
use crate::models::{LogLevel, LogRecord, TelemetryBatch, UNKNOWN};
use chrono::{DateTime, NaiveDateTime, Utc};
use nom::{
    branch::alt,
    bytes::complete::{take_till1, take_while_m_n},
    character::complete::{char, digit1, space0, space1},
    combinator::{map_res, opt, recognize, rest},
    sequence::delimited,
    IResult, Parser,
};

/// A parsed log line before conversion to a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine<'a> {
    /// Event time.
    pub timestamp: DateTime<Utc>,
    /// Emitting host.
    pub host: &'a str,
    /// Emitting process.
    pub process: &'a str,
    /// Process id, when present.
    pub pid: Option<&'a str>,
    /// Message text.
    pub message: &'a str,
}

fn rfc3339(input: &str) -> IResult<&str, DateTime<Utc>> {
    map_res(take_till1(|c: char| c.is_whitespace()), |s: &str| {
        DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
    })
    .parse(input)
}

fn plain_datetime(input: &str) -> IResult<&str, DateTime<Utc>> {
    let date = take_while_m_n(10, 10, |c: char| c.is_ascii_digit() || c == '-');
    let time = take_while_m_n(8, 8, |c: char| c.is_ascii_digit() || c == ':');
    map_res(recognize((date, char(' '), time)), |s: &str| {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|n| n.and_utc())
    })
    .parse(input)
}

fn timestamp(input: &str) -> IResult<&str, DateTime<Utc>> {
    alt((plain_datetime, rfc3339)).parse(input)
}

fn process_name(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c == '[' || c == ':' || c.is_whitespace()).parse(input)
}

/// Parses one log line.
///
/// # Errors
///
/// Returns a nom error if the line does not match the pattern.
pub fn parse_line(input: &str) -> IResult<&str, LogLine<'_>> {
    let (input, timestamp) = timestamp(input)?;
    let (input, _) = space1(input)?;
    let (input, host) = take_till1(|c: char| c.is_whitespace()).parse(input)?;
    let (input, _) = space1(input)?;
    let (input, process) = process_name(input)?;
    let (input, pid) = opt(delimited(char('['), digit1, char(']'))).parse(input)?;
    let (input, _) = char(':').parse(input)?;
    let (input, _) = space0(input)?;
    let (input, message) = rest(input)?;

    Ok((
        input,
        LogLine {
            timestamp,
            host,
            process,
            pid,
            message: message.trim_end(),
        },
    ))
}

fn severity_of(message: &str) -> LogLevel {
    message
        .split_whitespace()
        .next()
        .and_then(LogLevel::from_keyword)
        .unwrap_or_default()
}

impl LogLine<'_> {
    /// Converts the line into a canonical record.
    #[must_use]
    pub fn to_record(&self) -> LogRecord {
        let mut record = LogRecord::new(
            self.timestamp.timestamp_nanos_opt().unwrap_or(i64::MAX),
            severity_of(self.message).to_string(),
            self.message,
        )
        .with_attribute("host", self.host)
        .with_attribute("process", self.process)
        .with_tenant(UNKNOWN);
        if let Some(pid) = self.pid {
            record = record.with_attribute("pid", pid);
        }
        record
    }
}

/// Decodes a body of newline-separated log lines.
///
/// # Errors
///
/// Returns an error if the body is not UTF-8, holds no lines, or any
/// non-empty line fails to parse.
pub fn decode(body: &[u8]) -> Result<DecodedBatch, DecodeError> {
    let dialect = Dialect::TextLog;
    let text = std::str::from_utf8(body).map_err(|e| DecodeError::mismatch(dialect, e))?;

    let mut records = Vec::new();
    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let (_, parsed) = parse_line(line).map_err(|_| {
            DecodeError::mismatch(dialect, format!("line {} does not match", index + 1))
        })?;
        records.push(parsed.to_record());
    }

    if records.is_empty() {
        return Err(DecodeError::mismatch(dialect, "no log lines"));
    }

    Ok(DecodedBatch {
        dialect,
        batch: TelemetryBatch::Logs(records),
        rejected: 0,
        current_tenant: UNKNOWN.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rfc3339_line() {
        let (_, line) =
            parse_line("2024-05-01T10:00:00Z edge-node-1 kubelet[812]: ERROR pod evicted")
                .unwrap();
        assert_eq!(line.host, "edge-node-1");
        assert_eq!(line.process, "kubelet");
        assert_eq!(line.pid, Some("812"));
        assert_eq!(line.message, "ERROR pod evicted");
        assert_eq!(line.timestamp.timestamp(), 1_714_557_600);
    }

    #[test]
    fn test_parse_plain_datetime_without_pid() {
        let (_, line) = parse_line("2024-05-01 10:00:00 host-a sshd: session opened").unwrap();
        assert_eq!(line.process, "sshd");
        assert_eq!(line.pid, None);
        assert_eq!(line.timestamp.timestamp(), 1_714_557_600);
    }

    #[test]
    fn test_severity_inference() {
        let body = b"2024-05-01T10:00:00Z h p[1]: warning: disk at 91%\n\
                     2024-05-01T10:00:01Z h p[1]: all good\n";
        let decoded = decode(body).unwrap();
        let TelemetryBatch::Logs(records) = decoded.batch else {
            panic!("expected logs");
        };
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].severity, "WARN");
        assert_eq!(records[1].severity, "INFO");
        assert_eq!(records[0].attributes.get("pid"), Some(&"1".to_string()));
        assert_eq!(records[1].timestamp, 1_714_557_601_000_000_000);
    }

    #[test]
    fn test_any_bad_line_fails() {
        let body = b"2024-05-01T10:00:00Z h p: ok\nrandom garbage\n";
        assert!(decode(body).is_err());
    }

    #[test]
    fn test_blank_body_fails() {
        assert!(decode(b"\n\n").is_err());
        assert!(decode(&[0xff, 0xfe]).is_err());
    }
}
