//! Report output for classification results, as JSON or JSON Lines.
//!
//! JSON writes one object holding the dashboard and the full maps. JSON Lines
//! writes a summary line, then one line per classified entry and one line per
//! group, so large reports can be streamed and filtered with line tools.

use serde::Serialize;
use std::io::{self, Write};

use crate::store::{ClassificationMaps, Dashboard};
use crate::types::Category;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single JSON object
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// Whole report as one object.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub version: &'static str,
    pub dashboard: &'a Dashboard,
    pub maps: &'a ClassificationMaps,
}

/// One line of a JSON Lines report.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportLine<'a> {
    Summary {
        total_bytes: u64,
        updated_at: u64,
    },
    Entry {
        category: Category,
        id: &'a str,
        size_bytes: u64,
        created_at: i64,
    },
    Group {
        category: Category,
        group: usize,
        bytes: u64,
        ids: Vec<&'a str>,
    },
}

/// Flatten the maps into report lines, summary first.
pub fn report_lines<'a>(maps: &'a ClassificationMaps, dashboard: &Dashboard) -> Vec<ReportLine<'a>> {
    let mut lines = vec![ReportLine::Summary {
        total_bytes: dashboard.total_bytes,
        updated_at: dashboard.updated_at,
    }];
    for category in Category::SINGLES {
        let Some(map) = maps.category(category) else {
            continue;
        };
        lines.extend(map.entries.iter().map(|e| ReportLine::Entry {
            category,
            id: &e.id,
            size_bytes: e.size_bytes,
            created_at: e.created_at,
        }));
    }
    for category in Category::GROUPED {
        let Some(map) = maps.grouped(category) else {
            continue;
        };
        lines.extend(map.groups.iter().enumerate().map(|(index, group)| ReportLine::Group {
            category,
            group: index,
            bytes: group.iter().map(|e| e.size_bytes).sum(),
            ids: group.iter().map(|e| e.id.as_str()).collect(),
        }));
    }
    lines
}

/// A writer that serializes reports to JSON or JSONL format.
pub struct ReportWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
}

impl<W: Write> ReportWriter<W> {
    /// `pretty` only affects the JSON format.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
        }
    }

    /// Write the report for `maps`; returns the number of objects written.
    pub fn write_report(&mut self, maps: &ClassificationMaps) -> io::Result<usize> {
        let dashboard = maps.summary();
        let written = match self.format {
            OutputFormat::Json => {
                let report = Report {
                    version: crate::VERSION,
                    dashboard: &dashboard,
                    maps,
                };
                if self.pretty {
                    serde_json::to_writer_pretty(&mut self.writer, &report).map_err(io::Error::other)?;
                } else {
                    serde_json::to_writer(&mut self.writer, &report).map_err(io::Error::other)?;
                }
                writeln!(self.writer)?;
                1
            }
            OutputFormat::JsonLines => {
                // JSONL is never pretty-printed (one object per line)
                let lines = report_lines(maps, &dashboard);
                for line in &lines {
                    serde_json::to_writer(&mut self.writer, line).map_err(io::Error::other)?;
                    writeln!(self.writer)?;
                }
                lines.len()
            }
        };
        self.writer.flush()?;
        Ok(written)
    }

    /// Consume the writer and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
