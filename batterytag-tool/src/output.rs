use std::fmt::Write;

use batterytag_core::{BatteryRecord, Encoded, LogEntry};
use chrono::{Local, TimeZone};
use clap::ValueEnum;

/// File format for `btag logs --export`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Json,
    Csv,
}

/// Multi-line summary of a record, usage newest first.
pub fn render_record<Tz>(record: &BatteryRecord, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::new();
    let _ = writeln!(out, "Serial:       {}", record.serial);
    let _ = writeln!(out, "First use:    {}", record.first_use.display_in(tz));
    let _ = writeln!(out, "Cycle count:  {}", record.cycle_count);
    let _ = writeln!(out, "Note:         {}", record.note);

    if record.usage.is_empty() {
        let _ = writeln!(out, "Usage:        none");
        return out;
    }
    let _ = writeln!(
        out,
        "Usage:        {} entries ({} robot, {} charger)",
        record.usage.len(),
        record.robot_events(),
        record.charger_events()
    );
    for event in record.usage.newest_first() {
        let _ = writeln!(
            out,
            "  #{:<4} {:<24} {:<8} e={} v={}",
            event.sequence,
            event.timestamp.display_in(tz),
            event.device,
            event.energy,
            event.voltage
        );
    }
    out
}

pub fn print_record(record: &BatteryRecord) {
    print!("{}", render_record(record, &Local));
}

/// Prints the record as written, noting any history that did not fit.
pub fn print_written(encoded: &Encoded) {
    print_record(&encoded.record);
    println!("Wrote {} bytes (estimated)", encoded.estimated_size);
    if encoded.dropped > 0 {
        println!("Dropped {} oldest usage entries to fit the tag", encoded.dropped);
    }
}

pub fn render_log_entry<Tz>(entry: &LogEntry, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}  {:<5}  {}",
        entry.when.with_timezone(tz).format("%Y-%m-%d %H:%M:%S"),
        entry.kind,
        entry.raw
    )
}

/// The log as an indented JSON array, newest first.
pub fn render_log_json(entries: &[LogEntry]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(entries)
}

/// The log as CSV with a `Time,Type,Data` header. Times are minutes in `tz`.
/// Double quotes inside the raw text become single quotes so every field
/// stays a plain quoted string.
pub fn render_log_csv<Tz>(entries: &[LogEntry], tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::from("Time,Type,Data\n");
    for entry in entries {
        let _ = writeln!(
            out,
            "\"{}\",\"{}\",\"{}\"",
            entry.when.with_timezone(tz).format("%Y-%m-%d %H:%M"),
            entry.kind,
            entry.raw.replace('"', "'")
        );
    }
    out
}
