//! Printable HTML report of a battery record.

use std::fmt;

use chrono::{DateTime, TimeZone};

use crate::model::{BatteryRecord, DeviceKind, UsageEvent};

/// Usage rows shown before the table is cut off.
pub const MAX_REPORT_ROWS: usize = 36;

const STYLE: &str = "\
  :root { --fg:#000; --muted:#222; --line:#000; --bg:#fff; }
  * { box-sizing:border-box; }
  html, body { background:var(--bg); color:var(--fg); }
  body { margin:24px; font:12px/1.35 system-ui,-apple-system,Segoe UI,Roboto,Arial,sans-serif; }
  h1 { margin:0 0 6px; font-size:16px; font-weight:700; }
  h2 { margin:14px 0 6px; font-size:13px; font-weight:700; }
  .grid { display:grid; grid-template-columns:160px 1fr 120px 1fr; gap:6px 10px; padding:8px; border:1px solid var(--line); }
  .k { color:var(--muted); text-align:right; }
  .code { font-family:ui-monospace,SFMono-Regular,Menlo,Consolas,monospace; }
  table { width:100%; border-collapse:collapse; }
  th,td { border-top:1px solid var(--line); padding:4px 6px; vertical-align:top; }
  thead th { text-align:left; border-top:none; font-size:11px; font-weight:700; }
  .num { text-align:right; font-variant-numeric:tabular-nums; }
  .muted { color:#444; }
  .foot { margin-top:8px; font-size:11px; color:#111; }
  .charger-row { background:#000; color:#fff; }
  @page { size: letter; margin: 0.5in; }
  @media print { body { margin:0; } * { -webkit-print-color-adjust: exact; print-color-adjust: exact; } }
";

/// Renders `record` as a standalone HTML page.
///
/// Times are shown in `tz`; `generated_at` is stamped into the stats block.
pub fn render_html<Tz>(record: &BatteryRecord, tz: &Tz, generated_at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    Report {
        record,
        tz,
        generated_at,
    }
    .to_string()
}

struct Report<'a, Tz: TimeZone> {
    record: &'a BatteryRecord,
    tz: &'a Tz,
    generated_at: &'a DateTime<Tz>,
}

impl<Tz> fmt::Display for Report<'_, Tz>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.record;
        let serial = escape(&record.serial);

        writeln!(f, "<!DOCTYPE html>")?;
        writeln!(f, "<html lang='en'><head>")?;
        writeln!(f, "<meta charset='utf-8' />")?;
        writeln!(f, "<title>Battery Report - {serial}</title>")?;
        writeln!(f, "<meta name='viewport' content='width=device-width, initial-scale=1' />")?;
        writeln!(f, "<style>\n{STYLE}</style>")?;
        writeln!(f, "</head>\n<body>")?;
        writeln!(f, "<h1>Battery Report</h1>")?;

        writeln!(f, "<div class='grid'>")?;
        writeln!(f, "  <div class='k'>Serial Number (sn):</div><div class='code'>{serial}</div>")?;
        writeln!(
            f,
            "  <div class='k'>First Use (fu):</div><div>{}</div>",
            escape(&record.first_use.compact_in(self.tz))
        )?;
        writeln!(
            f,
            "  <div class='k'>Cycle Count (cc):</div><div class='code'>{}</div>",
            record.cycle_count
        )?;
        writeln!(
            f,
            "  <div class='k'>Note (n):</div><div class='code'>{} - {}</div>",
            record.note.code(),
            record.note.label()
        )?;
        writeln!(f, "</div>\n")?;

        writeln!(f, "<h2>Usage</h2>\n<table>\n<thead>\n<tr>")?;
        writeln!(f, "<th style='width:48px'>#</th>")?;
        writeln!(f, "<th style='width:160px'>Time</th>")?;
        writeln!(f, "<th style='width:110px'>Device</th>")?;
        writeln!(f, "<th class='num' style='width:90px'>e</th>")?;
        writeln!(f, "<th class='num' style='width:90px'>v</th>")?;
        writeln!(f, "</tr>\n</thead>\n<tbody>")?;
        self.usage_rows(f)?;
        writeln!(f, "</tbody>\n</table>\n")?;

        writeln!(f, "<h2>Stats</h2>")?;
        writeln!(f, "<div class='grid' style='grid-template-columns:160px 1fr 160px 1fr;'>")?;
        writeln!(
            f,
            "  <div class='k'>Robot records:</div><div class='code'>{}</div>",
            record.robot_events()
        )?;
        writeln!(
            f,
            "  <div class='k'>Charger records:</div><div class='code'>{}</div>",
            record.charger_events()
        )?;
        writeln!(
            f,
            "  <div class='k'>Total records (u):</div><div class='code'>{}</div>",
            record.usage.len()
        )?;
        writeln!(
            f,
            "  <div class='k'>Generated:</div><div>{}</div>",
            self.generated_at.format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(f, "</div>\n")?;

        writeln!(
            f,
            "<div class='foot'>This report only represents the data currently stored on the NFC tag.</div>"
        )?;
        write!(f, "</body></html>")
    }
}

impl<Tz> Report<'_, Tz>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    fn usage_rows(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let usage = &self.record.usage;
        if usage.is_empty() {
            return writeln!(f, "<tr><td colspan='5' class='muted'>No usage records.</td></tr>");
        }

        for event in usage.newest_first().take(MAX_REPORT_ROWS) {
            self.usage_row(f, event)?;
        }

        let hidden = usage.len().saturating_sub(MAX_REPORT_ROWS);
        if hidden > 0 {
            writeln!(f, "<tr><td colspan='5' class='muted'>(+{hidden} more not shown)</td></tr>")?;
        }
        Ok(())
    }

    fn usage_row(&self, f: &mut fmt::Formatter<'_>, event: &UsageEvent) -> fmt::Result {
        let class = match event.device {
            DeviceKind::Charger => " class='charger-row'",
            DeviceKind::Robot => "",
        };
        writeln!(
            f,
            "<tr{class}><td class='num'>{}</td><td>{}</td><td>{}</td><td class='num'>{}</td><td class='num'>{}</td></tr>",
            event.sequence,
            escape(&event.timestamp.compact_in(self.tz)),
            event.device.label(),
            event.energy,
            event.voltage
        )
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
