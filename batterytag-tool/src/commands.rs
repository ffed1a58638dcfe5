use std::path::{Path, PathBuf};

use batterytag_core::report::render_html;
use batterytag_core::{
    codec, BatteryCode, BatteryRecord, Encoded, LogStore, NoteKind, Serial, TagController,
    TagSession, Timestamp,
};
use batterytag_fjall::FjallLogStore;
use chrono::Local;
use tracing::{info, warn};

use crate::config::{resolve_team, Config};
use crate::error::ToolError;
use crate::output::{
    print_record, print_written, render_log_csv, render_log_entry, render_log_json, LogFormat,
};
use crate::tag::FileTag;

/// A simulated tag wired to the persistent log.
pub struct AppContext {
    pub controller: TagController<FileTag, FjallLogStore>,
    tag_path: PathBuf,
}

impl AppContext {
    pub fn open(tag: FileTag, log_path: &Path, history_limit: usize) -> Result<Self, ToolError> {
        let tag_path = tag.path().to_path_buf();
        let log = FjallLogStore::open(log_path)?;
        let session = TagSession::new(tag, log).with_history_limit(history_limit);
        Ok(Self {
            controller: TagController::new(session),
            tag_path,
        })
    }

    fn no_tag(&self) -> ToolError {
        ToolError::NoTag(self.tag_path.clone())
    }

    async fn scan(&mut self) -> Result<&BatteryRecord, ToolError> {
        let missing = self.no_tag();
        self.controller.scan().await?.ok_or(missing)
    }

    fn written(&self, written: Option<Encoded>) -> Result<(), ToolError> {
        let encoded = written.ok_or_else(|| self.no_tag())?;
        print_written(&encoded);
        Ok(())
    }
}

/// Picks the serial for a new tag: a hand-typed one, or a BEST serial built
/// from the team number and battery code.
pub fn build_serial(
    manual: Option<String>,
    team: Option<String>,
    code: Option<BatteryCode>,
    config: &Config,
) -> Result<Serial, ToolError> {
    if let Some(manual) = manual {
        return Ok(Serial::manual(&manual)?);
    }
    let code = code.ok_or(ToolError::MissingBatteryCode)?;
    let team = resolve_team(team, config).ok_or(ToolError::TeamNotFound)?;
    Ok(Serial::best(&team, code)?)
}

pub async fn read(ctx: &mut AppContext) -> Result<(), ToolError> {
    let record = ctx.scan().await?;
    print_record(record);
    Ok(())
}

pub async fn init(ctx: &mut AppContext, serial: Serial) -> Result<(), ToolError> {
    let tag = ctx.controller.session().capability();
    if tag.present_blank().await? {
        info!(path = %tag.path().display(), "presented a blank tag");
    }
    let written = ctx.controller.init_new(&serial, Timestamp::now()).await?;
    ctx.written(written)
}

pub async fn robot(ctx: &mut AppContext) -> Result<(), ToolError> {
    ctx.scan().await?;
    let written = ctx.controller.log_robot_use(Timestamp::now()).await?;
    ctx.written(written)
}

pub async fn charged(ctx: &mut AppContext, force: bool) -> Result<(), ToolError> {
    if ctx.scan().await?.last_event_is_charge() {
        if !force {
            return Err(ToolError::DuplicateCharge);
        }
        warn!("logging a second charge in a row");
    }
    let written = ctx.controller.log_charge(Timestamp::now()).await?;
    ctx.written(written)
}

pub async fn note(ctx: &mut AppContext, kind: NoteKind) -> Result<(), ToolError> {
    ctx.scan().await?;
    let written = ctx.controller.set_note(kind).await?;
    ctx.written(written)
}

pub async fn import(ctx: &mut AppContext, input: &Path) -> Result<(), ToolError> {
    let text = tokio::fs::read_to_string(input).await?;
    let record = codec::decode_text(&text)?;
    let written = ctx.controller.write_record(record).await?;
    ctx.written(written)
}

pub async fn export(ctx: &mut AppContext, out: Option<PathBuf>) -> Result<(), ToolError> {
    let record = ctx.scan().await?;
    let out = out.unwrap_or_else(|| PathBuf::from(format!("{}.BEST.json", record.serial)));
    tokio::fs::write(&out, codec::to_pretty_json(record)?).await?;
    println!("Exported {}", out.display());
    Ok(())
}

pub async fn report(ctx: &mut AppContext, out: Option<PathBuf>) -> Result<(), ToolError> {
    let record = ctx.scan().await?;
    let out = out.unwrap_or_else(|| PathBuf::from(format!("{}.report.html", record.serial)));
    tokio::fs::write(&out, render_html(record, &Local, &Local::now())).await?;
    println!("Report written to {}", out.display());
    Ok(())
}

pub fn logs(ctx: &AppContext, clear: bool) -> Result<(), ToolError> {
    let log = ctx.controller.session().log_store();
    if clear {
        log.clear()?;
        println!("Log cleared");
        return Ok(());
    }
    if log.is_empty()? {
        println!("No log entries");
        return Ok(());
    }
    println!("{} log entries, newest first", log.len()?);
    for entry in &log.load()? {
        println!("{}", render_log_entry(entry, &Local));
    }
    Ok(())
}

/// Writes the whole log to `out` as JSON or CSV.
pub async fn export_logs(ctx: &AppContext, out: &Path, format: LogFormat) -> Result<(), ToolError> {
    let entries = ctx.controller.session().log_store().load()?;
    let body = match format {
        LogFormat::Json => render_log_json(&entries)?,
        LogFormat::Csv => render_log_csv(&entries, &Local),
    };
    tokio::fs::write(out, body).await?;
    println!("Exported {} log entries to {}", entries.len(), out.display());
    Ok(())
}

/// Fits a record file to `capacity` without touching a tag.
pub async fn encode(
    input: &Path,
    capacity: usize,
    history_limit: usize,
    out: Option<PathBuf>,
) -> Result<(), ToolError> {
    let mut record = codec::decode_text(&tokio::fs::read_to_string(input).await?)?;
    let capped = record.cap_history(history_limit);
    let mut encoded = codec::encode(&record, capacity)?;
    encoded.dropped += capped;

    println!("{}", encoded.text);
    eprintln!(
        "{} of {} bytes (estimated), {} usage entries dropped",
        encoded.estimated_size, capacity, encoded.dropped
    );
    if let Some(out) = out {
        tokio::fs::write(&out, encoded.ndef_message()).await?;
        eprintln!("NDEF message written to {}", out.display());
    }
    Ok(())
}

/// Decodes a record file, either raw JSON text or an NDEF message.
pub async fn decode(input: &Path, ndef: bool) -> Result<(), ToolError> {
    let bytes = tokio::fs::read(input).await?;
    let record = if ndef {
        codec::decode_ndef(&bytes)?
    } else {
        let text = String::from_utf8(bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        codec::decode_text(&text)?
    };
    print_record(&record);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use batterytag_core::{DeviceKind, LogKind};
    use tempfile::TempDir;

    fn temp_context(capacity: usize) -> (AppContext, TempDir) {
        let dir = TempDir::new().unwrap();
        let tag = FileTag::new(dir.path().join("tag.ndef"), capacity);
        let ctx = AppContext::open(tag, &dir.path().join("log"), 14).unwrap();
        (ctx, dir)
    }

    fn serial() -> Serial {
        Serial::manual("ABC123").unwrap()
    }

    #[test]
    fn serial_choices() {
        let config = Config {
            team_number: Some("254".to_string()),
            ..Config::default()
        };
        let manual = build_serial(Some("X1".into()), None, None, &config).unwrap();
        assert_eq!(manual.as_str(), "X1");

        let best = build_serial(None, None, Some(BatteryCode::New(12)), &config).unwrap();
        assert_eq!(best.as_str(), "254--012");

        let missing = build_serial(None, None, None, &config).unwrap_err();
        assert!(matches!(missing, ToolError::MissingBatteryCode));

        let no_team = build_serial(None, None, Some(BatteryCode::Special), &Config::default());
        assert!(matches!(no_team, Err(ToolError::TeamNotFound)));
    }

    #[tokio::test]
    async fn actions_without_tag() {
        let (mut ctx, _dir) = temp_context(492);
        assert!(matches!(read(&mut ctx).await, Err(ToolError::NoTag(_))));
        assert!(matches!(robot(&mut ctx).await, Err(ToolError::NoTag(_))));
    }

    #[tokio::test]
    async fn init_then_log_usage() {
        let (mut ctx, _dir) = temp_context(492);
        init(&mut ctx, serial()).await.unwrap();
        robot(&mut ctx).await.unwrap();
        charged(&mut ctx, false).await.unwrap();

        let current = ctx.controller.current().unwrap();
        assert_eq!(current.serial, "ABC123");
        assert_eq!(current.cycle_count, 1);
        assert_eq!(current.usage.newest().unwrap().device, DeviceKind::Charger);

        let entries = ctx.controller.session().log_store().load().unwrap();
        assert_eq!(entries[0].kind, LogKind::Write);
        assert_eq!(entries.iter().filter(|e| e.kind == LogKind::Write).count(), 3);
    }

    #[tokio::test]
    async fn second_charge_needs_force() {
        let (mut ctx, _dir) = temp_context(492);
        init(&mut ctx, serial()).await.unwrap();
        charged(&mut ctx, false).await.unwrap();

        assert!(matches!(charged(&mut ctx, false).await, Err(ToolError::DuplicateCharge)));
        assert_eq!(ctx.controller.current().unwrap().cycle_count, 1);

        charged(&mut ctx, true).await.unwrap();
        assert_eq!(ctx.controller.current().unwrap().cycle_count, 2);
    }

    #[tokio::test]
    async fn small_tag_keeps_newest() {
        let (mut ctx, _dir) = temp_context(137);
        init(&mut ctx, serial()).await.unwrap();
        for _ in 0..5 {
            robot(&mut ctx).await.unwrap();
        }

        read(&mut ctx).await.unwrap();
        let current = ctx.controller.current().unwrap();
        assert!(current.usage.len() < 5);
        assert_eq!(current.usage.newest().unwrap().sequence, 5);
    }

    #[tokio::test]
    async fn import_export_roundtrip() {
        let (mut ctx, dir) = temp_context(868);
        let input = dir.path().join("legacy.json");
        std::fs::write(
            &input,
            r#"{"sn":"OLD1","cycle":4,"usage":[{"id":1,"t":"2401011200","d":2,"e":0,"v":12.6}]}"#,
        )
        .unwrap();

        ctx.controller.session().capability().present_blank().await.unwrap();
        import(&mut ctx, &input).await.unwrap();

        let out = dir.path().join("out.json");
        export(&mut ctx, Some(out.clone())).await.unwrap();
        let exported = codec::decode_text(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(exported.serial, "OLD1");
        assert_eq!(exported.cycle_count, 4);
        assert_eq!(exported.usage.as_slice()[0].voltage, 13);
    }

    #[tokio::test]
    async fn report_file() {
        let (mut ctx, dir) = temp_context(492);
        init(&mut ctx, serial()).await.unwrap();
        let out = dir.path().join("report.html");
        report(&mut ctx, Some(out.clone())).await.unwrap();
        let html = std::fs::read_to_string(&out).unwrap();
        assert!(html.contains("ABC123"));
        assert!(html.contains("No usage records."));
    }

    #[tokio::test]
    async fn clearing_logs() {
        let (mut ctx, _dir) = temp_context(492);
        init(&mut ctx, serial()).await.unwrap();
        logs(&ctx, true).unwrap();
        assert!(ctx.controller.session().log_store().load().unwrap().is_empty());
    }

    #[tokio::test]
    async fn exporting_logs() {
        let (mut ctx, dir) = temp_context(492);
        init(&mut ctx, serial()).await.unwrap();
        read(&mut ctx).await.unwrap();
        logs(&ctx, false).unwrap();

        let json_out = dir.path().join("log.json");
        export_logs(&ctx, &json_out, LogFormat::Json).await.unwrap();
        let entries: Vec<batterytag_core::LogEntry> =
            serde_json::from_str(&std::fs::read_to_string(&json_out).unwrap()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, LogKind::Read);
        assert_eq!(entries[1].kind, LogKind::Write);

        let csv_out = dir.path().join("log.csv");
        export_logs(&ctx, &csv_out, LogFormat::Csv).await.unwrap();
        let csv = std::fs::read_to_string(&csv_out).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Time,Type,Data");
        assert!(lines[1].contains("\"read\""));
        assert!(lines[2].contains("'sn':'ABC123'"));
        assert!(!lines[2].contains("\"sn\""));
    }

    #[tokio::test]
    async fn encode_and_decode_files() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("record.json");
        std::fs::write(&input, r#"{"sn":"A","u":[{"i":1,"d":1},{"i":2,"d":2}]}"#).unwrap();
        let out = dir.path().join("record.ndef");

        encode(&input, 868, 14, Some(out.clone())).await.unwrap();
        let decoded = codec::decode_ndef(&std::fs::read(&out).unwrap()).unwrap();
        assert_eq!(decoded.usage.len(), 2);
        decode(&out, true).await.unwrap();
        decode(&input, false).await.unwrap();
    }
}
