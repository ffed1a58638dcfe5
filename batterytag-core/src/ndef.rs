//! Minimal NDEF framing for text payloads.
//!
//! Only what a battery tag needs: one Well-Known Text record on the way out,
//! and enough of the record layer on the way in to find the first text
//! payload among whatever records a tag carries.

const MB: u8 = 0x80;
const ME: u8 = 0x40;
const CF: u8 = 0x20;
const SR: u8 = 0x10;
const IL: u8 = 0x08;
const TNF_MASK: u8 = 0x07;

/// Language code written into every text record.
pub const LANGUAGE: &str = "en";

/// Error raised while walking the record layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NdefError {
    #[error("message is empty")]
    Empty,
    #[error("record truncated at byte {0}")]
    Truncated(usize),
}

/// NDEF Type Name Format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tnf {
    Empty,
    WellKnown,
    Media,
    AbsoluteUri,
    External,
    Unknown,
    Unchanged,
    Reserved,
}

impl From<u8> for Tnf {
    fn from(bits: u8) -> Self {
        match bits & TNF_MASK {
            0 => Tnf::Empty,
            1 => Tnf::WellKnown,
            2 => Tnf::Media,
            3 => Tnf::AbsoluteUri,
            4 => Tnf::External,
            5 => Tnf::Unknown,
            6 => Tnf::Unchanged,
            _ => Tnf::Reserved,
        }
    }
}

/// A single parsed record, borrowing from the message buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<'a> {
    pub tnf: Tnf,
    pub record_type: &'a [u8],
    pub id: &'a [u8],
    pub payload: &'a [u8],
}

/// Builds a one-record message holding `text` as a UTF-8 Well-Known Text
/// record in [`LANGUAGE`].
pub fn text_message(text: &str) -> Vec<u8> {
    let lang = LANGUAGE.as_bytes();
    let mut payload = Vec::with_capacity(1 + lang.len() + text.len());
    // bit 7 clear: UTF-8; low six bits: language length
    payload.push(lang.len() as u8 & 0x3F);
    payload.extend_from_slice(lang);
    payload.extend_from_slice(text.as_bytes());

    let short = payload.len() < 256;
    let sr = if short { SR } else { 0 };
    let mut message = Vec::with_capacity(payload.len() + 7);
    message.push(MB | ME | sr | 0x01);
    message.push(1);
    if short {
        message.push(payload.len() as u8);
    } else {
        message.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    }
    message.push(b'T');
    message.extend_from_slice(&payload);
    message
}

/// Splits a message into records.
pub fn parse_message(bytes: &[u8]) -> Result<Vec<Record<'_>>, NdefError> {
    if bytes.is_empty() {
        return Err(NdefError::Empty);
    }

    let mut records = Vec::new();
    let mut cursor = Cursor { bytes, pos: 0 };
    while !cursor.at_end() {
        let start = cursor.pos;
        let truncated = || NdefError::Truncated(start);

        let header = cursor.byte().ok_or_else(truncated)?;
        let type_len = cursor.byte().ok_or_else(truncated)? as usize;
        let payload_len = if header & SR != 0 {
            cursor.byte().ok_or_else(truncated)? as usize
        } else {
            let raw = cursor.take(4).ok_or_else(truncated)?;
            u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize
        };
        let id_len = if header & IL != 0 {
            cursor.byte().ok_or_else(truncated)? as usize
        } else {
            0
        };
        let record_type = cursor.take(type_len).ok_or_else(truncated)?;
        let id = cursor.take(id_len).ok_or_else(truncated)?;
        let payload = cursor.take(payload_len).ok_or_else(truncated)?;

        // Chunked records are not reassembled; their fragments are skipped.
        let tnf = Tnf::from(header);
        if header & CF == 0 && tnf != Tnf::Unchanged {
            records.push(Record {
                tnf,
                record_type,
                id,
                payload,
            });
        }

        if header & ME != 0 {
            break;
        }
    }
    Ok(records)
}

/// Decodes the text carried by a record, if it is a text record.
///
/// Accepts Well-Known `T` records (UTF-8 or UTF-16 per the status byte) and
/// MIME `text/plain` records.
pub fn record_text(record: &Record<'_>) -> Option<String> {
    match record.tnf {
        Tnf::WellKnown if record.record_type == b"T" => {
            let (&status, rest) = record.payload.split_first()?;
            let lang_len = (status & 0x3F) as usize;
            let text = rest.get(lang_len..)?;
            if status & 0x80 != 0 {
                utf16(text)
            } else {
                String::from_utf8(text.to_vec()).ok()
            }
        }
        Tnf::Media if record.record_type.eq_ignore_ascii_case(b"text/plain") => {
            String::from_utf8(record.payload.to_vec())
                .ok()
                .or_else(|| utf16(record.payload))
        }
        _ => None,
    }
}

/// The first text payload in a message, or `None` if there is none.
pub fn first_text(bytes: &[u8]) -> Result<Option<String>, NdefError> {
    Ok(parse_message(bytes)?.iter().find_map(record_text))
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.bytes.len())?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Some(slice)
    }

    fn byte(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }
}

fn utf16(bytes: &[u8]) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let (little_endian, body) = match bytes {
        [0xFF, 0xFE, rest @ ..] => (true, rest),
        [0xFE, 0xFF, rest @ ..] => (false, rest),
        _ => (false, bytes),
    };
    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| {
            if little_endian {
                u16::from_le_bytes([pair[0], pair[1]])
            } else {
                u16::from_be_bytes([pair[0], pair[1]])
            }
        })
        .collect();
    String::from_utf16(&units).ok()
}
