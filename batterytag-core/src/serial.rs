//! Battery serial numbers.
//!
//! Teams either type a serial by hand or use the BEST scheme: a team number
//! padded to five characters followed by a three-digit battery code.

use std::fmt;

/// Longest accepted hand-typed serial.
pub const MAX_MANUAL_LEN: usize = 8;
const TEAM_WIDTH: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SerialError {
    #[error("serial must be 1 to 8 characters")]
    Length,
    #[error("serial must be ASCII")]
    NonAscii,
    #[error("team number must be 1 to 5 digits: {0:?}")]
    Team(String),
    #[error("battery id {id} out of range 0..={max}")]
    OutOfRange { id: u16, max: u16 },
}

/// Battery code within the BEST scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryCode {
    /// New battery, 0 through 899.
    New(u16),
    /// Old battery, 0 through 98, written as `9xx`.
    Old(u16),
    /// The reserved `999` code.
    Special,
}

impl BatteryCode {
    fn render(self) -> Result<String, SerialError> {
        match self {
            BatteryCode::New(id) if id <= 899 => Ok(format!("{id:03}")),
            BatteryCode::New(id) => Err(SerialError::OutOfRange { id, max: 899 }),
            BatteryCode::Old(id) if id <= 98 => Ok(format!("9{id:02}")),
            BatteryCode::Old(id) => Err(SerialError::OutOfRange { id, max: 98 }),
            BatteryCode::Special => Ok("999".to_string()),
        }
    }
}

/// A validated serial number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Serial(String);

impl Serial {
    /// Validates a hand-typed serial.
    pub fn manual(input: &str) -> Result<Self, SerialError> {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed.chars().count() > MAX_MANUAL_LEN {
            return Err(SerialError::Length);
        }
        if !trimmed.is_ascii() {
            return Err(SerialError::NonAscii);
        }
        Ok(Serial(trimmed.to_string()))
    }

    /// Builds a BEST-scheme serial. Short team numbers are right-padded with `-`.
    pub fn best(team: &str, code: BatteryCode) -> Result<Self, SerialError> {
        let team = team.trim();
        if team.is_empty() || team.len() > TEAM_WIDTH || !team.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SerialError::Team(team.to_string()));
        }
        Ok(Serial(format!("{team:-<width$}{}", code.render()?, width = TEAM_WIDTH)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Serial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_new_battery() {
        let serial = Serial::best("254", BatteryCode::New(7)).unwrap();
        assert_eq!(serial.as_str(), "254--007");
    }

    #[test]
    fn best_old_battery() {
        let serial = Serial::best("12345", BatteryCode::Old(5)).unwrap();
        assert_eq!(serial.as_str(), "12345905");
    }

    #[test]
    fn best_special() {
        assert_eq!(Serial::best("1", BatteryCode::Special).unwrap().as_str(), "1----999");
    }

    #[test]
    fn best_rejects_bad_input() {
        assert_eq!(
            Serial::best("254", BatteryCode::New(900)),
            Err(SerialError::OutOfRange { id: 900, max: 899 })
        );
        assert_eq!(
            Serial::best("254", BatteryCode::Old(99)),
            Err(SerialError::OutOfRange { id: 99, max: 98 })
        );
        assert!(matches!(Serial::best("123456", BatteryCode::Special), Err(SerialError::Team(_))));
        assert!(matches!(Serial::best("12a", BatteryCode::Special), Err(SerialError::Team(_))));
        assert!(matches!(Serial::best("", BatteryCode::Special), Err(SerialError::Team(_))));
    }

    #[test]
    fn manual_validation() {
        assert_eq!(Serial::manual("  ABC123 ").unwrap().as_str(), "ABC123");
        assert_eq!(Serial::manual(""), Err(SerialError::Length));
        assert_eq!(Serial::manual("123456789"), Err(SerialError::Length));
        assert_eq!(Serial::manual("BATÉ"), Err(SerialError::NonAscii));
    }
}
