//! Recognized commands and their firmware mapping.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use super::transcriber::{Language, Transcription};

/// Speed used when a speed command carries no digits
pub const DEFAULT_SPEED: u32 = 50;

/// One recognized command travelling through the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    /// Position in the producer's output, starting at 0
    pub seq: u64,
    /// Recognized text
    pub text: String,
    /// Language the text was heard in
    pub lang: Language,
    pub heard_at: DateTime<Utc>,
}

impl Command {
    pub fn new(seq: u64, text: impl Into<String>) -> Self {
        Self {
            seq,
            text: text.into(),
            lang: Language::English,
            heard_at: Utc::now(),
        }
    }

    pub fn transcribed(seq: u64, transcription: Transcription) -> Self {
        Self {
            lang: transcription.lang,
            ..Self::new(seq, transcription.text)
        }
    }
}

/// Instruction sent to the motor/peripheral firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareCommand {
    StartMotor,
    StopMotor,
    SetSpeed(u32),
    MoveForward,
    LightOn,
    EmergencyStop,
    Noop,
}

impl FirmwareCommand {
    /// Map free text to a firmware command. First matching keyword wins.
    pub fn recognize(text: &str) -> Self {
        let upper = text.to_uppercase();

        if upper.contains("EMERGENCY") {
            FirmwareCommand::EmergencyStop
        } else if upper.contains("START") {
            FirmwareCommand::StartMotor
        } else if upper.contains("STOP") {
            FirmwareCommand::StopMotor
        } else if upper.contains("SPEED") {
            FirmwareCommand::SetSpeed(first_number(&upper).unwrap_or(DEFAULT_SPEED))
        } else if upper.contains("FORWARD") {
            FirmwareCommand::MoveForward
        } else if upper.contains("LIGHT") {
            FirmwareCommand::LightOn
        } else {
            FirmwareCommand::Noop
        }
    }
}

impl fmt::Display for FirmwareCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FirmwareCommand::StartMotor => write!(f, "START_MOTOR"),
            FirmwareCommand::StopMotor => write!(f, "STOP_MOTOR"),
            FirmwareCommand::SetSpeed(speed) => write!(f, "SET_SPEED:{}", speed),
            FirmwareCommand::MoveForward => write!(f, "MOVE_FORWARD"),
            FirmwareCommand::LightOn => write!(f, "LIGHT_ON"),
            FirmwareCommand::EmergencyStop => write!(f, "EMERGENCY_STOP"),
            FirmwareCommand::Noop => write!(f, "NOOP"),
        }
    }
}

fn first_number(text: &str) -> Option<u32> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
