//! Transcriber
//!
//! Turns a raw heard chunk into dispatchable text: detects the spoken
//! language and marks non-English input as translated.

use serde::Serialize;
use std::fmt;

/// Prefix put in front of text that went through translation
pub const TRANSLATED_PREFIX: &str = "(translated) ";

/// Detected input language, serialized as its ISO 639-1 code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "es")]
    Spanish,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Spanish => "es",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Output of one transcription step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcription {
    pub text: String,
    pub lang: Language,
}

/// Keyword-based language detection and translation
#[derive(Debug, Clone, Copy, Default)]
pub struct Transcriber;

impl Transcriber {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(&self, chunk: &str) -> Language {
        if chunk.to_lowercase().contains("hola") {
            Language::Spanish
        } else {
            Language::English
        }
    }

    /// Trim the chunk; anything not English comes back prefixed as translated
    pub fn transcribe(&self, chunk: &str) -> Transcription {
        let lang = self.detect(chunk);
        let text = chunk.trim();
        let text = match lang {
            Language::English => text.to_string(),
            _ => format!("{}{}", TRANSLATED_PREFIX, text),
        };
        Transcription { text, lang }
    }
}
