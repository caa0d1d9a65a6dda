//! Query language value object

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::errors::DomainError;

/// Languages supported for queries and summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// German
    #[default]
    De,
    /// Italian
    It,
    /// English
    En,
}

impl Language {
    /// All supported languages
    pub const ALL: [Self; 3] = [Self::De, Self::It, Self::En];

    /// ISO 639-1 code, also used as the upstream `language` parameter
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::De => "de",
            Self::It => "it",
            Self::En => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "de" | "deu" | "ger" | "german" | "deutsch" => Ok(Self::De),
            "it" | "ita" | "italian" | "italiano" => Ok(Self::It),
            "en" | "eng" | "english" => Ok(Self::En),
            other => Err(DomainError::UnsupportedLanguage(other.to_string())),
        }
    }
}
