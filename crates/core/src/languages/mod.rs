//! Language support: detection codes, static keyword tables, and the
//! caller-facing message catalog.
//!
//! Adding a language is a data change: extend [`Language`], then add rows to
//! the tables in `keywords` and `messages`. No dialogue logic branches on a
//! specific language.

pub mod keywords;
pub mod messages;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Languages the agent can hold a conversation in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Es,
    En,
    De,
    It,
    Fr,
    Pt,
}

pub const ALL_LANGUAGES: [Language; 6] =
    [Language::Es, Language::En, Language::De, Language::It, Language::Fr, Language::Pt];

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Es => "es",
            Self::En => "en",
            Self::De => "de",
            Self::It => "it",
            Self::Fr => "fr",
            Self::Pt => "pt",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        // Analyzer output may carry a region suffix ("es-ES", "en-US").
        let code = value.trim().to_ascii_lowercase();
        let base = code.split(['-', '_']).next().unwrap_or("");
        match base {
            "es" => Ok(Self::Es),
            "en" => Ok(Self::En),
            "de" => Ok(Self::De),
            "it" => Ok(Self::It),
            "fr" => Ok(Self::Fr),
            "pt" => Ok(Self::Pt),
            _ => Err(DomainError::UnknownLanguage { value: value.to_string() }),
        }
    }
}

/// Lowercases and strips punctuation so keyword tables match spoken-text
/// transcripts. Digits, `:` and `/` survive for time and date parsing.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_alphanumeric() || ch == ':' || ch == '/' || ch == '\'' {
            out.extend(ch.to_lowercase());
        } else {
            out.push(' ');
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Scores every language's distinctive markers against the normalized
/// utterance and returns the best hit. A single marker never decides;
/// too many words read the same across the romance languages.
pub fn detect(normalized: &str) -> Option<Language> {
    let mut best: Option<(Language, usize)> = None;
    for lang in ALL_LANGUAGES {
        let score = keywords::detection_score(lang, normalized);
        if score < 2 {
            continue;
        }
        match best {
            Some((_, top)) if top >= score => {}
            _ => best = Some((lang, score)),
        }
    }
    best.map(|(lang, _)| lang)
}

#[cfg(test)]
mod tests {
    use super::{detect, normalize, Language};

    #[test]
    fn normalize_strips_punctuation_and_case() {
        assert_eq!(normalize("¡Hola! ¿Mesa para 4, por favor?"), "hola mesa para 4 por favor");
        assert_eq!(normalize("at 8:30 pm."), "at 8:30 pm");
    }

    #[test]
    fn parses_region_suffixed_codes() {
        assert_eq!("es-ES".parse::<Language>().ok(), Some(Language::Es));
        assert_eq!("en_US".parse::<Language>().ok(), Some(Language::En));
        assert!("zz".parse::<Language>().is_err());
    }

    #[test]
    fn detects_language_from_greeting_words() {
        assert_eq!(detect(&normalize("Hola, buenas tardes")), Some(Language::Es));
        assert_eq!(detect(&normalize("Hello, I'd like a table")), Some(Language::En));
        assert_eq!(detect(&normalize("Guten Abend, einen Tisch bitte")), Some(Language::De));
        assert_eq!(detect(&normalize("Bonjour, je voudrais réserver")), Some(Language::Fr));
        assert_eq!(detect(&normalize("mmm")), None);
    }

    #[test]
    fn single_shared_word_does_not_switch_language() {
        // "mesa" exists in Portuguese too; one overlap is not a detection.
        assert_eq!(detect(&normalize("mesa para cuatro a las nueve")), None);
    }
}
