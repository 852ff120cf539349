//! Interface languages and bilingual text.

use serde::{Deserialize, Serialize};

/// Preferred interface language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Es,
    En,
}

impl Language {
    /// Convert from database string representation. Unknown values fall back to Spanish.
    pub fn from_str(s: &str) -> Self {
        match s {
            "en" => Self::En,
            _ => Self::Es,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Es => "es",
            Self::En => "en",
        }
    }
}

/// Text stored in both Spanish and English.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LocalizedText {
    pub es: String,
    pub en: String,
}

impl LocalizedText {
    pub fn new(es: impl Into<String>, en: impl Into<String>) -> Self {
        Self {
            es: es.into(),
            en: en.into(),
        }
    }

    pub fn get(&self, language: Language) -> &str {
        match language {
            Language::Es => &self.es,
            Language::En => &self.en,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_language_defaults_to_spanish() {
        assert_eq!(Language::from_str("fr"), Language::Es);
        assert_eq!(Language::from_str("en"), Language::En);
    }

    #[test]
    fn test_localized_get() {
        let text = LocalizedText::new("Noticias", "News");
        assert_eq!(text.get(Language::Es), "Noticias");
        assert_eq!(text.get(Language::En), "News");
    }
}
