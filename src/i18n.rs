//! Interface language and message catalogue
//!
//! Every user-facing message exists at least in English and French.

use serde::{Deserialize, Deserializer, Serialize};

/// ISO 639-3 interface language
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceLanguage {
    #[default]
    Eng,
    Fra,
}

impl InterfaceLanguage {
    /// Map a language code to an interface language. Legacy two-letter codes
    /// are accepted: anything containing "fr" is French, the rest English.
    pub fn from_code(code: &str) -> Self {
        let code = code.trim().to_ascii_lowercase();
        match code.as_str() {
            "fra" => InterfaceLanguage::Fra,
            "eng" => InterfaceLanguage::Eng,
            short if short.len() < 3 && short.contains("fr") => InterfaceLanguage::Fra,
            short if short.len() < 3 => InterfaceLanguage::Eng,
            other => {
                log::warn!("unsupported interface language '{}', using eng", other);
                InterfaceLanguage::Eng
            }
        }
    }

    pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let code = String::deserialize(deserializer)?;
        Ok(Self::from_code(&code))
    }
}

/// Look up `key` in the catalogue; unknown keys are echoed back
pub fn translate(key: &str, language: InterfaceLanguage) -> String {
    let entry = match key {
        "speed" => Some(("Playback Speed", "Vitesse de Lecture")),
        "re-align" => Some(("Re-align with audio", "Réaligner avec l'audio")),
        "audio-error" => Some((
            "Error: The audio file could not be loaded",
            "Erreur: le fichier audio n'a pas pu être chargé",
        )),
        "text-error" => Some((
            "Error: The text file could not be loaded",
            "Erreur: le fichier texte n'a pas pu être chargé",
        )),
        "alignment-error" => Some((
            "Error: The alignment file could not be loaded",
            "Erreur: le fichier alignement n'a pas pu être chargé",
        )),
        "loading" => Some(("Loading...", "Chargement en cours")),
        _ => None,
    };

    match (entry, language) {
        (Some((eng, _)), InterfaceLanguage::Eng) => eng.to_string(),
        (Some((_, fra)), InterfaceLanguage::Fra) => fra.to_string(),
        (None, _) => key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_known_keys() {
        assert_eq!(translate("loading", InterfaceLanguage::Eng), "Loading...");
        assert_eq!(translate("loading", InterfaceLanguage::Fra), "Chargement en cours");
    }

    #[test]
    fn test_translate_unknown_key_echoes() {
        assert_eq!(translate("nope", InterfaceLanguage::Fra), "nope");
    }

    #[test]
    fn test_from_code() {
        assert_eq!(InterfaceLanguage::from_code("fr"), InterfaceLanguage::Fra);
        assert_eq!(InterfaceLanguage::from_code("FRA"), InterfaceLanguage::Fra);
        assert_eq!(InterfaceLanguage::from_code("en"), InterfaceLanguage::Eng);
        assert_eq!(InterfaceLanguage::from_code("deu"), InterfaceLanguage::Eng);
    }
}
