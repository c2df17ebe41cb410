//! Outbound TwiML documents.
//!
//! Every turn answers with one of two documents: a `<Gather>` that speaks
//! the reply and listens for the next utterance, or a farewell that speaks
//! and hangs up. All text is XML-escaped before it goes out; Twilio answers
//! invalid XML with an application error the caller hears as a dropped call.

use std::fmt::Write;

use reserva_core::languages::Language;

/// Seconds of silence after speech before Twilio finalizes the transcript.
const SPEECH_TIMEOUT_SECS: u32 = 3;
/// Seconds Twilio waits for any speech at all before giving up the gather.
const GATHER_TIMEOUT_SECS: u32 = 8;

/// TTS voice and STT locale for one language.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoiceProfile {
    pub voice: &'static str,
    pub locale: &'static str,
}

pub fn voice_profile(lang: Language) -> VoiceProfile {
    match lang {
        Language::Es => VoiceProfile { voice: "Google.es-ES-Neural2-B", locale: "es-ES" },
        Language::En => VoiceProfile { voice: "Google.en-US-Neural2-J", locale: "en-US" },
        Language::De => VoiceProfile { voice: "Google.de-DE-Neural2-A", locale: "de-DE" },
        Language::It => VoiceProfile { voice: "Google.it-IT-Neural2-A", locale: "it-IT" },
        Language::Fr => VoiceProfile { voice: "Google.fr-FR-Neural2-A", locale: "fr-FR" },
        Language::Pt => VoiceProfile { voice: "Google.pt-BR-Neural2-A", locale: "pt-BR" },
    }
}

/// Spoken after the gather times out, right before redirecting for another
/// attempt.
fn still_there_prompt(lang: Language) -> &'static str {
    match lang {
        Language::Es => "No escuché respuesta. ¿Sigue ahí?",
        Language::En => "I didn't hear a reply. Are you still there?",
        Language::De => "Ich habe nichts gehört. Sind Sie noch dran?",
        Language::It => "Non ho sentito nulla. È ancora in linea?",
        Language::Fr => "Je n'ai rien entendu. Êtes-vous toujours là ?",
        Language::Pt => "Não ouvi resposta. Ainda está aí?",
    }
}

fn technical_difficulty_message(lang: Language) -> &'static str {
    match lang {
        Language::Es => {
            "Disculpe, hubo un error técnico. Por favor, intente de nuevo más tarde o \
             contacte directamente con el restaurante."
        }
        Language::En => {
            "Sorry, there was a technical problem. Please try again later or contact the \
             restaurant directly."
        }
        Language::De => {
            "Entschuldigung, es gab ein technisches Problem. Bitte versuchen Sie es später \
             erneut oder kontaktieren Sie das Restaurant direkt."
        }
        Language::It => {
            "Mi scusi, c'è stato un problema tecnico. Riprovi più tardi o contatti \
             direttamente il ristorante."
        }
        Language::Fr => {
            "Désolé, un problème technique est survenu. Veuillez réessayer plus tard ou \
             contacter directement le restaurant."
        }
        Language::Pt => {
            "Desculpe, houve um problema técnico. Tente novamente mais tarde ou contacte \
             diretamente o restaurante."
        }
    }
}

/// What one turn renders down the phone line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TwimlReply<'a> {
    /// Speak the prompt, then listen for the next utterance.
    Gather { prompt: &'a str, language: Language, action: &'a str },
    /// Speak the message, then hang up.
    Farewell { message: &'a str, language: Language },
    /// Status callbacks get an empty document.
    Empty,
}

impl TwimlReply<'_> {
    pub fn render(&self) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response>");
        match self {
            Self::Gather { prompt, language, action } => {
                let profile = voice_profile(*language);
                let action = escape_xml(action);
                let _ = write!(
                    xml,
                    "<Gather input=\"speech\" action=\"{action}\" method=\"POST\" \
                     language=\"{locale}\" speechTimeout=\"{SPEECH_TIMEOUT_SECS}\" \
                     timeout=\"{GATHER_TIMEOUT_SECS}\">\
                     <Say voice=\"{voice}\" language=\"{locale}\">{prompt}</Say>\
                     </Gather>\
                     <Say voice=\"{voice}\" language=\"{locale}\">{still_there}</Say>\
                     <Redirect>{action}</Redirect>",
                    locale = profile.locale,
                    voice = profile.voice,
                    prompt = escape_xml(prompt),
                    still_there = escape_xml(still_there_prompt(*language)),
                );
            }
            Self::Farewell { message, language } => {
                let profile = voice_profile(*language);
                let _ = write!(
                    xml,
                    "<Say voice=\"{voice}\" language=\"{locale}\">{message}</Say>\
                     <Pause length=\"1\"/><Hangup/>",
                    voice = profile.voice,
                    locale = profile.locale,
                    message = escape_xml(message),
                );
            }
            Self::Empty => {}
        }
        xml.push_str("</Response>");
        tracing::debug!(bytes = xml.len(), "rendered twiml");
        xml
    }
}

/// Renders the document for a completed dialogue turn.
pub fn for_turn(text: &str, language: Language, terminal: bool, action: &str) -> String {
    if terminal {
        TwimlReply::Farewell { message: text, language }.render()
    } else {
        TwimlReply::Gather { prompt: text, language, action }.render()
    }
}

/// The document spoken when the turn could not be processed at all.
pub fn technical_difficulty(language: Language) -> String {
    TwimlReply::Farewell { message: technical_difficulty_message(language), language }.render()
}

fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    use reserva_core::languages::ALL_LANGUAGES;

    #[test]
    fn gather_speaks_and_listens() {
        let xml = for_turn("¿Para cuántas personas?", Language::Es, false, "/voice");

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<Gather input=\"speech\" action=\"/voice\""));
        assert!(xml.contains("speechTimeout=\"3\""));
        assert!(xml.contains("timeout=\"8\""));
        assert!(xml.contains("Google.es-ES-Neural2-B"));
        assert!(xml.contains("¿Para cuántas personas?"));
        assert!(xml.contains("<Redirect>/voice</Redirect>"));
        assert!(!xml.contains("<Hangup/>"));
    }

    #[test]
    fn farewell_hangs_up() {
        let xml = for_turn("Su reserva está confirmada.", Language::Es, true, "/voice");

        assert!(xml.contains("Su reserva está confirmada."));
        assert!(xml.contains("<Pause length=\"1\"/>"));
        assert!(xml.contains("<Hangup/>"));
        assert!(!xml.contains("<Gather"));
    }

    #[test]
    fn replies_ride_the_detected_language() {
        let xml = for_turn("How many people?", Language::En, false, "/voice");

        assert!(xml.contains("Google.en-US-Neural2-J"));
        assert!(xml.contains("language=\"en-US\""));
        assert!(xml.contains("Are you still there?"));
    }

    #[test]
    fn reserved_characters_are_escaped() {
        let xml = for_turn("Mesa \"García & Hijos\" <patio>", Language::Es, true, "/voice");

        assert!(xml.contains("Mesa &quot;García &amp; Hijos&quot; &lt;patio&gt;"));
        assert!(!xml.contains("<patio>"));
    }

    #[test]
    fn status_callbacks_get_an_empty_document() {
        let xml = TwimlReply::Empty.render();
        assert_eq!(xml, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response></Response>");
    }

    #[test]
    fn every_language_has_its_own_voice() {
        let mut voices: Vec<&str> =
            ALL_LANGUAGES.iter().map(|lang| voice_profile(*lang).voice).collect();
        voices.sort_unstable();
        voices.dedup();
        assert_eq!(voices.len(), ALL_LANGUAGES.len());
    }

    #[test]
    fn technical_difficulty_always_hangs_up() {
        for lang in ALL_LANGUAGES {
            let xml = technical_difficulty(lang);
            assert!(xml.contains("<Hangup/>"), "missing hangup for {lang:?}");
        }
    }
}
