//! Static per-language keyword and phrase tables.
//!
//! Entries are stored pre-normalized (lowercase, no punctuation) so they can
//! be matched against [`super::normalize`] output. Multi-word entries match as
//! substrings; single words match whole tokens only, so "no" never fires
//! inside "noche".

use super::Language;

pub fn greetings(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::Es => &["hola", "buenas", "buenos días", "buenas tardes", "buenas noches"],
        Language::En => &["hello", "hi", "hey", "good morning", "good afternoon", "good evening"],
        Language::De => &["hallo", "guten tag", "guten morgen", "guten abend", "servus"],
        Language::It => &["ciao", "salve", "buongiorno", "buonasera"],
        Language::Fr => &["bonjour", "bonsoir", "salut", "allô"],
        Language::Pt => &["olá", "ola", "oi", "bom dia", "boa tarde", "boa noite"],
    }
}

pub fn farewells(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::Es => &["adiós", "adios", "hasta luego", "chao", "nada más"],
        Language::En => &["goodbye", "bye", "see you", "that's all", "that is all"],
        Language::De => &["tschüss", "auf wiedersehen", "auf wiederhören", "das wars"],
        Language::It => &["arrivederci", "a presto", "ciao ciao"],
        Language::Fr => &["au revoir", "à bientôt", "c'est tout"],
        Language::Pt => &["adeus", "tchau", "até logo", "é tudo"],
    }
}

pub fn affirmations(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::Es => &[
            "sí", "si", "claro", "vale", "correcto", "perfecto", "exacto", "de acuerdo",
            "por supuesto", "confirmo", "así es", "eso es",
        ],
        Language::En => &[
            "yes", "yeah", "yep", "sure", "correct", "right", "exactly", "of course", "confirm",
            "confirmed", "ok", "okay", "that's right",
        ],
        Language::De => &["ja", "genau", "richtig", "korrekt", "sicher", "natürlich", "okay"],
        Language::It => &["sì", "si", "certo", "esatto", "va bene", "perfetto", "d'accordo"],
        Language::Fr => &["oui", "ouais", "d'accord", "exactement", "parfait", "bien sûr", "c'est ça"],
        Language::Pt => &["sim", "claro", "certo", "correto", "exato", "perfeito", "de acordo"],
    }
}

pub fn negations(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::Es => &["no", "para nada", "no es correcto", "negativo", "tampoco", "así no"],
        Language::En => &["no", "nope", "not really", "incorrect", "negative", "not quite"],
        Language::De => &["nein", "nee", "falsch", "nicht richtig", "stimmt nicht"],
        Language::It => &["no", "non è corretto", "niente affatto", "sbagliato"],
        Language::Fr => &["non", "pas du tout", "incorrect", "pas vraiment"],
        Language::Pt => &["não", "nao", "negativo", "incorreto", "errado"],
    }
}

pub fn cancellations(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::Es => &[
            "cancelar", "anular", "quiero cancelar", "cancelar mi reserva", "anular la reserva",
            "borrar la reserva", "cancelación",
        ],
        Language::En => &[
            "cancel", "cancel my reservation", "want to cancel", "call off", "delete my booking",
            "cancellation",
        ],
        Language::De => &[
            "stornieren", "absagen", "reservierung stornieren", "termin absagen", "stornierung",
        ],
        Language::It => &["cancellare", "annullare", "disdire", "cancellare la prenotazione"],
        Language::Fr => &["annuler", "annulation", "annuler ma réservation", "supprimer la réservation"],
        Language::Pt => &["cancelar", "anular", "cancelar a reserva", "desmarcar"],
    }
}

pub fn modifications(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::Es => &["cambiar", "modificar", "cambiar mi reserva", "mover la reserva"],
        Language::En => &["change", "modify", "move my reservation", "reschedule"],
        Language::De => &["ändern", "verschieben", "umbuchen"],
        Language::It => &["cambiare", "modificare", "spostare la prenotazione"],
        Language::Fr => &["changer", "modifier", "déplacer ma réservation"],
        Language::Pt => &["mudar", "alterar", "remarcar"],
    }
}

pub fn order_phrases(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::Es => &["pedido", "pedir comida", "para llevar", "hacer un pedido"],
        Language::En => &["order", "takeaway", "take out", "to go", "place an order"],
        Language::De => &["bestellen", "bestellung", "zum mitnehmen"],
        Language::It => &["ordinare", "un ordine", "da asporto"],
        Language::Fr => &["commander", "une commande", "à emporter"],
        Language::Pt => &["um pedido", "encomendar", "para levar"],
    }
}

pub fn frustration_markers(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::Es => &[
            "no funciona", "esto es ridículo", "estoy harto", "estoy harta", "qué desastre",
            "no me entiende", "es inútil",
        ],
        Language::En => &[
            "this is ridiculous", "doesn't work", "does not work", "you don't understand",
            "useless", "i'm fed up", "terrible",
        ],
        Language::De => &[
            "das ist lächerlich", "funktioniert nicht", "sie verstehen mich nicht", "unmöglich",
        ],
        Language::It => &["è ridicolo", "non funziona", "non mi capisce", "assurdo"],
        Language::Fr => &["c'est ridicule", "ça ne marche pas", "vous ne comprenez pas", "n'importe quoi"],
        Language::Pt => &["é ridículo", "não funciona", "não me entende", "absurdo"],
    }
}

pub fn confusion_markers(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::Es => &["no entiendo", "no comprendo", "puede repetir", "cómo dice", "no sé"],
        Language::En => &["i don't understand", "pardon", "can you repeat", "say again", "confused"],
        Language::De => &["ich verstehe nicht", "wie bitte", "können sie wiederholen"],
        Language::It => &["non capisco", "può ripetere", "come scusi"],
        Language::Fr => &["je ne comprends pas", "pouvez-vous répéter", "comment ça"],
        Language::Pt => &["não entendo", "pode repetir", "como disse"],
    }
}

pub fn today_words(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::Es => &["hoy", "esta noche", "este mediodía"],
        Language::En => &["today", "tonight", "this evening"],
        Language::De => &["heute", "heute abend"],
        Language::It => &["oggi", "stasera"],
        Language::Fr => &["aujourd'hui", "ce soir"],
        Language::Pt => &["hoje", "esta noite"],
    }
}

pub fn tomorrow_words(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::Es => &["mañana"],
        Language::En => &["tomorrow"],
        Language::De => &["morgen"],
        Language::It => &["domani"],
        Language::Fr => &["demain"],
        Language::Pt => &["amanhã", "amanha"],
    }
}

pub fn day_after_words(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::Es => &["pasado mañana"],
        Language::En => &["day after tomorrow"],
        Language::De => &["übermorgen"],
        Language::It => &["dopodomani"],
        Language::Fr => &["après demain"],
        Language::Pt => &["depois de amanhã", "depois de amanha"],
    }
}

/// Phrases that pin a clock reading to the morning. Also stripped before
/// relative-date matching so "de la mañana" never reads as "tomorrow".
pub fn morning_markers(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::Es => &["de la mañana", "por la mañana", "am"],
        Language::En => &["am", "a m", "in the morning"],
        Language::De => &["morgens", "vormittags"],
        Language::It => &["di mattina", "della mattina"],
        Language::Fr => &["du matin"],
        Language::Pt => &["da manhã", "da manha"],
    }
}

pub fn evening_markers(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::Es => &["de la tarde", "de la noche", "por la tarde", "por la noche", "pm"],
        Language::En => &["pm", "p m", "in the evening", "at night", "in the afternoon"],
        Language::De => &["abends", "am abend", "nachmittags"],
        Language::It => &["di sera", "della sera", "di pomeriggio"],
        Language::Fr => &["du soir", "de l'après midi"],
        Language::Pt => &["da tarde", "da noite"],
    }
}

/// Lead-ins that announce the caller's name; the tokens that follow are the
/// name candidate.
pub fn name_templates(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::Es => &["me llamo", "mi nombre es", "soy", "a nombre de"],
        Language::En => &["my name is", "i am", "i'm", "this is", "under the name"],
        Language::De => &["ich heiße", "ich heisse", "mein name ist", "ich bin", "auf den namen"],
        Language::It => &["mi chiamo", "il mio nome è", "sono", "a nome di"],
        Language::Fr => &["je m'appelle", "mon nom est", "je suis", "au nom de"],
        Language::Pt => &["me chamo", "chamo me", "meu nome é", "sou", "em nome de"],
    }
}

pub fn number_word(lang: Language, token: &str) -> Option<u32> {
    let table: &[(&str, u32)] = match lang {
        Language::Es => &[
            ("un", 1), ("uno", 1), ("una", 1), ("dos", 2), ("tres", 3), ("cuatro", 4),
            ("cinco", 5), ("seis", 6), ("siete", 7), ("ocho", 8), ("nueve", 9), ("diez", 10),
            ("once", 11), ("doce", 12),
        ],
        Language::En => &[
            ("one", 1), ("two", 2), ("three", 3), ("four", 4), ("five", 5), ("six", 6),
            ("seven", 7), ("eight", 8), ("nine", 9), ("ten", 10), ("eleven", 11), ("twelve", 12),
        ],
        Language::De => &[
            ("ein", 1), ("eins", 1), ("zwei", 2), ("drei", 3), ("vier", 4), ("fünf", 5),
            ("sechs", 6), ("sieben", 7), ("acht", 8), ("neun", 9), ("zehn", 10), ("elf", 11),
            ("zwölf", 12),
        ],
        Language::It => &[
            ("un", 1), ("uno", 1), ("una", 1), ("due", 2), ("tre", 3), ("quattro", 4),
            ("cinque", 5), ("sei", 6), ("sette", 7), ("otto", 8), ("nove", 9), ("dieci", 10),
            ("undici", 11), ("dodici", 12),
        ],
        Language::Fr => &[
            ("un", 1), ("une", 1), ("deux", 2), ("trois", 3), ("quatre", 4), ("cinq", 5),
            ("six", 6), ("sept", 7), ("huit", 8), ("neuf", 9), ("dix", 10), ("onze", 11),
            ("douze", 12),
        ],
        Language::Pt => &[
            ("um", 1), ("uma", 1), ("dois", 2), ("duas", 2), ("três", 3), ("tres", 3),
            ("quatro", 4), ("cinco", 5), ("seis", 6), ("sete", 7), ("oito", 8), ("nove", 9),
            ("dez", 10), ("onze", 11), ("doze", 12),
        ],
    };
    table.iter().find(|(word, _)| *word == token).map(|(_, value)| *value)
}

/// Spoken digits for phone-number assembly. Unlike [`number_word`] this
/// includes zero and stops at nine.
pub fn digit_word(lang: Language, token: &str) -> Option<u32> {
    let zero = match lang {
        Language::Es => "cero",
        Language::En => "zero",
        Language::De => "null",
        Language::It => "zero",
        Language::Fr => "zéro",
        Language::Pt => "zero",
    };
    if token == zero {
        return Some(0);
    }
    number_word(lang, token).filter(|value| *value <= 9)
}

/// Phrases that introduce a clock reading ("a las ocho").
pub fn time_lead_ins(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::Es => &["a las", "a la"],
        Language::En => &["at"],
        Language::De => &["um"],
        Language::It => &["alle"],
        Language::Fr => &["à"],
        Language::Pt => &["às"],
    }
}

/// Minute suffixes spoken after the hour ("ocho y media").
pub fn half_past_words(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::Es => &["y media", "y treinta"],
        Language::En => &["thirty", "half past"],
        Language::De => &["uhr dreißig", "uhr dreissig"],
        Language::It => &["e mezza", "e mezzo"],
        Language::Fr => &["et demie"],
        Language::Pt => &["e meia"],
    }
}

pub fn quarter_past_words(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::Es => &["y cuarto", "y quince"],
        Language::En => &["fifteen", "quarter past"],
        Language::De => &["uhr fünfzehn", "uhr fuenfzehn"],
        Language::It => &["e un quarto"],
        Language::Fr => &["et quart"],
        Language::Pt => &["e um quarto"],
    }
}

/// Words distinctive enough to vote for a language during detection.
pub fn detection_markers(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::Es => &[
            "hola", "buenas", "quiero", "quisiera", "reservar", "personas", "gracias", "noche",
            "por favor", "somos",
        ],
        Language::En => &[
            "hello", "hi", "please", "thanks", "tomorrow", "people", "reservation", "table",
            "tonight", "would like",
        ],
        Language::De => &[
            "hallo", "guten", "bitte", "danke", "personen", "tisch", "reservierung", "uhr",
            "abend", "möchte",
        ],
        Language::It => &[
            "ciao", "buongiorno", "buonasera", "grazie", "domani", "persone", "tavolo",
            "prenotazione", "stasera", "vorrei",
        ],
        Language::Fr => &[
            "bonjour", "bonsoir", "merci", "demain", "personnes", "réserver", "réservation",
            "soir", "voudrais", "table pour",
        ],
        Language::Pt => &[
            "olá", "oi", "obrigado", "obrigada", "amanhã", "pessoas", "uma mesa", "queria",
            "noite", "gostaria",
        ],
    }
}

pub fn detection_score(lang: Language, normalized: &str) -> usize {
    detection_markers(lang).iter().filter(|phrase| matches_phrase(normalized, phrase)).count()
}

/// True when any table entry matches the normalized utterance.
pub fn contains_any(normalized: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| matches_phrase(normalized, phrase))
}

fn matches_phrase(normalized: &str, phrase: &str) -> bool {
    if phrase.contains(' ') {
        normalized.contains(phrase)
    } else {
        normalized.split_whitespace().any(|token| token == phrase)
    }
}

pub fn is_affirmation(lang: Language, normalized: &str) -> bool {
    contains_any(normalized, affirmations(lang))
}

pub fn is_negation(lang: Language, normalized: &str) -> bool {
    contains_any(normalized, negations(lang))
}
