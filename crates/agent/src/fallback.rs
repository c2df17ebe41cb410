//! Deterministic keyword extraction.
//!
//! The last strategy in the chain: pure pattern matching over the
//! per-language keyword tables, used whenever the analyzer is unreachable or
//! returns something unparseable. Coverage is deliberately narrow; anything
//! this module cannot read becomes a clarification turn instead of a guess.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};

use reserva_core::dialogue::DialogueStep;
use reserva_core::domain::extraction::{
    ExtractionSource, Sentiment, SlotExtractionResult, Urgency,
};
use reserva_core::domain::session::{
    normalize_phone, CallIntent, Credibility, ReservationSlots, Slot,
};
use reserva_core::errors::ApplicationError;
use reserva_core::languages::{self, keywords, Language};

use crate::extractor::{ExtractionContext, ExtractionStrategy};

const MAX_PARTY_TOKEN: u32 = 20;
const MAX_NAME_TOKENS: usize = 4;

/// Tokens that end a name capture ("me llamo Ana y quiero reservar").
const NAME_STOP_TOKENS: &[&str] = &["y", "and", "und", "e", "et", "para", "for", "für", "pour"];

/// Nouns that follow an article-shaped "one"; "una mesa" carries no count.
const ARTICLE_NOUNS: &[&str] = &[
    "mesa",
    "table",
    "tisch",
    "tavolo",
    "reserva",
    "reservation",
    "reservierung",
    "prenotazione",
    "réservation",
];

pub struct DeterministicStrategy;

#[async_trait::async_trait]
impl ExtractionStrategy for DeterministicStrategy {
    fn name(&self) -> &'static str {
        "deterministic"
    }

    fn applicable(&self, _ctx: &ExtractionContext<'_>) -> bool {
        true
    }

    async fn extract(
        &self,
        utterance: &str,
        ctx: &ExtractionContext<'_>,
    ) -> Result<SlotExtractionResult, ApplicationError> {
        Ok(extract(utterance, ctx))
    }
}

/// Pure function of the utterance and call context.
pub fn extract(utterance: &str, ctx: &ExtractionContext<'_>) -> SlotExtractionResult {
    let normalized = languages::normalize(utterance);
    let detected = languages::detect(&normalized);
    let lang = detected.unwrap_or(ctx.session.language);

    let slots = ReservationSlots {
        party_size: extract_party_size(&normalized, lang)
            .map(|count| Slot::new(count, Credibility::High)),
        date: extract_date(&normalized, lang, ctx.today())
            .map(|date| Slot::new(date, Credibility::High)),
        time: extract_time(&normalized, lang, ctx.session.step == DialogueStep::AskTime),
        customer_name: extract_name(&normalized, lang, ctx.session.step == DialogueStep::AskName),
        phone: extract_phone(&normalized, lang).map(|p| Slot::new(p, Credibility::High)),
    };

    let frustrated = keywords::contains_any(&normalized, keywords::frustration_markers(lang));
    let confused = keywords::contains_any(&normalized, keywords::confusion_markers(lang));

    SlotExtractionResult {
        intent: detect_intent(&normalized, lang),
        language: detected,
        slots,
        sentiment: if frustrated { Sentiment::Frustrated } else { Sentiment::Neutral },
        urgency: if frustrated { Urgency::High } else { Urgency::Normal },
        needs_clarification: confused,
        clarification_question: None,
        order_items: Vec::new(),
        source: ExtractionSource::Deterministic,
    }
}

fn detect_intent(normalized: &str, lang: Language) -> CallIntent {
    if keywords::contains_any(normalized, keywords::cancellations(lang)) {
        CallIntent::Cancel
    } else if keywords::contains_any(normalized, keywords::modifications(lang)) {
        CallIntent::Modify
    } else if keywords::contains_any(normalized, keywords::order_phrases(lang)) {
        CallIntent::Order
    } else {
        CallIntent::Reservation
    }
}

/// First number in [1, 20], spoken or digital, that is not part of a clock
/// reading.
pub fn extract_party_size(normalized: &str, lang: Language) -> Option<u32> {
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    for (i, token) in tokens.iter().enumerate() {
        if looks_like_clock_position(&tokens, i, lang) {
            continue;
        }
        if let Some(count) = keywords::number_word(lang, token) {
            let article = count == 1
                && tokens.get(i + 1).is_some_and(|next| ARTICLE_NOUNS.contains(next));
            if !article {
                return Some(count);
            }
            continue;
        }
        if let Ok(count) = token.parse::<u32>() {
            if (1..=MAX_PARTY_TOKEN).contains(&count) {
                return Some(count);
            }
        }
    }
    None
}

/// A numeric token sits in clock position when a time lead-in precedes it or
/// a morning/evening marker follows it. Those numbers belong to
/// [`extract_time`], not the party count.
fn looks_like_clock_position(tokens: &[&str], index: usize, lang: Language) -> bool {
    let token = tokens[index];
    if token.contains(':') || token.contains('/') {
        return true;
    }
    let left = tokens[..index].join(" ");
    if keywords::time_lead_ins(lang).iter().any(|lead| ends_with_phrase(&left, lead)) {
        return true;
    }
    let right = tokens[index + 1..].join(" ");
    keywords::morning_markers(lang)
        .iter()
        .chain(keywords::evening_markers(lang))
        .any(|marker| starts_with_phrase(&right, marker))
}

/// Relative day words first, then numeric `dd/mm`.
///
/// Morning markers are stripped before matching so "de la mañana" in a time
/// expression never reads as tomorrow.
pub fn extract_date(normalized: &str, lang: Language, today: NaiveDate) -> Option<NaiveDate> {
    let text = strip_phrases(normalized, keywords::morning_markers(lang));

    // "pasado mañana" contains "mañana"; longest phrase wins.
    if keywords::contains_any(&text, keywords::day_after_words(lang)) {
        return Some(today + Duration::days(2));
    }
    if keywords::contains_any(&text, keywords::tomorrow_words(lang)) {
        return Some(today + Duration::days(1));
    }
    if keywords::contains_any(&text, keywords::today_words(lang)) {
        return Some(today);
    }

    for token in text.split_whitespace() {
        let Some((day_raw, month_raw)) = token.split_once('/') else { continue };
        let (Ok(day), Ok(month)) = (day_raw.parse::<u32>(), month_raw.parse::<u32>()) else {
            continue;
        };
        let Some(candidate) = NaiveDate::from_ymd_opt(today.year(), month, day) else { continue };
        // A past date this year means the caller is talking about next year.
        if candidate < today {
            return NaiveDate::from_ymd_opt(today.year() + 1, month, day);
        }
        return Some(candidate);
    }
    None
}

/// Clock readings, last mention wins so corrections land.
///
/// Bare hours only count inside a time context: a lead-in phrase, a
/// morning/evening marker, or the agent having just asked for the time. An
/// unmarked 1 to 11 is assumed to mean the evening at half confidence; the
/// confirmation read-back gives the caller the chance to push back.
pub fn extract_time(normalized: &str, lang: Language, asked_for_time: bool) -> Option<Slot<NaiveTime>> {
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    let has_morning = keywords::contains_any(normalized, keywords::morning_markers(lang));
    let has_evening = keywords::contains_any(normalized, keywords::evening_markers(lang));

    let mut best: Option<Slot<NaiveTime>> = None;
    for (i, token) in tokens.iter().enumerate() {
        if let Some((hour_raw, minute_raw)) = token.split_once(':') {
            let (Ok(hour), Ok(minute)) = (hour_raw.parse::<u32>(), minute_raw.parse::<u32>())
            else {
                continue;
            };
            if hour > 23 || minute > 59 {
                continue;
            }
            let hour = if has_evening && hour < 12 { hour + 12 } else { hour };
            if let Some(time) = NaiveTime::from_hms_opt(hour, minute, 0) {
                best = Some(Slot::new(time, Credibility::High));
            }
            continue;
        }

        let spoken = keywords::number_word(lang, token);
        let digital = token.parse::<u32>().ok().filter(|h| *h <= 23);
        let Some(hour) = spoken.or(digital) else { continue };

        let in_position = looks_like_clock_position(&tokens, i, lang);
        if !(in_position || asked_for_time) {
            continue;
        }

        let right = tokens[i + 1..].join(" ");
        let minute = if keywords::half_past_words(lang).iter().any(|w| starts_with_phrase(&right, w))
        {
            30
        } else if keywords::quarter_past_words(lang).iter().any(|w| starts_with_phrase(&right, w)) {
            15
        } else {
            0
        };

        let (hour, credibility) = if has_morning {
            (hour, Credibility::High)
        } else if has_evening {
            (if hour < 12 { hour + 12 } else { hour }, Credibility::High)
        } else if (1..=11).contains(&hour) {
            (hour + 12, Credibility::Low)
        } else {
            (hour, Credibility::High)
        };

        if let Some(time) = NaiveTime::from_hms_opt(hour, minute, 0) {
            best = Some(Slot::new(time, credibility));
        }
    }
    best
}

/// Name via the per-language lead-in templates, or a short bare reply when
/// the agent just asked for the name.
pub fn extract_name(normalized: &str, lang: Language, asked_for_name: bool) -> Option<Slot<String>> {
    for template in keywords::name_templates(lang) {
        let Some(position) = find_phrase(normalized, template) else { continue };
        let tail = &normalized[position + template.len()..];
        let name = collect_name_tokens(tail);
        if !name.is_empty() {
            return Some(Slot::new(name, Credibility::High));
        }
    }

    if asked_for_name {
        let tokens: Vec<&str> = normalized.split_whitespace().collect();
        let plausible = (1..=3).contains(&tokens.len())
            && tokens.iter().all(|t| t.chars().all(char::is_alphabetic))
            && !keywords::is_affirmation(lang, normalized)
            && !keywords::is_negation(lang, normalized);
        if plausible {
            return Some(Slot::new(capitalize_words(normalized), Credibility::Low));
        }
    }
    None
}

fn collect_name_tokens(tail: &str) -> String {
    let tokens: Vec<&str> = tail
        .split_whitespace()
        .take_while(|t| {
            !NAME_STOP_TOKENS.contains(t) && t.chars().all(char::is_alphabetic)
        })
        .take(MAX_NAME_TOKENS)
        .collect();
    capitalize_words(&tokens.join(" "))
}

fn capitalize_words(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// A single token with nine or more digits wins outright; otherwise digits
/// are assembled from consecutive spoken or digital tokens, so a dictated
/// "seis cero cero..." comes through but scattered numbers never combine
/// into a phantom phone number.
pub fn extract_phone(normalized: &str, lang: Language) -> Option<String> {
    for token in normalized.split_whitespace() {
        if token.chars().filter(char::is_ascii_digit).count() >= 9 {
            if let Some(digits) = normalize_phone(token) {
                return Some(digits);
            }
        }
    }

    let mut run = String::new();
    for token in normalized.split_whitespace() {
        if token.contains(':') || token.contains('/') {
            run.clear();
            continue;
        }
        if token.chars().all(|c| c.is_ascii_digit()) {
            run.push_str(token);
        } else if let Some(value) = keywords::digit_word(lang, token) {
            run.push_str(&value.to_string());
        } else {
            if run.len() >= 9 {
                break;
            }
            run.clear();
        }
    }
    normalize_phone(&run)
}

fn strip_phrases(text: &str, phrases: &[&str]) -> String {
    let mut out = text.to_string();
    for phrase in phrases {
        if phrase.contains(' ') {
            out = out.replace(phrase, " ");
        } else {
            out = out
                .split_whitespace()
                .filter(|token| token != phrase)
                .collect::<Vec<_>>()
                .join(" ");
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn starts_with_phrase(text: &str, phrase: &str) -> bool {
    text == phrase || text.starts_with(&format!("{phrase} "))
}

fn ends_with_phrase(text: &str, phrase: &str) -> bool {
    text == phrase || text.ends_with(&format!(" {phrase}"))
}

/// Positions a phrase on token boundaries; `find` alone would let "soy"
/// match inside "apellidos".
fn find_phrase(text: &str, phrase: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(offset) = text[from..].find(phrase) {
        let start = from + offset;
        let end = start + phrase.len();
        let left_ok = start == 0 || text[..start].ends_with(' ');
        let right_ok = end == text.len() || text[end..].starts_with(' ');
        if left_ok && right_ok {
            return Some(start);
        }
        from = end;
    }
    None
}
