//! Gemini-backed slot analyzer.
//!
//! One prompt per caller turn. The model is asked for a fixed JSON shape and
//! nothing else; anything that does not parse back into that shape is treated
//! as malformed output so the deterministic parser can take over.

use std::fmt::Write as _;

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::Deserialize;

use reserva_core::domain::extraction::{
    ExtractionSource, Sentiment, SlotExtractionResult, Urgency,
};
use reserva_core::domain::session::{
    normalize_phone, CallIntent, Credibility, ReservationSlots, Slot,
};
use reserva_core::errors::ApplicationError;
use reserva_core::languages::Language;

use crate::extractor::{ExtractionContext, ExtractionStrategy};
use crate::llm::LlmClient;

/// Fixed tail of the prompt. Kept out of `format!` so the braces in the JSON
/// schema stay literal.
const OUTPUT_SCHEMA: &str = r#"## FORMATO DE SALIDA (SOLO JSON, sin explicaciones)
{
  "intencion": "reservation" | "modify" | "cancel" | "order" | "clarify",
  "comensales": null o "número",
  "comensales_porcentaje_credivilidad": "0%" | "50%" | "100%",
  "comensales_validos": "true" | "false" | null,
  "comensales_error": null | "max_exceeded" | "min_not_met",
  "fecha": null o "YYYY-MM-DD",
  "fecha_porcentaje_credivilidad": "0%" | "50%" | "100%",
  "hora": null o "HH:MM",
  "hora_disponible": "true" | "false" | null,
  "hora_error": null | "fuera_horario",
  "hora_porcentaje_credivilidad": "0%" | "50%" | "100%",
  "nombre": null o "texto",
  "nombre_porcentaje_credivilidad": "0%" | "50%" | "100%",
  "telefono": null o "solo dígitos",
  "idioma_detectado": "es" | "en" | "de" | "fr" | "it" | "pt",
  "sentimiento": "positive" | "neutral" | "negative" | "frustrated",
  "urgencia": "low" | "normal" | "high",
  "necesita_aclaracion": "true" | "false",
  "pregunta_aclaracion": null o "texto",
  "pedido_items": ["nombre del plato"]
}

NOTA SOBRE INTENCIÓN:
- "reservation": El usuario quiere hacer una nueva reserva
- "modify": El usuario quiere modificar una reserva existente
- "cancel": El usuario quiere cancelar una reserva existente
- "order": El usuario quiere hacer un pedido a domicilio
- "clarify": El texto es ambiguo o no indica una intención clara

NOTA SOBRE VALIDACIONES:
- "comensales_validos": "false" si el número excede el máximo o es menor al mínimo
- "hora_disponible": "false" si la hora está fuera de los horarios del restaurante
- Si hay errores de validación, aún devuelve los valores extraídos pero marca los errores para que el sistema pueda informar al cliente

IMPORTANTE: Responde SOLO con el JSON, sin texto adicional."#;

pub struct AnalyzerStrategy {
    llm: Box<dyn LlmClient>,
}

impl AnalyzerStrategy {
    pub fn new(llm: impl LlmClient + 'static) -> Self {
        Self { llm: Box::new(llm) }
    }
}

#[async_trait::async_trait]
impl ExtractionStrategy for AnalyzerStrategy {
    fn name(&self) -> &'static str {
        "analyzer"
    }

    fn applicable(&self, _ctx: &ExtractionContext<'_>) -> bool {
        true
    }

    async fn extract(
        &self,
        utterance: &str,
        ctx: &ExtractionContext<'_>,
    ) -> Result<SlotExtractionResult, ApplicationError> {
        let prompt = build_prompt(utterance, ctx);
        let raw = self
            .llm
            .complete(&prompt)
            .await
            .map_err(|error| ApplicationError::ExtractionUnavailable(error.to_string()))?;
        parse_response(&raw)
    }
}

/// Assembles the per-turn analyzer prompt.
///
/// Everything the model needs to resolve relative dates and apply the booking
/// rules travels in the prompt itself; the model never sees more than the
/// recent conversation tail.
pub fn build_prompt(utterance: &str, ctx: &ExtractionContext<'_>) -> String {
    let restaurant = ctx.restaurant;
    let now = ctx.now.naive_utc();
    let today = now.date();
    let tomorrow = today + Duration::days(1);
    let day_after = today + Duration::days(2);

    let mut windows = String::new();
    for window in &restaurant.service_windows {
        let _ = writeln!(
            windows,
            "  - {}: {} - {}",
            window.label,
            window.opens.format("%H:%M"),
            window.closes.format("%H:%M")
        );
    }
    let windows = windows.trim_end();

    let tail = ctx.session.context_tail();
    let history_section = if tail.is_empty() {
        String::new()
    } else {
        format!("\n## CONVERSACIÓN RECIENTE\n{tail}\n")
    };

    let head = format!(
        "## MISIÓN\n\
         Eres un experto analizador de texto especializado en extraer información de reservas de restaurante.\n\
         Tu objetivo es analizar UNA SOLA frase del cliente y extraer TODO lo que puedas de ella, VALIDANDO contra las restricciones del restaurante.\n\
         \n\
         ## CONTEXTO ACTUAL\n\
         - Fecha y hora actual: {current}\n\
         - Fecha de mañana: {tomorrow}\n\
         - Fecha de pasado mañana: {day_after}\n\
         \n\
         ## CONFIGURACIÓN DEL RESTAURANTE\n\
         - Nombre: {name}\n\
         - Máximo de personas por reserva: {max_party}\n\
         - Mínimo de personas por reserva: {min_party}\n\
         - Horarios de servicio:\n\
         {windows}\n\
         - Antelación mínima requerida: {advance} horas\n\
         {history_section}\n\
         ## TEXTO A ANALIZAR\n\
         \"{utterance}\"\n\
         \n\
         ## REGLAS CRÍTICAS\n\
         1. NO INVENTES información. Si no está en el texto, devuelve null.\n\
         2. Si NO estás seguro, usa porcentaje de credibilidad bajo (0% o 50%).\n\
         3. Si estás muy seguro, usa 100%.\n\
         4. VALIDA contra las restricciones del restaurante:\n\
            - Si el número de comensales es mayor a {max_party}, marca \"comensales_validos\": \"false\" y \"comensales_error\": \"max_exceeded\"\n\
            - Si el número de comensales es menor a {min_party}, marca \"comensales_validos\": \"false\" y \"comensales_error\": \"min_not_met\"\n\
            - VALIDACIÓN DE HORA (MUY IMPORTANTE):\n\
              * Si la hora extraída está DENTRO de alguno de los horarios de servicio listados arriba, marca \"hora_disponible\": \"true\"\n\
              * Si la hora extraída está FUERA de todos los horarios de servicio, marca \"hora_disponible\": \"false\" y \"hora_error\": \"fuera_horario\"\n\
              * SIEMPRE valida la hora contra los horarios listados arriba antes de marcar \"hora_disponible\"\n\
         5. Convierte todo a formato estándar:\n\
            - Comensales: SIEMPRE extrae el número mencionado en el texto, incluso si excede el máximo. Si el texto dice \"30 personas\", devuelve \"30\" con credibilidad 100%. Si no hay número, devuelve null con credibilidad 0%.\n\
            - Fecha: YYYY-MM-DD\n\
            - Hora: HH:MM (formato 24h)\n\
            - Teléfono: solo dígitos\n\
            - Nombre: texto o null\n\
         \n",
        current = now.format("%Y-%m-%d %H:%M:%S"),
        tomorrow = tomorrow.format("%Y-%m-%d"),
        day_after = day_after.format("%Y-%m-%d"),
        name = restaurant.name,
        max_party = restaurant.max_party_size,
        min_party = restaurant.min_party_size,
        windows = windows,
        advance = restaurant.min_advance_hours,
        history_section = history_section,
        utterance = utterance,
    );

    head + OUTPUT_SCHEMA
}

/// Parses the model reply into a [`SlotExtractionResult`].
///
/// Date and time strings that do not match the formats the prompt demanded
/// are malformed output, not caller error; the whole reply is rejected so the
/// deterministic strategy gets a clean shot at the utterance.
pub fn parse_response(raw: &str) -> Result<SlotExtractionResult, ApplicationError> {
    let body = strip_json_fences(raw);
    let payload: AnalyzerPayload = serde_json::from_str(body)
        .map_err(|error| ApplicationError::ExtractionMalformed(error.to_string()))?;

    let mut slots = ReservationSlots::default();

    if let Some(count) = payload.comensales.as_ref().and_then(Tolerant::as_u32) {
        let credibility = credibility_of(payload.comensales_porcentaje_credivilidad.as_deref());
        slots.party_size = Some(match advisory_error(
            payload.comensales_validos.as_ref(),
            payload.comensales_error.as_deref(),
        ) {
            Some(code) => Slot::with_error(count, credibility, code),
            None => Slot::new(count, credibility),
        });
    }

    if let Some(raw_date) = payload.fecha.as_deref() {
        let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|_| {
            ApplicationError::ExtractionMalformed(format!("unparseable fecha `{raw_date}`"))
        })?;
        let credibility = credibility_of(payload.fecha_porcentaje_credivilidad.as_deref());
        slots.date = Some(Slot::new(date, credibility));
    }

    if let Some(raw_time) = payload.hora.as_deref() {
        let time = NaiveTime::parse_from_str(raw_time, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw_time, "%H:%M:%S"))
            .map_err(|_| {
                ApplicationError::ExtractionMalformed(format!("unparseable hora `{raw_time}`"))
            })?;
        let credibility = credibility_of(payload.hora_porcentaje_credivilidad.as_deref());
        slots.time = Some(match advisory_error(
            payload.hora_disponible.as_ref(),
            payload.hora_error.as_deref(),
        ) {
            Some(code) => Slot::with_error(time, credibility, code),
            None => Slot::new(time, credibility),
        });
    }

    if let Some(name) = payload.nombre.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        let credibility = credibility_of(payload.nombre_porcentaje_credivilidad.as_deref());
        slots.customer_name = Some(Slot::new(name.to_string(), credibility));
    }

    if let Some(digits) = payload.telefono.as_ref().and_then(|t| normalize_phone(&t.digits())) {
        slots.phone = Some(Slot::new(digits, Credibility::High));
    }

    let intent = payload
        .intencion
        .as_deref()
        .map(CallIntent::from_analyzer_label)
        .unwrap_or(CallIntent::Clarify);

    let needs_clarification = payload
        .necesita_aclaracion
        .as_ref()
        .and_then(Tolerant::as_bool)
        .unwrap_or(intent == CallIntent::Clarify);

    Ok(SlotExtractionResult {
        intent,
        language: payload.idioma_detectado.as_deref().and_then(|code| code.parse::<Language>().ok()),
        slots,
        sentiment: sentiment_of(payload.sentimiento.as_deref()),
        urgency: urgency_of(payload.urgencia.as_deref()),
        needs_clarification,
        clarification_question: payload
            .pregunta_aclaracion
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty()),
        order_items: payload
            .pedido_items
            .unwrap_or_default()
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect(),
        source: ExtractionSource::Analyzer,
    })
}

/// Model replies wrapped in Markdown fences still count as JSON.
fn strip_json_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let opened = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    opened.strip_suffix("```").unwrap_or(opened).trim()
}

fn credibility_of(label: Option<&str>) -> Credibility {
    label.map(Credibility::from_percent_label).unwrap_or_default()
}

/// An advisory validation failure travels with the value; the policy layer
/// re-checks everything anyway.
fn advisory_error(flag: Option<&Tolerant>, code: Option<&str>) -> Option<String> {
    if flag.and_then(Tolerant::as_bool) == Some(false) {
        code.map(str::to_string)
    } else {
        None
    }
}

fn sentiment_of(label: Option<&str>) -> Sentiment {
    match label.map(|l| l.trim().to_lowercase()).as_deref() {
        Some("positive" | "positivo") => Sentiment::Positive,
        Some("frustrated" | "negative" | "frustrado" | "negativo") => Sentiment::Frustrated,
        _ => Sentiment::Neutral,
    }
}

fn urgency_of(label: Option<&str>) -> Urgency {
    match label.map(|l| l.trim().to_lowercase()).as_deref() {
        Some("high" | "alta") => Urgency::High,
        _ => Urgency::Normal,
    }
}

/// The schema asks for quoted values, but the model occasionally emits bare
/// numbers or booleans; both are accepted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Tolerant {
    Text(String),
    Number(u64),
    Flag(bool),
}

impl Tolerant {
    fn as_u32(&self) -> Option<u32> {
        match self {
            Tolerant::Text(text) => text.trim().parse().ok(),
            Tolerant::Number(value) => u32::try_from(*value).ok(),
            Tolerant::Flag(_) => None,
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            Tolerant::Flag(value) => Some(*value),
            Tolerant::Text(text) => match text.trim() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            Tolerant::Number(_) => None,
        }
    }

    fn digits(&self) -> String {
        match self {
            Tolerant::Text(text) => text.chars().filter(char::is_ascii_digit).collect(),
            Tolerant::Number(value) => value.to_string(),
            Tolerant::Flag(_) => String::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnalyzerPayload {
    intencion: Option<String>,
    comensales: Option<Tolerant>,
    comensales_porcentaje_credivilidad: Option<String>,
    comensales_validos: Option<Tolerant>,
    comensales_error: Option<String>,
    fecha: Option<String>,
    fecha_porcentaje_credivilidad: Option<String>,
    hora: Option<String>,
    hora_disponible: Option<Tolerant>,
    hora_error: Option<String>,
    hora_porcentaje_credivilidad: Option<String>,
    nombre: Option<String>,
    nombre_porcentaje_credivilidad: Option<String>,
    telefono: Option<Tolerant>,
    idioma_detectado: Option<String>,
    sentimiento: Option<String>,
    urgencia: Option<String>,
    necesita_aclaracion: Option<Tolerant>,
    pregunta_aclaracion: Option<String>,
    pedido_items: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use reserva_core::config::{RestaurantConfig, ServiceWindow};
    use reserva_core::domain::session::CallSession;

    fn sample_restaurant() -> RestaurantConfig {
        RestaurantConfig {
            name: "La Terraza".to_string(),
            default_language: Language::Es,
            min_party_size: 1,
            max_party_size: 20,
            max_capacity: 50,
            capacity_buffer_percent: 20,
            reservation_duration_minutes: 90,
            overlap_window_minutes: 15,
            min_advance_hours: 2,
            service_windows: vec![
                ServiceWindow {
                    label: "Comida".to_string(),
                    opens: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
                    closes: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
                },
                ServiceWindow {
                    label: "Cena".to_string(),
                    opens: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
                    closes: NaiveTime::from_hms_opt(23, 30, 0).unwrap(),
                },
            ],
        }
    }

    #[test]
    fn prompt_carries_dates_windows_and_utterance() {
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 18, 30, 0).unwrap();
        let session = CallSession::fresh("CA100", Language::Es, None, now);
        let restaurant = sample_restaurant();
        let ctx = ExtractionContext { session: &session, restaurant: &restaurant, now };

        let prompt = build_prompt("mesa para cuatro mañana", &ctx);

        assert!(prompt.contains("Fecha y hora actual: 2025-06-10 18:30:00"));
        assert!(prompt.contains("Fecha de mañana: 2025-06-11"));
        assert!(prompt.contains("Fecha de pasado mañana: 2025-06-12"));
        assert!(prompt.contains("- Comida: 13:00 - 15:00"));
        assert!(prompt.contains("- Cena: 20:00 - 23:30"));
        assert!(prompt.contains("Máximo de personas por reserva: 20"));
        assert!(prompt.contains("Antelación mínima requerida: 2 horas"));
        assert!(prompt.contains("\"mesa para cuatro mañana\""));
        assert!(prompt.contains("Responde SOLO con el JSON"));
        assert!(!prompt.contains("CONVERSACIÓN RECIENTE"));
    }

    #[test]
    fn prompt_includes_recent_turns_when_present() {
        let now = Utc.with_ymd_and_hms(2025, 6, 10, 18, 30, 0).unwrap();
        let mut session = CallSession::fresh("CA101", Language::Es, None, now);
        session.record_caller("quiero reservar".to_string(), now);
        session.record_agent("¿Para cuántas personas?".to_string(), now);
        let restaurant = sample_restaurant();
        let ctx = ExtractionContext { session: &session, restaurant: &restaurant, now };

        let prompt = build_prompt("para cuatro", &ctx);

        assert!(prompt.contains("## CONVERSACIÓN RECIENTE"));
        assert!(prompt.contains("caller: quiero reservar"));
        assert!(prompt.contains("agent: ¿Para cuántas personas?"));
    }

    #[test]
    fn full_reply_maps_to_slots_and_intent() {
        let reply = r#"```json
{
  "intencion": "reservation",
  "comensales": "4",
  "comensales_porcentaje_credivilidad": "100%",
  "comensales_validos": "true",
  "comensales_error": null,
  "fecha": "2025-06-11",
  "fecha_porcentaje_credivilidad": "100%",
  "hora": "21:00",
  "hora_disponible": "true",
  "hora_error": null,
  "hora_porcentaje_credivilidad": "50%",
  "nombre": "Ana García",
  "nombre_porcentaje_credivilidad": "100%",
  "telefono": "600111222333",
  "idioma_detectado": "es",
  "sentimiento": "neutral",
  "urgencia": "normal",
  "necesita_aclaracion": "false",
  "pregunta_aclaracion": null,
  "pedido_items": []
}
```"#;

        let result = parse_response(reply).unwrap();

        assert_eq!(result.intent, CallIntent::Reservation);
        assert_eq!(result.language, Some(Language::Es));
        assert_eq!(result.source, ExtractionSource::Analyzer);
        assert!(!result.needs_clarification);

        let party = result.slots.party_size.unwrap();
        assert_eq!(party.value, 4);
        assert_eq!(party.credibility, Credibility::High);
        assert!(!party.is_invalid());

        let date = result.slots.date.unwrap();
        assert_eq!(date.value, NaiveDate::from_ymd_opt(2025, 6, 11).unwrap());

        let time = result.slots.time.unwrap();
        assert_eq!(time.value, NaiveTime::from_hms_opt(21, 0, 0).unwrap());
        assert_eq!(time.credibility, Credibility::Low);

        assert_eq!(result.slots.customer_name.unwrap().value, "Ana García");
        assert_eq!(result.slots.phone.unwrap().value, "600111222333");
    }

    #[test]
    fn advisory_failures_mark_the_slot_invalid() {
        let reply = r#"{
  "intencion": "reservation",
  "comensales": "30",
  "comensales_porcentaje_credivilidad": "100%",
  "comensales_validos": "false",
  "comensales_error": "max_exceeded",
  "hora": "16:00",
  "hora_disponible": "false",
  "hora_error": "fuera_horario",
  "hora_porcentaje_credivilidad": "100%"
}"#;

        let result = parse_response(reply).unwrap();

        let party = result.slots.party_size.unwrap();
        assert_eq!(party.value, 30);
        assert!(party.is_invalid());
        assert_eq!(party.error.as_deref(), Some("max_exceeded"));

        let time = result.slots.time.unwrap();
        assert!(time.is_invalid());
        assert_eq!(time.error.as_deref(), Some("fuera_horario"));
    }

    #[test]
    fn bare_numbers_and_booleans_are_tolerated() {
        let reply = r#"{
  "intencion": "reservation",
  "comensales": 6,
  "comensales_porcentaje_credivilidad": "100%",
  "comensales_validos": true,
  "necesita_aclaracion": false
}"#;

        let result = parse_response(reply).unwrap();
        assert_eq!(result.slots.party_size.unwrap().value, 6);
        assert!(!result.needs_clarification);
    }

    #[test]
    fn zero_credibility_values_stay_untrusted() {
        let reply = r#"{
  "intencion": "clarify",
  "comensales": "2",
  "comensales_porcentaje_credivilidad": "0%"
}"#;

        let result = parse_response(reply).unwrap();
        let party = result.slots.party_size.unwrap();
        assert_eq!(party.credibility, Credibility::None);
        assert!(!party.credibility.auto_populates());
        assert!(result.needs_clarification);
    }

    #[test]
    fn short_phone_digits_are_discarded() {
        let reply = r#"{"intencion": "reservation", "telefono": "12345"}"#;
        let result = parse_response(reply).unwrap();
        assert!(result.slots.phone.is_none());
    }

    #[test]
    fn prose_instead_of_json_is_malformed() {
        let error = parse_response("Lo siento, no puedo ayudar con eso.").unwrap_err();
        assert!(matches!(error, ApplicationError::ExtractionMalformed(_)));
    }

    #[test]
    fn unparseable_fecha_is_malformed() {
        let reply = r#"{"intencion": "reservation", "fecha": "mañana"}"#;
        let error = parse_response(reply).unwrap_err();
        assert!(matches!(error, ApplicationError::ExtractionMalformed(_)));
    }

    #[test]
    fn frustrated_and_urgent_labels_map_through() {
        let reply = r#"{
  "intencion": "clarify",
  "sentimiento": "frustrated",
  "urgencia": "high",
  "necesita_aclaracion": "true",
  "pregunta_aclaracion": "¿Podría repetir la fecha?"
}"#;

        let result = parse_response(reply).unwrap();
        assert_eq!(result.sentiment, Sentiment::Frustrated);
        assert_eq!(result.urgency, Urgency::High);
        assert!(result.needs_clarification);
        assert_eq!(result.clarification_question.as_deref(), Some("¿Podría repetir la fecha?"));
    }
}
