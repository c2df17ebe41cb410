//! The Twilio-facing webhook endpoint.
//!
//! Twilio drives the whole call by POSTing form-encoded webhooks here: one
//! when the call connects, one per recognized utterance, and one when the
//! call ends. Each POST gets a TwiML document back telling Twilio what to
//! say and whether to keep listening.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Form, Router};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use reserva_agent::runtime::TurnRuntime;
use reserva_core::languages::Language;
use reserva_db::repositories::CallSessionRepository;
use reserva_voice::twiml::{self, TwimlReply};
use reserva_voice::webhook::VoiceWebhook;

/// Where Twilio posts every webhook, including Gather results.
pub const VOICE_PATH: &str = "/voice";

#[derive(Clone)]
pub struct VoiceState {
    pub runtime: Arc<TurnRuntime>,
    pub sessions: Arc<dyn CallSessionRepository>,
    pub default_language: Language,
}

pub fn router(state: VoiceState) -> Router {
    Router::new()
        .route(VOICE_PATH, post(voice_turn))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handles one webhook POST.
///
/// Always answers HTTP 200 with TwiML. On any other status Twilio abandons
/// the call with its own generic error message in English, so even broken
/// requests get a spoken farewell in the restaurant's language.
async fn voice_turn(
    State(state): State<VoiceState>,
    Form(webhook): Form<VoiceWebhook>,
) -> Response {
    if let Err(error) = webhook.validate() {
        warn!(
            event_name = "voice.webhook.rejected",
            error = %error,
            "dropping malformed webhook"
        );
        return xml_response(twiml::technical_difficulty(state.default_language));
    }

    if webhook.is_call_ended() {
        info!(
            event_name = "voice.call.ended",
            call_sid = %webhook.call_sid,
            call_status = ?webhook.call_status,
            "status callback received, sweeping session"
        );
        // Sweeping is best effort; call sids are never reused, so a missed
        // delete only leaves a dead row behind.
        if let Err(error) = state.sessions.delete(&webhook.call_sid).await {
            warn!(call_sid = %webhook.call_sid, error = %error, "session sweep failed");
        }
        return xml_response(TwimlReply::Empty.render());
    }

    if let Some(confidence) = webhook.speech_confidence() {
        debug!(call_sid = %webhook.call_sid, confidence, "speech recognized");
    }

    let reply = state
        .runtime
        .handle_turn(&webhook.call_sid, webhook.utterance(), webhook.caller_phone())
        .await;

    xml_response(twiml::for_turn(&reply.text, reply.language, reply.terminal, VOICE_PATH))
}

fn xml_response(body: String) -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/xml; charset=utf-8")], body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::Request;
    use chrono::Utc;
    use tower::ServiceExt;

    use reserva_agent::extractor::SlotExtractor;
    use reserva_core::audit::InMemoryAuditSink;
    use reserva_core::config::AppConfig;
    use reserva_core::domain::session::CallSession;
    use reserva_db::repositories::{
        InMemoryCallSessionRepository, InMemoryReservationRepository,
    };
    use reserva_voice::webhook::CallStatus;

    const SID: &str = "CA9f2e1c7a55aa0001";

    struct Fixture {
        state: VoiceState,
        sessions: Arc<InMemoryCallSessionRepository>,
    }

    fn fixture() -> Fixture {
        let sessions = Arc::new(InMemoryCallSessionRepository::default());
        let reservations = Arc::new(InMemoryReservationRepository::default());
        let runtime = Arc::new(TurnRuntime::new(
            AppConfig::default(),
            SlotExtractor::deterministic_only(),
            sessions.clone(),
            reservations.clone(),
            reservations,
            Arc::new(InMemoryAuditSink::default()),
        ));
        let state = VoiceState {
            runtime,
            sessions: sessions.clone(),
            default_language: Language::Es,
        };
        Fixture { state, sessions }
    }

    fn webhook(call_sid: &str) -> VoiceWebhook {
        VoiceWebhook { call_sid: call_sid.to_string(), ..VoiceWebhook::default() }
    }

    async fn body_text(response: Response) -> String {
        let (parts, body) = response.into_parts();
        assert_eq!(parts.status, StatusCode::OK);
        assert_eq!(
            parts.headers.get(header::CONTENT_TYPE).and_then(|value| value.to_str().ok()),
            Some("text/xml; charset=utf-8")
        );
        let bytes = axum::body::to_bytes(body, usize::MAX).await.expect("body collects");
        String::from_utf8(bytes.to_vec()).expect("twiml is utf-8")
    }

    #[tokio::test]
    async fn opening_webhook_greets_and_gathers() {
        let fx = fixture();

        let response = voice_turn(State(fx.state.clone()), Form(webhook(SID))).await;

        let xml = body_text(response).await;
        assert!(xml.contains("<Gather"), "greeting keeps listening: {xml}");
        assert!(xml.contains("action=\"/voice\""));
        assert!(xml.contains("La Plaza"), "greeting names the restaurant: {xml}");
    }

    #[tokio::test]
    async fn missing_call_sid_gets_a_spoken_farewell() {
        let fx = fixture();
        let mut bad = webhook("");
        bad.speech_result = Some("hola".to_string());

        let response = voice_turn(State(fx.state.clone()), Form(bad)).await;

        let xml = body_text(response).await;
        assert!(xml.contains("<Hangup/>"), "broken webhooks end the call: {xml}");
        assert!(xml.contains("error técnico"), "farewell uses the default language: {xml}");
    }

    #[tokio::test]
    async fn status_callback_sweeps_the_session() {
        let fx = fixture();
        fx.sessions
            .upsert(&CallSession::fresh(SID, Language::Es, None, Utc::now()))
            .await
            .unwrap();

        let mut ended = webhook(SID);
        ended.call_status = Some(CallStatus::Completed);
        let response = voice_turn(State(fx.state.clone()), Form(ended)).await;

        let xml = body_text(response).await;
        assert_eq!(xml, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response></Response>");
        assert!(fx.sessions.find_by_call_sid(SID).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn terminal_turn_hangs_up() {
        let fx = fixture();

        let mut first = webhook(SID);
        first.speech_result =
            Some("mesa para cuatro mañana a las 21:00, me llamo Ana García".to_string());
        first.from = Some("+34600111222".to_string());
        voice_turn(State(fx.state.clone()), Form(first)).await;

        let mut second = webhook(SID);
        second.speech_result = Some("sí, perfecto".to_string());
        second.from = Some("+34600111222".to_string());
        let response = voice_turn(State(fx.state.clone()), Form(second)).await;

        let xml = body_text(response).await;
        assert!(xml.contains("<Hangup/>"), "confirmed booking ends the call: {xml}");
        assert!(!xml.contains("<Gather"));
    }

    #[tokio::test]
    async fn router_parses_twilio_form_fields() {
        let fx = fixture();
        let app = router(fx.state);

        let request = Request::builder()
            .method("POST")
            .uri(VOICE_PATH)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!(
                "CallSid={SID}\
                 &SpeechResult=hello+table+for+four+tomorrow+at+21%3A00+my+name+is+Ana+Garcia\
                 &Confidence=0.92&From=%2B34600111222&CallStatus=in-progress"
            )))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let xml = body_text(response).await;
        assert!(xml.contains("<Gather"), "read-back keeps listening: {xml}");
        assert!(xml.contains('4'), "read-back carries the party size: {xml}");
    }
}
