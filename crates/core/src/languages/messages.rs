//! Spoken-response catalog.
//!
//! Every prompt the agent can say exists in all six supported languages.
//! Strings are written for TTS: short sentences, digits formatted the way the
//! voice should read them, no markup.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::Language;
use crate::config::ServiceWindow;
use crate::domain::session::SlotField;
use crate::policy::PolicyCode;

/// Fully collected reservation details, ready to read back.
#[derive(Debug, Clone, Copy)]
pub struct ReservationSummary<'a> {
    pub party_size: u32,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub customer_name: &'a str,
    pub phone: &'a str,
}

/// Policy parameters spoken alongside a rejection.
#[derive(Debug, Clone, Copy)]
pub struct ViolationContext<'a> {
    pub min_party: u32,
    pub max_party: u32,
    pub min_advance_hours: u32,
    pub windows: &'a [ServiceWindow],
    pub alternatives: &'a [NaiveDateTime],
}

pub fn format_date(lang: Language, date: NaiveDate) -> String {
    match lang {
        Language::En => date.format("%m/%d/%Y").to_string(),
        _ => date.format("%d/%m/%Y").to_string(),
    }
}

pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

fn format_windows(lang: Language, windows: &[ServiceWindow]) -> String {
    let joiner = match lang {
        Language::Es => " y ",
        Language::En => " and ",
        Language::De => " und ",
        Language::It => " e ",
        Language::Fr => " et ",
        Language::Pt => " e ",
    };
    windows
        .iter()
        .map(|w| format!("{} - {}", format_time(w.opens), format_time(w.closes)))
        .collect::<Vec<_>>()
        .join(joiner)
}

pub fn greeting(lang: Language, restaurant_name: &str) -> String {
    match lang {
        Language::Es => format!("Bienvenido a {restaurant_name}. ¿En qué puedo ayudarle?"),
        Language::En => format!("Welcome to {restaurant_name}. How can I help you?"),
        Language::De => format!("Willkommen bei {restaurant_name}. Wie kann ich Ihnen helfen?"),
        Language::It => format!("Benvenuto da {restaurant_name}. Come posso aiutarla?"),
        Language::Fr => format!("Bienvenue chez {restaurant_name}. Comment puis-je vous aider?"),
        Language::Pt => format!("Bem-vindo ao {restaurant_name}. Em que posso ajudar?"),
    }
}

pub fn ask_slot(lang: Language, field: SlotField) -> String {
    match (lang, field) {
        (Language::Es, SlotField::PartySize) => "¿Para cuántas personas sería la reserva?".into(),
        (Language::Es, SlotField::Date) => "¿Para qué fecha desea la reserva?".into(),
        (Language::Es, SlotField::Time) => "¿A qué hora le gustaría venir?".into(),
        (Language::Es, SlotField::CustomerName) => "¿A nombre de quién hago la reserva?".into(),
        (Language::Es, SlotField::Phone) => "¿Me puede indicar un teléfono de contacto?".into(),
        (Language::En, SlotField::PartySize) => "For how many people is the reservation?".into(),
        (Language::En, SlotField::Date) => "What date would you like to book?".into(),
        (Language::En, SlotField::Time) => "What time would you like to come?".into(),
        (Language::En, SlotField::CustomerName) => "What name should I put the reservation under?".into(),
        (Language::En, SlotField::Phone) => "Could you give me a contact phone number?".into(),
        (Language::De, SlotField::PartySize) => "Für wie viele Personen ist die Reservierung?".into(),
        (Language::De, SlotField::Date) => "Für welches Datum möchten Sie reservieren?".into(),
        (Language::De, SlotField::Time) => "Um wie viel Uhr möchten Sie kommen?".into(),
        (Language::De, SlotField::CustomerName) => "Auf welchen Namen darf ich reservieren?".into(),
        (Language::De, SlotField::Phone) => "Können Sie mir eine Telefonnummer geben?".into(),
        (Language::It, SlotField::PartySize) => "Per quante persone è la prenotazione?".into(),
        (Language::It, SlotField::Date) => "Per quale data desidera prenotare?".into(),
        (Language::It, SlotField::Time) => "A che ora vorrebbe venire?".into(),
        (Language::It, SlotField::CustomerName) => "A che nome metto la prenotazione?".into(),
        (Language::It, SlotField::Phone) => "Mi può lasciare un numero di telefono?".into(),
        (Language::Fr, SlotField::PartySize) => "Pour combien de personnes est la réservation?".into(),
        (Language::Fr, SlotField::Date) => "Pour quelle date souhaitez-vous réserver?".into(),
        (Language::Fr, SlotField::Time) => "À quelle heure souhaitez-vous venir?".into(),
        (Language::Fr, SlotField::CustomerName) => "À quel nom dois-je faire la réservation?".into(),
        (Language::Fr, SlotField::Phone) => "Pouvez-vous me donner un numéro de téléphone?".into(),
        (Language::Pt, SlotField::PartySize) => "Para quantas pessoas é a reserva?".into(),
        (Language::Pt, SlotField::Date) => "Para que data deseja reservar?".into(),
        (Language::Pt, SlotField::Time) => "A que horas gostaria de vir?".into(),
        (Language::Pt, SlotField::CustomerName) => "Em nome de quem faço a reserva?".into(),
        (Language::Pt, SlotField::Phone) => "Pode indicar-me um telefone de contacto?".into(),
    }
}

/// Offered when the caller id already gave us a number.
pub fn offer_caller_phone(lang: Language, digits: &str) -> String {
    let spaced = spell_digits(digits);
    match lang {
        Language::Es => format!("¿Uso el número desde el que llama, {spaced}?"),
        Language::En => format!("Should I use the number you are calling from, {spaced}?"),
        Language::De => format!("Soll ich die Nummer verwenden, von der Sie anrufen, {spaced}?"),
        Language::It => format!("Uso il numero da cui sta chiamando, {spaced}?"),
        Language::Fr => format!("Puis-je utiliser le numéro depuis lequel vous appelez, {spaced}?"),
        Language::Pt => format!("Posso usar o número de onde está a ligar, {spaced}?"),
    }
}

pub fn confirm_summary(lang: Language, summary: &ReservationSummary<'_>) -> String {
    let date = format_date(lang, summary.date);
    let time = format_time(summary.time);
    let ReservationSummary { party_size, customer_name, phone, .. } = *summary;
    let spaced = spell_digits(phone);
    match lang {
        Language::Es => format!(
            "Le confirmo: mesa para {party_size} el {date} a las {time}, a nombre de \
             {customer_name}, teléfono {spaced}. ¿Es correcto?"
        ),
        Language::En => format!(
            "To confirm: a table for {party_size} on {date} at {time}, under {customer_name}, \
             phone {spaced}. Is that correct?"
        ),
        Language::De => format!(
            "Zur Bestätigung: ein Tisch für {party_size} am {date} um {time}, auf den Namen \
             {customer_name}, Telefon {spaced}. Ist das richtig?"
        ),
        Language::It => format!(
            "Confermo: un tavolo per {party_size} il {date} alle {time}, a nome {customer_name}, \
             telefono {spaced}. È corretto?"
        ),
        Language::Fr => format!(
            "Je confirme: une table pour {party_size} le {date} à {time}, au nom de \
             {customer_name}, téléphone {spaced}. C'est correct?"
        ),
        Language::Pt => format!(
            "Confirmo: mesa para {party_size} no dia {date} às {time}, em nome de \
             {customer_name}, telefone {spaced}. Está correto?"
        ),
    }
}

pub fn reservation_confirmed(lang: Language, summary: &ReservationSummary<'_>) -> String {
    let date = format_date(lang, summary.date);
    let time = format_time(summary.time);
    let party = summary.party_size;
    match lang {
        Language::Es => format!(
            "Perfecto, su reserva para {party} personas el {date} a las {time} queda confirmada. \
             ¡Hasta pronto!"
        ),
        Language::En => format!(
            "Perfect, your reservation for {party} on {date} at {time} is confirmed. See you soon!"
        ),
        Language::De => format!(
            "Perfekt, Ihre Reservierung für {party} Personen am {date} um {time} ist bestätigt. \
             Bis bald!"
        ),
        Language::It => format!(
            "Perfetto, la sua prenotazione per {party} persone il {date} alle {time} è \
             confermata. A presto!"
        ),
        Language::Fr => format!(
            "Parfait, votre réservation pour {party} personnes le {date} à {time} est confirmée. \
             À bientôt!"
        ),
        Language::Pt => format!(
            "Perfeito, a sua reserva para {party} pessoas no dia {date} às {time} está \
             confirmada. Até breve!"
        ),
    }
}

/// Repeated when a finished call keeps talking.
pub fn already_confirmed(lang: Language) -> String {
    match lang {
        Language::Es => "Su reserva ya está confirmada. ¡Les esperamos!".into(),
        Language::En => "Your reservation is already confirmed. We look forward to seeing you!".into(),
        Language::De => "Ihre Reservierung ist bereits bestätigt. Wir freuen uns auf Sie!".into(),
        Language::It => "La sua prenotazione è già confermata. La aspettiamo!".into(),
        Language::Fr => "Votre réservation est déjà confirmée. Nous vous attendons!".into(),
        Language::Pt => "A sua reserva já está confirmada. Esperamos por si!".into(),
    }
}

pub fn what_to_change(lang: Language) -> String {
    match lang {
        Language::Es => "De acuerdo. ¿Qué dato desea cambiar?".into(),
        Language::En => "All right. What would you like to change?".into(),
        Language::De => "In Ordnung. Was möchten Sie ändern?".into(),
        Language::It => "Va bene. Cosa desidera cambiare?".into(),
        Language::Fr => "Très bien. Que souhaitez-vous changer?".into(),
        Language::Pt => "Está bem. O que deseja alterar?".into(),
    }
}

pub fn violation(lang: Language, code: PolicyCode, ctx: &ViolationContext<'_>) -> String {
    let base = match (lang, code) {
        (Language::Es, PolicyCode::MaxExceeded) => format!(
            "Lo siento, solo aceptamos reservas de hasta {} personas por teléfono. Para grupos \
             grandes, por favor contacte directamente con el restaurante.",
            ctx.max_party
        ),
        (Language::Es, PolicyCode::MinNotMet) => format!(
            "Lo siento, la reserva debe ser para al menos {} persona.",
            ctx.min_party
        ),
        (Language::Es, PolicyCode::FueraHorario) => format!(
            "Lo siento, esa hora está fuera de nuestro horario. Servimos de {}.",
            format_windows(lang, ctx.windows)
        ),
        (Language::Es, PolicyCode::AdvanceNoticeInsufficient) => format!(
            "Lo siento, necesitamos al menos {} horas de antelación para reservar.",
            ctx.min_advance_hours
        ),
        (Language::Es, PolicyCode::CapacityExceeded) => {
            "Lo siento, no tenemos mesas disponibles a esa hora.".into()
        }
        (Language::En, PolicyCode::MaxExceeded) => format!(
            "I'm sorry, we only take phone reservations for up to {} people. For larger groups, \
             please contact the restaurant directly.",
            ctx.max_party
        ),
        (Language::En, PolicyCode::MinNotMet) => format!(
            "I'm sorry, the reservation must be for at least {} person.",
            ctx.min_party
        ),
        (Language::En, PolicyCode::FueraHorario) => format!(
            "I'm sorry, that time is outside our opening hours. We serve from {}.",
            format_windows(lang, ctx.windows)
        ),
        (Language::En, PolicyCode::AdvanceNoticeInsufficient) => format!(
            "I'm sorry, we need at least {} hours notice for a reservation.",
            ctx.min_advance_hours
        ),
        (Language::En, PolicyCode::CapacityExceeded) => {
            "I'm sorry, we have no tables available at that time.".into()
        }
        (Language::De, PolicyCode::MaxExceeded) => format!(
            "Es tut mir leid, telefonisch nehmen wir Reservierungen nur bis {} Personen an. Für \
             größere Gruppen kontaktieren Sie bitte das Restaurant direkt.",
            ctx.max_party
        ),
        (Language::De, PolicyCode::MinNotMet) => format!(
            "Es tut mir leid, die Reservierung muss für mindestens {} Person sein.",
            ctx.min_party
        ),
        (Language::De, PolicyCode::FueraHorario) => format!(
            "Es tut mir leid, diese Uhrzeit liegt außerhalb unserer Öffnungszeiten. Wir servieren \
             von {}.",
            format_windows(lang, ctx.windows)
        ),
        (Language::De, PolicyCode::AdvanceNoticeInsufficient) => format!(
            "Es tut mir leid, wir brauchen mindestens {} Stunden Vorlauf für eine Reservierung.",
            ctx.min_advance_hours
        ),
        (Language::De, PolicyCode::CapacityExceeded) => {
            "Es tut mir leid, zu dieser Zeit haben wir keinen Tisch frei.".into()
        }
        (Language::It, PolicyCode::MaxExceeded) => format!(
            "Mi dispiace, per telefono accettiamo prenotazioni fino a {} persone. Per gruppi più \
             grandi, contatti direttamente il ristorante.",
            ctx.max_party
        ),
        (Language::It, PolicyCode::MinNotMet) => format!(
            "Mi dispiace, la prenotazione deve essere per almeno {} persona.",
            ctx.min_party
        ),
        (Language::It, PolicyCode::FueraHorario) => format!(
            "Mi dispiace, quell'ora è fuori dal nostro orario. Serviamo dalle {}.",
            format_windows(lang, ctx.windows)
        ),
        (Language::It, PolicyCode::AdvanceNoticeInsufficient) => format!(
            "Mi dispiace, ci servono almeno {} ore di anticipo per prenotare.",
            ctx.min_advance_hours
        ),
        (Language::It, PolicyCode::CapacityExceeded) => {
            "Mi dispiace, non abbiamo tavoli disponibili a quell'ora.".into()
        }
        (Language::Fr, PolicyCode::MaxExceeded) => format!(
            "Je suis désolé, nous ne prenons par téléphone que des réservations jusqu'à {} \
             personnes. Pour les grands groupes, veuillez contacter le restaurant directement.",
            ctx.max_party
        ),
        (Language::Fr, PolicyCode::MinNotMet) => format!(
            "Je suis désolé, la réservation doit être pour au moins {} personne.",
            ctx.min_party
        ),
        (Language::Fr, PolicyCode::FueraHorario) => format!(
            "Je suis désolé, cette heure est en dehors de nos horaires. Nous servons de {}.",
            format_windows(lang, ctx.windows)
        ),
        (Language::Fr, PolicyCode::AdvanceNoticeInsufficient) => format!(
            "Je suis désolé, il nous faut au moins {} heures de préavis pour réserver.",
            ctx.min_advance_hours
        ),
        (Language::Fr, PolicyCode::CapacityExceeded) => {
            "Je suis désolé, nous n'avons pas de table disponible à cette heure.".into()
        }
        (Language::Pt, PolicyCode::MaxExceeded) => format!(
            "Lamento, por telefone só aceitamos reservas até {} pessoas. Para grupos grandes, \
             contacte o restaurante diretamente.",
            ctx.max_party
        ),
        (Language::Pt, PolicyCode::MinNotMet) => format!(
            "Lamento, a reserva tem de ser para pelo menos {} pessoa.",
            ctx.min_party
        ),
        (Language::Pt, PolicyCode::FueraHorario) => format!(
            "Lamento, essa hora está fora do nosso horário. Servimos das {}.",
            format_windows(lang, ctx.windows)
        ),
        (Language::Pt, PolicyCode::AdvanceNoticeInsufficient) => format!(
            "Lamento, precisamos de pelo menos {} horas de antecedência para reservar.",
            ctx.min_advance_hours
        ),
        (Language::Pt, PolicyCode::CapacityExceeded) => {
            "Lamento, não temos mesas disponíveis a essa hora.".into()
        }
    };
    if ctx.alternatives.is_empty() {
        base
    } else {
        format!("{base} {}", alternatives_offer(lang, ctx.alternatives))
    }
}

fn alternatives_offer(lang: Language, alternatives: &[NaiveDateTime]) -> String {
    let times = alternatives
        .iter()
        .map(|dt| format_time(dt.time()))
        .collect::<Vec<_>>()
        .join(", ");
    match lang {
        Language::Es => format!("Podría ofrecerle estas horas: {times}. ¿Le viene bien alguna?"),
        Language::En => format!("I could offer these times instead: {times}. Would any work?"),
        Language::De => format!("Ich könnte Ihnen diese Zeiten anbieten: {times}. Passt eine davon?"),
        Language::It => format!("Potrei proporle questi orari: {times}. Ne va bene uno?"),
        Language::Fr => format!("Je peux vous proposer ces horaires: {times}. L'un vous convient?"),
        Language::Pt => format!("Posso oferecer estes horários: {times}. Algum serve?"),
    }
}

pub fn cancel_ask_phone(lang: Language) -> String {
    match lang {
        Language::Es => {
            "Entendido, quiere cancelar una reserva. ¿Me dice el teléfono con el que la hizo?".into()
        }
        Language::En => {
            "Understood, you want to cancel a reservation. What phone number was it made with?".into()
        }
        Language::De => {
            "Verstanden, Sie möchten stornieren. Unter welcher Telefonnummer wurde reserviert?".into()
        }
        Language::It => {
            "Capito, vuole cancellare una prenotazione. Con quale numero di telefono l'ha fatta?".into()
        }
        Language::Fr => {
            "Compris, vous voulez annuler une réservation. Avec quel numéro a-t-elle été faite?".into()
        }
        Language::Pt => {
            "Entendido, quer cancelar uma reserva. Com que número de telefone foi feita?".into()
        }
    }
}

pub fn cancel_presented(
    lang: Language,
    reserved_at: NaiveDateTime,
    party_size: u32,
) -> String {
    let date = format_date(lang, reserved_at.date());
    let time = format_time(reserved_at.time());
    match lang {
        Language::Es => format!(
            "He encontrado una reserva para {party_size} personas el {date} a las {time}. ¿Es \
             esta la que desea cancelar?"
        ),
        Language::En => format!(
            "I found a reservation for {party_size} on {date} at {time}. Is this the one you want \
             to cancel?"
        ),
        Language::De => format!(
            "Ich habe eine Reservierung für {party_size} Personen am {date} um {time} gefunden. \
             Möchten Sie diese stornieren?"
        ),
        Language::It => format!(
            "Ho trovato una prenotazione per {party_size} persone il {date} alle {time}. È questa \
             che vuole cancellare?"
        ),
        Language::Fr => format!(
            "J'ai trouvé une réservation pour {party_size} personnes le {date} à {time}. Est-ce \
             celle que vous voulez annuler?"
        ),
        Language::Pt => format!(
            "Encontrei uma reserva para {party_size} pessoas no dia {date} às {time}. É esta que \
             deseja cancelar?"
        ),
    }
}

pub fn cancel_confirm(lang: Language) -> String {
    match lang {
        Language::Es => "¿Confirma que desea cancelar esta reserva?".into(),
        Language::En => "Do you confirm you want to cancel this reservation?".into(),
        Language::De => "Bestätigen Sie, dass Sie diese Reservierung stornieren möchten?".into(),
        Language::It => "Conferma di voler cancellare questa prenotazione?".into(),
        Language::Fr => "Confirmez-vous vouloir annuler cette réservation?".into(),
        Language::Pt => "Confirma que deseja cancelar esta reserva?".into(),
    }
}

pub fn cancelled_done(lang: Language) -> String {
    match lang {
        Language::Es => "Su reserva ha sido cancelada. Gracias por avisarnos. ¡Hasta pronto!".into(),
        Language::En => "Your reservation has been cancelled. Thank you for letting us know. Goodbye!".into(),
        Language::De => "Ihre Reservierung wurde storniert. Danke für Ihre Nachricht. Auf Wiederhören!".into(),
        Language::It => "La sua prenotazione è stata cancellata. Grazie per averci avvisato. Arrivederci!".into(),
        Language::Fr => "Votre réservation a été annulée. Merci de nous avoir prévenus. Au revoir!".into(),
        Language::Pt => "A sua reserva foi cancelada. Obrigado por avisar. Até logo!".into(),
    }
}

pub fn cancel_none_found(lang: Language) -> String {
    match lang {
        Language::Es => {
            "No encuentro ninguna reserva activa con ese teléfono. ¿Puede repetirme el número?".into()
        }
        Language::En => {
            "I can't find an active reservation under that number. Could you repeat it?".into()
        }
        Language::De => {
            "Ich finde keine aktive Reservierung unter dieser Nummer. Können Sie sie wiederholen?".into()
        }
        Language::It => {
            "Non trovo nessuna prenotazione attiva con quel numero. Può ripeterlo?".into()
        }
        Language::Fr => {
            "Je ne trouve aucune réservation active avec ce numéro. Pouvez-vous le répéter?".into()
        }
        Language::Pt => {
            "Não encontro nenhuma reserva ativa com esse número. Pode repetir?".into()
        }
    }
}

pub fn reservation_kept(lang: Language) -> String {
    match lang {
        Language::Es => "De acuerdo, mantenemos su reserva tal como está. ¡Hasta pronto!".into(),
        Language::En => "All right, we'll keep your reservation as it is. Goodbye!".into(),
        Language::De => "In Ordnung, Ihre Reservierung bleibt bestehen. Auf Wiederhören!".into(),
        Language::It => "Va bene, manteniamo la sua prenotazione così com'è. Arrivederci!".into(),
        Language::Fr => "Très bien, nous gardons votre réservation telle quelle. Au revoir!".into(),
        Language::Pt => "Está bem, mantemos a sua reserva como está. Até logo!".into(),
    }
}

pub fn order_redirect(lang: Language) -> String {
    match lang {
        Language::Es => {
            "Por este número solo gestionamos reservas de mesa. Para pedidos, por favor llame \
             directamente al restaurante. ¿Desea hacer una reserva?".into()
        }
        Language::En => {
            "On this line we only handle table reservations. For food orders, please call the \
             restaurant directly. Would you like to make a reservation?".into()
        }
        Language::De => {
            "Über diese Nummer verwalten wir nur Tischreservierungen. Für Bestellungen rufen Sie \
             bitte direkt im Restaurant an. Möchten Sie reservieren?".into()
        }
        Language::It => {
            "Su questa linea gestiamo solo prenotazioni di tavoli. Per ordinazioni, chiami \
             direttamente il ristorante. Desidera prenotare?".into()
        }
        Language::Fr => {
            "Sur cette ligne nous gérons uniquement les réservations de table. Pour commander, \
             appelez directement le restaurant. Souhaitez-vous réserver?".into()
        }
        Language::Pt => {
            "Nesta linha só tratamos de reservas de mesa. Para pedidos, ligue diretamente para o \
             restaurante. Deseja fazer uma reserva?".into()
        }
    }
}

pub fn empathetic(lang: Language) -> String {
    match lang {
        Language::Es => "Lamento las molestias, vamos a resolverlo enseguida.".into(),
        Language::En => "I'm sorry for the trouble, let's sort this out right away.".into(),
        Language::De => "Entschuldigen Sie die Umstände, wir klären das sofort.".into(),
        Language::It => "Mi scuso per il disagio, risolviamo subito.".into(),
        Language::Fr => "Désolé pour le désagrément, nous allons régler cela tout de suite.".into(),
        Language::Pt => "Peço desculpa pelo incómodo, vamos resolver já.".into(),
    }
}

pub fn did_not_catch(lang: Language) -> String {
    match lang {
        Language::Es => "Perdone, no le he entendido bien.".into(),
        Language::En => "Sorry, I didn't quite catch that.".into(),
        Language::De => "Entschuldigung, das habe ich nicht ganz verstanden.".into(),
        Language::It => "Mi scusi, non ho capito bene.".into(),
        Language::Fr => "Pardon, je n'ai pas bien compris.".into(),
        Language::Pt => "Desculpe, não percebi bem.".into(),
    }
}

pub fn retry_exhausted(lang: Language) -> String {
    match lang {
        Language::Es => {
            "Lo siento, no estoy consiguiendo entenderle. Por favor, llame directamente al \
             restaurante y le atenderán encantados. ¡Hasta pronto!".into()
        }
        Language::En => {
            "I'm sorry, I'm not managing to understand you. Please call the restaurant directly \
             and they will be happy to help. Goodbye!".into()
        }
        Language::De => {
            "Es tut mir leid, ich verstehe Sie leider nicht. Bitte rufen Sie direkt im Restaurant \
             an, dort hilft man Ihnen gerne. Auf Wiederhören!".into()
        }
        Language::It => {
            "Mi dispiace, non riesco a capirla. La prego di chiamare direttamente il ristorante, \
             saranno lieti di aiutarla. Arrivederci!".into()
        }
        Language::Fr => {
            "Je suis désolé, je n'arrive pas à vous comprendre. Veuillez appeler directement le \
             restaurant, ils se feront un plaisir de vous aider. Au revoir!".into()
        }
        Language::Pt => {
            "Lamento, não estou a conseguir entendê-lo. Por favor, ligue diretamente para o \
             restaurante, que terão todo o gosto em ajudar. Até logo!".into()
        }
    }
}

pub fn store_trouble(lang: Language) -> String {
    match lang {
        Language::Es => {
            "Lo siento, estamos teniendo un problema técnico. Por favor, llame de nuevo en unos \
             minutos.".into()
        }
        Language::En => {
            "I'm sorry, we are having a technical problem. Please call again in a few minutes.".into()
        }
        Language::De => {
            "Es tut mir leid, wir haben gerade ein technisches Problem. Bitte rufen Sie in ein \
             paar Minuten noch einmal an.".into()
        }
        Language::It => {
            "Mi dispiace, abbiamo un problema tecnico. La prego di richiamare tra qualche minuto.".into()
        }
        Language::Fr => {
            "Je suis désolé, nous avons un problème technique. Veuillez rappeler dans quelques \
             minutes.".into()
        }
        Language::Pt => {
            "Lamento, estamos com um problema técnico. Por favor, ligue novamente daqui a uns \
             minutos.".into()
        }
    }
}

/// Digits read one by one so the TTS voice spells the number out.
fn spell_digits(raw: &str) -> String {
    let digits: Vec<String> = raw.chars().filter(|c| c.is_ascii_digit()).map(String::from).collect();
    if digits.is_empty() {
        raw.to_string()
    } else {
        digits.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::ALL_LANGUAGES;

    fn sample_summary() -> ReservationSummary<'static> {
        ReservationSummary {
            party_size: 4,
            date: NaiveDate::from_ymd_opt(2026, 8, 26).unwrap(),
            time: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            customer_name: "Ana García",
            phone: "+34600111222",
        }
    }

    #[test]
    fn catalog_is_complete_for_every_language() {
        let summary = sample_summary();
        let windows = [ServiceWindow {
            label: "dinner".into(),
            opens: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            closes: NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
        }];
        let ctx = ViolationContext {
            min_party: 1,
            max_party: 20,
            min_advance_hours: 2,
            windows: &windows,
            alternatives: &[],
        };
        for lang in ALL_LANGUAGES {
            assert!(!greeting(lang, "La Plaza").is_empty());
            for field in [
                SlotField::PartySize,
                SlotField::Date,
                SlotField::Time,
                SlotField::CustomerName,
                SlotField::Phone,
            ] {
                assert!(!ask_slot(lang, field).is_empty());
            }
            assert!(!confirm_summary(lang, &summary).is_empty());
            assert!(!reservation_confirmed(lang, &summary).is_empty());
            for code in [
                PolicyCode::MaxExceeded,
                PolicyCode::MinNotMet,
                PolicyCode::FueraHorario,
                PolicyCode::AdvanceNoticeInsufficient,
                PolicyCode::CapacityExceeded,
            ] {
                assert!(!violation(lang, code, &ctx).is_empty());
            }
            assert!(!cancel_ask_phone(lang).is_empty());
            assert!(!retry_exhausted(lang).is_empty());
            assert!(!store_trouble(lang).is_empty());
        }
    }

    #[test]
    fn date_format_follows_locale() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();
        assert_eq!(format_date(Language::Es, date), "26/08/2026");
        assert_eq!(format_date(Language::En, date), "08/26/2026");
    }

    #[test]
    fn confirmation_reads_back_every_slot() {
        let summary = sample_summary();
        let text = confirm_summary(Language::Es, &summary);
        assert!(text.contains('4'));
        assert!(text.contains("26/08/2026"));
        assert!(text.contains("20:00"));
        assert!(text.contains("Ana García"));
    }

    #[test]
    fn phone_digits_are_spelled_out() {
        let text = offer_caller_phone(Language::En, "600111222");
        assert!(text.contains("6 0 0 1 1 1 2 2 2"));
    }

    #[test]
    fn alternatives_are_appended_when_present() {
        let windows = [ServiceWindow {
            label: "dinner".into(),
            opens: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            closes: NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
        }];
        let alts = [NaiveDate::from_ymd_opt(2026, 8, 26)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(21, 0, 0).unwrap())];
        let ctx = ViolationContext {
            min_party: 1,
            max_party: 20,
            min_advance_hours: 2,
            windows: &windows,
            alternatives: &alts,
        };
        let text = violation(Language::Es, PolicyCode::CapacityExceeded, &ctx);
        assert!(text.contains("21:00"));
    }
}
