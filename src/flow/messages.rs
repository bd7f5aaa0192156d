//! Message templates — pure functions from (state, draft data) to the text
//! the user reads. All user-facing wording lives here.

use chrono::{Datelike, NaiveDate, Weekday};

use super::draft::{DraftEvent, DraftTeacher, EventType};
use super::session::Session;
use super::state::ChatState;
use crate::directory::{ListedEvent, TeacherMatch};
use crate::validation::date::month_name;
use crate::validation::Price;

pub const SKIP_HINT: &str = "(enviá \".\" para omitir)";

const NAV_FOOTER: &str = "\n\n_0 = volver · salir = cancelar_";

pub fn welcome() -> String {
    "¡Hola! 👋 Soy el bot de la agenda tanguera de la ciudad.\nTe cuento qué clases, prácticas y milongas hay.".to_string()
}

pub fn main_menu() -> String {
    "📋 *Menú principal*\n\n\
     1. Eventos de hoy\n\
     2. Eventos de esta semana\n\
     3. ¿Qué es esto?\n\
     4. Soy organizador/a\n\n\
     Respondé con el número de la opción."
        .to_string()
}

pub fn special_menu() -> String {
    "🎩 *Menú de organizadores*\n\n\
     1. Cargar un evento\n\
     2. Registrarme como profe\n\
     3. Registrar a otro/a profe\n\
     4. Volver al menú principal"
        .to_string()
}

pub fn about() -> String {
    "ℹ️ Esta agenda junta las clases, prácticas, milongas y seminarios de tango de la ciudad. \
     Los eventos los cargan sus organizadores.\n\nEnviá 0 para volver al menú."
        .to_string()
}

pub fn not_registered() -> String {
    "🔒 Tu número no está registrado como organizador/a. Si querés publicar eventos, \
     pedile acceso a la administración.\n\n"
        .to_string()
        + &main_menu()
}

pub fn exit_confirmation() -> String {
    "👋 Listo, cancelé lo que estabas haciendo. Escribime cuando quieras para volver al menú."
        .to_string()
}

pub fn generic_apology() -> String {
    "😔 Perdón, algo salió mal. Volvamos a empezar: escribime cualquier mensaje para ver el menú."
        .to_string()
}

pub fn collaborator_apology() -> String {
    "😔 Perdón, no pude completar eso ahora. Probá de nuevo en un rato.".to_string()
}

pub fn price_label(price: &Price) -> String {
    if price.is_free() {
        "Gratuito".to_string()
    } else {
        format!("${price}")
    }
}

/// `2026-10-17` → `sábado 17 de octubre`.
pub fn date_label(date: NaiveDate) -> String {
    let weekday = match date.weekday() {
        Weekday::Mon => "lunes",
        Weekday::Tue => "martes",
        Weekday::Wed => "miércoles",
        Weekday::Thu => "jueves",
        Weekday::Fri => "viernes",
        Weekday::Sat => "sábado",
        Weekday::Sun => "domingo",
    };
    format!(
        "{weekday} {} de {}",
        date.day(),
        month_name(date.month()).unwrap_or_default()
    )
}

fn iso_date_label(iso: &str) -> String {
    NaiveDate::parse_from_str(iso, "%Y-%m-%d")
        .map(date_label)
        .unwrap_or_else(|_| iso.to_string())
}

// ── Event creation prompts ──────────────────────────────────────────

pub fn event_type_menu(free_text_enabled: bool) -> String {
    let mut text = "🗓️ ¿Qué tipo de evento querés cargar?\n\n\
                    1. Clase\n\
                    2. Milonga\n\
                    3. Seminario\n\
                    4. Evento especial"
        .to_string();
    if free_text_enabled {
        text.push_str("\n5. Describirlo en un solo mensaje ✨");
    }
    text
}

/// Question asked on entering `state`.
pub fn prompt(state: ChatState, session: &Session, free_text_enabled: bool) -> String {
    let draft = session.event.as_ref();
    let body = match state {
        ChatState::Start => return welcome(),
        ChatState::MainMenu => return main_menu(),
        ChatState::MenuSpecial => return special_menu(),
        ChatState::MenuAbout => return about(),
        ChatState::MenuToday => return event_listing("hoy", session.cached_events()),
        ChatState::MenuWeek => return event_listing("esta semana", session.cached_events()),
        ChatState::MenuTodayDetails | ChatState::MenuWeekDetails => {
            return "Enviá 0 para volver al listado.".to_string();
        }

        ChatState::CreateEventType => event_type_menu(free_text_enabled),
        ChatState::CreateEventFreeText => "✍️ Contame el evento en un solo mensaje: qué es, \
             cómo se llama, dónde, cuándo, a qué hora, quién lo da y cuánto sale."
            .to_string(),
        ChatState::CreateEventTitle => {
            let kind = draft
                .and_then(|d| d.event_type)
                .map(|t| t.label().to_lowercase())
                .unwrap_or_else(|| "evento".to_string());
            format!("📝 ¿Cuál es el título de la {kind}?")
        }
        ChatState::CreateEventVenue => "📍 ¿En qué lugar se hace? (nombre del salón o club)".to_string(),
        ChatState::CreateEventAddress => "🏠 ¿Cuál es la dirección?".to_string(),
        ChatState::CreateEventDate => {
            "📅 ¿Qué fecha? (DD/MM/AAAA, \"15 de marzo\", \"hoy\" o \"mañana\")".to_string()
        }

        ChatState::CreateClassSingleOrMultiple => {
            "¿Es una sola clase o varias?\n\n1. Una sola clase\n2. Varias clases".to_string()
        }
        ChatState::CreateClassTime => {
            let number = draft.map(|d| d.classes.len() + 1).unwrap_or(1);
            format!(
                "🕗 ¿A qué hora es la clase {number}? Podés indicar inicio y fin (\"19:00 - 20:30\")."
            )
        }
        ChatState::CreateClassLevel => "📶 ¿Qué nivel tiene la clase?\n\n\
             1. Principiante\n\
             2. Intermedio\n\
             3. Avanzado\n\
             4. Todos los niveles\n\
             5. Omitir"
            .to_string(),
        ChatState::CreateClassAddAnother => {
            "➕ ¿Querés agregar otra clase?\n\n1. Sí\n2. No".to_string()
        }
        ChatState::CreateClassPractice => {
            "💃 ¿Hay práctica después de la clase?\n\n1. Sí\n2. No".to_string()
        }
        ChatState::CreateClassPracticeTime => "🕗 ¿A qué hora empieza la práctica?".to_string(),

        ChatState::CreateMilongaTime => "🕗 ¿A qué hora empieza la milonga?".to_string(),
        ChatState::CreateMilongaPreClass => {
            "📚 ¿Hay clase antes de la milonga?\n\n1. Sí\n2. No".to_string()
        }
        ChatState::CreateMilongaPreClassTime => "🕗 ¿A qué hora es la clase previa?".to_string(),
        ChatState::CreateMilongaShow => {
            "🎭 ¿Hay show?\n\n1. Sí\n2. No\n\nTambién podés escribir directamente quién se presenta."
                .to_string()
        }
        ChatState::CreateMilongaShowDetails => "🎭 Contame del show: quiénes bailan o tocan.".to_string(),

        ChatState::CreateSpecialTime => "🕗 ¿A qué hora empieza el evento?".to_string(),

        ChatState::CreateOrganizerSelf => {
            "🙋 ¿Sos vos quien organiza o da el evento?\n\n1. Sí\n2. No".to_string()
        }
        ChatState::CreateOrganizerSearch => {
            "🔎 Escribí el nombre del profe u organizador/a para buscarlo, o \"nuevo\" para cargar un nombre."
                .to_string()
        }
        ChatState::CreateOrganizerSelect => teacher_choices(session.cached_teachers()),
        ChatState::CreateOrganizerOneTimeName => "✍️ ¿Cómo se llama?".to_string(),
        ChatState::CreateOrganizerAddAnother => {
            let names = draft
                .map(|d| {
                    d.organizers
                        .iter()
                        .map(|o| o.organizer.name().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            format!("👥 Organizan: {names}\n\n¿Agregás a alguien más?\n\n1. Sí\n2. No")
        }
        ChatState::CreateEventRecurrence => {
            "🔁 ¿Se repite todas las semanas el mismo día?\n\n1. Sí\n2. No".to_string()
        }
        ChatState::CreateEventContact => "📞 ¿Qué teléfono de contacto publicamos?\n\n\
             1. Mi número\n\
             2. Otro número\n\
             3. Ninguno"
            .to_string(),
        ChatState::CreateEventContactPhone => "📞 Escribí el teléfono de contacto.".to_string(),
        ChatState::CreateEventReminder => "⏰ ¿A qué número mandamos el recordatorio del evento?\n\n\
             1. Mi número\n\
             2. Otro número\n\
             3. No quiero recordatorio"
            .to_string(),
        ChatState::CreateEventReminderPhone => "⏰ Escribí el número para el recordatorio.".to_string(),
        ChatState::CreateEventDescription => {
            format!("🗒️ Agregá una descripción del evento {SKIP_HINT}")
        }
        ChatState::CreateEventPricing => "💲 ¿El evento tiene precio?\n\n1. Sí\n2. No, es gratuito".to_string(),
        ChatState::CreateEventPricingType => {
            "💲 ¿Es un precio único o una lista?\n\n1. Precio único\n2. Lista de precios".to_string()
        }
        ChatState::CreateEventPricingDetail => {
            "🏷️ ¿Qué incluye este precio? (ej: \"Clase + práctica\")".to_string()
        }
        ChatState::CreateEventPricingAmount => {
            "💵 ¿Cuánto sale? (escribí el número, o \"gratis\")".to_string()
        }
        ChatState::CreateEventPricingAddMore => "➕ ¿Agregás otro precio?\n\n1. Sí\n2. No".to_string(),
        ChatState::CreateEventConfirmation => {
            return match draft {
                Some(d) => event_summary(d) + "\n\n1. Confirmar\n2. Modificar" + NAV_FOOTER,
                None => "No hay ningún evento en curso.".to_string(),
            };
        }

        ChatState::NewTeacherName => "👤 ¿Cuál es tu nombre artístico?".to_string(),
        ChatState::NewTeacherDetails => {
            "📝 Contanos sobre vos: estilo, trayectoria, dónde das clases.".to_string()
        }
        ChatState::NewTeacherPassword => {
            "🔑 Elegí una contraseña para administrar tus eventos (mínimo 6 caracteres).".to_string()
        }
        ChatState::NewTeacherConfirmation => {
            return teacher_summary(session.teacher.as_ref(), false) + NAV_FOOTER;
        }
        ChatState::OtherTeacherPhone => "📱 ¿Cuál es el teléfono del profe?".to_string(),
        ChatState::OtherTeacherName => "👤 ¿Cómo se llama?".to_string(),
        ChatState::OtherTeacherDetails => {
            "📝 Contanos sobre el profe (enviá \".\" o \"-\" para omitir).".to_string()
        }
        ChatState::OtherTeacherConfirmation => {
            return teacher_summary(session.teacher.as_ref(), true) + NAV_FOOTER;
        }
    };
    body + NAV_FOOTER
}

pub fn teacher_choices(teachers: &[TeacherMatch]) -> String {
    let mut text = String::from("Encontré estas personas:\n");
    for (i, teacher) in teachers.iter().enumerate() {
        text.push_str(&format!("\n{}. {}", i + 1, teacher.name));
        if let Some(details) = &teacher.details {
            text.push_str(&format!(" — {details}"));
        }
    }
    text.push_str(&format!(
        "\n{}. Ninguna, cargar otro nombre\n\nRespondé con el número.",
        teachers.len() + 1
    ));
    text
}

pub fn teacher_not_found(term: &str) -> String {
    format!("🔎 No encontré a nadie con \"{term}\". Cargalo/a con su nombre.")
}

pub fn event_summary(draft: &DraftEvent) -> String {
    let mut lines = vec!["📋 *Resumen del evento*".to_string(), String::new()];

    if let Some(t) = draft.event_type {
        lines.push(format!("Tipo: {}", t.label()));
    }
    if let Some(title) = &draft.title {
        lines.push(format!("Título: {title}"));
    }
    if let Some(venue) = &draft.venue_name {
        lines.push(format!("Lugar: {venue}"));
    }
    if let Some(address) = &draft.address {
        lines.push(format!("Dirección: {address}"));
    }
    if let Some(date) = &draft.date {
        let recurrence = if draft.has_weekly_recurrence {
            " (todas las semanas)"
        } else {
            ""
        };
        lines.push(format!("Fecha: {}{recurrence}", iso_date_label(date)));
    }

    for (i, class) in draft.classes.iter().enumerate() {
        let mut line = format!("Clase {}: {}", i + 1, class.start_time);
        if let Some(end) = &class.end_time {
            line.push_str(&format!(" a {end}"));
        }
        if let Some(level) = class.level {
            line.push_str(&format!(" ({})", level.label()));
        }
        lines.push(line);
    }
    if let Some(practice) = &draft.practice {
        lines.push(format!("Práctica: {}", practice.time));
    }
    if let Some(pre) = &draft.pre_class {
        lines.push(format!("Clase previa: {}", pre.class_time));
    }
    if let Some(time) = &draft.start_time {
        let label = match draft.event_type {
            Some(EventType::Milonga) => "Milonga",
            _ => "Horario",
        };
        lines.push(format!("{label}: {time}"));
    }
    if let Some(show) = &draft.show_description {
        lines.push(format!("Show: {show}"));
    }

    if !draft.organizers.is_empty() {
        let names: Vec<String> = draft
            .organizers
            .iter()
            .map(|entry| {
                if entry.is_primary {
                    format!("{} ⭐", entry.organizer.name())
                } else {
                    entry.organizer.name().to_string()
                }
            })
            .collect();
        lines.push(format!("Organizan: {}", names.join(", ")));
    }
    if let Some(phone) = &draft.contact_phone {
        lines.push(format!("Contacto: {phone}"));
    }
    if let Some(phone) = &draft.reminder_phone {
        lines.push(format!("Recordatorio a: {phone}"));
    }
    if let Some(description) = &draft.description {
        lines.push(format!("Descripción: {description}"));
    }
    if draft.pricing.is_empty() {
        lines.push("Precio: Gratuito".to_string());
    } else {
        for entry in &draft.pricing {
            lines.push(format!(
                "Precio: {} — {}",
                entry.description,
                price_label(&entry.price)
            ));
        }
    }

    lines.join("\n")
}

pub fn incomplete_event(draft: &DraftEvent) -> String {
    let labels: Vec<_> = draft.missing_fields().iter().map(|m| m.label()).collect();
    format!(
        "⚠️ Al evento le falta: {}. Elegí 2 para modificarlo.",
        labels.join(", ")
    )
}

pub fn event_created(title: &str) -> String {
    format!("🎉 ¡Listo! \"{title}\" ya está publicado.\n\n") + &special_menu()
}

pub fn teacher_summary(draft: Option<&DraftTeacher>, other: bool) -> String {
    let heading = if other {
        "📋 *Datos del profe*"
    } else {
        "📋 *Tus datos*"
    };
    let mut lines = vec![heading.to_string(), String::new()];
    if let Some(draft) = draft {
        if let Some(phone) = &draft.phone {
            lines.push(format!("Teléfono: {phone}"));
        }
        if let Some(name) = &draft.name {
            lines.push(format!("Nombre: {name}"));
        }
        match &draft.details {
            Some(details) => lines.push(format!("Sobre: {details}")),
            None => lines.push("Sobre: —".to_string()),
        }
        if draft.password.is_some() {
            lines.push("Contraseña: ••••••".to_string());
        }
    }
    lines.push(String::new());
    lines.push("1. Confirmar\n2. Empezar de nuevo".to_string());
    lines.join("\n")
}

pub fn teacher_created(name: &str) -> String {
    format!("🎉 ¡{name} quedó registrado/a como profe!\n\n") + &special_menu()
}

// ── Listings ────────────────────────────────────────────────────────

pub fn event_listing(period: &str, events: &[ListedEvent]) -> String {
    if events.is_empty() {
        return format!("🙈 No hay eventos cargados para {period}.\n\nEnviá 0 para volver al menú.");
    }
    let mut text = format!("💃 *Eventos de {period}*\n");
    for (i, event) in events.iter().enumerate() {
        let time = event.time.as_deref().unwrap_or("—");
        text.push_str(&format!(
            "\n{}. {} — {} ({}, {} {})",
            i + 1,
            event.title,
            event.event_type.label(),
            event.venue_name,
            date_label(event.date),
            time
        ));
    }
    text.push_str("\n\nRespondé con el número para ver el detalle, o 0 para volver.");
    text
}

pub fn event_details(event: &ListedEvent) -> String {
    let mut lines = vec![
        format!("*{}*", event.title),
        format!("{}", event.event_type.label()),
        format!("📅 {}", date_label(event.date)),
    ];
    if let Some(time) = &event.time {
        lines.push(format!("🕗 {time}"));
    }
    if event.is_recurring {
        lines.push("🔁 Todas las semanas".to_string());
    }
    lines.push(format!("📍 {} — {}", event.venue_name, event.address));
    if !event.organizers.is_empty() {
        lines.push(format!("👥 {}", event.organizers.join(", ")));
    }
    if let Some(description) = &event.description {
        lines.push(format!("🗒️ {description}"));
    }
    if event.pricing.is_empty() {
        lines.push("💲 Gratuito".to_string());
    } else {
        for entry in &event.pricing {
            lines.push(format!("💲 {}: {}", entry.description, price_label(&entry.price)));
        }
    }
    if let Some(phone) = &event.contact_phone {
        lines.push(format!("📞 {phone}"));
    }
    lines.push(String::new());
    lines.push("Enviá 0 para volver al listado.".to_string());
    lines.join("\n")
}

pub fn extraction_notice(confidence: u8, questions: &[String]) -> String {
    let mut text = format!(
        "🤔 Entendí parte del evento (confianza {confidence}%). Revisemos lo que falta."
    );
    for question in questions {
        text.push_str(&format!("\n• {question}"));
    }
    text
}
