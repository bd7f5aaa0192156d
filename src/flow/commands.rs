//! Command vocabulary: the one place that decides what counts as "yes",
//! "no", "back" and "exit".

const CONFIRM: &[&str] = &["1", "si", "sí", "s", "confirmo", "confirmar", "crear", "ok", "dale"];
const DECLINE: &[&str] = &["2", "no", "n", "modificar"];
const BACK: &[&str] = &["0", "volver"];
const EXIT: &[&str] = &["salir", "cancelar"];

/// Canonical form of an inbound message: trimmed, lowercased, inner
/// whitespace collapsed, trailing `!`/`?` removed.
pub fn normalize(raw: &str) -> String {
    let collapsed = raw
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    collapsed
        .trim_end_matches(['!', '?', '¡', '¿'])
        .trim_end()
        .to_string()
}

/// Navigation commands that override every state-specific handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Back,
    Exit,
}

impl Command {
    /// Recognize a global command in an already-normalized message.
    pub fn parse(normalized: &str) -> Option<Command> {
        if BACK.contains(&normalized) {
            Some(Command::Back)
        } else if EXIT.contains(&normalized) {
            Some(Command::Exit)
        } else {
            None
        }
    }
}

/// Answer to a yes/no question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
}

impl Answer {
    pub fn parse(normalized: &str) -> Option<Answer> {
        if is_confirm(normalized) {
            Some(Answer::Yes)
        } else if is_decline(normalized) {
            Some(Answer::No)
        } else {
            None
        }
    }
}

pub fn is_confirm(normalized: &str) -> bool {
    CONFIRM.contains(&normalized)
}

pub fn is_decline(normalized: &str) -> bool {
    DECLINE.contains(&normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_and_strips() {
        assert_eq!(normalize("  Hola   Mundo!! "), "hola mundo");
        assert_eq!(normalize("SÍ"), "sí");
        assert_eq!(normalize("volver?"), "volver");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn global_commands() {
        assert_eq!(Command::parse(&normalize("0")), Some(Command::Back));
        assert_eq!(Command::parse(&normalize(" Volver ")), Some(Command::Back));
        assert_eq!(Command::parse(&normalize("SALIR")), Some(Command::Exit));
        assert_eq!(Command::parse(&normalize("cancelar!")), Some(Command::Exit));
        assert_eq!(Command::parse(&normalize("1")), None);
        assert_eq!(Command::parse(&normalize("volver a empezar")), None);
    }

    #[test]
    fn answers() {
        for yes in ["1", "si", "Sí", "confirmo", "crear", "dale"] {
            assert_eq!(Answer::parse(&normalize(yes)), Some(Answer::Yes), "{yes}");
        }
        for no in ["2", "No", "modificar"] {
            assert_eq!(Answer::parse(&normalize(no)), Some(Answer::No), "{no}");
        }
        assert_eq!(Answer::parse("3"), None);
        assert_eq!(Answer::parse("quizás"), None);
    }

    #[test]
    fn vocabularies_do_not_overlap() {
        for token in CONFIRM {
            assert!(!DECLINE.contains(token));
            assert!(!BACK.contains(token));
            assert!(!EXIT.contains(token));
        }
        for token in DECLINE {
            assert!(!BACK.contains(token));
            assert!(!EXIT.contains(token));
        }
    }
}
