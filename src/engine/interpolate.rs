use chrono::{Datelike, NaiveDate};

use crate::model::evaluation::EvaluationRecord;

const OPEN: &str = "`[";
const CLOSE: &str = "]`";

const MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// Placeholder values that do not come from the intake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConstants {
    pub current_date: String,
    pub current_age: String,
    pub name: String,
    pub unmet_need: String,
}

impl SessionConstants {
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            current_date: long_spanish_date(date),
            current_age: "adulta".to_string(),
            name: "Yo".to_string(),
            unmet_need: "amor y seguridad".to_string(),
        }
    }

    pub fn today() -> Self {
        Self::for_date(chrono::Local::now().date_naive())
    }

    fn lookup(&self, key: &str) -> Option<&str> {
        match key {
            "fecha_actual" => Some(&self.current_date),
            "edad_actual" => Some(&self.current_age),
            "nombre" => Some(&self.name),
            "necesidad_no_cumplida" => Some(&self.unmet_need),
            _ => None,
        }
    }
}

/// "17 de octubre de 2026"
pub fn long_spanish_date(date: NaiveDate) -> String {
    let month = MONTHS[date.month0() as usize];
    format!("{} de {} de {}", date.day(), month, date.year())
}

/// Replaces every `` `[key]` `` token in `template`.
///
/// Session constants win over record fields. A token that resolves to
/// nothing (or to an empty value) is kept verbatim, delimiters included.
pub fn interpolate(template: &str, record: &EvaluationRecord, constants: &SessionConstants) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + OPEN.len()..];

        match token_key(after_open) {
            Some(raw_key) => {
                let token_len = OPEN.len() + raw_key.len() + CLOSE.len();
                let token = &rest[start..start + token_len];
                out.push_str(&resolve(raw_key.trim(), record, constants).unwrap_or_else(|| token.to_string()));
                rest = &rest[start + token_len..];
            }
            None => {
                // Not a token; keep the backtick and rescan from the bracket.
                out.push('`');
                rest = &rest[start + 1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Key between the delimiters, if `text` continues a well-formed token.
fn token_key(text: &str) -> Option<&str> {
    let end = text.find(']')?;
    if end == 0 || !text[end..].starts_with(CLOSE) {
        return None;
    }
    Some(&text[..end])
}

fn resolve(key: &str, record: &EvaluationRecord, constants: &SessionConstants) -> Option<String> {
    let value = match constants.lookup(key) {
        Some(value) => value.to_string(),
        None => record.field(key)?,
    };
    (!value.is_empty()).then_some(value)
}

/// True when `text` still contains a token this engine knows how to fill.
#[cfg(test)]
fn has_known_placeholder(text: &str, record: &EvaluationRecord, constants: &SessionConstants) -> bool {
    let mut rest = text;
    while let Some(start) = rest.find(OPEN) {
        let after_open = &rest[start + OPEN.len()..];
        if let Some(key) = token_key(after_open) {
            if resolve(key.trim(), record, constants).is_some() {
                return true;
            }
        }
        rest = &rest[start + 1..];
    }
    false
}
