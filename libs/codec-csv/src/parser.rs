use std::collections::HashMap;

use crate::error::CodecError;

// ═══════════════════════════════════════════════════════════════
//  Column mapping
// ═══════════════════════════════════════════════════════════════

/// Имя колонки → позиция в строке.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    positions: HashMap<String, usize>,
}

impl ColumnMap {
    /// Определить маппинг из строки заголовка.
    ///
    /// Duplicate names resolve to the last occurrence.
    pub fn from_header(fields: &[String]) -> Self {
        let positions = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.trim().to_string(), i))
            .collect();
        Self { positions }
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Позиция колонки, которую обязаны найти в заголовке.
    pub fn require(&self, name: &str) -> Result<usize, CodecError> {
        self.get(name)
            .ok_or_else(|| CodecError::MissingColumn(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════
//  RFC 4180 field parser
// ═══════════════════════════════════════════════════════════════

/// Почему строку не удалось разбить на поля.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    /// Строка закончилась внутри кавычек: запись продолжается на следующей строке
    /// или обрезана.
    Unterminated,
    /// После закрывающей кавычки идёт что-то кроме разделителя.
    TextAfterQuote { position: usize },
}

#[derive(Clone, Copy)]
enum State {
    FieldStart,
    Unquoted,
    Quoted,
    /// Кавычка внутри quoted-поля: либо `""`, либо конец поля.
    QuoteInQuoted,
}

/// Разбирает одну RFC 4180 запись на поля с учётом quoting.
///
/// A `"` inside an unquoted field is kept as a literal character.
pub fn parse_fields(record: &str, delimiter: char, quoting: bool) -> Result<Vec<String>, FieldError> {
    if !quoting {
        return Ok(record.split(delimiter).map(str::to_string).collect());
    }

    let mut fields = Vec::new();
    let mut field = String::new();
    let mut state = State::FieldStart;

    for c in record.chars() {
        state = match (state, c) {
            (State::Quoted, '"') => State::QuoteInQuoted,
            (State::Quoted, c) => {
                field.push(c);
                State::Quoted
            }
            (State::QuoteInQuoted, '"') => {
                field.push('"');
                State::Quoted
            }
            (_, c) if c == delimiter => {
                fields.push(std::mem::take(&mut field));
                State::FieldStart
            }
            (State::FieldStart, '"') => State::Quoted,
            (State::QuoteInQuoted, _) => {
                return Err(FieldError::TextAfterQuote {
                    position: fields.len(),
                });
            }
            (_, c) => {
                field.push(c);
                State::Unquoted
            }
        };
    }

    match state {
        State::Quoted => Err(FieldError::Unterminated),
        _ => {
            fields.push(field);
            Ok(fields)
        }
    }
}

/// Закодировать одно поле: кавычки только если без них строка не разберётся обратно.
pub fn encode_field(value: &str, delimiter: char, quoting: bool) -> String {
    let needs_quotes = quoting
        && (value.contains(delimiter)
            || value.contains('"')
            || value.contains('\n')
            || value.contains('\r'));
    if needs_quotes {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Shared config helper
// ═══════════════════════════════════════════════════════════════

pub fn parse_delimiter(s: &str) -> Result<char, CodecError> {
    let mut chars = s.chars();
    match (s, chars.next(), chars.next()) {
        ("\\t", _, _) => Ok('\t'),
        (_, Some(c), None) if c != '"' && c != '\n' && c != '\r' => Ok(c),
        _ => Err(CodecError::InvalidDelimiter(s.to_string())),
    }
}
