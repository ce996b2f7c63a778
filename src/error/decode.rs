use thiserror::Error;

use super::offset_note;
use crate::record::tags::{PrimitiveType, RecordType};

/// Ошибка разбора бинарного потока.
///
/// Любая из этих ошибок фатальна для текущего разбора: недостроенный граф
/// отбрасывается целиком, частичный результат наружу не отдаётся.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// В потоке осталось меньше байт, чем требует текущее поле.
    #[error("unexpected end of stream while reading {what} [offset: 0x{offset:X}]")]
    Truncated { what: &'static str, offset: u64 },

    /// Ошибка ввода-вывода нижележащего источника.
    #[error("I/O error while reading {what}: {source} [offset: 0x{offset:X}]")]
    Io {
        what: &'static str,
        #[source]
        source: std::io::Error,
        offset: u64,
    },

    /// Байт тега не входит в закрытое множество типов записей.
    #[error("unknown record type 0x{tag:02X} [offset: 0x{offset:X}]")]
    UnknownRecordType { tag: u8, offset: u64 },

    /// Байт дискриминанта (BinaryType, PrimitiveType и т.п.) вне диапазона.
    #[error("unknown {what} value 0x{value:02X} [offset: 0x{offset:X}]")]
    UnknownDiscriminant {
        what: &'static str,
        value: u8,
        offset: u64,
    },

    /// Тег записи допустим сам по себе, но запрещён в текущем контексте
    /// грамматики. Основная защита от недоверенного входа.
    #[error("record {tag:?} is not allowed in this context (allowed: {allowed}) [offset: 0x{offset:X}]")]
    UnexpectedRecordType {
        tag: RecordType,
        allowed: String,
        offset: u64,
    },

    /// Примитивный тип, который в данном месте не может кодировать значение
    /// (сентинели String/Null).
    #[error("primitive type {found:?} is not legal as {context} [offset: 0x{offset:X}]")]
    IllegalPrimitiveType {
        found: PrimitiveType,
        context: &'static str,
        offset: u64,
    },

    /// Отрицательная длина или счётчик.
    #[error("{what} out of range: {value} [offset: 0x{offset:X}]")]
    RangeViolation {
        what: &'static str,
        value: i64,
        offset: u64,
    },

    /// Значение превышает лимит, заданный вызывающей стороной.
    #[error("{what} {value} exceeds limit {limit} [offset: 0x{offset:X}]")]
    LimitExceeded {
        what: &'static str,
        value: u64,
        limit: u64,
        offset: u64,
    },

    /// Недопустимый идентификатор записи (нулевой или неположительный там,
    /// где формат требует положительный).
    #[error("invalid {what}: {id} [offset: 0x{offset:X}]")]
    InvalidId {
        what: &'static str,
        id: i32,
        offset: u64,
    },

    /// Положительный идентификатор зарегистрирован повторно.
    #[error("duplicate object id {id}{}", offset_note(.offset))]
    DuplicateId { id: i32, offset: Option<u64> },

    /// Ссылка на идентификатор, которого нет в графе.
    #[error("reference to unregistered object id {id}")]
    UnresolvedReference { id: i32 },

    /// Ссылка разрешилась в запись не того рода.
    #[error("object id {id} refers to a {found} record where {expected} was expected")]
    WrongReferencedKind {
        id: i32,
        expected: &'static str,
        found: &'static str,
    },

    /// Фактическое число элементов или членов не совпало с заявленным.
    #[error("{what}: declared {declared}, got {actual}")]
    CountMismatch {
        what: &'static str,
        declared: u64,
        actual: u64,
    },

    /// Серия null-значений длиннее, чем осталось логических ячеек.
    #[error("null run of {count} exceeds {remaining} remaining slots [offset: 0x{offset:X}]")]
    NullRunOverflow {
        count: u32,
        remaining: u64,
        offset: u64,
    },

    /// Структурно некорректная запись (версия заголовка, ранг массива и т.п.).
    #[error("malformed {what}: {reason}{}", offset_note(.offset))]
    Malformed {
        what: &'static str,
        reason: String,
        offset: Option<u64>,
    },

    /// Байты строки не являются корректным UTF-8.
    #[error("invalid UTF-8 in {what} [offset: 0x{offset:X}]")]
    InvalidUtf8 { what: &'static str, offset: u64 },

    /// Строковая форма decimal не разбирается.
    #[error("invalid decimal literal {literal:?} [offset: 0x{offset:X}]")]
    InvalidDecimal { literal: String, offset: u64 },

    /// Превышена глубина вложенности записей.
    #[error("nesting depth {depth} exceeds limit {limit} [offset: 0x{offset:X}]")]
    DepthExceeded {
        depth: usize,
        limit: usize,
        offset: u64,
    },
}

impl DecodeError {
    /// Добавляет смещение к ошибкам, которые рождаются вне читателя
    /// (арена, пост-валидация) и потому не знают его сами.
    pub fn with_offset(mut self, at: u64) -> Self {
        match &mut self {
            Self::DuplicateId { offset, .. } | Self::Malformed { offset, .. } => {
                *offset = Some(at);
            }
            _ => {}
        }
        self
    }
}
