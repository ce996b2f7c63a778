//! Разбор потока: конечный автомат по грамматике записей.
//!
//! Поток читается за один проход: заголовок, затем записи верхнего уровня
//! до маркера конца. На каждом переходе тег следующей записи сверяется с
//! маской допустимых записей текущего контекста, поэтому запись, которую
//! активная схема не предсказывала, не будет даже сконструирована. Любая
//! фатальная ошибка отбрасывает весь граф целиком.

pub mod allowed;
pub mod driver;
pub mod extract;

use std::io::Read;

pub use allowed::AllowedRecords;
pub use extract::extract_value;

use crate::{error::DecodeResult, record::Graph};

/// Лимит байтов строки по умолчанию (64 МБ).
pub const MAX_STRING_BYTES: usize = 64 * 1024 * 1024;
/// Лимит логических элементов массива по умолчанию (16M).
pub const MAX_ARRAY_ELEMENTS: usize = 16 * 1024 * 1024;
/// Лимит числа членов класса по умолчанию.
pub const MAX_MEMBER_COUNT: usize = 4096;
/// Лимит вложенности записей по умолчанию.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Верхние границы, задаваемые вызывающей стороной.
///
/// Лимиты проверяются до того, как заявленный размер успеет стать размером
/// аллокации.
#[derive(Debug, Clone)]
pub struct ParseLimits {
    pub max_string_bytes: usize,
    pub max_array_elements: usize,
    pub max_members: usize,
    pub max_depth: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_string_bytes: MAX_STRING_BYTES,
            max_array_elements: MAX_ARRAY_ELEMENTS,
            max_members: MAX_MEMBER_COUNT,
            max_depth: MAX_NESTING_DEPTH,
        }
    }
}

/// Разбирает поток с лимитами по умолчанию.
pub fn parse<R: Read>(source: R) -> DecodeResult<Graph> {
    parse_with_limits(source, ParseLimits::default())
}

/// Разбирает поток с лимитами вызывающей стороны.
pub fn parse_with_limits<R: Read>(source: R, limits: ParseLimits) -> DecodeResult<Graph> {
    driver::Parser::new(source, limits).run()
}
