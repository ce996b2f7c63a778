//! Примитивный кодек потока: little-endian числа фиксированной ширины,
//! строки UTF-8 с 7-битным префиксом длины, одиночные UTF-8 символы.
//!
//! Этот слой ничего не знает о записях и грамматике — только о байтах.
//! Используется модулями `record`, `parse` и `write`.

pub mod reader;
pub mod writer;

pub use reader::PayloadReader;
pub use writer::PayloadWriter;

/// Максимальное число байт 7-битного префикса длины (u32 целиком).
pub const MAX_LENGTH_PREFIX_BYTES: usize = 5;
