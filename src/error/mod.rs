pub mod decode;
pub mod encode;

pub use decode::DecodeError;
pub use encode::EncodeError;

/// Результат чтения из бинарного потока.
pub type DecodeResult<T> = Result<T, DecodeError>;
/// Результат записи в бинарный поток.
pub type EncodeResult<T> = Result<T, EncodeError>;

/// Форматирует суффикс " [offset: 0x..]" для ошибок, у которых смещение
/// известно не всегда.
pub(crate) fn offset_note(offset: &Option<u64>) -> String {
    match offset {
        Some(o) => format!(" [offset: 0x{o:X}]"),
        None => String::new(),
    }
}
