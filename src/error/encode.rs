use thiserror::Error;

/// Ошибка записи в бинарный поток.
///
/// «Неподдерживаемая форма значения» ошибкой не является: верхнеуровневые
/// функции записи возвращают `Ok(false)`, не тронув поток.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("I/O error while writing {what}: {source}")]
    Io {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{what} length {len} exceeds the wire maximum {max}")]
    TooLong { what: &'static str, len: u64, max: u64 },
}

impl EncodeError {
    pub(crate) fn io(what: &'static str, source: std::io::Error) -> Self {
        Self::Io { what, source }
    }
}
