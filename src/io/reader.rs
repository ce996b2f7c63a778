use std::io::Read;

use super::MAX_LENGTH_PREFIX_BYTES;
use crate::error::{DecodeError, DecodeResult};

/// Читатель полезной нагрузки поверх произвольного `Read`.
///
/// Считает прочитанные байты, чтобы каждая ошибка несла смещение, на котором
/// поток перестал соответствовать формату. Никогда не читает дальше длины
/// текущего поля: усечённый поток даёт [`DecodeError::Truncated`], а не
/// мусорное значение.
pub struct PayloadReader<R: Read> {
    inner: R,
    offset: u64,
}

impl<R: Read> PayloadReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    /// Смещение следующего непрочитанного байта от начала потока.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn fill(&mut self, buf: &mut [u8], what: &'static str) -> DecodeResult<()> {
        self.inner.read_exact(buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                DecodeError::Truncated {
                    what,
                    offset: self.offset,
                }
            } else {
                DecodeError::Io {
                    what,
                    source: e,
                    offset: self.offset,
                }
            }
        })?;
        self.offset += buf.len() as u64;
        Ok(())
    }

    pub fn read_u8(&mut self, what: &'static str) -> DecodeResult<u8> {
        let mut buf = [0u8; 1];
        self.fill(&mut buf, what)?;
        Ok(buf[0])
    }

    pub fn read_i8(&mut self, what: &'static str) -> DecodeResult<i8> {
        Ok(self.read_u8(what)? as i8)
    }

    /// Булево значение: любой ненулевой байт трактуется как `true`.
    pub fn read_bool(&mut self, what: &'static str) -> DecodeResult<bool> {
        Ok(self.read_u8(what)? != 0)
    }

    pub fn read_u16(&mut self, what: &'static str) -> DecodeResult<u16> {
        let mut buf = [0u8; 2];
        self.fill(&mut buf, what)?;
        Ok(u16::from_le_bytes(buf))
    }

    pub fn read_i16(&mut self, what: &'static str) -> DecodeResult<i16> {
        Ok(self.read_u16(what)? as i16)
    }

    pub fn read_u32(&mut self, what: &'static str) -> DecodeResult<u32> {
        let mut buf = [0u8; 4];
        self.fill(&mut buf, what)?;
        Ok(u32::from_le_bytes(buf))
    }

    pub fn read_i32(&mut self, what: &'static str) -> DecodeResult<i32> {
        Ok(self.read_u32(what)? as i32)
    }

    pub fn read_u64(&mut self, what: &'static str) -> DecodeResult<u64> {
        let mut buf = [0u8; 8];
        self.fill(&mut buf, what)?;
        Ok(u64::from_le_bytes(buf))
    }

    pub fn read_i64(&mut self, what: &'static str) -> DecodeResult<i64> {
        Ok(self.read_u64(what)? as i64)
    }

    pub fn read_f32(&mut self, what: &'static str) -> DecodeResult<f32> {
        let mut buf = [0u8; 4];
        self.fill(&mut buf, what)?;
        Ok(f32::from_le_bytes(buf))
    }

    pub fn read_f64(&mut self, what: &'static str) -> DecodeResult<f64> {
        let mut buf = [0u8; 8];
        self.fill(&mut buf, what)?;
        Ok(f64::from_le_bytes(buf))
    }

    /// Читает 7-битный префикс длины (младшие 7 бит данных на байт,
    /// старший бит — признак продолжения).
    ///
    /// Длиннее пяти байт префикс быть не может, а итоговое значение обязано
    /// помещаться в неотрицательный i32 — всё прочее считается порчей потока.
    pub fn read_length_prefix(&mut self, what: &'static str) -> DecodeResult<u32> {
        let start = self.offset;
        let mut result: u32 = 0;
        let mut shift = 0;

        for i in 0..MAX_LENGTH_PREFIX_BYTES {
            let byte = self.read_u8(what)?;
            let payload = (byte & 0x7F) as u64;

            let shifted = payload << shift;
            if shifted > u32::MAX as u64 {
                return Err(DecodeError::Malformed {
                    what,
                    reason: "length prefix does not fit in 32 bits".to_string(),
                    offset: Some(start),
                });
            }
            result |= shifted as u32;

            if byte & 0x80 == 0 {
                if result > i32::MAX as u32 {
                    return Err(DecodeError::RangeViolation {
                        what,
                        value: result as i64,
                        offset: start,
                    });
                }
                return Ok(result);
            }

            shift += 7;

            // Префикс не должен быть длиннее 5 байт.
            if i == MAX_LENGTH_PREFIX_BYTES - 1 {
                return Err(DecodeError::Malformed {
                    what,
                    reason: format!(
                        "length prefix longer than {MAX_LENGTH_PREFIX_BYTES} bytes, possible corruption"
                    ),
                    offset: Some(start),
                });
            }
        }

        unreachable!()
    }

    /// Строка с 7-битным префиксом длины в байтах.
    pub fn read_string(&mut self, what: &'static str, max_bytes: usize) -> DecodeResult<String> {
        let start = self.offset;
        let len = self.read_length_prefix(what)? as usize;
        if len > max_bytes {
            return Err(DecodeError::LimitExceeded {
                what,
                value: len as u64,
                limit: max_bytes as u64,
                offset: start,
            });
        }

        let mut buf = vec![0u8; len];
        self.fill(&mut buf, what)?;
        String::from_utf8(buf).map_err(|_| DecodeError::InvalidUtf8 {
            what,
            offset: start,
        })
    }

    /// Один UTF-8 скаляр (1–4 байта), как его пишет `Char`.
    pub fn read_char(&mut self, what: &'static str) -> DecodeResult<char> {
        let start = self.offset;
        let first = self.read_u8(what)?;
        let width = match first {
            0x00..=0x7F => 1,
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => {
                return Err(DecodeError::InvalidUtf8 {
                    what,
                    offset: start,
                })
            }
        };

        let mut buf = [first, 0, 0, 0];
        if width > 1 {
            self.fill(&mut buf[1..width], what)?;
        }

        std::str::from_utf8(&buf[..width])
            .ok()
            .and_then(|s| s.chars().next())
            .ok_or(DecodeError::InvalidUtf8 {
                what,
                offset: start,
            })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn reader(bytes: &[u8]) -> PayloadReader<Cursor<&[u8]>> {
        PayloadReader::new(Cursor::new(bytes))
    }

    #[test]
    fn test_fixed_width_le() {
        let mut r = reader(&[0x2A, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(r.read_i32("i32").unwrap(), 42);
        assert_eq!(r.read_i32("i32").unwrap(), -1);
        assert_eq!(r.offset(), 8);
    }

    #[test]
    fn test_truncated_reports_offset() {
        let mut r = reader(&[0x01, 0x02]);
        let err = r.read_i32("i32").unwrap_err();
        match err {
            DecodeError::Truncated { offset, .. } => assert_eq!(offset, 0),
            other => panic!("expected Truncated, got {other:?}"),
        }
    }

    #[test]
    fn test_length_prefix_boundaries() {
        // 0x7F => 127 одним байтом, 0x80 0x01 => 128 двумя.
        let mut r = reader(&[0x7F]);
        assert_eq!(r.read_length_prefix("len").unwrap(), 127);

        let mut r = reader(&[0x80, 0x01]);
        assert_eq!(r.read_length_prefix("len").unwrap(), 128);

        // 300 => 0xAC 0x02
        let mut r = reader(&[0xAC, 0x02]);
        assert_eq!(r.read_length_prefix("len").unwrap(), 300);
    }

    #[test]
    fn test_length_prefix_too_long() {
        let mut r = reader(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]);
        let err = r.read_length_prefix("len").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }), "{err:?}");
    }

    #[test]
    fn test_length_prefix_incomplete() {
        let mut r = reader(&[0x80]);
        let err = r.read_length_prefix("len").unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }), "{err:?}");
    }

    #[test]
    fn test_length_prefix_rejects_over_i32() {
        // 0xFF 0xFF 0xFF 0xFF 0x0F == u32::MAX, что больше i32::MAX.
        let mut r = reader(&[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
        let err = r.read_length_prefix("len").unwrap_err();
        assert!(matches!(err, DecodeError::RangeViolation { .. }), "{err:?}");
    }

    #[test]
    fn test_string_roundtrip_bytes() {
        // "hi" => префикс 2, затем байты.
        let mut r = reader(&[0x02, b'h', b'i']);
        assert_eq!(r.read_string("string", 1024).unwrap(), "hi");
    }

    #[test]
    fn test_string_embedded_nul() {
        let mut r = reader(&[0x03, b'a', 0x00, b'b']);
        assert_eq!(r.read_string("string", 1024).unwrap(), "a\0b");
    }

    #[test]
    fn test_string_over_limit() {
        let mut r = reader(&[0x05, b'a', b'b', b'c', b'd', b'e']);
        let err = r.read_string("string", 4).unwrap_err();
        assert!(matches!(err, DecodeError::LimitExceeded { .. }), "{err:?}");
    }

    #[test]
    fn test_string_invalid_utf8() {
        let mut r = reader(&[0x02, 0xFF, 0xFE]);
        let err = r.read_string("string", 1024).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidUtf8 { .. }), "{err:?}");
    }

    #[test]
    fn test_char_widths() {
        let mut r = reader("Aй€🙂".as_bytes());
        assert_eq!(r.read_char("char").unwrap(), 'A');
        assert_eq!(r.read_char("char").unwrap(), 'й');
        assert_eq!(r.read_char("char").unwrap(), '€');
        assert_eq!(r.read_char("char").unwrap(), '🙂');
    }

    #[test]
    fn test_char_invalid_lead_byte() {
        let mut r = reader(&[0x80]);
        let err = r.read_char("char").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidUtf8 { .. }), "{err:?}");
    }
}
