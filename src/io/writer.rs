use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::error::{EncodeError, EncodeResult};

/// Писатель полезной нагрузки поверх произвольного `Write`.
///
/// Зеркален [`PayloadReader`](super::PayloadReader): little-endian числа,
/// строки с 7-битным префиксом длины, одиночные UTF-8 символы.
pub struct PayloadWriter<W: Write> {
    inner: W,
}

impl<W: Write> PayloadWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn write_u8(&mut self, v: u8) -> EncodeResult<()> {
        self.inner.write_u8(v).map_err(|e| EncodeError::io("u8", e))
    }

    pub fn write_i8(&mut self, v: i8) -> EncodeResult<()> {
        self.write_u8(v as u8)
    }

    pub fn write_bool(&mut self, v: bool) -> EncodeResult<()> {
        self.write_u8(u8::from(v))
    }

    pub fn write_u16(&mut self, v: u16) -> EncodeResult<()> {
        self.inner
            .write_u16::<LittleEndian>(v)
            .map_err(|e| EncodeError::io("u16", e))
    }

    pub fn write_i16(&mut self, v: i16) -> EncodeResult<()> {
        self.inner
            .write_i16::<LittleEndian>(v)
            .map_err(|e| EncodeError::io("i16", e))
    }

    pub fn write_u32(&mut self, v: u32) -> EncodeResult<()> {
        self.inner
            .write_u32::<LittleEndian>(v)
            .map_err(|e| EncodeError::io("u32", e))
    }

    pub fn write_i32(&mut self, v: i32) -> EncodeResult<()> {
        self.inner
            .write_i32::<LittleEndian>(v)
            .map_err(|e| EncodeError::io("i32", e))
    }

    pub fn write_u64(&mut self, v: u64) -> EncodeResult<()> {
        self.inner
            .write_u64::<LittleEndian>(v)
            .map_err(|e| EncodeError::io("u64", e))
    }

    pub fn write_i64(&mut self, v: i64) -> EncodeResult<()> {
        self.inner
            .write_i64::<LittleEndian>(v)
            .map_err(|e| EncodeError::io("i64", e))
    }

    pub fn write_f32(&mut self, v: f32) -> EncodeResult<()> {
        self.inner
            .write_f32::<LittleEndian>(v)
            .map_err(|e| EncodeError::io("f32", e))
    }

    pub fn write_f64(&mut self, v: f64) -> EncodeResult<()> {
        self.inner
            .write_f64::<LittleEndian>(v)
            .map_err(|e| EncodeError::io("f64", e))
    }

    /// 7-битный префикс длины: 7 бит данных на байт, старший бит — признак
    /// продолжения.
    pub fn write_length_prefix(&mut self, mut value: u32) -> EncodeResult<()> {
        loop {
            let mut byte = (value & 0x7F) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            self.write_u8(byte)?;
            if value == 0 {
                return Ok(());
            }
        }
    }

    /// Строка с 7-битным префиксом длины в байтах UTF-8.
    pub fn write_string(&mut self, s: &str) -> EncodeResult<()> {
        let bytes = s.as_bytes();
        if bytes.len() > i32::MAX as usize {
            return Err(EncodeError::TooLong {
                what: "string",
                len: bytes.len() as u64,
                max: i32::MAX as u64,
            });
        }
        self.write_length_prefix(bytes.len() as u32)?;
        self.inner
            .write_all(bytes)
            .map_err(|e| EncodeError::io("string", e))
    }

    /// Один UTF-8 скаляр, без префикса.
    pub fn write_char(&mut self, c: char) -> EncodeResult<()> {
        let mut buf = [0u8; 4];
        let encoded = c.encode_utf8(&mut buf);
        self.inner
            .write_all(encoded.as_bytes())
            .map_err(|e| EncodeError::io("char", e))
    }
}
