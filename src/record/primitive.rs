//! Примитивные значения фиксированной кодировки.
//!
//! Значение читается и пишется «сырыми» байтами, без тега записи: каким
//! примитивом оно является, всегда известно из активного схемного
//! дескриптора или из байта типа рядом с ним.

use std::io::{Read, Write};
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::{
    error::{DecodeError, DecodeResult, EncodeResult},
    io::{PayloadReader, PayloadWriter},
    record::tags::PrimitiveType,
};

/// Интервал времени: число 100-наносекундных тиков.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeSpan(pub i64);

/// Момент времени в сыром проволочном виде: биты 0–61 — тики,
/// биты 62–63 — kind (Unspecified/Utc/Local).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateTime(pub u64);

impl DateTime {
    pub fn ticks(self) -> i64 {
        (self.0 & 0x3FFF_FFFF_FFFF_FFFF) as i64
    }

    pub fn kind(self) -> u8 {
        (self.0 >> 62) as u8
    }
}

/// Одно примитивное значение проволочного формата.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Boolean(bool),
    Byte(u8),
    SByte(i8),
    Char(char),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Single(f32),
    Double(f64),
    Decimal(Decimal),
    TimeSpan(TimeSpan),
    DateTime(DateTime),
}

impl Primitive {
    pub fn kind(&self) -> PrimitiveType {
        match self {
            Self::Boolean(_) => PrimitiveType::Boolean,
            Self::Byte(_) => PrimitiveType::Byte,
            Self::SByte(_) => PrimitiveType::SByte,
            Self::Char(_) => PrimitiveType::Char,
            Self::Int16(_) => PrimitiveType::Int16,
            Self::UInt16(_) => PrimitiveType::UInt16,
            Self::Int32(_) => PrimitiveType::Int32,
            Self::UInt32(_) => PrimitiveType::UInt32,
            Self::Int64(_) => PrimitiveType::Int64,
            Self::UInt64(_) => PrimitiveType::UInt64,
            Self::Single(_) => PrimitiveType::Single,
            Self::Double(_) => PrimitiveType::Double,
            Self::Decimal(_) => PrimitiveType::Decimal,
            Self::TimeSpan(_) => PrimitiveType::TimeSpan,
            Self::DateTime(_) => PrimitiveType::DateTime,
        }
    }

    /// Читает одно значение указанного типа.
    ///
    /// Decimal едет по проводу строкой в инвариантной форме, поэтому для
    /// него действует лимит длины строки.
    pub fn read<R: Read>(
        r: &mut PayloadReader<R>,
        kind: PrimitiveType,
        max_string_bytes: usize,
    ) -> DecodeResult<Self> {
        match kind {
            PrimitiveType::Boolean => Ok(Self::Boolean(r.read_bool("boolean")?)),
            PrimitiveType::Byte => Ok(Self::Byte(r.read_u8("byte")?)),
            PrimitiveType::SByte => Ok(Self::SByte(r.read_i8("sbyte")?)),
            PrimitiveType::Char => Ok(Self::Char(r.read_char("char")?)),
            PrimitiveType::Int16 => Ok(Self::Int16(r.read_i16("int16")?)),
            PrimitiveType::UInt16 => Ok(Self::UInt16(r.read_u16("uint16")?)),
            PrimitiveType::Int32 => Ok(Self::Int32(r.read_i32("int32")?)),
            PrimitiveType::UInt32 => Ok(Self::UInt32(r.read_u32("uint32")?)),
            PrimitiveType::Int64 => Ok(Self::Int64(r.read_i64("int64")?)),
            PrimitiveType::UInt64 => Ok(Self::UInt64(r.read_u64("uint64")?)),
            PrimitiveType::Single => Ok(Self::Single(r.read_f32("single")?)),
            PrimitiveType::Double => Ok(Self::Double(r.read_f64("double")?)),
            PrimitiveType::TimeSpan => Ok(Self::TimeSpan(TimeSpan(r.read_i64("time span")?))),
            PrimitiveType::DateTime => Ok(Self::DateTime(DateTime(r.read_u64("date time")?))),
            PrimitiveType::Decimal => {
                let at = r.offset();
                let literal = r.read_string("decimal", max_string_bytes)?;
                let value =
                    Decimal::from_str(&literal).map_err(|_| DecodeError::InvalidDecimal {
                        literal,
                        offset: at,
                    })?;
                Ok(Self::Decimal(value))
            }
            PrimitiveType::String | PrimitiveType::Null => {
                Err(DecodeError::IllegalPrimitiveType {
                    found: kind,
                    context: "stored primitive value",
                    offset: r.offset(),
                })
            }
        }
    }

    /// Пишет значение в той же сырой кодировке.
    pub fn write<W: Write>(&self, w: &mut PayloadWriter<W>) -> EncodeResult<()> {
        match self {
            Self::Boolean(v) => w.write_bool(*v),
            Self::Byte(v) => w.write_u8(*v),
            Self::SByte(v) => w.write_i8(*v),
            Self::Char(v) => w.write_char(*v),
            Self::Int16(v) => w.write_i16(*v),
            Self::UInt16(v) => w.write_u16(*v),
            Self::Int32(v) => w.write_i32(*v),
            Self::UInt32(v) => w.write_u32(*v),
            Self::Int64(v) => w.write_i64(*v),
            Self::UInt64(v) => w.write_u64(*v),
            Self::Single(v) => w.write_f32(*v),
            Self::Double(v) => w.write_f64(*v),
            Self::Decimal(v) => w.write_string(&v.to_string()),
            Self::TimeSpan(v) => w.write_i64(v.0),
            Self::DateTime(v) => w.write_u64(v.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn roundtrip(p: Primitive) -> Primitive {
        let mut buf = Vec::new();
        let mut w = PayloadWriter::new(&mut buf);
        p.write(&mut w).unwrap();
        let mut r = PayloadReader::new(Cursor::new(buf.as_slice()));
        Primitive::read(&mut r, p.kind(), 1 << 20).unwrap()
    }

    #[test]
    fn test_integer_roundtrip() {
        for p in [
            Primitive::Boolean(true),
            Primitive::Byte(0xFF),
            Primitive::SByte(-128),
            Primitive::Int16(-1),
            Primitive::UInt16(u16::MAX),
            Primitive::Int32(i32::MIN),
            Primitive::UInt32(u32::MAX),
            Primitive::Int64(i64::MIN),
            Primitive::UInt64(u64::MAX),
        ] {
            assert_eq!(roundtrip(p.clone()), p);
        }
    }

    #[test]
    fn test_float_special_values() {
        for v in [f64::INFINITY, f64::NEG_INFINITY, -0.0f64, 1.5e300] {
            match roundtrip(Primitive::Double(v)) {
                Primitive::Double(got) => assert_eq!(got.to_bits(), v.to_bits()),
                other => panic!("expected Double, got {other:?}"),
            }
        }
        match roundtrip(Primitive::Double(f64::NAN)) {
            Primitive::Double(got) => assert!(got.is_nan()),
            other => panic!("expected Double, got {other:?}"),
        }
    }

    #[test]
    fn test_decimal_invariant_string() {
        for s in ["0", "-1.5", "0.001", "79228162514264337593543950335"] {
            let d = Decimal::from_str(s).unwrap();
            assert_eq!(roundtrip(Primitive::Decimal(d)), Primitive::Decimal(d));
        }
    }

    #[test]
    fn test_decimal_rejects_garbage() {
        let mut buf = Vec::new();
        let mut w = PayloadWriter::new(&mut buf);
        w.write_string("not a number").unwrap();
        let mut r = PayloadReader::new(Cursor::new(buf.as_slice()));
        let err = Primitive::read(&mut r, PrimitiveType::Decimal, 1024).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidDecimal { .. }), "{err:?}");
    }

    #[test]
    fn test_date_time_kind_bits() {
        let raw = (2u64 << 62) | 630_822_816_000_000_000;
        let dt = DateTime(raw);
        assert_eq!(dt.kind(), 2);
        assert_eq!(dt.ticks(), 630_822_816_000_000_000);
        assert_eq!(roundtrip(Primitive::DateTime(dt)), Primitive::DateTime(dt));
    }

    #[test]
    fn test_sentinels_not_storable() {
        let mut r = PayloadReader::new(Cursor::new(&[0u8][..]));
        for kind in [PrimitiveType::String, PrimitiveType::Null] {
            let err = Primitive::read(&mut r, kind, 1024).unwrap_err();
            assert!(matches!(err, DecodeError::IllegalPrimitiveType { .. }), "{err:?}");
        }
    }
}
