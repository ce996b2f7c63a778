//! Публичная модель значений: то, что внешний код отдаёт писателю и
//! получает из извлечения графа.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use rust_decimal::Decimal;

use crate::{
    error::{DecodeResult, EncodeResult},
    io::{PayloadReader, PayloadWriter},
    record::{DateTime, Primitive, PrimitiveType, TimeSpan},
};

/// Плотное типизированное хранилище элементов массива одного
/// примитивного типа.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveArray {
    Boolean(Vec<bool>),
    Byte(Vec<u8>),
    SByte(Vec<i8>),
    Char(Vec<char>),
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
    Int32(Vec<i32>),
    UInt32(Vec<u32>),
    Int64(Vec<i64>),
    UInt64(Vec<u64>),
    Single(Vec<f32>),
    Double(Vec<f64>),
    Decimal(Vec<Decimal>),
    TimeSpan(Vec<TimeSpan>),
    DateTime(Vec<DateTime>),
}

macro_rules! for_each_primitive_array {
    ($self:expr, $v:ident => $body:expr) => {
        match $self {
            PrimitiveArray::Boolean($v) => $body,
            PrimitiveArray::Byte($v) => $body,
            PrimitiveArray::SByte($v) => $body,
            PrimitiveArray::Char($v) => $body,
            PrimitiveArray::Int16($v) => $body,
            PrimitiveArray::UInt16($v) => $body,
            PrimitiveArray::Int32($v) => $body,
            PrimitiveArray::UInt32($v) => $body,
            PrimitiveArray::Int64($v) => $body,
            PrimitiveArray::UInt64($v) => $body,
            PrimitiveArray::Single($v) => $body,
            PrimitiveArray::Double($v) => $body,
            PrimitiveArray::Decimal($v) => $body,
            PrimitiveArray::TimeSpan($v) => $body,
            PrimitiveArray::DateTime($v) => $body,
        }
    };
}

impl PrimitiveArray {
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

    pub fn len(&self) -> usize {
        for_each_primitive_array!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Обрезает хранилище до `len` элементов.
    pub fn truncate(&mut self, len: usize) {
        for_each_primitive_array!(self, v => v.truncate(len))
    }

    /// Элемент по индексу как скалярный примитив.
    pub fn get(&self, index: usize) -> Option<Primitive> {
        match self {
            Self::Boolean(v) => v.get(index).map(|x| Primitive::Boolean(*x)),
            Self::Byte(v) => v.get(index).map(|x| Primitive::Byte(*x)),
            Self::SByte(v) => v.get(index).map(|x| Primitive::SByte(*x)),
            Self::Char(v) => v.get(index).map(|x| Primitive::Char(*x)),
            Self::Int16(v) => v.get(index).map(|x| Primitive::Int16(*x)),
            Self::UInt16(v) => v.get(index).map(|x| Primitive::UInt16(*x)),
            Self::Int32(v) => v.get(index).map(|x| Primitive::Int32(*x)),
            Self::UInt32(v) => v.get(index).map(|x| Primitive::UInt32(*x)),
            Self::Int64(v) => v.get(index).map(|x| Primitive::Int64(*x)),
            Self::UInt64(v) => v.get(index).map(|x| Primitive::UInt64(*x)),
            Self::Single(v) => v.get(index).map(|x| Primitive::Single(*x)),
            Self::Double(v) => v.get(index).map(|x| Primitive::Double(*x)),
            Self::Decimal(v) => v.get(index).map(|x| Primitive::Decimal(*x)),
            Self::TimeSpan(v) => v.get(index).map(|x| Primitive::TimeSpan(*x)),
            Self::DateTime(v) => v.get(index).map(|x| Primitive::DateTime(*x)),
        }
    }

    /// Читает `count` сырых значений типа `kind` подряд.
    ///
    /// Ёмкость наращивается по мере чтения: заявленная длина недоверенного
    /// потока не становится размером аллокации.
    pub fn read<R: Read>(
        r: &mut PayloadReader<R>,
        kind: PrimitiveType,
        count: usize,
        max_string_bytes: usize,
    ) -> DecodeResult<Self> {
        macro_rules! read_vec {
            ($variant:ident, $prim:ident) => {{
                let mut out = Vec::new();
                for _ in 0..count {
                    match Primitive::read(r, PrimitiveType::$prim, max_string_bytes)? {
                        Primitive::$prim(x) => out.push(x),
                        _ => unreachable!(),
                    }
                }
                Ok(Self::$variant(out))
            }};
        }

        match kind {
            PrimitiveType::Boolean => read_vec!(Boolean, Boolean),
            PrimitiveType::Byte => read_vec!(Byte, Byte),
            PrimitiveType::SByte => read_vec!(SByte, SByte),
            PrimitiveType::Char => read_vec!(Char, Char),
            PrimitiveType::Int16 => read_vec!(Int16, Int16),
            PrimitiveType::UInt16 => read_vec!(UInt16, UInt16),
            PrimitiveType::Int32 => read_vec!(Int32, Int32),
            PrimitiveType::UInt32 => read_vec!(UInt32, UInt32),
            PrimitiveType::Int64 => read_vec!(Int64, Int64),
            PrimitiveType::UInt64 => read_vec!(UInt64, UInt64),
            PrimitiveType::Single => read_vec!(Single, Single),
            PrimitiveType::Double => read_vec!(Double, Double),
            PrimitiveType::Decimal => read_vec!(Decimal, Decimal),
            PrimitiveType::TimeSpan => read_vec!(TimeSpan, TimeSpan),
            PrimitiveType::DateTime => read_vec!(DateTime, DateTime),
            PrimitiveType::String | PrimitiveType::Null => {
                Err(crate::error::DecodeError::IllegalPrimitiveType {
                    found: kind,
                    context: "primitive array element type",
                    offset: r.offset(),
                })
            }
        }
    }

    /// Пишет все элементы подряд, без тегов.
    pub fn write<W: Write>(&self, w: &mut PayloadWriter<W>) -> EncodeResult<()> {
        match self {
            Self::Boolean(v) => v.iter().try_for_each(|x| w.write_bool(*x)),
            Self::Byte(v) => v.iter().try_for_each(|x| w.write_u8(*x)),
            Self::SByte(v) => v.iter().try_for_each(|x| w.write_i8(*x)),
            Self::Char(v) => v.iter().try_for_each(|x| w.write_char(*x)),
            Self::Int16(v) => v.iter().try_for_each(|x| w.write_i16(*x)),
            Self::UInt16(v) => v.iter().try_for_each(|x| w.write_u16(*x)),
            Self::Int32(v) => v.iter().try_for_each(|x| w.write_i32(*x)),
            Self::UInt32(v) => v.iter().try_for_each(|x| w.write_u32(*x)),
            Self::Int64(v) => v.iter().try_for_each(|x| w.write_i64(*x)),
            Self::UInt64(v) => v.iter().try_for_each(|x| w.write_u64(*x)),
            Self::Single(v) => v.iter().try_for_each(|x| w.write_f32(*x)),
            Self::Double(v) => v.iter().try_for_each(|x| w.write_f64(*x)),
            Self::Decimal(v) => v.iter().try_for_each(|x| w.write_string(&x.to_string())),
            Self::TimeSpan(v) => v.iter().try_for_each(|x| w.write_i64(x.0)),
            Self::DateTime(v) => v.iter().try_for_each(|x| w.write_u64(x.0)),
        }
    }
}

/// Типизированное значение, пересекающее границу кодека.
///
/// Белый список форм, которые писатель умеет кодировать, а извлечение —
/// узнавать в разобранном графе. Всё, что не входит в список, остаётся
/// доступным через сам граф записей.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Char(char),
    Decimal(Decimal),
    DateTime(DateTime),
    TimeSpan(TimeSpan),
    String(String),
    /// Массив строк, null-элементы сохраняют позиции.
    StringArray(Vec<Option<String>>),
    /// Массив одного примитивного типа.
    PrimitiveArray(PrimitiveArray),
    /// Упорядоченный список одного примитивного типа.
    PrimitiveList(PrimitiveArray),
    /// Упорядоченный список строк.
    StringList(Vec<Option<String>>),
    /// Словарь со строковыми ключами и строковыми (или null) значениями.
    StringMap(BTreeMap<String, Option<String>>),
    /// Нетипизированный список примитивов, строк и null.
    List(Vec<Value>),
}

impl Value {
    /// Скалярный примитив, если значение им является.
    pub fn as_primitive(&self) -> Option<Primitive> {
        match self {
            Self::Bool(v) => Some(Primitive::Boolean(*v)),
            Self::I8(v) => Some(Primitive::SByte(*v)),
            Self::U8(v) => Some(Primitive::Byte(*v)),
            Self::I16(v) => Some(Primitive::Int16(*v)),
            Self::U16(v) => Some(Primitive::UInt16(*v)),
            Self::I32(v) => Some(Primitive::Int32(*v)),
            Self::U32(v) => Some(Primitive::UInt32(*v)),
            Self::I64(v) => Some(Primitive::Int64(*v)),
            Self::U64(v) => Some(Primitive::UInt64(*v)),
            Self::F32(v) => Some(Primitive::Single(*v)),
            Self::F64(v) => Some(Primitive::Double(*v)),
            Self::Char(v) => Some(Primitive::Char(*v)),
            Self::Decimal(v) => Some(Primitive::Decimal(*v)),
            Self::DateTime(v) => Some(Primitive::DateTime(*v)),
            Self::TimeSpan(v) => Some(Primitive::TimeSpan(*v)),
            _ => None,
        }
    }
}

impl From<Primitive> for Value {
    fn from(p: Primitive) -> Self {
        match p {
            Primitive::Boolean(v) => Self::Bool(v),
            Primitive::Byte(v) => Self::U8(v),
            Primitive::SByte(v) => Self::I8(v),
            Primitive::Char(v) => Self::Char(v),
            Primitive::Int16(v) => Self::I16(v),
            Primitive::UInt16(v) => Self::U16(v),
            Primitive::Int32(v) => Self::I32(v),
            Primitive::UInt32(v) => Self::U32(v),
            Primitive::Int64(v) => Self::I64(v),
            Primitive::UInt64(v) => Self::U64(v),
            Primitive::Single(v) => Self::F32(v),
            Primitive::Double(v) => Self::F64(v),
            Primitive::Decimal(v) => Self::Decimal(v),
            Primitive::TimeSpan(v) => Self::TimeSpan(v),
            Primitive::DateTime(v) => Self::DateTime(v),
        }
    }
}
