//! Закрытые множества однобайтовых дискриминантов проволочного формата.
//!
//! Каждая запись начинается с байта [`RecordType`]; схемные дескрипторы
//! используют [`BinaryType`] и [`PrimitiveType`]. Байт вне множества — это
//! всегда ошибка протокола, а не «неизвестный, но допустимый» тег.

use std::io::Read;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{
    error::{DecodeError, DecodeResult},
    io::PayloadReader,
};

/// Тип записи (первый байт каждой записи).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum RecordType {
    SerializedStreamHeader = 0,
    ClassWithId = 1,
    SystemClassWithMembers = 2,
    ClassWithMembers = 3,
    SystemClassWithMembersAndTypes = 4,
    ClassWithMembersAndTypes = 5,
    BinaryObjectString = 6,
    BinaryArray = 7,
    MemberPrimitiveTyped = 8,
    MemberReference = 9,
    ObjectNull = 10,
    MessageEnd = 11,
    BinaryLibrary = 12,
    ObjectNullMultiple256 = 13,
    ObjectNullMultiple = 14,
    ArraySinglePrimitive = 15,
    ArraySingleObject = 16,
    ArraySingleString = 17,
}

impl RecordType {
    /// Читает байт тега; неизвестное значение — ошибка протокола.
    pub fn read<R: Read>(r: &mut PayloadReader<R>) -> DecodeResult<Self> {
        let at = r.offset();
        let byte = r.read_u8("record type")?;
        Self::try_from(byte).map_err(|_| DecodeError::UnknownRecordType {
            tag: byte,
            offset: at,
        })
    }
}

/// Заявленный тип члена класса или элемента массива.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum BinaryType {
    Primitive = 0,
    String = 1,
    Object = 2,
    SystemClass = 3,
    Class = 4,
    ObjectArray = 5,
    StringArray = 6,
    PrimitiveArray = 7,
}

impl BinaryType {
    pub fn read<R: Read>(r: &mut PayloadReader<R>) -> DecodeResult<Self> {
        let at = r.offset();
        let byte = r.read_u8("binary type")?;
        Self::try_from(byte).map_err(|_| DecodeError::UnknownDiscriminant {
            what: "binary type",
            value: byte,
            offset: at,
        })
    }
}

/// Раскладка многомерного/смещённого массива в записи BinaryArray.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum BinaryArrayType {
    Single = 0,
    Jagged = 1,
    Rectangular = 2,
    SingleOffset = 3,
    JaggedOffset = 4,
    RectangularOffset = 5,
}

impl BinaryArrayType {
    pub fn read<R: Read>(r: &mut PayloadReader<R>) -> DecodeResult<Self> {
        let at = r.offset();
        let byte = r.read_u8("binary array type")?;
        Self::try_from(byte).map_err(|_| DecodeError::UnknownDiscriminant {
            what: "binary array type",
            value: byte,
            offset: at,
        })
    }

    /// Несёт ли раскладка блок нижних границ по измерениям.
    pub fn has_offsets(self) -> bool {
        matches!(
            self,
            Self::SingleOffset | Self::JaggedOffset | Self::RectangularOffset
        )
    }

    /// Допустим ли ранг больше единицы.
    pub fn is_multidimensional(self) -> bool {
        matches!(self, Self::Rectangular | Self::RectangularOffset)
    }
}

/// Примитивный тип значения фиксированной кодировки.
///
/// `String` и `Null` — сентинели: они легальны только внутри схемных
/// дескрипторов и никогда не кодируют хранимое значение сами по себе.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum PrimitiveType {
    Boolean = 1,
    Byte = 2,
    Char = 3,
    Decimal = 5,
    Double = 6,
    Int16 = 7,
    Int32 = 8,
    Int64 = 9,
    SByte = 10,
    Single = 11,
    TimeSpan = 12,
    DateTime = 13,
    UInt16 = 14,
    UInt32 = 15,
    UInt64 = 16,
    Null = 17,
    String = 18,
}

impl PrimitiveType {
    pub fn read<R: Read>(r: &mut PayloadReader<R>) -> DecodeResult<Self> {
        let at = r.offset();
        let byte = r.read_u8("primitive type")?;
        Self::try_from(byte).map_err(|_| DecodeError::UnknownDiscriminant {
            what: "primitive type",
            value: byte,
            offset: at,
        })
    }

    /// Читает байт примитивного типа, отвергая сентинели `String`/`Null`.
    pub fn read_storable<R: Read>(
        r: &mut PayloadReader<R>,
        context: &'static str,
    ) -> DecodeResult<Self> {
        let at = r.offset();
        let kind = Self::read(r)?;
        if matches!(kind, Self::String | Self::Null) {
            return Err(DecodeError::IllegalPrimitiveType {
                found: kind,
                context,
                offset: at,
            });
        }
        Ok(kind)
    }

    /// Полное имя системного типа-обёртки для этого примитива.
    pub fn system_type_name(self) -> &'static str {
        match self {
            Self::Boolean => "System.Boolean",
            Self::Byte => "System.Byte",
            Self::Char => "System.Char",
            Self::Decimal => "System.Decimal",
            Self::Double => "System.Double",
            Self::Int16 => "System.Int16",
            Self::Int32 => "System.Int32",
            Self::Int64 => "System.Int64",
            Self::SByte => "System.SByte",
            Self::Single => "System.Single",
            Self::TimeSpan => "System.TimeSpan",
            Self::DateTime => "System.DateTime",
            Self::UInt16 => "System.UInt16",
            Self::UInt32 => "System.UInt32",
            Self::UInt64 => "System.UInt64",
            Self::Null => "System.Object",
            Self::String => "System.String",
        }
    }

    /// Обратное соответствие имени системного типа примитиву.
    pub fn from_system_type_name(name: &str) -> Option<Self> {
        match name {
            "System.Boolean" => Some(Self::Boolean),
            "System.Byte" => Some(Self::Byte),
            "System.Char" => Some(Self::Char),
            "System.Decimal" => Some(Self::Decimal),
            "System.Double" => Some(Self::Double),
            "System.Int16" => Some(Self::Int16),
            "System.Int32" => Some(Self::Int32),
            "System.Int64" => Some(Self::Int64),
            "System.SByte" => Some(Self::SByte),
            "System.Single" => Some(Self::Single),
            "System.TimeSpan" => Some(Self::TimeSpan),
            "System.DateTime" => Some(Self::DateTime),
            "System.UInt16" => Some(Self::UInt16),
            "System.UInt32" => Some(Self::UInt32),
            "System.UInt64" => Some(Self::UInt64),
            _ => None,
        }
    }
}
