//! Схемные дескрипторы: ClassInfo, MemberTypeInfo, ArrayInfo.
//!
//! Дескриптор — это то, что грамматика «обещает» о следующих байтах.
//! Разбор членов и элементов опирается на эти обещания и отвергает записи,
//! которые активная схема не предсказывала.

use std::io::{Read, Write};

use crate::{
    error::{DecodeError, DecodeResult, EncodeResult},
    io::{PayloadReader, PayloadWriter},
    parse::ParseLimits,
    record::tags::{BinaryArrayType, BinaryType, PrimitiveType},
    record::Id,
};

/// Максимальный ранг многомерного массива.
pub const MAX_ARRAY_RANK: i32 = 32;

/// Имя типа и библиотека, в которой он объявлен.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassTypeInfo {
    pub name: String,
    pub library_id: Id,
}

/// Заявленный тип одного члена класса или элемента массива: байт
/// [`BinaryType`] вместе с его дополнительной нагрузкой.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclaredType {
    Primitive(PrimitiveType),
    String,
    Object,
    SystemClass(String),
    Class(ClassTypeInfo),
    ObjectArray,
    StringArray,
    PrimitiveArray(PrimitiveType),
}

impl DeclaredType {
    pub fn binary_type(&self) -> BinaryType {
        match self {
            Self::Primitive(_) => BinaryType::Primitive,
            Self::String => BinaryType::String,
            Self::Object => BinaryType::Object,
            Self::SystemClass(_) => BinaryType::SystemClass,
            Self::Class(_) => BinaryType::Class,
            Self::ObjectArray => BinaryType::ObjectArray,
            Self::StringArray => BinaryType::StringArray,
            Self::PrimitiveArray(_) => BinaryType::PrimitiveArray,
        }
    }

    /// Читает дополнительную нагрузку для уже известного байта типа.
    ///
    /// `Primitive`/`PrimitiveArray` несут байт примитивного типа (сентинели
    /// запрещены), `SystemClass` — имя типа, `Class` — имя типа и
    /// идентификатор библиотеки; остальные типы нагрузки не имеют.
    pub fn read_additional<R: Read>(
        r: &mut PayloadReader<R>,
        btype: BinaryType,
        limits: &ParseLimits,
    ) -> DecodeResult<Self> {
        match btype {
            BinaryType::Primitive => Ok(Self::Primitive(PrimitiveType::read_storable(
                r,
                "declared member type",
            )?)),
            BinaryType::String => Ok(Self::String),
            BinaryType::Object => Ok(Self::Object),
            BinaryType::SystemClass => Ok(Self::SystemClass(
                r.read_string("type name", limits.max_string_bytes)?,
            )),
            BinaryType::Class => {
                let name = r.read_string("type name", limits.max_string_bytes)?;
                let library_id = r.read_i32("library id")?;
                Ok(Self::Class(ClassTypeInfo { name, library_id }))
            }
            BinaryType::ObjectArray => Ok(Self::ObjectArray),
            BinaryType::StringArray => Ok(Self::StringArray),
            BinaryType::PrimitiveArray => Ok(Self::PrimitiveArray(PrimitiveType::read_storable(
                r,
                "declared element type",
            )?)),
        }
    }

    /// Пишет только дополнительную нагрузку (байт типа пишется отдельно).
    pub fn write_additional<W: Write>(&self, w: &mut PayloadWriter<W>) -> EncodeResult<()> {
        match self {
            Self::Primitive(kind) | Self::PrimitiveArray(kind) => w.write_u8(u8::from(*kind)),
            Self::SystemClass(name) => w.write_string(name),
            Self::Class(info) => {
                w.write_string(&info.name)?;
                w.write_i32(info.library_id)
            }
            Self::String | Self::Object | Self::ObjectArray | Self::StringArray => Ok(()),
        }
    }
}

/// Идентификатор, полное имя типа и упорядоченные имена членов.
///
/// Уникальность имён на проводе не гарантируется; дубликаты легальны и
/// сохраняются в исходном порядке.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    pub id: Id,
    pub name: String,
    pub member_names: Vec<String>,
}

impl ClassInfo {
    pub fn new(id: Id, name: impl Into<String>, member_names: &[&str]) -> Self {
        Self {
            id,
            name: name.into(),
            member_names: member_names.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn member_count(&self) -> usize {
        self.member_names.len()
    }

    pub fn decode<R: Read>(r: &mut PayloadReader<R>, limits: &ParseLimits) -> DecodeResult<Self> {
        let id = r.read_i32("object id")?;
        let name = r.read_string("class name", limits.max_string_bytes)?;

        let at = r.offset();
        let count = r.read_i32("member count")?;
        if count < 0 {
            return Err(DecodeError::RangeViolation {
                what: "member count",
                value: count as i64,
                offset: at,
            });
        }
        if count as u64 > limits.max_members as u64 {
            return Err(DecodeError::LimitExceeded {
                what: "member count",
                value: count as u64,
                limit: limits.max_members as u64,
                offset: at,
            });
        }

        let mut member_names = Vec::with_capacity(count as usize);
        for _ in 0..count {
            member_names.push(r.read_string("member name", limits.max_string_bytes)?);
        }

        Ok(Self {
            id,
            name,
            member_names,
        })
    }

    pub fn encode<W: Write>(&self, w: &mut PayloadWriter<W>) -> EncodeResult<()> {
        w.write_i32(self.id)?;
        w.write_string(&self.name)?;
        w.write_i32(self.member_names.len() as i32)?;
        for name in &self.member_names {
            w.write_string(name)?;
        }
        Ok(())
    }
}

/// Упорядоченные заявленные типы членов класса.
///
/// На проводе — два прохода: сначала все байты [`BinaryType`], затем все
/// дополнительные нагрузки в том же порядке.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberTypeInfo {
    pub types: Vec<DeclaredType>,
}

impl MemberTypeInfo {
    pub fn new(types: Vec<DeclaredType>) -> Self {
        Self { types }
    }

    pub fn decode<R: Read>(
        r: &mut PayloadReader<R>,
        count: usize,
        limits: &ParseLimits,
    ) -> DecodeResult<Self> {
        let mut raw = Vec::with_capacity(count);
        for _ in 0..count {
            raw.push(BinaryType::read(r)?);
        }

        let mut types = Vec::with_capacity(count);
        for btype in raw {
            types.push(DeclaredType::read_additional(r, btype, limits)?);
        }

        Ok(Self { types })
    }

    pub fn encode<W: Write>(&self, w: &mut PayloadWriter<W>) -> EncodeResult<()> {
        for t in &self.types {
            w.write_u8(u8::from(t.binary_type()))?;
        }
        for t in &self.types {
            t.write_additional(w)?;
        }
        Ok(())
    }
}

/// Идентификатор массива и его длина.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayInfo {
    pub id: Id,
    pub length: i32,
}

impl ArrayInfo {
    /// Читает пару (идентификатор, длина). Отрицательная длина — ошибка
    /// диапазона; никакой аллокации под элементы здесь не происходит.
    pub fn decode<R: Read>(r: &mut PayloadReader<R>) -> DecodeResult<Self> {
        let id = r.read_i32("object id")?;
        let at = r.offset();
        let length = r.read_i32("array length")?;
        if length < 0 {
            return Err(DecodeError::RangeViolation {
                what: "array length",
                value: length as i64,
                offset: at,
            });
        }
        Ok(Self { id, length })
    }

    pub fn encode<W: Write>(&self, w: &mut PayloadWriter<W>) -> EncodeResult<()> {
        w.write_i32(self.id)?;
        w.write_i32(self.length)
    }
}

/// Полное описание раскладки массива: ранг, длины и нижние границы
/// по измерениям.
///
/// Одномерные записи массивов нормализуются к рангу 1 без смещений, так что
/// дальше по конвейеру существует только одна форма.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryArrayInfo {
    pub id: Id,
    pub array_type: BinaryArrayType,
    pub lengths: Vec<i32>,
    pub offsets: Vec<i32>,
}

impl BinaryArrayInfo {
    pub fn single(info: ArrayInfo) -> Self {
        Self {
            id: info.id,
            array_type: BinaryArrayType::Single,
            lengths: vec![info.length],
            offsets: Vec::new(),
        }
    }

    pub fn rank(&self) -> usize {
        self.lengths.len()
    }

    /// Нижняя граница измерения `dim` (ноль, если смещений нет).
    pub fn lower_bound(&self, dim: usize) -> i32 {
        self.offsets.get(dim).copied().unwrap_or(0)
    }

    /// Логическое число элементов: произведение длин по измерениям.
    /// `None` при переполнении.
    pub fn total_len(&self) -> Option<u64> {
        self.lengths
            .iter()
            .try_fold(1u64, |acc, &len| acc.checked_mul(len as u64))
    }

    pub fn decode<R: Read>(r: &mut PayloadReader<R>) -> DecodeResult<Self> {
        let id = r.read_i32("object id")?;
        let array_type = BinaryArrayType::read(r)?;

        let at = r.offset();
        let rank = r.read_i32("array rank")?;
        if rank < 1 {
            return Err(DecodeError::RangeViolation {
                what: "array rank",
                value: rank as i64,
                offset: at,
            });
        }
        if rank > MAX_ARRAY_RANK {
            return Err(DecodeError::LimitExceeded {
                what: "array rank",
                value: rank as u64,
                limit: MAX_ARRAY_RANK as u64,
                offset: at,
            });
        }
        if rank != 1 && !array_type.is_multidimensional() {
            return Err(DecodeError::Malformed {
                what: "binary array",
                reason: format!("layout {array_type:?} requires rank 1, got {rank}"),
                offset: Some(at),
            });
        }

        let mut lengths = Vec::with_capacity(rank as usize);
        for _ in 0..rank {
            let at = r.offset();
            let len = r.read_i32("dimension length")?;
            if len < 0 {
                return Err(DecodeError::RangeViolation {
                    what: "dimension length",
                    value: len as i64,
                    offset: at,
                });
            }
            lengths.push(len);
        }

        let mut offsets = Vec::new();
        if array_type.has_offsets() {
            offsets.reserve(rank as usize);
            for dim in 0..rank as usize {
                let at = r.offset();
                let off = r.read_i32("dimension lower bound")?;
                // Верхняя граница измерения обязана помещаться в i32.
                if off.checked_add(lengths[dim]).is_none() {
                    return Err(DecodeError::RangeViolation {
                        what: "dimension upper bound",
                        value: off as i64 + lengths[dim] as i64,
                        offset: at,
                    });
                }
                offsets.push(off);
            }
        }

        Ok(Self {
            id,
            array_type,
            lengths,
            offsets,
        })
    }

    pub fn encode<W: Write>(&self, w: &mut PayloadWriter<W>) -> EncodeResult<()> {
        w.write_i32(self.id)?;
        w.write_u8(u8::from(self.array_type))?;
        w.write_i32(self.lengths.len() as i32)?;
        for &len in &self.lengths {
            w.write_i32(len)?;
        }
        if self.array_type.has_offsets() {
            for &off in &self.offsets {
                w.write_i32(off)?;
            }
        }
        Ok(())
    }
}
