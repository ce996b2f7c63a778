//! Модель записей проволочного формата.
//!
//! Запись — это самоописывающая помеченная единица потока. После разбора
//! каждая запись, несущая идентификатор, живёт в арене [`RecordMap`], а все
//! связи между записями — это поиски по идентификатору, никогда не прямое
//! владение. Ячейки значений ([`Slot`]) хранят либо примитив, либо null,
//! либо идентификатор записи.

pub mod array;
pub mod class;
pub mod map;
pub mod primitive;
pub mod schema;
pub mod tags;

pub use array::{ArrayElements, ArrayRecord, RectIndexWalker};
pub use class::ClassRecord;
pub use map::{Graph, RecordMap};
pub use primitive::{DateTime, Primitive, TimeSpan};
pub use schema::{
    ArrayInfo, BinaryArrayInfo, ClassInfo, ClassTypeInfo, DeclaredType, MemberTypeInfo,
};
pub use tags::{BinaryArrayType, BinaryType, PrimitiveType, RecordType};

/// Идентификатор записи. Ноль — «без идентификатора»; отрицательные
/// значения зарезервированы под корневые маркеры и могут повторяться;
/// положительные уникальны в пределах графа.
pub type Id = i32;

/// Строковая запись (BinaryObjectString).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringRecord {
    pub id: Id,
    pub value: String,
}

/// Запись внешней библиотеки (BinaryLibrary).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryRecord {
    pub id: Id,
    pub name: String,
}

/// Логическая ячейка значения: член класса или элемент массива.
///
/// Серии null на проводе уже развёрнуты — потребитель видит только
/// одиночные [`Slot::Null`].
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// Примитив, закодированный по месту (без собственной записи в арене).
    Primitive(Primitive),
    /// Явный null.
    Null,
    /// Идентификатор записи в арене: вложенная запись или обратная ссылка.
    Ref(Id),
}

/// Одна разобранная запись, владеющая своими данными.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Class(ClassRecord),
    Array(ArrayRecord),
    String(StringRecord),
    Library(LibraryRecord),
}

impl Record {
    pub fn id(&self) -> Id {
        match self {
            Self::Class(c) => c.id(),
            Self::Array(a) => a.id(),
            Self::String(s) => s.id,
            Self::Library(l) => l.id,
        }
    }

    pub fn record_type(&self) -> RecordType {
        match self {
            Self::Class(c) => c.record_type,
            Self::Array(a) => a.record_type,
            Self::String(_) => RecordType::BinaryObjectString,
            Self::Library(_) => RecordType::BinaryLibrary,
        }
    }

    /// Короткое имя рода записи для диагностики.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Class(_) => "class",
            Self::Array(_) => "array",
            Self::String(_) => "string",
            Self::Library(_) => "library",
        }
    }
}
