//! Битовая маска «какие записи допустимы следующими».
//!
//! Это центральная защита разбора: перед чтением каждой записи её тег
//! сверяется с маской активного контекста, и запись, которую схема не
//! предсказывала, не конструируется вовсе.

use bitflags::bitflags;

use crate::record::tags::RecordType;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AllowedRecords: u32 {
        const SERIALIZED_STREAM_HEADER = 1 << 0;
        const CLASS_WITH_ID = 1 << 1;
        const SYSTEM_CLASS_WITH_MEMBERS = 1 << 2;
        const CLASS_WITH_MEMBERS = 1 << 3;
        const SYSTEM_CLASS_WITH_MEMBERS_AND_TYPES = 1 << 4;
        const CLASS_WITH_MEMBERS_AND_TYPES = 1 << 5;
        const BINARY_OBJECT_STRING = 1 << 6;
        const BINARY_ARRAY = 1 << 7;
        const MEMBER_PRIMITIVE_TYPED = 1 << 8;
        const MEMBER_REFERENCE = 1 << 9;
        const OBJECT_NULL = 1 << 10;
        const MESSAGE_END = 1 << 11;
        const BINARY_LIBRARY = 1 << 12;
        const OBJECT_NULL_MULTIPLE_256 = 1 << 13;
        const OBJECT_NULL_MULTIPLE = 1 << 14;
        const ARRAY_SINGLE_PRIMITIVE = 1 << 15;
        const ARRAY_SINGLE_OBJECT = 1 << 16;
        const ARRAY_SINGLE_STRING = 1 << 17;

        /// Все три записи null.
        const NULLS = Self::OBJECT_NULL.bits()
            | Self::OBJECT_NULL_MULTIPLE_256.bits()
            | Self::OBJECT_NULL_MULTIPLE.bits();

        /// Все пять классовых форм.
        const CLASSES = Self::CLASS_WITH_ID.bits()
            | Self::SYSTEM_CLASS_WITH_MEMBERS.bits()
            | Self::CLASS_WITH_MEMBERS.bits()
            | Self::SYSTEM_CLASS_WITH_MEMBERS_AND_TYPES.bits()
            | Self::CLASS_WITH_MEMBERS_AND_TYPES.bits();

        /// Все четыре формы массивов.
        const ARRAYS = Self::BINARY_ARRAY.bits()
            | Self::ARRAY_SINGLE_PRIMITIVE.bits()
            | Self::ARRAY_SINGLE_OBJECT.bits()
            | Self::ARRAY_SINGLE_STRING.bits();

        /// Строковый контекст: строка, обратная ссылка или null.
        const STRINGISH = Self::BINARY_OBJECT_STRING.bits()
            | Self::MEMBER_REFERENCE.bits()
            | Self::NULLS.bits();

        /// Любая запись, производящая значение.
        const ANY_VALUE = Self::CLASSES.bits()
            | Self::ARRAYS.bits()
            | Self::BINARY_OBJECT_STRING.bits()
            | Self::MEMBER_PRIMITIVE_TYPED.bits()
            | Self::MEMBER_REFERENCE.bits()
            | Self::NULLS.bits();

        /// Верхний уровень потока после заголовка.
        const TOP_LEVEL = Self::ANY_VALUE.bits()
            | Self::BINARY_LIBRARY.bits()
            | Self::MESSAGE_END.bits();
    }
}

impl AllowedRecords {
    /// Флаг, соответствующий типу записи.
    pub fn of(tag: RecordType) -> Self {
        Self::from_bits_truncate(1u32 << (u8::from(tag) as u32))
    }

    /// Допустим ли тег в этом контексте.
    pub fn allows(self, tag: RecordType) -> bool {
        self.contains(Self::of(tag))
    }
}
