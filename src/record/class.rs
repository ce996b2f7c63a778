//! Классовые записи: пять проволочных форм, нормализованных к одной.

use crate::record::{
    schema::{ClassInfo, MemberTypeInfo},
    tags::RecordType,
    Id, Slot,
};

/// Классовая запись с разобранными значениями членов.
///
/// Форма на проводе (с типами или без, с библиотекой или без, с
/// переиспользованной схемой) сохраняется в `record_type`; всё остальное
/// нормализовано: у `ClassWithId` здесь уже лежит копия схемы записи, на
/// которую ссылался её metadata id.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassRecord {
    pub record_type: RecordType,
    pub class_info: ClassInfo,
    pub member_types: Option<MemberTypeInfo>,
    pub library_id: Option<Id>,
    pub metadata_id: Option<Id>,
    pub members: Vec<Slot>,
}

impl ClassRecord {
    pub fn id(&self) -> Id {
        self.class_info.id
    }

    pub fn name(&self) -> &str {
        &self.class_info.name
    }

    /// Системный ли это тип (без ссылки на внешнюю библиотеку).
    pub fn is_system(&self) -> bool {
        self.library_id.is_none()
    }

    /// Значение первого члена с данным именем.
    pub fn member(&self, name: &str) -> Option<&Slot> {
        self.class_info
            .member_names
            .iter()
            .position(|n| n == name)
            .and_then(|i| self.members.get(i))
    }

    /// Имена членов ровно в заявленном порядке.
    pub fn member_names(&self) -> &[String] {
        &self.class_info.member_names
    }
}
