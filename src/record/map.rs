//! Арена записей: реестр идентификатор → запись, только на добавление.

use std::collections::HashMap;

use crate::{
    error::{DecodeError, DecodeResult},
    record::{Id, Record},
};

/// Владеет каждой записью графа по её идентификатору.
///
/// Вставка только добавляет: повторный положительный идентификатор — ошибка,
/// повторный отрицательный (корневой маркер) молча игнорируется. Поиск
/// отдаёт заимствование, владение из арены не уходит никогда.
#[derive(Debug, Default)]
pub struct RecordMap {
    records: HashMap<Id, Record>,
    order: Vec<Id>,
}

impl RecordMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Регистрирует запись под её идентификатором.
    ///
    /// Идентификатор 0 («нет идентификатора») не регистрируется вовсе.
    pub fn insert(&mut self, record: Record) -> DecodeResult<()> {
        let id = record.id();
        if id == 0 {
            return Ok(());
        }
        if self.records.contains_key(&id) {
            if id < 0 {
                return Ok(());
            }
            return Err(DecodeError::DuplicateId { id, offset: None });
        }
        self.records.insert(id, record);
        self.order.push(id);
        Ok(())
    }

    /// Запись по идентификатору; отсутствие — ошибка неразрешённой ссылки.
    pub fn get(&self, id: Id) -> DecodeResult<&Record> {
        self.records
            .get(&id)
            .ok_or(DecodeError::UnresolvedReference { id })
    }

    pub fn contains(&self, id: Id) -> bool {
        self.records.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Обход записей в порядке регистрации.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }
}

/// Разобранный граф: идентификатор корня плюс арена записей.
///
/// Строится за один проход разбора и после этого не меняется.
#[derive(Debug)]
pub struct Graph {
    root_id: Id,
    map: RecordMap,
}

impl Graph {
    pub(crate) fn new(root_id: Id, map: RecordMap) -> Self {
        Self { root_id, map }
    }

    pub fn root_id(&self) -> Id {
        self.root_id
    }

    pub fn map(&self) -> &RecordMap {
        &self.map
    }

    pub fn get(&self, id: Id) -> DecodeResult<&Record> {
        self.map.get(id)
    }

    /// Корневая запись графа.
    pub fn root(&self) -> DecodeResult<&Record> {
        self.map.get(self.root_id)
    }
}
