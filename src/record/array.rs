//! Семейство массивов: одномерные примитивные/строковые/объектные и
//! прямоугольные, в том числе с ненулевыми нижними границами.
//!
//! Серии null существуют только на проводе. При чтении они разворачиваются
//! в отдельные логические ячейки, при записи — сворачиваются обратно в
//! кратчайшую из трёх форм.

use std::io::Write;

use crate::{
    error::{DecodeError, DecodeResult, EncodeResult},
    io::PayloadWriter,
    record::{
        schema::{BinaryArrayInfo, DeclaredType},
        tags::RecordType,
        Id, Record, RecordMap, Slot,
    },
    value::PrimitiveArray,
};

/// Хранилище элементов массива.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayElements {
    /// Плотное типизированное хранилище для массивов примитивов.
    Primitives(PrimitiveArray),
    /// Логические ячейки объектных/строковых массивов, с уже
    /// развёрнутыми null.
    Slots(Vec<Slot>),
}

impl ArrayElements {
    pub fn len(&self) -> usize {
        match self {
            Self::Primitives(p) => p.len(),
            Self::Slots(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Запись массива с разобранными элементами в row-major порядке.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayRecord {
    pub record_type: RecordType,
    pub info: BinaryArrayInfo,
    pub element_type: DeclaredType,
    pub elements: ArrayElements,
}

impl ArrayRecord {
    pub fn id(&self) -> Id {
        self.info.id
    }

    /// Логическое число элементов.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Одномерный ли это массив с нулевой нижней границей.
    pub fn is_flat(&self) -> bool {
        self.info.rank() == 1 && self.info.lower_bound(0) == 0
    }

    pub fn primitives(&self) -> Option<&PrimitiveArray> {
        match &self.elements {
            ArrayElements::Primitives(p) => Some(p),
            ArrayElements::Slots(_) => None,
        }
    }

    pub fn slots(&self) -> Option<&[Slot]> {
        match &self.elements {
            ArrayElements::Slots(s) => Some(s),
            ArrayElements::Primitives(_) => None,
        }
    }

    /// Обход координат в row-major порядке.
    pub fn coordinates(&self) -> RectIndexWalker {
        RectIndexWalker::new(&self.info)
    }

    /// Позиция координат в плоском хранилище, с учётом нижних границ.
    /// `None`, если хоть одна координата вне своего измерения.
    pub fn flat_index(&self, coords: &[i32]) -> Option<usize> {
        if coords.len() != self.info.rank() {
            return None;
        }
        let mut index: usize = 0;
        for (dim, &coord) in coords.iter().enumerate() {
            let lower = self.info.lower_bound(dim);
            let len = self.info.lengths[dim];
            let rel = coord.checked_sub(lower)?;
            if rel < 0 || rel >= len {
                return None;
            }
            index = index.checked_mul(len as usize)?.checked_add(rel as usize)?;
        }
        Some(index)
    }

    /// Строгая материализация строкового массива: каждая ячейка — либо
    /// null, либо строка (напрямую или по ссылке на строковую запись).
    /// Ссылка на запись другого рода — ошибка несоответствия форм.
    pub fn materialize_strings(&self, map: &RecordMap) -> DecodeResult<Vec<Option<String>>> {
        let slots = match &self.elements {
            ArrayElements::Slots(s) => s,
            ArrayElements::Primitives(_) => {
                return Err(DecodeError::Malformed {
                    what: "string array",
                    reason: "array stores raw primitives".to_string(),
                    offset: None,
                })
            }
        };

        let declared = self.info.total_len().unwrap_or(u64::MAX);
        if slots.len() as u64 != declared {
            return Err(DecodeError::CountMismatch {
                what: "string array elements",
                declared,
                actual: slots.len() as u64,
            });
        }

        let mut out = Vec::with_capacity(slots.len());
        for slot in slots {
            match slot {
                Slot::Null => out.push(None),
                Slot::Ref(id) => match map.get(*id)? {
                    Record::String(s) => out.push(Some(s.value.clone())),
                    other => {
                        return Err(DecodeError::WrongReferencedKind {
                            id: *id,
                            expected: "string",
                            found: other.kind_name(),
                        })
                    }
                },
                Slot::Primitive(_) => {
                    return Err(DecodeError::Malformed {
                        what: "string array",
                        reason: "inline primitive in string element slot".to_string(),
                        offset: None,
                    })
                }
            }
        }
        Ok(out)
    }
}

/// Явный обходчик индексов прямоугольного массива.
///
/// Инкрементирует последнее измерение; при переполнении измерение
/// сбрасывается к своей нижней границе, а перенос уходит в предыдущее.
pub struct RectIndexWalker {
    lengths: Vec<i32>,
    lower: Vec<i32>,
    current: Vec<i32>,
    exhausted: bool,
}

impl RectIndexWalker {
    pub fn new(info: &BinaryArrayInfo) -> Self {
        let rank = info.rank();
        let lower: Vec<i32> = (0..rank).map(|d| info.lower_bound(d)).collect();
        let exhausted = info.lengths.iter().any(|&l| l == 0);
        Self {
            lengths: info.lengths.clone(),
            current: lower.clone(),
            lower,
            exhausted,
        }
    }
}

impl Iterator for RectIndexWalker {
    type Item = Vec<i32>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let item = self.current.clone();

        // Перенос из последнего измерения в первое.
        let mut dim = self.lengths.len();
        loop {
            if dim == 0 {
                self.exhausted = true;
                break;
            }
            dim -= 1;
            self.current[dim] += 1;
            if self.current[dim] - self.lower[dim] < self.lengths[dim] {
                break;
            }
            self.current[dim] = self.lower[dim];
        }

        Some(item)
    }
}

/// Пишет серию из `count` null-ячеек кратчайшей записью: одиночный null,
/// короткая форма со счётчиком-байтом или длинная с 32-битным счётчиком.
pub fn encode_null_run<W: Write>(w: &mut PayloadWriter<W>, count: u32) -> EncodeResult<()> {
    match count {
        0 => Ok(()),
        1 => w.write_u8(u8::from(RecordType::ObjectNull)),
        2..=255 => {
            w.write_u8(u8::from(RecordType::ObjectNullMultiple256))?;
            w.write_u8(count as u8)
        }
        _ => {
            w.write_u8(u8::from(RecordType::ObjectNullMultiple))?;
            w.write_i32(count as i32)
        }
    }
}
