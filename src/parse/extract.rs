//! Извлечение типизированного значения из разобранного графа.
//!
//! Узнаются только формы из белого списка; всё остальное — это `None`,
//! и вызывающая сторона остаётся с графом записей. Обёртки системных
//! типов узнаются по точному совпадению имени типа и имён членов.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::{
    record::{
        ArrayElements, ArrayRecord, ClassRecord, DateTime, DeclaredType, Graph, Primitive,
        Record, Slot, TimeSpan,
    },
    record::tags::PrimitiveType,
    value::Value,
};

/// Имя члена обёртки примитива.
pub(crate) const PRIMITIVE_WRAPPER_MEMBERS: [&str; 1] = ["m_value"];
pub(crate) const DATE_TIME_MEMBERS: [&str; 2] = ["ticks", "dateData"];
pub(crate) const TIME_SPAN_MEMBERS: [&str; 1] = ["_ticks"];
pub(crate) const DECIMAL_MEMBERS: [&str; 4] = ["flags", "hi", "lo", "mid"];
pub(crate) const LIST_MEMBERS: [&str; 3] = ["_items", "_size", "_version"];
pub(crate) const HASHTABLE_MEMBERS: [&str; 7] = [
    "LoadFactor",
    "Version",
    "Comparer",
    "HashCodeProvider",
    "HashSize",
    "Keys",
    "Values",
];

pub(crate) const DATE_TIME_TYPE: &str = "System.DateTime";
pub(crate) const TIME_SPAN_TYPE: &str = "System.TimeSpan";
pub(crate) const DECIMAL_TYPE: &str = "System.Decimal";
pub(crate) const ARRAY_LIST_TYPE: &str = "System.Collections.ArrayList";
pub(crate) const HASHTABLE_TYPE: &str = "System.Collections.Hashtable";
pub(crate) const GENERIC_LIST_PREFIX: &str = "System.Collections.Generic.List`1[[";

/// Извлекает значение из белого списка форм, если корень графа ему
/// соответствует.
pub fn extract_value(graph: &Graph) -> Option<Value> {
    match graph.root().ok()? {
        Record::String(s) => Some(Value::String(s.value.clone())),
        Record::Array(a) => extract_array(a, graph),
        Record::Class(c) if c.is_system() => extract_class(c, graph),
        _ => None,
    }
}

fn extract_array(a: &ArrayRecord, graph: &Graph) -> Option<Value> {
    if !a.is_flat() {
        return None;
    }
    match (&a.element_type, &a.elements) {
        (DeclaredType::Primitive(_), ArrayElements::Primitives(p)) => {
            Some(Value::PrimitiveArray(p.clone()))
        }
        (DeclaredType::String, _) => a
            .materialize_strings(graph.map())
            .ok()
            .map(Value::StringArray),
        _ => None,
    }
}

fn extract_class(c: &ClassRecord, graph: &Graph) -> Option<Value> {
    if let Some(v) = boxed_primitive(c) {
        return Some(v);
    }
    match c.name() {
        DATE_TIME_TYPE => date_time(c),
        TIME_SPAN_TYPE => time_span(c),
        DECIMAL_TYPE => decimal(c),
        ARRAY_LIST_TYPE => array_list(c, graph),
        HASHTABLE_TYPE => hashtable(c, graph),
        name if name.starts_with(GENERIC_LIST_PREFIX) => generic_list(c, graph),
        _ => None,
    }
}

fn member_names_match(c: &ClassRecord, expected: &[&str]) -> bool {
    c.member_names().len() == expected.len()
        && c.member_names().iter().zip(expected).all(|(a, b)| a == b)
}

fn member_primitive<'a>(c: &'a ClassRecord, name: &str) -> Option<&'a Primitive> {
    match c.member(name)? {
        Slot::Primitive(p) => Some(p),
        _ => None,
    }
}

fn member_i32(c: &ClassRecord, name: &str) -> Option<i32> {
    match member_primitive(c, name)? {
        Primitive::Int32(v) => Some(*v),
        _ => None,
    }
}

/// Обёртка примитива: один член `m_value`, имя типа — системное имя
/// примитива, род значения совпадает с именем.
fn boxed_primitive(c: &ClassRecord) -> Option<Value> {
    if !member_names_match(c, &PRIMITIVE_WRAPPER_MEMBERS) {
        return None;
    }
    let kind = PrimitiveType::from_system_type_name(c.name())?;
    let value = member_primitive(c, "m_value")?;
    if value.kind() != kind {
        return None;
    }
    Some(Value::from(value.clone()))
}

fn date_time(c: &ClassRecord) -> Option<Value> {
    if !member_names_match(c, &DATE_TIME_MEMBERS) {
        return None;
    }
    match member_primitive(c, "dateData")? {
        Primitive::UInt64(raw) => Some(Value::DateTime(DateTime(*raw))),
        _ => None,
    }
}

fn time_span(c: &ClassRecord) -> Option<Value> {
    if !member_names_match(c, &TIME_SPAN_MEMBERS) {
        return None;
    }
    match member_primitive(c, "_ticks")? {
        Primitive::Int64(ticks) => Some(Value::TimeSpan(TimeSpan(*ticks))),
        _ => None,
    }
}

/// Decimal в развёрнутом виде: знак и масштаб в `flags`, 96-битная
/// мантисса в `hi`/`mid`/`lo`.
fn decimal(c: &ClassRecord) -> Option<Value> {
    if !member_names_match(c, &DECIMAL_MEMBERS) {
        return None;
    }
    let flags = member_i32(c, "flags")?;
    let hi = member_i32(c, "hi")?;
    let lo = member_i32(c, "lo")?;
    let mid = member_i32(c, "mid")?;

    let scale = ((flags >> 16) & 0xFF) as u32;
    if scale > 28 {
        return None;
    }
    let negative = flags < 0;
    Some(Value::Decimal(Decimal::from_parts(
        lo as u32, mid as u32, hi as u32, negative, scale,
    )))
}

fn backing_array<'a>(c: &'a ClassRecord, graph: &'a Graph) -> Option<&'a ArrayRecord> {
    match c.member("_items")? {
        Slot::Ref(id) => match graph.get(*id).ok()? {
            Record::Array(a) if a.is_flat() => Some(a),
            _ => None,
        },
        _ => None,
    }
}

fn generic_list(c: &ClassRecord, graph: &Graph) -> Option<Value> {
    if !member_names_match(c, &LIST_MEMBERS) {
        return None;
    }
    let size = member_i32(c, "_size")?;
    if size < 0 {
        return None;
    }
    let size = size as usize;
    let array = backing_array(c, graph)?;
    if size > array.len() {
        return None;
    }

    match &array.element_type {
        DeclaredType::Primitive(_) => {
            let mut items = array.primitives()?.clone();
            items.truncate(size);
            Some(Value::PrimitiveList(items))
        }
        DeclaredType::String => {
            let mut items = array.materialize_strings(graph.map()).ok()?;
            items.truncate(size);
            Some(Value::StringList(items))
        }
        _ => None,
    }
}

fn array_list(c: &ClassRecord, graph: &Graph) -> Option<Value> {
    if !member_names_match(c, &LIST_MEMBERS) {
        return None;
    }
    let size = member_i32(c, "_size")?;
    if size < 0 {
        return None;
    }
    let size = size as usize;
    let array = backing_array(c, graph)?;
    let slots = array.slots()?;
    if size > slots.len() {
        return None;
    }

    let mut items = Vec::with_capacity(size);
    for slot in &slots[..size] {
        items.push(slot_value(slot, graph)?);
    }
    Some(Value::List(items))
}

fn hashtable(c: &ClassRecord, graph: &Graph) -> Option<Value> {
    if !member_names_match(c, &HASHTABLE_MEMBERS) {
        return None;
    }
    let keys = match c.member("Keys")? {
        Slot::Ref(id) => match graph.get(*id).ok()? {
            Record::Array(a) => a.slots()?,
            _ => return None,
        },
        _ => return None,
    };
    let values = match c.member("Values")? {
        Slot::Ref(id) => match graph.get(*id).ok()? {
            Record::Array(a) => a.slots()?,
            _ => return None,
        },
        _ => return None,
    };
    if keys.len() != values.len() {
        return None;
    }

    let mut map = BTreeMap::new();
    for (key, value) in keys.iter().zip(values) {
        let key = slot_string(key, graph)??;
        let value = slot_string(value, graph)?;
        map.insert(key, value);
    }
    Some(Value::StringMap(map))
}

/// Ячейка как строка: `Some(None)` — null, `Some(Some(..))` — строка,
/// `None` — не строковая ячейка.
fn slot_string(slot: &Slot, graph: &Graph) -> Option<Option<String>> {
    match slot {
        Slot::Null => Some(None),
        Slot::Ref(id) => match graph.get(*id).ok()? {
            Record::String(s) => Some(Some(s.value.clone())),
            _ => None,
        },
        Slot::Primitive(_) => None,
    }
}

/// Ячейка нетипизированного списка: примитив, строка или null.
fn slot_value(slot: &Slot, graph: &Graph) -> Option<Value> {
    match slot {
        Slot::Null => Some(Value::Null),
        Slot::Primitive(p) => Some(Value::from(p.clone())),
        Slot::Ref(id) => match graph.get(*id).ok()? {
            Record::String(s) => Some(Value::String(s.value.clone())),
            _ => None,
        },
    }
}
