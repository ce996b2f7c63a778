//! Запись значений белого списка в бинарный поток.
//!
//! Каждая функция пишет целый поток: заголовок, записи, маркер конца.
//! Формы коллекций повторяют исторические раскладки (List`1, ArrayList,
//! Hashtable), чтобы байты понимали существующие потребители формата.

use std::collections::BTreeMap;
use std::io::Write;

use tracing::debug;

use crate::{
    error::{EncodeError, EncodeResult},
    io::PayloadWriter,
    parse::driver::{WIRE_MAJOR_VERSION, WIRE_MINOR_VERSION},
    parse::extract::{
        ARRAY_LIST_TYPE, DATE_TIME_MEMBERS, DATE_TIME_TYPE, DECIMAL_MEMBERS, DECIMAL_TYPE,
        GENERIC_LIST_PREFIX, HASHTABLE_MEMBERS, HASHTABLE_TYPE, LIST_MEMBERS,
        PRIMITIVE_WRAPPER_MEMBERS, TIME_SPAN_MEMBERS, TIME_SPAN_TYPE,
    },
    record::{
        array::encode_null_run,
        schema::{ArrayInfo, ClassInfo, DeclaredType, MemberTypeInfo},
        tags::{PrimitiveType, RecordType},
        DateTime, Id, Primitive, TimeSpan,
    },
    value::{PrimitiveArray, Value},
    write::intern::{Interned, StringRegistry},
};

/// Полное имя сборки для параметров generic-списков.
const MSCORLIB: &str = "mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089";

const COMPARER_TYPE: &str = "System.Collections.IComparer";
const HASH_CODE_PROVIDER_TYPE: &str = "System.Collections.IHashCodeProvider";

/// Размеры корзин исторической хеш-таблицы.
const HASH_PRIMES: [i32; 71] = [
    3, 7, 11, 17, 23, 29, 37, 47, 59, 71, 89, 107, 131, 163, 197, 239, 293, 353, 431, 521, 631,
    761, 919, 1103, 1327, 1597, 1931, 2333, 2801, 3371, 4049, 4861, 5839, 7013, 8419, 10103,
    12143, 14591, 17519, 21023, 25229, 30293, 36353, 43627, 52361, 62851, 75431, 90523, 108631,
    130363, 156437, 187751, 225307, 270371, 324449, 389357, 467237, 560689, 672827, 807403,
    968897, 1162687, 1395263, 1674319, 2009191, 2411033, 2893249, 3471899, 4166287, 4999559,
    5999471,
];

/// Элемент объектного/строкового массива на записи.
enum WireElement<'a> {
    Str(&'a str),
    Prim(Primitive),
    Null,
}

fn write_tag<W: Write>(w: &mut PayloadWriter<W>, tag: RecordType) -> EncodeResult<()> {
    w.write_u8(u8::from(tag))
}

/// Заголовок потока. Корневая запись всегда получает идентификатор 1.
fn write_header<W: Write>(w: &mut PayloadWriter<W>) -> EncodeResult<()> {
    write_tag(w, RecordType::SerializedStreamHeader)?;
    w.write_i32(1)?;
    w.write_i32(-1)?;
    w.write_i32(WIRE_MAJOR_VERSION)?;
    w.write_i32(WIRE_MINOR_VERSION)
}

fn write_end<W: Write>(w: &mut PayloadWriter<W>) -> EncodeResult<()> {
    write_tag(w, RecordType::MessageEnd)
}

/// Системная классовая запись: тег, ClassInfo, MemberTypeInfo.
/// Значения членов пишет вызывающая сторона.
fn write_system_class<W: Write>(
    w: &mut PayloadWriter<W>,
    id: Id,
    name: &str,
    member_names: &[&str],
    types: Vec<DeclaredType>,
) -> EncodeResult<()> {
    write_tag(w, RecordType::SystemClassWithMembersAndTypes)?;
    ClassInfo::new(id, name, member_names).encode(w)?;
    MemberTypeInfo::new(types).encode(w)
}

fn write_interned_string<W: Write>(
    w: &mut PayloadWriter<W>,
    value: &str,
    strings: &mut StringRegistry,
) -> EncodeResult<()> {
    match strings.intern(value) {
        Interned::New(id) => {
            write_tag(w, RecordType::BinaryObjectString)?;
            w.write_i32(id)?;
            w.write_string(value)
        }
        Interned::Seen(id) => {
            write_tag(w, RecordType::MemberReference)?;
            w.write_i32(id)
        }
    }
}

/// Пишет последовательность элементов объектного массива, сворачивая
/// соседние null в серии.
fn write_element_records<'a, W, I>(
    w: &mut PayloadWriter<W>,
    elements: I,
    strings: &mut StringRegistry,
) -> EncodeResult<()>
where
    W: Write,
    I: Iterator<Item = WireElement<'a>>,
{
    let mut pending_nulls: u32 = 0;
    for element in elements {
        match element {
            WireElement::Null => pending_nulls += 1,
            WireElement::Str(s) => {
                encode_null_run(w, pending_nulls)?;
                pending_nulls = 0;
                write_interned_string(w, s, strings)?;
            }
            WireElement::Prim(p) => {
                encode_null_run(w, pending_nulls)?;
                pending_nulls = 0;
                write_tag(w, RecordType::MemberPrimitiveTyped)?;
                w.write_u8(u8::from(p.kind()))?;
                p.write(w)?;
            }
        }
    }
    encode_null_run(w, pending_nulls)
}

fn check_len(what: &'static str, len: usize) -> EncodeResult<i32> {
    i32::try_from(len).map_err(|_| EncodeError::TooLong {
        what,
        len: len as u64,
        max: i32::MAX as u64,
    })
}

/// Пишет одиночную строку.
pub fn write_string<W: Write>(sink: W, value: &str) -> EncodeResult<()> {
    let mut w = PayloadWriter::new(sink);
    write_header(&mut w)?;
    write_tag(&mut w, RecordType::BinaryObjectString)?;
    w.write_i32(1)?;
    w.write_string(value)?;
    write_end(&mut w)
}

/// Пишет decimal развёрнутой раскладкой flags/hi/lo/mid.
pub fn write_decimal<W: Write>(sink: W, value: rust_decimal::Decimal) -> EncodeResult<()> {
    let mantissa = value.mantissa().unsigned_abs();
    let lo = (mantissa & 0xFFFF_FFFF) as i32;
    let mid = ((mantissa >> 32) & 0xFFFF_FFFF) as i32;
    let hi = ((mantissa >> 64) & 0xFFFF_FFFF) as i32;
    let mut flags = (value.scale() as i32) << 16;
    if value.is_sign_negative() {
        flags |= i32::MIN;
    }

    let mut w = PayloadWriter::new(sink);
    write_header(&mut w)?;
    write_system_class(
        &mut w,
        1,
        DECIMAL_TYPE,
        &DECIMAL_MEMBERS,
        vec![DeclaredType::Primitive(PrimitiveType::Int32); 4],
    )?;
    w.write_i32(flags)?;
    w.write_i32(hi)?;
    w.write_i32(lo)?;
    w.write_i32(mid)?;
    write_end(&mut w)
}

/// Пишет момент времени: тики и сырое поле с битами kind.
pub fn write_date_time<W: Write>(sink: W, value: DateTime) -> EncodeResult<()> {
    let mut w = PayloadWriter::new(sink);
    write_header(&mut w)?;
    write_system_class(
        &mut w,
        1,
        DATE_TIME_TYPE,
        &DATE_TIME_MEMBERS,
        vec![
            DeclaredType::Primitive(PrimitiveType::Int64),
            DeclaredType::Primitive(PrimitiveType::UInt64),
        ],
    )?;
    w.write_i64(value.ticks())?;
    w.write_u64(value.0)?;
    write_end(&mut w)
}

/// Пишет интервал времени.
pub fn write_time_span<W: Write>(sink: W, value: TimeSpan) -> EncodeResult<()> {
    let mut w = PayloadWriter::new(sink);
    write_header(&mut w)?;
    write_system_class(
        &mut w,
        1,
        TIME_SPAN_TYPE,
        &TIME_SPAN_MEMBERS,
        vec![DeclaredType::Primitive(PrimitiveType::Int64)],
    )?;
    w.write_i64(value.0)?;
    write_end(&mut w)
}

/// Пишет примитив обёрткой с единственным членом `m_value`.
///
/// Decimal, DateTime и TimeSpan в одиночном виде имеют собственные
/// раскладки и уходят в свои функции.
pub fn write_primitive<W: Write>(sink: W, value: &Primitive) -> EncodeResult<()> {
    match value {
        Primitive::Decimal(d) => write_decimal(sink, *d),
        Primitive::DateTime(dt) => write_date_time(sink, *dt),
        Primitive::TimeSpan(ts) => write_time_span(sink, *ts),
        other => {
            let mut w = PayloadWriter::new(sink);
            write_header(&mut w)?;
            write_system_class(
                &mut w,
                1,
                other.kind().system_type_name(),
                &PRIMITIVE_WRAPPER_MEMBERS,
                vec![DeclaredType::Primitive(other.kind())],
            )?;
            other.write(&mut w)?;
            write_end(&mut w)
        }
    }
}

/// Пишет массив одного примитивного типа.
pub fn write_primitive_array<W: Write>(sink: W, items: &PrimitiveArray) -> EncodeResult<()> {
    let length = check_len("primitive array", items.len())?;
    let mut w = PayloadWriter::new(sink);
    write_header(&mut w)?;
    write_tag(&mut w, RecordType::ArraySinglePrimitive)?;
    ArrayInfo { id: 1, length }.encode(&mut w)?;
    w.write_u8(u8::from(items.kind()))?;
    items.write(&mut w)?;
    write_end(&mut w)
}

/// Пишет массив строк; равные строки интернируются, null сворачиваются
/// в серии.
pub fn write_string_array<W: Write>(sink: W, items: &[Option<String>]) -> EncodeResult<()> {
    let length = check_len("string array", items.len())?;
    let mut w = PayloadWriter::new(sink);
    write_header(&mut w)?;
    write_tag(&mut w, RecordType::ArraySingleString)?;
    ArrayInfo { id: 1, length }.encode(&mut w)?;

    let mut strings = StringRegistry::new(2);
    write_element_records(
        &mut w,
        items.iter().map(|item| match item {
            Some(s) => WireElement::Str(s.as_str()),
            None => WireElement::Null,
        }),
        &mut strings,
    )?;
    write_end(&mut w)
}

fn generic_list_name(element: &str) -> String {
    format!("{GENERIC_LIST_PREFIX}{element}, {MSCORLIB}]]")
}

/// Пишет упорядоченный список одного примитивного типа раскладкой List`1:
/// классовая запись со ссылкой на резервный массив.
pub fn write_primitive_list<W: Write>(sink: W, items: &PrimitiveArray) -> EncodeResult<()> {
    let length = check_len("primitive list", items.len())?;
    let mut w = PayloadWriter::new(sink);
    write_header(&mut w)?;
    write_system_class(
        &mut w,
        1,
        &generic_list_name(items.kind().system_type_name()),
        &LIST_MEMBERS,
        vec![
            DeclaredType::PrimitiveArray(items.kind()),
            DeclaredType::Primitive(PrimitiveType::Int32),
            DeclaredType::Primitive(PrimitiveType::Int32),
        ],
    )?;
    write_tag(&mut w, RecordType::MemberReference)?;
    w.write_i32(2)?;
    w.write_i32(length)?;
    // _version значения не имеет
    w.write_i32(0)?;

    write_tag(&mut w, RecordType::ArraySinglePrimitive)?;
    ArrayInfo { id: 2, length }.encode(&mut w)?;
    w.write_u8(u8::from(items.kind()))?;
    items.write(&mut w)?;
    write_end(&mut w)
}

/// Пишет упорядоченный список строк раскладкой List`1.
pub fn write_string_list<W: Write>(sink: W, items: &[Option<String>]) -> EncodeResult<()> {
    let length = check_len("string list", items.len())?;
    let mut w = PayloadWriter::new(sink);
    write_header(&mut w)?;
    write_system_class(
        &mut w,
        1,
        &generic_list_name("System.String"),
        &LIST_MEMBERS,
        vec![
            DeclaredType::StringArray,
            DeclaredType::Primitive(PrimitiveType::Int32),
            DeclaredType::Primitive(PrimitiveType::Int32),
        ],
    )?;
    write_tag(&mut w, RecordType::MemberReference)?;
    w.write_i32(2)?;
    w.write_i32(length)?;
    w.write_i32(0)?;

    write_tag(&mut w, RecordType::ArraySingleString)?;
    ArrayInfo { id: 2, length }.encode(&mut w)?;
    let mut strings = StringRegistry::new(3);
    write_element_records(
        &mut w,
        items.iter().map(|item| match item {
            Some(s) => WireElement::Str(s.as_str()),
            None => WireElement::Null,
        }),
        &mut strings,
    )?;
    write_end(&mut w)
}

/// Пишет нетипизированный список раскладкой ArrayList, если каждый элемент
/// кодируем (примитив, строка или null). Иначе — `Ok(false)`, поток не
/// тронут.
pub fn write_value_list<W: Write>(sink: W, items: &[Value]) -> EncodeResult<bool> {
    let mut elements = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Null => elements.push(WireElement::Null),
            Value::String(s) => elements.push(WireElement::Str(s.as_str())),
            other => match other.as_primitive() {
                Some(p) => elements.push(WireElement::Prim(p)),
                None => {
                    debug!("value list element is outside the supported set");
                    return Ok(false);
                }
            },
        }
    }
    let length = check_len("value list", items.len())?;

    let mut w = PayloadWriter::new(sink);
    write_header(&mut w)?;
    write_system_class(
        &mut w,
        1,
        ARRAY_LIST_TYPE,
        &LIST_MEMBERS,
        vec![
            DeclaredType::ObjectArray,
            DeclaredType::Primitive(PrimitiveType::Int32),
            DeclaredType::Primitive(PrimitiveType::Int32),
        ],
    )?;
    write_tag(&mut w, RecordType::MemberReference)?;
    w.write_i32(2)?;
    w.write_i32(length)?;
    w.write_i32(0)?;

    write_tag(&mut w, RecordType::ArraySingleObject)?;
    ArrayInfo { id: 2, length }.encode(&mut w)?;
    let mut strings = StringRegistry::new(3);
    write_element_records(&mut w, elements.into_iter(), &mut strings)?;
    write_end(&mut w)?;
    Ok(true)
}

/// Размер корзин для заявленного числа записей: наименьшее простое из
/// исторической таблицы, не меньшее count/0.72.
fn hash_size(count: usize) -> i32 {
    let raw = (count as f64 / 0.72).ceil() as i64;
    for &p in &HASH_PRIMES {
        if p as i64 >= raw {
            return p;
        }
    }
    let mut candidate = (raw as i32) | 1;
    while !is_prime(candidate) {
        candidate += 2;
    }
    candidate
}

fn is_prime(n: i32) -> bool {
    if n < 2 {
        return false;
    }
    let mut d = 3;
    while (d as i64) * (d as i64) <= n as i64 {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    n % 2 != 0 || n == 2
}

/// Пишет словарь со строковыми ключами раскладкой Hashtable: LoadFactor,
/// Version, Comparer, HashCodeProvider, HashSize, затем массивы ключей
/// и значений, на которые класс ссылается вперёд.
pub fn write_string_map<W: Write>(
    sink: W,
    map: &BTreeMap<String, Option<String>>,
) -> EncodeResult<()> {
    let count = check_len("string map", map.len())?;

    let mut w = PayloadWriter::new(sink);
    write_header(&mut w)?;
    write_system_class(
        &mut w,
        1,
        HASHTABLE_TYPE,
        &HASHTABLE_MEMBERS,
        vec![
            DeclaredType::Primitive(PrimitiveType::Single),
            DeclaredType::Primitive(PrimitiveType::Int32),
            DeclaredType::SystemClass(COMPARER_TYPE.to_string()),
            DeclaredType::SystemClass(HASH_CODE_PROVIDER_TYPE.to_string()),
            DeclaredType::Primitive(PrimitiveType::Int32),
            DeclaredType::ObjectArray,
            DeclaredType::ObjectArray,
        ],
    )?;
    w.write_f32(0.72)?;
    w.write_i32(count)?;
    write_tag(&mut w, RecordType::ObjectNull)?;
    write_tag(&mut w, RecordType::ObjectNull)?;
    w.write_i32(hash_size(map.len()))?;
    write_tag(&mut w, RecordType::MemberReference)?;
    w.write_i32(2)?;
    write_tag(&mut w, RecordType::MemberReference)?;
    w.write_i32(3)?;

    // Идентификаторы 1..3 заняты классом и массивами.
    let mut strings = StringRegistry::new(4);

    write_tag(&mut w, RecordType::ArraySingleObject)?;
    ArrayInfo { id: 2, length: count }.encode(&mut w)?;
    write_element_records(
        &mut w,
        map.keys().map(|k| WireElement::Str(k.as_str())),
        &mut strings,
    )?;

    write_tag(&mut w, RecordType::ArraySingleObject)?;
    ArrayInfo { id: 3, length: count }.encode(&mut w)?;
    write_element_records(
        &mut w,
        map.values().map(|v| match v {
            Some(s) => WireElement::Str(s.as_str()),
            None => WireElement::Null,
        }),
        &mut strings,
    )?;
    write_end(&mut w)
}

/// Пишет значение, если его форма входит в белый список.
///
/// `Ok(false)` — форма не поддерживается, в поток не записано ни байта;
/// вызывающая сторона выбирает другую кодировку.
pub fn try_write_value<W: Write>(sink: W, value: &Value) -> EncodeResult<bool> {
    match value {
        Value::String(s) => write_string(sink, s).map(|_| true),
        Value::StringArray(items) => write_string_array(sink, items).map(|_| true),
        Value::PrimitiveArray(items) => write_primitive_array(sink, items).map(|_| true),
        Value::PrimitiveList(items) => write_primitive_list(sink, items).map(|_| true),
        Value::StringList(items) => write_string_list(sink, items).map(|_| true),
        Value::StringMap(map) => write_string_map(sink, map).map(|_| true),
        Value::List(items) => write_value_list(sink, items),
        Value::Null => {
            debug!("standalone null is not encodable");
            Ok(false)
        }
        other => match other.as_primitive() {
            Some(p) => write_primitive(sink, &p).map(|_| true),
            None => Ok(false),
        },
    }
}
