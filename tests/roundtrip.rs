use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;

use nrbf::{
    extract_value, parse, try_write_value, DateTime, PrimitiveArray, TimeSpan, Value,
};

fn roundtrip(value: &Value) -> Value {
    let mut buf = Vec::new();
    let written = try_write_value(&mut buf, value).unwrap();
    assert!(written, "value should be encodable: {value:?}");
    let graph = parse(buf.as_slice()).unwrap();
    extract_value(&graph).unwrap_or_else(|| panic!("extraction failed for {value:?}"))
}

#[test]
fn test_roundtrip_bool() {
    assert_eq!(roundtrip(&Value::Bool(true)), Value::Bool(true));
    assert_eq!(roundtrip(&Value::Bool(false)), Value::Bool(false));
}

#[test]
fn test_roundtrip_integer_widths() {
    let values = [
        Value::I8(i8::MIN),
        Value::U8(u8::MAX),
        Value::I16(i16::MIN),
        Value::U16(u16::MAX),
        Value::I32(i32::MIN),
        Value::U32(u32::MAX),
        Value::I64(i64::MIN),
        Value::U64(u64::MAX),
    ];
    for v in values {
        assert_eq!(roundtrip(&v), v);
    }
}

#[test]
fn test_roundtrip_float_edge_values() {
    // NaN сравниваем по битам: PartialEq для него бесполезен.
    match roundtrip(&Value::F64(f64::NAN)) {
        Value::F64(got) => assert!(got.is_nan()),
        other => panic!("expected F64, got {other:?}"),
    }
    for v in [
        f64::INFINITY,
        f64::NEG_INFINITY,
        -0.0f64,
        f64::MIN_POSITIVE,
    ] {
        match roundtrip(&Value::F64(v)) {
            Value::F64(got) => assert_eq!(got.to_bits(), v.to_bits()),
            other => panic!("expected F64, got {other:?}"),
        }
    }
    match roundtrip(&Value::F32(-0.0f32)) {
        Value::F32(got) => assert_eq!(got.to_bits(), (-0.0f32).to_bits()),
        other => panic!("expected F32, got {other:?}"),
    }
}

#[test]
fn test_roundtrip_char() {
    for c in ['a', '\0', 'ё', '🙂'] {
        assert_eq!(roundtrip(&Value::Char(c)), Value::Char(c));
    }
}

#[test]
fn test_roundtrip_strings() {
    for s in ["", "hello", "string with a \0 inside", "кириллица", "🙂🙃"] {
        assert_eq!(
            roundtrip(&Value::String(s.to_string())),
            Value::String(s.to_string())
        );
    }
}

#[test]
fn test_roundtrip_decimal() {
    for s in ["0", "1", "-1.5", "0.0000000001", "79228162514264337593543950335"] {
        let d = Decimal::from_str(s).unwrap();
        assert_eq!(roundtrip(&Value::Decimal(d)), Value::Decimal(d));
    }
}

#[test]
fn test_roundtrip_date_time_kinds() {
    for kind in 0u64..=2 {
        let raw = (kind << 62) | 630_822_816_000_000_000;
        let v = Value::DateTime(DateTime(raw));
        assert_eq!(roundtrip(&v), v);
    }
}

#[test]
fn test_roundtrip_time_span() {
    for ticks in [0i64, -1, 864_000_000_000, i64::MIN] {
        let v = Value::TimeSpan(TimeSpan(ticks));
        assert_eq!(roundtrip(&v), v);
    }
}

#[test]
fn test_roundtrip_string_array_with_null() {
    // null в середине не сдвигает последующие индексы.
    let v = Value::StringArray(vec![
        Some("yes".to_string()),
        Some("no".to_string()),
        None,
    ]);
    assert_eq!(roundtrip(&v), v);
}

#[test]
fn test_roundtrip_empty_string_array() {
    let v = Value::StringArray(Vec::new());
    assert_eq!(roundtrip(&v), v);
}

#[test]
fn test_roundtrip_primitive_arrays() {
    let arrays = [
        PrimitiveArray::Boolean(vec![true, false, true]),
        PrimitiveArray::Byte(vec![0, 127, 255]),
        PrimitiveArray::Int32(vec![i32::MIN, -1, 0, 1, i32::MAX]),
        PrimitiveArray::UInt64(vec![0, u64::MAX]),
        PrimitiveArray::Double(vec![0.5, -2.25]),
        PrimitiveArray::Char(vec!['a', 'я', '🙂']),
        PrimitiveArray::TimeSpan(vec![TimeSpan(1), TimeSpan(-1)]),
        PrimitiveArray::DateTime(vec![DateTime(0), DateTime(1 << 62)]),
        PrimitiveArray::Decimal(vec![
            Decimal::from_str("1.5").unwrap(),
            Decimal::from_str("-0.001").unwrap(),
        ]),
    ];
    for arr in arrays {
        let v = Value::PrimitiveArray(arr);
        assert_eq!(roundtrip(&v), v);
    }
}

#[test]
fn test_roundtrip_ordered_list() {
    let v = Value::PrimitiveList(PrimitiveArray::Int32(vec![1, 3, 4, 5, 6, 7]));
    assert_eq!(roundtrip(&v), v);
}

#[test]
fn test_roundtrip_string_list() {
    let v = Value::StringList(vec![
        Some("a".to_string()),
        None,
        Some("b".to_string()),
        Some("a".to_string()),
    ]);
    assert_eq!(roundtrip(&v), v);
}

#[test]
fn test_roundtrip_string_map() {
    let mut map = BTreeMap::new();
    map.insert("alpha".to_string(), Some("1".to_string()));
    map.insert("beta".to_string(), None);
    map.insert("gamma".to_string(), Some("3".to_string()));
    let v = Value::StringMap(map);
    assert_eq!(roundtrip(&v), v);
}

#[test]
fn test_roundtrip_empty_string_map() {
    let v = Value::StringMap(BTreeMap::new());
    assert_eq!(roundtrip(&v), v);
}

#[test]
fn test_roundtrip_value_list() {
    let v = Value::List(vec![
        Value::I32(42),
        Value::String("text".to_string()),
        Value::Null,
        Value::F64(2.5),
        Value::Bool(false),
    ]);
    assert_eq!(roundtrip(&v), v);
}

#[test]
fn test_unsupported_shapes_leave_stream_untouched() {
    let unsupported = [
        Value::Null,
        // Вложенный список не входит в белый список ArrayList-элементов.
        Value::List(vec![Value::List(Vec::new())]),
        Value::List(vec![Value::StringArray(Vec::new())]),
    ];
    for v in unsupported {
        let mut buf = Vec::new();
        assert!(!try_write_value(&mut buf, &v).unwrap(), "{v:?}");
        assert!(buf.is_empty(), "stream must stay untouched for {v:?}");
    }
}

#[test]
fn test_graph_survives_unrecognized_shape() {
    // Запись, которую извлечение не узнаёт, остаётся доступной как граф.
    let mut buf = Vec::new();
    assert!(try_write_value(&mut buf, &Value::String("x".to_string())).unwrap());
    let graph = parse(buf.as_slice()).unwrap();
    assert_eq!(graph.root_id(), 1);
    assert!(graph.root().is_ok());
}
