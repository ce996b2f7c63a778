//! Property-based тесты кодека.
//!
//! Генерируют случайные значения белого списка и проверяют, что
//! write → parse → extract возвращает исходное значение.

use std::collections::BTreeMap;

use proptest::prelude::*;

use nrbf::{extract_value, parse, try_write_value, PrimitiveArray, Value};

const PROPTEST_CASES: u32 = 512;

/// Глубокое сравнение Value с поэлементной обработкой NaN.
fn value_deep_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::F32(x), Value::F32(y)) => x.to_bits() == y.to_bits(),
        (Value::F64(x), Value::F64(y)) => x.to_bits() == y.to_bits(),
        (Value::PrimitiveArray(x), Value::PrimitiveArray(y))
        | (Value::PrimitiveList(x), Value::PrimitiveList(y)) => match (x, y) {
            (PrimitiveArray::Double(xs), PrimitiveArray::Double(ys)) => {
                xs.len() == ys.len()
                    && xs
                        .iter()
                        .zip(ys)
                        .all(|(p, q)| p.to_bits() == q.to_bits())
            }
            (PrimitiveArray::Single(xs), PrimitiveArray::Single(ys)) => {
                xs.len() == ys.len()
                    && xs
                        .iter()
                        .zip(ys)
                        .all(|(p, q)| p.to_bits() == q.to_bits())
            }
            _ => x == y,
        },
        (Value::List(xs), Value::List(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(p, q)| value_deep_eq(p, q))
        }
        _ => a == b,
    }
}

fn roundtrip(value: &Value) -> Value {
    let mut buf = Vec::new();
    assert!(try_write_value(&mut buf, value).unwrap());
    let graph = parse(buf.as_slice()).unwrap();
    extract_value(&graph).expect("extraction must succeed")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(PROPTEST_CASES))]

    #[test]
    fn prop_string_roundtrip(s in ".*") {
        let v = Value::String(s);
        let got = roundtrip(&v);
        prop_assert!(value_deep_eq(&got, &v), "{v:?} -> {got:?}");
    }

    #[test]
    fn prop_i32_array_roundtrip(items in prop::collection::vec(any::<i32>(), 0..256)) {
        let v = Value::PrimitiveArray(PrimitiveArray::Int32(items));
        let got = roundtrip(&v);
        prop_assert!(value_deep_eq(&got, &v));
    }

    #[test]
    fn prop_double_array_roundtrip_bitexact(
        bits in prop::collection::vec(any::<u64>(), 0..64)
    ) {
        // Произвольные битовые образы, включая NaN с полезной нагрузкой.
        let items: Vec<f64> = bits.into_iter().map(f64::from_bits).collect();
        let v = Value::PrimitiveArray(PrimitiveArray::Double(items));
        let got = roundtrip(&v);
        prop_assert!(value_deep_eq(&got, &v));
    }

    #[test]
    fn prop_string_array_roundtrip(
        items in prop::collection::vec(prop::option::of(".{0,12}"), 0..64)
    ) {
        let v = Value::StringArray(items);
        let got = roundtrip(&v);
        prop_assert!(value_deep_eq(&got, &v));
    }

    #[test]
    fn prop_primitive_list_roundtrip(items in prop::collection::vec(any::<i64>(), 0..128)) {
        let v = Value::PrimitiveList(PrimitiveArray::Int64(items));
        let got = roundtrip(&v);
        prop_assert!(value_deep_eq(&got, &v));
    }

    #[test]
    fn prop_string_map_roundtrip(
        entries in prop::collection::btree_map(".{0,8}", prop::option::of(".{0,8}"), 0..32)
    ) {
        let v = Value::StringMap(entries);
        let got = roundtrip(&v);
        prop_assert!(value_deep_eq(&got, &v));
    }

    #[test]
    fn prop_value_list_roundtrip(
        items in prop::collection::vec(
            prop_oneof![
                Just(Value::Null),
                any::<i32>().prop_map(Value::I32),
                any::<bool>().prop_map(Value::Bool),
                ".{0,8}".prop_map(Value::String),
                any::<u64>().prop_map(|b| Value::F64(f64::from_bits(b))),
            ],
            0..48,
        )
    ) {
        let v = Value::List(items);
        let got = roundtrip(&v);
        prop_assert!(value_deep_eq(&got, &v));
    }

    #[test]
    fn prop_parser_never_panics_on_mutated_stream(
        seed in prop::collection::vec(any::<u8>(), 0..160)
    ) {
        // Произвольные байты: разбор обязан вернуть Ok или Err, но не
        // упасть и не зациклиться.
        let _ = parse(seed.as_slice());
    }

    #[test]
    fn prop_mutated_valid_stream_never_panics(
        flip_at in 0usize..64,
        byte in any::<u8>(),
    ) {
        let mut buf = Vec::new();
        let mut map = BTreeMap::new();
        map.insert("k".to_string(), Some("v".to_string()));
        try_write_value(&mut buf, &Value::StringMap(map)).unwrap();
        if flip_at < buf.len() {
            buf[flip_at] = byte;
        }
        let _ = parse(buf.as_slice());
    }
}
