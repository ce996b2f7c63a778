//! Разбор враждебного и повреждённого входа: каждая ошибка фатальна,
//! частичный граф наружу не выходит.

use nrbf::{
    io::PayloadWriter,
    parse, parse_with_limits,
    record::schema::{ClassInfo, DeclaredType, MemberTypeInfo},
    DecodeError, ParseLimits, PrimitiveType, RecordType,
};

fn header_bytes(root_id: i32) -> Vec<u8> {
    let mut buf = vec![0u8];
    buf.extend(root_id.to_le_bytes());
    buf.extend((-1i32).to_le_bytes());
    buf.extend(1i32.to_le_bytes());
    buf.extend(0i32.to_le_bytes());
    buf
}

#[test]
fn test_empty_stream() {
    let err = parse(&[][..]).unwrap_err();
    assert!(matches!(err, DecodeError::Truncated { .. }), "{err:?}");
}

#[test]
fn test_truncated_header() {
    let err = parse(&[0u8, 1, 0][..]).unwrap_err();
    assert!(matches!(err, DecodeError::Truncated { .. }), "{err:?}");
}

#[test]
fn test_missing_message_end() {
    let buf = header_bytes(1);
    let err = parse(buf.as_slice()).unwrap_err();
    assert!(matches!(err, DecodeError::Truncated { .. }), "{err:?}");
}

#[test]
fn test_stream_must_start_with_header() {
    // BinaryObjectString на месте заголовка.
    let err = parse(&[6u8, 1, 0, 0, 0][..]).unwrap_err();
    assert!(
        matches!(err, DecodeError::UnexpectedRecordType { tag: RecordType::BinaryObjectString, .. }),
        "{err:?}"
    );
}

#[test]
fn test_unknown_record_tag() {
    let mut buf = header_bytes(1);
    buf.push(0x2A);
    let err = parse(buf.as_slice()).unwrap_err();
    match err {
        DecodeError::UnknownRecordType { tag, offset } => {
            assert_eq!(tag, 0x2A);
            assert_eq!(offset, 17);
        }
        other => panic!("expected UnknownRecordType, got {other:?}"),
    }
}

#[test]
fn test_unsupported_header_version() {
    let mut buf = vec![0u8];
    buf.extend(1i32.to_le_bytes());
    buf.extend((-1i32).to_le_bytes());
    buf.extend(2i32.to_le_bytes());
    buf.extend(0i32.to_le_bytes());
    buf.push(11);
    let err = parse(buf.as_slice()).unwrap_err();
    assert!(matches!(err, DecodeError::Malformed { what: "stream header", .. }), "{err:?}");
}

#[test]
fn test_zero_root_id() {
    let mut buf = vec![0u8];
    buf.extend(0i32.to_le_bytes());
    buf.extend((-1i32).to_le_bytes());
    buf.extend(1i32.to_le_bytes());
    buf.extend(0i32.to_le_bytes());
    buf.push(11);
    let err = parse(buf.as_slice()).unwrap_err();
    assert!(matches!(err, DecodeError::Malformed { what: "stream header", .. }), "{err:?}");
}

#[test]
fn test_negative_array_length_rejected_before_allocation() {
    let mut buf = header_bytes(1);
    buf.push(17); // ArraySingleString
    buf.extend(1i32.to_le_bytes());
    buf.extend((-1i32).to_le_bytes());
    let err = parse(buf.as_slice()).unwrap_err();
    match err {
        DecodeError::RangeViolation { what, value, .. } => {
            assert_eq!(what, "array length");
            assert_eq!(value, -1);
        }
        other => panic!("expected RangeViolation, got {other:?}"),
    }
}

#[test]
fn test_array_length_over_limit() {
    let mut buf = header_bytes(1);
    buf.push(17);
    buf.extend(1i32.to_le_bytes());
    buf.extend(100i32.to_le_bytes());

    let limits = ParseLimits {
        max_array_elements: 4,
        ..ParseLimits::default()
    };
    let err = parse_with_limits(buf.as_slice(), limits).unwrap_err();
    match err {
        DecodeError::LimitExceeded { what, value, limit, .. } => {
            assert_eq!(what, "array element count");
            assert_eq!(value, 100);
            assert_eq!(limit, 4);
        }
        other => panic!("expected LimitExceeded, got {other:?}"),
    }
}

#[test]
fn test_string_length_over_limit() {
    let mut buf = header_bytes(1);
    buf.push(6); // BinaryObjectString
    buf.extend(1i32.to_le_bytes());
    buf.push(100); // заявленная длина строки

    let limits = ParseLimits {
        max_string_bytes: 10,
        ..ParseLimits::default()
    };
    let err = parse_with_limits(buf.as_slice(), limits).unwrap_err();
    assert!(matches!(err, DecodeError::LimitExceeded { .. }), "{err:?}");
}

#[test]
fn test_duplicate_object_id() {
    let mut buf = header_bytes(1);
    for _ in 0..2 {
        buf.push(6);
        buf.extend(1i32.to_le_bytes());
        buf.push(1);
        buf.extend(b"x");
    }
    buf.push(11);
    let err = parse(buf.as_slice()).unwrap_err();
    match err {
        DecodeError::DuplicateId { id, offset } => {
            assert_eq!(id, 1);
            assert!(offset.is_some());
        }
        other => panic!("expected DuplicateId, got {other:?}"),
    }
}

#[test]
fn test_zero_object_id_rejected() {
    let mut buf = header_bytes(1);
    buf.push(6);
    buf.extend(0i32.to_le_bytes());
    buf.push(1);
    buf.extend(b"x");
    buf.push(11);
    let err = parse(buf.as_slice()).unwrap_err();
    assert!(matches!(err, DecodeError::InvalidId { id: 0, .. }), "{err:?}");
}

#[test]
fn test_unresolved_reference_fails_whole_parse() {
    // Член класса ссылается на идентификатор, которого в потоке нет.
    let mut buf = header_bytes(1);
    {
        let mut w = PayloadWriter::new(&mut buf);
        w.write_u8(u8::from(RecordType::SystemClassWithMembersAndTypes))
            .unwrap();
        ClassInfo::new(1, "Holder", &["s"]).encode(&mut w).unwrap();
        MemberTypeInfo::new(vec![DeclaredType::String])
            .encode(&mut w)
            .unwrap();
        w.write_u8(u8::from(RecordType::MemberReference)).unwrap();
        w.write_i32(99).unwrap();
        w.write_u8(u8::from(RecordType::MessageEnd)).unwrap();
    }
    let err = parse(buf.as_slice()).unwrap_err();
    assert!(matches!(err, DecodeError::UnresolvedReference { id: 99 }), "{err:?}");
}

#[test]
fn test_protocol_violation_in_string_member() {
    // Для члена, заявленного строкой, приходит типизированный примитив.
    let mut buf = header_bytes(1);
    {
        let mut w = PayloadWriter::new(&mut buf);
        w.write_u8(u8::from(RecordType::SystemClassWithMembersAndTypes))
            .unwrap();
        ClassInfo::new(1, "Holder", &["s"]).encode(&mut w).unwrap();
        MemberTypeInfo::new(vec![DeclaredType::String])
            .encode(&mut w)
            .unwrap();
        w.write_u8(u8::from(RecordType::MemberPrimitiveTyped)).unwrap();
        w.write_u8(u8::from(PrimitiveType::Int32)).unwrap();
        w.write_i32(5).unwrap();
    }
    let err = parse(buf.as_slice()).unwrap_err();
    match err {
        DecodeError::UnexpectedRecordType { tag, .. } => {
            assert_eq!(tag, RecordType::MemberPrimitiveTyped);
        }
        other => panic!("expected UnexpectedRecordType, got {other:?}"),
    }
}

#[test]
fn test_protocol_violation_array_in_primitive_array_member() {
    // Член заявлен массивом примитивов, приходит строковый массив.
    let mut buf = header_bytes(1);
    {
        let mut w = PayloadWriter::new(&mut buf);
        w.write_u8(u8::from(RecordType::SystemClassWithMembersAndTypes))
            .unwrap();
        ClassInfo::new(1, "Holder", &["a"]).encode(&mut w).unwrap();
        MemberTypeInfo::new(vec![DeclaredType::PrimitiveArray(PrimitiveType::Int32)])
            .encode(&mut w)
            .unwrap();
        w.write_u8(u8::from(RecordType::ArraySingleString)).unwrap();
        w.write_i32(2).unwrap();
        w.write_i32(0).unwrap();
    }
    let err = parse(buf.as_slice()).unwrap_err();
    assert!(
        matches!(err, DecodeError::UnexpectedRecordType { tag: RecordType::ArraySingleString, .. }),
        "{err:?}"
    );
}

#[test]
fn test_null_run_of_zero_rejected() {
    let mut buf = header_bytes(1);
    buf.push(17); // ArraySingleString
    buf.extend(1i32.to_le_bytes());
    buf.extend(3i32.to_le_bytes());
    buf.push(13); // короткая серия
    buf.push(0); // нулевой счётчик
    let err = parse(buf.as_slice()).unwrap_err();
    assert!(matches!(err, DecodeError::RangeViolation { what: "null run count", .. }), "{err:?}");
}

#[test]
fn test_null_run_longer_than_array() {
    let mut buf = header_bytes(1);
    buf.push(17);
    buf.extend(1i32.to_le_bytes());
    buf.extend(1i32.to_le_bytes());
    buf.push(13);
    buf.push(5);
    let err = parse(buf.as_slice()).unwrap_err();
    match err {
        DecodeError::NullRunOverflow { count, remaining, .. } => {
            assert_eq!(count, 5);
            assert_eq!(remaining, 1);
        }
        other => panic!("expected NullRunOverflow, got {other:?}"),
    }
}

#[test]
fn test_null_run_cannot_cover_primitive_member() {
    // Серия null накрывает член, заявленный примитивом.
    let mut buf = header_bytes(1);
    {
        let mut w = PayloadWriter::new(&mut buf);
        w.write_u8(u8::from(RecordType::SystemClassWithMembersAndTypes))
            .unwrap();
        ClassInfo::new(1, "Holder", &["s", "n"]).encode(&mut w).unwrap();
        MemberTypeInfo::new(vec![
            DeclaredType::String,
            DeclaredType::Primitive(PrimitiveType::Int32),
        ])
        .encode(&mut w)
        .unwrap();
        w.write_u8(u8::from(RecordType::ObjectNullMultiple256)).unwrap();
        w.write_u8(2).unwrap();
    }
    let err = parse(buf.as_slice()).unwrap_err();
    assert!(matches!(err, DecodeError::Malformed { what: "null run", .. }), "{err:?}");
}

#[test]
fn test_depth_limit() {
    // Вложенные объектные массивы глубже лимита.
    let mut buf = header_bytes(1);
    for i in 0..10i32 {
        buf.push(16); // ArraySingleObject
        buf.extend((i + 1).to_le_bytes());
        buf.extend(1i32.to_le_bytes());
    }
    let limits = ParseLimits {
        max_depth: 4,
        ..ParseLimits::default()
    };
    let err = parse_with_limits(buf.as_slice(), limits).unwrap_err();
    assert!(matches!(err, DecodeError::DepthExceeded { .. }), "{err:?}");
}

#[test]
fn test_class_with_id_to_wrong_kind() {
    let mut buf = header_bytes(1);
    {
        let mut w = PayloadWriter::new(&mut buf);
        w.write_u8(u8::from(RecordType::BinaryObjectString)).unwrap();
        w.write_i32(1).unwrap();
        w.write_string("not a class").unwrap();

        w.write_u8(u8::from(RecordType::ClassWithId)).unwrap();
        w.write_i32(2).unwrap();
        w.write_i32(1).unwrap();
    }
    let err = parse(buf.as_slice()).unwrap_err();
    match err {
        DecodeError::WrongReferencedKind { id, expected, found } => {
            assert_eq!(id, 1);
            assert_eq!(expected, "class");
            assert_eq!(found, "string");
        }
        other => panic!("expected WrongReferencedKind, got {other:?}"),
    }
}

#[test]
fn test_class_library_must_precede() {
    // ClassWithMembersAndTypes ссылается на библиотеку, которой нет.
    let mut buf = header_bytes(1);
    {
        let mut w = PayloadWriter::new(&mut buf);
        w.write_u8(u8::from(RecordType::ClassWithMembersAndTypes)).unwrap();
        ClassInfo::new(1, "Lib.Type", &[]).encode(&mut w).unwrap();
        MemberTypeInfo::new(Vec::new()).encode(&mut w).unwrap();
        w.write_i32(7).unwrap(); // несуществующая библиотека
        w.write_u8(u8::from(RecordType::MessageEnd)).unwrap();
    }
    let err = parse(buf.as_slice()).unwrap_err();
    assert!(matches!(err, DecodeError::UnresolvedReference { id: 7 }), "{err:?}");
}

#[test]
fn test_reference_id_must_be_positive() {
    let mut buf = header_bytes(1);
    buf.push(16); // ArraySingleObject
    buf.extend(1i32.to_le_bytes());
    buf.extend(1i32.to_le_bytes());
    buf.push(9); // MemberReference
    buf.extend((-3i32).to_le_bytes());
    let err = parse(buf.as_slice()).unwrap_err();
    assert!(matches!(err, DecodeError::InvalidId { id: -3, .. }), "{err:?}");
}

#[test]
fn test_root_must_resolve() {
    // Заголовок обещает корень 5, но в потоке только запись 1.
    let mut buf = header_bytes(5);
    buf.push(6);
    buf.extend(1i32.to_le_bytes());
    buf.push(1);
    buf.extend(b"x");
    buf.push(11);
    let err = parse(buf.as_slice()).unwrap_err();
    assert!(matches!(err, DecodeError::UnresolvedReference { id: 5 }), "{err:?}");
}

#[test]
fn test_sentinel_primitive_in_member_typed() {
    let mut buf = header_bytes(1);
    buf.push(16); // ArraySingleObject
    buf.extend(1i32.to_le_bytes());
    buf.extend(1i32.to_le_bytes());
    buf.push(8); // MemberPrimitiveTyped
    buf.push(18); // PrimitiveType::String — сентинель
    let err = parse(buf.as_slice()).unwrap_err();
    assert!(matches!(err, DecodeError::IllegalPrimitiveType { .. }), "{err:?}");
}

#[test]
fn test_truncated_primitive_array_payload() {
    let mut buf = header_bytes(1);
    buf.push(15); // ArraySinglePrimitive
    buf.extend(1i32.to_le_bytes());
    buf.extend(4i32.to_le_bytes());
    buf.push(8); // Int32
    buf.extend(7i32.to_le_bytes()); // только один элемент из четырёх
    let err = parse(buf.as_slice()).unwrap_err();
    assert!(matches!(err, DecodeError::Truncated { .. }), "{err:?}");
}
