//! Конечный автомат разбора потока.

use std::io::Read;

use tracing::{debug, error, trace};

use crate::{
    error::{DecodeError, DecodeResult},
    io::PayloadReader,
    parse::{allowed::AllowedRecords, ParseLimits},
    record::{
        array::{ArrayElements, ArrayRecord},
        class::ClassRecord,
        map::{Graph, RecordMap},
        schema::{ArrayInfo, BinaryArrayInfo, ClassInfo, DeclaredType, MemberTypeInfo},
        tags::{BinaryType, PrimitiveType, RecordType},
        Id, LibraryRecord, Primitive, Record, Slot, StringRecord,
    },
    value::PrimitiveArray,
};

/// Версия формата в заголовке потока.
pub const WIRE_MAJOR_VERSION: i32 = 1;
pub const WIRE_MINOR_VERSION: i32 = 0;

/// Результат разбора одной записи в позиции значения: либо одна ячейка,
/// либо серия null, занимающая несколько логических ячеек подряд.
enum SlotFill {
    Value(Slot),
    Nulls(u32),
}

pub(crate) struct Parser<R: Read> {
    r: PayloadReader<R>,
    map: RecordMap,
    limits: ParseLimits,
    depth: usize,
}

impl<R: Read> Parser<R> {
    pub(crate) fn new(source: R, limits: ParseLimits) -> Self {
        Self {
            r: PayloadReader::new(source),
            map: RecordMap::new(),
            limits,
            depth: 0,
        }
    }

    pub(crate) fn run(mut self) -> DecodeResult<Graph> {
        let root_id = self.parse_header()?;

        loop {
            let at = self.r.offset();
            let tag = RecordType::read(&mut self.r)?;
            if tag == RecordType::MessageEnd {
                debug!(offset = at, "message end");
                break;
            }
            if !AllowedRecords::TOP_LEVEL.allows(tag) {
                error!(?tag, offset = at, "record not allowed at top level");
                return Err(DecodeError::UnexpectedRecordType {
                    tag,
                    allowed: format!("{:?}", AllowedRecords::TOP_LEVEL),
                    offset: at,
                });
            }
            if tag == RecordType::BinaryLibrary {
                self.parse_library(at)?;
            } else {
                self.parse_value_record(tag, at)?;
            }
        }

        self.validate(root_id)?;
        debug!(records = self.map.len(), root_id, "stream parsed");
        Ok(Graph::new(root_id, self.map))
    }

    fn parse_header(&mut self) -> DecodeResult<Id> {
        let at = self.r.offset();
        let tag = RecordType::read(&mut self.r)?;
        if tag != RecordType::SerializedStreamHeader {
            return Err(DecodeError::UnexpectedRecordType {
                tag,
                allowed: format!("{:?}", AllowedRecords::SERIALIZED_STREAM_HEADER),
                offset: at,
            });
        }

        let root_id = self.r.read_i32("root id")?;
        let header_id = self.r.read_i32("header id")?;
        let major = self.r.read_i32("major version")?;
        let minor = self.r.read_i32("minor version")?;

        if root_id == 0 {
            return Err(DecodeError::Malformed {
                what: "stream header",
                reason: "zero root id".to_string(),
                offset: Some(at),
            });
        }
        if major != WIRE_MAJOR_VERSION || minor != WIRE_MINOR_VERSION {
            return Err(DecodeError::Malformed {
                what: "stream header",
                reason: format!(
                    "unsupported version {major}.{minor}, expected \
                     {WIRE_MAJOR_VERSION}.{WIRE_MINOR_VERSION}"
                ),
                offset: Some(at),
            });
        }

        debug!(root_id, header_id, "parsed stream header");
        Ok(root_id)
    }

    /// Читает следующую запись в позиции значения.
    ///
    /// Записи библиотек, если они допустимы в контексте, регистрируются
    /// на месте, и чтение продолжается до первой записи-значения.
    fn next_fill(&mut self, allowed: AllowedRecords) -> DecodeResult<SlotFill> {
        loop {
            let at = self.r.offset();
            let tag = RecordType::read(&mut self.r)?;
            if !allowed.allows(tag) {
                error!(?tag, offset = at, "record not allowed in this context");
                return Err(DecodeError::UnexpectedRecordType {
                    tag,
                    allowed: format!("{allowed:?}"),
                    offset: at,
                });
            }
            if tag == RecordType::BinaryLibrary {
                self.parse_library(at)?;
                continue;
            }
            return self.parse_value_record(tag, at);
        }
    }

    /// Разбирает запись-значение с уже проверенным тегом.
    fn parse_value_record(&mut self, tag: RecordType, at: u64) -> DecodeResult<SlotFill> {
        match tag {
            RecordType::ObjectNull => Ok(SlotFill::Nulls(1)),

            RecordType::ObjectNullMultiple256 => {
                let count = self.r.read_u8("null run count")?;
                if count == 0 {
                    return Err(DecodeError::RangeViolation {
                        what: "null run count",
                        value: 0,
                        offset: at,
                    });
                }
                Ok(SlotFill::Nulls(count as u32))
            }

            RecordType::ObjectNullMultiple => {
                let count = self.r.read_i32("null run count")?;
                if count <= 0 {
                    return Err(DecodeError::RangeViolation {
                        what: "null run count",
                        value: count as i64,
                        offset: at,
                    });
                }
                Ok(SlotFill::Nulls(count as u32))
            }

            RecordType::MemberReference => {
                let id = self.r.read_i32("reference id")?;
                if id <= 0 {
                    return Err(DecodeError::InvalidId {
                        what: "member reference id",
                        id,
                        offset: at,
                    });
                }
                trace!(id, offset = at, "member reference");
                Ok(SlotFill::Value(Slot::Ref(id)))
            }

            RecordType::MemberPrimitiveTyped => {
                let kind = PrimitiveType::read_storable(&mut self.r, "typed member primitive")?;
                let value = Primitive::read(&mut self.r, kind, self.limits.max_string_bytes)?;
                Ok(SlotFill::Value(Slot::Primitive(value)))
            }

            RecordType::BinaryObjectString => {
                let id = self.r.read_i32("object id")?;
                self.check_object_id(id, at)?;
                let value = self
                    .r
                    .read_string("string record", self.limits.max_string_bytes)?;
                self.insert(Record::String(StringRecord { id, value }), at)?;
                Ok(SlotFill::Value(Slot::Ref(id)))
            }

            RecordType::ClassWithId
            | RecordType::SystemClassWithMembers
            | RecordType::ClassWithMembers
            | RecordType::SystemClassWithMembersAndTypes
            | RecordType::ClassWithMembersAndTypes => {
                let id = self.parse_class(tag, at)?;
                Ok(SlotFill::Value(Slot::Ref(id)))
            }

            RecordType::BinaryArray
            | RecordType::ArraySinglePrimitive
            | RecordType::ArraySingleObject
            | RecordType::ArraySingleString => {
                let id = self.parse_array(tag, at)?;
                Ok(SlotFill::Value(Slot::Ref(id)))
            }

            RecordType::SerializedStreamHeader
            | RecordType::MessageEnd
            | RecordType::BinaryLibrary => Err(DecodeError::UnexpectedRecordType {
                tag,
                allowed: format!("{:?}", AllowedRecords::ANY_VALUE),
                offset: at,
            }),
        }
    }

    fn parse_library(&mut self, at: u64) -> DecodeResult<()> {
        let id = self.r.read_i32("library id")?;
        if id <= 0 {
            return Err(DecodeError::InvalidId {
                what: "library id",
                id,
                offset: at,
            });
        }
        let name = self
            .r
            .read_string("library name", self.limits.max_string_bytes)?;
        trace!(id, name = %name, "registered library");
        self.insert(Record::Library(LibraryRecord { id, name }), at)
    }

    fn parse_class(&mut self, tag: RecordType, at: u64) -> DecodeResult<Id> {
        self.enter(at)?;

        let (class_info, member_types, library_id, metadata_id) = match tag {
            RecordType::SystemClassWithMembers => {
                let ci = ClassInfo::decode(&mut self.r, &self.limits)?;
                (ci, None, None, None)
            }
            RecordType::ClassWithMembers => {
                let ci = ClassInfo::decode(&mut self.r, &self.limits)?;
                let lib = self.read_library_ref()?;
                (ci, None, Some(lib), None)
            }
            RecordType::SystemClassWithMembersAndTypes => {
                let ci = ClassInfo::decode(&mut self.r, &self.limits)?;
                let mti = MemberTypeInfo::decode(&mut self.r, ci.member_count(), &self.limits)?;
                (ci, Some(mti), None, None)
            }
            RecordType::ClassWithMembersAndTypes => {
                let ci = ClassInfo::decode(&mut self.r, &self.limits)?;
                let mti = MemberTypeInfo::decode(&mut self.r, ci.member_count(), &self.limits)?;
                let lib = self.read_library_ref()?;
                (ci, Some(mti), Some(lib), None)
            }
            RecordType::ClassWithId => {
                let id = self.r.read_i32("object id")?;
                let metadata_id = self.r.read_i32("metadata id")?;
                match self.map.get(metadata_id)? {
                    Record::Class(meta) => {
                        let ci = ClassInfo {
                            id,
                            name: meta.class_info.name.clone(),
                            member_names: meta.class_info.member_names.clone(),
                        };
                        (
                            ci,
                            meta.member_types.clone(),
                            meta.library_id,
                            Some(metadata_id),
                        )
                    }
                    other => {
                        return Err(DecodeError::WrongReferencedKind {
                            id: metadata_id,
                            expected: "class",
                            found: other.kind_name(),
                        })
                    }
                }
            }
            _ => {
                return Err(DecodeError::UnexpectedRecordType {
                    tag,
                    allowed: format!("{:?}", AllowedRecords::CLASSES),
                    offset: at,
                })
            }
        };

        self.check_object_id(class_info.id, at)?;
        trace!(id = class_info.id, name = %class_info.name, "class record");

        let total = class_info.member_count();
        let mut members = Vec::new();
        while members.len() < total {
            let declared = member_types.as_ref().map(|t| &t.types[members.len()]);
            if let Some(DeclaredType::Primitive(kind)) = declared {
                let value = Primitive::read(&mut self.r, *kind, self.limits.max_string_bytes)?;
                members.push(Slot::Primitive(value));
                continue;
            }

            let allowed = allowed_for(declared);
            match self.next_fill(allowed)? {
                SlotFill::Value(slot) => members.push(slot),
                SlotFill::Nulls(count) => {
                    let at_run = self.r.offset();
                    let remaining = (total - members.len()) as u64;
                    if count as u64 > remaining {
                        return Err(DecodeError::NullRunOverflow {
                            count,
                            remaining,
                            offset: at_run,
                        });
                    }
                    for _ in 0..count {
                        // Серия может накрыть следующий член, только если
                        // тот тоже допускает null.
                        let next = member_types.as_ref().map(|t| &t.types[members.len()]);
                        if matches!(next, Some(DeclaredType::Primitive(_))) {
                            return Err(DecodeError::Malformed {
                                what: "null run",
                                reason: format!(
                                    "member {:?} is declared primitive and cannot be null",
                                    class_info.member_names[members.len()]
                                ),
                                offset: Some(at_run),
                            });
                        }
                        members.push(Slot::Null);
                    }
                }
            }
        }

        let record = ClassRecord {
            record_type: tag,
            class_info,
            member_types,
            library_id,
            metadata_id,
            members,
        };
        let id = record.id();
        self.insert(Record::Class(record), at)?;
        self.leave();
        Ok(id)
    }

    fn parse_array(&mut self, tag: RecordType, at: u64) -> DecodeResult<Id> {
        self.enter(at)?;

        let (info, element_type) = match tag {
            RecordType::ArraySinglePrimitive => {
                let ai = ArrayInfo::decode(&mut self.r)?;
                let kind = PrimitiveType::read_storable(&mut self.r, "array element type")?;
                (BinaryArrayInfo::single(ai), DeclaredType::Primitive(kind))
            }
            RecordType::ArraySingleString => {
                let ai = ArrayInfo::decode(&mut self.r)?;
                (BinaryArrayInfo::single(ai), DeclaredType::String)
            }
            RecordType::ArraySingleObject => {
                let ai = ArrayInfo::decode(&mut self.r)?;
                (BinaryArrayInfo::single(ai), DeclaredType::Object)
            }
            RecordType::BinaryArray => {
                let bi = BinaryArrayInfo::decode(&mut self.r)?;
                let btype = BinaryType::read(&mut self.r)?;
                let dt = DeclaredType::read_additional(&mut self.r, btype, &self.limits)?;
                (bi, dt)
            }
            _ => {
                return Err(DecodeError::UnexpectedRecordType {
                    tag,
                    allowed: format!("{:?}", AllowedRecords::ARRAYS),
                    offset: at,
                })
            }
        };

        self.check_object_id(info.id, at)?;

        let total = info.total_len().ok_or(DecodeError::LimitExceeded {
            what: "array element count",
            value: u64::MAX,
            limit: self.limits.max_array_elements as u64,
            offset: at,
        })?;
        if total > self.limits.max_array_elements as u64 {
            return Err(DecodeError::LimitExceeded {
                what: "array element count",
                value: total,
                limit: self.limits.max_array_elements as u64,
                offset: at,
            });
        }
        let total = total as usize;
        trace!(id = info.id, total, ?element_type, "array record");

        let elements = match &element_type {
            DeclaredType::Primitive(kind) => ArrayElements::Primitives(PrimitiveArray::read(
                &mut self.r,
                *kind,
                total,
                self.limits.max_string_bytes,
            )?),
            declared => {
                let allowed = allowed_for(Some(declared));
                let mut slots = Vec::new();
                while slots.len() < total {
                    match self.next_fill(allowed)? {
                        SlotFill::Value(slot) => slots.push(slot),
                        SlotFill::Nulls(count) => {
                            let at_run = self.r.offset();
                            let remaining = (total - slots.len()) as u64;
                            if count as u64 > remaining {
                                return Err(DecodeError::NullRunOverflow {
                                    count,
                                    remaining,
                                    offset: at_run,
                                });
                            }
                            slots.extend(std::iter::repeat(Slot::Null).take(count as usize));
                        }
                    }
                }
                ArrayElements::Slots(slots)
            }
        };

        let record = ArrayRecord {
            record_type: tag,
            info,
            element_type,
            elements,
        };
        let id = record.id();
        self.insert(Record::Array(record), at)?;
        self.leave();
        Ok(id)
    }

    /// Идентификатор библиотеки у классовой записи: библиотека обязана быть
    /// зарегистрирована раньше по потоку.
    fn read_library_ref(&mut self) -> DecodeResult<Id> {
        let at = self.r.offset();
        let id = self.r.read_i32("library id")?;
        if id <= 0 {
            return Err(DecodeError::InvalidId {
                what: "library id",
                id,
                offset: at,
            });
        }
        match self.map.get(id)? {
            Record::Library(_) => Ok(id),
            other => Err(DecodeError::WrongReferencedKind {
                id,
                expected: "library",
                found: other.kind_name(),
            }),
        }
    }

    fn check_object_id(&self, id: Id, at: u64) -> DecodeResult<()> {
        if id == 0 {
            return Err(DecodeError::InvalidId {
                what: "object id",
                id,
                offset: at,
            });
        }
        Ok(())
    }

    fn insert(&mut self, record: Record, at: u64) -> DecodeResult<()> {
        self.map.insert(record).map_err(|e| {
            error!(offset = at, "duplicate object id");
            e.with_offset(at)
        })
    }

    fn enter(&mut self, at: u64) -> DecodeResult<()> {
        self.depth += 1;
        if self.depth > self.limits.max_depth {
            return Err(DecodeError::DepthExceeded {
                depth: self.depth,
                limit: self.limits.max_depth,
                offset: at,
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Пост-проверка графа: корень и каждая ссылка разрешаются в
    /// зарегистрированную запись-значение.
    fn validate(&self, root_id: Id) -> DecodeResult<()> {
        let root = self.map.get(root_id)?;
        if matches!(root, Record::Library(_)) {
            return Err(DecodeError::WrongReferencedKind {
                id: root_id,
                expected: "object",
                found: "library",
            });
        }

        for record in self.map.iter() {
            let slots: &[Slot] = match record {
                Record::Class(c) => &c.members,
                Record::Array(a) => a.slots().unwrap_or(&[]),
                _ => &[],
            };
            for slot in slots {
                if let Slot::Ref(id) = slot {
                    let target = self.map.get(*id).map_err(|e| {
                        error!(id, "dangling reference");
                        e
                    })?;
                    if matches!(target, Record::Library(_)) {
                        return Err(DecodeError::WrongReferencedKind {
                            id: *id,
                            expected: "object",
                            found: "library",
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Маска допустимых записей для заявленного типа члена или элемента.
///
/// `None` — член нетипизированной классовой формы: допустима любая
/// запись-значение.
fn allowed_for(declared: Option<&DeclaredType>) -> AllowedRecords {
    match declared {
        None | Some(DeclaredType::Object) => {
            AllowedRecords::ANY_VALUE | AllowedRecords::BINARY_LIBRARY
        }
        Some(DeclaredType::String) => AllowedRecords::STRINGISH,
        Some(DeclaredType::SystemClass(_)) | Some(DeclaredType::Class(_)) => {
            AllowedRecords::CLASSES
                | AllowedRecords::MEMBER_REFERENCE
                | AllowedRecords::NULLS
                | AllowedRecords::BINARY_LIBRARY
        }
        Some(DeclaredType::ObjectArray) => {
            AllowedRecords::ARRAY_SINGLE_OBJECT
                | AllowedRecords::BINARY_ARRAY
                | AllowedRecords::MEMBER_REFERENCE
                | AllowedRecords::NULLS
                | AllowedRecords::BINARY_LIBRARY
        }
        Some(DeclaredType::StringArray) => {
            AllowedRecords::ARRAY_SINGLE_STRING
                | AllowedRecords::BINARY_ARRAY
                | AllowedRecords::MEMBER_REFERENCE
                | AllowedRecords::NULLS
                | AllowedRecords::BINARY_LIBRARY
        }
        Some(DeclaredType::PrimitiveArray(_)) => {
            AllowedRecords::ARRAY_SINGLE_PRIMITIVE
                | AllowedRecords::BINARY_ARRAY
                | AllowedRecords::MEMBER_REFERENCE
                | AllowedRecords::NULLS
                | AllowedRecords::BINARY_LIBRARY
        }
        // Сырые примитивы читаются без тега и сюда не попадают.
        Some(DeclaredType::Primitive(_)) => AllowedRecords::empty(),
    }
}
