use crate::Timestamp;
use crate::error::{ConversionError, ConversionResult};
use error_stack::Report;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};
use uuid::Uuid;

/// The declared type of an entity field, as far as filtering and conversion care.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Bool,
    Integer,
    Float,
    Text,
    Timestamp,
    Uuid,
}

impl Display for FieldKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FieldKind::Bool => "bool",
            FieldKind::Integer => "integer",
            FieldKind::Float => "float",
            FieldKind::Text => "text",
            FieldKind::Timestamp => "timestamp",
            FieldKind::Uuid => "uuid",
        };
        f.write_str(name)
    }
}

/// A type-erased field value, read from or written into an entity through its registry.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(Timestamp),
    Uuid(Uuid),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Ordering between two values of the same kind. Null and mismatched kinds don't order.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Bool(a), FieldValue::Bool(b)) => Some(a.cmp(b)),
            (FieldValue::Integer(a), FieldValue::Integer(b)) => Some(a.cmp(b)),
            (FieldValue::Float(a), FieldValue::Float(b)) => a.partial_cmp(b),
            (FieldValue::Integer(a), FieldValue::Float(b)) => (*a as f64).partial_cmp(b),
            (FieldValue::Float(a), FieldValue::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (FieldValue::Text(a), FieldValue::Text(b)) => Some(a.cmp(b)),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => Some(a.cmp(b)),
            (FieldValue::Uuid(a), FieldValue::Uuid(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// The string form handed back by property reads. `None` for null.
    pub fn into_string(self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::Text(s) => Some(s),
            other => Some(other.to_string()),
        }
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Null => f.write_str("null"),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Timestamp(ts) => write!(f, "{ts}"),
            FieldValue::Uuid(id) => write!(f, "{id}"),
        }
    }
}

/// Conversion table entry for a Rust type that can back an entity field.
pub trait FieldType: Sized {
    const KIND: FieldKind;
    const NULLABLE: bool = false;

    fn to_value(&self) -> FieldValue;
    fn from_value(value: FieldValue) -> Option<Self>;
    fn parse(raw: &str) -> Option<Self>;
}

impl FieldType for bool {
    const KIND: FieldKind = FieldKind::Bool;

    fn to_value(&self) -> FieldValue {
        FieldValue::Bool(*self)
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("true") {
            Some(true)
        } else if raw.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }
}

macro_rules! integer_field_type {
    ($($ty:ty),*) => {
        $(
            impl FieldType for $ty {
                const KIND: FieldKind = FieldKind::Integer;

                fn to_value(&self) -> FieldValue {
                    FieldValue::Integer(i64::from(*self))
                }

                fn from_value(value: FieldValue) -> Option<Self> {
                    match value {
                        FieldValue::Integer(i) => <$ty>::try_from(i).ok(),
                        _ => None,
                    }
                }

                fn parse(raw: &str) -> Option<Self> {
                    raw.trim().parse().ok()
                }
            }
        )*
    };
}

integer_field_type!(i32, i64, u32);

impl FieldType for f64 {
    const KIND: FieldKind = FieldKind::Float;

    fn to_value(&self) -> FieldValue {
        FieldValue::Float(*self)
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Float(v) => Some(v),
            FieldValue::Integer(i) => Some(i as f64),
            _ => None,
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }
}

impl FieldType for String {
    const KIND: FieldKind = FieldKind::Text;

    fn to_value(&self) -> FieldValue {
        FieldValue::Text(self.clone())
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        Some(raw.to_owned())
    }
}

impl FieldType for Timestamp {
    const KIND: FieldKind = FieldKind::Timestamp;

    fn to_value(&self) -> FieldValue {
        FieldValue::Timestamp(*self)
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Timestamp(ts) => Some(ts),
            _ => None,
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }
}

impl FieldType for Uuid {
    const KIND: FieldKind = FieldKind::Uuid;

    fn to_value(&self) -> FieldValue {
        FieldValue::Uuid(*self)
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Uuid(id) => Some(id),
            _ => None,
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim()).ok()
    }
}

impl<T: FieldType> FieldType for Option<T> {
    const KIND: FieldKind = T::KIND;
    const NULLABLE: bool = true;

    fn to_value(&self) -> FieldValue {
        self.as_ref().map_or(FieldValue::Null, T::to_value)
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        T::parse(raw).map(Some)
    }
}

fn parse_as<T: FieldType>(raw: &str) -> Option<FieldValue> {
    T::parse(raw).map(|t| t.to_value())
}

type Reader<E> = Box<dyn Fn(&E) -> FieldValue + Send + Sync>;
type Writer<E> = Box<dyn Fn(&mut E, FieldValue) -> bool + Send + Sync>;

/// Accessor/converter pair for one field of `E`.
pub struct FieldDescriptor<E> {
    name: &'static str,
    kind: FieldKind,
    nullable: bool,
    identity: bool,
    read: Reader<E>,
    write: Writer<E>,
    parse: fn(&str) -> Option<FieldValue>,
}

impl<E: 'static> FieldDescriptor<E> {
    pub fn new<T>(name: &'static str, get: fn(&E) -> &T, get_mut: fn(&mut E) -> &mut T) -> Self
    where
        T: FieldType + 'static,
    {
        Self {
            name,
            kind: T::KIND,
            nullable: T::NULLABLE,
            identity: false,
            read: Box::new(move |entity: &E| get(entity).to_value()),
            write: Box::new(move |entity: &mut E, value: FieldValue| match T::from_value(value) {
                Some(v) => {
                    *get_mut(entity) = v;
                    true
                }
                None => false,
            }),
            parse: parse_as::<T>,
        }
    }
}

impl<E> FieldDescriptor<E> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_identity(&self) -> bool {
        self.identity
    }

    pub fn read(&self, entity: &E) -> FieldValue {
        (self.read)(entity)
    }

    /// Returns false when `value` doesn't fit the field, leaving the entity untouched.
    pub fn write(&self, entity: &mut E, value: FieldValue) -> bool {
        (self.write)(entity, value)
    }

    pub fn copy(&self, from: &E, to: &mut E) {
        (self.write)(to, (self.read)(from));
    }

    /// Convert a raw string into this field's declared type.
    /// With `null_literal`, the bare word `null` is accepted for nullable fields.
    pub fn convert(&self, raw: &str, null_literal: bool) -> ConversionResult<FieldValue> {
        if null_literal && self.nullable && raw.trim().eq_ignore_ascii_case("null") {
            return Ok(FieldValue::Null);
        }

        (self.parse)(raw).ok_or_else(|| {
            Report::new(ConversionError {
                field: self.name.to_owned(),
                raw: raw.to_owned(),
                kind: self.kind,
            })
        })
    }
}

impl<E> Debug for FieldDescriptor<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("nullable", &self.nullable)
            .field("identity", &self.identity)
            .finish()
    }
}

/// The field registry of an entity type, in declaration order.
/// Built once per type and handed out as `&'static`.
pub struct Fields<E> {
    fields: Vec<FieldDescriptor<E>>,
    by_name: HashMap<&'static str, usize>,
}

impl<E: 'static> Fields<E> {
    pub fn builder() -> FieldsBuilder<E> {
        FieldsBuilder { fields: Vec::new() }
    }
}

impl<E> Fields<E> {
    /// Exact match first, then an ASCII case-insensitive one.
    pub fn get(&self, name: &str) -> Option<&FieldDescriptor<E>> {
        match self.by_name.get(name) {
            Some(&i) => self.fields.get(i),
            None => self
                .fields
                .iter()
                .find(|f| f.name.eq_ignore_ascii_case(name)),
        }
    }

    pub fn identity(&self) -> Option<&FieldDescriptor<E>> {
        self.fields.iter().find(|f| f.identity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor<E>> {
        self.fields.iter()
    }

    /// Every field a full replace writes: all of them except the identity.
    pub fn writable(&self) -> impl Iterator<Item = &FieldDescriptor<E>> {
        self.fields.iter().filter(|f| !f.identity)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<E> Debug for Fields<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.fields.iter()).finish()
    }
}

pub struct FieldsBuilder<E> {
    fields: Vec<FieldDescriptor<E>>,
}

impl<E: 'static> FieldsBuilder<E> {
    pub fn identity<T>(
        mut self,
        name: &'static str,
        get: fn(&E) -> &T,
        get_mut: fn(&mut E) -> &mut T,
    ) -> Self
    where
        T: FieldType + 'static,
    {
        let mut descriptor = FieldDescriptor::new(name, get, get_mut);
        descriptor.identity = true;
        self.fields.push(descriptor);
        self
    }

    pub fn field<T>(
        mut self,
        name: &'static str,
        get: fn(&E) -> &T,
        get_mut: fn(&mut E) -> &mut T,
    ) -> Self
    where
        T: FieldType + 'static,
    {
        self.fields.push(FieldDescriptor::new(name, get, get_mut));
        self
    }

    pub fn build(self) -> Fields<E> {
        let by_name = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name, i))
            .collect();
        Fields {
            fields: self.fields,
            by_name,
        }
    }
}
