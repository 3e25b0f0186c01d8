//! Generic values read through class definitions.

use super::metadata::{ClassDef, FieldDef, TypeRegistry};
use super::reader::{invalid, Reader, Result};

const MAX_VALUE_DEPTH: usize = 32;

/// A decoded field or pool entry
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),

    /// Index into the constant pool of `class`
    Ref { class: i64, index: i64 },
    Array(Vec<Value>),

    /// Field values in declaration order of `class`
    Object { class: i64, fields: Vec<Value> },
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }
}

/// Reads values of one chunk
pub(crate) struct ValueReader<'r> {
    registry: &'r TypeRegistry,
    string_class: Option<i64>,
}

impl<'r> ValueReader<'r> {
    pub(crate) fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            string_class: registry.id_of("java.lang.String"),
        }
    }

    pub(crate) fn class(&self, id: i64) -> Result<&'r ClassDef> {
        self.registry
            .get(id)
            .ok_or_else(|| invalid(format!("unknown class id {}", id)))
    }

    /// Read an inline instance of `class_id`
    pub(crate) fn read(&self, reader: &mut Reader<'_>, class_id: i64) -> Result<Value> {
        self.read_class(reader, self.class(class_id)?, 0)
    }

    fn read_class(&self, reader: &mut Reader<'_>, class: &ClassDef, depth: usize) -> Result<Value> {
        if depth > MAX_VALUE_DEPTH {
            return Err(invalid(format!("value of {} nested too deeply", class.name)));
        }

        match class.name.as_str() {
            "boolean" => return Ok(Value::Bool(reader.boolean()?)),
            "byte" => return Ok(Value::Int(i64::from(reader.u8()? as i8))),
            "short" => return Ok(Value::Int(i64::from(reader.short()?))),
            "char" => return Ok(Value::Int(i64::from(reader.char()?))),
            "int" => return Ok(Value::Int(i64::from(reader.int()?))),
            "long" => return Ok(Value::Int(reader.long()?)),
            "float" => return Ok(Value::Float(f64::from(reader.float()?))),
            "double" => return Ok(Value::Float(reader.double()?)),
            "java.lang.String" => return self.read_string(reader),
            _ => {}
        }

        let mut fields = Vec::with_capacity(class.fields.len());
        for field in &class.fields {
            fields.push(self.read_field(reader, field, depth)?);
        }
        Ok(Value::Object {
            class: class.id,
            fields,
        })
    }

    fn read_field(&self, reader: &mut Reader<'_>, field: &FieldDef, depth: usize) -> Result<Value> {
        if field.array {
            let len = reader.count()?;
            if len > reader.remaining() {
                return Err(invalid(format!(
                    "array field {} declares {} elements with {} bytes left",
                    field.name,
                    len,
                    reader.remaining()
                )));
            }
            let mut items = Vec::with_capacity(len.min(4096));
            for _ in 0..len {
                items.push(self.read_scalar(reader, field, depth)?);
            }
            return Ok(Value::Array(items));
        }
        self.read_scalar(reader, field, depth)
    }

    fn read_scalar(&self, reader: &mut Reader<'_>, field: &FieldDef, depth: usize) -> Result<Value> {
        if field.constant_pool {
            return Ok(Value::Ref {
                class: field.class_id,
                index: reader.long()?,
            });
        }
        self.read_class(reader, self.class(field.class_id)?, depth + 1)
    }

    /// Strings carry a one-byte encoding tag
    fn read_string(&self, reader: &mut Reader<'_>) -> Result<Value> {
        match reader.u8()? {
            0 => Ok(Value::Null),
            1 => Ok(Value::Str(String::new())),
            2 => {
                let class = self
                    .string_class
                    .ok_or_else(|| invalid("string constant without java.lang.String class"))?;
                Ok(Value::Ref {
                    class,
                    index: reader.long()?,
                })
            }
            3 => {
                let len = reader.count()?;
                Ok(Value::Str(
                    String::from_utf8_lossy(reader.bytes(len)?).into_owned(),
                ))
            }
            4 => {
                let len = reader.count()?;
                let mut units = Vec::with_capacity(len.min(4096));
                for _ in 0..len {
                    units.push(reader.char()?);
                }
                Ok(Value::Str(String::from_utf16_lossy(&units)))
            }
            5 => {
                let len = reader.count()?;
                Ok(Value::Str(
                    reader.bytes(len)?.iter().map(|&b| b as char).collect(),
                ))
            }
            other => Err(invalid(format!("unknown string encoding {}", other))),
        }
    }
}
