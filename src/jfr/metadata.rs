//! Chunk metadata: the class and field definitions every value is read through.
//!
//! The metadata event carries a string table followed by an element tree
//! (`root` > `metadata` > `class` > `field`). Only classes and their fields
//! are retained; annotations, settings and the region element are ignored.

use super::reader::{invalid, Reader, Result};
use std::collections::HashMap;

/// Event type id of the metadata event
pub(crate) const METADATA_EVENT_TYPE: i64 = 0;

const MAX_ELEMENT_DEPTH: usize = 32;

/// One field of a class, in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub class_id: i64,

    /// Stored as a constant pool index rather than inline
    pub constant_pool: bool,

    /// One-dimensional array of `class_id`
    pub array: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub id: i64,
    pub name: String,
    pub fields: Vec<FieldDef>,
}

impl ClassDef {
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// Classes of one chunk, by id and by name
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    classes: HashMap<i64, ClassDef>,
    by_name: HashMap<String, i64>,
}

impl TypeRegistry {
    pub fn insert(&mut self, class: ClassDef) {
        self.by_name.insert(class.name.clone(), class.id);
        self.classes.insert(class.id, class);
    }

    pub fn get(&self, id: i64) -> Option<&ClassDef> {
        self.classes.get(&id)
    }

    pub fn id_of(&self, name: &str) -> Option<i64> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: HashMap<String, String>,
    children: Vec<Element>,
}

impl Element {
    fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Read the metadata event at the reader's position
///
/// # Errors
/// * `DecodeError::Jfr` - wrong event type, bad string indices or truncation
pub(crate) fn read_metadata(reader: &mut Reader<'_>) -> Result<TypeRegistry> {
    let _size = reader.int()?;
    let event_type = reader.long()?;
    if event_type != METADATA_EVENT_TYPE {
        return Err(invalid(format!(
            "expected metadata event, found type {}",
            event_type
        )));
    }
    let _start = reader.long()?;
    let _duration = reader.long()?;
    let _metadata_id = reader.long()?;

    let count = reader.count()?;
    let mut strings = Vec::with_capacity(count.min(4096));
    for _ in 0..count {
        strings.push(read_plain_string(reader)?);
    }

    let root = read_element(reader, &strings, 0)?;
    let mut registry = TypeRegistry::default();
    for section in root.children.iter().filter(|e| e.name == "metadata") {
        for class in section.children.iter().filter(|e| e.name == "class") {
            registry.insert(class_def(class)?);
        }
    }
    Ok(registry)
}

fn class_def(element: &Element) -> Result<ClassDef> {
    let id = parse_id(element.attribute("id"), "class id")?;
    let name = element
        .attribute("name")
        .ok_or_else(|| invalid(format!("class {} has no name", id)))?
        .to_string();

    let fields = element
        .children
        .iter()
        .filter(|e| e.name == "field")
        .map(|field| {
            Ok(FieldDef {
                name: field
                    .attribute("name")
                    .ok_or_else(|| invalid(format!("field of class {} has no name", name)))?
                    .to_string(),
                class_id: parse_id(field.attribute("class"), "field class")?,
                constant_pool: field.attribute("constantPool") == Some("true"),
                array: field.attribute("dimension") == Some("1"),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ClassDef { id, name, fields })
}

fn parse_id(raw: Option<&str>, what: &str) -> Result<i64> {
    let raw = raw.ok_or_else(|| invalid(format!("missing {}", what)))?;
    raw.parse()
        .map_err(|_| invalid(format!("invalid {} '{}'", what, raw)))
}

fn read_element(reader: &mut Reader<'_>, strings: &[String], depth: usize) -> Result<Element> {
    if depth > MAX_ELEMENT_DEPTH {
        return Err(invalid("metadata nested too deeply"));
    }

    let lookup = |index: i32| -> Result<String> {
        usize::try_from(index)
            .ok()
            .and_then(|i| strings.get(i))
            .cloned()
            .ok_or_else(|| invalid(format!("metadata string index {} out of range", index)))
    };

    let mut element = Element {
        name: lookup(reader.int()?)?,
        ..Default::default()
    };

    let attributes = reader.count()?;
    for _ in 0..attributes {
        let key = lookup(reader.int()?)?;
        let value = lookup(reader.int()?)?;
        element.attributes.insert(key, value);
    }

    let children = reader.count()?;
    for _ in 0..children {
        element
            .children
            .push(read_element(reader, strings, depth + 1)?);
    }
    Ok(element)
}

/// Metadata strings are always inline; a null string reads as empty
fn read_plain_string(reader: &mut Reader<'_>) -> Result<String> {
    match reader.u8()? {
        0 | 1 => Ok(String::new()),
        3 => {
            let len = reader.count()?;
            Ok(String::from_utf8_lossy(reader.bytes(len)?).into_owned())
        }
        4 => {
            let len = reader.count()?;
            let mut units = Vec::with_capacity(len.min(4096));
            for _ in 0..len {
                units.push(reader.char()?);
            }
            Ok(String::from_utf16_lossy(&units))
        }
        5 => {
            let len = reader.count()?;
            Ok(reader.bytes(len)?.iter().map(|&b| b as char).collect())
        }
        other => Err(invalid(format!(
            "unsupported metadata string encoding {}",
            other
        ))),
    }
}
