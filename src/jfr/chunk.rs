//! Chunk framing, constant pools and event scanning.
//!
//! A recording is a concatenation of self-contained chunks. Each chunk
//! starts with a fixed 68-byte big-endian header; the metadata event is
//! located through the header, constant pools and regular events are found
//! by a linear scan of the event area.

use super::event::{JfrEvent, INTERPRETED_EVENTS};
use super::metadata::{read_metadata, TypeRegistry, METADATA_EVENT_TYPE};
use super::reader::{invalid, Reader, Result};
use super::value::{Value, ValueReader};
use byteorder::{BigEndian, ByteOrder};
use log::debug;
use std::collections::HashMap;

pub(crate) const CHUNK_MAGIC: &[u8; 4] = b"FLR\0";
pub(crate) const CHUNK_HEADER_SIZE: usize = 68;

/// Event type id of constant pool events
const CONSTANT_POOL_EVENT_TYPE: i64 = 1;

/// Header feature bit for LEB128-compressed integers
const FEATURE_COMPRESSED_INTS: i32 = 1;

const MAX_REF_HOPS: usize = 8;

static NULL: Value = Value::Null;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub major: u16,
    pub minor: u16,
    pub size: i64,
    pub constant_pool_offset: i64,
    pub metadata_offset: i64,
    pub start_nanos: i64,
    pub duration_nanos: i64,
    pub start_ticks: i64,
    pub ticks_per_second: i64,
    pub features: i32,
}

impl ChunkHeader {
    /// Parse the header at the start of `data`
    ///
    /// # Errors
    /// * `DecodeError::Jfr` - short input or bad magic
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < CHUNK_HEADER_SIZE {
            return Err(invalid(format!(
                "chunk header truncated: {} of {} bytes",
                data.len(),
                CHUNK_HEADER_SIZE
            )));
        }
        if &data[0..4] != CHUNK_MAGIC {
            return Err(invalid("missing chunk magic"));
        }

        Ok(Self {
            major: BigEndian::read_u16(&data[4..6]),
            minor: BigEndian::read_u16(&data[6..8]),
            size: BigEndian::read_i64(&data[8..16]),
            constant_pool_offset: BigEndian::read_i64(&data[16..24]),
            metadata_offset: BigEndian::read_i64(&data[24..32]),
            start_nanos: BigEndian::read_i64(&data[32..40]),
            duration_nanos: BigEndian::read_i64(&data[40..48]),
            start_ticks: BigEndian::read_i64(&data[48..56]),
            ticks_per_second: BigEndian::read_i64(&data[56..64]),
            features: BigEndian::read_i32(&data[64..68]),
        })
    }

    pub fn compressed_ints(&self) -> bool {
        self.major >= 2 && self.features & FEATURE_COMPRESSED_INTS != 0
    }
}

/// One parsed chunk: its classes, pools and the events we interpret
#[derive(Debug)]
pub struct Chunk {
    pub header: ChunkHeader,
    registry: TypeRegistry,
    pools: HashMap<i64, HashMap<i64, Value>>,
    raw_events: Vec<Value>,
}

/// Split a recording into chunks and parse each
///
/// **Public** - entry point of the JFR binary layer
///
/// `rewrite_symbol` is applied to every `jdk.types.Symbol` string once all
/// pools of a chunk have been read.
///
/// # Errors
/// * `DecodeError::Jfr` - any framing, metadata or value error
pub fn parse_chunks(data: &[u8], rewrite_symbol: impl Fn(&str) -> String) -> Result<Vec<Chunk>> {
    let mut chunks = Vec::new();
    let mut offset = 0usize;

    while offset < data.len() {
        let header = ChunkHeader::parse(&data[offset..])?;
        let size = usize::try_from(header.size)
            .ok()
            .filter(|s| *s >= CHUNK_HEADER_SIZE && *s <= data.len() - offset)
            .ok_or_else(|| {
                invalid(format!(
                    "chunk at offset {} declares size {} with {} bytes remaining",
                    offset,
                    header.size,
                    data.len() - offset
                ))
            })?;

        let mut chunk = Chunk::parse(header, &data[offset..offset + size])?;
        chunk.rewrite_symbols(&rewrite_symbol);
        debug!(
            "Parsed JFR chunk {} ({} bytes, {} events)",
            chunks.len(),
            size,
            chunk.raw_events.len()
        );
        chunks.push(chunk);
        offset += size;
    }

    Ok(chunks)
}

impl Chunk {
    fn parse(header: ChunkHeader, data: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(data, header.compressed_ints());

        reader.seek(offset(header.metadata_offset, "metadata")?)?;
        let registry = read_metadata(&mut reader)?;

        let interesting: Vec<i64> = INTERPRETED_EVENTS
            .iter()
            .filter_map(|name| registry.id_of(name))
            .collect();

        let values = ValueReader::new(&registry);
        let mut pools: HashMap<i64, HashMap<i64, Value>> = HashMap::new();
        let mut raw_events = Vec::new();

        let mut position = CHUNK_HEADER_SIZE;
        while position < data.len() {
            reader.seek(position)?;
            let size = reader.int()?;
            let end = usize::try_from(size)
                .ok()
                .filter(|s| *s > 0)
                .and_then(|s| position.checked_add(s))
                .filter(|end| *end <= data.len())
                .ok_or_else(|| {
                    invalid(format!("invalid event size {} at offset {}", size, position))
                })?;

            match reader.long()? {
                METADATA_EVENT_TYPE => {}
                CONSTANT_POOL_EVENT_TYPE => read_constant_pools(&mut reader, &values, &mut pools)?,
                event_type if interesting.contains(&event_type) => {
                    raw_events.push(values.read(&mut reader, event_type)?);
                }
                _ => {}
            }
            position = end;
        }

        Ok(Chunk {
            header,
            registry,
            pools,
            raw_events,
        })
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Follow constant pool references; dangling ones read as null
    pub fn resolve<'a>(&'a self, value: &'a Value) -> &'a Value {
        let mut current = value;
        for _ in 0..MAX_REF_HOPS {
            match current {
                Value::Ref { class, index } => {
                    current = self
                        .pools
                        .get(class)
                        .and_then(|pool| pool.get(index))
                        .unwrap_or(&NULL);
                }
                _ => return current,
            }
        }
        &NULL
    }

    /// Resolved field of an object value
    pub fn field<'a>(&'a self, value: &'a Value, name: &str) -> Option<&'a Value> {
        let Value::Object { class, fields } = self.resolve(value) else {
            return None;
        };
        let index = self.registry.get(*class)?.field_index(name)?;
        fields.get(index).map(|v| self.resolve(v))
    }

    pub fn string_field<'a>(&'a self, value: &'a Value, name: &str) -> Option<&'a str> {
        self.field(value, name)?.as_str()
    }

    pub fn int_field(&self, value: &Value, name: &str) -> Option<i64> {
        self.field(value, name)?.as_int()
    }

    /// Interpreted events in stream order
    pub fn events(&self) -> Vec<JfrEvent> {
        self.raw_events
            .iter()
            .filter_map(|raw| JfrEvent::interpret(self, raw))
            .collect()
    }

    /// Class name of an object value
    pub(crate) fn class_name(&self, value: &Value) -> Option<&str> {
        match value {
            Value::Object { class, .. } => self.registry.get(*class).map(|c| c.name.as_str()),
            _ => None,
        }
    }

    fn rewrite_symbols(&mut self, rewrite: impl Fn(&str) -> String) {
        let Some(symbol_class) = self.registry.id_of("jdk.types.Symbol") else {
            return;
        };
        let Some(string_index) = self
            .registry
            .get(symbol_class)
            .and_then(|c| c.field_index("string"))
        else {
            return;
        };

        let updates: Vec<(i64, String)> = self
            .pools
            .get(&symbol_class)
            .into_iter()
            .flat_map(|pool| pool.iter())
            .filter_map(|(index, symbol)| {
                let Value::Object { fields, .. } = symbol else {
                    return None;
                };
                let text = self.resolve(fields.get(string_index)?).as_str()?;
                Some((*index, rewrite(text)))
            })
            .collect();

        let Some(pool) = self.pools.get_mut(&symbol_class) else {
            return;
        };
        for (index, text) in updates {
            if let Some(Value::Object { fields, .. }) = pool.get_mut(&index) {
                if let Some(slot) = fields.get_mut(string_index) {
                    *slot = Value::Str(text);
                }
            }
        }
    }
}

fn offset(raw: i64, what: &str) -> Result<usize> {
    usize::try_from(raw).map_err(|_| invalid(format!("negative {} offset {}", what, raw)))
}

fn read_constant_pools(
    reader: &mut Reader<'_>,
    values: &ValueReader<'_>,
    pools: &mut HashMap<i64, HashMap<i64, Value>>,
) -> Result<()> {
    let _start = reader.long()?;
    let _duration = reader.long()?;
    let _delta = reader.long()?;
    let _flush = reader.boolean()?;

    let count = reader.count()?;
    for _ in 0..count {
        let class_id = reader.long()?;
        values.class(class_id)?;
        let entries = reader.count()?;
        let pool = pools.entry(class_id).or_default();
        for _ in 0..entries {
            let index = reader.long()?;
            let value = values.read(reader, class_id)?;
            pool.insert(index, value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_rejects_bad_magic() {
        let data = [0u8; CHUNK_HEADER_SIZE];
        assert!(ChunkHeader::parse(&data).is_err());
        assert!(ChunkHeader::parse(b"FLR\0").is_err());
    }

    #[test]
    fn test_header_fields() {
        let mut data = Vec::from(&CHUNK_MAGIC[..]);
        data.extend_from_slice(&2u16.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());
        for v in [100i64, 80, 90, 1_000, 5, 0, 1_000_000_000] {
            data.extend_from_slice(&v.to_be_bytes());
        }
        data.extend_from_slice(&1i32.to_be_bytes());

        let header = ChunkHeader::parse(&data).unwrap();
        assert_eq!(header.major, 2);
        assert_eq!(header.size, 100);
        assert_eq!(header.metadata_offset, 90);
        assert_eq!(header.ticks_per_second, 1_000_000_000);
        assert!(header.compressed_ints());
    }

    #[test]
    fn test_chunk_size_past_end() {
        let mut data = Vec::from(&CHUNK_MAGIC[..]);
        data.extend_from_slice(&[0, 2, 0, 0]);
        data.extend_from_slice(&1_000i64.to_be_bytes());
        data.resize(CHUNK_HEADER_SIZE, 0);
        assert!(parse_chunks(&data, |s| s.to_string()).is_err());
    }
}
