//! Fixture builders shared by the integration tests.
//!
//! - `PprofBuilder` assembles pprof `Profile` messages
//! - `JfrChunkBuilder` writes minimal but well-formed JFR chunks
//! - `multipart_body` wraps fields in a `multipart/form-data` body

#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use profile_convert::jfr::{Context, LabelsSnapshot};
use profile_convert::pprof::proto::{Function, Label, Line, Location, Profile, Sample, ValueType};
use profile_convert::LogRecord;
use prost::Message;
use std::collections::HashMap;
use std::io::Write;

pub const BOUNDARY: &str = "----profileboundary";

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

pub fn multipart_body(fields: &[(&str, &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    for (name, content) in fields {
        out.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        out.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                name, name
            )
            .as_bytes(),
        );
        out.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        out.extend_from_slice(content);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    out
}

/// Records serialized and sorted, for order-insensitive comparison
pub fn sorted_json(records: &[LogRecord]) -> Vec<String> {
    let mut out: Vec<String> = records
        .iter()
        .map(|r| serde_json::to_string(r).unwrap())
        .collect();
    out.sort();
    out
}

/// Records whose `valueTypes` equals `value_type`
pub fn of_type<'a>(records: &'a [LogRecord], value_type: &str) -> Vec<&'a LogRecord> {
    records
        .iter()
        .filter(|r| r.get("valueTypes") == Some(value_type))
        .collect()
}

/// The record for a given leaf name and value type
pub fn find<'a>(records: &'a [LogRecord], name: &str, value_type: &str) -> &'a LogRecord {
    records
        .iter()
        .find(|r| r.get("name") == Some(name) && r.get("valueTypes") == Some(value_type))
        .unwrap_or_else(|| panic!("no {} record for {}", value_type, name))
}

pub fn labels_of(record: &LogRecord) -> HashMap<String, String> {
    serde_json::from_str(record.get("labels").unwrap()).unwrap()
}

// ---------------------------------------------------------------------------
// pprof
// ---------------------------------------------------------------------------

pub struct PprofBuilder {
    profile: Profile,
    strings: HashMap<String, i64>,
    locations: HashMap<String, u64>,
}

impl PprofBuilder {
    /// Start a profile declaring `(type, unit)` sample types
    pub fn new(sample_types: &[(&str, &str)]) -> Self {
        let mut builder = Self {
            profile: Profile::default(),
            strings: HashMap::new(),
            locations: HashMap::new(),
        };
        builder.string("");
        for (ty, unit) in sample_types {
            let vt = ValueType {
                r#type: builder.string(ty),
                unit: builder.string(unit),
            };
            builder.profile.sample_type.push(vt);
        }
        builder
    }

    pub fn string(&mut self, s: &str) -> i64 {
        if let Some(&index) = self.strings.get(s) {
            return index;
        }
        let index = self.profile.string_table.len() as i64;
        self.profile.string_table.push(s.to_string());
        self.strings.insert(s.to_string(), index);
        index
    }

    fn location(&mut self, function: &str) -> u64 {
        if let Some(&id) = self.locations.get(function) {
            return id;
        }
        let id = self.locations.len() as u64 + 1;
        let name = self.string(function);
        self.profile.function.push(Function {
            id,
            name,
            ..Default::default()
        });
        self.profile.location.push(Location {
            id,
            line: vec![Line {
                function_id: id,
                line: 0,
            }],
            ..Default::default()
        });
        self.locations.insert(function.to_string(), id);
        id
    }

    /// Add a sample; `stack` is leaf first, as pprof stores it
    pub fn sample(&mut self, stack: &[&str], values: &[i64], labels: &[(&str, &str)]) -> &mut Self {
        let location_id = stack.iter().map(|f| self.location(f)).collect();
        let label = labels
            .iter()
            .map(|(k, v)| Label {
                key: self.string(k),
                str: self.string(v),
                ..Default::default()
            })
            .collect();
        self.profile.sample.push(Sample {
            location_id,
            value: values.to_vec(),
            label,
        });
        self
    }

    pub fn window(&mut self, time_nanos: i64, duration_nanos: i64) -> &mut Self {
        self.profile.time_nanos = time_nanos;
        self.profile.duration_nanos = duration_nanos;
        self
    }

    pub fn build(&self) -> Profile {
        self.profile.clone()
    }

    pub fn encode(&self) -> Vec<u8> {
        self.profile.encode_to_vec()
    }

    pub fn gzip(&self) -> Vec<u8> {
        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        gz.write_all(&self.encode()).unwrap();
        gz.finish().unwrap()
    }
}

// ---------------------------------------------------------------------------
// JFR
// ---------------------------------------------------------------------------

const T_LONG: u64 = 10;
const T_INT: u64 = 11;
const T_BOOLEAN: u64 = 12;
const T_STRING: u64 = 13;
const T_SYMBOL: u64 = 20;
const T_CLASS: u64 = 21;
const T_METHOD: u64 = 22;
const T_STACK_FRAME: u64 = 23;
const T_STACK_TRACE: u64 = 24;
const T_THREAD_STATE: u64 = 25;
const T_EXECUTION_SAMPLE: u64 = 30;
const T_ALLOC_IN_TLAB: u64 = 31;
const T_ALLOC_OUTSIDE_TLAB: u64 = 32;
const T_MONITOR_ENTER: u64 = 33;
const T_THREAD_PARK: u64 = 34;
const T_ACTIVE_SETTING: u64 = 35;
const T_HEAP_SUMMARY: u64 = 36;

fn varint(out: &mut Vec<u8>, mut v: u64) {
    loop {
        let b = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            out.push(b);
            return;
        }
        out.push(b | 0x80);
    }
}

fn varint_len(v: u64) -> usize {
    let mut out = Vec::new();
    varint(&mut out, v);
    out.len()
}

fn utf8(out: &mut Vec<u8>, s: &str) {
    out.push(3);
    varint(out, s.len() as u64);
    out.extend_from_slice(s.as_bytes());
}

/// Prefix an event body with its self-inclusive size
fn event(type_id: u64, body: &[u8]) -> Vec<u8> {
    let mut payload = Vec::new();
    varint(&mut payload, type_id);
    payload.extend_from_slice(body);

    let mut n = 1;
    while varint_len((payload.len() + n) as u64) != n {
        n += 1;
    }
    let mut out = Vec::new();
    varint(&mut out, (payload.len() + n) as u64);
    out.extend_from_slice(&payload);
    out
}

struct Element {
    name: &'static str,
    attributes: Vec<(&'static str, String)>,
    children: Vec<Element>,
}

fn element(name: &'static str, attributes: Vec<(&'static str, String)>, children: Vec<Element>) -> Element {
    Element {
        name,
        attributes,
        children,
    }
}

/// `(field name, class id, constant pool, array)`
type FieldSpec = (&'static str, u64, bool, bool);

fn class(id: u64, name: &str, fields: &[FieldSpec]) -> Element {
    let fields = fields
        .iter()
        .map(|(field, class_id, cp, array)| {
            let mut attributes = vec![("name", field.to_string()), ("class", class_id.to_string())];
            if *cp {
                attributes.push(("constantPool", "true".to_string()));
            }
            if *array {
                attributes.push(("dimension", "1".to_string()));
            }
            element("field", attributes, Vec::new())
        })
        .collect();
    element(
        "class",
        vec![("id", id.to_string()), ("name", name.to_string())],
        fields,
    )
}

fn class_definitions() -> Vec<Element> {
    vec![
        class(T_LONG, "long", &[]),
        class(T_INT, "int", &[]),
        class(T_BOOLEAN, "boolean", &[]),
        class(T_STRING, "java.lang.String", &[]),
        class(T_SYMBOL, "jdk.types.Symbol", &[("string", T_STRING, false, false)]),
        class(T_CLASS, "java.lang.Class", &[("name", T_SYMBOL, true, false)]),
        class(
            T_METHOD,
            "jdk.types.Method",
            &[("type", T_CLASS, true, false), ("name", T_SYMBOL, true, false)],
        ),
        class(
            T_STACK_FRAME,
            "jdk.types.StackFrame",
            &[("method", T_METHOD, true, false), ("lineNumber", T_INT, false, false)],
        ),
        class(
            T_STACK_TRACE,
            "jdk.types.StackTrace",
            &[
                ("truncated", T_BOOLEAN, false, false),
                ("frames", T_STACK_FRAME, false, true),
            ],
        ),
        class(T_THREAD_STATE, "jdk.types.ThreadState", &[("name", T_STRING, false, false)]),
        class(
            T_EXECUTION_SAMPLE,
            "jdk.ExecutionSample",
            &[
                ("startTime", T_LONG, false, false),
                ("stackTrace", T_STACK_TRACE, true, false),
                ("state", T_THREAD_STATE, true, false),
                ("contextId", T_LONG, false, false),
            ],
        ),
        class(
            T_ALLOC_IN_TLAB,
            "jdk.ObjectAllocationInNewTLAB",
            &[
                ("startTime", T_LONG, false, false),
                ("stackTrace", T_STACK_TRACE, true, false),
                ("tlabSize", T_LONG, false, false),
                ("contextId", T_LONG, false, false),
            ],
        ),
        class(
            T_ALLOC_OUTSIDE_TLAB,
            "jdk.ObjectAllocationOutsideTLAB",
            &[
                ("startTime", T_LONG, false, false),
                ("stackTrace", T_STACK_TRACE, true, false),
                ("allocationSize", T_LONG, false, false),
                ("contextId", T_LONG, false, false),
            ],
        ),
        class(
            T_MONITOR_ENTER,
            "jdk.JavaMonitorEnter",
            &[
                ("startTime", T_LONG, false, false),
                ("duration", T_LONG, false, false),
                ("stackTrace", T_STACK_TRACE, true, false),
                ("contextId", T_LONG, false, false),
            ],
        ),
        class(
            T_THREAD_PARK,
            "jdk.ThreadPark",
            &[
                ("startTime", T_LONG, false, false),
                ("duration", T_LONG, false, false),
                ("stackTrace", T_STACK_TRACE, true, false),
                ("contextId", T_LONG, false, false),
            ],
        ),
        class(
            T_ACTIVE_SETTING,
            "jdk.ActiveSetting",
            &[
                ("startTime", T_LONG, false, false),
                ("id", T_LONG, false, false),
                ("name", T_STRING, false, false),
                ("value", T_STRING, false, false),
            ],
        ),
        class(
            T_HEAP_SUMMARY,
            "jdk.GCHeapSummary",
            &[("startTime", T_LONG, false, false), ("heapUsed", T_LONG, false, false)],
        ),
    ]
}

#[derive(Default)]
struct Interner {
    strings: Vec<String>,
    index: HashMap<String, u64>,
}

impl Interner {
    fn get(&mut self, s: &str) -> u64 {
        if let Some(&i) = self.index.get(s) {
            return i;
        }
        let i = self.strings.len() as u64;
        self.strings.push(s.to_string());
        self.index.insert(s.to_string(), i);
        i
    }
}

fn encode_element(el: &Element, strings: &mut Interner, out: &mut Vec<u8>) {
    varint(out, strings.get(el.name));
    varint(out, el.attributes.len() as u64);
    for (k, v) in &el.attributes {
        varint(out, strings.get(k));
        varint(out, strings.get(v));
    }
    varint(out, el.children.len() as u64);
    for child in &el.children {
        encode_element(child, strings, out);
    }
}

fn metadata_event() -> Vec<u8> {
    let root = element(
        "root",
        Vec::new(),
        vec![
            element("metadata", Vec::new(), class_definitions()),
            element("region", vec![("locale", "en_US".to_string())], Vec::new()),
        ],
    );

    let mut strings = Interner::default();
    let mut tree = Vec::new();
    encode_element(&root, &mut strings, &mut tree);

    let mut body = Vec::new();
    varint(&mut body, 0); // start
    varint(&mut body, 0); // duration
    varint(&mut body, 1); // metadata id
    varint(&mut body, strings.strings.len() as u64);
    for s in &strings.strings {
        utf8(&mut body, s);
    }
    body.extend_from_slice(&tree);
    event(0, &body)
}

/// Writes one JFR chunk with compressed integers
///
/// Class and method names are interned as symbols. A frame written as
/// `pkg/Class.method` resolves normally; a frame without a `.` gets a
/// dangling class reference and is dropped by the decoder.
#[derive(Default)]
pub struct JfrChunkBuilder {
    symbols: Vec<String>,
    classes: Vec<u64>,
    methods: Vec<(u64, u64)>,
    stack_traces: Vec<Vec<u64>>,
    states: Vec<String>,
    events: Vec<u8>,
    start_nanos: i64,
}

impl JfrChunkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_nanos(&mut self, nanos: i64) -> &mut Self {
        self.start_nanos = nanos;
        self
    }

    fn symbol(&mut self, s: &str) -> u64 {
        if let Some(i) = self.symbols.iter().position(|x| x == s) {
            return i as u64 + 1;
        }
        self.symbols.push(s.to_string());
        self.symbols.len() as u64
    }

    fn class(&mut self, name: &str) -> u64 {
        let symbol = self.symbol(name);
        if let Some(i) = self.classes.iter().position(|&x| x == symbol) {
            return i as u64 + 1;
        }
        self.classes.push(symbol);
        self.classes.len() as u64
    }

    fn method(&mut self, frame: &str) -> u64 {
        let key = match frame.rsplit_once('.') {
            Some((class, method)) => (self.class(class), self.symbol(method)),
            None => (0, self.symbol(frame)),
        };
        if let Some(i) = self.methods.iter().position(|&m| m == key) {
            return i as u64 + 1;
        }
        self.methods.push(key);
        self.methods.len() as u64
    }

    /// Intern a stack trace; `frames` is leaf first, as JFR records it
    fn stack(&mut self, frames: &[&str]) -> u64 {
        let methods: Vec<u64> = frames.iter().map(|f| self.method(f)).collect();
        self.stack_traces.push(methods);
        self.stack_traces.len() as u64
    }

    fn state(&mut self, name: &str) -> u64 {
        if let Some(i) = self.states.iter().position(|x| x == name) {
            return i as u64 + 1;
        }
        self.states.push(name.to_string());
        self.states.len() as u64
    }

    fn push_event(&mut self, type_id: u64, fields: &[u64]) -> &mut Self {
        let mut body = Vec::new();
        for &f in fields {
            varint(&mut body, f);
        }
        self.events.extend_from_slice(&event(type_id, &body));
        self
    }

    pub fn execution_sample(&mut self, stack: &[&str], state: &str, context_id: u64) -> &mut Self {
        let stack = self.stack(stack);
        let state = self.state(state);
        self.push_event(T_EXECUTION_SAMPLE, &[0, stack, state, context_id])
    }

    pub fn alloc_in_new_tlab(&mut self, stack: &[&str], tlab_size: u64, context_id: u64) -> &mut Self {
        let stack = self.stack(stack);
        self.push_event(T_ALLOC_IN_TLAB, &[0, stack, tlab_size, context_id])
    }

    pub fn alloc_outside_tlab(&mut self, stack: &[&str], size: u64, context_id: u64) -> &mut Self {
        let stack = self.stack(stack);
        self.push_event(T_ALLOC_OUTSIDE_TLAB, &[0, stack, size, context_id])
    }

    pub fn monitor_enter(&mut self, stack: &[&str], duration: u64, context_id: u64) -> &mut Self {
        let stack = self.stack(stack);
        self.push_event(T_MONITOR_ENTER, &[0, duration, stack, context_id])
    }

    pub fn thread_park(&mut self, stack: &[&str], duration: u64, context_id: u64) -> &mut Self {
        let stack = self.stack(stack);
        self.push_event(T_THREAD_PARK, &[0, duration, stack, context_id])
    }

    pub fn active_setting(&mut self, name: &str, value: &str) -> &mut Self {
        let mut body = Vec::new();
        varint(&mut body, 0);
        varint(&mut body, 1);
        utf8(&mut body, name);
        utf8(&mut body, value);
        self.events
            .extend_from_slice(&event(T_ACTIVE_SETTING, &body));
        self
    }

    /// An event type the decoder does not interpret
    pub fn heap_summary(&mut self, heap_used: u64) -> &mut Self {
        self.push_event(T_HEAP_SUMMARY, &[0, heap_used])
    }

    fn constant_pool_event(&self) -> Vec<u8> {
        let mut body = Vec::new();
        varint(&mut body, 0); // start
        varint(&mut body, 0); // duration
        varint(&mut body, 0); // delta
        body.push(0); // flush
        varint(&mut body, 5);

        varint(&mut body, T_SYMBOL);
        varint(&mut body, self.symbols.len() as u64);
        for (i, s) in self.symbols.iter().enumerate() {
            varint(&mut body, i as u64 + 1);
            utf8(&mut body, s);
        }

        varint(&mut body, T_CLASS);
        varint(&mut body, self.classes.len() as u64);
        for (i, symbol) in self.classes.iter().enumerate() {
            varint(&mut body, i as u64 + 1);
            varint(&mut body, *symbol);
        }

        varint(&mut body, T_METHOD);
        varint(&mut body, self.methods.len() as u64);
        for (i, (class, name)) in self.methods.iter().enumerate() {
            varint(&mut body, i as u64 + 1);
            varint(&mut body, *class);
            varint(&mut body, *name);
        }

        varint(&mut body, T_STACK_TRACE);
        varint(&mut body, self.stack_traces.len() as u64);
        for (i, methods) in self.stack_traces.iter().enumerate() {
            varint(&mut body, i as u64 + 1);
            body.push(0); // truncated
            varint(&mut body, methods.len() as u64);
            for method in methods {
                varint(&mut body, *method);
                varint(&mut body, 0); // line number
            }
        }

        varint(&mut body, T_THREAD_STATE);
        varint(&mut body, self.states.len() as u64);
        for (i, name) in self.states.iter().enumerate() {
            varint(&mut body, i as u64 + 1);
            utf8(&mut body, name);
        }

        event(1, &body)
    }

    /// Assemble header, events, constant pool and metadata
    pub fn build(&self) -> Vec<u8> {
        let cpool = self.constant_pool_event();
        let metadata = metadata_event();

        let cpool_offset = 68 + self.events.len();
        let metadata_offset = cpool_offset + cpool.len();
        let size = metadata_offset + metadata.len();

        let mut out = Vec::with_capacity(size);
        out.extend_from_slice(b"FLR\0");
        out.extend_from_slice(&2u16.to_be_bytes());
        out.extend_from_slice(&1u16.to_be_bytes());
        out.extend_from_slice(&(size as i64).to_be_bytes());
        out.extend_from_slice(&(cpool_offset as i64).to_be_bytes());
        out.extend_from_slice(&(metadata_offset as i64).to_be_bytes());
        out.extend_from_slice(&self.start_nanos.to_be_bytes());
        out.extend_from_slice(&10_000_000_000i64.to_be_bytes());
        out.extend_from_slice(&0i64.to_be_bytes());
        out.extend_from_slice(&1_000_000_000i64.to_be_bytes());
        out.extend_from_slice(&1i32.to_be_bytes());
        assert_eq!(out.len(), 68);

        out.extend_from_slice(&self.events);
        out.extend_from_slice(&cpool);
        out.extend_from_slice(&metadata);
        out
    }
}

fn intern(snapshot: &mut LabelsSnapshot, s: &str) -> i64 {
    if let Some((&id, _)) = snapshot.strings.iter().find(|(_, v)| v.as_str() == s) {
        return id;
    }
    let id = snapshot.strings.len() as i64 + 1;
    snapshot.strings.insert(id, s.to_string());
    id
}

/// Snapshot with `contexts[id] = [(key, value), ...]`, strings interned
pub fn labels_snapshot(contexts: &[(i64, &[(&str, &str)])]) -> LabelsSnapshot {
    let mut snapshot = LabelsSnapshot::default();
    for (context_id, labels) in contexts {
        let mut context = Context::default();
        for (k, v) in labels.iter() {
            let key = intern(&mut snapshot, k);
            let value = intern(&mut snapshot, v);
            context.labels.insert(key, value);
        }
        snapshot.contexts.insert(*context_id, context);
    }
    snapshot
}
