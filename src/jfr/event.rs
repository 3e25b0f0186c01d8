//! Typed view of the events the decoder folds.

use super::chunk::Chunk;
use super::value::Value;
use log::debug;

pub(crate) const EXECUTION_SAMPLE: &str = "jdk.ExecutionSample";
pub(crate) const ALLOCATION_IN_NEW_TLAB: &str = "jdk.ObjectAllocationInNewTLAB";
pub(crate) const ALLOCATION_OUTSIDE_TLAB: &str = "jdk.ObjectAllocationOutsideTLAB";
pub(crate) const JAVA_MONITOR_ENTER: &str = "jdk.JavaMonitorEnter";
pub(crate) const THREAD_PARK: &str = "jdk.ThreadPark";
pub(crate) const ACTIVE_SETTING: &str = "jdk.ActiveSetting";

/// Event classes read from the stream; everything else is skipped by size
pub(crate) const INTERPRETED_EVENTS: [&str; 6] = [
    EXECUTION_SAMPLE,
    ALLOCATION_IN_NEW_TLAB,
    ALLOCATION_OUTSIDE_TLAB,
    JAVA_MONITOR_ENTER,
    THREAD_PARK,
    ACTIVE_SETTING,
];

/// One stack frame; either part may be missing from the recording
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    pub class_name: Option<String>,
    pub method_name: Option<String>,
}

impl Frame {
    /// `<class>.<method>`, or `None` when either symbol is missing
    pub fn name(&self) -> Option<String> {
        match (&self.class_name, &self.method_name) {
            (Some(class), Some(method)) => Some(format!("{}.{}", class, method)),
            _ => None,
        }
    }
}

/// Frames as recorded, innermost first
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StackTrace {
    pub frames: Vec<Frame>,
}

impl StackTrace {
    /// Named frames from the outermost caller to the leaf
    pub fn root_first(&self) -> Vec<String> {
        let names: Vec<String> = self.frames.iter().rev().filter_map(Frame::name).collect();
        let dropped = self.frames.len() - names.len();
        if dropped > 0 {
            debug!("Dropped {} frames without class or method symbol", dropped);
        }
        names
    }
}

/// The closed set of events the decoder understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JfrEvent {
    ExecutionSample {
        context_id: i64,
        stack_trace: Option<StackTrace>,
        state: Option<String>,
    },
    ObjectAllocationInNewTlab {
        context_id: i64,
        stack_trace: Option<StackTrace>,
        tlab_size: i64,
    },
    ObjectAllocationOutsideTlab {
        context_id: i64,
        stack_trace: Option<StackTrace>,
        allocation_size: i64,
    },
    JavaMonitorEnter {
        context_id: i64,
        stack_trace: Option<StackTrace>,
        duration: i64,
    },
    ThreadPark {
        context_id: i64,
        stack_trace: Option<StackTrace>,
        duration: i64,
    },
    ActiveSetting {
        name: String,
        value: String,
    },
}

impl JfrEvent {
    /// Execution context of a sampling event; settings have none
    pub fn context_id(&self) -> Option<i64> {
        match self {
            JfrEvent::ExecutionSample { context_id, .. }
            | JfrEvent::ObjectAllocationInNewTlab { context_id, .. }
            | JfrEvent::ObjectAllocationOutsideTlab { context_id, .. }
            | JfrEvent::JavaMonitorEnter { context_id, .. }
            | JfrEvent::ThreadPark { context_id, .. } => Some(*context_id),
            JfrEvent::ActiveSetting { .. } => None,
        }
    }

    /// Build the typed event from a raw object read from `chunk`
    pub(crate) fn interpret(chunk: &Chunk, raw: &Value) -> Option<JfrEvent> {
        let context_id = || chunk.int_field(raw, "contextId").unwrap_or(0);
        let stack_trace = || read_stack_trace(chunk, raw);
        let int = |name: &str| chunk.int_field(raw, name).unwrap_or(0);

        let event = match chunk.class_name(raw)? {
            EXECUTION_SAMPLE => JfrEvent::ExecutionSample {
                context_id: context_id(),
                stack_trace: stack_trace(),
                state: chunk
                    .field(raw, "state")
                    .and_then(|state| chunk.string_field(state, "name"))
                    .map(str::to_string),
            },
            ALLOCATION_IN_NEW_TLAB => JfrEvent::ObjectAllocationInNewTlab {
                context_id: context_id(),
                stack_trace: stack_trace(),
                tlab_size: int("tlabSize"),
            },
            ALLOCATION_OUTSIDE_TLAB => JfrEvent::ObjectAllocationOutsideTlab {
                context_id: context_id(),
                stack_trace: stack_trace(),
                allocation_size: int("allocationSize"),
            },
            JAVA_MONITOR_ENTER => JfrEvent::JavaMonitorEnter {
                context_id: context_id(),
                stack_trace: stack_trace(),
                duration: int("duration"),
            },
            THREAD_PARK => JfrEvent::ThreadPark {
                context_id: context_id(),
                stack_trace: stack_trace(),
                duration: int("duration"),
            },
            ACTIVE_SETTING => JfrEvent::ActiveSetting {
                name: chunk.string_field(raw, "name").unwrap_or_default().to_string(),
                value: chunk.string_field(raw, "value").unwrap_or_default().to_string(),
            },
            _ => return None,
        };
        Some(event)
    }
}

fn read_stack_trace(chunk: &Chunk, raw: &Value) -> Option<StackTrace> {
    let Value::Array(items) = chunk.field(chunk.field(raw, "stackTrace")?, "frames")? else {
        return None;
    };

    let frames = items
        .iter()
        .map(|item| {
            let method = chunk.field(item, "method");
            Frame {
                class_name: symbol_name(chunk, method.and_then(|m| chunk.field(m, "type"))),
                method_name: symbol_name(chunk, method),
            }
        })
        .collect();

    Some(StackTrace { frames })
}

/// The `name` symbol of a class or method
fn symbol_name(chunk: &Chunk, owner: Option<&Value>) -> Option<String> {
    let symbol = chunk.field(owner?, "name")?;
    chunk.string_field(symbol, "string").map(str::to_string)
}
