//! Frame name formatting per source language.
//!
//! Agents disagree on whether a frame reads "function position" or
//! "position function". We normalize to the order the language's tooling
//! expects, e.g.:
//!
//! - go: `compress/flate.NewWriter /usr/local/go/src/compress/flate/deflate.go`
//! - python: `lib/utility/utility.py:38 - find_nearest_vehicle`
//! - ruby: `/usr/local/bundle/gems/pyroscope-0.3.0/lib/pyroscope.rb:63 - tag_wrapper`

/// Which half of a frame comes first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SequenceType {
    PosFirst,
    FunctionFirst,
}

fn sequence_for(spy_name: &str) -> Option<SequenceType> {
    match spy_name {
        "rs" | "rb" | "py" | "php" => Some(SequenceType::PosFirst),
        "node" | "go" | "dotnet" | "java" | "ebpf" | "unknown" => {
            Some(SequenceType::FunctionFirst)
        }
        _ => None,
    }
}

/// Reorder a single frame for the given spy
///
/// **Public** - applied to every displayed frame
///
/// Frames without a space carry no position and are returned trimmed.
pub fn format_position_and_name(frame: &str, spy_name: &str) -> String {
    let frame = frame.trim();
    let (Some(first), Some(last)) = (frame.find(' '), frame.rfind(' ')) else {
        return frame.to_string();
    };

    let name = &frame[..first];
    let pos = &frame[last + 1..];

    match sequence_for(spy_name) {
        Some(SequenceType::PosFirst) => join(pos, name),
        Some(SequenceType::FunctionFirst) => join(name, pos),
        None => frame.to_string(),
    }
}

/// Reorder every frame of a stack
pub fn format_position_and_names<S: AsRef<str>>(frames: &[S], spy_name: &str) -> Vec<String> {
    frames
        .iter()
        .map(|f| format_position_and_name(f.as_ref(), spy_name))
        .collect()
}

fn join(first: &str, second: &str) -> String {
    let mut s = String::with_capacity(first.len() + second.len() + 1);
    s.push_str(first);
    s.push(' ');
    s.push_str(second);
    s
}
