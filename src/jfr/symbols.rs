//! Symbol normalization for JVM-generated names.
//!
//! Reflection accessors, lambda classes and extracted native libraries carry
//! counters or hashes in their names, so every run produces new symbols. The
//! table below folds them onto one stable name each. Rules run in order and
//! each sees the output of the previous one.

use once_cell::sync::Lazy;
use regex::Regex;

struct Rewrite {
    pattern: Regex,
    replacement: &'static str,
}

fn rule(pattern: &str, replacement: &'static str) -> Rewrite {
    Rewrite {
        pattern: Regex::new(pattern).expect("symbol rewrite pattern must compile"),
        replacement,
    }
}

static REWRITES: Lazy<Vec<Rewrite>> = Lazy::new(|| {
    vec![
        // jdk/internal/reflect/GeneratedMethodAccessor31
        rule(
            r"^(jdk/internal/reflect/GeneratedMethodAccessor)([0-9]+)$",
            "${1}_",
        ),
        // org/example/rideshare/OrderService$$Lambda$669.0x0000000800fd7318.run
        rule(r"^(.+\$\$Lambda\$)[0-9]+[./](0x[0-9a-f]+|[0-9]+)$", "${1}_"),
        // libzstd-jni-1.5.1-16931311898282279136.so
        rule(
            r"^(\.?/tmp/)?(libzstd-jni-[0-9]+\.[0-9]+\.[0-9]+-)([0-9]+)(\.so)( \(deleted\))?$",
            "libzstd-jni-_.so",
        ),
        // ./tmp/libamazonCorrettoCryptoProvider109b39cf33c563eb.so
        rule(
            r"^(\.?/tmp/)?(libamazonCorrettoCryptoProvider)([0-9a-f]{16})(\.so)( \(deleted\))?$",
            "libamazonCorrettoCryptoProvider_.so",
        ),
        // libasyncProfiler-linux-arm64-17b9a1d8156277a98ccc871afa9a8f69215f92.so
        rule(
            r"^(\.?/tmp/)?(libasyncProfiler)-(linux-arm64|linux-musl-x64|linux-x64|macos)-(17b9a1d8156277a98ccc871afa9a8f69215f92)(\.so)( \(deleted\))?$",
            "libasyncProfiler-_.so",
        ),
    ]
});

/// Fold a generated symbol onto its stable name
///
/// **Public** - applied to every `jdk.types.Symbol` before events are read
pub fn merge_jvm_generated_classes(symbol: &str) -> String {
    REWRITES.iter().fold(symbol.to_string(), |current, rewrite| {
        rewrite
            .pattern
            .replace_all(&current, rewrite.replacement)
            .into_owned()
    })
}
