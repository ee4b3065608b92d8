//! Format parsed [`Data`] trees for display (debug output, test failure
//! context).

use crate::value::Data;
use std::fmt::Write;

/// Longest payload rendered in full before eliding.
const MAX_DUMP_BYTES: usize = 32;

/// Render a `Data` tree as indented text, one node per line, payloads in hex.
pub fn dump_data(data: &Data) -> String {
    let mut out = String::new();
    dump_node(data, 0, &mut out);
    out
}

fn dump_node(data: &Data, depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    match data {
        Data::Empty => out.push_str("empty\n"),
        Data::Stop(spec, value) => {
            let _ = writeln!(out, "stop at {} (selector {:#x})", spec, value);
        }
        Data::Integer(value) => {
            let _ = writeln!(out, "int {:#x} ({})", value, value);
        }
        Data::Bytes(view) => {
            let _ = write!(out, "bytes[{}]", view.len());
            for byte in view.iter().take(MAX_DUMP_BYTES) {
                let _ = write!(out, " {:02x}", byte);
            }
            if view.len() > MAX_DUMP_BYTES {
                let _ = write!(out, " .. (+{} more)", view.len() - MAX_DUMP_BYTES);
            }
            out.push('\n');
        }
        Data::Seq(items) => {
            let _ = writeln!(out, "seq[{}]", items.len());
            for item in items {
                dump_node(item, depth + 1, out);
            }
        }
    }
}
