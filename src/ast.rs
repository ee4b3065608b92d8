//! Spec trees: the parsing directives a format is made of.
//!
//! A [`Spec`] can be built programmatically from these constructors or
//! compiled from a spec-string (see [`compile`](crate::parser::compile));
//! both entry points produce identical trees. Equality is structural, which
//! makes specs directly comparable in tests and usable as cache keys.

use crate::int::IntSpec;
use std::collections::BTreeMap;
use std::fmt;

/// One parsing directive. Recursive arms are boxed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Spec {
    /// Consume and discard n bytes; encode as n zero bytes.
    Skip(usize),
    /// Halt the enclosing structure (see the parser's stop semantics).
    Stop,
    /// A fixed-width unsigned integer.
    Integer(IntSpec),
    /// Like `Integer`, but the decoded value plus the offset (wrapping) is
    /// recorded in the variable environment under the given name, where later
    /// siblings and descendants can use it as a length, count, or selector.
    Variable(IntSpec, String, i64),
    /// Raw payload. Length is the named variable's value, or, when unnamed,
    /// all bytes remaining in the current budget.
    Bytes(Option<String>),
    /// Ordered composition.
    Seq(Vec<Spec>),
    /// Budget-bounded repetition: carve `vars[name]` bytes (or everything
    /// remaining) into a sub-stream and parse the inner spec against it as
    /// many complete times as fit. Leftover budget bytes are consumed.
    Until(Option<String>, Box<Spec>),
    /// Count-bounded repetition: parse the inner spec exactly `vars[name]`
    /// times.
    Repeat(String, Box<Spec>),
    /// Dispatch on `vars[selector]`. An absent case falls through to
    /// `default`, which is `Stop` unless a `*=` case was given.
    Switch {
        selector: String,
        cases: BTreeMap<u64, Spec>,
        default: Box<Spec>,
    },
}

impl Spec {
    pub fn variable(spec: IntSpec, name: &str, offset: i64) -> Spec {
        Spec::Variable(spec, name.to_owned(), offset)
    }

    pub fn bytes(name: Option<&str>) -> Spec {
        Spec::Bytes(name.map(str::to_owned))
    }

    pub fn until(name: Option<&str>, inner: Spec) -> Spec {
        Spec::Until(name.map(str::to_owned), Box::new(inner))
    }

    pub fn repeat(name: &str, inner: Spec) -> Spec {
        Spec::Repeat(name.to_owned(), Box::new(inner))
    }

    pub fn switch(
        selector: &str,
        cases: impl IntoIterator<Item = (u64, Spec)>,
        default: Spec,
    ) -> Spec {
        Spec::Switch {
            selector: selector.to_owned(),
            cases: cases.into_iter().collect(),
            default: Box::new(default),
        }
    }

    /// Flatten a directive list: empty becomes `Skip(0)`, a single element
    /// stands alone, anything longer becomes a `Seq`.
    pub fn combine(mut specs: Vec<Spec>) -> Spec {
        match specs.len() {
            0 => Spec::Skip(0),
            1 => specs.remove(0),
            _ => Spec::Seq(specs),
        }
    }
}

impl fmt::Display for Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Spec::Skip(n) => write!(f, "skip({n})"),
            Spec::Stop => f.write_str("stop"),
            Spec::Integer(spec) => write!(f, "{spec}"),
            Spec::Variable(spec, name, 0) => write!(f, "%{name}:{spec}"),
            Spec::Variable(spec, name, offset) => {
                write!(f, "%{name}:{spec}{offset:+}")
            }
            Spec::Bytes(Some(name)) => write!(f, "bytes(%{name})"),
            Spec::Bytes(None) => f.write_str("bytes(*)"),
            Spec::Seq(specs) => {
                f.write_str("(")?;
                for (i, spec) in specs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{spec}")?;
                }
                f.write_str(")")
            }
            Spec::Until(name, inner) => match name {
                Some(name) => write!(f, "until(%{name}, {inner})"),
                None => write!(f, "until(*, {inner})"),
            },
            Spec::Repeat(name, inner) => write!(f, "repeat(%{name}, {inner})"),
            Spec::Switch {
                selector,
                cases,
                default,
            } => {
                write!(f, "switch(%{selector}")?;
                for (value, spec) in cases {
                    write!(f, ", {value:#x} => {spec}")?;
                }
                write!(f, ", _ => {default})")
            }
        }
    }
}
