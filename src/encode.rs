//! Encode [`Data`] trees back to bytes, back-patching auto-sized variables.
//!
//! The encoder walks spec and data in lockstep, appending to one buffer. A
//! `Variable` emits its bytes before the fields that determine its value, so
//! every emission's byte offset is recorded; when a later payload, budget, or
//! repetition resolves an [`AUTO`] placeholder, the recorded location is
//! patched in place with the real value (minus the variable's offset, so the
//! caller's offset convention round-trips).

use crate::ast::Spec;
use crate::int::{append_int, write_int, IntSpec};
use crate::value::{Data, AUTO};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("cannot encode {data} against {spec}")]
    ShapeMismatch { spec: String, data: String },
    #[error("sequence length mismatch: spec has {expected} elements, data has {actual}")]
    SeqLength { expected: usize, actual: usize },
    #[error("variable {name:?} holds {declared} but the data supplies {actual}")]
    ValueMismatch {
        name: String,
        declared: u64,
        actual: u64,
    },
    #[error("variable {0:?} referenced before declaration")]
    Undeclared(String),
    #[error("variable {0:?} cannot be auto-sized from an enclosing scope")]
    AutoOutOfScope(String),
    #[error("switch selector {0:?} is still unresolved")]
    AutoSelector(String),
    #[error("cannot encode a halted structure")]
    Halted,
}

/// Where and how a variable was emitted, and what it currently holds.
#[derive(Clone, Copy)]
struct VarInfo {
    /// Byte offset of the emission in the buffer under construction; `None`
    /// for variables inherited from an enclosing scope, whose bytes live in a
    /// different buffer and cannot be patched from here.
    location: Option<usize>,
    spec: IntSpec,
    offset: i64,
    value: u64,
}

/// Encoder for one `Spec`. Stateless across calls; each `encode` keeps its
/// own variable table.
pub struct Encoder {
    spec: Spec,
}

impl Encoder {
    pub fn new(spec: Spec) -> Self {
        Encoder { spec }
    }

    pub fn spec(&self) -> &Spec {
        &self.spec
    }

    /// Serialize a conforming `Data` tree. Shape mismatches are contract
    /// violations and come back as errors, not partial output.
    pub fn encode(&self, data: &Data) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::new();
        let mut vars = HashMap::new();
        encode_spec(&self.spec, data, &mut out, &mut vars)?;
        Ok(out)
    }
}

fn encode_spec(
    spec: &Spec,
    data: &Data,
    out: &mut Vec<u8>,
    vars: &mut HashMap<String, VarInfo>,
) -> Result<(), EncodeError> {
    match (spec, data) {
        (Spec::Skip(n), Data::Empty) => {
            out.resize(out.len() + n, 0);
        }
        (Spec::Integer(ispec), Data::Integer(value)) => {
            append_int(*value, *ispec, out);
        }
        (Spec::Variable(ispec, name, offset), Data::Integer(value)) => {
            vars.insert(
                name.clone(),
                VarInfo {
                    location: Some(out.len()),
                    spec: *ispec,
                    offset: *offset,
                    value: *value,
                },
            );
            // An AUTO placeholder is emitted as-is and patched on first use.
            append_int(value.wrapping_sub(*offset as u64), *ispec, out);
        }
        (Spec::Bytes(name), Data::Bytes(view)) => {
            if let Some(name) = name {
                let info = vars
                    .get_mut(name)
                    .ok_or_else(|| EncodeError::Undeclared(name.clone()))?;
                if info.value == AUTO {
                    info.value = view.len() as u64;
                    let info = *info;
                    patch(name, &info, out)?;
                } else if info.value != view.len() as u64 {
                    return Err(EncodeError::ValueMismatch {
                        name: name.clone(),
                        declared: info.value,
                        actual: view.len() as u64,
                    });
                }
            }
            view.extend_into(out);
        }
        (Spec::Seq(specs), Data::Seq(items)) => {
            if specs.len() != items.len() {
                return Err(EncodeError::SeqLength {
                    expected: specs.len(),
                    actual: items.len(),
                });
            }
            for (spec, item) in specs.iter().zip(items) {
                encode_spec(spec, item, out, vars)?;
            }
        }
        (Spec::Until(name, inner), Data::Seq(items)) => {
            // Items are encoded into their own buffer first: the total length
            // may need to resolve an AUTO budget, or be padded to a fixed one.
            let inherited: HashMap<String, VarInfo> = vars
                .iter()
                .map(|(name, info)| {
                    (
                        name.clone(),
                        VarInfo {
                            location: None,
                            ..*info
                        },
                    )
                })
                .collect();
            let mut sub = Vec::new();
            for item in items {
                let mut sub_vars = inherited.clone();
                encode_spec(inner, item, &mut sub, &mut sub_vars)?;
            }
            if let Some(name) = name {
                let info = vars
                    .get_mut(name)
                    .ok_or_else(|| EncodeError::Undeclared(name.clone()))?;
                if info.value == AUTO {
                    info.value = sub.len() as u64;
                    let info = *info;
                    patch(name, &info, out)?;
                } else {
                    sub.resize(info.value as usize, 0);
                }
            }
            out.extend_from_slice(&sub);
        }
        (Spec::Repeat(name, inner), Data::Seq(items)) => {
            let info = vars
                .get_mut(name)
                .ok_or_else(|| EncodeError::Undeclared(name.clone()))?;
            if info.value == AUTO {
                info.value = items.len() as u64;
                let info = *info;
                patch(name, &info, out)?;
            } else if info.value != items.len() as u64 {
                return Err(EncodeError::ValueMismatch {
                    name: name.clone(),
                    declared: info.value,
                    actual: items.len() as u64,
                });
            }
            for item in items {
                encode_spec(inner, item, out, vars)?;
            }
        }
        (
            Spec::Switch {
                selector,
                cases,
                default,
            },
            data,
        ) => {
            let value = vars
                .get(selector)
                .ok_or_else(|| EncodeError::Undeclared(selector.clone()))?
                .value;
            if value == AUTO {
                return Err(EncodeError::AutoSelector(selector.clone()));
            }
            let chosen = cases.get(&value).unwrap_or(default);
            encode_spec(chosen, data, out, vars)?;
        }
        (Spec::Stop, _) | (_, Data::Stop(..)) => return Err(EncodeError::Halted),
        (spec, data) => {
            return Err(EncodeError::ShapeMismatch {
                spec: spec.to_string(),
                data: data.kind().to_string(),
            })
        }
    }
    Ok(())
}

/// Rewrite a variable's emitted bytes now that its value is known.
fn patch(name: &str, info: &VarInfo, out: &mut [u8]) -> Result<(), EncodeError> {
    let location = info
        .location
        .ok_or_else(|| EncodeError::AutoOutOfScope(name.to_owned()))?;
    let width = info.spec.bytes();
    let adjusted = info.value.wrapping_sub(info.offset as u64);
    write_int(adjusted, info.spec, &mut out[location..location + width]);
    Ok(())
}
