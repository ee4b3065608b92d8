//! Compile spec-strings into [`Spec`] trees using PEST.
//!
//! The grammar lives in `grammar.pest`. Variables declared with `%` receive
//! auto-generated names `"0"`, `"1"`, ... in textual order (optionally behind
//! a caller prefix); `s`, `(`, and `{` consume the oldest declared-but-
//! unreferenced name, while the `N$` form references variable `N` directly
//! without touching that FIFO.

use crate::ast::Spec;
use crate::int::{Endianness, IntSpec, IntWidth};
use pest::iterators::Pair;
use pest::Parser as PestParser;
use pest_derive::Parser;
use std::collections::{BTreeMap, VecDeque};

#[derive(Parser)]
#[grammar = "grammar.pest"]
struct FormatParser;

/// Compile a spec-string into a `Spec`.
pub fn compile(source: &str) -> Result<Spec, String> {
    compile_with_prefix(source, "")
}

/// Compile with a prefix prepended to every generated variable name, so specs
/// compiled separately can share one variable environment without collisions.
pub fn compile_with_prefix(source: &str, prefix: &str) -> Result<Spec, String> {
    let pairs = FormatParser::parse(Rule::format, source)
        .map_err(|e| format!("Format error: {}", e))?;
    let pair = pairs.into_iter().next().ok_or("Empty format")?;
    let mut builder = Builder::new(prefix);
    let specs = builder.build_items(pair.into_inner())?;
    Ok(Spec::combine(specs))
}

/// How a `s` / `(...)` / `{...}` chose its variable.
enum Binding {
    /// Bare form: consume the next unconsumed auto-name.
    Auto,
    /// `*` form: no length bound at all.
    Unbounded,
    /// `N$` form: variable N, FIFO untouched.
    Index(u64),
}

struct Builder {
    prefix: String,
    endian: Endianness,
    /// Count of variables declared so far; also the next auto-name.
    declared: u64,
    /// Auto-names declared but not yet consumed by `s`/`(`/`{`.
    unconsumed: VecDeque<u64>,
}

impl Builder {
    fn new(prefix: &str) -> Self {
        Builder {
            prefix: prefix.to_owned(),
            endian: Endianness::Big,
            declared: 0,
            unconsumed: VecDeque::new(),
        }
    }

    fn build_items<'i>(
        &mut self,
        pairs: impl Iterator<Item = Pair<'i, Rule>>,
    ) -> Result<Vec<Spec>, String> {
        let mut out = Vec::new();
        for pair in pairs {
            match pair.as_rule() {
                Rule::EOI => {}
                Rule::endian => {
                    self.endian = if pair.as_str() == "<" {
                        Endianness::Little
                    } else {
                        Endianness::Big
                    };
                }
                Rule::skip => out.push(self.build_skip(pair)?),
                Rule::integer => self.build_integer(pair, &mut out)?,
                Rule::variable => out.push(self.build_variable(pair)?),
                Rule::bytes => out.push(self.build_bytes(pair)?),
                Rule::until => out.push(self.build_until(pair)?),
                Rule::switch => out.push(self.build_switch(pair)?),
                other => return Err(format!("Unexpected rule: {:?}", other)),
            }
        }
        Ok(out)
    }

    fn build_skip(&mut self, pair: Pair<Rule>) -> Result<Spec, String> {
        let number = pair.into_inner().next().ok_or("skip needs a length")?;
        let n = parse_number(&number)?;
        let n = usize::try_from(n).map_err(|_| format!("skip length {} too large", n))?;
        Ok(Spec::Skip(n))
    }

    fn build_integer(&mut self, pair: Pair<Rule>, out: &mut Vec<Spec>) -> Result<(), String> {
        let mut count = 1;
        let mut width = None;
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::number => count = parse_number(&inner)?,
                Rule::width => width = Some(parse_width(&inner)),
                _ => {}
            }
        }
        let width = width.ok_or("integer needs a width")?;
        if count > 0x1_0000 {
            return Err(format!("integer repeat count {} too large", count));
        }
        for _ in 0..count {
            out.push(Spec::Integer(IntSpec::new(width, self.endian)));
        }
        Ok(())
    }

    fn build_variable(&mut self, pair: Pair<Rule>) -> Result<Spec, String> {
        let mut negative = false;
        let mut offset: i64 = 0;
        let mut width = None;
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::sign => negative = inner.as_str() == "-",
                Rule::number => {
                    let n = parse_number(&inner)?;
                    let n =
                        i64::try_from(n).map_err(|_| format!("variable offset {} too large", n))?;
                    offset = if negative { -n } else { n };
                }
                Rule::width => width = Some(parse_width(&inner)),
                _ => {}
            }
        }
        let width = width.ok_or("variable needs a width")?;
        let name = self.declare();
        Ok(Spec::Variable(IntSpec::new(width, self.endian), name, offset))
    }

    fn build_bytes(&mut self, pair: Pair<Rule>) -> Result<Spec, String> {
        let (binding, _) = split_binding(pair)?;
        Ok(Spec::Bytes(self.take_name(binding)?))
    }

    fn build_until(&mut self, pair: Pair<Rule>) -> Result<Spec, String> {
        let (binding, body_pairs) = split_binding(pair)?;
        // The budget name is consumed before the body declares its own.
        let name = self.take_name(binding)?;
        let body = self.build_items(body_pairs.into_iter())?;
        Ok(Spec::Until(name, Box::new(Spec::combine(body))))
    }

    fn build_switch(&mut self, pair: Pair<Rule>) -> Result<Spec, String> {
        let (binding, case_pairs) = split_binding(pair)?;
        let selector = self
            .take_name(binding)?
            .ok_or("switch selector cannot be unbounded")?;
        let mut cases = BTreeMap::new();
        let mut default = Spec::Stop;
        for case in case_pairs {
            let mut parts = case.into_inner();
            let label = parts.next().ok_or("switch case needs a label")?;
            let body = Spec::combine(self.build_items(parts)?);
            match label.into_inner().next() {
                Some(number) => {
                    cases.insert(parse_number(&number)?, body);
                }
                // "*=" names the default arm.
                None => default = body,
            }
        }
        Ok(Spec::Switch {
            selector,
            cases,
            default: Box::new(default),
        })
    }

    fn declare(&mut self) -> String {
        let index = self.declared;
        self.declared += 1;
        self.unconsumed.push_back(index);
        self.name_of(index)
    }

    fn take_name(&mut self, binding: Binding) -> Result<Option<String>, String> {
        match binding {
            Binding::Unbounded => Ok(None),
            Binding::Index(index) => {
                if index >= self.declared {
                    return Err(format!("variable index {} not yet declared", index));
                }
                Ok(Some(self.name_of(index)))
            }
            Binding::Auto => {
                let index = self
                    .unconsumed
                    .pop_front()
                    .ok_or("no unconsumed variable to bind")?;
                Ok(Some(self.name_of(index)))
            }
        }
    }

    fn name_of(&self, index: u64) -> String {
        format!("{}{}", self.prefix, index)
    }
}

/// Separate a leading `N$`/`*` binding from the remaining inner pairs.
fn split_binding(pair: Pair<Rule>) -> Result<(Binding, Vec<Pair<Rule>>), String> {
    let mut binding = Binding::Auto;
    let mut rest = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::star => binding = Binding::Unbounded,
            Rule::indexed => {
                let number = inner.into_inner().next().ok_or("index needs a number")?;
                binding = Binding::Index(parse_number(&number)?);
            }
            _ => rest.push(inner),
        }
    }
    Ok((binding, rest))
}

fn parse_number(pair: &Pair<Rule>) -> Result<u64, String> {
    let s = pair.as_str();
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else {
        s.parse()
    };
    parsed.map_err(|_| format!("number {} out of range", s))
}

fn parse_width(pair: &Pair<Rule>) -> IntWidth {
    match pair.as_str().to_ascii_lowercase().as_str() {
        "b" => IntWidth::One,
        "h" => IntWidth::Two,
        "t" => IntWidth::Three,
        "i" => IntWidth::Four,
        _ => IntWidth::Eight,
    }
}
