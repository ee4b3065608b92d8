//! Incremental binary parser: drives a [`Spec`] against a [`ByteQueue`].
//!
//! The parser never blocks and never copies payload bytes. Feed it chunks
//! with [`supply`](Parser::supply) as they arrive; [`next`](Parser::next)
//! decodes as far as the queued bytes allow and, when it stalls, reports the
//! minimum number of further bytes the current atomic step needs. The
//! execution state is an explicit frame stack, so a parse can suspend and
//! resume at any byte boundary.

use crate::ast::Spec;
use crate::int::decode_int;
use crate::queue::{ByteQueue, ByteView};
use crate::value::Data;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};

/// The current atomic step needs more input. Recoverable: supply at least
/// this many bytes and call [`Parser::next`] again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("need at least {0} more byte(s)")]
pub struct Incomplete(pub usize);

/// One suspended position in the spec walk.
enum Frame {
    /// Not yet started.
    Prepared(Spec),
    /// A `Seq` with some children parsed and some pending.
    PartialSeq { done: Vec<Data>, rest: VecDeque<Spec> },
    /// A `Repeat` with `remaining` iterations still to run.
    PartialRepeat {
        done: Vec<Data>,
        remaining: u64,
        inner: Spec,
    },
    /// Completed top-level result, cached until reset.
    Done(Data),
}

/// Incremental parser for one `Spec`.
///
/// Single-threaded: `supply`/`next`/`reset` take `&mut self` and must be
/// serialized by the caller.
pub struct Parser {
    spec: Spec,
    queue: ByteQueue,
    env: HashMap<String, u64>,
    /// Caller-supplied variables, restored by every reset.
    seed: HashMap<String, u64>,
    stack: Vec<Frame>,
}

impl Parser {
    pub fn new(spec: Spec) -> Self {
        Parser::with_vars(spec, HashMap::new())
    }

    /// A parser whose environment starts out (and restarts, on reset) with
    /// the given variables.
    pub fn with_vars(spec: Spec, vars: HashMap<String, u64>) -> Self {
        let mut parser = Parser {
            spec,
            queue: ByteQueue::new(),
            env: HashMap::new(),
            seed: vars,
            stack: Vec::new(),
        };
        parser.reset();
        parser
    }

    /// Append a chunk of input. Never blocks, never fails.
    pub fn supply(&mut self, chunk: impl Into<Bytes>) {
        self.queue.push(chunk);
    }

    /// Bytes supplied but not yet consumed.
    pub fn remaining(&self) -> ByteView {
        self.queue.peek_all()
    }

    /// Discard any partial parse and start over on the remaining bytes.
    pub fn reset(&mut self) {
        self.env = self.seed.clone();
        self.stack.clear();
        self.stack.push(Frame::Prepared(self.spec.clone()));
    }

    /// Attempt one full parse of the spec. On success the result is cached:
    /// further calls return it again until [`reset`](Parser::reset).
    pub fn next(&mut self) -> Result<Data, Incomplete> {
        loop {
            let frame = match self.stack.pop() {
                Some(frame) => frame,
                None => unreachable!("parser stack underflow"),
            };
            match frame {
                Frame::Done(data) => {
                    let out = data.clone();
                    self.stack.push(Frame::Done(data));
                    return Ok(out);
                }
                Frame::Prepared(spec) => self.step(spec)?,
                Frame::PartialSeq { done, mut rest } => match rest.pop_front() {
                    Some(next) => {
                        self.stack.push(Frame::PartialSeq { done, rest });
                        self.stack.push(Frame::Prepared(next));
                    }
                    None => self.finish(Data::Seq(done)),
                },
                Frame::PartialRepeat {
                    done,
                    remaining,
                    inner,
                } => {
                    if remaining > 0 {
                        let next = inner.clone();
                        self.stack.push(Frame::PartialRepeat {
                            done,
                            remaining: remaining - 1,
                            inner,
                        });
                        self.stack.push(Frame::Prepared(next));
                    } else {
                        self.finish(Data::Seq(done));
                    }
                }
            }
        }
    }

    /// Parse complete values until the input runs dry: `next` + `reset` in a
    /// loop. Stops on `Incomplete`, on a surfaced `Stop` (which is not
    /// appended), or after a round that consumed no bytes.
    pub fn parse_all(&mut self) -> Vec<Data> {
        let mut out = Vec::new();
        loop {
            let before = self.queue.len();
            match self.next() {
                Err(Incomplete(_)) => break,
                Ok(data) if data.is_stop() => break,
                Ok(data) => {
                    out.push(data);
                    self.reset();
                    if self.queue.len() == before {
                        break;
                    }
                }
            }
        }
        out
    }

    /// Run one prepared spec. Either pushes follow-up frames, finishes a
    /// value into the parent, or restores the frame and reports the deficit.
    fn step(&mut self, spec: Spec) -> Result<(), Incomplete> {
        match spec {
            Spec::Skip(n) => {
                match self.queue.split_prefix(n) {
                    Ok(_) => self.finish(Data::Empty),
                    Err(deficit) => {
                        self.stack.push(Frame::Prepared(Spec::Skip(n)));
                        return Err(Incomplete(deficit));
                    }
                }
            }
            Spec::Stop => self.halt(Data::Stop(Box::new(Spec::Stop), 0)),
            Spec::Integer(ispec) => {
                let view = match self.queue.split_prefix(ispec.bytes()) {
                    Ok(view) => view,
                    Err(deficit) => {
                        self.stack.push(Frame::Prepared(Spec::Integer(ispec)));
                        return Err(Incomplete(deficit));
                    }
                };
                self.finish(Data::Integer(decode_int(&view, ispec)));
            }
            Spec::Variable(ispec, name, offset) => {
                let view = match self.queue.split_prefix(ispec.bytes()) {
                    Ok(view) => view,
                    Err(deficit) => {
                        self.stack
                            .push(Frame::Prepared(Spec::Variable(ispec, name, offset)));
                        return Err(Incomplete(deficit));
                    }
                };
                let value = decode_int(&view, ispec).wrapping_add(offset as u64);
                self.env.insert(name, value);
                self.finish(Data::Integer(value));
            }
            Spec::Bytes(name) => {
                let n = match &name {
                    Some(name) => self.lookup(name) as usize,
                    None => self.queue.len(),
                };
                match self.queue.split_prefix(n) {
                    Ok(view) => self.finish(Data::Bytes(view)),
                    Err(deficit) => {
                        self.stack.push(Frame::Prepared(Spec::Bytes(name)));
                        return Err(Incomplete(deficit));
                    }
                }
            }
            Spec::Seq(specs) => {
                let mut rest: VecDeque<Spec> = specs.into();
                match rest.pop_front() {
                    Some(first) => {
                        self.stack.push(Frame::PartialSeq {
                            done: Vec::new(),
                            rest,
                        });
                        self.stack.push(Frame::Prepared(first));
                    }
                    None => self.finish(Data::Seq(Vec::new())),
                }
            }
            Spec::Until(name, inner) => {
                let budget = match &name {
                    Some(name) => self.lookup(name) as usize,
                    None => self.queue.len(),
                };
                let view = match self.queue.split_prefix(budget) {
                    Ok(view) => view,
                    Err(deficit) => {
                        self.stack.push(Frame::Prepared(Spec::Until(name, inner)));
                        return Err(Incomplete(deficit));
                    }
                };
                // The sub-parser owns the budget outright: whatever it does
                // not consume is discarded with it. It inherits a snapshot of
                // the environment, re-seeded for every repetition, and a Stop
                // inside it merely ends the accumulation.
                let mut sub = Parser::with_vars(*inner, self.env.clone());
                sub.queue = ByteQueue::from(view);
                let items = sub.parse_all();
                self.finish(Data::Seq(items));
            }
            Spec::Repeat(name, inner) => {
                let remaining = self.lookup(&name);
                self.stack.push(Frame::PartialRepeat {
                    done: Vec::new(),
                    remaining,
                    inner: *inner,
                });
            }
            Spec::Switch {
                selector,
                cases,
                default,
            } => {
                let value = self.lookup(&selector);
                let chosen = cases
                    .get(&value)
                    .cloned()
                    .unwrap_or_else(|| (*default).clone());
                if chosen == Spec::Stop {
                    let spec = Spec::Switch {
                        selector,
                        cases,
                        default,
                    };
                    self.halt(Data::Stop(Box::new(spec), value));
                } else {
                    self.stack.push(Frame::Prepared(chosen));
                }
            }
        }
        Ok(())
    }

    /// Hand a completed value to the enclosing frame, or finish the parse.
    fn finish(&mut self, data: Data) {
        match self.stack.last_mut() {
            None => self.stack.push(Frame::Done(data)),
            Some(Frame::PartialSeq { done, .. }) | Some(Frame::PartialRepeat { done, .. }) => {
                done.push(data)
            }
            Some(_) => unreachable!("value finished with no collector frame"),
        }
    }

    /// A `Stop` surfaced: the in-progress structure is irrecoverable, so the
    /// whole stack collapses to the cached result.
    fn halt(&mut self, stop: Data) {
        self.stack.clear();
        self.stack.push(Frame::Done(stop));
    }

    fn lookup(&self, name: &str) -> u64 {
        match self.env.get(name) {
            Some(value) => *value,
            None => panic!("variable {:?} referenced before assignment", name),
        }
    }
}
