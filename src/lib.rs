//! # binspec: declarative incremental codec for binary wire formats
//!
//! A [`Spec`] describes a length-prefixed or tag-dispatched binary format:
//! fixed-width integers, raw payloads whose length an earlier field supplies,
//! budget- and count-bounded repetitions, and tag dispatch. Specs are built
//! programmatically or compiled from a terse spec-string, and drive both an
//! incremental zero-copy [`Parser`] and a back-patching [`Encoder`].
//!
//! ## Spec-string cheat sheet
//!
//! Case-insensitive, whitespace-insensitive:
//!
//! - `<` / `>`: little/big endian for the integers that follow
//! - `B` `H` `T` `I` `Q`: unsigned integers of 1/2/3/4/8 bytes (`3I` = three)
//! - `Nx`: skip N bytes
//! - `%W`, `%+NW`, `%-NW`: an integer captured as a variable (± offset)
//! - `s`: payload sized by the next unreferenced variable; `*s` unbounded;
//!   `N$s` sized by variable N
//! - `( ... )`: repeat the body within a byte budget given by a variable
//!   (same `*` / `N$` forms as `s`)
//! - `{ 1=..., 2=..., *=... }`: dispatch on a variable; without a `*=` arm an
//!   unknown tag halts the structure
//!
//! Numbers are decimal or `0x` hex.
//!
//! ## Example
//!
//! ```
//! use binspec::{compile, Data, Parser};
//!
//! // A u16 length followed by that many payload bytes.
//! let spec = compile(">%Hs").unwrap();
//! let mut parser = Parser::new(spec);
//! parser.supply(&b"\x00\x03abc"[..]);
//! let data = parser.next().unwrap();
//! assert_eq!(
//!     data,
//!     Data::Seq(vec![Data::Integer(3), Data::from("abc")])
//! );
//! ```
//!
//! Parsing is incremental: when the queued bytes run out mid-structure,
//! [`Parser::next`] returns [`Incomplete`] with the minimum number of bytes
//! the current step still needs, and resumes exactly where it stalled once
//! more input is supplied. Payload bytes are never copied; parsed
//! [`Data::Bytes`] values reference the supplied chunks.
//!
//! Encoding runs the spec in reverse. Length, budget, and count fields may be
//! given as [`AUTO`]; the [`Encoder`] emits a placeholder and patches it once
//! the governed region's size is known.

pub mod ast;
pub mod decode;
pub mod dump;
pub mod encode;
pub mod int;
pub mod parser;
pub mod queue;
pub mod value;

pub use ast::Spec;
pub use decode::{Incomplete, Parser};
pub use dump::dump_data;
pub use encode::{EncodeError, Encoder};
pub use int::{Endianness, IntSpec, IntWidth};
pub use parser::{compile, compile_with_prefix};
pub use queue::{ByteQueue, ByteView};
pub use value::{Data, AUTO};
