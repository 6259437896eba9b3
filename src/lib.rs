//! A library for parsing and verifying
//! [Metamath](http://us.metamath.org/#faq) databases.
//!
//! The entry point is [`Database`]: feed it a root file (plus optional
//! in-memory preloads), then ask it to verify.  Parsing resolves file
//! inclusions, interns every math symbol and statement label to a dense id,
//! and freezes each assertion with the scope that was active at its
//! declaration; verification replays every `$p` proof through a stack
//! machine, unifying operands against mandatory hypotheses and enforcing
//! disjoint-variable restrictions.

// rust lints we want
#![warn(
    bare_trait_objects,
    elided_lifetimes_in_paths,
    missing_docs,
    missing_copy_implementations,
    missing_debug_implementations,
    future_incompatible,
    rust_2018_idioms,
    trivial_numeric_casts,
    unreachable_pub,
    unused
)]
// all the clippy
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// the clippy lints we don't want
#![allow(
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::enum_glob_use,
    clippy::if_not_else,
    clippy::inline_always,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::option_if_let_else,
    clippy::redundant_pub_crate,
    clippy::too_many_lines,
    clippy::cast_possible_truncation,
    clippy::missing_panics_doc,
    clippy::use_self
)]

mod bit_set;
mod util;

pub mod database;
pub mod diag;
pub mod nameck;
pub mod parser;
pub mod proof;
pub mod scopeck;
pub mod source;
pub mod statement;
pub mod verify;

#[cfg(test)]
mod proof_tests;
#[cfg(test)]
mod verify_tests;

pub use database::Database;
pub use diag::Diagnostic;
pub use statement::{as_str, Span, Token, TokenPtr};
