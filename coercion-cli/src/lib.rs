//! Command-line front end for the `coercion` engine.
//!
//! `coercion validate` checks a value against a type expression,
//! `coercion check` against a schema from a definition document, and
//! `coercion types` lists the names a type expression may use.

pub mod cli;
pub mod input;
pub mod logging;
