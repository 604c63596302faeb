//! Metadata seen from inside a method body.
//!
//! The analysis consumes three pieces of metadata: the tokens embedded in IL operands, the
//! exception-handling regions of the method and a resolver that maps tokens to names and
//! callee signatures.

pub mod exceptions;
pub mod resolver;
pub mod token;
