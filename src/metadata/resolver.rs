//! Token resolution injected into the analysis.
//!
//! The analysis never reads metadata tables itself. Whenever it needs to know what a token
//! refers to, either to print a readable operand or to learn how many values a `call` consumes,
//! it asks a [`crate::metadata::resolver::TokenResolver`].
//!
//! Two implementations are provided:
//! - [`crate::metadata::resolver::NullResolver`] resolves nothing; operands print as raw tokens
//!   and any call site makes stack simulation fail with [`crate::Error::UnresolvedToken`].
//! - [`crate::metadata::resolver::StaticResolver`] answers from in-memory tables populated in
//!   builder style. It is what tests and callers with pre-extracted metadata use.
//!
//! # Examples
//!
//! ```rust
//! use cilflow::metadata::{
//!     resolver::{MethodSignature, StaticResolver, TokenResolver},
//!     token::Token,
//! };
//!
//! let resolver = StaticResolver::new()
//!     .string(Token::new(0x7000_0001), "hello")
//!     .method(
//!         Token::new(0x0A00_0001),
//!         "System.Console::WriteLine",
//!         MethodSignature::static_method(1).returning_void(),
//!     );
//!
//! assert_eq!(resolver.resolve_name(Token::new(0x7000_0001)).as_deref(), Some("hello"));
//! let signature = resolver.resolve_method_signature(Token::new(0x0A00_0001)).unwrap();
//! assert_eq!(signature.param_count, 1);
//! assert!(signature.returns_void);
//! ```

use std::collections::HashMap;

use crate::metadata::token::Token;

/// The parts of a callee signature that decide its effect on the evaluation stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct MethodSignature {
    /// Number of declared parameters, not counting an implicit `this`
    pub param_count: usize,
    /// `false` when the callee takes an implicit `this` argument
    pub is_static: bool,
    /// `true` for instance constructors (`.ctor`)
    pub is_constructor: bool,
    /// `true` when the callee returns nothing
    pub returns_void: bool,
}

impl MethodSignature {
    /// Instance method with `param_count` parameters returning a value.
    #[must_use]
    pub const fn instance(param_count: usize) -> Self {
        MethodSignature {
            param_count,
            is_static: false,
            is_constructor: false,
            returns_void: false,
        }
    }

    /// Static method with `param_count` parameters returning a value.
    #[must_use]
    pub const fn static_method(param_count: usize) -> Self {
        MethodSignature {
            param_count,
            is_static: true,
            is_constructor: false,
            returns_void: false,
        }
    }

    /// Instance constructor with `param_count` parameters.
    #[must_use]
    pub const fn constructor(param_count: usize) -> Self {
        MethodSignature {
            param_count,
            is_static: false,
            is_constructor: true,
            returns_void: true,
        }
    }

    /// Marks the signature as returning `void`.
    #[must_use]
    pub const fn returning_void(mut self) -> Self {
        self.returns_void = true;
        self
    }

    /// `true` when a `call`/`callvirt` site pops an instance argument in addition to the
    /// parameters. Constructors are excluded; `newobj` allocates their instance itself.
    #[must_use]
    pub const fn pops_instance(&self) -> bool {
        !self.is_static && !self.is_constructor
    }
}

/// Capability to turn metadata tokens into names and callee signatures.
///
/// # Thread Safety
///
/// Resolvers must be `Send + Sync`; paths may be simulated concurrently against one resolver.
pub trait TokenResolver: Send + Sync {
    /// Human-readable form of the token: a member or type name, or the literal text of a
    /// user string. `None` when the token is unknown.
    fn resolve_name(&self, token: Token) -> Option<String>;

    /// Stack-relevant shape of the method the token refers to. `None` when the token is
    /// unknown or does not name a method.
    fn resolve_method_signature(&self, token: Token) -> Option<MethodSignature>;
}

/// Resolver that knows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullResolver;

impl TokenResolver for NullResolver {
    fn resolve_name(&self, _token: Token) -> Option<String> {
        None
    }

    fn resolve_method_signature(&self, _token: Token) -> Option<MethodSignature> {
        None
    }
}

/// Resolver backed by in-memory tables.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    names: HashMap<Token, String>,
    signatures: HashMap<Token, MethodSignature>,
}

impl StaticResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a display name for `token`.
    #[must_use]
    pub fn name(mut self, token: Token, name: impl Into<String>) -> Self {
        self.names.insert(token, name.into());
        self
    }

    /// Registers the literal text of a user-string token.
    #[must_use]
    pub fn string(self, token: Token, value: impl Into<String>) -> Self {
        self.name(token, value)
    }

    /// Registers a method by name and signature.
    #[must_use]
    pub fn method(mut self, token: Token, name: impl Into<String>, signature: MethodSignature) -> Self {
        self.signatures.insert(token, signature);
        self.name(token, name)
    }

    /// Number of tokens with a registered name.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// `true` when nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.signatures.is_empty()
    }
}

impl TokenResolver for StaticResolver {
    fn resolve_name(&self, token: Token) -> Option<String> {
        self.names.get(&token).cloned()
    }

    fn resolve_method_signature(&self, token: Token) -> Option<MethodSignature> {
        self.signatures.get(&token).copied()
    }
}
