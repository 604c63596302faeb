//! Metadata tokens referenced by IL operands.
//!
//! A token is the 32-bit operand of instructions such as `call`, `ldstr` or `newobj`. The high
//! byte names the metadata table, the low 24 bits the row inside it. Tokens are opaque to the
//! analysis; turning them into names or callee signatures is the job of a
//! [`crate::metadata::resolver::TokenResolver`].

use std::fmt;

use strum::{Display, FromRepr};

/// Metadata tables an IL operand token can point into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr)]
#[repr(u8)]
pub enum TokenTable {
    /// Reference to a type defined in another module
    TypeRef = 0x01,
    /// Type defined in this module
    TypeDef = 0x02,
    /// Field definition
    Field = 0x04,
    /// Method definition
    MethodDef = 0x06,
    /// Member (method or field) reference
    MemberRef = 0x0A,
    /// Standalone signature, used by `calli`
    StandAloneSig = 0x11,
    /// Constructed type
    TypeSpec = 0x1B,
    /// Generic method instantiation
    MethodSpec = 0x2B,
    /// Entry in the user-string heap, used by `ldstr`
    UserString = 0x70,
}

/// A metadata token representing a reference to a metadata table entry.
///
/// Tokens in .NET metadata consist of a 32-bit value where:
/// - The high byte (bits 24-31) indicates the table type
/// - The low 24 bits (bits 0-23) indicate the row index within that table
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub u32);

impl Token {
    /// Creates a new token from a raw 32-bit value
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Token(value)
    }

    /// Builds a token from a table and a row index. Bits of `row` above 24 are discarded.
    #[must_use]
    pub const fn from_parts(table: TokenTable, row: u32) -> Self {
        Token(((table as u32) << 24) | (row & 0x00FF_FFFF))
    }

    /// Returns the raw token value
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Extracts the table byte from the token (high byte)
    #[must_use]
    pub const fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// The table the token refers to, if it is one an IL operand may carry.
    #[must_use]
    pub fn table_kind(&self) -> Option<TokenTable> {
        TokenTable::from_repr(self.table())
    }

    /// Extracts the row index from the token (low 24 bits)
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// Returns true if this is a null token (value 0)
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Returns true if the token points into the user-string heap (`ldstr`)
    #[must_use]
    pub const fn is_user_string(&self) -> bool {
        self.table() == TokenTable::UserString as u8
    }

    /// Returns true if the token names something callable
    #[must_use]
    pub fn is_method(&self) -> bool {
        matches!(
            self.table_kind(),
            Some(TokenTable::MethodDef | TokenTable::MemberRef | TokenTable::MethodSpec)
        )
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.table_kind() {
            Some(kind) => write!(f, "Token(0x{:08X}, {kind}, row: {})", self.0, self.row()),
            None => write!(
                f,
                "Token(0x{:08X}, table: 0x{:02X}, row: {})",
                self.0,
                self.table(),
                self.row()
            ),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts() {
        let token = Token::new(0x0A00_000C);
        assert_eq!(token.table(), 0x0A);
        assert_eq!(token.row(), 12);
        assert_eq!(token.table_kind(), Some(TokenTable::MemberRef));
        assert!(token.is_method());
        assert!(!token.is_user_string());

        assert_eq!(Token::from_parts(TokenTable::UserString, 1), Token(0x7000_0001));
        assert_eq!(
            Token::from_parts(TokenTable::MethodDef, 0x0100_0002),
            Token(0x0600_0002)
        );
    }

    #[test]
    fn unknown_table() {
        let token = Token(0x2300_0001);
        assert_eq!(token.table_kind(), None);
        assert!(!token.is_method());
        assert_eq!(
            format!("{token:?}"),
            "Token(0x23000001, table: 0x23, row: 1)"
        );
    }

    #[test]
    fn null() {
        assert!(Token(0).is_null());
        assert!(!Token(0x0600_0001).is_null());
    }

    #[test]
    fn formatting() {
        let token = Token(0x0600_0001);
        assert_eq!(token.to_string(), "0x06000001");
        assert_eq!(format!("{token:?}"), "Token(0x06000001, MethodDef, row: 1)");

        let raw: u32 = Token::from(0x7000_0010).into();
        assert_eq!(raw, 0x7000_0010);
    }
}
