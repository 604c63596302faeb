//! Decoded instructions.
//!
//! An [`Instruction`] is a borrowed view over the IL buffer: it records where the instruction
//! starts, which opcode it carries and how many bytes it occupies, and reads its operand lazily
//! from the buffer. Instructions are therefore `Copy` and cheap to pass around; the buffer owns
//! all the data.

use std::fmt;

use crate::{
    disassembler::opcodes::{FlowType, OpCode, OperandType, TokenKind},
    file::io::read_le_at,
    metadata::{resolver::TokenResolver, token::Token},
};

/// Formats an IL offset the way listings and path keys print it, e.g. `IL_002A`.
#[must_use]
pub fn il_label(offset: usize) -> String {
    format!("IL_{offset:04X}")
}

/// A decoded operand value.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No operand present
    None,
    /// 8-bit signed immediate
    Int8(i8),
    /// 32-bit signed immediate
    Int32(i32),
    /// 64-bit signed immediate
    Int64(i64),
    /// 32-bit floating point immediate
    Float32(f32),
    /// 64-bit floating point immediate
    Float64(f64),
    /// Argument or local index
    Var(u16),
    /// Absolute offset of a branch target
    Target(usize),
    /// Metadata token reference
    Token(Token),
    /// Absolute offsets of a jump table
    Switch(Vec<usize>),
}

/// One instruction inside an IL buffer.
#[derive(Clone, Copy)]
pub struct Instruction<'a> {
    pub(crate) il: &'a [u8],
    pub(crate) offset: usize,
    pub(crate) opcode: &'static OpCode,
    pub(crate) size: usize,
}

impl<'a> Instruction<'a> {
    /// Offset of the first opcode byte
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Total encoded size, opcode and operand
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Offset of the instruction that follows in the buffer
    #[must_use]
    pub fn next_offset(&self) -> usize {
        self.offset + self.size
    }

    /// The opcode descriptor
    #[must_use]
    pub fn opcode(&self) -> &'static OpCode {
        self.opcode
    }

    /// Mnemonic of the opcode
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.opcode.name
    }

    /// Control-flow class of the opcode
    #[must_use]
    pub fn flow(&self) -> FlowType {
        self.opcode.flow
    }

    /// The raw bytes of this instruction
    #[must_use]
    pub fn bytes(&self) -> &'a [u8] {
        &self.il[self.offset..self.next_offset()]
    }

    fn operand_start(&self) -> usize {
        self.offset + self.opcode.size as usize
    }

    fn read<T: crate::file::io::CilIO>(&self, at: usize) -> Option<T> {
        let mut cursor = at;
        read_le_at::<T>(self.il, &mut cursor).ok()
    }

    fn relative_to_next(&self, displacement: i32) -> Option<usize> {
        let next = i64::try_from(self.next_offset()).ok()?;
        usize::try_from(next + i64::from(displacement)).ok()
    }

    /// Number of entries of a `switch` jump table, `None` for other opcodes.
    #[must_use]
    pub fn switch_case_count(&self) -> Option<usize> {
        if !self.opcode.is_switch() {
            return None;
        }
        self.read::<u32>(self.operand_start())
            .map(|count| count as usize)
    }

    /// Branch target of a `br`/`b*`/`leave` instruction, relative displacements resolved
    /// against the next instruction.
    #[must_use]
    pub fn branch_target(&self) -> Option<usize> {
        let start = self.operand_start();
        match self.opcode.operand {
            OperandType::BranchTarget8 => self
                .read::<i8>(start)
                .and_then(|d| self.relative_to_next(i32::from(d))),
            OperandType::BranchTarget32 => self
                .read::<i32>(start)
                .and_then(|d| self.relative_to_next(d)),
            _ => None,
        }
    }

    /// Targets of a `switch` jump table, in table order. Empty for other opcodes.
    #[must_use]
    pub fn switch_targets(&self) -> Vec<usize> {
        let Some(count) = self.switch_case_count() else {
            return Vec::new();
        };

        let table = self.operand_start() + 4;
        (0..count)
            .filter_map(|case| self.read::<i32>(table + case * 4))
            .filter_map(|displacement| self.relative_to_next(displacement))
            .collect()
    }

    /// Every explicit control transfer target: the branch target or the switch table.
    #[must_use]
    pub fn targets(&self) -> Vec<usize> {
        if self.opcode.is_switch() {
            self.switch_targets()
        } else {
            self.branch_target().into_iter().collect()
        }
    }

    /// Metadata token operand
    #[must_use]
    pub fn token(&self) -> Option<Token> {
        match self.opcode.operand {
            OperandType::Token(_) => self.read::<u32>(self.operand_start()).map(Token::new),
            _ => None,
        }
    }

    /// Explicit argument or local index operand (`ldarg.s`, `stloc`, ...)
    #[must_use]
    pub fn var_index(&self) -> Option<u16> {
        let start = self.operand_start();
        match self.opcode.operand {
            OperandType::Var8 => self.read::<u8>(start).map(u16::from),
            OperandType::Var16 => self.read::<u16>(start),
            _ => None,
        }
    }

    /// Local slot accessed by `ldloc*`/`stloc*`, including the short `.0`-`.3` forms.
    #[must_use]
    pub fn local_index(&self) -> Option<u16> {
        match self.opcode.value {
            0x06..=0x09 => Some(self.opcode.value - 0x06),
            0x0A..=0x0D => Some(self.opcode.value - 0x0A),
            0x11 | 0x13 | 0xFE0C | 0xFE0E => self.var_index(),
            _ => None,
        }
    }

    /// `true` for the `stloc` family
    #[must_use]
    pub fn is_local_store(&self) -> bool {
        matches!(self.opcode.value, 0x0A..=0x0D | 0x13 | 0xFE0E)
    }

    /// The decoded operand value.
    #[must_use]
    pub fn operand(&self) -> Operand {
        let start = self.operand_start();
        let value = match self.opcode.operand {
            OperandType::None => Some(Operand::None),
            OperandType::Int8 => self.read::<i8>(start).map(Operand::Int8),
            OperandType::Int32 => self.read::<i32>(start).map(Operand::Int32),
            OperandType::Int64 => self.read::<i64>(start).map(Operand::Int64),
            OperandType::Float32 => self.read::<f32>(start).map(Operand::Float32),
            OperandType::Float64 => self.read::<f64>(start).map(Operand::Float64),
            OperandType::Var8 | OperandType::Var16 => self.var_index().map(Operand::Var),
            OperandType::BranchTarget8 | OperandType::BranchTarget32 => {
                self.branch_target().map(Operand::Target)
            }
            OperandType::Token(_) => self.token().map(Operand::Token),
            OperandType::Switch => Some(Operand::Switch(self.switch_targets())),
        };

        value.unwrap_or(Operand::None)
    }

    /// Printable operand, with tokens resolved through `resolver`.
    ///
    /// User strings are quoted, other tokens print as their resolved name or, when the
    /// resolver does not know them, as raw hex. Branch targets print as `IL_XXXX` labels.
    #[must_use]
    pub fn operand_text(&self, resolver: &dyn TokenResolver) -> Option<String> {
        match self.operand() {
            Operand::None => None,
            Operand::Int8(value) => Some(value.to_string()),
            Operand::Int32(value) => Some(value.to_string()),
            Operand::Int64(value) => Some(value.to_string()),
            Operand::Float32(value) => Some(value.to_string()),
            Operand::Float64(value) => Some(value.to_string()),
            Operand::Var(index) => Some(index.to_string()),
            Operand::Target(target) => Some(il_label(target)),
            Operand::Switch(targets) => Some(format!(
                "({})",
                targets
                    .iter()
                    .map(|t| il_label(*t))
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            Operand::Token(token) => {
                let resolved = resolver.resolve_name(token);
                Some(match (self.opcode.operand, resolved) {
                    (OperandType::Token(TokenKind::String), Some(text)) => format!("{text:?}"),
                    (_, Some(name)) => name,
                    (_, None) => token.to_string(),
                })
            }
        }
    }

    /// `name operand`, with tokens resolved through `resolver`
    #[must_use]
    pub fn text(&self, resolver: &dyn TokenResolver) -> String {
        match self.operand_text(resolver) {
            Some(operand) => format!("{} {}", self.name(), operand),
            None => self.name().to_string(),
        }
    }

    /// `IL_XXXX: name operand`, with tokens resolved through `resolver`
    #[must_use]
    pub fn render(&self, resolver: &dyn TokenResolver) -> String {
        format!("{}: {}", il_label(self.offset), self.text(resolver))
    }
}

impl PartialEq for Instruction<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset
            && self.size == other.size
            && self.opcode.value == other.opcode.value
            && self.bytes() == other.bytes()
    }
}

impl Eq for Instruction<'_> {}

impl fmt::Debug for Instruction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instruction")
            .field("offset", &self.offset)
            .field("name", &self.opcode.name)
            .field("size", &self.size)
            .field("operand", &self.operand())
            .finish()
    }
}

impl fmt::Display for Instruction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&crate::metadata::resolver::NullResolver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        disassembler::decode_stream,
        metadata::resolver::{NullResolver, StaticResolver},
    };

    #[test]
    fn immediates() {
        // ldc.i4.s -3; ldc.i8 7; ldc.r8 1.5
        let mut il = vec![0x1F, 0xFD, 0x21];
        il.extend_from_slice(&7_i64.to_le_bytes());
        il.push(0x23);
        il.extend_from_slice(&1.5_f64.to_le_bytes());

        let instructions = decode_stream(&il).unwrap();
        assert_eq!(instructions[0].operand(), Operand::Int8(-3));
        assert_eq!(instructions[1].operand(), Operand::Int64(7));
        assert_eq!(instructions[2].operand(), Operand::Float64(1.5));
        assert_eq!(instructions[2].to_string(), "IL_000B: ldc.r8 1.5");
    }

    #[test]
    fn branch_targets_are_relative_to_next_instruction() {
        // IL_0000: br.s IL_0003 ; IL_0002: nop ; IL_0003: br.s IL_0002 ; IL_0005: ret
        let il = [0x2B, 0x01, 0x00, 0x2B, 0xFD, 0x2A];
        let instructions = decode_stream(&il).unwrap();

        assert_eq!(instructions[0].branch_target(), Some(0x03));
        assert_eq!(instructions[2].branch_target(), Some(0x02));
        assert_eq!(instructions[2].operand(), Operand::Target(0x02));
        assert_eq!(instructions[1].branch_target(), None);
        assert!(instructions[1].targets().is_empty());
    }

    #[test]
    fn switch_table() {
        // switch (IL_000D, IL_000E) ; nop ; nop ; ret
        let il = [
            0x45, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x2A,
        ];
        let instructions = decode_stream(&il).unwrap();
        let switch = instructions[0];

        assert_eq!(switch.size(), 13);
        assert_eq!(switch.switch_case_count(), Some(2));
        assert_eq!(switch.switch_targets(), vec![0x0D, 0x0E]);
        assert_eq!(switch.targets(), vec![0x0D, 0x0E]);
        assert_eq!(switch.to_string(), "IL_0000: switch (IL_000D, IL_000E)");
    }

    #[test]
    fn locals() {
        // ldloc.2 ; stloc.s 7 ; stloc 300 ; ldarg.s 1
        let il = [0x08, 0x13, 0x07, 0xFE, 0x0E, 0x2C, 0x01, 0x0E, 0x01];
        let instructions = decode_stream(&il).unwrap();

        assert_eq!(instructions[0].local_index(), Some(2));
        assert!(!instructions[0].is_local_store());
        assert_eq!(instructions[1].local_index(), Some(7));
        assert!(instructions[1].is_local_store());
        assert_eq!(instructions[2].local_index(), Some(300));
        assert!(instructions[2].is_local_store());
        assert_eq!(instructions[3].local_index(), None);
        assert_eq!(instructions[3].var_index(), Some(1));
    }

    #[test]
    fn tokens() {
        // ldstr 0x70000001 ; call 0x0A000002 ; newobj 0x0A000099
        let il = [
            0x72, 0x01, 0x00, 0x00, 0x70, 0x28, 0x02, 0x00, 0x00, 0x0A, 0x73, 0x99, 0x00, 0x00,
            0x0A,
        ];
        let instructions = decode_stream(&il).unwrap();
        let resolver = StaticResolver::new()
            .string(Token::new(0x7000_0001), "hi \"there\"")
            .name(Token::new(0x0A00_0002), "Console::WriteLine");

        assert_eq!(instructions[0].token(), Some(Token::new(0x7000_0001)));
        assert_eq!(
            instructions[0].operand_text(&resolver).as_deref(),
            Some("\"hi \\\"there\\\"\"")
        );
        assert_eq!(
            instructions[1].render(&resolver),
            "IL_0005: call Console::WriteLine"
        );
        assert_eq!(
            instructions[2].operand_text(&NullResolver).as_deref(),
            Some("0x0A000099")
        );
    }

    #[test]
    fn bytes_and_labels() {
        let il = [0x20, 0x05, 0x00, 0x00, 0x00, 0x2A];
        let instructions = decode_stream(&il).unwrap();

        assert_eq!(instructions[0].bytes(), &il[..5]);
        assert_eq!(instructions[0].next_offset(), 5);
        assert_eq!(il_label(0x2A), "IL_002A");
        assert_eq!(il_label(0x12345), "IL_12345");
    }
}
