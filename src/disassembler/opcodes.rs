//! The CIL opcode table (ECMA-335, Partition III).
//!
//! Every opcode is described once by an [`OpCode`] record holding its mnemonic, its encoding,
//! the shape of its operand and the way it affects control flow and the evaluation stack.
//! Single-byte opcodes occupy `0x00..=0xE0`; the remaining ones are encoded as the escape byte
//! [`FE_PREFIX`] followed by a second byte. The internal `prefix1..7`/`prefixref` encodings are
//! not part of the table.
//!
//! Lookups by byte, by byte pair and by mnemonic go through tables that are built on first use
//! and shared for the lifetime of the process.
//!
//! # Examples
//!
//! ```rust
//! use cilflow::disassembler::{FlowType, OpCode, StackPop, StackPush};
//!
//! let add = OpCode::from_byte(0x58).unwrap();
//! assert_eq!(add.name, "add");
//! assert_eq!(add.pop, StackPop::Pop1Pop1);
//! assert_eq!(add.push, StackPush::Push1);
//!
//! let ceq = OpCode::from_pair(0xFE, 0x01).unwrap();
//! assert_eq!(ceq.name, "ceq");
//! assert_eq!(ceq.size, 2);
//!
//! assert_eq!(OpCode::from_name("ret").unwrap().flow, FlowType::Return);
//! ```

use std::{collections::HashMap, fmt, sync::OnceLock};

use strum::{Display, EnumIter};

/// First byte of every two-byte opcode
pub const FE_PREFIX: u8 = 0xFE;

/// What a metadata-token operand refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum TokenKind {
    /// `InlineType` - a type reference, definition or specification
    Type,
    /// `InlineField` - a field
    Field,
    /// `InlineMethod` - a method
    Method,
    /// `InlineTok` - any of type, field or method (`ldtoken`)
    Token,
    /// `InlineString` - a user string (`ldstr`)
    String,
    /// `InlineSig` - a standalone signature (`calli`)
    Signature,
}

/// The shape of the payload that follows an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandType {
    /// No operand present
    None,
    /// Signed 8-bit integer (`ldc.i4.s`, `unaligned.`, `no.`)
    Int8,
    /// Unsigned 8-bit argument or local index
    Var8,
    /// Signed 8-bit branch displacement
    BranchTarget8,
    /// Signed 32-bit branch displacement
    BranchTarget32,
    /// Signed 32-bit integer
    Int32,
    /// Signed 64-bit integer
    Int64,
    /// 32-bit floating point
    Float32,
    /// 64-bit floating point
    Float64,
    /// Unsigned 16-bit argument or local index
    Var16,
    /// Metadata token
    Token(TokenKind),
    /// Jump table: a 32-bit count followed by that many 32-bit displacements
    Switch,
}

impl OperandType {
    /// Returns the size in bytes of this operand type.
    ///
    /// Returns `None` for [`OperandType::Switch`], whose size depends on the case count stored
    /// in the IL bytes (`4 + 4 * count`).
    #[must_use]
    pub const fn size(&self) -> Option<usize> {
        match self {
            OperandType::None => Some(0),
            OperandType::Int8 | OperandType::Var8 | OperandType::BranchTarget8 => Some(1),
            OperandType::Var16 => Some(2),
            OperandType::BranchTarget32
            | OperandType::Int32
            | OperandType::Float32
            | OperandType::Token(_) => Some(4),
            OperandType::Int64 | OperandType::Float64 => Some(8),
            OperandType::Switch => None,
        }
    }

    /// `true` for the two branch-displacement kinds
    #[must_use]
    pub const fn is_branch_target(&self) -> bool {
        matches!(
            self,
            OperandType::BranchTarget8 | OperandType::BranchTarget32
        )
    }
}

/// How an instruction affects control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum FlowType {
    /// Normal execution continues to next instruction
    Sequential,
    /// Always branches to another location (`br`, `leave`)
    UnconditionalBranch,
    /// Branches to one of several locations or falls through (`brtrue`, `switch`)
    ConditionalBranch,
    /// Call to another method
    Call,
    /// Leaves the method, a finally block or a filter
    Return,
    /// Exception throwing
    Throw,
    /// Debugger breakpoint
    Break,
    /// Prefix that modifies the following instruction
    Meta,
}

/// Number and kind of values an instruction removes from the evaluation stack.
///
/// The suffixes name the popped values from the deepest to the top of the stack, as in the
/// ECMA-335 instruction descriptions: `PopRefPopI` pops an index and then an object reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum StackPop {
    /// Nothing
    Pop0,
    /// One value
    Pop1,
    /// Two values
    Pop1Pop1,
    /// A native integer
    PopI,
    /// A native integer and a value
    PopIPop1,
    /// Two native integers
    PopIPopI,
    /// A native integer and an int64
    PopIPopI8,
    /// A native integer and a float32
    PopIPopR4,
    /// A native integer and a float64
    PopIPopR8,
    /// Three native integers
    PopIPopIPopI,
    /// An object reference
    PopRef,
    /// An object reference and a value
    PopRefPop1,
    /// An object reference and a native integer
    PopRefPopI,
    /// An array, an index and a native integer
    PopRefPopIPopI,
    /// An array, an index and an int64
    PopRefPopIPopI8,
    /// An array, an index and a float32
    PopRefPopIPopR4,
    /// An array, an index and a float64
    PopRefPopIPopR8,
    /// An array, an index and an object reference
    PopRefPopIPopRef,
    /// An array, an index and a value
    PopRefPopIPop1,
    /// Depends on the operand (calls) or on the method (`ret`)
    VarPop,
}

impl StackPop {
    /// Number of values popped, or `None` for [`StackPop::VarPop`]
    #[must_use]
    pub const fn count(&self) -> Option<usize> {
        match self {
            StackPop::Pop0 => Some(0),
            StackPop::Pop1 | StackPop::PopI | StackPop::PopRef => Some(1),
            StackPop::Pop1Pop1
            | StackPop::PopIPop1
            | StackPop::PopIPopI
            | StackPop::PopIPopI8
            | StackPop::PopIPopR4
            | StackPop::PopIPopR8
            | StackPop::PopRefPop1
            | StackPop::PopRefPopI => Some(2),
            StackPop::PopIPopIPopI
            | StackPop::PopRefPopIPopI
            | StackPop::PopRefPopIPopI8
            | StackPop::PopRefPopIPopR4
            | StackPop::PopRefPopIPopR8
            | StackPop::PopRefPopIPopRef
            | StackPop::PopRefPopIPop1 => Some(3),
            StackPop::VarPop => None,
        }
    }
}

/// Number and kind of values an instruction places on the evaluation stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum StackPush {
    /// Nothing
    Push0,
    /// One value
    Push1,
    /// The same value twice (`dup`)
    Push1Push1,
    /// A native integer
    PushI,
    /// An int64
    PushI8,
    /// A float32
    PushR4,
    /// A float64
    PushR8,
    /// An object reference
    PushRef,
    /// Depends on the callee's return type
    VarPush,
}

impl StackPush {
    /// Number of values pushed, or `None` for [`StackPush::VarPush`]
    #[must_use]
    pub const fn count(&self) -> Option<usize> {
        match self {
            StackPush::Push0 => Some(0),
            StackPush::Push1
            | StackPush::PushI
            | StackPush::PushI8
            | StackPush::PushR4
            | StackPush::PushR8
            | StackPush::PushRef => Some(1),
            StackPush::Push1Push1 => Some(2),
            StackPush::VarPush => None,
        }
    }
}

/// Immutable description of one CIL opcode.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct OpCode {
    /// Mnemonic, e.g. `ldc.i4.s`
    pub name: &'static str,
    /// Encoded value; two-byte opcodes carry the `0xFE` prefix in the high byte
    pub value: u16,
    /// Encoding size in bytes, 1 or 2
    pub size: u8,
    /// Shape of the operand
    pub operand: OperandType,
    /// Control-flow class
    pub flow: FlowType,
    /// Stack pop class
    pub pop: StackPop,
    /// Stack push class
    pub push: StackPush,
}

struct Tables {
    single: [Option<&'static OpCode>; 256],
    extended: [Option<&'static OpCode>; 256],
    by_name: HashMap<&'static str, &'static OpCode>,
}

fn tables() -> &'static Tables {
    static TABLES: OnceLock<Tables> = OnceLock::new();

    TABLES.get_or_init(|| {
        let mut single = [None; 256];
        let mut extended = [None; 256];
        let mut by_name = HashMap::with_capacity(OPCODES.len());

        for opcode in OPCODES {
            let [high, low] = opcode.value.to_be_bytes();
            if high == FE_PREFIX {
                extended[low as usize] = Some(opcode);
            } else {
                single[low as usize] = Some(opcode);
            }
            by_name.insert(opcode.name, opcode);
        }

        Tables {
            single,
            extended,
            by_name,
        }
    })
}

impl OpCode {
    /// Looks up a single-byte opcode. The escape byte itself is not an opcode.
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<&'static OpCode> {
        tables().single[byte as usize]
    }

    /// Looks up a two-byte opcode; `prefix` must be [`FE_PREFIX`].
    #[must_use]
    pub fn from_pair(prefix: u8, second: u8) -> Option<&'static OpCode> {
        if prefix != FE_PREFIX {
            return None;
        }
        tables().extended[second as usize]
    }

    /// Looks up an opcode by its mnemonic.
    #[must_use]
    pub fn from_name(name: &str) -> Option<&'static OpCode> {
        tables().by_name.get(name).copied()
    }

    /// All opcodes, in encoding order.
    #[must_use]
    pub fn all() -> &'static [OpCode] {
        OPCODES
    }

    /// The bytes that encode this opcode.
    #[must_use]
    pub fn encoding(&self) -> ([u8; 2], usize) {
        let [high, low] = self.value.to_be_bytes();
        if self.size == 2 {
            ([high, low], 2)
        } else {
            ([low, 0], 1)
        }
    }

    /// `true` for `call`, `callvirt`, `calli` and `newobj`, the opcodes whose stack effect
    /// depends on a callee signature.
    #[must_use]
    pub fn is_call_site(&self) -> bool {
        matches!(self.value, 0x28 | 0x29 | 0x6F | 0x73)
    }

    /// `true` for `newobj`
    #[must_use]
    pub fn is_newobj(&self) -> bool {
        self.value == 0x73
    }

    /// `true` for `calli`
    #[must_use]
    pub fn is_calli(&self) -> bool {
        self.value == 0x29
    }

    /// `true` for `ret`
    #[must_use]
    pub fn is_ret(&self) -> bool {
        self.value == 0x2A
    }

    /// `true` for `switch`
    #[must_use]
    pub fn is_switch(&self) -> bool {
        matches!(self.operand, OperandType::Switch)
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

const fn op(
    value: u16,
    name: &'static str,
    operand: OperandType,
    flow: FlowType,
    pop: StackPop,
    push: StackPush,
) -> OpCode {
    OpCode {
        name,
        value,
        size: if value > 0xFF { 2 } else { 1 },
        operand,
        flow,
        pop,
        push,
    }
}

use FlowType as F;
use OperandType as O;
use StackPop as P;
use StackPush as U;

const METHOD: OperandType = O::Token(TokenKind::Method);
const FIELD: OperandType = O::Token(TokenKind::Field);
const TYPE: OperandType = O::Token(TokenKind::Type);

#[rustfmt::skip]
static OPCODES: &[OpCode] = &[
    op(0x00, "nop",            O::None,           F::Sequential,          P::Pop0,             U::Push0),
    op(0x01, "break",          O::None,           F::Break,               P::Pop0,             U::Push0),
    op(0x02, "ldarg.0",        O::None,           F::Sequential,          P::Pop0,             U::Push1),
    op(0x03, "ldarg.1",        O::None,           F::Sequential,          P::Pop0,             U::Push1),
    op(0x04, "ldarg.2",        O::None,           F::Sequential,          P::Pop0,             U::Push1),
    op(0x05, "ldarg.3",        O::None,           F::Sequential,          P::Pop0,             U::Push1),
    op(0x06, "ldloc.0",        O::None,           F::Sequential,          P::Pop0,             U::Push1),
    op(0x07, "ldloc.1",        O::None,           F::Sequential,          P::Pop0,             U::Push1),
    op(0x08, "ldloc.2",        O::None,           F::Sequential,          P::Pop0,             U::Push1),
    op(0x09, "ldloc.3",        O::None,           F::Sequential,          P::Pop0,             U::Push1),
    op(0x0A, "stloc.0",        O::None,           F::Sequential,          P::Pop1,             U::Push0),
    op(0x0B, "stloc.1",        O::None,           F::Sequential,          P::Pop1,             U::Push0),
    op(0x0C, "stloc.2",        O::None,           F::Sequential,          P::Pop1,             U::Push0),
    op(0x0D, "stloc.3",        O::None,           F::Sequential,          P::Pop1,             U::Push0),
    op(0x0E, "ldarg.s",        O::Var8,           F::Sequential,          P::Pop0,             U::Push1),
    op(0x0F, "ldarga.s",       O::Var8,           F::Sequential,          P::Pop0,             U::PushI),
    op(0x10, "starg.s",        O::Var8,           F::Sequential,          P::Pop1,             U::Push0),
    op(0x11, "ldloc.s",        O::Var8,           F::Sequential,          P::Pop0,             U::Push1),
    op(0x12, "ldloca.s",       O::Var8,           F::Sequential,          P::Pop0,             U::PushI),
    op(0x13, "stloc.s",        O::Var8,           F::Sequential,          P::Pop1,             U::Push0),
    op(0x14, "ldnull",         O::None,           F::Sequential,          P::Pop0,             U::PushRef),
    op(0x15, "ldc.i4.m1",      O::None,           F::Sequential,          P::Pop0,             U::PushI),
    op(0x16, "ldc.i4.0",       O::None,           F::Sequential,          P::Pop0,             U::PushI),
    op(0x17, "ldc.i4.1",       O::None,           F::Sequential,          P::Pop0,             U::PushI),
    op(0x18, "ldc.i4.2",       O::None,           F::Sequential,          P::Pop0,             U::PushI),
    op(0x19, "ldc.i4.3",       O::None,           F::Sequential,          P::Pop0,             U::PushI),
    op(0x1A, "ldc.i4.4",       O::None,           F::Sequential,          P::Pop0,             U::PushI),
    op(0x1B, "ldc.i4.5",       O::None,           F::Sequential,          P::Pop0,             U::PushI),
    op(0x1C, "ldc.i4.6",       O::None,           F::Sequential,          P::Pop0,             U::PushI),
    op(0x1D, "ldc.i4.7",       O::None,           F::Sequential,          P::Pop0,             U::PushI),
    op(0x1E, "ldc.i4.8",       O::None,           F::Sequential,          P::Pop0,             U::PushI),
    op(0x1F, "ldc.i4.s",       O::Int8,           F::Sequential,          P::Pop0,             U::PushI),
    op(0x20, "ldc.i4",         O::Int32,          F::Sequential,          P::Pop0,             U::PushI),
    op(0x21, "ldc.i8",         O::Int64,          F::Sequential,          P::Pop0,             U::PushI8),
    op(0x22, "ldc.r4",         O::Float32,        F::Sequential,          P::Pop0,             U::PushR4),
    op(0x23, "ldc.r8",         O::Float64,        F::Sequential,          P::Pop0,             U::PushR8),
    op(0x25, "dup",            O::None,           F::Sequential,          P::Pop1,             U::Push1Push1),
    op(0x26, "pop",            O::None,           F::Sequential,          P::Pop1,             U::Push0),
    op(0x27, "jmp",            METHOD,            F::Call,                P::Pop0,             U::Push0),
    op(0x28, "call",           METHOD,            F::Call,                P::VarPop,           U::VarPush),
    op(0x29, "calli",          O::Token(TokenKind::Signature), F::Call,   P::VarPop,           U::VarPush),
    op(0x2A, "ret",            O::None,           F::Return,              P::VarPop,           U::Push0),
    op(0x2B, "br.s",           O::BranchTarget8,  F::UnconditionalBranch, P::Pop0,             U::Push0),
    op(0x2C, "brfalse.s",      O::BranchTarget8,  F::ConditionalBranch,   P::PopI,             U::Push0),
    op(0x2D, "brtrue.s",       O::BranchTarget8,  F::ConditionalBranch,   P::PopI,             U::Push0),
    op(0x2E, "beq.s",          O::BranchTarget8,  F::ConditionalBranch,   P::Pop1Pop1,         U::Push0),
    op(0x2F, "bge.s",          O::BranchTarget8,  F::ConditionalBranch,   P::Pop1Pop1,         U::Push0),
    op(0x30, "bgt.s",          O::BranchTarget8,  F::ConditionalBranch,   P::Pop1Pop1,         U::Push0),
    op(0x31, "ble.s",          O::BranchTarget8,  F::ConditionalBranch,   P::Pop1Pop1,         U::Push0),
    op(0x32, "blt.s",          O::BranchTarget8,  F::ConditionalBranch,   P::Pop1Pop1,         U::Push0),
    op(0x33, "bne.un.s",       O::BranchTarget8,  F::ConditionalBranch,   P::Pop1Pop1,         U::Push0),
    op(0x34, "bge.un.s",       O::BranchTarget8,  F::ConditionalBranch,   P::Pop1Pop1,         U::Push0),
    op(0x35, "bgt.un.s",       O::BranchTarget8,  F::ConditionalBranch,   P::Pop1Pop1,         U::Push0),
    op(0x36, "ble.un.s",       O::BranchTarget8,  F::ConditionalBranch,   P::Pop1Pop1,         U::Push0),
    op(0x37, "blt.un.s",       O::BranchTarget8,  F::ConditionalBranch,   P::Pop1Pop1,         U::Push0),
    op(0x38, "br",             O::BranchTarget32, F::UnconditionalBranch, P::Pop0,             U::Push0),
    op(0x39, "brfalse",        O::BranchTarget32, F::ConditionalBranch,   P::PopI,             U::Push0),
    op(0x3A, "brtrue",         O::BranchTarget32, F::ConditionalBranch,   P::PopI,             U::Push0),
    op(0x3B, "beq",            O::BranchTarget32, F::ConditionalBranch,   P::Pop1Pop1,         U::Push0),
    op(0x3C, "bge",            O::BranchTarget32, F::ConditionalBranch,   P::Pop1Pop1,         U::Push0),
    op(0x3D, "bgt",            O::BranchTarget32, F::ConditionalBranch,   P::Pop1Pop1,         U::Push0),
    op(0x3E, "ble",            O::BranchTarget32, F::ConditionalBranch,   P::Pop1Pop1,         U::Push0),
    op(0x3F, "blt",            O::BranchTarget32, F::ConditionalBranch,   P::Pop1Pop1,         U::Push0),
    op(0x40, "bne.un",         O::BranchTarget32, F::ConditionalBranch,   P::Pop1Pop1,         U::Push0),
    op(0x41, "bge.un",         O::BranchTarget32, F::ConditionalBranch,   P::Pop1Pop1,         U::Push0),
    op(0x42, "bgt.un",         O::BranchTarget32, F::ConditionalBranch,   P::Pop1Pop1,         U::Push0),
    op(0x43, "ble.un",         O::BranchTarget32, F::ConditionalBranch,   P::Pop1Pop1,         U::Push0),
    op(0x44, "blt.un",         O::BranchTarget32, F::ConditionalBranch,   P::Pop1Pop1,         U::Push0),
    op(0x45, "switch",         O::Switch,         F::ConditionalBranch,   P::PopI,             U::Push0),
    op(0x46, "ldind.i1",       O::None,           F::Sequential,          P::PopI,             U::PushI),
    op(0x47, "ldind.u1",       O::None,           F::Sequential,          P::PopI,             U::PushI),
    op(0x48, "ldind.i2",       O::None,           F::Sequential,          P::PopI,             U::PushI),
    op(0x49, "ldind.u2",       O::None,           F::Sequential,          P::PopI,             U::PushI),
    op(0x4A, "ldind.i4",       O::None,           F::Sequential,          P::PopI,             U::PushI),
    op(0x4B, "ldind.u4",       O::None,           F::Sequential,          P::PopI,             U::PushI),
    op(0x4C, "ldind.i8",       O::None,           F::Sequential,          P::PopI,             U::PushI8),
    op(0x4D, "ldind.i",        O::None,           F::Sequential,          P::PopI,             U::PushI),
    op(0x4E, "ldind.r4",       O::None,           F::Sequential,          P::PopI,             U::PushR4),
    op(0x4F, "ldind.r8",       O::None,           F::Sequential,          P::PopI,             U::PushR8),
    op(0x50, "ldind.ref",      O::None,           F::Sequential,          P::PopI,             U::PushRef),
    op(0x51, "stind.ref",      O::None,           F::Sequential,          P::PopIPopI,         U::Push0),
    op(0x52, "stind.i1",       O::None,           F::Sequential,          P::PopIPopI,         U::Push0),
    op(0x53, "stind.i2",       O::None,           F::Sequential,          P::PopIPopI,         U::Push0),
    op(0x54, "stind.i4",       O::None,           F::Sequential,          P::PopIPopI,         U::Push0),
    op(0x55, "stind.i8",       O::None,           F::Sequential,          P::PopIPopI8,        U::Push0),
    op(0x56, "stind.r4",       O::None,           F::Sequential,          P::PopIPopR4,        U::Push0),
    op(0x57, "stind.r8",       O::None,           F::Sequential,          P::PopIPopR8,        U::Push0),
    op(0x58, "add",            O::None,           F::Sequential,          P::Pop1Pop1,         U::Push1),
    op(0x59, "sub",            O::None,           F::Sequential,          P::Pop1Pop1,         U::Push1),
    op(0x5A, "mul",            O::None,           F::Sequential,          P::Pop1Pop1,         U::Push1),
    op(0x5B, "div",            O::None,           F::Sequential,          P::Pop1Pop1,         U::Push1),
    op(0x5C, "div.un",         O::None,           F::Sequential,          P::Pop1Pop1,         U::Push1),
    op(0x5D, "rem",            O::None,           F::Sequential,          P::Pop1Pop1,         U::Push1),
    op(0x5E, "rem.un",         O::None,           F::Sequential,          P::Pop1Pop1,         U::Push1),
    op(0x5F, "and",            O::None,           F::Sequential,          P::Pop1Pop1,         U::Push1),
    op(0x60, "or",             O::None,           F::Sequential,          P::Pop1Pop1,         U::Push1),
    op(0x61, "xor",            O::None,           F::Sequential,          P::Pop1Pop1,         U::Push1),
    op(0x62, "shl",            O::None,           F::Sequential,          P::Pop1Pop1,         U::Push1),
    op(0x63, "shr",            O::None,           F::Sequential,          P::Pop1Pop1,         U::Push1),
    op(0x64, "shr.un",         O::None,           F::Sequential,          P::Pop1Pop1,         U::Push1),
    op(0x65, "neg",            O::None,           F::Sequential,          P::Pop1,             U::Push1),
    op(0x66, "not",            O::None,           F::Sequential,          P::Pop1,             U::Push1),
    op(0x67, "conv.i1",        O::None,           F::Sequential,          P::Pop1,             U::PushI),
    op(0x68, "conv.i2",        O::None,           F::Sequential,          P::Pop1,             U::PushI),
    op(0x69, "conv.i4",        O::None,           F::Sequential,          P::Pop1,             U::PushI),
    op(0x6A, "conv.i8",        O::None,           F::Sequential,          P::Pop1,             U::PushI8),
    op(0x6B, "conv.r4",        O::None,           F::Sequential,          P::Pop1,             U::PushR4),
    op(0x6C, "conv.r8",        O::None,           F::Sequential,          P::Pop1,             U::PushR8),
    op(0x6D, "conv.u4",        O::None,           F::Sequential,          P::Pop1,             U::PushI),
    op(0x6E, "conv.u8",        O::None,           F::Sequential,          P::Pop1,             U::PushI8),
    op(0x6F, "callvirt",       METHOD,            F::Call,                P::VarPop,           U::VarPush),
    op(0x70, "cpobj",          TYPE,              F::Sequential,          P::PopIPopI,         U::Push0),
    op(0x71, "ldobj",          TYPE,              F::Sequential,          P::PopI,             U::Push1),
    op(0x72, "ldstr",          O::Token(TokenKind::String), F::Sequential, P::Pop0,            U::PushRef),
    op(0x73, "newobj",         METHOD,            F::Call,                P::VarPop,           U::PushRef),
    op(0x74, "castclass",      TYPE,              F::Sequential,          P::PopRef,           U::PushRef),
    op(0x75, "isinst",         TYPE,              F::Sequential,          P::PopRef,           U::PushI),
    op(0x76, "conv.r.un",      O::None,           F::Sequential,          P::Pop1,             U::PushR8),
    op(0x79, "unbox",          TYPE,              F::Sequential,          P::PopRef,           U::PushI),
    op(0x7A, "throw",          O::None,           F::Throw,               P::PopRef,           U::Push0),
    op(0x7B, "ldfld",          FIELD,             F::Sequential,          P::PopRef,           U::Push1),
    op(0x7C, "ldflda",         FIELD,             F::Sequential,          P::PopRef,           U::PushI),
    op(0x7D, "stfld",          FIELD,             F::Sequential,          P::PopRefPop1,       U::Push0),
    op(0x7E, "ldsfld",         FIELD,             F::Sequential,          P::Pop0,             U::Push1),
    op(0x7F, "ldsflda",        FIELD,             F::Sequential,          P::Pop0,             U::PushI),
    op(0x80, "stsfld",         FIELD,             F::Sequential,          P::Pop1,             U::Push0),
    op(0x81, "stobj",          TYPE,              F::Sequential,          P::PopIPop1,         U::Push0),
    op(0x82, "conv.ovf.i1.un", O::None,           F::Sequential,          P::Pop1,             U::PushI),
    op(0x83, "conv.ovf.i2.un", O::None,           F::Sequential,          P::Pop1,             U::PushI),
    op(0x84, "conv.ovf.i4.un", O::None,           F::Sequential,          P::Pop1,             U::PushI),
    op(0x85, "conv.ovf.i8.un", O::None,           F::Sequential,          P::Pop1,             U::PushI8),
    op(0x86, "conv.ovf.u1.un", O::None,           F::Sequential,          P::Pop1,             U::PushI),
    op(0x87, "conv.ovf.u2.un", O::None,           F::Sequential,          P::Pop1,             U::PushI),
    op(0x88, "conv.ovf.u4.un", O::None,           F::Sequential,          P::Pop1,             U::PushI),
    op(0x89, "conv.ovf.u8.un", O::None,           F::Sequential,          P::Pop1,             U::PushI8),
    op(0x8A, "conv.ovf.i.un",  O::None,           F::Sequential,          P::Pop1,             U::PushI),
    op(0x8B, "conv.ovf.u.un",  O::None,           F::Sequential,          P::Pop1,             U::PushI),
    op(0x8C, "box",            TYPE,              F::Sequential,          P::Pop1,             U::PushRef),
    op(0x8D, "newarr",         TYPE,              F::Sequential,          P::PopI,             U::PushRef),
    op(0x8E, "ldlen",          O::None,           F::Sequential,          P::PopRef,           U::PushI),
    op(0x8F, "ldelema",        TYPE,              F::Sequential,          P::PopRefPopI,       U::PushI),
    op(0x90, "ldelem.i1",      O::None,           F::Sequential,          P::PopRefPopI,       U::PushI),
    op(0x91, "ldelem.u1",      O::None,           F::Sequential,          P::PopRefPopI,       U::PushI),
    op(0x92, "ldelem.i2",      O::None,           F::Sequential,          P::PopRefPopI,       U::PushI),
    op(0x93, "ldelem.u2",      O::None,           F::Sequential,          P::PopRefPopI,       U::PushI),
    op(0x94, "ldelem.i4",      O::None,           F::Sequential,          P::PopRefPopI,       U::PushI),
    op(0x95, "ldelem.u4",      O::None,           F::Sequential,          P::PopRefPopI,       U::PushI),
    op(0x96, "ldelem.i8",      O::None,           F::Sequential,          P::PopRefPopI,       U::PushI8),
    op(0x97, "ldelem.i",       O::None,           F::Sequential,          P::PopRefPopI,       U::PushI),
    op(0x98, "ldelem.r4",      O::None,           F::Sequential,          P::PopRefPopI,       U::PushR4),
    op(0x99, "ldelem.r8",      O::None,           F::Sequential,          P::PopRefPopI,       U::PushR8),
    op(0x9A, "ldelem.ref",     O::None,           F::Sequential,          P::PopRefPopI,       U::PushRef),
    op(0x9B, "stelem.i",       O::None,           F::Sequential,          P::PopRefPopIPopI,   U::Push0),
    op(0x9C, "stelem.i1",      O::None,           F::Sequential,          P::PopRefPopIPopI,   U::Push0),
    op(0x9D, "stelem.i2",      O::None,           F::Sequential,          P::PopRefPopIPopI,   U::Push0),
    op(0x9E, "stelem.i4",      O::None,           F::Sequential,          P::PopRefPopIPopI,   U::Push0),
    op(0x9F, "stelem.i8",      O::None,           F::Sequential,          P::PopRefPopIPopI8,  U::Push0),
    op(0xA0, "stelem.r4",      O::None,           F::Sequential,          P::PopRefPopIPopR4,  U::Push0),
    op(0xA1, "stelem.r8",      O::None,           F::Sequential,          P::PopRefPopIPopR8,  U::Push0),
    op(0xA2, "stelem.ref",     O::None,           F::Sequential,          P::PopRefPopIPopRef, U::Push0),
    op(0xA3, "ldelem",         TYPE,              F::Sequential,          P::PopRefPopI,       U::Push1),
    op(0xA4, "stelem",         TYPE,              F::Sequential,          P::PopRefPopIPop1,   U::Push0),
    op(0xA5, "unbox.any",      TYPE,              F::Sequential,          P::PopRef,           U::Push1),
    op(0xB3, "conv.ovf.i1",    O::None,           F::Sequential,          P::Pop1,             U::PushI),
    op(0xB4, "conv.ovf.u1",    O::None,           F::Sequential,          P::Pop1,             U::PushI),
    op(0xB5, "conv.ovf.i2",    O::None,           F::Sequential,          P::Pop1,             U::PushI),
    op(0xB6, "conv.ovf.u2",    O::None,           F::Sequential,          P::Pop1,             U::PushI),
    op(0xB7, "conv.ovf.i4",    O::None,           F::Sequential,          P::Pop1,             U::PushI),
    op(0xB8, "conv.ovf.u4",    O::None,           F::Sequential,          P::Pop1,             U::PushI),
    op(0xB9, "conv.ovf.i8",    O::None,           F::Sequential,          P::Pop1,             U::PushI8),
    op(0xBA, "conv.ovf.u8",    O::None,           F::Sequential,          P::Pop1,             U::PushI8),
    op(0xC2, "refanyval",      TYPE,              F::Sequential,          P::Pop1,             U::PushI),
    op(0xC3, "ckfinite",       O::None,           F::Sequential,          P::Pop1,             U::PushR8),
    op(0xC6, "mkrefany",       TYPE,              F::Sequential,          P::PopI,             U::Push1),
    op(0xD0, "ldtoken",        O::Token(TokenKind::Token), F::Sequential, P::Pop0,             U::PushI),
    op(0xD1, "conv.u2",        O::None,           F::Sequential,          P::Pop1,             U::PushI),
    op(0xD2, "conv.u1",        O::None,           F::Sequential,          P::Pop1,             U::PushI),
    op(0xD3, "conv.i",         O::None,           F::Sequential,          P::Pop1,             U::PushI),
    op(0xD4, "conv.ovf.i",     O::None,           F::Sequential,          P::Pop1,             U::PushI),
    op(0xD5, "conv.ovf.u",     O::None,           F::Sequential,          P::Pop1,             U::PushI),
    op(0xD6, "add.ovf",        O::None,           F::Sequential,          P::Pop1Pop1,         U::Push1),
    op(0xD7, "add.ovf.un",     O::None,           F::Sequential,          P::Pop1Pop1,         U::Push1),
    op(0xD8, "mul.ovf",        O::None,           F::Sequential,          P::Pop1Pop1,         U::Push1),
    op(0xD9, "mul.ovf.un",     O::None,           F::Sequential,          P::Pop1Pop1,         U::Push1),
    op(0xDA, "sub.ovf",        O::None,           F::Sequential,          P::Pop1Pop1,         U::Push1),
    op(0xDB, "sub.ovf.un",     O::None,           F::Sequential,          P::Pop1Pop1,         U::Push1),
    op(0xDC, "endfinally",     O::None,           F::Return,              P::Pop0,             U::Push0),
    op(0xDD, "leave",          O::BranchTarget32, F::UnconditionalBranch, P::Pop0,             U::Push0),
    op(0xDE, "leave.s",        O::BranchTarget8,  F::UnconditionalBranch, P::Pop0,             U::Push0),
    op(0xDF, "stind.i",        O::None,           F::Sequential,          P::PopIPopI,         U::Push0),
    op(0xE0, "conv.u",         O::None,           F::Sequential,          P::Pop1,             U::PushI),
    op(0xFE00, "arglist",      O::None,           F::Sequential,          P::Pop0,             U::PushI),
    op(0xFE01, "ceq",          O::None,           F::Sequential,          P::Pop1Pop1,         U::PushI),
    op(0xFE02, "cgt",          O::None,           F::Sequential,          P::Pop1Pop1,         U::PushI),
    op(0xFE03, "cgt.un",       O::None,           F::Sequential,          P::Pop1Pop1,         U::PushI),
    op(0xFE04, "clt",          O::None,           F::Sequential,          P::Pop1Pop1,         U::PushI),
    op(0xFE05, "clt.un",       O::None,           F::Sequential,          P::Pop1Pop1,         U::PushI),
    op(0xFE06, "ldftn",        METHOD,            F::Sequential,          P::Pop0,             U::PushI),
    op(0xFE07, "ldvirtftn",    METHOD,            F::Sequential,          P::PopRef,           U::PushI),
    op(0xFE09, "ldarg",        O::Var16,          F::Sequential,          P::Pop0,             U::Push1),
    op(0xFE0A, "ldarga",       O::Var16,          F::Sequential,          P::Pop0,             U::PushI),
    op(0xFE0B, "starg",        O::Var16,          F::Sequential,          P::Pop1,             U::Push0),
    op(0xFE0C, "ldloc",        O::Var16,          F::Sequential,          P::Pop0,             U::Push1),
    op(0xFE0D, "ldloca",       O::Var16,          F::Sequential,          P::Pop0,             U::PushI),
    op(0xFE0E, "stloc",        O::Var16,          F::Sequential,          P::Pop1,             U::Push0),
    op(0xFE0F, "localloc",     O::None,           F::Sequential,          P::PopI,             U::PushI),
    op(0xFE11, "endfilter",    O::None,           F::Return,              P::PopI,             U::Push0),
    op(0xFE12, "unaligned.",   O::Int8,           F::Meta,                P::Pop0,             U::Push0),
    op(0xFE13, "volatile.",    O::None,           F::Meta,                P::Pop0,             U::Push0),
    op(0xFE14, "tail.",        O::None,           F::Meta,                P::Pop0,             U::Push0),
    op(0xFE15, "initobj",      TYPE,              F::Sequential,          P::PopI,             U::Push0),
    op(0xFE16, "constrained.", TYPE,              F::Meta,                P::Pop0,             U::Push0),
    op(0xFE17, "cpblk",        O::None,           F::Sequential,          P::PopIPopIPopI,     U::Push0),
    op(0xFE18, "initblk",      O::None,           F::Sequential,          P::PopIPopIPopI,     U::Push0),
    op(0xFE19, "no.",          O::Int8,           F::Meta,                P::Pop0,             U::Push0),
    op(0xFE1A, "rethrow",      O::None,           F::Throw,               P::Pop0,             U::Push0),
    op(0xFE1C, "sizeof",       TYPE,              F::Sequential,          P::Pop0,             U::PushI),
    op(0xFE1D, "refanytype",   O::None,           F::Sequential,          P::Pop1,             U::PushI),
    op(0xFE1E, "readonly.",    O::None,           F::Meta,                P::Pop0,             U::Push0),
];
