//! Shared fixtures for unit tests.
//!
//! Every fixture is a small method body written with the encoder. Offsets are listed next to
//! each instruction so tests can refer to them directly.

use crate::{
    disassembler::{InstructionEncoder, Operand},
    metadata::{
        exceptions::ExceptionRegion,
        resolver::{MethodSignature, StaticResolver},
        token::Token,
    },
    Result,
};

pub(crate) const WRITE_LINE: Token = Token::new(0x0A00_0001);
pub(crate) const GET_VALUE: Token = Token::new(0x0A00_0002);
pub(crate) const OBJECT_CTOR: Token = Token::new(0x0A00_0003);
pub(crate) const HELLO: Token = Token::new(0x7000_0001);

/// Encodes a method body, panicking on fixture mistakes.
pub(crate) fn assemble(build: impl FnOnce(&mut InstructionEncoder) -> Result<()>) -> Vec<u8> {
    let mut encoder = InstructionEncoder::new();
    build(&mut encoder).expect("fixture encodes");
    encoder.finish().expect("fixture labels resolve")
}

/// Resolver knowing the tokens used by the fixtures.
pub(crate) fn resolver() -> StaticResolver {
    StaticResolver::new()
        .string(HELLO, "hello")
        .method(
            WRITE_LINE,
            "System.Console::WriteLine",
            MethodSignature::static_method(1).returning_void(),
        )
        .method(GET_VALUE, "Program::GetValue", MethodSignature::instance(0))
        .method(OBJECT_CTOR, "System.Object::.ctor", MethodSignature::constructor(0))
}

/// ```text
/// IL_0000: ldc.i4.1
/// IL_0001: ldc.i4.2
/// IL_0002: add
/// IL_0003: stloc.0
/// IL_0004: ret
/// ```
pub(crate) fn straight_line() -> Vec<u8> {
    assemble(|e| {
        e.emit("ldc.i4.1")?;
        e.emit("ldc.i4.2")?;
        e.emit("add")?;
        e.emit("stloc.0")?;
        e.emit("ret")
    })
}

/// ```text
/// IL_0000: ldc.i4 5
/// IL_0005: ret
/// ```
pub(crate) fn constant_return() -> Vec<u8> {
    assemble(|e| {
        e.emit_instruction("ldc.i4", Some(Operand::Int32(5)))?;
        e.emit("ret")
    })
}

/// ```text
/// IL_0000: ldc.i4 0
/// IL_0005: brtrue.s IL_000E
/// IL_0007: ldc.i4 1
/// IL_000C: br.s IL_0013
/// IL_000E: ldc.i4 2
/// IL_0013: stloc.0
/// IL_0014: ret
/// ```
pub(crate) fn diamond() -> Vec<u8> {
    assemble(|e| {
        e.emit_instruction("ldc.i4", Some(Operand::Int32(0)))?;
        e.emit_branch("brtrue.s", "taken")?;
        e.emit_instruction("ldc.i4", Some(Operand::Int32(1)))?;
        e.emit_branch("br.s", "end")?;
        e.define_label("taken")?;
        e.emit_instruction("ldc.i4", Some(Operand::Int32(2)))?;
        e.define_label("end")?;
        e.emit("stloc.0")?;
        e.emit("ret")
    })
}

/// A loop that keeps its accumulator on the evaluation stack.
///
/// ```text
/// IL_0000: ldc.i4.0
/// IL_0001: ldc.i4.1
/// IL_0002: add
/// IL_0003: dup
/// IL_0004: brtrue.s IL_0001
/// IL_0006: ret
/// ```
pub(crate) fn accumulator_loop() -> Vec<u8> {
    assemble(|e| {
        e.emit("ldc.i4.0")?;
        e.define_label("top")?;
        e.emit("ldc.i4.1")?;
        e.emit("add")?;
        e.emit("dup")?;
        e.emit_branch("brtrue.s", "top")?;
        e.emit("ret")
    })
}

/// A loop that increments a local until it reaches ten.
///
/// ```text
/// IL_0000: ldc.i4.0
/// IL_0001: stloc.0
/// IL_0002: ldloc.0
/// IL_0003: ldc.i4.1
/// IL_0004: add
/// IL_0005: stloc.0
/// IL_0006: ldloc.0
/// IL_0007: ldc.i4.s 10
/// IL_0009: blt.s IL_0002
/// IL_000B: ret
/// ```
pub(crate) fn local_loop() -> Vec<u8> {
    assemble(|e| {
        e.emit("ldc.i4.0")?;
        e.emit("stloc.0")?;
        e.define_label("top")?;
        e.emit("ldloc.0")?;
        e.emit("ldc.i4.1")?;
        e.emit("add")?;
        e.emit("stloc.0")?;
        e.emit("ldloc.0")?;
        e.emit_ldc_i4(10)?;
        e.emit_branch("blt.s", "top")?;
        e.emit("ret")
    })
}

/// A `try`/`finally` whose `leave` exits the protected range.
///
/// ```text
/// IL_0000: ldstr "hello"          try
/// IL_0005: call WriteLine         try
/// IL_000A: leave.s IL_0013        try
/// IL_000C: ldc.i4.1               finally
/// IL_000D: call WriteLine         finally
/// IL_0012: endfinally             finally
/// IL_0013: ret
/// ```
pub(crate) fn try_finally() -> (Vec<u8>, Vec<ExceptionRegion>) {
    let il = assemble(|e| {
        e.emit_token("ldstr", HELLO)?;
        e.emit_token("call", WRITE_LINE)?;
        e.emit_branch("leave.s", "end")?;
        e.emit("ldc.i4.1")?;
        e.emit_token("call", WRITE_LINE)?;
        e.emit("endfinally")?;
        e.define_label("end")?;
        e.emit("ret")
    });

    (il, vec![ExceptionRegion::finally(0x00, 0x0C, 0x0C, 0x07)])
}
