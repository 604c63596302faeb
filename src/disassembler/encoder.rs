//! CIL instruction encoding.
//!
//! [`InstructionEncoder`] is the counterpart of the decoder: it emits IL by mnemonic, using the
//! same opcode table, and resolves symbolic labels for branches and switch tables once all code
//! has been emitted. It is how method bodies are written by hand for analysis, tests and
//! benchmarks.
//!
//! # Label Resolution
//!
//! ```rust
//! use cilflow::disassembler::{decode_stream, InstructionEncoder};
//!
//! let mut encoder = InstructionEncoder::new();
//!
//! encoder.emit("ldarg.0")?;
//! encoder.emit_branch("brtrue.s", "end")?;
//! encoder.emit("ldarg.1")?;
//! encoder.emit("pop")?;
//! encoder.define_label("end")?;
//! encoder.emit("ret")?;
//!
//! let il = encoder.finish()?; // Labels resolved here
//! let instructions = decode_stream(&il)?;
//! assert_eq!(instructions[1].branch_target(), Some(5));
//! # Ok::<(), cilflow::Error>(())
//! ```

use std::collections::HashMap;

use crate::{
    disassembler::{
        instruction::Operand,
        opcodes::{FlowType, OpCode, OperandType},
    },
    file::io::write_le,
    metadata::token::Token,
    Error, Result,
};

/// Label fixup information for branch instruction resolution.
#[derive(Debug, Clone)]
struct LabelFixup {
    /// The target label name to resolve
    label: String,
    /// Position in bytecode where the branch displacement is written
    fixup_position: usize,
    /// Size of the displacement field, 1 or 4 bytes
    offset_size: usize,
}

/// Switch fixup information for multi-way branch resolution.
#[derive(Debug, Clone)]
struct SwitchFixup {
    /// The target label names to resolve (one per switch case)
    labels: Vec<String>,
    /// Position in bytecode where the switch targets start (after the count)
    fixup_position: usize,
    /// Position after the switch instruction (for relative offset calculation)
    instruction_end_position: usize,
}

/// Builds an IL byte buffer instruction by instruction.
#[derive(Debug, Default)]
pub struct InstructionEncoder {
    bytecode: Vec<u8>,
    labels: HashMap<String, usize>,
    fixups: Vec<LabelFixup>,
    switch_fixups: Vec<SwitchFixup>,
}

fn lookup(mnemonic: &str) -> Result<&'static OpCode> {
    OpCode::from_name(mnemonic).ok_or_else(|| Error::InvalidMnemonic(mnemonic.to_string()))
}

impl InstructionEncoder {
    /// Create a new, empty encoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn emit_opcode(&mut self, opcode: &OpCode) {
        let (bytes, len) = opcode.encoding();
        self.bytecode.extend_from_slice(&bytes[..len]);
    }

    /// Emit an instruction that takes no operand.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidMnemonic`] for unknown mnemonics and
    /// [`crate::Error::Malformed`] if the opcode expects an operand.
    pub fn emit(&mut self, mnemonic: &str) -> Result<()> {
        self.emit_instruction(mnemonic, None)
    }

    /// Emit a CIL instruction with optional operand.
    ///
    /// Branches and switches carry labels rather than operands; use [`Self::emit_branch`] and
    /// [`Self::emit_switch`] for them.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The mnemonic is not recognized
    /// - The operand doesn't match the instruction's operand type
    /// - The operand is missing when required or present when not expected
    pub fn emit_instruction(&mut self, mnemonic: &str, operand: Option<Operand>) -> Result<()> {
        let opcode = lookup(mnemonic)?;

        let mut payload = Vec::new();
        match (opcode.operand, operand) {
            (OperandType::None, None) => {}
            (OperandType::Int8, Some(Operand::Int8(value))) => write_le(&mut payload, value),
            (OperandType::Int32, Some(Operand::Int32(value))) => write_le(&mut payload, value),
            (OperandType::Int64, Some(Operand::Int64(value))) => write_le(&mut payload, value),
            (OperandType::Float32, Some(Operand::Float32(value))) => write_le(&mut payload, value),
            (OperandType::Float64, Some(Operand::Float64(value))) => write_le(&mut payload, value),
            (OperandType::Var16, Some(Operand::Var(index))) => write_le(&mut payload, index),
            (OperandType::Var8, Some(Operand::Var(index))) => {
                let index = u8::try_from(index).map_err(|_| {
                    malformed_error!("Index {} does not fit the short form of '{}'", index, mnemonic)
                })?;
                write_le(&mut payload, index);
            }
            (OperandType::Token(_), Some(Operand::Token(token))) => {
                write_le(&mut payload, token.value());
            }
            (expected, operand) => {
                return Err(malformed_error!(
                    "Operand {:?} does not match '{}' (expects {:?})",
                    operand,
                    mnemonic,
                    expected
                ))
            }
        }

        self.emit_opcode(opcode);
        self.bytecode.extend_from_slice(&payload);
        Ok(())
    }

    /// Emit an instruction whose operand is a metadata token (`call`, `ldstr`, `ldfld`, ...).
    ///
    /// # Errors
    ///
    /// See [`Self::emit_instruction`].
    pub fn emit_token(&mut self, mnemonic: &str, token: Token) -> Result<()> {
        self.emit_instruction(mnemonic, Some(Operand::Token(token)))
    }

    /// Emit the shortest `ldc.i4` form for `value`.
    ///
    /// # Errors
    ///
    /// Never fails for valid tables; the `Result` mirrors the other emitters.
    pub fn emit_ldc_i4(&mut self, value: i32) -> Result<()> {
        match value {
            -1 => self.emit("ldc.i4.m1"),
            0..=8 => self.emit(&format!("ldc.i4.{value}")),
            _ => match i8::try_from(value) {
                Ok(short) => self.emit_instruction("ldc.i4.s", Some(Operand::Int8(short))),
                Err(_) => self.emit_instruction("ldc.i4", Some(Operand::Int32(value))),
            },
        }
    }

    /// Emit the shortest `ldloc` form for `index`.
    ///
    /// # Errors
    ///
    /// Never fails for valid tables; the `Result` mirrors the other emitters.
    pub fn emit_ldloc(&mut self, index: u16) -> Result<()> {
        match index {
            0..=3 => self.emit(&format!("ldloc.{index}")),
            4..=255 => self.emit_instruction("ldloc.s", Some(Operand::Var(index))),
            _ => self.emit_instruction("ldloc", Some(Operand::Var(index))),
        }
    }

    /// Emit the shortest `stloc` form for `index`.
    ///
    /// # Errors
    ///
    /// Never fails for valid tables; the `Result` mirrors the other emitters.
    pub fn emit_stloc(&mut self, index: u16) -> Result<()> {
        match index {
            0..=3 => self.emit(&format!("stloc.{index}")),
            4..=255 => self.emit_instruction("stloc.s", Some(Operand::Var(index))),
            _ => self.emit_instruction("stloc", Some(Operand::Var(index))),
        }
    }

    /// Emit a branch instruction with label reference.
    ///
    /// The displacement is written by [`Self::finish`], once the label is known.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidMnemonic`] if the mnemonic is not recognized and
    /// [`crate::Error::InvalidBranch`] if it is not a branch with a displacement operand.
    pub fn emit_branch(&mut self, mnemonic: &str, label: &str) -> Result<()> {
        let opcode = lookup(mnemonic)?;

        let offset_size = match (opcode.flow, opcode.operand) {
            (
                FlowType::ConditionalBranch | FlowType::UnconditionalBranch,
                OperandType::BranchTarget8,
            ) => 1,
            (
                FlowType::ConditionalBranch | FlowType::UnconditionalBranch,
                OperandType::BranchTarget32,
            ) => 4,
            _ => {
                return Err(Error::InvalidBranch(format!(
                    "instruction '{mnemonic}' is not a branch instruction"
                )))
            }
        };

        self.emit_opcode(opcode);
        self.fixups.push(LabelFixup {
            label: label.to_string(),
            fixup_position: self.bytecode.len(),
            offset_size,
        });
        self.bytecode.resize(self.bytecode.len() + offset_size, 0);

        Ok(())
    }

    /// Emit a switch instruction with one target label per case.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidBranch`] if `labels` is empty.
    pub fn emit_switch(&mut self, labels: &[&str]) -> Result<()> {
        if labels.is_empty() {
            return Err(Error::InvalidBranch(
                "switch must have at least one target".to_string(),
            ));
        }

        let count =
            u32::try_from(labels.len()).map_err(|_| malformed_error!("Too many switch targets"))?;

        self.emit_opcode(lookup("switch")?);
        write_le(&mut self.bytecode, count);

        let fixup_position = self.bytecode.len();
        self.bytecode.resize(fixup_position + labels.len() * 4, 0);

        self.switch_fixups.push(SwitchFixup {
            labels: labels.iter().map(|s| (*s).to_string()).collect(),
            fixup_position,
            instruction_end_position: self.bytecode.len(),
        });

        Ok(())
    }

    /// Define a label at the current position.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DuplicateLabel`] if the label has already been defined.
    pub fn define_label(&mut self, name: &str) -> Result<()> {
        if self.labels.contains_key(name) {
            return Err(Error::DuplicateLabel(name.to_string()));
        }

        self.labels.insert(name.to_string(), self.bytecode.len());
        Ok(())
    }

    /// Returns the current bytecode position (length of emitted bytecode so far).
    #[must_use]
    pub fn current_position(&self) -> usize {
        self.bytecode.len()
    }

    /// Returns the offset of a defined label.
    #[must_use]
    pub fn label_offset(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    fn resolve(&self, label: &str, next_instruction: usize) -> Result<i32> {
        let target = self
            .labels
            .get(label)
            .ok_or_else(|| Error::UndefinedLabel(label.to_string()))?;

        let target = i64::try_from(*target)
            .map_err(|_| malformed_error!("Label position exceeds i64 range"))?;
        let next = i64::try_from(next_instruction)
            .map_err(|_| malformed_error!("Instruction position exceeds i64 range"))?;

        i32::try_from(target - next)
            .map_err(|_| Error::InvalidBranch(format!("displacement to '{label}' exceeds i32")))
    }

    /// Resolve all label references and return the finished IL.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - [`crate::Error::UndefinedLabel`] - Any referenced label is undefined
    /// - [`crate::Error::InvalidBranch`] - A displacement exceeds the range of its field
    pub fn finish(mut self) -> Result<Vec<u8>> {
        for fixup in &self.fixups {
            let next_instruction = fixup.fixup_position + fixup.offset_size;
            let displacement = self.resolve(&fixup.label, next_instruction)?;

            let position = fixup.fixup_position;
            if fixup.offset_size == 1 {
                let short = i8::try_from(displacement).map_err(|_| {
                    Error::InvalidBranch(format!(
                        "displacement {displacement} to '{}' does not fit a short branch",
                        fixup.label
                    ))
                })?;
                self.bytecode[position] = short.to_le_bytes()[0];
            } else {
                self.bytecode[position..position + 4].copy_from_slice(&displacement.to_le_bytes());
            }
        }

        for switch in &self.switch_fixups {
            for (case, label) in switch.labels.iter().enumerate() {
                let displacement = self.resolve(label, switch.instruction_end_position)?;
                let position = switch.fixup_position + case * 4;
                self.bytecode[position..position + 4].copy_from_slice(&displacement.to_le_bytes());
            }
        }

        Ok(self.bytecode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disassembler::decode_stream;

    #[test]
    fn simple_instruction_encoding() -> Result<()> {
        let mut encoder = InstructionEncoder::new();
        encoder.emit("nop")?;
        encoder.emit("ceq")?;
        encoder.emit("ret")?;

        assert_eq!(encoder.finish()?, vec![0x00, 0xFE, 0x01, 0x2A]);
        Ok(())
    }

    #[test]
    fn instruction_with_operands() -> Result<()> {
        let mut encoder = InstructionEncoder::new();
        encoder.emit_ldc_i4(5)?;
        encoder.emit_ldc_i4(-100)?;
        encoder.emit_ldc_i4(1000)?;
        encoder.emit_stloc(4)?;
        encoder.emit_ldloc(300)?;
        encoder.emit_token("ldstr", Token::new(0x7000_0001))?;

        assert_eq!(
            encoder.finish()?,
            vec![
                0x1B, // ldc.i4.5
                0x1F, 0x9C, // ldc.i4.s -100
                0x20, 0xE8, 0x03, 0x00, 0x00, // ldc.i4 1000
                0x13, 0x04, // stloc.s 4
                0xFE, 0x0C, 0x2C, 0x01, // ldloc 300
                0x72, 0x01, 0x00, 0x00, 0x70, // ldstr
            ]
        );
        Ok(())
    }

    #[test]
    fn label_resolution() -> Result<()> {
        let mut encoder = InstructionEncoder::new();
        encoder.define_label("top")?;
        encoder.emit("nop")?;
        encoder.emit_branch("brtrue", "end")?;
        encoder.emit_branch("br.s", "top")?;
        encoder.define_label("end")?;
        encoder.emit("ret")?;

        assert_eq!(encoder.label_offset("end"), Some(8));
        let il = encoder.finish()?;
        let instructions = decode_stream(&il)?;

        assert_eq!(instructions[1].branch_target(), Some(8));
        assert_eq!(instructions[2].branch_target(), Some(0));
        Ok(())
    }

    #[test]
    fn switch_resolution() -> Result<()> {
        let mut encoder = InstructionEncoder::new();
        encoder.emit("ldarg.0")?;
        encoder.emit_switch(&["a", "b"])?;
        encoder.emit("ret")?;
        encoder.define_label("a")?;
        encoder.emit("ret")?;
        encoder.define_label("b")?;
        encoder.emit("ret")?;

        let il = encoder.finish()?;
        let instructions = decode_stream(&il)?;
        assert_eq!(instructions[1].switch_targets(), vec![15, 16]);
        Ok(())
    }

    #[test]
    fn errors() {
        let mut encoder = InstructionEncoder::new();
        assert!(matches!(
            encoder.emit("prefix1"),
            Err(Error::InvalidMnemonic(_))
        ));
        assert!(matches!(encoder.emit("ldc.i4"), Err(Error::Malformed { .. })));
        assert!(matches!(
            encoder.emit_branch("add", "x"),
            Err(Error::InvalidBranch(_))
        ));
        assert!(matches!(encoder.emit_switch(&[]), Err(Error::InvalidBranch(_))));

        encoder.define_label("x").unwrap();
        assert!(matches!(
            encoder.define_label("x"),
            Err(Error::DuplicateLabel(_))
        ));

        encoder.emit_branch("br", "missing").unwrap();
        assert!(matches!(encoder.finish(), Err(Error::UndefinedLabel(_))));
    }

    #[test]
    fn short_branch_out_of_range() {
        let mut encoder = InstructionEncoder::new();
        encoder.emit_branch("br.s", "far").unwrap();
        for _ in 0..200 {
            encoder.emit("nop").unwrap();
        }
        encoder.define_label("far").unwrap();
        encoder.emit("ret").unwrap();

        assert!(matches!(encoder.finish(), Err(Error::InvalidBranch(_))));
    }
}
