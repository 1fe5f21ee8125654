//! Method body scanning for referenced types

use super::constant_pool::{Constant, ConstantPool};
use super::descriptor::{class_constant_names, type_names};
use super::reader::ClassReader;
use crate::error::{Result, ScanError};

// Opcodes that name a type through the constant pool
const LDC: u8 = 0x12;
const LDC_W: u8 = 0x13;
const TABLESWITCH: u8 = 0xaa;
const LOOKUPSWITCH: u8 = 0xab;
const GETSTATIC: u8 = 0xb2;
const INVOKEINTERFACE: u8 = 0xb9;
const INVOKEDYNAMIC: u8 = 0xba;
const NEW: u8 = 0xbb;
const ANEWARRAY: u8 = 0xbd;
const CHECKCAST: u8 = 0xc0;
const INSTANCEOF: u8 = 0xc1;
const WIDE: u8 = 0xc4;
const MULTIANEWARRAY: u8 = 0xc5;
const IINC: u8 = 0x84;

/// Types referenced from method bodies plus the bootstrap methods still to resolve
#[derive(Debug, Default)]
pub struct CodeReferences {
    pub types: Vec<String>,
    pub bootstrap_indices: Vec<u16>,
}

impl CodeReferences {
    pub fn add(&mut self, names: impl IntoIterator<Item = String>) {
        for name in names {
            if !self.types.contains(&name) {
                self.types.push(name);
            }
        }
    }

    fn add_bootstrap(&mut self, index: u16) {
        if !self.bootstrap_indices.contains(&index) {
            self.bootstrap_indices.push(index);
        }
    }

    /// Owner and descriptor types of a field or method reference
    pub fn add_member(&mut self, pool: &ConstantPool, index: u16) -> Result<()> {
        let member = pool.member_ref(index)?;
        self.add(class_constant_names(member.owner));
        self.add(type_names(member.descriptor));
        Ok(())
    }

    /// Class, method type and method handle constants; anything else carries no type
    pub fn add_loadable(&mut self, pool: &ConstantPool, index: u16) -> Result<()> {
        match pool.get(index)? {
            Constant::Class { .. } => self.add(class_constant_names(pool.class_name(index)?)),
            Constant::MethodType { descriptor_index } => {
                self.add(type_names(pool.utf8(*descriptor_index)?))
            }
            Constant::MethodHandle { reference_index, .. } => self.add_member(pool, *reference_index)?,
            _ => {}
        }
        Ok(())
    }
}

/// Walk one Code attribute's instructions
pub fn scan_code(code: &[u8], pool: &ConstantPool, refs: &mut CodeReferences) -> Result<()> {
    let mut reader = ClassReader::new(code);

    while !reader.is_empty() {
        let pc = reader.position();
        let opcode = reader.u8()?;
        match opcode {
            LDC => {
                let index = reader.u8()? as u16;
                refs.add_loadable(pool, index)?;
            }
            LDC_W => {
                let index = reader.u16()?;
                refs.add_loadable(pool, index)?;
            }
            GETSTATIC..=0xb8 => {
                let index = reader.u16()?;
                refs.add_member(pool, index)?;
            }
            INVOKEINTERFACE => {
                let index = reader.u16()?;
                reader.skip(2)?;
                refs.add_member(pool, index)?;
            }
            INVOKEDYNAMIC => {
                let index = reader.u16()?;
                reader.skip(2)?;
                if let Constant::InvokeDynamic { bootstrap_index, name_and_type_index } = pool.get(index)? {
                    let (_, descriptor) = pool.name_and_type(*name_and_type_index)?;
                    refs.add(type_names(descriptor));
                    refs.add_bootstrap(*bootstrap_index);
                }
            }
            NEW | ANEWARRAY | CHECKCAST | INSTANCEOF => {
                let index = reader.u16()?;
                refs.add(class_constant_names(pool.class_name(index)?));
            }
            MULTIANEWARRAY => {
                let index = reader.u16()?;
                reader.skip(1)?;
                refs.add(class_constant_names(pool.class_name(index)?));
            }
            TABLESWITCH => {
                align(&mut reader, pc)?;
                reader.skip(4)?;
                let low = reader.i32()?;
                let high = reader.i32()?;
                if high < low {
                    return Err(ScanError::parse("", format!("tableswitch at {} has high < low", pc)));
                }
                let entries = (high as i64 - low as i64 + 1) as usize;
                reader.skip(entries * 4)?;
            }
            LOOKUPSWITCH => {
                align(&mut reader, pc)?;
                reader.skip(4)?;
                let pairs = reader.i32()?;
                if pairs < 0 {
                    return Err(ScanError::parse("", format!("lookupswitch at {} has negative size", pc)));
                }
                reader.skip(pairs as usize * 8)?;
            }
            WIDE => {
                let widened = reader.u8()?;
                reader.skip(if widened == IINC { 4 } else { 2 })?;
            }
            other => {
                let length = operand_length(other).ok_or_else(|| {
                    ScanError::parse("", format!("invalid opcode 0x{:02x} at {}", other, pc))
                })?;
                reader.skip(length)?;
            }
        }
    }

    Ok(())
}

// Switch operands start at the next 4-byte boundary of the method's code
fn align(reader: &mut ClassReader<'_>, pc: usize) -> Result<()> {
    let padding = (4 - ((pc + 1) % 4)) % 4;
    reader.skip(padding)
}

/// Operand bytes of the fixed-length instructions not handled above
fn operand_length(opcode: u8) -> Option<usize> {
    match opcode {
        0x00..=0x0f => Some(0),
        0x10 => Some(1),
        0x11 => Some(2),
        0x14 => Some(2),
        0x15..=0x19 => Some(1),
        0x1a..=0x35 => Some(0),
        0x36..=0x3a => Some(1),
        0x3b..=0x83 => Some(0),
        IINC => Some(2),
        0x85..=0x98 => Some(0),
        0x99..=0xa8 => Some(2),
        0xa9 => Some(1),
        0xac..=0xb1 => Some(0),
        0xbc => Some(1),
        0xbe | 0xbf => Some(0),
        0xc2 | 0xc3 => Some(0),
        0xc6 | 0xc7 => Some(2),
        0xc8 | 0xc9 => Some(4),
        0xca | 0xfe | 0xff => Some(0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operand_lengths() {
        assert_eq!(operand_length(0x00), Some(0));
        assert_eq!(operand_length(0x10), Some(1));
        assert_eq!(operand_length(0xa7), Some(2));
        assert_eq!(operand_length(0xc8), Some(4));
        assert_eq!(operand_length(0xcb), None);
    }

    #[test]
    fn test_switch_padding_and_invalid_opcode() {
        let pool = ConstantPool::default();
        let mut refs = CodeReferences::default();
        // iconst_0; tableswitch (pad 2) default=0 low=0 high=0 one offset; return
        let code = [
            0x03, 0xaa, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xb1,
        ];
        scan_code(&code, &pool, &mut refs).unwrap();
        assert!(refs.types.is_empty());

        assert!(scan_code(&[0xcb], &pool, &mut refs).is_err());
    }
}
