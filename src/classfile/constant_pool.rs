//! Constant pool decoding

use super::reader::ClassReader;
use crate::error::{Result, ScanError};
use crate::types::*;

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// Slot 0 and the second slot of long/double entries
    Unusable,
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name_index: u16 },
    String { string_index: u16 },
    FieldRef { class_index: u16, name_and_type_index: u16 },
    MethodRef { class_index: u16, name_and_type_index: u16 },
    InterfaceMethodRef { class_index: u16, name_and_type_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
    MethodHandle { reference_kind: u8, reference_index: u16 },
    MethodType { descriptor_index: u16 },
    Dynamic { bootstrap_index: u16, name_and_type_index: u16 },
    InvokeDynamic { bootstrap_index: u16, name_and_type_index: u16 },
    Module { name_index: u16 },
    Package { name_index: u16 },
}

/// Field or method reference resolved to its strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberRef<'a> {
    pub owner: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
}

#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    pub fn read(reader: &mut ClassReader<'_>) -> Result<Self> {
        let count = reader.u16()? as usize;
        let mut entries = Vec::with_capacity(count.max(1));
        entries.push(Constant::Unusable);

        while entries.len() < count {
            let index = entries.len();
            let tag = reader.u8()?;
            let constant = match tag {
                CONSTANT_UTF8 => {
                    let len = reader.u16()? as usize;
                    Constant::Utf8(decode_modified_utf8(reader.bytes(len)?))
                }
                CONSTANT_INTEGER => Constant::Integer(reader.i32()?),
                CONSTANT_FLOAT => Constant::Float(reader.f32()?),
                CONSTANT_LONG => Constant::Long(reader.i64()?),
                CONSTANT_DOUBLE => Constant::Double(reader.f64()?),
                CONSTANT_CLASS => Constant::Class { name_index: reader.u16()? },
                CONSTANT_STRING => Constant::String { string_index: reader.u16()? },
                CONSTANT_FIELDREF => Constant::FieldRef {
                    class_index: reader.u16()?,
                    name_and_type_index: reader.u16()?,
                },
                CONSTANT_METHODREF => Constant::MethodRef {
                    class_index: reader.u16()?,
                    name_and_type_index: reader.u16()?,
                },
                CONSTANT_INTERFACE_METHODREF => Constant::InterfaceMethodRef {
                    class_index: reader.u16()?,
                    name_and_type_index: reader.u16()?,
                },
                CONSTANT_NAME_AND_TYPE => Constant::NameAndType {
                    name_index: reader.u16()?,
                    descriptor_index: reader.u16()?,
                },
                CONSTANT_METHOD_HANDLE => Constant::MethodHandle {
                    reference_kind: reader.u8()?,
                    reference_index: reader.u16()?,
                },
                CONSTANT_METHOD_TYPE => Constant::MethodType { descriptor_index: reader.u16()? },
                CONSTANT_DYNAMIC => Constant::Dynamic {
                    bootstrap_index: reader.u16()?,
                    name_and_type_index: reader.u16()?,
                },
                CONSTANT_INVOKE_DYNAMIC => Constant::InvokeDynamic {
                    bootstrap_index: reader.u16()?,
                    name_and_type_index: reader.u16()?,
                },
                CONSTANT_MODULE => Constant::Module { name_index: reader.u16()? },
                CONSTANT_PACKAGE => Constant::Package { name_index: reader.u16()? },
                other => {
                    return Err(ScanError::parse(
                        "",
                        format!("unknown constant pool tag {} at index {}", other, index),
                    ));
                }
            };
            let wide = matches!(constant, Constant::Long(_) | Constant::Double(_));
            entries.push(constant);
            if wide {
                entries.push(Constant::Unusable);
            }
        }

        if entries.len() > count.max(1) {
            return Err(ScanError::parse("", "wide constant overflows the constant pool"));
        }

        Ok(Self { entries })
    }

    pub fn get(&self, index: u16) -> Result<&Constant> {
        match self.entries.get(index as usize) {
            Some(Constant::Unusable) | None => Err(ScanError::parse(
                "",
                format!("invalid constant pool index {}", index),
            )),
            Some(constant) => Ok(constant),
        }
    }

    pub fn utf8(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Utf8(value) => Ok(value),
            other => Err(mismatch(index, "Utf8", other)),
        }
    }

    /// Internal name (or array descriptor) of a Class constant
    pub fn class_name(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Class { name_index } => self.utf8(*name_index),
            other => Err(mismatch(index, "Class", other)),
        }
    }

    pub fn name_and_type(&self, index: u16) -> Result<(&str, &str)> {
        match self.get(index)? {
            Constant::NameAndType { name_index, descriptor_index } => {
                Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?))
            }
            other => Err(mismatch(index, "NameAndType", other)),
        }
    }

    pub fn member_ref(&self, index: u16) -> Result<MemberRef<'_>> {
        match self.get(index)? {
            Constant::FieldRef { class_index, name_and_type_index }
            | Constant::MethodRef { class_index, name_and_type_index }
            | Constant::InterfaceMethodRef { class_index, name_and_type_index } => {
                let owner = self.class_name(*class_index)?;
                let (name, descriptor) = self.name_and_type(*name_and_type_index)?;
                Ok(MemberRef { owner, name, descriptor })
            }
            other => Err(mismatch(index, "member reference", other)),
        }
    }
}

fn mismatch(index: u16, expected: &str, found: &Constant) -> ScanError {
    ScanError::parse(
        "",
        format!("constant pool index {} should be {} but is {:?}", index, expected, found),
    )
}

/// Decode the JVM's modified UTF-8 (encoded NUL and surrogate pairs)
pub fn decode_modified_utf8(bytes: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b & 0x80 == 0 {
            units.push(b as u16);
            i += 1;
        } else if b & 0xE0 == 0xC0 && i + 1 < bytes.len() {
            units.push((((b & 0x1F) as u16) << 6) | (bytes[i + 1] & 0x3F) as u16);
            i += 2;
        } else if b & 0xF0 == 0xE0 && i + 2 < bytes.len() {
            units.push(
                (((b & 0x0F) as u16) << 12)
                    | (((bytes[i + 1] & 0x3F) as u16) << 6)
                    | (bytes[i + 2] & 0x3F) as u16,
            );
            i += 3;
        } else {
            units.push(0xFFFD);
            i += 1;
        }
    }
    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_bytes(entries: &[&[u8]], count: u16) -> Vec<u8> {
        let mut data = count.to_be_bytes().to_vec();
        for entry in entries {
            data.extend_from_slice(entry);
        }
        data
    }

    #[test]
    fn test_class_and_member_resolution() {
        let data = pool_bytes(
            &[
                &[1, 0, 11, b'c', b'o', b'm', b'/', b'a', b'/', b'V', b'i', b'e', b'w', b's'],
                &[7, 0, 1],
                &[1, 0, 3, b'r', b'u', b'n'],
                &[1, 0, 3, b'(', b')', b'V'],
                &[12, 0, 3, 0, 4],
                &[10, 0, 2, 0, 5],
            ],
            7,
        );
        let mut reader = ClassReader::new(&data);
        let pool = ConstantPool::read(&mut reader).unwrap();
        assert_eq!(pool.class_name(2).unwrap(), "com/a/Views");
        let member = pool.member_ref(6).unwrap();
        assert_eq!(member.owner, "com/a/Views");
        assert_eq!(member.name, "run");
        assert_eq!(member.descriptor, "()V");
    }

    #[test]
    fn test_long_takes_two_slots() {
        let data = pool_bytes(&[&[5, 0, 0, 0, 0, 0, 0, 0, 7], &[1, 0, 1, b'x']], 4);
        let mut reader = ClassReader::new(&data);
        let pool = ConstantPool::read(&mut reader).unwrap();
        assert_eq!(pool.get(1).unwrap(), &Constant::Long(7));
        assert!(pool.get(2).is_err());
        assert_eq!(pool.utf8(3).unwrap(), "x");
    }

    #[test]
    fn test_unknown_tag_fails() {
        let data = pool_bytes(&[&[99]], 2);
        let mut reader = ClassReader::new(&data);
        assert!(ConstantPool::read(&mut reader).is_err());
    }

    #[test]
    fn test_modified_utf8_nul() {
        assert_eq!(decode_modified_utf8(&[b'a', 0xC0, 0x80, b'b']), "a\u{0}b");
    }
}
