//! Minimal class file writer for test fixtures
//!
//! Produces structurally valid class files with just the pieces the scanner reads:
//! hierarchy, members, markers, generic signatures and a small set of instructions.
//! Method bodies are not verifiable bytecode; stack sizes are fixed placeholders.

use super::descriptor::to_internal;
use crate::markers::{Marker, MarkerValue};
use crate::types::*;
use byteorder::{BigEndian, WriteBytesExt};
use std::collections::HashMap;

const ACC_SUPER: u16 = 0x0020;
const REF_INVOKE_STATIC: u8 = 6;
const REF_NEW_INVOKE_SPECIAL: u8 = 8;
const LAMBDA_METAFACTORY: &str = "java.lang.invoke.LambdaMetafactory";
const METAFACTORY_DESCRIPTOR: &str = "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodHandle;Ljava/lang/invoke/MethodType;)Ljava/lang/invoke/CallSite;";

/// Instructions the builder knows how to encode
#[derive(Debug, Clone)]
pub enum Instruction {
    New(String),
    /// Class name or array descriptor such as `[Lcom/app/Cell;`
    CheckCast(String),
    InstanceOf(String),
    InvokeStatic { owner: String, name: String, descriptor: String },
    InvokeVirtual { owner: String, name: String, descriptor: String },
    InvokeInterface { owner: String, name: String, descriptor: String },
    GetStatic { owner: String, name: String, descriptor: String },
    LdcClass(String),
    /// Array descriptor and dimension count
    MultiANewArray(String, u8),
    /// Exception-table entry covering the whole body; encodes no opcode
    Catch(String),
    /// `Target::new` passed as a `Supplier`
    ConstructorReference(String),
}

struct Member {
    name: String,
    descriptor: String,
    access: u16,
    signature: Option<String>,
    markers: Vec<Marker>,
    code: Option<Vec<Instruction>>,
    default_value: Option<MarkerValue>,
}

impl Member {
    fn new(name: &str, descriptor: &str, access: u16) -> Self {
        Self {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            access,
            signature: None,
            markers: Vec::new(),
            code: None,
            default_value: None,
        }
    }
}

pub struct ClassFileBuilder {
    name: String,
    access: u16,
    major_version: u16,
    super_class: Option<String>,
    interfaces: Vec<String>,
    signature: Option<String>,
    markers: Vec<Marker>,
    fields: Vec<Member>,
    methods: Vec<Member>,
}

impl ClassFileBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            access: ACC_PUBLIC | ACC_SUPER,
            major_version: 61,
            super_class: Some("java.lang.Object".to_string()),
            interfaces: Vec::new(),
            signature: None,
            markers: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Declaration of a marker type
    pub fn annotation_type(name: &str) -> Self {
        let mut builder = Self::new(name);
        builder.access = ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT | ACC_ANNOTATION;
        builder.interfaces.push("java.lang.annotation.Annotation".to_string());
        builder
    }

    pub fn version(mut self, major: u16) -> Self {
        self.major_version = major;
        self
    }

    pub fn super_class(mut self, name: &str) -> Self {
        self.super_class = Some(name.to_string());
        self
    }

    pub fn interface(mut self, name: &str) -> Self {
        self.interfaces.push(name.to_string());
        self
    }

    pub fn abstract_class(mut self) -> Self {
        self.access |= ACC_ABSTRACT;
        self
    }

    pub fn interface_type(mut self) -> Self {
        self.access = ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT;
        self
    }

    /// Generic class signature, e.g. `Lcom/vaadin/flow/component/WebComponentExporter<Lcom/app/Card;>;`
    pub fn signature(mut self, signature: &str) -> Self {
        self.signature = Some(signature.to_string());
        self
    }

    pub fn marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    pub fn field(mut self, name: &str, descriptor: &str) -> Self {
        self.fields.push(Member::new(name, descriptor, ACC_PUBLIC));
        self
    }

    /// Marker on the most recently added field
    pub fn field_marker(mut self, marker: Marker) -> Self {
        if let Some(field) = self.fields.last_mut() {
            field.markers.push(marker);
        }
        self
    }

    pub fn method(mut self, name: &str, descriptor: &str, code: Vec<Instruction>) -> Self {
        let mut method = Member::new(name, descriptor, ACC_PUBLIC);
        method.code = Some(code);
        self.methods.push(method);
        self
    }

    /// Generic signature of the most recently added method
    pub fn method_signature(mut self, signature: &str) -> Self {
        if let Some(method) = self.methods.last_mut() {
            method.signature = Some(signature.to_string());
        }
        self
    }

    /// Marker on the most recently added method
    pub fn method_marker(mut self, marker: Marker) -> Self {
        if let Some(method) = self.methods.last_mut() {
            method.markers.push(marker);
        }
        self
    }

    /// Attribute method of a marker type with a declared default
    pub fn attribute_default(mut self, attribute: &str, value: MarkerValue) -> Self {
        let descriptor = format!("(){}", value_descriptor(&value));
        let mut method = Member::new(attribute, &descriptor, ACC_PUBLIC | ACC_ABSTRACT);
        method.default_value = Some(value);
        self.methods.push(method);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut pool = PoolWriter::default();
        let mut body = Out::default();

        let this_index = pool.class(&self.name);
        let super_index = self.super_class.as_deref().map(|name| pool.class(name)).unwrap_or(0);
        body.u16(self.access);
        body.u16(this_index);
        body.u16(super_index);
        body.u16(self.interfaces.len() as u16);
        for interface in &self.interfaces {
            let index = pool.class(interface);
            body.u16(index);
        }

        let mut bootstrap_methods: Vec<(u16, Vec<u16>)> = Vec::new();

        body.u16(self.fields.len() as u16);
        for field in &self.fields {
            write_member(&mut body, &mut pool, field, &mut bootstrap_methods);
        }
        body.u16(self.methods.len() as u16);
        for method in &self.methods {
            write_member(&mut body, &mut pool, method, &mut bootstrap_methods);
        }

        let mut attributes: Vec<(u16, Vec<u8>)> = Vec::new();
        if let Some(signature) = &self.signature {
            attributes.push(signature_attribute(&mut pool, signature));
        }
        if !self.markers.is_empty() {
            attributes.push(markers_attribute(&mut pool, &self.markers));
        }
        if !bootstrap_methods.is_empty() {
            let mut data = Out::default();
            data.u16(bootstrap_methods.len() as u16);
            for (method_ref, arguments) in &bootstrap_methods {
                data.u16(*method_ref);
                data.u16(arguments.len() as u16);
                for argument in arguments {
                    data.u16(*argument);
                }
            }
            attributes.push((pool.utf8(ATTR_BOOTSTRAP_METHODS), data.0));
        }
        write_attributes(&mut body, &attributes);

        let mut out = Out::default();
        out.u32(CLASS_MAGIC);
        out.u16(0);
        out.u16(self.major_version);
        pool.write(&mut out);
        out.bytes(&body.0);
        out.0
    }
}

fn write_member(
    out: &mut Out,
    pool: &mut PoolWriter,
    member: &Member,
    bootstrap_methods: &mut Vec<(u16, Vec<u16>)>,
) {
    out.u16(member.access);
    let name_index = pool.utf8(&member.name);
    let descriptor_index = pool.utf8(&member.descriptor);
    out.u16(name_index);
    out.u16(descriptor_index);

    let mut attributes = Vec::new();
    if let Some(signature) = &member.signature {
        attributes.push(signature_attribute(pool, signature));
    }
    if !member.markers.is_empty() {
        attributes.push(markers_attribute(pool, &member.markers));
    }
    if let Some(code) = &member.code {
        attributes.push(code_attribute(pool, code, bootstrap_methods));
    }
    if let Some(value) = &member.default_value {
        let mut data = Out::default();
        write_element_value(&mut data, pool, value);
        attributes.push((pool.utf8(ATTR_ANNOTATION_DEFAULT), data.0));
    }
    write_attributes(out, &attributes);
}

fn write_attributes(out: &mut Out, attributes: &[(u16, Vec<u8>)]) {
    out.u16(attributes.len() as u16);
    for (name_index, data) in attributes {
        out.u16(*name_index);
        out.u32(data.len() as u32);
        out.bytes(data);
    }
}

fn signature_attribute(pool: &mut PoolWriter, signature: &str) -> (u16, Vec<u8>) {
    let mut data = Out::default();
    data.u16(pool.utf8(signature));
    (pool.utf8(ATTR_SIGNATURE), data.0)
}

fn markers_attribute(pool: &mut PoolWriter, markers: &[Marker]) -> (u16, Vec<u8>) {
    let mut data = Out::default();
    data.u16(markers.len() as u16);
    for marker in markers {
        write_marker(&mut data, pool, marker);
    }
    (pool.utf8(ATTR_RUNTIME_VISIBLE_ANNOTATIONS), data.0)
}

fn write_marker(out: &mut Out, pool: &mut PoolWriter, marker: &Marker) {
    out.u16(pool.utf8(&object_descriptor(&marker.kind)));
    out.u16(marker.attributes.len() as u16);
    for (name, value) in &marker.attributes {
        out.u16(pool.utf8(name));
        write_element_value(out, pool, value);
    }
}

fn write_element_value(out: &mut Out, pool: &mut PoolWriter, value: &MarkerValue) {
    match value {
        MarkerValue::Bool(flag) => {
            out.u8(b'Z');
            out.u16(pool.integer(*flag as i32));
        }
        MarkerValue::Int(number) => match i32::try_from(*number) {
            Ok(small) => {
                out.u8(b'I');
                out.u16(pool.integer(small));
            }
            Err(_) => {
                out.u8(b'J');
                out.u16(pool.long(*number));
            }
        },
        MarkerValue::Float(number) => {
            out.u8(b'D');
            out.u16(pool.double(*number));
        }
        MarkerValue::Char(c) => {
            out.u8(b'C');
            out.u16(pool.integer(*c as i32));
        }
        MarkerValue::Str(text) => {
            out.u8(b's');
            out.u16(pool.utf8(text));
        }
        MarkerValue::Class(name) => {
            out.u8(b'c');
            let descriptor = if name.len() == 1 { name.clone() } else { object_descriptor(name) };
            out.u16(pool.utf8(&descriptor));
        }
        MarkerValue::Enum { type_name, constant } => {
            out.u8(b'e');
            out.u16(pool.utf8(&object_descriptor(type_name)));
            out.u16(pool.utf8(constant));
        }
        MarkerValue::Nested(marker) => {
            out.u8(b'@');
            write_marker(out, pool, marker);
        }
        MarkerValue::Array(items) => {
            out.u8(b'[');
            out.u16(items.len() as u16);
            for item in items {
                write_element_value(out, pool, item);
            }
        }
    }
}

fn code_attribute(
    pool: &mut PoolWriter,
    instructions: &[Instruction],
    bootstrap_methods: &mut Vec<(u16, Vec<u16>)>,
) -> (u16, Vec<u8>) {
    let mut code = Out::default();
    let mut catch_types = Vec::new();
    for instruction in instructions {
        match instruction {
            Instruction::New(name) => {
                code.u8(0xbb);
                code.u16(pool.class(name));
            }
            Instruction::CheckCast(name) => {
                code.u8(0xc0);
                code.u16(pool.class(name));
            }
            Instruction::InstanceOf(name) => {
                code.u8(0xc1);
                code.u16(pool.class(name));
            }
            Instruction::InvokeStatic { owner, name, descriptor } => {
                code.u8(0xb8);
                code.u16(pool.member(CONSTANT_METHODREF, owner, name, descriptor));
            }
            Instruction::InvokeVirtual { owner, name, descriptor } => {
                code.u8(0xb6);
                code.u16(pool.member(CONSTANT_METHODREF, owner, name, descriptor));
            }
            Instruction::InvokeInterface { owner, name, descriptor } => {
                code.u8(0xb9);
                code.u16(pool.member(CONSTANT_INTERFACE_METHODREF, owner, name, descriptor));
                code.u8(1);
                code.u8(0);
            }
            Instruction::GetStatic { owner, name, descriptor } => {
                code.u8(0xb2);
                code.u16(pool.member(CONSTANT_FIELDREF, owner, name, descriptor));
            }
            Instruction::LdcClass(name) => {
                code.u8(0x13);
                code.u16(pool.class(name));
            }
            Instruction::MultiANewArray(descriptor, dimensions) => {
                code.u8(0xc5);
                code.u16(pool.class(descriptor));
                code.u8(*dimensions);
            }
            Instruction::Catch(name) => catch_types.push(pool.class(name)),
            Instruction::ConstructorReference(target) => {
                let factory = pool.member(CONSTANT_METHODREF, LAMBDA_METAFACTORY, "metafactory", METAFACTORY_DESCRIPTOR);
                let factory_handle = pool.method_handle(REF_INVOKE_STATIC, factory);
                let erased = pool.method_type("()Ljava/lang/Object;");
                let constructor = pool.member(CONSTANT_METHODREF, target, "<init>", "()V");
                let constructor_handle = pool.method_handle(REF_NEW_INVOKE_SPECIAL, constructor);
                let instantiated = pool.method_type(&format!("(){}", object_descriptor(target)));

                let bootstrap_index = bootstrap_methods.len() as u16;
                bootstrap_methods.push((factory_handle, vec![erased, constructor_handle, instantiated]));

                code.u8(0xba);
                code.u16(pool.invoke_dynamic(bootstrap_index, "get", "()Ljava/util/function/Supplier;"));
                code.u16(0);
            }
        }
    }
    code.u8(0xb1);

    let mut data = Out::default();
    data.u16(8);
    data.u16(8);
    data.u32(code.0.len() as u32);
    data.bytes(&code.0);
    data.u16(catch_types.len() as u16);
    for catch_type in catch_types {
        data.u16(0);
        data.u16(code.0.len() as u16);
        data.u16(0);
        data.u16(catch_type);
    }
    data.u16(0);
    (pool.utf8(ATTR_CODE), data.0)
}

fn object_descriptor(name: &str) -> String {
    format!("L{};", to_internal(name))
}

fn value_descriptor(value: &MarkerValue) -> String {
    match value {
        MarkerValue::Bool(_) => "Z".to_string(),
        MarkerValue::Int(_) => "I".to_string(),
        MarkerValue::Float(_) => "D".to_string(),
        MarkerValue::Char(_) => "C".to_string(),
        MarkerValue::Str(_) => "Ljava/lang/String;".to_string(),
        MarkerValue::Class(_) => "Ljava/lang/Class;".to_string(),
        MarkerValue::Enum { type_name, .. } => object_descriptor(type_name),
        MarkerValue::Nested(marker) => object_descriptor(&marker.kind),
        MarkerValue::Array(items) => match items.first() {
            Some(first) => format!("[{}", value_descriptor(first)),
            None => "[Ljava/lang/String;".to_string(),
        },
    }
}

#[derive(Default)]
struct Out(Vec<u8>);

// Writes into a Vec cannot fail
impl Out {
    fn u8(&mut self, value: u8) {
        self.0.write_u8(value).expect("vec write");
    }

    fn u16(&mut self, value: u16) {
        self.0.write_u16::<BigEndian>(value).expect("vec write");
    }

    fn u32(&mut self, value: u32) {
        self.0.write_u32::<BigEndian>(value).expect("vec write");
    }

    fn bytes(&mut self, data: &[u8]) {
        self.0.extend_from_slice(data);
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
enum PoolKey {
    Utf8(String),
    Integer(i32),
    Long(i64),
    Double(u64),
    Class(String),
    NameAndType(u16, u16),
    Member(u8, u16, u16),
    MethodHandle(u8, u16),
    MethodType(u16),
    InvokeDynamic(u16, u16),
}

#[derive(Default)]
struct PoolWriter {
    data: Out,
    next: u16,
    indices: HashMap<PoolKey, u16>,
}

impl PoolWriter {
    fn intern(&mut self, key: PoolKey, write: impl FnOnce(&mut Out)) -> u16 {
        if let Some(index) = self.indices.get(&key) {
            return *index;
        }
        let index = self.next.max(1);
        let wide = matches!(key, PoolKey::Long(_) | PoolKey::Double(_));
        self.next = index + if wide { 2 } else { 1 };
        write(&mut self.data);
        self.indices.insert(key, index);
        index
    }

    fn utf8(&mut self, text: &str) -> u16 {
        self.intern(PoolKey::Utf8(text.to_string()), |out| {
            out.u8(CONSTANT_UTF8);
            out.u16(text.len() as u16);
            out.bytes(text.as_bytes());
        })
    }

    fn integer(&mut self, value: i32) -> u16 {
        self.intern(PoolKey::Integer(value), |out| {
            out.u8(CONSTANT_INTEGER);
            out.u32(value as u32);
        })
    }

    fn long(&mut self, value: i64) -> u16 {
        self.intern(PoolKey::Long(value), |out| {
            out.u8(CONSTANT_LONG);
            out.u32((value >> 32) as u32);
            out.u32(value as u32);
        })
    }

    fn double(&mut self, value: f64) -> u16 {
        let bits = value.to_bits();
        self.intern(PoolKey::Double(bits), |out| {
            out.u8(CONSTANT_DOUBLE);
            out.u32((bits >> 32) as u32);
            out.u32(bits as u32);
        })
    }

    fn class(&mut self, name: &str) -> u16 {
        let name_index = self.utf8(&to_internal(name));
        self.intern(PoolKey::Class(name.to_string()), |out| {
            out.u8(CONSTANT_CLASS);
            out.u16(name_index);
        })
    }

    fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        self.intern(PoolKey::NameAndType(name_index, descriptor_index), |out| {
            out.u8(CONSTANT_NAME_AND_TYPE);
            out.u16(name_index);
            out.u16(descriptor_index);
        })
    }

    fn member(&mut self, tag: u8, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(owner);
        let nat_index = self.name_and_type(name, descriptor);
        self.intern(PoolKey::Member(tag, class_index, nat_index), |out| {
            out.u8(tag);
            out.u16(class_index);
            out.u16(nat_index);
        })
    }

    fn method_handle(&mut self, kind: u8, reference: u16) -> u16 {
        self.intern(PoolKey::MethodHandle(kind, reference), |out| {
            out.u8(CONSTANT_METHOD_HANDLE);
            out.u8(kind);
            out.u16(reference);
        })
    }

    fn method_type(&mut self, descriptor: &str) -> u16 {
        let descriptor_index = self.utf8(descriptor);
        self.intern(PoolKey::MethodType(descriptor_index), |out| {
            out.u8(CONSTANT_METHOD_TYPE);
            out.u16(descriptor_index);
        })
    }

    fn invoke_dynamic(&mut self, bootstrap_index: u16, name: &str, descriptor: &str) -> u16 {
        let nat_index = self.name_and_type(name, descriptor);
        self.intern(PoolKey::InvokeDynamic(bootstrap_index, nat_index), |out| {
            out.u8(CONSTANT_INVOKE_DYNAMIC);
            out.u16(bootstrap_index);
            out.u16(nat_index);
        })
    }

    fn write(&self, out: &mut Out) {
        out.u16(self.next.max(1));
        out.bytes(&self.data.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::{parse_class, ParseMode};

    #[test]
    fn test_marker_values_survive_encoding() {
        let marker = Marker::new(THEME)
            .with("value", "my-theme")
            .with("themeClass", MarkerValue::Class("com.app.CustomTheme".to_string()))
            .with("variant", MarkerValue::Int(1 << 40))
            .with("weight", MarkerValue::Float(0.5));
        let bytes = ClassFileBuilder::new("com.app.Shell").marker(marker.clone()).build();
        let parsed = parse_class(&bytes, ParseMode::Declaration).unwrap();
        let markers: Vec<_> = parsed.markers(crate::classfile::MarkerTarget::Type).collect();
        assert_eq!(markers, vec![&marker]);
    }
}
