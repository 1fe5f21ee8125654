//! Streaming reader for compiled JVM class files
//!
//! One pass over the binary form produces an ordered sequence of [`ClassEvent`]s:
//! the type hierarchy, member signatures, flattened marker occurrences and every type
//! referenced from method bodies. Nothing is loaded or executed.
//!
//! Invokedynamic bootstrap arguments are only followed when they are class, method
//! type or method handle constants; other argument kinds are skipped.

pub mod bytecode;
pub mod constant_pool;
pub mod descriptor;
pub mod reader;

#[cfg(any(test, feature = "test-utils"))]
pub mod builder;

use crate::error::{Result, ScanError};
use crate::markers::{flatten, Marker, MarkerValue};
use crate::types::*;
use bytecode::{scan_code, CodeReferences};
use constant_pool::{Constant, ConstantPool};
use descriptor::{class_value_name, marker_type_name, to_dotted, type_names};
use reader::ClassReader;

/// What a marker is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerTarget {
    Type,
    Method,
    Field,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassEvent {
    SuperType(String),
    Interface(String),
    /// Generic signature of the class itself
    Signature(String),
    Field { name: String, descriptor: String, signature: Option<String> },
    Method { name: String, descriptor: String, signature: Option<String> },
    Marker { target: MarkerTarget, marker: Marker },
    /// A type named inside a method body or bootstrap method
    TypeReference(String),
    /// Declared default of a marker attribute (only in [`ParseMode::Defaults`])
    MarkerDefault { attribute: String, value: MarkerValue },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Everything, including method bodies
    Full,
    /// Hierarchy, members and markers; method bodies are skipped
    Declaration,
    /// Only the default values of a marker type's attribute methods
    Defaults,
}

#[derive(Debug, Clone)]
pub struct ParsedClass {
    /// Fully-qualified dotted name
    pub name: String,
    pub access_flags: u16,
    pub major_version: u16,
    pub minor_version: u16,
    pub events: Vec<ClassEvent>,
}

impl ParsedClass {
    pub fn super_name(&self) -> Option<&str> {
        self.events.iter().find_map(|event| match event {
            ClassEvent::SuperType(name) => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &str> {
        self.events.iter().filter_map(|event| match event {
            ClassEvent::Interface(name) => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn signature(&self) -> Option<&str> {
        self.events.iter().find_map(|event| match event {
            ClassEvent::Signature(signature) => Some(signature.as_str()),
            _ => None,
        })
    }

    pub fn markers(&self, target: MarkerTarget) -> impl Iterator<Item = &Marker> {
        self.events.iter().filter_map(move |event| match event {
            ClassEvent::Marker { target: t, marker } if *t == target => Some(marker),
            _ => None,
        })
    }

    pub fn is_abstract(&self) -> bool {
        self.access_flags & (ACC_ABSTRACT | ACC_INTERFACE) != 0
    }

    pub fn is_annotation(&self) -> bool {
        self.access_flags & ACC_ANNOTATION != 0
    }

    /// Every type this class names, in first-seen order
    pub fn referenced_types(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut add = |name: String| {
            if name != self.name && !names.contains(&name) {
                names.push(name);
            }
        };
        for event in &self.events {
            match event {
                ClassEvent::SuperType(name) | ClassEvent::Interface(name) | ClassEvent::TypeReference(name) => {
                    add(name.clone())
                }
                ClassEvent::Signature(signature) => type_names(signature).into_iter().for_each(&mut add),
                ClassEvent::Field { descriptor, signature, .. }
                | ClassEvent::Method { descriptor, signature, .. } => {
                    type_names(descriptor).into_iter().for_each(&mut add);
                    if let Some(signature) = signature {
                        type_names(signature).into_iter().for_each(&mut add);
                    }
                }
                ClassEvent::Marker { marker, .. } => {
                    add(marker.kind.clone());
                    marker.referenced_classes().into_iter().for_each(&mut add);
                }
                ClassEvent::MarkerDefault { .. } => {}
            }
        }
        names
    }
}

/// Parse one class file into its event sequence
pub fn parse_class(data: &[u8], mode: ParseMode) -> Result<ParsedClass> {
    ClassParser::new(data, mode).parse()
}

struct ClassParser<'a> {
    reader: ClassReader<'a>,
    mode: ParseMode,
    pool: ConstantPool,
    events: Vec<ClassEvent>,
    code_refs: CodeReferences,
}

impl<'a> ClassParser<'a> {
    fn new(data: &'a [u8], mode: ParseMode) -> Self {
        Self {
            reader: ClassReader::new(data),
            mode,
            pool: ConstantPool::default(),
            events: Vec::new(),
            code_refs: CodeReferences::default(),
        }
    }

    fn parse(mut self) -> Result<ParsedClass> {
        let magic = self.reader.u32()?;
        if magic != CLASS_MAGIC {
            return Err(ScanError::parse("", format!("bad magic number 0x{:08X}", magic)));
        }
        let minor_version = self.reader.u16()?;
        let major_version = self.reader.u16()?;
        check_version(major_version, minor_version)?;

        self.pool = ConstantPool::read(&mut self.reader)?;

        let access_flags = self.reader.u16()?;
        let this_index = self.reader.u16()?;
        let name = to_dotted(self.pool.class_name(this_index)?);

        let result = self.parse_body();
        let events = result.map_err(|e| e.with_class(&name))?;

        Ok(ParsedClass {
            name,
            access_flags,
            major_version,
            minor_version,
            events,
        })
    }

    fn parse_body(&mut self) -> Result<Vec<ClassEvent>> {
        let super_index = self.reader.u16()?;
        if super_index != 0 {
            let super_name = to_dotted(self.pool.class_name(super_index)?);
            self.emit(ClassEvent::SuperType(super_name));
        }

        let interface_count = self.reader.u16()?;
        for _ in 0..interface_count {
            let index = self.reader.u16()?;
            let interface = to_dotted(self.pool.class_name(index)?);
            self.emit(ClassEvent::Interface(interface));
        }

        let field_count = self.reader.u16()?;
        for _ in 0..field_count {
            self.parse_member(MarkerTarget::Field)?;
        }

        let method_count = self.reader.u16()?;
        for _ in 0..method_count {
            self.parse_member(MarkerTarget::Method)?;
        }

        let mut bootstrap_methods = Vec::new();
        let attribute_count = self.reader.u16()?;
        for _ in 0..attribute_count {
            let (attribute_name, data) = self.attribute()?;
            match attribute_name.as_str() {
                ATTR_SIGNATURE if self.mode != ParseMode::Defaults => {
                    let signature = self.signature_value(data)?;
                    self.emit(ClassEvent::Signature(signature));
                }
                ATTR_RUNTIME_VISIBLE_ANNOTATIONS if self.mode != ParseMode::Defaults => {
                    self.annotations(data, MarkerTarget::Type)?;
                }
                ATTR_BOOTSTRAP_METHODS if self.mode == ParseMode::Full => {
                    bootstrap_methods = self.bootstrap_methods(data)?;
                }
                _ => {}
            }
        }

        if self.mode == ParseMode::Full {
            self.resolve_bootstrap_references(&bootstrap_methods)?;
            let refs = std::mem::take(&mut self.code_refs);
            for name in refs.types {
                self.emit(ClassEvent::TypeReference(name));
            }
        }

        Ok(std::mem::take(&mut self.events))
    }

    fn emit(&mut self, event: ClassEvent) {
        if self.mode == ParseMode::Defaults && !matches!(event, ClassEvent::MarkerDefault { .. }) {
            return;
        }
        self.events.push(event);
    }

    fn attribute(&mut self) -> Result<(String, &'a [u8])> {
        let name_index = self.reader.u16()?;
        let length = self.reader.u32()? as usize;
        let name = self.pool.utf8(name_index)?.to_string();
        let data = self.reader.bytes(length)?;
        Ok((name, data))
    }

    fn signature_value(&self, data: &[u8]) -> Result<String> {
        let mut reader = ClassReader::new(data);
        Ok(self.pool.utf8(reader.u16()?)?.to_string())
    }

    fn parse_member(&mut self, target: MarkerTarget) -> Result<()> {
        let _access = self.reader.u16()?;
        let name = self.pool.utf8(self.reader.u16()?)?.to_string();
        let descriptor = self.pool.utf8(self.reader.u16()?)?.to_string();

        let mut signature = None;
        let mut markers = Vec::new();
        let attribute_count = self.reader.u16()?;
        for _ in 0..attribute_count {
            let (attribute_name, data) = self.attribute()?;
            match (attribute_name.as_str(), self.mode) {
                (ATTR_SIGNATURE, ParseMode::Full | ParseMode::Declaration) => {
                    signature = Some(self.signature_value(data)?);
                }
                (ATTR_RUNTIME_VISIBLE_ANNOTATIONS, ParseMode::Full | ParseMode::Declaration) => {
                    markers.push(data);
                }
                (ATTR_CODE, ParseMode::Full) if target == MarkerTarget::Method => {
                    self.code(data)?;
                }
                (ATTR_ANNOTATION_DEFAULT, ParseMode::Defaults) if target == MarkerTarget::Method => {
                    let mut reader = ClassReader::new(data);
                    let value = self.element_value(&mut reader, 0)?;
                    self.emit(ClassEvent::MarkerDefault {
                        attribute: name.clone(),
                        value,
                    });
                }
                _ => {}
            }
        }

        let member = match target {
            MarkerTarget::Field => ClassEvent::Field {
                name,
                descriptor,
                signature,
            },
            _ => ClassEvent::Method {
                name,
                descriptor,
                signature,
            },
        };
        self.emit(member);
        for data in markers {
            self.annotations(data, target)?;
        }
        Ok(())
    }

    fn code(&mut self, data: &[u8]) -> Result<()> {
        let mut reader = ClassReader::new(data);
        reader.skip(4)?; // max_stack, max_locals
        let code_length = reader.u32()? as usize;
        let code = reader.bytes(code_length)?;
        scan_code(code, &self.pool, &mut self.code_refs)?;

        let exception_count = reader.u16()?;
        for _ in 0..exception_count {
            reader.skip(6)?;
            let catch_type = reader.u16()?;
            if catch_type != 0 {
                let names = descriptor::class_constant_names(self.pool.class_name(catch_type)?);
                self.code_refs.add(names);
            }
        }
        Ok(())
    }

    fn bootstrap_methods(&self, data: &[u8]) -> Result<Vec<(u16, Vec<u16>)>> {
        let mut reader = ClassReader::new(data);
        let count = reader.u16()?;
        let mut methods = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let method_ref = reader.u16()?;
            let argument_count = reader.u16()?;
            let mut arguments = Vec::with_capacity(argument_count as usize);
            for _ in 0..argument_count {
                arguments.push(reader.u16()?);
            }
            methods.push((method_ref, arguments));
        }
        Ok(methods)
    }

    // A lambda or method reference used as a factory shows up as a method handle
    // argument; its owner is the type that is actually instantiated.
    fn resolve_bootstrap_references(&mut self, methods: &[(u16, Vec<u16>)]) -> Result<()> {
        let pending = std::mem::take(&mut self.code_refs.bootstrap_indices);
        for index in pending {
            let (method_ref, arguments) = methods.get(index as usize).ok_or_else(|| {
                ScanError::parse("", format!("missing bootstrap method {}", index))
            })?;
            if let Constant::MethodHandle { reference_index, .. } = self.pool.get(*method_ref)? {
                self.code_refs.add_member(&self.pool, *reference_index)?;
            }
            for argument in arguments {
                self.code_refs.add_loadable(&self.pool, *argument)?;
            }
        }
        Ok(())
    }

    fn annotations(&mut self, data: &[u8], target: MarkerTarget) -> Result<()> {
        let mut reader = ClassReader::new(data);
        let count = reader.u16()?;
        for _ in 0..count {
            let marker = self.annotation(&mut reader, 0)?;
            for occurrence in flatten(marker) {
                self.emit(ClassEvent::Marker {
                    target,
                    marker: occurrence,
                });
            }
        }
        Ok(())
    }

    fn annotation(&self, reader: &mut ClassReader<'_>, depth: usize) -> Result<Marker> {
        if depth > MAX_MARKER_NESTING {
            return Err(ScanError::parse("", "marker nesting is too deep"));
        }
        let kind = marker_type_name(self.pool.utf8(reader.u16()?)?);
        let mut marker = Marker::new(kind);
        let pair_count = reader.u16()?;
        for _ in 0..pair_count {
            let attribute = self.pool.utf8(reader.u16()?)?.to_string();
            let value = self.element_value(reader, depth)?;
            marker.attributes.insert(attribute, value);
        }
        Ok(marker)
    }

    fn element_value(&self, reader: &mut ClassReader<'_>, depth: usize) -> Result<MarkerValue> {
        if depth > MAX_MARKER_NESTING {
            return Err(ScanError::parse("", "marker nesting is too deep"));
        }
        let tag = reader.u8()?;
        let value = match tag {
            b'B' | b'I' | b'S' => MarkerValue::Int(self.int_constant(reader.u16()?)? as i64),
            b'C' => {
                let code = self.int_constant(reader.u16()?)? as u32;
                MarkerValue::Char(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
            }
            b'Z' => MarkerValue::Bool(self.int_constant(reader.u16()?)? != 0),
            b'J' => match self.pool.get(reader.u16()?)? {
                Constant::Long(value) => MarkerValue::Int(*value),
                other => return Err(ScanError::parse("", format!("expected long constant, found {:?}", other))),
            },
            b'F' => match self.pool.get(reader.u16()?)? {
                Constant::Float(value) => MarkerValue::Float(*value as f64),
                other => return Err(ScanError::parse("", format!("expected float constant, found {:?}", other))),
            },
            b'D' => match self.pool.get(reader.u16()?)? {
                Constant::Double(value) => MarkerValue::Float(*value),
                other => return Err(ScanError::parse("", format!("expected double constant, found {:?}", other))),
            },
            b's' => MarkerValue::Str(self.pool.utf8(reader.u16()?)?.to_string()),
            b'e' => {
                let type_name = marker_type_name(self.pool.utf8(reader.u16()?)?);
                let constant = self.pool.utf8(reader.u16()?)?.to_string();
                MarkerValue::Enum { type_name, constant }
            }
            b'c' => {
                let descriptor = self.pool.utf8(reader.u16()?)?;
                MarkerValue::Class(class_value_name(descriptor).unwrap_or_else(|| descriptor.to_string()))
            }
            b'@' => MarkerValue::Nested(self.annotation(reader, depth + 1)?),
            b'[' => {
                let count = reader.u16()?;
                let mut items = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    items.push(self.element_value(reader, depth + 1)?);
                }
                MarkerValue::Array(items)
            }
            other => {
                return Err(ScanError::parse(
                    "",
                    format!("unknown marker element tag '{}'", other as char),
                ))
            }
        };
        Ok(value)
    }

    fn int_constant(&self, index: u16) -> Result<i32> {
        match self.pool.get(index)? {
            Constant::Integer(value) => Ok(*value),
            other => Err(ScanError::parse("", format!("expected integer constant, found {:?}", other))),
        }
    }
}

fn check_version(major: u16, minor: u16) -> Result<()> {
    if major < CLASS_VERSION_MIN_MAJOR {
        return Err(ScanError::VersionTooOld {
            class: String::new(),
            major,
            minimum: CLASS_VERSION_MIN_MAJOR,
        });
    }
    if major > CLASS_VERSION_MAX_MAJOR {
        return Err(ScanError::UnsupportedVersion {
            class: String::new(),
            major,
            minor,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use builder::{ClassFileBuilder, Instruction};

    #[test]
    fn test_hierarchy_and_members() {
        let bytes = ClassFileBuilder::new("com.app.MainView")
            .super_class("com.app.BaseView")
            .interface("com.vaadin.flow.router.HasUrlParameter")
            .field("grid", "Lcom/app/Grid;")
            .method("show", "(Lcom/app/Item;)V", vec![])
            .build();

        let parsed = parse_class(&bytes, ParseMode::Full).unwrap();
        assert_eq!(parsed.name, "com.app.MainView");
        assert_eq!(parsed.super_name(), Some("com.app.BaseView"));
        assert_eq!(
            parsed.interfaces().collect::<Vec<_>>(),
            vec!["com.vaadin.flow.router.HasUrlParameter"]
        );
        let refs = parsed.referenced_types();
        assert!(refs.contains(&"com.app.Grid".to_string()));
        assert!(refs.contains(&"com.app.Item".to_string()));
    }

    #[test]
    fn test_container_markers_arrive_flattened() {
        let bytes = ClassFileBuilder::new("com.app.Card")
            .marker(
                Marker::new("com.vaadin.flow.component.dependency.JsModule$Container").with(
                    "value",
                    MarkerValue::Array(vec![
                        MarkerValue::Nested(Marker::new(JS_MODULE).with("value", "./a.js")),
                        MarkerValue::Nested(Marker::new(JS_MODULE).with("value", "./b.js")),
                    ]),
                ),
            )
            .build();

        let parsed = parse_class(&bytes, ParseMode::Full).unwrap();
        let modules: Vec<_> = parsed
            .markers(MarkerTarget::Type)
            .map(|m| m.get("value").cloned())
            .collect();
        assert_eq!(
            modules,
            vec![Some(MarkerValue::from("./a.js")), Some(MarkerValue::from("./b.js"))]
        );
    }

    #[test]
    fn test_instruction_references() {
        let bytes = ClassFileBuilder::new("com.app.Factory")
            .method(
                "create",
                "()Ljava/lang/Object;",
                vec![
                    Instruction::New("com.app.Widget".to_string()),
                    Instruction::InvokeStatic {
                        owner: "com.app.Registry".to_string(),
                        name: "lookup".to_string(),
                        descriptor: "()Lcom/app/Entry;".to_string(),
                    },
                    Instruction::GetStatic {
                        owner: "com.app.Constants".to_string(),
                        name: "DEFAULT".to_string(),
                        descriptor: "Lcom/app/Palette;".to_string(),
                    },
                    Instruction::LdcClass("com.app.Literal".to_string()),
                    Instruction::CheckCast("[Lcom/app/Cell;".to_string()),
                ],
            )
            .build();

        let parsed = parse_class(&bytes, ParseMode::Full).unwrap();
        let refs = parsed.referenced_types();
        for expected in [
            "com.app.Widget",
            "com.app.Registry",
            "com.app.Entry",
            "com.app.Constants",
            "com.app.Palette",
            "com.app.Literal",
            "com.app.Cell",
        ] {
            assert!(refs.contains(&expected.to_string()), "missing {expected}");
        }

        let declaration = parse_class(&bytes, ParseMode::Declaration).unwrap();
        assert!(!declaration.referenced_types().contains(&"com.app.Widget".to_string()));
    }

    #[test]
    fn test_interface_calls_casts_arrays_and_catch_types() {
        let bytes = ClassFileBuilder::new("com.app.Dispatcher")
            .method(
                "dispatch",
                "()V",
                vec![
                    Instruction::InvokeInterface {
                        owner: "com.app.Listener".to_string(),
                        name: "onEvent".to_string(),
                        descriptor: "(Lcom/app/Event;)Lcom/app/Outcome;".to_string(),
                    },
                    Instruction::InstanceOf("com.app.Special".to_string()),
                    Instruction::MultiANewArray("[[Lcom/app/Tile;".to_string(), 2),
                    Instruction::GetStatic {
                        owner: "com.app.Counters".to_string(),
                        name: "dispatched".to_string(),
                        descriptor: "I".to_string(),
                    },
                    Instruction::Catch("com.app.DispatchFailure".to_string()),
                ],
            )
            .build();

        let parsed = parse_class(&bytes, ParseMode::Full).unwrap();
        let refs = parsed.referenced_types();
        for expected in [
            "com.app.Listener",
            "com.app.Event",
            "com.app.Outcome",
            "com.app.Special",
            "com.app.Tile",
            "com.app.Counters",
            "com.app.DispatchFailure",
        ] {
            assert!(refs.contains(&expected.to_string()), "missing {expected}");
        }
        assert!(!refs.iter().any(|r| r.starts_with('[')));
    }

    #[test]
    fn test_call_site_descriptor_types() {
        let bytes = ClassFileBuilder::new("com.app.Lazy")
            .method(
                "make",
                "()V",
                vec![Instruction::ConstructorReference("com.app.Panel".to_string())],
            )
            .build();

        let refs = parse_class(&bytes, ParseMode::Full).unwrap().referenced_types();
        assert!(refs.contains(&"java.util.function.Supplier".to_string()));
        assert!(refs.contains(&"com.app.Panel".to_string()));
    }

    #[test]
    fn test_deeply_nested_marker_arrays_rejected() {
        fn utf8(data: &mut Vec<u8>, text: &str) {
            data.push(CONSTANT_UTF8);
            data.extend_from_slice(&(text.len() as u16).to_be_bytes());
            data.extend_from_slice(text.as_bytes());
        }

        let mut value = Vec::new();
        value.extend_from_slice(&1u16.to_be_bytes()); // one marker
        value.extend_from_slice(&4u16.to_be_bytes()); // its type
        value.extend_from_slice(&1u16.to_be_bytes()); // one attribute
        value.extend_from_slice(&5u16.to_be_bytes());
        for _ in 0..200_000 {
            value.push(b'[');
            value.extend_from_slice(&1u16.to_be_bytes());
        }
        value.push(b's');
        value.extend_from_slice(&5u16.to_be_bytes());

        let mut data = Vec::new();
        data.extend_from_slice(&CLASS_MAGIC.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&52u16.to_be_bytes());
        data.extend_from_slice(&6u16.to_be_bytes());
        utf8(&mut data, "com/app/Deep");
        data.push(CONSTANT_CLASS);
        data.extend_from_slice(&1u16.to_be_bytes());
        utf8(&mut data, ATTR_RUNTIME_VISIBLE_ANNOTATIONS);
        utf8(&mut data, "Lcom/app/Tag;");
        utf8(&mut data, "value");
        data.extend_from_slice(&0x0021u16.to_be_bytes());
        data.extend_from_slice(&2u16.to_be_bytes()); // this
        data.extend_from_slice(&0u16.to_be_bytes()); // super
        data.extend_from_slice(&0u16.to_be_bytes()); // interfaces
        data.extend_from_slice(&0u16.to_be_bytes()); // fields
        data.extend_from_slice(&0u16.to_be_bytes()); // methods
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&3u16.to_be_bytes());
        data.extend_from_slice(&(value.len() as u32).to_be_bytes());
        data.extend_from_slice(&value);

        match parse_class(&data, ParseMode::Full) {
            Err(ScanError::Parse { class, .. }) => assert_eq!(class, "com.app.Deep"),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_method_reference_factory_resolves_target_type() {
        let bytes = ClassFileBuilder::new("com.app.RouteWithFactory")
            .method(
                "supplier",
                "()Ljava/util/function/Supplier;",
                vec![Instruction::ConstructorReference("com.app.LazyPanel".to_string())],
            )
            .build();

        let parsed = parse_class(&bytes, ParseMode::Full).unwrap();
        let refs = parsed.referenced_types();
        assert!(refs.contains(&"com.app.LazyPanel".to_string()));
        assert!(refs.contains(&"java.lang.invoke.LambdaMetafactory".to_string()));
    }

    #[test]
    fn test_defaults_mode_only_reports_defaults() {
        let bytes = ClassFileBuilder::annotation_type("com.app.Tagged")
            .attribute_default("value", MarkerValue::from("x"))
            .build();
        let parsed = parse_class(&bytes, ParseMode::Defaults).unwrap();
        assert!(parsed.is_annotation());
        assert_eq!(
            parsed.events,
            vec![ClassEvent::MarkerDefault {
                attribute: "value".to_string(),
                value: MarkerValue::from("x"),
            }]
        );
    }

    #[test]
    fn test_version_limits() {
        let old = ClassFileBuilder::new("com.app.Legacy").version(45).build();
        assert!(matches!(
            parse_class(&old, ParseMode::Full),
            Err(ScanError::VersionTooOld { major: 45, .. })
        ));

        let future = ClassFileBuilder::new("com.app.Future").version(99).build();
        assert!(matches!(
            parse_class(&future, ParseMode::Full),
            Err(ScanError::UnsupportedVersion { major: 99, .. })
        ));
    }

    #[test]
    fn test_truncated_class_names_the_class() {
        let mut bytes = ClassFileBuilder::new("com.app.Broken")
            .method("run", "()V", vec![Instruction::New("com.app.Other".to_string())])
            .build();
        bytes.truncate(bytes.len() - 6);
        match parse_class(&bytes, ParseMode::Full) {
            Err(ScanError::Parse { class, .. }) => assert_eq!(class, "com.app.Broken"),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_magic() {
        assert!(matches!(
            parse_class(&[0, 1, 2, 3, 0, 0, 0, 52], ParseMode::Full),
            Err(ScanError::Parse { .. })
        ));
    }
}
