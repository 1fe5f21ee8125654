//! Type name extraction from descriptors and generic signatures
//!
//! This is a pattern based transformation, not a signature grammar parser:
//! the input is split on type-boundary punctuation and every fragment that
//! carries the object marker `L` yields one type name.

use once_cell::sync::Lazy;
use regex::Regex;

static TYPE_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[()<>;:]").expect("type boundary pattern is valid"));

// Array dimensions, wildcard/throws markers and primitive codes ahead of the object marker
static OBJECT_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\[+\-*^VZBCSIJFD]*L").expect("object prefix pattern is valid"));

/// Every object type named in a method/field descriptor or generic signature, in order
pub fn type_names(signature: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for fragment in TYPE_BOUNDARY.split(signature) {
        let Some(prefix) = OBJECT_PREFIX.find(fragment) else {
            continue;
        };
        let internal = &fragment[prefix.end()..];
        // `.Inner` fragments follow a parameterized outer type
        if internal.is_empty() || internal.starts_with('.') {
            continue;
        }
        let name = to_dotted(internal);
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Names behind a Class constant, which is an internal name or an array descriptor
pub fn class_constant_names(internal: &str) -> Vec<String> {
    if internal.starts_with('[') {
        type_names(internal)
    } else {
        vec![to_dotted(internal)]
    }
}

/// `com/example/View` -> `com.example.View`
pub fn to_dotted(internal: &str) -> String {
    internal.replace('/', ".")
}

/// `com.example.View` -> `com/example/View`
pub fn to_internal(name: &str) -> String {
    name.replace('.', "/")
}

/// Resource path of a compiled class: `com.example.View` -> `com/example/View.class`
pub fn resource_path(name: &str) -> String {
    format!("{}.{}", to_internal(name), crate::types::CLASS_FILE_EXTENSION)
}

/// Inverse of [`resource_path`]; `None` for resources that are not classes
pub fn class_name_from_resource(path: &str) -> Option<String> {
    let stem = path.trim_start_matches('/').strip_suffix(".class")?;
    if stem.starts_with("META-INF/") || stem.ends_with("module-info") || stem.ends_with("package-info") {
        return None;
    }
    Some(to_dotted(&stem.replace('\\', "/")))
}

/// Field descriptor of a marker type `Lcom/example/Marker;` -> `com.example.Marker`
pub fn marker_type_name(descriptor: &str) -> String {
    descriptor
        .strip_prefix('L')
        .and_then(|rest| rest.strip_suffix(';'))
        .map(to_dotted)
        .unwrap_or_else(|| to_dotted(descriptor))
}

/// Class-valued marker element (a return descriptor); `None` for primitives and `void`
pub fn class_value_name(descriptor: &str) -> Option<String> {
    type_names(descriptor).into_iter().next()
}

/// Simple name without package or enclosing classes
pub fn simple_name(name: &str) -> &str {
    let after_package = name.rsplit('.').next().unwrap_or(name);
    after_package.rsplit('$').next().unwrap_or(after_package)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_descriptor() {
        assert_eq!(
            type_names("(ILjava/lang/String;[Lcom/app/Item;J)Lcom/app/Result;"),
            vec!["java.lang.String", "com.app.Item", "com.app.Result"]
        );
    }

    #[test]
    fn test_primitive_only_descriptor() {
        assert!(type_names("(IJ[[D)V").is_empty());
    }

    #[test]
    fn test_generic_signature() {
        assert_eq!(
            type_names(
                "<T:Ljava/lang/Object;>Lcom/vaadin/flow/component/WebComponentExporter<Lcom/app/MyComponent;>;"
            ),
            vec![
                "java.lang.Object",
                "com.vaadin.flow.component.WebComponentExporter",
                "com.app.MyComponent"
            ]
        );
    }

    #[test]
    fn test_type_variables_and_wildcards() {
        assert_eq!(
            type_names("(TT;Ljava/util/List<+Lcom/app/Card;>;)V^Lcom/app/Failure;"),
            vec!["java.util.List", "com.app.Card", "com.app.Failure"]
        );
    }

    #[test]
    fn test_inner_class_of_parameterized_type() {
        assert_eq!(
            type_names("Lcom/app/Outer<TT;>.Inner;"),
            vec!["com.app.Outer"]
        );
    }

    #[test]
    fn test_array_class_constant() {
        assert_eq!(class_constant_names("[[Lcom/app/Cell;"), vec!["com.app.Cell"]);
        assert!(class_constant_names("[I").is_empty());
        assert_eq!(class_constant_names("com/app/Cell"), vec!["com.app.Cell"]);
    }

    #[test]
    fn test_resource_path_round_trip() {
        assert_eq!(resource_path("com.app.Main$Inner"), "com/app/Main$Inner.class");
        assert_eq!(
            class_name_from_resource("com/app/Main$Inner.class").as_deref(),
            Some("com.app.Main$Inner")
        );
        assert_eq!(class_name_from_resource("META-INF/versions/module-info.class"), None);
        assert_eq!(class_name_from_resource("styles.css"), None);
    }

    #[test]
    fn test_marker_and_simple_names() {
        assert_eq!(marker_type_name("Lcom/vaadin/flow/router/Route;"), "com.vaadin.flow.router.Route");
        assert_eq!(class_value_name("V"), None);
        assert_eq!(class_value_name("Lcom/app/Lumo;").as_deref(), Some("com.app.Lumo"));
        assert_eq!(simple_name("com.app.Outer$MainView"), "MainView");
    }
}
