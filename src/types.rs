//! Core constants for the frontend dependency scanner

// Class File Format Constants
pub const CLASS_MAGIC: u32 = 0xCAFE_BABE;
pub const CLASS_VERSION_MIN_MAJOR: u16 = 49;
pub const CLASS_VERSION_MAX_MAJOR: u16 = 69;
pub const CLASS_FILE_EXTENSION: &str = "class";

// Access Flags
pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_ANNOTATION: u16 = 0x2000;

// Constant Pool Tags
pub const CONSTANT_UTF8: u8 = 1;
pub const CONSTANT_INTEGER: u8 = 3;
pub const CONSTANT_FLOAT: u8 = 4;
pub const CONSTANT_LONG: u8 = 5;
pub const CONSTANT_DOUBLE: u8 = 6;
pub const CONSTANT_CLASS: u8 = 7;
pub const CONSTANT_STRING: u8 = 8;
pub const CONSTANT_FIELDREF: u8 = 9;
pub const CONSTANT_METHODREF: u8 = 10;
pub const CONSTANT_INTERFACE_METHODREF: u8 = 11;
pub const CONSTANT_NAME_AND_TYPE: u8 = 12;
pub const CONSTANT_METHOD_HANDLE: u8 = 15;
pub const CONSTANT_METHOD_TYPE: u8 = 16;
pub const CONSTANT_DYNAMIC: u8 = 17;
pub const CONSTANT_INVOKE_DYNAMIC: u8 = 18;
pub const CONSTANT_MODULE: u8 = 19;
pub const CONSTANT_PACKAGE: u8 = 20;

// Attribute Names
pub const ATTR_CODE: &str = "Code";
pub const ATTR_SIGNATURE: &str = "Signature";
pub const ATTR_RUNTIME_VISIBLE_ANNOTATIONS: &str = "RuntimeVisibleAnnotations";
pub const ATTR_ANNOTATION_DEFAULT: &str = "AnnotationDefault";
pub const ATTR_BOOTSTRAP_METHODS: &str = "BootstrapMethods";

// Marker (annotation) types
pub const ROUTE: &str = "com.vaadin.flow.router.Route";
pub const LAYOUT: &str = "com.vaadin.flow.router.Layout";
pub const JS_MODULE: &str = "com.vaadin.flow.component.dependency.JsModule";
pub const JAVASCRIPT: &str = "com.vaadin.flow.component.dependency.JavaScript";
pub const CSS_IMPORT: &str = "com.vaadin.flow.component.dependency.CssImport";
pub const NPM_PACKAGE: &str = "com.vaadin.flow.component.dependency.NpmPackage";
pub const THEME: &str = "com.vaadin.flow.theme.Theme";
pub const NO_THEME: &str = "com.vaadin.flow.theme.NoTheme";
pub const PWA: &str = "com.vaadin.flow.server.PWA";
pub const LOAD_DEPENDENCIES_ON_STARTUP: &str =
    "com.vaadin.flow.component.dependency.LoadDependenciesOnStartup";

/// Markers that contribute browser assets to the class carrying them
pub const ASSET_MARKERS: &[&str] = &[JS_MODULE, JAVASCRIPT, CSS_IMPORT];

// Entry point supertypes
pub const UI_INIT_LISTENER: &str = "com.vaadin.flow.server.UIInitListener";
pub const SERVICE_INIT_LISTENER: &str = "com.vaadin.flow.server.VaadinServiceInitListener";
pub const APP_SHELL_CONFIGURATOR: &str = "com.vaadin.flow.component.page.AppShellConfigurator";
pub const HAS_ERROR_PARAMETER: &str = "com.vaadin.flow.router.HasErrorParameter";
pub const ROUTER_LAYOUT: &str = "com.vaadin.flow.router.RouterLayout";
pub const WEB_COMPONENT_EXPORTER: &str = "com.vaadin.flow.component.WebComponentExporter";
pub const WEB_COMPONENT_EXPORTER_FACTORY: &str =
    "com.vaadin.flow.component.WebComponentExporterFactory";
pub const ABSTRACT_THEME: &str = "com.vaadin.flow.theme.AbstractTheme";

// Always needed platform types
pub const UI: &str = "com.vaadin.flow.component.UI";
pub const REACT_ROUTER_OUTLET: &str = "com.vaadin.flow.component.react.ReactRouterOutlet";

/// Theme used when the application declares none
pub const DEFAULT_THEME: &str = "com.vaadin.flow.theme.lumo.Lumo";

// Marker attribute names
pub const VALUE: &str = "value";
pub const VERSION: &str = "version";
pub const DEV: &str = "dev";
pub const ASSETS: &str = "assets";
pub const DEVELOPMENT_ONLY: &str = "developmentOnly";
pub const ID: &str = "id";
pub const INCLUDE: &str = "include";
pub const THEME_FOR: &str = "themeFor";
pub const THEME_CLASS: &str = "themeClass";
pub const VARIANT: &str = "variant";
pub const LAYOUT_ATTR: &str = "layout";

/// Placeholder the route marker uses when the path should be derived from the class name
pub const ROUTE_PATH_NOT_DERIVED: &str = "___NAMING_CONVENTION___";

/// Route paths that always load eagerly when no startup override is declared
pub const EAGER_ROUTE_PATHS: &[&str] = &["", "login"];

// Scanner limits
pub const MAX_CLASS_FILE_SIZE: u64 = 64 * 1024 * 1024;
pub const MAX_MARKER_NESTING: usize = 32;
