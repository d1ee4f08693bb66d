//! Binding model
//!
//! A binding is the resolved identity of a named program entity. Bindings of
//! one snapshot live in an [`Environment`] and point at each other through
//! typed indices, so cyclic shapes such as `T extends Comparable<T>` need no
//! shared ownership. Two environments built from two compilations of the same
//! source are different objects; [`equality`] decides whether their bindings
//! denote the same entities.

use std::fmt;

use crate::ast::WildcardKind;

pub mod equality;
pub mod resolve;

pub use equality::{binding_arrays_equal, bindings_equal, type_arrays_equal, types_equal};
pub use resolve::resolve_unit;

macro_rules! binding_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub usize);
    };
}

binding_id!(TypeId);
binding_id!(MethodId);
binding_id!(FieldId);
binding_id!(VariableId);

/// Stable numeric ids of the base types.
pub mod base_type_id {
    pub const T_CHAR: u32 = 2;
    pub const T_BYTE: u32 = 3;
    pub const T_SHORT: u32 = 4;
    pub const T_BOOLEAN: u32 = 5;
    pub const T_VOID: u32 = 6;
    pub const T_LONG: u32 = 7;
    pub const T_DOUBLE: u32 = 8;
    pub const T_FLOAT: u32 = 9;
    pub const T_INT: u32 = 10;
    pub const T_NULL: u32 = 12;

    pub fn of(name: &str) -> Option<u32> {
        let id = match name {
            "char" => T_CHAR,
            "byte" => T_BYTE,
            "short" => T_SHORT,
            "boolean" => T_BOOLEAN,
            "void" => T_VOID,
            "long" => T_LONG,
            "double" => T_DOUBLE,
            "float" => T_FLOAT,
            "int" => T_INT,
            "null" => T_NULL,
            _ => return None,
        };
        Some(id)
    }
}

/// Shared part of every class-like binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceBinding {
    pub compound_name: Vec<String>,
    /// Binary name, `java/util/Map$Entry`.
    pub constant_pool_name: String,
    pub modifiers: u32,
    pub superclass: Option<TypeId>,
    pub super_interfaces: Vec<TypeId>,
    pub type_variables: Vec<TypeId>,
}

impl ReferenceBinding {
    pub fn new(compound_name: Vec<String>, modifiers: u32) -> Self {
        let constant_pool_name = compound_name.join("/");
        Self {
            compound_name,
            constant_pool_name,
            modifiers,
            superclass: None,
            super_interfaces: Vec::new(),
            type_variables: Vec::new(),
        }
    }

    pub fn qualified_name(&self) -> String {
        self.compound_name.join(".")
    }
}

/// The element a type variable is declared on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclaringElement {
    Type(TypeId),
    Method(MethodId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeVariableBinding {
    pub source_name: String,
    pub declaring_element: Option<DeclaringElement>,
    pub superclass: Option<TypeId>,
    pub super_interfaces: Vec<TypeId>,
}

/// A wildcard captured at one use site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureBinding {
    pub variable: TypeVariableBinding,
    /// Offset of the captured expression.
    pub position: usize,
    pub wildcard: Option<TypeId>,
    pub source_type: Option<TypeId>,
}

/// Every kind of type binding. The last three share the reference shape and
/// fall into the default equality rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeBinding {
    Base { id: u32, name: &'static str },
    Array { leaf: TypeId, dimensions: usize },
    Parameterized { reference: ReferenceBinding, generic: Option<TypeId>, arguments: Vec<TypeId> },
    Wildcard { bound: Option<TypeId>, kind: WildcardKind },
    TypeVariable(TypeVariableBinding),
    Capture(CaptureBinding),
    /// A type declared with type parameters.
    Generic(ReferenceBinding),
    /// A generic type used without arguments.
    Raw(ReferenceBinding),
    /// A plain class or interface, also the shape of unresolved names.
    Reference(ReferenceBinding),
}

impl TypeBinding {
    pub fn kind_name(&self) -> &'static str {
        match self {
            TypeBinding::Base { .. } => "base type",
            TypeBinding::Array { .. } => "array type",
            TypeBinding::Parameterized { .. } => "parameterized type",
            TypeBinding::Wildcard { .. } => "wildcard",
            TypeBinding::TypeVariable(_) => "type variable",
            TypeBinding::Capture(_) => "capture",
            TypeBinding::Generic(_) => "generic type",
            TypeBinding::Raw(_) => "raw type",
            TypeBinding::Reference(_) => "type",
        }
    }

    /// The class-like view of this binding, if it has one.
    pub fn reference(&self) -> Option<&ReferenceBinding> {
        match self {
            TypeBinding::Parameterized { reference, .. }
            | TypeBinding::Generic(reference)
            | TypeBinding::Raw(reference)
            | TypeBinding::Reference(reference) => Some(reference),
            _ => None,
        }
    }

    pub fn is_generic(&self) -> bool {
        matches!(self, TypeBinding::Generic(_))
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, TypeBinding::Raw(_))
    }

    pub fn is_type_variable(&self) -> bool {
        matches!(self, TypeBinding::TypeVariable(_) | TypeBinding::Capture(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBinding {
    pub selector: String,
    pub modifiers: u32,
    pub return_type: Option<TypeId>,
    pub parameters: Vec<TypeId>,
    pub thrown_exceptions: Vec<TypeId>,
    pub declaring_class: Option<TypeId>,
    pub type_variables: Vec<TypeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBinding {
    pub name: String,
    pub modifiers: u32,
    pub field_type: Option<TypeId>,
    pub declaring_class: Option<TypeId>,
}

/// A local variable or parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableBinding {
    pub name: String,
    pub modifiers: u32,
    pub variable_type: Option<TypeId>,
    /// Position of the variable among the locals of its method.
    pub id: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageBinding {
    pub compound_name: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportBinding {
    pub compound_name: Vec<String>,
    pub is_static: bool,
    pub on_demand: bool,
}

/// Handle to any binding of an environment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Binding {
    Type(TypeId),
    Method(MethodId),
    Field(FieldId),
    Variable(VariableId),
    Package(PackageBinding),
    Import(ImportBinding),
}

/// A binding together with the environment it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct BindingRef<'e> {
    pub env: &'e Environment,
    pub binding: &'e Binding,
}

/// All bindings of one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    types: Vec<TypeBinding>,
    methods: Vec<MethodBinding>,
    fields: Vec<FieldBinding>,
    variables: Vec<VariableBinding>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_type(&mut self, binding: TypeBinding) -> TypeId {
        self.types.push(binding);
        TypeId(self.types.len() - 1)
    }

    pub fn add_method(&mut self, binding: MethodBinding) -> MethodId {
        self.methods.push(binding);
        MethodId(self.methods.len() - 1)
    }

    pub fn add_field(&mut self, binding: FieldBinding) -> FieldId {
        self.fields.push(binding);
        FieldId(self.fields.len() - 1)
    }

    pub fn add_variable(&mut self, binding: VariableBinding) -> VariableId {
        self.variables.push(binding);
        VariableId(self.variables.len() - 1)
    }

    pub fn type_binding(&self, id: TypeId) -> Option<&TypeBinding> {
        self.types.get(id.0)
    }

    pub fn type_binding_mut(&mut self, id: TypeId) -> Option<&mut TypeBinding> {
        self.types.get_mut(id.0)
    }

    pub fn method(&self, id: MethodId) -> Option<&MethodBinding> {
        self.methods.get(id.0)
    }

    pub fn method_mut(&mut self, id: MethodId) -> Option<&mut MethodBinding> {
        self.methods.get_mut(id.0)
    }

    pub fn field(&self, id: FieldId) -> Option<&FieldBinding> {
        self.fields.get(id.0)
    }

    pub fn variable(&self, id: VariableId) -> Option<&VariableBinding> {
        self.variables.get(id.0)
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn types(&self) -> impl Iterator<Item = (TypeId, &TypeBinding)> {
        self.types.iter().enumerate().map(|(i, t)| (TypeId(i), t))
    }

    pub fn methods(&self) -> impl Iterator<Item = (MethodId, &MethodBinding)> {
        self.methods.iter().enumerate().map(|(i, m)| (MethodId(i), m))
    }

    pub fn fields(&self) -> impl Iterator<Item = (FieldId, &FieldBinding)> {
        self.fields.iter().enumerate().map(|(i, f)| (FieldId(i), f))
    }

    /// The declared (generic or plain) type with this qualified name.
    pub fn declared_type(&self, qualified_name: &str) -> Option<TypeId> {
        self.types().find_map(|(id, binding)| match binding {
            TypeBinding::Generic(reference) | TypeBinding::Reference(reference)
                if reference.qualified_name() == qualified_name =>
            {
                Some(id)
            }
            _ => None,
        })
    }

    /// Method `selector` declared on `declaring_class`.
    pub fn method_named(&self, declaring_class: TypeId, selector: &str) -> Option<MethodId> {
        self.methods()
            .find(|(_, m)| m.declaring_class == Some(declaring_class) && m.selector == selector)
            .map(|(id, _)| id)
    }

    pub fn field_named(&self, declaring_class: TypeId, name: &str) -> Option<FieldId> {
        self.fields()
            .find(|(_, f)| f.declaring_class == Some(declaring_class) && f.name == name)
            .map(|(id, _)| id)
    }

    pub fn bind<'e>(&'e self, binding: &'e Binding) -> BindingRef<'e> {
        BindingRef { env: self, binding }
    }

    /// Readable form of a type, for diagnostics and dumps.
    pub fn describe_type(&self, id: TypeId) -> String {
        self.describe_type_depth(id, 0)
    }

    fn describe_type_depth(&self, id: TypeId, depth: usize) -> String {
        if depth > 16 {
            return "...".to_string();
        }
        let binding = match self.type_binding(id) {
            Some(binding) => binding,
            None => return "<missing>".to_string(),
        };
        match binding {
            TypeBinding::Base { name, .. } => name.to_string(),
            TypeBinding::Array { leaf, dimensions } => {
                format!("{}{}", self.describe_type_depth(*leaf, depth + 1), "[]".repeat(*dimensions))
            }
            TypeBinding::Parameterized { reference, arguments, .. } => {
                let arguments: Vec<String> = arguments
                    .iter()
                    .map(|a| self.describe_type_depth(*a, depth + 1))
                    .collect();
                format!("{}<{}>", reference.qualified_name(), arguments.join(", "))
            }
            TypeBinding::Wildcard { bound, kind } => match (kind, bound) {
                (WildcardKind::Extends, Some(bound)) => {
                    format!("? extends {}", self.describe_type_depth(*bound, depth + 1))
                }
                (WildcardKind::Super, Some(bound)) => format!("? super {}", self.describe_type_depth(*bound, depth + 1)),
                _ => "?".to_string(),
            },
            TypeBinding::TypeVariable(variable) => variable.source_name.clone(),
            TypeBinding::Capture(capture) => format!("capture#{} of {}", capture.position, capture.variable.source_name),
            TypeBinding::Generic(reference) | TypeBinding::Reference(reference) => reference.qualified_name(),
            TypeBinding::Raw(reference) => format!("{} (raw)", reference.qualified_name()),
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Type(id) => write!(f, "type#{}", id.0),
            Binding::Method(id) => write!(f, "method#{}", id.0),
            Binding::Field(id) => write!(f, "field#{}", id.0),
            Binding::Variable(id) => write!(f, "variable#{}", id.0),
            Binding::Package(package) => write!(f, "package {}", package.compound_name.join(".")),
            Binding::Import(import) => write!(
                f,
                "import {}{}{}",
                if import.is_static { "static " } else { "" },
                import.compound_name.join("."),
                if import.on_demand { ".*" } else { "" }
            ),
        }
    }
}
