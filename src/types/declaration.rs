use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeclarationKind {
    Class,
    Struct,
    Enum,
    Interface,
}

impl DeclarationKind {
    pub fn marker(&self) -> &'static str {
        match self {
            DeclarationKind::Class => "UCLASS",
            DeclarationKind::Struct => "USTRUCT",
            DeclarationKind::Enum => "UENUM",
            DeclarationKind::Interface => "UINTERFACE",
        }
    }

    /// Kinds whose header may carry a `: Parent` clause.
    pub fn has_parent_clause(&self) -> bool {
        !matches!(self, DeclarationKind::Enum)
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeclarationKind::Class => "Class",
            DeclarationKind::Struct => "Struct",
            DeclarationKind::Enum => "Enum",
            DeclarationKind::Interface => "Interface",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,
    pub value: Option<i64>,
}

/// A type-like construct recovered from an annotated header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationEntity {
    pub name: String,
    pub kind: DeclarationKind,
    pub parent: Option<String>,
    pub specifiers: Vec<String>,
    pub is_blueprint_exposed: bool,
    pub is_instantiable: bool,
    pub enum_values: Vec<EnumValue>,
    pub module: String,
    pub file_path: PathBuf,
    pub line: usize,
}

impl DeclarationEntity {
    pub fn new(name: String, kind: DeclarationKind) -> Self {
        Self {
            name,
            kind,
            parent: None,
            specifiers: Vec::new(),
            is_blueprint_exposed: false,
            is_instantiable: matches!(kind, DeclarationKind::Class | DeclarationKind::Struct),
            enum_values: Vec::new(),
            module: String::new(),
            file_path: PathBuf::new(),
            line: 0,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Sets the specifiers and re-derives the flags that depend on them.
    pub fn with_specifiers(mut self, specifiers: Vec<String>) -> Self {
        self.is_blueprint_exposed = has_specifier(&specifiers, "Blueprintable")
            || has_specifier(&specifiers, "BlueprintType");
        self.is_instantiable = match self.kind {
            DeclarationKind::Class => !has_specifier(&specifiers, "Abstract"),
            DeclarationKind::Struct => true,
            DeclarationKind::Enum | DeclarationKind::Interface => false,
        };
        self.specifiers = specifiers;
        self
    }

    pub fn with_enum_values(mut self, values: Vec<EnumValue>) -> Self {
        self.enum_values = values;
        self
    }

    pub fn with_origin(mut self, module: impl Into<String>, file_path: PathBuf, line: usize) -> Self {
        self.module = module.into();
        self.file_path = file_path;
        self.line = line;
        self
    }

    pub fn has_specifier(&self, key: &str) -> bool {
        has_specifier(&self.specifiers, key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub param_type: String,
}

impl Parameter {
    pub fn new(name: String, param_type: String) -> Self {
        Self { name, param_type }
    }
}

/// An annotated member function. The owner is best-effort and may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallableEntity {
    pub name: String,
    pub owner: String,
    pub return_type: String,
    pub parameters: Vec<Parameter>,
    pub specifiers: Vec<String>,
    pub is_blueprint_callable: bool,
    pub module: String,
    pub file_path: PathBuf,
    pub line: usize,
}

impl CallableEntity {
    pub fn new(name: String) -> Self {
        Self {
            name,
            owner: String::new(),
            return_type: "void".to_string(),
            parameters: Vec::new(),
            specifiers: Vec::new(),
            is_blueprint_callable: false,
            module: String::new(),
            file_path: PathBuf::new(),
            line: 0,
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    pub fn with_return_type(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = return_type.into();
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<Parameter>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_specifiers(mut self, specifiers: Vec<String>) -> Self {
        self.is_blueprint_callable = ["BlueprintCallable", "BlueprintPure", "Exec", "CallInEditor"]
            .iter()
            .any(|key| has_specifier(&specifiers, key));
        self.specifiers = specifiers;
        self
    }

    pub fn with_origin(mut self, module: impl Into<String>, file_path: PathBuf, line: usize) -> Self {
        self.module = module.into();
        self.file_path = file_path;
        self.line = line;
        self
    }

    /// `Owner::Name`, or just the name when the owner is unknown.
    pub fn qualified_name(&self) -> String {
        if self.owner.is_empty() {
            self.name.clone()
        } else {
            format!("{}::{}", self.owner, self.name)
        }
    }

    /// Return type plus every parameter type, in declaration order.
    pub fn type_tokens(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.return_type.as_str())
            .chain(self.parameters.iter().map(|p| p.param_type.as_str()))
    }
}

/// Matches `Key` and `Key=...` specifiers, ignoring case and surrounding spaces.
fn has_specifier(specifiers: &[String], key: &str) -> bool {
    specifiers.iter().any(|spec| {
        let head = spec.split('=').next().unwrap_or("").trim();
        head.eq_ignore_ascii_case(key)
    })
}
