//! Host program model handed over by a language front-end.
//!
//! The analyzer never parses host source itself. A front-end lowers each file
//! into this tree (usually as JSON or YAML) and the analysis works purely on
//! it. Every node that can anchor a diagnostic carries a [`Location`] in the
//! host document's 1-indexed coordinates.

use serde::{Deserialize, Serialize};

/// Position in the host document (1-indexed line, 1-indexed column).
///
/// Ordering is textual order: line first, then column.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Location {
    pub line:   u32,
    #[serde(default)]
    pub column: u32
}

impl Location {
    pub fn new(line: u32, column: u32) -> Self {
        Self {
            line,
            column
        }
    }

    /// Start of the line `rows` lines further down; unchanged for zero.
    pub fn offset_rows(self, rows: u32) -> Self {
        if rows == 0 {
            return self;
        }
        Self {
            line:   self.line + rows,
            column: 1
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// One host source file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceFile {
    /// Host file path; filled from the input file name when empty
    #[serde(default)]
    pub path:      String,
    #[serde(default)]
    pub types:     Vec<TypeDecl>,
    #[serde(default)]
    pub functions: Vec<Method>
}

/// A class-like declaration whose fields are shared by all of its methods.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name:     String,
    #[serde(default)]
    pub aliases:  Vec<TypeAlias>,
    #[serde(default)]
    pub methods:  Vec<Method>,
    #[serde(default)]
    pub location: Location
}

/// `name = shape` alias declared on a type, usable by annotations inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeAlias {
    pub name:     String,
    pub text:     String,
    #[serde(default)]
    pub location: Location
}

/// A method or free-standing function.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Method {
    pub name:     String,
    #[serde(default)]
    pub body:     Vec<Stmt>,
    #[serde(default)]
    pub location: Location
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Target {
    /// Field of the enclosing type (`$this->stmt`).
    Field(String),
    /// Method-local variable (`$stmt`).
    Local(String)
}

impl Target {
    pub fn name(&self) -> &str {
        match self {
            Self::Field(name) | Self::Local(name) => name
        }
    }

    pub fn is_field(&self) -> bool {
        matches!(self, Self::Field(_))
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Field(name) => write!(f, "$this->{}", name),
            Self::Local(name) => write!(f, "${}", name)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stmt {
    Expr {
        expr:       Expr,
        #[serde(default)]
        annotation: Option<String>,
        location:   Location
    },
    Assign {
        target:     Target,
        value:      Expr,
        #[serde(default)]
        annotation: Option<String>,
        location:   Location
    },
    Return {
        #[serde(default)]
        value:      Option<Expr>,
        #[serde(default)]
        annotation: Option<String>,
        location:   Location
    },
    If {
        condition: Expr,
        #[serde(default)]
        then:      Vec<Stmt>,
        #[serde(default)]
        otherwise: Vec<Stmt>,
        location:  Location
    },
    While {
        condition:  Expr,
        #[serde(default)]
        body:       Vec<Stmt>,
        #[serde(default)]
        annotation: Option<String>,
        location:   Location
    },
    Foreach {
        subject:  Expr,
        #[serde(default)]
        body:     Vec<Stmt>,
        location: Location
    },
    Throw {
        value:    Expr,
        location: Location
    },
    Block {
        #[serde(default)]
        body:     Vec<Stmt>,
        location: Location
    }
}

impl Stmt {
    pub fn location(&self) -> Location {
        match self {
            Self::Expr {
                location, ..
            }
            | Self::Assign {
                location, ..
            }
            | Self::Return {
                location, ..
            }
            | Self::If {
                location, ..
            }
            | Self::While {
                location, ..
            }
            | Self::Foreach {
                location, ..
            }
            | Self::Throw {
                location, ..
            }
            | Self::Block {
                location, ..
            } => *location
        }
    }

    /// Shape annotation text attached to this statement, if any.
    pub fn annotation(&self) -> Option<&str> {
        match self {
            Self::Expr {
                annotation, ..
            }
            | Self::Assign {
                annotation, ..
            }
            | Self::Return {
                annotation, ..
            }
            | Self::While {
                annotation, ..
            } => annotation.as_deref(),
            _ => None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    Str {
        value:    String,
        location: Location
    },
    Interpolated {
        parts:    Vec<StrPart>,
        location: Location
    },
    Concat {
        left:     Box<Expr>,
        right:    Box<Expr>,
        location: Location
    },
    Local {
        name:     String,
        location: Location
    },
    Field {
        name:     String,
        location: Location
    },
    Call {
        #[serde(default)]
        receiver: Option<Box<Expr>>,
        method:   String,
        #[serde(default)]
        args:     Vec<Expr>,
        location: Location
    },
    Array {
        #[serde(default)]
        items:    Vec<ArrayItem>,
        location: Location
    },
    Int {
        value:    i64,
        location: Location
    },
    Bool {
        value:    bool,
        location: Location
    },
    Null {
        location: Location
    },
    Binary {
        op:       BinaryOp,
        left:     Box<Expr>,
        right:    Box<Expr>,
        location: Location
    },
    Not {
        expr:     Box<Expr>,
        location: Location
    },
    Assign {
        target:   Target,
        value:    Box<Expr>,
        location: Location
    },
    Other {
        location: Location
    }
}

impl Expr {
    pub fn location(&self) -> Location {
        match self {
            Self::Str {
                location, ..
            }
            | Self::Interpolated {
                location, ..
            }
            | Self::Concat {
                location, ..
            }
            | Self::Local {
                location, ..
            }
            | Self::Field {
                location, ..
            }
            | Self::Call {
                location, ..
            }
            | Self::Array {
                location, ..
            }
            | Self::Int {
                location, ..
            }
            | Self::Bool {
                location, ..
            }
            | Self::Null {
                location
            }
            | Self::Binary {
                location, ..
            }
            | Self::Not {
                location, ..
            }
            | Self::Assign {
                location, ..
            }
            | Self::Other {
                location
            } => *location
        }
    }

    /// The variable or field this expression names, if it is one.
    pub fn as_target(&self) -> Option<Target> {
        match self {
            Self::Local {
                name, ..
            } => Some(Target::Local(name.clone())),
            Self::Field {
                name, ..
            } => Some(Target::Field(name.clone())),
            _ => None
        }
    }
}

/// Segment of an interpolated string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StrPart {
    Literal(String),
    Expr(Expr)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayItem {
    #[serde(default)]
    pub key:      Option<Expr>,
    pub value:    Expr,
    #[serde(default)]
    pub location: Location
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Equal,
    Identical,
    NotEqual,
    NotIdentical,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
    And,
    Or,
    Other
}
