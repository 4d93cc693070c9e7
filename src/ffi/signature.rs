//! Member signatures for imported native libraries
//!
//! Signatures are declared as lists: the first element is the return (or
//! value) type, the rest are parameter types. `["int", "@"]` declares a
//! static field of type `int`; every other list declares a method.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static TYPE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\[\]* ]+$").expect("type name pattern is valid"));

/// Marker that turns a declaration into a field
pub const FIELD_MARKER: &str = "@";

/// Return type used when a declaration leaves it empty
pub const DEFAULT_RETURN_TYPE: &str = "void";

/// Problems with a declarative signature
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("field marker '@' must be the only parameter")]
    MisplacedFieldMarker,

    #[error("field cannot have type void")]
    VoidField,

    #[error("invalid type name: '{0}'")]
    InvalidTypeName(String),
}

/// A member of an imported library
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub enum Signature {
    /// Static extern method
    Callable {
        return_type: String,
        params: Vec<String>,
    },
    /// Static field
    Field { ty: String },
}

impl Signature {
    /// A method returning `return_type`
    pub fn callable<I, S>(return_type: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Signature::Callable {
            return_type: return_type.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// A static field of type `ty`
    pub fn field(ty: impl Into<String>) -> Self {
        Signature::Field { ty: ty.into() }
    }

    /// Convert the declarative list form
    pub fn from_decl<S: AsRef<str>>(decl: &[S]) -> Result<Self, SignatureError> {
        let mut parts = decl.iter().map(|s| s.as_ref().trim());
        let head = match parts.next() {
            Some(ty) if !ty.is_empty() => ty,
            _ => DEFAULT_RETURN_TYPE,
        };
        let params: Vec<&str> = parts.collect();

        validate_type(head)?;

        if params == [FIELD_MARKER] {
            if head == DEFAULT_RETURN_TYPE {
                return Err(SignatureError::VoidField);
            }
            return Ok(Signature::field(head));
        }

        for param in &params {
            if *param == FIELD_MARKER {
                return Err(SignatureError::MisplacedFieldMarker);
            }
            validate_type(param)?;
        }

        Ok(Signature::callable(head, params))
    }

    /// The declarative list form
    pub fn to_decl(&self) -> Vec<String> {
        match self {
            Signature::Callable {
                return_type,
                params,
            } => std::iter::once(return_type.clone())
                .chain(params.iter().cloned())
                .collect(),
            Signature::Field { ty } => vec![ty.clone(), FIELD_MARKER.to_string()],
        }
    }

    pub fn is_field(&self) -> bool {
        matches!(self, Signature::Field { .. })
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Signature::Callable { .. })
    }

    /// Number of parameters a call must supply
    pub fn arity(&self) -> usize {
        match self {
            Signature::Callable { params, .. } => params.len(),
            Signature::Field { .. } => 0,
        }
    }

    /// C# member definition for `name`, without attributes
    pub fn render(&self, name: &str) -> String {
        match self {
            Signature::Callable {
                return_type,
                params,
            } => {
                let args: Vec<String> = params
                    .iter()
                    .enumerate()
                    .map(|(i, ty)| format!("{} arg{}", ty, i))
                    .collect();
                format!(
                    "public static extern {} {}({});",
                    return_type,
                    name,
                    args.join(", ")
                )
            }
            Signature::Field { ty } => format!("public static {} {};", ty, name),
        }
    }
}

impl TryFrom<Vec<String>> for Signature {
    type Error = SignatureError;

    fn try_from(decl: Vec<String>) -> Result<Self, Self::Error> {
        Signature::from_decl(&decl)
    }
}

impl From<Signature> for Vec<String> {
    fn from(signature: Signature) -> Self {
        signature.to_decl()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.to_decl().join(", "))
    }
}

fn validate_type(ty: &str) -> Result<(), SignatureError> {
    if TYPE_NAME.is_match(ty) {
        Ok(())
    } else {
        Err(SignatureError::InvalidTypeName(ty.to_string()))
    }
}
