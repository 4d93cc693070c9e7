//! Native library bindings
//!
//! Declarative descriptions of native library members are rendered into
//! `Add-Type` declarations injected at startup, and exposed afterwards as
//! proxies that marshal arguments into shell literals.

pub mod marshal;
pub mod proxy;
pub mod registry;
pub mod signature;

pub use marshal::{encode_args, quote, ShellArg};
pub use proxy::{CommandRunner, LibraryProxy};
pub use registry::{library_name, BindingRegistry, LibraryDeclaration, BINDING_NAMESPACE, LIBRARY_EXTENSIONS};
pub use signature::{Signature, SignatureError, FIELD_MARKER};

use std::collections::BTreeMap;

/// Member signatures keyed by member name
pub type MemberMap = BTreeMap<String, Signature>;

/// Library path -> members, as declared by extensions and configuration
pub type LibraryImports = BTreeMap<String, MemberMap>;
