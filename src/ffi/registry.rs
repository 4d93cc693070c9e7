//! Binding Registry
//!
//! Collects imported library declarations before the session starts, renders
//! them as `Add-Type` blocks for the bootstrap, and builds the call proxies.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::proxy::{CommandRunner, LibraryProxy};
use super::signature::Signature;
use crate::error::{Error, Result};

/// File extensions accepted as native libraries
pub const LIBRARY_EXTENSIONS: [&str; 3] = ["dll", "so", "dylib"];

/// Namespace the generated types live in
pub const BINDING_NAMESPACE: &str = "DLL";

static MEMBER_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("member name pattern is valid"));

/// Members imported from one native library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryDeclaration {
    /// Group name derived from the file name
    pub name: String,
    /// Library path as given by the caller
    pub path: String,
    pub members: BTreeMap<String, Signature>,
}

impl LibraryDeclaration {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            members: BTreeMap::new(),
        }
    }

    /// `[DLL.<name>]`, the type expression for this group
    pub fn type_expr(&self) -> String {
        format!("[{}.{}]", BINDING_NAMESPACE, self.name)
    }

    /// Render the `Add-Type` block
    pub fn render(&self) -> String {
        let import = format!(
            "[DllImport(\"{}\", CharSet=CharSet.Auto)]",
            escape_csharp(&self.path)
        );
        let mut definition = String::new();
        for (member, signature) in &self.members {
            if signature.is_callable() {
                definition.push_str(&import);
                definition.push(' ');
            }
            definition.push_str(&signature.render(member));
            definition.push('\n');
        }
        format!(
            "Add-Type -Namespace {} -Name {} -MemberDefinition @'\n{}'@\n",
            BINDING_NAMESPACE, self.name, definition
        )
    }
}

/// Group name for a library path
///
/// Takes the last path segment (either separator), drops the extension and
/// maps anything that is not a valid identifier character to `_`.
pub fn library_name(path: &str) -> Result<String> {
    let invalid = || Error::InvalidLibraryPath {
        path: path.to_string(),
    };

    let file = path.rsplit(['/', '\\']).next().ok_or_else(invalid)?;
    let (stem, extension) = file.rsplit_once('.').ok_or_else(invalid)?;
    if stem.is_empty()
        || !LIBRARY_EXTENSIONS
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    {
        return Err(invalid());
    }

    let mut name: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    Ok(name)
}

/// Declarations imported into a session
#[derive(Debug, Clone, Default)]
pub struct BindingRegistry {
    libraries: BTreeMap<String, LibraryDeclaration>,
    sealed: bool,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Import members of a native library
    ///
    /// Imports resolving to the same group merge; a later signature replaces
    /// an earlier one for the same member. Returns the group name.
    pub fn import<I, S>(&mut self, path: &str, members: I) -> Result<String>
    where
        I: IntoIterator<Item = (S, Signature)>,
        S: Into<String>,
    {
        if self.sealed {
            return Err(Error::ImportAfterStart {
                path: path.to_string(),
            });
        }
        let name = library_name(path)?;

        let members: Vec<(String, Signature)> =
            members.into_iter().map(|(m, s)| (m.into(), s)).collect();
        for (member, _) in &members {
            validate_member_name(member)?;
        }

        let declaration = self
            .libraries
            .entry(name.clone())
            .or_insert_with(|| LibraryDeclaration::new(name.clone(), path));
        if declaration.path != path {
            warn!(
                "Library group '{}' already bound to {}, ignoring path {}",
                name, declaration.path, path
            );
        }
        let count = members.len();
        declaration.members.extend(members);
        debug!("Imported {} member(s) into DLL.{}", count, name);
        Ok(name)
    }

    pub fn get(&self, name: &str) -> Option<&LibraryDeclaration> {
        self.libraries.get(name)
    }

    pub fn libraries(&self) -> impl Iterator<Item = &LibraryDeclaration> {
        self.libraries.values()
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }

    /// Refuse further imports
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// All `Add-Type` blocks, in group-name order
    pub fn render(&self) -> String {
        self.libraries.values().map(LibraryDeclaration::render).collect()
    }

    /// One proxy per group, all calling through `runner`
    pub fn build_proxies(&self, runner: Arc<dyn CommandRunner>) -> HashMap<String, LibraryProxy> {
        self.libraries
            .values()
            .map(|decl| (decl.name.clone(), LibraryProxy::new(decl.clone(), Arc::clone(&runner))))
            .collect()
    }
}

fn validate_member_name(member: &str) -> Result<()> {
    if MEMBER_NAME.is_match(member) {
        Ok(())
    } else {
        Err(Error::InvalidSignature {
            member: member.to_string(),
            reason: "member name is not an identifier".to_string(),
        })
    }
}

fn escape_csharp(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
