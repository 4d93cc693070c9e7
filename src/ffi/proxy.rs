//! Library Proxies
//!
//! Call objects for imported libraries. Every call, read or assignment is
//! turned into a shell command and executed through the session like any
//! other command.

use async_trait::async_trait;
use std::sync::Arc;

use super::marshal::{encode_args, ShellArg};
use super::registry::LibraryDeclaration;
use super::signature::Signature;
use crate::error::{Error, Result};
use crate::models::CommandOutput;
use crate::session::Executor;

/// Something that can run a shell command
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: String) -> Result<CommandOutput>;
}

#[async_trait]
impl CommandRunner for Executor {
    async fn run(&self, command: String) -> Result<CommandOutput> {
        self.exec(command).await
    }
}

/// Proxy for one imported library group
#[derive(Clone)]
pub struct LibraryProxy {
    declaration: LibraryDeclaration,
    runner: Arc<dyn CommandRunner>,
}

impl std::fmt::Debug for LibraryProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryProxy")
            .field("declaration", &self.declaration)
            .finish_non_exhaustive()
    }
}

impl LibraryProxy {
    pub fn new(declaration: LibraryDeclaration, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            declaration,
            runner,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name
    }

    pub fn declaration(&self) -> &LibraryDeclaration {
        &self.declaration
    }

    /// Names of all members
    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.declaration.members.keys().map(String::as_str)
    }

    pub fn signature(&self, member: &str) -> Option<&Signature> {
        self.declaration.members.get(member)
    }

    /// Command that calls a method
    pub fn call_expr(&self, member: &str, args: &[ShellArg]) -> Result<String> {
        self.expect_kind(member, true)?;
        Ok(format!(
            "{}::{}({})",
            self.declaration.type_expr(),
            member,
            encode_args(args)
        ))
    }

    /// Command that reads a field
    pub fn get_expr(&self, member: &str) -> Result<String> {
        self.expect_kind(member, false)?;
        Ok(format!("{}::{}", self.declaration.type_expr(), member))
    }

    /// Command that assigns a field
    pub fn set_expr(&self, member: &str, value: &ShellArg) -> Result<String> {
        self.expect_kind(member, false)?;
        Ok(format!(
            "{}::{} = {}",
            self.declaration.type_expr(),
            member,
            value.encode()
        ))
    }

    /// Call a method
    pub async fn call(&self, member: &str, args: &[ShellArg]) -> Result<CommandOutput> {
        let command = self.call_expr(member, args)?;
        self.runner.run(command).await
    }

    /// Read a field
    pub async fn get(&self, member: &str) -> Result<CommandOutput> {
        let command = self.get_expr(member)?;
        self.runner.run(command).await
    }

    /// Assign a field
    pub async fn set(&self, member: &str, value: impl Into<ShellArg>) -> Result<CommandOutput> {
        let command = self.set_expr(member, &value.into())?;
        self.runner.run(command).await
    }

    fn expect_kind(&self, member: &str, callable: bool) -> Result<()> {
        let signature = self.signature(member).ok_or_else(|| Error::UnknownMember {
            library: self.declaration.name.clone(),
            member: member.to_string(),
        })?;
        if signature.is_callable() != callable {
            return Err(Error::MemberKindMismatch {
                library: self.declaration.name.clone(),
                member: member.to_string(),
                expected: if callable { "method" } else { "field" },
            });
        }
        Ok(())
    }
}
