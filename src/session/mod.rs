//! Session Manager
//!
//! A [`Session`] owns one shell process and exposes it as an async
//! request/response API. The queue, the output demultiplexer and the busy
//! flag live in a driver task; the session and its [`Executor`] handles talk
//! to it over a channel and observe the lifecycle through a watch channel.

pub mod demux;
pub(crate) mod driver;
pub mod executor;
pub mod queue;

pub use demux::{DemuxEvent, OutputDemux};
pub use executor::Executor;
pub use queue::CommandQueue;

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::extension::{Extension, ExtensionSet};
use crate::ffi::{BindingRegistry, LibraryProxy, Signature};
use crate::models::{CommandOutput, ExecRequest, SessionState, ShellProcess};
use crate::protocol::{ErrorClass, ErrorTypeTable, BOOTSTRAP_SCRIPT};
use crate::shell::{discover_shell, send_terminate, ShellStreams, SpawnConfig, SpawnedShell};
use driver::{Control, Driver};

/// A long-lived shell session
pub struct Session {
    process: ShellProcess,
    child: Option<Child>,
    config: SessionConfig,
    control_tx: mpsc::UnboundedSender<Control>,
    state_rx: watch::Receiver<SessionState>,
    executor: Executor,
    error_table: Arc<RwLock<ErrorTypeTable>>,
    registry: BindingRegistry,
    proxies: HashMap<String, LibraryProxy>,
    extensions: ExtensionSet,
    started: bool,
    driver: JoinHandle<()>,
}

impl Session {
    /// Spawn the first working shell and prepare a session around it
    ///
    /// Libraries from the configuration are imported; the session is not
    /// started. Must be called from within a Tokio runtime.
    pub fn new(config: SessionConfig) -> Result<Self> {
        let spawn_config = SpawnConfig {
            args: config.shell_args.clone(),
            working_directory: config.working_directory.clone(),
            ..Default::default()
        };
        let SpawnedShell {
            process,
            child,
            streams,
        } = discover_shell(&config.additional_shells, &spawn_config)?;

        Self::assemble(process, Some(child), streams, config)
    }

    /// Build a session over already-bridged streams
    ///
    /// Used to drive the engine without a real process.
    pub fn from_streams(shell: impl Into<String>, streams: ShellStreams, config: SessionConfig) -> Result<Self> {
        let mut process = ShellProcess::new(shell.into(), config.shell_args.clone());
        process.mark_started(None);
        Self::assemble(process, None, streams, config)
    }

    /// Create a session and start it if `auto_start` is set
    pub async fn launch(config: SessionConfig) -> Result<Self> {
        let auto_start = config.auto_start;
        let mut session = Self::new(config)?;
        if auto_start {
            session.start().await?;
        }
        Ok(session)
    }

    fn assemble(
        process: ShellProcess,
        child: Option<Child>,
        streams: ShellStreams,
        config: SessionConfig,
    ) -> Result<Self> {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::Uninitialized);
        let error_table = Arc::new(RwLock::new(ErrorTypeTable::new()));

        let mut registry = BindingRegistry::new();
        for (path, members) in &config.libraries {
            registry.import(path, members.clone())?;
        }

        let driver = Driver::new(streams, control_rx, state_tx, Arc::clone(&error_table));
        let driver = tokio::spawn(driver.run());

        let executor = Executor::new(control_tx.clone(), state_rx.clone(), config.timeouts.command());

        Ok(Self {
            process,
            child,
            config,
            control_tx,
            state_rx,
            executor,
            error_table,
            registry,
            proxies: HashMap::new(),
            extensions: ExtensionSet::new(),
            started: false,
            driver,
        })
    }

    /// Inject library declarations and the bootstrap, then wait for the
    /// first prompt
    ///
    /// A session starts at most once, even if the first attempt failed.
    pub async fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(Error::AlreadyStarted);
        }
        self.started = true;
        self.registry.seal();

        let mut script = self.registry.render();
        script.push_str(BOOTSTRAP_SCRIPT);
        self.proxies = self.registry.build_proxies(Arc::new(self.executor.clone()));

        let timeout = self.config.timeouts.startup();
        info!(
            "Starting session on '{}' with {} library group(s)",
            self.process.shell,
            self.registry.len()
        );

        let (ready_tx, ready_rx) = oneshot::channel();
        self.control_tx
            .send(Control::Start {
                script,
                timeout,
                ready: ready_tx,
            })
            .map_err(|_| Error::SessionClosed)?;

        ready_rx.await.map_err(|_| Error::SessionClosed)?
    }

    /// Execute a command
    ///
    /// The command is queued immediately; the returned future resolves when
    /// its result arrives or its deadline passes.
    pub fn exec(&self, request: impl Into<ExecRequest>) -> BoxFuture<'static, Result<CommandOutput>> {
        self.executor.exec(request)
    }

    /// Import members of a native library; only before `start`
    pub fn import_dll<I, S>(&mut self, path: &str, members: I) -> Result<String>
    where
        I: IntoIterator<Item = (S, Signature)>,
        S: Into<String>,
    {
        if self.started {
            return Err(Error::ImportAfterStart {
                path: path.to_string(),
            });
        }
        self.registry.import(path, members)
    }

    /// Attach an extension and import its libraries
    ///
    /// Attaching the same type again returns the existing instance.
    pub fn extend<E: Extension>(&mut self) -> Result<Arc<E>> {
        if let Some(existing) = self.extensions.get::<E>() {
            return Ok(existing);
        }

        let extension = E::create(self);
        for (path, members) in extension.dll_imports() {
            self.import_dll(&path, members)?;
        }
        let extension = self.extensions.insert(extension);
        debug!("Attached extension '{}'", crate::extension::normalize_name(extension.name()));
        Ok(extension)
    }

    pub fn get_extension<E: Extension>(&self) -> Option<Arc<E>> {
        self.extensions.get::<E>()
    }

    pub fn get_extension_by_name(&self, name: &str) -> Option<Arc<dyn Extension>> {
        self.extensions.get_by_name(name)
    }

    /// Map an error code to a class for all later results
    pub fn register_error_class(&self, code: impl Into<String>, template: impl Into<String>) {
        let class = ErrorClass::new(code, template);
        let mut table = self
            .error_table
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        table.register(class);
    }

    /// Snapshot of the library proxies, keyed by group name
    pub fn dll(&self) -> HashMap<String, LibraryProxy> {
        self.proxies.clone()
    }

    /// Proxy for one library group
    pub fn library(&self, name: &str) -> Result<&LibraryProxy> {
        self.proxies.get(name).ok_or_else(|| Error::UnknownLibrary {
            library: name.to_string(),
        })
    }

    /// The shell executable in use
    pub fn shell(&self) -> &str {
        &self.process.shell
    }

    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    pub fn pid(&self) -> Option<u32> {
        self.process.pid
    }

    pub fn process(&self) -> &ShellProcess {
        &self.process
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Clonable handle for submitting commands
    pub fn executor(&self) -> Executor {
        self.executor.clone()
    }

    /// Wait until the lifecycle reaches a state matching `predicate`
    pub async fn wait_for_state(&self, predicate: impl Fn(SessionState) -> bool) -> SessionState {
        let mut state_rx = self.state_rx.clone();
        if let Ok(state) = state_rx.wait_for(|state| predicate(*state)).await {
            return *state;
        }
        // Driver gone; report the last published state
        *self.state_rx.borrow()
    }

    /// Ask the shell to exit, then terminate it if it lingers
    ///
    /// Pending commands fail with [`Error::SessionClosed`].
    pub async fn shutdown(&mut self) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        if self.control_tx.send(Control::Shutdown { done: done_tx }).is_ok() {
            let _ = done_rx.await;
        }

        let Some(mut child) = self.child.take() else {
            self.process.mark_terminated(None);
            return Ok(());
        };

        let grace = self.config.timeouts.shutdown_grace();
        let status = match tokio::time::timeout(grace, child.wait()).await {
            Ok(status) => Some(status?),
            Err(_) => terminate(&mut child, grace).await?,
        };

        let exit_code = status.and_then(|s| s.code());
        self.process.mark_terminated(exit_code);
        info!("Shell '{}' exited with {:?}", self.process.shell, exit_code);
        Ok(())
    }
}

/// SIGTERM, then kill if the process is still around after `grace`
async fn terminate(child: &mut Child, grace: Duration) -> Result<Option<std::process::ExitStatus>> {
    if let Some(pid) = child.id() {
        debug!("Shell did not exit, sending terminate to pid {}", pid);
        if send_terminate(pid)? {
            if let Ok(status) = tokio::time::timeout(grace, child.wait()).await {
                return Ok(Some(status?));
            }
        }
    }

    warn!("Killing shell process");
    child.kill().await?;
    Ok(child.try_wait()?)
}

impl Drop for Session {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("process", &self.process)
            .field("state", &self.state())
            .field("started", &self.started)
            .field("libraries", &self.registry.len())
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}
