//! Node binaries run as child processes of the orchestrator

use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use netrunner_core::error::{NetworkError, NetworkResult};
use netrunner_core::{NodeConfig, NodeProcess, NodeProcessFactory};

/// How a child process ended
#[derive(Debug, Clone)]
pub enum ProcessExit {
    Exited(ExitStatus),
    /// Waiting on the child failed; the process state is unknown
    WaitFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessState {
    Created,
    Running { pid: u32 },
    Exited,
}

/// One invocation of a node binary
pub struct OsNodeProcess {
    name: String,
    program: PathBuf,
    args: Vec<String>,
    state: Arc<Mutex<ProcessState>>,
    stop_requested: AtomicBool,
    exit_tx: Arc<watch::Sender<Option<ProcessExit>>>,
}

impl OsNodeProcess {
    pub fn new(name: impl Into<String>, program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        let (exit_tx, _) = watch::channel(None);
        Self {
            name: name.into(),
            program: program.into(),
            args,
            state: Arc::new(Mutex::new(ProcessState::Created)),
            stop_requested: AtomicBool::new(false),
            exit_tx: Arc::new(exit_tx),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// OS process ID while the process runs
    pub fn pid(&self) -> Option<u32> {
        match *self.state.lock() {
            ProcessState::Running { pid } => Some(pid),
            _ => None,
        }
    }

    /// The exit outcome, once the process has ended
    pub fn exit(&self) -> Option<ProcessExit> {
        self.exit_tx.borrow().clone()
    }

    /// Deliver `sig` to the running process
    ///
    /// Not started and already exited processes are left alone.
    fn signal(&self, sig: Signal) -> NetworkResult<()> {
        let pid = match *self.state.lock() {
            ProcessState::Running { pid } => pid,
            ProcessState::Created | ProcessState::Exited => return Ok(()),
        };

        debug!("Sending {} to node '{}' (pid {})", sig, self.name, pid);
        match signal::kill(Pid::from_raw(pid as i32), sig) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(errno) => Err(NetworkError::process(
                &self.name,
                sig.as_str(),
                format!("Failed to signal pid {}: {}", pid, errno),
            )),
        }
    }
}

#[async_trait]
impl NodeProcess for OsNodeProcess {
    async fn start(&self) -> NetworkResult<()> {
        let mut state = self.state.lock();
        if *state != ProcessState::Created {
            return Err(NetworkError::process(&self.name, "start", "Process was already started"));
        }

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                NetworkError::process(
                    &self.name,
                    "start",
                    format!("Failed to spawn {}: {}", self.program.display(), e),
                )
            })?;

        let pid = child
            .id()
            .ok_or_else(|| NetworkError::process(&self.name, "start", "Failed to get process ID"))?;

        if let Some(stdout) = child.stdout.take() {
            forward_output(self.name.clone(), "stdout", stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            forward_output(self.name.clone(), "stderr", stderr);
        }

        *state = ProcessState::Running { pid };
        drop(state);

        let name = self.name.clone();
        let state = Arc::clone(&self.state);
        let exit_tx = Arc::clone(&self.exit_tx);
        tokio::spawn(async move {
            let outcome = match child.wait().await {
                Ok(status) => {
                    debug!("Node '{}' (pid {}) exited with {}", name, pid, status);
                    ProcessExit::Exited(status)
                }
                Err(e) => {
                    warn!("Failed to wait on node '{}' (pid {}): {}", name, pid, e);
                    ProcessExit::WaitFailed(e.to_string())
                }
            };
            *state.lock() = ProcessState::Exited;
            exit_tx.send_replace(Some(outcome));
        });

        info!("Spawned node '{}' with pid {}", self.name, pid);
        Ok(())
    }

    async fn wait(&self) -> NetworkResult<()> {
        if *self.state.lock() == ProcessState::Created {
            return Err(NetworkError::process(&self.name, "wait", "Process was never started"));
        }

        let mut rx = self.exit_tx.subscribe();
        let outcome = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| NetworkError::process(&self.name, "wait", "Exit channel closed"))?
            .clone();

        match outcome {
            Some(ProcessExit::Exited(status))
                if status.success() || self.stop_requested.load(Ordering::SeqCst) =>
            {
                Ok(())
            }
            Some(ProcessExit::Exited(status)) => Err(NetworkError::process(
                &self.name,
                "wait",
                format!("Exited unexpectedly with {}", status),
            )),
            Some(ProcessExit::WaitFailed(details)) => {
                Err(NetworkError::process(&self.name, "wait", details))
            }
            None => Err(NetworkError::internal("exit outcome missing after wait")),
        }
    }

    async fn stop(&self) -> NetworkResult<()> {
        self.stop_requested.store(true, Ordering::SeqCst);
        self.signal(Signal::SIGTERM)
    }

    async fn kill(&self) -> NetworkResult<()> {
        self.stop_requested.store(true, Ordering::SeqCst);
        self.signal(Signal::SIGKILL)
    }
}

/// Log every line of a child's output stream under the node's name
fn forward_output<R>(name: String, stream: &'static str, reader: R)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => debug!("[{} {}] {}", name, stream, line),
                Ok(None) => break,
                Err(e) => {
                    debug!("Stopped reading {} of node '{}': {}", stream, name, e);
                    break;
                }
            }
        }
    });
}

/// Creates an [`OsNodeProcess`] from a node's local config
#[derive(Debug, Clone, Default)]
pub struct OsProcessFactory;

impl NodeProcessFactory for OsProcessFactory {
    fn new_process(
        &self,
        config: &NodeConfig,
        args: &[String],
    ) -> NetworkResult<Arc<dyn NodeProcess>> {
        let local = config.local_config().ok_or_else(|| {
            NetworkError::validation(
                "impl_specific",
                "OS processes need a local implementation-specific config",
            )
        })?;
        if local.binary_path.as_os_str().is_empty() {
            return Err(NetworkError::validation("impl_specific.binary_path", "binary path is empty"));
        }

        Ok(Arc::new(OsNodeProcess::new(
            config.name.clone(),
            local.binary_path.clone(),
            args.to_vec(),
        )))
    }
}
