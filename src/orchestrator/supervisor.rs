//! Agent process supervisor.
//!
//! Spawns the two agent programs as independent OS processes, tracks them
//! in launch order, and tears them down. Every child is created with
//! `kill_on_drop(true)` so a dropped supervisor never leaks a process.
//! The supervisor is the only owner of the [`Child`] handles and the only
//! code that signals them.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use crate::config::{AgentConfig, AgentsConfig, DURATION_ENV, TOPIC_ENV};
use crate::models::agent::{AgentRole, AgentState};
use crate::models::room::{AccessToken, RoomCredentials};
use crate::{AppError, Result};

/// Delay between spawning the first and the second agent.
pub const STAGGER_DELAY: Duration = Duration::from_secs(3);

/// A supervised agent child process.
#[derive(Debug)]
pub struct AgentProcess {
    role: AgentRole,
    name: String,
    pid: Option<u32>,
    launched_at: Instant,
    state: AgentState,
    exit_status: Option<ExitStatus>,
    child: Child,
}

impl AgentProcess {
    /// Seat this process occupies.
    #[must_use]
    pub fn role(&self) -> AgentRole {
        self.role
    }

    /// Display name from configuration.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// OS process id captured at spawn.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Monotonic spawn instant.
    #[must_use]
    pub fn launched_at(&self) -> Instant {
        self.launched_at
    }

    /// Last observed lifecycle state.
    #[must_use]
    pub fn state(&self) -> AgentState {
        self.state
    }

    /// Exit status once the process has been reaped.
    #[must_use]
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status
    }

    /// Poll the child without blocking. Returns `true` once it has exited.
    pub fn refresh(&mut self) -> bool {
        if !self.state.is_live() {
            return true;
        }

        match self.child.try_wait() {
            Ok(Some(status)) => {
                info!(
                    agent = %self.name,
                    role = %self.role,
                    status = %describe_exit(Some(status)),
                    "agent process exited"
                );
                self.mark_exited(Some(status));
                true
            }
            Ok(None) => {
                if self.state == AgentState::Spawned {
                    self.state = AgentState::Running;
                }
                false
            }
            Err(err) => {
                warn!(agent = %self.name, %err, "failed to poll agent process status");
                false
            }
        }
    }

    fn mark_exited(&mut self, status: Option<ExitStatus>) {
        self.state = AgentState::Exited;
        self.exit_status = status;
    }

    /// Ask the process to stop without waiting for it.
    fn request_stop(&mut self) {
        if let Err(err) = send_stop_signal(&mut self.child) {
            warn!(agent = %self.name, %err, "failed to send stop signal");
        }
        self.state = AgentState::Terminating;
    }
}

/// Outcome of the staggered two-agent launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchProgress {
    /// Both agents were spawned.
    Complete,
    /// Cancellation arrived during the stagger delay; only the first agent
    /// was spawned.
    Cancelled,
}

/// Owns and manages the agent child processes of one session.
#[derive(Debug, Default)]
pub struct ProcessSupervisor {
    processes: Vec<AgentProcess>,
    child_env: Vec<(String, String)>,
}

impl ProcessSupervisor {
    /// Create a supervisor whose children inherit the orchestrator
    /// environment plus the session topic and duration.
    #[must_use]
    pub fn new(topic: &str, duration_seconds: i64) -> Self {
        Self {
            processes: Vec::new(),
            child_env: vec![
                (TOPIC_ENV.to_owned(), topic.to_owned()),
                (DURATION_ENV.to_owned(), duration_seconds.to_string()),
            ],
        }
    }

    /// Tracked processes in launch order.
    #[must_use]
    pub fn processes(&self) -> &[AgentProcess] {
        &self.processes
    }

    /// Spawn one agent as `<program> <args> --room-url <URL> --token <TOKEN>`.
    ///
    /// Does not wait for the agent to become ready.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Launch` if the OS refuses to start the program.
    pub fn spawn(
        &mut self,
        role: AgentRole,
        agent: &AgentConfig,
        room_url: &str,
        token: &AccessToken,
    ) -> Result<&AgentProcess> {
        let span = info_span!("spawn_agent", agent = %agent.name, %role);
        let _guard = span.enter();

        let mut cmd = Command::new(&agent.program);
        cmd.args(&agent.args)
            .arg("--room-url")
            .arg(room_url)
            .arg("--token")
            .arg(token.expose())
            .envs(self.child_env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|err| {
            AppError::Launch(format!(
                "failed to spawn {} ({}): {err}",
                agent.name, agent.program
            ))
        })?;

        let pid = child.id();
        info!(pid = pid.unwrap_or(0), program = %agent.program, "agent process spawned");

        self.processes.push(AgentProcess {
            role,
            name: agent.name.clone(),
            pid,
            launched_at: Instant::now(),
            state: AgentState::Spawned,
            exit_status: None,
            child,
        });

        let index = self.processes.len() - 1;
        self.processes[index].refresh();
        Ok(&self.processes[index])
    }

    /// Spawn the first agent, wait [`STAGGER_DELAY`], then spawn the second.
    ///
    /// The stagger wait is interruptible through `cancel`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Launch` if either spawn fails. Any agent already
    /// spawned stays tracked so teardown can stop it.
    pub async fn launch_pair(
        &mut self,
        agents: &AgentsConfig,
        credentials: &RoomCredentials,
        cancel: &CancellationToken,
    ) -> Result<LaunchProgress> {
        let room_url = credentials.room.url.as_str();

        self.spawn(
            AgentRole::FirstAgent,
            &agents.first,
            room_url,
            &credentials.first_agent,
        )?;

        tokio::select! {
            () = cancel.cancelled() => {
                info!("cancelled during stagger delay");
                return Ok(LaunchProgress::Cancelled);
            }
            () = tokio::time::sleep(STAGGER_DELAY) => {}
        }

        self.spawn(
            AgentRole::SecondAgent,
            &agents.second,
            room_url,
            &credentials.second_agent,
        )?;

        if let [first, second] = self.processes.as_slice() {
            info!(
                first = %first.name,
                first_pid = first.pid.unwrap_or(0),
                second = %second.name,
                second_pid = second.pid.unwrap_or(0),
                "both agents launched"
            );
        }

        Ok(LaunchProgress::Complete)
    }

    /// Stop the process occupying `role`, if one was spawned.
    ///
    /// # Errors
    ///
    /// Same as [`terminate`].
    pub async fn terminate_role(
        &mut self,
        role: AgentRole,
        grace: Duration,
    ) -> Result<Option<ExitStatus>> {
        match self.processes.iter_mut().find(|p| p.role == role) {
            Some(process) => terminate(process, grace).await,
            None => Ok(None),
        }
    }

    /// Whether every tracked process has exited. Vacuously true when nothing
    /// was spawned.
    pub fn all_exited(&mut self) -> bool {
        self.processes
            .iter_mut()
            .fold(true, |all, process| process.refresh() && all)
    }

    /// Stop every tracked process.
    ///
    /// All live processes are signalled first in launch order, then each is
    /// awaited for up to `grace`. A process that overstays its grace period
    /// is reported and force-killed; the remaining processes are still
    /// handled.
    pub async fn terminate_all(&mut self, grace: Duration) -> Vec<AppError> {
        let span = info_span!("terminate_all", count = self.processes.len());
        async move {
            for process in &mut self.processes {
                if !process.refresh() {
                    info!(agent = %process.name, pid = process.pid.unwrap_or(0), "stopping agent");
                    process.request_stop();
                }
            }

            let mut errors = Vec::new();
            for process in &mut self.processes {
                if let Err(err) = terminate(process, grace).await {
                    errors.push(err);
                }
            }
            errors
        }
        .instrument(span)
        .await
    }
}

/// Stop one process: signal it gracefully and wait up to `grace`.
///
/// Calling this on a process that has already exited returns its recorded
/// status without error.
///
/// # Errors
///
/// Returns `AppError::ShutdownTimeout` if the process is still alive after
/// `grace` (it is force-killed before returning), or `AppError::Io` if the
/// wait itself fails.
pub async fn terminate(process: &mut AgentProcess, grace: Duration) -> Result<Option<ExitStatus>> {
    if process.refresh() {
        return Ok(process.exit_status);
    }

    if process.state != AgentState::Terminating {
        process.request_stop();
    }

    match tokio::time::timeout(grace, process.child.wait()).await {
        Ok(Ok(status)) => {
            info!(
                agent = %process.name,
                status = %describe_exit(Some(status)),
                "agent process stopped"
            );
            process.mark_exited(Some(status));
            Ok(Some(status))
        }
        Ok(Err(err)) => {
            warn!(agent = %process.name, %err, "error waiting for agent process");
            force_kill(process).await;
            Err(AppError::Io(format!(
                "failed to wait for {}: {err}",
                process.name
            )))
        }
        Err(_elapsed) => {
            warn!(
                agent = %process.name,
                ?grace,
                "agent did not exit within grace period, forcing kill"
            );
            force_kill(process).await;
            Err(AppError::ShutdownTimeout(format!(
                "{} ({}) pid {} did not exit within {grace:?}",
                process.name,
                process.role,
                process.pid.unwrap_or(0)
            )))
        }
    }
}

async fn force_kill(process: &mut AgentProcess) {
    if let Err(err) = process.child.kill().await {
        warn!(agent = %process.name, %err, "failed to force-kill agent process");
    }
    let status = process.child.try_wait().ok().flatten();
    process.mark_exited(status);
}

#[cfg(unix)]
fn send_stop_signal(child: &mut Child) -> std::io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    // `None` means the child has already been reaped.
    let Some(raw) = child.id() else {
        return Ok(());
    };
    let pid = i32::try_from(raw)
        .map_err(|_| std::io::Error::other(format!("pid {raw} out of range")))?;

    match kill(Pid::from_raw(pid), Signal::SIGTERM) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(errno) => Err(errno.into()),
    }
}

#[cfg(not(unix))]
fn send_stop_signal(child: &mut Child) -> std::io::Result<()> {
    child.start_kill()
}

/// Human-readable exit description for logs.
#[must_use]
pub fn describe_exit(status: Option<ExitStatus>) -> String {
    status.map_or_else(
        || "status unknown".to_owned(),
        |s| {
            if s.success() {
                "exited normally (code 0)".to_owned()
            } else {
                s.code().map_or_else(
                    || "terminated by signal".to_owned(),
                    |c| format!("exited with code {c}"),
                )
            }
        },
    )
}
