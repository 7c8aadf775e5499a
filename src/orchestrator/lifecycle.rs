//! Session lifecycle controller.
//!
//! Drives one session through
//! `Idle → Provisioning → Launching → Running → ShuttingDown → Stopped`.
//! Every path that gets past credential validation ends in the same
//! teardown: terminate all agents, then stop the asset server. Teardown is
//! not cancellable and always visits every agent.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use crate::config::GlobalConfig;
use crate::models::room::RoomCredentials;
use crate::models::session::{Session, SessionOutcome, SessionPhase, TimeBudget};
use crate::orchestrator::supervisor::{describe_exit, LaunchProgress, ProcessSupervisor};
use crate::provider::daily::DailyProvider;
use crate::provider::{provision, RoomProvider};
use crate::viewer::launch::{self, BrowserLauncher};
use crate::viewer::server::AssetServer;
use crate::{AppError, Result};

/// Interval between exit checks when the session has no time limit.
pub const EXIT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Coordinates provisioning, launch, timing, and teardown for one session.
pub struct SessionController {
    config: Arc<GlobalConfig>,
    provider: Arc<dyn RoomProvider>,
    browser: Arc<dyn BrowserLauncher>,
    session: Session,
    supervisor: ProcessSupervisor,
}

impl SessionController {
    /// Build an idle controller.
    #[must_use]
    pub fn new(
        config: Arc<GlobalConfig>,
        provider: Arc<dyn RoomProvider>,
        browser: Arc<dyn BrowserLauncher>,
    ) -> Self {
        let session = Session::new(
            config.session.topic.clone(),
            config.session.duration_seconds,
        );
        let supervisor = ProcessSupervisor::new(&session.topic, session.duration_seconds);
        Self {
            config,
            provider,
            browser,
            session,
            supervisor,
        }
    }

    /// The session record, including its current phase.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The process supervisor and the agents it tracks.
    #[must_use]
    pub fn supervisor(&self) -> &ProcessSupervisor {
        &self.supervisor
    }

    /// Run the session to completion.
    ///
    /// `cancel` interrupts provisioning, the stagger delay, and the running
    /// wait; each of those then proceeds straight to teardown.
    ///
    /// # Errors
    ///
    /// - `AppError::Config` if a credential is missing (nothing is started).
    /// - `AppError::Server` if the viewer port cannot be bound.
    /// - `AppError::Provisioning` if the room or any token cannot be created
    ///   (no agent is spawned).
    /// - `AppError::Launch` if an agent cannot be spawned.
    /// - `AppError::ShutdownTimeout` if an agent overstays its grace period
    ///   and no earlier error occurred.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<SessionOutcome> {
        let span = info_span!("session", session_id = %self.session.id);
        self.run_inner(cancel).instrument(span).await
    }

    async fn run_inner(&mut self, cancel: &CancellationToken) -> Result<SessionOutcome> {
        if let Err(err) = self.config.validate_credentials() {
            error!(%err, "credential check failed; nothing was started");
            self.transition(SessionPhase::Stopped);
            return Err(err);
        }

        self.transition(SessionPhase::Provisioning);
        let mut server =
            match AssetServer::start(&self.config.viewer.root, self.config.viewer.port).await {
                Ok(server) => server,
                Err(err) => {
                    self.transition(SessionPhase::ShuttingDown);
                    self.transition(SessionPhase::Stopped);
                    return Err(err);
                }
            };

        let driven = self.drive(&server, cancel).await;
        let teardown_errors = self.shut_down(&mut server).await;
        self.log_summary();

        match driven {
            Err(err) => {
                error!(%err, "session failed");
                Err(err)
            }
            Ok(outcome) => match teardown_errors.into_iter().next() {
                Some(err) => Err(err),
                None => {
                    info!(?outcome, "session finished");
                    Ok(outcome)
                }
            },
        }
    }

    async fn drive(
        &mut self,
        server: &AssetServer,
        cancel: &CancellationToken,
    ) -> Result<SessionOutcome> {
        let credentials = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                info!("cancelled during provisioning");
                return Ok(SessionOutcome::Cancelled);
            }
            provisioned = provision(
                self.provider.as_ref(),
                &self.session.topic,
                self.session.duration_seconds,
                self.config.room.expiry_margin_seconds,
            ) => provisioned?,
        };

        self.session.room_url = Some(credentials.room.url.clone());
        self.transition(SessionPhase::Launching);
        info!(
            room_url = %credentials.room.url,
            topic = %self.session.topic,
            duration_seconds = self.session.duration_seconds,
            "room ready"
        );

        self.open_viewer(server, &credentials);

        let progress = self
            .supervisor
            .launch_pair(&self.config.agents, &credentials, cancel)
            .await?;
        if progress == LaunchProgress::Cancelled {
            return Ok(SessionOutcome::Cancelled);
        }

        self.transition(SessionPhase::Running);
        self.wait_for_budget(cancel).await
    }

    fn open_viewer(&self, server: &AssetServer, credentials: &RoomCredentials) {
        let page = match launch::viewer_page_url(&server.base_url(), &self.config.viewer.page) {
            Ok(page) => page,
            Err(err) => {
                warn!(%err, "cannot build viewer url; skipping browser launch");
                return;
            }
        };
        let url = launch::build_viewer_url(&page, &credentials.room.url, &credentials.viewer);
        info!(viewer = %page, "opening viewer");
        // Detached: the launch result never feeds back into the session.
        launch::open_detached(Arc::clone(&self.browser), url);
    }

    async fn wait_for_budget(&mut self, cancel: &CancellationToken) -> Result<SessionOutcome> {
        match self.session.time_budget() {
            TimeBudget::Bounded(limit) => {
                tokio::select! {
                    () = cancel.cancelled() => {
                        info!("cancelled while running");
                        Ok(SessionOutcome::Cancelled)
                    }
                    () = tokio::time::sleep(limit) => {
                        info!(?limit, "time limit reached, terminating");
                        Ok(SessionOutcome::TimeBudgetReached)
                    }
                }
            }
            TimeBudget::Unbounded => loop {
                if self.supervisor.all_exited() {
                    info!("both agents exited");
                    return Ok(SessionOutcome::AgentsExited);
                }
                tokio::select! {
                    () = cancel.cancelled() => {
                        info!("cancelled while running");
                        return Ok(SessionOutcome::Cancelled);
                    }
                    () = tokio::time::sleep(EXIT_POLL_INTERVAL) => {}
                }
            },
        }
    }

    async fn shut_down(&mut self, server: &mut AssetServer) -> Vec<AppError> {
        self.transition(SessionPhase::ShuttingDown);

        let errors = self
            .supervisor
            .terminate_all(self.config.grace_period())
            .await;
        for err in &errors {
            error!(%err, "agent shutdown failed");
        }

        server.stop().await;
        self.transition(SessionPhase::Stopped);
        info!("all processes stopped");
        errors
    }

    fn transition(&mut self, next: SessionPhase) {
        let from = self.session.phase;
        match self.session.advance(next) {
            Ok(()) => info!(?from, to = ?next, "session phase changed"),
            Err(err) => warn!(%err, "ignored session transition"),
        }
    }

    fn log_summary(&self) {
        let elapsed = Utc::now() - self.session.started_at;
        for process in self.supervisor.processes() {
            info!(
                agent = process.name(),
                role = %process.role(),
                pid = process.pid().unwrap_or(0),
                status = %describe_exit(process.exit_status()),
                "agent summary"
            );
        }
        info!(elapsed_seconds = elapsed.num_seconds(), "session summary");
    }
}

/// Validate credentials, build the Daily provider, and run one session.
///
/// # Errors
///
/// Same as [`SessionController::run`]; a missing credential fails before
/// the provider is constructed.
pub async fn run_daily_session(
    config: Arc<GlobalConfig>,
    browser: Arc<dyn BrowserLauncher>,
    cancel: &CancellationToken,
) -> Result<SessionOutcome> {
    config.validate_credentials()?;
    let provider = Arc::new(DailyProvider::new(&config.room)?);
    SessionController::new(config, provider, browser)
        .run(cancel)
        .await
}
