//! Async driver: one tokio task owns the lifecycle controller.
//!
//! Every operation (attach, edits, timer ticks, teardown, user actions) is a
//! message on a single queue, so they run strictly in order and never
//! interleave. Deferred transitions run after the command that scheduled them
//! has replied. The sync timer only ticks while a view is attached and
//! restarts whenever the attached session changes.

use super::{FlushOutcome, LifecycleController, ViewBinding};
use crate::errors::DriverError;
use crate::store::SessionStore;
use crate::workflow::WorkflowStore;
use stagesync_common::{ContentType, FieldUpdate, Session, SessionId, Stage, WorkflowState};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Default interval between periodic syncs.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);

const COMMAND_BUFFER: usize = 64;

enum Command {
    Attach {
        stage: Stage,
        reply: oneshot::Sender<ViewBinding>,
    },
    Detach {
        reply: oneshot::Sender<FlushOutcome>,
    },
    ManualSync {
        reply: oneshot::Sender<FlushOutcome>,
    },
    MarkStageComplete {
        stage: Stage,
        reply: oneshot::Sender<FlushOutcome>,
    },
    Edit {
        update: FieldUpdate,
    },
    StartNewSession {
        content_type: Option<ContentType>,
        reply: oneshot::Sender<SessionId>,
    },
    AbandonSession {
        reply: oneshot::Sender<Option<SessionId>>,
    },
    CompletePipeline {
        reply: oneshot::Sender<Option<SessionId>>,
    },
    Snapshot {
        reply: oneshot::Sender<WorkflowState>,
    },
    ActiveSession {
        reply: oneshot::Sender<Option<Session>>,
    },
    Shutdown,
}

/// Owner of the driver task.
pub struct SyncDriver<S, W> {
    handle: DriverHandle,
    task: JoinHandle<LifecycleController<S, W>>,
}

impl<S, W> SyncDriver<S, W>
where
    S: SessionStore + Send + 'static,
    W: WorkflowStore + Send + 'static,
{
    /// Spawn the driver on the current tokio runtime.
    pub fn spawn(controller: LifecycleController<S, W>, interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            warn!("Sync interval of zero requested; using default");
            DEFAULT_SYNC_INTERVAL
        } else {
            interval
        };
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let task = tokio::spawn(run_loop(controller, rx, interval));
        Self {
            handle: DriverHandle { tx },
            task,
        }
    }

    pub fn handle(&self) -> DriverHandle {
        self.handle.clone()
    }

    /// Stop the driver, running a final teardown if a view is still attached.
    pub async fn shutdown(self) -> Result<LifecycleController<S, W>, DriverError> {
        // Already stopped if a handle sent its own shutdown
        let _ = self.handle.shutdown().await;
        self.join().await
    }

    /// Wait for the driver task to stop and take the controller back.
    pub async fn join(self) -> Result<LifecycleController<S, W>, DriverError> {
        Ok(self.task.await?)
    }
}

async fn run_loop<S, W>(
    mut controller: LifecycleController<S, W>,
    mut rx: mpsc::Receiver<Command>,
    period: Duration,
) -> LifecycleController<S, W>
where
    S: SessionStore,
    W: WorkflowStore,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;
    let mut timer_owner: Option<SessionId> = None;

    loop {
        tokio::select! {
            _ = ticker.tick(), if timer_owner.is_some() => {
                controller.tick();
            }
            command = rx.recv() => {
                match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => handle_command(&mut controller, command),
                }
            }
        }

        controller.run_deferred();

        let attached = controller.attached_id();
        if attached != timer_owner {
            if attached.is_some() {
                ticker.reset();
            }
            debug!(from = ?timer_owner, to = ?attached, "Sync timer owner changed");
            timer_owner = attached;
        }
    }

    if controller.attached_id().is_some() {
        controller.detach();
    }
    controller
}

fn handle_command<S, W>(controller: &mut LifecycleController<S, W>, command: Command)
where
    S: SessionStore,
    W: WorkflowStore,
{
    match command {
        Command::Attach { stage, reply } => {
            let _ = reply.send(controller.attach(stage));
        }
        Command::Detach { reply } => {
            let _ = reply.send(controller.detach());
        }
        Command::ManualSync { reply } => {
            let _ = reply.send(controller.manual_sync());
        }
        Command::MarkStageComplete { stage, reply } => {
            let _ = reply.send(controller.mark_stage_complete(stage));
        }
        Command::Edit { update } => controller.edit(update),
        Command::StartNewSession {
            content_type,
            reply,
        } => {
            let _ = reply.send(controller.start_new_session(content_type));
        }
        Command::AbandonSession { reply } => {
            let _ = reply.send(controller.abandon_session());
        }
        Command::CompletePipeline { reply } => {
            let _ = reply.send(controller.complete_pipeline());
        }
        Command::Snapshot { reply } => {
            let _ = reply.send(controller.engine().workflow().snapshot());
        }
        Command::ActiveSession { reply } => {
            let _ = reply.send(controller.engine().sessions().active().cloned());
        }
        Command::Shutdown => {}
    }
}

/// Cloneable sender side of a [`SyncDriver`].
#[derive(Clone)]
pub struct DriverHandle {
    tx: mpsc::Sender<Command>,
}

impl DriverHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, DriverError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| DriverError::Closed)?;
        rx.await.map_err(|_| DriverError::Closed)
    }

    /// Activate a view declaring `stage`.
    pub async fn attach(&self, stage: Stage) -> Result<ViewHandle, DriverError> {
        let binding = self
            .request(|reply| Command::Attach { stage, reply })
            .await?;
        Ok(ViewHandle {
            stage: binding.stage,
            active_session: binding.active_session,
            driver: self.clone(),
        })
    }

    pub async fn detach(&self) -> Result<FlushOutcome, DriverError> {
        self.request(|reply| Command::Detach { reply }).await
    }

    pub async fn manual_sync(&self) -> Result<FlushOutcome, DriverError> {
        self.request(|reply| Command::ManualSync { reply }).await
    }

    pub async fn mark_stage_complete(&self, stage: Stage) -> Result<FlushOutcome, DriverError> {
        self.request(|reply| Command::MarkStageComplete { stage, reply })
            .await
    }

    /// Queue a workflow field edit.
    pub async fn edit(&self, update: FieldUpdate) -> Result<(), DriverError> {
        self.tx
            .send(Command::Edit { update })
            .await
            .map_err(|_| DriverError::Closed)
    }

    pub async fn start_new_session(
        &self,
        content_type: Option<ContentType>,
    ) -> Result<SessionId, DriverError> {
        self.request(|reply| Command::StartNewSession {
            content_type,
            reply,
        })
        .await
    }

    pub async fn abandon_session(&self) -> Result<Option<SessionId>, DriverError> {
        self.request(|reply| Command::AbandonSession { reply })
            .await
    }

    pub async fn complete_pipeline(&self) -> Result<Option<SessionId>, DriverError> {
        self.request(|reply| Command::CompletePipeline { reply })
            .await
    }

    pub async fn snapshot(&self) -> Result<WorkflowState, DriverError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn active_session(&self) -> Result<Option<Session>, DriverError> {
        self.request(|reply| Command::ActiveSession { reply })
            .await
    }

    /// Ask the driver to stop once the commands queued so far have run.
    pub async fn shutdown(&self) -> Result<(), DriverError> {
        self.tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| DriverError::Closed)
    }
}

/// Returned to an attaching view.
#[derive(Clone)]
pub struct ViewHandle {
    pub stage: Stage,
    /// The active session as seen at attach time
    pub active_session: Option<Session>,
    driver: DriverHandle,
}

impl ViewHandle {
    /// Flush and persist immediately.
    pub async fn manual_sync(&self) -> Result<FlushOutcome, DriverError> {
        self.driver.manual_sync().await
    }

    pub async fn mark_stage_complete(&self, stage: Stage) -> Result<FlushOutcome, DriverError> {
        self.driver.mark_stage_complete(stage).await
    }

    /// Tear the view down.
    pub async fn detach(self) -> Result<FlushOutcome, DriverError> {
        self.driver.detach().await
    }
}
