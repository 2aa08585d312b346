// Dashboard scheduler - one task owns the pipeline and runs commands in order
use crate::application::pipeline::{Completion, DashboardSnapshot, FetchTicket, PipelineStatus, TrendDashboard};
use crate::domain::chart::Tooltip;
use crate::domain::trends::{Metric, RangeToken, TrendWindow};
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

enum Command {
    ChangeRange(RangeToken),
    ResetAllZoom,
    Zoom {
        metric: Metric,
        factor: f64,
        center_ms: i64,
        reply: oneshot::Sender<anyhow::Result<()>>,
    },
    Pan {
        metric: Metric,
        delta_ms: i64,
        reply: oneshot::Sender<anyhow::Result<()>>,
    },
    Tooltip {
        metric: Metric,
        x_ms: f64,
        reply: oneshot::Sender<Option<Tooltip>>,
    },
    Snapshot(oneshot::Sender<DashboardSnapshot>),
}

/// Cloneable front door to the scheduler task.
#[derive(Clone)]
pub struct DashboardHandle {
    tx: mpsc::Sender<Command>,
    status: watch::Receiver<PipelineStatus>,
}

impl DashboardHandle {
    async fn send(&self, command: Command) -> anyhow::Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| anyhow::anyhow!("Dashboard scheduler has stopped"))
    }

    pub async fn change_range(&self, token: RangeToken) -> anyhow::Result<()> {
        self.send(Command::ChangeRange(token)).await
    }

    pub async fn reset_all_zoom(&self) -> anyhow::Result<()> {
        self.send(Command::ResetAllZoom).await
    }

    pub async fn zoom(&self, metric: Metric, factor: f64, center_ms: i64) -> anyhow::Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Zoom {
            metric,
            factor,
            center_ms,
            reply,
        })
        .await?;
        rx.await.context("Dashboard scheduler dropped the reply")?
    }

    pub async fn pan(&self, metric: Metric, delta_ms: i64) -> anyhow::Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Pan { metric, delta_ms, reply }).await?;
        rx.await.context("Dashboard scheduler dropped the reply")?
    }

    pub async fn tooltip(&self, metric: Metric, x_ms: f64) -> anyhow::Result<Option<Tooltip>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Tooltip { metric, x_ms, reply }).await?;
        rx.await.context("Dashboard scheduler dropped the reply")
    }

    pub async fn snapshot(&self) -> anyhow::Result<DashboardSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot(reply)).await?;
        rx.await.context("Dashboard scheduler dropped the reply")
    }

    pub fn status(&self) -> PipelineStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineStatus> {
        self.status.clone()
    }
}

/// Start the scheduler task and kick off the initial load.
///
/// All pipeline state lives on this one task; fetches run on their own
/// tasks and come back as completions tagged with their generation. The
/// task ends, releasing every chart, once all handles are dropped.
pub fn spawn(mut dashboard: TrendDashboard, clock: Clock) -> (DashboardHandle, JoinHandle<()>) {
    let (tx, mut commands) = mpsc::channel::<Command>(64);
    let (done_tx, mut completions) = mpsc::unbounded_channel::<(FetchTicket, TrendWindow)>();

    let first = dashboard.start(clock());
    let (status_tx, status_rx) = watch::channel(dashboard.status());
    dispatch_fetch(&dashboard, first, done_tx.clone());

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    handle_command(&mut dashboard, command, &clock, &done_tx);
                }
                Some((ticket, window)) = completions.recv() => {
                    if let Completion::Rendered { charts } = dashboard.complete(&ticket, window) {
                        tracing::info!(range = %ticket.token, generation = ticket.generation, charts, "Rendered trend charts");
                    }
                }
            }
            status_tx.send_replace(dashboard.status());
        }

        dashboard.shutdown();
        tracing::debug!("Dashboard scheduler stopped");
    });

    (
        DashboardHandle {
            tx,
            status: status_rx,
        },
        task,
    )
}

fn handle_command(
    dashboard: &mut TrendDashboard,
    command: Command,
    clock: &Clock,
    done_tx: &mpsc::UnboundedSender<(FetchTicket, TrendWindow)>,
) {
    match command {
        Command::ChangeRange(token) => {
            if let Some(ticket) = dashboard.change_range(token, clock()) {
                dispatch_fetch(dashboard, ticket, done_tx.clone());
            }
        }
        Command::ResetAllZoom => {
            let charts = dashboard.reset_all_zoom();
            tracing::debug!(charts, "Reset zoom on all charts");
        }
        Command::Zoom {
            metric,
            factor,
            center_ms,
            reply,
        } => {
            let _ = reply.send(dashboard.zoom(metric, factor, center_ms));
        }
        Command::Pan { metric, delta_ms, reply } => {
            let _ = reply.send(dashboard.pan(metric, delta_ms));
        }
        Command::Tooltip { metric, x_ms, reply } => {
            let _ = reply.send(dashboard.tooltip(metric, x_ms));
        }
        Command::Snapshot(reply) => {
            let _ = reply.send(dashboard.snapshot());
        }
    }
}

/// Fetches are never cancelled; a superseded result is dropped on arrival.
fn dispatch_fetch(
    dashboard: &TrendDashboard,
    ticket: FetchTicket,
    done_tx: mpsc::UnboundedSender<(FetchTicket, TrendWindow)>,
) {
    let service = dashboard.service().clone();
    tracing::debug!(
        range = %ticket.token,
        generation = ticket.generation,
        from = %ticket.window.from_iso(),
        to = %ticket.window.to_iso(),
        "Dispatching trend fetch"
    );

    tokio::spawn(async move {
        let window = service.fetch_window(&ticket.window).await;
        // The scheduler may already be gone; nothing to render then.
        let _ = done_tx.send((ticket, window));
    });
}
