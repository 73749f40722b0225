//! Toggle usage reporting.
//!
//! Usage reports are handed to a background thread, so reporting never delays the caller.
//! Reports that cannot be queued or delivered are logged and dropped; they're never retried.
use std::{
    sync::{
        mpsc::{Receiver, SyncSender, TrySendError},
        Arc,
    },
    thread::JoinHandle,
};

use serde::{de::IgnoredAny, Serialize};

use crate::{
    horizon::{Horizon, TELEMETRY_ENDPOINT},
    targeting::enrich,
    Error, Evaluation, EvaluationContext, Result,
};

/// Body of a usage report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryPayload {
    /// Context the toggle was evaluated for.
    pub context: EvaluationContext,
    /// Reported data.
    pub data: TelemetryData,
}

/// Usage data of a [`TelemetryPayload`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryData {
    /// The evaluated toggle.
    pub toggle: Evaluation,
}

/// Reports toggle usage to the toggle service from a background thread.
pub(crate) struct TelemetryReporter {
    application: String,
    environment: String,
    sender: SyncSender<TelemetryPayload>,
    join_handle: JoinHandle<()>,
}

impl TelemetryReporter {
    /// Start the telemetry thread. At most `queue_capacity` reports wait for delivery; any reports
    /// above that are dropped. A zero capacity is raised to 1.
    pub fn start(
        horizon: Arc<Horizon>,
        application: String,
        environment: String,
        queue_capacity: usize,
    ) -> Result<TelemetryReporter> {
        // `sync_channel` makes the sender `Sync`, so `report()` can be called concurrently
        // through a shared reference.
        // A zero-capacity channel only hands over reports while the thread is idle in `recv`.
        let (sender, receiver) = std::sync::mpsc::sync_channel(queue_capacity.max(1));

        let join_handle = std::thread::Builder::new()
            .name("hyphen-telemetry".to_owned())
            .spawn(move || deliver_reports(&horizon, receiver))?;

        Ok(TelemetryReporter {
            application,
            environment,
            sender,
            join_handle,
        })
    }

    /// Queue a usage report for `evaluation`.
    ///
    /// The context is enriched again instead of reusing the one the evaluation was made with.
    /// This never blocks and never fails; problems are logged.
    pub fn report(&self, context: &EvaluationContext, evaluation: &Evaluation) {
        let payload = TelemetryPayload {
            context: enrich(context, &self.application, &self.environment),
            data: TelemetryData {
                toggle: evaluation.clone(),
            },
        };

        match self.sender.try_send(payload) {
            Ok(()) => {}
            Err(TrySendError::Full(payload)) => {
                log::warn!(target: "hyphen",
                    flag_key = payload.data.toggle.key.as_str();
                    "telemetry queue is full, dropping usage report");
            }
            Err(TrySendError::Disconnected(payload)) => {
                log::warn!(target: "hyphen",
                    flag_key = payload.data.toggle.key.as_str();
                    "telemetry thread is not running, dropping usage report");
            }
        }
    }

    /// Stop accepting reports and block until queued reports are delivered.
    pub fn shutdown(self) -> Result<()> {
        let TelemetryReporter {
            sender,
            join_handle,
            ..
        } = self;

        // Closing the channel makes the thread exit once the queue is drained.
        drop(sender);

        join_handle
            .join()
            .map_err(|_| Error::TelemetryThreadPanicked)
    }
}

fn deliver_reports(horizon: &Horizon, receiver: Receiver<TelemetryPayload>) {
    for payload in receiver {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            send_report(horizon, &payload)
        }));
        if result.is_err() {
            log::error!(target: "hyphen",
                flag_key = payload.data.toggle.key.as_str();
                "panic while sending usage report");
        }
    }

    log::debug!(target: "hyphen", "telemetry thread exiting");
}

fn send_report(horizon: &Horizon, payload: &TelemetryPayload) {
    // Response body is not used. Decode into `IgnoredAny` so any JSON (or empty) body is
    // accepted.
    match horizon.post::<_, IgnoredAny>(TELEMETRY_ENDPOINT, payload) {
        Ok(_) => {
            log::trace!(target: "hyphen", payload:serde; "reported toggle usage");
        }
        Err(err) => {
            log::warn!(target: "hyphen",
                flag_key = payload.data.toggle.key.as_str();
                "unable to log toggle usage: {err}");
        }
    }
}
