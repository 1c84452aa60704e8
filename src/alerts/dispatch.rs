use crate::alerts::notify::{format_body, Notifier};
use crate::alerts::Alert;
use crate::Errors;
use anyhow::Result;
use crossbeam::channel::{Receiver, Sender, TrySendError};
use log::{debug, warn};
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{spawn, JoinHandle};

/// Default number of notifications waiting for delivery
pub const DEFAULT_NOTIFICATION_QUEUE: usize = 1024;

type DispatchSenderChannel = Sender<DispatchCommands>;
type DispatchReceiverChannel = Receiver<DispatchCommands>;

enum DispatchCommands {
    Notify { subject: String, body: String },
    Flush(Sender<()>),
    Exit,
}

/// Delivery counters
///
#[derive(Debug, Default)]
pub struct DispatchStats {
    delivered: AtomicUsize,
    failed: AtomicUsize,
    dropped: AtomicUsize,
}

impl DispatchStats {
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Notifications rejected because the queue was full
    ///
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }
}

/// Delivers notifications on a background thread, so a slow or failing transport never blocks
/// the frame loop. Notifications that don't fit into the queue are dropped.
///
pub struct NotificationDispatcher {
    worker: Option<(DispatchSenderChannel, JoinHandle<()>)>,
    stats: Arc<DispatchStats>,
}

impl Drop for NotificationDispatcher {
    fn drop(&mut self) {
        if let Some((tx, t)) = mem::take(&mut self.worker) {
            if tx.send(DispatchCommands::Exit).is_err() {
                warn!("Notification thread exited before shutdown");
            }
            drop(tx);
            if t.join().is_err() {
                warn!("Notification thread panicked");
            }
        }
    }
}

fn notification_thread<N: Notifier>(
    mut notifier: N,
    rx: DispatchReceiverChannel,
    stats: Arc<DispatchStats>,
) {
    while let Ok(command) = rx.recv() {
        match command {
            DispatchCommands::Notify { subject, body } => match notifier.send(&subject, &body) {
                Ok(()) => {
                    stats.delivered.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => {
                    stats.failed.fetch_add(1, Ordering::SeqCst);
                    warn!("Unable to deliver notification `{}`. Error is: {:?}", subject, e);
                }
            },
            DispatchCommands::Flush(ack) => {
                let _ = ack.send(());
            }
            DispatchCommands::Exit => break,
        }
    }
    debug!("Notification thread is stopped");
}

impl NotificationDispatcher {
    /// Starts the delivery thread
    ///
    /// # Parameters
    /// * `notifier` - transport used to deliver notifications
    /// * `queue` - the maximum number of notifications waiting for delivery
    ///
    pub fn new<N: Notifier>(notifier: N, queue: usize) -> Self {
        assert!(queue > 0, "Queue length must be a positive number");
        let (tx, rx) = crossbeam::channel::bounded(queue);
        let stats = Arc::new(DispatchStats::default());
        let thread_stats = stats.clone();
        let handle = spawn(move || notification_thread(notifier, rx, thread_stats));
        Self {
            worker: Some((tx, handle)),
            stats,
        }
    }

    /// Enqueues a notification without waiting for the delivery
    ///
    pub fn send(&self, subject: &str, body: &str) -> Result<()> {
        let (tx, _) = self.worker.as_ref().ok_or(Errors::DispatcherClosed)?;
        match tx.try_send(DispatchCommands::Notify {
            subject: subject.to_string(),
            body: body.to_string(),
        }) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::SeqCst);
                Err(Errors::NotifierUnavailable("notification queue is full".into()).into())
            }
            Err(TrySendError::Disconnected(_)) => Err(Errors::DispatcherClosed.into()),
        }
    }

    /// Enqueues the notification for the alert
    ///
    pub fn notify(&self, alert: &Alert) -> Result<()> {
        self.send(alert.alert_type().subject(), &format_body(alert))
    }

    /// Blocks until every notification enqueued before the call is processed
    ///
    pub fn flush(&self) -> Result<()> {
        let (tx, _) = self.worker.as_ref().ok_or(Errors::DispatcherClosed)?;
        let (ack_tx, ack_rx) = crossbeam::channel::bounded(1);
        tx.send(DispatchCommands::Flush(ack_tx))
            .map_err(|_| Errors::DispatcherClosed)?;
        ack_rx.recv().map_err(|_| Errors::DispatcherClosed)?;
        Ok(())
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }
}
