//! Write-through to the message log without blocking message delivery.
//!
//! The SQLite connection is owned by one blocking worker that drains a bounded
//! queue. Writes are fire-and-forget: a full or closed queue drops the write
//! with a warning, and a failed insert is only logged. Reads carry a oneshot
//! reply and are served in queue order, after every write queued before them.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use tether_shared::{IdAllocator, Message};
use tether_store::{MessageLog, StoreError};

use crate::error::{CoreError, Result};

enum HistoryCommand {
    Index {
        network: Uuid,
        channel: String,
        message: Message,
    },
    Fetch {
        network: Uuid,
        channel: String,
        reply: oneshot::Sender<std::result::Result<Vec<Message>, StoreError>>,
    },
}

/// Cheap, cloneable handle to the history worker.
#[derive(Clone, Debug)]
pub struct HistoryHandle {
    tx: mpsc::Sender<HistoryCommand>,
    enabled: bool,
}

impl std::fmt::Debug for HistoryCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Index { channel, .. } => write!(f, "Index({channel})"),
            Self::Fetch { channel, .. } => write!(f, "Fetch({channel})"),
        }
    }
}

impl HistoryHandle {
    /// Move `log` onto a blocking worker and return a handle to it.
    ///
    /// Must be called from within a tokio runtime. The worker stops once
    /// every handle has been dropped.
    pub fn spawn(
        log: MessageLog,
        ids: Arc<IdAllocator>,
        max_history: Option<usize>,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let enabled = log.is_enabled();
        let (tx, rx) = mpsc::channel(capacity.max(1));

        let task = tokio::task::spawn_blocking(move || run_worker(log, ids, max_history, rx));

        (Self { tx, enabled }, task)
    }

    /// Whether the underlying log was opened successfully.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Queue a message for the log. Never waits.
    pub fn index(&self, network: Uuid, channel: &str, message: &Message) {
        if !self.enabled {
            return;
        }

        let command = HistoryCommand::Index {
            network,
            channel: channel.to_string(),
            message: message.clone(),
        };

        if let Err(e) = self.tx.try_send(command) {
            warn!(
                %network,
                channel,
                msg_id = %message.id,
                error = %e,
                "dropping message log write"
            );
        }
    }

    /// Load the newest history for `(network, channel)`, oldest-first.
    pub async fn get_messages(&self, network: Uuid, channel: &str) -> Result<Vec<Message>> {
        if !self.enabled {
            return Ok(Vec::new());
        }

        let (reply, rx) = oneshot::channel();
        self.tx
            .send(HistoryCommand::Fetch {
                network,
                channel: channel.to_string(),
                reply,
            })
            .await
            .map_err(|_| CoreError::WorkerClosed)?;

        let messages = rx.await.map_err(|_| CoreError::WorkerClosed)??;
        Ok(messages)
    }
}

fn run_worker(
    log: MessageLog,
    ids: Arc<IdAllocator>,
    max_history: Option<usize>,
    mut rx: mpsc::Receiver<HistoryCommand>,
) {
    info!(enabled = log.is_enabled(), "history worker started");

    while let Some(command) = rx.blocking_recv() {
        match command {
            HistoryCommand::Index {
                network,
                channel,
                message,
            } => {
                if let Err(e) = log.index(network, &channel, &message) {
                    error!(
                        %network,
                        channel = %channel,
                        msg_id = %message.id,
                        error = %e,
                        "failed to write message log"
                    );
                }
            }
            HistoryCommand::Fetch {
                network,
                channel,
                reply,
            } => {
                let result = log.get_messages(network, &channel, max_history, &ids);
                if reply.send(result).is_err() {
                    debug!(channel = %channel, "history requester went away");
                }
            }
        }
    }

    info!("history worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tether_shared::MessageKind;
    use tether_store::Database;
    use tracing::Level;

    use crate::testing::CapturedLogs;

    #[tokio::test]
    async fn writes_are_visible_to_later_reads() {
        let dir = tempfile::tempdir().unwrap();
        let ids = Arc::new(IdAllocator::new());
        let log = MessageLog::enable(dir.path(), "alice");
        let (history, _task) = HistoryHandle::spawn(log, ids.clone(), Some(100), 16);
        let network = Uuid::new_v4();

        for i in 0..3 {
            let msg = Message::new(
                &ids,
                MessageKind::Message,
                Utc.timestamp_millis_opt(1_000 + i).unwrap(),
            )
            .with_text(format!("m{i}"));
            history.index(network, "#chan", &msg);
        }

        let loaded = history.get_messages(network, "#CHAN").await.unwrap();
        let texts: Vec<&str> = loaded.iter().map(|m| m.body.text.as_str()).collect();
        assert_eq!(texts, ["m0", "m1", "m2"]);
    }

    #[tokio::test]
    async fn disabled_log_reads_nothing() {
        let ids = Arc::new(IdAllocator::new());
        let (history, _task) = HistoryHandle::spawn(MessageLog::disabled(), ids.clone(), Some(10), 4);
        assert!(!history.is_enabled());

        let msg = Message::new(&ids, MessageKind::Message, Utc::now());
        history.index(Uuid::new_v4(), "#a", &msg);
        assert!(history
            .get_messages(Uuid::new_v4(), "#a")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn worker_stops_when_handles_drop() {
        let ids = Arc::new(IdAllocator::new());
        let (history, task) = HistoryHandle::spawn(MessageLog::disabled(), ids, None, 4);
        drop(history);
        task.await.unwrap();
    }

    #[test]
    fn failed_write_is_logged_and_the_worker_carries_on() {
        let ids = Arc::new(IdAllocator::new());
        let db = Database::open_in_memory().unwrap();
        db.conn()
            .execute_batch(
                "CREATE TRIGGER reject_broken BEFORE INSERT ON messages
                 WHEN NEW.channel = '#broken'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();
        let network = Uuid::new_v4();

        let (tx, rx) = mpsc::channel(8);
        for channel in ["#broken", "#ok"] {
            let message = Message::new(&ids, MessageKind::Message, Utc::now()).with_text(channel);
            tx.try_send(HistoryCommand::Index {
                network,
                channel: channel.into(),
                message,
            })
            .unwrap();
        }
        let (reply, mut fetched) = oneshot::channel();
        tx.try_send(HistoryCommand::Fetch {
            network,
            channel: "#ok".into(),
            reply,
        })
        .unwrap();
        drop(tx);

        let (logs, _guard) = CapturedLogs::install();
        run_worker(MessageLog::from_database(db), ids, Some(10), rx);

        assert_eq!(logs.at(Level::ERROR), ["failed to write message log"]);
        let loaded = fetched.try_recv().unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].body.text, "#ok");
    }
}
