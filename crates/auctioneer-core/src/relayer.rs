//! Relayer dispatch with ordered fallback (C7): fan through a configured list of
//! relayers, strictly in order, until one accepts the send.
use async_trait::async_trait;
use serde_json::Value;
use tracing::{
    info,
    warn,
};

use crate::types::{
    DomainId,
    TaskId,
};

#[derive(Debug, thiserror::Error)]
pub enum RelayerError {
    #[error("relayer rejected the send")]
    Rejected(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// A single relayer backend. Exposes a uniform `send -> taskId` operation; the core
/// calls nothing else on it synchronously.
#[async_trait]
pub trait Relayer: Send + Sync {
    async fn send(
        &self,
        chain_id: &str,
        domain: &DomainId,
        dest_address: &str,
        data: &Value,
    ) -> Result<TaskId, RelayerError>;
}

/// One entry in the ordered relayer list: the client instance, its API key, and a
/// type label used for logging and for the attempted-list in [`RelayerSendFailed`].
pub struct RelayerConfig {
    pub instance: std::sync::Arc<dyn Relayer>,
    pub api_key: String,
    pub relayer_type: String,
}

/// Raised when every configured relayer rejected the same send. The executor swallows
/// this and leaves the transfer `Queued` for the next tick.
#[derive(Debug, thiserror::Error)]
#[error("all configured relayers rejected the send; attempted: {}", attempted.join(", "))]
pub struct RelayerSendFailed {
    pub attempted: Vec<String>,
}

/// Fans a send through `relayers` strictly in order, returning the first accepted task
/// id. Never parallelizes: a cheaper primary relayer should always be tried before a
/// backup, and racing them wastes the backup call whenever the primary succeeds.
pub async fn dispatch_with_backup(
    relayers: &[RelayerConfig],
    chain_id: &str,
    domain: &DomainId,
    dest_address: &str,
    data: &Value,
) -> Result<TaskId, RelayerSendFailed> {
    let mut attempted = Vec::with_capacity(relayers.len());
    for relayer in relayers {
        attempted.push(relayer.relayer_type.clone());
        match relayer
            .instance
            .send(chain_id, domain, dest_address, data)
            .await
        {
            Ok(task_id) => {
                info!(relayer_type = %relayer.relayer_type, %task_id, "relayer accepted send");
                return Ok(task_id);
            }
            Err(error) => {
                warn!(
                    relayer_type = %relayer.relayer_type,
                    error = &error as &dyn std::error::Error,
                    "relayer rejected send; trying next"
                );
            }
        }
    }
    Err(RelayerSendFailed {
        attempted,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{
            AtomicUsize,
            Ordering,
        },
        Arc,
    };

    use super::*;

    struct ScriptedRelayer {
        calls: Arc<AtomicUsize>,
        outcome: Result<&'static str, &'static str>,
    }

    #[async_trait]
    impl Relayer for ScriptedRelayer {
        async fn send(
            &self,
            _chain_id: &str,
            _domain: &DomainId,
            _dest_address: &str,
            _data: &Value,
        ) -> Result<TaskId, RelayerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outcome {
                Ok(task_id) => Ok(TaskId::new(task_id)),
                Err(reason) => Err(RelayerError::Rejected(reason.into())),
            }
        }
    }

    fn config(name: &str, calls: Arc<AtomicUsize>, outcome: Result<&'static str, &'static str>) -> RelayerConfig {
        RelayerConfig {
            instance: Arc::new(ScriptedRelayer { calls, outcome }),
            api_key: "unused".to_owned(),
            relayer_type: name.to_owned(),
        }
    }

    #[tokio::test]
    async fn primary_success_never_calls_backup() {
        let primary_calls = Arc::new(AtomicUsize::new(0));
        let backup_calls = Arc::new(AtomicUsize::new(0));
        let relayers = vec![
            config("primary", primary_calls.clone(), Ok("task-1")),
            config("backup", backup_calls.clone(), Ok("task-2")),
        ];

        let task_id = dispatch_with_backup(&relayers, "eth", &"osmo".into(), "osmo1...", &Value::Null)
            .await
            .unwrap();

        assert_eq!(task_id, TaskId::new("task-1"));
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(backup_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn primary_failure_falls_through_to_backup() {
        let relayers = vec![
            config("primary", Arc::new(AtomicUsize::new(0)), Err("rejected")),
            config("backup", Arc::new(AtomicUsize::new(0)), Ok("task-2")),
        ];

        let task_id = dispatch_with_backup(&relayers, "eth", &"osmo".into(), "osmo1...", &Value::Null)
            .await
            .unwrap();

        assert_eq!(task_id, TaskId::new("task-2"));
    }

    #[tokio::test]
    async fn all_relayers_failing_reports_every_attempt() {
        let relayers = vec![
            config("primary", Arc::new(AtomicUsize::new(0)), Err("rejected")),
            config("backup", Arc::new(AtomicUsize::new(0)), Err("rejected")),
        ];

        let error = dispatch_with_backup(&relayers, "eth", &"osmo".into(), "osmo1...", &Value::Null)
            .await
            .unwrap_err();

        assert_eq!(error.attempted, vec!["primary".to_owned(), "backup".to_owned()]);
    }
}
