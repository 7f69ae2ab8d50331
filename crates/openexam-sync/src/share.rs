//! Share roster for one file.
//!
//! Tracks the users a file is shared with, applies share and unshare
//! optimistically and recovers according to the configured policy.

use std::sync::Arc;
use std::time::Duration;

use openexam_core::constants::FILES_CHANGED_CHANNEL;
use openexam_core::models::{FileRecord, Share};
use openexam_core::validation::validate_share_target;
use openexam_core::{ClientConfig, ClientError, ClientResult, FileSharing, RecoveryPolicy};

use crate::bus::EventBus;
use crate::store::{log_failure, FileStore};

pub struct ShareRoster {
    backend: Arc<dyn FileSharing>,
    file: FileRecord,
    current_user_id: String,
    users: Vec<Share>,
    policy: RecoveryPolicy,
    request_timeout: Duration,
    bus: Option<EventBus>,
    notices: Option<Arc<FileStore>>,
}

impl std::fmt::Debug for ShareRoster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareRoster")
            .field("file_id", &self.file.id)
            .field("users", &self.users)
            .field("policy", &self.policy)
            .finish()
    }
}

impl ShareRoster {
    /// Load the roster for `file_id`.
    ///
    /// Shares the backend returns without a name belong to users that do not
    /// exist; they are dropped from the roster.
    #[tracing::instrument(skip(backend, config))]
    pub async fn load(
        backend: Arc<dyn FileSharing>,
        file_id: &str,
        current_user_id: &str,
        config: &ClientConfig,
    ) -> ClientResult<Self> {
        let details = with_timeout(
            config.request_timeout,
            "load file",
            backend.get_file(file_id),
        )
        .await?;

        let mut roster = Self {
            backend,
            file: details.file,
            current_user_id: current_user_id.to_string(),
            users: details.shares,
            policy: config.share_recovery,
            request_timeout: config.request_timeout,
            bus: None,
            notices: None,
        };
        let pruned = roster.prune_unknown();
        if !pruned.is_empty() {
            tracing::warn!(file_id, users = ?pruned, "Dropped shares for unknown users");
        }
        Ok(roster)
    }

    /// Publish `filesChanged` after every successful share change.
    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Surface failures as notices on `store`.
    pub fn with_notices(mut self, store: Arc<FileStore>) -> Self {
        self.notices = Some(store);
        self
    }

    pub fn file(&self) -> &FileRecord {
        &self.file
    }

    pub fn users(&self) -> &[Share] {
        &self.users
    }

    pub fn is_owner(&self) -> bool {
        self.file.owner_id == self.current_user_id
    }

    fn shared_ids(&self) -> Vec<String> {
        self.users.iter().map(|u| u.user_id.clone()).collect()
    }

    fn prune_unknown(&mut self) -> Vec<String> {
        let mut pruned = Vec::new();
        self.users.retain(|u| {
            if u.name.is_some() {
                true
            } else {
                pruned.push(u.user_id.clone());
                false
            }
        });
        pruned
    }

    /// Share the file with `input` (a numeric user id typed by the user).
    #[tracing::instrument(skip(self), fields(file_id = %self.file.id))]
    pub async fn share(&mut self, input: &str) -> ClientResult<()> {
        if !self.is_owner() {
            return Err(self.report(
                "share file",
                ClientError::validation("Only the owner can share this file"),
            ));
        }
        let target = validate_share_target(input, &self.current_user_id, &self.shared_ids())
            .map_err(|err| self.report("share file", err))?
            .to_string();

        self.users.push(Share {
            user_id: target.clone(),
            name: None,
        });

        let result = with_timeout(
            self.request_timeout,
            "share file",
            self.backend.share_file(&self.file.id, &target),
        )
        .await
        .map_err(|err| user_error(err, &target));

        if let Err(err) = result {
            if self.policy == RecoveryPolicy::Rollback {
                self.users.retain(|u| u.user_id != target);
            }
            return Err(self.report("share file", err));
        }

        tracing::info!(user_id = %target, "File shared");
        self.confirm_shared(&target)
            .await
            .map_err(|err| self.report("share file", err))?;
        self.announce().await;
        Ok(())
    }

    /// Reload from the server so the new share gets its display name.
    ///
    /// The backend accepts shares for ids that have no account; those come
    /// back without a name and are reported as not found.
    async fn confirm_shared(&mut self, target: &str) -> ClientResult<()> {
        let details = match with_timeout(
            self.request_timeout,
            "load file",
            self.backend.get_file(&self.file.id),
        )
        .await
        {
            Ok(details) => details,
            Err(err) => {
                tracing::debug!(error = %err, "Could not reload roster after share");
                return Ok(());
            }
        };

        self.file = details.file;
        self.users = details.shares;
        let pruned = self.prune_unknown();
        if pruned.iter().any(|id| id == target) {
            return Err(ClientError::NotFound(format!(
                "User ID {} does not exist",
                target
            )));
        }
        Ok(())
    }

    /// Revoke `user_id`'s access.
    #[tracing::instrument(skip(self), fields(file_id = %self.file.id))]
    pub async fn unshare(&mut self, user_id: &str) -> ClientResult<()> {
        let Some(position) = self.users.iter().position(|u| u.user_id == user_id) else {
            return Err(self.report(
                "unshare file",
                ClientError::validation(format!(
                    "This file is not shared with user {}",
                    user_id
                )),
            ));
        };
        let removed = self.users.remove(position);

        let result = with_timeout(
            self.request_timeout,
            "unshare file",
            self.backend.unshare_file(&self.file.id, user_id),
        )
        .await;

        if let Err(err) = result {
            if self.policy == RecoveryPolicy::Rollback {
                let at = position.min(self.users.len());
                self.users.insert(at, removed);
            }
            return Err(self.report("unshare file", err));
        }

        tracing::info!(user_id, "File unshared");
        self.announce().await;
        Ok(())
    }

    fn report(&self, operation: &'static str, err: ClientError) -> ClientError {
        match &self.notices {
            Some(store) => store.report_failure(operation, err),
            None => {
                log_failure(operation, &err);
                err
            }
        }
    }

    async fn announce(&self) {
        if let Some(bus) = &self.bus {
            bus.publish(FILES_CHANGED_CHANNEL, None).await;
        }
    }
}

async fn with_timeout<T>(
    after: Duration,
    operation: &'static str,
    call: impl std::future::Future<Output = ClientResult<T>>,
) -> ClientResult<T> {
    tokio::time::timeout(after, call)
        .await
        .unwrap_or_else(|_| Err(ClientError::timed_out(operation, after)))
}

/// Server messages about missing accounts become `NotFound`.
fn user_error(err: ClientError, target: &str) -> ClientError {
    let missing_user = match &err {
        ClientError::ServerRejected { message, .. } | ClientError::NotFound(message) => {
            let message = message.to_lowercase();
            message.contains("not found") || message.contains("does not exist")
        }
        _ => false,
    };
    if missing_user {
        ClientError::NotFound(format!("User ID {} does not exist", target))
    } else {
        err
    }
}
