use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::watch;
use uuid::Uuid;

use crate::auth::IdentityProvider;
use crate::constants::*;
use crate::error::Result;
use crate::manager::{ManagerState, TableManager, to_row};
use crate::models::{BacklogItem, BacklogStatus, BacklogUpdate, NewBacklogItem};
use crate::remote::RemoteTable;
use crate::utils::{
    normalize_optional, validate_backlog_priority, validate_estimated_effort,
    validate_string_length,
};

pub fn validate_backlog_title(title: &str) -> Result<()> {
    validate_string_length(title, "Title", MAX_TITLE_LENGTH)
}

#[derive(Serialize)]
struct BacklogChanges<'a> {
    #[serde(flatten)]
    fields: &'a BacklogUpdate,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
}

pub struct BacklogManager {
    identity: Arc<dyn IdentityProvider>,
    backlogs: TableManager<BacklogItem>,
}

impl BacklogManager {
    pub fn new(remote: Arc<dyn RemoteTable>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            identity,
            backlogs: TableManager::new(remote),
        }
    }

    pub fn backlogs(&self) -> Vec<BacklogItem> {
        self.backlogs.records()
    }

    pub fn state(&self) -> ManagerState<BacklogItem> {
        self.backlogs.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<ManagerState<BacklogItem>> {
        self.backlogs.subscribe()
    }

    pub async fn fetch_backlogs(&self) {
        self.backlogs.fetch_all().await;
    }

    /// New items always start out `pending`.
    pub async fn add_backlog(&self, new: NewBacklogItem) -> Result<BacklogItem> {
        validate_backlog_title(&new.title)?;
        validate_backlog_priority(new.priority)?;
        validate_estimated_effort(new.estimated_effort)?;
        let user_id = self.identity.current_user_id()?;

        let now = OffsetDateTime::now_utc();
        let item = BacklogItem {
            id: Uuid::new_v4(),
            user_id,
            title: new.title.trim().to_string(),
            description: normalize_optional(new.description),
            priority: new.priority,
            estimated_effort: new.estimated_effort,
            status: BacklogStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        self.backlogs.insert(to_row(&item)?).await?;
        Ok(item)
    }

    pub async fn update_backlog(&self, item: &BacklogItem, update: BacklogUpdate) -> Result<()> {
        validate_backlog_title(&update.title)?;
        validate_backlog_priority(update.priority)?;
        validate_estimated_effort(update.estimated_effort)?;
        self.identity.current_user_id()?;

        let fields = BacklogUpdate {
            title: update.title.trim().to_string(),
            description: normalize_optional(update.description),
            ..update
        };
        let changes = BacklogChanges {
            fields: &fields,
            updated_at: OffsetDateTime::now_utc(),
        };
        self.backlogs.update(item.id, to_row(&changes)?).await
    }

    pub async fn delete_backlog(&self, item: &BacklogItem) -> Result<()> {
        self.identity.current_user_id()?;
        self.backlogs.delete(item.id).await
    }

    pub fn backlogs_with_status(&self, status: BacklogStatus) -> Vec<BacklogItem> {
        self.backlogs.with_records(|items| {
            items
                .iter()
                .filter(|item| item.status == status)
                .cloned()
                .collect()
        })
    }
}
