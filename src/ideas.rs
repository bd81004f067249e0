use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::watch;
use uuid::Uuid;

use crate::auth::IdentityProvider;
use crate::constants::*;
use crate::error::Result;
use crate::manager::{ManagerState, TableManager, to_row};
use crate::models::{Idea, IdeaPriority, IdeaStatus, IdeaUpdate, NewIdea, parse_tags};
use crate::remote::RemoteTable;
use crate::utils::{normalize_optional, validate_string_length};

pub fn validate_idea_title(title: &str) -> Result<()> {
    validate_string_length(title, "Title", MAX_TITLE_LENGTH)
}

#[derive(Serialize)]
struct IdeaChanges {
    title: String,
    description: Option<String>,
    category: Option<String>,
    priority: IdeaPriority,
    tags: Vec<String>,
    notes: Option<String>,
    status: IdeaStatus,
}

pub struct IdeasManager {
    identity: Arc<dyn IdentityProvider>,
    ideas: TableManager<Idea>,
}

impl IdeasManager {
    pub fn new(remote: Arc<dyn RemoteTable>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            identity,
            ideas: TableManager::new(remote),
        }
    }

    pub fn ideas(&self) -> Vec<Idea> {
        self.ideas.records()
    }

    pub fn state(&self) -> ManagerState<Idea> {
        self.ideas.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<ManagerState<Idea>> {
        self.ideas.subscribe()
    }

    pub async fn fetch_ideas(&self) {
        self.ideas.fetch_all().await;
    }

    /// New ideas always start out in the `Idea` status.
    pub async fn add_idea(&self, new: NewIdea) -> Result<Idea> {
        validate_idea_title(&new.title)?;
        let user_id = self.identity.current_user_id()?;

        let idea = Idea {
            id: Uuid::new_v4(),
            user_id,
            title: new.title.trim().to_string(),
            description: normalize_optional(new.description),
            category: normalize_optional(new.category),
            priority: new.priority,
            tags: parse_tags(&new.tags),
            notes: normalize_optional(new.notes),
            status: IdeaStatus::Idea,
            created_at: OffsetDateTime::now_utc(),
        };

        self.ideas.insert(to_row(&idea)?).await?;
        Ok(idea)
    }

    pub async fn update_idea(&self, idea: &Idea, update: IdeaUpdate) -> Result<()> {
        validate_idea_title(&update.title)?;
        self.identity.current_user_id()?;

        let changes = IdeaChanges {
            title: update.title.trim().to_string(),
            description: normalize_optional(update.description),
            category: normalize_optional(update.category),
            priority: update.priority,
            tags: parse_tags(&update.tags),
            notes: normalize_optional(update.notes),
            status: update.status,
        };
        self.ideas.update(idea.id, to_row(&changes)?).await
    }

    pub async fn delete_idea(&self, idea: &Idea) -> Result<()> {
        self.identity.current_user_id()?;
        self.ideas.delete(idea.id).await
    }

    /// Case-insensitive match on a whole tag.
    pub fn ideas_tagged(&self, tag: &str) -> Vec<Idea> {
        let tag = tag.trim().to_lowercase();
        self.ideas.with_records(|ideas| {
            ideas
                .iter()
                .filter(|idea| idea.tags.iter().any(|t| t.to_lowercase() == tag))
                .cloned()
                .collect()
        })
    }
}
