use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::constants::*;
use crate::manager::TableRecord;

fn default_category_color() -> String {
    DEFAULT_CATEGORY_COLOR.to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Category {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    /// Absent means the category is unbounded
    #[serde(with = "rust_decimal::serde::arbitrary_precision_option", default)]
    pub budget: Option<Decimal>,
    /// Hex colour string
    #[serde(default = "default_category_color")]
    pub color: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub budget: Option<Decimal>,
    pub color: Option<String>,
}

impl NewCategory {
    pub fn new(name: impl Into<String>, budget: Option<Decimal>) -> Self {
        Self {
            name: name.into(),
            budget,
            color: None,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct CategoryUpdate {
    pub name: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision_option")]
    pub budget: Option<Decimal>,
    pub color: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Expense {
    pub id: Uuid,
    pub user_id: String,
    /// Sent as an exact JSON number
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub amount: Decimal,
    pub category_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub description: String,
    /// Free-text correlation id for tracking spend against an external object
    pub associated_object_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewExpense {
    pub amount: Decimal,
    pub category_id: Uuid,
    /// Defaults to the moment of creation
    pub date: Option<OffsetDateTime>,
    pub description: String,
    pub associated_object_id: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct ExpenseUpdate {
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub amount: Decimal,
    pub category_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub description: String,
    pub associated_object_id: Option<String>,
}

/// An expense joined with the category it references.
#[derive(Debug, Clone, PartialEq)]
pub struct CategorizedExpense {
    pub expense: Expense,
    pub category: Category,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BacklogStatus {
    Pending,
    InProgress,
    Completed,
    Blocked,
}

impl BacklogStatus {
    pub const ALL: [BacklogStatus; 4] = [
        BacklogStatus::Pending,
        BacklogStatus::InProgress,
        BacklogStatus::Completed,
        BacklogStatus::Blocked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BacklogStatus::Pending => "pending",
            BacklogStatus::InProgress => "in_progress",
            BacklogStatus::Completed => "completed",
            BacklogStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for BacklogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BacklogItem {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    /// 0 (lowest) to 5 (highest)
    pub priority: i32,
    pub estimated_effort: Option<f32>,
    pub status: BacklogStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewBacklogItem {
    pub title: String,
    pub description: Option<String>,
    pub priority: i32,
    pub estimated_effort: Option<f32>,
}

#[derive(Serialize, Debug, Clone)]
pub struct BacklogUpdate {
    pub title: String,
    pub description: Option<String>,
    pub priority: i32,
    pub estimated_effort: Option<f32>,
    pub status: BacklogStatus,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdeaPriority {
    High,
    Medium,
    Low,
}

impl IdeaPriority {
    pub const ALL: [IdeaPriority; 3] = [IdeaPriority::High, IdeaPriority::Medium, IdeaPriority::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            IdeaPriority::High => "High",
            IdeaPriority::Medium => "Medium",
            IdeaPriority::Low => "Low",
        }
    }
}

impl fmt::Display for IdeaPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdeaStatus {
    Idea,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    #[serde(rename = "On Hold")]
    OnHold,
    Cancelled,
}

impl IdeaStatus {
    pub const ALL: [IdeaStatus; 5] = [
        IdeaStatus::Idea,
        IdeaStatus::InProgress,
        IdeaStatus::Completed,
        IdeaStatus::OnHold,
        IdeaStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IdeaStatus::Idea => "Idea",
            IdeaStatus::InProgress => "In Progress",
            IdeaStatus::Completed => "Completed",
            IdeaStatus::OnHold => "On Hold",
            IdeaStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for IdeaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Idea {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    /// Free-text grouping, unrelated to expense categories
    pub category: Option<String>,
    pub priority: IdeaPriority,
    #[serde(default)]
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub status: IdeaStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewIdea {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: IdeaPriority,
    /// Comma-separated, see [`parse_tags`]
    pub tags: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IdeaUpdate {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: IdeaPriority,
    pub tags: String,
    pub notes: Option<String>,
    pub status: IdeaStatus,
}

/// Splits a comma-separated tag list, trimming each entry and dropping blanks.
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

impl TableRecord for Category {
    const TABLE: &'static str = CATEGORIES_TABLE;

    fn id(&self) -> Uuid {
        self.id
    }
}

impl TableRecord for Expense {
    const TABLE: &'static str = EXPENSES_TABLE;

    fn id(&self) -> Uuid {
        self.id
    }
}

impl TableRecord for BacklogItem {
    const TABLE: &'static str = BACKLOG_ITEMS_TABLE;

    fn id(&self) -> Uuid {
        self.id
    }
}

impl TableRecord for Idea {
    const TABLE: &'static str = IDEAS_TABLE;

    fn id(&self) -> Uuid {
        self.id
    }
}
