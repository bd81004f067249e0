use std::sync::Arc;

use rust_decimal::Decimal;
use time::{Date, OffsetDateTime};
use tokio::sync::watch;
use uuid::Uuid;

use crate::auth::IdentityProvider;
use crate::constants::*;
use crate::error::Result;
use crate::manager::{ManagerState, TableManager, to_row};
use crate::models::{
    CategorizedExpense, Category, CategoryUpdate, Expense, ExpenseUpdate, NewCategory, NewExpense,
};
use crate::remote::RemoteTable;
use crate::utils::{
    normalize_optional, same_month, validate_budget, validate_expense_amount,
    validate_string_length,
};

pub fn validate_category_name(name: &str) -> Result<()> {
    validate_string_length(name, "Category name", MAX_CATEGORY_NAME_LENGTH)
}

pub fn validate_expense_description(description: &str) -> Result<()> {
    validate_string_length(description, "Description", MAX_DESCRIPTION_LENGTH)
}

fn validate_object_id(object_id: Option<&str>) -> Result<()> {
    match object_id {
        Some(id) => validate_string_length(id, "Object ID", MAX_OBJECT_ID_LENGTH),
        None => Ok(()),
    }
}

fn sum_amounts<'a>(expenses: impl Iterator<Item = &'a Expense>) -> Decimal {
    expenses.map(|e| e.amount).sum()
}

/// Expenses and the categories they are budgeted against.
///
/// Aggregates are recomputed from the current snapshots on every call.
pub struct ExpenseTracker {
    identity: Arc<dyn IdentityProvider>,
    categories: TableManager<Category>,
    expenses: TableManager<Expense>,
}

impl ExpenseTracker {
    pub fn new(remote: Arc<dyn RemoteTable>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            identity,
            categories: TableManager::new(remote.clone()),
            expenses: TableManager::new(remote),
        }
    }

    pub fn categories(&self) -> Vec<Category> {
        self.categories.records()
    }

    pub fn expenses(&self) -> Vec<Expense> {
        self.expenses.records()
    }

    pub fn categories_state(&self) -> ManagerState<Category> {
        self.categories.state()
    }

    pub fn expenses_state(&self) -> ManagerState<Expense> {
        self.expenses.state()
    }

    pub fn subscribe_categories(&self) -> watch::Receiver<ManagerState<Category>> {
        self.categories.subscribe()
    }

    pub fn subscribe_expenses(&self) -> watch::Receiver<ManagerState<Expense>> {
        self.expenses.subscribe()
    }

    pub async fn fetch_categories(&self) {
        self.categories.fetch_all().await;
    }

    pub async fn fetch_expenses(&self) {
        self.expenses.fetch_all().await;
    }

    /// Categories first so that freshly loaded expenses can be joined against them.
    pub async fn load_initial_data(&self) {
        self.fetch_categories().await;
        self.fetch_expenses().await;
    }

    pub async fn add_category(&self, new: NewCategory) -> Result<Category> {
        validate_category_name(&new.name)?;
        validate_budget(new.budget)?;
        let user_id = self.identity.current_user_id()?;

        let category = Category {
            id: Uuid::new_v4(),
            user_id,
            name: new.name.trim().to_string(),
            budget: new.budget,
            color: normalize_optional(new.color)
                .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string()),
            created_at: OffsetDateTime::now_utc(),
        };

        self.categories.insert(to_row(&category)?).await?;
        Ok(category)
    }

    pub async fn update_category(&self, category: &Category, update: CategoryUpdate) -> Result<()> {
        validate_category_name(&update.name)?;
        validate_budget(update.budget)?;
        self.identity.current_user_id()?;

        let update = CategoryUpdate {
            name: update.name.trim().to_string(),
            ..update
        };
        self.categories.update(category.id, to_row(&update)?).await
    }

    /// Expenses that referenced the category stay stored but drop out of joined views.
    pub async fn delete_category(&self, category: &Category) -> Result<()> {
        self.identity.current_user_id()?;
        self.categories.delete(category.id).await
    }

    pub async fn add_expense(&self, new: NewExpense) -> Result<Expense> {
        validate_expense_amount(new.amount)?;
        validate_expense_description(&new.description)?;
        let associated_object_id = normalize_optional(new.associated_object_id);
        validate_object_id(associated_object_id.as_deref())?;
        let user_id = self.identity.current_user_id()?;

        let now = OffsetDateTime::now_utc();
        let expense = Expense {
            id: Uuid::new_v4(),
            user_id,
            amount: new.amount,
            category_id: new.category_id,
            date: new.date.unwrap_or(now),
            description: new.description.trim().to_string(),
            associated_object_id,
            created_at: now,
        };

        self.expenses.insert(to_row(&expense)?).await?;
        Ok(expense)
    }

    pub async fn update_expense(&self, expense: &Expense, update: ExpenseUpdate) -> Result<()> {
        validate_expense_amount(update.amount)?;
        validate_expense_description(&update.description)?;
        let associated_object_id = normalize_optional(update.associated_object_id);
        validate_object_id(associated_object_id.as_deref())?;
        self.identity.current_user_id()?;

        let update = ExpenseUpdate {
            description: update.description.trim().to_string(),
            associated_object_id,
            ..update
        };
        self.expenses.update(expense.id, to_row(&update)?).await
    }

    pub async fn delete_expense(&self, expense: &Expense) -> Result<()> {
        self.identity.current_user_id()?;
        self.expenses.delete(expense.id).await
    }

    pub fn category(&self, category_id: Uuid) -> Option<Category> {
        self.categories
            .with_records(|categories| categories.iter().find(|c| c.id == category_id).cloned())
    }

    pub fn expenses_for_category(&self, category_id: Uuid) -> Vec<Expense> {
        self.expenses.with_records(|expenses| {
            expenses
                .iter()
                .filter(|e| e.category_id == category_id)
                .cloned()
                .collect()
        })
    }

    pub fn total_for_category(&self, category_id: Uuid) -> Decimal {
        self.expenses.with_records(|expenses| {
            sum_amounts(expenses.iter().filter(|e| e.category_id == category_id))
        })
    }

    /// False when the category is unknown or has no budget.
    pub fn is_over_budget(&self, category_id: Uuid) -> bool {
        match self.category(category_id).and_then(|c| c.budget) {
            Some(budget) => self.total_for_category(category_id) > budget,
            None => false,
        }
    }

    /// Budget minus spend, negative once overspent; absent when there is no budget.
    pub fn remaining_budget(&self, category_id: Uuid) -> Option<Decimal> {
        let budget = self.category(category_id)?.budget?;
        Some(budget - self.total_for_category(category_id))
    }

    pub fn expenses_for_object(&self, object_id: &str) -> Vec<Expense> {
        self.expenses.with_records(|expenses| {
            expenses
                .iter()
                .filter(|e| e.associated_object_id.as_deref() == Some(object_id))
                .cloned()
                .collect()
        })
    }

    pub fn total_for_object(&self, object_id: &str) -> Decimal {
        self.expenses.with_records(|expenses| {
            sum_amounts(
                expenses
                    .iter()
                    .filter(|e| e.associated_object_id.as_deref() == Some(object_id)),
            )
        })
    }

    pub fn expenses_for_object_in_category(&self, object_id: &str, category_id: Uuid) -> Vec<Expense> {
        self.expenses_for_object(object_id)
            .into_iter()
            .filter(|e| e.category_id == category_id)
            .collect()
    }

    pub fn total_for_object_in_category(&self, object_id: &str, category_id: Uuid) -> Decimal {
        sum_amounts(self.expenses_for_object_in_category(object_id, category_id).iter())
    }

    /// Expenses whose date falls in the same calendar month (UTC) as `month`.
    pub fn expenses_for_month(&self, month: Date) -> Vec<Expense> {
        self.expenses.with_records(|expenses| {
            expenses
                .iter()
                .filter(|e| same_month(e.date, month))
                .cloned()
                .collect()
        })
    }

    pub fn total_for_month(&self, month: Date) -> Decimal {
        self.expenses
            .with_records(|expenses| sum_amounts(expenses.iter().filter(|e| same_month(e.date, month))))
    }

    /// Expenses joined with their category; expenses with a dangling category id are skipped.
    pub fn categorized_expenses(&self) -> Vec<CategorizedExpense> {
        let categories = self.categories();
        self.expenses.with_records(|expenses| {
            expenses
                .iter()
                .filter_map(|expense| {
                    categories
                        .iter()
                        .find(|c| c.id == expense.category_id)
                        .map(|category| CategorizedExpense {
                            expense: expense.clone(),
                            category: category.clone(),
                        })
                })
                .collect()
        })
    }
}
