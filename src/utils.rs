use rust_decimal::Decimal;
use time::{Date, OffsetDateTime, UtcOffset};

use crate::constants::*;
use crate::error::{PmsError, Result};

pub fn validate_string_length(value: &str, field_name: &str, max_length: usize) -> Result<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(PmsError::validation(format!("{} cannot be empty", field_name)));
    }
    if value.chars().count() > max_length {
        return Err(PmsError::validation(format!(
            "{} must be at most {} characters",
            field_name, max_length
        )));
    }
    Ok(())
}

/// Blank optional text is stored as absent.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn validate_expense_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(PmsError::validation("Expense amount must be greater than zero"));
    }
    Ok(())
}

pub fn validate_budget(budget: Option<Decimal>) -> Result<()> {
    if let Some(budget) = budget {
        if budget < Decimal::ZERO {
            return Err(PmsError::validation("Budget cannot be negative"));
        }
    }
    Ok(())
}

pub fn validate_backlog_priority(priority: i32) -> Result<()> {
    if !(MIN_BACKLOG_PRIORITY..=MAX_BACKLOG_PRIORITY).contains(&priority) {
        return Err(PmsError::validation(format!(
            "Priority must be between {} and {}",
            MIN_BACKLOG_PRIORITY, MAX_BACKLOG_PRIORITY
        )));
    }
    Ok(())
}

pub fn validate_estimated_effort(effort: Option<f32>) -> Result<()> {
    match effort {
        Some(e) if !e.is_finite() => Err(PmsError::validation(
            "Estimated effort must be a valid finite number",
        )),
        Some(e) if e < 0.0 => Err(PmsError::validation("Estimated effort cannot be negative")),
        _ => Ok(()),
    }
}

/// Calendar-month equality, compared in UTC.
pub fn same_month(moment: OffsetDateTime, month: Date) -> bool {
    let utc = moment.to_offset(UtcOffset::UTC);
    utc.year() == month.year() && utc.month() == month.month()
}
