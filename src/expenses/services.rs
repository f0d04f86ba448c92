use time::OffsetDateTime;
use tracing::{info, warn};

use super::dto::ExpenseForm;
use crate::{
    db::{Expense, ExpenseChanges, NewExpense},
    error::{AppError, AppResult},
    repo::Repository,
};

/// Filter value meaning "no filter"; also the first entry of the selector.
pub const ALL_CATEGORIES: &str = "all";

#[derive(Debug, Clone)]
pub struct ExpenseListing {
    pub expenses: Vec<Expense>,
    /// `"all"` followed by the user's distinct categories, sorted.
    pub categories: Vec<String>,
    pub current_filter: Option<String>,
}

/// Parses user-entered amount text. Sign is not checked; non-finite values are refused.
pub fn parse_amount(raw: &str) -> AppResult<f64> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => {
            warn!(amount = %raw, "rejected amount");
            Err(AppError::InvalidAmount(raw.to_string()))
        }
    }
}

pub async fn add_expense(
    repo: &dyn Repository,
    user_id: i64,
    form: &ExpenseForm,
) -> AppResult<Expense> {
    let amount = parse_amount(&form.amount)?;
    let new = NewExpense {
        description: form.description.clone(),
        amount,
        category: form.category.clone(),
        date: OffsetDateTime::now_utc(),
    };
    let expense = repo.create_expense(user_id, &new).await?;
    info!(user_id, expense_id = expense.id, "expense added");
    Ok(expense)
}

pub async fn get_expense(repo: &dyn Repository, user_id: i64, id: i64) -> AppResult<Expense> {
    repo.find_expense(user_id, id)
        .await?
        .ok_or(AppError::NotFound)
}

/// Overwrites description, amount and category. Ownership is checked before
/// the form is looked at.
pub async fn edit_expense(
    repo: &dyn Repository,
    user_id: i64,
    id: i64,
    form: &ExpenseForm,
) -> AppResult<Expense> {
    get_expense(repo, user_id, id).await?;
    let changes = ExpenseChanges {
        description: form.description.clone(),
        amount: parse_amount(&form.amount)?,
        category: form.category.clone(),
    };
    let expense = repo
        .update_expense(user_id, id, &changes)
        .await?
        .ok_or(AppError::NotFound)?;
    info!(user_id, expense_id = id, "expense updated");
    Ok(expense)
}

pub async fn delete_expense(repo: &dyn Repository, user_id: i64, id: i64) -> AppResult<()> {
    if !repo.delete_expense(user_id, id).await? {
        return Err(AppError::NotFound);
    }
    info!(user_id, expense_id = id, "expense deleted");
    Ok(())
}

pub async fn list_expenses(
    repo: &dyn Repository,
    user_id: i64,
    category_filter: Option<&str>,
) -> AppResult<ExpenseListing> {
    let filter = category_filter.filter(|c| !c.is_empty() && *c != ALL_CATEGORIES);
    let expenses = repo.list_expenses(user_id, filter).await?;

    let mut categories = Vec::with_capacity(8);
    categories.push(ALL_CATEGORIES.to_string());
    categories.extend(repo.list_categories(user_id).await?);

    Ok(ExpenseListing {
        expenses,
        categories,
        current_filter: category_filter.map(str::to_string),
    })
}
