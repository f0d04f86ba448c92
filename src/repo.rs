use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::{
    db::{Expense, ExpenseChanges, NewExpense, User},
    error::{AppError, AppResult},
};

/// Typed access to users and expenses. Every expense query takes the owner id
/// and filters on it.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn create_user(&self, username: &str, password_hash: &str) -> AppResult<User>;
    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn find_user(&self, id: i64) -> AppResult<Option<User>>;

    async fn create_expense(&self, user_id: i64, new: &NewExpense) -> AppResult<Expense>;
    async fn find_expense(&self, user_id: i64, id: i64) -> AppResult<Option<Expense>>;
    async fn update_expense(
        &self,
        user_id: i64,
        id: i64,
        changes: &ExpenseChanges,
    ) -> AppResult<Option<Expense>>;
    async fn delete_expense(&self, user_id: i64, id: i64) -> AppResult<bool>;
    /// Newest first. `category` of `None` means every category.
    async fn list_expenses(&self, user_id: i64, category: Option<&str>) -> AppResult<Vec<Expense>>;
    async fn list_categories(&self, user_id: i64) -> AppResult<Vec<String>>;
}

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn create_user(&self, username: &str, password_hash: &str) -> AppResult<User> {
        let res = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES (?1, ?2)
            RETURNING id, username, password_hash
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await;

        match res {
            Ok(user) => Ok(user),
            // username is the only unique column on users
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(AppError::DuplicateUsername)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash
            FROM users
            WHERE username = ?1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, username, password_hash FROM users WHERE id = ?1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_expense(&self, user_id: i64, new: &NewExpense) -> AppResult<Expense> {
        let expense = sqlx::query_as::<_, Expense>(
            r#"
            INSERT INTO expenses (description, amount, category, date, user_id)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id, description, amount, category, date, user_id
            "#,
        )
        .bind(&new.description)
        .bind(new.amount)
        .bind(&new.category)
        .bind(new.date)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(expense)
    }

    async fn find_expense(&self, user_id: i64, id: i64) -> AppResult<Option<Expense>> {
        let expense = sqlx::query_as::<_, Expense>(
            r#"
            SELECT id, description, amount, category, date, user_id
            FROM expenses
            WHERE id = ?1 AND user_id = ?2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(expense)
    }

    async fn update_expense(
        &self,
        user_id: i64,
        id: i64,
        changes: &ExpenseChanges,
    ) -> AppResult<Option<Expense>> {
        let expense = sqlx::query_as::<_, Expense>(
            r#"
            UPDATE expenses
               SET description = ?1, amount = ?2, category = ?3
             WHERE id = ?4 AND user_id = ?5
            RETURNING id, description, amount, category, date, user_id
            "#,
        )
        .bind(&changes.description)
        .bind(changes.amount)
        .bind(&changes.category)
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(expense)
    }

    async fn delete_expense(&self, user_id: i64, id: i64) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM expenses WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_expenses(&self, user_id: i64, category: Option<&str>) -> AppResult<Vec<Expense>> {
        let rows = sqlx::query_as::<_, Expense>(
            r#"
            SELECT id, description, amount, category, date, user_id
            FROM expenses
            WHERE user_id = ?1 AND (?2 IS NULL OR category = ?2)
            ORDER BY julianday(date) DESC, id DESC
            "#,
        )
        .bind(user_id)
        .bind(category)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_categories(&self, user_id: i64) -> AppResult<Vec<String>> {
        let rows: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT category
            FROM expenses
            WHERE user_id = ?1
            ORDER BY category ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::{connect_pool, create_schema};
    use time::macros::datetime;

    pub(crate) async fn memory_repo() -> SqliteRepository {
        let pool = connect_pool("sqlite::memory:").await.expect("memory pool");
        create_schema(&pool).await.expect("schema");
        SqliteRepository::new(pool)
    }

    fn new_expense(category: &str, amount: f64) -> NewExpense {
        NewExpense {
            description: format!("{} thing", category),
            amount,
            category: category.into(),
            date: datetime!(2024-03-01 12:00 UTC),
        }
    }

    #[tokio::test]
    async fn duplicate_username_is_reported() {
        let repo = memory_repo().await;
        repo.create_user("alice", "hash-1").await.unwrap();
        let err = repo.create_user("alice", "hash-2").await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateUsername));

        let stored = repo.find_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "hash-1");
    }

    #[tokio::test]
    async fn expense_queries_are_owner_scoped() {
        let repo = memory_repo().await;
        let alice = repo.create_user("alice", "h").await.unwrap();
        let bob = repo.create_user("bob", "h").await.unwrap();
        let e = repo
            .create_expense(alice.id, &new_expense("food", 4.0))
            .await
            .unwrap();

        assert!(repo.find_expense(bob.id, e.id).await.unwrap().is_none());
        let changes = ExpenseChanges {
            description: "hijack".into(),
            amount: 0.0,
            category: "x".into(),
        };
        assert!(repo.update_expense(bob.id, e.id, &changes).await.unwrap().is_none());
        assert!(!repo.delete_expense(bob.id, e.id).await.unwrap());
        assert!(repo.list_expenses(bob.id, None).await.unwrap().is_empty());

        let still = repo.find_expense(alice.id, e.id).await.unwrap().unwrap();
        assert_eq!(still, e);
    }

    #[tokio::test]
    async fn date_roundtrips_through_storage() {
        let repo = memory_repo().await;
        let alice = repo.create_user("alice", "h").await.unwrap();
        let e = repo
            .create_expense(alice.id, &new_expense("food", 4.0))
            .await
            .unwrap();
        assert_eq!(e.date, datetime!(2024-03-01 12:00 UTC));
    }

    #[tokio::test]
    async fn categories_are_distinct_and_sorted() {
        let repo = memory_repo().await;
        let alice = repo.create_user("alice", "h").await.unwrap();
        for c in ["transport", "food", "food", "bills"] {
            repo.create_expense(alice.id, &new_expense(c, 1.0)).await.unwrap();
        }
        let cats = repo.list_categories(alice.id).await.unwrap();
        assert_eq!(cats, vec!["bills", "food", "transport"]);
    }

    #[tokio::test]
    async fn listing_orders_by_date_not_insertion() {
        let repo = memory_repo().await;
        let alice = repo.create_user("alice", "h").await.unwrap();
        for (description, date) in [
            ("march", datetime!(2024-03-01 12:00 UTC)),
            ("january", datetime!(2024-01-01 12:00 UTC)),
            ("february", datetime!(2024-02-01 12:00 UTC)),
        ] {
            let e = NewExpense {
                description: description.into(),
                date,
                ..new_expense("food", 1.0)
            };
            repo.create_expense(alice.id, &e).await.unwrap();
        }

        let listed: Vec<String> = repo
            .list_expenses(alice.id, None)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.description)
            .collect();
        assert_eq!(listed, vec!["march", "february", "january"]);

        let food: Vec<String> = repo
            .list_expenses(alice.id, Some("food"))
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.description)
            .collect();
        assert_eq!(food, listed);
    }
}
