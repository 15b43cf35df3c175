use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::clock::now;
use super::{
    Budget, BudgetPeriod, BudgetStatus, CategoryRules, FinanceError, Goal,
    GoalStatus, Transaction, TransactionType,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL,
    amount REAL NOT NULL CHECK (amount > 0),
    category TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    kind TEXT NOT NULL CHECK (kind IN ('income', 'expense')),
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);

CREATE TABLE IF NOT EXISTS budgets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    category TEXT NOT NULL,
    amount REAL NOT NULL CHECK (amount > 0),
    period TEXT NOT NULL DEFAULT 'monthly',
    start_date TEXT NOT NULL,
    end_date TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS goals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    target_amount REAL NOT NULL,
    current_amount REAL NOT NULL DEFAULT 0,
    target_date TEXT,
    status TEXT NOT NULL DEFAULT 'active',
    created_at TEXT NOT NULL
);
";

const TRANSACTION_COLUMNS: &str =
    "id, date, amount, category, description, kind, created_at";
const BUDGET_COLUMNS: &str =
    "id, category, amount, period, start_date, end_date, created_at";
const GOAL_COLUMNS: &str =
    "id, name, target_amount, current_amount, target_date, status, created_at";

/// Filters for [`Ledger::list_transactions`]. `None` leaves a dimension
/// unconstrained and both date bounds are inclusive.
#[derive(Clone, Debug, Default)]
pub struct TransactionFilter {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub category: Option<String>,
    pub kind: Option<TransactionType>,
}

impl TransactionFilter {
    /// Matches everything between `start` and `end`.
    #[inline]
    pub fn between(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Default::default()
        }
    }

    #[inline]
    pub fn with_kind(mut self, kind: TransactionType) -> Self {
        self.kind = Some(kind);
        self
    }

    #[inline]
    pub fn with_category<S: Into<String>>(mut self, category: S) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// The finance store.
///
/// One connection is opened for the lifetime of the ledger. Every method
/// locks it for the duration of the call, so the ledger can be shared
/// behind an `Arc`. Calls block; async callers should go through
/// `spawn_blocking`.
pub struct Ledger {
    conn: Mutex<Connection>,
    categories: CategoryRules,
}

impl Ledger {
    /// Opens (or creates) the database file at `path`.
    pub fn open(
        path: &Path,
        categories: CategoryRules,
    ) -> Result<Self, FinanceError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        debug!("opened finance database at {}", path.display());
        Self::with_connection(conn, categories)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory(
        categories: CategoryRules,
    ) -> Result<Self, FinanceError> {
        Self::with_connection(Connection::open_in_memory()?, categories)
    }

    fn with_connection(
        conn: Connection,
        categories: CategoryRules,
    ) -> Result<Self, FinanceError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            categories,
        })
    }

    #[inline]
    pub fn categories(&self) -> &CategoryRules {
        &self.categories
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave a half-applied write
        // behind: multi-statement writes run inside SQL transactions.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a transaction dated `date`, or now.
    pub fn add_transaction(
        &self,
        amount: f64,
        category: &str,
        description: &str,
        kind: TransactionType,
        date: Option<NaiveDateTime>,
    ) -> Result<Transaction, FinanceError> {
        check_amount(amount)?;
        let category = self.categories.validate(category, kind)?;
        let created_at = now();
        let date = date.unwrap_or(created_at);

        let conn = self.conn();
        conn.execute(
            "INSERT INTO transactions
                 (date, amount, category, description, kind, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![date, amount, category, description, kind, created_at],
        )?;
        let id = conn.last_insert_rowid();
        trace!("recorded {kind} #{id}: {amount} in {category}");

        Ok(Transaction {
            id,
            date,
            amount,
            category,
            description: description.to_owned(),
            kind,
            created_at,
        })
    }

    /// Returns matching transactions, newest first.
    pub fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, FinanceError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions
             WHERE (?1 IS NULL OR date >= ?1)
               AND (?2 IS NULL OR date <= ?2)
               AND (?3 IS NULL OR category = ?3)
               AND (?4 IS NULL OR kind = ?4)
             ORDER BY date DESC, id DESC"
        ))?;
        let rows = stmt.query_map(
            params![filter.start, filter.end, filter.category, filter.kind],
            transaction_from_row,
        )?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Sums expenses per category. Categories without expenses in the
    /// window are absent.
    pub fn totals_by_category(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<BTreeMap<String, f64>, FinanceError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT category, SUM(amount) FROM transactions
             WHERE kind = 'expense'
               AND (?1 IS NULL OR date >= ?1)
               AND (?2 IS NULL OR date <= ?2)
             GROUP BY category",
        )?;
        let rows = stmt.query_map(params![start, end], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn total_income(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<f64, FinanceError> {
        self.total_of(TransactionType::Income, start, end)
    }

    pub fn total_expenses(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<f64, FinanceError> {
        self.total_of(TransactionType::Expense, start, end)
    }

    fn total_of(
        &self,
        kind: TransactionType,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<f64, FinanceError> {
        let total = self.conn().query_row(
            "SELECT COALESCE(SUM(amount), 0.0) FROM transactions
             WHERE kind = ?1
               AND (?2 IS NULL OR date >= ?2)
               AND (?3 IS NULL OR date <= ?3)",
            params![kind, start, end],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Opens a new budget for `category`, closing any budget still open
    /// for it.
    pub fn create_budget(
        &self,
        category: &str,
        amount: f64,
        period: BudgetPeriod,
    ) -> Result<Budget, FinanceError> {
        check_amount(amount)?;
        let category =
            self.categories.validate(category, TransactionType::Expense)?;
        let started = now();

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let closed = tx.execute(
            "UPDATE budgets SET end_date = ?1
             WHERE category = ?2 AND end_date IS NULL",
            params![started, category],
        )?;
        tx.execute(
            "INSERT INTO budgets (category, amount, period, start_date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![category, amount, period, started],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        if closed > 0 {
            debug!("replaced {closed} open budget(s) for {category}");
        }

        Ok(Budget {
            id,
            category,
            amount,
            period,
            start_date: started,
            end_date: None,
            created_at: started,
        })
    }

    pub fn list_budgets(
        &self,
        active_only: bool,
    ) -> Result<Vec<Budget>, FinanceError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {BUDGET_COLUMNS} FROM budgets
             WHERE (?1 = 0 OR end_date IS NULL)
             ORDER BY category, id"
        ))?;
        let rows = stmt.query_map(params![active_only], budget_from_row)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Compares every open budget with the current month's spending.
    #[inline]
    pub fn budget_status(&self) -> Result<Vec<BudgetStatus>, FinanceError> {
        self.budget_status_at(now())
    }

    /// Like [`Ledger::budget_status`], for the month containing `at`.
    pub fn budget_status_at(
        &self,
        at: NaiveDateTime,
    ) -> Result<Vec<BudgetStatus>, FinanceError> {
        let month_start = month_start(at);
        let spent_by_category =
            self.totals_by_category(Some(month_start), Some(at))?;

        let statuses = self
            .list_budgets(true)?
            .into_iter()
            .map(|budget| {
                let spent = spent_by_category
                    .get(&budget.category)
                    .copied()
                    .unwrap_or(0.0);
                BudgetStatus {
                    remaining: budget.amount - spent,
                    percentage: spent / budget.amount * 100.0,
                    spent,
                    budget,
                }
            })
            .collect();
        Ok(statuses)
    }

    pub fn create_goal(
        &self,
        name: &str,
        target_amount: f64,
        current_amount: f64,
        target_date: Option<NaiveDateTime>,
    ) -> Result<Goal, FinanceError> {
        check_amount(target_amount)?;
        check_progress(current_amount)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(FinanceError::EmptyGoalName);
        }
        let created_at = now();
        // Only progress updates mark a goal achieved.
        let status = GoalStatus::Active;

        let conn = self.conn();
        conn.execute(
            "INSERT INTO goals
                 (name, target_amount, current_amount, target_date, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                name,
                target_amount,
                current_amount,
                target_date,
                status,
                created_at
            ],
        )?;

        Ok(Goal {
            id: conn.last_insert_rowid(),
            name: name.to_owned(),
            target_amount,
            current_amount,
            target_date,
            status,
            created_at,
        })
    }

    /// Sets the saved amount of a goal.
    ///
    /// An active goal that reaches its target becomes achieved and stays
    /// achieved. Cancelled goals keep their status.
    pub fn update_goal_progress(
        &self,
        id: i64,
        current_amount: f64,
    ) -> Result<Goal, FinanceError> {
        check_progress(current_amount)?;

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut goal =
            find_goal(&tx, id)?.ok_or(FinanceError::GoalNotFound(id))?;
        goal.current_amount = current_amount;
        if goal.status == GoalStatus::Active
            && current_amount >= goal.target_amount
        {
            goal.status = GoalStatus::Achieved;
            info!("goal #{id} ({}) achieved", goal.name);
        }
        tx.execute(
            "UPDATE goals SET current_amount = ?1, status = ?2 WHERE id = ?3",
            params![goal.current_amount, goal.status, id],
        )?;
        tx.commit()?;
        Ok(goal)
    }

    /// Cancels an active goal.
    pub fn cancel_goal(&self, id: i64) -> Result<Goal, FinanceError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut goal =
            find_goal(&tx, id)?.ok_or(FinanceError::GoalNotFound(id))?;
        if goal.status != GoalStatus::Active {
            return Err(FinanceError::GoalNotActive(id));
        }
        goal.status = GoalStatus::Cancelled;
        tx.execute(
            "UPDATE goals SET status = ?1 WHERE id = ?2",
            params![goal.status, id],
        )?;
        tx.commit()?;
        Ok(goal)
    }

    pub fn get_goal(&self, id: i64) -> Result<Option<Goal>, FinanceError> {
        find_goal(&self.conn(), id)
    }

    pub fn list_goals(
        &self,
        active_only: bool,
    ) -> Result<Vec<Goal>, FinanceError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {GOAL_COLUMNS} FROM goals
             WHERE (?1 = 0 OR status = 'active')
             ORDER BY id"
        ))?;
        let rows = stmt.query_map(params![active_only], goal_from_row)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }
}

fn check_amount(amount: f64) -> Result<(), FinanceError> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(FinanceError::InvalidAmount(amount))
    }
}

fn check_progress(amount: f64) -> Result<(), FinanceError> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(FinanceError::InvalidAmount(amount))
    }
}

fn month_start(at: NaiveDateTime) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(at.year(), at.month(), 1)
        .unwrap_or(at.date())
        .and_time(NaiveTime::MIN)
}

fn find_goal(
    conn: &Connection,
    id: i64,
) -> Result<Option<Goal>, FinanceError> {
    let goal = conn
        .query_row(
            &format!("SELECT {GOAL_COLUMNS} FROM goals WHERE id = ?1"),
            params![id],
            goal_from_row,
        )
        .optional()?;
    Ok(goal)
}

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        date: row.get(1)?,
        amount: row.get(2)?,
        category: row.get(3)?,
        description: row.get(4)?,
        kind: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn budget_from_row(row: &Row<'_>) -> rusqlite::Result<Budget> {
    Ok(Budget {
        id: row.get(0)?,
        category: row.get(1)?,
        amount: row.get(2)?,
        period: row.get(3)?,
        start_date: row.get(4)?,
        end_date: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn goal_from_row(row: &Row<'_>) -> rusqlite::Result<Goal> {
    Ok(Goal {
        id: row.get(0)?,
        name: row.get(1)?,
        target_amount: row.get(2)?,
        current_amount: row.get(3)?,
        target_date: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
    })
}
