use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::FinanceError;

/// Stores a string-backed enum as `TEXT`.
macro_rules! sql_text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            /// Returns the stored name.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(format!(
                        "invalid {} '{other}'",
                        stringify!($ty)
                    )),
                }
            }
        }

        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|err: String| FromSqlError::Other(err.into()))
            }
        }
    };
}

/// Direction of a transaction. Amounts are always stored positive.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

sql_text_enum!(TransactionType {
    Income => "income",
    Expense => "expense",
});

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    #[default]
    Monthly,
    Yearly,
}

sql_text_enum!(BudgetPeriod {
    Monthly => "monthly",
    Yearly => "yearly",
});

impl BudgetPeriod {
    /// The unit used in "$500.00/month".
    pub fn unit(&self) -> &'static str {
        match self {
            BudgetPeriod::Monthly => "month",
            BudgetPeriod::Yearly => "year",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Active,
    Achieved,
    Cancelled,
}

sql_text_enum!(GoalStatus {
    Active => "active",
    Achieved => "achieved",
    Cancelled => "cancelled",
});

/// A recorded income or expense. Never updated once written.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Transaction {
    pub id: i64,
    pub date: NaiveDateTime,
    pub amount: f64,
    pub category: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub created_at: NaiveDateTime,
}

/// A spending limit for one category. `end_date` is `None` while the
/// budget is open.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Budget {
    pub id: i64,
    pub category: String,
    pub amount: f64,
    pub period: BudgetPeriod,
    pub start_date: NaiveDateTime,
    pub end_date: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl Budget {
    #[inline]
    pub fn is_open(&self) -> bool {
        self.end_date.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Goal {
    pub id: i64,
    pub name: String,
    pub target_amount: f64,
    pub current_amount: f64,
    pub target_date: Option<NaiveDateTime>,
    pub status: GoalStatus,
    pub created_at: NaiveDateTime,
}

impl Goal {
    /// Amount still missing, never negative.
    #[inline]
    pub fn remaining(&self) -> f64 {
        (self.target_amount - self.current_amount).max(0.0)
    }
}

/// An open budget compared with the current month's spending.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BudgetStatus {
    pub budget: Budget,
    pub spent: f64,
    pub remaining: f64,
    pub percentage: f64,
}

/// Parses a `YYYY-MM-DD` date as midnight of that day.
pub fn parse_date(input: &str) -> Result<NaiveDateTime, FinanceError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN))
        .map_err(|_| FinanceError::InvalidDate(input.to_owned()))
}
