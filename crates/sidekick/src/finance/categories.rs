use std::fmt;
use std::str::FromStr;

use super::{FinanceError, TransactionType};

/// Suggested expense categories.
pub const EXPENSE_CATEGORIES: &[&str] = &[
    "Food & Dining",
    "Transportation",
    "Shopping",
    "Entertainment",
    "Bills & Utilities",
    "Healthcare",
    "Other",
];

/// Suggested income categories.
pub const INCOME_CATEGORIES: &[&str] =
    &["Salary", "Freelance", "Investments", "Gifts", "Other"];

/// How strictly transaction categories are checked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CategoryPolicy {
    /// Any non-empty category is accepted.
    #[default]
    Lenient,
    /// The category must be one of the configured categories for the
    /// transaction type. Matching ignores case.
    Strict,
}

impl FromStr for CategoryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(CategoryPolicy::Lenient),
            "strict" => Ok(CategoryPolicy::Strict),
            other => Err(format!("unknown category policy '{other}'")),
        }
    }
}

impl fmt::Display for CategoryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CategoryPolicy::Lenient => "lenient",
            CategoryPolicy::Strict => "strict",
        })
    }
}

/// The category lists and the policy applied to them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryRules {
    pub policy: CategoryPolicy,
    pub expense: Vec<String>,
    pub income: Vec<String>,
}

impl Default for CategoryRules {
    fn default() -> Self {
        Self::with_policy(CategoryPolicy::default())
    }
}

impl CategoryRules {
    /// Uses the suggested category lists.
    pub fn with_policy(policy: CategoryPolicy) -> Self {
        let owned = |list: &[&str]| list.iter().map(|c| c.to_string()).collect();
        Self {
            policy,
            expense: owned(EXPENSE_CATEGORIES),
            income: owned(INCOME_CATEGORIES),
        }
    }

    /// Returns the categories configured for a transaction type.
    pub fn for_kind(&self, kind: TransactionType) -> &[String] {
        match kind {
            TransactionType::Expense => &self.expense,
            TransactionType::Income => &self.income,
        }
    }

    /// Checks a category and returns the name to store.
    ///
    /// The lenient policy takes any string, trimmed. Under the strict
    /// policy the configured spelling is returned, so `food & dining` is
    /// stored as `Food & Dining`.
    pub fn validate(
        &self,
        category: &str,
        kind: TransactionType,
    ) -> Result<String, FinanceError> {
        let category = category.trim();
        if self.policy == CategoryPolicy::Lenient {
            return Ok(category.to_owned());
        }
        if category.is_empty() {
            return Err(FinanceError::EmptyCategory);
        }
        let allowed = self.for_kind(kind);
        allowed
            .iter()
            .find(|known| known.eq_ignore_ascii_case(category))
            .cloned()
            .ok_or_else(|| FinanceError::UnknownCategory {
                kind,
                category: category.to_owned(),
                allowed: allowed.join(", "),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenient_accepts_any_string() {
        let rules = CategoryRules::default();
        assert_eq!(
            rules.validate(" Pets ", TransactionType::Expense).unwrap(),
            "Pets"
        );
        assert_eq!(rules.validate("", TransactionType::Expense).unwrap(), "");
        assert_eq!(rules.validate("  ", TransactionType::Income).unwrap(), "");
    }

    #[test]
    fn test_strict_rejects_empty_category() {
        let rules = CategoryRules::with_policy(CategoryPolicy::Strict);
        assert!(matches!(
            rules.validate("  ", TransactionType::Expense),
            Err(FinanceError::EmptyCategory)
        ));
    }

    #[test]
    fn test_strict_uses_list_of_kind() {
        let rules = CategoryRules::with_policy(CategoryPolicy::Strict);
        assert_eq!(
            rules
                .validate("food & dining", TransactionType::Expense)
                .unwrap(),
            "Food & Dining"
        );
        assert!(rules.validate("Salary", TransactionType::Income).is_ok());
        let err = rules
            .validate("Salary", TransactionType::Expense)
            .unwrap_err();
        assert!(err.to_string().contains("not a known expense category"));
    }

    #[test]
    fn test_parse_policy() {
        assert_eq!("STRICT".parse(), Ok(CategoryPolicy::Strict));
        assert!("loose".parse::<CategoryPolicy>().is_err());
    }
}
