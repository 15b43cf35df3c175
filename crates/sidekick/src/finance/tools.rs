//! Finance tools. Every tool formats its answer as plain text using the
//! configured currency symbol.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use sidekick_core::tool::{Error as ToolError, Tool, ToolRegistry, ToolResult};
use tokio::task::spawn_blocking;

use super::models::parse_date;
use crate::clock::now;
use super::{
    BudgetPeriod, BudgetStatus, FinanceError, Goal, GoalStatus, Ledger,
    Transaction, TransactionFilter, TransactionType,
};

const TOP_CATEGORIES: usize = 5;

/// State shared by the finance tools.
#[derive(Clone)]
pub struct FinanceContext {
    ledger: Arc<Ledger>,
    currency: Arc<str>,
}

impl FinanceContext {
    pub fn new(ledger: Arc<Ledger>, currency: &str) -> Self {
        Self {
            ledger,
            currency: currency.into(),
        }
    }

    #[inline]
    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    fn money(&self, amount: f64) -> String {
        format!("{}{amount:.2}", self.currency)
    }

    /// Runs a ledger call on the blocking pool.
    async fn run<T, F>(&self, action: &str, f: F) -> Result<T, ToolError>
    where
        T: Send + 'static,
        F: FnOnce(&Ledger) -> Result<T, FinanceError> + Send + 'static,
    {
        let ledger = Arc::clone(&self.ledger);
        let result = spawn_blocking(move || f(&ledger)).await.map_err(|err| {
            ToolError::execution_error()
                .with_reason(format!("could not {action}: {err}"))
        })?;
        result.map_err(|err| {
            warn!("could not {action}: {err}");
            let base = if err.is_invalid_input() {
                ToolError::invalid_input()
            } else {
                ToolError::execution_error()
            };
            base.with_reason(format!("could not {action}: {err}"))
        })
    }
}

/// Registers every finance tool.
pub fn registry(ctx: &FinanceContext) -> ToolRegistry {
    ToolRegistry::new()
        .with_tool(AddTransactionTool::new(ctx.clone()))
        .with_tool(SpendingSummaryTool::new(ctx.clone()))
        .with_tool(ManageBudgetTool::new(ctx.clone()))
        .with_tool(ManageGoalTool::new(ctx.clone()))
        .with_tool(AnalyzeSpendingTool::new(ctx.clone()))
}

fn optional_date(date: Option<&str>) -> Result<Option<NaiveDateTime>, ToolError> {
    date.filter(|d| !d.trim().is_empty())
        .map(parse_date)
        .transpose()
        .map_err(|err| ToolError::invalid_input().with_reason(err.to_string()))
}

#[derive(Deserialize, JsonSchema)]
pub struct AddTransactionInput {
    #[schemars(description = "Transaction amount, a positive number.")]
    amount: f64,
    #[schemars(description = "Category, e.g. \"Food & Dining\" or \"Salary\".")]
    category: String,
    #[schemars(description = "Short description of the transaction.")]
    #[serde(default)]
    description: String,
    #[schemars(description = "Either \"income\" or \"expense\".")]
    transaction_type: TransactionType,
    #[schemars(description = "Optional date in YYYY-MM-DD format, defaults to today.")]
    date: Option<String>,
}

/// Records an income or an expense.
pub struct AddTransactionTool {
    ctx: FinanceContext,
    parameter_schema: Value,
}

impl AddTransactionTool {
    pub fn new(ctx: FinanceContext) -> Self {
        Self {
            ctx,
            parameter_schema: schema_for!(AddTransactionInput).to_value(),
        }
    }
}

impl Tool for AddTransactionTool {
    type Input = AddTransactionInput;

    fn name(&self) -> &str {
        "add_transaction"
    }

    fn description(&self) -> &str {
        "Add a new transaction (income or expense) to the ledger."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: AddTransactionInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let ctx = self.ctx.clone();
        async move {
            let date = optional_date(input.date.as_deref())?;
            let tx = ctx
                .run("add transaction", move |ledger| {
                    ledger.add_transaction(
                        input.amount,
                        &input.category,
                        &input.description,
                        input.transaction_type,
                        date,
                    )
                })
                .await?;
            Ok(format!(
                "Successfully added {}: {} for {} - {}",
                tx.kind,
                ctx.money(tx.amount),
                tx.category,
                tx.description
            ))
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SummaryPeriod {
    Week,
    #[default]
    Month,
    Year,
}

impl SummaryPeriod {
    fn days(self) -> i64 {
        match self {
            SummaryPeriod::Week => 7,
            SummaryPeriod::Month => 30,
            SummaryPeriod::Year => 365,
        }
    }

    fn label(self) -> &'static str {
        match self {
            SummaryPeriod::Week => "week",
            SummaryPeriod::Month => "month",
            SummaryPeriod::Year => "year",
        }
    }
}

#[derive(Deserialize, JsonSchema)]
pub struct SpendingSummaryInput {
    #[schemars(description = "\"week\", \"month\" or \"year\", defaults to month.")]
    #[serde(default)]
    period: SummaryPeriod,
}

struct Summary {
    income: f64,
    expenses: f64,
    by_category: BTreeMap<String, f64>,
}

/// Income, expenses and spending by category over a recent period.
pub struct SpendingSummaryTool {
    ctx: FinanceContext,
    parameter_schema: Value,
}

impl SpendingSummaryTool {
    pub fn new(ctx: FinanceContext) -> Self {
        Self {
            ctx,
            parameter_schema: schema_for!(SpendingSummaryInput).to_value(),
        }
    }
}

impl Tool for SpendingSummaryTool {
    type Input = SpendingSummaryInput;

    fn name(&self) -> &str {
        "get_spending_summary"
    }

    fn description(&self) -> &str {
        "Get a spending summary for a period showing income, expenses, net savings and spending by category."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: SpendingSummaryInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let ctx = self.ctx.clone();
        async move {
            let end = now();
            let start = Some(end - Duration::days(input.period.days()));
            let end = Some(end);
            let summary = ctx
                .run("get spending summary", move |ledger| {
                    Ok(Summary {
                        income: ledger.total_income(start, end)?,
                        expenses: ledger.total_expenses(start, end)?,
                        by_category: ledger.totals_by_category(start, end)?,
                    })
                })
                .await?;
            Ok(format_summary(&ctx, input.period, &summary))
        }
    }
}

fn format_summary(
    ctx: &FinanceContext,
    period: SummaryPeriod,
    summary: &Summary,
) -> String {
    let mut out = format!("Spending Summary ({}):\n\n", period.label());
    out.push_str(&format!("Total Income: {}\n", ctx.money(summary.income)));
    out.push_str(&format!(
        "Total Expenses: {}\n",
        ctx.money(summary.expenses)
    ));
    out.push_str(&format!(
        "Net Savings: {}\n\n",
        ctx.money(summary.income - summary.expenses)
    ));

    if !summary.by_category.is_empty() {
        out.push_str("Spending by Category:\n");
        for (category, amount) in sorted_desc(&summary.by_category) {
            let percentage = if summary.expenses > 0.0 {
                amount / summary.expenses * 100.0
            } else {
                0.0
            };
            out.push_str(&format!(
                "  - {category}: {} ({percentage:.1}%)\n",
                ctx.money(amount)
            ));
        }
    }
    out
}

/// Largest amount first, ties by name.
fn sorted_desc(totals: &BTreeMap<String, f64>) -> Vec<(&str, f64)> {
    let mut entries: Vec<_> =
        totals.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    entries
}

#[derive(Clone, Copy, Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BudgetAction {
    Create,
    View,
}

#[derive(Deserialize, JsonSchema)]
pub struct ManageBudgetInput {
    #[schemars(description = "\"create\" or \"view\".")]
    action: BudgetAction,
    #[schemars(description = "Budget category, required for create.")]
    category: Option<String>,
    #[schemars(description = "Budget amount, required for create.")]
    amount: Option<f64>,
    #[schemars(description = "\"monthly\" (default) or \"yearly\".")]
    #[serde(default)]
    period: BudgetPeriod,
}

/// Creates budgets and shows how the current month compares with them.
pub struct ManageBudgetTool {
    ctx: FinanceContext,
    parameter_schema: Value,
}

impl ManageBudgetTool {
    pub fn new(ctx: FinanceContext) -> Self {
        Self {
            ctx,
            parameter_schema: schema_for!(ManageBudgetInput).to_value(),
        }
    }
}

impl Tool for ManageBudgetTool {
    type Input = ManageBudgetInput;

    fn name(&self) -> &str {
        "manage_budget"
    }

    fn description(&self) -> &str {
        "Create a budget for a category, or view current budgets with this month's spending."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: ManageBudgetInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let ctx = self.ctx.clone();
        async move {
            match input.action {
                BudgetAction::Create => {
                    let (Some(category), Some(amount)) =
                        (input.category, input.amount)
                    else {
                        return Err(ToolError::invalid_input().with_reason(
                            "Category and amount required for creating budget",
                        ));
                    };
                    let period = input.period;
                    let budget = ctx
                        .run("manage budget", move |ledger| {
                            ledger.create_budget(&category, amount, period)
                        })
                        .await?;
                    Ok(format!(
                        "Created budget: {}/{} for {}",
                        ctx.money(budget.amount),
                        budget.period.unit(),
                        budget.category
                    ))
                }
                BudgetAction::View => {
                    let statuses = ctx
                        .run("manage budget", |ledger| ledger.budget_status())
                        .await?;
                    Ok(format_budgets(&ctx, &statuses))
                }
            }
        }
    }
}

fn format_budgets(ctx: &FinanceContext, statuses: &[BudgetStatus]) -> String {
    if statuses.is_empty() {
        return "No budgets set yet. Create a budget to start tracking!"
            .to_owned();
    }
    let mut out = String::from("Current Budgets:\n\n");
    for status in statuses {
        out.push_str(&format!("{}:\n", status.budget.category));
        out.push_str(&format!(
            "  Budget: {}\n",
            ctx.money(status.budget.amount)
        ));
        out.push_str(&format!(
            "  Spent: {} ({:.1}%)\n",
            ctx.money(status.spent),
            status.percentage
        ));
        out.push_str(&format!(
            "  Remaining: {}\n\n",
            ctx.money(status.remaining)
        ));
    }
    out
}

#[derive(Clone, Copy, Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum GoalAction {
    Create,
    Update,
    View,
    Cancel,
}

#[derive(Deserialize, JsonSchema)]
pub struct ManageGoalInput {
    #[schemars(description = "\"create\", \"update\", \"view\" or \"cancel\".")]
    action: GoalAction,
    #[schemars(description = "Goal name, required for create.")]
    name: Option<String>,
    #[schemars(description = "Target amount, required for create.")]
    target_amount: Option<f64>,
    #[schemars(description = "Amount saved so far, used by create and required for update.")]
    current_amount: Option<f64>,
    #[schemars(description = "Goal ID, required for update and cancel.")]
    goal_id: Option<i64>,
    #[schemars(description = "Optional target date in YYYY-MM-DD format.")]
    target_date: Option<String>,
}

/// Savings goals.
pub struct ManageGoalTool {
    ctx: FinanceContext,
    parameter_schema: Value,
}

impl ManageGoalTool {
    pub fn new(ctx: FinanceContext) -> Self {
        Self {
            ctx,
            parameter_schema: schema_for!(ManageGoalInput).to_value(),
        }
    }
}

impl Tool for ManageGoalTool {
    type Input = ManageGoalInput;

    fn name(&self) -> &str {
        "manage_goal"
    }

    fn description(&self) -> &str {
        "Create, view, update or cancel financial savings goals."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: ManageGoalInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let ctx = self.ctx.clone();
        async move {
            match input.action {
                GoalAction::Create => {
                    let (Some(name), Some(target)) =
                        (input.name, input.target_amount)
                    else {
                        return Err(ToolError::invalid_input().with_reason(
                            "Name and target_amount required for creating goal",
                        ));
                    };
                    let current = input.current_amount.unwrap_or(0.0);
                    let target_date = optional_date(input.target_date.as_deref())?;
                    let goal = ctx
                        .run("manage goal", move |ledger| {
                            ledger.create_goal(&name, target, current, target_date)
                        })
                        .await?;
                    Ok(format!(
                        "Created goal: {} - Save {}",
                        goal.name,
                        ctx.money(goal.target_amount)
                    ))
                }
                GoalAction::Update => {
                    let (Some(id), Some(current)) =
                        (input.goal_id, input.current_amount)
                    else {
                        return Err(ToolError::invalid_input().with_reason(
                            "goal_id and current_amount required for updating",
                        ));
                    };
                    let goal = ctx
                        .run("manage goal", move |ledger| {
                            found(ledger.update_goal_progress(id, current))
                        })
                        .await?
                        .ok_or_else(goal_not_found)?;
                    let achieved = if goal.status == GoalStatus::Achieved {
                        " - GOAL ACHIEVED!"
                    } else {
                        ""
                    };
                    Ok(format!(
                        "Updated goal: {} - {} of {}{achieved}",
                        goal.name,
                        ctx.money(goal.current_amount),
                        ctx.money(goal.target_amount)
                    ))
                }
                GoalAction::Cancel => {
                    let Some(id) = input.goal_id else {
                        return Err(ToolError::invalid_input()
                            .with_reason("goal_id required for cancelling"));
                    };
                    let goal = ctx
                        .run("manage goal", move |ledger| {
                            found(ledger.cancel_goal(id))
                        })
                        .await?
                        .ok_or_else(goal_not_found)?;
                    Ok(format!("Cancelled goal: {}", goal.name))
                }
                GoalAction::View => {
                    let goals = ctx
                        .run("manage goal", |ledger| ledger.list_goals(false))
                        .await?;
                    Ok(format_goals(&ctx, &goals))
                }
            }
        }
    }
}

fn found(result: Result<Goal, FinanceError>) -> Result<Option<Goal>, FinanceError> {
    match result {
        Err(FinanceError::GoalNotFound(_)) => Ok(None),
        other => other.map(Some),
    }
}

fn goal_not_found() -> ToolError {
    ToolError::invalid_input().with_reason("Goal not found")
}

fn format_goals(ctx: &FinanceContext, goals: &[Goal]) -> String {
    if goals.is_empty() {
        return "No financial goals set yet. Create a goal to start saving!"
            .to_owned();
    }
    let mut out = String::from("Your Financial Goals:\n\n");
    for goal in goals {
        let percentage = goal.current_amount / goal.target_amount * 100.0;
        out.push_str(&format!("Goal #{}: {}\n", goal.id, goal.name));
        out.push_str(&format!(
            "  Target: {}\n",
            ctx.money(goal.target_amount)
        ));
        out.push_str(&format!(
            "  Current: {} ({percentage:.1}%)\n",
            ctx.money(goal.current_amount)
        ));
        out.push_str(&format!("  Remaining: {}\n", ctx.money(goal.remaining())));
        if let Some(date) = goal.target_date {
            out.push_str(&format!("  Target date: {}\n", date.format("%Y-%m-%d")));
        }
        out.push_str(&format!("  Status: {}\n\n", goal.status));
    }
    out
}

#[derive(Deserialize, JsonSchema)]
pub struct AnalyzeSpendingInput {
    #[schemars(description = "Number of months to analyze, defaults to 3.")]
    months: Option<u32>,
}

/// Monthly totals and top categories over the last few months.
pub struct AnalyzeSpendingTool {
    ctx: FinanceContext,
    parameter_schema: Value,
}

impl AnalyzeSpendingTool {
    pub fn new(ctx: FinanceContext) -> Self {
        Self {
            ctx,
            parameter_schema: schema_for!(AnalyzeSpendingInput).to_value(),
        }
    }
}

impl Tool for AnalyzeSpendingTool {
    type Input = AnalyzeSpendingInput;

    fn name(&self) -> &str {
        "analyze_spending_patterns"
    }

    fn description(&self) -> &str {
        "Analyze spending patterns and trends over multiple months."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: AnalyzeSpendingInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let ctx = self.ctx.clone();
        async move {
            let months = input.months.unwrap_or(3).clamp(1, 120);
            let end = now();
            let filter = TransactionFilter::between(
                end - Duration::days(i64::from(months) * 30),
                end,
            )
            .with_kind(TransactionType::Expense);
            let expenses = ctx
                .run("analyze spending patterns", move |ledger| {
                    ledger.list_transactions(&filter)
                })
                .await?;
            Ok(format_analysis(&ctx, months, &expenses))
        }
    }
}

fn format_analysis(
    ctx: &FinanceContext,
    months: u32,
    expenses: &[Transaction],
) -> String {
    let mut monthly = BTreeMap::<String, f64>::new();
    let mut by_category = BTreeMap::<String, f64>::new();
    for tx in expenses {
        *monthly
            .entry(tx.date.format("%Y-%m").to_string())
            .or_default() += tx.amount;
        *by_category.entry(tx.category.clone()).or_default() += tx.amount;
    }
    let average = if monthly.is_empty() {
        0.0
    } else {
        monthly.values().sum::<f64>() / monthly.len() as f64
    };

    let mut out = format!("Spending Analysis (last {months} months):\n\n");
    out.push_str(&format!("Monthly Average: {}\n\n", ctx.money(average)));
    out.push_str("Monthly Spending:\n");
    for (month, amount) in &monthly {
        out.push_str(&format!("  {month}: {}\n", ctx.money(*amount)));
    }
    out.push_str("\nTop Spending Categories:\n");
    for (category, total) in
        sorted_desc(&by_category).into_iter().take(TOP_CATEGORIES)
    {
        out.push_str(&format!("  {category}: {}\n", ctx.money(total)));
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use sidekick_core::tool::ErrorKind;
    use sidekick_model::ToolCallRequest;

    use super::*;
    use crate::finance::CategoryRules;

    fn context(currency: &str) -> FinanceContext {
        let ledger = Ledger::open_in_memory(CategoryRules::default()).unwrap();
        FinanceContext::new(Arc::new(ledger), currency)
    }

    async fn call(registry: &ToolRegistry, name: &str, args: Value) -> ToolResult {
        registry
            .call(&ToolCallRequest {
                id: "call-1".to_owned(),
                name: name.to_owned(),
                arguments: args,
            })
            .await
    }

    #[tokio::test]
    async fn test_add_and_summarize() {
        let ctx = context("$");
        let registry = registry(&ctx);

        let added = call(
            &registry,
            "add_transaction",
            json!({
                "amount": 50,
                "category": "Food & Dining",
                "description": "lunch",
                "transaction_type": "expense"
            }),
        )
        .await
        .unwrap();
        assert_eq!(
            added,
            "Successfully added expense: $50.00 for Food & Dining - lunch"
        );
        for (amount, category, kind) in [
            (150.0, "Shopping", "expense"),
            (1000.0, "Salary", "income"),
        ] {
            call(
                &registry,
                "add_transaction",
                json!({
                    "amount": amount,
                    "category": category,
                    "transaction_type": kind
                }),
            )
            .await
            .unwrap();
        }

        let summary = call(&registry, "get_spending_summary", json!({}))
            .await
            .unwrap();
        assert_eq!(
            summary,
            "Spending Summary (month):\n\n\
             Total Income: $1000.00\n\
             Total Expenses: $200.00\n\
             Net Savings: $800.00\n\n\
             Spending by Category:\n  \
             - Shopping: $150.00 (75.0%)\n  \
             - Food & Dining: $50.00 (25.0%)\n"
        );
    }

    #[tokio::test]
    async fn test_add_rejects_bad_input() {
        let ctx = context("€");
        let registry = registry(&ctx);

        let err = call(
            &registry,
            "add_transaction",
            json!({
                "amount": -3,
                "category": "Other",
                "transaction_type": "expense"
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.reason().starts_with("could not add transaction"));

        let err = call(
            &registry,
            "add_transaction",
            json!({
                "amount": 3,
                "category": "Other",
                "transaction_type": "expense",
                "date": "yesterday"
            }),
        )
        .await
        .unwrap_err();
        assert!(err.reason().contains("YYYY-MM-DD"));
    }

    #[tokio::test]
    async fn test_budget_flow() {
        let ctx = context("$");
        let registry = registry(&ctx);

        let empty = call(&registry, "manage_budget", json!({"action": "view"}))
            .await
            .unwrap();
        assert_eq!(
            empty,
            "No budgets set yet. Create a budget to start tracking!"
        );

        let missing = call(
            &registry,
            "manage_budget",
            json!({"action": "create", "category": "Shopping"}),
        )
        .await
        .unwrap_err();
        assert_eq!(
            missing.reason(),
            "Category and amount required for creating budget"
        );

        let created = call(
            &registry,
            "manage_budget",
            json!({"action": "create", "category": "Shopping", "amount": 200}),
        )
        .await
        .unwrap();
        assert_eq!(created, "Created budget: $200.00/month for Shopping");

        ctx.ledger()
            .add_transaction(50.0, "Shopping", "shoes", TransactionType::Expense, None)
            .unwrap();
        let view = call(&registry, "manage_budget", json!({"action": "view"}))
            .await
            .unwrap();
        assert_eq!(
            view,
            "Current Budgets:\n\nShopping:\n  Budget: $200.00\n  \
             Spent: $50.00 (25.0%)\n  Remaining: $150.00\n\n"
        );
    }

    #[tokio::test]
    async fn test_goal_flow() {
        let ctx = context("$");
        let registry = registry(&ctx);

        let created = call(
            &registry,
            "manage_goal",
            json!({"action": "create", "name": "Laptop", "target_amount": 1500}),
        )
        .await
        .unwrap();
        assert_eq!(created, "Created goal: Laptop - Save $1500.00");

        let updated = call(
            &registry,
            "manage_goal",
            json!({"action": "update", "goal_id": 1, "current_amount": 1500}),
        )
        .await
        .unwrap();
        assert_eq!(
            updated,
            "Updated goal: Laptop - $1500.00 of $1500.00 - GOAL ACHIEVED!"
        );

        let view = call(&registry, "manage_goal", json!({"action": "view"}))
            .await
            .unwrap();
        assert!(view.starts_with("Your Financial Goals:\n\nGoal #1: Laptop\n"));
        assert!(view.contains("  Current: $1500.00 (100.0%)\n"));
        assert!(view.contains("  Status: achieved\n"));

        let missing = call(
            &registry,
            "manage_goal",
            json!({"action": "update", "goal_id": 9, "current_amount": 1}),
        )
        .await
        .unwrap_err();
        assert_eq!(missing.reason(), "Goal not found");
    }

    #[tokio::test]
    async fn test_analysis_groups_by_month() {
        let ctx = context("$");
        let registry = registry(&ctx);
        let today = now();
        let expense = TransactionType::Expense;
        for (amount, category) in [
            (10.0, "Food & Dining"),
            (30.0, "Transportation"),
            (20.0, "Food & Dining"),
        ] {
            ctx.ledger()
                .add_transaction(amount, category, "", expense, Some(today))
                .unwrap();
        }

        let analysis =
            call(&registry, "analyze_spending_patterns", json!({"months": 1}))
                .await
                .unwrap();
        let month = today.format("%Y-%m").to_string();
        assert_eq!(
            analysis,
            format!(
                "Spending Analysis (last 1 months):\n\n\
                 Monthly Average: $60.00\n\n\
                 Monthly Spending:\n  {month}: $60.00\n\n\
                 Top Spending Categories:\n  \
                 Food & Dining: $30.00\n  Transportation: $30.00\n"
            )
        );
    }
}
