//! Wire types for the HTTP API.
//!
//! Request/response field names are camelCase to match the frontend;
//! domain enums keep their snake_case names from `domain`. Conversion
//! helpers live here so handlers never leak server-side fields (most
//! importantly: exercise results never ride along with a worksheet).

use serde::{Deserialize, Serialize};

use crate::domain::{
    GradedCategory, GradedWorksheet, Operation, Plan, Tier, UsageRecord, Worksheet,
};

/// Category choice for worksheet generation. `all` expands to the four
/// operations in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryChoice {
    All,
    Addition,
    Subtraction,
    Multiplication,
    Division,
}

impl CategoryChoice {
    pub fn operations(&self) -> &'static [Operation] {
        match self {
            CategoryChoice::All => &Operation::ALL,
            CategoryChoice::Addition => &[Operation::Addition],
            CategoryChoice::Subtraction => &[Operation::Subtraction],
            CategoryChoice::Multiplication => &[Operation::Multiplication],
            CategoryChoice::Division => &[Operation::Division],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterIn {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub birth_date: String,
    #[serde(default)]
    pub birth_place: String,
    #[serde(default)]
    pub father_name: String,
    #[serde(default)]
    pub mother_name: String,
}

#[derive(Debug, Serialize)]
pub struct OkOut {
    pub ok: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoginIn {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOut {
    pub session_token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordIn {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordIn {
    pub email: String,
    pub father_name: String,
    pub mother_name: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct WorksheetIn {
    pub tier: Tier,
    #[serde(default = "default_category")]
    pub category: CategoryChoice,
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub columns: Option<u8>,
}

fn default_category() -> CategoryChoice {
    CategoryChoice::All
}

/// Client view of one exercise: operands and the operator glyph. The
/// digit count sizes the answer box; the result itself stays behind.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseOut {
    pub a: i64,
    pub b: i64,
    pub op: String,
    pub result_len: usize,
}

#[derive(Debug, Serialize)]
pub struct WorksheetCategoryOut {
    pub op: Operation,
    pub exercises: Vec<ExerciseOut>,
}

#[derive(Debug, Serialize)]
pub struct WorksheetOut {
    pub id: String,
    pub tier: Tier,
    pub columns: u8,
    pub categories: Vec<WorksheetCategoryOut>,
}

pub fn worksheet_to_out(ws: &Worksheet) -> WorksheetOut {
    WorksheetOut {
        id: ws.id.clone(),
        tier: ws.tier,
        columns: ws.columns,
        categories: ws
            .categories
            .iter()
            .map(|c| WorksheetCategoryOut {
                op: c.op,
                exercises: c
                    .exercises
                    .iter()
                    .map(|e| ExerciseOut {
                        a: e.a,
                        b: e.b,
                        op: e.op.symbol().to_string(),
                        result_len: e.result_len(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

/// Submitted answers, positional per category in the order the worksheet
/// was issued. Nulls and gaps mean unanswered.
#[derive(Debug, Deserialize)]
pub struct AnswersIn {
    pub answers: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedOut {
    pub worksheet_id: String,
    pub categories: Vec<GradedCategory>,
    pub correct: u32,
    pub total: u32,
    pub score: u8,
    pub phrase: &'static str,
}

pub fn graded_to_out(g: GradedWorksheet, phrase: &'static str) -> GradedOut {
    GradedOut {
        worksheet_id: g.worksheet_id,
        categories: g.categories,
        correct: g.correct,
        total: g.total,
        score: g.score,
        phrase,
    }
}

#[derive(Debug, Serialize)]
pub struct TierAvailability {
    pub tier: Tier,
    pub used: u32,
    pub available: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewOut {
    pub email: String,
    pub plan: Option<Plan>,
    pub plan_started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub plan_expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub usage: UsageRecord,
    pub tiers: Vec<TierAvailability>,
    pub needs_plan: bool,
    pub free_exhausted: bool,
    pub fixed_count_limit: u32,
}

#[derive(Debug, Serialize)]
pub struct PlanOptionOut {
    pub plan: Plan,
    pub price: Option<String>,
    pub currency: Option<String>,
    pub description: String,
    pub available: bool,
}

#[derive(Debug, Serialize)]
pub struct PlanOptionsOut {
    pub options: Vec<PlanOptionOut>,
}

#[derive(Debug, Deserialize)]
pub struct ChoosePlanIn {
    pub plan: Plan,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutOut {
    pub order_id: String,
    pub approval_url: String,
}

/// PayPal's return redirect carries the order id as `token`.
#[derive(Debug, Deserialize)]
pub struct CaptureQuery {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelQuery {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActivatedOut {
    pub plan: Plan,
    pub ok: bool,
}

#[derive(Debug, Deserialize)]
pub struct ActivateKeyIn {
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
