//! Domain models used by the backend: operations, difficulty tiers, plans,
//! exercises, worksheets and the per-account record.
//!
//! Serde names here are load-bearing: they match the JSON the frontend
//! exchanges and the on-disk accounts file, so renames are breaking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four supported arithmetic operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
  Addition,
  Subtraction,
  Multiplication,
  Division,
}

impl Operation {
  pub const ALL: [Operation; 4] = [
    Operation::Addition,
    Operation::Subtraction,
    Operation::Multiplication,
    Operation::Division,
  ];

  /// Glyph printed between the operands.
  pub fn symbol(&self) -> &'static str {
    match self {
      Operation::Addition => "+",
      Operation::Subtraction => "-",
      Operation::Multiplication => "×",
      Operation::Division => "÷",
    }
  }

  /// Heading used on worksheets and exported documents.
  pub fn label(&self) -> &'static str {
    match self {
      Operation::Addition => "Addition",
      Operation::Subtraction => "Subtraction",
      Operation::Multiplication => "Multiplication",
      Operation::Division => "Division",
    }
  }
}

/// Difficulty tiers, ordered easiest first.
/// The wire name for `VeryHard` keeps its historical space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
  Easy,
  Intermediate,
  Hard,
  #[serde(rename = "very hard")]
  VeryHard,
  Expert,
}

impl Tier {
  pub const ALL: [Tier; 5] = [
    Tier::Easy,
    Tier::Intermediate,
    Tier::Hard,
    Tier::VeryHard,
    Tier::Expert,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Tier::Easy => "easy",
      Tier::Intermediate => "intermediate",
      Tier::Hard => "hard",
      Tier::VeryHard => "very hard",
      Tier::Expert => "expert",
    }
  }
}

/// Subscription plans. `twenty` is accepted as a legacy spelling of
/// `fixed_count` so older account files keep loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
  Free,
  Monthly,
  #[serde(alias = "twenty")]
  FixedCount,
}

impl Plan {
  pub fn as_str(&self) -> &'static str {
    match self {
      Plan::Free => "free",
      Plan::Monthly => "monthly",
      Plan::FixedCount => "fixed_count",
    }
  }
}

/// One generated exercise. `result` stays server side and is never sent
/// to the client before grading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
  pub a: i64,
  pub b: i64,
  pub op: Operation,
  pub result: i64,
}

impl Exercise {
  /// Digit count of the expected result, used to size answer blanks.
  pub fn result_len(&self) -> usize {
    self.result.to_string().len()
  }
}

/// Per-tier worksheet counters, persisted with each account.
/// `fixed_count_used` tracks the fixed-count allowance on its own (wire
/// name `total`), so free-tier usage never eats into a purchased pack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
  #[serde(default)] pub easy: u32,
  #[serde(default)] pub intermediate: u32,
  #[serde(default)] pub hard: u32,
  #[serde(default, rename = "very hard")] pub very_hard: u32,
  #[serde(default)] pub expert: u32,
  #[serde(default, rename = "total")] pub fixed_count_used: u32,
}

impl UsageRecord {
  pub fn tier(&self, tier: Tier) -> u32 {
    match tier {
      Tier::Easy => self.easy,
      Tier::Intermediate => self.intermediate,
      Tier::Hard => self.hard,
      Tier::VeryHard => self.very_hard,
      Tier::Expert => self.expert,
    }
  }

  pub fn tier_mut(&mut self, tier: Tier) -> &mut u32 {
    match tier {
      Tier::Easy => &mut self.easy,
      Tier::Intermediate => &mut self.intermediate,
      Tier::Hard => &mut self.hard,
      Tier::VeryHard => &mut self.very_hard,
      Tier::Expert => &mut self.expert,
    }
  }
}

/// Everything stored per account. Only the password hash is kept, never
/// the password itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRecord {
  pub password_hash: String,

  // Profile fields collected at registration; parent names double as
  // the password-recovery challenge.
  #[serde(default)] pub birth_date: String,
  #[serde(default)] pub birth_place: String,
  #[serde(default)] pub father_name: String,
  #[serde(default)] pub mother_name: String,

  // Plan state
  #[serde(default)] pub plan: Option<Plan>,
  #[serde(default)] pub plan_start: Option<DateTime<Utc>>,
  #[serde(default)] pub activation_id: Option<String>,

  #[serde(default)] pub remember_token: Option<String>,
  #[serde(default)] pub usage: UsageRecord,
}

/// Exercises for one operation within a worksheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorksheetCategory {
  pub op: Operation,
  pub exercises: Vec<Exercise>,
}

/// One generated worksheet, kept server side until graded or replaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worksheet {
  pub id: String,
  pub tier: Tier,
  pub columns: u8,
  pub categories: Vec<WorksheetCategory>,
  pub created_at: DateTime<Utc>,
}

impl Worksheet {
  pub fn exercise_count(&self) -> usize {
    self.categories.iter().map(|c| c.exercises.len()).sum()
  }
}

/// Verdict for a single exercise after grading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingResult {
  pub submitted: Option<i64>,
  pub expected: i64,
  pub correct: bool,
  pub text: String,
}

/// Grading verdicts for one category, in exercise order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradedCategory {
  pub op: Operation,
  pub results: Vec<GradingResult>,
}

/// Full grading outcome for a worksheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradedWorksheet {
  pub worksheet_id: String,
  pub categories: Vec<GradedCategory>,
  pub correct: u32,
  pub total: u32,
  pub score: u8,
}
