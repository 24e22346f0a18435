//! Exercise generation: per-tier difficulty tables and random operand
//! construction.
//!
//! Subtraction and division are built so the answers stay friendly:
//! subtraction never goes negative, division always divides exactly.

use rand::Rng;

use crate::domain::{Exercise, Operation, Tier, WorksheetCategory};

/// Inclusive operand range for addition, subtraction and multiplication.
#[derive(Debug, Clone, Copy)]
pub struct OperandRange {
  pub low: i64,
  pub high: i64,
}

/// Division is generated backwards from divisor and quotient so the
/// dividend is always a clean multiple.
#[derive(Debug, Clone, Copy)]
pub struct DivisionRange {
  pub divisor_low: i64,
  pub divisor_high: i64,
  pub quotient_low: i64,
  pub quotient_high: i64,
}

/// Addition and subtraction operand ranges, one per tier (easiest first).
pub const ADDITIVE_RANGES: [OperandRange; 5] = [
  OperandRange { low: 0, high: 10 },
  OperandRange { low: 0, high: 50 },
  OperandRange { low: 0, high: 100 },
  OperandRange { low: 0, high: 200 },
  OperandRange { low: 0, high: 1_000_000 },
];

/// Multiplication operand ranges, one per tier.
pub const MULTIPLICATIVE_RANGES: [OperandRange; 5] = [
  OperandRange { low: 0, high: 5 },
  OperandRange { low: 0, high: 10 },
  OperandRange { low: 0, high: 20 },
  OperandRange { low: 0, high: 30 },
  OperandRange { low: 0, high: 1000 },
];

/// Division divisor/quotient ranges, one per tier. Divisors start at 1.
pub const DIVISION_RANGES: [DivisionRange; 5] = [
  DivisionRange { divisor_low: 1, divisor_high: 5, quotient_low: 0, quotient_high: 5 },
  DivisionRange { divisor_low: 1, divisor_high: 10, quotient_low: 0, quotient_high: 10 },
  DivisionRange { divisor_low: 1, divisor_high: 20, quotient_low: 0, quotient_high: 20 },
  DivisionRange { divisor_low: 1, divisor_high: 30, quotient_low: 0, quotient_high: 30 },
  DivisionRange { divisor_low: 1, divisor_high: 100, quotient_low: 0, quotient_high: 10_000 },
];

fn tier_index(tier: Tier) -> usize {
  match tier {
    Tier::Easy => 0,
    Tier::Intermediate => 1,
    Tier::Hard => 2,
    Tier::VeryHard => 3,
    Tier::Expert => 4,
  }
}

/// Generate one exercise for `op` at `tier`.
pub fn generate(op: Operation, tier: Tier, rng: &mut impl Rng) -> Exercise {
  let idx = tier_index(tier);
  match op {
    Operation::Addition => {
      let r = ADDITIVE_RANGES[idx];
      let a = rng.gen_range(r.low..=r.high);
      let b = rng.gen_range(r.low..=r.high);
      Exercise { a, b, op, result: a + b }
    }
    Operation::Subtraction => {
      // The subtrahend never exceeds the minuend.
      let r = ADDITIVE_RANGES[idx];
      let a = rng.gen_range(r.low..=r.high);
      let b = rng.gen_range(r.low..=a);
      Exercise { a, b, op, result: a - b }
    }
    Operation::Multiplication => {
      let r = MULTIPLICATIVE_RANGES[idx];
      let a = rng.gen_range(r.low..=r.high);
      let b = rng.gen_range(r.low..=r.high);
      Exercise { a, b, op, result: a * b }
    }
    Operation::Division => {
      // Pick divisor and quotient, derive the dividend.
      let r = DIVISION_RANGES[idx];
      let b = rng.gen_range(r.divisor_low..=r.divisor_high);
      let q = rng.gen_range(r.quotient_low..=r.quotient_high);
      Exercise { a: b * q, b, op, result: q }
    }
  }
}

/// Generate `n` exercises for one operation.
pub fn generate_batch(op: Operation, tier: Tier, n: u32, rng: &mut impl Rng) -> Vec<Exercise> {
  (0..n).map(|_| generate(op, tier, rng)).collect()
}

/// Build worksheet categories for the chosen operations, `per_category`
/// exercises each, keeping the caller's operation order.
pub fn generate_categories(ops: &[Operation], tier: Tier, per_category: u32) -> Vec<WorksheetCategory> {
  let mut rng = rand::thread_rng();
  ops
    .iter()
    .map(|&op| WorksheetCategory { op, exercises: generate_batch(op, tier, per_category, &mut rng) })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  fn rng() -> StdRng {
    StdRng::seed_from_u64(0xDECAF)
  }

  #[test]
  fn addition_respects_tier_bounds() {
    let mut rng = rng();
    for (tier, range) in Tier::ALL.iter().zip(ADDITIVE_RANGES.iter()) {
      for _ in 0..200 {
        let ex = generate(Operation::Addition, *tier, &mut rng);
        assert!(ex.a >= range.low && ex.a <= range.high);
        assert!(ex.b >= range.low && ex.b <= range.high);
        assert_eq!(ex.result, ex.a + ex.b);
      }
    }
  }

  #[test]
  fn subtraction_never_goes_negative() {
    let mut rng = rng();
    for tier in Tier::ALL {
      for _ in 0..500 {
        let ex = generate(Operation::Subtraction, tier, &mut rng);
        assert!(ex.b <= ex.a, "subtrahend {} exceeds minuend {}", ex.b, ex.a);
        assert_eq!(ex.result, ex.a - ex.b);
        assert!(ex.result >= 0);
      }
    }
  }

  #[test]
  fn multiplication_uses_smaller_expert_operands() {
    let mut rng = rng();
    for _ in 0..500 {
      let ex = generate(Operation::Multiplication, Tier::Expert, &mut rng);
      assert!(ex.a <= 1000 && ex.b <= 1000);
      assert_eq!(ex.result, ex.a * ex.b);
    }
  }

  #[test]
  fn division_is_always_exact() {
    let mut rng = rng();
    for (tier, range) in Tier::ALL.iter().zip(DIVISION_RANGES.iter()) {
      for _ in 0..500 {
        let ex = generate(Operation::Division, *tier, &mut rng);
        assert!(ex.b >= range.divisor_low && ex.b <= range.divisor_high);
        assert!(ex.result >= range.quotient_low && ex.result <= range.quotient_high);
        assert_eq!(ex.a, ex.b * ex.result);
        assert_eq!(ex.a % ex.b, 0);
      }
    }
  }

  #[test]
  fn categories_keep_operation_order_and_size() {
    let cats = generate_categories(&Operation::ALL, Tier::Easy, 7);
    assert_eq!(cats.len(), 4);
    let ops: Vec<Operation> = cats.iter().map(|c| c.op).collect();
    assert_eq!(ops, Operation::ALL.to_vec());
    for cat in &cats {
      assert_eq!(cat.exercises.len(), 7);
    }
  }

  #[test]
  fn single_category_generates_only_that_operation() {
    let cats = generate_categories(&[Operation::Division], Tier::Hard, 5);
    assert_eq!(cats.len(), 1);
    assert_eq!(cats[0].op, Operation::Division);
    assert_eq!(cats[0].exercises.len(), 5);
  }
}
