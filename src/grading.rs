//! Answer grading: parse submissions, compare against recomputed results,
//! and produce the percentage score.

use crate::domain::{
  Exercise, GradedCategory, GradedWorksheet, GradingResult, Operation, Worksheet,
};

/// Parse a raw submission. Whitespace is trimmed; anything that is not a
/// whole number (including empty input) counts as unanswered.
pub fn parse_submitted(raw: Option<&str>) -> Option<i64> {
  raw.and_then(|s| s.trim().parse::<i64>().ok())
}

/// Expected result for an exercise, recomputed rather than trusted from
/// the stored value. Division operands always carry a divisor of at
/// least 1, see the generator tables.
pub fn expected_result(ex: &Exercise) -> i64 {
  match ex.op {
    Operation::Addition => ex.a + ex.b,
    Operation::Subtraction => ex.a - ex.b,
    Operation::Multiplication => ex.a * ex.b,
    Operation::Division => ex.a / ex.b,
  }
}

/// Grade one exercise against a raw submission.
pub fn grade(ex: &Exercise, raw: Option<&str>) -> GradingResult {
  let expected = expected_result(ex);
  match parse_submitted(raw) {
    None => GradingResult {
      submitted: None,
      expected,
      correct: false,
      text: "Not answered".to_string(),
    },
    Some(v) if v == expected => GradingResult {
      submitted: Some(v),
      expected,
      correct: true,
      text: "Well done".to_string(),
    },
    Some(v) => GradingResult {
      submitted: Some(v),
      expected,
      correct: false,
      text: format!("Try again (expected {})", expected),
    },
  }
}

/// Percentage score rounded to the nearest whole number; 0 when empty.
pub fn score(correct: u32, total: u32) -> u8 {
  if total == 0 {
    return 0;
  }
  (100.0 * f64::from(correct) / f64::from(total)).round() as u8
}

/// Grade a whole worksheet. `answers` is positional per category, in the
/// same order the worksheet was issued; missing entries count as
/// unanswered and extra entries are ignored.
pub fn grade_worksheet(worksheet: &Worksheet, answers: &[Vec<Option<String>>]) -> GradedWorksheet {
  let mut correct = 0u32;
  let mut total = 0u32;
  let mut categories = Vec::with_capacity(worksheet.categories.len());
  for (ci, cat) in worksheet.categories.iter().enumerate() {
    let given = answers.get(ci);
    let mut results = Vec::with_capacity(cat.exercises.len());
    for (ei, ex) in cat.exercises.iter().enumerate() {
      let raw = given.and_then(|v| v.get(ei)).and_then(|o| o.as_deref());
      let verdict = grade(ex, raw);
      total += 1;
      if verdict.correct {
        correct += 1;
      }
      results.push(verdict);
    }
    categories.push(GradedCategory { op: cat.op, results });
  }
  GradedWorksheet {
    worksheet_id: worksheet.id.clone(),
    categories,
    correct,
    total,
    score: score(correct, total),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Tier, WorksheetCategory};
  use chrono::Utc;

  fn sheet(categories: Vec<WorksheetCategory>) -> Worksheet {
    Worksheet {
      id: "w-test".into(),
      tier: Tier::Easy,
      columns: 3,
      categories,
      created_at: Utc::now(),
    }
  }

  fn ex(a: i64, b: i64, op: Operation, result: i64) -> Exercise {
    Exercise { a, b, op, result }
  }

  #[test]
  fn parsing_trims_and_rejects_non_integers() {
    assert_eq!(parse_submitted(None), None);
    assert_eq!(parse_submitted(Some("")), None);
    assert_eq!(parse_submitted(Some("  12 ")), Some(12));
    assert_eq!(parse_submitted(Some("+5")), Some(5));
    assert_eq!(parse_submitted(Some("4.5")), None);
    assert_eq!(parse_submitted(Some("twelve")), None);
  }

  #[test]
  fn score_rounds_to_nearest_percent() {
    assert_eq!(score(0, 0), 0);
    assert_eq!(score(0, 10), 0);
    assert_eq!(score(1, 4), 25);
    assert_eq!(score(2, 3), 67);
    assert_eq!(score(1, 3), 33);
    assert_eq!(score(10, 10), 100);
  }

  #[test]
  fn verdict_texts_cover_all_outcomes() {
    let e = ex(7, 5, Operation::Addition, 12);
    let right = grade(&e, Some("12"));
    assert!(right.correct);
    assert_eq!(right.text, "Well done");

    let wrong = grade(&e, Some("13"));
    assert!(!wrong.correct);
    assert_eq!(wrong.text, "Try again (expected 12)");
    assert_eq!(wrong.submitted, Some(13));

    let blank = grade(&e, None);
    assert!(!blank.correct);
    assert_eq!(blank.text, "Not answered");
    assert_eq!(blank.submitted, None);
  }

  #[test]
  fn tampered_stored_result_is_ignored() {
    // Stored result says 99 but grading recomputes 12.
    let e = ex(7, 5, Operation::Addition, 99);
    let verdict = grade(&e, Some("12"));
    assert!(verdict.correct);
    assert_eq!(verdict.expected, 12);
  }

  #[test]
  fn division_grades_the_quotient() {
    let e = ex(120, 5, Operation::Division, 24);
    assert!(grade(&e, Some("24")).correct);
    assert!(!grade(&e, Some("25")).correct);
  }

  #[test]
  fn missing_answers_count_against_the_total() {
    let ws = sheet(vec![
      WorksheetCategory {
        op: Operation::Addition,
        exercises: vec![ex(1, 1, Operation::Addition, 2), ex(2, 2, Operation::Addition, 4)],
      },
      WorksheetCategory {
        op: Operation::Subtraction,
        exercises: vec![ex(5, 3, Operation::Subtraction, 2)],
      },
    ]);
    // Only the first category gets answers, and only one of them.
    let graded = grade_worksheet(&ws, &[vec![Some("2".to_string())]]);
    assert_eq!(graded.total, 3);
    assert_eq!(graded.correct, 1);
    assert_eq!(graded.score, 33);
    assert_eq!(graded.categories[0].results[1].text, "Not answered");
    assert_eq!(graded.categories[1].results[0].text, "Not answered");
  }

  #[test]
  fn extra_answers_are_ignored() {
    let ws = sheet(vec![WorksheetCategory {
      op: Operation::Addition,
      exercises: vec![ex(1, 1, Operation::Addition, 2)],
    }]);
    let answers = vec![
      vec![Some("2".to_string()), Some("999".to_string())],
      vec![Some("1".to_string())],
    ];
    let graded = grade_worksheet(&ws, &answers);
    assert_eq!(graded.total, 1);
    assert_eq!(graded.correct, 1);
    assert_eq!(graded.score, 100);
  }
}
