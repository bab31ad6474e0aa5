//! Answer normalization and scoring.
//!
//! Three verdict modes, picked per answer slot:
//!   - exact: normalized equality against one literal reference;
//!   - keyword overlap: share of reference keywords found in the answer;
//!   - length gate: open answers with no reference, accepted above a minimum length.
//!
//! Everything here is pure and synchronous.

use serde::{Deserialize, Serialize};

use crate::domain::{count_blanks, AnswerMap, ExerciseDefinition, ScoreResult};
use crate::resolver::{resolve, Strategy};

pub const DEFAULT_MIN_ANSWER_LENGTH: usize = 10;
pub const KEYWORD_CORRECT_RATIO: f64 = 0.8;
pub const KEYWORD_ACCEPTABLE_RATIO: f64 = 0.5;

const SENTENCE_PUNCTUATION: &[char] = &['.', ',', '!', '?'];
const QUOTES: &[char] = &['\'', '"', '`', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}'];

/// Options for `normalize_answer_text`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
  /// Also drop apostrophes and quotes (the stricter service-side comparison).
  pub strip_quotes: bool,
}

impl NormalizeOptions {
  pub const LOCAL: Self = Self { strip_quotes: false };
  pub const STRICT: Self = Self { strip_quotes: true };
}

/// The one normalizer every scoring path goes through.
pub fn normalize_answer_text(input: &str, options: NormalizeOptions) -> String {
  let lowered = strip_ordinal_prefix(input.trim_start()).to_lowercase();
  let kept: String = lowered
    .chars()
    .filter(|c| !SENTENCE_PUNCTUATION.contains(c))
    .filter(|c| !(options.strip_quotes && QUOTES.contains(c)))
    .collect();
  kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop a numbered-list artifact such as `"3. "` (`^\d+\.\s*`).
fn strip_ordinal_prefix(s: &str) -> &str {
  let digits = s.len() - s.trim_start_matches(|c: char| c.is_ascii_digit()).len();
  if digits == 0 {
    return s;
  }
  match s[digits..].strip_prefix('.') {
    Some(rest) => rest.trim_start(),
    None => s,
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
  Correct,
  /// Paraphrase that keeps at least half the keywords; counts toward the score.
  Acceptable,
  Incorrect,
  /// No reference to judge against; excluded from the total.
  Ungraded,
}

impl Verdict {
  pub fn is_accepted(&self) -> bool {
    matches!(self, Verdict::Correct | Verdict::Acceptable)
  }
}

pub fn exact_verdict(user: &str, reference: &str) -> Verdict {
  let reference = normalize_answer_text(reference, NormalizeOptions::LOCAL);
  if reference.is_empty() {
    return Verdict::Ungraded;
  }
  if normalize_answer_text(user, NormalizeOptions::LOCAL) == reference {
    Verdict::Correct
  } else {
    Verdict::Incorrect
  }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct KeywordOverlap {
  pub matched: usize,
  pub total: usize,
  pub fraction: f64,
  pub is_correct: bool,
  pub is_acceptable: bool,
}

/// Distinct normalized words longer than two characters.
pub fn reference_keywords(reference: &str) -> Vec<String> {
  let normalized = normalize_answer_text(reference, NormalizeOptions::STRICT);
  let mut out: Vec<String> = Vec::new();
  for word in normalized.split_whitespace() {
    if word.chars().count() > 2 && !out.iter().any(|w| w == word) {
      out.push(word.to_string());
    }
  }
  out
}

pub fn keyword_overlap<S: AsRef<str>>(user: &str, keywords: &[S]) -> KeywordOverlap {
  let answer = normalize_answer_text(user, NormalizeOptions::STRICT);
  let total = keywords.len();
  let matched = keywords
    .iter()
    .filter(|k| {
      let k = normalize_answer_text(k.as_ref(), NormalizeOptions::STRICT);
      !k.is_empty() && answer.contains(&k)
    })
    .count();
  let fraction = if total == 0 { 0.0 } else { matched as f64 / total as f64 };
  KeywordOverlap {
    matched,
    total,
    fraction,
    is_correct: total > 0 && fraction >= KEYWORD_CORRECT_RATIO,
    is_acceptable: total > 0 && fraction >= KEYWORD_ACCEPTABLE_RATIO,
  }
}

/// Keyword-overlap verdict; references without any keyword fall back to exact comparison.
pub fn keyword_verdict(user: &str, reference: &str) -> Verdict {
  let keywords = reference_keywords(reference);
  if keywords.is_empty() {
    return exact_verdict(user, reference);
  }
  let overlap = keyword_overlap(user, keywords.as_slice());
  if overlap.is_correct {
    Verdict::Correct
  } else if overlap.is_acceptable {
    Verdict::Acceptable
  } else {
    Verdict::Incorrect
  }
}

/// Strictly-greater length check on the trimmed answer, in characters.
pub fn passes_length_gate(user: &str, min_length: usize) -> bool {
  user.trim().chars().count() > min_length
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackTone {
  Excellent,
  Acceptable,
  NeedsPractice,
}

impl FeedbackTone {
  pub fn for_percentage(percentage: f64) -> Self {
    if percentage >= 80.0 {
      FeedbackTone::Excellent
    } else if percentage >= 50.0 {
      FeedbackTone::Acceptable
    } else {
      FeedbackTone::NeedsPractice
    }
  }

  pub fn message(&self) -> &'static str {
    match self {
      FeedbackTone::Excellent => "Excellent work!",
      FeedbackTone::Acceptable => "Good effort, a few answers need another look.",
      FeedbackTone::NeedsPractice => "Keep practicing, review the lesson and try again.",
    }
  }
}

pub fn score_from_counts(correct: usize, total: usize) -> ScoreResult {
  if total == 0 {
    return ScoreResult::ungraded();
  }
  let percentage = 100.0 * correct as f64 / total as f64;
  ScoreResult {
    score: percentage.round() as u32,
    correct,
    total,
    percentage,
    graded: true,
    ai_result: None,
  }
}

pub fn aggregate<'a, I>(verdicts: I) -> ScoreResult
where
  I: IntoIterator<Item = &'a Verdict>,
{
  let (mut correct, mut total) = (0, 0);
  for v in verdicts {
    if *v == Verdict::Ungraded {
      continue;
    }
    total += 1;
    if v.is_accepted() {
      correct += 1;
    }
  }
  score_from_counts(correct, total)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotMode {
  Exact,
  /// Keyword overlap when a reference exists, otherwise the length gate.
  FreeText,
}

/// One answer the learner is expected to give.
#[derive(Clone, Debug, PartialEq)]
pub struct AnswerSlot {
  pub key: String,
  pub reference: Option<String>,
  pub mode: SlotMode,
}

/// Answer slots for an exercise under the given strategy, in display order.
pub fn answer_slots(exercise: &ExerciseDefinition, strategy: Strategy) -> Vec<AnswerSlot> {
  match strategy {
    Strategy::Matching | Strategy::ListeningMatching => exercise
      .pairs
      .iter()
      .enumerate()
      .map(|(i, p)| AnswerSlot { key: format!("m_{i}"), reference: Some(p.definition.clone()), mode: SlotMode::Exact })
      .collect(),
    Strategy::GapFillSingle | Strategy::GapFillStory | Strategy::DialogueCompletion => blank_slots(exercise),
    Strategy::Default if exercise.has_blanks() => blank_slots(exercise),
    _ => free_text_slots(exercise),
  }
}

fn blank_slots(exercise: &ExerciseDefinition) -> Vec<AnswerSlot> {
  let mut slots = Vec::new();
  for (t, template) in exercise.templates.iter().enumerate() {
    for b in 0..count_blanks(template) {
      slots.push(AnswerSlot {
        key: format!("g_{t}_{b}"),
        reference: exercise.reference_for_blank(t, b),
        mode: SlotMode::Exact,
      });
    }
  }
  slots
}

fn free_text_slots(exercise: &ExerciseDefinition) -> Vec<AnswerSlot> {
  let reference = |i: usize| {
    exercise.correct_answers.get(i).map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
  };
  if exercise.templates.is_empty() {
    return vec![AnswerSlot { key: "t_0".into(), reference: reference(0), mode: SlotMode::FreeText }];
  }
  (0..exercise.templates.len())
    .map(|i| AnswerSlot { key: format!("t_{i}"), reference: reference(i), mode: SlotMode::FreeText })
    .collect()
}

pub fn judge_slot(slot: &AnswerSlot, answer: &str, min_length: usize) -> Verdict {
  match (slot.mode, slot.reference.as_deref()) {
    (SlotMode::Exact, Some(reference)) => exact_verdict(answer, reference),
    (SlotMode::Exact, None) => Verdict::Ungraded,
    (SlotMode::FreeText, Some(reference)) => keyword_verdict(answer, reference),
    (SlotMode::FreeText, None) => {
      if passes_length_gate(answer, min_length) { Verdict::Correct } else { Verdict::Incorrect }
    }
  }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ItemVerdict {
  pub key: String,
  pub verdict: Verdict,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScoredExercise {
  pub result: ScoreResult,
  pub items: Vec<ItemVerdict>,
}

/// Score an answer map against an exercise. Missing answers count as empty strings.
pub fn score_exercise(exercise: &ExerciseDefinition, answers: &AnswerMap, default_min_length: usize) -> ScoredExercise {
  let strategy = resolve(&exercise.task_type);
  let min_length = exercise.min_answer_length.unwrap_or(default_min_length);
  let items: Vec<ItemVerdict> = answer_slots(exercise, strategy)
    .iter()
    .map(|slot| {
      let answer = answers.get(&slot.key).map(String::as_str).unwrap_or("");
      ItemVerdict { key: slot.key.clone(), verdict: judge_slot(slot, answer, min_length) }
    })
    .collect();
  let result = aggregate(items.iter().map(|i| &i.verdict));
  ScoredExercise { result, items }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Pair;
  use crate::resolver::TaskType;
  use pretty_assertions::assert_eq;

  fn gap_exercise() -> ExerciseDefinition {
    let mut ex = ExerciseDefinition::new("gap", TaskType::GapFill);
    ex.templates = vec!["1. The ad is ___.".into(), "It targets ___ and ___.".into()];
    ex.correct_answers = vec!["promotional".into(), "teens | parents".into()];
    ex
  }

  #[test]
  fn normalizes_numbering_case_and_punctuation() {
    let a = normalize_answer_text("1. The Ad Is Promotional.", NormalizeOptions::LOCAL);
    let b = normalize_answer_text("the ad is promotional", NormalizeOptions::LOCAL);
    assert_eq!(a, "the ad is promotional");
    assert_eq!(a, b);
    assert_eq!(normalize_answer_text("  12.   Yes, really!? ", NormalizeOptions::LOCAL), "yes really");
  }

  #[test]
  fn normalization_is_idempotent() {
    for s in ["3. Don't stop!", "Hello,   World", "", "   ", "\u{201C}Quoted\u{201D}"] {
      for opts in [NormalizeOptions::LOCAL, NormalizeOptions::STRICT] {
        let once = normalize_answer_text(s, opts);
        assert_eq!(normalize_answer_text(&once, opts), once);
      }
    }
  }

  #[test]
  fn ordinal_prefix_needs_a_dot() {
    assert_eq!(normalize_answer_text("42 apples", NormalizeOptions::LOCAL), "42 apples");
    assert_eq!(normalize_answer_text("7.apples", NormalizeOptions::LOCAL), "apples");
  }

  #[test]
  fn quotes_only_stripped_in_strict_mode() {
    assert_eq!(normalize_answer_text("It's fine.", NormalizeOptions::LOCAL), "it's fine");
    assert_eq!(normalize_answer_text("It's \"fine\".", NormalizeOptions::STRICT), "its fine");
    assert_eq!(normalize_answer_text("It\u{2019}s fine", NormalizeOptions::STRICT), "its fine");
  }

  #[test]
  fn exact_mode() {
    assert_eq!(exact_verdict("1. The Ad Is Promotional.", "the ad is promotional"), Verdict::Correct);
    assert_eq!(exact_verdict("the ad is informative", "the ad is promotional"), Verdict::Incorrect);
    assert_eq!(exact_verdict("anything", "  "), Verdict::Ungraded);
  }

  #[test]
  fn keyword_two_of_three_is_acceptable_not_correct() {
    let keywords = ["ethos", "pathos", "logos"];
    let overlap = keyword_overlap("The speaker leans on ethos and pathos throughout.", &keywords);
    assert_eq!(overlap.matched, 2);
    assert!(!overlap.is_correct);
    assert!(overlap.is_acceptable);

    let all = keyword_overlap("ethos, pathos, logos", &keywords);
    assert!(all.is_correct);

    let one = keyword_overlap("only logos", &keywords);
    assert!(!one.is_acceptable);
  }

  #[test]
  fn keyword_verdict_uses_words_longer_than_two_chars() {
    assert_eq!(reference_keywords("It is an appeal to emotion"), vec!["appeal", "emotion"]);
    assert_eq!(keyword_verdict("an emotional appeal", "It is an appeal to emotion"), Verdict::Correct);
    assert_eq!(keyword_verdict("no idea", "It is an appeal to emotion"), Verdict::Incorrect);
    assert_eq!(keyword_verdict("Go", "go"), Verdict::Correct);
  }

  #[test]
  fn length_gate_is_strictly_greater() {
    assert!(!passes_length_gate("abcdefghij", 10));
    assert!(passes_length_gate("abcdefghijk", 10));
    assert!(!passes_length_gate("   abcdefghij   ", 10));
  }

  #[test]
  fn aggregation_rounds_and_bands() {
    let r = score_from_counts(3, 4);
    assert_eq!(r.score, 75);
    assert_eq!(FeedbackTone::for_percentage(r.percentage), FeedbackTone::Acceptable);
    assert_eq!(score_from_counts(2, 3).score, 67);
    assert_eq!(FeedbackTone::for_percentage(80.0), FeedbackTone::Excellent);
    assert_eq!(FeedbackTone::for_percentage(49.9), FeedbackTone::NeedsPractice);
  }

  #[test]
  fn ungraded_items_are_excluded() {
    let r = aggregate(&[Verdict::Correct, Verdict::Ungraded, Verdict::Incorrect]);
    assert_eq!((r.correct, r.total, r.score), (1, 2, 50));
    let none = aggregate(&[Verdict::Ungraded]);
    assert!(!none.graded);
    assert_eq!((none.total, none.score), (0, 0));
  }

  #[test]
  fn scores_gap_fill_positionally() {
    let ex = gap_exercise();
    let answers: AnswerMap = [
      ("g_0_0", "Promotional."),
      ("g_1_0", "teens"),
      ("g_1_1", "kids"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    let scored = score_exercise(&ex, &answers, DEFAULT_MIN_ANSWER_LENGTH);
    assert_eq!(scored.result.correct, 2);
    assert_eq!(scored.result.total, 3);
    assert_eq!(scored.items[2], ItemVerdict { key: "g_1_1".into(), verdict: Verdict::Incorrect });
  }

  #[test]
  fn empty_answer_map_never_scores_full_marks() {
    let scored = score_exercise(&gap_exercise(), &AnswerMap::new(), DEFAULT_MIN_ANSWER_LENGTH);
    assert_eq!(scored.result.percentage, 0.0);

    let mut no_refs = gap_exercise();
    no_refs.correct_answers.clear();
    let scored = score_exercise(&no_refs, &AnswerMap::new(), DEFAULT_MIN_ANSWER_LENGTH);
    assert_eq!(scored.result, ScoreResult::ungraded());
  }

  #[test]
  fn matching_compares_selected_definitions() {
    let mut ex = ExerciseDefinition::new("m", TaskType::from_tag("matching"));
    ex.pairs = vec![
      Pair { term: "ethos".into(), definition: "credibility".into() },
      Pair { term: "pathos".into(), definition: "emotion".into() },
    ];
    let answers: AnswerMap =
      [("m_0".to_string(), "Credibility".to_string()), ("m_1".to_string(), "logic".to_string())].into();
    let r = score_exercise(&ex, &answers, DEFAULT_MIN_ANSWER_LENGTH).result;
    assert_eq!((r.correct, r.total, r.score), (1, 2, 50));
  }

  #[test]
  fn open_answers_use_the_exercise_threshold() {
    let mut ex = ExerciseDefinition::new("e", TaskType::SentenceExpansion);
    ex.templates = vec!["Expand: The dog barked.".into()];
    ex.min_answer_length = Some(15);
    let short: AnswerMap = [("t_0".to_string(), "The dog barked!".to_string())].into();
    assert_eq!(score_exercise(&ex, &short, 3).result.correct, 0);
    let long: AnswerMap = [("t_0".to_string(), "The big dog barked loudly.".to_string())].into();
    assert_eq!(score_exercise(&ex, &long, 3).result.correct, 1);
  }

  #[test]
  fn default_strategy_scores_blanks_when_present() {
    let mut ex = ExerciseDefinition::new("d", TaskType::from_tag("mystery"));
    ex.templates = vec!["Pick ___.".into()];
    ex.correct_answers = vec!["one".into()];
    let slots = answer_slots(&ex, Strategy::Default);
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].key, "g_0_0");
    assert_eq!(slots[0].mode, SlotMode::Exact);
  }

  #[test]
  fn default_strategy_without_blanks_scores_like_free_text() {
    let mut ex = ExerciseDefinition::new("d", TaskType::from_tag("mystery"));
    ex.templates = vec!["Describe the advert.".into(), "Who is it for?".into()];
    ex.correct_answers = vec![String::new(), "young adults and parents".into()];
    let slots = answer_slots(&ex, Strategy::Default);
    let keys: Vec<&str> = slots.iter().map(|s| s.key.as_str()).collect();
    assert_eq!(keys, vec!["t_0", "t_1"]);
    assert!(slots.iter().all(|s| s.mode == SlotMode::FreeText));

    let answers: AnswerMap = [
      ("t_0".to_string(), "It sells a phone.".to_string()),
      ("t_1".to_string(), "Parents and young adults".to_string()),
    ]
    .into();
    let scored = score_exercise(&ex, &answers, DEFAULT_MIN_ANSWER_LENGTH);
    assert_eq!(scored.items[0].verdict, Verdict::Correct);
    assert_eq!(scored.items[1].verdict, Verdict::Correct);

    ex.templates.clear();
    let slots = answer_slots(&ex, Strategy::Default);
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].key, "t_0");
    assert_eq!(slots[0].reference, None);
  }
}
