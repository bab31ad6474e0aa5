//! Task-type canonicalization and rendering-strategy resolution.
//!
//! Curriculum data and the remedial backend spell some task types differently
//! (`drag_and_drop` vs `matching`, `gap_fill` vs `fill_gaps`). Every accepted
//! spelling is translated once, in `TaskType::from_tag`, so the strategy lookup
//! in `resolve` only ever sees canonical types.

use serde::{Deserialize, Serialize};

use crate::domain::ExerciseDefinition;

/// Every tag spelling the ingestion table recognizes.
pub const KNOWN_TAGS: &[&str] = &[
  "drag_and_drop",
  "matching",
  "listening_matching",
  "listening_drag_and_drop",
  "gap_fill",
  "fill_gaps",
  "gap_fill_story",
  "story_gap_fill",
  "negotiation_debate",
  "debate",
  "dialogue_completion",
  "dialogue_decoding",
  "writing",
  "free_writing",
  "sentence_expansion",
  "story_reflection",
  "team_planning",
];

/// Canonical exercise type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskType {
  DragAndDrop,
  ListeningMatching,
  GapFill,
  GapFillStory,
  NegotiationDebate,
  DialogueCompletion,
  DialogueDecoding,
  Writing,
  SentenceExpansion,
  StoryReflection,
  TeamPlanning,
  /// Tag outside the vocabulary, kept verbatim.
  Other(String),
}

impl TaskType {
  /// Ingestion-boundary translation table.
  pub fn from_tag(tag: &str) -> Self {
    let trimmed = tag.trim();
    match trimmed.to_ascii_lowercase().as_str() {
      "drag_and_drop" | "matching" => Self::DragAndDrop,
      "listening_matching" | "listening_drag_and_drop" => Self::ListeningMatching,
      "gap_fill" | "fill_gaps" => Self::GapFill,
      "gap_fill_story" | "story_gap_fill" => Self::GapFillStory,
      "negotiation_debate" | "debate" => Self::NegotiationDebate,
      "dialogue_completion" => Self::DialogueCompletion,
      "dialogue_decoding" => Self::DialogueDecoding,
      "writing" | "free_writing" => Self::Writing,
      "sentence_expansion" => Self::SentenceExpansion,
      "story_reflection" => Self::StoryReflection,
      "team_planning" => Self::TeamPlanning,
      _ => Self::Other(trimmed.to_string()),
    }
  }

  pub fn as_tag(&self) -> &str {
    match self {
      Self::DragAndDrop => "drag_and_drop",
      Self::ListeningMatching => "listening_matching",
      Self::GapFill => "gap_fill",
      Self::GapFillStory => "gap_fill_story",
      Self::NegotiationDebate => "negotiation_debate",
      Self::DialogueCompletion => "dialogue_completion",
      Self::DialogueDecoding => "dialogue_decoding",
      Self::Writing => "writing",
      Self::SentenceExpansion => "sentence_expansion",
      Self::StoryReflection => "story_reflection",
      Self::TeamPlanning => "team_planning",
      Self::Other(tag) => tag,
    }
  }

  /// Listening-prefix convention, including unknown `listening_*` tags.
  pub fn is_listening(&self) -> bool {
    match self {
      Self::ListeningMatching => true,
      Self::Other(tag) => tag.to_ascii_lowercase().starts_with("listening"),
      _ => false,
    }
  }
}

impl From<String> for TaskType {
  fn from(tag: String) -> Self {
    Self::from_tag(&tag)
  }
}

impl From<TaskType> for String {
  fn from(t: TaskType) -> Self {
    t.as_tag().to_string()
  }
}

/// Interactive rendering strategy chosen for an exercise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
  Matching,
  ListeningMatching,
  GapFillSingle,
  GapFillStory,
  NegotiationDebate,
  DialogueCompletion,
  DialogueDecoding,
  FreeWriting,
  SentenceExpansion,
  StoryReflection,
  TeamPlanning,
  Default,
}

impl Strategy {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Matching => "Matching",
      Self::ListeningMatching => "ListeningMatching",
      Self::GapFillSingle => "GapFillSingle",
      Self::GapFillStory => "GapFillStory",
      Self::NegotiationDebate => "NegotiationDebate",
      Self::DialogueCompletion => "DialogueCompletion",
      Self::DialogueDecoding => "DialogueDecoding",
      Self::FreeWriting => "FreeWriting",
      Self::SentenceExpansion => "SentenceExpansion",
      Self::StoryReflection => "StoryReflection",
      Self::TeamPlanning => "TeamPlanning",
      Self::Default => "Default",
    }
  }

  /// Strategies whose answers are open text rather than blanks or selections.
  pub fn is_free_text(&self) -> bool {
    matches!(
      self,
      Self::NegotiationDebate
        | Self::DialogueDecoding
        | Self::FreeWriting
        | Self::SentenceExpansion
        | Self::StoryReflection
        | Self::TeamPlanning
    )
  }
}

impl std::fmt::Display for Strategy {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Pure lookup: canonical type to strategy.
pub fn resolve(task_type: &TaskType) -> Strategy {
  match task_type {
    TaskType::DragAndDrop => Strategy::Matching,
    TaskType::ListeningMatching => Strategy::ListeningMatching,
    TaskType::GapFill => Strategy::GapFillSingle,
    TaskType::GapFillStory => Strategy::GapFillStory,
    TaskType::NegotiationDebate => Strategy::NegotiationDebate,
    TaskType::DialogueCompletion => Strategy::DialogueCompletion,
    TaskType::DialogueDecoding => Strategy::DialogueDecoding,
    TaskType::Writing => Strategy::FreeWriting,
    TaskType::SentenceExpansion => Strategy::SentenceExpansion,
    TaskType::StoryReflection => Strategy::StoryReflection,
    TaskType::TeamPlanning => Strategy::TeamPlanning,
    TaskType::Other(_) => Strategy::Default,
  }
}

/// Resolve a raw tag as it arrives from curriculum data or the remedial backend.
pub fn resolve_tag(tag: &str) -> Strategy {
  resolve(&TaskType::from_tag(tag))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
  Ready,
  /// The fields the strategy needs are missing; render a "no content available" state.
  NoContent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Resolution {
  pub strategy: Strategy,
  pub audio_gated: bool,
  pub content: ContentStatus,
}

pub fn resolve_exercise(exercise: &ExerciseDefinition) -> Resolution {
  let strategy = resolve(&exercise.task_type);
  let has_content = match strategy {
    Strategy::Matching | Strategy::ListeningMatching => !exercise.pairs.is_empty(),
    Strategy::GapFillSingle | Strategy::GapFillStory | Strategy::DialogueCompletion => exercise.has_blanks(),
    _ => true,
  };
  Resolution {
    strategy,
    audio_gated: exercise.task_type.is_listening() && exercise.has_audio(),
    content: if has_content { ContentStatus::Ready } else { ContentStatus::NoContent },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Pair;

  #[test]
  fn every_known_tag_resolves_to_a_concrete_strategy() {
    for tag in KNOWN_TAGS {
      let first = resolve_tag(tag);
      assert_ne!(first, Strategy::Default, "{tag} fell through");
      assert_eq!(first, resolve_tag(tag));
    }
  }

  #[test]
  fn unknown_tags_resolve_to_default() {
    for tag in ["", "quiz", "timed_word_race", "gap-fill"] {
      assert_eq!(resolve_tag(tag), Strategy::Default);
    }
  }

  #[test]
  fn synonym_spellings_share_a_strategy() {
    assert_eq!(resolve_tag("fill_gaps"), resolve_tag("gap_fill"));
    assert_eq!(resolve_tag("matching"), resolve_tag("drag_and_drop"));
    assert_eq!(TaskType::from_tag("fill_gaps"), TaskType::GapFill);
    assert_eq!(TaskType::from_tag("matching").as_tag(), "drag_and_drop");
  }

  #[test]
  fn tags_are_trimmed_and_case_folded() {
    assert_eq!(resolve_tag("  Gap_Fill "), Strategy::GapFillSingle);
    assert_eq!(TaskType::from_tag(" Mystery ").as_tag(), "Mystery");
  }

  #[test]
  fn audio_gate_needs_listening_prefix_and_script() {
    let mut ex = ExerciseDefinition::new("l1", TaskType::ListeningMatching);
    ex.pairs = vec![Pair { term: "a".into(), definition: "b".into() }];
    assert!(!resolve_exercise(&ex).audio_gated);

    ex.audio_script = Some("Listen carefully.".into());
    let r = resolve_exercise(&ex);
    assert!(r.audio_gated);
    assert_eq!(r.strategy, Strategy::ListeningMatching);

    let mut other = ExerciseDefinition::new("l2", TaskType::from_tag("listening_gap_fill"));
    other.audio_script = Some("script".into());
    let r = resolve_exercise(&other);
    assert_eq!(r.strategy, Strategy::Default);
    assert!(r.audio_gated);

    let mut writing = ExerciseDefinition::new("w", TaskType::Writing);
    writing.audio_script = Some("script".into());
    assert!(!resolve_exercise(&writing).audio_gated);
  }

  #[test]
  fn missing_fields_report_no_content() {
    let matching = ExerciseDefinition::new("m", TaskType::DragAndDrop);
    assert_eq!(resolve_exercise(&matching).content, ContentStatus::NoContent);

    let mut gap = ExerciseDefinition::new("g", TaskType::GapFill);
    gap.templates = vec!["no blank".into()];
    assert_eq!(resolve_exercise(&gap).content, ContentStatus::NoContent);

    let fallback = ExerciseDefinition::new("d", TaskType::from_tag("mystery"));
    assert_eq!(resolve_exercise(&fallback).content, ContentStatus::Ready);
  }
}
