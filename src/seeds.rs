//! Built-in exercises so the service is useful without a course config.

use crate::domain::{ExerciseDefinition, Pair};
use crate::resolver::TaskType;

pub fn seed_exercises() -> Vec<ExerciseDefinition> {
  let mut gap = ExerciseDefinition::new("p2-s3-gap", TaskType::from_tag("gap_fill"));
  gap.instruction = "Complete each sentence with a word from the bank.".into();
  gap.templates = vec![
    "1. The advert is ___.".into(),
    "2. It targets young ___ and their ___.".into(),
  ];
  gap.word_bank = vec!["promotional".into(), "adults".into(), "parents".into(), "neutral".into()];
  gap.correct_answers = vec!["promotional".into(), "adults | parents".into()];

  let mut remedial_gap = ExerciseDefinition::new("p2-s3-remedial-a1", TaskType::from_tag("fill_gaps"));
  remedial_gap.instruction = "Fill the gap with the persuasive appeal being used.".into();
  remedial_gap.templates = vec![
    "Trust me, I'm a doctor. This is ___.".into(),
    "Think of the children! This is ___.".into(),
  ];
  remedial_gap.word_bank = vec!["ethos".into(), "pathos".into(), "logos".into()];
  remedial_gap.correct_answers = vec!["ethos".into(), "pathos".into()];

  let mut matching = ExerciseDefinition::new("p2-s1-match", TaskType::from_tag("drag_and_drop"));
  matching.instruction = "Drag each appeal onto its meaning.".into();
  matching.pairs = vec![
    Pair { term: "ethos".into(), definition: "credibility of the speaker".into() },
    Pair { term: "pathos".into(), definition: "appeal to emotion".into() },
    Pair { term: "logos".into(), definition: "appeal to logic".into() },
  ];

  let mut listening = ExerciseDefinition::new("p3-s1-listen", TaskType::from_tag("listening_matching"));
  listening.instruction = "Listen to the announcement, then match each place to its time.".into();
  listening.audio_script =
    Some("The museum opens at nine. The library opens at ten. The gym opens at six.".into());
  listening.pairs = vec![
    Pair { term: "museum".into(), definition: "nine".into() },
    Pair { term: "library".into(), definition: "ten".into() },
    Pair { term: "gym".into(), definition: "six".into() },
  ];

  let mut reflection = ExerciseDefinition::new("p2-s4-reflect", TaskType::from_tag("story_reflection"));
  reflection.instruction = "Which appeals does the speaker use? Explain briefly.".into();
  reflection.correct_answers = vec!["The speaker uses ethos, pathos and logos.".into()];

  let mut expansion = ExerciseDefinition::new("p1-s2-expand", TaskType::from_tag("sentence_expansion"));
  expansion.instruction = "Make each sentence longer by adding when, where or why.".into();
  expansion.templates = vec!["The dog barked.".into(), "We left early.".into()];
  expansion.min_answer_length = Some(15);

  let mut writing = ExerciseDefinition::new("p4-s2-email", TaskType::from_tag("writing"));
  writing.instruction = "Write a short email to your manager asking for a day off.".into();
  writing.ai_evaluation_prompt =
    Some("Check tone (polite, professional), a clear request, and a reason for the day off.".into());

  vec![gap, remedial_gap, matching, listening, reflection, expansion, writing]
}
