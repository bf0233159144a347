use crate::schedule::analysis::{CompletionAnalysis, Workload};
use crate::schedule::{GenerationRequest, LearningPath, Period, Subject, WeekSchedule};
use std::collections::BTreeMap;

/// Which entry point a prompt belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Initial,
    Modification,
    Quiz,
    NextPeriod,
}

impl PromptKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptKind::Initial => "initial",
            PromptKind::Modification => "modification",
            PromptKind::Quiz => "quiz",
            PromptKind::NextPeriod => "next_period",
        }
    }
}

const SCHEDULE_SHAPE: &str = r#"{
  "schedule": [
    {
      "day": "Monday",
      "studyBlocks": [
        {
          "subject": "DSA",
          "topic": "Arrays and Two Pointers",
          "duration": 90,
          "completed": false,
          "mcqPassed": false
        }
      ],
      "totalMinutes": 90
    }
  ]
}"#;

const QUIZ_SHAPE: &str = r#"{
  "questions": [
    {
      "question": "What is the time complexity of...",
      "options": ["O(n)", "O(log n)", "O(n^2)", "O(1)"],
      "correctAnswer": 0,
      "explanation": "Brief explanation of why this is correct"
    }
  ]
}"#;

const ALL_DAYS: &str = "Monday, Tuesday, Wednesday, Thursday, Friday, Saturday, Sunday";

fn split_rule(path: &LearningPath) -> String {
    match path.secondary_name() {
        Some(secondary) => format!("Split time between DSA and {}", secondary),
        None => "Only DSA topics".to_string(),
    }
}

/// Even per-day share of the weekly budget, as a prompt hint only
fn minutes_per_day(weekly_hours: f64) -> u64 {
    if weekly_hours.is_finite() && weekly_hours > 0.0 {
        (weekly_hours * 60.0 / 7.0).floor() as u64
    } else {
        0
    }
}

pub fn build_schedule_prompt(request: &GenerationRequest) -> String {
    format!(
        r#"You are a study schedule generator. Create a 7-day weekly schedule.

Learning Path: {path}
Weekly Hours: {hours}
Preferred Days: {days}

CRITICAL RULES:
1. DSA topic MUST appear EVERY single day
2. {split}
3. 2-3 study blocks per day
4. Each day should have {per_day} minutes total
5. Return ONLY valid JSON, no explanations

Return this EXACT structure:
{shape}

Generate for all 7 days: {all_days}."#,
        path = request.learning_path,
        hours = request.weekly_hours,
        days = request.preferred_day_names(),
        split = split_rule(&request.learning_path),
        per_day = minutes_per_day(request.weekly_hours),
        shape = SCHEDULE_SHAPE,
        all_days = ALL_DAYS,
    )
}

pub fn build_modification_prompt(
    current: &WeekSchedule,
    modification_request: &str,
    learning_path: &LearningPath,
) -> Result<String, serde_json::Error> {
    let current_json = serde_json::to_string_pretty(&current.to_document())?;
    Ok(format!(
        r#"You are a study schedule modifier. Modify this schedule based on user request.

Current Schedule: {current_json}

User Request: "{modification}"

Learning Path: {path}

RULES:
1. Keep DSA in every day
2. Maintain the {path} focus
3. Apply the user's modification
4. Return all 7 days: {all_days}
5. Return ONLY valid JSON, no explanations

Return ONLY this JSON structure:
{shape}"#,
        current_json = current_json,
        modification = modification_request.trim(),
        path = learning_path,
        all_days = ALL_DAYS,
        shape = SCHEDULE_SHAPE,
    ))
}

pub fn build_quiz_prompt(topic: &str, subject: &str) -> String {
    format!(
        r#"Generate 4 high-quality multiple-choice questions about "{topic}" in {subject}.

Requirements:
- Exactly 4 questions
- Each question should test real understanding, not just memorization
- Include practical scenarios and code concepts
- Exactly 4 options per question, plausible but with one clear correct answer
- correctAnswer is the 0-based index of the correct option
- Provide brief explanations

Return ONLY this JSON structure:
{shape}"#,
        topic = topic,
        subject = subject,
        shape = QUIZ_SHAPE,
    )
}

fn subject_counts(counts: &BTreeMap<Subject, usize>) -> String {
    if counts.is_empty() {
        return "none".to_string();
    }
    counts
        .iter()
        .map(|(subject, n)| format!("{} ({})", subject, n))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn build_next_schedule_prompt(
    request: &GenerationRequest,
    analysis: &CompletionAnalysis,
    period: Period,
) -> String {
    let strategy = match analysis.workload() {
        Workload::Reduce => "- Reduce workload - user is struggling",
        Workload::MaintainOrIncrease => "- Maintain or slightly increase difficulty",
    };

    format!(
        r#"Generate an optimized {period} study schedule based on past performance.

User Profile:
- Learning Path: {path}
- Weekly Hours: {hours}
- Preferred Days: {days}

Past Performance Analysis:
- Completion Rate: {rate}%
- Topics Completed: {completed}
- Topics Skipped: {skipped}
- Strong Subjects: {strong}
- Weak Subjects: {weak}

Optimization Strategy:
{strategy}
- Focus more on weak areas
- Keep DSA every day

Return ONLY this JSON structure for all 7 days ({all_days}):
{shape}"#,
        period = period.as_str(),
        path = request.learning_path,
        hours = request.weekly_hours,
        days = request.preferred_day_names(),
        rate = analysis.completion_rate,
        completed = analysis.completed_count,
        skipped = analysis.skipped_count,
        strong = subject_counts(&analysis.strong_subjects),
        weak = subject_counts(&analysis.weak_subjects),
        strategy = strategy,
        all_days = ALL_DAYS,
        shape = SCHEDULE_SHAPE,
    )
}
