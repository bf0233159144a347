//! Deterministic local schedule generation, used whenever the generative
//! path cannot produce a trustworthy result.

use super::{
    normalizer, DaySchedule, GenerationRequest, StudyBlock, Subject, WeekSchedule, Weekday,
    MAX_DAY_MINUTES,
};

const MIN_DAY_MINUTES: u32 = 30;
const MAX_PRIMARY_MINUTES: u32 = 90;
const PRIMARY_SHARE: f64 = 0.6;
const SECOND_BLOCK_THRESHOLD: u32 = 20;
const SECOND_DSA_TOPIC_OFFSET: usize = 3;
const REVIEW_TOPIC: &str = "Quick Practice & Review";

const DSA_TOPICS: &[&str] = &[
    "Array Manipulation & Two Pointers",
    "String Algorithms & Manipulation",
    "Linked Lists (Operations & Problems)",
    "Stacks & Queues (Applications)",
    "Trees & Binary Tree Traversals",
    "Graphs (BFS/DFS Intro)",
    "Hash Maps & Hash Tables",
    "Recursion & Backtracking",
    "Dynamic Programming Basics",
    "Sorting & Searching Algorithms",
];

const WEB_TOPICS: &[&str] = &[
    "HTML Semantics & Accessibility",
    "CSS Layouts: Flexbox & Grid",
    "JavaScript Fundamentals",
    "DOM Manipulation & Events",
    "Async JavaScript & Promises",
    "React Basics & Components",
    "State Management",
    "API Integration",
];

const ANDROID_TOPICS: &[&str] = &[
    "Android Studio & Project Setup",
    "Layouts & Views",
    "Activity Lifecycle",
    "Intents & Navigation",
    "RecyclerView & Adapters",
    "Data Persistence",
];

const AI_ML_TOPICS: &[&str] = &[
    "Python for ML & Libraries",
    "Data Preprocessing Techniques",
    "Supervised Learning Basics",
    "Neural Networks Intro",
    "Model Evaluation",
];

pub fn topic_pool(subject: Subject) -> &'static [&'static str] {
    match subject {
        Subject::Dsa => DSA_TOPICS,
        Subject::WebDevelopment => WEB_TOPICS,
        Subject::AndroidDevelopment => ANDROID_TOPICS,
        Subject::AiMl => AI_ML_TOPICS,
    }
}

/// Deterministic topic choice: `pool[index mod len]`
pub fn pick_topic(subject: Subject, index: usize) -> &'static str {
    let pool = topic_pool(subject);
    pool[index % pool.len()]
}

/// Minutes for a preferred day and for any other day
pub fn daily_allocation(weekly_hours: f64, preferred_count: usize) -> (u32, u32) {
    let hours = if weekly_hours.is_finite() && weekly_hours > 0.0 {
        weekly_hours
    } else {
        0.0
    };
    let total_minutes = hours * 60.0;
    let per_preferred = (total_minutes / preferred_count.max(1) as f64).floor();
    let per_preferred = (per_preferred.min(MAX_DAY_MINUTES as f64) as u32).max(MIN_DAY_MINUTES);
    let per_other = (per_preferred / 2).max(MIN_DAY_MINUTES);
    (per_preferred, per_other)
}

/// Build a complete week from the request alone. Pure and infallible; identical
/// requests always produce identical schedules.
pub fn synthesize(request: &GenerationRequest) -> WeekSchedule {
    // No preference means every day is preferred.
    let preferred: &[Weekday] = if request.preferred_days.is_empty() {
        &Weekday::ALL
    } else {
        &request.preferred_days
    };
    let (per_preferred, per_other) = daily_allocation(request.weekly_hours, preferred.len());
    let secondary = request.learning_path.secondary_subject();

    let days = Weekday::ALL
        .iter()
        .map(|&day| {
            let day_minutes = if preferred.contains(&day) {
                per_preferred
            } else {
                per_other
            };
            DaySchedule::new(day, day_blocks(day.index(), day_minutes, secondary))
        })
        .collect();

    let week = WeekSchedule::from_ordered_days(days);
    tracing::info!(
        learning_path = %request.learning_path,
        weekly_hours = request.weekly_hours,
        total_minutes = week.total_minutes(),
        "Synthesized fallback schedule"
    );
    week
}

fn day_blocks(day_index: usize, day_minutes: u32, secondary: Option<Subject>) -> Vec<StudyBlock> {
    let primary_minutes =
        MAX_PRIMARY_MINUTES.min((day_minutes as f64 * PRIMARY_SHARE).floor() as u32);
    let mut blocks = vec![StudyBlock::new(
        Subject::Dsa,
        pick_topic(Subject::Dsa, day_index),
        primary_minutes,
    )];

    let remaining = day_minutes.saturating_sub(primary_minutes);
    if remaining > SECOND_BLOCK_THRESHOLD {
        let block = match secondary {
            Some(subject) => StudyBlock::new(subject, pick_topic(subject, day_index), remaining),
            None => StudyBlock::new(
                Subject::Dsa,
                pick_topic(Subject::Dsa, day_index + SECOND_DSA_TOPIC_OFFSET),
                remaining,
            ),
        };
        blocks.push(block);
    }

    let total: u32 = blocks.iter().map(|b| b.duration).sum();
    if total < MIN_DAY_MINUTES {
        blocks.push(StudyBlock::new(Subject::Dsa, REVIEW_TOPIC, MIN_DAY_MINUTES - total));
    }

    blocks
}

/// Synthesize, then run the result through the normalizer like any other source
pub fn fallback_schedule(request: &GenerationRequest) -> WeekSchedule {
    let week = synthesize(request);
    normalizer::normalize(&week.to_document())
}
