//! Repair step for untrusted schedule structures.
//!
//! Every schedule leaving the engine passes through [`normalize`], whichever
//! source produced it. The result always has seven canonical days, at least
//! one DSA block per day, positive block durations and recomputed totals.

use serde_json::{Map, Value};

use super::{DaySchedule, StudyBlock, Subject, WeekSchedule, Weekday, MAX_DAY_MINUTES};

pub const DEFAULT_DURATION: u32 = 30;
pub const DEFAULT_TOPIC: &str = "Practice";

const MISSING_DAY_TOPIC: &str = "Review & Practice";
const MISSING_DAY_MINUTES: u32 = 60;
const INJECTED_DSA_TOPIC: &str = "Daily Practice";
const INJECTED_DSA_MINUTES: u32 = 30;

/// Convert any candidate into a valid [`WeekSchedule`]. Never fails.
///
/// Accepts `{ "schedule": [...] }` or a bare array of days; anything else is
/// treated as a schedule with no days.
pub fn normalize(candidate: &Value) -> WeekSchedule {
    let entries: &[Value] = match candidate {
        Value::Object(obj) => obj
            .get("schedule")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        Value::Array(items) => items.as_slice(),
        _ => &[],
    };

    // Later entries for the same day replace earlier ones.
    let mut by_day: [Option<&Map<String, Value>>; 7] = [None; 7];
    for entry in entries {
        let Some(obj) = entry.as_object() else {
            continue;
        };
        let day = obj
            .get("day")
            .and_then(Value::as_str)
            .and_then(Weekday::parse_loose);
        match day {
            Some(day) => by_day[day.index()] = Some(obj),
            None => tracing::debug!(day = ?obj.get("day"), "Dropping schedule entry with unknown day"),
        }
    }

    let days = Weekday::ALL
        .iter()
        .map(|&day| match by_day[day.index()] {
            Some(obj) => normalize_day(day, obj),
            None => {
                tracing::debug!(day = %day, "Filling missing day with default review block");
                DaySchedule::new(
                    day,
                    vec![StudyBlock::new(Subject::Dsa, MISSING_DAY_TOPIC, MISSING_DAY_MINUTES)],
                )
            }
        })
        .collect();

    WeekSchedule::from_ordered_days(days)
}

fn normalize_day(day: Weekday, obj: &Map<String, Value>) -> DaySchedule {
    let mut blocks: Vec<StudyBlock> = obj
        .get("studyBlocks")
        .and_then(Value::as_array)
        .map(|raw| raw.iter().filter_map(Value::as_object).map(normalize_block).collect())
        .unwrap_or_default();

    if !blocks.iter().any(|b| b.subject == Subject::Dsa) {
        blocks.insert(
            0,
            StudyBlock::new(Subject::Dsa, INJECTED_DSA_TOPIC, INJECTED_DSA_MINUTES),
        );
    }

    DaySchedule::new(day, blocks)
}

/// Coerce one raw block, defaulting every missing or invalid field
pub fn normalize_block(obj: &Map<String, Value>) -> StudyBlock {
    let subject = ["subject", "subjectName", "type"]
        .iter()
        .find_map(|key| non_empty_str(obj.get(*key)))
        .map(Subject::from_keywords)
        .unwrap_or(Subject::Dsa);

    let topic = ["topic", "title"]
        .iter()
        .find_map(|key| non_empty_str(obj.get(*key)))
        .unwrap_or(DEFAULT_TOPIC)
        .to_string();

    StudyBlock {
        subject,
        topic,
        duration: coerce_duration(obj.get("duration")),
        completed: obj.get("completed").and_then(Value::as_bool).unwrap_or(false),
        mcq_passed: obj.get("mcqPassed").and_then(Value::as_bool).unwrap_or(false),
    }
}

/// Positive whole minutes from a number or numeric string, else the default.
/// Values above a full day are capped at [`MAX_DAY_MINUTES`].
pub fn coerce_duration(value: Option<&Value>) -> u32 {
    let minutes = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match minutes.map(f64::round) {
        Some(m) if m.is_finite() && m >= 1.0 => m.min(MAX_DAY_MINUTES as f64) as u32,
        _ => DEFAULT_DURATION,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_input_yields_seven_default_days() {
        let week = normalize(&json!({}));
        assert_eq!(week.days().len(), 7);
        for (day, expected) in week.days().iter().zip(Weekday::ALL) {
            assert_eq!(day.day, expected);
            assert_eq!(day.total_minutes(), 60);
            assert_eq!(day.study_blocks()[0].topic, "Review & Practice");
        }
    }

    #[test]
    fn test_block_defaults() {
        let block = normalize_block(json!({}).as_object().unwrap());
        assert_eq!(block.subject, Subject::Dsa);
        assert_eq!(block.topic, "Practice");
        assert_eq!(block.duration, 30);
        assert!(!block.completed);
        assert!(!block.mcq_passed);
    }

    #[test]
    fn test_block_alternate_keys() {
        let block = normalize_block(
            json!({ "subjectName": "web dev", "title": "Flexbox", "duration": "45" })
                .as_object()
                .unwrap(),
        );
        assert_eq!(block.subject, Subject::WebDevelopment);
        assert_eq!(block.topic, "Flexbox");
        assert_eq!(block.duration, 45);
    }

    #[test]
    fn test_coerce_duration() {
        assert_eq!(coerce_duration(Some(&json!(45))), 45);
        assert_eq!(coerce_duration(Some(&json!(44.6))), 45);
        assert_eq!(coerce_duration(Some(&json!(" 20 "))), 20);
        assert_eq!(coerce_duration(Some(&json!(0))), 30);
        assert_eq!(coerce_duration(Some(&json!(-15))), 30);
        assert_eq!(coerce_duration(Some(&json!("soon"))), 30);
        assert_eq!(coerce_duration(Some(&json!(null))), 30);
        assert_eq!(coerce_duration(None), 30);
        assert_eq!(coerce_duration(Some(&json!(3_000_000_000u64))), 1440);
        assert_eq!(coerce_duration(Some(&json!("1e12"))), 1440);
    }

    #[test]
    fn test_dsa_is_prepended() {
        let week = normalize(&json!({
            "schedule": [{
                "day": "Tuesday",
                "studyBlocks": [{ "subject": "Android Development", "topic": "Intents", "duration": 50 }]
            }]
        }));
        let tuesday = week.day(Weekday::Tuesday);
        assert_eq!(tuesday.study_blocks().len(), 2);
        assert_eq!(tuesday.study_blocks()[0].subject, Subject::Dsa);
        assert_eq!(tuesday.study_blocks()[0].topic, "Daily Practice");
        assert_eq!(tuesday.total_minutes(), 80);
    }

    #[test]
    fn test_untrusted_total_is_recomputed() {
        let week = normalize(&json!([{
            "day": "monday",
            "studyBlocks": [
                { "subject": "DSA", "topic": "Graphs", "duration": 40 },
                { "subject": "DSA", "topic": "Trees", "duration": 20 }
            ],
            "totalMinutes": 9999
        }]));
        assert_eq!(week.day(Weekday::Monday).total_minutes(), 60);
    }

    #[test]
    fn test_duplicate_days_last_wins() {
        let week = normalize(&json!({ "schedule": [
            { "day": "Friday", "studyBlocks": [{ "subject": "DSA", "topic": "First", "duration": 10 }] },
            { "day": "Friday", "studyBlocks": [{ "subject": "DSA", "topic": "Second", "duration": 20 }] }
        ]}));
        let friday = week.day(Weekday::Friday);
        assert_eq!(friday.study_blocks().len(), 1);
        assert_eq!(friday.study_blocks()[0].topic, "Second");
    }

    #[test]
    fn test_non_object_blocks_are_dropped() {
        let week = normalize(&json!({ "schedule": [
            { "day": "Sunday", "studyBlocks": ["oops", 3, { "subject": "DSA", "topic": "Heaps", "duration": 25 }] }
        ]}));
        let sunday = week.day(Weekday::Sunday);
        assert_eq!(sunday.study_blocks().len(), 1);
        assert_eq!(sunday.total_minutes(), 25);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let first = normalize(&json!({ "schedule": [
            { "day": "Wednesday", "studyBlocks": [{ "subject": "AI-ML", "duration": "15" }] }
        ]}));
        let second = normalize(&first.to_document());
        assert_eq!(first, second);
    }
}
