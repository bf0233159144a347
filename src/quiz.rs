//! Multiple-choice quiz shaping and the fixed question sets used when
//! generation is unavailable.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const QUESTIONS_PER_QUIZ: usize = 4;
pub const OPTIONS_PER_QUESTION: usize = 4;

const GENERIC_OPTIONS: [&str; OPTIONS_PER_QUESTION] = ["Option A", "Option B", "Option C", "Option D"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: u8,
    pub explanation: String,
}

impl Question {
    fn new(question: String, options: [&str; OPTIONS_PER_QUESTION], explanation: &str) -> Self {
        Question {
            question,
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_answer: 0,
            explanation: explanation.to_string(),
        }
    }
}

/// Always exactly four well-formed questions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSet {
    pub questions: Vec<Question>,
}

/// Why a fixed set was substituted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizFallback {
    NotConfigured,
    RateLimited,
    Failed,
}

/// Fixed question set for `reason`
pub fn fallback_questions(topic: &str, subject: &str, reason: QuizFallback) -> QuestionSet {
    let questions = match reason {
        QuizFallback::NotConfigured => concept_questions(topic, subject),
        QuizFallback::RateLimited => (1..=QUESTIONS_PER_QUIZ)
            .map(|i| {
                Question::new(
                    format!("{} - Question {}: What is an important aspect of this concept?", topic, i),
                    [
                        "Understanding the fundamentals",
                        "Ignoring best practices",
                        "Avoiding optimization",
                        "Writing complex code unnecessarily",
                    ],
                    "Focus on understanding core concepts and best practices.",
                )
            })
            .collect(),
        QuizFallback::Failed => (1..=QUESTIONS_PER_QUIZ)
            .map(|i| {
                Question::new(
                    format!("{} - Practice Question {}", topic, i),
                    GENERIC_OPTIONS,
                    "Fallback question - set up a Gemini API key for real questions.",
                )
            })
            .collect(),
    };
    QuestionSet { questions }
}

fn concept_questions(topic: &str, subject: &str) -> Vec<Question> {
    vec![
        Question::new(
            format!("What is the primary concept behind {}?", topic),
            [
                "It's a fundamental algorithm technique",
                "It's only used in interviews",
                "It's deprecated in modern programming",
                "It's specific to one programming language",
            ],
            "This is a fundamental technique used across programming. Configure a Gemini API key for AI-generated questions.",
        ),
        Question::new(
            format!("Which scenario is best suited for {}?", topic),
            [
                "When you need efficient solutions",
                "When you want slow algorithms",
                "When you don't care about performance",
                "When you want to write more code",
            ],
            "The correct approach focuses on efficiency and optimal solutions.",
        ),
        Question::new(
            format!("What is a key advantage of mastering {}?", topic),
            [
                "Better problem-solving skills",
                "Worse code quality",
                "Slower execution time",
                "More bugs in code",
            ],
            "Mastering this concept improves your overall programming abilities.",
        ),
        Question::new(
            format!("In {}, how important is {}?", subject, topic),
            [
                "Very important for technical interviews and real projects",
                "Not important at all",
                "Only matters in textbooks",
                "Completely irrelevant",
            ],
            "This is a crucial concept for both learning and practical applications.",
        ),
    ]
}

fn padding_question(topic: &str) -> Question {
    Question::new(
        format!("Additional practice question about {}", topic),
        GENERIC_OPTIONS,
        "This is a supplementary question.",
    )
}

fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Repair one generated question; `None` when there is no usable question text
fn shape_question(raw: &Value) -> Option<Question> {
    let obj = raw.as_object()?;
    let question = text_field(obj, "question")?;

    let mut options: Vec<String> = obj
        .get("options")
        .and_then(Value::as_array)
        .map(|opts| {
            opts.iter()
                .map(|o| match o {
                    Value::String(s) => s.trim().to_string(),
                    other => other.to_string(),
                })
                .filter(|s| !s.is_empty())
                .take(OPTIONS_PER_QUESTION)
                .collect()
        })
        .unwrap_or_default();
    for generic in GENERIC_OPTIONS.iter().skip(options.len()) {
        options.push(generic.to_string());
    }

    let correct_answer = obj
        .get("correctAnswer")
        .and_then(Value::as_u64)
        .filter(|i| (*i as usize) < OPTIONS_PER_QUESTION)
        .unwrap_or(0) as u8;

    Some(Question {
        question,
        options,
        correct_answer,
        explanation: text_field(obj, "explanation")
            .unwrap_or_else(|| "No explanation provided.".to_string()),
    })
}

/// Shape a generated `{ "questions": [...] }` object into exactly four
/// questions. `None` when there is no `questions` array at all.
pub fn shape_question_set(obj: &Map<String, Value>, topic: &str) -> Option<QuestionSet> {
    let raw = obj.get("questions")?.as_array()?;

    let mut questions: Vec<Question> = raw
        .iter()
        .take(QUESTIONS_PER_QUIZ)
        .map(|q| shape_question(q).unwrap_or_else(|| padding_question(topic)))
        .collect();
    while questions.len() < QUESTIONS_PER_QUIZ {
        questions.push(padding_question(topic));
    }

    Some(QuestionSet { questions })
}
