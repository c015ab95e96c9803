//! Normalizes and parses model-generated quiz text in the fixed template:
//!
//! ```text
//! I. Question text
//!     1) Option 1
//!     2) Option 2
//!     3) Option 3
//!     4) Option 4
//! Answer: <1/2/3/4>
//! Explanation: <why correct>
//! ```
//!
//! Model output drifts from the template often enough that parsing is
//! best-effort: malformed blocks shrink the quiz instead of failing the
//! request, but every dropped block is recorded so the caller can see it.

use crate::error::ExtractError;
use crate::models::QuizQuestion;
use regex::Regex;
use std::collections::BTreeMap;

pub fn normalize_quiz_text(text: &str) -> Result<String, ExtractError> {
    // Repair truncated keyword prefixes without touching ones that are
    // already intact, so a second pass leaves the text unchanged.
    let answer_re = Regex::new(r"(^|[^A])nswer:")?;
    let explanation_re = Regex::new(r"(^|[^E])xplanation:")?;
    let blank_runs_re = Regex::new(r"\n{2,}")?;

    let text = answer_re.replace_all(text, "${1}Answer:");
    let text = explanation_re.replace_all(&text, "${1}Explanation:");
    let text = text
        .replace(['\u{201c}', '\u{201d}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    let text = blank_runs_re.replace_all(&text, "\n\n");

    Ok(text.trim().to_string())
}

/// Why a question block was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockDefect {
    MissingQuestion,
    /// Number of distinct "N)" options found; exactly four are required.
    OptionCount(usize),
    MissingAnswer,
}

#[derive(Debug, Clone)]
pub struct DroppedBlock {
    /// Zero-based position of the block in the input text.
    pub block_index: usize,
    pub defect: BlockDefect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizOutcome {
    Complete,
    Partial,
    Empty,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedQuiz {
    pub questions: Vec<QuizQuestion>,
    pub dropped: Vec<DroppedBlock>,
}

impl ParsedQuiz {
    pub fn outcome(&self) -> QuizOutcome {
        if self.questions.is_empty() {
            QuizOutcome::Empty
        } else if self.dropped.is_empty() {
            QuizOutcome::Complete
        } else {
            QuizOutcome::Partial
        }
    }
}

/// Parses normalized quiz text into question records, in input order.
///
/// Blocks start at a line beginning with a Roman-numeral ordinal ("I.",
/// "II.", ...). A block is kept only when the question text is non-empty,
/// exactly four options "1)".."4)" were found, and a case-sensitive
/// "Answer: <1-4>" match exists. Anything before the first ordinal is
/// ignored.
pub fn parse_quiz(quiz_text: &str) -> Result<ParsedQuiz, ExtractError> {
    let ordinal_re = Regex::new(r"(?m)^[IVXLCDM]+\.")?;
    let question_re = Regex::new(r"^[IVXLCDM]+\.\s*(.+)")?;
    let option_re = Regex::new(r"(?m)^\s*([1-4])\)\s*(.+)$")?;
    let answer_re = Regex::new(r"Answer:\s*([1-4])")?;
    let explanation_re = Regex::new(r"(?s)Explanation:\s*(.+)")?;

    let trimmed = quiz_text.trim();
    let starts: Vec<usize> = ordinal_re.find_iter(trimmed).map(|m| m.start()).collect();

    let mut parsed = ParsedQuiz::default();

    for (block_index, &start) in starts.iter().enumerate() {
        let end = starts.get(block_index + 1).copied().unwrap_or(trimmed.len());
        let block = trimmed[start..end].trim();
        if block.is_empty() {
            continue;
        }

        let question = question_re
            .captures(block)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();

        if question.is_empty() {
            parsed.dropped.push(DroppedBlock {
                block_index,
                defect: BlockDefect::MissingQuestion,
            });
            continue;
        }

        let mut options = BTreeMap::new();
        for captures in option_re.captures_iter(block) {
            options.insert(captures[1].to_string(), captures[2].trim().to_string());
        }

        if options.len() != 4 {
            parsed.dropped.push(DroppedBlock {
                block_index,
                defect: BlockDefect::OptionCount(options.len()),
            });
            continue;
        }

        let answer = match answer_re.captures(block) {
            Some(captures) => captures[1].to_string(),
            None => {
                parsed.dropped.push(DroppedBlock {
                    block_index,
                    defect: BlockDefect::MissingAnswer,
                });
                continue;
            }
        };

        let explanation = explanation_re
            .captures(block)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();

        parsed.questions.push(QuizQuestion {
            question,
            options,
            answer,
            explanation,
        });
    }

    Ok(parsed)
}

/// Extracts student answers from free text, matching lines like "Q3: 2",
/// "3) 1", or "3. 4". Later matches for the same question number win.
pub fn parse_student_answers(text: &str) -> Result<BTreeMap<u32, String>, ExtractError> {
    let answer_re = Regex::new(r"Q?(\d+)\s*[).:]?\s*([1-4])")?;

    let mut answers = BTreeMap::new();
    for captures in answer_re.captures_iter(text) {
        if let Ok(number) = captures[1].parse::<u32>() {
            answers.insert(number, captures[2].to_string());
        }
    }

    Ok(answers)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    Wrong { given: String },
    Unanswered,
}

#[derive(Debug, Clone)]
pub struct QuestionResult {
    /// One-based question number.
    pub number: u32,
    pub question: String,
    pub correct_answer: String,
    pub verdict: Verdict,
}

#[derive(Debug, Clone)]
pub struct QuizReport {
    pub score: usize,
    pub total: usize,
    pub results: Vec<QuestionResult>,
}

/// Grades submitted answers against a parsed quiz. Questions are numbered
/// from 1 in quiz order; unanswered questions score zero but are reported
/// separately from wrong ones.
pub fn grade(questions: &[QuizQuestion], answers: &BTreeMap<u32, String>) -> QuizReport {
    let mut results = Vec::with_capacity(questions.len());
    let mut score = 0;

    for (index, question) in questions.iter().enumerate() {
        let number = (index + 1) as u32;
        let verdict = match answers.get(&number) {
            Some(given) if *given == question.answer => {
                score += 1;
                Verdict::Correct
            }
            Some(given) => Verdict::Wrong {
                given: given.clone(),
            },
            None => Verdict::Unanswered,
        };

        results.push(QuestionResult {
            number,
            question: question.question.clone(),
            correct_answer: question.answer.clone(),
            verdict,
        });
    }

    QuizReport {
        score,
        total: questions.len(),
        results,
    }
}

/// Prompt for generating a quiz in the strict template from course text.
pub fn quiz_prompt(course_text: &str, num_questions: usize) -> String {
    format!(
        "You are an educational quiz generator.\n\
         Based on the following course material, generate {num_questions} multiple choice questions.\n\n\
         Output must strictly follow this format:\n\n\
         I. <Question text>\n\
         \u{20}   1) <Option 1>\n\
         \u{20}   2) <Option 2>\n\
         \u{20}   3) <Option 3>\n\
         \u{20}   4) <Option 4>\n\
         Answer: <1/2/3/4>\n\
         Explanation: <Why this option is correct>\n\n\
         Course Material:\n{course_text}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_BLOCK: &str = "I. What is 2+2?\n1) 3\n2) 4\n3) 5\n4) 6\nAnswer: 2\nExplanation: Basic arithmetic.";

    #[test]
    fn normalizer_repairs_truncated_prefixes() {
        let raw = "nswer: 2\nxplanation: because";
        let cleaned = normalize_quiz_text(raw).unwrap();
        assert_eq!(cleaned, "Answer: 2\nExplanation: because");
    }

    #[test]
    fn normalizer_leaves_intact_prefixes_alone() {
        let raw = "Answer: 2\nExplanation: because";
        assert_eq!(normalize_quiz_text(raw).unwrap(), raw);
    }

    #[test]
    fn normalizer_is_idempotent() {
        let raw = "I. \u{201c}Quoted\u{201d} question\n\n\n\nnswer: 1\n\n\n\nxplanation: ok  ";
        let once = normalize_quiz_text(raw).unwrap();
        let twice = normalize_quiz_text(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn normalizer_replaces_fancy_quotes_and_collapses_blank_runs() {
        let raw = "line \u{201c}a\u{201d}\n\n\n\nline \u{2018}b\u{2019}";
        let cleaned = normalize_quiz_text(raw).unwrap();
        assert_eq!(cleaned, "line \"a\"\n\nline 'b'");
    }

    #[test]
    fn spec_example_parses_to_one_question() {
        let parsed = parse_quiz(GOOD_BLOCK).unwrap();
        assert_eq!(parsed.questions.len(), 1);
        let question = &parsed.questions[0];
        assert_eq!(question.question, "What is 2+2?");
        assert_eq!(question.answer, "2");
        assert_eq!(question.options.len(), 4);
        assert_eq!(question.options["2"], "4");
        assert_eq!(question.explanation, "Basic arithmetic.");
        assert_eq!(parsed.outcome(), QuizOutcome::Complete);
    }

    #[test]
    fn malformed_block_is_dropped_and_others_keep_order() {
        let text = format!(
            "{GOOD_BLOCK}\nII. Broken question\n1) a\n2) b\nAnswer: 1\n\
             III. What is 3*3?\n1) 6\n2) 7\n3) 9\n4) 12\nAnswer: 3\nExplanation: times table"
        );
        let parsed = parse_quiz(&text).unwrap();

        assert_eq!(parsed.questions.len(), 2);
        assert_eq!(parsed.questions[0].question, "What is 2+2?");
        assert_eq!(parsed.questions[1].question, "What is 3*3?");
        assert_eq!(parsed.dropped.len(), 1);
        assert_eq!(parsed.dropped[0].block_index, 1);
        assert_eq!(parsed.dropped[0].defect, BlockDefect::OptionCount(2));
        assert_eq!(parsed.outcome(), QuizOutcome::Partial);
    }

    #[test]
    fn block_without_answer_is_dropped() {
        let text = "I. Question?\n1) a\n2) b\n3) c\n4) d\nExplanation: none";
        let parsed = parse_quiz(text).unwrap();
        assert!(parsed.questions.is_empty());
        assert_eq!(parsed.dropped[0].defect, BlockDefect::MissingAnswer);
        assert_eq!(parsed.outcome(), QuizOutcome::Empty);
    }

    #[test]
    fn lowercase_answer_keyword_does_not_match() {
        let text = "I. Question?\n1) a\n2) b\n3) c\n4) d\nanswer: 2";
        let parsed = parse_quiz(text).unwrap();
        assert!(parsed.questions.is_empty());
        assert_eq!(parsed.dropped[0].defect, BlockDefect::MissingAnswer);
    }

    #[test]
    fn explanation_keeps_embedded_newlines() {
        let text = "I. Question?\n1) a\n2) b\n3) c\n4) d\nAnswer: 1\nExplanation: first line\nsecond line";
        let parsed = parse_quiz(text).unwrap();
        assert_eq!(parsed.questions[0].explanation, "first line\nsecond line");
    }

    #[test]
    fn preamble_before_first_ordinal_is_ignored() {
        let text = format!("Here is your quiz:\n\n{GOOD_BLOCK}");
        let parsed = parse_quiz(&text).unwrap();
        assert_eq!(parsed.questions.len(), 1);
        assert!(parsed.dropped.is_empty());
    }

    #[test]
    fn student_answers_accept_multiple_layouts() {
        let answers = parse_student_answers("Q1: 2\n2) 4\n3. 1").unwrap();
        assert_eq!(answers.get(&1).map(String::as_str), Some("2"));
        assert_eq!(answers.get(&2).map(String::as_str), Some("4"));
        assert_eq!(answers.get(&3).map(String::as_str), Some("1"));
    }

    #[test]
    fn grading_separates_wrong_from_unanswered() {
        let parsed = parse_quiz(&format!(
            "{GOOD_BLOCK}\nII. What is 1+1?\n1) 2\n2) 3\n3) 4\n4) 5\nAnswer: 1\nExplanation: sums"
        ))
        .unwrap();

        let mut answers = BTreeMap::new();
        answers.insert(1, "3".to_string());

        let report = grade(&parsed.questions, &answers);
        assert_eq!(report.total, 2);
        assert_eq!(report.score, 0);
        assert_eq!(
            report.results[0].verdict,
            Verdict::Wrong {
                given: "3".to_string()
            }
        );
        assert_eq!(report.results[1].verdict, Verdict::Unanswered);
    }

    #[test]
    fn quiz_prompt_names_the_count_and_material() {
        let prompt = quiz_prompt("Photosynthesis basics", 5);
        assert!(prompt.contains("5 multiple choice questions"));
        assert!(prompt.contains("Photosynthesis basics"));
        assert!(prompt.contains("Answer: <1/2/3/4>"));
    }
}
