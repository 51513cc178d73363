//! Exam items, item sets and the source question bank schema.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ParseDifficultyError;

/// Target difficulty for generated items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Phrase appended to retrieval queries for this difficulty.
    pub fn query_descriptor(&self) -> &'static str {
        match self {
            Difficulty::Easy => "simple basic programming question",
            Difficulty::Hard => "complex advanced programming question",
            Difficulty::Medium => "programming question",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(ParseDifficultyError(s.to_string())),
        }
    }
}

/// One generated exam item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub question_number: String,
    pub section: String,
    pub marks: u32,
    pub text: String,
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
}

impl Item {
    pub fn new(
        section: impl Into<String>,
        marks: u32,
        text: impl Into<String>,
        difficulty: Difficulty,
    ) -> Self {
        Self {
            question_number: String::new(),
            section: section.into(),
            marks,
            text: text.into(),
            difficulty,
            quality_score: None,
            approved: None,
        }
    }

    pub fn with_number(mut self, number: usize) -> Self {
        self.question_number = number.to_string();
        self
    }

    /// Copy of this item carrying its quality verdict.
    pub fn scored(&self, score: f64, approved: bool) -> Self {
        Self {
            quality_score: Some(score),
            approved: Some(approved),
            ..self.clone()
        }
    }

    /// Serialized fields, ready for bank normalization.
    pub fn to_fields(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}

/// Header of an exam, generated or historical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamMetadata {
    pub university: String,
    pub faculty: String,
    pub course: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl ExamMetadata {
    /// Header stamped on generated exams.
    pub fn generated(course: impl Into<String>) -> Self {
        Self {
            university: "Queen's University".to_string(),
            faculty: "Faculty of Engineering & Applied Science".to_string(),
            course: course.into(),
            date: "Generated".to_string(),
            time: None,
            duration: Some("3 hours".to_string()),
        }
    }
}

/// A generated exam: header plus ordered items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSet {
    pub exam_metadata: ExamMetadata,
    pub questions: Vec<Item>,
}

impl ItemSet {
    pub fn new(exam_metadata: ExamMetadata, questions: Vec<Item>) -> Self {
        Self {
            exam_metadata,
            questions,
        }
    }

    pub fn total_marks(&self) -> u32 {
        self.questions.iter().map(|q| q.marks).sum()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// A question as stored in the historical question bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceQuestion {
    pub question_number: String,
    pub section: String,
    pub marks: u32,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_choices: Option<Vec<String>>,
}

/// One historical exam from the source question bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceExam {
    pub exam_metadata: ExamMetadata,
    pub questions: Vec<SourceQuestion>,
}

impl SourceExam {
    pub fn total_marks(&self) -> u32 {
        self.questions.iter().map(|q| q.marks).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_parse_case_insensitive() {
        assert_eq!("HARD".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert_eq!(" easy ".parse::<Difficulty>().unwrap(), Difficulty::Easy);
        assert!("extreme".parse::<Difficulty>().is_err());
        assert_eq!(Difficulty::default(), Difficulty::Medium);
    }

    #[test]
    fn test_item_scored_keeps_original() {
        let item = Item::new("Functions", 10, "Write f.", Difficulty::Medium).with_number(1);
        let scored = item.scored(8.0, true);
        assert_eq!(item.quality_score, None);
        assert_eq!(scored.quality_score, Some(8.0));
        assert_eq!(scored.approved, Some(true));
        assert_eq!(scored.question_number, "1");
    }

    #[test]
    fn test_item_set_total_marks() {
        let set = ItemSet::new(
            ExamMetadata::generated("APSC 142"),
            vec![
                Item::new("A", 34, "a", Difficulty::Easy),
                Item::new("B", 33, "b", Difficulty::Easy),
                Item::new("C", 33, "c", Difficulty::Easy),
            ],
        );
        assert_eq!(set.total_marks(), 100);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_item_fields_omit_unscored() {
        let fields = Item::new("A", 5, "a", Difficulty::Hard).to_fields();
        assert_eq!(fields.get("difficulty"), Some(&serde_json::json!("hard")));
        assert!(!fields.contains_key("quality_score"));
    }

    #[test]
    fn test_source_exam_parses_optional_fields() {
        let exam: SourceExam = serde_json::from_value(serde_json::json!({
            "exam_metadata": {
                "university": "Queen's University",
                "faculty": "Engineering",
                "course": "APSC 142",
                "date": "April 20, 2013"
            },
            "questions": [
                {"question_number": "1", "section": "Functions", "marks": 10, "text": "q1",
                 "answer_choices": ["a", "b"]},
                {"question_number": "2", "section": "Algorithms", "marks": 15, "text": "q2"}
            ]
        }))
        .unwrap();
        assert_eq!(exam.total_marks(), 25);
        assert_eq!(exam.questions[0].answer_choices.as_ref().unwrap().len(), 2);
    }
}
