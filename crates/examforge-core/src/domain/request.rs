//! Generation request value object.

use serde::{Deserialize, Serialize};

use super::item::Difficulty;

pub const DEFAULT_COURSE: &str = "APSC 142 - Introduction to Computer Programming for Engineers";
pub const DEFAULT_TARGET_MARKS: u32 = 100;
pub const DEFAULT_EXEMPLAR_COUNT: usize = 5;

/// Minimum item count when none is requested.
pub const MIN_ITEM_COUNT: usize = 5;
/// Average marks per item assumed when deriving an item count.
pub const AVERAGE_ITEM_MARKS: u32 = 15;

/// Parameters for one generation run. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub course: String,
    pub target_marks: u32,
    pub difficulty: Difficulty,
    pub sections: Option<Vec<String>>,
    pub item_count: Option<usize>,
    pub exemplar_count: usize,
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self {
            course: DEFAULT_COURSE.to_string(),
            target_marks: DEFAULT_TARGET_MARKS,
            difficulty: Difficulty::default(),
            sections: None,
            item_count: None,
            exemplar_count: DEFAULT_EXEMPLAR_COUNT,
        }
    }
}

impl GenerationRequest {
    pub fn new(target_marks: u32, difficulty: Difficulty) -> Self {
        Self {
            target_marks,
            difficulty,
            ..Self::default()
        }
    }

    pub fn with_sections(mut self, sections: Vec<String>) -> Self {
        self.sections = if sections.is_empty() {
            None
        } else {
            Some(sections)
        };
        self
    }

    pub fn with_item_count(mut self, count: usize) -> Self {
        self.item_count = Some(count);
        self
    }

    pub fn with_exemplar_count(mut self, count: usize) -> Self {
        self.exemplar_count = count;
        self
    }

    /// Requested item count, or one item per ~15 marks with a floor of 5.
    pub fn resolved_item_count(&self) -> usize {
        self.item_count.unwrap_or_else(|| {
            MIN_ITEM_COUNT.max((self.target_marks / AVERAGE_ITEM_MARKS) as usize)
        })
    }
}
