//! Exemplar selection, prompt construction and response parsing.

use llm_gateway::CompletionRequest;

use crate::domain::{Difficulty, ExemplarRecord, Item};
use crate::text::{ellipsize, truncate_chars};

use super::sections::{are_related, section_description};

/// Exemplars shown in one generation prompt.
pub const MAX_PROMPT_EXEMPLARS: usize = 3;
pub const EXEMPLAR_PREVIEW_CHARS: usize = 400;
pub const CONTRAST_PREVIEW_CHARS: usize = 200;

pub const GENERATION_TEMPERATURE: f32 = 0.7;
pub const GENERATION_MAX_TOKENS: u32 = 500;

/// Exemplars chosen for one prompt, by role.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptExemplars {
    pub same_section: Vec<ExemplarRecord>,
    pub related: Vec<ExemplarRecord>,
    pub contrast: Option<ExemplarRecord>,
}

impl PromptExemplars {
    pub fn is_empty(&self) -> bool {
        self.same_section.is_empty() && self.related.is_empty() && self.contrast.is_none()
    }
}

/// Pick which exemplars to surface for `section`.
///
/// Same-section exemplars first, then topically related sections fill the
/// remaining slots. With fewer than two same-section exemplars, one
/// unrelated exemplar is added as a contrast.
pub fn select_prompt_exemplars(section: &str, exemplars: &[ExemplarRecord]) -> PromptExemplars {
    let same_section: Vec<ExemplarRecord> = exemplars
        .iter()
        .filter(|e| e.section == section)
        .take(MAX_PROMPT_EXEMPLARS)
        .cloned()
        .collect();

    let related: Vec<ExemplarRecord> = exemplars
        .iter()
        .filter(|e| are_related(section, &e.section))
        .take(MAX_PROMPT_EXEMPLARS - same_section.len())
        .cloned()
        .collect();

    let contrast = if same_section.len() < 2 {
        exemplars
            .iter()
            .find(|e| e.section != section && !are_related(section, &e.section))
            .cloned()
    } else {
        None
    };

    PromptExemplars {
        same_section,
        related,
        contrast,
    }
}

fn system_prompt(section: &str) -> String {
    let description = section_description(section);
    format!(
        "You are an expert at creating programming exam questions for APSC 142 \
(Introduction to Computer Programming for Engineers).

CRITICAL: You MUST create a question for the \"{section}\" section. Do NOT create a \
\"Program Comprehension\" question unless explicitly told to.

Section-specific requirements:
- \"{section}\" questions should focus on {description}
- The question MUST test concepts specific to {section}
- Do NOT default to program comprehension/reading code questions

Your questions should:
- Be clear and unambiguous
- Test understanding of programming concepts specific to {section}
- Be appropriate for first-year engineering students
- Include specific input/output examples if applicable
- Match the style and format of the provided examples"
    )
}

fn user_prompt(section: &str, marks: u32, difficulty: Difficulty, exemplars: &PromptExemplars) -> String {
    let description = section_description(section);
    let mut lines = vec![
        format!("CRITICAL INSTRUCTION: Generate a {difficulty} difficulty question for the '{section}' section."),
        format!("The question MUST be about {description}."),
        format!("DO NOT create a 'Program Comprehension' question. This MUST be a '{section}' question."),
        format!("The question should be worth {marks} marks."),
        String::new(),
        format!("Section '{section}' focuses on: {description}"),
        String::new(),
        "Requirements:".to_string(),
        format!("- The question MUST test {section} concepts, NOT program reading/comprehension"),
        "- Be clear and test practical programming skills".to_string(),
        "- Include specific input/output examples if applicable".to_string(),
        "- Specify any constraints or requirements".to_string(),
        "- Format it similar to the examples below".to_string(),
        format!("- The question content must clearly demonstrate {section} knowledge"),
    ];

    if !exemplars.same_section.is_empty() {
        lines.push(format!(
            "\nExample questions from '{section}' section (match this style and topic):"
        ));
        for (i, example) in exemplars.same_section.iter().enumerate() {
            lines.push(format!("\nExample {} (Section: {}):", i + 1, example.section));
            lines.push(format!("Marks: {}", example.marks));
            lines.push(format!("Text: {}", ellipsize(&example.text, EXEMPLAR_PREVIEW_CHARS)));
            lines.push(format!(
                "  ^ This is a '{section}' question - your question should be similar!"
            ));
        }
    }

    if !exemplars.related.is_empty() {
        lines.push("\nExamples from related sections (similar topic, adapt to this section):".to_string());
        for example in &exemplars.related {
            lines.push(format!("\nSection: {}", example.section));
            lines.push(format!("Marks: {}", example.marks));
            lines.push(format!("Text: {}", ellipsize(&example.text, EXEMPLAR_PREVIEW_CHARS)));
        }
    }

    if let Some(example) = &exemplars.contrast {
        lines.push("\nExample from different section (for contrast - DO NOT follow this style):".to_string());
        lines.push(format!("Section: {} (NOT '{section}')", example.section));
        lines.push(format!(
            "Text: {}...",
            truncate_chars(&example.text, CONTRAST_PREVIEW_CHARS)
        ));
        lines.push(format!(
            "  ^ This is NOT a '{section}' question - do NOT create this type!"
        ));
    }

    lines.push("\nGenerate the question in this format:".to_string());
    lines.push("Section: [section name]".to_string());
    lines.push("Marks: [number]".to_string());
    lines.push("Text: [question text]".to_string());
    lines.join("\n")
}

/// Completion request for one item.
pub fn question_request(
    section: &str,
    marks: u32,
    difficulty: Difficulty,
    exemplars: &PromptExemplars,
) -> CompletionRequest {
    CompletionRequest::new(
        system_prompt(section),
        user_prompt(section, marks, difficulty, exemplars),
        GENERATION_TEMPERATURE,
        GENERATION_MAX_TOKENS,
    )
}

/// Turn a free-text response into an item.
///
/// Takes the text after the last `Text:` (or `text:`) label; with no label
/// the whole response is the item text. A restated `Section:` header line is
/// dropped. Section and marks always come from the assignment, never from
/// the response. Returns `None` when nothing usable remains.
pub fn parse_candidate(
    response: &str,
    section: &str,
    marks: u32,
    difficulty: Difficulty,
) -> Option<Item> {
    let body = if let Some((_, after)) = response.rsplit_once("Text:") {
        after
    } else if let Some((_, after)) = response.rsplit_once("text:") {
        after
    } else {
        response
    };

    let mut text = body.trim();
    for label in ["Section:", "section:"] {
        if text.starts_with(label) {
            text = match text.split_once('\n') {
                Some((_, rest)) => rest.trim(),
                None => "",
            };
        }
    }

    if text.is_empty() {
        return None;
    }
    Some(Item::new(section, marks, text, difficulty))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exemplar(section: &str, text: &str) -> ExemplarRecord {
        ExemplarRecord {
            id: format!("{section}-{text}"),
            text: text.to_string(),
            section: section.to_string(),
            marks: 10,
            relevance_score: 0.5,
            exam_date: String::new(),
            course: String::new(),
            question_number: String::new(),
            document: String::new(),
            distance: None,
        }
    }

    #[test]
    fn test_parse_takes_last_text_label() {
        let response = "Section: Functions\nMarks: 10\nText: Write a function `max3`.";
        let item = parse_candidate(response, "Functions", 12, Difficulty::Hard).unwrap();
        assert_eq!(item.text, "Write a function `max3`.");
        assert_eq!(item.marks, 12);
        assert_eq!(item.section, "Functions");
    }

    #[test]
    fn test_parse_lowercase_label() {
        let item = parse_candidate("text: Sum an array.", "1D Arrays", 5, Difficulty::Easy).unwrap();
        assert_eq!(item.text, "Sum an array.");
    }

    #[test]
    fn test_parse_fallback_whole_response() {
        let item = parse_candidate("  Reverse a string in place. ", "Algorithms", 8, Difficulty::Medium)
            .unwrap();
        assert_eq!(item.text, "Reverse a string in place.");
    }

    #[test]
    fn test_parse_strips_restated_section_header() {
        let response = "Section: 2D Arrays\nGiven a 3x3 matrix, print its transpose.";
        let item = parse_candidate(response, "Functions", 8, Difficulty::Medium).unwrap();
        assert_eq!(item.text, "Given a 3x3 matrix, print its transpose.");
        assert_eq!(item.section, "Functions");
    }

    #[test]
    fn test_parse_empty_is_none() {
        assert!(parse_candidate("Text:   ", "A", 1, Difficulty::Easy).is_none());
        assert!(parse_candidate("Section: A", "A", 1, Difficulty::Easy).is_none());
    }

    #[test]
    fn test_select_same_section_first() {
        let pool = vec![
            exemplar("Functions", "f1"),
            exemplar("Robot Programming", "r1"),
            exemplar("Functions", "f2"),
            exemplar("Functions", "f3"),
            exemplar("Functions", "f4"),
        ];
        let picked = select_prompt_exemplars("Functions", &pool);
        let texts: Vec<_> = picked.same_section.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["f1", "f2", "f3"]);
        assert!(picked.related.is_empty());
        assert!(picked.contrast.is_none());
    }

    #[test]
    fn test_select_related_and_contrast() {
        let pool = vec![
            exemplar("Robot Programming", "r1"),
            exemplar("2D Arrays", "a2"),
            exemplar("1D Arrays", "a1"),
            exemplar("1-D Arrays", "a3"),
        ];
        let picked = select_prompt_exemplars("1D Arrays", &pool);
        assert_eq!(picked.same_section.len(), 1);
        let related: Vec<_> = picked.related.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(related, vec!["a2", "a3"]);
        assert_eq!(picked.contrast.unwrap().text, "r1");
    }

    #[test]
    fn test_prompt_mentions_section_and_truncates() {
        let long = "x".repeat(1000);
        let picked = select_prompt_exemplars("Functions", &[exemplar("Functions", &long)]);
        let request = question_request("Functions", 15, Difficulty::Hard, &picked);

        assert!(request.system_prompt.contains("\"Functions\" section"));
        assert!(request.user_prompt.contains("Generate a hard difficulty question"));
        assert!(request.user_prompt.contains("worth 15 marks"));
        assert!(request.user_prompt.contains(&format!("Text: {}...", "x".repeat(400))));
        assert!(!request.user_prompt.contains(&"x".repeat(401)));
        assert_eq!(request.temperature, GENERATION_TEMPERATURE);
        assert_eq!(request.max_tokens, GENERATION_MAX_TOKENS);
    }
}
