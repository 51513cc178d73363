//! Section vocabulary: descriptions, topic families and defaults.

use std::borrow::Cow;

/// Sections used when neither the request nor the index names any.
pub const DEFAULT_SECTIONS: &[&str] = &[
    "Program Comprehension",
    "Computation and Output",
    "1D Arrays",
    "2D Arrays",
    "Functions",
    "Algorithms",
    "Robot Programming",
];

const SECTION_DESCRIPTIONS: &[(&str, &str)] = &[
    (
        "Program Comprehension",
        "reading and understanding existing code, identifying bugs, tracing execution",
    ),
    (
        "Computation and Output",
        "mathematical calculations, formulas, numerical methods, output formatting",
    ),
    (
        "1D Arrays",
        "one-dimensional arrays, array manipulation, indexing, array algorithms",
    ),
    (
        "2D Arrays",
        "two-dimensional arrays, matrix operations, nested loops with arrays",
    ),
    (
        "Functions",
        "function definition, parameters, return values, function calls, modular programming",
    ),
    ("Algorithms", "algorithm design, sorting, searching, algorithmic thinking"),
    (
        "Robot Programming",
        "robot control, sensors, actuators, robot logic and movement",
    ),
    (
        "1-D Arrays",
        "one-dimensional arrays, array manipulation, indexing, array algorithms",
    ),
    (
        "2-D Arrays",
        "two-dimensional arrays, matrix operations, nested loops with arrays",
    ),
    ("Function and 1D Arrays", "combining functions with array operations"),
    ("Functions and 1-D Arrays", "combining functions with array operations"),
    ("2D Array and Function", "combining 2D arrays with functions"),
    (
        "Computation and Numerical Methods",
        "mathematical computations, numerical analysis, calculations",
    ),
    (
        "Design Thinking",
        "problem-solving approach, algorithm design, program structure",
    ),
    (
        "Algorithms: Sorting and Searching",
        "sorting algorithms, searching algorithms, algorithm efficiency",
    ),
    (
        "Simulating a Physical Problem",
        "modeling physical systems, simulation programming",
    ),
    ("NXT Robot Operation", "LEGO NXT robot programming, sensor integration"),
    ("Robot Operation", "robot control, sensors, actuators, robot logic"),
];

/// What a section's questions focus on.
pub fn section_description(section: &str) -> Cow<'static, str> {
    SECTION_DESCRIPTIONS
        .iter()
        .find(|(name, _)| *name == section)
        .map(|(_, desc)| Cow::Borrowed(*desc))
        .unwrap_or_else(|| Cow::Owned(format!("programming concepts related to {section}")))
}

/// Coarse topic grouping used to find related sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicFamily {
    Arrays,
    Functions,
    Algorithms,
    Computation,
    Robot,
    Comprehension,
}

const FAMILY_KEYWORDS: &[(TopicFamily, &[&str])] = &[
    (TopicFamily::Arrays, &["array"]),
    (TopicFamily::Functions, &["function"]),
    (TopicFamily::Algorithms, &["algorithm", "sort", "search", "design"]),
    (
        TopicFamily::Computation,
        &["computation", "numerical", "output", "simulat"],
    ),
    (TopicFamily::Robot, &["robot", "nxt"]),
    (TopicFamily::Comprehension, &["comprehension"]),
];

/// Families a section belongs to (a combined section can have several).
pub fn topic_families(section: &str) -> Vec<TopicFamily> {
    let lowered = section.to_lowercase();
    FAMILY_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(family, _)| *family)
        .collect()
}

/// Whether two distinct sections share a topic family.
pub fn are_related(a: &str, b: &str) -> bool {
    if a == b {
        return false;
    }
    let families = topic_families(a);
    topic_families(b).iter().any(|f| families.contains(f))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_fallback_descriptions() {
        assert!(section_description("2D Arrays").contains("matrix"));
        assert_eq!(
            section_description("Recursion"),
            "programming concepts related to Recursion"
        );
        assert_eq!(SECTION_DESCRIPTIONS.len(), 18);
    }

    #[test]
    fn test_topic_families() {
        assert_eq!(topic_families("1D Arrays"), vec![TopicFamily::Arrays]);
        assert_eq!(
            topic_families("Function and 1D Arrays"),
            vec![TopicFamily::Arrays, TopicFamily::Functions]
        );
        assert!(topic_families("Loops").is_empty());
    }

    #[test]
    fn test_related_sections() {
        assert!(are_related("1D Arrays", "2-D Arrays"));
        assert!(are_related("Functions", "2D Array and Function"));
        assert!(are_related("Robot Programming", "NXT Robot Operation"));
        assert!(!are_related("Functions", "Robot Programming"));
        assert!(!are_related("Functions", "Functions"));
    }
}
