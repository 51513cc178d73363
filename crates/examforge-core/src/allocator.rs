//! Section allocation and mark distribution.
//!
//! Sections get an even baseline share of the item count, the remainder goes
//! one-per-section to the front of the list, and the resulting multiset is
//! shuffled so generation order carries no section bias.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Unshuffled assignment: baseline share per section, remainder to the first
/// sections in list order. Fewer items than sections truncates the list.
pub fn baseline_assignments(item_count: usize, sections: &[String]) -> Vec<String> {
    if sections.is_empty() || item_count == 0 {
        return Vec::new();
    }
    if item_count < sections.len() {
        return sections[..item_count].to_vec();
    }

    let per_section = item_count / sections.len();
    let remainder = item_count % sections.len();

    let mut assignments = Vec::with_capacity(item_count);
    for (idx, section) in sections.iter().enumerate() {
        let slots = per_section + usize::from(idx < remainder);
        assignments.extend(std::iter::repeat(section.clone()).take(slots));
    }
    assignments
}

/// Allocate `item_count` slots across `sections`, shuffled with `rng`.
pub fn allocate_with<R: Rng + ?Sized>(
    item_count: usize,
    sections: &[String],
    rng: &mut R,
) -> Vec<String> {
    let mut assignments = baseline_assignments(item_count, sections);
    assignments.shuffle(rng);
    assignments
}

/// Allocate with the thread RNG.
pub fn allocate(item_count: usize, sections: &[String]) -> Vec<String> {
    allocate_with(item_count, sections, &mut rand::thread_rng())
}

/// Reproducible allocation.
pub fn allocate_seeded(item_count: usize, sections: &[String], seed: u64) -> Vec<String> {
    allocate_with(item_count, sections, &mut StdRng::seed_from_u64(seed))
}

/// Split `target_marks` over `item_count` items; the remainder goes one mark
/// each to the first items.
pub fn distribute_marks(target_marks: u32, item_count: usize) -> Vec<u32> {
    if item_count == 0 {
        return Vec::new();
    }
    let count = item_count as u32;
    let base = target_marks / count;
    let remainder = (target_marks % count) as usize;
    (0..item_count)
        .map(|idx| base + u32::from(idx < remainder))
        .collect()
}
