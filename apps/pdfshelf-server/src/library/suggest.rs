//! Catalog suggestions from file names

/// Keyword table, scanned in order. Ties go to the earlier category.
const CATEGORIES: &[(&str, &[&str])] = &[
    ("Books", &["book", "ebook", "novel", "fiction", "story"]),
    ("Documents", &["document", "doc", "manual", "guide", "handbook"]),
    ("Study", &["study", "learn", "course", "lesson", "homework", "exercise"]),
    ("Work", &["work", "business", "report", "meeting", "proposal"]),
    ("Technical", &["technical", "tech", "code", "programming", "software"]),
    ("Finance", &["finance", "money", "accounting", "budget", "invoice"]),
    ("Health", &["health", "medical", "healthcare", "clinic"]),
    ("Legal", &["legal", "law", "contract", "agreement"]),
    ("Marketing", &["marketing", "advertising", "campaign", "brand"]),
    ("Education", &["education", "teaching", "curriculum", "syllabus"]),
];

const FALLBACK: &str = "Other";

/// Suggest a catalog name for a file.
///
/// The category with the most keyword hits wins. Without any hit the first
/// word of the name (longer than two characters) is used, capitalized.
pub fn suggest_catalog(file_name: &str) -> String {
    let lowered = file_name.to_lowercase();
    let stem = lowered
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .filter(|stem| !stem.is_empty())
        .unwrap_or(&lowered);

    let mut best: Option<&str> = None;
    let mut max_hits = 0;
    for (category, keywords) in CATEGORIES {
        let hits = keywords.iter().filter(|k| stem.contains(*k)).count();
        if hits > max_hits {
            max_hits = hits;
            best = Some(category);
        }
    }

    if let Some(category) = best {
        return category.to_string();
    }

    let first_word = stem
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .next()
        .unwrap_or("");

    if first_word.chars().count() > 2 {
        let mut chars = first_word.chars();
        if let Some(first) = chars.next() {
            return first.to_uppercase().chain(chars).collect();
        }
    }

    FALLBACK.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_match() {
        assert_eq!(suggest_catalog("Annual_Report_2024.pdf"), "Work");
        assert_eq!(suggest_catalog("family-budget.pdf"), "Finance");
        assert_eq!(suggest_catalog("rental contract.pdf"), "Legal");
    }

    #[test]
    fn test_most_hits_wins() {
        // "course" and "lesson" outweigh the single "work" inside "homework"
        assert_eq!(suggest_catalog("course lesson homework.pdf"), "Study");
    }

    #[test]
    fn test_tie_goes_to_earlier_category() {
        // "homework" counts for Study, its "work" substring for Work
        assert_eq!(suggest_catalog("homework-week3.pdf"), "Study");
    }

    #[test]
    fn test_first_word_fallback() {
        assert_eq!(suggest_catalog("zebra_notes.pdf"), "Zebra");
    }

    #[test]
    fn test_short_name_falls_back() {
        assert_eq!(suggest_catalog("ab.pdf"), "Other");
        assert_eq!(suggest_catalog(""), "Other");
    }
}
