//! Composition of the text a memory is embedded under.

use {
    crate::types::{Enhancement, MemoryRecord},
    std::fmt::Write,
};

/// Deterministic, labeled rendering of everything recall should be able to
/// match against: raw text, expansion, summary, context, mood, entities and
/// the capture date. Section order is fixed; empty sections are skipped.
pub fn build_embedding_text(
    record: &MemoryRecord,
    enhancement: &Enhancement,
    summary: &str,
) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "Memory: {}", record.raw_text);
    if enhancement.enhanced_text != record.raw_text {
        let _ = writeln!(text, "Expanded: {}", enhancement.enhanced_text);
    }
    let _ = writeln!(text, "Summary: {summary}");
    if let Some(context) = record.context.as_deref().filter(|c| !c.is_empty()) {
        let _ = writeln!(text, "Context: {context}");
    }
    if let Some(mood) = record.mood.as_deref().filter(|m| !m.is_empty()) {
        let _ = writeln!(text, "Mood: {mood}");
    }
    if !enhancement.key_entities.is_empty() {
        let _ = writeln!(text, "Entities: {}", enhancement.key_entities.join(", "));
    }
    let _ = write!(text, "Date: {}", record.created_at.date_naive());
    text
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        chrono::{TimeZone, Utc},
    };

    fn record() -> MemoryRecord {
        MemoryRecord {
            id: "m-1".into(),
            owner_id: "o-1".into(),
            raw_text: "Hit a new deadlift PR".into(),
            summary: None,
            context: Some("at the gym".into()),
            mood: Some("proud".into()),
            embedding: None,
            created_at: Utc.with_ymd_and_hms(2026, 2, 7, 18, 30, 0).unwrap(),
        }
    }

    fn enhancement() -> Enhancement {
        Enhancement {
            enhanced_text: "Set a new personal record on the deadlift".into(),
            key_entities: vec!["deadlift".into(), "gym".into()],
            emotional_tone: "proud".into(),
            degraded: false,
        }
    }

    #[test]
    fn sections_appear_in_fixed_order() {
        let text = build_embedding_text(&record(), &enhancement(), "New deadlift PR at the gym.");
        let expected = "Memory: Hit a new deadlift PR\n\
                        Expanded: Set a new personal record on the deadlift\n\
                        Summary: New deadlift PR at the gym.\n\
                        Context: at the gym\n\
                        Mood: proud\n\
                        Entities: deadlift, gym\n\
                        Date: 2026-02-07";
        assert_eq!(text, expected);
    }

    #[test]
    fn empty_sections_are_skipped() {
        let mut r = record();
        r.context = None;
        r.mood = Some(String::new());
        let mut e = enhancement();
        e.enhanced_text = r.raw_text.clone();
        e.key_entities.clear();

        let text = build_embedding_text(&r, &e, "Summary.");
        assert!(!text.contains("Expanded:"));
        assert!(!text.contains("Context:"));
        assert!(!text.contains("Mood:"));
        assert!(!text.contains("Entities:"));
        assert!(text.starts_with("Memory: "));
        assert!(text.ends_with("Date: 2026-02-07"));
    }

    #[test]
    fn same_inputs_produce_identical_text() {
        let a = build_embedding_text(&record(), &enhancement(), "Summary.");
        let b = build_embedding_text(&record(), &enhancement(), "Summary.");
        assert_eq!(a, b);
    }

    #[test]
    fn date_label_uses_the_capture_date() {
        let mut r = record();
        r.created_at = Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 0).unwrap();
        let text = build_embedding_text(&r, &enhancement(), "Summary.");
        assert!(text.ends_with("Date: 2025-12-31"));
    }
}
