//! Conversation memory for short follow-up questions

/// Last raw question of one conversation
///
/// Owned by the caller for the lifetime of a session and passed into every
/// resolution of that session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConversationMemory {
    last_question: Option<String>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_question(&self) -> Option<&str> {
        self.last_question.as_deref()
    }

    /// Build the effective query for `question` and remember `question`
    ///
    /// A question of at most `short_max_chars` characters is prefixed with
    /// the previous question. The memory always ends up holding the raw
    /// `question`, never the merged text.
    pub fn merge_and_record(&mut self, question: &str, short_max_chars: usize) -> String {
        let is_short = question.trim().chars().count() <= short_max_chars;

        let effective = match self.last_question.as_deref() {
            Some(previous) if is_short && !previous.trim().is_empty() => {
                format!("{} {}", previous.trim(), question.trim())
            }
            _ => question.to_string(),
        };

        self.last_question = Some(question.to_string());
        effective
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_follow_up_merges() {
        let mut memory = ConversationMemory::new();
        assert_eq!(memory.merge_and_record("school", 4), "school");
        assert_eq!(memory.merge_and_record("fees", 4), "school fees");
        assert_eq!(memory.last_question(), Some("fees"));
    }

    #[test]
    fn test_memory_records_raw_question_for_chaining() {
        let mut memory = ConversationMemory::new();
        memory.merge_and_record("school", 4);
        memory.merge_and_record("fees", 4);
        // Chained follow-up merges with the literal last turn, not "school fees".
        assert_eq!(memory.merge_and_record("bus", 4), "fees bus");
    }

    #[test]
    fn test_long_question_is_unchanged() {
        let mut memory = ConversationMemory::new();
        memory.merge_and_record("school", 4);
        assert_eq!(memory.merge_and_record("hostel", 4), "hostel");
        assert_eq!(memory.last_question(), Some("hostel"));
    }

    #[test]
    fn test_short_question_without_history() {
        let mut memory = ConversationMemory::new();
        assert_eq!(memory.merge_and_record("fees", 4), "fees");
    }

    #[test]
    fn test_threshold_counts_characters() {
        let mut memory = ConversationMemory::new();
        memory.merge_and_record("cantine", 4);
        // Four characters, more than four bytes.
        assert_eq!(memory.merge_and_record("café", 4), "cantine café");
        assert_eq!(memory.merge_and_record("menus", 4), "menus");
    }
}
