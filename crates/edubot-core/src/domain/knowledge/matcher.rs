//! Knowledge base lookup
//!
//! Two passes, most specific first. The scoped pass considers entries of
//! the exact (grade, semester, department) and ranks them:
//!
//! 1. question equals the query
//! 2. question contains the query
//! 3. keywords contain the query
//! 4. answer contains the query
//!
//! When nothing in scope mentions the query, the relaxed pass drops the
//! department and accepts only question or keyword containment. Ties go
//! to the entry added first.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::taxonomy::QuestionContext;
use crate::error::Result;

use super::entity::{KnowledgeEntry, KnowledgeScope};
use super::repository::KnowledgeStore;

/// How a knowledge entry matched the query, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    ExactQuestion,
    QuestionContains,
    KeywordContains,
    AnswerContains,
}

impl MatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExactQuestion => "exact_question",
            Self::QuestionContains => "question_contains",
            Self::KeywordContains => "keyword_contains",
            Self::AnswerContains => "answer_contains",
        }
    }
}

/// A knowledge base hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeMatch {
    pub entry_id: String,
    pub answer: String,
    pub kind: MatchKind,
    /// Found by the grade+semester pass
    pub relaxed: bool,
}

/// Trim and Unicode-lowercase a question
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Rank an entry for the scoped pass
pub fn rank_scoped(query: &str, entry: &KnowledgeEntry) -> Option<MatchKind> {
    let question = normalize(&entry.question);
    if question == query {
        Some(MatchKind::ExactQuestion)
    } else if question.contains(query) {
        Some(MatchKind::QuestionContains)
    } else if entry.keywords.to_lowercase().contains(query) {
        Some(MatchKind::KeywordContains)
    } else if entry.answer.to_lowercase().contains(query) {
        Some(MatchKind::AnswerContains)
    } else {
        None
    }
}

/// Rank an entry for the relaxed pass; answer text is not searched
pub fn rank_relaxed(query: &str, entry: &KnowledgeEntry) -> Option<MatchKind> {
    if entry.question.to_lowercase().contains(query) {
        Some(MatchKind::QuestionContains)
    } else if entry.keywords.to_lowercase().contains(query) {
        Some(MatchKind::KeywordContains)
    } else {
        None
    }
}

/// Best-ranked entry; `min_by_key` keeps the first of equal ranks
fn best<'a>(
    query: &str,
    entries: &'a [KnowledgeEntry],
    rank: fn(&str, &KnowledgeEntry) -> Option<MatchKind>,
) -> Option<(&'a KnowledgeEntry, MatchKind)> {
    entries
        .iter()
        .filter_map(|entry| rank(query, entry).map(|kind| (entry, kind)))
        .min_by_key(|(_, kind)| *kind)
}

/// Looks up curated answers for a question
#[derive(Clone)]
pub struct KnowledgeMatcher {
    store: Arc<dyn KnowledgeStore>,
}

impl KnowledgeMatcher {
    pub fn new(store: Arc<dyn KnowledgeStore>) -> Self {
        Self { store }
    }

    /// Find the best curated answer, or `None` when nothing matches
    pub async fn find(
        &self,
        question: &str,
        context: &QuestionContext,
    ) -> Result<Option<KnowledgeMatch>> {
        let query = normalize(question);
        if query.is_empty() {
            return Ok(None);
        }

        let scoped = self.store.query(&KnowledgeScope::full(context), &query).await?;
        if let Some((entry, kind)) = best(&query, &scoped, rank_scoped) {
            debug!(entry_id = %entry.id, kind = kind.as_str(), "Scoped knowledge match");
            return Ok(Some(KnowledgeMatch {
                entry_id: entry.id.clone(),
                answer: entry.answer.clone(),
                kind,
                relaxed: false,
            }));
        }

        let relaxed = self.store.query(&KnowledgeScope::relaxed(context), &query).await?;
        if let Some((entry, kind)) = best(&query, &relaxed, rank_relaxed) {
            debug!(entry_id = %entry.id, kind = kind.as_str(), "Relaxed knowledge match");
            return Ok(Some(KnowledgeMatch {
                entry_id: entry.id.clone(),
                answer: entry.answer.clone(),
                kind,
                relaxed: true,
            }));
        }

        debug!(
            scoped_candidates = scoped.len(),
            relaxed_candidates = relaxed.len(),
            "No knowledge base match"
        );
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-memory store that applies the scope the way SQLite does
    #[derive(Default)]
    struct MemoryStore {
        entries: Mutex<Vec<KnowledgeEntry>>,
    }

    impl MemoryStore {
        fn with(entries: Vec<KnowledgeEntry>) -> Arc<Self> {
            Arc::new(Self {
                entries: Mutex::new(entries),
            })
        }
    }

    #[async_trait]
    impl KnowledgeStore for MemoryStore {
        async fn query(&self, scope: &KnowledgeScope, _needle: &str) -> Result<Vec<KnowledgeEntry>> {
            let entries = self.entries.lock().unwrap();
            Ok(entries
                .iter()
                .filter(|e| match scope {
                    KnowledgeScope::Full {
                        grade_id,
                        semester_id,
                        department_id,
                    } => {
                        &e.grade_id == grade_id
                            && &e.semester_id == semester_id
                            && &e.department_id == department_id
                    }
                    KnowledgeScope::GradeSemester {
                        grade_id,
                        semester_id,
                    } => &e.grade_id == grade_id && &e.semester_id == semester_id,
                })
                .cloned()
                .collect())
        }

        async fn add(&self, entry: &KnowledgeEntry) -> Result<()> {
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }

        async fn get(&self, id: &str) -> Result<Option<KnowledgeEntry>> {
            Ok(self.entries.lock().unwrap().iter().find(|e| e.id == id).cloned())
        }

        async fn list(&self) -> Result<Vec<KnowledgeEntry>> {
            Ok(self.entries.lock().unwrap().clone())
        }

        async fn delete(&self, id: &str) -> Result<bool> {
            let mut entries = self.entries.lock().unwrap();
            let before = entries.len();
            entries.retain(|e| e.id != id);
            Ok(entries.len() != before)
        }
    }

    fn ctx() -> QuestionContext {
        QuestionContext::new("g1", "s1", "physics")
    }

    #[tokio::test]
    async fn test_exact_question_beats_substring() {
        let store = MemoryStore::with(vec![
            KnowledgeEntry::new("ما هي السرعة المتجهة", "substring answer").with_context(&ctx()),
            KnowledgeEntry::new("ما هي السرعة", "exact answer").with_context(&ctx()),
        ]);
        let matcher = KnowledgeMatcher::new(store);

        let hit = matcher.find("  ما هي السرعة ", &ctx()).await.unwrap().unwrap();
        assert_eq!(hit.answer, "exact answer");
        assert_eq!(hit.kind, MatchKind::ExactQuestion);
        assert!(!hit.relaxed);
    }

    #[tokio::test]
    async fn test_exact_match_ignores_surrounding_whitespace_in_stored_question() {
        let mut untrimmed = KnowledgeEntry::new("ما هي السرعة", "exact answer").with_context(&ctx());
        untrimmed.question = "  ما هي السرعة \n".to_string();
        let store = MemoryStore::with(vec![
            KnowledgeEntry::new("ما هي السرعة المتجهة", "substring answer").with_context(&ctx()),
            untrimmed,
        ]);
        let matcher = KnowledgeMatcher::new(store);

        let hit = matcher.find("ما هي السرعة", &ctx()).await.unwrap().unwrap();
        assert_eq!(hit.answer, "exact answer");
        assert_eq!(hit.kind, MatchKind::ExactQuestion);
    }

    #[tokio::test]
    async fn test_exact_match_is_case_insensitive() {
        let store = MemoryStore::with(vec![
            KnowledgeEntry::new("What is Velocity?", "containing").with_context(&ctx()),
            KnowledgeEntry::new("WHAT IS VELOCITY", "exact").with_context(&ctx()),
        ]);
        let matcher = KnowledgeMatcher::new(store);

        let hit = matcher.find("what is velocity", &ctx()).await.unwrap().unwrap();
        assert_eq!(hit.answer, "exact");
    }

    #[tokio::test]
    async fn test_scoped_precedence_keywords_then_answer() {
        let store = MemoryStore::with(vec![
            KnowledgeEntry::new("سؤال آخر", "الطاقة الحركية تعتمد على الكتلة").with_context(&ctx()),
            KnowledgeEntry::new("تعريف", "answer via keywords")
                .with_keywords("الطاقة الحركية، الحركة")
                .with_context(&ctx()),
        ]);
        let matcher = KnowledgeMatcher::new(store);

        let hit = matcher.find("الطاقة الحركية", &ctx()).await.unwrap().unwrap();
        assert_eq!(hit.answer, "answer via keywords");
        assert_eq!(hit.kind, MatchKind::KeywordContains);
    }

    #[tokio::test]
    async fn test_falls_back_to_grade_and_semester() {
        let chemistry = QuestionContext::new("g1", "s1", "chemistry");
        let store = MemoryStore::with(vec![
            KnowledgeEntry::new("ما هو الذرة", "relaxed answer").with_context(&chemistry),
        ]);
        let matcher = KnowledgeMatcher::new(store);

        let hit = matcher.find("الذرة", &ctx()).await.unwrap().unwrap();
        assert_eq!(hit.answer, "relaxed answer");
        assert!(hit.relaxed);
        assert_eq!(hit.kind, MatchKind::QuestionContains);
    }

    #[tokio::test]
    async fn test_relaxed_pass_ignores_answer_text() {
        let chemistry = QuestionContext::new("g1", "s1", "chemistry");
        let store = MemoryStore::with(vec![
            KnowledgeEntry::new("سؤال", "الذرة هي أصغر جزء").with_context(&chemistry),
        ]);
        let matcher = KnowledgeMatcher::new(store);

        assert!(matcher.find("الذرة", &ctx()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_other_grade_is_never_considered() {
        let other = QuestionContext::new("g2", "s1", "physics");
        let store =
            MemoryStore::with(vec![KnowledgeEntry::new("ما هي السرعة", "x").with_context(&other)]);
        let matcher = KnowledgeMatcher::new(store);

        assert!(matcher.find("ما هي السرعة", &ctx()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_no_overlap_returns_none() {
        let store = MemoryStore::with(vec![
            KnowledgeEntry::new("ما هي السرعة", "المسافة على الزمن").with_context(&ctx()),
        ]);
        let matcher = KnowledgeMatcher::new(store);

        assert!(matcher.find("التمثيل الضوئي", &ctx()).await.unwrap().is_none());
        assert!(matcher.find("   ", &ctx()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let store = MemoryStore::with(vec![
            KnowledgeEntry::new("قانون نيوتن الأول", "first").with_context(&ctx()),
            KnowledgeEntry::new("قانون نيوتن الثاني", "second").with_context(&ctx()),
        ]);
        let matcher = KnowledgeMatcher::new(store);

        let hit = matcher.find("قانون نيوتن", &ctx()).await.unwrap().unwrap();
        assert_eq!(hit.answer, "first");
    }

    #[tokio::test]
    async fn test_unscoped_context_matches_unscoped_entries() {
        let store = MemoryStore::with(vec![KnowledgeEntry::new("general", "general answer")]);
        let matcher = KnowledgeMatcher::new(store);

        let hit = matcher
            .find("General", &QuestionContext::unscoped())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.answer, "general answer");
    }
}
