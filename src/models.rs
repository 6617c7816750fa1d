use serde::{Deserialize, Serialize};

// === Content catalog ===

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub sessions: Vec<Session>,
}

impl Topic {
    pub fn session(&self, session_id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == session_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub sections: Vec<Section>,
}

impl Session {
    pub fn section(&self, section_id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == section_id)
    }

    pub fn duration_minutes(&self) -> u32 {
        self.sections.iter().map(|s| s.duration_minutes).sum()
    }

    pub fn question_count(&self) -> usize {
        self.sections.iter().map(|s| s.content.questions().len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub title: String,
    pub duration_minutes: u32,
    pub content: SectionContent,
}

// Each section type carries only the payload it needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SectionContent {
    Content {
        body: String,
    },
    Quiz {
        questions: Vec<Question>,
    },
    CaseStudy {
        scenario: String,
        questions: Vec<Question>,
    },
    Video {
        url: String,
        #[serde(default)]
        transcript: Option<String>,
    },
}

impl SectionContent {
    pub fn kind(&self) -> SectionKind {
        match self {
            SectionContent::Content { .. } => SectionKind::Content,
            SectionContent::Quiz { .. } => SectionKind::Quiz,
            SectionContent::CaseStudy { .. } => SectionKind::CaseStudy,
            SectionContent::Video { .. } => SectionKind::Video,
        }
    }

    pub fn questions(&self) -> &[Question] {
        match self {
            SectionContent::Quiz { questions } | SectionContent::CaseStudy { questions, .. } => {
                questions
            }
            SectionContent::Content { .. } | SectionContent::Video { .. } => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionKind {
    Content,
    Quiz,
    CaseStudy,
    Video,
}

impl SectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Content => "content",
            SectionKind::Quiz => "quiz",
            SectionKind::CaseStudy => "case-study",
            SectionKind::Video => "video",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SectionKind::Content => "Reading",
            SectionKind::Quiz => "Quiz",
            SectionKind::CaseStudy => "Case Study",
            SectionKind::Video => "Video",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub prompt: String,
    pub options: Vec<String>,
    // Index into options
    pub answer: usize,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl Question {
    pub fn is_correct(&self, choice: usize) -> bool {
        choice == self.answer
    }
}

// === Progress ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    NotStarted,
    InProgress,
    Completed,
    NeedsWork,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::NotStarted => "not_started",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::NeedsWork => "needs_work",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "not_started" | "new" | "todo" => Some(SessionStatus::NotStarted),
            "in_progress" | "started" | "active" => Some(SessionStatus::InProgress),
            "completed" | "complete" | "done" => Some(SessionStatus::Completed),
            "needs_work" | "review" | "weak" => Some(SessionStatus::NeedsWork),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionStatus::NotStarted => "Not Started",
            SessionStatus::InProgress => "In Progress",
            SessionStatus::Completed => "Completed",
            SessionStatus::NeedsWork => "Needs Work",
        }
    }
}

// A stored progress row for one (topic, session) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionProgress {
    pub topic_id: String,
    pub session_id: String,
    pub status: SessionStatus,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub updated_at: String,
}

// One sitting of a session, with its quiz tally
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub topic_id: String,
    pub session_id: String,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub correct: i64,
    pub answered: i64,
}

impl Attempt {
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Fraction of the session's questions answered correctly. Unanswered
    /// questions count as wrong; `None` when the session has no questions.
    pub fn score(&self, question_count: usize) -> Option<f64> {
        if question_count == 0 {
            None
        } else {
            Some(self.correct as f64 / question_count as f64)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub id: i64,
    pub attempt_id: i64,
    pub section_id: String,
    pub question_index: i64,
    pub selected: i64,
    pub correct: bool,
    pub answered_at: String,
}

// Per-topic session counts for progress displays
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicSummary {
    pub topic_id: String,
    pub title: String,
    pub total_sessions: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub needs_work: usize,
}

impl TopicSummary {
    pub fn percent_complete(&self) -> f64 {
        if self.total_sessions == 0 {
            0.0
        } else {
            (self.completed as f64 / self.total_sessions as f64) * 100.0
        }
    }
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(answer: usize) -> Question {
        Question {
            prompt: "Which nerve?".to_string(),
            options: vec!["Median".to_string(), "Ulnar".to_string()],
            answer,
            explanation: None,
        }
    }

    mod section_content_tests {
        use super::*;

        #[test]
        fn kind_matches_variant() {
            let content = SectionContent::Content {
                body: "text".to_string(),
            };
            let video = SectionContent::Video {
                url: "https://example.org/v".to_string(),
                transcript: None,
            };
            assert_eq!(content.kind(), SectionKind::Content);
            assert_eq!(video.kind(), SectionKind::Video);
            assert_eq!(
                SectionContent::Quiz { questions: vec![] }.kind(),
                SectionKind::Quiz
            );
        }

        #[test]
        fn questions_only_for_quiz_and_case_study() {
            let quiz = SectionContent::Quiz {
                questions: vec![question(0), question(1)],
            };
            let case = SectionContent::CaseStudy {
                scenario: "A 54-year-old presents with chest pain".to_string(),
                questions: vec![question(0)],
            };
            let content = SectionContent::Content {
                body: "text".to_string(),
            };
            assert_eq!(quiz.questions().len(), 2);
            assert_eq!(case.questions().len(), 1);
            assert!(content.questions().is_empty());
        }

        #[test]
        fn deserializes_tagged_by_type() {
            let json = r#"{"type":"case-study","scenario":"s","questions":[]}"#;
            let parsed: SectionContent = serde_json::from_str(json).unwrap();
            assert_eq!(parsed.kind(), SectionKind::CaseStudy);

            let json = r#"{"type":"video","url":"u"}"#;
            let parsed: SectionContent = serde_json::from_str(json).unwrap();
            assert_eq!(
                parsed,
                SectionContent::Video {
                    url: "u".to_string(),
                    transcript: None
                }
            );
        }

        #[test]
        fn unknown_type_is_rejected() {
            let json = r#"{"type":"podcast","url":"u"}"#;
            assert!(serde_json::from_str::<SectionContent>(json).is_err());
        }
    }

    mod session_tests {
        use super::*;

        #[test]
        fn duration_and_question_count_sum_sections() {
            let session = Session {
                id: "s1".to_string(),
                title: "Session".to_string(),
                description: None,
                sections: vec![
                    Section {
                        id: "a".to_string(),
                        title: "Read".to_string(),
                        duration_minutes: 10,
                        content: SectionContent::Content {
                            body: "b".to_string(),
                        },
                    },
                    Section {
                        id: "b".to_string(),
                        title: "Quiz".to_string(),
                        duration_minutes: 5,
                        content: SectionContent::Quiz {
                            questions: vec![question(0), question(1)],
                        },
                    },
                ],
            };
            assert_eq!(session.duration_minutes(), 15);
            assert_eq!(session.question_count(), 2);
            assert!(session.section("b").is_some());
            assert!(session.section("z").is_none());
        }

        #[test]
        fn question_is_correct() {
            let q = question(1);
            assert!(q.is_correct(1));
            assert!(!q.is_correct(0));
        }
    }

    mod session_status_tests {
        use super::*;

        #[test]
        fn as_str_returns_correct_values() {
            assert_eq!(SessionStatus::NotStarted.as_str(), "not_started");
            assert_eq!(SessionStatus::InProgress.as_str(), "in_progress");
            assert_eq!(SessionStatus::Completed.as_str(), "completed");
            assert_eq!(SessionStatus::NeedsWork.as_str(), "needs_work");
        }

        #[test]
        fn from_str_accepts_hyphens_and_aliases() {
            assert_eq!(
                SessionStatus::from_str("not-started"),
                Some(SessionStatus::NotStarted)
            );
            assert_eq!(
                SessionStatus::from_str("Needs-Work"),
                Some(SessionStatus::NeedsWork)
            );
            assert_eq!(
                SessionStatus::from_str("done"),
                Some(SessionStatus::Completed)
            );
            assert_eq!(
                SessionStatus::from_str("started"),
                Some(SessionStatus::InProgress)
            );
        }

        #[test]
        fn from_str_round_trips_as_str() {
            for status in [
                SessionStatus::NotStarted,
                SessionStatus::InProgress,
                SessionStatus::Completed,
                SessionStatus::NeedsWork,
            ] {
                assert_eq!(SessionStatus::from_str(status.as_str()), Some(status));
            }
        }

        #[test]
        fn from_str_invalid_returns_none() {
            assert_eq!(SessionStatus::from_str("finished-ish"), None);
            assert_eq!(SessionStatus::from_str(""), None);
        }

        #[test]
        fn label_returns_human_readable() {
            assert_eq!(SessionStatus::NeedsWork.label(), "Needs Work");
            assert_eq!(SessionStatus::NotStarted.label(), "Not Started");
        }
    }

    mod attempt_tests {
        use super::*;

        fn make_attempt(correct: i64, answered: i64, ended: bool) -> Attempt {
            Attempt {
                id: 1,
                topic_id: "t".to_string(),
                session_id: "s".to_string(),
                started_at: "2026-01-01T00:00:00+00:00".to_string(),
                ended_at: ended.then(|| "2026-01-01T00:20:00+00:00".to_string()),
                correct,
                answered,
            }
        }

        #[test]
        fn score_none_without_questions() {
            assert_eq!(make_attempt(0, 0, true).score(0), None);
        }

        #[test]
        fn score_is_fraction_of_all_questions() {
            assert_eq!(make_attempt(3, 4, true).score(4), Some(0.75));
            assert_eq!(make_attempt(0, 5, true).score(5), Some(0.0));
        }

        #[test]
        fn unanswered_questions_count_against_score() {
            assert_eq!(make_attempt(1, 1, true).score(4), Some(0.25));
            assert_eq!(make_attempt(0, 0, true).score(4), Some(0.0));
        }

        #[test]
        fn open_until_ended() {
            assert!(make_attempt(0, 0, false).is_open());
            assert!(!make_attempt(0, 0, true).is_open());
        }
    }

    mod topic_summary_tests {
        use super::*;

        #[test]
        fn percent_complete_handles_empty_topic() {
            let summary = TopicSummary {
                topic_id: "t".to_string(),
                title: "T".to_string(),
                total_sessions: 0,
                completed: 0,
                in_progress: 0,
                needs_work: 0,
            };
            assert_eq!(summary.percent_complete(), 0.0);
        }

        #[test]
        fn percent_complete_counts_completed_only() {
            let summary = TopicSummary {
                topic_id: "t".to_string(),
                title: "T".to_string(),
                total_sessions: 4,
                completed: 1,
                in_progress: 2,
                needs_work: 1,
            };
            assert_eq!(summary.percent_complete(), 25.0);
        }
    }

    mod json_output_tests {
        use super::*;

        #[test]
        fn serializes_ok_correctly() {
            let output = JsonOutput::ok("test");
            let json = serde_json::to_string(&output).unwrap();
            assert!(json.contains("\"success\":true"));
            assert!(json.contains("\"data\":\"test\""));
            assert!(json.contains("\"error\":null"));
        }

        #[test]
        fn serializes_err_correctly() {
            let output = JsonOutput::<()>::err("error");
            let json = serde_json::to_string(&output).unwrap();
            assert!(json.contains("\"success\":false"));
            assert!(json.contains("\"data\":null"));
            assert!(json.contains("\"error\":\"error\""));
        }
    }
}
