//! Per-respondent walk through a random sample of image pairs.
//!
//! A [`SurveySession`] owns the pairs drawn for one respondent, a cursor into
//! them and the answers collected so far. The cursor points one past the
//! question most recently served, so an answer always belongs to the pair at
//! `current_index - 1`.

use chrono::{DateTime, Local};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::{Builder, Uuid};

use crate::error::{Result, SurveyError};
use crate::pair::{ImagePair, PairUniverse};
use crate::sink::{ResultsSink, Submission};

/// Number of questions drawn per session unless configured otherwise.
pub const DEFAULT_QUESTION_COUNT: usize = 10;

/// One respondent's judgment of one pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub grade: String,
    pub prefix: String,
    pub real_filename: String,
    pub synth_filename: String,
    pub similarity_rating: String,
    pub weather_rating: String,
}

/// Ratings submitted for the most recently served question.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Answer {
    #[serde(default)]
    pub similarity: Option<String>,
    #[serde(default)]
    pub weather: Option<String>,
}

impl Answer {
    pub fn new(similarity: impl Into<String>, weather: impl Into<String>) -> Self {
        Self {
            similarity: Some(similarity.into()),
            weather: Some(weather.into()),
        }
    }

    /// Both ratings, trimmed, or the name of the first one missing.
    fn ratings(&self) -> Result<(String, String)> {
        let similarity = present(&self.similarity)
            .ok_or(SurveyError::Validation { missing: "similarity" })?;
        let weather = present(&self.weather).ok_or(SurveyError::Validation { missing: "weather" })?;
        Ok((similarity, weather))
    }
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// A question ready to be rendered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Question {
    pub prefix: String,
    pub real_filename: String,
    pub synth_filename: String,
    /// 1-based position within the session.
    pub number: usize,
    pub total: usize,
}

/// Result of moving a session forward.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Question(Question),
    Complete,
}

/// What happened to a submitted answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// Appended to the session's responses.
    Recorded,
    /// No served question was waiting for an answer.
    Ignored,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Uninitialized,
    InProgress,
    Complete,
}

/// State held for one respondent between requests.
#[derive(Clone, Debug)]
pub struct SurveySession {
    id: Uuid,
    grade: String,
    sampled_pairs: Vec<ImagePair>,
    current_index: usize,
    responses: Vec<ResponseRecord>,
    submitted: bool,
}

impl SurveySession {
    /// Start a session by drawing `min(question_count, universe.len())` pairs
    /// without replacement, in random order.
    pub fn start<R>(
        universe: &PairUniverse,
        grade: impl Into<String>,
        question_count: usize,
        rng: &mut R,
    ) -> Self
    where
        R: Rng + ?Sized,
    {
        let grade = grade.into();
        let id = Builder::from_random_bytes(rng.gen()).into_uuid();
        let k = question_count.min(universe.len());
        let mut pool: Vec<&ImagePair> = universe.iter().collect();
        let (picked, _) = pool.partial_shuffle(rng, k);
        let sampled_pairs: Vec<ImagePair> = picked.iter().map(|p| (**p).clone()).collect();
        info!(%id, %grade, questions = sampled_pairs.len(), "session started");
        Self {
            id,
            grade,
            sampled_pairs,
            current_index: 0,
            responses: Vec::new(),
            submitted: false,
        }
    }

    /// Random v4 id, also written next to every delivered row.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn grade(&self) -> &str {
        &self.grade
    }

    pub fn sampled_pairs(&self) -> &[ImagePair] {
        &self.sampled_pairs
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn responses(&self) -> &[ResponseRecord] {
        &self.responses
    }

    pub fn total(&self) -> usize {
        self.sampled_pairs.len()
    }

    /// Whether the completed responses have been delivered to a sink.
    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Whether the session is finished but its responses have not reached a
    /// sink yet. Such a session holds the only copy of those responses.
    pub fn awaiting_delivery(&self) -> bool {
        !self.submitted && !self.responses.is_empty() && self.state() == SessionState::Complete
    }

    /// Index of the served question still waiting for an answer, if any.
    fn pending(&self) -> Option<usize> {
        (self.current_index > 0 && self.responses.len() < self.current_index)
            .then(|| self.current_index - 1)
    }

    pub fn state(&self) -> SessionState {
        if self.current_index >= self.sampled_pairs.len() && self.pending().is_none() {
            SessionState::Complete
        } else {
            SessionState::InProgress
        }
    }

    /// The question currently waiting for an answer, as it was served.
    pub fn pending_question(&self) -> Option<Question> {
        self.pending().map(|i| self.question_at(i))
    }

    fn question_at(&self, index: usize) -> Question {
        let pair = &self.sampled_pairs[index];
        Question {
            prefix: pair.prefix.clone(),
            real_filename: pair.real_filename.clone(),
            synth_filename: pair.synth_filename.clone(),
            number: index + 1,
            total: self.sampled_pairs.len(),
        }
    }

    /// Attach `answer` to the most recently served question.
    ///
    /// Without a waiting question the answer is ignored. A missing rating
    /// fails with [`SurveyError::Validation`] and leaves the session untouched.
    pub fn submit_answer(&mut self, answer: &Answer) -> Result<AnswerOutcome> {
        let Some(index) = self.pending() else {
            debug!(current = self.current_index, "no question waiting, answer ignored");
            return Ok(AnswerOutcome::Ignored);
        };
        let (similarity_rating, weather_rating) = answer.ratings().inspect_err(|err| {
            warn!(question = index + 1, %err, "rejected answer");
        })?;
        let pair = &self.sampled_pairs[index];
        self.responses.push(ResponseRecord {
            grade: self.grade.clone(),
            prefix: pair.prefix.clone(),
            real_filename: pair.real_filename.clone(),
            synth_filename: pair.synth_filename.clone(),
            similarity_rating,
            weather_rating,
        });
        debug!(question = index + 1, prefix = %pair.prefix, "answer recorded");
        Ok(AnswerOutcome::Recorded)
    }

    /// Serve the next question and move the cursor past it.
    ///
    /// A served question that was never answered (a reloaded page) is served
    /// again instead of being skipped.
    pub fn serve_next(&mut self) -> Step {
        if let Some(question) = self.pending_question() {
            debug!(question = question.number, "re-serving unanswered question");
            return Step::Question(question);
        }
        if self.current_index >= self.sampled_pairs.len() {
            return Step::Complete;
        }
        let question = self.question_at(self.current_index);
        self.current_index += 1;
        Step::Question(question)
    }

    /// Serve the next question, handing the responses to `sink` the first
    /// time the session is found complete.
    ///
    /// A failed hand-off is returned to the caller and retried by the next
    /// call; a successful one is never repeated. Sessions without responses
    /// never reach the sink.
    pub async fn advance(&mut self, sink: &dyn ResultsSink, now: DateTime<Local>) -> Result<Step> {
        let step = self.serve_next();
        if step == Step::Complete && !self.submitted {
            if !self.responses.is_empty() {
                let submission = Submission {
                    label: self.grade.clone(),
                    session: self.id,
                    timestamp: now,
                    records: self.responses.clone(),
                };
                if let Err(err) = sink.append(&submission).await {
                    warn!(grade = %self.grade, %err, "failed to store responses");
                    return Err(err.into());
                }
                info!(grade = %self.grade, rows = self.responses.len(), "responses stored");
            }
            self.submitted = true;
        }
        Ok(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn universe(n: usize) -> PairUniverse {
        let real: Vec<String> = (0..n).map(|i| format!("2024_{i:04}.jpg")).collect();
        let synth: Vec<String> = (0..n).map(|i| format!("2024_{i:04}_gen.jpg")).collect();
        PairUniverse::build(real, synth)
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn samples_without_replacement() {
        let universe = universe(30);
        let session = SurveySession::start(&universe, "1", 10, &mut rng());
        assert_eq!(session.total(), 10);
        let unique: HashSet<_> = session.sampled_pairs().iter().collect();
        assert_eq!(unique.len(), 10);
        assert!(session.sampled_pairs().iter().all(|p| universe.get(&p.prefix) == Some(p)));
    }

    #[test]
    fn sample_is_capped_by_universe() {
        let session = SurveySession::start(&universe(3), "1", 10, &mut rng());
        assert_eq!(session.total(), 3);
    }

    #[test]
    fn answer_before_first_question_is_ignored() {
        let mut session = SurveySession::start(&universe(2), "1", 10, &mut rng());
        let outcome = session.submit_answer(&Answer::default()).unwrap();
        assert_eq!(outcome, AnswerOutcome::Ignored);
        assert!(session.responses().is_empty());
    }

    #[test]
    fn blank_weather_is_rejected_without_mutation() {
        let mut session = SurveySession::start(&universe(2), "1", 10, &mut rng());
        session.serve_next();
        let answer = Answer {
            similarity: Some("3".into()),
            weather: Some("  ".into()),
        };
        let err = session.submit_answer(&answer).unwrap_err();
        assert!(matches!(err, SurveyError::Validation { missing: "weather" }));
        assert_eq!(session.current_index(), 1);
        assert!(session.responses().is_empty());
    }

    #[test]
    fn reload_reserves_same_question() {
        let mut session = SurveySession::start(&universe(5), "1", 3, &mut rng());
        let Step::Question(first) = session.serve_next() else {
            panic!("expected question");
        };
        let Step::Question(again) = session.serve_next() else {
            panic!("expected question");
        };
        assert_eq!(first, again);
        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn duplicate_answer_is_ignored() {
        let mut session = SurveySession::start(&universe(5), "1", 3, &mut rng());
        session.serve_next();
        let answer = Answer::new("4", "2");
        assert_eq!(session.submit_answer(&answer).unwrap(), AnswerOutcome::Recorded);
        assert_eq!(session.submit_answer(&answer).unwrap(), AnswerOutcome::Ignored);
        assert_eq!(session.responses().len(), 1);
    }

    #[test]
    fn questions_are_numbered_from_one() {
        let mut session = SurveySession::start(&universe(4), "1", 2, &mut rng());
        let Step::Question(q) = session.serve_next() else {
            panic!("expected question");
        };
        assert_eq!((q.number, q.total), (1, 2));
        assert_eq!(q.prefix, session.sampled_pairs()[0].prefix);
    }

    #[tokio::test]
    async fn completion_submits_once() {
        let sink = MemorySink::default();
        let mut session = SurveySession::start(&universe(4), "2", 2, &mut rng());
        assert!(matches!(session.advance(&sink, Local::now()).await.unwrap(), Step::Question(_)));
        session.submit_answer(&Answer::new("5", "1")).unwrap();
        assert!(matches!(session.advance(&sink, Local::now()).await.unwrap(), Step::Question(_)));
        session.submit_answer(&Answer::new("2", "3")).unwrap();
        assert_eq!(session.advance(&sink, Local::now()).await.unwrap(), Step::Complete);
        assert_eq!(session.advance(&sink, Local::now()).await.unwrap(), Step::Complete);
        assert_eq!(session.state(), SessionState::Complete);
        assert!(session.is_submitted());

        let submissions = sink.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].label, "2");
        assert_eq!(submissions[0].session, session.id());
        let prefixes: Vec<_> = submissions[0].records.iter().map(|r| r.prefix.clone()).collect();
        let sampled: Vec<_> = session.sampled_pairs().iter().map(|p| p.prefix.clone()).collect();
        assert_eq!(prefixes, sampled);
        assert_eq!(submissions[0].records[0].similarity_rating, "5");
    }

    #[test]
    fn seeded_sessions_share_an_id() {
        let a = SurveySession::start(&universe(3), "1", 2, &mut rng());
        let b = SurveySession::start(&universe(3), "1", 2, &mut rng());
        let c = SurveySession::start(&universe(3), "1", 2, &mut StdRng::seed_from_u64(8));
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
        assert_eq!(a.id().get_version_num(), 4);
    }

    #[tokio::test]
    async fn finished_session_awaits_delivery_until_stored() {
        let mut session = SurveySession::start(&universe(1), "1", 1, &mut rng());
        assert!(!session.awaiting_delivery());
        session.serve_next();
        session.submit_answer(&Answer::new("3", "3")).unwrap();
        assert!(session.awaiting_delivery());

        session.advance(&MemorySink::default(), Local::now()).await.unwrap();
        assert!(!session.awaiting_delivery());
    }

    #[tokio::test]
    async fn empty_universe_completes_without_sink() {
        let sink = MemorySink::default();
        let mut session = SurveySession::start(&PairUniverse::default(), "1", 10, &mut rng());
        assert_eq!(session.state(), SessionState::Complete);
        assert_eq!(session.advance(&sink, Local::now()).await.unwrap(), Step::Complete);
        assert!(sink.submissions().is_empty());
        assert!(!session.awaiting_delivery());
    }
}
