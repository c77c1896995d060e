//! Core of the image-pair perceptual survey.
//!
//! The [`PairUniverse`] joins real photos with their synthetic counterparts
//! once at startup. Each respondent then gets a [`SurveySession`] that draws a
//! random subset of pairs, serves them one at a time, validates the two
//! ratings given for each and hands the finished responses to a
//! [`ResultsSink`] exactly once.
//!
//! ```
//! use survey::{Answer, PairUniverse, Step, SurveySession};
//!
//! let universe = PairUniverse::build(["a.jpg", "b.jpg"], ["a_x_y.jpg", "b_q_r.jpg"]);
//! let mut session = SurveySession::start(&universe, "1", 10, &mut rand::thread_rng());
//! assert_eq!(session.total(), 2);
//! assert!(matches!(session.serve_next(), Step::Question(_)));
//! session.submit_answer(&Answer::new("3", "4")).unwrap();
//! ```

pub mod csv_sink;
pub mod error;
pub mod listing;
pub mod pair;
pub mod session;
pub mod sink;
pub mod webhook_sink;

pub use csv_sink::CsvFileSink;
pub use error::{Result, SinkError, SurveyError};
pub use listing::{DirListing, FileListing, StaticListing, index_directories};
pub use pair::{DEFAULT_DELIMITER, ImagePair, PairUniverse};
pub use session::{
    Answer, AnswerOutcome, DEFAULT_QUESTION_COUNT, Question, ResponseRecord, SessionState, Step,
    SurveySession,
};
pub use sink::{MemorySink, ResultsSink, Submission};
pub use webhook_sink::WebhookSink;
