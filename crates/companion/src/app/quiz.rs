use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};

use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub(crate) enum QuizError {
    #[error("failed to read question file {path}: {source}")]
    ReadQuestions {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("quiz has no question left to answer")]
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QuestionAnswer {
    pub(crate) question: String,
    pub(crate) answer: String,
}

/// Every recorded question/answer pair, formatted as one string for the chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QuizTranscript(String);

impl QuizTranscript {
    fn from_answers(answers: &[QuestionAnswer]) -> Self {
        let mut text = String::new();
        for (index, pair) in answers.iter().enumerate() {
            text.push_str(&format!(
                "Question {}: {}\nAnswer: {}\n",
                index + 1,
                pair.question,
                pair.answer
            ));
        }
        Self(text)
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QuizStep {
    NextQuestion,
    Finished,
}

/// One question per line; blank lines are skipped and any line ending works.
pub(crate) fn parse_questions(raw: &str) -> Vec<String> {
    raw.split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}

pub(crate) fn load_questions(path: &Path) -> Result<Vec<String>, QuizError> {
    let raw = fs::read_to_string(path).map_err(|source| QuizError::ReadQuestions {
        path: path.to_path_buf(),
        source,
    })?;
    let questions = parse_questions(&raw);
    info!(
        path = %path.display(),
        question_count = questions.len(),
        "questions_loaded"
    );
    Ok(questions)
}

/// Linear question sequence. The transcript goes out to every subscriber
/// exactly once, right after the last answer.
#[derive(Debug, Default)]
pub(crate) struct Quiz {
    questions: Vec<String>,
    answers: Vec<QuestionAnswer>,
    subscribers: Vec<Sender<QuizTranscript>>,
}

impl Quiz {
    pub(crate) fn new(questions: Vec<String>) -> Self {
        Self {
            questions,
            ..Self::default()
        }
    }

    pub(crate) fn subscribe(&mut self) -> Receiver<QuizTranscript> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers.push(sender);
        receiver
    }

    pub(crate) fn len(&self) -> usize {
        self.questions.len()
    }

    /// 1-based number of the question awaiting an answer.
    pub(crate) fn question_number(&self) -> Option<usize> {
        (!self.is_finished()).then_some(self.answers.len() + 1)
    }

    pub(crate) fn current_question(&self) -> Option<&str> {
        self.questions.get(self.answers.len()).map(String::as_str)
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.answers.len() >= self.questions.len()
    }

    pub(crate) fn submit_answer(&mut self, answer: &str) -> Result<QuizStep, QuizError> {
        let Some(question) = self.current_question() else {
            return Err(QuizError::Finished);
        };
        let pair = QuestionAnswer {
            question: question.to_string(),
            answer: answer.trim().to_string(),
        };
        self.answers.push(pair);
        debug!(answered = self.answers.len(), total = self.len(), "quiz_answer_recorded");

        if !self.is_finished() {
            return Ok(QuizStep::NextQuestion);
        }
        self.publish_transcript();
        Ok(QuizStep::Finished)
    }

    fn publish_transcript(&mut self) {
        let transcript = QuizTranscript::from_answers(&self.answers);
        self.subscribers
            .retain(|subscriber| subscriber.send(transcript.clone()).is_ok());
        info!(
            answered = self.answers.len(),
            subscriber_count = self.subscribers.len(),
            "quiz_completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn quiz(questions: &[&str]) -> Quiz {
        Quiz::new(questions.iter().map(|q| q.to_string()).collect())
    }

    #[test]
    fn parse_handles_mixed_line_endings_and_blank_lines() {
        let questions = parse_questions("One?\r\nTwo?\rThree?\n\n  \r\nFour?");
        assert_eq!(questions, vec!["One?", "Two?", "Three?", "Four?"]);
    }

    #[test]
    fn answers_advance_through_questions() {
        let mut quiz = quiz(&["Name?", "Mood?"]);
        assert_eq!(quiz.current_question(), Some("Name?"));
        assert_eq!(quiz.question_number(), Some(1));

        assert_eq!(quiz.submit_answer("Sam").expect("answer"), QuizStep::NextQuestion);
        assert_eq!(quiz.current_question(), Some("Mood?"));
        assert_eq!(quiz.question_number(), Some(2));

        assert_eq!(quiz.submit_answer("good").expect("answer"), QuizStep::Finished);
        assert!(quiz.is_finished());
        assert_eq!(quiz.current_question(), None);
        assert_eq!(quiz.question_number(), None);
    }

    #[test]
    fn transcript_is_published_once_to_every_subscriber() {
        let mut quiz = quiz(&["Name?", "Mood?"]);
        let first = quiz.subscribe();
        let second = quiz.subscribe();
        quiz.submit_answer("Sam").expect("answer");
        assert!(first.try_recv().is_err());

        quiz.submit_answer(" good ").expect("answer");
        let expected = "Question 1: Name?\nAnswer: Sam\nQuestion 2: Mood?\nAnswer: good\n";
        assert_eq!(first.try_recv().expect("first").as_str(), expected);
        assert_eq!(second.try_recv().expect("second").as_str(), expected);

        assert!(matches!(quiz.submit_answer("extra"), Err(QuizError::Finished)));
        assert!(first.try_recv().is_err());
    }

    #[test]
    fn dropped_subscriber_does_not_block_others() {
        let mut quiz = quiz(&["Only?"]);
        drop(quiz.subscribe());
        let kept = quiz.subscribe();
        quiz.submit_answer("yes").expect("answer");
        assert!(kept.try_recv().is_ok());
    }

    #[test]
    fn empty_quiz_never_steps() {
        let mut quiz = Quiz::new(Vec::new());
        let receiver = quiz.subscribe();
        assert!(quiz.is_finished());
        assert!(matches!(quiz.submit_answer("x"), Err(QuizError::Finished)));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn load_questions_reports_missing_file() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("questions.txt");
        assert!(matches!(
            load_questions(&path),
            Err(QuizError::ReadQuestions { .. })
        ));

        std::fs::write(&path, "A?\nB?\n").expect("write");
        assert_eq!(load_questions(&path).expect("questions").len(), 2);
    }
}
