//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{QuizBank, COMPREHENSIVE_ID};
use crate::session::{Phase, SessionController};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    OpenSession {
        #[serde(default, rename = "sessionId")]
        session_id: Option<String>,
    },
    ListBanks,
    SelectQuiz {
        #[serde(rename = "quizId")]
        quiz_id: String,
    },
    SelectOption {
        index: usize,
    },
    Submit,
    Advance,
    Restart,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Session {
        session: SessionView,
    },
    Banks {
        banks: Vec<BankSummary>,
    },
    Error {
        message: String,
    },
}

/// Question as shown to the user. The correct answer is not part of it.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOut {
    pub id: usize,
    pub question_id: String,
    pub text: String,
    pub options: Vec<String>,
    pub bank: String,
}

/// DTO used by both WS and HTTP for session delivery.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: String,
    pub phase: &'static str,
    pub selected_quiz: String,
    pub quiz_name: String,
    pub cursor: usize,
    pub total: usize,
    pub question: Option<QuestionOut>,
    pub selected_option: Option<usize>,
    pub revealed: bool,
    /// Present once revealed; `-1` when the question has no resolvable answer.
    pub correct_answer: Option<i64>,
    pub was_correct: Option<bool>,
    pub score: u32,
    pub progress: u32,
    pub completed: usize,
}

/// Build the public view of a session.
pub fn to_view(session_id: &str, s: &SessionController) -> SessionView {
    let hide_question = matches!(s.phase(), Phase::Loading | Phase::NoContent);
    let question = s.current_question().filter(|_| !hide_question);
    SessionView {
        session_id: session_id.to_string(),
        phase: s.phase().name(),
        selected_quiz: s.selected_quiz().to_string(),
        quiz_name: s.display_name(),
        cursor: s.cursor(),
        total: s.questions().len(),
        question: question.map(|q| QuestionOut {
            id: q.id,
            question_id: q.question_id.clone(),
            text: q.text.clone(),
            options: q.options.clone(),
            bank: q.bank.clone(),
        }),
        selected_option: s.selected_option(),
        revealed: s.is_revealed(),
        correct_answer: question.filter(|_| s.is_revealed()).map(|q| q.correct_index()),
        was_correct: s.last_submission_correct(),
        score: s.score(),
        progress: s.progress_percent(),
        completed: s.completed().len(),
    }
}

/// Entry of the quiz picker.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BankSummary {
    pub id: String,
    pub name: String,
    pub question_count: usize,
    pub chapter: Option<u32>,
}

/// Comprehensive review first, then banks in load (chapter) order.
pub fn bank_summaries(banks: &[QuizBank]) -> Vec<BankSummary> {
    let total = banks.iter().map(|b| b.questions.len()).sum();
    std::iter::once(BankSummary {
        id: COMPREHENSIVE_ID.into(),
        name: "Comprehensive Review (All Questions)".into(),
        question_count: total,
        chapter: None,
    })
    .chain(banks.iter().map(|b| BankSummary {
        id: b.id.clone(),
        name: b.name.clone(),
        question_count: b.questions.len(),
        chapter: Some(b.chapter()).filter(|&c| c != crate::domain::NO_CHAPTER),
    }))
    .collect()
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Default, Deserialize)]
pub struct OpenSessionIn {
    #[serde(default, rename = "sessionId")]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SelectQuizIn {
    #[serde(rename = "quizId")]
    pub quiz_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectOptionIn {
    pub index: usize,
}

#[derive(Serialize)]
pub struct BanksOut {
    pub loaded: bool,
    pub banks: Vec<BankSummary>,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthOut {
    pub ok: bool,
    pub banks_loaded: bool,
}
