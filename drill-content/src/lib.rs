//! Question content for the daily drill: the record shapes, answers and the built-in bank.

pub mod answer;
pub mod bank;
pub mod question;
pub mod text;

pub use answer::{AnswerRecord, UserAnswer};
pub use bank::{BankStats, QuestionBank, StaticQuestionBank};
pub use question::{
    Category, FillQuestion, MatchQuestion, QuestionError, QuestionRecord, SingleQuestion,
};
