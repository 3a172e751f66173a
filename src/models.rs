use serde::{Deserialize, Serialize};

/// A problem identified by the coaching service from the user's answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub id: i64,
    pub title: String,
    pub description: String,
}

/// Advice generated for a single problem, linked by `problem_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub problem_id: i64,
    pub advice: String,
}

/// The three free-text answers collected by the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormAnswers {
    pub feeling: String,
    pub troubles: String,
    pub changes: String,
}

/// Identifies one of the three form fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Feeling,
    Troubles,
    Changes,
}

/// Static description of a form question.
#[derive(Debug, Clone, Copy)]
pub struct Question {
    pub field: Field,
    pub label: &'static str,
    pub placeholder: &'static str,
    pub icon: &'static str,
}

pub const QUESTIONS: [Question; 3] = [
    Question {
        field: Field::Feeling,
        label: "Jak se dnes cítíš?",
        placeholder: "Popiš, jak se právě teď cítíš...",
        icon: "💭",
    },
    Question {
        field: Field::Troubles,
        label: "Co tě v poslední době trápí?",
        placeholder: "Co tě nejvíc tíží nebo znepokojuje...",
        icon: "🤔",
    },
    Question {
        field: Field::Changes,
        label: "Co bys chtěl/a změnit?",
        placeholder: "Jaké změny by ti pomohly...",
        icon: "✨",
    },
];

impl FormAnswers {
    pub fn new(
        feeling: impl Into<String>,
        troubles: impl Into<String>,
        changes: impl Into<String>,
    ) -> Self {
        Self {
            feeling: feeling.into(),
            troubles: troubles.into(),
            changes: changes.into(),
        }
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Feeling => &self.feeling,
            Field::Troubles => &self.troubles,
            Field::Changes => &self.changes,
        }
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::Feeling => self.feeling = value,
            Field::Troubles => self.troubles = value,
            Field::Changes => self.changes = value,
        }
    }

    /// Number of fields holding something other than whitespace.
    pub fn filled_count(&self) -> usize {
        QUESTIONS
            .iter()
            .filter(|q| !self.get(q.field).trim().is_empty())
            .count()
    }

    pub fn is_complete(&self) -> bool {
        self.filled_count() == QUESTIONS.len()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub problems: Vec<Problem>,
}

#[derive(Debug, Serialize)]
pub struct RecommendRequest<'a> {
    pub problems: &'a [Problem],
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Body of a non-2xx response from the service.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
}
