//! Stateless renderers for the three wizard screens.
//!
//! Every function returns the text to print; nothing here touches the
//! terminal or the controller.

use std::collections::HashMap;
use std::fmt::Write;

use colored::*;

use crate::api::Endpoint;
use crate::models::{FormAnswers, Problem, Question, Recommendation, QUESTIONS};

const RULE_WIDTH: usize = 72;

/// Icons cycled over recommendation cards.
const CARD_ICONS: [&str; 3] = ["💜", "💚", "💛"];

fn rule() -> String {
    "=".repeat(RULE_WIDTH).bright_blue().to_string()
}

fn header(icon: &str, title: &str, subtitle: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "{} {}", icon, title.bright_white().bold());
    let _ = writeln!(out, "{}", subtitle);
    let _ = writeln!(out, "{}", rule());
    out
}

/// Dots-and-bars indicator: `filled` of `total` segments lit.
fn progress_dots(filled: usize, total: usize) -> String {
    (0..total)
        .map(|i| {
            if i < filled {
                "●".bright_magenta().to_string()
            } else {
                "○".dimmed().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("─")
}

pub fn form_header() -> String {
    header(
        "🧭",
        "Pojďme na to společně",
        "Odpověz na 3 jednoduché otázky a já ti pomohu identifikovat hlavní oblasti pro zlepšení.",
    )
}

/// Form progress line, e.g. `●─●─○ 2/3`.
pub fn form_progress(answers: &FormAnswers) -> String {
    let filled = answers.filled_count();
    format!("{} {}/{}", progress_dots(filled, QUESTIONS.len()), filled, QUESTIONS.len())
}

/// Prompt for one question; `index` is 0-based.
pub fn question_prompt(index: usize, question: &Question, current: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} {}",
        question.icon,
        question.label.bold(),
        format!("{}/{}", index + 1, QUESTIONS.len()).dimmed()
    );
    if current.trim().is_empty() {
        let _ = write!(out, "  {}", question.placeholder.dimmed());
    } else {
        let _ = write!(out, "  {} {}", "[Enter ponechá]".dimmed(), current);
    }
    out
}

pub fn missing_answers_notice() -> String {
    "⚠️  Vyplň prosím všechny tři odpovědi.".yellow().to_string()
}

/// Label shown next to the spinner while a request is in flight.
pub fn busy_label(endpoint: Endpoint) -> &'static str {
    match endpoint {
        Endpoint::Analyze => "Analyzuji tvou situaci...",
        Endpoint::Recommend => "Připravuji doporučení...",
    }
}

pub fn problems_view(problems: &[Problem]) -> String {
    let mut out = header(
        "🔍",
        "Identifikované problémy",
        "Na základě tvých odpovědí jsem identifikoval tyto hlavní oblasti k řešení.",
    );
    let _ = writeln!(out, "{} {}", progress_dots(2, 3), "Krok 2/3".dimmed());
    let _ = writeln!(out);

    for (index, problem) in problems.iter().enumerate() {
        let _ = writeln!(
            out,
            "{} {}",
            format!("[{}]", index + 1).bright_cyan().bold(),
            problem.title.bold()
        );
        let _ = writeln!(out, "    {}", problem.description);
        let _ = writeln!(out);
    }

    let _ = writeln!(
        out,
        "💡 {}",
        "Pokud souhlasíš s těmito problémy, potvrď a já ti připravím konkrétní doporučení."
            .blue()
    );
    out
}

/// Title of the problem a recommendation refers to, or a placeholder.
pub fn recommendation_title(rec: &Recommendation, by_id: &HashMap<i64, &Problem>) -> String {
    match by_id.get(&rec.problem_id) {
        Some(problem) if !problem.title.is_empty() => problem.title.clone(),
        _ => format!("Problém {}", rec.problem_id),
    }
}

pub fn recommendations_view(recommendations: &[Recommendation], problems: &[Problem]) -> String {
    let by_id: HashMap<i64, &Problem> = problems.iter().map(|p| (p.id, p)).collect();

    let mut out = header(
        "🎯",
        "Tvá doporučení",
        "Na základě identifikovaných problémů jsem připravil konkrétní kroky, které ti pomohou.",
    );
    let _ = writeln!(out, "{} {}", progress_dots(3, 3), "Hotovo!".green().bold());
    let _ = writeln!(out);

    for (index, rec) in recommendations.iter().enumerate() {
        let icon = CARD_ICONS[index % CARD_ICONS.len()];
        let _ = writeln!(
            out,
            "{} {}  {}",
            icon,
            format!("Problém {}", index + 1).dimmed(),
            recommendation_title(rec, &by_id).bold()
        );
        let _ = writeln!(out, "    {}", rec.advice);
        let _ = writeln!(out);
    }

    if recommendations.is_empty() {
        let _ = writeln!(out, "{}", "Žádná doporučení k zobrazení".dimmed());
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "🌟 {}", "Skvělá práce!".green().bold());
    let _ = writeln!(
        out,
        "   {}",
        "První krok ke změně je uvědomění si problémů. Teď je čas začít pracovat na jejich řešení."
            .green()
    );
    out
}

pub fn error_box(message: &str) -> String {
    format!("{} {}", "✗".red().bold(), message.red())
}
