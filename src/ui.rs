use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use colored::*;
use crossterm::{
    cursor::MoveTo,
    execute,
    terminal::{Clear, ClearType},
};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, warn};
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::task::JoinHandle;

use crate::api::CoachApi;
use crate::config::OutputFormat;
use crate::event_bus::{Event, EventBus};
use crate::models::{FormAnswers, Problem, QUESTIONS, Recommendation};
use crate::views;
use crate::wizard::{Wizard, WizardError, WizardStep};

/// Display switches for the terminal UI.
#[derive(Debug, Clone, Copy)]
pub struct UIOptions {
    pub clear_screen: bool,
    pub spinner: bool,
    pub summary: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Final output of a headless run.
#[derive(Debug, Serialize)]
struct HeadlessReport<'a> {
    session_id: &'a str,
    problems: &'a [Problem],
    recommendations: &'a [Recommendation],
}

/// Interactive terminal front end for the wizard.
pub struct TerminalUI<R, W> {
    input: Lines<R>,
    out: W,
    options: UIOptions,
    event_bus: Arc<EventBus>,
    start_time: Instant,
    started_at: chrono::DateTime<chrono::Local>,
}

impl<R, W> TerminalUI<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(input: R, out: W, options: UIOptions, event_bus: Arc<EventBus>) -> Self {
        Self {
            input: input.lines(),
            out,
            options,
            event_bus,
            start_time: Instant::now(),
            started_at: chrono::Local::now(),
        }
    }

    /// Drive the wizard until the user quits or input ends.
    pub async fn run<A: CoachApi>(
        &mut self,
        wizard: &mut Wizard<A>,
        mut answers: FormAnswers,
    ) -> Result<()> {
        let spinner = self
            .options
            .spinner
            .then(|| SpinnerTask::spawn(self.event_bus.clone()));

        wizard.start().await;
        loop {
            let flow = match wizard.step() {
                WizardStep::CollectingInput => self.collect_step(wizard, &mut answers).await?,
                WizardStep::ReviewingProblems => self.review_step(wizard).await?,
                WizardStep::ViewingRecommendations => {
                    self.recommendations_step(wizard, &mut answers).await?
                }
            };
            if flow == Flow::Quit {
                break;
            }
        }

        drop(spinner);
        if self.options.summary {
            self.print_summary().await?;
        }
        Ok(())
    }

    /// Submit, confirm and print the results without prompting.
    pub async fn run_headless<A: CoachApi>(
        &mut self,
        wizard: &mut Wizard<A>,
        answers: &FormAnswers,
        format: OutputFormat,
    ) -> Result<()> {
        wizard.start().await;
        wizard
            .submit_answers(answers)
            .await
            .map_err(|e| anyhow!("{}", e))?;
        wizard
            .confirm_problems()
            .await
            .map_err(|e| anyhow!("{}", e))?;

        match format {
            OutputFormat::Json => {
                let report = HeadlessReport {
                    session_id: wizard.session_id(),
                    problems: wizard.problems(),
                    recommendations: wizard.recommendations(),
                };
                let json = serde_json::to_string_pretty(&report)
                    .context("Failed to serialize results")?;
                writeln!(self.out, "{}", json)?;
            }
            OutputFormat::Terminal => {
                writeln!(self.out, "{}", views::problems_view(wizard.problems()))?;
                writeln!(
                    self.out,
                    "{}",
                    views::recommendations_view(wizard.recommendations(), wizard.problems())
                )?;
                if self.options.summary {
                    self.print_summary().await?;
                }
            }
        }
        Ok(())
    }

    async fn collect_step<A: CoachApi>(
        &mut self,
        wizard: &mut Wizard<A>,
        answers: &mut FormAnswers,
    ) -> Result<Flow> {
        self.clear()?;
        writeln!(self.out, "{}", views::form_header())?;

        if let Some(error) = wizard.error() {
            writeln!(self.out, "{}", views::form_progress(answers))?;
            writeln!(self.out, "{}", views::error_box(error))?;
            return match self
                .choose("[Enter] zkusit znovu  [z] zavřít a upravit  [q] konec")
                .await?
            {
                None => Ok(Flow::Quit),
                Some(choice) => match choice.as_str() {
                    "" => self.submit(wizard, answers).await,
                    "z" => {
                        wizard.dismiss_error().await;
                        Ok(Flow::Continue)
                    }
                    "q" => Ok(Flow::Quit),
                    _ => Ok(Flow::Continue),
                },
            };
        }

        for (index, question) in QUESTIONS.iter().enumerate() {
            writeln!(
                self.out,
                "{}",
                views::question_prompt(index, question, answers.get(question.field))
            )?;
            write!(self.out, "{} ", ">".bright_magenta())?;
            self.out.flush()?;

            let Some(line) = self.read_line().await? else {
                return Ok(Flow::Quit);
            };
            if !line.trim().is_empty() {
                answers.set(question.field, line);
            }
            writeln!(self.out)?;
        }

        writeln!(self.out, "{}", views::form_progress(answers))?;
        if !answers.is_complete() {
            writeln!(self.out, "{}", views::missing_answers_notice())?;
            return Ok(Flow::Continue);
        }
        self.submit(wizard, answers).await
    }

    async fn submit<A: CoachApi>(
        &mut self,
        wizard: &mut Wizard<A>,
        answers: &FormAnswers,
    ) -> Result<Flow> {
        match wizard.submit_answers(answers).await {
            Ok(()) | Err(WizardError::RequestFailed(_)) => {}
            Err(WizardError::IncompleteAnswers) => {
                writeln!(self.out, "{}", views::missing_answers_notice())?;
            }
            Err(e) => warn!("Submit ignored: {}", e),
        }
        Ok(Flow::Continue)
    }

    async fn review_step<A: CoachApi>(&mut self, wizard: &mut Wizard<A>) -> Result<Flow> {
        self.clear()?;
        writeln!(self.out, "{}", views::problems_view(wizard.problems()))?;

        let prompt = if let Some(error) = wizard.error() {
            writeln!(self.out, "{}", views::error_box(error))?;
            "[Enter] zkusit znovu  [z] zavřít  [q] konec"
        } else {
            "[Enter] potvrdit a získat doporučení  [q] konec"
        };

        match self.choose(prompt).await?.as_deref() {
            None | Some("q") => Ok(Flow::Quit),
            Some("") => {
                match wizard.confirm_problems().await {
                    Ok(()) | Err(WizardError::RequestFailed(_)) => {}
                    Err(e) => warn!("Confirm ignored: {}", e),
                }
                Ok(Flow::Continue)
            }
            Some("z") => {
                wizard.dismiss_error().await;
                Ok(Flow::Continue)
            }
            Some(_) => Ok(Flow::Continue),
        }
    }

    async fn recommendations_step<A: CoachApi>(
        &mut self,
        wizard: &mut Wizard<A>,
        answers: &mut FormAnswers,
    ) -> Result<Flow> {
        self.clear()?;
        writeln!(
            self.out,
            "{}",
            views::recommendations_view(wizard.recommendations(), wizard.problems())
        )?;

        match self.choose("[r] začít znovu  [q] konec").await?.as_deref() {
            None | Some("q") => Ok(Flow::Quit),
            Some("") | Some("r") => {
                wizard.reset().await;
                *answers = FormAnswers::default();
                Ok(Flow::Continue)
            }
            Some(_) => Ok(Flow::Continue),
        }
    }

    /// Print a menu line and read the lowercased choice; `None` on EOF.
    async fn choose(&mut self, menu: &str) -> Result<Option<String>> {
        write!(self.out, "{} ", menu.dimmed())?;
        self.out.flush()?;
        let choice = self.read_line().await?;
        writeln!(self.out)?;
        Ok(choice.map(|c| c.trim().to_lowercase()))
    }

    async fn read_line(&mut self) -> Result<Option<String>> {
        let line = self
            .input
            .next_line()
            .await
            .context("Failed to read input")?;
        if line.is_none() {
            debug!("Input closed");
        }
        Ok(line)
    }

    fn clear(&mut self) -> Result<()> {
        if self.options.clear_screen {
            execute!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        }
        Ok(())
    }

    async fn print_summary(&mut self) -> Result<()> {
        let metrics = self.event_bus.get_metrics().await;
        let elapsed = self.start_time.elapsed();

        writeln!(self.out)?;
        writeln!(self.out, "{}", "Shrnutí sezení".bright_white().bold())?;
        writeln!(
            self.out,
            "🕐 Začátek: {}",
            self.started_at.format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(
            self.out,
            "⏱️  Délka: {}:{:02}",
            elapsed.as_secs() / 60,
            elapsed.as_secs() % 60
        )?;
        writeln!(
            self.out,
            "🤖 Požadavky: {} (neúspěšné: {})",
            metrics.total_requests.to_string().bright_cyan(),
            metrics.failed_requests.to_string().bright_red()
        )?;
        writeln!(
            self.out,
            "📋 Problémy: {}  Doporučení: {}",
            metrics.problems_received.to_string().bright_green(),
            metrics.recommendations_received.to_string().bright_green()
        )?;
        writeln!(
            self.out,
            "🔄 Nové začátky: {}",
            metrics.resets.to_string().bright_magenta()
        )?;
        Ok(())
    }
}

/// Background task showing a spinner for every in-flight request announced
/// on the bus. Aborted when dropped.
struct SpinnerTask(JoinHandle<()>);

impl SpinnerTask {
    fn spawn(bus: Arc<EventBus>) -> Self {
        Self(spawn_spinner(bus))
    }

}

impl Drop for SpinnerTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn spawn_spinner(bus: Arc<EventBus>) -> JoinHandle<()> {
    let mut receiver = bus.subscribe();
    tokio::spawn(async move {
        let mut current: Option<ProgressBar> = None;
        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(_) => break,
            };
            match event {
                Event::RequestStarted { endpoint } => {
                    let pb = ProgressBar::new_spinner();
                    pb.set_style(
                        ProgressStyle::with_template("{spinner:.magenta} {msg}")
                            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                    );
                    pb.set_message(views::busy_label(endpoint));
                    pb.enable_steady_tick(Duration::from_millis(100));
                    current = Some(pb);
                }
                Event::RequestCompleted { .. } | Event::RequestFailed { .. } => {
                    if let Some(pb) = current.take() {
                        pb.finish_and_clear();
                    }
                }
                _ => {}
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Endpoint;
    use crate::wizard::tests::{FakeCoach, sample_problems, sample_recommendations, status_error};

    /// Writer whose every write fails, like a closed stdout.
    struct ClosedOutput;

    impl Write for ClosedOutput {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    const QUIET: UIOptions = UIOptions {
        clear_screen: false,
        spinner: false,
        summary: false,
    };

    async fn run_session(
        api: FakeCoach,
        script: &str,
        answers: FormAnswers,
    ) -> (Wizard<FakeCoach>, String) {
        colored::control::set_override(false);
        let bus = Arc::new(EventBus::new(64));
        let mut wizard = Wizard::new(api);
        crate::event_bus::EventEmitter::set_event_bus(&mut wizard, bus.clone());

        let mut out = Vec::new();
        let mut ui = TerminalUI::new(script.as_bytes(), &mut out, QUIET, bus);
        ui.run(&mut wizard, answers).await.unwrap();
        drop(ui);
        (wizard, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn test_full_session() {
        let api = FakeCoach::default()
            .with_analyze(Ok(sample_problems()))
            .with_recommend(Ok(sample_recommendations()));

        let (wizard, out) = run_session(
            api,
            "unavený\nmoc práce\nvíce spánku\n\nq\n",
            FormAnswers::default(),
        )
        .await;

        assert_eq!(wizard.step(), WizardStep::ViewingRecommendations);
        assert_eq!(
            wizard.api().analyze_calls.lock().unwrap()[0],
            FormAnswers::new("unavený", "moc práce", "více spánku")
        );
        assert_eq!(wizard.api().recommend_count(), 1);
        assert!(out.contains("Identifikované problémy"));
        assert!(out.contains("Pracovní stres"));
        assert!(out.contains("Odlož telefon před spaním"));
    }

    #[tokio::test]
    async fn test_blank_answer_reprompts_without_request() {
        let api = FakeCoach::default().with_analyze(Ok(sample_problems()));

        let (wizard, out) =
            run_session(api, "a\n\nc\n\nb\n\nq\n", FormAnswers::default()).await;

        assert!(out.contains("Vyplň prosím všechny tři odpovědi."));
        assert_eq!(wizard.api().analyze_count(), 1);
        assert_eq!(
            wizard.api().analyze_calls.lock().unwrap()[0],
            FormAnswers::new("a", "b", "c")
        );
        assert_eq!(wizard.step(), WizardStep::ReviewingProblems);
    }

    #[tokio::test]
    async fn test_failed_analyze_offers_retry() {
        let api = FakeCoach::default()
            .with_analyze(Err(status_error(Endpoint::Analyze, Some("Zkus to později"))))
            .with_analyze(Ok(sample_problems()));

        let (wizard, out) = run_session(api, "a\nb\nc\n\nq\n", FormAnswers::default()).await;

        assert!(out.contains("Zkus to později"));
        assert_eq!(wizard.api().analyze_count(), 2);
        assert_eq!(wizard.step(), WizardStep::ReviewingProblems);
        assert_eq!(wizard.error(), None);
    }

    #[tokio::test]
    async fn test_prefilled_answers_kept_on_enter() {
        let api = FakeCoach::default().with_analyze(Ok(sample_problems()));

        let (wizard, _) = run_session(
            api,
            "\n\nnové změny\nq\n",
            FormAnswers::new("klid", "nic", "nic"),
        )
        .await;

        assert_eq!(
            wizard.api().analyze_calls.lock().unwrap()[0],
            FormAnswers::new("klid", "nic", "nové změny")
        );
    }

    #[tokio::test]
    async fn test_eof_ends_session() {
        let (wizard, _) = run_session(FakeCoach::default(), "a\n", FormAnswers::default()).await;
        assert_eq!(wizard.api().analyze_count(), 0);
        assert_eq!(wizard.step(), WizardStep::CollectingInput);
    }

    #[tokio::test]
    async fn test_reset_returns_to_form() {
        let api = FakeCoach::default()
            .with_analyze(Ok(sample_problems()))
            .with_recommend(Ok(sample_recommendations()));

        let (wizard, out) = run_session(api, "a\nb\nc\n\nr\n", FormAnswers::default()).await;

        assert_eq!(wizard.step(), WizardStep::CollectingInput);
        assert!(wizard.problems().is_empty());
        assert!(wizard.recommendations().is_empty());
        assert_eq!(out.matches("Pojďme na to společně").count(), 2);
    }

    #[tokio::test]
    async fn test_headless_json_report() {
        colored::control::set_override(false);
        let api = FakeCoach::default()
            .with_analyze(Ok(sample_problems()))
            .with_recommend(Ok(sample_recommendations()));
        let bus = Arc::new(EventBus::new(16));
        let mut wizard = Wizard::new(api);

        let mut out = Vec::new();
        let mut ui = TerminalUI::new(&b""[..], &mut out, QUIET, bus);
        ui.run_headless(
            &mut wizard,
            &FormAnswers::new("a", "b", "c"),
            OutputFormat::Json,
        )
        .await
        .unwrap();
        drop(ui);

        let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(report["problems"].as_array().unwrap().len(), 2);
        assert_eq!(report["recommendations"][1]["problem_id"], 2);
        assert_eq!(report["session_id"], wizard.session_id());
    }

    #[tokio::test]
    async fn test_headless_failure_is_an_error() {
        let api = FakeCoach::default().with_analyze(Err(status_error(Endpoint::Analyze, None)));
        let bus = Arc::new(EventBus::new(16));
        let mut wizard = Wizard::new(api);

        let mut out = Vec::new();
        let mut ui = TerminalUI::new(&b""[..], &mut out, QUIET, bus);
        let err = ui
            .run_headless(
                &mut wizard,
                &FormAnswers::new("a", "b", "c"),
                OutputFormat::Terminal,
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Nepodařilo se analyzovat problémy");
    }

    #[tokio::test]
    async fn test_spinner_stops_when_output_fails() {
        let bus = Arc::new(EventBus::new(16));
        let mut wizard = Wizard::new(FakeCoach::default());
        let options = UIOptions {
            spinner: true,
            ..QUIET
        };

        let mut ui = TerminalUI::new(&b"a\nb\nc\n"[..], ClosedOutput, options, bus.clone());
        assert!(ui.run(&mut wizard, FormAnswers::default()).await.is_err());

        for _ in 0..100 {
            if bus.subscriber_count() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(wizard.api().analyze_count(), 0);
    }
}
