use std::io::Write;
use std::time::Duration;

use anyhow::{Context, bail};
use services::{Explanation, ExplanationSlot, SessionService, SessionState};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

const OPTION_LABELS: [char; 4] = ['A', 'B', 'C', 'D'];

const EXPLANATION_LOADING: &str = "Explanation still loading; moving on.";

/// Accepts `a`..`d` (any case) or `1`..`n`.
pub fn parse_choice(line: &str, option_count: usize) -> Option<usize> {
    let line = line.trim();
    let mut chars = line.chars();
    let index = match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => {
            OPTION_LABELS
                .iter()
                .position(|label| label.eq_ignore_ascii_case(&c))?
        }
        _ => line.parse::<usize>().ok()?.checked_sub(1)?,
    };
    (index < option_count).then_some(index)
}

fn label(index: usize) -> char {
    OPTION_LABELS.get(index).copied().unwrap_or('?')
}

/// Drive a session to completion from line-based input.
///
/// Explanations for wrong answers are awaited up to `explain_wait` before
/// moving on; a late one is not shown. Input is read asynchronously so a
/// pending explanation keeps running while the student types.
pub async fn run<R: AsyncBufRead + Unpin, W: Write>(
    session: &mut SessionService,
    input: &mut R,
    out: &mut W,
    explain_wait: Duration,
) -> anyhow::Result<()> {
    for text in session.supporting_texts() {
        writeln!(out, "── {} ──\n{}\n", text.title(), text.content())?;
    }

    while session.state() == SessionState::InProgress {
        let Some(question) = session.current_question() else {
            break;
        };
        let progress = session.progress();
        writeln!(
            out,
            "\n[{}/{}] ({}, {} pts) {}",
            progress.position + 1,
            progress.total,
            question.subject(),
            question.points(),
            question.prompt()
        )?;
        if let Some(context) = question.context_text() {
            writeln!(out, "  {context}")?;
        }
        for (index, option) in question.options().iter().enumerate() {
            writeln!(out, "  {}) {option}", label(index))?;
        }
        let option_count = question.options().len();

        let choice = loop {
            write!(out, "> ")?;
            out.flush()?;
            let mut line = String::new();
            if input.read_line(&mut line).await.context("reading answer")? == 0 {
                bail!("input closed before the session finished");
            }
            match parse_choice(&line, option_count) {
                Some(choice) => break choice,
                None => writeln!(out, "Pick one of A-{}.", label(option_count - 1))?,
            }
        };

        session.select_option(choice)?;
        let feedback = session.reveal_feedback()?;
        if feedback.answer.is_correct {
            writeln!(out, "Correct! +{} pts", feedback.answer.points)?;
        } else {
            writeln!(
                out,
                "Wrong. The answer is {}.",
                label(feedback.correct_index)
            )?;
            if let Some(slot) = feedback.explanation {
                show_explanation(&slot, out, explain_wait).await?;
            }
        }
        session.advance()?;
    }
    Ok(())
}

async fn show_explanation<W: Write>(
    slot: &ExplanationSlot,
    out: &mut W,
    wait: Duration,
) -> anyhow::Result<()> {
    match tokio::time::timeout(wait, slot.wait()).await {
        Ok(Explanation::Ready(text) | Explanation::Fallback(text)) => {
            writeln!(out, "Tip: {text}")?;
        }
        Ok(Explanation::Pending) | Err(_) => {
            tracing::debug!("explanation still pending; moving on");
            writeln!(out, "{EXPLANATION_LOADING}")?;
        }
    }
    Ok(())
}
