use anyhow::{bail, Context, Result};
use rustyline::{error::ReadlineError, DefaultEditor};
use std::io::{BufRead, Write};
use tracing::debug;

use super::{check_id_pattern, check_out_dir, resolve_inputs, RunConfig, RunPlan};
use crate::error::DatasetError;

/// Operator's answer to the confirmation question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    Abort,
    Redo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Collecting,
    Confirming,
}

/// Where answers come from and where complaints about them go.
pub trait LineSource {
    /// Show `prompt` and read one answer. `None` once the input is closed.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;

    fn notice(&mut self, message: &str) -> Result<()>;
}

/// Interactive terminal with line editing and in-session history.
pub struct Terminal {
    editor: DefaultEditor,
}

impl Terminal {
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new().context("opening the terminal")?;
        Ok(Self { editor })
    }
}

impl LineSource for Terminal {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => Ok(None),
            Err(e) => Err(e).context("reading operator input"),
        }
    }

    fn notice(&mut self, message: &str) -> Result<()> {
        println!("{}", message);
        Ok(())
    }
}

/// Answers read line by line from any reader, prompts echoed to a writer.
pub struct Scripted<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Scripted<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> LineSource for Scripted<R, W> {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;
        let mut line = String::new();
        let n = self
            .input
            .read_line(&mut line)
            .context("reading operator input")?;
        Ok((n > 0).then_some(line))
    }

    fn notice(&mut self, message: &str) -> Result<()> {
        writeln!(self.output, "{}", message)?;
        Ok(())
    }
}

/// Question/answer loop collecting and confirming a [`RunConfig`].
pub struct Prompter<S> {
    source: S,
}

impl<S: LineSource> Prompter<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    fn read_answer(&mut self, prompt: &str) -> Result<String> {
        match self.source.read_line(prompt)? {
            Some(line) => Ok(line.trim().to_string()),
            None => bail!("input closed before the configuration was confirmed"),
        }
    }

    /// Ask until `check` accepts the answer. An empty answer takes `default`.
    /// Returns the answer together with what `check` made of it.
    fn ask<T>(
        &mut self,
        message: &str,
        default: &str,
        check: impl Fn(&str) -> Result<T, DatasetError>,
    ) -> Result<(String, T)> {
        let prompt = if default.is_empty() {
            format!("? {} ", message)
        } else {
            format!("? {} ({}) ", message, default)
        };
        loop {
            let answer = self.read_answer(&prompt)?;
            let value = if answer.is_empty() {
                default.to_string()
            } else {
                answer
            };
            match check(&value) {
                Ok(checked) => return Ok((value, checked)),
                Err(e) => self.source.notice(&format!(">> {}", e))?,
            }
        }
    }

    /// Ask for every interactive field, offering `current` values as defaults.
    pub fn collect(&mut self, current: &RunConfig) -> Result<RunConfig> {
        let (glob, inputs) = self.ask(
            "Enter the glob expression to get the data files",
            &current.glob,
            resolve_inputs,
        )?;
        let (id_pattern, _) = self.ask(
            "Enter a regex with a single capture group for an integer to identify the test number",
            &current.id_pattern,
            |v| check_id_pattern(&inputs, v),
        )?;
        let (out_dir, _) = self.ask(
            "Enter the output directory. It may not exist, but if it does, it must be empty",
            &current.out_dir,
            check_out_dir,
        )?;
        let (scenario, _) = self.ask(
            "Enter the name of the ns-3 simulation scenario you tested",
            &current.scenario,
            |_| Ok(()),
        )?;

        Ok(RunConfig {
            glob,
            id_pattern,
            out_dir,
            scenario,
            ..current.clone()
        })
    }

    pub fn confirm(&mut self, files: usize) -> Result<Decision> {
        let prompt = format!(
            "? Loaded {} files. Proceed? [Y]es / [n]o, abort / [r]edo ",
            files
        );
        loop {
            match self.read_answer(&prompt)?.to_lowercase().as_str() {
                "" | "y" | "yes" => return Ok(Decision::Proceed),
                "n" | "no" => return Ok(Decision::Abort),
                "r" | "redo" => return Ok(Decision::Redo),
                other => self.source.notice(&format!(">> unknown choice `{}`", other))?,
            }
        }
    }

    /// Drive collect → confirm until the operator proceeds or aborts.
    ///
    /// With `ask_first` unset, `config` is validated as given and only the
    /// confirmation is asked; if it does not validate, its values become the
    /// defaults of a normal collection round. Returns `None` on abort.
    pub fn acquire(&mut self, config: RunConfig, ask_first: bool) -> Result<Option<RunPlan>> {
        let mut config = config;
        let mut plan = None;
        let mut state = State::Collecting;
        if !ask_first {
            match config.validate() {
                Ok(p) => {
                    plan = Some(p);
                    state = State::Confirming;
                }
                Err(e) => self.source.notice(&format!(">> {}", e))?,
            }
        }

        loop {
            debug!(?state, "prompt");
            state = match state {
                State::Collecting => {
                    config = self.collect(&config)?;
                    plan = Some(config.validate()?);
                    State::Confirming
                }
                State::Confirming => {
                    let files = plan.as_ref().map(|p| p.inputs.len()).unwrap_or(0);
                    match self.confirm(files)? {
                        Decision::Proceed => return Ok(plan),
                        Decision::Abort => return Ok(None),
                        Decision::Redo => State::Collecting,
                    }
                }
            };
        }
    }
}
