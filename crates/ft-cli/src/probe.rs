//! Observation sources for the sampling loop.
//!
//! Focus detection is platform specific and lives outside this crate. The
//! tracker talks to it through [`CommandSource`], which runs a configured
//! program and reads one JSON [`Observation`] from its stdout.

use std::collections::VecDeque;
use std::process::Command;

use anyhow::{Context, Result, bail};
use ft_core::{Observation, ObservationSource};

/// Runs an external probe program once per sample.
#[derive(Debug, Clone)]
pub struct CommandSource {
    program: String,
    args: Vec<String>,
}

impl CommandSource {
    /// Creates a source from `probe_command`: the program followed by its arguments.
    pub fn new(argv: &[String]) -> Result<Self> {
        let Some((program, args)) = argv.split_first() else {
            bail!("probe_command cannot be empty");
        };
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    fn run(&self) -> Result<Observation> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .with_context(|| format!("failed to run probe {}", self.program))?;
        if !output.status.success() {
            bail!("probe {} exited with {}", self.program, output.status);
        }
        parse_probe_output(&output.stdout)
    }
}

impl ObservationSource for CommandSource {
    fn probe(&mut self) -> Observation {
        match self.run() {
            Ok(observation) => observation,
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "focus probe failed");
                Observation::Unfocused
            }
        }
    }
}

/// Parses probe stdout. Empty output means nothing is focused.
pub fn parse_probe_output(stdout: &[u8]) -> Result<Observation> {
    let text = std::str::from_utf8(stdout).context("probe output is not UTF-8")?;
    let text = text.trim();
    if text.is_empty() {
        return Ok(Observation::Unfocused);
    }
    serde_json::from_str(text).with_context(|| format!("invalid probe output: {text}"))
}

/// Replays a fixed list of observations, then reports nothing focused.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    queue: VecDeque<Observation>,
}

impl ScriptedSource {
    pub fn new(observations: impl IntoIterator<Item = Observation>) -> Self {
        Self {
            queue: observations.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl ObservationSource for ScriptedSource {
    fn probe(&mut self) -> Observation {
        self.queue.pop_front().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_focused_tab() {
        let observation = parse_probe_output(
            br#"{"kind":"focused_tab","app_name":"Safari","title":"Docs","url":"https://docs.rs/"}"#,
        )
        .unwrap();
        assert_eq!(
            observation,
            Observation::tab("Safari", Some("Docs"), Some("https://docs.rs/"))
        );
    }

    #[test]
    fn blank_output_is_unfocused() {
        assert_eq!(parse_probe_output(b"  \n").unwrap(), Observation::Unfocused);
    }

    #[test]
    fn malformed_output_is_an_error() {
        let err = parse_probe_output(b"Terminal").unwrap_err();
        assert!(err.to_string().contains("invalid probe output"));
    }

    #[test]
    fn empty_probe_command_is_rejected() {
        assert!(CommandSource::new(&[]).is_err());
    }

    #[test]
    fn missing_probe_program_yields_unfocused() {
        let mut source = CommandSource::new(&["/nonexistent/ft-probe".to_string()]).unwrap();
        assert_eq!(source.probe(), Observation::Unfocused);
    }

    #[cfg(unix)]
    #[test]
    fn command_source_reads_stdout() {
        let argv = [
            "sh".to_string(),
            "-c".to_string(),
            r#"echo '{"kind":"focused","app_name":"Terminal"}'"#.to_string(),
        ];
        let mut source = CommandSource::new(&argv).unwrap();
        assert_eq!(source.probe(), Observation::focused("Terminal"));
    }

    #[cfg(unix)]
    #[test]
    fn failing_probe_yields_unfocused() {
        let argv = ["sh".to_string(), "-c".to_string(), "exit 3".to_string()];
        let mut source = CommandSource::new(&argv).unwrap();
        assert_eq!(source.probe(), Observation::Unfocused);
    }

    #[test]
    fn scripted_source_drains_then_reports_unfocused() {
        let mut source = ScriptedSource::new([Observation::focused("A")]);
        assert_eq!(source.remaining(), 1);
        assert_eq!(source.probe(), Observation::focused("A"));
        assert_eq!(source.probe(), Observation::Unfocused);
    }
}
