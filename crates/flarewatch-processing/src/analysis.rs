//! External analysis program invocation
//!
//! The program receives the stored file path on stdin and reports its result
//! as JSON on stdout. One invocation walks through
//! `Spawned -> InputWritten -> OutputDrained -> Exited`; a watchdog timeout
//! covers the whole walk and reports the stage that stalled.

use async_trait::async_trait;
use flarewatch_core::{command_line, AnalysisConfig};
use std::fmt;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};

/// Bytes of stderr kept for error reporting
const STDERR_TAIL_BYTES: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationStage {
    /// Process started, input not yet delivered
    Spawned,
    /// Input written and stdin closed
    InputWritten,
    /// stdout and stderr read to EOF
    OutputDrained,
    /// Exit status collected
    Exited,
}

impl fmt::Display for InvocationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InvocationStage::Spawned => "spawned",
            InvocationStage::InputWritten => "input_written",
            InvocationStage::OutputDrained => "output_drained",
            InvocationStage::Exited => "exited",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error with analysis program (stage: {stage}): {source}")]
    Io {
        stage: InvocationStage,
        #[source]
        source: io::Error,
    },

    #[error("Analysis program {status}: {stderr}")]
    NonZeroExit { status: ExitStatus, stderr: String },

    #[error("Analysis program timed out after {timeout:?} (stage: {stage})")]
    TimedOut {
        stage: InvocationStage,
        timeout: Duration,
    },
}

/// Runs the analysis for a stored light curve and returns its raw stdout
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, input: &Path) -> Result<Vec<u8>, AnalysisError>;

    /// Human-readable description of what gets run
    fn describe(&self) -> String;
}

/// Analyzer backed by an external program
#[derive(Debug, Clone)]
pub struct SubprocessAnalyzer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl SubprocessAnalyzer {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone(), config.timeout())
    }

    fn spawn(&self) -> Result<Child, AnalysisError> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AnalysisError::Spawn {
                program: self.program.clone(),
                source,
            })
    }
}

fn missing_pipe(stage: InvocationStage, name: &str) -> AnalysisError {
    AnalysisError::Io {
        stage,
        source: io::Error::other(format!("{} was not captured", name)),
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let start = stderr.len().saturating_sub(STDERR_TAIL_BYTES);
    String::from_utf8_lossy(&stderr[start..]).trim().to_string()
}

/// Drive one invocation to completion, recording progress in `stage`.
async fn drive(
    child: &mut Child,
    input: &Path,
    stage: &mut InvocationStage,
) -> Result<Vec<u8>, AnalysisError> {
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| missing_pipe(*stage, "stdin"))?;

    // The path is the whole payload: no trailing newline.
    let payload = input.to_string_lossy().into_owned();
    match stdin.write_all(payload.as_bytes()).await {
        Ok(()) => {}
        // A program that exits without reading its input is judged by its exit status.
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            tracing::debug!("Analysis program closed stdin before reading input");
        }
        Err(source) => {
            return Err(AnalysisError::Io {
                stage: *stage,
                source,
            })
        }
    }
    drop(stdin);
    *stage = InvocationStage::InputWritten;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| missing_pipe(*stage, "stdout"))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| missing_pipe(*stage, "stderr"))?;

    let mut out = Vec::new();
    let mut err = Vec::new();
    let (out_result, err_result) = tokio::join!(
        stdout.read_to_end(&mut out),
        stderr.read_to_end(&mut err)
    );
    out_result
        .and(err_result)
        .map_err(|source| AnalysisError::Io {
            stage: *stage,
            source,
        })?;
    *stage = InvocationStage::OutputDrained;

    let status = child.wait().await.map_err(|source| AnalysisError::Io {
        stage: *stage,
        source,
    })?;
    *stage = InvocationStage::Exited;

    if !status.success() {
        return Err(AnalysisError::NonZeroExit {
            status,
            stderr: stderr_tail(&err),
        });
    }

    if !err.is_empty() {
        tracing::debug!(stderr = %stderr_tail(&err), "Analysis program wrote to stderr");
    }

    Ok(out)
}

#[async_trait]
impl Analyzer for SubprocessAnalyzer {
    #[tracing::instrument(skip(self), fields(program = %self.program, input = %input.display()))]
    async fn analyze(&self, input: &Path) -> Result<Vec<u8>, AnalysisError> {
        let start = std::time::Instant::now();
        let mut child = self.spawn()?;
        let mut stage = InvocationStage::Spawned;

        let result = tokio::time::timeout(self.timeout, drive(&mut child, input, &mut stage)).await;

        match result {
            Ok(Ok(stdout)) => {
                tracing::info!(
                    stdout_bytes = stdout.len(),
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Analysis program finished"
                );
                Ok(stdout)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "Failed to kill timed out analysis program");
                }
                tracing::warn!(
                    stage = %stage,
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Analysis program timed out"
                );
                Err(AnalysisError::TimedOut {
                    stage,
                    timeout: self.timeout,
                })
            }
        }
    }

    fn describe(&self) -> String {
        command_line(&self.program, &self.args)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(script: &str, timeout: Duration) -> SubprocessAnalyzer {
        SubprocessAnalyzer::new(
            "/bin/sh",
            vec!["-c".to_string(), script.to_string()],
            timeout,
        )
    }

    #[tokio::test]
    async fn test_input_is_path_without_newline() {
        let analyzer = shell("cat", Duration::from_secs(10));
        let stdout = analyzer.analyze(Path::new("data/file.lc")).await.unwrap();
        assert_eq!(stdout, b"data/file.lc");
    }

    #[tokio::test]
    async fn test_stdout_is_captured_completely() {
        let analyzer = shell(
            r#"read -r path; printf '{"detected_flares":[],"lc_data":[]}'"#,
            Duration::from_secs(10),
        );
        let stdout = analyzer.analyze(Path::new("data/file.csv")).await.unwrap();
        assert_eq!(stdout, br#"{"detected_flares":[],"lc_data":[]}"#);
    }

    #[tokio::test]
    async fn test_large_output_with_stderr_noise() {
        // Both pipes exceed the pipe buffer, which deadlocks unless drained together.
        let analyzer = shell(
            "head -c 200000 /dev/zero | tr '\\0' e >&2; head -c 200000 /dev/zero | tr '\\0' o",
            Duration::from_secs(10),
        );
        let stdout = analyzer.analyze(Path::new("data/file.lc")).await.unwrap();
        assert_eq!(stdout.len(), 200000);
        assert!(stdout.iter().all(|b| *b == b'o'));
    }

    #[tokio::test]
    async fn test_nonzero_exit_reports_stderr() {
        let analyzer = shell("echo 'model crashed' >&2; exit 3", Duration::from_secs(10));
        let err = analyzer.analyze(Path::new("data/file.lc")).await.unwrap_err();
        match err {
            AnalysisError::NonZeroExit { status, stderr } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "model crashed");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unread_input_is_judged_by_exit_status() {
        // The input outgrows the pipe buffer, so the write is still pending
        // when the program closes stdin and exits.
        let long_input = format!("data/{}.lc", "x".repeat(1024 * 1024));

        let analyzer = shell("exec 0<&-; printf done", Duration::from_secs(10));
        let stdout = analyzer.analyze(Path::new(&long_input)).await.unwrap();
        assert_eq!(stdout, b"done");

        let analyzer = shell("exec 0<&-; echo 'no input' >&2; exit 4", Duration::from_secs(10));
        let err = analyzer.analyze(Path::new(&long_input)).await.unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::NonZeroExit { ref status, ref stderr }
                if status.code() == Some(4) && stderr == "no input"
        ));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let analyzer = SubprocessAnalyzer::new(
            "/nonexistent/analysis-program",
            Vec::new(),
            Duration::from_secs(10),
        );
        let err = analyzer.analyze(Path::new("data/file.lc")).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_timeout_names_stalled_stage() {
        let analyzer = shell("exec sleep 5", Duration::from_millis(200));
        let start = std::time::Instant::now();
        let err = analyzer.analyze(Path::new("data/file.lc")).await.unwrap_err();

        assert!(start.elapsed() < Duration::from_secs(4));
        assert!(matches!(
            err,
            AnalysisError::TimedOut {
                stage: InvocationStage::InputWritten,
                ..
            }
        ));
    }

    #[test]
    fn test_stderr_tail_keeps_the_end() {
        let noise = format!("{}END", "x".repeat(5000));
        let tail = stderr_tail(noise.as_bytes());
        assert_eq!(tail.len(), STDERR_TAIL_BYTES);
        assert!(tail.ends_with("END"));
    }

    #[test]
    fn test_describe() {
        let analyzer = SubprocessAnalyzer::new(
            "python3",
            vec!["./model.py".to_string()],
            Duration::from_secs(1),
        );
        assert_eq!(analyzer.describe(), "python3 ./model.py");
    }
}
