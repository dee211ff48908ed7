//! # Replay log
//!
//! A replay log drives the navigation core from a recording. Each line is one of:
//!
//! - a sentence, starting with `$`, which completes one tick,
//! - an operator command as JSON (starting with `{` or `"`), applied before the next sentence,
//! - a blank line or a `#` comment, which is ignored.
//!
//! ```text
//! # Field setup
//! {"SetBoundary": {"outer": [[0, 0], [200, 0], [200, 200], [0, 200]]}}
//! {"SetLine": {"a": [0, 0], "b": [0, 100]}}
//! $PANDA,123519,4807.038,N,01131.000,E,4,08,0.9,545.4,1.2,5.5,270.5,1.2,-0.5,0.1*5E
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal
use nav_if::cmd::{NavCmd, NavCmdParseError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Everything to process in one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayTick {
    /// Line number of the tick's sentence, starting at 1.
    pub line: usize,

    /// Commands to apply before the sentence.
    pub cmds: Vec<NavCmd>,

    /// Raw sentence bytes, including a line ending.
    pub sentence: Vec<u8>,
}

/// A loaded replay log.
#[derive(Debug)]
pub struct ReplayLog {
    path: Option<PathBuf>,
    ticks: VecDeque<ReplayTick>,

    /// Commands after the last sentence.
    trailing_cmds: Vec<NavCmd>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Could not find the replay log at {0:?}")]
    LogNotFound(PathBuf),

    #[error("Could not load the replay log: {0}")]
    LogLoadError(std::io::Error),

    #[error("The replay log contains no sentences")]
    LogEmpty,

    #[error("Replay log line {0} contains an invalid command: {1}")]
    InvalidCmd(usize, NavCmdParseError),

    #[error("Replay log line {0} is not a sentence, command or comment")]
    UnrecognisedLine(usize),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ReplayLog {
    /// Load a replay log from a file.
    pub fn new<P: AsRef<Path>>(log_path: P) -> Result<Self, ReplayError> {
        let path = log_path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(ReplayError::LogNotFound(path));
        }

        let contents = fs::read_to_string(&path).map_err(ReplayError::LogLoadError)?;

        let mut log = Self::from_contents(&contents)?;
        log.path = Some(path);

        Ok(log)
    }

    /// Parse a replay log from its contents.
    pub fn from_contents(contents: &str) -> Result<Self, ReplayError> {
        let mut ticks = VecDeque::new();
        let mut cmds = Vec::new();

        for (i, raw) in contents.lines().enumerate() {
            let line_num = i + 1;
            let line = raw.trim();

            match line.chars().next() {
                None | Some('#') => continue,
                Some('$') => {
                    let mut sentence = line.as_bytes().to_vec();
                    sentence.extend_from_slice(b"\r\n");

                    ticks.push_back(ReplayTick {
                        line: line_num,
                        cmds: std::mem::take(&mut cmds),
                        sentence,
                    });
                }
                Some('{') | Some('"') => {
                    cmds.push(
                        NavCmd::from_json(line).map_err(|e| ReplayError::InvalidCmd(line_num, e))?,
                    );
                }
                Some(_) => return Err(ReplayError::UnrecognisedLine(line_num)),
            }
        }

        if ticks.is_empty() {
            return Err(ReplayError::LogEmpty);
        }

        Ok(Self {
            path: None,
            ticks,
            trailing_cmds: cmds,
        })
    }

    /// Take the next tick, or `None` at the end of the log.
    pub fn next_tick(&mut self) -> Option<ReplayTick> {
        self.ticks.pop_front()
    }

    /// Number of ticks remaining.
    pub fn num_ticks(&self) -> usize {
        self.ticks.len()
    }

    /// Commands after the last sentence, which never get a tick.
    pub fn trailing_cmds(&self) -> &[NavCmd] {
        &self.trailing_cmds
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const LOG: &str = r#"
# A short replay
{"SetLine": {"a": [0, 0], "b": [0, 100]}}
"ResetApplied"

$PANDA,1*00
  $PANDA,2*00
{"NudgeTrack": {"offset_m": 0.5}}
$PANDA,3*00
"ClearTrack"
"#;

    #[test]
    fn test_parse_log() {
        let mut log = ReplayLog::from_contents(LOG).unwrap();
        assert_eq!(log.num_ticks(), 3);
        assert!(log.path().is_none());

        let t = log.next_tick().unwrap();
        assert_eq!(t.line, 6);
        assert_eq!(
            t.cmds,
            vec![
                NavCmd::SetLine { a: [0.0, 0.0], b: [0.0, 100.0] },
                NavCmd::ResetApplied
            ]
        );
        assert_eq!(t.sentence, b"$PANDA,1*00\r\n".to_vec());

        // Leading whitespace is trimmed
        let t = log.next_tick().unwrap();
        assert!(t.cmds.is_empty());
        assert_eq!(t.sentence, b"$PANDA,2*00\r\n".to_vec());

        let t = log.next_tick().unwrap();
        assert_eq!(t.cmds, vec![NavCmd::NudgeTrack { offset_m: 0.5 }]);

        assert!(log.next_tick().is_none());
        assert_eq!(log.trailing_cmds(), &[NavCmd::ClearTrack]);
    }

    #[test]
    fn test_invalid_logs() {
        assert!(matches!(
            ReplayLog::from_contents("# nothing\n\n"),
            Err(ReplayError::LogEmpty)
        ));
        assert!(matches!(
            ReplayLog::from_contents("$PANDA\n{\"Teleport\": {}}\n"),
            Err(ReplayError::InvalidCmd(2, _))
        ));
        assert!(matches!(
            ReplayLog::from_contents("$PANDA\nhello\n"),
            Err(ReplayError::UnrecognisedLine(2))
        ));
        assert!(matches!(
            ReplayLog::new("/this/path/does/not/exist.log"),
            Err(ReplayError::LogNotFound(_))
        ));
    }
}
