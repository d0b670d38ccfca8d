use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;

use super::runner::{Invocation, RunError, ToolOutput, ToolRunner};

/// In-memory `ToolRunner` answering from a script keyed by command line.
///
/// Repeated `on` calls for one command queue answers; the last one keeps
/// being returned once the queue is down to it. Unscripted commands fail
/// with exit code 127.
#[derive(Default)]
pub struct ScriptedRunner {
    script: Mutex<HashMap<String, VecDeque<ToolOutput>>>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, command_line: &str, output: ToolOutput) -> Self {
        self.script
            .lock()
            .unwrap()
            .entry(command_line.to_string())
            .or_default()
            .push_back(output);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(Invocation::command_line)
            .collect()
    }

    pub fn cwds(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().iter().map(|c| c.cwd.clone()).collect()
    }

    pub fn envs(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| (c.command_line(), c.env.clone()))
            .collect()
    }
}

#[async_trait]
impl ToolRunner for ScriptedRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutput, RunError> {
        self.calls.lock().unwrap().push(invocation.clone());

        let mut script = self.script.lock().unwrap();
        let answer = script
            .get_mut(&invocation.command_line())
            .and_then(|queue| {
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            })
            .unwrap_or_else(|| {
                ToolOutput::failed(127, format!("unscripted command: {}", invocation.command_line()))
            });
        Ok(answer)
    }
}

impl ToolOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}
