//! Scripted container runtime (testing only)
//!
//! `ScriptedRunner` implements `CommandRunner` without a container runtime.
//! Every runtime operation succeeds with empty output unless scripted
//! otherwise, every call is recorded, and a `run` can be made to write the
//! result channel the way a sandboxed job would.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::RunnerError;
use crate::runner::{CommandOutput, CommandRunner};
use crate::stage::{RuntimeCommand, RuntimeStage};

#[derive(Debug, Clone)]
enum Scripted {
    Output(CommandOutput),
    SpawnError(String),
    Timeout,
}

#[derive(Debug, Default)]
pub struct ScriptedRunner {
    responses: Mutex<HashMap<RuntimeStage, Scripted>>,
    result_contents: Mutex<Option<String>>,
    calls: Mutex<Vec<RuntimeCommand>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `stage` with `output`.
    pub fn respond(&self, stage: RuntimeStage, output: CommandOutput) {
        self.responses
            .lock()
            .unwrap()
            .insert(stage, Scripted::Output(output));
    }

    /// Make `stage` fail as if the runtime binary could not be spawned.
    pub fn fail_to_spawn(&self, stage: RuntimeStage, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(stage, Scripted::SpawnError(message.to_string()));
    }

    /// Make `stage` run past any deadline it is given.
    pub fn time_out(&self, stage: RuntimeStage) {
        self.responses
            .lock()
            .unwrap()
            .insert(stage, Scripted::Timeout);
    }

    /// Have the sandbox write `contents` to its result channel.
    pub fn writes_result(&self, contents: &str) {
        *self.result_contents.lock().unwrap() = Some(contents.to_string());
    }

    /// Every command received, in order.
    pub fn calls(&self) -> Vec<RuntimeCommand> {
        self.calls.lock().unwrap().clone()
    }

    /// Operations received, in order.
    pub fn stages(&self) -> Vec<RuntimeStage> {
        self.calls().iter().filter_map(|c| c.stage()).collect()
    }

    /// How many times `stage` was invoked.
    pub fn count(&self, stage: RuntimeStage) -> usize {
        self.stages().iter().filter(|s| **s == stage).count()
    }

    fn write_result_channel(&self, command: &RuntimeCommand) {
        let Some(contents) = self.result_contents.lock().unwrap().clone() else {
            return;
        };
        if let Some((host, _)) = command.flag_value("-v").and_then(|m| m.split_once(':')) {
            std::fs::write(host, contents).unwrap();
        }
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(
        &self,
        command: &RuntimeCommand,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, RunnerError> {
        self.calls.lock().unwrap().push(command.clone());

        let stage = command.stage();
        let scripted = stage.and_then(|s| self.responses.lock().unwrap().get(&s).cloned());

        match scripted {
            Some(Scripted::SpawnError(message)) => Err(RunnerError::Spawn {
                program: command.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, message),
            }),
            Some(Scripted::Timeout) => Err(RunnerError::Timeout {
                secs: timeout.map(|t| t.as_secs()).unwrap_or(0),
            }),
            Some(Scripted::Output(output)) => {
                if stage == Some(RuntimeStage::Run) {
                    self.write_result_channel(command);
                }
                Ok(output)
            }
            None => {
                if stage == Some(RuntimeStage::Run) {
                    self.write_result_channel(command);
                }
                Ok(CommandOutput::success(""))
            }
        }
    }
}
