// components/process_runner/src/stub.rs
//! A [`CommandRunner`] that replays scripted responses instead of spawning
//! processes, recording every command it was asked to run.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{CommandError, CommandOutput, CommandRunner, CommandSpec};

type Response = Box<dyn FnOnce(&CommandSpec) -> Result<CommandOutput, CommandError> + Send>;

#[derive(Default)]
pub struct ScriptedRunner {
    responses: Mutex<VecDeque<Response>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response computed from the command, e.g. to create the files a tool would write
    pub fn respond_with<F>(&self, response: F) -> &Self
    where
        F: FnOnce(&CommandSpec) -> Result<CommandOutput, CommandError> + Send + 'static,
    {
        self.responses.lock().push_back(Box::new(response));
        self
    }

    pub fn respond(&self, output: CommandOutput) -> &Self {
        self.respond_with(move |_| Ok(output))
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn pending(&self) -> usize {
        self.responses.lock().len()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(
        &self,
        command: &CommandSpec,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput, CommandError> {
        self.calls.lock().push(command.clone());
        if cancel.is_cancelled() {
            return Err(CommandError::Cancelled {
                program: command.get_program().to_path_buf(),
            });
        }
        let response = self.responses.lock().pop_front();
        match response {
            Some(response) => response(command),
            None => Ok(CommandOutput::failed(
                127,
                format!("unexpected invocation: {}", command),
            )),
        }
    }
}
