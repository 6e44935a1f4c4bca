use std::fmt::Display;

use crate::{CheckError, ServiceState, Verdict};

/// Runs a check and turns a failure into a service state.
///
/// Without an `on_error` handler errors are reported as `Critical`, which is what nagios
/// expects from a check that could not make up its mind.
pub struct Runner<E> {
    on_error: Option<Box<dyn FnOnce(&E) -> ServiceState>>,
}

impl<E: Display> Runner<E> {
    pub fn new() -> Self {
        Self { on_error: None }
    }

    pub fn on_error(mut self, f: impl FnOnce(&E) -> ServiceState + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn safe_run(self, f: impl FnOnce() -> Result<Verdict, E>) -> RunnerResult<E> {
        match f() {
            Ok(verdict) => RunnerResult::Ok(verdict),
            Err(err) => {
                let state = self
                    .on_error
                    .map(|f| f(&err))
                    .unwrap_or(ServiceState::Critical);

                RunnerResult::Err(state, err)
            }
        }
    }
}

impl Runner<CheckError> {
    /// A runner that reports each error with [CheckError::service_state].
    pub fn for_check() -> Self {
        Runner::new().on_error(CheckError::service_state)
    }
}

impl<E: Display> Default for Runner<E> {
    fn default() -> Self {
        Self::new()
    }
}

pub enum RunnerResult<E> {
    Ok(Verdict),
    Err(ServiceState, E),
}

impl<E: Display> RunnerResult<E> {
    pub fn state(&self) -> ServiceState {
        match self {
            RunnerResult::Ok(verdict) => verdict.state(),
            RunnerResult::Err(state, _) => *state,
        }
    }

    pub fn to_nagios_string(&self) -> String {
        match self {
            RunnerResult::Ok(verdict) => verdict.to_nagios_string(),
            RunnerResult::Err(state, err) => format!("{}: {}", state, err),
        }
    }

    pub fn print_and_exit(self) -> ! {
        println!("{}", self.to_nagios_string());
        std::process::exit(self.state().exit_code());
    }
}
