use crate::runtime::{
    adapter::AdaptedCandidate,
    builder::{Invocation, Invocations},
    error::ListenerError,
    record::{ExecutedSequence, ExecutedStatement},
};

pub type ListenerResult = Result<(), ListenerError>;

/// Observer of a run. Failures are logged by the engine and never alter the run.
///
/// Every hook sees the sequence as executed so far and the adapted candidate
/// it runs against. `after_statement` receives the finished statement
/// separately; it is appended to `executed` once the hook returns.
pub trait ExecutionListener {
    fn name(&self) -> &str;

    fn before_sequence(
        &mut self,
        _invocations: &Invocations,
        _executed: &ExecutedSequence,
        _candidate: &AdaptedCandidate,
    ) -> ListenerResult {
        Ok(())
    }

    fn after_sequence(
        &mut self,
        _executed: &ExecutedSequence,
        _candidate: &AdaptedCandidate,
    ) -> ListenerResult {
        Ok(())
    }

    fn before_statement(
        &mut self,
        _invocation: &Invocation,
        _executed: &ExecutedSequence,
        _candidate: &AdaptedCandidate,
    ) -> ListenerResult {
        Ok(())
    }

    fn after_statement(
        &mut self,
        _invocation: &Invocation,
        _statement: &ExecutedStatement,
        _executed: &ExecutedSequence,
        _candidate: &AdaptedCandidate,
    ) -> ListenerResult {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopListener;

impl ExecutionListener for NoopListener {
    fn name(&self) -> &str {
        "noop"
    }
}

/// Fans every hook out to its members in order. All members run; the first error is returned.
#[derive(Default)]
pub struct ListenerChain<'l> {
    listeners: Vec<&'l mut dyn ExecutionListener>,
}

impl<'l> ListenerChain<'l> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, listener: &'l mut dyn ExecutionListener) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    fn each(
        &mut self,
        mut hook: impl FnMut(&mut dyn ExecutionListener) -> ListenerResult,
    ) -> ListenerResult {
        let mut first = None;
        for listener in self.listeners.iter_mut() {
            if let Err(err) = hook(&mut **listener) {
                first.get_or_insert(err);
            }
        }
        first.map_or(Ok(()), Err)
    }
}

impl ExecutionListener for ListenerChain<'_> {
    fn name(&self) -> &str {
        "chain"
    }

    fn before_sequence(
        &mut self,
        invocations: &Invocations,
        executed: &ExecutedSequence,
        candidate: &AdaptedCandidate,
    ) -> ListenerResult {
        self.each(|listener| listener.before_sequence(invocations, executed, candidate))
    }

    fn after_sequence(
        &mut self,
        executed: &ExecutedSequence,
        candidate: &AdaptedCandidate,
    ) -> ListenerResult {
        self.each(|listener| listener.after_sequence(executed, candidate))
    }

    fn before_statement(
        &mut self,
        invocation: &Invocation,
        executed: &ExecutedSequence,
        candidate: &AdaptedCandidate,
    ) -> ListenerResult {
        self.each(|listener| listener.before_statement(invocation, executed, candidate))
    }

    fn after_statement(
        &mut self,
        invocation: &Invocation,
        statement: &ExecutedStatement,
        executed: &ExecutedSequence,
        candidate: &AdaptedCandidate,
    ) -> ListenerResult {
        self.each(|listener| listener.after_statement(invocation, statement, executed, candidate))
    }
}
