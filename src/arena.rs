use crate::config::EngineConfig;
use crate::language::{interface::InterfaceSpecification, sequence::SequenceSpecification};
use crate::runtime::{
    adapter::AdaptedCandidate,
    builder::{InvocationBuilder, Invocations},
    engine::ExecutionEngine,
    error::{BuildError, BuildResult},
    eval::{Evaluator, ExpressionEvaluator},
    listener::{ExecutionListener, NoopListener},
    record::ExecutedSequence,
    registry::TypeRegistry,
    resolver::ResolverCache,
};
use std::sync::Arc;
use tracing::{info_span, warn};

#[derive(Debug)]
pub enum ArenaOutcome {
    Executed(ExecutedSequence),
    /// The sequence could not be bound to this candidate.
    Excluded(BuildError),
}

#[derive(Debug)]
pub struct CandidateReport {
    pub candidate: String,
    pub outcome: ArenaOutcome,
}

impl CandidateReport {
    pub fn executed(&self) -> Option<&ExecutedSequence> {
        match &self.outcome {
            ArenaOutcome::Executed(executed) => Some(executed),
            ArenaOutcome::Excluded(_) => None,
        }
    }

    pub fn excluded(&self) -> Option<&BuildError> {
        match &self.outcome {
            ArenaOutcome::Excluded(err) => Some(err),
            ArenaOutcome::Executed(_) => None,
        }
    }
}

/// Runs sequences against many candidates, sharing one binding cache.
pub struct Arena {
    registry: Arc<TypeRegistry>,
    cache: ResolverCache,
    evaluator: Box<dyn Evaluator>,
    config: EngineConfig,
}

impl Arena {
    pub fn new(registry: Arc<TypeRegistry>, config: EngineConfig) -> Self {
        Self {
            registry,
            cache: ResolverCache::new(),
            evaluator: Box::new(ExpressionEvaluator),
            config,
        }
    }

    pub fn with_evaluator(mut self, evaluator: impl Evaluator + 'static) -> Self {
        self.evaluator = Box::new(evaluator);
        self
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &ResolverCache {
        &self.cache
    }

    pub fn build(
        &self,
        sequence: &SequenceSpecification,
        interface: &Arc<InterfaceSpecification>,
        candidate: &AdaptedCandidate,
    ) -> BuildResult<Invocations> {
        let binding = self.cache.binding(&candidate.candidate, interface);
        InvocationBuilder::new(self.evaluator.as_ref(), Arc::clone(&self.registry))
            .build(sequence, binding)
    }

    pub fn run(
        &self,
        sequence: &SequenceSpecification,
        interface: &Arc<InterfaceSpecification>,
        candidates: &[AdaptedCandidate],
    ) -> Vec<CandidateReport> {
        self.run_with(sequence, interface, candidates, &mut NoopListener)
    }

    /// Candidates run one after another, in the given order.
    pub fn run_with(
        &self,
        sequence: &SequenceSpecification,
        interface: &Arc<InterfaceSpecification>,
        candidates: &[AdaptedCandidate],
        listener: &mut dyn ExecutionListener,
    ) -> Vec<CandidateReport> {
        let span = info_span!("arena", sequence = %sequence.name, candidates = candidates.len());
        let _enter = span.enter();
        let engine = ExecutionEngine::new(self.evaluator.as_ref(), self.config);

        candidates
            .iter()
            .map(|candidate| {
                let outcome = match self.build(sequence, interface, candidate) {
                    Ok(invocations) => {
                        ArenaOutcome::Executed(engine.execute(&invocations, candidate, listener))
                    }
                    Err(err) => {
                        warn!(candidate = %candidate.name, error = %err, "candidate excluded");
                        ArenaOutcome::Excluded(err)
                    }
                };
                CandidateReport {
                    candidate: candidate.name.clone(),
                    outcome,
                }
            })
            .collect()
    }
}
