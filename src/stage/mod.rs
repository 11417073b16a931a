//! Fail-fast stage composition.
//!
//! A `StageRunner` threads one table through an ordered list of named stages.
//! Extra stage arguments are captured by the stage closure. The first failing
//! stage stops the run; its error comes back tagged with the stage name and no
//! partial table is returned. Persisting the result is the caller's job, after
//! `run` succeeds.

use log::{debug, error};

use crate::error::{PipelineError, StageError};
use crate::reference::{MasterName, ReferenceData};

type StageFn<'a, T> = Box<dyn FnOnce(T, &ReferenceData) -> Result<T, PipelineError> + 'a>;

struct Stage<'a, T> {
    name: &'static str,
    requires: &'static [MasterName],
    run: StageFn<'a, T>,
}

pub struct StageRunner<'a, T> {
    pipeline: &'static str,
    stages: Vec<Stage<'a, T>>,
}

impl<'a, T> StageRunner<'a, T> {
    pub fn new(pipeline: &'static str) -> Self {
        Self {
            pipeline,
            stages: Vec::new(),
        }
    }

    /// Append a stage. `requires` lists the masters it reads.
    pub fn stage<F>(mut self, name: &'static str, requires: &'static [MasterName], run: F) -> Self
    where
        F: FnOnce(T, &ReferenceData) -> Result<T, PipelineError> + 'a,
    {
        self.stages.push(Stage {
            name,
            requires,
            run: Box::new(run),
        });
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name).collect()
    }

    /// Run every stage in order.
    ///
    /// Declared requirements are checked for all stages before the first one
    /// executes, so a missing master never surfaces halfway through a run.
    pub fn run(self, refs: &ReferenceData, initial: T) -> Result<T, StageError> {
        for stage in &self.stages {
            if let Err(source) = refs.ensure(stage.requires) {
                error!("[{}] stage `{}` cannot start: {source}", self.pipeline, stage.name);
                return Err(StageError {
                    stage: stage.name,
                    source,
                });
            }
        }

        let mut table = initial;
        for stage in self.stages {
            debug!("[{}] running stage `{}`", self.pipeline, stage.name);
            table = (stage.run)(table, refs).map_err(|source| {
                error!("[{}] stage `{}` failed: {source}", self.pipeline, stage.name);
                StageError {
                    stage: stage.name,
                    source,
                }
            })?;
        }
        Ok(table)
    }
}
