// /////////////////////////////////////////////////////////////////////////////
// Market Data ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Application Assembly
//!
//! Wires the engine from an immutable configuration snapshot and the injected
//! collaborators. One run gets one run id, one DB session shared by the
//! Load/Validate/Clean subprocesses, and one transformer registry. The
//! session is closed on every exit path of `run`.
//!
//! `build` resolves the collaborators the repository ships (JSONL extractors,
//! the `mem://` session); `build_with` lets deployments and tests inject
//! their own through the ports.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use crate::application::orchestration::{
    DailyWorkflow, SubprocessExecutor, TransformOrchestrator, WorkflowEngine,
};
use crate::application::subprocesses::{
    CleanSubprocess, ExtractSubprocess, LoadSubprocess, TransformSubprocess, ValidateSubprocess,
};
use crate::infrastructure::adapters::JsonlFileExtractor;
use crate::infrastructure::config::EtlConfig;
use crate::infrastructure::loading::{open_session, DolphinLoader};
use marketdata_etl_bootstrap::single_instance::DEFAULT_LOCK_FILE;
use marketdata_etl_domain::{
    DateRange, DbSession, EtlError, Extractor, RunId, Subprocess, TransformerRegistry,
    WorkflowResult,
};

/// A fully wired engine plus the resources it must release.
pub struct EtlApplication {
    engine: WorkflowEngine,
    session: Arc<dyn DbSession>,
}

impl std::fmt::Debug for EtlApplication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EtlApplication").finish_non_exhaustive()
    }
}

impl EtlApplication {
    /// Builds with the repository's own collaborators, resolved from the
    /// configuration.
    pub fn build(config: EtlConfig) -> Result<Self, EtlError> {
        let extractors = build_extractors(&config)?;
        let session = open_session(&config.loader)?;
        Self::build_with(config, extractors, session, PathBuf::from(DEFAULT_LOCK_FILE))
    }

    /// Builds with injected collaborators.
    pub fn build_with(
        config: EtlConfig,
        extractors: Vec<Arc<dyn Extractor>>,
        session: Arc<dyn DbSession>,
        lock_path: PathBuf,
    ) -> Result<Self, EtlError> {
        for transform in &config.transforms {
            if !transform.filter.is_empty() {
                warn!(
                    source_type = %transform.source_type,
                    "transform filters are configured but not applied; transformation is 1:1"
                );
            }
        }

        let run_id = RunId::new();
        let config = Arc::new(config);
        let registry = Arc::new(TransformerRegistry::standard());
        let orchestrator = TransformOrchestrator::new(registry, config.unmapped_policies());
        let loader = Arc::new(DolphinLoader::new(session.clone(), config.loader.clone(), run_id));

        let subprocesses: Vec<Arc<dyn Subprocess>> = vec![
            Arc::new(ExtractSubprocess::new(extractors)),
            Arc::new(TransformSubprocess::new(orchestrator)),
            Arc::new(LoadSubprocess::new(
                loader,
                session.clone(),
                config.loader.clone(),
                run_id,
            )),
            Arc::new(ValidateSubprocess::new(session.clone(), config.validation.clone())),
            Arc::new(CleanSubprocess::new(session.clone())),
        ];

        let executor = SubprocessExecutor::new(config);
        let workflow = DailyWorkflow::new(executor, subprocesses, run_id)?;
        let engine = WorkflowEngine::new(workflow, lock_path);
        Ok(Self { engine, session })
    }

    /// Runs the multi-day loop, closing the session afterwards on success and
    /// failure alike.
    pub async fn run(&self, range: DateRange) -> Result<WorkflowResult, EtlError> {
        let result = self.engine.execute(range).await;
        if let Err(err) = self.session.close().await {
            warn!(error = %err, "session close failed");
        }
        result
    }
}

fn build_extractors(config: &EtlConfig) -> Result<Vec<Arc<dyn Extractor>>, EtlError> {
    config
        .sources
        .iter()
        .map(|source| match source.source_type.as_str() {
            "jsonl" => Ok(Arc::new(JsonlFileExtractor::new(
                source.name.clone(),
                source.connection_string.clone(),
            )) as Arc<dyn Extractor>),
            other => Err(EtlError::invalid_config(format!(
                "source {}: extractor type '{}' is provided by the deployment, not this binary",
                source.name, other
            ))),
        })
        .collect()
}
