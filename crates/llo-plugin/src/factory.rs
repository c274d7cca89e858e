//! Plugin factory
//!
//! Builds a [`Plugin`] for each new protocol configuration handed over by the
//! consensus transport.

use crate::codec::OffchainConfig;
use crate::config::PluginConfig;
use crate::domain::{
    MAX_MAX_OBSERVATION_LENGTH, MAX_MAX_OUTCOME_LENGTH, MAX_MAX_QUERY_LENGTH,
    MAX_MAX_REPORT_COUNT, MAX_MAX_REPORT_LENGTH,
};
use crate::error::{PluginError, PluginResult};
use crate::ports::{
    ChannelDefinitionCache, DataSource, PredecessorRetirementReportCache, ReportingPluginConfig,
    ReportingPluginInfo, ReportingPluginLimits, ShouldRetireCache,
};
use crate::service::{InstanceParams, Plugin, PluginDependencies, ReportCodecs};
use std::sync::Arc;
use tracing::info;

pub const PLUGIN_NAME: &str = "LLO";

/// Shared collaborators; every plugin built by the factory uses the same ones.
pub struct PluginFactory<D, C, S, P> {
    data_source: Arc<D>,
    channel_definition_cache: Arc<C>,
    should_retire_cache: Arc<S>,
    predecessor_retirement_report_cache: Arc<P>,
    report_codecs: ReportCodecs,
    config: PluginConfig,
}

impl<D, C, S, P> PluginFactory<D, C, S, P>
where
    D: DataSource,
    C: ChannelDefinitionCache,
    S: ShouldRetireCache,
    P: PredecessorRetirementReportCache,
{
    pub fn new(deps: PluginDependencies<D, C, S, P>) -> Self {
        Self {
            data_source: deps.data_source,
            channel_definition_cache: deps.channel_definition_cache,
            should_retire_cache: deps.should_retire_cache,
            predecessor_retirement_report_cache: deps.predecessor_retirement_report_cache,
            report_codecs: deps.report_codecs,
            config: deps.config,
        }
    }

    pub fn new_reporting_plugin(
        &self,
        cfg: &ReportingPluginConfig,
    ) -> PluginResult<(Plugin<D, C, S, P>, ReportingPluginInfo)> {
        if cfg.n <= 3 * cfg.f {
            return Err(PluginError::InvalidConfig {
                reason: format!("need n > 3f, got n={} f={}", cfg.n, cfg.f),
            });
        }

        let offchain_config = OffchainConfig::decode(&cfg.offchain_config)
            .map_err(PluginError::InvalidOffchainConfig)?;

        let params = InstanceParams {
            config_digest: cfg.config_digest,
            predecessor_config_digest: offchain_config.predecessor_config_digest,
            oracle_id: cfg.oracle_id,
            f: cfg.f,
        };

        info!(
            config_digest = %params.config_digest,
            oracle_id = params.oracle_id,
            f = params.f,
            has_predecessor = params.predecessor_config_digest.is_some(),
            "[llo] Creating reporting plugin"
        );

        let plugin = Plugin::new(
            PluginDependencies {
                data_source: Arc::clone(&self.data_source),
                channel_definition_cache: Arc::clone(&self.channel_definition_cache),
                should_retire_cache: Arc::clone(&self.should_retire_cache),
                predecessor_retirement_report_cache: Arc::clone(
                    &self.predecessor_retirement_report_cache,
                ),
                report_codecs: self.report_codecs.clone(),
                config: self.config.clone(),
            },
            params,
        );

        let info = ReportingPluginInfo {
            name: PLUGIN_NAME.to_string(),
            limits: ReportingPluginLimits {
                max_query_length: MAX_MAX_QUERY_LENGTH,
                max_observation_length: MAX_MAX_OBSERVATION_LENGTH,
                max_outcome_length: MAX_MAX_OUTCOME_LENGTH,
                max_report_length: MAX_MAX_REPORT_LENGTH,
                max_report_count: MAX_MAX_REPORT_COUNT,
            },
        };

        Ok((plugin, info))
    }
}
