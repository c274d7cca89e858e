//! Reports phase

use super::Plugin;
use crate::codec::encode_retirement_report;
use crate::domain::{Report, ReportWithInfo, RetirementReport, StreamValue};
use crate::error::{PluginError, PluginResult};
use crate::metrics;
use crate::ports::{
    ChannelDefinitionCache, DataSource, PredecessorRetirementReportCache, ShouldRetireCache,
};
use llo_types::{ChannelDefinition, LifeCycleStage, ReportFormat, ReportInfo};
use tracing::debug;

impl<D, C, S, P> Plugin<D, C, S, P>
where
    D: DataSource,
    C: ChannelDefinitionCache,
    S: ShouldRetireCache,
    P: PredecessorRetirementReportCache,
{
    pub(super) fn make_reports(
        &self,
        seq_nr: u64,
        raw_outcome: &[u8],
    ) -> PluginResult<Vec<ReportWithInfo>> {
        if seq_nr <= 1 {
            // No reports for the bootstrap round
            return Ok(Vec::new());
        }

        let outcome = self
            .outcome_codec
            .decode(raw_outcome)
            .map_err(PluginError::OutcomeDecode)?;
        let observation_timestamp_seconds = outcome.observations_timestamp_seconds()?;

        let mut reports = Vec::new();

        if outcome.life_cycle_stage == LifeCycleStage::Retired {
            // Hands the validity windows to the successor instance
            let retirement_report = RetirementReport {
                valid_after_seconds: outcome.valid_after_seconds.clone(),
            };
            reports.push(ReportWithInfo {
                report: encode_retirement_report(&retirement_report)?,
                info: ReportInfo {
                    life_cycle_stage: LifeCycleStage::Retired,
                    report_format: ReportFormat::Retirement,
                },
            });
            metrics::record_report(&ReportFormat::Retirement.to_string());
        }

        let (reportable, unreportable) = outcome.reportable_channels();
        if self.config.verbose_logging {
            debug!(
                seq_nr,
                stage = "Report",
                "[llo] Reportable channels: {:?}, unreportable: {:?}",
                reportable,
                unreportable
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
            );
        }

        for channel_id in reportable {
            let Some(definition) = outcome.channel_definitions.get(&channel_id) else {
                continue;
            };

            // Reportability guarantees every aggregate is present
            let values: Vec<StreamValue> = definition
                .streams
                .iter()
                .filter_map(|s| outcome.aggregate(s.stream_id, s.aggregator).cloned())
                .collect();

            let report = Report {
                config_digest: self.params.config_digest,
                seq_nr,
                channel_id,
                valid_after_seconds: outcome
                    .valid_after_seconds
                    .get(&channel_id)
                    .copied()
                    .unwrap_or_default(),
                observation_timestamp_seconds,
                values,
                specimen: outcome.life_cycle_stage != LifeCycleStage::Production,
            };

            reports.push(ReportWithInfo {
                report: self.encode_report(&report, definition)?,
                info: ReportInfo {
                    life_cycle_stage: outcome.life_cycle_stage,
                    report_format: definition.report_format,
                },
            });
            metrics::record_report(&definition.report_format.to_string());
        }

        if self.config.verbose_logging && reports.is_empty() {
            debug!(
                seq_nr,
                stage = "Report",
                "[llo] No reports, will not transmit anything"
            );
        }

        Ok(reports)
    }

    fn encode_report(&self, report: &Report, definition: &ChannelDefinition) -> PluginResult<Vec<u8>> {
        let codec = self
            .report_codecs
            .get(&definition.report_format)
            .ok_or(PluginError::MissingReportCodec {
                format: definition.report_format,
            })?;
        codec
            .encode(report, definition)
            .map_err(|source| PluginError::ReportEncode {
                channel_id: report.channel_id,
                source,
            })
    }
}
