//! # Integration Test Flows
//!
//! Several plugin instances driven through the simulated transport.
//!
//! ## Flows Tested:
//!
//! 1. **Channel lifecycle**: a channel voted in by more than f nodes starts
//!    reporting one round later, with contiguous validity windows
//! 2. **Quorum**: minority votes and minority data sources change nothing
//! 3. **Fault tolerance**: silent nodes and failing data sources
//! 4. **Blue/green handover**: a staging instance takes over the validity
//!    windows of a retiring predecessor

#[cfg(test)]
mod tests {
    use super::super::network::{Deployment, Instance, NetworkError, Round, GENESIS_SECONDS};
    use llo_plugin::{decode_retirement_report, Decimal, PluginError, Quote, StreamValue};
    use llo_telemetry::init_test_logging;
    use llo_types::{
        Aggregator, ChannelDefinition, ChannelDefinitions, ConfigDigest, LifeCycleStage,
        ReportFormat, StreamDefinition,
    };

    const BLUE: ConfigDigest = ConfigDigest([0xb1; 32]);
    const GREEN: ConfigDigest = ConfigDigest([0x9e; 32]);

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn seconds(round: i64) -> u32 {
        (GENESIS_SECONDS + round) as u32
    }

    fn dec(n: i64) -> StreamValue {
        StreamValue::Decimal(Decimal::from(n))
    }

    fn price_channels() -> ChannelDefinitions {
        ChannelDefinitions::from([(
            1,
            ChannelDefinition::new(
                ReportFormat::Json,
                vec![
                    StreamDefinition::new(1, Aggregator::Median),
                    StreamDefinition::new(2, Aggregator::Median),
                ],
            ),
        )])
    }

    fn deployment() -> Deployment {
        init_test_logging();
        let deployment = Deployment::new();
        deployment.feed.set(1, dec(100));
        deployment.feed.set(2, dec(200));
        deployment
    }

    /// Advance the shared clock by one second, then run one round.
    async fn tick(deployment: &Deployment, instance: &mut Instance) -> Round {
        deployment.clock.advance(1);
        instance.run_round().await.unwrap()
    }

    /// Run rounds on several instances within the same second.
    async fn tick_all(deployment: &Deployment, instances: &mut [&mut Instance]) -> Vec<Round> {
        deployment.clock.advance(1);
        let mut rounds = Vec::new();
        for instance in instances.iter_mut() {
            rounds.push(instance.run_round().await.unwrap());
        }
        rounds
    }

    // =============================================================================
    // CHANNEL LIFECYCLE
    // =============================================================================

    #[tokio::test]
    async fn test_channel_goes_live_with_contiguous_windows() {
        let deployment = deployment();
        let mut blue = deployment.instance(BLUE, 4, 1, None).unwrap();
        blue.set_channels(&price_channels());

        // Bootstrap
        let r1 = tick(&deployment, &mut blue).await;
        assert_eq!(r1.outcome.life_cycle_stage, LifeCycleStage::Production);
        assert!(r1.reports.is_empty());

        // Channel voted in; its streams were not observed yet
        let r2 = tick(&deployment, &mut blue).await;
        assert_eq!(r2.outcome.channel_definitions, price_channels());
        assert_eq!(r2.outcome.valid_after_seconds.get(&1), Some(&seconds(2)));
        assert!(r2.reports.is_empty());

        let r3 = tick(&deployment, &mut blue).await;
        let reports = r3.json_reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].channel_id, 1);
        assert_eq!(reports[0].valid_after_seconds, seconds(2));
        assert_eq!(reports[0].observation_timestamp_seconds, seconds(3));
        assert_eq!(reports[0].values, vec!["100".to_string(), "200".to_string()]);
        assert!(!reports[0].specimen);
        assert_eq!(reports[0].config_digest, BLUE.to_string());
        assert_eq!(r3.reports[0].info.life_cycle_stage, LifeCycleStage::Production);

        // Next window starts where the previous one ended
        deployment.feed.set(1, dec(101));
        let r4 = tick(&deployment, &mut blue).await;
        let reports = r4.json_reports();
        assert_eq!(reports[0].valid_after_seconds, seconds(3));
        assert_eq!(reports[0].observation_timestamp_seconds, seconds(4));
        assert_eq!(reports[0].values[0], "101");
    }

    #[tokio::test]
    async fn test_no_report_within_the_same_second() {
        let deployment = deployment();
        let mut blue = deployment.instance(BLUE, 4, 1, None).unwrap();
        blue.set_channels(&price_channels());
        for _ in 0..3 {
            tick(&deployment, &mut blue).await;
        }

        // Clock did not advance: observations timestamp equals validAfterSeconds
        let round = blue.run_round().await.unwrap();
        assert!(round.json_reports().is_empty());

        let round = tick(&deployment, &mut blue).await;
        assert_eq!(round.json_reports()[0].valid_after_seconds, seconds(3));
    }

    #[tokio::test]
    async fn test_quote_channel_reports_componentwise_median() {
        let deployment = deployment();
        let quote = |bid: i64, benchmark: i64, ask: i64| {
            StreamValue::Quote(Quote::new(
                Decimal::from(bid),
                Decimal::from(benchmark),
                Decimal::from(ask),
            ))
        };
        deployment.feed.set(3, quote(99, 100, 101));

        let mut blue = deployment.instance(BLUE, 4, 1, None).unwrap();
        blue.set_channels(&ChannelDefinitions::from([(
            7,
            ChannelDefinition::new(ReportFormat::Json, vec![StreamDefinition::new(3, Aggregator::Quote)]),
        )]));

        for _ in 0..2 {
            tick(&deployment, &mut blue).await;
        }
        let round = tick(&deployment, &mut blue).await;
        assert_eq!(
            round.json_reports()[0].values,
            vec!["Q{Bid: 99, Benchmark: 100, Ask: 101}".to_string()]
        );
    }

    #[tokio::test]
    async fn test_channel_removal_stops_reports() {
        let deployment = deployment();
        let mut blue = deployment.instance(BLUE, 4, 1, None).unwrap();
        blue.set_channels(&price_channels());
        for _ in 0..3 {
            tick(&deployment, &mut blue).await;
        }

        blue.set_channels(&ChannelDefinitions::new());
        let round = tick(&deployment, &mut blue).await;
        assert!(round.outcome.channel_definitions.is_empty());
        assert!(round.outcome.valid_after_seconds.is_empty());
        assert!(round.reports.is_empty());
    }

    // =============================================================================
    // QUORUM
    // =============================================================================

    #[tokio::test]
    async fn test_minority_cannot_add_channel() {
        let deployment = deployment();
        let mut blue = deployment.instance(BLUE, 4, 1, None).unwrap();
        blue.set_channels_on(&[0], &price_channels());

        for _ in 0..4 {
            let round = tick(&deployment, &mut blue).await;
            assert!(round.outcome.channel_definitions.is_empty());
        }

        // One more node tips it over f
        blue.set_channels_on(&[1], &price_channels());
        let round = tick(&deployment, &mut blue).await;
        assert_eq!(round.outcome.channel_definitions, price_channels());
    }

    #[tokio::test]
    async fn test_retirement_needs_more_than_f_votes() {
        let deployment = deployment();
        let mut blue = deployment.instance(BLUE, 4, 1, None).unwrap();
        tick(&deployment, &mut blue).await;

        blue.nodes[0].should_retire.set(true);
        let round = tick(&deployment, &mut blue).await;
        assert_eq!(round.outcome.life_cycle_stage, LifeCycleStage::Production);

        blue.nodes[3].should_retire.set(true);
        let round = tick(&deployment, &mut blue).await;
        assert_eq!(round.outcome.life_cycle_stage, LifeCycleStage::Retired);
    }

    // =============================================================================
    // FAULT TOLERANCE
    // =============================================================================

    #[tokio::test]
    async fn test_reports_survive_failing_data_sources() {
        let deployment = deployment();
        let mut blue = deployment.instance(BLUE, 4, 1, None).unwrap();
        blue.set_channels(&price_channels());
        for _ in 0..3 {
            tick(&deployment, &mut blue).await;
        }

        // Two values remain, which is more than f
        blue.nodes[2].data_source.set_offline(true);
        blue.nodes[3].data_source.set_offline(true);
        let r4 = tick(&deployment, &mut blue).await;
        assert_eq!(r4.json_reports().len(), 1);

        // A single value is not enough
        blue.nodes[1].data_source.set_offline(true);
        let r5 = tick(&deployment, &mut blue).await;
        assert!(r5.json_reports().is_empty());
        assert!(r5.outcome.stream_aggregates.is_empty());

        // The window reopens where the last report ended
        for node in &blue.nodes {
            node.data_source.set_offline(false);
        }
        let r6 = tick(&deployment, &mut blue).await;
        let reports = r6.json_reports();
        assert_eq!(reports[0].valid_after_seconds, seconds(4));
        assert_eq!(reports[0].observation_timestamp_seconds, seconds(6));
    }

    #[tokio::test]
    async fn test_silent_nodes_and_quorum() {
        let deployment = deployment();
        let mut blue = deployment.instance(BLUE, 4, 1, None).unwrap();
        blue.set_channels(&price_channels());

        blue.silence(3);
        for _ in 0..3 {
            tick(&deployment, &mut blue).await;
        }
        assert_eq!(blue.seq_nr(), 3);

        blue.silence(2);
        deployment.clock.advance(1);
        assert!(matches!(
            blue.run_round().await,
            Err(NetworkError::NoQuorum {
                seq_nr: 4,
                valid: 2,
                need: 3
            })
        ));
        // A failed round does not advance the sequence
        assert_eq!(blue.seq_nr(), 3);
    }

    #[tokio::test]
    async fn test_larger_network_stays_in_agreement() {
        let deployment = deployment();
        let mut blue = deployment.instance(BLUE, 7, 2, None).unwrap();
        let mut channels = price_channels();
        for id in 2..=12 {
            channels.insert(
                id,
                ChannelDefinition::new(
                    ReportFormat::Json,
                    vec![StreamDefinition::new(id % 2 + 1, Aggregator::Median)],
                ),
            );
        }
        blue.set_channels(&channels);

        // Five additions per round at most
        for _ in 0..4 {
            tick(&deployment, &mut blue).await;
        }
        let round = tick(&deployment, &mut blue).await;
        assert_eq!(round.outcome.channel_definitions, channels);
        assert!(!round.json_reports().is_empty());
    }

    // =============================================================================
    // BLUE/GREEN HANDOVER
    // =============================================================================

    /// Blue reports in production while green shadows it in staging.
    async fn blue_and_green(deployment: &Deployment) -> (Instance, Instance) {
        let mut blue = deployment.instance(BLUE, 4, 1, None).unwrap();
        let mut green = deployment.instance(GREEN, 4, 1, Some(BLUE)).unwrap();
        blue.set_channels(&price_channels());
        green.set_channels(&price_channels());

        for _ in 0..3 {
            tick_all(deployment, &mut [&mut blue, &mut green]).await;
        }
        (blue, green)
    }

    #[tokio::test]
    async fn test_staging_instance_emits_specimen_reports() {
        let deployment = deployment();
        let (mut blue, mut green) = blue_and_green(&deployment).await;

        let rounds = tick_all(&deployment, &mut [&mut blue, &mut green]).await;
        let (blue_round, green_round) = (&rounds[0], &rounds[1]);

        assert_eq!(green_round.outcome.life_cycle_stage, LifeCycleStage::Staging);
        assert!(green_round.json_reports()[0].specimen);
        assert_eq!(green_round.reports[0].info.life_cycle_stage, LifeCycleStage::Staging);
        assert!(!blue_round.json_reports()[0].specimen);
    }

    #[tokio::test]
    async fn test_blue_green_handover() {
        let deployment = deployment();
        let (mut blue, mut green) = blue_and_green(&deployment).await;

        // Blue retires in round 4 and hands over the windows opened in round 3
        blue.set_should_retire(true);
        let rounds = tick_all(&deployment, &mut [&mut blue, &mut green]).await;
        let blue_round = &rounds[0];
        assert_eq!(blue_round.outcome.life_cycle_stage, LifeCycleStage::Retired);
        assert_eq!(blue_round.reports.len(), 1);
        assert!(blue_round.json_reports().is_empty());

        let retirement = blue_round.retirement_report().unwrap();
        assert_eq!(retirement.info.life_cycle_stage, LifeCycleStage::Retired);
        let handed_over = decode_retirement_report(&retirement.report).unwrap();
        assert_eq!(handed_over.valid_after_seconds.get(&1), Some(&seconds(3)));

        // Green has no evidence yet
        assert_eq!(rounds[1].outcome.life_cycle_stage, LifeCycleStage::Staging);

        let attested = blue.attest(blue_round.seq_nr, retirement, 2);
        deployment.publish_retirement(&attested).unwrap();

        let rounds = tick_all(&deployment, &mut [&mut blue, &mut green]).await;
        let (blue_round, green_round) = (&rounds[0], &rounds[1]);

        // Retired is terminal and keeps emitting the retirement report
        assert_eq!(blue_round.outcome.life_cycle_stage, LifeCycleStage::Retired);
        assert!(blue_round.retirement_report().is_some());

        assert_eq!(green_round.outcome.life_cycle_stage, LifeCycleStage::Production);
        assert_eq!(green_round.outcome.valid_after_seconds, handed_over.valid_after_seconds);
        let reports = green_round.json_reports();
        assert_eq!(reports.len(), 1);
        assert!(!reports[0].specimen);
        assert_eq!(reports[0].config_digest, GREEN.to_string());
        // Picks up exactly where blue's last production report ended
        assert_eq!(reports[0].valid_after_seconds, seconds(3));
        assert_eq!(reports[0].observation_timestamp_seconds, seconds(5));

        let green_round = tick(&deployment, &mut green).await;
        assert_eq!(green_round.json_reports()[0].valid_after_seconds, seconds(5));
    }

    #[tokio::test]
    async fn test_under_signed_handover_stalls_until_properly_attested() {
        let deployment = deployment();
        let (mut blue, mut green) = blue_and_green(&deployment).await;

        blue.set_should_retire(true);
        let rounds = tick_all(&deployment, &mut [&mut blue, &mut green]).await;
        let seq_nr = rounds[0].seq_nr;
        let retirement = rounds[0].retirement_report().unwrap();

        // f signatures are not enough; every green observation now carries
        // evidence that fails verification and is dropped
        let attested = blue.attest(seq_nr, retirement, 1);
        deployment.publish_retirement(&attested).unwrap();

        deployment.clock.advance(1);
        assert!(matches!(
            green.run_round().await,
            Err(NetworkError::Plugin(PluginError::NoValidObservations))
        ));
        assert_eq!(green.seq_nr(), 4);

        let attested = blue.attest(seq_nr, retirement, 3);
        deployment.publish_retirement(&attested).unwrap();
        let round = tick(&deployment, &mut green).await;
        assert_eq!(round.outcome.life_cycle_stage, LifeCycleStage::Production);
        assert!(round.json_reports().iter().all(|r| !r.specimen));
    }

    #[tokio::test]
    async fn test_retired_instance_ignores_channel_changes() {
        let deployment = deployment();
        let (mut blue, _green) = blue_and_green(&deployment).await;

        blue.set_should_retire(true);
        tick(&deployment, &mut blue).await;

        let mut channels = price_channels();
        channels.insert(
            2,
            ChannelDefinition::new(ReportFormat::Json, vec![StreamDefinition::new(2, Aggregator::Median)]),
        );
        blue.set_channels(&channels);
        let round = tick(&deployment, &mut blue).await;
        assert_eq!(round.outcome.channel_definitions, price_channels());
    }
}
