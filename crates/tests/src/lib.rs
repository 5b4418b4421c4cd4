//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试 (线上 JSON 形状)
//! - 两阶段管道 e2e 测试 (内存 mediator + 记录型网关)
//! - 配置驱动的装配测试

#[cfg(test)]
mod support {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use contracts::{
        Aggregate, ChannelGateway, ChannelKind, ContractError, NotificationMessage, OwnerId,
    };
    use dispatcher::StaticEntityMediator;

    /// Gateway that records every send
    pub struct RecordingGateway {
        channel: ChannelKind,
        sent: Mutex<Vec<(String, NotificationMessage)>>,
        failing: Vec<String>,
    }

    impl RecordingGateway {
        pub fn new(channel: ChannelKind) -> Arc<Self> {
            Self::failing(channel, &[])
        }

        pub fn failing(channel: ChannelKind, endpoints: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                channel,
                sent: Mutex::new(Vec::new()),
                failing: endpoints.iter().map(|e| e.to_string()).collect(),
            })
        }

        /// Sorted endpoint handles that were sent to
        pub fn endpoints(&self) -> Vec<String> {
            let mut endpoints: Vec<String> = self
                .sent
                .lock()
                .unwrap()
                .iter()
                .map(|(endpoint, _)| endpoint.clone())
                .collect();
            endpoints.sort();
            endpoints
        }

        pub fn messages(&self) -> Vec<NotificationMessage> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(_, message)| message.clone())
                .collect()
        }
    }

    #[async_trait]
    impl ChannelGateway for RecordingGateway {
        fn channel(&self) -> ChannelKind {
            self.channel
        }

        async fn mint(&self, raw_token: &str) -> Result<String, ContractError> {
            Ok(format!("{}:{raw_token}", self.channel))
        }

        async fn send(
            &self,
            endpoint: &str,
            message: &NotificationMessage,
        ) -> Result<(), ContractError> {
            self.sent
                .lock()
                .unwrap()
                .push((endpoint.to_string(), message.clone()));
            if self.failing.iter().any(|f| f == endpoint) {
                return Err(ContractError::delivery(self.channel, endpoint, "endpoint gone"));
            }
            Ok(())
        }
    }

    /// Team `G` with the given members
    pub fn team_mediator(members: &[&str]) -> Arc<StaticEntityMediator> {
        let mediator = StaticEntityMediator::new();
        mediator.insert_aggregate(Aggregate::new("G", "team"));
        mediator.set_members("G", members.iter().map(|m| OwnerId::from(*m)).collect());
        Arc::new(mediator)
    }
}

#[cfg(test)]
mod contract_tests {
    use contracts::{DomainEvent, Envelope, EnvelopePayload, OwnerId};
    use serde_json::json;

    #[test]
    fn test_domain_event_wire_shape() {
        let event = DomainEvent::new(
            "MemberAdded",
            json!({"addedUser": "U3"}),
            [OwnerId::from("U2"), OwnerId::from("U1")],
        );
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "MemberAdded",
                "payload": {"addedUser": "U3"},
                "recipientIds": ["U1", "U2"]
            })
        );
    }

    #[test]
    fn test_envelope_payload_falls_back_to_raw() {
        let raw: EnvelopePayload = serde_json::from_value(json!({"hello": "world"})).unwrap();
        assert!(matches!(raw, EnvelopePayload::Raw(_)));

        let envelope = Envelope::for_event(
            "team-events",
            DomainEvent::new("MemberAdded", json!({}), [OwnerId::from("U1")]),
        );
        let round: Envelope =
            serde_json::from_value(serde_json::to_value(&envelope).unwrap()).unwrap();
        assert_eq!(round.event().map(|e| e.event_type.as_str()), Some("MemberAdded"));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;

    use contracts::{
        ChannelKind, GroupingKind, OwnerId, ProcessorConfig, ProcessorSpec, RecipientScope,
    };
    use dispatcher::{
        relay_channel, CollectingErrorSink, DispatcherBuilder, EnvelopeRelay, ProcessorContext,
    };
    use fanout::NotificationFanoutService;
    use ingestion::{RawEvent, RawPubSubMessage, RawStorageEvent, RawStreamRecord};
    use listener_directory::ListenerDirectory;
    use serde_json::json;

    use crate::support::{team_mediator, RecordingGateway};

    fn membership_added() -> ProcessorConfig {
        ProcessorConfig {
            name: "team-member-added".into(),
            spec: ProcessorSpec::MembershipAdded {
                source_name: "chat-table".into(),
                grouping: GroupingKind::Team,
                entity_type: "Membership".into(),
                publish_to: "team-events".into(),
            },
        }
    }

    fn membership_removed(include_removed_user: bool) -> ProcessorConfig {
        ProcessorConfig {
            name: "team-member-removed".into(),
            spec: ProcessorSpec::MembershipRemoved {
                source_name: "chat-table".into(),
                grouping: GroupingKind::Team,
                entity_type: "Membership".into(),
                publish_to: "team-events".into(),
                include_removed_user,
            },
        }
    }

    fn fanout_unit(name: &str, channel: ChannelKind, recipients: RecipientScope) -> ProcessorConfig {
        ProcessorConfig {
            name: name.into(),
            spec: ProcessorSpec::TopicFanout {
                channel_identifier: "team-events".into(),
                channels: vec![channel],
                recipients,
            },
        }
    }

    fn membership_image(user: &str) -> serde_json::Value {
        json!({
            "entityType": {"S": "Membership"},
            "groupKind": {"S": "team"},
            "groupId": {"S": "G"},
            "userId": {"S": user}
        })
    }

    fn stream_event(event_name: &str, image: serde_json::Value) -> RawEvent {
        let (old_image, new_image) = match event_name {
            "REMOVE" => (Some(image), None),
            _ => (None, Some(image)),
        };
        RawEvent::Stream(RawStreamRecord {
            table_name: Some("chat-table".into()),
            event_name: Some(event_name.into()),
            old_image,
            new_image,
            ..Default::default()
        })
    }

    struct Harness {
        fanout: Arc<NotificationFanoutService>,
        socket: Arc<RecordingGateway>,
        push: Arc<RecordingGateway>,
        errors: Arc<CollectingErrorSink>,
    }

    impl Harness {
        async fn new(socket_users: &[&str], push_users: &[&str]) -> Self {
            Self::with_gateways(
                RecordingGateway::new(ChannelKind::Socket),
                RecordingGateway::new(ChannelKind::Push),
                socket_users,
                push_users,
            )
            .await
        }

        async fn with_gateways(
            socket: Arc<RecordingGateway>,
            push: Arc<RecordingGateway>,
            socket_users: &[&str],
            push_users: &[&str],
        ) -> Self {
            let fanout = Arc::new(
                NotificationFanoutService::new(Arc::new(ListenerDirectory::new()), 4)
                    .with_gateway(socket.clone())
                    .with_gateway(push.clone()),
            );
            for user in socket_users {
                fanout
                    .register_channel_endpoint(
                        &OwnerId::from(*user),
                        ChannelKind::Socket,
                        &format!("conn-{user}"),
                    )
                    .await
                    .unwrap();
            }
            for user in push_users {
                fanout
                    .register_channel_endpoint(
                        &OwnerId::from(*user),
                        ChannelKind::Push,
                        &format!("device-{user}"),
                    )
                    .await
                    .unwrap();
            }
            Self {
                fanout,
                socket,
                push,
                errors: Arc::new(CollectingErrorSink::new()),
            }
        }

        /// Run raw events through both stages and wait for the relay to drain
        async fn run(
            &self,
            mediator_members: &[&str],
            source: Vec<ProcessorConfig>,
            relay: Vec<ProcessorConfig>,
            raw: &[RawEvent],
        ) {
            let (publisher, rx) = relay_channel(8);
            let relay_dispatcher = DispatcherBuilder::new("relay")
                .processors(&relay)
                .error_sink(self.errors.clone())
                .build(&ProcessorContext::new().with_fanout(self.fanout.clone()))
                .unwrap();
            let relay_handle = EnvelopeRelay::new(Arc::new(relay_dispatcher), rx).spawn();

            let source_dispatcher = DispatcherBuilder::new("source")
                .processors(&source)
                .error_sink(self.errors.clone())
                .build(
                    &ProcessorContext::new()
                        .with_mediator(team_mediator(mediator_members))
                        .with_publisher(Arc::new(publisher)),
                )
                .unwrap();

            source_dispatcher.dispatch_batch(raw).await;
            drop(source_dispatcher);

            relay_handle.await.unwrap();
        }
    }

    /// Created membership of U3 in G with members [U1,U2,U3]
    #[tokio::test]
    async fn test_e2e_member_added_fans_out_to_socket_and_push() {
        let harness = Harness::new(&["U1", "U2", "U3"], &["U1", "U2", "U3"]).await;

        harness
            .run(
                &["U1", "U2", "U3"],
                vec![membership_added()],
                vec![
                    fanout_unit("team-socket", ChannelKind::Socket, RecipientScope::All),
                    fanout_unit(
                        "team-push-added-user",
                        ChannelKind::Push,
                        RecipientScope::PayloadField {
                            field: "addedUser".into(),
                        },
                    ),
                ],
                &[stream_event("INSERT", membership_image("U3"))],
            )
            .await;

        assert_eq!(
            harness.socket.endpoints(),
            vec!["socket:conn-U1", "socket:conn-U2", "socket:conn-U3"]
        );
        assert_eq!(harness.push.endpoints(), vec!["push:device-U3"]);

        let message = &harness.push.messages()[0];
        assert_eq!(message.event_type, "MemberAdded");
        assert_eq!(message.payload["group"]["id"], "G");
        assert_eq!(message.payload["addedUser"], "U3");
        assert!(harness.errors.is_empty());
    }

    #[tokio::test]
    async fn test_e2e_member_removed_notifies_removed_user_when_configured() {
        let harness = Harness::new(&["U1", "U2", "U3"], &[]).await;

        harness
            .run(
                // membership already gone from the aggregate
                &["U1", "U2"],
                vec![membership_removed(true)],
                vec![fanout_unit(
                    "team-socket",
                    ChannelKind::Socket,
                    RecipientScope::All,
                )],
                &[stream_event("REMOVE", membership_image("U3"))],
            )
            .await;

        assert_eq!(
            harness.socket.endpoints(),
            vec!["socket:conn-U1", "socket:conn-U2", "socket:conn-U3"]
        );
        let message = &harness.socket.messages()[0];
        assert_eq!(message.event_type, "MemberRemoved");
        assert_eq!(message.payload["removedUser"], "U3");
    }

    #[tokio::test]
    async fn test_e2e_member_removed_excludes_removed_user_by_default() {
        let harness = Harness::new(&["U1", "U2", "U3"], &[]).await;

        harness
            .run(
                &["U1", "U2", "U3"],
                vec![membership_removed(false)],
                vec![fanout_unit(
                    "team-socket",
                    ChannelKind::Socket,
                    RecipientScope::All,
                )],
                &[stream_event("REMOVE", membership_image("U3"))],
            )
            .await;

        assert_eq!(
            harness.socket.endpoints(),
            vec!["socket:conn-U1", "socket:conn-U2"]
        );
    }

    #[tokio::test]
    async fn test_e2e_lookup_miss_is_reported_not_delivered() {
        let harness = Harness::new(&["U1"], &[]).await;
        let mut image = membership_image("U3");
        image["groupId"] = json!({"S": "unknown-group"});

        harness
            .run(
                &["U1"],
                vec![membership_added()],
                vec![fanout_unit(
                    "team-socket",
                    ChannelKind::Socket,
                    RecipientScope::All,
                )],
                &[stream_event("INSERT", image)],
            )
            .await;

        assert!(harness.socket.endpoints().is_empty());
        let reports = harness.errors.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].failed_count, 1);
        assert_eq!(reports[0].errors[0].processor, "team-member-added");
    }

    #[tokio::test]
    async fn test_e2e_delivery_failure_does_not_block_other_endpoints() {
        let harness = Harness::with_gateways(
            RecordingGateway::failing(ChannelKind::Socket, &["socket:conn-U2"]),
            RecordingGateway::new(ChannelKind::Push),
            &["U1", "U2", "U3"],
            &[],
        )
        .await;

        harness
            .run(
                &["U1", "U2", "U3"],
                vec![membership_added()],
                vec![fanout_unit(
                    "team-socket",
                    ChannelKind::Socket,
                    RecipientScope::All,
                )],
                &[stream_event("INSERT", membership_image("U3"))],
            )
            .await;

        assert_eq!(harness.socket.endpoints().len(), 3);
        assert!(harness.errors.is_empty());
    }

    #[tokio::test]
    async fn test_e2e_external_pubsub_envelope_reaches_fanout() {
        let harness = Harness::new(&["U1", "U2"], &[]).await;
        let relay = DispatcherBuilder::new("relay")
            .processors(&[fanout_unit(
                "team-socket",
                ChannelKind::Socket,
                RecipientScope::All,
            )])
            .build(&ProcessorContext::new().with_fanout(harness.fanout.clone()))
            .unwrap();

        let message = json!({
            "type": "TeamRenamed",
            "payload": {"name": "Platform"},
            "recipientIds": ["U2"]
        })
        .to_string();
        let summary = relay
            .dispatch_batch(&[
                RawEvent::PubSub(RawPubSubMessage {
                    topic: Some("arn:aws:sns:eu-west-1:123456789012:team-events".into()),
                    message: Some(message),
                }),
                RawEvent::PubSub(RawPubSubMessage {
                    topic: Some("arn:aws:sns:eu-west-1:123456789012:other-events".into()),
                    message: Some("{}".into()),
                }),
            ])
            .await;

        assert_eq!(summary.records, 2);
        assert_eq!(summary.invocations, 1);
        assert_eq!(harness.socket.endpoints(), vec!["socket:conn-U2"]);
        assert_eq!(harness.socket.messages()[0].event_type, "TeamRenamed");
    }

    #[tokio::test]
    async fn test_e2e_object_created_notifies_key_owner() {
        let harness = Harness::new(&["U7"], &["U7"]).await;

        harness
            .run(
                &[],
                vec![ProcessorConfig {
                    name: "avatar-uploaded".into(),
                    spec: ProcessorSpec::ObjectCreated {
                        container_name: "uploads".into(),
                        key_prefix: Some("avatars/".into()),
                        event_type: "AvatarUploaded".into(),
                        publish_to: "team-events".into(),
                    },
                }],
                vec![fanout_unit("account-push", ChannelKind::Push, RecipientScope::All)],
                &[RawEvent::Storage(RawStorageEvent {
                    bucket: Some("uploads".into()),
                    key: Some("avatars/U7/profile+photo.png".into()),
                })],
            )
            .await;

        assert_eq!(harness.push.endpoints(), vec!["push:device-U7"]);
        assert_eq!(
            harness.push.messages()[0].payload["key"],
            "avatars/U7/profile photo.png"
        );
        assert!(harness.socket.endpoints().is_empty());
    }

    #[tokio::test]
    async fn test_e2e_endpoint_transfer_redirects_delivery() {
        let harness = Harness::new(&["U1"], &[]).await;
        // U2 takes over U1's socket connection
        harness
            .fanout
            .register_channel_endpoint(&OwnerId::from("U2"), ChannelKind::Socket, "conn-U1")
            .await
            .unwrap();

        harness
            .run(
                &["U1", "U2", "U3"],
                vec![membership_added()],
                vec![fanout_unit(
                    "team-socket",
                    ChannelKind::Socket,
                    RecipientScope::All,
                )],
                &[stream_event("INSERT", membership_image("U3"))],
            )
            .await;

        assert_eq!(harness.socket.endpoints(), vec!["socket:conn-U1"]);
        let directory = harness.fanout.directory();
        assert!(directory
            .list_by_owner_and_channel(&OwnerId::from("U1"), ChannelKind::Socket)
            .is_empty());
    }
}

#[cfg(test)]
mod config_tests {
    use std::sync::Arc;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::ChannelKind;
    use dispatcher::{relay_channel, DispatcherBuilder, ProcessorContext, StaticEntityMediator};
    use fanout::NotificationFanoutService;
    use listener_directory::ListenerDirectory;

    const CONFIG: &str = r#"
[service]
name = "chat-notify"

[fanout]
max_concurrency = 4

[[fanout.gateways]]
channel = "socket"
gateway_type = "log"

[[fanout.gateways]]
channel = "push"
gateway_type = "webhook"
params = { base_url = "https://push.example.com/v1/", timeout_ms = "2000" }

[[processors]]
name = "team-member-added"
kind = "membership_added"
source_name = "chat-table"
grouping = "team"
publish_to = "team-events"

[[processors]]
name = "plan-changed"
kind = "field_changed"
source_name = "billing"
entity_type = "Subscription"
field = "plan"
event_type = "PlanChanged"
publish_to = "account-events"

[[processors]]
name = "team-socket"
kind = "topic_fanout"
channel_identifier = "team-events"
channels = ["socket", "push"]
"#;

    #[tokio::test]
    async fn test_blueprint_builds_both_stages() {
        let blueprint = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();

        let fanout = Arc::new(
            NotificationFanoutService::from_config(
                &blueprint.fanout,
                Arc::new(ListenerDirectory::new()),
            )
            .unwrap(),
        );
        assert_eq!(
            fanout.served_channels(),
            vec![ChannelKind::Push, ChannelKind::Socket]
        );

        // webhook handles embed the trimmed base URL
        let entry = fanout
            .register_channel_endpoint(&"U1".into(), ChannelKind::Push, "tok en")
            .await
            .unwrap();
        assert_eq!(
            entry.endpoint(),
            "https://push.example.com/v1/push/tok%20en"
        );

        let (publisher, _rx) = relay_channel(blueprint.service.relay_capacity);
        let source = DispatcherBuilder::new("source")
            .processors(blueprint.source_processors())
            .build(
                &ProcessorContext::new()
                    .with_mediator(Arc::new(StaticEntityMediator::new()))
                    .with_publisher(Arc::new(publisher)),
            )
            .unwrap();
        assert_eq!(
            source.processor_names(),
            vec!["team-member-added", "plan-changed"]
        );

        let relay = DispatcherBuilder::new("relay")
            .processors(blueprint.relay_processors())
            .build(&ProcessorContext::new().with_fanout(fanout))
            .unwrap();
        assert_eq!(relay.processor_names(), vec!["team-socket"]);
    }

    #[test]
    fn test_source_stage_requires_publisher() {
        let blueprint = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        let err = DispatcherBuilder::new("source")
            .processors(blueprint.source_processors())
            .build(&ProcessorContext::new())
            .err()
            .unwrap();
        assert!(err.to_string().contains("team-member-added"), "got: {err}");
    }
}
