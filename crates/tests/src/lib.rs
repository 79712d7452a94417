//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 模拟 e2e 测试（无需 Twitter / Discord）
//! - 管理命令与扇出共享同一个 store

#[cfg(test)]
mod contract_tests {
    #[tokio::test]
    async fn test_config_selects_store_backend() {
        use config_loader::{ConfigFormat, ConfigLoader};
        use contracts::DestinationStore;

        let bp = ConfigLoader::load_from_str(
            "[upstream]\naccount_id = \"42\"\n[store]\nbackend = \"memory\"\n",
            ConfigFormat::Toml,
        )
        .unwrap();
        let store = store::open_store(&bp.store).await.unwrap();

        assert_eq!(store.backend(), "memory");
        assert!(store.list_destinations().await.unwrap().is_empty());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use admin::{AdminHandler, Reply, REPLY_REMOVED, REPLY_SET};
    use contracts::{
        ChatConfig, DestinationStore, InboundMessage, Role, StoreConfig, StreamError, StreamEvent,
        StreamItem, PERMISSION_ADMINISTRATOR,
    };
    use dispatcher::FanoutDispatcher;
    use ingestion::{ListenerConfig, ManualClock, SessionEnd, UpstreamListener};
    use platform::{MockChatSession, ScriptedStreamSource};
    use store::MemoryStore;

    type Relay = FanoutDispatcher<MemoryStore, MockChatSession>;
    type Listener = UpstreamListener<ScriptedStreamSource, Arc<Relay>, Arc<ManualClock>>;

    fn post(text: &str) -> StreamEvent {
        StreamEvent::Item(StreamItem::original(text))
    }

    async fn store_with(pairs: &[(&str, &str)]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for (guild, channel) in pairs {
            store.set_destination(guild, channel).await.unwrap();
        }
        store
    }

    /// Scripted source -> listener -> dispatcher -> mock session
    fn wire(
        source: ScriptedStreamSource,
        store: Arc<MemoryStore>,
        session: Arc<MockChatSession>,
        clock: Arc<ManualClock>,
    ) -> Listener {
        let dispatcher = Arc::new(FanoutDispatcher::new(store, session));
        UpstreamListener::with_clock(source, dispatcher, clock, ListenerConfig::default())
    }

    /// End-to-end: one post reaches every configured channel exactly once
    #[tokio::test]
    async fn test_e2e_hello_fanout() {
        let store = store_with(&[("A", "chanX"), ("B", "chanY")]).await;
        let session = Arc::new(MockChatSession::new());
        let source = ScriptedStreamSource::new().then_events([post("hello")]);
        let mut listener = wire(
            source,
            store,
            Arc::clone(&session),
            Arc::new(ManualClock::new()),
        );

        let end = listener.run_session().await;

        assert_eq!(end, SessionEnd::StreamEnded);
        assert_eq!(session.messages_to("chanX"), vec!["hello"]);
        assert_eq!(session.messages_to("chanY"), vec!["hello"]);
        assert_eq!(session.messages().len(), 2);
    }

    /// Every channel sees posts in upstream order even when sends are slow
    #[tokio::test]
    async fn test_e2e_order_preserved_per_channel() {
        let store = store_with(&[("A", "c1"), ("B", "c2"), ("C", "c3")]).await;
        let session = Arc::new(MockChatSession::new().with_send_delay(Duration::from_millis(5)));
        let source = ScriptedStreamSource::new().then_events([post("1"), post("2"), post("3")]);
        let mut listener = wire(
            source,
            store,
            Arc::clone(&session),
            Arc::new(ManualClock::new()),
        );

        listener.run_session().await;

        for channel in ["c1", "c2", "c3"] {
            assert_eq!(session.messages_to(channel), vec!["1", "2", "3"]);
        }
        // fan-out of one post is concurrent, posts themselves are not
        assert_eq!(session.peak_in_flight(), 3);
    }

    #[tokio::test]
    async fn test_e2e_failing_channel_notifies_owner_once() {
        let store = store_with(&[("A", "chanX"), ("B", "chanY")]).await;
        let session = Arc::new(
            MockChatSession::new()
                .with_failing_channel("chanX")
                .with_owner("A", "ownerA")
                .with_owner("B", "ownerB"),
        );
        let source = ScriptedStreamSource::new().then_events([post("hello")]);
        let mut listener = wire(
            source,
            store,
            Arc::clone(&session),
            Arc::new(ManualClock::new()),
        );

        listener.run_session().await;

        assert_eq!(session.messages_to("chanY"), vec!["hello"]);
        let notices = session.messages_to(&MockChatSession::private_channel_of("ownerA"));
        assert_eq!(notices.len(), 1);
        assert!(notices[0].contains("<#chanX>"));
        assert!(session
            .messages_to(&MockChatSession::private_channel_of("ownerB"))
            .is_empty());
    }

    #[tokio::test]
    async fn test_e2e_reshares_quotes_and_replies_are_not_relayed() {
        let store = store_with(&[("A", "chanX")]).await;
        let session = Arc::new(MockChatSession::new());
        let source = ScriptedStreamSource::new().then_events([
            StreamEvent::Item(StreamItem {
                is_reshare: true,
                ..StreamItem::original("RT @someone")
            }),
            StreamEvent::Item(StreamItem {
                is_quote: true,
                ..StreamItem::original("look at this")
            }),
            StreamEvent::Item(StreamItem {
                in_reply_to_user: Some("123".to_string()),
                ..StreamItem::original("@someone hi")
            }),
            post("poyo"),
        ]);
        let mut listener = wire(
            source,
            store,
            Arc::clone(&session),
            Arc::new(ManualClock::new()),
        );

        listener.run_session().await;

        assert_eq!(session.messages_to("chanX"), vec!["poyo"]);
        let snap = listener.metrics().snapshot();
        assert_eq!(snap.items_received, 4);
        assert_eq!(snap.items_filtered, 3);
    }

    /// A stream error tears the subscription down; relaying resumes after one backoff
    #[tokio::test]
    async fn test_e2e_reconnect_after_stream_error() {
        let store = store_with(&[("A", "chanX")]).await;
        let session = Arc::new(MockChatSession::new());
        let clock = Arc::new(ManualClock::new());
        let source = ScriptedStreamSource::new()
            .then_events([
                post("before"),
                StreamEvent::Error(StreamError::upstream("operational disconnect")),
                post("lost with the old stream"),
            ])
            .then_fail(StreamError::connect("connection refused"))
            .then_events([post("after")]);
        let mut listener = wire(source, store, Arc::clone(&session), Arc::clone(&clock));

        assert!(matches!(
            listener.run_session().await,
            SessionEnd::StreamFailed(_)
        ));
        assert!(matches!(
            listener.run_session().await,
            SessionEnd::SubscribeFailed(_)
        ));
        assert_eq!(listener.run_session().await, SessionEnd::StreamEnded);

        assert_eq!(session.messages_to("chanX"), vec!["before", "after"]);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(30); 3]);
        assert_eq!(listener.metrics().snapshot().sessions, 2);
    }

    /// Admin commands and the fan-out share one store
    #[tokio::test]
    async fn test_e2e_admin_commands_steer_fanout() {
        let store = Arc::new(MemoryStore::new());
        let session = Arc::new(
            MockChatSession::new()
                .with_guild_roles("G1", vec![Role::new("mods", PERMISSION_ADMINISTRATOR)])
                .with_member_roles("G1", "boss", &["mods"])
                .with_channel("G1", "111"),
        );
        let admin = AdminHandler::new(
            Arc::clone(&store),
            Arc::clone(&session),
            &ChatConfig::default(),
        );
        let dispatcher = FanoutDispatcher::new(Arc::clone(&store), Arc::clone(&session));

        let reply = admin
            .handle_message(&InboundMessage::in_guild(
                "G1",
                "general",
                "boss",
                "!kb set-kirb-post <#111>",
            ))
            .await;
        assert_eq!(reply, Some(Reply::Text(REPLY_SET.to_string())));

        dispatcher.relay(&StreamItem::original("first")).await;
        assert_eq!(session.messages_to("111"), vec!["first"]);

        // non-admins cannot redirect the relay
        admin
            .handle_message(&InboundMessage::in_guild(
                "G1",
                "general",
                "pleb",
                "!kb set-kirb-post",
            ))
            .await;
        dispatcher.relay(&StreamItem::original("second")).await;
        assert_eq!(session.messages_to("111"), vec!["first", "second"]);
        assert!(session.messages_to("general").iter().all(|m| m != "second"));

        let reply = admin
            .handle_message(&InboundMessage::in_guild(
                "G1",
                "general",
                "boss",
                "!kb remove-kirb-post",
            ))
            .await;
        assert_eq!(reply, Some(Reply::Text(REPLY_REMOVED.to_string())));

        let report = dispatcher.relay(&StreamItem::original("third")).await;
        assert_eq!(report.destinations, 0);
        assert_eq!(session.messages_to("111"), vec!["first", "second"]);
    }

    /// Destinations written through the embedded backend survive a reopen
    #[tokio::test]
    async fn test_e2e_embedded_store_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::Embedded {
            path: dir.path().join("kirb.db"),
        };

        {
            let store = store::open_store(&config).await.unwrap();
            store.set_destination("A", "chanX").await.unwrap();
        }

        let store = Arc::new(store::open_store(&config).await.unwrap());
        let session = Arc::new(MockChatSession::new());
        let dispatcher = FanoutDispatcher::new(store, Arc::clone(&session));

        dispatcher.relay(&StreamItem::original("still here")).await;
        assert_eq!(session.messages_to("chanX"), vec!["still here"]);
    }
}
