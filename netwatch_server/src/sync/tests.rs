//! End-to-end tests for the sync operations against an in-memory database
//! and a scripted gateway.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDateTime, Utc};
use diesel::RunQueryDsl;

use super::connection_test::{ConnectionOverride, test_connection};
use super::cycle::{refresh, run_cycle};
use super::import::{ImportCandidate, discover, import};
use super::reconcile::ReconcileMode;
use super::*;
use crate::db::test_support::memory_pool;
use crate::device_type::DeviceType;
use crate::devices::{self, DeviceInput, DeviceUpdate};
use crate::error::ErrorKind;
use crate::gateway::GatewayCommand;
use crate::gateway::fake::{FakeGatewayFactory, netwatch, record};
use crate::models::{Device, DeviceStatus, NewDevice};

fn context(factory: &FakeGatewayFactory) -> SyncContext {
    SyncContext::new(memory_pool(), Arc::new(factory.clone()), Duration::from_secs(1))
}

fn an_hour_ago() -> NaiveDateTime {
    Utc::now().naive_utc() - chrono::Duration::hours(1)
}

async fn configure(ctx: &SyncContext) {
    ctx.with_conn(|conn| {
        let mut config = SystemConfig::default();
        config.host = Some("192.168.88.1".into());
        config.username = "admin".into();
        db::save_config(conn, &config)?;
        Ok(())
    })
    .await
    .unwrap();
}

async fn seed(ctx: &SyncContext, ip: &str, status: DeviceStatus) -> Device {
    let ip = ip.to_string();
    ctx.with_conn(move |conn| {
        let mut row = NewDevice::new(&ip, &ip, DeviceType::Other, status, None, an_hour_ago());
        if status == DeviceStatus::Up {
            row.last_seen = Some(row.status_since);
        }
        db::insert_device(conn, &row)?;
        Ok(db::find_device(conn, &row.id)?.unwrap())
    })
    .await
    .unwrap()
}

async fn reload(ctx: &SyncContext, device: &Device) -> Device {
    devices::get_device(ctx, device.id.clone()).await.unwrap()
}

async fn device_count(ctx: &SyncContext) -> usize {
    devices::list_devices(ctx).await.unwrap().len()
}

fn candidate(name: &str, ip: &str) -> ImportCandidate {
    ImportCandidate {
        name: name.to_string(),
        ip: ip.to_string(),
        ..Default::default()
    }
}

mod cycle_tests {
    use super::*;

    #[tokio::test]
    async fn down_device_reported_up_becomes_up() {
        let factory = FakeGatewayFactory::new();
        let ctx = context(&factory);
        configure(&ctx).await;
        let device = seed(&ctx, "10.0.0.5", DeviceStatus::Down).await;
        factory.respond(vec![netwatch("10.0.0.5", "up")]);

        let params = ctx.connection_params().await.unwrap();
        let report = run_cycle(&ctx, &params, ReconcileMode::Poll).await.unwrap();
        assert_eq!(report.updated, 1);

        let after = reload(&ctx, &device).await;
        assert_eq!(after.status, DeviceStatus::Up);
        assert!(after.status_since > device.status_since);
        assert_eq!(after.last_seen, Some(after.status_since));
        assert_eq!(factory.log().closes, 1);
    }

    #[tokio::test]
    async fn up_device_staying_up_refreshes_last_seen_only() {
        let factory = FakeGatewayFactory::new();
        let ctx = context(&factory);
        configure(&ctx).await;
        let device = seed(&ctx, "10.0.0.9", DeviceStatus::Up).await;
        let t0 = device.last_seen.unwrap();
        factory.respond(vec![netwatch("10.0.0.9", "up")]);

        let params = ctx.connection_params().await.unwrap();
        run_cycle(&ctx, &params, ReconcileMode::Poll).await.unwrap();

        let after = reload(&ctx, &device).await;
        assert_eq!(after.status, DeviceStatus::Up);
        assert_eq!(after.status_since, device.status_since);
        assert!(after.last_seen.unwrap() > t0);
    }

    #[tokio::test]
    async fn session_is_closed_when_query_fails() {
        let factory = FakeGatewayFactory::failing_query("connect ECONNREFUSED 192.168.88.1:80");
        let ctx = context(&factory);
        configure(&ctx).await;

        let params = ctx.connection_params().await.unwrap();
        let err = run_cycle(&ctx, &params, ReconcileMode::Poll).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConnectionRefused);
        let log = factory.log();
        assert_eq!(log.opened, 1);
        assert_eq!(log.closes, 1);
    }

    #[tokio::test]
    async fn session_is_closed_when_connect_fails() {
        let factory = FakeGatewayFactory::failing_connect("Connection timed out");
        let ctx = context(&factory);
        configure(&ctx).await;

        let params = ctx.connection_params().await.unwrap();
        let err = run_cycle(&ctx, &params, ReconcileMode::Poll).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(factory.log().queries.is_empty());
        assert_eq!(factory.log().closes, 1);
    }

    #[tokio::test]
    async fn session_is_closed_when_storage_fails_after_fetch() {
        let factory = FakeGatewayFactory::new();
        let ctx = context(&factory);
        configure(&ctx).await;
        factory.respond(vec![netwatch("10.0.0.5", "up")]);
        ctx.with_conn(|conn| {
            diesel::sql_query("DROP TABLE devices").execute(conn)?;
            Ok(())
        })
        .await
        .unwrap();

        let params = ctx.connection_params().await.unwrap();
        let err = run_cycle(&ctx, &params, ReconcileMode::Poll).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Unknown);
        let log = factory.log();
        assert_eq!(log.queries, vec![GatewayCommand::ListNetwatch]);
        assert_eq!(log.closes, 1);
    }

    #[tokio::test]
    async fn refresh_without_settings_reports_not_configured() {
        let factory = FakeGatewayFactory::new();
        let ctx = context(&factory);

        let report = refresh(&ctx).await;

        assert_eq!(report.error.unwrap().category, ErrorKind::NotConfigured);
        assert_eq!(factory.log().opened, 0);
    }

    #[tokio::test]
    async fn refresh_downgrades_missing_devices() {
        let factory = FakeGatewayFactory::new();
        let ctx = context(&factory);
        configure(&ctx).await;
        let missing = seed(&ctx, "10.0.0.7", DeviceStatus::Up).await;
        let present = seed(&ctx, "10.0.0.8", DeviceStatus::Down).await;
        factory.respond(vec![netwatch("10.0.0.8", "down")]);

        let report = refresh(&ctx).await;

        assert!(report.error.is_none());
        assert_eq!(report.not_found, vec!["10.0.0.7"]);
        assert_eq!(reload(&ctx, &missing).await.status, DeviceStatus::Unknown);
        assert_eq!(reload(&ctx, &present).await, present);
    }
}

mod import_tests {
    use super::*;

    #[tokio::test]
    async fn one_invalid_candidate_rejects_the_batch() {
        let ctx = context(&FakeGatewayFactory::new());
        let batch = vec![
            candidate("core", "10.0.0.1"),
            candidate("", "10.0.0.2"),
            candidate("edge", "10.0.0.3"),
        ];

        let err = import(&ctx, batch).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert_eq!(device_count(&ctx).await, 0);
    }

    #[tokio::test]
    async fn unknown_type_rejects_the_batch() {
        let ctx = context(&FakeGatewayFactory::new());
        let mut bad = candidate("toaster", "10.0.0.2");
        bad.device_type = Some("TOASTER".into());

        let err = import(&ctx, vec![candidate("core", "10.0.0.1"), bad])
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert_eq!(device_count(&ctx).await, 0);
    }

    #[tokio::test]
    async fn existing_and_repeated_ips_are_skipped() {
        let ctx = context(&FakeGatewayFactory::new());
        seed(&ctx, "10.0.0.1", DeviceStatus::Up).await;

        let mut typed = candidate("Core Switch", "10.0.0.2");
        typed.device_type = Some("SWITCH".into());
        typed.status = Some("up".into());
        let outcome = import(
            &ctx,
            vec![
                candidate("old", "10.0.0.1"),
                typed,
                candidate("plain", "10.0.0.3"),
                candidate("again", "10.0.0.3"),
            ],
        )
        .await
        .unwrap();

        assert_eq!(outcome.skipped_ips, vec!["10.0.0.1", "10.0.0.3"]);
        assert_eq!(outcome.imported.len(), 2);
        assert_eq!(outcome.imported[0].device_type, DeviceType::Switch);
        assert_eq!(outcome.imported[0].status, DeviceStatus::Up);
        assert_eq!(outcome.imported[0].last_seen, None);
        assert_eq!(outcome.imported[1].device_type, DeviceType::Other);
        assert_eq!(outcome.imported[1].status, DeviceStatus::Unknown);
        assert_eq!(outcome.imported[1].position_x, 0.0);
        assert_eq!(device_count(&ctx).await, 3);
    }

    #[tokio::test]
    async fn discover_suggests_types_and_flags_known_hosts() {
        let factory = FakeGatewayFactory::new();
        let ctx = context(&factory);
        configure(&ctx).await;
        seed(&ctx, "10.0.0.1", DeviceStatus::Up).await;
        factory.respond(vec![
            record(&[("host", "10.0.0.1"), ("status", "up"), ("comment", "MikroTik core")]),
            record(&[("host", "10.0.0.2"), ("status", "down"), ("comment", "Lobby WiFi")]),
            record(&[("host", "printer-2f.lan"), ("status", "up")]),
        ]);

        let report = discover(&ctx).await;

        assert!(report.error.is_none());
        assert_eq!(report.entries.len(), 3);
        assert!(report.entries[0].already_imported);
        assert_eq!(report.entries[0].suggested_type, DeviceType::Router);
        assert!(!report.entries[1].already_imported);
        assert_eq!(report.entries[1].suggested_type, DeviceType::AccessPoint);
        assert_eq!(report.entries[1].status, DeviceStatus::Down);
        assert_eq!(report.entries[2].suggested_type, DeviceType::Printer);
        assert_eq!(factory.log().closes, 1);
    }

    #[tokio::test]
    async fn discover_failure_is_a_value() {
        let factory = FakeGatewayFactory::failing_connect("EHOSTUNREACH");
        let ctx = context(&factory);
        configure(&ctx).await;

        let report = discover(&ctx).await;

        assert!(report.entries.is_empty());
        assert_eq!(report.error.unwrap().category, ErrorKind::NetworkUnreachable);
        assert_eq!(factory.log().closes, 1);
    }
}

mod device_tests {
    use super::*;

    fn input(name: &str, ip: &str, push: bool) -> DeviceInput {
        DeviceInput {
            name: name.to_string(),
            ip: ip.to_string(),
            device_type: Some("ROUTER".into()),
            push_to_netwatch: push,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn failed_push_still_creates_the_device() {
        let factory = FakeGatewayFactory::failing_connect("Connection timed out");
        let ctx = context(&factory);
        configure(&ctx).await;

        let created = devices::create_device(&ctx, input("X", "10.1.1.1", true))
            .await
            .unwrap();

        let warning = created.warning.unwrap();
        assert!(warning.contains("Timeout"), "{warning}");
        let stored = reload(&ctx, &created.device).await;
        assert_eq!(stored.ip, "10.1.1.1");
        assert_eq!(stored.device_type, DeviceType::Router);
        assert_eq!(stored.status, DeviceStatus::Unknown);
        assert_eq!(factory.log().closes, 1);
    }

    #[tokio::test]
    async fn push_without_settings_warns_not_configured() {
        let factory = FakeGatewayFactory::new();
        let ctx = context(&factory);

        let created = devices::create_device(&ctx, input("X", "10.1.1.1", true))
            .await
            .unwrap();

        assert!(created.warning.unwrap().contains("not configured"));
        assert_eq!(device_count(&ctx).await, 1);
        assert_eq!(factory.log().opened, 0);
    }

    #[tokio::test]
    async fn successful_push_adds_netwatch_entry() {
        let factory = FakeGatewayFactory::new();
        let ctx = context(&factory);
        configure(&ctx).await;

        let created = devices::create_device(&ctx, input("Edge", "10.1.1.2", true))
            .await
            .unwrap();

        assert!(created.warning.is_none());
        assert_eq!(
            factory.log().queries,
            vec![GatewayCommand::AddNetwatch {
                host: "10.1.1.2".into(),
                comment: "Edge".into(),
            }]
        );
    }

    #[tokio::test]
    async fn push_not_requested_never_opens_a_session() {
        let factory = FakeGatewayFactory::new();
        let ctx = context(&factory);
        configure(&ctx).await;

        let created = devices::create_device(&ctx, input("Edge", "10.1.1.2", false))
            .await
            .unwrap();

        assert!(created.warning.is_none());
        assert_eq!(factory.log().opened, 0);
    }

    #[tokio::test]
    async fn operator_status_is_not_an_observation() {
        let ctx = context(&FakeGatewayFactory::new());
        let mut up = input("core", "10.0.0.1", false);
        up.status = Some("up".into());

        let created = devices::create_device(&ctx, up).await.unwrap().device;
        assert_eq!(created.status, DeviceStatus::Up);
        assert_eq!(created.last_seen, None);

        let down = seed(&ctx, "10.0.0.2", DeviceStatus::Down).await;
        let update = DeviceUpdate {
            status: Some("up".into()),
            ..Default::default()
        };
        let updated = devices::update_device(&ctx, down.id.clone(), update)
            .await
            .unwrap();
        assert_eq!(updated.last_seen, None);
    }

    #[tokio::test]
    async fn ip_stays_unique_across_create_and_update() {
        let ctx = context(&FakeGatewayFactory::new());
        let first = devices::create_device(&ctx, input("a", "10.0.0.1", false))
            .await
            .unwrap()
            .device;
        devices::create_device(&ctx, input("b", "10.0.0.2", false))
            .await
            .unwrap();

        let err = devices::create_device(&ctx, input("c", "10.0.0.1", false))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateKey);

        let update = DeviceUpdate {
            ip: Some("10.0.0.2".into()),
            ..Default::default()
        };
        let err = devices::update_device(&ctx, first.id.clone(), update)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateKey);

        // Re-saving its own ip is not a conflict.
        let update = DeviceUpdate {
            ip: Some("10.0.0.1".into()),
            name: Some("renamed".into()),
            ..Default::default()
        };
        let renamed = devices::update_device(&ctx, first.id.clone(), update)
            .await
            .unwrap();
        assert_eq!(renamed.name, "renamed");
        assert_eq!(device_count(&ctx).await, 2);
    }

    #[tokio::test]
    async fn status_since_moves_only_on_status_change() {
        let ctx = context(&FakeGatewayFactory::new());
        let device = seed(&ctx, "10.0.0.1", DeviceStatus::Down).await;

        let same = DeviceUpdate {
            status: Some("down".into()),
            comment: Some("rack 2".into()),
            ..Default::default()
        };
        let unchanged = devices::update_device(&ctx, device.id.clone(), same)
            .await
            .unwrap();
        assert_eq!(unchanged.status_since, device.status_since);
        assert_eq!(unchanged.comment.as_deref(), Some("rack 2"));

        let changed = DeviceUpdate {
            status: Some("up".into()),
            ..Default::default()
        };
        let updated = devices::update_device(&ctx, device.id.clone(), changed)
            .await
            .unwrap();
        assert_eq!(updated.status, DeviceStatus::Up);
        assert!(updated.status_since > device.status_since);
    }

    #[tokio::test]
    async fn invalid_input_is_rejected() {
        let ctx = context(&FakeGatewayFactory::new());

        let err = devices::create_device(&ctx, input(" ", "10.0.0.1", false))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);

        let mut bad_type = input("a", "10.0.0.1", false);
        bad_type.device_type = Some("BLENDER".into());
        let err = devices::create_device(&ctx, bad_type).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert_eq!(device_count(&ctx).await, 0);
    }

    #[tokio::test]
    async fn missing_devices_are_not_found() {
        let ctx = context(&FakeGatewayFactory::new());

        let err = devices::delete_device(&ctx, "nope".into()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = devices::update_device(&ctx, "nope".into(), DeviceUpdate::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

mod connection_tests {
    use super::*;

    #[tokio::test]
    async fn reports_identity_and_version() {
        let factory = FakeGatewayFactory::new();
        let ctx = context(&factory);
        configure(&ctx).await;
        factory.respond(vec![record(&[("name", "core-router")])]);
        factory.respond(vec![record(&[("version", "7.15.3 (stable)"), ("board-name", "hEX")])]);

        let result = test_connection(&ctx, None).await;

        assert!(result.success, "{}", result.detail);
        assert_eq!(result.identity.as_deref(), Some("core-router"));
        assert_eq!(result.version.as_deref(), Some("7.15.3 (stable)"));
        assert_eq!(
            factory.log().queries,
            vec![GatewayCommand::Identity, GatewayCommand::Resource]
        );
        assert_eq!(factory.log().closes, 1);
    }

    #[tokio::test]
    async fn failures_are_classified() {
        let factory = FakeGatewayFactory::failing_connect("cannot log in");
        let ctx = context(&factory);
        configure(&ctx).await;

        let result = test_connection(&ctx, None).await;

        assert!(!result.success);
        assert_eq!(result.category, Some(ErrorKind::AuthFailure));
        assert_eq!(result.detail, "cannot log in");
        assert_eq!(factory.log().closes, 1);
    }

    #[tokio::test]
    async fn unconfigured_without_overrides() {
        let factory = FakeGatewayFactory::new();
        let ctx = context(&factory);

        let result = test_connection(&ctx, None).await;

        assert!(!result.success);
        assert_eq!(result.category, Some(ErrorKind::NotConfigured));
        assert_eq!(factory.log().opened, 0);
    }

    #[tokio::test]
    async fn override_port_zero_is_invalid() {
        let factory = FakeGatewayFactory::new();
        let ctx = context(&factory);
        configure(&ctx).await;

        let overrides = ConnectionOverride {
            host: "10.9.9.9".into(),
            port: Some(0),
            ..Default::default()
        };
        let result = test_connection(&ctx, Some(overrides)).await;

        assert!(!result.success);
        assert_eq!(result.category, Some(ErrorKind::ValidationError));
        assert_eq!(factory.log().opened, 0);
    }

    #[tokio::test]
    async fn overrides_fall_back_to_stored_password() {
        let factory = FakeGatewayFactory::new();
        let ctx = context(&factory);
        ctx.with_conn(|conn| {
            let mut config = SystemConfig::default();
            config.password = "stored-secret".into();
            db::save_config(conn, &config)?;
            Ok(())
        })
        .await
        .unwrap();

        let overrides = ConnectionOverride {
            host: "10.9.9.9".into(),
            username: "api".into(),
            port: Some(8080),
            ..Default::default()
        };
        test_connection(&ctx, Some(overrides)).await;

        let log = factory.log();
        assert_eq!(log.params[0].host, "10.9.9.9");
        assert_eq!(log.params[0].port, 8080);
        assert_eq!(log.params[0].password, "stored-secret");
    }
}
