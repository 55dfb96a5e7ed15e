// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP API tests: the router is driven in-process with `tower::ServiceExt`,
//! host commands are replaced with shell stand-ins and temp directories.

use agent_core::application::binlog_assembler::{decode_payload, encode_payload};
use agent_core::application::HeartbeatStatus;
use agent_core::domain::agent_config::AgentConfig;
use agent_core::domain::token::ProcessToken;
use agent_core::infrastructure::{CommandRunner, HostOperations};
use agent_core::presentation::{app, AppState};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

const TOKEN: &str = "test-token";

struct TestAgent {
    router: Router,
    heartbeat: HeartbeatStatus,
    // keeps the mount table alive
    _dir: tempfile::TempDir,
}

fn agent(config: AgentConfig) -> TestAgent {
    agent_with_mounts(config, "")
}

fn agent_with_mounts(config: AgentConfig, mount_table: &str) -> TestAgent {
    let dir = tempfile::tempdir().unwrap();
    let mtab = dir.path().join("mtab");
    std::fs::write(&mtab, mount_table).unwrap();

    let host = HostOperations::new(CommandRunner::default(), Arc::new(config)).with_mount_table(&mtab);
    let heartbeat = HeartbeatStatus::new();
    let state = AppState::with_host(host, ProcessToken::from_string(TOKEN), heartbeat.clone());
    TestAgent {
        router: app(state),
        heartbeat,
        _dir: dir,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    send(router, Request::get(uri).body(Body::empty()).unwrap()).await
}

fn with_token(uri: &str) -> String {
    let separator = if uri.contains('?') { '&' } else { '?' };
    format!("{}{}token={}", uri, separator, TOKEN)
}

#[tokio::test]
async fn test_hostname_needs_no_token() {
    let agent = agent(AgentConfig::default());
    let (status, body) = get(&agent.router, "/api/hostname").await;

    assert_eq!(status, StatusCode::OK);
    assert!(!body.as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_status_follows_heartbeat() {
    let agent = agent(AgentConfig::default());

    let (status, body) = get(&agent.router, "/api/status").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!("BAD"));

    agent.heartbeat.record_contact();
    let (status, body) = get(&agent.router, "/api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("OK"));
}

#[tokio::test]
async fn test_status_endpoint_is_configurable() {
    let agent = agent(AgentConfig {
        status_endpoint: "/health".to_string(),
        ..Default::default()
    });
    agent.heartbeat.record_contact();

    let (status, _) = get(&agent.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_missing_or_wrong_token_is_rejected() {
    let agent = agent(AgentConfig {
        mysql_port_command: "echo 3306".to_string(),
        ..Default::default()
    });
    let expected = json!({"Code": "ERROR", "Message": "Invalid token", "Details": null});

    let (status, body) = get(&agent.router, "/api/mysql-port").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, expected);

    let (status, body) = get(&agent.router, "/api/mysql-port?token=nope").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, expected);
}

#[tokio::test]
async fn test_token_accepted_from_query_or_header() {
    let agent = agent(AgentConfig {
        mysql_port_command: "echo 3306".to_string(),
        token_http_header: "X-Agent-Token".to_string(),
        ..Default::default()
    });

    let (status, body) = get(&agent.router, &with_token("/api/mysql-port")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(3306));

    let request = Request::get("/api/mysql-port")
        .header("X-Agent-Token", TOKEN)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&agent.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(3306));
}

#[tokio::test]
async fn test_basic_auth_guards_every_route() {
    let agent = agent(AgentConfig {
        http_auth_user: "orc".to_string(),
        http_auth_password: "s3cret".to_string(),
        ..Default::default()
    });

    let response = agent
        .router
        .clone()
        .oneshot(Request::get("/api/hostname").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));

    let request = Request::get("/api/hostname")
        .header(
            header::AUTHORIZATION,
            format!("Basic {}", STANDARD.encode("orc:s3cret")),
        )
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&agent.router, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_custom_commands() {
    let mut config = AgentConfig::default();
    config
        .custom_commands
        .insert("greet".to_string(), "echo hello".to_string());
    config
        .custom_commands
        .insert("broken".to_string(), "exit 3".to_string());
    let agent = agent(config);

    let (status, body) = get(&agent.router, &with_token("/api/custom-commands/greet")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"Code": "OK", "Message": "hello\n", "Details": null}));

    let (status, body) = get(&agent.router, &with_token("/api/custom-commands/nope")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["Code"], json!("ERROR"));
    assert!(body["Message"]
        .as_str()
        .unwrap()
        .contains("nope : Command not found"));

    let (status, body) = get(&agent.router, &with_token("/api/custom-commands/broken")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["Code"], json!("ERROR"));
}

#[tokio::test]
async fn test_mysql_service_endpoints() {
    let agent = agent(AgentConfig {
        mysql_service_status_command: "exit 1".to_string(),
        mysql_service_stop_command: "true".to_string(),
        mysql_service_start_command: "false".to_string(),
        ..Default::default()
    });

    let (status, body) = get(&agent.router, &with_token("/api/mysql-status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(false));

    let (status, body) = get(&agent.router, &with_token("/api/mysql-stop")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(true));

    let (status, _) = get(&agent.router, &with_token("/api/mysql-start")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_delete_datadir_refuses_root() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("deleted");
    let agent = agent(AgentConfig {
        mysql_datadir_command: "echo /".to_string(),
        mysql_delete_datadir_content_command: format!("touch {}", marker.display()),
        ..Default::default()
    });

    let (status, body) = get(&agent.router, &with_token("/api/delete-mysql-datadir")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["Code"], json!("ERROR"));
    assert!(!marker.exists());
}

#[tokio::test]
async fn test_send_seed_requires_mounted_snapshot() {
    let agent = agent(AgentConfig {
        snapshot_mount_point: "/mnt/snapshot".to_string(),
        send_seed_data_command: "true".to_string(),
        ..Default::default()
    });

    let (status, body) = get(&agent.router, &with_token("/api/send-mysql-seed-data/db-2/seed-1")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["Code"], json!("ERROR"));

    let (status, body) = get(&agent.router, &with_token("/api/seed-command-completed/seed-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(false));
}

#[tokio::test]
async fn test_unknown_seed_is_not_completed_and_abort_is_noop() {
    let agent = agent(AgentConfig::default());

    let (_, body) = get(&agent.router, &with_token("/api/seed-command-succeeded/ghost")).await;
    assert_eq!(body, json!(false));

    let (status, body) = get(&agent.router, &with_token("/api/abort-seed/ghost")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(true));
}

#[tokio::test]
async fn test_mount_reports_unmounted_point() {
    let agent = agent(AgentConfig {
        snapshot_mount_point: "/mnt/snapshot".to_string(),
        ..Default::default()
    });

    let (status, body) = get(&agent.router, &with_token("/api/mount")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Path"], json!("/mnt/snapshot"));
    assert_eq!(body["IsMounted"], json!(false));
    assert_eq!(body["MySQLDataPath"], json!(""));
}

#[tokio::test]
async fn test_mount_detects_mysql_data_path_on_snapshot() {
    let snapshot = tempfile::tempdir().unwrap();
    let mount_point = snapshot.path().to_string_lossy().into_owned();
    let data = snapshot.path().join("mysql");
    std::fs::create_dir(&data).unwrap();
    std::fs::write(data.join("ibdata1"), vec![0u8; 64]).unwrap();

    let agent = agent_with_mounts(
        AgentConfig {
            snapshot_mount_point: mount_point.clone(),
            mysql_datadir_command: "echo /var/lib/mysql".to_string(),
            ..Default::default()
        },
        &format!("/dev/mapper/vg0-snap {} xfs rw,nouuid 0 0\n", mount_point),
    );

    let (status, body) = get(&agent.router, &with_token("/api/mount")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["IsMounted"], json!(true));
    assert_eq!(body["Device"], json!("/dev/mapper/vg0-snap"));
    assert_eq!(body["FileSystem"], json!("xfs"));
    assert_eq!(body["MySQLDataPath"], json!(data.to_string_lossy()));
    assert!(body["MySQLDiskUsage"].as_u64().unwrap() >= 64);
}

fn relay_log_datadir(dir: &Path) {
    std::fs::write(
        dir.join("relay-bin.index"),
        "./relay-bin.000001\n./relay-bin.000002\n",
    )
    .unwrap();
    std::fs::write(dir.join("relay-bin.000001"), vec![b'a'; 100]).unwrap();
    std::fs::write(dir.join("relay-bin.000002"), vec![b'b'; 123]).unwrap();
}

#[tokio::test]
async fn test_relay_log_endpoints() {
    let datadir = tempfile::tempdir().unwrap();
    relay_log_datadir(datadir.path());
    let agent = agent(AgentConfig {
        mysql_datadir_command: format!("echo {}", datadir.path().display()),
        ..Default::default()
    });

    let (status, body) = get(&agent.router, &with_token("/api/mysql-relay-log-files")).await;
    assert_eq!(status, StatusCode::OK);
    let expected: Vec<String> = ["relay-bin.000001", "relay-bin.000002"]
        .iter()
        .map(|name| datadir.path().join(name).to_string_lossy().into_owned())
        .collect();
    assert_eq!(body, json!(expected));

    let (status, body) = get(&agent.router, &with_token("/api/mysql-relay-log-end-coordinates")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"LogFile": expected[1], "LogPos": 123, "Type": 1})
    );

    let (status, body) = get(
        &agent.router,
        &with_token("/api/mysql-relaylog-contents-tail/relay-bin.999999/4"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(""));
}

// Reports a 10 byte header for `<file> --start-position=4`.
const FAKE_LOG_READER: &str = r##"#!/bin/bash
if [ "$#" -eq 2 ] && [ "$2" = "--start-position=4" ]; then
  echo "#700101  0:00:00 server id 1  end_log_pos 10 CRC32 0x00000000  Start: binlog v 4"
  exit 0
fi
cat "$@"
"##;

#[tokio::test]
async fn test_relaylog_tail_resumes_from_named_file() {
    let datadir = tempfile::tempdir().unwrap();
    let reader = datadir.path().join("fake-mysqlbinlog");
    std::fs::write(&reader, FAKE_LOG_READER).unwrap();
    std::fs::write(
        datadir.path().join("relay-bin.index"),
        "./relay-bin.000001\n./relay-bin.000002\n./relay-bin.000003\n",
    )
    .unwrap();
    std::fs::write(datadir.path().join("relay-bin.000001"), b"HEADER0000ZZZZZ").unwrap();
    std::fs::write(datadir.path().join("relay-bin.000002"), b"HEADER1234AAAAABBBBB").unwrap();
    std::fs::write(datadir.path().join("relay-bin.000003"), b"HEADER5678CCCCC").unwrap();

    let agent = agent(AgentConfig {
        mysql_datadir_command: format!("echo {}", datadir.path().display()),
        mysql_binlog_command: format!("bash {}", reader.display()),
        ..Default::default()
    });

    // base name match, start inside the file, later file loses its header
    let (status, body) = get(
        &agent.router,
        &with_token("/api/mysql-relaylog-contents-tail/relay-bin.000002/15"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let payload = decode_payload(body.as_str().unwrap().as_bytes()).unwrap();
    assert_eq!(payload, b"HEADER1234BBBBBCCCCC");

    // start 0 means from the beginning of the named file
    let (status, body) = get(
        &agent.router,
        &with_token("/api/mysql-relaylog-contents-tail/relay-bin.000003/0"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let payload = decode_payload(body.as_str().unwrap().as_bytes()).unwrap();
    assert_eq!(payload, b"HEADER5678CCCCC");
}

#[tokio::test]
async fn test_binlog_contents_requires_files() {
    let agent = agent(AgentConfig::default());

    let (status, body) = get(&agent.router, &with_token("/api/mysql-binlog-contents?start=4")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["Code"], json!("ERROR"));

    let (status, _) = get(
        &agent.router,
        &with_token("/api/mysql-binlog-binary-contents?binlog=x&start=abc"),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_apply_relaylog_contents_accepts_large_body() {
    let dir = tempfile::tempdir().unwrap();
    let applied = dir.path().join("applied");
    let agent = agent(AgentConfig {
        mysql_binlog_command: "cat".to_string(),
        mysql_client_command: format!("cat > {}", applied.display()),
        ..Default::default()
    });

    // incompressible, so the encoded body exceeds axum's default 2 MiB limit
    let mut state = 0x2545_f491_4f6c_dd1du64;
    let contents: Vec<u8> = (0..3 * 1024 * 1024)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state as u8
        })
        .collect();
    let encoded = encode_payload(&contents).unwrap();

    let request = Request::post(with_token("/api/apply-relaylog-contents"))
        .body(Body::from(encoded))
        .unwrap();
    let (status, body) = send(&agent.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("OK"));
    assert_eq!(std::fs::read(&applied).unwrap(), contents);
}
