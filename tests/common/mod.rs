//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use docgate::config::{EtagPolicy, GatewayConfig, PermissionConfig, UserConfig};
use docgate::security::access::UNAUTHENTICATED_ROLE;
use docgate::{HttpServer, InMemoryDatabase, Shutdown};

pub const ADMIN: (&str, &str) = ("admin", "changeit");

/// Config with one admin user and anonymous read access under `/public`.
pub fn test_config(etag_policy: EtagPolicy) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.etag_check.db = etag_policy;
    config.security.users = vec![UserConfig {
        userid: ADMIN.0.into(),
        password: ADMIN.1.into(),
        roles: vec!["admins".into()],
    }];
    config.security.permissions = vec![
        PermissionConfig {
            role: "admins".into(),
            path_prefix: "/".into(),
            methods: vec![],
        },
        PermissionConfig {
            role: UNAUTHENTICATED_ROLE.into(),
            path_prefix: "/public".into(),
            methods: vec!["GET".into()],
        },
    ];
    config
}

/// A running gateway; dropping it does not stop the server, call `stop`.
pub struct Gateway {
    pub addr: SocketAddr,
    pub database: InMemoryDatabase,
    shutdown: Shutdown,
}

impl Gateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    #[allow(dead_code)]
    pub fn stop(&self) {
        self.shutdown.trigger();
    }
}

/// Start a gateway on an ephemeral port.
pub async fn start_gateway(config: GatewayConfig) -> Gateway {
    let database = InMemoryDatabase::new();
    let server = HttpServer::new(config, Arc::new(database.clone()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    Gateway {
        addr,
        database,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
