//! End-to-end wiring of the service against a mock record store

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use mockito::Matcher;
use serde_json::json;
use vigil_common::{Clock, ManualClock};
use vigil_server::config::{Cli, Configuration};
use vigil_server::service::VigilService;
use vigil_server::startup::GracefulShutdown;

fn configuration(store_url: &str) -> (Configuration, tempfile::NamedTempFile) {
    let mut file = tempfile::Builder::new()
        .suffix(".yml")
        .tempfile()
        .unwrap();
    write!(
        file,
        "store:\n  base_url: \"{}\"\nmonitor:\n  poll_interval_secs: 3600\ncache:\n  refresh_interval_secs: 3600\n",
        store_url
    )
    .unwrap();
    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        log_level: None,
    };
    (Configuration::load(&cli).unwrap(), file)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_service_advances_windows_and_serves_views() {
    let mut server = mockito::Server::new_async().await;
    let windows = server
        .mock("GET", "/maintenance")
        .with_status(200)
        .with_body(
            json!([{
                "id": "mw-1",
                "title": "Database upgrade",
                "start_time": "2024-06-01T00:00:00Z",
                "end_time": "2024-06-01T01:00:00Z",
                "status": "scheduled"
            }])
            .to_string(),
        )
        .expect_at_least(1)
        .create_async()
        .await;
    let started = server
        .mock("PATCH", "/maintenance/mw-1")
        .match_body(Matcher::Json(json!({ "status": "in_progress" })))
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;
    let _incidents = server
        .mock("GET", "/incidents")
        .with_status(200)
        .with_body(
            json!([{ "id": "inc-1", "title": "API latency", "created_at": "2024-05-31T08:00:00Z" }])
                .to_string(),
        )
        .create_async()
        .await;

    let (configuration, _file) = configuration(&server.url());
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 0, 30, 0).unwrap());
    let service = VigilService::start(&configuration, Arc::new(clock) as Arc<dyn Clock>).unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while !started.matched_async().await {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("window was never started");

    let view = service.maintenance_view().get_all(false).await.unwrap();
    assert_eq!(view.len(), 1);
    assert_eq!(view[0].id, "mw-1");

    let incidents = service.incidents().get_all(false).await.unwrap();
    assert_eq!(incidents[0].id, "inc-1");

    service
        .shutdown(&GracefulShutdown::new(Duration::from_secs(5)))
        .await;
    started.assert_async().await;
    windows.assert_async().await;
}
