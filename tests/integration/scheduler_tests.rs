//! Background scheduler lifecycle against a mock site

use crate::common::{
    controller, crawl_config, mount_site, wait_for_completed_crawl, wait_for_config,
};
use chrono::{Duration as ChronoDuration, Utc};
use news_archiver::crawler::run_iteration;
use news_archiver::storage::{lock_storage, ScheduleUpdate, Storage};
use news_archiver::{ArchiverError, Orchestrator, SchedulerState, ValidationError};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SITE: &[(&str, &str, &str)] = &[
    ("/inland/a-1.html", "Erste Meldung", "Inhalt eins"),
    ("/ausland/a-2.html", "Zweite Meldung", "Inhalt zwei"),
];

#[tokio::test]
async fn test_started_scheduler_crawls_when_due() {
    let server = MockServer::start().await;
    mount_site(&server, SITE).await;
    let dir = TempDir::new().unwrap();
    let mut controller = controller(&server, &dir, true);

    let started = Utc::now();
    controller.start();
    assert_eq!(controller.scheduler_state(), SchedulerState::Running);

    wait_for_completed_crawl(&controller).await;
    // Stopping waits for the iteration, including its reschedule
    controller.stop().await.unwrap();
    assert_eq!(controller.scheduler_state(), SchedulerState::Stopped);

    // Rescheduled with the default interval of two hours
    let config = crawl_config(&controller);
    let next_run = config.next_run.unwrap();
    assert!(next_run >= started + ChronoDuration::hours(2));
    assert!(next_run <= Utc::now() + ChronoDuration::hours(2));

    let storage = lock_storage(controller.storage()).unwrap();
    assert_eq!(storage.count_articles().unwrap(), 2);
}

#[tokio::test]
async fn test_disabled_scheduler_never_crawls() {
    let server = MockServer::start().await;
    mount_site(&server, SITE).await;
    let dir = TempDir::new().unwrap();
    let mut controller = controller(&server, &dir, false);

    controller.start();
    // Several polling quanta
    tokio::time::sleep(Duration::from_millis(2500)).await;
    controller.stop().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests.is_empty());
    assert_eq!(crawl_config(&controller).last_run, None);
}

#[tokio::test]
async fn test_enabling_while_running_starts_crawling() {
    let server = MockServer::start().await;
    mount_site(&server, SITE).await;
    let dir = TempDir::new().unwrap();
    let mut controller = controller(&server, &dir, false);

    controller.start();
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Enabling reschedules from now, so force the due time into the past
    controller.enable().unwrap();
    {
        let mut storage = lock_storage(controller.storage()).unwrap();
        storage
            .schedule_next_run(Utc::now() - ChronoDuration::hours(3))
            .unwrap();
    }

    wait_for_completed_crawl(&controller).await;
    controller.stop().await.unwrap();

    let storage = lock_storage(controller.storage()).unwrap();
    assert_eq!(storage.count_articles().unwrap(), 2);
}

#[tokio::test]
async fn test_reconfigure_takes_effect_on_next_due_check() {
    let server = MockServer::start().await;
    mount_site(&server, SITE).await;
    let dir = TempDir::new().unwrap();
    let mut controller = controller(&server, &dir, false);
    controller.start();

    let before = Utc::now();
    let config = controller
        .reconfigure(ScheduleUpdate {
            interval_hours: Some(3),
            enabled: Some(true),
        })
        .unwrap();
    let after = Utc::now();

    let next_run = config.next_run.unwrap();
    assert!(next_run >= before + ChronoDuration::hours(3));
    assert!(next_run <= after + ChronoDuration::hours(3));

    // The due check sees the new schedule and does not crawl
    let orchestrator =
        Orchestrator::from_config(controller.settings(), controller.storage().clone()).unwrap();
    assert!(run_iteration(&orchestrator).await.unwrap().is_none());

    controller.stop().await.unwrap();
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_intervals_leave_config_unchanged() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut controller = controller(&server, &dir, false);
    controller.start();

    let before = crawl_config(&controller);
    for hours in [0, -1] {
        let result = controller.reconfigure(ScheduleUpdate {
            interval_hours: Some(hours),
            enabled: Some(true),
        });
        assert!(matches!(
            result,
            Err(ArchiverError::Validation(ValidationError::IntervalTooSmall(_)))
        ));
    }
    assert_eq!(crawl_config(&controller), before);

    controller.stop().await.unwrap();
}

#[tokio::test]
async fn test_schedule_survives_restart() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    {
        let controller = controller(&server, &dir, true);
        controller.set_interval(5).unwrap();
        controller.disable().unwrap();
    }

    // Seeds from the file configuration apply only to a fresh database
    let controller = controller(&server, &dir, true);
    let config = crawl_config(&controller);
    assert_eq!(config.interval_hours, 5);
    assert!(!config.enabled);
}

#[tokio::test]
async fn test_loop_keeps_running_after_failed_iteration() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let mut controller = controller(&server, &dir, true);

    controller.start();
    // The failed crawl is still rescheduled
    let config = wait_for_config(&controller, |config| config.next_run.is_some()).await;
    assert_eq!(config.last_run, None);
    assert!(!server.received_requests().await.unwrap().is_empty());

    server.reset().await;
    mount_site(&server, SITE).await;
    {
        let mut storage = lock_storage(controller.storage()).unwrap();
        storage
            .schedule_next_run(Utc::now() - ChronoDuration::hours(3))
            .unwrap();
    }

    wait_for_completed_crawl(&controller).await;
    assert_eq!(controller.scheduler_state(), SchedulerState::Running);
    controller.stop().await.unwrap();

    let storage = lock_storage(controller.storage()).unwrap();
    assert_eq!(storage.count_articles().unwrap(), 2);
}

#[tokio::test]
async fn test_schedule_change_reaches_loop_of_other_controller() {
    let server = MockServer::start().await;
    mount_site(&server, SITE).await;
    let dir = TempDir::new().unwrap();

    // The loop owner and a second controller on the same database file
    let mut looping = controller(&server, &dir, true);
    looping.start();
    wait_for_config(&looping, |config| {
        config.last_run.is_some() && config.next_run.is_some()
    })
    .await;

    let other = controller(&server, &dir, true);
    assert_eq!(other.scheduler_state(), SchedulerState::Stopped);

    let before = Utc::now();
    let config = other.set_interval(1).unwrap();
    let after = Utc::now();

    let next_run = config.next_run.unwrap();
    assert!(next_run >= before + ChronoDuration::hours(1));
    assert!(next_run <= after + ChronoDuration::hours(1));

    // Once the loop is gone, changes no longer reschedule
    looping.stop().await.unwrap();
    let config = other.set_interval(5).unwrap();
    assert_eq!(config.interval_hours, 5);
    assert_eq!(config.next_run, Some(next_run));
}
