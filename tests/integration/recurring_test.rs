//! Integration tests for recurring schedules.

use std::sync::Arc;

use chrono::{Duration, Timelike, Utc};

use campaign_core::config::{AppConfig, SiteConfig};
use campaign_jobs::Job;
use campaign_jobs::recurrence::{is_local_midnight, next_local_midnight};
use campaign_queue::{NextRun, TaskQueue, TaskStatus};

use crate::helpers::{AbandonedCartJob, DigestJob, TestApp};

fn new_york() -> AppConfig {
    AppConfig {
        site: SiteConfig {
            timezone: "America/New_York".to_string(),
        },
        ..AppConfig::default()
    }
}

#[tokio::test]
async fn test_init_twice_keeps_one_schedule() {
    let app = TestApp::new(vec![Arc::new(DigestJob::hourly("weekly_digest")) as Arc<dyn Job>]).await;

    let report = app.service.init().await.expect("second init");
    assert_eq!(report.scheduled, 0);
    assert_eq!(report.already_scheduled, 1);
    assert_eq!(app.count("jobs/weekly_digest", TaskStatus::Pending).await, 1);
}

#[tokio::test]
async fn test_recurring_job_runs_and_reschedules() {
    let job = Arc::new(DigestJob::hourly("weekly_digest"));
    let app = TestApp::new(vec![job.clone() as Arc<dyn Job>]).await;

    assert_eq!(app.runner.run_once().await, 0);
    assert_eq!(
        app.runner
            .run_once_at(Utc::now() + Duration::minutes(61))
            .await,
        1
    );
    assert_eq!(job.runs(), 1);
    assert_eq!(app.count("jobs/weekly_digest", TaskStatus::Pending).await, 1);
    assert_eq!(app.count("jobs/weekly_digest", TaskStatus::Complete).await, 1);
}

#[tokio::test]
async fn test_recurring_batched_job_starts_a_run() {
    let job = Arc::new(AbandonedCartJob::new(vec![1, 2, 3], 2).every(Duration::hours(1)));
    let app = TestApp::new(vec![job.clone() as Arc<dyn Job>]).await;

    assert_eq!(
        app.count("jobs/abandoned_cart/start", TaskStatus::Pending).await,
        1
    );

    app.runner
        .run_once_at(Utc::now() + Duration::minutes(61))
        .await;
    app.drain().await;

    assert_eq!(job.completions(), vec![3]);
    assert_eq!(job.processed().len(), 3);
}

#[tokio::test]
async fn test_disabled_job_has_no_schedule() {
    let app =
        TestApp::new(vec![Arc::new(DigestJob::hourly("weekly_digest").disabled()) as Arc<dyn Job>])
            .await;

    let next = app
        .queue
        .next_scheduled("jobs/weekly_digest", None)
        .await
        .expect("lookup");
    assert_eq!(next, None);
}

#[tokio::test]
async fn test_deactivate_cancels_every_schedule() {
    let app = TestApp::with_config(
        vec![
            Arc::new(DigestJob::hourly("weekly_digest")) as Arc<dyn Job>,
            Arc::new(DigestJob::nightly("nightly_report")) as Arc<dyn Job>,
        ],
        new_york(),
    )
    .await;

    assert_eq!(app.queue.stats().await.pending, 3);
    app.service.deactivate().await.expect("deactivate");
    assert_eq!(app.queue.stats().await.pending, 0);
    assert_eq!(app.drain().await, 0);
}

#[tokio::test]
async fn test_nightly_job_lands_on_local_midnight() {
    let app = TestApp::with_config(
        vec![Arc::new(DigestJob::nightly("nightly_report")) as Arc<dyn Job>],
        new_york(),
    )
    .await;

    let Some(NextRun::At(at)) = app
        .queue
        .next_scheduled("jobs/nightly_report", None)
        .await
        .expect("lookup")
    else {
        panic!("nightly job is not scheduled");
    };

    let local = at.with_timezone(&chrono_tz::America::New_York);
    assert_eq!((local.hour(), local.minute(), local.second()), (0, 0, 0));
    assert!(at > Utc::now());
    assert!(at <= Utc::now() + Duration::hours(25));
}

#[tokio::test]
async fn test_drifted_nightly_schedule_is_repaired() {
    let app = TestApp::with_config(
        vec![Arc::new(DigestJob::nightly("nightly_report")) as Arc<dyn Job>],
        new_york(),
    )
    .await;

    // Simulate a schedule that drifted an hour past local midnight.
    let tz = chrono_tz::America::New_York;
    app.queue.cancel("jobs/nightly_report").await.expect("cancel");
    let drifted = next_local_midnight(Utc::now(), tz) + Duration::hours(1);
    app.queue
        .schedule_recurring("jobs/nightly_report", vec![], drifted, Duration::days(1))
        .await
        .expect("schedule");

    assert_eq!(
        app.service.verify_midnight_schedules().await.expect("verify"),
        1
    );

    let Some(NextRun::At(at)) = app
        .queue
        .next_scheduled("jobs/nightly_report", None)
        .await
        .expect("lookup")
    else {
        panic!("nightly job is not scheduled");
    };
    assert_ne!(at, drifted);
    assert!(is_local_midnight(at, tz));
    assert_eq!(
        app.count("jobs/nightly_report", TaskStatus::Pending).await,
        1
    );
}

#[tokio::test]
async fn test_job_disabled_at_runtime_stops_running() {
    let job = Arc::new(DigestJob::hourly("weekly_digest"));
    let app = TestApp::new(vec![job.clone() as Arc<dyn Job>]).await;

    app.runner
        .run_once_at(Utc::now() + Duration::minutes(61))
        .await;
    assert_eq!(job.runs(), 1);

    job.set_enabled(false);
    for hour in 2..=4 {
        app.runner
            .run_once_at(Utc::now() + Duration::minutes(61 * hour))
            .await;
    }

    assert_eq!(job.runs(), 1);
    assert_eq!(app.count("jobs/weekly_digest", TaskStatus::Pending).await, 0);
}

#[tokio::test]
async fn test_self_check_repairs_missing_schedule() {
    let app = TestApp::with_config(
        vec![Arc::new(DigestJob::nightly("nightly_report")) as Arc<dyn Job>],
        new_york(),
    )
    .await;

    assert_eq!(
        app.count("jobs/midnight_schedule_check", TaskStatus::Pending)
            .await,
        1
    );

    app.queue.cancel("jobs/nightly_report").await.expect("cancel");
    app.queue
        .schedule_immediate("jobs/midnight_schedule_check", vec![])
        .await
        .expect("schedule");
    app.drain().await;

    assert_eq!(
        app.count("jobs/midnight_schedule_check", TaskStatus::Complete)
            .await,
        1
    );
    assert_eq!(
        app.count("jobs/nightly_report", TaskStatus::Pending).await,
        1
    );
}
