// tests/executor_semantics.rs

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use sitepipe::engine::{NodeState, Session};
use sitepipe::errors::SitepipeError;
use sitepipe::fs::mock::MockFileSystem;
use sitepipe::registry::{Step, TaskRegistry};
use sitepipe_test_utils::fakes::{delayed, failing, fake_services, recording, ActionLog};
use sitepipe_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn session(reg: TaskRegistry) -> Session {
    Session::new(
        reg,
        "/site",
        Arc::new(MockFileSystem::new()),
        fake_services().services,
    )
}

#[tokio::test]
async fn series_stops_at_first_failure() -> TestResult {
    with_timeout(async {
        init_tracing();
        let log = ActionLog::new();
        let mut reg = TaskRegistry::new();
        reg.register("T1", recording(&log, "T1"), vec![])?;
        reg.register("T2", failing(&log, "T2"), vec![])?;
        reg.register("T3", recording(&log, "T3"), vec![])?;
        reg.register_composite("chain", Step::series(["T1", "T2", "T3"]), vec![])?;

        let report = session(reg).invoke("chain").await?;

        assert_eq!(log.events(), vec!["T1", "T2"]);
        assert_eq!(report.state_of("T1"), Some(NodeState::Succeeded));
        assert_eq!(report.state_of("T2"), Some(NodeState::Failed));
        assert_eq!(report.state_of("T3"), Some(NodeState::Pending));
        assert!(!report.succeeded());

        match report.into_result() {
            Err(SitepipeError::ActionFailure { task, message }) => {
                assert_eq!(task, "T2");
                assert!(message.contains("T2 failed"));
            }
            other => panic!("expected action failure, got {other:?}"),
        }
        Ok::<(), Box<dyn Error>>(())
    })
    .await
}

#[tokio::test]
async fn parallel_failure_does_not_cancel_siblings() -> TestResult {
    with_timeout(async {
        init_tracing();
        let log = ActionLog::new();
        let mut reg = TaskRegistry::new();
        reg.register("T1", failing(&log, "T1"), vec![])?;
        reg.register("T2", delayed(&log, "T2", Duration::from_millis(50)), vec![])?;
        reg.register_composite("group", Step::parallel(["T1", "T2"]), vec![])?;

        let report = session(reg).invoke("group").await?;

        assert_eq!(log.events(), vec!["T1", "T2"]);
        assert_eq!(report.state_of("T1"), Some(NodeState::Failed));
        assert_eq!(report.state_of("T2"), Some(NodeState::Succeeded));
        assert_eq!(report.failed_tasks(), vec!["T1"]);
        Ok::<(), Box<dyn Error>>(())
    })
    .await
}

#[tokio::test]
async fn parallel_children_overlap() -> TestResult {
    with_timeout(async {
        init_tracing();
        let log = ActionLog::new();
        let mut reg = TaskRegistry::new();
        reg.register("slow", delayed(&log, "slow", Duration::from_millis(100)), vec![])?;
        reg.register("fast", delayed(&log, "fast", Duration::from_millis(10)), vec![])?;
        reg.register_composite("group", Step::parallel(["slow", "fast"]), vec![])?;

        let report = session(reg).invoke("group").await?;

        // Run concurrently, so the fast one finishes first.
        assert_eq!(log.events(), vec!["fast", "slow"]);
        assert!(report.elapsed < Duration::from_millis(100 + 10 + 80));
        Ok::<(), Box<dyn Error>>(())
    })
    .await
}

#[tokio::test]
async fn failed_group_halts_enclosing_series() -> TestResult {
    with_timeout(async {
        init_tracing();
        let log = ActionLog::new();
        let mut reg = TaskRegistry::new();
        reg.register("clean", recording(&log, "clean"), vec![])?;
        reg.register("html", failing(&log, "html"), vec![])?;
        reg.register("copy", recording(&log, "copy"), vec![])?;
        reg.register("serve", recording(&log, "serve"), vec![])?;
        reg.register_composite(
            "build",
            Step::Series(vec![
                Step::task("clean"),
                Step::parallel(["html", "copy"]),
                Step::task("serve"),
            ]),
            vec![],
        )?;

        let report = session(reg).invoke("build").await?;

        assert_eq!(log.count("copy"), 1, "sibling still completes");
        assert_eq!(log.count("serve"), 0);
        assert_eq!(report.state_of("serve"), Some(NodeState::Pending));
        Ok::<(), Box<dyn Error>>(())
    })
    .await
}

#[tokio::test]
async fn predecessors_complete_before_task() -> TestResult {
    with_timeout(async {
        init_tracing();
        let log = ActionLog::new();
        let mut reg = TaskRegistry::new();
        reg.register("a", delayed(&log, "a", Duration::from_millis(20)), vec![])?;
        reg.register("b", recording(&log, "b"), vec![])?;
        reg.register("c", recording(&log, "c"), vec!["a".into(), "b".into()])?;

        let report = session(reg).invoke("c").await?.into_result()?;

        assert_eq!(log.events(), vec!["a", "b", "c"]);
        assert_eq!(report.records.len(), 3);
        assert!(report.records.iter().all(|r| r.elapsed.is_some()));
        Ok::<(), Box<dyn Error>>(())
    })
    .await
}

#[tokio::test]
async fn failed_predecessor_skips_task() -> TestResult {
    with_timeout(async {
        init_tracing();
        let log = ActionLog::new();
        let mut reg = TaskRegistry::new();
        reg.register("a", failing(&log, "a"), vec![])?;
        reg.register("b", recording(&log, "b"), vec!["a".into()])?;

        let err = session(reg).run("b").await.unwrap_err();

        assert!(matches!(err, SitepipeError::ActionFailure { ref task, .. } if task == "a"));
        assert_eq!(log.events(), vec!["a"]);
        Ok::<(), Box<dyn Error>>(())
    })
    .await
}
