use gbe_invoker::{
    Fault, FileStorage, Invocation, InvocationContext, Invoker, Job, JobQueue, JobRegistry,
    JobRequest, JobStatus, JsonReportParser, MemoryFileStorage, MemoryMonitor, MemoryQueue,
    MockJob, Monitor, ReportLoader, ServiceConfig, Stage,
};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct NotImplemented(&'static str);

fn context(params: &[(&str, &str)]) -> InvocationContext {
    InvocationContext::new(
        Arc::new(Invocation::for_request(JobRequest::new(
            "mock",
            "Test",
            params.iter().copied().collect(),
        ))),
        Arc::new(ServiceConfig::default()),
        None,
        None,
    )
}

#[tokio::test]
async fn binds_plain_string_field() {
    let mut job = MockJob::new();
    job.invoke(&context(&[("TestParameter", "frob")])).await;
    assert_eq!(job.test_parameter, "frob");
}

#[tokio::test]
async fn binds_through_field_converter() {
    let mut job = MockJob::new();
    job.invoke(&context(&[("ConvertValue", "frob")])).await;
    assert_eq!(
        job.convert_value.as_ref().map(|u| u.as_str()),
        Some("http://it.was.a.string/frob")
    );
}

#[tokio::test]
async fn normal_return_completes() {
    let result = MockJob::new().invoke(&context(&[])).await;
    assert_eq!(result.status(), JobStatus::Completed);
    assert!(result.fault().is_none());
}

#[tokio::test]
async fn raised_failure_is_captured_verbatim() {
    let result = MockJob::failing_with(NotImplemented("Broked!"))
        .invoke(&context(&[]))
        .await;
    assert_eq!(result.status(), JobStatus::Faulted);

    let fault = result.fault().unwrap();
    assert!(matches!(fault, Fault::Execution(_)));
    assert_eq!(fault.to_string(), "Broked!");
    assert_eq!(fault.downcast_ref::<NotImplemented>().map(|e| e.0), Some("Broked!"));
}

#[tokio::test]
async fn unknown_keys_are_ignored() {
    let mut job = MockJob::new();
    let result = job
        .invoke(&context(&[("NoSuchField", "x"), ("testparameter", "wrong case")]))
        .await;
    assert!(result.is_completed());
    assert_eq!(job.test_parameter, "");
    assert!(job.convert_value.is_none());
}

#[tokio::test]
async fn missing_keys_keep_defaults() {
    let mut job = MockJob::new();
    job.test_parameter = "preset".to_string();
    job.invoke(&context(&[("ConvertValue", "y")])).await;
    assert_eq!(job.test_parameter, "preset");
}

#[tokio::test]
async fn job_sees_the_supplied_invocation() {
    let ctx = context(&[("TestParameter", "frob")]);
    let mut job = MockJob::new();
    job.invoke(&ctx).await;

    let seen = job.invocation().unwrap();
    assert!(Arc::ptr_eq(seen, ctx.invocation()));
    assert_eq!(seen.id, ctx.id());
    assert_eq!(seen.request.parameters.get("TestParameter"), Some("frob"));
}

#[tokio::test]
async fn absent_report_is_not_an_error() {
    let storage: Arc<dyn FileStorage> = Arc::new(MemoryFileStorage::new());
    let loader = ReportLoader::new(storage, None, "NoSuchReport");
    let report = loader
        .load(&JsonReportParser::<serde_json::Value>::new())
        .await
        .unwrap();
    assert!(report.is_none());
}

#[tokio::test]
async fn invoker_dispatches_by_type_and_reports_to_monitor() {
    let mut registry = JobRegistry::builtin();
    registry.register::<MockJob>("mock");
    registry.register_with("broken", || {
        Box::new(MockJob::failing_with(NotImplemented("Broked!")))
    });
    let invoker = Invoker::new(Arc::new(registry));
    let monitor = Arc::new(MemoryMonitor::new());

    let ctx_for = |job_type: &str| {
        InvocationContext::new(
            Arc::new(Invocation::for_request(JobRequest::new(
                job_type,
                job_type,
                Default::default(),
            ))),
            Arc::new(ServiceConfig::default()),
            Some(monitor.clone() as Arc<dyn Monitor>),
            None,
        )
    };

    let ok = ctx_for("mock");
    assert!(invoker.invoke(&ok).await.is_completed());

    let bad = ctx_for("broken");
    assert!(invoker.invoke(&bad).await.is_faulted());

    let unknown = ctx_for("nope");
    let result = invoker.invoke(&unknown).await;
    assert!(matches!(result.fault(), Some(Fault::UnknownJobType(t)) if t == "nope"));

    let stages: Vec<Stage> = monitor
        .events_for(bad.id())
        .into_iter()
        .map(|e| e.stage)
        .collect();
    assert_eq!(stages.len(), 2);
    assert_eq!(stages[0], Stage::Started);
    assert!(matches!(&stages[1], Stage::Faulted { message, .. } if message == "Broked!"));
    assert_eq!(monitor.events_for(ok.id()).last().map(|e| e.stage.clone()), Some(Stage::Completed));
}

#[tokio::test]
async fn concurrent_invocations_are_independent() {
    let mut registry = JobRegistry::new();
    registry.register::<MockJob>("mock");
    let invoker = Invoker::new(Arc::new(registry));

    let contexts: Vec<InvocationContext> = (0..8)
        .map(|i| context(&[("TestParameter", i.to_string().as_str())]))
        .collect();
    let results = futures::future::join_all(contexts.iter().map(|ctx| invoker.invoke(ctx))).await;
    assert!(results.iter().all(|r| r.is_completed()));

    let mut ids: Vec<_> = contexts.iter().map(InvocationContext::id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);
}

#[tokio::test]
async fn shell_follow_up_runs_from_queue() {
    let queue = Arc::new(MemoryQueue::new());
    let invoker = Invoker::new(Arc::new(JobRegistry::builtin()));
    let config = Arc::new(ServiceConfig::default());

    let first = InvocationContext::new(
        Arc::new(Invocation::for_request(JobRequest::new(
            "enqueue",
            "chain",
            [
                ("NextJobType", "shell"),
                ("NextParameters", r#"{"Command":"exit 3"}"#),
            ]
            .into_iter()
            .collect(),
        ))),
        config.clone(),
        None,
        Some(queue.clone() as Arc<dyn JobQueue>),
    );
    assert!(invoker.invoke(&first).await.is_completed());

    let follow_up = queue.dequeue().unwrap();
    assert_ne!(follow_up.id, first.id());
    let second = InvocationContext::new(Arc::new(follow_up), config, None, None);
    let result = invoker.invoke(&second).await;
    assert!(result.is_faulted());
    assert!(result.fault().unwrap().to_string().contains("exited 3"));
}
