
use jobq::error::Error;
use jobq::job::{JobStatus, NewJob};
use jobq::store::{LimitBy, OrderBy, SortField};
use test_harness::{datetime, test_queue};

/// Seed the classic selection fixture: three active and three inactive jobs
/// across three start times and priorities 0, -1, 1. Returns the ids in
/// insertion order.
async fn seed_selection_fixture(queue: &jobq::JobQueue) -> Vec<i64> {
    let rows = [
        ("2010-01-01 10:00:00", 0, JobStatus::Active),
        ("2010-01-01 10:00:00", 0, JobStatus::Inactive),
        ("2010-01-01 10:00:01", -1, JobStatus::Active),
        ("2010-01-01 10:00:01", -1, JobStatus::Inactive),
        ("2010-01-01 10:00:02", 1, JobStatus::Active),
        ("2010-01-01 10:00:02", 1, JobStatus::Inactive),
    ];

    let mut ids = Vec::new();
    for (start, priority, status) in rows {
        let job = queue
            .store()
            .insert(
                &NewJob::new("pwd")
                    .with_start(datetime(start))
                    .with_priority(priority)
                    .with_status(status),
            )
            .await
            .unwrap();
        ids.push(job.id);
    }
    ids
}

#[tokio::test]
async fn test_jobs_returns_only_active() {
    let (queue, _dir) = test_queue().await;
    let ids = seed_selection_fixture(&queue).await;

    let jobs = queue.jobs(None, None, None).await.unwrap();
    assert_eq!(jobs.len(), 3);
    assert_eq!(
        jobs.iter().map(|j| j.id).collect::<Vec<_>>(),
        vec![ids[0], ids[2], ids[4]]
    );
}

#[tokio::test]
async fn test_jobs_maximum_start_boundary_is_inclusive() {
    let (queue, _dir) = test_queue().await;
    let ids = seed_selection_fixture(&queue).await;

    let jobs = queue
        .jobs(Some(datetime("2010-01-01 10:00:01")), None, None)
        .await
        .unwrap();
    assert_eq!(
        jobs.iter().map(|j| j.id).collect::<Vec<_>>(),
        vec![ids[0], ids[2]]
    );
}

#[tokio::test]
async fn test_jobs_orderby_priority() {
    let (queue, _dir) = test_queue().await;
    let ids = seed_selection_fixture(&queue).await;

    // Ascending
    let jobs = queue
        .jobs(None, Some(OrderBy::asc(SortField::Priority)), None)
        .await
        .unwrap();
    assert_eq!(
        jobs.iter().map(|j| j.id).collect::<Vec<_>>(),
        vec![ids[2], ids[0], ids[4]]
    );

    // Descending is an explicit request, never inferred
    let jobs = queue
        .jobs(None, Some(OrderBy::desc(SortField::Priority)), None)
        .await
        .unwrap();
    assert_eq!(
        jobs.iter().map(|j| j.id).collect::<Vec<_>>(),
        vec![ids[4], ids[0], ids[2]]
    );
}

#[tokio::test]
async fn test_jobs_limitby() {
    let (queue, _dir) = test_queue().await;
    let ids = seed_selection_fixture(&queue).await;

    let jobs = queue
        .jobs(
            None,
            Some(OrderBy::desc(SortField::Priority)),
            Some(LimitBy::First(1)),
        )
        .await
        .unwrap();
    assert_eq!(jobs.iter().map(|j| j.id).collect::<Vec<_>>(), vec![ids[4]]);

    let jobs = queue
        .jobs(
            None,
            None,
            Some(LimitBy::Portion {
                offset: 1,
                limit: 2,
            }),
        )
        .await
        .unwrap();
    assert_eq!(
        jobs.iter().map(|j| j.id).collect::<Vec<_>>(),
        vec![ids[2], ids[4]]
    );
}

#[tokio::test]
async fn test_top_job_empty_queue() {
    let (queue, _dir) = test_queue().await;

    match queue.top_job().await {
        Err(Error::QueueEmpty) => {}
        other => panic!("expected QueueEmpty, got {:?}", other),
    }
}

#[tokio::test]
async fn test_top_job_picks_highest_priority_due_job() {
    let (queue, _dir) = test_queue().await;
    let store = queue.store();

    for (start, priority) in [
        ("2010-01-01 10:00:00", 0),
        ("2010-01-01 10:00:01", -1),
        ("2010-01-01 10:00:02", 1),
    ] {
        store
            .insert(
                &NewJob::new("pwd")
                    .with_start(datetime(start))
                    .with_priority(priority),
            )
            .await
            .unwrap();
    }
    // Highest priority of all, but not due until the distant future.
    store
        .insert(
            &NewJob::new("pwd")
                .with_start(datetime("2999-12-31 23:59:59"))
                .with_priority(9),
        )
        .await
        .unwrap();

    let top = queue.top_job().await.unwrap();
    assert_eq!(top.priority, 1);
}

#[tokio::test]
async fn test_top_job_equal_priority_resolves_to_oldest_id() {
    let (queue, _dir) = test_queue().await;
    let store = queue.store();

    let first = store
        .insert(
            &NewJob::new("pwd")
                .with_start(datetime("2010-01-01 10:00:00"))
                .with_priority(5),
        )
        .await
        .unwrap();
    store
        .insert(
            &NewJob::new("pwd")
                .with_start(datetime("2010-01-01 10:00:00"))
                .with_priority(5),
        )
        .await
        .unwrap();

    let top = queue.top_job().await.unwrap();
    assert_eq!(top.id, first.id);
}

#[tokio::test]
async fn test_store_insert_find_update_delete() {
    let (queue, _dir) = test_queue().await;
    let store = queue.store();

    let job = store
        .insert(&NewJob::new("report.py --all").with_priority(2))
        .await
        .unwrap();
    assert!(job.id > 0);
    assert_eq!(job.status, JobStatus::Active);
    assert_eq!(job.created_on, job.updated_on);

    let found = store.find(job.id).await.unwrap().unwrap();
    assert_eq!(found.command, "report.py --all");
    assert_eq!(found.priority, 2);

    store
        .update_status(job.id, JobStatus::Running)
        .await
        .unwrap();
    let running = store.find(job.id).await.unwrap().unwrap();
    assert_eq!(running.status, JobStatus::Running);
    assert!(running.updated_on >= running.created_on);

    store.delete(job.id).await.unwrap();
    assert!(store.find(job.id).await.unwrap().is_none());
}
