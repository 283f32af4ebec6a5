//! Integration tests for the job-queue claim protocol and run completion.
//!
//! Exercises the repository layer against a real database:
//! - Claim exclusivity under row locks (`FOR UPDATE SKIP LOCKED`)
//! - Queued-before-running claim ordering
//! - Terminal jobs never re-enter the claim set
//! - Run completion transitions exactly once

use sqlx::PgPool;
use lexiport_db::models::job::JobPayload;
use lexiport_db::models::run::{Counters, Run, RunParams};
use lexiport_db::models::status::{JobStatus, RunStatus};
use lexiport_db::repositories::{JobRepo, RunRepo};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn params(product_ids: Vec<i64>) -> RunParams {
    RunParams {
        profile_id: 1,
        prefix: "ps_".into(),
        id_shop: 1,
        id_shop_from: 1,
        lang_from_id: 1,
        lang_to_ids: vec![2],
        product_ids,
        prompt_id: "default".into(),
        fields: vec!["name".into()],
        include_features: false,
        include_attributes: false,
        include_attachments: false,
        include_images: false,
        one_lang_per_prompt: false,
        chunk_size: 25,
        progress: None,
    }
}

async fn seed_run(pool: &PgPool, product_ids: Vec<i64>) -> Run {
    let requested = product_ids.len() as i64;
    RunRepo::create(pool, requested, &params(product_ids))
        .await
        .unwrap()
}

async fn seed_job(pool: &PgPool, run: &Run) -> i64 {
    let payload: JobPayload = run
        .params()
        .unwrap()
        .job_payload(vec![10], vec![2]);
    JobRepo::submit(pool, run.id, None, &payload).await.unwrap().id
}

// ---------------------------------------------------------------------------
// Test: claim exclusivity
// ---------------------------------------------------------------------------

/// A row locked by one claimant is skipped, not blocked on: a second claim
/// running while the first holds the lock comes back empty instead of
/// waiting, and succeeds once the lock is released.
#[sqlx::test(migrations = "./migrations")]
async fn locked_row_is_skipped_not_blocked(pool: PgPool) {
    let run = seed_run(&pool, vec![10]).await;
    let job_id = seed_job(&pool, &run).await;

    // Hold the claim lock in an open transaction, as a concurrent claimant
    // mid-statement would.
    let mut tx = pool.begin().await.unwrap();
    let locked: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM jobs WHERE status_id IN ($1, $2) \
         ORDER BY status_id ASC, created_at ASC LIMIT 1 FOR UPDATE SKIP LOCKED",
    )
    .bind(JobStatus::Queued.id())
    .bind(JobStatus::Running.id())
    .fetch_optional(&mut *tx)
    .await
    .unwrap();
    assert_eq!(locked, Some(job_id));

    let claimed = JobRepo::claim_next(&pool).await.unwrap();
    assert!(claimed.is_none(), "locked row must be skipped, not claimed");

    tx.rollback().await.unwrap();

    let claimed = JobRepo::claim_next(&pool).await.unwrap();
    assert_eq!(claimed.map(|j| j.id), Some(job_id));
}

/// Two simultaneous claimants over two queued jobs never pick the same row.
#[sqlx::test(migrations = "./migrations")]
async fn concurrent_claims_pick_distinct_jobs(pool: PgPool) {
    let run = seed_run(&pool, vec![10, 11]).await;
    seed_job(&pool, &run).await;
    seed_job(&pool, &run).await;

    let (a, b) = tokio::join!(JobRepo::claim_next(&pool), JobRepo::claim_next(&pool));
    let a = a.unwrap().expect("first claimant should win a job");
    let b = b.unwrap().expect("second claimant should win a job");
    assert_ne!(a.id, b.id);
}

// ---------------------------------------------------------------------------
// Test: claim ordering and claim-set membership
// ---------------------------------------------------------------------------

/// A queued job is claimed before a running one, even when the running job
/// is older.
#[sqlx::test(migrations = "./migrations")]
async fn queued_jobs_win_over_running_ones(pool: PgPool) {
    let run = seed_run(&pool, vec![10, 11]).await;
    let first = seed_job(&pool, &run).await;

    // Flip the first job to running, then enqueue a second.
    let claimed = JobRepo::claim_next(&pool).await.unwrap().unwrap();
    assert_eq!(claimed.id, first);
    let second = seed_job(&pool, &run).await;

    let claimed = JobRepo::claim_next(&pool).await.unwrap().unwrap();
    assert_eq!(claimed.id, second);
}

/// A running job is re-claimed on a later tick to process its next chunk,
/// and `started_at` is stamped only by the first claim.
#[sqlx::test(migrations = "./migrations")]
async fn running_job_is_reclaimed_with_original_start(pool: PgPool) {
    let run = seed_run(&pool, vec![10]).await;
    let job_id = seed_job(&pool, &run).await;

    let first = JobRepo::claim_next(&pool).await.unwrap().unwrap();
    assert_eq!(first.id, job_id);
    assert_eq!(first.status_id, JobStatus::Running.id());
    let started_at = first.started_at.unwrap();

    let second = JobRepo::claim_next(&pool).await.unwrap().unwrap();
    assert_eq!(second.id, job_id);
    assert_eq!(second.started_at, Some(started_at));
}

/// Done and failed jobs never re-enter the claim set.
#[sqlx::test(migrations = "./migrations")]
async fn terminal_jobs_are_not_claimed(pool: PgPool) {
    let run = seed_run(&pool, vec![10, 11]).await;
    let done = seed_job(&pool, &run).await;
    let failed = seed_job(&pool, &run).await;

    JobRepo::mark_done(&pool, done).await.unwrap();
    assert!(JobRepo::fail(&pool, failed, "boom").await.unwrap());

    let claimed = JobRepo::claim_next(&pool).await.unwrap();
    assert!(claimed.is_none());
}

/// `fail` is a no-op on terminal jobs: cancelling a finished job reports
/// `false` instead of clobbering its status.
#[sqlx::test(migrations = "./migrations")]
async fn fail_does_not_clobber_terminal_jobs(pool: PgPool) {
    let run = seed_run(&pool, vec![10]).await;
    let job_id = seed_job(&pool, &run).await;

    JobRepo::mark_done(&pool, job_id).await.unwrap();
    assert!(!JobRepo::fail(&pool, job_id, "late cancel").await.unwrap());

    let job = JobRepo::find_by_id(&pool, job_id).await.unwrap().unwrap();
    assert_eq!(job.status_id, JobStatus::Done.id());
    assert!(job.last_error.is_none());
}

// ---------------------------------------------------------------------------
// Test: idempotent run completion
// ---------------------------------------------------------------------------

/// `mark_done` transitions a run exactly once; the repeated finalize tick
/// reports `false` and leaves the row untouched.
#[sqlx::test(migrations = "./migrations")]
async fn run_completion_is_idempotent(pool: PgPool) {
    let run = seed_run(&pool, vec![10]).await;

    assert!(RunRepo::mark_done(&pool, run.id).await.unwrap());
    let finished = RunRepo::find_by_id(&pool, run.id).await.unwrap().unwrap();
    assert_eq!(finished.status_id, RunStatus::Done.id());
    let finished_at = finished.finished_at.unwrap();

    assert!(!RunRepo::mark_done(&pool, run.id).await.unwrap());
    let again = RunRepo::find_by_id(&pool, run.id).await.unwrap().unwrap();
    assert_eq!(again.finished_at, Some(finished_at));
}

/// A completed run cannot be flipped to failed afterwards.
#[sqlx::test(migrations = "./migrations")]
async fn completed_run_cannot_fail(pool: PgPool) {
    let run = seed_run(&pool, vec![10]).await;

    assert!(RunRepo::mark_done(&pool, run.id).await.unwrap());
    assert!(!RunRepo::mark_failed(&pool, run.id).await.unwrap());

    let row = RunRepo::find_by_id(&pool, run.id).await.unwrap().unwrap();
    assert_eq!(row.status_id, RunStatus::Done.id());
}

/// Totals accumulate across chunks and never reset.
#[sqlx::test(migrations = "./migrations")]
async fn totals_accumulate_across_chunks(pool: PgPool) {
    let run = seed_run(&pool, vec![10, 11]).await;

    let delta = Counters {
        done: 2,
        updated: 1,
        skipped: 0,
        errors: 0,
    };
    RunRepo::bump_totals(&pool, run.id, &delta).await.unwrap();
    let after = RunRepo::bump_totals(
        &pool,
        run.id,
        &Counters {
            done: 1,
            updated: 0,
            skipped: 1,
            errors: 1,
        },
    )
    .await
    .unwrap();

    assert_eq!(after.done, 3);
    assert_eq!(after.updated, 1);
    assert_eq!(after.skipped, 1);
    assert_eq!(after.errors, 1);
}
