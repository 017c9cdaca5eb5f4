//! Live-database tests for the job and version stores.
//!
//! These run against a migrated PostgreSQL instance addressed by
//! `DATABASE_URL` and are ignored by default:
//!
//! ```sh
//! DATABASE_URL=postgres://localhost/mdex_test cargo test -p mdex-db -- --ignored
//! ```

use uuid::Uuid;

use mdex_core::{
    AccessContext, CreateJobRequest, ExtractionContext, JobStatus, JobStore, MetadataBundle,
    SuccessOutcome, VersionSelector, VersionStore,
};
use mdex_db::Database;

async fn database() -> Database {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for live tests");
    let db = Database::connect(&url).await.expect("connect");
    db.migrate().await.expect("migrate");
    db
}

fn request(tenant_id: Uuid, digest: &str) -> CreateJobRequest {
    CreateJobRequest {
        document_id: None,
        context: ExtractionContext {
            digest: digest.to_string(),
            collection_name: "filings".to_string(),
            tenant_id,
        },
        metadata: None,
        locked_fields: None,
        profile: "default".to_string(),
        priority: 5,
        callback_url: None,
        idempotency_key: None,
    }
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn duplicate_submissions_resolve_to_one_job() {
    let db = database().await;
    let tenant = Uuid::new_v4();
    let access = AccessContext::new(tenant, Uuid::new_v4());
    let req = request(tenant, &format!("digest-{}", Uuid::new_v4()));

    let first = db.jobs.create(&access, &req).await.unwrap();
    let second = db.jobs.create(&access, &req).await.unwrap();

    assert_eq!(first.job_id, second.job_id);
    assert_eq!(second.status, JobStatus::Queued);
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn concurrent_duplicate_submissions_resolve_to_one_job() {
    let db = std::sync::Arc::new(database().await);
    let tenant = Uuid::new_v4();
    let access = AccessContext::new(tenant, Uuid::new_v4());
    let req = request(tenant, &format!("digest-{}", Uuid::new_v4()));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let db = db.clone();
        let access = access.clone();
        let req = req.clone();
        handles.push(tokio::spawn(async move {
            db.jobs.create(&access, &req).await.unwrap().job_id
        }));
    }

    let mut job_ids = Vec::new();
    for handle in handles {
        job_ids.push(handle.await.unwrap());
    }
    job_ids.sort();
    job_ids.dedup();
    assert_eq!(job_ids.len(), 1);
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn begin_attempt_is_single_winner() {
    let db = database().await;
    let tenant = Uuid::new_v4();
    let access = AccessContext::new(tenant, Uuid::new_v4());
    let job = db
        .jobs
        .create(&access, &request(tenant, &format!("digest-{}", Uuid::new_v4())))
        .await
        .unwrap();

    let first = db.jobs.begin_attempt(&access, job.job_id).await.unwrap();
    let second = db.jobs.begin_attempt(&access, job.job_id).await.unwrap();

    assert!(first.is_some());
    assert!(second.is_none());
    assert_eq!(first.unwrap().status, JobStatus::Running);
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn success_persists_version_and_cancel_is_idempotent() {
    let db = database().await;
    let tenant = Uuid::new_v4();
    let access = AccessContext::new(tenant, Uuid::new_v4());
    let job = db
        .jobs
        .create(&access, &request(tenant, &format!("digest-{}", Uuid::new_v4())))
        .await
        .unwrap();
    db.jobs.begin_attempt(&access, job.job_id).await.unwrap();

    let bundle = MetadataBundle {
        company_name: Some("ACME AG".to_string()),
        ..Default::default()
    };
    let fingerprint = bundle.fingerprint().unwrap();
    let outcome = db
        .jobs
        .finish_success(&access, job.job_id, &bundle, &fingerprint)
        .await
        .unwrap();
    let SuccessOutcome::Persisted(version) = outcome else {
        panic!("expected a persisted version");
    };
    assert_eq!(version.version, 1);

    let fetched = db
        .versions
        .fetch(&access, job.document_id, VersionSelector::Latest)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched.fingerprint, fingerprint);

    // Cancel after success leaves the terminal state untouched.
    let canceled = db.jobs.cancel(&access, job.job_id).await.unwrap().unwrap();
    assert_eq!(canceled.status, JobStatus::Succeeded);
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn manual_update_skips_identical_fingerprint() {
    let db = database().await;
    let tenant = Uuid::new_v4();
    let access = AccessContext::new(tenant, Uuid::new_v4());
    let document_id = Uuid::new_v4();
    let bundle = MetadataBundle {
        company_name: Some("ACME AG".to_string()),
        ..Default::default()
    };

    let first = db
        .versions
        .manual_update(&access, document_id, &bundle)
        .await
        .unwrap();
    let second = db
        .versions
        .manual_update(&access, document_id, &bundle)
        .await
        .unwrap();
    assert_eq!(first.version, 1);
    assert_eq!(second.version, 1);

    let changed = MetadataBundle {
        company_name: Some("ACME SE".to_string()),
        ..Default::default()
    };
    let third = db
        .versions
        .manual_update(&access, document_id, &changed)
        .await
        .unwrap();
    assert_eq!(third.version, 2);
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn concurrent_version_writes_stay_gapless() {
    let db = std::sync::Arc::new(database().await);
    let tenant = Uuid::new_v4();
    let access = AccessContext::new(tenant, Uuid::new_v4());
    let document_id = Uuid::new_v4();

    let mut handles = Vec::new();
    for i in 0..8 {
        let db = db.clone();
        let bundle = MetadataBundle {
            company_name: Some(format!("ACME AG {i}")),
            ..Default::default()
        };
        handles.push(tokio::spawn(async move {
            db.versions
                .record_version(&access, document_id, &bundle, None)
                .await
                .unwrap()
                .version
        }));
    }

    let mut versions = Vec::new();
    for handle in handles {
        versions.push(handle.await.unwrap());
    }
    versions.sort();
    assert_eq!(versions, (1..=8).collect::<Vec<i32>>());
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn tenants_cannot_see_each_other() {
    let db = database().await;
    let tenant_a = Uuid::new_v4();
    let tenant_b = Uuid::new_v4();
    let access_a = AccessContext::new(tenant_a, Uuid::new_v4());
    let access_b = AccessContext::new(tenant_b, Uuid::new_v4());

    let job = db
        .jobs
        .create(&access_a, &request(tenant_a, &format!("digest-{}", Uuid::new_v4())))
        .await
        .unwrap();

    assert!(db.jobs.get(&access_a, job.job_id).await.unwrap().is_some());
    assert!(db.jobs.get(&access_b, job.job_id).await.unwrap().is_none());
    assert!(db.jobs.cancel(&access_b, job.job_id).await.unwrap().is_none());
}
