//! Tenant-scoped database sessions.
//!
//! Every tenant-facing operation runs inside a transaction whose Postgres
//! session carries `app.tenant_id` and `app.user_id`. The settings are
//! applied with `set_config(..., true)` so they are local to the
//! transaction and vanish on commit or rollback, regardless of exit path.
//! Row-level security policies key on `app.tenant_id`.

use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use mdex_core::{AccessContext, Error, Result};

/// Begin a transaction with the caller's identity bound to the session.
pub(crate) async fn begin_scoped<'p>(
    pool: &'p PgPool,
    access: &AccessContext,
) -> Result<Transaction<'p, Postgres>> {
    let mut tx = pool.begin().await.map_err(Error::Database)?;

    sqlx::query(
        "SELECT set_config('app.tenant_id', $1, true), set_config('app.user_id', $2, true)",
    )
    .bind(access.tenant_id.to_string())
    .bind(access.user_id.to_string())
    .execute(&mut *tx)
    .await
    .map_err(Error::Database)?;

    debug!(
        subsystem = "database",
        component = "tenant",
        op = "bind",
        tenant_id = %access.tenant_id,
        "Bound tenant scope to session"
    );

    Ok(tx)
}
