//! Database access glue for the `kanau` processor pattern.
//!
//! Every query in `entities` is a message processed against this
//! accessor, so call sites read as `processor.process(msg)`.

use sqlx::PgPool;

/// Pool-backed processor used by services and background jobs.
pub struct DatabaseProcessor {
    pub pool: PgPool,
}

impl DatabaseProcessor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}
