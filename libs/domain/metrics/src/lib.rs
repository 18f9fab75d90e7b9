// [libs/domain/metrics/src/lib.rs]
/*!
 * =================================================================
 * APARATO: METRIC BUCKET MERGE ARITHMETIC (ESTRATO L2)
 * RESPONSABILIDAD: AGREGACION HORARIA SIN VENTANA DE CARRERA
 *
 * The upsert contract is a single round trip per group: `min <- LEAST`,
 * `max <- GREATEST`, `sum`/`count`/`anomalies` additive, `avg` derived.
 * This crate carries the shape and the pure merge function both the SQL
 * text (`libs/infra/db`) and any in-process recomputation share, so the
 * two never drift.
 * =================================================================
 */

pub mod bucket;
pub mod merge;

pub use bucket::{Granularity, MetricBucket};
pub use merge::{merge_bucket, IncomingGroup};
