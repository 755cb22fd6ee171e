//! Reference-number generation
//!
//! Every distribution, order and return carries a human-readable
//! reference of the form `<PREFIX>-<UTC timestamp digits>-<4 random
//! digits>`. The random suffix alone is not trusted for uniqueness: the
//! database enforces a unique constraint and callers retry generation a
//! bounded number of times on collision.

use chrono::Utc;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Default bound on regeneration attempts after a collision
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Generate a candidate reference number for the given prefix
///
/// The timestamp portion is `yymmddHHMMSS`; the suffix is four digits
/// derived from a fresh v4 UUID.
pub fn generate_reference(prefix: &str) -> String {
    let stamp = Utc::now().format("%y%m%d%H%M%S");
    let suffix = random_suffix();
    format!("{}-{}-{:04}", prefix, stamp, suffix)
}

fn random_suffix() -> u16 {
    let bytes = Uuid::new_v4().into_bytes();
    let raw = u16::from_be_bytes([bytes[0], bytes[1]]);
    raw % 10_000
}

/// Pick a reference number not yet present in `table`
///
/// Checks candidates inside the caller's transaction; the table's unique
/// constraint remains the final guard against a concurrent insert of the
/// same candidate (surfacing as `Conflict`, which the caller may retry).
/// `table` must be one of the ledger's own document tables.
pub(crate) async fn generate_unique_reference(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    prefix: &str,
    max_attempts: u32,
) -> AppResult<String> {
    let query = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE reference_number = $1)",
        table
    );

    for _ in 0..max_attempts.max(1) {
        let candidate = generate_reference(prefix);
        let taken: bool = sqlx::query_scalar(&query)
            .bind(&candidate)
            .fetch_one(&mut **tx)
            .await?;
        if !taken {
            return Ok(candidate);
        }
    }

    Err(AppError::Conflict(format!(
        "could not generate a unique {} reference after {} attempts",
        prefix, max_attempts
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::is_valid_reference_number;

    #[test]
    fn generated_references_are_well_formed() {
        for prefix in ["DIST", "WHSL", "RTL", "ORD", "RET", "EOD"] {
            let reference = generate_reference(prefix);
            assert!(
                is_valid_reference_number(&reference),
                "malformed reference: {}",
                reference
            );
            assert!(reference.starts_with(&format!("{}-", prefix)));
        }
    }

    #[test]
    fn suffix_stays_within_four_digits() {
        for _ in 0..1000 {
            assert!(random_suffix() < 10_000);
        }
    }

    #[test]
    fn consecutive_references_differ_with_high_probability() {
        let a: Vec<String> = (0..50).map(|_| generate_reference("ORD")).collect();
        let mut unique = a.clone();
        unique.sort();
        unique.dedup();
        // Same-second timestamps are expected; identical suffixes across
        // fifty draws are not.
        assert!(unique.len() > 1);
    }
}
