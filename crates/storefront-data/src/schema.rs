//! # Backend Schema
//!
//! The hosted backend is provisioned from `migrations/postgres/`. The SQL is
//! embedded here so provisioning tools can apply it without the source tree.
//!
//! ## Adding New Migrations
//!
//! 1. Create a new file in `migrations/postgres/` with the next sequence number
//! 2. Name format: `NNNN_description.sql`
//! 3. Write idempotent SQL (`IF NOT EXISTS`, `CREATE OR REPLACE`)
//! 4. Append it to [`MIGRATIONS`]

/// Every migration, in the order it must be applied.
pub const MIGRATIONS: &[(&str, &str)] = &[(
    "0001_storefront",
    include_str!("../../../migrations/postgres/0001_storefront.sql"),
)];
