//! Database migration system
//!
//! Tracks schema versions and applies migrations in order.

use rusqlite::Connection;
use tracing::{info, instrument};

use crate::error::Result;

/// A database migration
pub struct Migration {
    /// Version number (must be sequential starting from 1)
    pub version: u32,
    /// Description of what this migration does
    pub description: &'static str,
    /// SQL to run for this migration
    pub sql: &'static str,
}

/// All migrations in order
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema",
        sql: r#"
            -- Candidates on the ballot; visi/misi are JSON arrays
            CREATE TABLE IF NOT EXISTS candidates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                candidate_number TEXT NOT NULL UNIQUE,
                image_url TEXT NOT NULL DEFAULT '',
                ketua_name TEXT NOT NULL,
                wakil_name TEXT NOT NULL,
                visi TEXT NOT NULL DEFAULT '[]',
                misi TEXT NOT NULL DEFAULT '[]',
                votes INTEGER NOT NULL DEFAULT 0
            );

            -- Append-only audit trail
            CREATE TABLE IF NOT EXISTS audit_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                action TEXT NOT NULL,
                details TEXT NOT NULL,
                timestamp TEXT NOT NULL
            );
        "#,
    },
    Migration {
        version: 2,
        description: "Add indexes for query performance",
        sql: r#"
            CREATE INDEX IF NOT EXISTS idx_candidates_number ON candidates(candidate_number);
            CREATE INDEX IF NOT EXISTS idx_audit_logs_timestamp ON audit_logs(timestamp);
            CREATE INDEX IF NOT EXISTS idx_audit_logs_action ON audit_logs(action);
        "#,
    },
    Migration {
        version: 3,
        description: "Seed initial candidates",
        sql: r#"
            INSERT OR IGNORE INTO candidates
                (candidate_number, image_url, ketua_name, wakil_name, visi, misi, votes)
            VALUES
            (
                '01',
                '/images/candidate1.jpg',
                'Sarah Johnson',
                'Maria Garcia',
                '["Sustainable Development", "Social Equity", "Environmental Protection"]',
                '["Expand renewable energy initiatives", "Strengthen public healthcare system", "Improve education funding and accessibility", "Promote affordable housing programs", "Enhance public transportation infrastructure"]',
                0
            ),
            (
                '02',
                '/images/candidate2.jpg',
                'David Rodriguez',
                'Jennifer Kim',
                '["Economic Growth", "Environmental Protection", "Community Development"]',
                '["Support small business development", "Implement green building standards", "Create job training programs", "Establish community wellness centers", "Develop urban green spaces and parks"]',
                0
            ),
            (
                '03',
                '/images/candidate3.jpg',
                'Michael Chen',
                'Lisa Wang',
                '["Technology Innovation", "Digital Transformation", "Smart Governance"]',
                '["Modernize city infrastructure with smart technology", "Promote digital literacy and access", "Foster innovation hubs and startup ecosystems", "Implement data-driven governance solutions", "Enhance cybersecurity and digital privacy protection"]',
                0
            );

            INSERT INTO audit_logs (action, details, timestamp) VALUES
            (
                'SYSTEM_INIT',
                'Electronic voting system initialized with initial candidate data',
                strftime('%Y-%m-%dT%H:%M:%S+00:00', 'now')
            );
        "#,
    },
];

/// Initialize the migrations table
fn init_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version
fn get_current_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })
        .unwrap_or(None);
    Ok(version.unwrap_or(0))
}

/// Record that a migration was applied
fn record_migration(conn: &Connection, migration: &Migration) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            migration.version,
            migration.description,
            chrono::Utc::now().to_rfc3339()
        ],
    )?;
    Ok(())
}

/// Run all pending migrations
#[instrument(skip(conn))]
pub fn run_migrations(conn: &Connection) -> Result<()> {
    init_migrations_table(conn)?;

    let current_version = get_current_version(conn)?;
    info!(current_version, "Checking for pending migrations");

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                description = migration.description,
                "Applying migration"
            );

            conn.execute_batch(migration.sql)?;
            record_migration(conn, migration)?;

            info!(version = migration.version, "Migration complete");
        }
    }

    let new_version = get_current_version(conn)?;
    if new_version > current_version {
        info!(
            from = current_version,
            to = new_version,
            "Database schema updated"
        );
    }

    Ok(())
}
