//! Database migrations
//!
//! Schema migrations for edubot. Migrations are versioned and applied
//! automatically when a database is opened.

use sqlx::SqlitePool;

/// Current schema version
pub const CURRENT_VERSION: i32 = 2;

const CREATE_MIGRATIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS _migrations (
        version INTEGER PRIMARY KEY NOT NULL,
        applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
"#;

/// Migration 1: taxonomy, knowledge base, curriculum and conversation log
const MIGRATION_V1: &str = r#"
    CREATE TABLE IF NOT EXISTS grades (
        id TEXT PRIMARY KEY NOT NULL,
        name TEXT NOT NULL UNIQUE,
        description TEXT,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );

    CREATE TABLE IF NOT EXISTS semesters (
        id TEXT PRIMARY KEY NOT NULL,
        name TEXT NOT NULL UNIQUE,
        description TEXT,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );

    CREATE TABLE IF NOT EXISTS departments (
        id TEXT PRIMARY KEY NOT NULL,
        name TEXT NOT NULL UNIQUE,
        description TEXT,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );

    CREATE TABLE IF NOT EXISTS department_grades (
        department_id TEXT NOT NULL REFERENCES departments(id) ON DELETE CASCADE,
        grade_id TEXT NOT NULL REFERENCES grades(id) ON DELETE CASCADE,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (department_id, grade_id)
    );

    CREATE INDEX IF NOT EXISTS idx_department_grades_grade ON department_grades(grade_id);

    CREATE TABLE IF NOT EXISTS knowledge_entries (
        id TEXT PRIMARY KEY NOT NULL,
        question TEXT NOT NULL,
        answer TEXT NOT NULL,
        keywords TEXT NOT NULL DEFAULT '',
        grade_id TEXT REFERENCES grades(id) ON DELETE SET NULL,
        semester_id TEXT REFERENCES semesters(id) ON DELETE SET NULL,
        department_id TEXT REFERENCES departments(id) ON DELETE SET NULL,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );

    CREATE INDEX IF NOT EXISTS idx_knowledge_scope
        ON knowledge_entries(grade_id, semester_id, department_id);

    CREATE TABLE IF NOT EXISTS curriculum_documents (
        id TEXT PRIMARY KEY NOT NULL,
        original_filename TEXT NOT NULL,
        stored_path TEXT NOT NULL,
        file_kind TEXT NOT NULL,
        file_size INTEGER NOT NULL DEFAULT 0,
        content TEXT NOT NULL DEFAULT '',
        grade_id TEXT NOT NULL REFERENCES grades(id),
        semester_id TEXT NOT NULL REFERENCES semesters(id),
        status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'deleted')),
        uploaded_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );

    CREATE INDEX IF NOT EXISTS idx_curriculum_scope
        ON curriculum_documents(grade_id, semester_id, status);

    CREATE TABLE IF NOT EXISTS curriculum_document_departments (
        document_id TEXT NOT NULL REFERENCES curriculum_documents(id) ON DELETE CASCADE,
        department_id TEXT NOT NULL REFERENCES departments(id) ON DELETE CASCADE,
        PRIMARY KEY (document_id, department_id)
    );

    CREATE TABLE IF NOT EXISTS conversations (
        id TEXT PRIMARY KEY NOT NULL,
        username TEXT NOT NULL,
        question TEXT NOT NULL,
        answer TEXT NOT NULL,
        grade_id TEXT REFERENCES grades(id) ON DELETE SET NULL,
        semester_id TEXT REFERENCES semesters(id) ON DELETE SET NULL,
        department_id TEXT REFERENCES departments(id) ON DELETE SET NULL,
        provenance TEXT NOT NULL,
        session_id TEXT,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );

    CREATE INDEX IF NOT EXISTS idx_conversations_created ON conversations(created_at);
    CREATE INDEX IF NOT EXISTS idx_conversations_provenance ON conversations(provenance);
"#;

/// Migration 2: default grades and semesters
const MIGRATION_V2: &str = r#"
    INSERT OR IGNORE INTO grades (id, name, description) VALUES
        (lower(hex(randomblob(16))), 'الصف الأول الثانوي', 'Grade 10'),
        (lower(hex(randomblob(16))), 'الصف الثاني الثانوي', 'Grade 11'),
        (lower(hex(randomblob(16))), 'الصف الثالث الثانوي', 'Grade 12');

    INSERT OR IGNORE INTO semesters (id, name, description) VALUES
        (lower(hex(randomblob(16))), 'الفصل الدراسي الأول', 'First semester'),
        (lower(hex(randomblob(16))), 'الفصل الدراسي الثاني', 'Second semester');
"#;

async fn get_current_version(pool: &SqlitePool) -> anyhow::Result<i32> {
    sqlx::raw_sql(CREATE_MIGRATIONS_TABLE).execute(pool).await?;

    let row: Option<(Option<i32>,)> = sqlx::query_as("SELECT MAX(version) FROM _migrations")
        .fetch_optional(pool)
        .await?;

    Ok(row.and_then(|(v,)| v).unwrap_or(0))
}

async fn record_migration(pool: &SqlitePool, version: i32) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO _migrations (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    let current_version = get_current_version(pool).await?;

    tracing::info!(
        current_version = current_version,
        target_version = CURRENT_VERSION,
        "Checking database migrations"
    );

    if current_version >= CURRENT_VERSION {
        tracing::debug!("Database is up to date");
        return Ok(());
    }

    if current_version < 1 {
        tracing::info!("Applying migration v1: Initial schema");
        sqlx::raw_sql(MIGRATION_V1).execute(pool).await?;
        record_migration(pool, 1).await?;
    }

    if current_version < 2 {
        tracing::info!("Applying migration v2: Default grades and semesters");
        sqlx::raw_sql(MIGRATION_V2).execute(pool).await?;
        record_migration(pool, 2).await?;
    }

    tracing::info!("Database migrations completed");
    Ok(())
}

/// Get migration status information
pub async fn migration_status(pool: &SqlitePool) -> anyhow::Result<MigrationStatus> {
    let current_version = get_current_version(pool).await?;
    Ok(MigrationStatus {
        current_version,
        target_version: CURRENT_VERSION,
        needs_migration: current_version < CURRENT_VERSION,
    })
}

/// Migration status information
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    pub current_version: i32,
    pub target_version: i32,
    pub needs_migration: bool,
}
