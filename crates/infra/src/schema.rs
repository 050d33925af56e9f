//! Ordered schema migrations.
//!
//! Each entry is applied once, inside its own transaction, and recorded in
//! `schema_migrations`. Never edit a shipped migration; append a new one.

pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub sql: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "users_and_matters",
        sql: r#"
            CREATE TABLE users (
                id TEXT PRIMARY KEY NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                first_name TEXT,
                last_name TEXT,
                phone TEXT,
                role TEXT NOT NULL CHECK (role IN ('CLIENT', 'LAWYER', 'ADMIN')),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE matters (
                id TEXT PRIMARY KEY NOT NULL,
                client_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                lead_lawyer_id TEXT REFERENCES users(id) ON DELETE SET NULL,
                title TEXT NOT NULL,
                matter_number TEXT UNIQUE,
                description TEXT,
                status TEXT NOT NULL DEFAULT 'OPEN'
                    CHECK (status IN ('OPEN', 'PENDING', 'CLOSED')),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX idx_matters_client ON matters(client_id);
        "#,
    },
    Migration {
        version: 2,
        name: "documents_and_snapshots",
        sql: r#"
            CREATE TABLE documents (
                id TEXT PRIMARY KEY NOT NULL,
                matter_id TEXT NOT NULL REFERENCES matters(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                description TEXT,
                content TEXT,
                status TEXT NOT NULL DEFAULT 'DRAFT'
                    CHECK (status IN ('DRAFT', 'IN_REVIEW', 'READY_FOR_SIGNATURE', 'SIGNED', 'COMPLETED')),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX idx_documents_matter ON documents(matter_id);

            CREATE TABLE snapshot_versions (
                id TEXT PRIMARY KEY NOT NULL,
                document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
                version INTEGER NOT NULL,
                content TEXT NOT NULL,
                note TEXT,
                status TEXT NOT NULL DEFAULT 'ACTIVE' CHECK (status IN ('ACTIVE', 'DELETED')),
                created_by TEXT REFERENCES users(id) ON DELETE SET NULL,
                created_at TEXT NOT NULL,
                UNIQUE (document_id, version)
            );
        "#,
    },
    Migration {
        version: 3,
        name: "journeys",
        sql: r#"
            CREATE TABLE service_categories (
                id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                display_order INTEGER NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE journeys (
                id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                service_category_id TEXT REFERENCES service_categories(id) ON DELETE SET NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE journey_steps (
                id TEXT PRIMARY KEY NOT NULL,
                journey_id TEXT NOT NULL REFERENCES journeys(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                description TEXT,
                step_order INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX idx_journey_steps_journey ON journey_steps(journey_id, step_order);
        "#,
    },
    Migration {
        version: 4,
        name: "integrations",
        sql: r#"
            CREATE TABLE oauth_providers (
                id TEXT PRIMARY KEY NOT NULL,
                provider_id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                client_id TEXT NOT NULL,
                client_secret TEXT NOT NULL,
                scopes TEXT NOT NULL DEFAULT '[]',
                is_enabled INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE google_drive_config (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                is_enabled INTEGER NOT NULL DEFAULT 0,
                service_account_email TEXT,
                service_account_key TEXT,
                root_folder_id TEXT,
                shared_drive_id TEXT,
                updated_at TEXT NOT NULL
            );
        "#,
    },
    Migration {
        version: 5,
        name: "payments",
        sql: r#"
            CREATE TABLE payments (
                id TEXT PRIMARY KEY NOT NULL,
                matter_id TEXT NOT NULL REFERENCES matters(id) ON DELETE CASCADE,
                amount_cents INTEGER NOT NULL CHECK (amount_cents > 0),
                currency TEXT NOT NULL DEFAULT 'USD',
                description TEXT,
                status TEXT NOT NULL DEFAULT 'PENDING'
                    CHECK (status IN ('PENDING', 'PAID', 'FAILED', 'REFUNDED')),
                lawpay_charge_id TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX idx_payments_matter ON payments(matter_id);

            CREATE TABLE lawpay_connection (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                access_token TEXT NOT NULL,
                refresh_token TEXT,
                token_type TEXT NOT NULL,
                scope TEXT,
                merchant_id TEXT,
                connected_by TEXT NOT NULL,
                connected_at TEXT NOT NULL
            );
        "#,
    },
    Migration {
        version: 6,
        name: "bridge_and_kv",
        sql: r#"
            CREATE TABLE bridge_conversations (
                id TEXT PRIMARY KEY NOT NULL,
                client_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                lawyer_id TEXT REFERENCES users(id) ON DELETE SET NULL,
                matter_id TEXT REFERENCES matters(id) ON DELETE SET NULL,
                subject TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'OPEN' CHECK (status IN ('OPEN', 'ARCHIVED')),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX idx_bridge_client ON bridge_conversations(client_id);

            CREATE TABLE kv_entries (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                expires_at INTEGER
            );
        "#,
    },
    Migration {
        version: 7,
        name: "payment_processing_status",
        sql: r#"
            CREATE TABLE payments_v7 (
                id TEXT PRIMARY KEY NOT NULL,
                matter_id TEXT NOT NULL REFERENCES matters(id) ON DELETE CASCADE,
                amount_cents INTEGER NOT NULL CHECK (amount_cents > 0),
                currency TEXT NOT NULL DEFAULT 'USD',
                description TEXT,
                status TEXT NOT NULL DEFAULT 'PENDING'
                    CHECK (status IN ('PENDING', 'PROCESSING', 'PAID', 'FAILED', 'REFUNDED')),
                lawpay_charge_id TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            INSERT INTO payments_v7 SELECT id, matter_id, amount_cents, currency, description,
                status, lawpay_charge_id, created_at, updated_at FROM payments;
            DROP TABLE payments;
            ALTER TABLE payments_v7 RENAME TO payments;
            CREATE INDEX idx_payments_matter ON payments(matter_id);
        "#,
    },
];
