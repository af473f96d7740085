use lingkod_common::{
    CITIZEN_NOTIFICATIONS_TABLE, STATUS_HISTORY_TABLE, SUBMISSIONS_TABLE, USERS_TABLE,
};

/// DDL for the workflow schema, idempotent so the migration can be re-run.
pub fn ddl_statements(schema: &str) -> Vec<String> {
    vec![
        format!("CREATE SCHEMA IF NOT EXISTS \"{schema}\""),
        format!(
            "CREATE TABLE IF NOT EXISTS \"{schema}\".{SUBMISSIONS_TABLE} (
                id UUID PRIMARY KEY,
                reference_number TEXT NOT NULL UNIQUE,
                citizen_id UUID NOT NULL,
                submission_type TEXT NOT NULL,
                form_id UUID,
                data JSONB,
                attached_files JSONB NOT NULL DEFAULT '[]'::jsonb,
                bulk_file JSONB,
                status TEXT NOT NULL DEFAULT 'pending',
                comments TEXT,
                signature JSONB,
                history JSONB NOT NULL DEFAULT '[]'::jsonb,
                was_resubmitted_after_rejection BOOLEAN NOT NULL DEFAULT FALSE,
                version BIGINT NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS submissions_citizen_idx \
             ON \"{schema}\".{SUBMISSIONS_TABLE} (citizen_id)"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS submissions_form_idx \
             ON \"{schema}\".{SUBMISSIONS_TABLE} (form_id)"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS submissions_updated_idx \
             ON \"{schema}\".{SUBMISSIONS_TABLE} (updated_at DESC)"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS \"{schema}\".{STATUS_HISTORY_TABLE} (
                id UUID PRIMARY KEY,
                document_id UUID NOT NULL,
                document_name TEXT NOT NULL,
                reference_number TEXT NOT NULL,
                previous_status TEXT NOT NULL,
                new_status TEXT NOT NULL,
                updated_by TEXT NOT NULL,
                reviewer_id UUID,
                reviewer_name TEXT,
                form_id UUID,
                \"timestamp\" TIMESTAMPTZ NOT NULL
            )"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS status_history_document_idx \
             ON \"{schema}\".{STATUS_HISTORY_TABLE} (document_id, \"timestamp\" DESC)"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS status_history_reviewer_idx \
             ON \"{schema}\".{STATUS_HISTORY_TABLE} (reviewer_id, \"timestamp\" DESC)"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS \"{schema}\".{USERS_TABLE} (
                id UUID PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'Citizen',
                barangay TEXT,
                fcm_token TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS \"{schema}\".{CITIZEN_NOTIFICATIONS_TABLE} (
                id UUID PRIMARY KEY,
                user_id UUID NOT NULL,
                message TEXT NOT NULL,
                kind TEXT NOT NULL,
                reference_id UUID NOT NULL,
                \"read\" BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL
            )"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS citizen_notifications_user_idx \
             ON \"{schema}\".{CITIZEN_NOTIFICATIONS_TABLE} (user_id, created_at DESC)"
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_statement_is_idempotent_and_schema_qualified() {
        let statements = ddl_statements("lingkod");
        assert!(!statements.is_empty());
        for ddl in &statements {
            assert!(ddl.contains("IF NOT EXISTS"));
            assert!(ddl.contains("\"lingkod\""));
        }
    }
}
