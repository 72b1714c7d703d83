use anyhow::Context;
use log::error;
use postgres_types::Json;

use crate::db::{postgres::PostgresClient, Entity, Store};

/// Remove null bytes (0x00), which PostgreSQL rejects in text columns.
fn sanitize_id(s: &str) -> String {
    s.replace('\0', "")
}

impl Store for PostgresClient {
    async fn load<E: Entity>(&mut self, id: &str) -> anyhow::Result<Option<E>> {
        let client = self.pool.get().await?;
        let query = r#"
            SELECT data
            FROM reservoir.entities
            WHERE kind = $1 AND id = $2
        "#;

        let id = sanitize_id(id);
        let row = client
            .query_opt(query, &[&E::KIND, &id])
            .await
            .with_context(|| format!("Failed to load {} {}", E::KIND, id))?;

        match row {
            Some(row) => {
                let Json(value): Json<serde_json::Value> = row.get("data");
                let entity = serde_json::from_value(value)
                    .with_context(|| format!("Failed to decode {} {}", E::KIND, id))?;
                Ok(Some(entity))
            },
            None => Ok(None),
        }
    }

    async fn upsert<E: Entity>(&mut self, entity: &E) -> anyhow::Result<()> {
        let client = self.pool.get().await?;
        let query = r#"
            INSERT INTO reservoir.entities (kind, id, data, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (kind, id) DO UPDATE SET
                data = EXCLUDED.data,
                updated_at = EXCLUDED.updated_at
        "#;

        let id = sanitize_id(&entity.id());
        let mut value = serde_json::to_value(entity)
            .with_context(|| format!("Failed to encode {} {}", E::KIND, id))?;
        strip_null_bytes(&mut value);

        client
            .execute(query, &[&E::KIND, &id, &Json(&value)])
            .await
            .map_err(|e| {
                error!("Failed to upsert {} {}: {:?}", E::KIND, id, e);
                e
            })?;

        Ok(())
    }
}

/// Same for JSONB payloads: token symbols and names read from arbitrary
/// contracts may contain null bytes.
fn strip_null_bytes(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::String(s) => {
            if s.contains('\0') {
                *s = s.replace('\0', "");
            }
        },
        serde_json::Value::Array(items) => items.iter_mut().for_each(strip_null_bytes),
        serde_json::Value::Object(map) => map.values_mut().for_each(strip_null_bytes),
        _ => {},
    }
}
