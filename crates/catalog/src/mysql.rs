//! MySQL implementation of [`CatalogStore`] for PrestaShop-style schemas.
//!
//! Table names are `{prefix}product_shop`, `{prefix}product_lang`, and the
//! related-entity `*_lang` tables. The prefix and every requested column
//! name pass allow-list validation before interpolation; all values travel
//! as binds.

use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::Row;
use std::collections::BTreeMap;
use std::time::Duration;

use lexiport_core::types::{LangId, ProductId};

use crate::error::{is_flaky, CatalogError};
use crate::prefix::{validate_identifier, validate_prefix};
use crate::store::{CatalogStore, RelatedKind, RelatedText};

/// Evaluate a query-builder expression, awaiting it once; on a flaky error
/// build and await it a second time against a fresh connection from the
/// pool. The second failure is always classified `Unavailable`.
macro_rules! retry_flaky {
    ($op:expr) => {{
        match $op.await {
            Ok(value) => Ok(value),
            Err(err) if is_flaky(&err) => {
                tracing::warn!(error = %err, "Catalog statement hit a connection flake, retrying once");
                $op.await.map_err(|err| CatalogError::from_sqlx(err, true))
            }
            Err(err) => Err(CatalogError::from_sqlx(err, false)),
        }
    }};
}

/// A catalog connection scope for one chunk invocation.
pub struct MySqlCatalog {
    pool: MySqlPool,
    prefix: String,
}

impl MySqlCatalog {
    /// Open a connection scope against a catalog database.
    ///
    /// The pool is deliberately tiny: statements within a chunk run
    /// sequentially, and the scope is closed when the chunk ends rather
    /// than pooled across chunks.
    pub async fn connect(url: &str, prefix: &str) -> Result<Self, CatalogError> {
        validate_prefix(prefix)?;
        let pool = MySqlPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;
        Ok(Self {
            pool,
            prefix: prefix.to_string(),
        })
    }

    fn table(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Backtick-quoted, validated column list for dynamic SELECT/UPDATE.
    fn column_list(fields: &[String]) -> Result<String, CatalogError> {
        for field in fields {
            validate_identifier(field)?;
        }
        Ok(fields
            .iter()
            .map(|f| format!("`{f}`"))
            .collect::<Vec<_>>()
            .join(", "))
    }
}

#[async_trait]
impl CatalogStore for MySqlCatalog {
    async fn product_active(
        &self,
        product_id: ProductId,
        id_shop: i64,
    ) -> Result<bool, CatalogError> {
        let sql = format!(
            "SELECT active FROM {} WHERE id_product = ? AND id_shop = ?",
            self.table("product_shop"),
        );
        let active: Option<bool> = retry_flaky!(sqlx::query_scalar(&sql)
            .bind(product_id)
            .bind(id_shop)
            .fetch_optional(&self.pool))?;
        Ok(active.unwrap_or(false))
    }

    async fn fetch_source_fields(
        &self,
        product_id: ProductId,
        id_shop: i64,
        lang_id: LangId,
        fields: &[String],
    ) -> Result<Option<BTreeMap<String, String>>, CatalogError> {
        let columns = Self::column_list(fields)?;
        let sql = format!(
            "SELECT {columns} FROM {} \
             WHERE id_product = ? AND id_shop = ? AND id_lang = ?",
            self.table("product_lang"),
        );
        let row = retry_flaky!(sqlx::query(&sql)
            .bind(product_id)
            .bind(id_shop)
            .bind(lang_id)
            .fetch_optional(&self.pool))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut values = BTreeMap::new();
        for (idx, field) in fields.iter().enumerate() {
            let value: Option<String> = row
                .try_get(idx)
                .map_err(|e| CatalogError::Query(e.to_string()))?;
            if let Some(value) = value {
                values.insert(field.clone(), value);
            }
        }
        Ok(Some(values))
    }

    async fn apply_translation(
        &self,
        product_id: ProductId,
        id_shop: i64,
        lang_id: LangId,
        values: &BTreeMap<String, String>,
    ) -> Result<u64, CatalogError> {
        if values.is_empty() {
            return Ok(0);
        }
        for field in values.keys() {
            validate_identifier(field)?;
        }
        let assignments = values
            .keys()
            .map(|f| format!("`{f}` = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {assignments} \
             WHERE id_product = ? AND id_shop = ? AND id_lang = ?",
            self.table("product_lang"),
        );

        let result = retry_flaky!({
            let mut query = sqlx::query(&sql);
            for value in values.values() {
                query = query.bind(value);
            }
            query
                .bind(product_id)
                .bind(id_shop)
                .bind(lang_id)
                .execute(&self.pool)
        })?;
        Ok(result.rows_affected())
    }

    async fn fetch_related(
        &self,
        kind: RelatedKind,
        product_id: ProductId,
        lang_id: LangId,
    ) -> Result<Vec<RelatedText>, CatalogError> {
        let sql = match kind {
            RelatedKind::Feature => format!(
                "SELECT fvl.id_feature_value AS id, fvl.value AS text \
                 FROM {fp} fp \
                 JOIN {fvl} fvl ON fvl.id_feature_value = fp.id_feature_value \
                 WHERE fp.id_product = ? AND fvl.id_lang = ?",
                fp = self.table("feature_product"),
                fvl = self.table("feature_value_lang"),
            ),
            RelatedKind::Attribute => format!(
                "SELECT DISTINCT al.id_attribute AS id, al.name AS text \
                 FROM {pa} pa \
                 JOIN {pac} pac ON pac.id_product_attribute = pa.id_product_attribute \
                 JOIN {al} al ON al.id_attribute = pac.id_attribute \
                 WHERE pa.id_product = ? AND al.id_lang = ?",
                pa = self.table("product_attribute"),
                pac = self.table("product_attribute_combination"),
                al = self.table("attribute_lang"),
            ),
            RelatedKind::Attachment => format!(
                "SELECT al.id_attachment AS id, al.name AS text \
                 FROM {pa} pa \
                 JOIN {al} al ON al.id_attachment = pa.id_attachment \
                 WHERE pa.id_product = ? AND al.id_lang = ?",
                pa = self.table("product_attachment"),
                al = self.table("attachment_lang"),
            ),
            RelatedKind::ImageCaption => format!(
                "SELECT il.id_image AS id, il.legend AS text \
                 FROM {img} i \
                 JOIN {il} il ON il.id_image = i.id_image \
                 WHERE i.id_product = ? AND il.id_lang = ?",
                img = self.table("image"),
                il = self.table("image_lang"),
            ),
        };

        let rows = retry_flaky!(sqlx::query(&sql)
            .bind(product_id)
            .bind(lang_id)
            .fetch_all(&self.pool))?;

        rows.into_iter()
            .map(|row| {
                Ok(RelatedText {
                    id: row
                        .try_get::<i64, _>("id")
                        .map_err(|e| CatalogError::Query(e.to_string()))?,
                    text: row
                        .try_get::<String, _>("text")
                        .map_err(|e| CatalogError::Query(e.to_string()))?,
                })
            })
            .collect()
    }

    async fn apply_related(
        &self,
        kind: RelatedKind,
        entity_id: i64,
        lang_id: LangId,
        text: &str,
    ) -> Result<u64, CatalogError> {
        let (table, id_column, text_column) = match kind {
            RelatedKind::Feature => ("feature_value_lang", "id_feature_value", "value"),
            RelatedKind::Attribute => ("attribute_lang", "id_attribute", "name"),
            RelatedKind::Attachment => ("attachment_lang", "id_attachment", "name"),
            RelatedKind::ImageCaption => ("image_lang", "id_image", "legend"),
        };
        let sql = format!(
            "UPDATE {} SET `{text_column}` = ? WHERE `{id_column}` = ? AND id_lang = ?",
            self.table(table),
        );
        let result = retry_flaky!(sqlx::query(&sql)
            .bind(text)
            .bind(entity_id)
            .bind(lang_id)
            .execute(&self.pool))?;
        Ok(result.rows_affected())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
