//! The catalog seam the chunk executor works against.

use async_trait::async_trait;
use std::collections::BTreeMap;

use lexiport_core::types::{LangId, ProductId};

use crate::error::CatalogError;

/// Related entities a product references, translated alongside its fields
/// when the corresponding toggle is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelatedKind {
    Feature,
    Attribute,
    Attachment,
    ImageCaption,
}

impl RelatedKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RelatedKind::Feature => "feature",
            RelatedKind::Attribute => "attribute",
            RelatedKind::Attachment => "attachment",
            RelatedKind::ImageCaption => "image_caption",
        }
    }
}

/// One translatable related-entity text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedText {
    /// Id of the related entity in its own table (feature value id,
    /// attribute id, attachment id, image id).
    pub id: i64,
    pub text: String,
}

/// Read/write access to the external product catalog.
///
/// One instance corresponds to one open connection scope: the executor
/// opens a store per chunk invocation and calls [`close`](Self::close) at
/// the end of it.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Whether the product is active in the destination shop scope.
    /// An absent scope row counts as inactive.
    async fn product_active(
        &self,
        product_id: ProductId,
        id_shop: i64,
    ) -> Result<bool, CatalogError>;

    /// Source-language field values for a product, or `None` when the
    /// product has no row for the source (shop, language) scope.
    async fn fetch_source_fields(
        &self,
        product_id: ProductId,
        id_shop: i64,
        lang_id: LangId,
        fields: &[String],
    ) -> Result<Option<BTreeMap<String, String>>, CatalogError>;

    /// Targeted update of the destination row for (product, shop, language).
    /// Returns the number of affected rows; zero is `unchanged`, not an
    /// error.
    async fn apply_translation(
        &self,
        product_id: ProductId,
        id_shop: i64,
        lang_id: LangId,
        values: &BTreeMap<String, String>,
    ) -> Result<u64, CatalogError>;

    /// Source-language texts of one related-entity kind for a product.
    async fn fetch_related(
        &self,
        kind: RelatedKind,
        product_id: ProductId,
        lang_id: LangId,
    ) -> Result<Vec<RelatedText>, CatalogError>;

    /// Write one translated related-entity text for a target language.
    async fn apply_related(
        &self,
        kind: RelatedKind,
        entity_id: i64,
        lang_id: LangId,
        text: &str,
    ) -> Result<u64, CatalogError>;

    /// Release the underlying connection. Called once per chunk.
    async fn close(&self);
}
