use std::sync::Arc;

use crate::config::LookupMode;
use crate::db::{
    AttrValue, Item, KeyValueStore, PRIMARY_KEY, UpdateOp, get_bool, get_n, get_s, scan_unique,
};
use crate::error::{DatabaseError, ServiceError};
use crate::legal::{Document, fetch_by_id, generate_id};

/// Attribute holding the owning case id.
const CASE_ATTRIBUTE: &str = "case";

pub struct DocumentRepository {
    store: Arc<dyn KeyValueStore>,
    table: String,
    lookup: LookupMode,
}

/// Fields of a document that are known at upload time.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub file_name: String,
    pub case_id: String,
    pub date: String,
    pub file_url: String,
}

impl DocumentRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, table: String, lookup: LookupMode) -> Self {
        Self {
            store,
            table,
            lookup,
        }
    }

    /// Record an uploaded blob: fresh id, zero relevancy, not stored.
    pub async fn create(&self, input: NewDocument) -> Result<Document, DatabaseError> {
        let document = Document {
            id: generate_id(),
            file_name: input.file_name,
            case_id: input.case_id,
            date: input.date,
            file_url: input.file_url,
            relevancy: 0.0,
            stored: false,
        };
        self.store
            .put(&self.table, document_to_item(&document))
            .await?;
        Ok(document)
    }

    /// Write a previously read document back unchanged.
    pub async fn restore(&self, document: &Document) -> Result<(), DatabaseError> {
        self.store
            .put(&self.table, document_to_item(document))
            .await
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<Document>, DatabaseError> {
        fetch_by_id(self.store.as_ref(), &self.table, self.lookup, id)
            .await?
            .map(|item| document_from_item(&item))
            .transpose()
    }

    pub async fn get_by_case(&self, case_id: &str) -> Result<Vec<Document>, DatabaseError> {
        self.store
            .scan_eq(&self.table, CASE_ATTRIBUTE, &AttrValue::s(case_id))
            .await?
            .iter()
            .map(document_from_item)
            .collect()
    }

    /// A URL identifies at most one document.
    pub async fn get_by_file_url(&self, file_url: &str) -> Result<Option<Document>, DatabaseError> {
        scan_unique(self.store.as_ref(), &self.table, "file_url", file_url)
            .await?
            .map(|item| document_from_item(&item))
            .transpose()
    }

    /// Set the relevancy score of the document stored at `file_url`.
    pub async fn update_relevancy(
        &self,
        file_url: &str,
        relevancy: f64,
    ) -> Result<Option<Document>, ServiceError> {
        if !relevancy.is_finite() {
            return Err(ServiceError::InvalidInput(
                "Relevancy must be a finite number".to_string(),
            ));
        }
        let Some(document) = self.get_by_file_url(file_url).await? else {
            return Ok(None);
        };
        let updated = self
            .store
            .update(
                &self.table,
                &document.id,
                &[UpdateOp::set("relevancy", AttrValue::float(relevancy))],
            )
            .await?;
        Ok(updated.map(|item| document_from_item(&item)).transpose()?)
    }

    pub async fn delete(&self, id: &str) -> Result<Option<Document>, DatabaseError> {
        if id.is_empty() {
            return Ok(None);
        }
        self.store
            .delete(&self.table, id)
            .await?
            .map(|item| document_from_item(&item))
            .transpose()
    }
}

fn document_to_item(document: &Document) -> Item {
    Item::from([
        (PRIMARY_KEY.to_string(), AttrValue::s(&document.id)),
        ("file_name".to_string(), AttrValue::s(&document.file_name)),
        (CASE_ATTRIBUTE.to_string(), AttrValue::s(&document.case_id)),
        ("date".to_string(), AttrValue::s(&document.date)),
        ("file_url".to_string(), AttrValue::s(&document.file_url)),
        ("relevancy".to_string(), AttrValue::float(document.relevancy)),
        ("stored".to_string(), AttrValue::Bool(document.stored)),
    ])
}

fn document_from_item(item: &Item) -> Result<Document, DatabaseError> {
    Ok(Document {
        id: get_s(item, PRIMARY_KEY)?,
        file_name: get_s(item, "file_name")?,
        case_id: get_s(item, CASE_ATTRIBUTE)?,
        date: get_s(item, "date")?,
        file_url: get_s(item, "file_url")?,
        relevancy: get_n(item, "relevancy")?,
        stored: get_bool(item, "stored")?,
    })
}
