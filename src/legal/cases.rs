use std::sync::Arc;

use crate::config::LookupMode;
use crate::db::{AttrValue, Item, KeyValueStore, PRIMARY_KEY, UpdateOp, get_n, get_s};
use crate::error::DatabaseError;
use crate::legal::{Case, fetch_by_id, generate_id};

pub struct CaseRepository {
    store: Arc<dyn KeyValueStore>,
    table: String,
    lookup: LookupMode,
}

impl CaseRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, table: String, lookup: LookupMode) -> Self {
        Self {
            store,
            table,
            lookup,
        }
    }

    /// Store a new case under a fresh id with a zero file count.
    pub async fn create(&self, input: Case) -> Result<Case, DatabaseError> {
        let case = Case {
            id: generate_id(),
            number_files: 0,
            ..input
        };
        self.store.put(&self.table, case_to_item(&case)).await?;
        Ok(case)
    }

    /// Write a previously read case back unchanged.
    pub async fn restore(&self, case: &Case) -> Result<(), DatabaseError> {
        self.store.put(&self.table, case_to_item(case)).await
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<Case>, DatabaseError> {
        fetch_by_id(self.store.as_ref(), &self.table, self.lookup, id)
            .await?
            .map(|item| case_from_item(&item))
            .transpose()
    }

    pub async fn get_by_user(&self, user_id: &str) -> Result<Vec<Case>, DatabaseError> {
        self.store
            .scan_eq(&self.table, "user_id", &AttrValue::s(user_id))
            .await?
            .iter()
            .map(case_from_item)
            .collect()
    }

    /// Overwrite the descriptive fields of an existing case.
    ///
    /// `number_files` and `user_id` are not touched.
    pub async fn update(&self, input: Case) -> Result<Option<Case>, DatabaseError> {
        if input.id.is_empty() {
            return Ok(None);
        }
        let ops = [
            UpdateOp::set("case_title", AttrValue::s(input.case_title)),
            UpdateOp::set(
                "attorney_first_name",
                AttrValue::s(input.attorney_first_name),
            ),
            UpdateOp::set("attorney_last_name", AttrValue::s(input.attorney_last_name)),
            UpdateOp::set("case_info", AttrValue::s(input.case_info)),
            UpdateOp::set("case_type", AttrValue::s(input.case_type)),
            UpdateOp::set("city", AttrValue::s(input.city)),
            UpdateOp::set("date", AttrValue::s(input.date)),
            UpdateOp::set("judge_name", AttrValue::s(input.judge_name)),
            UpdateOp::set("state", AttrValue::s(input.state)),
        ];
        self.store
            .update(&self.table, &input.id, &ops)
            .await?
            .map(|item| case_from_item(&item))
            .transpose()
    }

    /// Atomically adjust the file counter. `None` if the case is gone.
    pub async fn increment_file_count(
        &self,
        id: &str,
        delta: i64,
    ) -> Result<Option<Case>, DatabaseError> {
        self.store
            .update(
                &self.table,
                id,
                &[UpdateOp::Increment("number_files".to_string(), delta)],
            )
            .await?
            .map(|item| case_from_item(&item))
            .transpose()
    }

    pub async fn delete(&self, id: &str) -> Result<Option<Case>, DatabaseError> {
        if id.is_empty() {
            return Ok(None);
        }
        self.store
            .delete(&self.table, id)
            .await?
            .map(|item| case_from_item(&item))
            .transpose()
    }
}

fn case_to_item(case: &Case) -> Item {
    Item::from([
        (PRIMARY_KEY.to_string(), AttrValue::s(&case.id)),
        ("case_title".to_string(), AttrValue::s(&case.case_title)),
        (
            "attorney_first_name".to_string(),
            AttrValue::s(&case.attorney_first_name),
        ),
        (
            "attorney_last_name".to_string(),
            AttrValue::s(&case.attorney_last_name),
        ),
        ("case_info".to_string(), AttrValue::s(&case.case_info)),
        ("case_type".to_string(), AttrValue::s(&case.case_type)),
        ("city".to_string(), AttrValue::s(&case.city)),
        ("date".to_string(), AttrValue::s(&case.date)),
        ("judge_name".to_string(), AttrValue::s(&case.judge_name)),
        ("number_files".to_string(), AttrValue::int(case.number_files)),
        ("state".to_string(), AttrValue::s(&case.state)),
        ("user_id".to_string(), AttrValue::s(&case.user_id)),
    ])
}

fn case_from_item(item: &Item) -> Result<Case, DatabaseError> {
    Ok(Case {
        id: get_s(item, PRIMARY_KEY)?,
        case_title: get_s(item, "case_title")?,
        attorney_first_name: get_s(item, "attorney_first_name")?,
        attorney_last_name: get_s(item, "attorney_last_name")?,
        case_info: get_s(item, "case_info")?,
        case_type: get_s(item, "case_type")?,
        city: get_s(item, "city")?,
        date: get_s(item, "date")?,
        judge_name: get_s(item, "judge_name")?,
        number_files: get_n(item, "number_files")?,
        state: get_s(item, "state")?,
        user_id: get_s(item, "user_id")?,
    })
}
