use std::sync::Arc;

use chrono::Utc;

use crate::config::LookupMode;
use crate::db::{
    AttrValue, Item, KeyValueStore, PRIMARY_KEY, UpdateOp, as_map, get_list, get_s,
    get_string_list,
};
use crate::error::DatabaseError;
use crate::legal::{Chat, Message, fetch_by_id};

pub struct ChatRepository {
    store: Arc<dyn KeyValueStore>,
    table: String,
    lookup: LookupMode,
}

impl ChatRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, table: String, lookup: LookupMode) -> Self {
        Self {
            store,
            table,
            lookup,
        }
    }

    /// Open the chat of a freshly created case with the system welcome.
    pub async fn create(&self, case_id: &str, user_id: &str) -> Result<Chat, DatabaseError> {
        let chat = Chat {
            id: case_id.to_string(),
            messages: vec![Message::welcome(Utc::now().to_rfc3339())],
            selected_docs: Vec::new(),
            user_id: user_id.to_string(),
        };
        self.store.put(&self.table, chat_to_item(&chat)).await?;
        Ok(chat)
    }

    /// Write a previously read chat back unchanged.
    pub async fn restore(&self, chat: &Chat) -> Result<(), DatabaseError> {
        self.store.put(&self.table, chat_to_item(chat)).await
    }

    pub async fn get_by_id(&self, case_id: &str) -> Result<Option<Chat>, DatabaseError> {
        fetch_by_id(self.store.as_ref(), &self.table, self.lookup, case_id)
            .await?
            .map(|item| chat_from_item(&item))
            .transpose()
    }

    /// Append one message in a single atomic store update.
    ///
    /// Concurrent appends never lose each other. `None` if the chat is gone.
    pub async fn append_message(
        &self,
        case_id: &str,
        message: Message,
    ) -> Result<Option<Chat>, DatabaseError> {
        if case_id.is_empty() {
            return Ok(None);
        }
        self.store
            .update(
                &self.table,
                case_id,
                &[UpdateOp::Append(
                    "messages".to_string(),
                    vec![message_to_attr(&message)],
                )],
            )
            .await?
            .map(|item| chat_from_item(&item))
            .transpose()
    }

    pub async fn delete(&self, case_id: &str) -> Result<Option<Chat>, DatabaseError> {
        if case_id.is_empty() {
            return Ok(None);
        }
        self.store
            .delete(&self.table, case_id)
            .await?
            .map(|item| chat_from_item(&item))
            .transpose()
    }
}

fn message_to_attr(message: &Message) -> AttrValue {
    AttrValue::M(Item::from([
        ("text".to_string(), AttrValue::s(&message.text)),
        ("sender".to_string(), AttrValue::s(&message.sender)),
        ("timestamp".to_string(), AttrValue::s(&message.timestamp)),
    ]))
}

fn message_from_attr(value: &AttrValue) -> Result<Message, DatabaseError> {
    let map = as_map(value, "messages")?;
    Ok(Message {
        text: get_s(map, "text")?,
        sender: get_s(map, "sender")?,
        timestamp: get_s(map, "timestamp")?,
    })
}

fn chat_to_item(chat: &Chat) -> Item {
    Item::from([
        (PRIMARY_KEY.to_string(), AttrValue::s(&chat.id)),
        (
            "messages".to_string(),
            AttrValue::L(chat.messages.iter().map(message_to_attr).collect()),
        ),
        (
            "selected_docs".to_string(),
            AttrValue::L(chat.selected_docs.iter().map(AttrValue::s).collect()),
        ),
        ("user_id".to_string(), AttrValue::s(&chat.user_id)),
    ])
}

fn chat_from_item(item: &Item) -> Result<Chat, DatabaseError> {
    Ok(Chat {
        id: get_s(item, PRIMARY_KEY)?,
        messages: get_list(item, "messages")?
            .iter()
            .map(message_from_attr)
            .collect::<Result<_, _>>()?,
        selected_docs: get_string_list(item, "selected_docs")?,
        user_id: get_s(item, "user_id")?,
    })
}
