//! Message API.

use std::sync::Arc;

use log::debug;
use serde_json::{json, Value};

use crate::{
    client::FirestoreClientInner,
    error::{Error, Result},
    models::{ConversationId, Message, MessageId, NewMessage, UserId},
    parser::{decode_document, document::document_id, encode_document},
};

/// Collection holding every direct message.
pub const MESSAGES_COLLECTION: &str = "messages";

/// API for direct message operations.
pub struct MessageApi {
    client: Arc<FirestoreClientInner>,
}

impl MessageApi {
    pub(crate) fn new(client: Arc<FirestoreClientInner>) -> Self {
        Self { client }
    }

    /// All messages `user` participates in.
    pub async fn for_participant(&self, user: &UserId) -> Result<Vec<Message>> {
        self.run_query(participant_query(user)).await
    }

    /// All messages of one conversation, oldest first.
    pub async fn conversation(&self, conversation: &ConversationId) -> Result<Vec<Message>> {
        self.run_query(conversation_query(conversation)).await
    }

    /// Store a new message, returning its document ID.
    ///
    /// The sender must be the signed-in user.
    pub async fn send(&self, message: NewMessage) -> Result<MessageId> {
        let auth = self.client.require_auth()?;
        if message.sender_id != auth.uid {
            return Err(Error::InvalidArgument(
                "Messages can only be sent as the signed-in user".into(),
            ));
        }

        let path = self.client.documents_path(MESSAGES_COLLECTION);
        let body = encode_document(&message)?;
        let created = self.client.executor().post_json(&path, &body).await?;

        let name = created
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::missing("name"))?;
        Ok(MessageId::new(document_id(name)))
    }

    /// Flag messages as read in one atomic commit.
    ///
    /// Either every message is updated or, if any is missing, none is.
    pub async fn mark_read(&self, ids: &[MessageId]) -> Result<()> {
        self.client.require_auth()?;
        if ids.is_empty() {
            return Ok(());
        }

        let body = read_commit(&self.client, ids)?;
        let path = self.client.documents_path(":commit");
        self.client.executor().post_json(&path, &body).await?;
        Ok(())
    }

    async fn run_query(&self, query: Value) -> Result<Vec<Message>> {
        let path = self.client.documents_path(":runQuery");
        let response = self.client.executor().post_json(&path, &query).await?;
        parse_query_response(&response)
    }
}

fn read_commit(client: &FirestoreClientInner, ids: &[MessageId]) -> Result<Value> {
    let writes = ids
        .iter()
        .map(|id| {
            Ok(json!({
                "update": {
                    "name": client.document_name(MESSAGES_COLLECTION, id.as_str())?,
                    "fields": { "read": { "booleanValue": true } }
                },
                "updateMask": { "fieldPaths": ["read"] },
                "currentDocument": { "exists": true }
            }))
        })
        .collect::<Result<Vec<Value>>>()?;
    Ok(json!({ "writes": writes }))
}

fn participant_query(user: &UserId) -> Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": MESSAGES_COLLECTION }],
            "where": {
                "fieldFilter": {
                    "field": { "fieldPath": "participants" },
                    "op": "ARRAY_CONTAINS",
                    "value": { "stringValue": user.as_str() }
                }
            }
        }
    })
}

fn conversation_query(conversation: &ConversationId) -> Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": MESSAGES_COLLECTION }],
            "where": {
                "fieldFilter": {
                    "field": { "fieldPath": "conversationId" },
                    "op": "EQUAL",
                    "value": { "stringValue": conversation.as_str() }
                }
            },
            "orderBy": [{ "field": { "fieldPath": "timestamp" }, "direction": "ASCENDING" }]
        }
    })
}

/// Collect the documents of a `runQuery` response.
///
/// Documents that fail to decode are skipped rather than failing the query.
fn parse_query_response(response: &Value) -> Result<Vec<Message>> {
    let rows = response
        .as_array()
        .ok_or_else(|| Error::parse("runQuery response is not an array"))?;

    let mut messages = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(document) = row.get("document") else {
            continue;
        };
        match decode_document::<Message>(document) {
            Ok(message) => messages.push(message),
            Err(e) => debug!("skipping undecodable message document: {}", e),
        }
    }
    Ok(messages)
}
