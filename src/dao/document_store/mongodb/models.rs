//! Conversions between the JSON documents handled by the service and BSON.

use mongodb::bson::{Bson, Document as BsonDocument, doc, oid::ObjectId};
use serde_json::{Number, Value};

use crate::dao::document_store::{Document, StoredDocument};

const ID_FIELD: &str = "_id";

/// Filter selecting a document by its storage id.
///
/// Listings expose `ObjectId` keys as hex, so a hex id also matches the `ObjectId` it encodes.
pub fn doc_id(id: &str) -> BsonDocument {
    match ObjectId::parse_str(id) {
        Ok(oid) => doc! { "_id": { "$in": [oid, id] } },
        Err(_) => upsert_key(id),
    }
}

/// Exact string key, for upserts that must create the document under `id` itself.
pub fn upsert_key(id: &str) -> BsonDocument {
    doc! { "_id": id }
}

/// Convert a JSON document into BSON, adding `_id` when given.
pub fn to_bson_document(document: Document, id: Option<&str>) -> BsonDocument {
    let mut converted = BsonDocument::new();
    if let Some(id) = id {
        converted.insert(ID_FIELD, id);
    }
    for (key, value) in document {
        if key != ID_FIELD {
            converted.insert(key, to_bson(value));
        }
    }
    converted
}

pub fn to_bson(value: Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(flag) => Bson::Boolean(flag),
        Value::Number(number) => match number.as_i64() {
            Some(integer) => Bson::Int64(integer),
            None => Bson::Double(number.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(text) => Bson::String(text),
        Value::Array(items) => Bson::Array(items.into_iter().map(to_bson).collect()),
        Value::Object(map) => Bson::Document(to_bson_document(map, None)),
    }
}

/// Split a raw BSON document into its storage id and JSON body.
pub fn from_bson_document(raw: BsonDocument) -> StoredDocument {
    let mut id = String::new();
    let mut document = Document::new();
    for (key, value) in raw {
        if key == ID_FIELD {
            id = match value {
                Bson::String(text) => text,
                Bson::ObjectId(oid) => oid.to_hex(),
                other => other.to_string(),
            };
        } else {
            document.insert(key, from_bson(value));
        }
    }
    StoredDocument { id, document }
}

fn from_bson(value: Bson) -> Value {
    match value {
        Bson::Null => Value::Null,
        Bson::Boolean(flag) => Value::Bool(flag),
        Bson::Int32(integer) => Value::from(integer),
        Bson::Int64(integer) => Value::from(integer),
        Bson::Double(float) => Number::from_f64(float)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Bson::String(text) => Value::String(text),
        Bson::Array(items) => Value::Array(items.into_iter().map(from_bson).collect()),
        Bson::Document(nested) => Value::Object(from_bson_document(nested).document),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(at) => Value::from(at.timestamp_millis()),
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn json_document_survives_bson_conversion() {
        let Value::Object(original) = json!({
            "torneo": "Roland Garros",
            "ranking": 3,
            "ratio": 0.5,
            "tieBreak": false,
            "sets": [[6, 4], [3, 6]],
            "jugador1": {"nombre": "Rafa"},
            "notas": null
        }) else {
            unreachable!()
        };

        let converted = to_bson_document(original.clone(), Some("abc"));
        assert_eq!(converted.get_str(ID_FIELD).ok(), Some("abc"));

        let stored = from_bson_document(converted);
        assert_eq!(stored.id, "abc");
        assert_eq!(stored.document, original);
    }

    #[test]
    fn hex_ids_also_match_object_ids() {
        let oid = ObjectId::new();
        let hex = oid.to_hex();
        assert_eq!(doc_id(&hex), doc! { "_id": { "$in": [oid, hex.as_str()] } });
        assert_eq!(doc_id("config"), doc! { "_id": "config" });
        assert_eq!(upsert_key(&hex), doc! { "_id": hex.as_str() });
    }

    #[test]
    fn object_ids_are_exposed_as_hex() {
        let oid = ObjectId::new();
        let stored = from_bson_document(doc! { "_id": oid, "nombre": "Serena" });
        assert_eq!(stored.id, oid.to_hex());
        assert_eq!(stored.document.get("nombre"), Some(&json!("Serena")));
    }
}
