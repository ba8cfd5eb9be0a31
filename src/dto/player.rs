//! DTOs describing roster players.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::Validate;

use crate::dao::{
    document_store::{Document, StoredDocument},
    models::{PlayerEntity, from_document},
};

/// Player as exposed to clients, carrying its storage id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Player {
    pub id: String,
    pub nombre: String,
    #[serde(rename = "urlImagen", skip_serializing_if = "Option::is_none")]
    pub url_imagen: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<f64>)]
    pub ranking: Option<Value>,
    /// Any other stored field.
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub extra: Document,
}

impl Player {
    pub fn from_entity(id: String, mut entity: PlayerEntity) -> Self {
        entity.extra.remove("id");
        Self {
            id,
            nombre: entity.name,
            url_imagen: entity.image_url,
            ranking: entity.ranking,
            extra: entity.extra,
        }
    }

    /// Decode a stored roster document.
    pub fn from_stored(stored: StoredDocument) -> serde_json::Result<Self> {
        let entity = from_document::<PlayerEntity>(stored.document)?;
        Ok(Self::from_entity(stored.id, entity))
    }
}

/// Partial update of a player. Omitted or `null` fields are left untouched.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct PlayerChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1))]
    pub nombre: Option<String>,
    #[serde(rename = "urlImagen", default, skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub url_imagen: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranking: Option<u32>,
}

/// Payload registering a new player in the roster.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct NewPlayer {
    #[validate(length(min = 1))]
    pub nombre: String,
    #[serde(rename = "urlImagen", default)]
    #[validate(url)]
    pub url_imagen: Option<String>,
    #[serde(default)]
    pub ranking: Option<u32>,
}

impl From<NewPlayer> for PlayerEntity {
    fn from(value: NewPlayer) -> Self {
        Self {
            name: value.nombre,
            image_url: value.url_imagen,
            ranking: value.ranking.map(Value::from),
            extra: Document::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::dao::models::to_document;

    #[test]
    fn changes_only_carry_provided_fields() {
        let changes: PlayerChanges = serde_json::from_value(json!({
            "ranking": 3,
            "nombre": null
        }))
        .unwrap();
        assert!(changes.validate().is_ok());
        assert_eq!(
            serde_json::Value::Object(to_document(&changes).unwrap()),
            json!({"ranking": 3})
        );
    }

    #[test]
    fn changes_reject_unknown_fields_and_bad_values() {
        assert!(serde_json::from_value::<PlayerChanges>(json!({"edad": 30})).is_err());

        let changes: PlayerChanges =
            serde_json::from_value(json!({"nombre": "", "urlImagen": "not a url"})).unwrap();
        let errors = changes.validate().unwrap_err();
        assert_eq!(errors.field_errors().len(), 2);
    }

    #[test]
    fn player_serializes_with_wire_names() {
        let player = Player::from_stored(StoredDocument {
            id: "p1".into(),
            document: to_document(&json!({"nombre": "Carlos", "urlImagen": "https://x/c.png"}))
                .unwrap(),
        })
        .unwrap();
        assert_eq!(
            serde_json::to_value(&player).unwrap(),
            json!({"id": "p1", "nombre": "Carlos", "urlImagen": "https://x/c.png"})
        );
    }
}
