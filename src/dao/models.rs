use serde::{Deserialize, Serialize, de::DeserializeOwned, ser::Error as _};
use serde_json::Value;

use crate::dao::document_store::Document;

/// Player of the roster as stored in the players collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlayerEntity {
    /// Display name.
    #[serde(rename = "nombre", default)]
    pub name: String,
    /// Picture shown on the scoreboard.
    #[serde(rename = "urlImagen", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Sort key of the roster. Kept as raw JSON: rosters seeded by other tools may hold
    /// fractional or textual rankings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranking: Option<Value>,
    /// Fields written by other tools, kept untouched.
    #[serde(flatten)]
    pub extra: Document,
}

/// The single "current match" configuration document.
///
/// An empty document means no match is configured.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MatchConfigEntity {
    #[serde(rename = "torneo", default, skip_serializing_if = "Option::is_none")]
    pub tournament: Option<String>,
    #[serde(rename = "ronda", default, skip_serializing_if = "Option::is_none")]
    pub round: Option<String>,
    /// Storage id of the first player.
    #[serde(rename = "jugador1", default, skip_serializing_if = "Option::is_none")]
    pub player1: Option<String>,
    /// Storage id of the second player.
    #[serde(rename = "jugador2", default, skip_serializing_if = "Option::is_none")]
    pub player2: Option<String>,
    #[serde(rename = "saque", default, skip_serializing_if = "Option::is_none")]
    pub serve: Option<bool>,
    #[serde(rename = "tieBreak", default, skip_serializing_if = "Option::is_none")]
    pub tie_break: Option<bool>,
    /// Scoreboard fields this service does not interpret.
    #[serde(flatten)]
    pub extra: Document,
}

/// Scheduled match. `id` is the model id chosen by the caller, unrelated to the storage id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FutureMatchEntity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "torneo", default, skip_serializing_if = "Option::is_none")]
    pub tournament: Option<String>,
    /// Player reference or inline player data, at the caller's discretion.
    #[serde(rename = "jugador1", default, skip_serializing_if = "Option::is_none")]
    pub player1: Option<Value>,
    #[serde(rename = "jugador2", default, skip_serializing_if = "Option::is_none")]
    pub player2: Option<Value>,
    #[serde(rename = "fecha", default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(flatten)]
    pub extra: Document,
}

/// Immutable archive entry of a finished match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayedMatchEntity {
    /// Fresh identifier generated when archiving.
    pub id: String,
    /// Model id the match had while it was current/scheduled.
    #[serde(rename = "idPartidoOrigen", default, skip_serializing_if = "Option::is_none")]
    pub origin_id: Option<String>,
    /// Completion time (RFC 3339 unless provided otherwise by the caller).
    #[serde(rename = "fechaFin")]
    pub finished_at: Value,
    /// Archive time (RFC 3339).
    #[serde(rename = "fechaRegistro")]
    pub recorded_at: String,
    /// Every other field of the finished match.
    #[serde(flatten)]
    pub fields: Document,
}

/// Serialize an entity into the document shape handed to the store.
pub fn to_document<T: Serialize>(entity: &T) -> serde_json::Result<Document> {
    match serde_json::to_value(entity)? {
        Value::Object(document) => Ok(document),
        _ => Err(serde_json::Error::custom(
            "entity did not serialize to a JSON object",
        )),
    }
}

/// Decode a stored document into an entity.
pub fn from_document<T: DeserializeOwned>(document: Document) -> serde_json::Result<T> {
    serde_json::from_value(Value::Object(document))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn player_keeps_unknown_fields() {
        let Value::Object(raw) = json!({
            "nombre": "Carlos",
            "urlImagen": "https://img/carlos.png",
            "ranking": 2,
            "pais": "ES"
        }) else {
            unreachable!()
        };

        let player: PlayerEntity = from_document(raw.clone()).unwrap();
        assert_eq!(player.name, "Carlos");
        assert_eq!(player.ranking, Some(json!(2)));
        assert_eq!(player.extra.get("pais"), Some(&json!("ES")));
        assert_eq!(to_document(&player).unwrap(), raw);
    }

    #[test]
    fn empty_config_round_trips_to_empty_document() {
        let config: MatchConfigEntity = from_document(Document::new()).unwrap();
        assert_eq!(config, MatchConfigEntity::default());
        assert!(to_document(&config).unwrap().is_empty());
    }

    #[test]
    fn config_keeps_unmodeled_fields() {
        let Value::Object(raw) = json!({"jugador1": "p1", "marcador": "15-0"}) else {
            unreachable!()
        };
        let config: MatchConfigEntity = from_document(raw.clone()).unwrap();
        assert_eq!(config.player1.as_deref(), Some("p1"));
        assert_eq!(config.extra.get("marcador"), Some(&json!("15-0")));
        assert_eq!(to_document(&config).unwrap(), raw);
    }
}
