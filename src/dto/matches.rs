//! DTOs for the current match, scheduled matches and the archive.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::{
        document_store::{Document, StoredDocument},
        models::{FutureMatchEntity, PlayedMatchEntity, from_document},
    },
    dto::{
        player::Player,
        validation::{require_text, require_with, validate_player_reference, validate_present},
    },
};

/// Key under which listings expose the storage id of a document.
pub const DOCUMENT_ID_KEY: &str = "idDocumento";

/// Partial update of the current match configuration.
///
/// Omitted or `null` fields are left untouched; provided ones overwrite, empty strings included.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema, Validate)]
#[serde(deny_unknown_fields)]
pub struct MatchConfigChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub torneo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ronda: Option<String>,
    /// Storage id of the first player.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1))]
    pub jugador1: Option<String>,
    /// Storage id of the second player.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1))]
    pub jugador2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saque: Option<bool>,
    #[serde(rename = "tieBreak", default, skip_serializing_if = "Option::is_none")]
    pub tie_break: Option<bool>,
}

/// Current match configuration with both player references resolved.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ResolvedMatchConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub torneo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ronda: Option<String>,
    pub jugador1: Player,
    pub jugador2: Player,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saque: Option<bool>,
    #[serde(rename = "tieBreak", skip_serializing_if = "Option::is_none")]
    pub tie_break: Option<bool>,
    /// Other stored configuration fields, passed through as-is.
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub extra: Document,
}

/// What the scoreboard should display right now.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "estado")]
pub enum CurrentMatch {
    /// A match is configured and both players exist.
    #[serde(rename = "configurado")]
    Configured(ResolvedMatchConfig),
    /// The configuration document is empty or absent.
    #[serde(rename = "sinConfigurar")]
    Unconfigured,
}

impl CurrentMatch {
    pub fn into_option(self) -> Option<ResolvedMatchConfig> {
        match self {
            CurrentMatch::Configured(config) => Some(config),
            CurrentMatch::Unconfigured => None,
        }
    }
}

/// Aggregate snapshot served to scoreboard clients in a single request.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GlobalState {
    pub jugadores: Vec<Player>,
    #[serde(rename = "partidoActual")]
    pub partido_actual: Option<ResolvedMatchConfig>,
    #[serde(rename = "partidosFuturos")]
    pub partidos_futuros: Vec<FutureMatch>,
}

/// Scheduled match as listed to clients.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FutureMatch {
    /// Storage id, used to delete the entry.
    #[serde(rename = "idDocumento")]
    pub id_documento: String,
    /// Model id given when scheduling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub torneo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub jugador1: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub jugador2: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fecha: Option<String>,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub extra: Document,
}

impl FutureMatch {
    pub fn from_stored(stored: StoredDocument) -> serde_json::Result<Self> {
        let mut entity = from_document::<FutureMatchEntity>(stored.document)?;
        entity.extra.remove(DOCUMENT_ID_KEY);
        Ok(Self {
            id_documento: stored.id,
            id: entity.id,
            torneo: entity.tournament,
            jugador1: entity.player1,
            jugador2: entity.player2,
            fecha: entity.date,
            extra: entity.extra,
        })
    }
}

/// Payload scheduling a new match.
#[derive(Debug, Deserialize, ToSchema)]
pub struct NewFutureMatch {
    /// Model id; generated when omitted.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub torneo: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub jugador1: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub jugador2: Option<Value>,
    #[serde(default)]
    pub fecha: Option<String>,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub extra: Document,
}

impl Validate for NewFutureMatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_text(&mut errors, "torneo", self.torneo.as_deref());
        require_with(
            &mut errors,
            "jugador1",
            self.jugador1.as_ref(),
            validate_player_reference,
        );
        require_with(
            &mut errors,
            "jugador2",
            self.jugador2.as_ref(),
            validate_player_reference,
        );

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl From<NewFutureMatch> for FutureMatchEntity {
    fn from(value: NewFutureMatch) -> Self {
        let mut extra = value.extra;
        extra.remove(DOCUMENT_ID_KEY);
        Self {
            id: value.id,
            tournament: value.torneo,
            player1: value.jugador1,
            player2: value.jugador2,
            date: value.fecha,
            extra,
        }
    }
}

/// A match that has just ended, as handed to finalization.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct FinishedMatch {
    /// Model id of the match; used to drop it from the scheduled list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Completion time; archive time is used when omitted.
    #[serde(rename = "fechaFin", default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub fecha_fin: Option<Value>,
    /// Every other field of the match (players, score, tournament, ...).
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub fields: Document,
}

fn default_archive() -> bool {
    true
}

/// Body of `POST /finalizar`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct FinalizeRequest {
    pub partido: FinishedMatch,
    /// Archive the match before clearing it. Defaults to `true`.
    #[serde(default = "default_archive")]
    pub guardar: bool,
}

/// Body of `POST /guardar`: a completed match carrying its result.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SaveResultRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub torneo: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub jugador1: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub jugador2: Option<Value>,
    /// Final score; its presence marks the match as complete.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub resultado: Option<Value>,
    #[serde(rename = "fechaFin", default)]
    #[schema(value_type = Object)]
    pub fecha_fin: Option<Value>,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub extra: Document,
}

impl Validate for SaveResultRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        require_text(&mut errors, "torneo", self.torneo.as_deref());
        require_with(
            &mut errors,
            "jugador1",
            self.jugador1.as_ref(),
            validate_player_reference,
        );
        require_with(
            &mut errors,
            "jugador2",
            self.jugador2.as_ref(),
            validate_player_reference,
        );
        require_with(
            &mut errors,
            "resultado",
            self.resultado.as_ref(),
            validate_present,
        );

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl From<SaveResultRequest> for FinishedMatch {
    fn from(value: SaveResultRequest) -> Self {
        let mut fields = value.extra;
        let typed = [
            ("torneo", value.torneo.map(Value::String)),
            ("jugador1", value.jugador1),
            ("jugador2", value.jugador2),
            ("resultado", value.resultado),
        ];
        for (key, field) in typed {
            if let Some(field) = field {
                fields.insert(key.to_owned(), field);
            }
        }
        Self {
            id: value.id,
            fecha_fin: value.fecha_fin,
            fields,
        }
    }
}

/// Result of a finalization.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FinalizeOutcome {
    pub mensaje: String,
    /// Whether an archive entry was written.
    pub guardado: bool,
    /// Storage id of the archive entry, when one was written.
    #[serde(rename = "idPartidoGuardado")]
    pub id_partido_guardado: Option<String>,
}

/// Result of removing a scheduled match.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RemovalOutcome {
    pub eliminado: bool,
    pub mensaje: String,
}

/// Plain acknowledgement of an operation without a richer result.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ActionResponse {
    pub mensaje: String,
}

/// Archived match as listed to clients.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PlayedMatch {
    #[serde(rename = "idDocumento")]
    pub id_documento: String,
    pub id: String,
    #[serde(rename = "idPartidoOrigen", skip_serializing_if = "Option::is_none")]
    pub id_partido_origen: Option<String>,
    #[serde(rename = "fechaFin")]
    #[schema(value_type = Object)]
    pub fecha_fin: Value,
    #[serde(rename = "fechaRegistro")]
    pub fecha_registro: String,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub fields: Document,
}

impl PlayedMatch {
    pub fn from_stored(stored: StoredDocument) -> serde_json::Result<Self> {
        let mut entity = from_document::<PlayedMatchEntity>(stored.document)?;
        entity.fields.remove(DOCUMENT_ID_KEY);
        Ok(Self {
            id_documento: stored.id,
            id: entity.id,
            id_partido_origen: entity.origin_id,
            fecha_fin: entity.finished_at,
            fecha_registro: entity.recorded_at,
            fields: entity.fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::dao::models::to_document;

    fn player(id: &str) -> Player {
        serde_json::from_value(json!({"id": id, "nombre": id.to_uppercase()})).unwrap()
    }

    #[test]
    fn current_match_is_tagged() {
        let unconfigured = serde_json::to_value(CurrentMatch::Unconfigured).unwrap();
        assert_eq!(unconfigured, json!({"estado": "sinConfigurar"}));

        let configured = serde_json::to_value(CurrentMatch::Configured(ResolvedMatchConfig {
            torneo: Some("Roland Garros".into()),
            ronda: None,
            jugador1: player("p1"),
            jugador2: player("p2"),
            saque: Some(true),
            tie_break: None,
            extra: Document::from_iter([("marcador".to_owned(), json!("15-0"))]),
        }))
        .unwrap();
        assert_eq!(configured["estado"], "configurado");
        assert_eq!(configured["jugador2"]["nombre"], "P2");
        assert_eq!(configured["saque"], true);
        assert_eq!(configured["marcador"], "15-0");
    }

    #[test]
    fn config_changes_reject_unknown_fields() {
        assert!(serde_json::from_value::<MatchConfigChanges>(json!({"pista": 3})).is_err());

        let changes: MatchConfigChanges =
            serde_json::from_value(json!({"torneo": "", "tieBreak": true, "ronda": null}))
                .unwrap();
        assert_eq!(
            Value::Object(to_document(&changes).unwrap()),
            json!({"torneo": "", "tieBreak": true})
        );
    }

    #[test]
    fn save_request_requires_result_and_players() {
        let request: SaveResultRequest = serde_json::from_value(json!({
            "torneo": "Open",
            "jugador1": "p1"
        }))
        .unwrap();
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("jugador2"));
        assert!(fields.contains_key("resultado"));
        assert!(!fields.contains_key("torneo"));
    }

    #[test]
    fn save_request_folds_into_finished_match() {
        let request: SaveResultRequest = serde_json::from_value(json!({
            "id": "M1",
            "torneo": "Open",
            "jugador1": "p1",
            "jugador2": {"nombre": "Rafa"},
            "resultado": "6-4 6-4",
            "pista": "central"
        }))
        .unwrap();
        assert!(request.validate().is_ok());

        let finished = FinishedMatch::from(request);
        assert_eq!(finished.id.as_deref(), Some("M1"));
        assert_eq!(finished.fecha_fin, None);
        assert_eq!(
            Value::Object(finished.fields),
            json!({
                "torneo": "Open",
                "jugador1": "p1",
                "jugador2": {"nombre": "Rafa"},
                "resultado": "6-4 6-4",
                "pista": "central"
            })
        );
    }

    #[test]
    fn finalize_request_archives_by_default() {
        let request: FinalizeRequest =
            serde_json::from_value(json!({"partido": {"id": "M1"}})).unwrap();
        assert!(request.guardar);
        assert_eq!(request.partido.id.as_deref(), Some("M1"));
    }

    #[test]
    fn future_match_exposes_document_id() {
        let listed = FutureMatch::from_stored(StoredDocument {
            id: "f1".into(),
            document: to_document(&json!({"id": "M", "fecha": "2024-06-01", "pista": 2}))
                .unwrap(),
        })
        .unwrap();
        assert_eq!(
            serde_json::to_value(listed).unwrap(),
            json!({"idDocumento": "f1", "id": "M", "fecha": "2024-06-01", "pista": 2})
        );
    }
}
