//! Match lifecycle: reading and editing the current match, the roster and the schedule, and
//! moving a finished match from "current"/"scheduled" to the archive.

use std::{sync::Arc, time::SystemTime};

use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::{AppConfig, CollectionNames},
    dao::{
        document_store::{Document, DocumentStore, SetMode, StoredDocument},
        models::{FutureMatchEntity, MatchConfigEntity, PlayedMatchEntity, PlayerEntity, from_document, to_document},
        storage::StorageError,
    },
    dto::{
        format_system_time,
        matches::{
            CurrentMatch, DOCUMENT_ID_KEY, FinalizeOutcome, FinishedMatch, FutureMatch,
            GlobalState, MatchConfigChanges, NewFutureMatch, PlayedMatch, RemovalOutcome,
            ResolvedMatchConfig, SaveResultRequest,
        },
        player::{NewPlayer, Player, PlayerChanges},
    },
    error::ServiceError,
};

/// Field holding the model id of scheduled matches.
const MODEL_ID_FIELD: &str = "id";
const DATE_FIELD: &str = "fecha";
const RANKING_FIELD: &str = "ranking";
const RECORDED_AT_FIELD: &str = "fechaRegistro";
const CURRENT_MATCH_TAG: &str = "estado";
/// Keys of an archive record owned by the archiving step rather than the caller.
const ARCHIVE_RESERVED_KEYS: [&str; 5] = [
    MODEL_ID_FIELD,
    DOCUMENT_ID_KEY,
    "idPartidoOrigen",
    "fechaFin",
    RECORDED_AT_FIELD,
];

/// Service over an injected [`DocumentStore`]. Cheap to clone; holds no domain state of its own.
#[derive(Clone)]
pub struct MatchService {
    store: Arc<dyn DocumentStore>,
    config: Arc<AppConfig>,
}

impl MatchService {
    pub fn new(store: Arc<dyn DocumentStore>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    fn collections(&self) -> &CollectionNames {
        &self.config.collections
    }

    // -----------------------------------------------------------------------
    // Current match
    // -----------------------------------------------------------------------

    /// Current match with both players resolved, or [`CurrentMatch::Unconfigured`] when the
    /// configuration document is empty or absent.
    pub async fn get_current_match_config(&self) -> Result<CurrentMatch, ServiceError> {
        let Some(mut config) = self.load_config().await? else {
            debug!("no match configured");
            return Ok(CurrentMatch::Unconfigured);
        };

        let player1 = required_reference(config.player1.as_deref(), "jugador1")?;
        let player2 = required_reference(config.player2.as_deref(), "jugador2")?;
        let (jugador1, jugador2) =
            futures::try_join!(self.fetch_player(player1), self.fetch_player(player2))?;

        // The variant tag owns this key on the wire.
        config.extra.remove(CURRENT_MATCH_TAG);
        Ok(CurrentMatch::Configured(ResolvedMatchConfig {
            torneo: config.tournament,
            ronda: config.round,
            jugador1,
            jugador2,
            saque: config.serve,
            tie_break: config.tie_break,
            extra: config.extra,
        }))
    }

    /// Merge `changes` into the configuration document and return the resolved result.
    pub async fn update_match_config(
        &self,
        changes: MatchConfigChanges,
    ) -> Result<CurrentMatch, ServiceError> {
        changes.validate()?;
        let fields = to_document(&changes)?;
        let names = self.collections();

        debug!(fields = fields.len(), "merging match configuration changes");
        self.store
            .set(&names.global_state, &names.config_document, fields, SetMode::Merge)
            .await?;

        self.get_current_match_config().await
    }

    /// Overwrite the configuration with an empty document.
    pub async fn clear_match_config(&self) -> Result<(), ServiceError> {
        let names = self.collections();
        self.store
            .set(
                &names.global_state,
                &names.config_document,
                Document::new(),
                SetMode::Replace,
            )
            .await?;
        info!("current match configuration cleared");
        Ok(())
    }

    /// Stored configuration, `None` when the document is absent or holds no field at all.
    async fn load_config(&self) -> Result<Option<MatchConfigEntity>, ServiceError> {
        let names = self.collections();
        let stored = self
            .store
            .get(&names.global_state, &names.config_document)
            .await?;
        match stored {
            Some(document) if !document.is_empty() => Ok(Some(from_document(document)?)),
            _ => Ok(None),
        }
    }

    // -----------------------------------------------------------------------
    // Roster
    // -----------------------------------------------------------------------

    pub async fn list_players(&self) -> Result<Vec<Player>, ServiceError> {
        let order_by = self
            .config
            .ordering
            .players_by_ranking
            .then_some(RANKING_FIELD);
        let stored = self.store.get_all(&self.collections().players, order_by).await?;
        decode_all(stored, Player::from_stored)
    }

    pub async fn create_player(&self, player: NewPlayer) -> Result<Player, ServiceError> {
        player.validate()?;
        let entity = PlayerEntity::from(player);
        let id = self
            .store
            .add(&self.collections().players, to_document(&entity)?)
            .await?;
        info!(player_id = %id, name = %entity.name, "player created");
        Ok(Player::from_entity(id, entity))
    }

    /// Apply a partial update to an existing player and return the stored result.
    pub async fn update_player(
        &self,
        id: &str,
        changes: PlayerChanges,
    ) -> Result<Player, ServiceError> {
        changes.validate()?;
        let fields = to_document(&changes)?;

        self.store
            .update(&self.collections().players, id, fields)
            .await
            .map_err(|err| match err {
                StorageError::NotFound { .. } => player_not_found(id),
                other => other.into(),
            })?;
        info!(player_id = id, "player updated");

        self.fetch_player(id).await
    }

    async fn fetch_player(&self, id: &str) -> Result<Player, ServiceError> {
        let Some(document) = self.store.get(&self.collections().players, id).await? else {
            return Err(player_not_found(id));
        };
        let entity = from_document::<PlayerEntity>(document)?;
        Ok(Player::from_entity(id.to_owned(), entity))
    }

    // -----------------------------------------------------------------------
    // Schedule and archive
    // -----------------------------------------------------------------------

    pub async fn list_future_matches(&self) -> Result<Vec<FutureMatch>, ServiceError> {
        let order_by = self
            .config
            .ordering
            .future_matches_by_date
            .then_some(DATE_FIELD);
        let stored = self
            .store
            .get_all(&self.collections().future_matches, order_by)
            .await?;
        decode_all(stored, FutureMatch::from_stored)
    }

    /// Schedule a match, generating its model id when the caller did not provide one.
    pub async fn create_future_match(
        &self,
        future_match: NewFutureMatch,
    ) -> Result<FutureMatch, ServiceError> {
        future_match.validate()?;
        let mut entity = FutureMatchEntity::from(future_match);
        if entity.id.as_deref().is_none_or(str::is_empty) {
            entity.id = Some(Uuid::new_v4().to_string());
        }

        let document = to_document(&entity)?;
        let id = self
            .store
            .add(&self.collections().future_matches, document.clone())
            .await?;
        info!(document_id = %id, model_id = ?entity.id, "future match scheduled");

        Ok(FutureMatch::from_stored(StoredDocument { id, document })?)
    }

    /// Delete the scheduled match whose model id is `model_id`. A miss is not an error.
    pub async fn remove_future_match(&self, model_id: &str) -> Result<RemovalOutcome, ServiceError> {
        let collection = &self.collections().future_matches;
        let found = self
            .store
            .query_equals(collection, MODEL_ID_FIELD, Value::from(model_id), 1)
            .await?;

        let Some(target) = found.into_iter().next() else {
            debug!(model_id, "no scheduled match to remove");
            return Ok(RemovalOutcome {
                eliminado: false,
                mensaje: format!("no scheduled match with id `{model_id}`"),
            });
        };

        self.store.delete(collection, &target.id).await?;
        info!(model_id, document_id = %target.id, "scheduled match removed");
        Ok(RemovalOutcome {
            eliminado: true,
            mensaje: format!("scheduled match `{model_id}` removed"),
        })
    }

    pub async fn list_played_matches(&self) -> Result<Vec<PlayedMatch>, ServiceError> {
        let stored = self
            .store
            .get_all(&self.collections().played_matches, Some(RECORDED_AT_FIELD))
            .await?;
        decode_all(stored, PlayedMatch::from_stored)
    }

    // -----------------------------------------------------------------------
    // Lifecycle transitions
    // -----------------------------------------------------------------------

    /// Move a finished match out of the live state.
    ///
    /// Archives it when `should_archive` is set, removes its scheduled entry when it carries a
    /// model id, and clears the current configuration in every case. Under the strict removal
    /// policy a missing scheduled entry is reported as [`ServiceError::NotFound`] once the
    /// configuration has been cleared.
    pub async fn finalize_match(
        &self,
        record: FinishedMatch,
        should_archive: bool,
    ) -> Result<FinalizeOutcome, ServiceError> {
        let model_id = record.id.clone().filter(|id| !id.is_empty());
        let mut steps = Vec::with_capacity(3);

        let archived_id = if should_archive {
            let id = self.archive(record).await?;
            steps.push(format!("match archived as `{id}`"));
            Some(id)
        } else {
            steps.push("match not archived".to_owned());
            None
        };

        let removal = match model_id.as_deref() {
            Some(model_id) => self.remove_future_match(model_id).await.map(Some),
            None => Ok(None),
        };

        self.clear_match_config().await?;

        match removal? {
            Some(outcome) if !outcome.eliminado => {
                if self.config.finalize.strict_future_match_removal {
                    warn!(model_id = ?model_id, "finalized match was not scheduled");
                    return Err(ServiceError::NotFound(outcome.mensaje));
                }
                steps.push(outcome.mensaje);
            }
            Some(outcome) => steps.push(outcome.mensaje),
            None => steps.push("no model id, schedule left untouched".to_owned()),
        }
        steps.push("current match cleared".to_owned());

        info!(
            model_id = ?model_id,
            archived = archived_id.is_some(),
            "match finalized"
        );
        Ok(FinalizeOutcome {
            mensaje: steps.join("; "),
            guardado: archived_id.is_some(),
            id_partido_guardado: archived_id,
        })
    }

    /// Validate a completed match and finalize it with archiving forced on.
    pub async fn save_final_result(
        &self,
        result: SaveResultRequest,
    ) -> Result<FinalizeOutcome, ServiceError> {
        result.validate()?;
        self.finalize_match(result.into(), true).await
    }

    /// Append the archive record and return its storage id.
    async fn archive(&self, record: FinishedMatch) -> Result<String, ServiceError> {
        let FinishedMatch {
            id,
            fecha_fin,
            mut fields,
        } = record;
        for key in ARCHIVE_RESERVED_KEYS {
            fields.remove(key);
        }

        let recorded_at = format_system_time(SystemTime::now());
        let entity = PlayedMatchEntity {
            id: Uuid::new_v4().to_string(),
            origin_id: id.filter(|id| !id.is_empty()),
            finished_at: fecha_fin.unwrap_or_else(|| Value::String(recorded_at.clone())),
            recorded_at,
            fields,
        };

        let archive_id = self
            .store
            .add(&self.collections().played_matches, to_document(&entity)?)
            .await?;
        debug!(archive_id = %archive_id, record_id = %entity.id, "match archived");
        Ok(archive_id)
    }

    // -----------------------------------------------------------------------
    // Aggregate view
    // -----------------------------------------------------------------------

    /// Roster, current match and schedule read concurrently. Any failing branch fails the whole.
    pub async fn get_global_state(&self) -> Result<GlobalState, ServiceError> {
        let (jugadores, current, partidos_futuros) = futures::try_join!(
            self.list_players(),
            self.get_current_match_config(),
            self.list_future_matches()
        )?;

        Ok(GlobalState {
            jugadores,
            partido_actual: current.into_option(),
            partidos_futuros,
        })
    }
}

fn player_not_found(id: &str) -> ServiceError {
    ServiceError::NotFound(format!("player `{id}` not found"))
}

fn required_reference<'a>(reference: Option<&'a str>, field: &str) -> Result<&'a str, ServiceError> {
    reference.filter(|id| !id.is_empty()).ok_or_else(|| {
        ServiceError::NotFound(format!("current match has no player in `{field}`"))
    })
}

fn decode_all<T>(
    stored: Vec<StoredDocument>,
    decode: fn(StoredDocument) -> serde_json::Result<T>,
) -> Result<Vec<T>, ServiceError> {
    stored
        .into_iter()
        .map(|document| decode(document).map_err(ServiceError::from))
        .collect()
}
