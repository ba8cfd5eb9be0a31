use std::sync::Arc;

use serde_json::{Value, json};
use tennis_scoreboard_back::{
    config::AppConfig,
    dao::document_store::{DocumentStore, SetMode, memory::MemoryDocumentStore},
    dto::{
        matches::{
            CurrentMatch, FinishedMatch, MatchConfigChanges, NewFutureMatch, SaveResultRequest,
        },
        player::NewPlayer,
    },
    error::ServiceError,
    services::match_service::MatchService,
};

fn from_json<T: serde::de::DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).unwrap()
}

fn service(store: &MemoryDocumentStore) -> MatchService {
    MatchService::new(Arc::new(store.clone()), Arc::new(AppConfig::default()))
}

async fn roster(service: &MatchService) -> (String, String) {
    let alcaraz = service
        .create_player(from_json::<NewPlayer>(
            json!({"nombre": "Carlos Alcaraz", "ranking": 2}),
        ))
        .await
        .unwrap();
    let sinner = service
        .create_player(from_json::<NewPlayer>(
            json!({"nombre": "Jannik Sinner", "ranking": 1}),
        ))
        .await
        .unwrap();
    (alcaraz.id, sinner.id)
}

#[tokio::test]
async fn scheduled_match_goes_live_then_to_history() {
    let store = MemoryDocumentStore::new();
    let service = service(&store);
    let (p1, p2) = roster(&service).await;

    let scheduled = service
        .create_future_match(from_json::<NewFutureMatch>(json!({
            "id": "final-2024",
            "torneo": "Roland Garros",
            "jugador1": p1,
            "jugador2": p2,
            "fecha": "2024-06-09"
        })))
        .await
        .unwrap();
    service
        .create_future_match(from_json::<NewFutureMatch>(json!({
            "torneo": "Wimbledon",
            "jugador1": p2,
            "jugador2": p1,
            "fecha": "2024-07-14"
        })))
        .await
        .unwrap();

    let live = service
        .update_match_config(from_json::<MatchConfigChanges>(json!({
            "torneo": "Roland Garros",
            "ronda": "Final",
            "jugador1": p1,
            "jugador2": p2,
            "saque": true,
            "tieBreak": false
        })))
        .await
        .unwrap();
    let CurrentMatch::Configured(live) = live else {
        panic!("expected a configured match");
    };
    assert_eq!(live.jugador1.nombre, "Carlos Alcaraz");
    assert_eq!(live.tie_break, Some(false));

    let global = service.get_global_state().await.unwrap();
    assert_eq!(global.jugadores.len(), 2);
    assert_eq!(global.jugadores[0].nombre, "Jannik Sinner");
    assert_eq!(global.partidos_futuros.len(), 2);
    assert_eq!(global.partidos_futuros[0], scheduled);
    assert!(global.partido_actual.is_some());

    let outcome = service
        .save_final_result(from_json::<SaveResultRequest>(json!({
            "id": "final-2024",
            "torneo": "Roland Garros",
            "jugador1": p1,
            "jugador2": p2,
            "resultado": "3-6 6-2 5-7 6-1 6-2"
        })))
        .await
        .unwrap();
    assert!(outcome.guardado);

    let global = service.get_global_state().await.unwrap();
    assert!(global.partido_actual.is_none());
    assert_eq!(global.partidos_futuros.len(), 1);
    assert_eq!(global.partidos_futuros[0].torneo.as_deref(), Some("Wimbledon"));

    let history = service.list_played_matches().await.unwrap();
    assert_eq!(history.len(), 1);
    let played = &history[0];
    assert_eq!(outcome.id_partido_guardado.as_deref(), Some(played.id_documento.as_str()));
    assert_eq!(played.id_partido_origen.as_deref(), Some("final-2024"));
    assert_ne!(played.id, "final-2024");
    assert_eq!(played.fields.get("resultado"), Some(&json!("3-6 6-2 5-7 6-1 6-2")));
}

#[tokio::test]
async fn finalize_is_idempotent_on_live_state() {
    let store = MemoryDocumentStore::new();
    let service = service(&store);
    let (p1, p2) = roster(&service).await;
    service
        .update_match_config(from_json::<MatchConfigChanges>(
            json!({"jugador1": p1, "jugador2": p2}),
        ))
        .await
        .unwrap();

    let record = FinishedMatch {
        id: Some("exhibition".into()),
        ..FinishedMatch::default()
    };
    let first = service.finalize_match(record.clone(), false).await.unwrap();
    let second = service.finalize_match(record, false).await.unwrap();

    assert!(!first.guardado);
    assert!(!second.guardado);
    assert_eq!(
        service.get_current_match_config().await.unwrap(),
        CurrentMatch::Unconfigured
    );
    assert!(service.list_played_matches().await.unwrap().is_empty());
}

#[tokio::test]
async fn changes_with_unknown_player_fail_on_read_back() {
    let store = MemoryDocumentStore::new();
    let service = service(&store);
    let (p1, _) = roster(&service).await;

    let err = service
        .update_match_config(from_json::<MatchConfigChanges>(
            json!({"jugador1": p1, "jugador2": "retired"}),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(ref msg) if msg.contains("retired")));
}

#[tokio::test]
async fn history_is_listed_in_archive_order() {
    let store = MemoryDocumentStore::new();
    let service = service(&store);
    for (archived_at, id) in [("2024-05-02T10:00:00Z", "b"), ("2024-05-01T10:00:00Z", "a")] {
        store
            .set(
                "partidosJugados",
                id,
                from_json(json!({
                    "id": id,
                    "fechaFin": archived_at,
                    "fechaRegistro": archived_at
                })),
                SetMode::Replace,
            )
            .await
            .unwrap();
    }

    let history = service.list_played_matches().await.unwrap();
    let ids: Vec<_> = history.iter().map(|played| played.id.as_str()).collect();
    assert_eq!(ids, ["a", "b"]);
}

#[tokio::test]
async fn store_outage_surfaces_as_unavailable() {
    let store = MemoryDocumentStore::new();
    let service = service(&store);
    store.set_offline(true);

    let err = service.get_global_state().await.unwrap_err();
    assert!(matches!(err, ServiceError::Unavailable(_)));
}
