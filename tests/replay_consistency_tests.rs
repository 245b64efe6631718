// End-to-end checks that the incremental update path and the full replay
// path produce identical player statistics for the same record history.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use jasstat::event::{EventBus, RecordEvent, RecordEventHandler};
use jasstat::records::{
    CompletedGameRecord, CompletedSessionRecord, InMemoryRecordStore, PerSide, RecordStore,
    RosterPlayer, SessionTeams, SessionWinner, Side, StricheCounts, TeamSideMapping,
};
use jasstat::stats::{
    InMemoryStatsRepository, RecalculationEngine, StatsRecordSubscriber, StatsRepository,
    StatsUpdater,
};
use jasstat::GroupAggregator;

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, hour, minute, 0).unwrap()
}

fn roster(pairs: &[(&str, &str)]) -> Vec<RosterPlayer> {
    pairs
        .iter()
        .map(|(id, name)| RosterPlayer {
            player_id: id.to_string(),
            display_name: name.to_string(),
        })
        .collect()
}

/// A two-game evening: p1/p2 against p3/p4. Game one goes to p1's side,
/// game two is lost with a matsch against them, and the session goes to
/// the opponents.
fn game_one() -> CompletedGameRecord {
    CompletedGameRecord {
        session_id: "evening".to_string(),
        game_number: 1,
        completed_at: at(19, 0),
        duration_millis: Some(45 * 60 * 1000),
        final_scores: PerSide {
            top: 2500,
            bottom: 1200,
        },
        final_striche: PerSide {
            top: StricheCounts {
                sieg: 1,
                ..StricheCounts::default()
            },
            bottom: StricheCounts::default(),
        },
        weis_points: PerSide { top: 40, bottom: 0 },
        participant_ids: vec![
            "p1".to_string(),
            "p3".to_string(),
            "p2".to_string(),
            "p4".to_string(),
        ],
        side_rosters: Some(PerSide {
            top: vec!["p1".to_string(), "p2".to_string()],
            bottom: vec!["p3".to_string(), "p4".to_string()],
        }),
        winner_side: Some(Side::Top),
        group_id: Some("club".to_string()),
    }
}

fn game_two() -> CompletedGameRecord {
    CompletedGameRecord {
        session_id: "evening".to_string(),
        game_number: 2,
        completed_at: at(20, 15),
        duration_millis: Some(50 * 60 * 1000),
        final_scores: PerSide {
            top: 800,
            bottom: 2500,
        },
        final_striche: PerSide {
            top: StricheCounts::default(),
            bottom: StricheCounts {
                sieg: 1,
                matsch: 1,
                ..StricheCounts::default()
            },
        },
        weis_points: PerSide { top: 0, bottom: 20 },
        participant_ids: vec![
            "p1".to_string(),
            "p3".to_string(),
            "p2".to_string(),
            "p4".to_string(),
        ],
        side_rosters: Some(PerSide {
            top: vec!["p1".to_string(), "p2".to_string()],
            bottom: vec!["p3".to_string(), "p4".to_string()],
        }),
        winner_side: Some(Side::Bottom),
        group_id: Some("club".to_string()),
    }
}

fn evening_session() -> CompletedSessionRecord {
    CompletedSessionRecord {
        session_id: "evening".to_string(),
        group_id: Some("club".to_string()),
        participant_ids: vec![
            "p1".to_string(),
            "p2".to_string(),
            "p3".to_string(),
            "p4".to_string(),
        ],
        teams: SessionTeams {
            team_a: roster(&[("p1", "Anna"), ("p2", "Beat")]),
            team_b: roster(&[("p3", "Cora"), ("p4", "Dani")]),
        },
        team_side_mapping: Some(TeamSideMapping {
            team_a: Side::Top,
            team_b: Side::Bottom,
        }),
        final_scores: PerSide {
            top: 3300,
            bottom: 3700,
        },
        final_striche: PerSide {
            top: StricheCounts {
                sieg: 1,
                ..StricheCounts::default()
            },
            bottom: StricheCounts {
                sieg: 1,
                matsch: 1,
                ..StricheCounts::default()
            },
        },
        weis_points: PerSide {
            top: 40,
            bottom: 20,
        },
        winner: Some(SessionWinner::TeamB),
        started_at: at(18, 30),
        ended_at: Some(at(21, 0)),
        games_played: 2,
        duration_seconds: Some(9000),
    }
}

async fn seeded_store() -> Arc<InMemoryRecordStore> {
    let store = Arc::new(InMemoryRecordStore::new());
    store.insert_game(game_one()).await.unwrap();
    store.insert_game(game_two()).await.unwrap();
    store.insert_session(evening_session()).await.unwrap();
    store
}

async fn run_incremental(store: Arc<InMemoryRecordStore>) -> Arc<InMemoryStatsRepository> {
    let repo = Arc::new(InMemoryStatsRepository::new());
    let updater = StatsUpdater::new(store, repo.clone());
    updater.process_completed_game("evening", 1).await.unwrap();
    updater.process_completed_game("evening", 2).await.unwrap();
    updater.process_finalized_session("evening").await.unwrap();
    repo
}

#[tokio::test]
async fn two_game_evening_produces_the_expected_statistics() {
    let store = seeded_store().await;
    let repo = run_incremental(store).await;

    let p1 = repo.get_player("p1").await.unwrap().unwrap();
    assert_eq!(p1.total_games, 2);
    assert_eq!(p1.game_wins, 1);
    assert_eq!(p1.game_losses, 1);
    assert_eq!(p1.game_streaks.win.current, 0);
    assert_eq!(p1.game_streaks.loss.current, 1);
    assert_eq!(p1.matsch_received, 1);
    assert_eq!(p1.matsch_made, 0);
    assert_eq!(p1.total_points_made, 3300);
    assert_eq!(p1.total_points_received, 3700);
    assert_eq!(p1.total_weis_made, 40);

    assert_eq!(p1.total_sessions, 1);
    assert_eq!(p1.session_losses, 1);
    assert_eq!(p1.session_streaks.loss.current, 1);
    assert_eq!(p1.total_play_time_seconds, 9000);

    let partner = &p1.partners["p2"];
    assert_eq!(partner.games_played_with, 2);
    assert_eq!(partner.games_won_with, 1);
    assert_eq!(partner.sessions_played_with, 1);
    assert_eq!(partner.sessions_won_with, 0);
    assert_eq!(partner.display_name, "Beat");

    let opponent = &p1.opponents["p4"];
    assert_eq!(opponent.games_played_against, 2);
    assert_eq!(opponent.games_won_against, 1);
    assert_eq!(opponent.sessions_played_against, 1);
}

#[tokio::test]
async fn incremental_and_replayed_documents_are_identical() {
    let store = seeded_store().await;
    let incremental = run_incremental(store.clone()).await;

    let rebuilt_repo = Arc::new(InMemoryStatsRepository::new());
    let engine = RecalculationEngine::new(store, rebuilt_repo);

    for player_id in ["p1", "p2", "p3", "p4"] {
        let live = incremental.get_player(player_id).await.unwrap().unwrap();
        let replayed = engine.rebuild_player(player_id).await.unwrap();
        assert_eq!(
            serde_json::to_value(&live).unwrap(),
            serde_json::to_value(&replayed).unwrap(),
            "mismatch for {player_id}"
        );
    }
}

#[tokio::test]
async fn session_arriving_after_its_games_reconciles_side_resolution() {
    // Without side rosters the game alone is placed by seat position, which
    // puts p2 on the losing bottom side. The session's team mapping puts p2
    // on the winning top side instead. Finalizing the session must correct
    // the earlier seat-based placement.
    let mut game = game_one();
    game.side_rosters = None;
    game.participant_ids = vec![
        "p1".to_string(),
        "p2".to_string(),
        "p3".to_string(),
        "p4".to_string(),
    ];

    let store = Arc::new(InMemoryRecordStore::new());
    store.insert_game(game).await.unwrap();

    let repo = Arc::new(InMemoryStatsRepository::new());
    let updater = StatsUpdater::new(store.clone(), repo.clone());
    updater.process_completed_game("evening", 1).await.unwrap();

    let before = repo.get_player("p2").await.unwrap().unwrap();
    assert_eq!(before.game_wins, 0);
    assert_eq!(before.game_losses, 1);

    store.insert_session(evening_session()).await.unwrap();
    updater.process_finalized_session("evening").await.unwrap();

    let after = repo.get_player("p2").await.unwrap().unwrap();
    assert_eq!(after.game_wins, 1);
    assert_eq!(after.game_losses, 0);
    assert_eq!(after.total_sessions, 1);

    // The corrected state matches a full replay exactly.
    let rebuilt_repo = Arc::new(InMemoryStatsRepository::new());
    let engine = RecalculationEngine::new(store, rebuilt_repo);
    for player_id in ["p1", "p2", "p3", "p4"] {
        let live = repo.get_player(player_id).await.unwrap().unwrap();
        let replayed = engine.rebuild_player(player_id).await.unwrap();
        assert_eq!(
            serde_json::to_value(&live).unwrap(),
            serde_json::to_value(&replayed).unwrap(),
            "mismatch for {player_id}"
        );
    }
}

#[tokio::test]
async fn repeated_recalculation_is_byte_identical() {
    let store = seeded_store().await;
    let repo = Arc::new(InMemoryStatsRepository::new());
    let engine = RecalculationEngine::new(store, repo);

    let first = engine.rebuild_player("p1").await.unwrap();
    let second = engine.rebuild_player("p1").await.unwrap();
    assert_eq!(
        serde_json::to_vec(&first).unwrap(),
        serde_json::to_vec(&second).unwrap()
    );
}

#[tokio::test]
async fn pair_aggregates_are_symmetric_between_partners() {
    let store = seeded_store().await;
    let repo = run_incremental(store).await;

    let p1 = repo.get_player("p1").await.unwrap().unwrap();
    let p2 = repo.get_player("p2").await.unwrap().unwrap();

    let p1_with_p2 = &p1.partners["p2"];
    let p2_with_p1 = &p2.partners["p1"];
    assert_eq!(p1_with_p2.games_played_with, p2_with_p1.games_played_with);
    assert_eq!(p1_with_p2.games_won_with, p2_with_p1.games_won_with);
    assert_eq!(
        p1_with_p2.sessions_played_with,
        p2_with_p1.sessions_played_with
    );

    let p1_vs_p3 = &p1.opponents["p3"];
    let p3_vs_p1 = repo.get_player("p3").await.unwrap().unwrap().opponents["p1"].clone();
    assert_eq!(p1_vs_p3.games_played_against, p3_vs_p1.games_played_against);
    // Each saw the other win once.
    assert_eq!(p1_vs_p3.games_won_against, 1);
    assert_eq!(p3_vs_p1.games_won_against, 1);
}

#[tokio::test]
async fn subscriber_pipeline_updates_stats_and_group_boards() {
    let store = seeded_store().await;
    let repo = Arc::new(InMemoryStatsRepository::new());

    let updater = Arc::new(StatsUpdater::new(store.clone(), repo.clone()));
    let aggregator = Arc::new(GroupAggregator::new(store.clone(), repo.clone()));
    let bus = EventBus::with_default_capacity();
    let subscriber = StatsRecordSubscriber::new(updater, aggregator, store, bus);

    for event in [
        RecordEvent::GameCompleted {
            session_id: "evening".to_string(),
            game_number: 1,
        },
        RecordEvent::GameCompleted {
            session_id: "evening".to_string(),
            game_number: 2,
        },
        RecordEvent::SessionFinalized {
            session_id: "evening".to_string(),
        },
    ] {
        subscriber.handle(&event).await.unwrap();
    }

    let p3 = repo.get_player("p3").await.unwrap().unwrap();
    assert_eq!(p3.session_wins, 1);
    assert_eq!(p3.game_wins, 1);

    let group = repo.get_group("club").await.unwrap().unwrap();
    assert_eq!(group.member_count, 4);
    assert_eq!(group.games_considered, 2);
    assert_eq!(group.sessions_considered, 1);
}
