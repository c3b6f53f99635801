//! Queue admission, FIFO pairing and lobby lifecycle through the engine.

use strictly_arena::{
    ArenaConfig, ArenaError, ArenaStore, BalanceTransfer, Competition, CompetitionId,
    ConnectRules, InMemoryBalances, InMemoryEngine, InMemoryStore, Lobby, ManualClock,
    MatchEngine, MatchId, MatchState, PlayerId, QueueOutcome, SessionRegistry, ValidationError,
};

fn engine_with(players: &[&str]) -> InMemoryEngine {
    let mut engine = InMemoryEngine::in_memory(ArenaConfig::default()).unwrap();
    for player in players {
        engine.bank_mut().mint(&PlayerId::from(*player), 300);
    }
    engine
}

#[test]
fn test_pairs_in_arrival_order() {
    let mut engine = engine_with(&["a", "b", "c", "d"]);
    let global = CompetitionId::from("global");

    assert_eq!(
        engine.join_queue(&global, &"a".into()).unwrap(),
        QueueOutcome::Queued { position: 1 }
    );
    let first = engine.join_queue(&global, &"b".into()).unwrap();
    assert_eq!(
        first,
        QueueOutcome::Paired {
            match_id: MatchId::new(1),
            opponent: "a".into()
        }
    );
    engine.join_queue(&global, &"c".into()).unwrap();
    engine.join_queue(&global, &"d".into()).unwrap();

    let one = engine.get_match(MatchId::new(1)).unwrap();
    assert_eq!(one.player1(), &PlayerId::from("a"));
    assert_eq!(one.player2(), &PlayerId::from("b"));
    let two = engine.get_match(MatchId::new(2)).unwrap();
    assert_eq!(two.player1(), &PlayerId::from("c"));
    assert_eq!(two.player2(), &PlayerId::from("d"));
    assert_eq!(engine.queue_len(&global), 0);
}

#[test]
fn test_queue_is_per_competition() {
    let mut engine = engine_with(&["a", "b"]);
    engine
        .register_competition(Competition::new("weekly".into(), "Weekly".into(), 50))
        .unwrap();

    engine.join_queue(&"global".into(), &"a".into()).unwrap();
    let outcome = engine.join_queue(&"weekly".into(), &"b".into()).unwrap();
    assert_eq!(outcome, QueueOutcome::Queued { position: 1 });
    assert_eq!(
        engine.queue_position(&"a".into()),
        Some(("global".into(), 1))
    );
    assert_eq!(
        engine.queue_position(&"b".into()),
        Some(("weekly".into(), 1))
    );
}

#[test]
fn test_competition_fee_sets_escrow() {
    let mut engine = engine_with(&["a", "b"]);
    engine
        .register_competition(Competition::new("weekly".into(), "Weekly".into(), 50))
        .unwrap();
    let weekly = CompetitionId::from("weekly");
    engine.join_queue(&weekly, &"a".into()).unwrap();
    engine.join_queue(&weekly, &"b".into()).unwrap();

    assert_eq!(*engine.escrow(MatchId::new(1)).unwrap().total_stake(), 100);
    assert_eq!(engine.bank().balance_of(&"a".into()), 250);
    assert_eq!(engine.get_match(MatchId::new(1)).unwrap().competition(), &weekly);
}

#[test]
fn test_rejected_joins_leave_no_trace() {
    let mut engine = engine_with(&["a"]);
    let global = CompetitionId::from("global");

    let err = engine.join_queue(&"nope".into(), &"a".into()).unwrap_err();
    assert!(matches!(
        err.as_validation(),
        Some(ValidationError::CompetitionNotFound { .. })
    ));

    engine.join_queue(&global, &"a".into()).unwrap();
    let err = engine.join_queue(&global, &"a".into()).unwrap_err();
    assert_eq!(
        err.as_validation(),
        Some(&ValidationError::AlreadyQueued { player: "a".into() })
    );
    assert_eq!(engine.queue_len(&global), 1);
    assert_eq!(engine.bank().balance_of(&"a".into()), 300);
}

#[test]
fn test_session_key_joins_for_owner() {
    let mut engine = engine_with(&["a", "b"]);
    engine.sessions_mut().delegate("a-key".into(), "a".into());
    let global = CompetitionId::from("global");

    engine.join_queue(&global, &"a-key".into()).unwrap();
    assert_eq!(engine.queue_position(&"a".into()), Some((global.clone(), 1)));
    assert_eq!(engine.queue_position(&"a-key".into()), None);
}

#[test]
fn test_leave_queue_then_rejoin() {
    let mut engine = engine_with(&["a", "b"]);
    let global = CompetitionId::from("global");
    engine.join_queue(&global, &"a".into()).unwrap();
    let entry = engine.leave_queue(&"a".into()).unwrap();
    assert_eq!(entry.player(), &PlayerId::from("a"));
    assert_eq!(engine.queue_len(&global), 0);

    let outcome = engine.join_queue(&global, &"b".into()).unwrap();
    assert_eq!(outcome, QueueOutcome::Queued { position: 1 });
    assert!(engine.leave_queue(&"a".into()).is_err());
}

#[test]
fn test_waiting_player_who_cannot_pay_is_dropped() {
    let mut engine = engine_with(&["a", "b"]);
    let global = CompetitionId::from("global");
    engine.join_queue(&global, &"a".into()).unwrap();
    engine.bank_mut().debit(&"a".into(), 250).unwrap();

    let outcome = engine.join_queue(&global, &"b".into()).unwrap();
    assert_eq!(outcome, QueueOutcome::Queued { position: 1 });
    assert_eq!(engine.queue_position(&"a".into()), None);
    assert_eq!(engine.bank().balance_of(&"b".into()), 300);
}

#[test]
fn test_manual_lobby_init() {
    let mut engine = engine_with(&["x", "y"]);
    let lobby = Lobby::new(MatchId::new(7), "global".into(), ["x".into(), "y".into()], 40, 0);
    let id = engine.init_match(lobby, true).unwrap();
    assert_eq!(id, MatchId::new(7));
    assert_eq!(*engine.escrow(id).unwrap().total_stake(), 80);
    assert_eq!(engine.bank().balance_of(&"x".into()), 260);
    assert_eq!(engine.bank().balance_of(&"y".into()), 260);
    assert_eq!(engine.active_match(&"x".into()), Some(id));
    assert!(engine.lobby().lobby(id).is_some());

    // x wins: the pot is exactly what was collected
    for column in [0, 1, 0, 1, 0, 1, 0] {
        let mover = engine.get_match(id).unwrap().current_mover().clone();
        engine.submit_move(id, column, &mover).unwrap();
    }
    assert_eq!(engine.bank().balance_of(&"x".into()), 340);
    assert_eq!(engine.bank().balance_of(&"y".into()), 260);
}

#[test]
fn test_unfunded_manual_lobby_rejected() {
    let mut engine = engine_with(&["x"]);
    let lobby = Lobby::new(MatchId::new(7), "global".into(), ["x".into(), "y".into()], 40, 0);
    let err = engine.init_match(lobby, true).unwrap_err();
    assert_eq!(
        err.as_validation(),
        Some(&ValidationError::InsufficientFunds {
            player: "y".into(),
            required: 40,
            available: 0
        })
    );
    assert!(engine.match_ids().is_empty());
    assert!(engine.escrow(MatchId::new(7)).is_none());
    assert_eq!(engine.bank().balance_of(&"x".into()), 300);
    assert!(engine.lobby().lobby(MatchId::new(7)).is_none());
}

#[test]
fn test_fee_change_while_waiting_is_refused() {
    let mut engine = engine_with(&["a", "b"]);
    engine
        .register_competition(Competition::new("weekly".into(), "Weekly".into(), 100))
        .unwrap();
    let weekly = CompetitionId::from("weekly");
    engine.join_queue(&weekly, &"a".into()).unwrap();

    let err = engine
        .register_competition(Competition::new("weekly".into(), "Weekly".into(), 250))
        .unwrap_err();
    assert!(matches!(
        err.as_validation(),
        Some(ValidationError::CompetitionBusy { waiting: 1, .. })
    ));

    engine.join_queue(&weekly, &"b".into()).unwrap();
    let debited = (300 - engine.bank().balance_of(&"a".into()))
        + (300 - engine.bank().balance_of(&"b".into()));
    assert_eq!(debited, 200);
    assert_eq!(*engine.escrow(MatchId::new(1)).unwrap().total_stake(), debited);

    // empty queue: the fee may change again
    engine
        .register_competition(Competition::new("weekly".into(), "Weekly".into(), 250))
        .unwrap();
}

#[test]
fn test_oversized_competition_fee_rejected() {
    let mut engine = engine_with(&[]);
    let err = engine
        .register_competition(Competition::new("whale".into(), "Whale".into(), u64::MAX))
        .unwrap_err();
    assert_eq!(
        err.as_validation(),
        Some(&ValidationError::FeeTooLarge {
            participation_fee: u64::MAX
        })
    );
    assert!(engine.lobby().competition(&"whale".into()).is_err());
}

#[test]
fn test_pairing_onto_existing_match_id_keeps_both_queued() {
    let mut store = InMemoryStore::new();
    store.put_match(MatchState::new(
        MatchId::new(1),
        "global".into(),
        "p".into(),
        "q".into(),
        &ConnectRules::STANDARD,
        0,
    ));
    let mut bank = InMemoryBalances::new();
    bank.mint(&"a".into(), 300);
    bank.mint(&"b".into(), 300);
    let mut engine = MatchEngine::new(
        ArenaConfig::default(),
        store,
        SessionRegistry::new(),
        ManualClock::default(),
        bank,
    )
    .unwrap();
    let global = CompetitionId::from("global");

    engine.join_queue(&global, &"a".into()).unwrap();
    let err = engine.join_queue(&global, &"b".into()).unwrap_err();
    assert!(matches!(err, ArenaError::Invariant(_)));

    assert_eq!(engine.queue_position(&"a".into()), Some((global.clone(), 1)));
    assert_eq!(engine.queue_position(&"b".into()), None);
    assert_eq!(engine.bank().balance_of(&"a".into()), 300);
    assert_eq!(engine.bank().balance_of(&"b".into()), 300);
    assert_eq!(engine.get_match(MatchId::new(1)).unwrap().player1(), &PlayerId::from("p"));
}

#[test]
fn test_sentinel_lobby_rejected() {
    let mut engine = engine_with(&[]);
    let lobby = Lobby::new(MatchId::SENTINEL, "global".into(), ["x".into(), "y".into()], 40, 0);
    assert!(engine.init_match(lobby, true).is_err());
    assert!(engine.match_ids().is_empty());
}
