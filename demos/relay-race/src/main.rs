use std::sync::Arc;
use std::time::Duration;

use ringmaster::config::LoggingSettings;
use ringmaster::logging::setup_logging;
use ringmaster::prelude::*;

// ---------------------------------------------------------------------------
// Minigames
// ---------------------------------------------------------------------------

/// Two checkpoints down the river, then the finish line.
struct BoatRace;

impl MinigameRules for BoatRace {
    fn name() -> &'static str {
        "boat-race"
    }

    fn session_config() -> SessionConfig {
        SessionConfig {
            countdown_secs: 3,
            time_limit: Some(Duration::from_secs(120)),
            ..SessionConfig::default()
        }
    }

    fn awards(_session: &GameSession, event: &SessionEvent) -> Vec<ScoreAward> {
        match event {
            SessionEvent::CheckpointReached { player, .. } => vec![ScoreAward::new(*player, 5, "checkpoint")],
            SessionEvent::Finished { player, rank, .. } => {
                let points = match rank {
                    1 => 50,
                    2 => 30,
                    3 => 20,
                    _ => 10,
                };
                vec![ScoreAward::new(*player, points, "finish")]
            }
            _ => Vec::new(),
        }
    }
}

/// Red against Blue on the crater rim. Falling in is out; the last team on
/// the rim wins.
struct CraterKing;

impl MinigameRules for CraterKing {
    fn name() -> &'static str {
        "crater-king"
    }

    fn session_config() -> SessionConfig {
        SessionConfig {
            countdown_secs: 3,
            roster: RosterMode::Teams(vec![TeamSpec::new("Red", 3, "red"), TeamSpec::new("Blue", 3, "blue")]),
            win_condition: WinCondition::LastGroupStanding,
            time_limit: Some(Duration::from_secs(60)),
            ..SessionConfig::default()
        }
    }

    fn awards(_session: &GameSession, event: &SessionEvent) -> Vec<ScoreAward> {
        match event {
            SessionEvent::SessionOver { winners, .. } => winners
                .iter()
                .map(|p| ScoreAward::new(*p, 25, "team victory"))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn periodic_awards(session: &GameSession) -> Vec<ScoreAward> {
        session
            .active_players()
            .into_iter()
            .map(|p| ScoreAward::new(p, 1, "survived a second"))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Arenas
// ---------------------------------------------------------------------------

fn band(world: &str, z: f64) -> SpatialRegion {
    SpatialRegion::new(WorldId::new(world), Point::new(-10.0, 60.0, z - 2.0), Point::new(20.0, 70.0, z + 2.0))
}

fn river() -> Arena {
    Arena::new("river", WorldId::new("river"))
        .with_spawn(Point::new(0.0, 64.0, 0.0))
        .with_spawn(Point::new(4.0, 64.0, 0.0))
        .with_spawn(Point::new(8.0, 64.0, 0.0))
        .with_checkpoint(band("river", 40.0))
        .with_checkpoint(band("river", 80.0))
        .with_finish(band("river", 120.0))
}

fn crater() -> Arena {
    let world = WorldId::new("crater");
    Arena::new("crater", world.clone())
        .with_spawn(Point::new(-30.0, 70.0, 0.0))
        .with_spawn(Point::new(30.0, 70.0, 0.0))
        .with_finish(SpatialRegion::new(
            world.clone(),
            Point::new(200.0, 0.0, 200.0),
            Point::new(201.0, 1.0, 201.0),
        ))
        .with_hazard(SpatialRegion::new(
            world,
            Point::new(-20.0, 0.0, -20.0),
            Point::new(20.0, 50.0, 20.0),
        ))
}

fn lobby_spawn() -> Location {
    Location::new("lobby", 0.0, 64.0, 0.0)
}

// ---------------------------------------------------------------------------
// Script
// ---------------------------------------------------------------------------

const PLAYERS: [&str; 6] = ["ana", "ben", "cleo", "dev", "eli", "fay"];

async fn wait_for_countdown() {
    tokio::time::sleep(Duration::from_millis(3500)).await;
}

async fn print_leaderboard(orchestrator: &TournamentOrchestrator) {
    let ledger = orchestrator.ledger();
    let ledger = ledger.lock().await;
    tracing::info!("leaderboard");
    for entry in ledger.global_ranking(10) {
        tracing::info!(
            "  {:>2}. {:<6} {:>4} pts (boat-race {}, crater-king {})",
            entry.position,
            entry.display_name,
            entry.points,
            ledger.minigame_points(entry.player, BoatRace::name()),
            ledger.minigame_points(entry.player, CraterKing::name()),
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), RingmasterError> {
    if let Err(e) = setup_logging(&LoggingSettings::default(), false) {
        eprintln!("logging unavailable: {e}");
    }

    let world = Arc::new(MemoryWorld::new());
    for (i, name) in PLAYERS.iter().enumerate() {
        let player = PlayerId(i as u64 + 1);
        world.connect(player, *name);
        world.place(player, lobby_spawn());
    }
    // The operator.
    world.connect(PlayerId(99), "ops");
    world.set_admin(PlayerId(99), true);

    let mut orchestrator = TournamentOrchestrator::builder(world.clone()).build();
    orchestrator.execute(Command::AddLobbySpawn(lobby_spawn())).await?;
    orchestrator
        .execute(Command::SetLobbyRegion(SpatialRegion::new(
            WorldId::new("lobby"),
            Point::new(-25.0, 0.0, -25.0),
            Point::new(25.0, 128.0, 25.0),
        )))
        .await?;
    orchestrator.execute(Command::ExcludeAdmins).await?;

    let ctx = orchestrator.session_context();
    orchestrator
        .register_module(ArenaMinigame::<BoatRace>::new(vec![river()], ctx.clone()))
        .await?;
    orchestrator
        .register_module(ArenaMinigame::<CraterKing>::new(vec![crater()], ctx))
        .await?;

    // Round one: everybody paddles the river, slowest first.
    let out = orchestrator
        .execute(Command::Start {
            minigame: BoatRace::name().into(),
        })
        .await?;
    tracing::info!("{out}");
    wait_for_countdown().await;

    for id in (1..=6).rev() {
        let player = PlayerId(id);
        for z in [40.0, 80.0, 120.0] {
            orchestrator
                .on_player_move(player, &Location::new("river", 2.0, 64.0, z))
                .await;
        }
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    print_leaderboard(&orchestrator).await;

    // Round two: players tumble into the crater one by one until a team is
    // wiped out.
    let out = orchestrator
        .execute(Command::Start {
            minigame: CraterKing::name().into(),
        })
        .await?;
    tracing::info!("{out}");
    wait_for_countdown().await;

    for id in 2..=6 {
        tokio::time::sleep(Duration::from_secs(2)).await;
        let allowed = orchestrator
            .on_player_move(PlayerId(id), &Location::new("crater", 0.0, 10.0, 0.0))
            .await;
        tracing::info!(player = %PlayerId(id), allowed, "stepped into the crater");
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    let status = orchestrator.execute(Command::Status).await?;
    tracing::info!("{status}");
    print_leaderboard(&orchestrator).await;

    // A lobby player trying to wander off is stopped at the edge.
    let allowed = orchestrator
        .on_player_move(PlayerId(1), &Location::new("lobby", 40.0, 64.0, 0.0))
        .await;
    tracing::info!(allowed, "ana tried to leave the lobby");

    orchestrator.shutdown().await;
    Ok(())
}
