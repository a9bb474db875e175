use clap::Parser;
use maze_chase_server::constants::{START_LIVES, TICK_MS, TICK_RATE};
use maze_chase_server::engine::{GameEngine, GameEngineOptions};
use maze_chase_server::error::LevelResult;
use maze_chase_server::maze::{builtin_levels, load_levels, LevelDescriptor};
use maze_chase_server::rng::Rng;
use maze_chase_server::server_utils::seconds_per_tick;
use maze_chase_server::types::{Character, Direction, RuntimeEvent, Snapshot};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

const SEGMENT_TOLERANCE: f32 = 1.0;
const TURN_CHANCE: f32 = 0.04;
const ABILITY_CHANCE: f32 = 0.01;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    seed: Option<u32>,
    #[arg(long, default_value_t = TICK_RATE as u64 * 180)]
    ticks: u64,
    #[arg(long)]
    character: Option<String>,
    #[arg(long)]
    levels: Option<PathBuf>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug)]
struct Scenario {
    name: String,
    character: Character,
    seed: u32,
    ticks: u64,
}

#[derive(Clone, Debug, Default, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    character: String,
    ticks: u64,
    #[serde(rename = "finalScore")]
    final_score: u32,
    #[serde(rename = "finalLevel")]
    final_level: u32,
    #[serde(rename = "livesLeft")]
    lives_left: u32,
    #[serde(rename = "pickupsEaten")]
    pickups_eaten: u32,
    #[serde(rename = "ghostsEaten")]
    ghosts_eaten: u32,
    #[serde(rename = "fruitsEaten")]
    fruits_eaten: u32,
    #[serde(rename = "levelsCleared")]
    levels_cleared: u32,
    deaths: u32,
    #[serde(rename = "gameOvers")]
    game_overs: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug)]
struct ScenarioRunResult {
    result: ScenarioResultLine,
    anomaly_records: Vec<AnomalyRecord>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "bestScore")]
    best_score: u32,
    scenarios: Vec<ScenarioResultLine>,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    ts: u64,
    level: String,
    event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tick: Option<u64>,
    details: Value,
}

#[derive(Debug, Default)]
struct AnomalyLog {
    messages: Vec<String>,
    records: Vec<AnomalyRecord>,
    seen: HashSet<String>,
}

impl AnomalyLog {
    fn push(&mut self, tick: u64, message: String) {
        self.records.push(AnomalyRecord {
            tick,
            message: message.clone(),
        });
        if self.seen.insert(message.clone()) {
            self.messages.push(message);
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let levels = match resolve_levels(cli.levels.as_deref()) {
        Ok(levels) => levels,
        Err(error) => {
            emit_log("error", "levels_failed", None, None, json!({ "error": error.to_string() }));
            std::process::exit(2);
        }
    };
    let scenarios = match resolve_scenarios(&cli) {
        Some(scenarios) => scenarios,
        None => {
            emit_log(
                "error",
                "unknown_character",
                None,
                None,
                json!({ "character": cli.character }),
            );
            std::process::exit(2);
        }
    };

    let run_started_at_ms = now_ms();
    let mut results = Vec::new();
    let mut total_anomalies = 0usize;

    for scenario in &scenarios {
        emit_log(
            "info",
            "scenario_started",
            Some(scenario.seed),
            None,
            json!({
                "scenario": scenario.name,
                "character": scenario.character,
                "ticks": scenario.ticks,
            }),
        );
        let run = match run_scenario(scenario, &levels) {
            Ok(run) => run,
            Err(error) => {
                emit_log(
                    "error",
                    "engine_failed",
                    Some(scenario.seed),
                    None,
                    json!({ "error": error.to_string() }),
                );
                std::process::exit(2);
            }
        };

        for anomaly in &run.anomaly_records {
            emit_log(
                "warn",
                "anomaly_detected",
                Some(scenario.seed),
                Some(anomaly.tick),
                json!({ "scenario": scenario.name, "message": anomaly.message }),
            );
        }
        total_anomalies += run.anomaly_records.len();

        emit_log(
            "info",
            "scenario_finished",
            Some(scenario.seed),
            Some(run.result.ticks),
            json!({
                "scenario": scenario.name,
                "score": run.result.final_score,
                "level": run.result.final_level,
                "anomalyCount": run.anomaly_records.len(),
            }),
        );
        if let Ok(line) = serde_json::to_string(&run.result) {
            println!("{line}");
        }
        results.push(run.result);
    }

    let summary = build_run_summary(run_started_at_ms, now_ms(), results, total_anomalies);
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                None,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
    }

    emit_log(
        "info",
        "run_finished",
        None,
        None,
        json!({
            "scenarioCount": summary.scenario_count,
            "anomalyCount": summary.anomaly_count,
            "bestScore": summary.best_score,
        }),
    );

    if summary.anomaly_count > 0 {
        std::process::exit(1);
    }
}

fn resolve_levels(path: Option<&Path>) -> LevelResult<Vec<LevelDescriptor>> {
    match path {
        Some(path) => load_levels(path),
        None => builtin_levels(),
    }
}

fn resolve_scenarios(cli: &Cli) -> Option<Vec<Scenario>> {
    let seed = cli.seed.unwrap_or_else(|| now_ms() as u32);
    let characters = match cli.character.as_deref() {
        Some(raw) => vec![Character::parse(raw)?],
        None => vec![Character::Classic, Character::Gunner, Character::Shield],
    };
    Some(
        characters
            .into_iter()
            .enumerate()
            .map(|(idx, character)| Scenario {
                name: format!("autopilot-{}", character.as_str()),
                character,
                seed: seed.wrapping_add(idx as u32),
                ticks: cli.ticks,
            })
            .collect(),
    )
}

fn run_scenario(
    scenario: &Scenario,
    levels: &[LevelDescriptor],
) -> LevelResult<ScenarioRunResult> {
    let mut engine = GameEngine::new(GameEngineOptions {
        seed: Some(scenario.seed),
        character: scenario.character,
        starting_lives: START_LIVES,
        start_paused: false,
        levels: levels.to_vec(),
    })?;
    let mut pilot = Rng::new(scenario.seed ^ 0x9e37_79b9);
    let mut anomalies = AnomalyLog::default();
    let mut result = ScenarioResultLine {
        scenario: scenario.name.clone(),
        seed: scenario.seed,
        character: scenario.character.as_str().to_string(),
        ..Default::default()
    };
    let mut life_score = 0u32;
    let dt = seconds_per_tick(TICK_MS);

    for _ in 0..scenario.ticks {
        steer(&mut engine, &mut pilot);
        engine.advance(dt);
        for message in collect_engine_anomalies(&engine) {
            anomalies.push(engine.tick(), message);
        }
        let snapshot = engine.build_snapshot(true);
        for message in collect_snapshot_anomalies(&snapshot, engine.starting_lives()) {
            anomalies.push(snapshot.tick, message);
        }

        let restarted = tally_events(&snapshot.events, &mut result);
        if restarted {
            life_score = snapshot.score;
        } else if snapshot.score < life_score {
            anomalies.push(
                snapshot.tick,
                format!("score decreased: {} -> {}", life_score, snapshot.score),
            );
        }
        life_score = snapshot.score;
    }

    result.ticks = engine.tick();
    result.final_score = engine.current_score();
    result.final_level = engine.level();
    result.lives_left = engine.lives_remaining();
    result.anomalies = anomalies.messages;
    Ok(ScenarioRunResult {
        result,
        anomaly_records: anomalies.records,
    })
}

fn steer(engine: &mut GameEngine, pilot: &mut Rng) {
    let stalled = engine.player().agent.direction == Direction::Stop;
    if stalled || pilot.next_f32() < TURN_CHANCE {
        if let Some(dir) = pilot.pick(&Direction::CARDINAL) {
            engine.set_input(dir);
        }
    }
    if pilot.next_f32() < ABILITY_CHANCE {
        engine.activate_ability();
    }
    if engine.player().ability.as_ref().is_some_and(|ability| ability.is_active()) {
        engine.fire_ability();
    }
}

fn tally_events(events: &[RuntimeEvent], result: &mut ScenarioResultLine) -> bool {
    let mut restarted = false;
    for event in events {
        match event {
            RuntimeEvent::PickupEaten { .. } => result.pickups_eaten += 1,
            RuntimeEvent::GhostEaten { .. } => result.ghosts_eaten += 1,
            RuntimeEvent::FruitEaten { .. } => result.fruits_eaten += 1,
            RuntimeEvent::LevelCleared { .. } => result.levels_cleared += 1,
            RuntimeEvent::PlayerDied { .. } => result.deaths += 1,
            RuntimeEvent::GameOver { .. } => result.game_overs += 1,
            RuntimeEvent::LevelStarted { level: 0, .. } => restarted = true,
            _ => {}
        }
    }
    restarted
}

fn collect_engine_anomalies(engine: &GameEngine) -> Vec<String> {
    let mut anomalies = Vec::new();
    let graph = engine.graph();
    let player = &engine.player().agent;
    if engine.player().alive && !player.on_segment(graph, SEGMENT_TOLERANCE) {
        anomalies.push(format!(
            "player off segment at ({:.1}, {:.1})",
            player.position.x, player.position.y
        ));
    }
    for ghost in engine.ghosts().iter() {
        if !ghost.agent.on_segment(graph, SEGMENT_TOLERANCE) {
            anomalies.push(format!(
                "{:?} off segment at ({:.1}, {:.1})",
                ghost.id(),
                ghost.agent.position.x,
                ghost.agent.position.y
            ));
        }
    }
    anomalies
}

fn collect_snapshot_anomalies(snapshot: &Snapshot, starting_lives: u32) -> Vec<String> {
    let mut anomalies = Vec::new();
    if !snapshot.player.x.is_finite() || !snapshot.player.y.is_finite() {
        anomalies.push("player position is not finite".to_string());
    }
    for ghost in &snapshot.ghosts {
        if !ghost.x.is_finite() || !ghost.y.is_finite() {
            anomalies.push(format!("{:?} position is not finite", ghost.id));
        }
    }
    if snapshot.lives > starting_lives {
        anomalies.push(format!(
            "lives out of range: {}/{}",
            snapshot.lives, starting_lives
        ));
    }
    if snapshot.ghosts.len() != 4 {
        anomalies.push(format!("unexpected ghost count: {}", snapshot.ghosts.len()));
    }
    anomalies
}

fn build_run_summary(
    started_at_ms: u64,
    finished_at_ms: u64,
    scenarios: Vec<ScenarioResultLine>,
    anomaly_count: usize,
) -> RunSummary {
    RunSummary {
        started_at_ms,
        finished_at_ms,
        scenario_count: scenarios.len(),
        anomaly_count,
        best_score: scenarios
            .iter()
            .map(|scenario| scenario.final_score)
            .max()
            .unwrap_or(0),
        scenarios,
    }
}

fn emit_log(level: &str, event: &str, seed: Option<u32>, tick: Option<u64>, details: Value) {
    let log_line = StructuredLogLine {
        ts: now_ms(),
        level: level.to_string(),
        event: event.to_string(),
        seed,
        tick,
        details,
    };
    if let Ok(line) = serde_json::to_string(&log_line) {
        eprintln!("{line}");
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, summary_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(character: Character, seed: u32, ticks: u64) -> Scenario {
        Scenario {
            name: "test".to_string(),
            character,
            seed,
            ticks,
        }
    }

    #[test]
    fn build_run_summary_reports_best_score() {
        let summary = build_run_summary(
            1,
            2,
            vec![
                ScenarioResultLine {
                    final_score: 120,
                    ..Default::default()
                },
                ScenarioResultLine {
                    final_score: 900,
                    ..Default::default()
                },
            ],
            0,
        );
        assert_eq!(summary.best_score, 900);
        assert_eq!(summary.scenario_count, 2);
    }

    #[test]
    fn resolve_scenarios_covers_every_character_by_default() {
        let cli = Cli::parse_from(["simulate", "--seed", "7", "--ticks", "10"]);
        let scenarios = resolve_scenarios(&cli).expect("scenarios");
        assert_eq!(scenarios.len(), 3);
        assert_eq!(scenarios[0].seed, 7);
        assert_eq!(scenarios[2].seed, 9);
        assert!(scenarios.iter().all(|scenario| scenario.ticks == 10));

        let cli = Cli::parse_from(["simulate", "--character", "gunner"]);
        let scenarios = resolve_scenarios(&cli).expect("scenarios");
        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].character, Character::Gunner);

        let cli = Cli::parse_from(["simulate", "--character", "wizard"]);
        assert!(resolve_scenarios(&cli).is_none());
    }

    #[test]
    fn autopilot_run_is_deterministic_and_clean() {
        let levels = builtin_levels().expect("builtin levels");
        let first = run_scenario(&scenario(Character::Gunner, 11, 900), &levels).expect("run");
        let second = run_scenario(&scenario(Character::Gunner, 11, 900), &levels).expect("run");
        assert_eq!(first.result.final_score, second.result.final_score);
        assert_eq!(first.result.pickups_eaten, second.result.pickups_eaten);
        assert_eq!(first.result.ticks, 900);
        assert!(first.anomaly_records.is_empty(), "{:?}", first.anomaly_records);
    }

    #[test]
    fn write_summary_returns_error_when_parent_does_not_exist() {
        let target = std::env::temp_dir()
            .join(format!("maze-chase-missing-{}", now_ms()))
            .join("summary.json");
        let summary = build_run_summary(1, 2, Vec::new(), 0);
        assert!(write_summary(&target, &summary).is_err());
    }

    #[test]
    fn anomaly_log_deduplicates_messages_but_keeps_records() {
        let mut log = AnomalyLog::default();
        log.push(10, "same anomaly".to_string());
        log.push(11, "same anomaly".to_string());
        assert_eq!(log.messages.len(), 1);
        assert_eq!(log.records.len(), 2);
        assert_eq!(log.records[1].tick, 11);
    }
}
