use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use echostep_common::{EntityId, IVec2, Velocity};
use echostep_input::{ActionSet, EdgeTracker};
use echostep_kernel::prefab::spawn_point;
use echostep_kernel::{
    EntitySpec, LevelSpec, PlayerTuning, Session, SessionStatus, World, WorldConfig, WorldEvent, load_level,
};
use echostep_persist::{RecordingFile, RecordingStore, Trace};
use tracing_subscriber::EnvFilter;

mod script;

use script::InputScript;

#[derive(Parser)]
#[command(name = "echostep-cli", about = "Headless runner for echostep levels")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct WorldArgs {
    /// Level file (JSON)
    level: PathBuf,
    /// World configuration (YAML)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Player tuning (YAML); replaces the config's player section
    #[arg(long)]
    tuning: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a level file and report rejected entities
    Validate {
        /// Level file (JSON)
        level: PathBuf,
    },
    /// Run a level with its player entities driven by an input script
    Run {
        #[command(flatten)]
        world: WorldArgs,
        /// Input script (JSON list of button samples)
        #[arg(short, long)]
        script: Option<PathBuf>,
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "600")]
        ticks: u64,
        /// Save the live recording into this store directory
        #[arg(long)]
        record: Option<PathBuf>,
    },
    /// Play a level session: characters in start-block order, solved ones replaying
    Play {
        #[command(flatten)]
        world: WorldArgs,
        /// Input script (JSON list of button samples)
        #[arg(short, long)]
        script: Option<PathBuf>,
        /// Give up after this many ticks
        #[arg(short, long, default_value = "3600")]
        ticks: u64,
        /// Save every solved character's recording into this store directory
        #[arg(long)]
        record: Option<PathBuf>,
    },
    /// Replay a stored recording as a ghost in the level
    Replay {
        #[command(flatten)]
        world: WorldArgs,
        /// Store directory
        #[arg(long)]
        store: PathBuf,
        /// Recording index; defaults to the newest
        #[arg(long)]
        index: Option<u32>,
        /// Ticks to keep simulating after the recording ends
        #[arg(long, default_value = "0")]
        extra_ticks: u64,
    },
    /// Run twice and replay the recording, comparing trajectories
    Verify {
        #[command(flatten)]
        world: WorldArgs,
        /// Input script (JSON list of button samples)
        #[arg(short, long)]
        script: Option<PathBuf>,
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "600")]
        ticks: u64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Commands::Validate { level } => validate(&level),
        Commands::Run {
            world,
            script,
            ticks,
            record,
        } => {
            let (config, level) = load(&world)?;
            let script = load_script(script.as_deref())?;
            let mut run = live_run(config, &level, &script, ticks)?;
            report(&run.world);
            if let Some(dir) = record {
                let recording = run.world.take_recording().context("live run produced no recording")?;
                let file = RecordingFile::new(&level.level_id, run.player_id, recording);
                let index = RecordingStore::open(&dir)?.save(&file)?;
                println!("recorded: {} ticks as #{index} in {}", file.len(), dir.display());
            }
            Ok(())
        }
        Commands::Play {
            world,
            script,
            ticks,
            record,
        } => {
            let (config, level) = load(&world)?;
            let script = load_script(script.as_deref())?;
            play(config, level, &script, ticks, record.as_deref())
        }
        Commands::Replay {
            world,
            store,
            index,
            extra_ticks,
        } => {
            let (config, level) = load(&world)?;
            let store = RecordingStore::open(&store)?;
            store.verify_integrity()?;
            let index = index.unwrap_or(store.meta().recording_count);
            let file = store.load(index)?;
            if file.level_id != level.level_id {
                tracing::warn!(recorded = %file.level_id, level = %level.level_id, "recording is from another level");
            }
            let ticks = file.start_tick + file.len() as u64 + extra_ticks;
            let run = ghost_run(config, &level, &file, ticks)?;
            println!(
                "replayed #{index}: player_type={}, ticks={}",
                file.player_type,
                file.len()
            );
            report(&run.world);
            Ok(())
        }
        Commands::Verify { world, script, ticks } => {
            let (config, level) = load(&world)?;
            let script = load_script(script.as_deref())?;
            verify(config, &level, &script, ticks)
        }
    }
}

fn validate(path: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let loaded = load_level(&text)?;
    println!(
        "level {}: {} entities accepted, {} rejected",
        loaded.level.level_id,
        loaded.level.entities.len(),
        loaded.rejected.len()
    );
    for rejected in &loaded.rejected {
        println!("  entity #{}: {}", rejected.index, rejected.error);
    }
    if !loaded.rejected.is_empty() {
        bail!("{} invalid entities", loaded.rejected.len());
    }
    Ok(())
}

fn load(args: &WorldArgs) -> anyhow::Result<(WorldConfig, LevelSpec)> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => WorldConfig::default(),
    };
    if let Some(path) = &args.tuning {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        config.player = PlayerTuning::from_yaml_str(&text)?;
    }

    let text = std::fs::read_to_string(&args.level).with_context(|| format!("reading {}", args.level.display()))?;
    let loaded = load_level(&text)?;
    if !loaded.rejected.is_empty() {
        tracing::warn!(rejected = loaded.rejected.len(), "level has invalid entities");
    }
    Ok((config, loaded.level))
}

fn load_script(path: Option<&Path>) -> anyhow::Result<InputScript> {
    let Some(path) = path else {
        return Ok(InputScript::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    InputScript::parse(&text).with_context(|| format!("parsing {}", path.display()))
}

struct Run {
    world: World,
    trace: Trace,
    actor: EntityId,
    player_id: u32,
}

impl Run {
    fn path(&self) -> Vec<(IVec2, Velocity)> {
        self.trace.path_of(self.actor).map(|b| (b.pos, b.vel)).collect()
    }
}

fn live_run(config: WorldConfig, level: &LevelSpec, script: &InputScript, ticks: u64) -> anyhow::Result<Run> {
    let mut world = World::from_level(config, level)?;
    let actor = world.live_player().context("level has no player entity")?;
    let player_id = world.player(actor).map_or(0, |p| p.player_id);
    let mut input = EdgeTracker::new();
    let mut trace = Trace::new();
    for i in 0..ticks {
        world.step(&input.sample(script.sample(i as usize)));
        trace.capture(&world);
    }
    Ok(Run {
        world,
        trace,
        actor,
        player_id,
    })
}

/// Where a character of `player_id` enters the level: its player entity, else
/// its start block.
fn entry_point(level: &LevelSpec, player_id: u32) -> Option<(IVec2, i32)> {
    let player = level.entities.iter().find_map(|spec| match spec {
        EntitySpec::Player { x, y, player_id: p } if *p == player_id => Some((IVec2::new(*x, *y), 1)),
        _ => None,
    });
    player.or_else(|| {
        level.entities.iter().find_map(|spec| match spec {
            EntitySpec::StartBlock { player_id: p, x_dir, .. } if *p == player_id => {
                spec.rect().map(|r| (spawn_point(r), *x_dir))
            }
            _ => None,
        })
    })
}

fn ghost_run(config: WorldConfig, level: &LevelSpec, file: &RecordingFile, ticks: u64) -> anyhow::Result<Run> {
    let (origin, x_dir) =
        entry_point(level, file.player_type).with_context(|| format!("no entry point for player {}", file.player_type))?;
    let specs = level.entities.iter().filter(|s| !s.is_player());
    let mut world = World::from_specs(config, specs)?;
    let actor = world.spawn_playback(origin, file.player_type, x_dir, file.to_recording())?;
    let mut trace = Trace::new();
    for _ in 0..ticks {
        world.step(&ActionSet::IDLE);
        trace.capture(&world);
    }
    Ok(Run {
        world,
        trace,
        actor,
        player_id: file.player_type,
    })
}

fn play(
    config: WorldConfig,
    level: LevelSpec,
    script: &InputScript,
    ticks: u64,
    record: Option<&Path>,
) -> anyhow::Result<()> {
    let level_id = level.level_id.clone();
    let mut session = Session::new(config, level)?;
    let mut input = EdgeTracker::new();
    let mut cursor = 0usize;
    let mut status = SessionStatus::Running;
    for _ in 0..ticks {
        status = session.step(&input.sample(script.sample(cursor)))?;
        cursor += 1;
        match status {
            SessionStatus::Running => continue,
            SessionStatus::CharacterSolved { player_id } => println!("player {player_id} solved"),
            SessionStatus::Restarted { player_id } => println!("player {player_id} died; attempt restarted"),
            SessionStatus::Complete => break,
        }
    }
    println!(
        "session {level_id}: {}/{} solved, {} attempts",
        session.recordings().len(),
        session.characters().len(),
        session.attempts()
    );
    if let Some(dir) = record {
        let mut store = RecordingStore::open(dir)?;
        for (character, recording) in session.characters().iter().zip(session.recordings()) {
            let index = store.save(&RecordingFile::new(&level_id, character.player_id, recording.clone()))?;
            println!("recorded player {} as #{index}", character.player_id);
        }
    }
    if status != SessionStatus::Complete {
        bail!("level not completed within {ticks} ticks");
    }
    Ok(())
}

fn verify(config: WorldConfig, level: &LevelSpec, script: &InputScript, ticks: u64) -> anyhow::Result<()> {
    let mut first = live_run(config.clone(), level, script, ticks)?;
    let second = live_run(config.clone(), level, script, ticks)?;
    if let Some(divergence) = first.trace.first_divergence(&second.trace) {
        bail!("live runs diverged: {divergence:?}");
    }
    println!("live runs: {} ticks, digest {:#018x}", first.trace.len(), first.trace.digest());

    let recording = first.world.take_recording().context("live run produced no recording")?;
    let file = RecordingFile::new(&level.level_id, first.player_id, recording);
    let ghost = ghost_run(config, level, &file, ticks)?;
    let (live_path, ghost_path) = (first.path(), ghost.path());
    if let Some(tick) = live_path.iter().zip(&ghost_path).position(|(a, b)| a != b) {
        bail!("replay diverged at tick {tick}: live {:?}, replay {:?}", live_path[tick], ghost_path[tick]);
    }
    if live_path.len() != ghost_path.len() {
        bail!("replay tracked {} ticks, live {}", ghost_path.len(), live_path.len());
    }
    println!("replay: matches live run over {} ticks", live_path.len());
    Ok(())
}

fn report(world: &World) {
    println!("tick={} entities={} hash={:#018x}", world.tick(), world.entity_count(), world.state_hash());
    for id in world.players() {
        if let (Some(entity), Some(player)) = (world.entity(id), world.player(id)) {
            let px = entity.pixel_pos();
            println!(
                "  player {} ({id}): pixel=({}, {}) vel=({}, {}) live={}",
                player.player_id,
                px.x,
                px.y,
                entity.vel.x,
                entity.vel.y,
                player.is_live()
            );
        }
    }
    let mut failures = 0;
    for event in world.events() {
        match event {
            WorldEvent::ResolveFailed { .. } => failures += 1,
            WorldEvent::ActorSatisfiedEnd { actor, end, player_id } => {
                println!("  {actor} (player {player_id}) reached end {end}")
            }
            WorldEvent::ActorKilled { actor, by } => println!("  {actor} killed by {by}"),
            WorldEvent::PlaybackFinished { actor } => println!("  {actor} finished playback"),
            _ => {}
        }
    }
    if failures > 0 {
        println!("  resolver failures: {failures}");
    }
}
