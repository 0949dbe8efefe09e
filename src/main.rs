use dispatchrail::blocks::BlockStore;
use dispatchrail::codec::{BLOCK_RECORD_LEN, TURNOUT_RECORD_LEN};
use dispatchrail::layout::{self, Layout};
use dispatchrail::plan::{self, DispatchLog};
use dispatchrail::record::{MemoryStore, RecordStore};
use dispatchrail::scheduler::{ModeController, RunState, Scheduler};
use dispatchrail::sim::{DispatchQueue, SessionMode, Simulation};
use dispatchrail::turnouts::TurnoutStore;
use log::*;

use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "dispatchrail", about = "Model railway dispatcher.")]
struct Opt {
    /// Layout description (JSON)
    #[structopt(name = "FILE")]
    #[structopt(parse(from_os_str))]
    file: PathBuf,

    /// Write the dispatch log as JSON.
    #[structopt(short)]
    #[structopt(parse(from_os_str))]
    planoutputfile: Option<PathBuf>,

    /// Activate debug mode
    #[structopt(short, long)]
    verbose: bool,

    /// Number of scheduler ticks to run.
    #[structopt(long, default_value = "200")]
    ticks: usize,

    /// Tick at which trains are asked to stop.
    #[structopt(long)]
    stop_at: Option<usize>,

    /// Park mode: when stopping, trains head for parking sidings first.
    #[structopt(long)]
    park: bool,

    /// Keep block and turnout records in this directory instead of memory.
    /// Train locations carry over between runs.
    #[structopt(long)]
    #[structopt(parse(from_os_str))]
    storage: Option<PathBuf>,
}

fn run<B: RecordStore, T: RecordStore>(
    opt: &Opt,
    layout: &Layout,
    blocks: BlockStore<B>,
    turnouts: TurnoutStore<T>,
) -> dispatchrail::Result<DispatchLog> {
    let mut scheduler = Scheduler::new(
        &layout.catalog,
        &layout.threats,
        blocks,
        turnouts,
        DispatchQueue::default(),
    );
    let mut sim = Simulation::start_session(&mut scheduler, layout)?;
    let mut mode = SessionMode::new(opt.park, opt.stop_at);
    let mut log = DispatchLog::default();

    for tick in 0..opt.ticks {
        mode.advance(tick);
        let report = scheduler.tick(&sim, &mut mode)?;
        if !report.waiting.is_empty() {
            trace!("Tick {}: trains {:?} found no route", tick, report.waiting);
        }
        log.record(tick, &report);
        for (train, route, kind) in scheduler.execution_mut().drain() {
            sim.accept(train, &route, kind);
        }
        sim.advance(&mut scheduler)?;

        if mode.state() == RunState::Stopped {
            info!("Stopped after {} ticks", tick + 1);
            break;
        }
    }

    sim.finish(&mut scheduler)?;
    for spec in layout.trains.iter() {
        if let Some((block, direction)) = sim.location(spec.profile.id) {
            info!("Train {} ends in block {} heading {:?}", spec.profile.id, block, direction);
        }
    }
    Ok(log)
}

fn main() {
    let _h1 = hprof::enter("init");

    let opt = Opt::from_args();
    let level = if opt.verbose {
        if cfg!(debug_assertions) {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    } else {
        LevelFilter::Error
    };
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .init()
        .unwrap();
    info!("{:#?}", opt);

    let layout = {
        let _h = hprof::enter("load layout");
        match layout::load(&opt.file) {
            Ok(layout) => layout,
            Err(e) => {
                error!("{}", e);
                std::process::exit(2);
            }
        }
    };
    drop(_h1);

    let n_blocks = layout.blocks.len();
    let n_turnouts = layout.turnouts as usize;
    let _h = hprof::enter("dispatch");
    let result = match opt.storage.as_ref() {
        Some(dir) => {
            std::fs::create_dir_all(dir).unwrap();
            BlockStore::attach_file(&dir.join("blocks.rec"), &layout.blocks)
                .and_then(|b| {
                    TurnoutStore::attach_file(&dir.join("turnouts.rec"), layout.turnouts).map(|t| (b, t))
                })
                .and_then(|(b, t)| run(&opt, &layout, b, t))
        }
        None => BlockStore::provision(MemoryStore::new(n_blocks * BLOCK_RECORD_LEN), &layout.blocks)
            .and_then(|b| {
                TurnoutStore::provision(MemoryStore::new(n_turnouts * TURNOUT_RECORD_LEN), layout.turnouts)
                    .map(|t| (b, t))
            })
            .and_then(|(b, t)| run(&opt, &layout, b, t)),
    };
    drop(_h);

    match result {
        Ok(log) => {
            let (summary, commands) = plan::print_log(&log);
            info!("{} assignments.", log.steps.len());
            debug!("Summary:\n{}", summary);
            debug!("Commands:\n{}", commands);
            if let Some(f) = opt.planoutputfile.as_ref() {
                plan::write_log_json(f, &log).unwrap();
                info!("Wrote dispatch log to file {}", f.to_str().unwrap());
            }
        }
        Err(e) if e.is_invariant_violation() => {
            error!("Halting on {}", e);
            std::process::exit(3);
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }

    hprof::end_frame();
    hprof::profiler().print_timing();
}
