use anyhow::{Context, Result, anyhow};
use pico_args::Arguments;
use std::{env, fs, io::BufReader, path::PathBuf};

use stackctl::config::{Profile, ProfileStore};
use stackctl::layout::LayoutComputer;
use stackctl::pipeline::{self, LiveOptions};
use stackctl::replay;
use stackctl::{CardStackEngine, SlotId};

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // No args -> general help
    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    if pargs.contains("-h") || pargs.contains("--help") {
        print_help();
        return Ok(());
    }

    // First free arg is the subcommand
    let subcmd: Option<String> = pargs.free_from_str().ok();

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.free_from_str().ok();
            match topic {
                Some(t) => print_subcmd_help(&t),
                None => print_help(),
            }
            Ok(())
        }

        Some("live") => {
            let device: Option<PathBuf> = pargs.opt_value_from_str("--device")?;
            let count: usize = pargs.opt_value_from_str("--slots")?.unwrap_or(5);
            let mut store = ProfileStore::load_or_install_default()?;
            pipeline::run_live(
                &mut store,
                LiveOptions {
                    device,
                    slots: slot_ids(count),
                },
            )
        }

        Some("replay") => {
            let count: usize = pargs.opt_value_from_str("--slots")?.unwrap_or(5);
            let profile_path: Option<PathBuf> = pargs.opt_value_from_str("--profile")?;
            let carousels: Vec<String> = pargs.values_from_str("--carousel")?;
            let trace_path: PathBuf = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: stackctl replay <trace.jsonl> [--slots N]"))?;

            let profile = match profile_path {
                Some(p) => {
                    let txt = fs::read_to_string(&p)
                        .with_context(|| format!("failed to read {}", p.display()))?;
                    Profile::from_toml(&txt, &p)?
                }
                None => ProfileStore::load_or_install_default()?.profile,
            };

            let mut engine = CardStackEngine::new(profile, slot_ids(count));
            for arg in carousels {
                let (slot, items) = parse_carousel(&arg)?;
                engine.set_items(slot, items);
            }

            let file = fs::File::open(&trace_path)
                .with_context(|| format!("failed to open {}", trace_path.display()))?;
            let trace = replay::parse_trace(BufReader::new(file))?;
            for line in replay::replay(&mut engine, &trace) {
                println!("{}", serde_json::to_string(&line)?);
            }
            Ok(())
        }

        Some("layout") => {
            let usage = "usage: stackctl layout <count> <slot_height> [active]";
            let count: usize = pargs.free_from_str().map_err(|_| anyhow!(usage))?;
            let height: f32 = pargs.free_from_str().map_err(|_| anyhow!(usage))?;
            let active: Option<usize> = pargs.opt_free_from_str()?;
            let expanded = ProfileStore::load_or_install_default()
                .map(|s| s.profile.layout.expanded_height)
                .unwrap_or(stackctl::layout::DEFAULT_EXPANDED_HEIGHT);
            let layout = LayoutComputer::new(height, expanded).compute(count, active);
            print_response(&serde_json::to_value(layout)?);
            Ok(())
        }

        Some("use") => {
            let name: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: stackctl use <profile_name>"))?;
            let mut store = ProfileStore::load_or_install_default()?;
            store.set_active(&name)?;
            println!("ok: active profile '{}'", store.active_name);
            Ok(())
        }

        Some("list") => {
            let store = ProfileStore::load_or_install_default()?;
            for p in store.list_profiles() {
                let mark = if p == store.active_name { "*" } else { " " };
                println!("{mark} {p}");
            }
            Ok(())
        }

        Some("doctor") => {
            let store = ProfileStore::load_or_install_default()?;
            print_response(&store.doctor_report());
            Ok(())
        }

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

fn slot_ids(count: usize) -> Vec<SlotId> {
    (0..count).map(|i| SlotId(format!("slot-{i}"))).collect()
}

/// `SLOT=COUNT`, e.g. `slot-2=3`.
fn parse_carousel(arg: &str) -> Result<(SlotId, Vec<String>)> {
    let (slot, count) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("--carousel expects SLOT=COUNT, got '{arg}'"))?;
    let count: usize = count
        .trim()
        .parse()
        .with_context(|| format!("bad item count in '{arg}'"))?;
    let slot = SlotId::from(slot.trim());
    let items = (0..count).map(|i| format!("{slot}/item-{i}")).collect();
    Ok((slot, items))
}

fn print_help() {
    println!(
        r#"stackctl: touch gestures for stacked cards

USAGE:
  stackctl help [command]                       Show general or command-specific help
  stackctl live [--device PATH] [--slots N]     Drive a card stack from a touchscreen
  stackctl replay <trace.jsonl> [options]       Replay a recorded contact trace
  stackctl layout <count> <slot_height> [active] Print slot offsets
  stackctl use <name>                           Switch active profile
  stackctl list                                 List profiles
  stackctl doctor                               Diagnose permissions/devices

TIPS:
  - Profiles: ~/.config/stackctl/profiles
  - Active profile pointer: ~/.config/stackctl/active
  - RUST_LOG=debug shows every classified gesture
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "live" => println!(
            "usage: stackctl live [--device PATH] [--slots N]\nReads a multitouch device and logs stack navigation. Reloads the profile when it changes."
        ),
        "replay" => println!(
            "usage: stackctl replay <trace.jsonl> [--slots N] [--profile PATH] [--carousel SLOT=COUNT]...\nPrints one JSON line per contact that produced a gesture or callback."
        ),
        "layout" => println!(
            "usage: stackctl layout <count> <slot_height> [active]\nPrints offset, shift and z-order of every slot."
        ),
        "use" => {
            println!("usage: stackctl use <name>\nSwitches active profile to <name>.")
        }
        "list" => {
            println!("usage: stackctl list\nLists available profiles; marks active with '*'.")
        }
        "doctor" => println!(
            "usage: stackctl doctor\nChecks permissions and lists detected multitouch devices."
        ),
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}

fn print_response(v: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(v).unwrap_or_default());
}
