// src/main.rs
//
// Small demo driver: a thin permalloy-like film relaxing/precessing in a weak
// applied field, optionally driven by an in-plane current. Prints the sampled
// table as CSV on stdout. Set RUST_LOG=info (or debug) for solver logging.
//
// Examples:
//
//   cargo run --release -- steps=500
//   cargo run --release -- demag=off alpha=0.1 steps=2000
//   cargo run --release -- j=5e11 steps=1000
//   cargo run --release -- config=film.json time=1e-9

use std::env;
use std::fs;
use std::str::FromStr;

use llg_engine::config::{FieldConfig, GeometryConfig, MaterialConfig, RunConfig, SolverConfig};
use llg_engine::{Engine, QuantityId, Result};

fn print_usage() {
    eprintln!(
        r#"Usage:
  cargo run -- [config=FILE.json] [steps=N | time=SECONDS] [save=SECONDS]
             [demag=on|off] [alpha=VAL] [j=JX[,JY,JZ]] [b=BX,BY,BZ]
             [maxerr=VAL]

Notes:
  - Without config=, a 64 x 64 x 1 film of 4 nm cells is simulated.
  - A table row (t, <m>, <B_eff>, <torque>) is written every `save` seconds
    of simulation time (default 1e-12); rows go to stdout as CSV.
"#
    );
}

fn default_config() -> RunConfig {
    RunConfig {
        geometry: GeometryConfig {
            nx: 64,
            ny: 64,
            nz: 1,
            dx: 4e-9,
            dy: 4e-9,
            dz: 2e-9,
        },
        material: MaterialConfig {
            ms: 8.0e5,
            aex: 13e-12,
            alpha: 0.02,
            ku1: 0.0,
            easy_axis: [0.0, 0.0, 1.0],
            dmi: 0.0,
            xi: 0.05,
            spin_pol: 1.0,
        },
        fields: FieldConfig {
            b_ext: [0.01, 1e-4, 0.0],
            j: [0.0; 3],
            demag: true,
        },
        solver: SolverConfig::default(),
    }
}

/// Parse `v`, or print a warning naming `key` and return `None`.
fn parse_or_warn<T: FromStr>(key: &str, v: &str) -> Option<T> {
    match v.trim().parse::<T>() {
        Ok(val) => Some(val),
        Err(_) => {
            eprintln!("Warning: could not parse {key} value '{v}', ignoring");
            None
        }
    }
}

fn parse_vec3(v: &str) -> Option<[f64; 3]> {
    let parts: Vec<f64> = v
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    match parts.as_slice() {
        [x] => Some([*x, 0.0, 0.0]),
        [x, y, z] => Some([*x, *y, *z]),
        _ => None,
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let mut cfg = default_config();
    let mut steps: Option<usize> = None;
    let mut duration: Option<f64> = None;
    let mut save_period: f64 = 1e-12;

    for arg in env::args().skip(1) {
        if arg == "-h" || arg == "--help" || arg == "help" {
            print_usage();
            return Ok(());
        }
        if let Some(v) = arg.strip_prefix("config=") {
            cfg = RunConfig::from_json(&fs::read_to_string(v)?)?;
            continue;
        }
        if let Some(v) = arg.strip_prefix("steps=") {
            if let Some(n) = parse_or_warn("steps", v) {
                steps = Some(n);
            }
            continue;
        }
        if let Some(v) = arg.strip_prefix("time=") {
            if let Some(d) = parse_or_warn("time", v) {
                duration = Some(d);
            }
            continue;
        }
        if let Some(v) = arg.strip_prefix("save=") {
            if let Some(p) = parse_or_warn("save", v) {
                save_period = p;
            }
            continue;
        }
        if let Some(v) = arg.strip_prefix("demag=") {
            let v = v.trim();
            if v.eq_ignore_ascii_case("on") || v == "1" || v.eq_ignore_ascii_case("true") {
                cfg.fields.demag = true;
            } else if v.eq_ignore_ascii_case("off") || v == "0" || v.eq_ignore_ascii_case("false") {
                cfg.fields.demag = false;
            } else {
                eprintln!("Warning: could not parse demag value '{v}', expected on/off/1/0");
            }
            continue;
        }
        if let Some(v) = arg.strip_prefix("alpha=") {
            if let Some(a) = parse_or_warn("alpha", v) {
                cfg.material.alpha = a;
            }
            continue;
        }
        if let Some(v) = arg.strip_prefix("j=") {
            match parse_vec3(v) {
                Some(j) => cfg.fields.j = j,
                None => eprintln!("Warning: could not parse current density '{v}', ignoring"),
            }
            continue;
        }
        if let Some(v) = arg.strip_prefix("b=") {
            match parse_vec3(v) {
                Some(b) => cfg.fields.b_ext = b,
                None => eprintln!("Warning: could not parse field '{v}', ignoring"),
            }
            continue;
        }
        if let Some(v) = arg.strip_prefix("maxerr=") {
            if let Some(e) = parse_or_warn("maxerr", v) {
                cfg.solver.max_err = e;
            }
            continue;
        }
        eprintln!("Warning: unrecognised argument '{arg}'");
    }

    let mut engine = Engine::from_config(&cfg)?;
    engine.set_m_uniform([1.0, 0.1, 0.0]);

    let table = engine.table_mut();
    table.add(QuantityId::BEff)?;
    table.add(QuantityId::Torque)?;
    table.autosave(save_period)?;

    match (steps, duration) {
        (_, Some(d)) => engine.run(d)?,
        (Some(n), None) => engine.steps(n)?,
        (None, None) => engine.steps(200)?,
    }
    engine.table_save()?;

    let table = engine.table();
    let mut header = vec!["t".to_string()];
    for id in table.columns() {
        let name = id.name();
        header.extend(["x", "y", "z"].iter().map(|c| format!("{name}{c}")));
    }
    println!("{}", header.join(","));
    for row in table.rows() {
        let mut line = format!("{:.9e}", row.t);
        for v in &row.values {
            line.push_str(&format!(",{:.9e},{:.9e},{:.9e}", v[0], v[1], v[2]));
        }
        println!("{line}");
    }

    eprintln!(
        "t = {:.6e} s, {} accepted / {} rejected steps, final dt = {:.3e} s",
        engine.time(),
        engine.accepted_steps(),
        engine.rejected_steps(),
        engine.dt()
    );
    Ok(())
}
