use std::env;
use std::fs;
use std::process;

use xform::{run, XformError};

/// `xform <input.xml> <transform.xform>` — a fixed two-argument CLI
/// surface, hand-rolled the way `petty`'s own root `src/main.rs` parses its
/// (also fixed, positional) argument list rather than reaching for `clap`.
fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <input.xml> <transform.xform>", args[0]);
        process::exit(1);
    }

    if let Err(err) = run_cli(&args[1], &args[2]) {
        eprintln!("{err}");
        process::exit(1);
    }
}

fn run_cli(xml_path: &str, module_path: &str) -> Result<(), XformError> {
    let xml_source = fs::read_to_string(xml_path)?;
    let module_source = fs::read_to_string(module_path)?;
    let output = run(&xml_source, &module_source)?;
    print!("{output}");
    Ok(())
}
