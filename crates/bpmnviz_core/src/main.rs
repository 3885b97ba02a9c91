use std::env;
use std::fs;
use std::io::Read;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use bpmnviz_core::{LayoutOptions, convert};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args().skip(1);
    let input = match args.next() {
        Some(path) => path,
        None => {
            eprintln!("Usage: bpmnviz <input.json|-> [output.bpmn]");
            return ExitCode::FAILURE;
        }
    };
    let output = args.next();

    let json = if input == "-" {
        let mut buffer = String::new();
        match std::io::stdin().read_to_string(&mut buffer) {
            Ok(_) => buffer,
            Err(error) => {
                eprintln!("error: cannot read stdin: {error}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        match fs::read_to_string(&input) {
            Ok(content) => content,
            Err(error) => {
                eprintln!("error: cannot read {input}: {error}");
                return ExitCode::FAILURE;
            }
        }
    };

    let xml = match convert(&json, LayoutOptions::default()) {
        Ok(xml) => xml,
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::FAILURE;
        }
    };

    match output {
        Some(path) => {
            if let Err(error) = fs::write(&path, xml) {
                eprintln!("error: cannot write {path}: {error}");
                return ExitCode::FAILURE;
            }
        }
        None => print!("{xml}"),
    }
    ExitCode::SUCCESS
}
