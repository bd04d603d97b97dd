// src/main.rs

use std::env;
use std::io::{self, Write};

use log::{info, warn};

use keyguard::catalog::Catalog;
use keyguard::config::EngineConfig;
use keyguard::execution::runtime::{format_header, format_row};
use keyguard::execution::{handle_statement, StatementOutcome};
use keyguard::sql::parser::parse_statement;

fn open_catalog() -> Catalog {
    let config = EngineConfig::from_env().unwrap_or_else(|e| {
        warn!("ignoring configuration: {}", e);
        EngineConfig::default()
    });
    match env::args().nth(1) {
        Some(path) => match Catalog::load_script(&path, config.clone()) {
            Ok(catalog) => {
                info!("Loaded {}", path);
                catalog
            }
            Err(e) => {
                warn!("Could not load {}: {}", path, e);
                Catalog::new(config)
            }
        },
        None => Catalog::new(config),
    }
}

fn main() -> io::Result<()> {
    env_logger::init();
    info!("keyguard {}. Type .exit to quit.", env!("CARGO_PKG_VERSION"));

    let mut catalog = open_catalog();

    loop {
        print!("keyguard> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break; // EOF
        }
        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case(".exit") {
            break;
        }
        if trimmed.eq_ignore_ascii_case(".memory") {
            println!("{} bytes", catalog.memory());
            continue;
        }
        if let Some(path) = trimmed.strip_prefix(".script ") {
            match catalog.save_script(path.trim()) {
                Ok(()) => println!("Script written to {}", path.trim()),
                Err(e) => println!("Error: {}", e),
            }
            continue;
        }

        let result = parse_statement(trimmed).and_then(|stmt| handle_statement(&mut catalog, stmt));
        match result {
            Ok(StatementOutcome::Done(msg)) => println!("{}", msg),
            Ok(StatementOutcome::Rows { header, rows }) => {
                println!("{}", format_header(&header));
                for row in &rows {
                    println!("{}", format_row(row));
                }
                println!("({} rows)", rows.len());
            }
            Ok(StatementOutcome::Exit) => break,
            Err(e) => println!("Error: {}", e),
        }
    }
    Ok(())
}
