// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
use std::error::Error;
use std::fs;

use clap::{arg, Arg, ArgMatches, Command};
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
//
use tcldec::{decompile, decompile_steps, AuxEntry, Bytecode, OpcodeTable};

fn main() -> Result<(), Box<dyn Error>> {
    // Parse command-line arguments
    let matches = Command::new("tcldec")
        .about("Tcl Bytecode Decompiler")
        .version("0.1.0")
        .subcommand_required(true)
        .arg(arg!(--verbose "Show verbose output"))
        .subcommand(
            Command::new("decompile")
                .about("Decompile a procedure dump into source text")
                .arg(Arg::new("file").required(true))
                .visible_alias("d"),
        )
        .subcommand(
            Command::new("steps")
                .about("Show every intermediate step of a decompilation")
                .arg(Arg::new("file").required(true))
                .visible_alias("s"),
        )
        .get_matches();
    // Extract top-level flags
    let verbose = matches.is_present("verbose");
    // Initialise logging
    if verbose {
        init_logging(LevelFilter::Debug);
    }
    // Dispatch on outcome
    let ok = match matches.subcommand() {
        Some(("decompile", args)) => run_decompile(args),
        Some(("steps", args)) => run_steps(args),
        _ => unreachable!(),
    }?;
    // Determine appropriate exit code
    let exitcode = if ok { 0 } else { 1 };
    // Done
    std::process::exit(exitcode);
}

/// Decompile a given procedure dump.
fn run_decompile(args: &ArgMatches) -> Result<bool, Box<dyn Error>> {
    let filename = args.get_one::<String>("file").unwrap();
    // Read and parse the dump
    let input = fs::read_to_string(filename)?;
    let bytecode = parse_dump(&input)?;
    // Decompile against the stock instruction table
    let table = OpcodeTable::standard();
    let source = decompile(&bytecode, &table)?;
    // Print the reconstructed source
    print!("{}", source);
    //
    Ok(true)
}

/// Decompile a given procedure dump, printing every intermediate
/// snapshot along with the recorded changes.
fn run_steps(args: &ArgMatches) -> Result<bool, Box<dyn Error>> {
    let filename = args.get_one::<String>("file").unwrap();
    // Read and parse the dump
    let input = fs::read_to_string(filename)?;
    let bytecode = parse_dump(&input)?;
    //
    let table = OpcodeTable::standard();
    let (steps, changes) = decompile_steps(&bytecode, &table)?;
    for (i, step) in steps.iter().enumerate() {
        println!("=== step {}", i);
        for (j, block) in step.iter().enumerate() {
            println!("--- block {}", j);
            for line in block {
                println!("{}", line);
            }
        }
    }
    println!("=== {} changes", changes.len());
    for c in &changes {
        println!(
            "{}.{}.{:?} -> {}.{}.{:?}",
            c.from.step, c.from.block, c.from.range, c.to.step, c.to.block, c.to.range
        );
    }
    //
    Ok(true)
}

/// Parse the line-oriented procedure dump format.  Each line is one
/// of `code: <hex>`, `literal: <text>`, `local: <name>` or `aux:
/// <tag> <payload>`; blank lines and `#` comments are skipped.
/// Multiple `code:` lines accumulate.
fn parse_dump(input: &str) -> Result<Bytecode, Box<dyn Error>> {
    let mut code = Vec::new();
    let mut literals = Vec::new();
    let mut locals = Vec::new();
    let mut auxes = Vec::new();
    //
    for (n, line) in input.lines().enumerate() {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, rest) = match line.split_once(':') {
            Some(kv) => kv,
            None => {
                return Err(format!("line {}: expected `key: value`", n + 1).into());
            }
        };
        let rest = rest.strip_prefix(' ').unwrap_or(rest);
        match key.trim() {
            "code" => {
                let hex: String = rest.chars().filter(|c| !c.is_whitespace()).collect();
                if hex.len() % 2 != 0 {
                    return Err(format!("line {}: odd-length hex string", n + 1).into());
                }
                for k in (0..hex.len()).step_by(2) {
                    code.push(u8::from_str_radix(&hex[k..k + 2], 16)?);
                }
            }
            "literal" => {
                literals.push(unescape(rest));
            }
            "local" => {
                locals.push(rest.trim().to_string());
            }
            "aux" => {
                let (tag, payload) = rest.split_once(' ').unwrap_or((rest, ""));
                if tag == "ForeachInfo" {
                    // Lists separated by `;`, indices by whitespace.
                    let mut lists = Vec::new();
                    for part in payload.split(';') {
                        let part = part.trim();
                        if part.is_empty() {
                            continue;
                        }
                        let mut list = Vec::new();
                        for v in part.split_whitespace() {
                            list.push(v.parse::<usize>()?);
                        }
                        lists.push(list);
                    }
                    auxes.push(AuxEntry::Foreach(lists));
                } else {
                    auxes.push(AuxEntry::Unknown(tag.to_string()));
                }
            }
            _ => {
                return Err(format!("line {}: unknown key `{}`", n + 1, key).into());
            }
        }
    }
    // Done
    Ok(Bytecode::new(code, literals, locals, auxes))
}

/// Decode the escapes the dump format allows in literal lines.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some(c) => out.push(c),
            None => out.push('\\'),
        }
    }
    out
}

/// Initialise logging using a suitable pattern.
pub fn init_logging(level: LevelFilter) {
    let encoder = PatternEncoder::new("[{l}] {m}{n}");
    //
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(encoder))
        .build();
    //
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))
        .unwrap();
    //
    let _handle = log4rs::init_config(config).unwrap();
}
