use ChemBalancer::balancer::EquationBalancer;
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use std::env;

fn main() {
    TermLogger::init(
        LevelFilter::Warn,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .ok();

    let args: Vec<String> = env::args().skip(1).collect();
    let json = args.iter().any(|arg| arg == "--json");
    let equation = args
        .iter()
        .filter(|arg| !arg.starts_with("--"))
        .cloned()
        .collect::<Vec<String>>()
        .join(" ");

    if equation.trim().is_empty() {
        println!("usage: ChemBalancer \"<equation>\" [--json]");
        println!("example: ChemBalancer \"C3H8 + O2 -> CO2 + H2O\"");
        return;
    }

    match EquationBalancer::balance(&equation) {
        Some(balancer) => {
            if json {
                match serde_json::to_string_pretty(&balancer.balanced) {
                    Ok(out) => println!("{}", out),
                    Err(e) => println!("serialization failed: {}", e),
                }
            } else {
                if let Some(line) = balancer.balanced_str() {
                    println!("{}", line);
                }
                balancer.pretty_print_balance();
            }
        }
        None => println!("no suggestion"),
    }
}
