//! Interactive REPL for the tensor logic engine.

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::env;
use tensor_logic::{
    detect_contradiction, load_into, ops, propagate_confidence, InferenceEngine, Operation,
    Result, Rule, RuleFile,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let args: Vec<String> = env::args().collect();
    let mut engine = InferenceEngine::new();

    // If a rule file argument is provided, load it and saturate the store
    if args.len() > 1 {
        let file_path = &args[1];
        let file = RuleFile::parse_file(file_path)?;
        let summary = load_into(&file, &mut engine)?;
        println!(
            "Loaded {}: {} facts, {} rules (namespace '{}')",
            file_path, summary.facts_loaded, summary.rules_loaded, summary.namespace
        );

        let mut passes = 0;
        loop {
            let derived = engine.forward_chain(Some(&summary.namespace));
            if derived.is_empty() {
                break;
            }
            passes += 1;
            for (name, tensor) in &derived {
                println!("  derived {} = {}", name, ops::display(tensor));
            }
        }
        println!("Saturated in {} pass(es)", passes);

        if args.len() > 2 && args[2] == "--repl" {
            return run_repl(engine);
        }
        return Ok(());
    }

    println!("tensor-logic v0.1.0 - weighted-relation inference engine");
    println!("Type :help for commands, :quit to exit\n");

    run_repl(engine)
}

fn run_repl(mut engine: InferenceEngine) -> Result<()> {
    let mut rl = DefaultEditor::new().expect("Failed to create editor");

    loop {
        let readline = rl.readline("tl> ");

        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(trimmed);

                if !handle_command(trimmed, &mut engine) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Bye!");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}

/// Handle a REPL command. Returns false if the REPL should exit.
fn handle_command(cmd: &str, engine: &mut InferenceEngine) -> bool {
    let parts: Vec<&str> = cmd.split_whitespace().collect();
    let command = parts[0];

    match command {
        ":quit" | ":q" | ":exit" => {
            println!("Bye!");
            return false;
        }

        ":help" | ":h" | ":?" => {
            print_help();
        }

        ":load" | ":l" => {
            if parts.len() < 2 {
                println!("Usage: :load <file.yaml>");
            } else {
                match RuleFile::parse_file(parts[1]).and_then(|f| load_into(&f, engine)) {
                    Ok(summary) => println!(
                        "Loaded {} facts, {} rules into namespace '{}'",
                        summary.facts_loaded, summary.rules_loaded, summary.namespace
                    ),
                    Err(e) => println!("Error: {}", e),
                }
            }
        }

        ":fact" => {
            // :fact Name v1 [v2 ...] -> vector fact
            if parts.len() < 3 {
                println!("Usage: :fact <name> <v1> [v2 ...]");
            } else {
                match parse_floats(&parts[2..]) {
                    Ok(values) => match ops::vector(&values) {
                        Ok(t) => {
                            engine.add_fact(parts[1], t);
                            println!("Fact {} = {:?}", parts[1], values);
                        }
                        Err(e) => println!("Error: {}", e),
                    },
                    Err(e) => println!("Invalid value: {}", e),
                }
            }
        }

        ":matrix" => {
            // :matrix Name rows cols v1 v2 ... (row-major)
            if parts.len() < 5 {
                println!("Usage: :matrix <name> <rows> <cols> <values...>");
            } else {
                let dims: std::result::Result<Vec<usize>, _> =
                    parts[2..4].iter().map(|s| s.parse()).collect();
                match (dims, parse_floats(&parts[4..])) {
                    (Ok(d), Ok(values)) => match ops::matrix(d[0], d[1], &values) {
                        Ok(t) => {
                            engine.add_fact(parts[1], t);
                            println!("Fact {} = {}x{} matrix", parts[1], d[0], d[1]);
                        }
                        Err(e) => println!("Error: {}", e),
                    },
                    (Err(e), _) => println!("Invalid dimensions: {}", e),
                    (_, Err(e)) => println!("Invalid value: {}", e),
                }
            }
        }

        ":rule" => {
            // :rule Name OPERATION in1 in2 out [namespace]
            if parts.len() < 6 {
                println!("Usage: :rule <name> <MODUS_PONENS|CONJUNCTION|DISJUNCTION|CHAIN> <in1> <in2> <out> [ns]");
            } else {
                let built = parts[2].parse::<Operation>().and_then(|op| {
                    Rule::builder()
                        .namespace(parts.get(6).copied().unwrap_or(""))
                        .inputs([parts[3], parts[4]])
                        .output(parts[5])
                        .operation(op)
                        .build()
                });
                match built {
                    Ok(rule) => {
                        println!(
                            "Rule {}: {:?} -> {} ({})",
                            parts[1],
                            rule.inputs(),
                            rule.output(),
                            rule.namespace()
                        );
                        engine.add_rule(parts[1], rule);
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
        }

        ":forward" | ":f" => {
            let namespace = parts.get(1).copied();
            let derived = engine.forward_chain(namespace);
            if derived.is_empty() {
                println!("No new facts derived");
            } else {
                for (name, tensor) in &derived {
                    println!("  {} = {}", name, ops::display(tensor));
                }
            }
        }

        ":prove" | ":b" => {
            if parts.len() < 2 {
                println!("Usage: :prove <goal> [namespace]");
            } else {
                let result = engine.backward_chain(parts[1], parts.get(2).copied());
                if result.success() {
                    println!(
                        "Goal '{}' proven (confidence {:.4})",
                        result.goal(),
                        result.goal_confidence()
                    );
                    for step in result.reasoning_path() {
                        println!("  {}", step);
                    }
                } else {
                    println!("Goal '{}' is unreachable", result.goal());
                }
            }
        }

        ":facts" => {
            let facts = engine.facts_snapshot();
            if facts.is_empty() {
                println!("No facts");
            } else {
                println!("Facts:");
                for (name, tensor) in &facts {
                    println!("  {} = {}", name, ops::display(tensor));
                }
            }
        }

        ":rules" => {
            let rules = engine.rules_snapshot();
            if rules.is_empty() {
                println!("No rules");
            } else {
                println!("Rules:");
                for (name, rule) in &rules {
                    println!(
                        "  {} : {} {:?} -> {} ({})",
                        name,
                        rule.operation(),
                        rule.inputs(),
                        rule.output(),
                        rule.namespace()
                    );
                }
            }
        }

        ":show" | ":s" => {
            if parts.len() < 2 {
                println!("Usage: :show <name>");
            } else {
                match engine.get_fact(parts[1]) {
                    Some(t) => println!("{} = {}", parts[1], ops::display(t)),
                    None => println!("Unknown fact: {}", parts[1]),
                }
            }
        }

        ":confidence" => {
            match parse_floats(&parts[1..]) {
                Ok(values) => {
                    let p = propagate_confidence(&values);
                    println!(
                        "confidence = {:.4}, uncertainty = {:.4}",
                        p.final_confidence, p.uncertainty
                    );
                }
                Err(e) => println!("Invalid value: {}", e),
            }
        }

        ":contradiction" => {
            if parts.len() < 4 {
                println!("Usage: :contradiction <A>B> <B>C> <C>A>");
            } else {
                match parse_floats(&parts[1..4]) {
                    Ok(v) => {
                        let r = detect_contradiction(v[0], v[1], v[2]);
                        println!(
                            "score = {:.4} (expected A>C = {:.4}) -> {}",
                            r.contradiction_score,
                            r.expected,
                            if r.has_contradiction {
                                "CONTRADICTION"
                            } else {
                                "consistent"
                            }
                        );
                    }
                    Err(e) => println!("Invalid value: {}", e),
                }
            }
        }

        ":clear" => {
            engine.clear();
            println!("Engine cleared");
        }

        _ => {
            println!("Unknown command: {} (try :help)", command);
        }
    }

    true
}

fn parse_floats(parts: &[&str]) -> std::result::Result<Vec<f64>, std::num::ParseFloatError> {
    parts.iter().map(|s| s.parse()).collect()
}

fn print_help() {
    println!("Commands:");
    println!("  :load <file.yaml>                 load a rule definition file");
    println!("  :fact <name> <v1> [v2 ...]        add a vector fact");
    println!("  :matrix <name> <r> <c> <vals...>  add a matrix fact (row-major)");
    println!("  :rule <name> <op> <in1> <in2> <out> [ns]");
    println!("                                    add a rule (op: MODUS_PONENS,");
    println!("                                    CONJUNCTION, DISJUNCTION, CHAIN)");
    println!("  :forward [ns]                     one forward chaining pass");
    println!("  :prove <goal> [ns]                backward chain to a goal");
    println!("  :facts / :rules                   list store contents");
    println!("  :show <name>                      print one fact");
    println!("  :confidence <v1> [v2 ...]         propagate chain confidence");
    println!("  :contradiction <a> <b> <c>        transitivity check on A>B B>C C>A");
    println!("  :clear                            reset facts and rules");
    println!("  :quit                             exit");
}
