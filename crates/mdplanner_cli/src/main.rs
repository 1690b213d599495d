//! Command-line entry point over one project document and its store.
//!
//! ```text
//! mdplanner <project.md> sync
//! mdplanner <project.md> rebuild
//! mdplanner <project.md> search <terms...> [--type <kind>] [--limit <n>]
//! mdplanner <project.md> stats
//! mdplanner <project.md> tasks
//! ```

use mdplanner_core::{
    init_logging_with_config, open_db, CacheSync, CoreConfig, EntityKind, ProjectDocument,
    SearchEngine, SearchOptions, SqliteIdCounters, SyncResult, Task,
};
use std::path::PathBuf;
use std::process::ExitCode;

const USAGE: &str = "usage: mdplanner <project.md> <sync|rebuild|search <terms>|stats|tasks>";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<(), String> {
    let (document_path, command, rest) = match args {
        [path, command, rest @ ..] => (PathBuf::from(path), command.as_str(), rest),
        _ => return Err(USAGE.to_string()),
    };

    let config = CoreConfig::from_env(&document_path);
    let log_dir = std::env::temp_dir().join("mdplanner-logs");
    if let Err(err) = init_logging_with_config(&config, &log_dir.to_string_lossy()) {
        eprintln!("logging disabled: {err}");
    }

    let mut conn = open_db(&config.store.path).map_err(|err| err.to_string())?;
    let counters = SqliteIdCounters::open(&config.store.path).map_err(|err| err.to_string())?;
    let document = ProjectDocument::with_config(&document_path, config.write_safety.clone())
        .with_counter_store(Box::new(counters));

    match command {
        "sync" => {
            let mut sync = CacheSync::new(&document, &mut conn);
            sync.init().map_err(|err| err.to_string())?;
            report(sync.full_sync(None))
        }
        "rebuild" => report(CacheSync::new(&document, &mut conn).rebuild()),
        "search" => {
            let (terms, options) = parse_search_args(rest)?;
            for hit in SearchEngine::new(&conn).search(&terms, &options) {
                println!("{:>8.3}  {:<17} {:<18} {}", hit.score, hit.kind.as_str(), hit.id, hit.title);
                if !hit.snippet.is_empty() {
                    println!("          {}", hit.snippet);
                }
            }
            Ok(())
        }
        "stats" => {
            let stats = SearchEngine::new(&conn).get_stats();
            for (table, count) in &stats.tables {
                println!("{table:<16} {count}");
            }
            println!("{:<16} {}", "total", stats.total);
            Ok(())
        }
        "tasks" => {
            for task in document.read_tasks() {
                print_task(&task, 0);
            }
            Ok(())
        }
        other => Err(format!("unknown command `{other}`\n{USAGE}")),
    }
}

fn parse_search_args(rest: &[String]) -> Result<(String, SearchOptions), String> {
    let mut options = SearchOptions::default();
    let mut terms = Vec::new();
    let mut iter = rest.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--type" => {
                let value = iter.next().ok_or("--type needs a value")?;
                let kind = EntityKind::parse(value)
                    .ok_or_else(|| format!("unknown entity kind `{value}`"))?;
                options.types.get_or_insert_with(Vec::new).push(kind);
            }
            "--limit" => {
                let value = iter.next().ok_or("--limit needs a value")?;
                options.limit = value
                    .parse()
                    .map_err(|_| format!("invalid limit `{value}`"))?;
            }
            term => terms.push(term.to_string()),
        }
    }
    if terms.is_empty() {
        return Err("search needs at least one term".to_string());
    }
    Ok((terms.join(" "), options))
}

fn report(result: SyncResult) -> Result<(), String> {
    if result.is_ok() {
        println!(
            "synced {} items across {} tables in {} ms",
            result.items, result.tables, result.duration_ms
        );
        Ok(())
    } else {
        Err(result.errors.join("\n"))
    }
}

fn print_task(task: &Task, depth: usize) {
    let mark = if task.completed { 'x' } else { ' ' };
    println!(
        "{}[{mark}] {:>4} {:<12} {}",
        "  ".repeat(depth),
        task.id,
        task.section,
        task.title
    );
    for child in &task.children {
        print_task(child, depth + 1);
    }
}
