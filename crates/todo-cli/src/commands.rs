use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::{ColoredString, Colorize};

use todo_ledger::{wants, Item, Ledger};
use todo_model::{Clock, Status, SystemClock, Todo};
use todo_server::{ApiItem, Response, ServerConfig, TodoServer};
use todo_store::{FsDirStore, ItemId};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args, cli.data_dir),
        Command::Config(args) => cmd_config(args, cli.data_dir),
        Command::Unlock => cmd_unlock(&data_dir(cli.data_dir)),
        command => {
            let dir = data_dir(cli.data_dir);
            let store = FsDirStore::open(&dir)
                .with_context(|| format!("opening store at {}", dir.display()))?;
            let ledger = Ledger::new(store)?;
            let report = execute(&ledger, command, &SystemClock);
            let closed = ledger.close();
            let report = report?;
            closed?;
            print_report(&report, cli.format)
        }
    }
}

/// What an offline command did, ready for printing.
#[derive(Debug)]
pub struct Report {
    pub verb: Option<&'static str>,
    pub items: Vec<Item>,
}

impl Report {
    fn done(verb: &'static str, item: Item) -> Self {
        Self {
            verb: Some(verb),
            items: vec![item],
        }
    }
}

/// Run one ledger command.
pub fn execute(ledger: &Ledger, command: Command, clock: &dyn Clock) -> anyhow::Result<Report> {
    let report = match command {
        Command::Add(args) => {
            let todo = Todo::with_description(
                args.title,
                args.description.unwrap_or_default(),
                clock,
            );
            let id = ledger.insert(&todo)?;
            Report::done("Added", Item { id, todo })
        }
        Command::List(args) => {
            let wants: Box<dyn Fn(&Todo) -> bool> = match (args.backlog, args.completed, args.assignee) {
                (true, _, Some(who)) => Box::new(wants::backlog_of(who)),
                (true, _, None) => Box::new(wants::backlog()),
                (_, true, Some(who)) => Box::new(wants::completed_by(who)),
                (_, true, None) => Box::new(wants::completed()),
                (false, false, Some(who)) => Box::new(move |todo: &Todo| todo.assignee() == who),
                (false, false, None) => Box::new(wants::all()),
            };
            let mut items = ledger.filter(wants)?;
            items.sort_by(|a, b| a.id.cmp(&b.id));
            Report { verb: None, items }
        }
        Command::Show(args) => {
            let id = ItemId::from(args.id);
            let todo = ledger.get(&id)?;
            Report {
                verb: None,
                items: vec![Item { id, todo }],
            }
        }
        Command::Assign(args) => {
            let id = ItemId::from(args.id);
            let todo = ledger.update(&id, |todo| todo.assign(args.assignee, clock))?;
            Report::done("Assigned", Item { id, todo })
        }
        Command::Describe(args) => {
            let id = ItemId::from(args.id);
            let todo = ledger.update(&id, |todo| todo.describe(args.description, clock))?;
            Report::done("Described", Item { id, todo })
        }
        Command::Complete(args) => {
            let id = ItemId::from(args.id);
            let todo = ledger.update(&id, |todo| todo.complete(clock))?;
            Report::done("Completed", Item { id, todo })
        }
        Command::Delete(args) => {
            let id = ItemId::from(args.id);
            let todo = ledger.update(&id, |todo| todo.delete(clock))?;
            Report::done("Deleted", Item { id, todo })
        }
        Command::Merge(args) => {
            let item = ledger.merge(&ItemId::from(args.first), &ItemId::from(args.second), clock)?;
            Report::done("Merged into", item)
        }
        Command::Serve(_) | Command::Config(_) | Command::Unlock => {
            anyhow::bail!("not a ledger command")
        }
    };
    Ok(report)
}

fn print_report(report: &Report, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let response = Response::items(report.items.iter().map(ApiItem::from).collect());
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            if let Some(verb) = report.verb {
                for item in &report.items {
                    println!("{} {} {}", "✓".green().bold(), verb, item.id.to_string().yellow());
                }
            }
            if report.items.is_empty() {
                println!("No todos.");
            }
            for item in &report.items {
                println!("{}", render(item));
            }
        }
    }
    Ok(())
}

fn render(item: &Item) -> String {
    let todo = &item.todo;
    let mut line = format!(
        "{} {:<9} {}",
        item.id.to_string().dimmed(),
        status_label(todo.status()),
        todo.title().bold()
    );
    if !todo.assignee().is_empty() {
        line.push_str(&format!(" @{}", todo.assignee().cyan()));
    }
    if !todo.description().is_empty() {
        line.push_str(&format!("\n    {}", todo.description()));
    }
    line
}

fn status_label(status: Status) -> ColoredString {
    match status {
        Status::Pending => status.as_str().yellow(),
        Status::Assigned => status.as_str().cyan(),
        Status::Completed => status.as_str().green(),
        Status::Deleted => status.as_str().dimmed(),
    }
}

fn data_dir(flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(|| ServerConfig::default().data_dir)
}

fn cmd_unlock(dir: &Path) -> anyhow::Result<()> {
    match FsDirStore::break_lock(dir)
        .with_context(|| format!("unlocking {}", dir.display()))?
    {
        Some(holder) => println!("{} Removed lock held by {}", "✓".green().bold(), holder.yellow()),
        None => println!("{} is not locked.", dir.display()),
    }
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ServerConfig> {
    match path {
        Some(path) => Ok(ServerConfig::load(path)?),
        None => Ok(ServerConfig::default()),
    }
}

fn cmd_serve(args: ServeArgs, data_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_ref())?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(backend) = args.backend {
        config.backend = backend.into();
    }
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    tracing::info!(
        bind = %config.bind_addr,
        backend = ?config.backend,
        data_dir = %config.data_dir.display(),
        "starting todo server"
    );
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(TodoServer::new(config).serve())?;
    Ok(())
}

fn cmd_config(args: ConfigArgs, data_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_ref())?;
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    print!("{}", config.to_toml()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use todo_store::{BlobStore, InMemoryBlobStore};

    fn ledger() -> Ledger {
        Ledger::new(InMemoryBlobStore::new()).unwrap()
    }

    fn run(ledger: &Ledger, args: &[&str]) -> anyhow::Result<Report> {
        let argv = std::iter::once("todo").chain(args.iter().copied());
        let cli = Cli::try_parse_from(argv).unwrap();
        execute(ledger, cli.command, &SystemClock)
    }

    fn add(ledger: &Ledger, title: &str) -> String {
        run(ledger, &["add", title]).unwrap().items[0].id.to_string()
    }

    #[test]
    fn add_and_show() {
        let ledger = ledger();
        let report = run(&ledger, &["add", "t1", "-d", "details"]).unwrap();
        assert_eq!(report.verb, Some("Added"));
        let id = report.items[0].id.to_string();

        let shown = run(&ledger, &["show", &id]).unwrap();
        assert_eq!(shown.items[0].todo.title(), "t1");
        assert_eq!(shown.items[0].todo.description(), "details");
        assert_eq!(shown.items[0].todo.status(), Status::Pending);
    }

    #[test]
    fn lifecycle_and_listing() {
        let ledger = ledger();
        let a = add(&ledger, "a");
        let b = add(&ledger, "b");
        run(&ledger, &["assign", &a, "bob"]).unwrap();
        run(&ledger, &["assign", &b, "alice"]).unwrap();
        run(&ledger, &["complete", &a]).unwrap();

        let completed = run(&ledger, &["list", "--completed", "--assignee", "bob"]).unwrap();
        assert_eq!(completed.items.len(), 1);
        assert_eq!(completed.items[0].id.to_string(), a);

        let backlog = run(&ledger, &["list", "--backlog"]).unwrap();
        assert_eq!(backlog.items.len(), 1);
        assert_eq!(backlog.items[0].id.to_string(), b);

        let bobs = run(&ledger, &["list", "--assignee", "bob"]).unwrap();
        assert_eq!(bobs.items.len(), 1);
        assert_eq!(run(&ledger, &["list"]).unwrap().items.len(), 2);
    }

    #[test]
    fn transition_errors_surface() {
        let ledger = ledger();
        let id = add(&ledger, "t");
        assert!(run(&ledger, &["complete", &id]).is_err());
        run(&ledger, &["delete", &id]).unwrap();
        assert!(run(&ledger, &["assign", &id, "bob"]).is_err());
        assert!(run(&ledger, &["show", "missing"]).is_err());
    }

    #[test]
    fn merge_reports_new_item() {
        let ledger = ledger();
        let a = add(&ledger, "a");
        let b = add(&ledger, "b");
        let report = run(&ledger, &["merge", &a, &b]).unwrap();
        assert_eq!(report.items[0].todo.title(), "a-b");
        assert_eq!(run(&ledger, &["list", "--backlog"]).unwrap().items.len(), 1);
    }

    #[test]
    fn server_commands_are_not_ledger_commands() {
        let ledger = ledger();
        assert!(run(&ledger, &["config"]).is_err());
    }

    #[test]
    fn offline_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let ledger = Ledger::new(FsDirStore::open(dir.path()).unwrap()).unwrap();
            let id = add(&ledger, "durable");
            run(&ledger, &["assign", &id, "bob"]).unwrap();
            ledger.close().unwrap();
            id
        };
        let ledger = Ledger::new(FsDirStore::open(dir.path()).unwrap()).unwrap();
        let shown = run(&ledger, &["show", &id]).unwrap();
        assert_eq!(shown.items[0].todo.assignee(), "bob");
        ledger.close().unwrap();
    }

    #[test]
    fn unlock_frees_a_crashed_owners_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".lock"), b"pid 999999 (gone)").unwrap();
        assert!(FsDirStore::open(dir.path()).is_err());

        cmd_unlock(dir.path()).unwrap();
        FsDirStore::open(dir.path()).unwrap().close().unwrap();
        cmd_unlock(dir.path()).unwrap();
    }

    #[test]
    fn render_includes_assignee_and_description() {
        colored::control::set_override(false);
        let ledger = ledger();
        let id = add(&ledger, "t");
        run(&ledger, &["assign", &id, "bob"]).unwrap();
        let report = run(&ledger, &["describe", &id, "more"]).unwrap();
        let line = render(&report.items[0]);
        assert!(line.contains(&id));
        assert!(line.contains("assigned"));
        assert!(line.contains("@bob"));
        assert!(line.contains("\n    more"));
    }
}
