use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use todo_server::BackendKind;

#[derive(Parser)]
#[command(name = "todo", about = "Todo Ledger: a cached, durable todo list", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Directory of the fs-directory store.
    #[arg(long, global = true, env = "TODO_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum BackendArg {
    Memory,
    Fsdir,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Memory => BackendKind::Memory,
            BackendArg::Fsdir => BackendKind::Fsdir,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Print the effective server configuration
    Config(ConfigArgs),
    /// Create a todo
    Add(AddArgs),
    /// List todos
    List(ListArgs),
    /// Show a single todo
    Show(IdArgs),
    /// Assign a todo
    Assign(AssignArgs),
    /// Set a todo's description
    Describe(DescribeArgs),
    /// Mark an assigned todo as completed
    Complete(IdArgs),
    /// Soft-delete a todo
    Delete(IdArgs),
    /// Merge two ongoing todos into a new one
    Merge(MergeArgs),
    /// Remove a data directory lock left behind by a process that is gone
    Unlock,
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    #[arg(long)]
    pub backend: Option<BackendArg>,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct AddArgs {
    pub title: String,
    #[arg(short, long)]
    pub description: Option<String>,
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(long, conflicts_with = "completed")]
    pub backlog: bool,
    #[arg(long)]
    pub completed: bool,
    #[arg(long)]
    pub assignee: Option<String>,
}

#[derive(Args)]
pub struct IdArgs {
    pub id: String,
}

#[derive(Args)]
pub struct AssignArgs {
    pub id: String,
    pub assignee: String,
}

#[derive(Args)]
pub struct DescribeArgs {
    pub id: String,
    pub description: String,
}

#[derive(Args)]
pub struct MergeArgs {
    pub first: String,
    pub second: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_add() {
        let cli = Cli::try_parse_from(["todo", "add", "buy milk", "-d", "2 litres"]).unwrap();
        if let Command::Add(args) = cli.command {
            assert_eq!(args.title, "buy milk");
            assert_eq!(args.description, Some("2 litres".into()));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_list_filters() {
        let cli = Cli::try_parse_from(["todo", "list", "--completed", "--assignee", "bob"]).unwrap();
        if let Command::List(args) = cli.command {
            assert!(args.completed);
            assert!(!args.backlog);
            assert_eq!(args.assignee, Some("bob".into()));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn backlog_and_completed_conflict() {
        assert!(Cli::try_parse_from(["todo", "list", "--backlog", "--completed"]).is_err());
    }

    #[test]
    fn parse_serve() {
        let cli = Cli::try_parse_from([
            "todo", "serve", "--bind", "0.0.0.0:9000", "--backend", "fsdir", "--data-dir", "/tmp/t",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/t")));
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.bind, Some("0.0.0.0:9000".parse().unwrap()));
            assert_eq!(args.backend, Some(BackendArg::Fsdir));
            assert_eq!(args.config, None);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_global_format() {
        let cli = Cli::try_parse_from(["todo", "show", "42", "--format", "json"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(cli.command, Command::Show(_)));
    }

    #[test]
    fn parse_unlock() {
        let cli = Cli::try_parse_from(["todo", "unlock", "--data-dir", "/tmp/t"]).unwrap();
        assert!(matches!(cli.command, Command::Unlock));
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/t")));
    }

    #[test]
    fn parse_merge() {
        let cli = Cli::try_parse_from(["todo", "merge", "a", "b"]).unwrap();
        if let Command::Merge(args) = cli.command {
            assert_eq!((args.first.as_str(), args.second.as_str()), ("a", "b"));
        } else { panic!("wrong command"); }
    }
}
