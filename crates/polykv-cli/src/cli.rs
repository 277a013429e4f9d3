use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "polykv",
    about = "polykv: typed records over a key-value store, queryable by id, name and kind",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Keep data in this JSON file instead of memory
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    /// Per-operation timeout in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a short store/query/delete walkthrough on a clean store
    Demo,
    /// Store a person and print its id
    StorePerson(StorePersonArgs),
    /// Store an animal and print its id
    StoreAnimal(StoreAnimalArgs),
    /// Show the record with the given id
    Get(IdArgs),
    /// Show every record with the given name
    ByName(NameArgs),
    /// Show every record of the given kind
    List(KindArgs),
    /// Delete the record with the given id
    Delete(IdArgs),
    /// Remove every key from the backend
    Flush,
}

#[derive(Args)]
pub struct StorePersonArgs {
    pub name: String,
    #[arg(long, default_value = "")]
    pub last_name: String,
    /// Free-form birthday, e.g. 01-02-1990
    #[arg(long, default_value = "")]
    pub birthday: String,
    /// Birth date as YYYY-MM-DD or RFC 3339
    #[arg(long)]
    pub birthdate: Option<String>,
}

#[derive(Args)]
pub struct StoreAnimalArgs {
    pub name: String,
    /// Species or breed
    #[arg(long = "type", default_value = "")]
    pub animal_type: String,
    #[arg(long, default_value = "")]
    pub owner: String,
}

#[derive(Args)]
pub struct IdArgs {
    pub id: String,
}

#[derive(Args)]
pub struct NameArgs {
    pub name: String,
}

#[derive(Args)]
pub struct KindArgs {
    /// Kind tag, e.g. Person or Animal
    pub kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_store_person() {
        let cli = Cli::parse_from([
            "polykv",
            "store-person",
            "alice",
            "--last-name",
            "Johnson",
            "--birthdate",
            "1989-02-01",
        ]);
        match cli.command {
            Command::StorePerson(args) => {
                assert_eq!(args.name, "alice");
                assert_eq!(args.last_name, "Johnson");
                assert_eq!(args.birthdate.as_deref(), Some("1989-02-01"));
            }
            _ => panic!("expected store-person"),
        }
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["polykv", "list", "Person", "--data", "db.json", "--format", "json"]);
        assert_eq!(cli.data, Some(PathBuf::from("db.json")));
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(cli.command, Command::List(KindArgs { ref kind }) if kind == "Person"));
    }

    #[test]
    fn parse_store_animal_type_flag() {
        let cli = Cli::parse_from(["polykv", "store-animal", "tiger", "--type", "wild-animal"]);
        match cli.command {
            Command::StoreAnimal(args) => assert_eq!(args.animal_type, "wild-animal"),
            _ => panic!("expected store-animal"),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
