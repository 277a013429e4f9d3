use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use colored::Colorize;
use polykv_store::{
    BackendConfig, KvBackend, KvObjectStore, ObjectDb, OpContext, StoreConfig,
};
use polykv_types::{Animal, Kind, Person, Record};

use crate::cli::*;

/// Open store plus the context every operation runs under.
struct Session {
    store: KvObjectStore<Arc<dyn KvBackend>>,
    base: OpContext,
    timeout: Option<Duration>,
    format: OutputFormat,
}

impl Session {
    async fn open(config: &StoreConfig, format: OutputFormat) -> anyhow::Result<Self> {
        let backend = config.open_backend().context("opening backend")?;

        let (base, canceller) = OpContext::with_cancel();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted; cancelling in-flight operation");
                canceller.cancel();
            }
        });

        let session = Self {
            store: KvObjectStore::new(backend),
            base,
            timeout: config.op_timeout(),
            format,
        };
        session
            .store
            .ping(&session.ctx())
            .await
            .context("backend did not answer")?;
        Ok(session)
    }

    /// Fresh context per operation so each gets the full timeout.
    fn ctx(&self) -> OpContext {
        match self.timeout {
            Some(t) => self.base.clone().with_timeout(t),
            None => self.base.clone(),
        }
    }
}

/// Config file (or defaults), then `POLYKV_*` variables from `lookup`, then flags.
fn resolve_config(
    cli: &Cli,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::load(path)?,
        None => StoreConfig::default(),
    }
    .with_overrides(lookup)?;
    if let Some(path) = &cli.data {
        config.backend = BackendConfig::File { path: path.clone() };
    }
    if let Some(ms) = cli.timeout_ms {
        config.op_timeout_ms = Some(ms);
    }
    Ok(config)
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli, |key| std::env::var(key).ok())?;
    run_with_config(cli, &config).await
}

async fn run_with_config(cli: Cli, config: &StoreConfig) -> anyhow::Result<()> {
    let session = Session::open(config, cli.format).await?;
    match cli.command {
        Command::Demo => cmd_demo(&session).await,
        Command::StorePerson(args) => cmd_store_person(&session, args).await,
        Command::StoreAnimal(args) => cmd_store_animal(&session, args).await,
        Command::Get(args) => cmd_get(&session, args).await,
        Command::ByName(args) => cmd_by_name(&session, args).await,
        Command::List(args) => cmd_list(&session, args).await,
        Command::Delete(args) => cmd_delete(&session, args).await,
        Command::Flush => cmd_flush(&session).await,
    }
}

async fn store_and_report(session: &Session, record: Record) -> anyhow::Result<()> {
    let mut record = record;
    let id = session.store.store(&session.ctx(), &mut record).await?;
    match session.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        OutputFormat::Text => println!(
            "{} Stored {} {} as {}",
            "✓".green().bold(),
            record.kind().to_string().cyan(),
            record.name().bold(),
            id.to_string().yellow()
        ),
    }
    Ok(())
}

async fn cmd_store_person(session: &Session, args: StorePersonArgs) -> anyhow::Result<()> {
    let mut person = Person::new(args.name, args.last_name);
    person.birthday = args.birthday;
    if let Some(raw) = args.birthdate {
        person.birthdate = parse_birthdate(&raw)?;
    }
    store_and_report(session, person.into()).await
}

async fn cmd_store_animal(session: &Session, args: StoreAnimalArgs) -> anyhow::Result<()> {
    let animal = Animal::new(args.name, args.animal_type).with_owner(args.owner);
    store_and_report(session, animal.into()).await
}

async fn cmd_get(session: &Session, args: IdArgs) -> anyhow::Result<()> {
    let record = session.store.get_object_by_id(&session.ctx(), &args.id).await?;
    print_records(session.format, std::slice::from_ref(&record))
}

async fn cmd_by_name(session: &Session, args: NameArgs) -> anyhow::Result<()> {
    let records = session
        .store
        .get_objects_by_name(&session.ctx(), &args.name)
        .await?;
    print_records(session.format, &records)
}

async fn cmd_list(session: &Session, args: KindArgs) -> anyhow::Result<()> {
    if args.kind.parse::<Kind>().is_err() {
        tracing::warn!(kind = %args.kind, "not a built-in kind; the listing will be empty");
    }
    let records = session.store.list_objects(&session.ctx(), &args.kind).await?;
    print_records(session.format, &records)
}

async fn cmd_delete(session: &Session, args: IdArgs) -> anyhow::Result<()> {
    session.store.delete_object(&session.ctx(), &args.id).await?;
    if session.format == OutputFormat::Text {
        println!("{} Deleted {}", "✓".green().bold(), args.id.yellow());
    }
    Ok(())
}

async fn cmd_flush(session: &Session) -> anyhow::Result<()> {
    session.store.flush_all(&session.ctx()).await?;
    if session.format == OutputFormat::Text {
        println!("{} Store flushed.", "✓".green().bold());
    }
    Ok(())
}

/// Two people named alice and one tiger: query them every way, then delete.
async fn cmd_demo(session: &Session) -> anyhow::Result<()> {
    let db = &session.store;
    db.flush_all(&session.ctx()).await?;

    let mut tiger = Record::from(Animal::new("tiger", "wild-animal").with_owner("alice"));
    let mut alice1 = Record::from(Person::new("alice", "jordon"));
    let mut alice2 = Record::from(Person::new("alice", "macy"));
    for record in [&mut tiger, &mut alice1, &mut alice2] {
        db.store(&session.ctx(), record).await?;
    }

    let tigers = db.get_objects_by_name(&session.ctx(), "tiger").await?;
    let people = db.get_objects_by_name(&session.ctx(), "alice").await?;
    println!(
        "By name: {} tiger(s), {} alice(s)",
        tigers.len().to_string().bold(),
        people.len().to_string().bold()
    );

    println!("{}", "Listing persons:".bold());
    let persons = db.list_objects(&session.ctx(), Kind::Person.as_str()).await?;
    for (i, person) in persons.iter().enumerate() {
        println!("  {i} {}", describe(person));
        let id = person.id().context("stored record has no id")?;
        db.delete_object(&session.ctx(), &id.to_string()).await?;
        println!("  {i} {} {}", "deleted".red(), id.to_string().yellow());
    }

    let tiger_id = tigers
        .first()
        .and_then(Record::id)
        .context("tiger was not found by name")?
        .to_string();
    let fetched = db.get_object_by_id(&session.ctx(), &tiger_id).await?;
    println!("Getting animal by id: {}", describe(&fetched));
    db.delete_object(&session.ctx(), &tiger_id).await?;

    let persons = db.list_objects(&session.ctx(), Kind::Person.as_str()).await?;
    let animals = db.list_objects(&session.ctx(), Kind::Animal.as_str()).await?;
    println!("After deletion, total persons: {}", persons.len());
    println!("After deletion, total animals: {}", animals.len());
    Ok(())
}

fn print_records(format: OutputFormat, records: &[Record]) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(records)?),
        OutputFormat::Text if records.is_empty() => println!("No records."),
        OutputFormat::Text => {
            for record in records {
                println!("{}", describe(record));
            }
        }
    }
    Ok(())
}

fn describe(record: &Record) -> String {
    let id = record
        .id()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".into());
    let details = match record {
        Record::Person(p) => format!(
            "last_name={} birthday={} birthdate={}",
            p.last_name,
            p.birthday,
            p.birthdate.format("%Y-%m-%d")
        ),
        Record::Animal(a) => format!("type={} owner_id={}", a.animal_type, a.owner_id),
    };
    format!(
        "{} {} {} {}",
        record.kind().to_string().cyan(),
        id.yellow(),
        record.name().bold(),
        details.dimmed()
    )
}

fn parse_birthdate(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("birthdate {raw:?} is neither YYYY-MM-DD nor RFC 3339"))?;
    Ok(date.and_time(chrono::NaiveTime::MIN).and_utc())
}
