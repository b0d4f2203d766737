use anyhow::Context;
use easel::{
    config::Config,
    db::{Database, NoteId},
    element::{CanvasElement, ElementStore},
    gumdrop::Options,
    repo::{ElementRepository, LocalElementRepository},
    s, serialize, Args, Command,
};
use std::io::{BufRead, BufReader, Write};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse_args_default_or_exit();

    if args.version {
        println!("easel util version {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if args.print_default_config {
        println!("{}", Config::new().to_ron_string()?);
        return Ok(());
    }

    let config_path = match args.config {
        Some(path) => path,
        None => Config::config_path()?,
    };
    let config = Config::from_disk(&config_path);
    tracing::debug!("using config {}", config_path.display());

    let command = match args.command {
        Some(command) => command,
        None => {
            eprintln!("{}", s!(MissingCommand));
            return Ok(());
        }
    };

    let database_path = match args.database {
        Some(path) => path,
        None => config.database_path()?,
    };
    tracing::debug!("{command:?} on {}", database_path.display());
    let mut db = Database::open(&database_path)
        .with_context(|| format!("{}: {}", s!(CouldNotOpenDatabase), database_path.display()))?;

    match command {
        Command::List(_) => list(&db),
        Command::New(_) => {
            let note = db.insert_note()?;
            println!("{} {}", s!(NoteCreated), note.id);
            Ok(())
        }
        Command::Delete(note) => {
            db.delete_note(note.note)?;
            println!("{} {}", s!(NoteDeleted), note.note);
            Ok(())
        }
        Command::Export(note) => export(db, note.note),
        Command::Import(import) => {
            let file = std::fs::File::open(&import.file)
                .with_context(|| format!("{}: {}", s!(CouldNotReadImport), import.file.display()))?;
            import_strokes(db, import.note, BufReader::new(file))
        }
    }
}

fn list(db: &Database) -> anyhow::Result<()> {
    let notes = db.all_notes()?;
    if notes.is_empty() {
        println!("{}", s!(NoNotes));
    }

    for note in notes {
        println!("{}\t{}", note.id, note.created_at_ms);
    }

    Ok(())
}

fn export(db: Database, note_id: NoteId) -> anyhow::Result<()> {
    db.note(note_id)?;
    let mut repo = LocalElementRepository::new(db);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for element in repo.elements_for_note(note_id)? {
        match element {
            CanvasElement::Stroke(stroke) => {
                writeln!(out, "{}", serialize::serialize_stroke(&stroke.stroke)?)?;
            }
        }
    }

    Ok(())
}

fn import_strokes(db: Database, note_id: NoteId, input: impl BufRead) -> anyhow::Result<()> {
    db.note(note_id)?;

    let mut strokes = Vec::new();
    for (i, line) in input.lines().enumerate() {
        let line = line.context(s!(CouldNotReadImport))?;
        if line.trim().is_empty() {
            continue;
        }

        let stroke = serialize::deserialize_stroke(&line)
            .with_context(|| format!("{} (line {})", s!(CouldNotReadImport), i + 1))?;
        strokes.push(stroke);
    }

    let mut store = ElementStore::new(LocalElementRepository::new(db));
    store.open_note(note_id)?;
    let ids = store.add_strokes(strokes)?;
    println!("{} {}", s!(ImportedStrokes), ids.len());

    Ok(())
}
