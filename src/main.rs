// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gestora::config::{AppConfig, DEFAULT_CONFIG_FILE};
use gestora::roles::{authorize, Action, Role};
use gestora::{db, patente, rut, FormValidator};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gestora", version, about = "Gestión de personal y maquinaria")]
struct Cli {
    /// JSON config file
    #[arg(long, global = true, env = "GESTORA_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// SQLite database, overrides `database_path` from the config
    #[arg(long, global = true, env = "GESTORA_DB")]
    db: Option<PathBuf>,

    /// Role the command runs as
    #[arg(long, global = true, env = "GESTORA_ROL", default_value = "administrador")]
    rol: Role,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database schema
    Init,
    /// Import a roster CSV of trabajadores
    Import { csv: PathBuf },
    /// Validate a RUT and print its canonical form
    ValidarRut { rut: String },
    /// Normalize a patente to LL-NN-NN / LL-LL-NN
    FormatearPatente { texto: String },
    /// Open the terminal UI
    Ui,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(&cli.config)?;
    if let Some(db) = &cli.db {
        config.database_path = db.clone();
    }

    // Log lines would draw over the TUI
    if !matches!(cli.command, Command::Ui) {
        init_tracing(&config.log_filter);
    }

    match cli.command {
        Command::Init => run_init(&config),
        Command::Import { csv } => run_import(&config, cli.rol, &csv),
        Command::ValidarRut { rut } => run_validar_rut(&rut),
        Command::FormatearPatente { texto } => run_formatear_patente(&texto),
        Command::Ui => run_ui_mode(&config, cli.rol),
    }
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_init(config: &AppConfig) -> Result<()> {
    println!("🔧 Setting up database...");
    db::open(&config.database_path)?;
    println!("✓ Database ready at {} (WAL mode)", config.database_path.display());
    Ok(())
}

fn run_import(config: &AppConfig, rol: Role, csv: &Path) -> Result<()> {
    authorize(rol, Action::ManageWorkers)?;

    println!("📂 Importing roster from {}...", csv.display());
    let conn = db::open(&config.database_path)?;
    let summary = db::import_trabajadores_csv(&conn, csv, &FormValidator::new(), rol.as_str())
        .with_context(|| format!("Import of {} failed", csv.display()))?;

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✓ Inserted:   {}", summary.inserted);
    println!("✓ Duplicates: {}", summary.duplicates);
    if !summary.skipped.is_empty() {
        println!("⚠️  Skipped:    {}", summary.skipped.len());
        for row in &summary.skipped {
            println!("   line {}: {}", row.line, row.reason);
        }
    }
    Ok(())
}

fn run_validar_rut(input: &str) -> Result<()> {
    match rut::error_message(input) {
        None => {
            println!("✅ {}", rut::format(input));
            Ok(())
        }
        Some(message) => {
            eprintln!("❌ {}: {}", message, input);
            std::process::exit(1);
        }
    }
}

/// Canonical plate, or the message explaining why `input` is not one
fn check_patente(input: &str) -> Result<String, String> {
    let formatted = patente::format(input);
    match patente::error_message(&formatted) {
        None => Ok(formatted),
        Some(message) => Err(format!("{}: {}", message, formatted)),
    }
}

fn run_formatear_patente(input: &str) -> Result<()> {
    match check_patente(input) {
        Ok(formatted) => {
            println!("✅ {}", formatted);
            Ok(())
        }
        Err(message) => {
            eprintln!("❌ {}", message);
            std::process::exit(1);
        }
    }
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &AppConfig, rol: Role) -> Result<()> {
    if !config.database_path.exists() {
        eprintln!("❌ Database not found: {}", config.database_path.display());
        eprintln!("   Run: gestora init");
        std::process::exit(1);
    }

    let conn = db::open(&config.database_path)?;
    let data = ui::Data::load(&conn)?;
    let mut app = ui::App::new(config.empresa.clone(), rol, data)?;
    ui::run_ui(&mut app)?;

    println!("✅ UI closed");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &AppConfig, _rol: Role) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin gestora-server --features server");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_global_flags() {
        let cli = Cli::try_parse_from([
            "gestora",
            "import",
            "nomina.csv",
            "--rol",
            "rrhh",
            "--db",
            "/tmp/g.db",
        ])
        .unwrap();
        assert_eq!(cli.rol, Role::RecursosHumanos);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/g.db")));
        assert!(matches!(cli.command, Command::Import { ref csv } if csv == Path::new("nomina.csv")));
    }

    #[test]
    fn test_cli_rejects_unknown_role() {
        assert!(Cli::try_parse_from(["gestora", "--rol", "jefe", "init"]).is_err());
    }

    #[test]
    fn test_patente_lowercase_is_normalized() {
        assert_eq!(check_patente("ab1234"), Ok("AB-12-34".to_string()));
        assert_eq!(check_patente("bbcl12"), Ok("BB-CL-12".to_string()));
        assert_eq!(check_patente("BB-CL-12"), Ok("BB-CL-12".to_string()));
    }

    #[test]
    fn test_patente_rejections_keep_message() {
        let err = check_patente("ab12").unwrap_err();
        assert!(err.starts_with("Patente incompleta"));
        assert!(err.ends_with("AB-12"));
        assert!(check_patente("1234ab").is_err());
    }

    #[test]
    fn test_import_requires_manage_workers() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            database_path: dir.path().join("g.db"),
            ..AppConfig::default()
        };
        let err = run_import(&config, Role::Gerencia, Path::new("nomina.csv")).unwrap_err();
        assert!(err.to_string().contains("gerencia"));
    }
}
