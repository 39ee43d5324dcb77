use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn,ddb_sheets=info";

/// Initialize structured logging to `<state dir>/ddb-sheets/<app>.log`.
///
/// The state directory comes from `dirs` (falling back to the local data
/// directory on platforms without one). If no log file can be opened the
/// subscriber writes to stderr instead, so logging never blocks a command.
pub fn init_logging(app: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    match open_log_file(app) {
        Ok((file, path)) => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(BoxMakeWriter::new(FileMakeWriter(file)))
                .with_ansi(false)
                .try_init()
                .map_err(|e| anyhow::anyhow!(e))?;
            tracing::debug!("{} logging initialized at {}", app, path.display());
        }
        Err(_) => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow::anyhow!(e))?;
        }
    }

    Ok(())
}

fn log_dir() -> Option<PathBuf> {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|d| d.join("ddb-sheets"))
}

fn open_log_file(app: &str) -> Result<(fs::File, PathBuf)> {
    let dir = log_dir().ok_or_else(|| anyhow::anyhow!("no state directory"))?;
    fs::create_dir_all(&dir)?;
    let path = dir.join(format!("{app}.log"));
    let file = fs::OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((file, path))
}

// Hands out clones of one file handle; falls back to a sink if cloning fails.
struct FileMakeWriter(fs::File);

impl<'a> MakeWriter<'a> for FileMakeWriter {
    type Writer = Box<dyn std::io::Write + Send>;

    fn make_writer(&'a self) -> Self::Writer {
        match self.0.try_clone() {
            Ok(f) => Box::new(f),
            Err(_) => Box::new(std::io::sink()),
        }
    }
}
