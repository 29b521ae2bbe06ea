use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;

use crate::app::App;
use crate::config::AppConfig;
use crate::films::{fetch_films, FilmsTransport, MovieRecord, FETCH_FAILED_MESSAGE};

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Print the records as a JSON array
    #[arg(long)]
    pub json: bool,
    /// Include each film's opening text
    #[arg(long)]
    pub opening_text: bool,
}

pub fn run_tui(config: Arc<AppConfig>, transport: Arc<dyn FilmsTransport>) -> Result<()> {
    let mut app = App::new(config, transport);
    app.run()
}

pub fn list_films(
    config: Arc<AppConfig>,
    transport: &dyn FilmsTransport,
    args: ListArgs,
) -> Result<()> {
    let movies = match fetch_films(transport, &config.fetch.endpoint) {
        Ok(movies) => movies,
        Err(err) => {
            tracing::error!(%err, endpoint = %config.fetch.endpoint, "fetch failed");
            bail!(FETCH_FAILED_MESSAGE);
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_films(&mut out, &movies, &args)?;
    out.flush().context("flushing stdout")?;
    Ok(())
}

fn write_films(out: &mut impl Write, movies: &[MovieRecord], args: &ListArgs) -> Result<()> {
    if args.json {
        serde_json::to_writer_pretty(&mut *out, movies).context("serializing films")?;
        writeln!(out).context("writing films")?;
        return Ok(());
    }
    if movies.is_empty() {
        writeln!(out, "Found no movies.").context("writing films")?;
        return Ok(());
    }
    for movie in movies {
        writeln!(out, "#{:<3} {}  ({})", movie.id, movie.title, movie.release_date)
            .context("writing films")?;
        if args.opening_text {
            for line in movie.opening_text.lines() {
                writeln!(out, "     {line}").context("writing films")?;
            }
        }
    }
    Ok(())
}
