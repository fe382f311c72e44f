mod api;
mod config;
mod geocoding;
mod interpret;
mod repl;
mod resolve;
mod server;
mod surface;
mod track;

use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use futures_lite::StreamExt;
use is_terminal::IsTerminal;
use wander_atlas::ViewportStore;
use wander_llm::openai::OpenAi;

use crate::config::{Command, Secrets};
use crate::geocoding::mapbox;
use crate::interpret::remote::Remote;
use crate::interpret::{Fallback, Interpreter, Local};
use crate::repl::Input;
use crate::resolve::{Orchestrator, Outcome};
use crate::track::Tracker;

#[tokio::main]
async fn main() {
    // Before parsing, so `.env` values reach the clap env fallbacks.
    let _ = dotenvy::dotenv();
    let command = config::Cli::parse().into_command();

    let default_filter = if command.common().debug {
        "debug,isahc=error"
    } else {
        "info,isahc=error"
    };
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match command {
        Command::Serve(args) => {
            if args.secrets.mapbox_token.is_none() {
                tracing::warn!("MAPBOX_ACCESS_TOKEN is not set, /api/token will return null");
            }
            let interpreter = local_interpreter(&args.secrets);
            let state = server::AppState::new(args.secrets.mapbox_token, interpreter);
            if let Err(e) = server::serve(args.bind, state).await {
                tracing::error!(%e, "backend stopped");
                std::process::exit(1);
            }
        }
        Command::Search(args) => search(args).await,
    }
}

/// The in-process interpreter: a language model when a key is configured,
/// direct geocoding otherwise.
fn local_interpreter(secrets: &Secrets) -> Arc<dyn Interpreter> {
    let Some(api_key) = secrets.openai_api_key.as_deref() else {
        tracing::warn!("OPENAI_API_KEY is not set, every query is geocoded as typed");
        return Arc::new(Fallback);
    };
    match OpenAi::new(api_key, &secrets.model) {
        Ok(llm) => {
            let llm = match secrets.openai_base_url.as_deref() {
                Some(url) => llm.with_base_url(url),
                None => llm,
            };
            tracing::info!(model = %secrets.model, "language model routing enabled");
            Arc::new(Local::new(Arc::new(llm)))
        }
        Err(e) => {
            tracing::warn!(%e, "language model unavailable, every query is geocoded as typed");
            Arc::new(Fallback)
        }
    }
}

async fn search(args: config::SearchArgs) {
    let store = args.data_dir().and_then(|dir| match ViewportStore::open(&dir) {
        Ok(store) => Some(store),
        Err(e) => {
            tracing::warn!(%e, "viewport will not be remembered");
            None
        }
    });
    let viewport = store.as_ref().map(ViewportStore::load).unwrap_or_default();
    println!("[map] {} zoom {:.1}", viewport.center, viewport.zoom);

    let remote = args
        .backend
        .as_deref()
        .map(|url| Remote::new(url).expect("backend client"))
        .map(Arc::new);

    let token = match (&args.secrets.mapbox_token, &remote) {
        (Some(token), _) => Some(token.clone()),
        (None, Some(remote)) => remote.token().await.unwrap_or_else(|e| {
            tracing::error!(%e, "could not fetch map token from backend");
            None
        }),
        (None, None) => None,
    };
    let Some(token) = token else {
        tracing::error!("no map token: set MAPBOX_ACCESS_TOKEN or point --backend at a configured server");
        std::process::exit(1);
    };

    let interpreter: Arc<dyn Interpreter> = match remote {
        Some(remote) => {
            tracing::info!(backend = ?args.backend, "resolving queries through backend");
            remote
        }
        None => local_interpreter(&args.secrets),
    };
    let geocoder = Arc::new(mapbox::Backend::new(token).expect("geocoder client"));
    let surface = Arc::new(surface::terminal::Surface::new(viewport, store));
    let tracker: Arc<dyn Tracker> = if args.no_analytics {
        Arc::new(track::noop::Tracker)
    } else {
        Arc::new(track::log::Tracker)
    };

    let orchestrator = Orchestrator::new(interpreter, geocoder, surface.clone(), tracker.clone());

    let started = Instant::now();
    run_interactive(&orchestrator, &surface).await;

    let minutes = started.elapsed().as_secs_f64() / 60.0;
    tracker.track(
        track::TIME_SPENT,
        serde_json::json!({ "duration": (minutes * 100.0).round() / 100.0 }),
    );
}

async fn run_interactive(orchestrator: &Orchestrator, surface: &surface::terminal::Surface) {
    use futures_lite::io::AsyncBufReadExt;

    let interactive = std::io::stdin().is_terminal();
    if interactive {
        println!("{}", repl::HELP);
    }

    let stdin = blocking::Unblock::new(std::io::stdin());
    let mut lines = Box::pin(futures_lite::io::BufReader::new(stdin).lines());

    while let Some(line) = lines.next().await {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(%e, "failed to read input");
                break;
            }
        };
        match Input::parse(&line) {
            Input::Query(query) => match orchestrator.submit(query).await {
                Outcome::Rendered(places) if places.len() > 1 => {
                    println!("{} places found", places.len());
                }
                Outcome::Failed(reason) => tracing::debug!(%reason, "search failed"),
                Outcome::Rendered(_) | Outcome::NoResults | Outcome::Ignored => {}
            },
            Input::Clear => orchestrator.clear(),
            Input::Markers => surface.list_markers(),
            Input::Locate(fix) => {
                if let Some(address) = orchestrator.locate(fix).await {
                    println!("You are near {address}");
                }
            }
            Input::Deny => orchestrator.location_denied(),
            Input::View(viewport) => surface.set_viewport(viewport),
            Input::Help => println!("{}", repl::HELP),
            Input::Quit => break,
            Input::Empty => {}
            Input::Invalid(message) => eprintln!("{message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_key_means_fallback() {
        let secrets = Secrets {
            mapbox_token: None,
            openai_api_key: None,
            model: "gpt-4o-mini".into(),
            openai_base_url: None,
        };
        let interpreter = local_interpreter(&secrets);
        assert_eq!(
            futures_lite::future::block_on(interpreter.interpret("anything")),
            Ok(interpret::Interpretation::Direct)
        );
    }
}
