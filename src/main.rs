mod audio;
mod config;
mod controller;
mod error;
mod logging;
mod media_session;
mod model;
mod resolver;
mod view;

#[cfg(test)]
mod testing;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use audio::{AudioOutput, HeadlessOutput, OutputEventSender};
use config::{Args, Config, OutputKind};
use controller::{AppController, SessionController};
use model::{AppModel, Catalog};
use resolver::{HttpResolver, ResolutionPipeline};
use view::AppView;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load(Args::parse())?;

    let _log_guard = match logging::init_logging(&config.log_dir) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: Failed to initialize logging: {:#}", e);
            None
        }
    };

    tracing::info!("=== jukebox-rs starting ===");
    tracing::debug!(?config, "Configuration loaded");

    let catalog = Arc::new(
        Catalog::load(&config.catalog)
            .with_context(|| format!("Failed to load catalog {}", config.catalog.display()))?,
    );

    let resolver = HttpResolver::new(config.endpoint.clone())?;
    let pipeline = Arc::new(ResolutionPipeline::new(
        Arc::new(resolver),
        config.resolve_timeout,
        config.retry,
    ));

    let (output_events, output_rx) = audio::output_event_channel();
    let output = build_output(config.output, output_events, config.volume)?;

    let session = SessionController::new(catalog.clone(), pipeline, output, config.volume)?;
    let _transport_listener = session.start_transport_listener(output_rx);

    #[cfg(feature = "media-controls")]
    attach_media_controls(&session).await;

    let model = Arc::new(AppModel::new(catalog.len()));
    let controller = AppController::new(session, model.clone(), config.download_dir.clone());
    let _notification_listener = controller.start_notification_listener();

    tracing::info!("Starting TUI...");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, model, controller).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = ?err, "Application error");
    }

    tracing::info!("jukebox-rs shutting down");
    Ok(())
}

fn build_output(kind: OutputKind, events: OutputEventSender, volume: f32) -> Result<Box<dyn AudioOutput>> {
    match kind {
        OutputKind::Headless => {
            tracing::info!("Using headless audio output");
            Ok(Box::new(HeadlessOutput::new(events)?))
        }
        #[cfg(feature = "rodio-output")]
        OutputKind::Rodio => Ok(Box::new(audio::RodioOutput::new(events, volume)?)),
        #[cfg(not(feature = "rodio-output"))]
        OutputKind::Rodio => {
            let _ = (events, volume);
            anyhow::bail!("this build has no sound device support; rebuild with --features rodio-output")
        }
    }
}

/// Media keys and the platform "now playing" surface. Failure is not fatal.
#[cfg(feature = "media-controls")]
async fn attach_media_controls(session: &SessionController) {
    let (actions, mut action_rx) = tokio::sync::mpsc::unbounded_channel();
    match media_session::SouvlakiSink::new(actions) {
        Ok(sink) => {
            session.attach_media_session(Box::new(sink)).await;
            let session = session.clone();
            tokio::spawn(async move {
                while let Some(action) = action_rx.recv().await {
                    session.apply_media_action(action).await;
                }
            });
        }
        Err(e) => tracing::warn!(error = %e, "Media controls unavailable"),
    }
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    model: Arc<AppModel>,
    controller: AppController,
) -> io::Result<()> {
    loop {
        // Auto-clear old errors (after 5 seconds)
        model.auto_clear_old_errors().await;

        let snapshot = controller.session().snapshot().await;
        let ui_state = model.get_ui_state().await;
        let should_quit = model.should_quit().await;

        terminal.draw(|f| {
            AppView::render(f, &snapshot, &ui_state, controller.session().catalog());
        })?;

        // Handle input with shorter poll time for smoother UI updates
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if let Err(e) = controller.handle_key_event(key).await {
                    tracing::warn!(error = %e, "Key handling failed");
                }
            }
        }

        if should_quit {
            break;
        }
    }

    Ok(())
}
