//! MIDI Looper - records incoming MIDI into channels and loops them back out.
//!
//! Connects a MIDI input and a MIDI output (preferring IAC Driver on macOS)
//! and shows every channel's state in a table.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use iced::time::{self, milliseconds};
use iced::widget::{column, container, text};
use iced::{Element, Fill, Subscription, Theme};
use tracing_subscriber::EnvFilter;

use midi_looper::config::LooperConfig;
use midi_looper::session::Session;
use midi_looper::ui::channel_table::view_channel_table;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(LooperConfig::default_path);
    let config = LooperConfig::load(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    let session = Arc::new(Session::start(&config).context("starting looper")?);

    iced::application(
        move || Looper::new(Arc::clone(&session)),
        Looper::update,
        Looper::view,
    )
    .title("MIDI Looper")
    .subscription(Looper::subscription)
    .theme(Looper::theme)
    .run()?;

    Ok(())
}

struct Looper {
    session: Arc<Session>,
}

#[derive(Debug, Clone)]
enum Message {
    Tick,
    Activate(usize),
    ToggleRecording(usize),
    ToggleLooped(usize),
    TogglePlaying(usize),
    Rename(usize, String),
}

impl Looper {
    fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    fn update(&mut self, message: Message) {
        let engine = self.session.engine();
        match message {
            Message::Tick => {
                // State is updated by the MIDI and sequencer threads, just re-render
            }
            Message::Activate(n) => engine.set_active_channel(n),
            Message::ToggleRecording(n) => engine.channel(n).toggle_recording(),
            Message::ToggleLooped(n) => engine.channel(n).toggle_looped(),
            Message::TogglePlaying(n) => engine.channel(n).toggle_playing(),
            Message::Rename(n, name) => engine.channel(n).set_name(name),
        }
    }

    fn view(&self) -> Element<'_, Message> {
        let ports = format!(
            "🎵 {} → {}",
            self.session.input_port(),
            self.session.output_port()
        );

        let content = column![
            text("MIDI Looper").size(32),
            text(ports).size(14),
            view_channel_table(
                self.session.engine(),
                Message::Activate,
                Message::ToggleRecording,
                Message::ToggleLooped,
                Message::TogglePlaying,
                Message::Rename,
            ),
        ]
        .spacing(8)
        .padding(16);

        container(content).width(Fill).height(Fill).into()
    }

    fn subscription(&self) -> Subscription<Message> {
        time::every(milliseconds(50)).map(|_| Message::Tick)
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}
