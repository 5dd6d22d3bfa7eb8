//! Channel table UI component.
//!
//! Renders one row per channel with columns for number, state, name and
//! loop length, plus toggle buttons for the per-channel controls.

use iced::widget::{button, column, container, row, text, text_input, Column};
use iced::{Background, Border, Color, Element, Length, Theme};

use crate::channel::Channel;
use crate::engine::Engine;

/// Column widths for consistent table layout.
const COL_NUM_WIDTH: f32 = 40.0;
const COL_STATE_WIDTH: f32 = 230.0;
const COL_NAME_WIDTH: f32 = 180.0;
const COL_LEN_WIDTH: f32 = 80.0;
const COL_CONTROLS_WIDTH: f32 = 230.0;
const ROW_HEIGHT: f32 = 36.0;

/// Snapshot of one channel for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelRow {
    pub number: usize,
    pub state: String,
    pub name: String,
    pub length: String,
    pub enabled: bool,
    pub recording: bool,
    pub looped: bool,
    pub playing: bool,
}

impl ChannelRow {
    pub fn from_channel(channel: &Channel<'_>) -> Self {
        Self {
            number: channel.number(),
            state: channel.state_string(),
            name: channel.name(),
            length: format_length(channel.recording_length_in_seconds()),
            enabled: channel.is_enabled(),
            recording: channel.is_recording(),
            looped: channel.is_looped(),
            playing: channel.is_playing(),
        }
    }
}

fn format_length(seconds: f64) -> String {
    format!("{:.2}s", seconds)
}

/// Row highlighting colors.
fn row_background(row: &ChannelRow) -> Color {
    if row.recording {
        Color::from_rgb(0.45, 0.12, 0.12) // Red
    } else if row.playing {
        Color::from_rgb(0.15, 0.45, 0.15) // Green
    } else if row.enabled {
        Color::from_rgb(0.5, 0.35, 0.1) // Orange
    } else {
        Color::from_rgb(0.12, 0.12, 0.12) // Dark grey
    }
}

/// Header text color.
fn header_color() -> Color {
    Color::from_rgb(0.7, 0.7, 0.7)
}

/// Cell text color.
fn cell_color() -> Color {
    Color::from_rgb(0.9, 0.9, 0.9)
}

/// Render the table header row.
fn view_table_header<'a, M: 'a>() -> Element<'a, M> {
    let hdr_color = header_color();

    let cell = |label: &'static str, width: f32| {
        container(text(label).size(12).color(hdr_color))
            .width(Length::Fixed(width))
            .padding([4, 8])
            .center_y(Length::Fixed(ROW_HEIGHT))
    };

    container(
        row![
            cell("#", COL_NUM_WIDTH),
            cell("STATE", COL_STATE_WIDTH),
            cell("NAME", COL_NAME_WIDTH),
            cell("LENGTH", COL_LEN_WIDTH),
            cell("CONTROLS", COL_CONTROLS_WIDTH),
        ]
        .spacing(2),
    )
    .style(|_theme: &Theme| container::Style {
        background: Some(Background::Color(Color::from_rgb(0.08, 0.08, 0.08))),
        border: Border::default().rounded(2),
        ..Default::default()
    })
    .into()
}

/// A small button that lights up while its flag is set.
fn toggle_button<'a, M: 'a + Clone>(
    label: &'static str,
    active: bool,
    active_color: Color,
    on_press: M,
) -> Element<'a, M> {
    let txt_color = cell_color();
    let bg_color = if active {
        active_color
    } else {
        Color::from_rgb(0.25, 0.25, 0.25)
    };

    button(text(label).size(12).color(txt_color))
        .on_press(on_press)
        .padding([1, 6])
        .style(move |_theme, _status| button::Style {
            background: Some(Background::Color(bg_color)),
            text_color: txt_color,
            border: Border::default().rounded(2),
            ..Default::default()
        })
        .into()
}

/// Render a single table row for a channel.
fn view_channel_row<'a, M: 'a + Clone>(
    channel_row: ChannelRow,
    on_activate: M,
    on_toggle_recording: M,
    on_toggle_looped: M,
    on_toggle_playing: M,
    on_rename: impl Fn(String) -> M + 'a,
) -> Element<'a, M> {
    let bg_color = row_background(&channel_row);
    let txt_color = cell_color();

    let name_input = text_input("name", &channel_row.name)
        .on_input(on_rename)
        .size(13)
        .width(Length::Fixed(COL_NAME_WIDTH - 8.0));

    let controls: Element<'a, M> = row![
        toggle_button(
            "ACT",
            channel_row.enabled,
            Color::from_rgb(0.6, 0.42, 0.12),
            on_activate
        ),
        toggle_button(
            "REC",
            channel_row.recording,
            Color::from_rgb(0.7, 0.15, 0.15),
            on_toggle_recording
        ),
        toggle_button(
            "LOOP",
            channel_row.looped,
            Color::from_rgb(0.2, 0.35, 0.7),
            on_toggle_looped
        ),
        toggle_button(
            "PLAY",
            channel_row.playing,
            Color::from_rgb(0.2, 0.6, 0.2),
            on_toggle_playing
        ),
    ]
    .spacing(4)
    .align_y(iced::Center)
    .into();

    container(
        row![
            // 1-based, like the channel labels on hardware
            container(
                text((channel_row.number + 1).to_string())
                    .size(14)
                    .color(txt_color)
            )
            .width(Length::Fixed(COL_NUM_WIDTH))
            .padding([4, 8])
            .center_y(Length::Fixed(ROW_HEIGHT)),
            container(text(channel_row.state).size(14).color(txt_color))
                .width(Length::Fixed(COL_STATE_WIDTH))
                .padding([4, 8])
                .center_y(Length::Fixed(ROW_HEIGHT)),
            container(name_input)
                .width(Length::Fixed(COL_NAME_WIDTH))
                .padding([2, 4])
                .center_y(Length::Fixed(ROW_HEIGHT)),
            container(text(channel_row.length).size(14).color(txt_color))
                .width(Length::Fixed(COL_LEN_WIDTH))
                .padding([4, 8])
                .center_y(Length::Fixed(ROW_HEIGHT)),
            container(controls)
                .width(Length::Fixed(COL_CONTROLS_WIDTH))
                .padding([2, 4])
                .center_y(Length::Fixed(ROW_HEIGHT)),
        ]
        .spacing(2),
    )
    .style(move |_theme: &Theme| container::Style {
        background: Some(Background::Color(bg_color)),
        border: Border::default().rounded(2),
        ..Default::default()
    })
    .height(Length::Fixed(ROW_HEIGHT))
    .into()
}

/// Build the complete channel table.
///
/// Callbacks:
/// - `on_activate`: select the channel as the single active one
/// - `on_toggle_recording` / `on_toggle_looped` / `on_toggle_playing`: flip that flag
/// - `on_rename`: invoked on every edit of the name field
pub fn view_channel_table<'a, M: 'a + Clone>(
    engine: &Engine,
    on_activate: impl Fn(usize) -> M + 'a + Copy,
    on_toggle_recording: impl Fn(usize) -> M + 'a + Copy,
    on_toggle_looped: impl Fn(usize) -> M + 'a + Copy,
    on_toggle_playing: impl Fn(usize) -> M + 'a + Copy,
    on_rename: impl Fn(usize, String) -> M + 'a + Copy,
) -> Element<'a, M> {
    let rows: Vec<Element<'a, M>> = engine
        .channels()
        .map(|channel| {
            let number = channel.number();
            view_channel_row(
                ChannelRow::from_channel(&channel),
                on_activate(number),
                on_toggle_recording(number),
                on_toggle_looped(number),
                on_toggle_playing(number),
                move |name| on_rename(number, name),
            )
        })
        .collect();

    column![view_table_header(), Column::with_children(rows).spacing(2)]
        .spacing(4)
        .padding(8)
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::LooperConfig;
    use crate::synth::NullSynth;

    #[test]
    fn test_row_snapshot() {
        let clock = ManualClock::new(1000);
        let engine = Engine::new(
            &LooperConfig::default(),
            Box::new(clock.clone()),
            Box::new(NullSynth),
        )
        .unwrap();

        let channel = engine.channel(4);
        channel.set_name("Pads");
        channel.start_recording();
        clock.set(1500);
        engine.on_midi_message(&[0x94, 60, 100]);
        channel.stop_recording();
        engine.set_active_channel(4);

        let row = ChannelRow::from_channel(&engine.channel(4));
        assert_eq!(row.number, 4);
        assert_eq!(row.name, "Pads");
        assert_eq!(row.state, "recorded enabled");
        assert_eq!(row.length, "1.50s");
        assert!(row.enabled);
        assert!(!row.recording);
        assert_eq!(row_background(&row), Color::from_rgb(0.5, 0.35, 0.1));
    }

    #[test]
    fn test_format_length() {
        assert_eq!(format_length(0.0), "0.00s");
        assert_eq!(format_length(2.345), "2.35s");
    }
}
