//! Terminal progress rendering.
//!
//! Presentation only: consumes [`ProgressSnapshot`]s, never touches the
//! transfer. A TTY gets an indicatif bar; pipes and log files get a
//! throttled single line rewritten with `\r`.

use std::fmt::Write as _;
use std::io::{self, IsTerminal, Write};
use std::time::{Duration, Instant};

use indicatif::{HumanBytes, ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};

use super::format::{format_bytes, format_eta, format_speed};
use super::reporter::ProgressSnapshot;

const LABEL_WIDTH: usize = 40;
const PLAIN_INTERVAL: Duration = Duration::from_millis(250);

/// CLI progress display that picks a renderer from the terminal capability.
pub struct CliProgressPrinter {
    inner: Renderer,
}

enum Renderer {
    Bar(BarRenderer),
    Line(LineRenderer),
}

impl CliProgressPrinter {
    pub fn new() -> Self {
        if io::stdout().is_terminal() {
            Self {
                inner: Renderer::Bar(BarRenderer::new()),
            }
        } else {
            Self {
                inner: Renderer::Line(LineRenderer::new()),
            }
        }
    }

    /// Redraw with the latest snapshot.
    pub fn update(&mut self, label: &str, snapshot: &ProgressSnapshot) {
        match &mut self.inner {
            Renderer::Bar(inner) => inner.update(label, snapshot),
            Renderer::Line(inner) => inner.update(label, snapshot),
        }
    }

    /// Print a message without corrupting the bar.
    pub fn message(&mut self, text: &str) {
        match &mut self.inner {
            Renderer::Bar(inner) => inner.bar.println(text),
            Renderer::Line(inner) => {
                inner.finish();
                println!("{text}");
            }
        }
    }

    /// Finish and clear the progress display.
    pub fn finish(&mut self) {
        match &mut self.inner {
            Renderer::Bar(inner) => inner.finish(),
            Renderer::Line(inner) => inner.finish(),
        }
    }
}

impl Default for CliProgressPrinter {
    fn default() -> Self {
        Self::new()
    }
}

struct BarRenderer {
    bar: ProgressBar,
    has_length: bool,
}

impl BarRenderer {
    fn new() -> Self {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stdout());
        bar.set_style(Self::spinner_style());
        bar.enable_steady_tick(Duration::from_millis(120));
        Self {
            bar,
            has_length: false,
        }
    }

    fn update(&mut self, label: &str, snapshot: &ProgressSnapshot) {
        self.bar.set_message(truncate_label(label));
        self.bar.set_prefix(format!(
            "{} ETA {}",
            format_speed(snapshot.speed),
            format_eta(snapshot.eta)
        ));

        match snapshot.total {
            Some(total) => {
                if !self.has_length {
                    self.bar.set_style(Self::bar_style());
                    self.has_length = true;
                }
                if self.bar.length() != Some(total) {
                    self.bar.set_length(total);
                }
                self.bar.set_position(snapshot.bytes.min(total));
            }
            None => self.bar.set_position(snapshot.bytes),
        }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner} {msg} {human_bytes:>10} @ {prefix}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .with_key("human_bytes", |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                let _ = write!(w, "{}", HumanBytes(state.pos()));
            })
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{msg} {bar:28.cyan/blue} {human_bytes:>10} / {human_total:>10} ({percent:>3}%) @ {prefix}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .with_key("human_bytes", |state: &ProgressState, w: &mut dyn std::fmt::Write| {
            let _ = write!(w, "{}", HumanBytes(state.pos()));
        })
        .with_key("human_total", |state: &ProgressState, w: &mut dyn std::fmt::Write| {
            let value = state
                .len()
                .map_or_else(|| "?".to_string(), |len| HumanBytes(len).to_string());
            let _ = write!(w, "{value}");
        })
    }
}

struct LineRenderer {
    last_emit: Option<Instant>,
    drawn_width: usize,
    dirty: bool,
}

impl LineRenderer {
    const fn new() -> Self {
        Self {
            last_emit: None,
            drawn_width: 0,
            dirty: false,
        }
    }

    fn update(&mut self, label: &str, snapshot: &ProgressSnapshot) {
        let now = Instant::now();
        let done = snapshot.total.is_some_and(|t| snapshot.bytes >= t);
        if !done
            && self
                .last_emit
                .is_some_and(|last| now.duration_since(last) < PLAIN_INTERVAL)
        {
            return;
        }
        self.last_emit = Some(now);

        let line = plain_line(label, snapshot);
        let pad = self.drawn_width.saturating_sub(line.len());
        print!("\r{line}{:pad$}", "");
        io::stdout().flush().ok();

        self.drawn_width = line.len();
        self.dirty = true;
    }

    fn finish(&mut self) {
        if self.dirty {
            println!();
            self.dirty = false;
            self.drawn_width = 0;
        }
    }
}

fn plain_line(label: &str, snapshot: &ProgressSnapshot) -> String {
    let mut line = format!("{}: {}", truncate_label(label), format_bytes(snapshot.bytes));
    if let Some(total) = snapshot.total {
        let _ = write!(line, " / {}", format_bytes(total));
    }
    if let Some(pct) = snapshot.percent {
        let _ = write!(line, " ({pct:.1}%)");
    }
    let _ = write!(
        line,
        " @ {} ETA {}",
        format_speed(snapshot.speed),
        format_eta(snapshot.eta)
    );
    line
}

fn truncate_label(raw: &str) -> String {
    if raw.chars().count() <= LABEL_WIDTH {
        return raw.to_string();
    }
    let mut buf: String = raw.chars().take(LABEL_WIDTH - 1).collect();
    buf.push('…');
    buf
}
