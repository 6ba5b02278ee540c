
use crate::{
    convert::{EventLine, EventSink},
    error::*,
};

use std::io::Write;

use handlebars::Handlebars;

/// Handlebars template for rendering an event to its log line.
pub const TEMPLATE: &'static str = include_str!("event.hb");

/// Event to log line rendering service.
pub struct EventRenderer {
    hb: Handlebars,
}

impl EventRenderer {
    pub fn new() -> Self {
        let mut reg = Handlebars::new();
        // the output is a pipe-delimited log, not html
        reg.register_escape_fn(handlebars::no_escape);
        reg.register_template_string("event", TEMPLATE)
            .expect("unexpected handlebars template compilation failure");

        EventRenderer {
            hb: reg,
        }
    }

    /// Render one event into its log line form.
    pub fn render_line(&self, event: &EventLine) -> Result<String> {
        Ok(self.hb.render("event", event)?)
    }
}

impl Default for EventRenderer {
    fn default() -> Self {
        EventRenderer::new()
    }
}

/// Sink that renders each event and writes one line to the underlying
/// writer.
pub struct WriteSink<W> {
    renderer: EventRenderer,
    out: W,
}

impl<W: Write> WriteSink<W> {
    pub fn new(out: W) -> Self {
        WriteSink {
            renderer: EventRenderer::new(),
            out,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> EventSink for WriteSink<W> {
    fn emit(&mut self, event: &EventLine) -> Result<()> {
        let line = self.renderer.render_line(event)?;
        writeln!(self.out, "{}", line)?;
        Ok(())
    }
}

#[test]
fn new_event_renderer() {
    // make sure this doesn't panic from handlebars failure
    EventRenderer::new();
}
