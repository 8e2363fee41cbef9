//! Optional tracing output shaped after the algorithm's recursion.
//!
//! Enabled with the `log` feature. Layer [`TreeLayer`] under a
//! `tracing_subscriber` registry to print one line per span and event,
//! indented by span nesting, so the N-degree permutation search reads as a
//! tree:
//!
//! ```no_run
//! use rdf_c14n::logger::TreeLayer;
//! use tracing_subscriber::prelude::*;
//!
//! tracing_subscriber::registry()
//!     .with(TreeLayer::default())
//!     .init();
//! ```

use std::fmt::Write as _;
use tracing::field::{Field, Visit};
use tracing::{span, Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// Prints spans and events indented by span nesting depth.
pub struct TreeLayer {
    indent_width: usize,
}

impl TreeLayer {
    pub fn new(indent_width: usize) -> Self {
        Self { indent_width }
    }

    fn print(&self, depth: usize, text: &str) {
        println!("{}{}", " ".repeat(depth * self.indent_width), text);
    }
}

impl Default for TreeLayer {
    fn default() -> Self {
        Self::new(2)
    }
}

impl<S> Layer<S> for TreeLayer
where
    S: Subscriber,
    for<'lookup> S: LookupSpan<'lookup>,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };
        let depth = span.scope().count().saturating_sub(1);

        let mut fields = FieldCollector::default();
        attrs.record(&mut fields);
        let mut line = span.metadata().name().to_string();
        if !fields.rendered.is_empty() {
            let _ = write!(line, " [{}]", fields.rendered.trim_end());
        }
        self.print(depth, &line);
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let depth = ctx.lookup_current().map_or(0, |span| span.scope().count());

        let mut fields = FieldCollector::default();
        event.record(&mut fields);
        let line = if fields.message.is_empty() {
            fields.rendered.trim_end().to_string()
        } else {
            fields.message
        };
        self.print(depth, &line);
    }
}

#[derive(Default)]
struct FieldCollector {
    message: String,
    rendered: String,
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            let _ = write!(self.rendered, "{}={} ", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            let _ = write!(self.rendered, "{}={:?} ", field.name(), value);
        }
    }
}
