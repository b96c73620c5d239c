//! Log lines emitted by a source's pipeline carry the run and the source

mod mocks;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use mocks::fixtures::{quoted_router, swap_request};
use mocks::TimingControlledAdapter;
use swap_router::{RouteMode, SourceId};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

#[derive(Debug, Clone, Default)]
struct Fields(BTreeMap<String, String>);

impl Visit for Fields {
	fn record_str(&mut self, field: &Field, value: &str) {
		self.0.insert(field.name().to_string(), value.to_string());
	}

	fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
		self.0.insert(field.name().to_string(), format!("{:?}", value));
	}
}

/// An event's message with the fields of its enclosing `route` span
#[derive(Debug, Clone)]
struct Captured {
	message: String,
	route: Option<Fields>,
}

#[derive(Clone, Default)]
struct CaptureLayer {
	events: Arc<Mutex<Vec<Captured>>>,
}

impl CaptureLayer {
	fn events(&self) -> Vec<Captured> {
		self.events.lock().unwrap().clone()
	}
}

impl<S> Layer<S> for CaptureLayer
where
	S: Subscriber + for<'a> LookupSpan<'a>,
{
	fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
		let mut fields = Fields::default();
		attrs.record(&mut fields);
		if let Some(span) = ctx.span(id) {
			span.extensions_mut().insert(fields);
		}
	}

	fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
		let mut fields = Fields::default();
		event.record(&mut fields);
		let message = fields.0.remove("message").unwrap_or_default();

		let mut route = None;
		if let Some(scope) = ctx.event_scope(event) {
			for span in scope.from_root() {
				if span.name() == "route" {
					route = span.extensions().get::<Fields>().cloned();
				}
			}
		}
		self.events.lock().unwrap().push(Captured { message, route });
	}
}

/// Run id announced by the run's opening log line
fn announced_run_id(events: &[Captured]) -> String {
	let opening = events
		.iter()
		.find(|event| event.message.starts_with("Run ") && event.message.contains(" -> "))
		.expect("run should be announced");
	opening.message["Run ".len()..]
		.split(':')
		.next()
		.unwrap()
		.to_string()
}

#[tokio::test(start_paused = true)]
async fn test_pipeline_logs_carry_run_and_source() {
	let capture = CaptureLayer::default();
	let subscriber = tracing_subscriber::registry().with(capture.clone());
	let _guard = tracing::subscriber::set_default(subscriber);

	let zerox = TimingControlledAdapter::fast(SourceId::ZeroX, 0.99);
	let odos = TimingControlledAdapter::fast(SourceId::Odos, 0.995);
	let paraswap = TimingControlledAdapter::failing(SourceId::Paraswap, "paraswap is down");
	let router = quoted_router(vec![zerox.shared(), odos.shared(), paraswap.shared()]);

	let routes = router
		.swap_routes(swap_request(RouteMode::Execution).with_ignore(vec![SourceId::Odos]))
		.await
		.unwrap();
	assert_eq!(routes.len(), 1);
	assert_eq!(routes[0].source, SourceId::ZeroX);

	let events = capture.events();
	let run_id = announced_run_id(&events);

	let ignored = events
		.iter()
		.find(|event| event.message.starts_with("Ignoring quote from"))
		.expect("ignored source should be logged");
	let route = ignored.route.as_ref().expect("logged inside a route span");
	assert_eq!(route.0.get("source").map(String::as_str), Some("odos"));
	assert_eq!(route.0.get("run_id"), Some(&run_id));

	// Logged by the adapter itself, which knows nothing about the run
	let failed = events
		.iter()
		.find(|event| event.message.contains("returned no quote"))
		.expect("failed source should be logged");
	let route = failed.route.as_ref().expect("logged inside a route span");
	assert_eq!(route.0.get("source").map(String::as_str), Some("paraswap"));
	assert_eq!(route.0.get("run_id"), Some(&run_id));
}
