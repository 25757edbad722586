use serde::ser::{SerializeMap, Serializer};
use serde_json::Value;
use std::io::Write;
use time::format_description::well_known::Rfc3339;
use tracing::{Event, Subscriber};
use tracing_bunyan_formatter::JsonStorage;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// Emits every event as a single JSON object terminated by a newline.
pub struct JsonLogLayer<W: for<'a> MakeWriter<'a> + 'static> {
    make_writer: W,
    hostname: String,
    version: String,
    application: String,
}

const TIMESTAMP: &str = "timestamp";
const APPLICATION: &str = "application";
const VERSION: &str = "version";
const HOSTNAME: &str = "hostname";
const LEVEL: &str = "level";
const TARGET: &str = "target";
const MESSAGE: &str = "message";
const FILE: &str = "file";
const LINE: &str = "line";

const RESERVED_FIELDS: [&str; 9] = [
    TIMESTAMP,
    APPLICATION,
    VERSION,
    HOSTNAME,
    LEVEL,
    TARGET,
    MESSAGE,
    FILE,
    LINE,
];

impl<W: for<'a> MakeWriter<'a> + 'static> JsonLogLayer<W> {
    pub fn new(application: String, version: String, make_writer: W) -> Self {
        let hostname = gethostname::gethostname().to_string_lossy().into_owned();
        Self::with_hostname(application, version, hostname, make_writer)
    }

    pub fn with_hostname(
        application: String,
        version: String,
        hostname: String,
        make_writer: W,
    ) -> Self {
        Self {
            make_writer,
            application,
            version,
            hostname,
        }
    }

    fn serialize_core_fields(
        &self,
        map_serializer: &mut impl SerializeMap<Error = serde_json::Error>,
        message: &str,
        event: &Event<'_>,
    ) -> Result<(), std::io::Error> {
        if let Ok(timestamp) = &time::OffsetDateTime::now_utc().format(&Rfc3339) {
            map_serializer.serialize_entry(TIMESTAMP, timestamp)?;
        }
        map_serializer.serialize_entry(
            LEVEL,
            &event.metadata().level().to_string().to_lowercase(),
        )?;
        map_serializer.serialize_entry(TARGET, event.metadata().target())?;
        map_serializer.serialize_entry(MESSAGE, message)?;
        map_serializer.serialize_entry(APPLICATION, &self.application)?;
        map_serializer.serialize_entry(VERSION, &self.version)?;
        map_serializer.serialize_entry(HOSTNAME, &self.hostname)?;
        map_serializer.serialize_entry(FILE, &event.metadata().file())?;
        map_serializer.serialize_entry(LINE, &event.metadata().line())?;
        Ok(())
    }

    fn emit(&self, mut buffer: Vec<u8>) -> Result<(), std::io::Error> {
        buffer.write_all(b"\n")?;
        self.make_writer.make_writer().write_all(&buffer)
    }
}

impl<S, W> Layer<S> for JsonLogLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'a> MakeWriter<'a> + 'static,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut event_visitor = JsonStorage::default();
        event.record(&mut event_visitor);
        let current_span = ctx.lookup_current();

        let format = || {
            let mut buffer = Vec::new();

            let mut serializer = serde_json::Serializer::new(&mut buffer);
            let mut map_serializer = serializer.serialize_map(None)?;

            let message = event_message(event, &event_visitor);
            self.serialize_core_fields(&mut map_serializer, &message, event)?;

            for (key, value) in event_visitor
                .values()
                .iter()
                .filter(|(key, _)| !RESERVED_FIELDS.contains(*key))
            {
                map_serializer.serialize_entry(key, value)?;
            }

            // Span fields, unless the event set the same key itself.
            if let Some(span) = &current_span {
                let extensions = span.extensions();
                if let Some(visitor) = extensions.get::<JsonStorage>() {
                    for (key, value) in visitor.values() {
                        if !RESERVED_FIELDS.contains(key)
                            && !event_visitor.values().contains_key(key)
                        {
                            map_serializer.serialize_entry(key, value)?;
                        }
                    }
                }
            }

            map_serializer.end()?;
            Ok(buffer)
        };

        let result: std::io::Result<Vec<u8>> = format();
        if let Ok(formatted) = result {
            let _ = self.emit(formatted);
        }
    }
}

/// The event's `message` field, or its target when there is none.
fn event_message(event: &Event<'_>, event_visitor: &JsonStorage<'_>) -> String {
    match event_visitor.values().get(MESSAGE) {
        Some(Value::String(message)) => message.clone(),
        _ => event.metadata().target().to_owned(),
    }
}
