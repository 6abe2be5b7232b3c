//! Plain console format for platform log aggregation.
//!
//! `2026-10-16T08:15:02.123Z INFO  [orders] cfkit::postgres: Connected [init{pool=16}]`

use chrono::SecondsFormat;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, FormattedFields};
use tracing_subscriber::registry::LookupSpan;

pub struct ProductionLogFormat {
    application_name: String,
}

impl ProductionLogFormat {
    pub fn new(application_name: String) -> Self {
        Self { application_name }
    }

    fn write_spans<S, N>(writer: &mut Writer<'_>, ctx: &FmtContext<'_, S, N>) -> std::fmt::Result
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
        N: for<'a> FormatFields<'a> + 'static,
    {
        let Some(scope) = ctx.event_scope() else {
            return Ok(());
        };

        // Outermost span first.
        let spans: Vec<_> = scope.from_root().collect();
        if spans.is_empty() {
            return Ok(());
        }

        write!(writer, " ")?;
        for span in spans {
            write!(writer, "[{}", span.name())?;
            if let Some(fields) = span.extensions().get::<FormattedFields<N>>()
                && !fields.is_empty()
            {
                write!(writer, "{{{}}}", fields)?;
            }
            write!(writer, "]")?;
        }

        Ok(())
    }
}

impl<S, N> FormatEvent<S, N> for ProductionLogFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();

        write!(
            writer,
            "{} {:<5} ",
            chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            metadata.level()
        )?;
        if !self.application_name.is_empty() {
            write!(writer, "[{}] ", self.application_name)?;
        }
        write!(writer, "{}: ", metadata.target())?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        Self::write_spans(&mut writer, ctx)?;

        writeln!(writer)
    }
}
