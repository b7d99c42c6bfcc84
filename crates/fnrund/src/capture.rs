//! Scoped capture of diagnostic output.
//!
//! While a [`CaptureScope`] is open on a thread, diagnostic writes made on that
//! thread land in a private buffer instead of the process stderr. Two write
//! paths are redirected:
//!
//! - `tracing` events, through a thread-scoped default subscriber that renders
//!   each event as `LEVEL message key=value`;
//! - raw bytes written to [`stderr()`].
//!
//! The redirection target is thread-local, so workers running invocations in
//! parallel never observe each other's buffers. Dropping the scope, including
//! during unwinding, reinstates whatever target was active before it opened.

use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};
use std::panic::{self, PanicHookInfo};
use std::sync::{Arc, Mutex, PoisonError};

use once_cell::sync::OnceCell;
use tracing::field::{Field, Visit};
use tracing::level_filters::LevelFilter;
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};

use crate::envelope::DiagnosticLog;

thread_local! {
    static ACTIVE: RefCell<Option<Arc<CaptureBuffer>>> = const { RefCell::new(None) };
}

static PANIC_HOOK: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
struct CaptureBuffer {
    bytes: Mutex<Vec<u8>>,
}

impl CaptureBuffer {
    fn append(&self, data: &[u8]) {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(data);
    }

    fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.bytes.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

fn active_buffer() -> Option<Arc<CaptureBuffer>> {
    ACTIVE.with(|active| active.borrow().clone())
}

/// Redirects this thread's diagnostic output until finished or dropped.
#[must_use = "diagnostics are only captured while the scope is alive"]
pub struct CaptureScope {
    buffer: Arc<CaptureBuffer>,
    previous: Option<Arc<CaptureBuffer>>,
    _dispatch: DefaultGuard,
}

impl CaptureScope {
    /// Opens a scope recording events at `level` or more severe.
    pub fn open(level: LevelFilter) -> Self {
        let buffer = Arc::new(CaptureBuffer::default());
        let previous = ACTIVE.with(|active| active.replace(Some(Arc::clone(&buffer))));
        let subscriber = tracing_subscriber::registry().with(level).with(CaptureLayer {
            buffer: Arc::clone(&buffer),
        });
        let dispatch = tracing::subscriber::set_default(subscriber);
        Self {
            buffer,
            previous,
            _dispatch: dispatch,
        }
    }

    /// Closes the scope and returns the captured lines in write order.
    #[must_use]
    pub fn finish(self) -> DiagnosticLog {
        let buffer = Arc::clone(&self.buffer);
        drop(self);
        DiagnosticLog::from_bytes(&buffer.take())
    }
}

impl Drop for CaptureScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ACTIVE.with(|active| {
            active.replace(previous);
        });
    }
}

impl fmt::Debug for CaptureScope {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CaptureScope")
            .field("nested", &self.previous.is_some())
            .finish_non_exhaustive()
    }
}

/// Runs `f` inside a capture scope and returns its value with the captured log.
pub fn scoped<T>(level: LevelFilter, f: impl FnOnce() -> T) -> (T, DiagnosticLog) {
    let scope = CaptureScope::open(level);
    let value = f();
    (value, scope.finish())
}

/// Returns a writer bound to the current thread's diagnostic stream.
///
/// Inside a capture scope, bytes go to the scope's buffer; otherwise they go to
/// the process stderr.
#[must_use]
pub const fn stderr() -> DiagnosticWriter {
    DiagnosticWriter { _private: () }
}

/// Writer returned by [`stderr()`].
#[derive(Debug)]
pub struct DiagnosticWriter {
    _private: (),
}

impl Write for DiagnosticWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        active_buffer().map_or_else(
            || io::stderr().write(buf),
            |buffer| {
                buffer.append(buf);
                Ok(buf.len())
            },
        )
    }

    fn flush(&mut self) -> io::Result<()> {
        if active_buffer().is_some() {
            Ok(())
        } else {
            io::stderr().flush()
        }
    }
}

/// Records panics raised inside a capture scope in that scope's log.
///
/// Panics on threads without an open scope go to the hook that was installed
/// before, so transport bugs keep the default report and backtrace support.
/// Installing the hook is idempotent.
pub fn install_panic_hook() {
    PANIC_HOOK.get_or_init(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            active_buffer().map_or_else(
                || previous(info),
                |buffer| buffer.append(render_panic(info).as_bytes()),
            );
        }));
    });
}

fn render_panic(info: &PanicHookInfo<'_>) -> String {
    let message = panic_message(info.payload());
    info.location().map_or_else(
        || format!("panic: {message}\n"),
        |location| {
            format!(
                "panic: {message} at {}:{}\n",
                location.file(),
                location.line()
            )
        },
    )
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "handler panicked"
    }
}

struct CaptureLayer {
    buffer: Arc<CaptureBuffer>,
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);
        let line = visitor.render(event.metadata().level().as_str());
        self.buffer.append(line.as_bytes());
    }
}

#[derive(Default)]
struct LineVisitor {
    message: Option<String>,
    fields: Vec<(&'static str, String)>,
}

impl LineVisitor {
    fn render(self, level: &str) -> String {
        let mut line = String::from(level);
        if let Some(message) = self.message {
            line.push(' ');
            line.push_str(&message);
        }
        for (name, value) in self.fields {
            line.push_str(&format!(" {name}={value}"));
        }
        line.push('\n');
        line
    }
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_owned());
        } else {
            self.fields.push((field.name(), value.to_owned()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        } else {
            self.fields.push((field.name(), format!("{value:?}")));
        }
    }
}
