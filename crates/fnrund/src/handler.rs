//! Handler contract and the startup registry that resolves it.
//!
//! A handler is the user-supplied business routine. It receives the opaque
//! caller context and the payload, and returns any serialisable value or fails
//! with an arbitrary error. The runtime resolves exactly one handler from a
//! [`HandlerRegistry`] at startup and shares it across workers as a
//! [`SharedHandler`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use crate::envelope::{InvocationContext, InvocationPayload};

/// Business routine invoked once per request.
pub trait Handler: Send + Sync + 'static {
    /// Value returned on success. Serialised to JSON by the runtime.
    type Output: Serialize;

    /// Runs the business logic.
    ///
    /// # Errors
    ///
    /// Any error is reported to the caller through the envelope's error
    /// channel using its display text.
    fn call(
        &self,
        context: &InvocationContext,
        payload: InvocationPayload,
    ) -> anyhow::Result<Self::Output>;
}

/// Adapts a closure into a [`Handler`].
pub struct FnHandler<F> {
    f: F,
}

/// Wraps `f` so it can be registered or shared as a handler.
pub const fn handler_fn<F, T>(f: F) -> FnHandler<F>
where
    F: Fn(&InvocationContext, InvocationPayload) -> anyhow::Result<T> + Send + Sync + 'static,
    T: Serialize,
{
    FnHandler { f }
}

impl<F, T> Handler for FnHandler<F>
where
    F: Fn(&InvocationContext, InvocationPayload) -> anyhow::Result<T> + Send + Sync + 'static,
    T: Serialize,
{
    type Output = T;

    fn call(&self, context: &InvocationContext, payload: InvocationPayload) -> anyhow::Result<T> {
        (self.f)(context, payload)
    }
}

/// Failure modes of an erased handler call.
#[derive(Debug)]
pub(crate) enum CallError {
    /// The handler returned an error.
    Handler(anyhow::Error),
    /// The handler's output could not be represented as JSON.
    Encode(serde_json::Error),
}

trait ErasedHandler: Send + Sync {
    fn call_json(
        &self,
        context: &InvocationContext,
        payload: InvocationPayload,
    ) -> Result<Value, CallError>;
}

impl<H> ErasedHandler for H
where
    H: Handler,
{
    fn call_json(
        &self,
        context: &InvocationContext,
        payload: InvocationPayload,
    ) -> Result<Value, CallError> {
        let output = self.call(context, payload).map_err(CallError::Handler)?;
        serde_json::to_value(output).map_err(CallError::Encode)
    }
}

/// Type-erased handler shared by every worker.
#[derive(Clone)]
pub struct SharedHandler {
    name: Arc<str>,
    inner: Arc<dyn ErasedHandler>,
}

impl SharedHandler {
    /// Erases `handler` under `name`.
    pub fn new<H>(name: impl Into<Arc<str>>, handler: H) -> Self
    where
        H: Handler,
    {
        Self {
            name: name.into(),
            inner: Arc::new(handler),
        }
    }

    /// Name the handler was registered under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn call_json(
        &self,
        context: &InvocationContext,
        payload: InvocationPayload,
    ) -> Result<Value, CallError> {
        self.inner.call_json(context, payload)
    }
}

impl fmt::Debug for SharedHandler {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SharedHandler")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Raised when the configured handler name is not registered.
#[derive(Debug, Error)]
#[error("unknown handler '{name}' (available: {available})")]
pub struct UnknownHandlerError {
    /// Requested name.
    pub name: String,
    /// Comma-separated registered names.
    pub available: String,
}

type HandlerFactory = Box<dyn Fn() -> SharedHandler + Send + Sync>;

/// Named handler factories consulted once at startup.
pub struct HandlerRegistry {
    factories: BTreeMap<String, HandlerFactory>,
}

impl HandlerRegistry {
    /// Creates a registry without any handlers.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Creates a registry holding the built-in `echo` and `hello` handlers.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("echo", || Echo);
        registry.register("hello", || Hello);
        registry
    }

    /// Registers `factory` under `name`, replacing any previous entry.
    pub fn register<H, F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        H: Handler,
        F: Fn() -> H + Send + Sync + 'static,
    {
        let shared_name: Arc<str> = Arc::from(name);
        self.factories.insert(
            name.to_owned(),
            Box::new(move || SharedHandler::new(Arc::clone(&shared_name), factory())),
        );
        self
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Builds the handler registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownHandlerError`] when nothing is registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<SharedHandler, UnknownHandlerError> {
        let key = name.trim();
        self.factories
            .get(key)
            .map(|factory| factory())
            .ok_or_else(|| UnknownHandlerError {
                name: key.to_owned(),
                available: self.names().collect::<Vec<_>>().join(", "),
            })
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_list()
            .entries(self.factories.keys())
            .finish()
    }
}

/// Returns the payload unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct Echo;

impl Handler for Echo {
    type Output = Value;

    fn call(&self, _context: &InvocationContext, payload: InvocationPayload) -> anyhow::Result<Value> {
        Ok(payload)
    }
}

/// Greets `name` from `place`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Hello;

impl Handler for Hello {
    type Output = Value;

    fn call(&self, _context: &InvocationContext, payload: InvocationPayload) -> anyhow::Result<Value> {
        let name = payload
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("Name required"))?;
        let place = payload
            .get("place")
            .and_then(Value::as_str)
            .unwrap_or("Nowhere");
        debug!(name, place, "composing greeting");
        Ok(json!({ "myField": format!("Hello, {name} from {place}") }))
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn registry() -> HandlerRegistry {
        HandlerRegistry::with_builtins()
    }

    #[rstest]
    fn builtins_are_registered(registry: HandlerRegistry) {
        assert_eq!(registry.names().collect::<Vec<_>>(), ["echo", "hello"]);
    }

    #[rstest]
    fn resolves_registered_handler(registry: HandlerRegistry) {
        let handler = registry.resolve(" hello ").expect("hello is registered");
        assert_eq!(handler.name(), "hello");
    }

    #[rstest]
    fn unknown_handler_lists_alternatives(registry: HandlerRegistry) {
        let error = registry.resolve("clonevm").expect_err("not registered");
        assert_eq!(error.name, "clonevm");
        assert_eq!(
            error.to_string(),
            "unknown handler 'clonevm' (available: echo, hello)"
        );
    }

    #[rstest]
    fn custom_handlers_can_be_registered(mut registry: HandlerRegistry) {
        registry.register("constant", || handler_fn(|_ctx, _payload| Ok(42)));
        let handler = registry.resolve("constant").expect("registered");
        let value = handler
            .call_json(&InvocationContext::default(), Value::Null)
            .expect("call succeeds");
        assert_eq!(value, json!(42));
    }

    #[rstest]
    #[case(json!({"name": "Jon", "place": "Winterfell"}), "Hello, Jon from Winterfell")]
    #[case(json!({"name": "Arya"}), "Hello, Arya from Nowhere")]
    fn hello_greets(#[case] payload: Value, #[case] expected: &str) {
        let value = Hello
            .call(&InvocationContext::default(), payload)
            .expect("greeting");
        assert_eq!(value, json!({ "myField": expected }));
    }

    #[test]
    fn hello_requires_name() {
        let error = Hello
            .call(&InvocationContext::default(), json!({"place": "Winterfell"}))
            .expect_err("name is required");
        assert_eq!(error.to_string(), "Name required");
    }

    #[test]
    fn context_is_passed_through() {
        let handler = SharedHandler::new(
            "context",
            handler_fn(|ctx: &InvocationContext, _payload| Ok(ctx.as_value().clone())),
        );
        let context = InvocationContext::new(json!({"secrets": {"vsphere": {"username": "u"}}}));
        let value = handler
            .call_json(&context, Value::Null)
            .expect("call succeeds");
        assert_eq!(&value, context.as_value());
    }
}
