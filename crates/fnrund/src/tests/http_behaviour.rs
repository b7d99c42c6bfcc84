//! Behavioural tests for the HTTP binding.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::Value;

use crate::handler::HandlerRegistry;
use crate::service::ServiceHandle;
use crate::service::test_utils::{HttpReply, send, start_service};
use crate::tests::support::Quoted;

#[derive(Default)]
struct HttpWorld {
    service: Option<ServiceHandle>,
    response: Option<HttpReply>,
}

impl HttpWorld {
    fn service(&self) -> &ServiceHandle {
        self.service.as_ref().expect("service should be running")
    }

    fn response(&self) -> &HttpReply {
        self.response.as_ref().expect("a response should be recorded")
    }

    fn response_json(&self) -> Value {
        self.response().json()
    }
}

impl Drop for HttpWorld {
    fn drop(&mut self) {
        if let Some(service) = self.service.take() {
            service.shutdown();
            service.join().ok();
        }
    }
}

#[fixture]
fn world() -> RefCell<HttpWorld> {
    RefCell::new(HttpWorld::default())
}

#[given("a running service using the \"{handler}\" handler")]
fn given_running_service(world: &RefCell<HttpWorld>, handler: String) {
    let resolved = HandlerRegistry::with_builtins()
        .resolve(&handler)
        .expect("handler should be built in");
    world.borrow_mut().service = Some(start_service(resolved, 1));
}

#[when("a client posts {body}")]
fn when_client_posts(world: &RefCell<HttpWorld>, body: Quoted) {
    let addr = world.borrow().service().local_addr();
    let response = send(addr, "POST", "/", body.as_str().as_bytes());
    world.borrow_mut().response = Some(response);
}

#[when("a client probes the liveness endpoint")]
fn when_client_probes(world: &RefCell<HttpWorld>) {
    let addr = world.borrow().service().local_addr();
    let response = send(addr, "GET", "/healthz", b"");
    world.borrow_mut().response = Some(response);
}

#[then("the response is {expected}")]
fn then_response_is(world: &RefCell<HttpWorld>, expected: Quoted) {
    let expected_json: Value =
        serde_json::from_str(expected.as_str()).expect("expected response should be JSON");
    let state = world.borrow();
    assert_eq!(state.response().status, 200);
    assert_eq!(state.response_json(), expected_json);
}

#[then("the response error is {message}")]
fn then_response_error(world: &RefCell<HttpWorld>, message: Quoted) {
    let value = world.borrow().response_json();
    assert_eq!(value["context"]["error"], message.as_str());
}

#[then("the response carries no error")]
fn then_no_error(world: &RefCell<HttpWorld>) {
    let value = world.borrow().response_json();
    assert_eq!(value["context"]["error"], Value::Null);
}

#[then("the response payload is null")]
fn then_payload_null(world: &RefCell<HttpWorld>) {
    let value = world.borrow().response_json();
    assert_eq!(value["payload"], Value::Null);
}

#[then("the response logs are empty")]
fn then_logs_empty(world: &RefCell<HttpWorld>) {
    let value = world.borrow().response_json();
    assert_eq!(value["context"]["logs"], Value::Array(Vec::new()));
}

#[scenario(path = "tests/features/http_invocation.feature")]
fn http_invocation(world: RefCell<HttpWorld>) {
    let _ = world;
}
