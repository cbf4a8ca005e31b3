//! Common test utilities shared between integration tests

use std::cell::RefCell;
use std::rc::Rc;
use wasm_machine::runtime::{FuncAddr, FunctionType, Instruction, Store, ValueType};

/// Route engine logs to the test harness; set `RUST_LOG=wasm_machine=trace` to see them
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Shorthand for a function type over value types
pub fn func_type(params: &[ValueType], results: &[ValueType]) -> FunctionType {
    FunctionType::new(params.to_vec(), results.to_vec())
}

/// Allocate a linked function body, panicking if it does not link
pub fn wasm_function(
    store: &mut Store,
    params: &[ValueType],
    results: &[ValueType],
    locals: Vec<ValueType>,
    body: Vec<Instruction>,
) -> FuncAddr {
    store
        .allocate_wasm_function(func_type(params, results), locals, body)
        .expect("Function body should link")
}

/// Shared event log written by host functions and read back by the test
#[derive(Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<String>>>);

impl EventLog {
    pub fn record(&self, event: impl Into<String>) {
        self.0.borrow_mut().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}
