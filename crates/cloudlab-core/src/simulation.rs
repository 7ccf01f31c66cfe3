//! Simulation driver.

use std::cell::RefCell;
use std::rc::Rc;

use log::Level::Trace;
use log::{debug, log_enabled, trace};
use rand::distributions::uniform::{SampleRange, SampleUniform};
use serde_json::json;
use serde_type_name::type_name;

use crate::component::Id;
use crate::context::SimulationContext;
use crate::error::SimulationError;
use crate::event::Event;
use crate::handler::EventHandler;
use crate::log::{get_colored, log_event_failure};
use crate::state::SimulationState;

/// Owns the event queue and the registered components, delivers events one at a time.
///
/// Components get their [`SimulationContext`] from [`create_context()`](Self::create_context())
/// and receive events once their handler is registered with [`add_handler()`](Self::add_handler()).
pub struct Simulation {
    sim_state: Rc<RefCell<SimulationState>>,
    handlers: Vec<Option<Rc<RefCell<dyn EventHandler>>>>,
}

impl Simulation {
    /// Creates an empty simulation, `seed` initializes the shared random generator.
    pub fn new(seed: u64) -> Self {
        Self {
            sim_state: Rc::new(RefCell::new(SimulationState::new(seed))),
            handlers: Vec::new(),
        }
    }

    fn register(&mut self, name: &str) -> Id {
        let id = self.sim_state.borrow_mut().register(name);
        let count = self.sim_state.borrow().component_count();
        if self.handlers.len() < count {
            self.handlers.resize_with(count, || None);
        }
        id
    }

    fn log_registry(&self, action: &str, name: &str, id: Id) {
        debug!(
            target: "simulation",
            "[{:.3} {} simulation] {}: {}",
            self.time(),
            get_colored("DEBUG", colored::Color::Blue),
            action,
            json!({"name": name, "id": id})
        );
    }

    /// Finds component ID by name.
    pub fn lookup_id(&self, name: &str) -> Option<Id> {
        self.sim_state.borrow().lookup_id(name)
    }

    /// Finds component name by ID.
    pub fn lookup_name(&self, id: Id) -> Option<String> {
        self.sim_state.borrow().lookup_name(id).map(|name| name.to_owned())
    }

    /// Registers component `name` and returns its context.
    ///
    /// IDs are assigned sequentially from 0, a name that is already registered keeps its ID.
    pub fn create_context<S>(&mut self, name: S) -> SimulationContext
    where
        S: AsRef<str>,
    {
        let id = self.register(name.as_ref());
        self.log_registry("Created context", name.as_ref(), id);
        SimulationContext::new(id, name.as_ref(), self.sim_state.clone())
    }

    /// Attaches the event handler to component `name`, registering the name if needed.
    pub fn add_handler<S>(&mut self, name: S, handler: Rc<RefCell<dyn EventHandler>>) -> Id
    where
        S: AsRef<str>,
    {
        let id = self.register(name.as_ref());
        self.handlers[id as usize] = Some(handler);
        self.log_registry("Added handler", name.as_ref(), id);
        id
    }

    /// Detaches the event handler of component `name`.
    ///
    /// Events addressed to the component stay in the queue and fail delivery until a handler is attached again.
    pub fn remove_handler<S>(&mut self, name: S)
    where
        S: AsRef<str>,
    {
        if let Some(id) = self.lookup_id(name.as_ref()) {
            self.handlers[id as usize] = None;
            self.log_registry("Removed handler", name.as_ref(), id);
        }
    }

    /// Current simulation time.
    pub fn time(&self) -> f64 {
        self.sim_state.borrow().time()
    }

    /// Time of the earliest pending event.
    pub fn next_event_time(&self) -> Option<f64> {
        self.sim_state.borrow_mut().peek_event().map(|event| event.time)
    }

    /// Delivers the earliest pending event, advancing the clock to its time.
    ///
    /// Returns `Ok(false)` when the queue is empty. An event addressed to a component without handler
    /// is logged and dropped, and [`SimulationError::UnknownComponent`] is returned.
    pub fn try_step(&mut self) -> Result<bool, SimulationError> {
        let next = self.sim_state.borrow_mut().next_event();
        let event = match next {
            Some(event) => event,
            None => return Ok(false),
        };
        match self.handlers.get(event.dst as usize).and_then(|handler| handler.clone()) {
            Some(handler) => {
                self.trace_event(&event);
                handler.borrow_mut().on(event);
                Ok(true)
            }
            None => {
                let err = SimulationError::UnknownComponent {
                    id: event.dst,
                    event_id: event.id,
                };
                log_event_failure(&err.to_string(), &event);
                Err(err)
            }
        }
    }

    /// Like [`try_step()`](Self::try_step()), but an undelivered event counts as a processed one.
    ///
    /// Returns `false` only when the queue is empty.
    pub fn step(&mut self) -> bool {
        self.try_step().unwrap_or(true)
    }

    /// Makes up to `step_count` steps, returns `false` if the queue ran out before that.
    pub fn steps(&mut self, step_count: u64) -> bool {
        for _ in 0..step_count {
            if !self.step() {
                return false;
            }
        }
        true
    }

    /// Steps until the queue is empty.
    pub fn step_until_no_events(&mut self) {
        while self.step() {}
    }

    /// Steps until the queue is empty, stopping at the first undelivered event.
    pub fn try_step_until_no_events(&mut self) -> Result<(), SimulationError> {
        while self.try_step()? {}
        Ok(())
    }

    /// Processes the events due within `duration` from now.
    ///
    /// See [`step_until_time()`](Self::step_until_time()).
    pub fn step_for_duration(&mut self, duration: f64) -> bool {
        let end_time = self.time() + duration;
        self.step_until_time(end_time)
    }

    /// Processes the events with time not above `time`.
    ///
    /// Returns `true` if later events remain in the queue.
    pub fn step_until_time(&mut self, time: f64) -> bool {
        loop {
            match self.next_event_time() {
                Some(next_time) if next_time > time => return true,
                Some(_) => {
                    self.step();
                }
                None => return false,
            }
        }
    }

    /// Uniform random float in _[0, 1)_ from the shared generator.
    pub fn rand(&mut self) -> f64 {
        self.sim_state.borrow_mut().rand()
    }

    /// Uniform random value in `range` from the shared generator.
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.sim_state.borrow_mut().gen_range(range)
    }

    /// Number of events emitted so far, cancelled ones included.
    pub fn event_count(&self) -> u64 {
        self.sim_state.borrow().event_count()
    }

    /// Drops pending events matching `pred`.
    pub fn cancel_events<F>(&mut self, pred: F)
    where
        F: Fn(&Event) -> bool,
    {
        self.sim_state.borrow_mut().cancel_events(pred);
    }

    /// Pending events in delivery order.
    pub fn dump_events(&self) -> Vec<Event> {
        self.sim_state.borrow().dump_events()
    }

    fn trace_event(&self, event: &Event) {
        if log_enabled!(Trace) {
            let src_name = self.lookup_name(event.src).unwrap_or_default();
            let dst_name = self.lookup_name(event.dst).unwrap_or_default();
            trace!(
                target: &dst_name,
                "[{:.3} {} {}] {}",
                event.time,
                get_colored("EVENT", colored::Color::BrightBlack),
                dst_name,
                json!({"type": type_name(&event.data).unwrap_or("unknown"), "data": event.data, "src": src_name})
            );
        }
    }
}
