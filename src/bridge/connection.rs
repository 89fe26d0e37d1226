//! Channel discovery.
//!
//! The host injects its transport at some unknown point after start-up, so
//! discovery polls for it on a fixed interval until it appears, then opens the
//! channel once. Polling never gives up on its own; the returned
//! [`DiscoveryHandle`] is the only way to stop it.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use log::{debug, info};

use super::remote::{Channel, Host};

/// Runs with the channel once it is open.
pub type ReadyCallback = Box<dyn FnOnce(Channel)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
	Idle,
	/// Waiting for the transport to appear.
	Polling,
	/// Transport found, channel under construction.
	Opening,
	Connected,
}

impl ConnectionState {
	fn is_pending(self) -> bool {
		matches!(self, ConnectionState::Polling | ConnectionState::Opening)
	}
}

struct Discovery {
	state: ConnectionState,
	on_ready: Option<ReadyCallback>,
	/// Cancellation flag of the current attempt.
	attempt: Rc<Cell<bool>>,
}

/// Establishes the host channel exactly once.
pub struct ConnectionManager {
	host: Rc<dyn Host>,
	retry_interval: Duration,
	discovery: Rc<RefCell<Discovery>>,
}

impl ConnectionManager {
	pub fn new(host: Rc<dyn Host>, retry_interval: Duration) -> Self {
		Self {
			host,
			retry_interval,
			discovery: Rc::new(RefCell::new(Discovery {
				state: ConnectionState::Idle,
				on_ready: None,
				attempt: Rc::new(Cell::new(false)),
			})),
		}
	}

	pub fn state(&self) -> ConnectionState {
		self.discovery.borrow().state
	}

	pub fn is_connected(&self) -> bool {
		self.state() == ConnectionState::Connected
	}

	/// Start discovery, or join the one already running.
	///
	/// While discovery is pending, `on_ready` replaces any earlier callback and
	/// the latest one fires once. When already connected this is a no-op and
	/// `on_ready` is dropped unused.
	pub fn initialize(&self, on_ready: impl FnOnce(Channel) + 'static) -> DiscoveryHandle {
		let mut discovery = self.discovery.borrow_mut();
		match discovery.state {
			ConnectionState::Connected => {
				debug!("Channel already established; ignoring initialize");
				return self.handle(&discovery.attempt);
			}
			ConnectionState::Polling | ConnectionState::Opening => {
				debug!("Discovery already running; replacing ready callback");
				discovery.on_ready = Some(Box::new(on_ready));
				return self.handle(&discovery.attempt);
			}
			ConnectionState::Idle => {}
		}

		let attempt = Rc::new(Cell::new(false));
		discovery.attempt = attempt.clone();
		discovery.on_ready = Some(Box::new(on_ready));
		discovery.state = ConnectionState::Polling;
		drop(discovery);

		poll(
			self.host.clone(),
			self.discovery.clone(),
			attempt.clone(),
			self.retry_interval,
		);
		self.handle(&attempt)
	}

	/// Forget the current channel or pending discovery so that a later
	/// `initialize` starts from scratch.
	pub fn reset(&self) {
		let mut discovery = self.discovery.borrow_mut();
		discovery.attempt.set(true);
		discovery.on_ready = None;
		discovery.state = ConnectionState::Idle;
	}

	fn handle(&self, attempt: &Rc<Cell<bool>>) -> DiscoveryHandle {
		DiscoveryHandle {
			attempt: attempt.clone(),
			discovery: Rc::downgrade(&self.discovery),
		}
	}
}

fn poll(
	host: Rc<dyn Host>,
	discovery: Rc<RefCell<Discovery>>,
	attempt: Rc<Cell<bool>>,
	interval: Duration,
) {
	if attempt.get() {
		debug!("Channel discovery cancelled");
		return;
	}

	if !host.transport_available() {
		let (next_host, next_discovery) = (host.clone(), discovery.clone());
		host.schedule(
			interval,
			Box::new(move || poll(next_host, next_discovery, attempt, interval)),
		);
		return;
	}

	discovery.borrow_mut().state = ConnectionState::Opening;
	debug!("Host transport found; opening channel");
	host.open_channel(Box::new(move |channel| {
		if attempt.get() {
			debug!("Discarding channel opened after cancellation");
			return;
		}
		let on_ready = {
			let mut discovery = discovery.borrow_mut();
			discovery.state = ConnectionState::Connected;
			discovery.on_ready.take()
		};
		info!("Connected to host channel");
		if let Some(on_ready) = on_ready {
			on_ready(channel);
		}
	}));
}

/// Stops a pending discovery.
#[derive(Clone)]
pub struct DiscoveryHandle {
	attempt: Rc<Cell<bool>>,
	discovery: Weak<RefCell<Discovery>>,
}

impl DiscoveryHandle {
	/// Stop polling, or discard a channel that is still being opened. Has no
	/// effect once connected or if a newer discovery has started since.
	pub fn cancel(&self) {
		let Some(discovery) = self.discovery.upgrade() else {
			return;
		};
		let mut discovery = discovery.borrow_mut();
		if !Rc::ptr_eq(&discovery.attempt, &self.attempt) || !discovery.state.is_pending() {
			return;
		}
		self.attempt.set(true);
		discovery.on_ready = None;
		discovery.state = ConnectionState::Idle;
		debug!("Cancelling channel discovery");
	}

	pub fn is_cancelled(&self) -> bool {
		self.attempt.get()
	}
}
