//! Browser side of the bridge: the Qt WebChannel transport the host injects as
//! `window.qt.webChannelTransport`, and the JS proxies it publishes.
//!
//! Capabilities of a proxy are whatever functions the object carries, so an
//! absent property reads as an unsupported method.

use std::rc::Rc;
use std::time::Duration;

use futures::channel::oneshot;
use futures::future::{FutureExt, LocalBoxFuture};
use js_sys::{Array, Function, Object, Reflect};
use log::{error, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use crate::bridge::{
	Channel, DiscoveryHandle, EventKind, GraphEvent, GraphSyncService, Host, HostListener,
	NodeManager, Subscription,
};
use crate::config::BridgeConfig;
use crate::error::{RemoteError, RemoteResult};
use crate::model::GraphData;

fn get(target: &JsValue, key: &str) -> Option<JsValue> {
	Reflect::get(target, &JsValue::from_str(key))
		.ok()
		.filter(|value| !value.is_undefined() && !value.is_null())
}

fn function(target: &JsValue, key: &str) -> Option<Function> {
	get(target, key).and_then(|value| value.dyn_into::<Function>().ok())
}

fn describe(value: &JsValue) -> String {
	value
		.as_string()
		.or_else(|| {
			js_sys::JSON::stringify(value)
				.ok()
				.and_then(|json| json.as_string())
		})
		.unwrap_or_else(|| format!("{value:?}"))
}

fn decode<T: DeserializeOwned>(method: &str, value: &JsValue) -> RemoteResult<T> {
	let failure = |message: String| RemoteError::Decode {
		method: method.to_owned(),
		message,
	};
	if value.is_undefined() {
		return Err(failure("no value".into()));
	}
	let json = js_sys::JSON::stringify(value)
		.ok()
		.and_then(|json| json.as_string())
		.ok_or_else(|| failure(describe(value)))?;
	serde_json::from_str(&json).map_err(|err| failure(err.to_string()))
}

fn encode<T: Serialize>(method: &str, value: &T) -> RemoteResult<JsValue> {
	let json = serde_json::to_string(value).map_err(|err| RemoteError::call(method, err.to_string()))?;
	js_sys::JSON::parse(&json).map_err(|err| RemoteError::call(method, describe(&err)))
}

fn transport() -> Option<JsValue> {
	get(&js_sys::global(), "qt").and_then(|qt| get(&qt, "webChannelTransport"))
}

/// The page inside the host's web view.
#[derive(Clone, Copy, Debug, Default)]
pub struct QtWebHost;

impl Host for QtWebHost {
	fn transport_available(&self) -> bool {
		transport().is_some()
	}

	fn open_channel(&self, on_open: Box<dyn FnOnce(Channel)>) {
		let Some(transport) = transport() else {
			warn!("Host transport disappeared before the channel was opened");
			return;
		};
		let Some(constructor) = function(&js_sys::global(), "QWebChannel") else {
			error!("QWebChannel is not loaded in this page");
			return;
		};
		let callback = Closure::once_into_js(move |channel: JsValue| on_open(channel_objects(&channel)));
		if let Err(err) = Reflect::construct(&constructor, &Array::of2(&transport, &callback)) {
			error!("Could not construct QWebChannel: {}", describe(&err));
		}
	}

	fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) {
		let Some(window) = web_sys::window() else {
			error!("No window to schedule on");
			return;
		};
		let callback = Closure::once_into_js(move || task());
		let delay = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
		if let Err(err) =
			window.set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), delay)
		{
			error!("setTimeout failed: {}", describe(&err));
		}
	}
}

fn channel_objects(channel: &JsValue) -> Channel {
	let mut result = Channel::new();
	let Some(objects) = get(channel, "objects").and_then(|o| o.dyn_into::<Object>().ok()) else {
		warn!("Channel carries no objects");
		return result;
	};
	for key in Object::keys(&objects).iter() {
		let Some(name) = key.as_string() else {
			continue;
		};
		if let Some(object) = get(&objects, &name) {
			result = result.with_object(name, Rc::new(JsNodeManager::new(object)));
		}
	}
	result
}

/// A graph object proxied over the channel.
pub struct JsNodeManager {
	object: JsValue,
}

impl JsNodeManager {
	pub fn new(object: JsValue) -> Self {
		Self { object }
	}

	fn call(&self, method: &str, args: &[JsValue]) -> Option<RemoteResult<JsValue>> {
		let f = function(&self.object, method)?;
		let args: Array = args.iter().collect();
		Some(
			f.apply(&self.object, &args)
				.map_err(|err| RemoteError::call(method, describe(&err))),
		)
	}

	fn invoke(&self, method: &str, args: &[JsValue]) -> Option<RemoteResult> {
		self.call(method, args).map(|result| result.map(drop))
	}

	fn require(&self, method: &str, args: &[JsValue]) -> RemoteResult {
		self.invoke(method, args)
			.unwrap_or_else(|| Err(RemoteError::call(method, "not present on host object")))
	}
}

fn js_str(value: &str) -> JsValue {
	JsValue::from_str(value)
}

impl NodeManager for JsNodeManager {
	fn add_node(&self, id: &str, text: &str, parent_id: &str) -> RemoteResult {
		self.require("addNode", &[js_str(id), js_str(text), js_str(parent_id)])
	}

	fn remove_node(&self, id: &str) -> RemoteResult {
		self.require("removeNode", &[js_str(id)])
	}

	fn add_connection(&self, source_id: &str, target_id: &str) -> RemoteResult {
		self.require("addConnection", &[js_str(source_id), js_str(target_id)])
	}

	fn remove_connection(&self, source_id: &str, target_id: &str) -> RemoteResult {
		self.require("removeConnection", &[js_str(source_id), js_str(target_id)])
	}

	fn update_node(&self, id: &str, text: &str) -> Option<RemoteResult> {
		self.invoke("updateNode", &[js_str(id), js_str(text)])
	}

	fn update_node_text(&self, id: &str, text: &str) -> Option<RemoteResult> {
		self.invoke("updateNodeText", &[js_str(id), js_str(text)])
	}

	fn update_node_position(&self, id: &str, x: f64, y: f64) -> Option<RemoteResult> {
		self.invoke(
			"updateNodePosition",
			&[js_str(id), JsValue::from_f64(x), JsValue::from_f64(y)],
		)
	}

	fn update_full_graph(&self, graph: &GraphData) -> Option<RemoteResult> {
		function(&self.object, "updateFullGraph")?;
		Some(
			encode("updateFullGraph", graph)
				.and_then(|value| self.require("updateFullGraph", &[value])),
		)
	}

	/// Qt proxies answer through a trailing callback; plain objects may
	/// return the graph directly or a promise of it.
	fn get_full_graph(&self) -> Option<LocalBoxFuture<'static, RemoteResult<GraphData>>> {
		const METHOD: &str = "getFullGraph";
		let (tx, rx) = oneshot::channel::<JsValue>();
		let callback = Closure::once_into_js(move |reply: JsValue| {
			let _ = tx.send(reply);
		});

		let returned = match self.call(METHOD, &[callback])? {
			Ok(returned) => returned,
			Err(err) => return Some(async move { Err(err) }.boxed_local()),
		};
		if returned.is_instance_of::<js_sys::Promise>() {
			let pending = JsFuture::from(returned.unchecked_into::<js_sys::Promise>());
			return Some(
				async move {
					let resolved = pending
						.await
						.map_err(|err| RemoteError::call(METHOD, describe(&err)))?;
					decode(METHOD, &resolved)
				}
				.boxed_local(),
			);
		}
		if !returned.is_undefined() {
			let graph = decode(METHOD, &returned);
			return Some(async move { graph }.boxed_local());
		}

		Some(
			async move {
				let reply = rx
					.await
					.map_err(|_| RemoteError::call(METHOD, "host never answered"))?;
				decode(METHOD, &reply)
			}
			.boxed_local(),
		)
	}

	fn app_ready(&self) -> Option<RemoteResult> {
		self.invoke("appReady", &[])
	}

	fn subscribe(&self, kind: EventKind, listener: HostListener) -> Subscription {
		let Some(signal) = get(&self.object, kind.name()) else {
			warn!("Host object has no `{kind}` signal");
			return Subscription::detached();
		};
		let Some(connect) = function(&signal, "connect") else {
			warn!("`{kind}` cannot be connected to");
			return Subscription::detached();
		};

		let handler = Closure::<dyn Fn(JsValue, JsValue)>::new(move |first: JsValue, second: JsValue| {
			match decode_event(kind, &first, &second) {
				Ok(event) => listener(event),
				Err(err) => error!("Dropping `{kind}` from host: {err}"),
			}
		});
		if let Err(err) = connect.call1(&signal, handler.as_ref()) {
			error!("Could not connect to `{kind}`: {}", describe(&err));
			return Subscription::detached();
		}

		let disconnect = function(&signal, "disconnect");
		Subscription::new(move || {
			if let Some(disconnect) = disconnect {
				let _ = disconnect.call1(&signal, handler.as_ref());
			}
			drop(handler);
		})
	}
}

fn decode_event(kind: EventKind, first: &JsValue, second: &JsValue) -> RemoteResult<GraphEvent> {
	let method = kind.name();
	let id = |value: &JsValue| {
		value.as_string().ok_or_else(|| RemoteError::Decode {
			method: method.to_owned(),
			message: format!("expected a string id, got {}", describe(value)),
		})
	};
	Ok(match kind {
		EventKind::NodeAdded => GraphEvent::NodeAdded(decode(method, first)?),
		EventKind::NodeRemoved => GraphEvent::NodeRemoved(id(first)?),
		EventKind::NodeUpdated => GraphEvent::NodeUpdated(decode(method, first)?),
		EventKind::ConnectionAdded => GraphEvent::ConnectionAdded(decode(method, first)?),
		EventKind::ConnectionRemoved => GraphEvent::ConnectionRemoved {
			source: id(first)?,
			target: id(second)?,
		},
		EventKind::GraphUpdated => GraphEvent::GraphUpdated(decode(method, first)?),
	})
}

/// Create a service bound to the page's host and start discovery.
pub fn connect(
	config: BridgeConfig,
	on_ready: impl FnOnce() + 'static,
) -> (Rc<GraphSyncService>, DiscoveryHandle) {
	let service = GraphSyncService::new(Rc::new(QtWebHost), config);
	let discovery = service.initialize(on_ready);
	(service, discovery)
}
