//! Error types shared by the bridge and the renderer binding.

/// Result of a call on the remote object.
pub type RemoteResult<T = ()> = std::result::Result<T, RemoteError>;

/// What a listener may return to signal failure. Failures are logged by the
/// bus and never reach the emitter.
pub type ListenerError = Box<dyn std::error::Error>;

/// A remote call raised, or its reply could not be understood.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum RemoteError {
	/// The host raised, or the method is missing where it is required.
	#[error("remote call `{method}` failed: {message}")]
	Call { method: String, message: String },

	/// The reply was not the expected shape.
	#[error("could not decode reply of `{method}`: {message}")]
	Decode { method: String, message: String },
}

impl RemoteError {
	pub fn call(method: impl Into<String>, message: impl Into<String>) -> Self {
		Self::Call {
			method: method.into(),
			message: message.into(),
		}
	}
}

/// Why a sync operation had no effect on the host.
///
/// None of these are fatal; every one is logged at the call site before it is
/// returned, so callers may discard it.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SyncError {
	#[error("not connected to the host")]
	NotConnected,

	#[error("host object does not support `{method}`")]
	Unsupported { method: &'static str },

	#[error(transparent)]
	Remote(#[from] RemoteError),
}
