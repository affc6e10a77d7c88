use bitcode::{Decode, Encode};

/// Description of one method call: which interface, which method, and the
/// positional arguments.
///
/// Every entry in `parameters` is an already-encoded argument value and is
/// matched by position to the type descriptor at the same index in
/// `parameter_types`.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct CallPayload {
    pub interface_name: String,
    pub method_name: String,
    pub parameter_types: Vec<String>,
    pub parameters: Vec<Vec<u8>>,
    pub return_type: String,
}

impl CallPayload {
    pub fn is_well_formed(&self) -> bool {
        self.parameters.len() == self.parameter_types.len()
    }
}

#[derive(Encode, Decode, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReplyStatus {
    Success,
    /// The provider's implementation returned an error or panicked.
    Fault,
    ServiceNotFound,
    MethodNotFound,
}

/// Body of a response envelope.
///
/// On `Success` the payload is the encoded return value; for every other
/// status it holds a UTF-8 error message.
#[derive(Encode, Decode, Debug, Clone, PartialEq, Eq)]
pub struct CallReply {
    pub status: ReplyStatus,
    pub payload: Vec<u8>,
}

impl CallReply {
    pub fn success(payload: Vec<u8>) -> Self {
        Self {
            status: ReplyStatus::Success,
            payload,
        }
    }

    pub fn failure(status: ReplyStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            payload: message.into().into_bytes(),
        }
    }

    /// Error text for non-success replies.
    pub fn message(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}
