use crate::frame::FrameDecodeError;
use bitcode::{DecodeOwned, Encode};
use std::any::type_name;
use xxhash_rust::xxh3::xxh3_64;

/// Positional arguments of a remote method.
///
/// Implemented for tuples of up to six elements. Each element is encoded on
/// its own so argument values and their type descriptors stay matched by
/// position on the wire.
pub trait CallParameters: Sized + Send + 'static {
    /// Type descriptors of the elements, in order.
    fn type_names() -> Vec<String>;

    fn encode_parameters(&self) -> Vec<Vec<u8>>;

    fn decode_parameters(parameters: &[Vec<u8>]) -> Result<Self, FrameDecodeError>;
}

macro_rules! impl_call_parameters {
    ($count:expr; $($name:ident : $idx:tt),*) => {
        impl<$($name),*> CallParameters for ($($name,)*)
        where
            $($name: Encode + DecodeOwned + Send + 'static),*
        {
            fn type_names() -> Vec<String> {
                vec![$(type_name::<$name>().to_string()),*]
            }

            fn encode_parameters(&self) -> Vec<Vec<u8>> {
                vec![$(bitcode::encode(&self.$idx)),*]
            }

            fn decode_parameters(parameters: &[Vec<u8>]) -> Result<Self, FrameDecodeError> {
                if parameters.len() != $count {
                    return Err(FrameDecodeError::MalformedBody(format!(
                        "expected {} parameters, got {}",
                        $count,
                        parameters.len()
                    )));
                }

                Ok(($(
                    bitcode::decode::<$name>(&parameters[$idx])
                        .map_err(|e| FrameDecodeError::MalformedBody(e.to_string()))?,
                )*))
            }
        }
    };
}

impl_call_parameters!(0;);
impl_call_parameters!(1; A: 0);
impl_call_parameters!(2; A: 0, B: 1);
impl_call_parameters!(3; A: 0, B: 1, C: 2);
impl_call_parameters!(4; A: 0, B: 1, C: 2, D: 3);
impl_call_parameters!(5; A: 0, B: 1, C: 2, D: 3, E: 4);
impl_call_parameters!(6; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);

/// Describes one method of a remote interface.
///
/// Both sides share the same descriptor type: providers register a handler
/// for it and consumers call it through a proxy. The signature is derived
/// from the method name and the input element types, so overloads with
/// different parameter lists get distinct ids.
///
/// ```rust
/// use srpc::rpc::RemoteMethod;
///
/// struct Add;
///
/// impl RemoteMethod for Add {
///     const INTERFACE_NAME: &'static str = "com.example.Calculator";
///     const METHOD_NAME: &'static str = "add";
///     type Input = (i64, i64);
///     type Output = i64;
/// }
///
/// assert_eq!(Add::signature(), "add(i64,i64)");
/// ```
pub trait RemoteMethod: Send + Sync + 'static {
    const INTERFACE_NAME: &'static str;
    const METHOD_NAME: &'static str;

    type Input: CallParameters;
    type Output: Encode + DecodeOwned + Send + 'static;

    fn parameter_types() -> Vec<String> {
        Self::Input::type_names()
    }

    fn return_type() -> String {
        type_name::<Self::Output>().to_string()
    }

    fn signature() -> String {
        method_signature(Self::METHOD_NAME, &Self::parameter_types())
    }
}

/// Canonical `name(type,...)` form used to identify a method.
pub fn method_signature(method_name: &str, parameter_types: &[String]) -> String {
    format!("{}({})", method_name, parameter_types.join(","))
}

pub fn method_id(signature: &str) -> u64 {
    xxh3_64(signature.as_bytes())
}
