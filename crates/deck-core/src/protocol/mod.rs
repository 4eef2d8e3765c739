//! Protocol module containing WebChannel message types, the JSON frame codec,
//! the host object binding, and the request id counter.

pub mod codec;
pub mod messages;
pub mod object;
pub mod sequence;

pub use codec::{decode_frame, encode_frame, ProtocolError};
pub use messages::*;
pub use object::{HostBinding, HostNotification, ObjectDescriptor};
pub use sequence::RequestIds;
