//! Rowlink Wire - Logical RPC message set and frame codec

pub mod frame;
pub mod message;

pub use frame::{read_frame, write_frame, MAX_FRAME_BYTES};
pub use message::{
    NegotiateParams, OpenTaskParams, PlanParams, PlannerCall, PlannerReply, ServiceFailure,
    VersionCall, VersionReply, WorkerCall, WorkerReply,
};
