//! Resource handles.
//!
//! A [`Handle`] names a GPU-resident resource without exposing the resource
//! itself. Buffer handles come from a bounded, recycling [`HandlePool`];
//! meshes cache them in [`HandleSlot`]s; frees go through a [`RetireQueue`]
//! so a handle is never reissued while a submission may still reference it.

mod id;
mod pool;
mod retire;
mod slot;

pub use id::Handle;
pub use pool::HandlePool;
pub use retire::{RetireQueue, SubmissionTracker};
pub use slot::HandleSlot;
