mod failure;

pub(crate) use failure::{FailureCell, Sentinel};
