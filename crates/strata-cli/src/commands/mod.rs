pub(crate) mod completion;
pub(crate) mod contracts;
pub(crate) mod lint;
