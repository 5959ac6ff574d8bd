pub(crate) mod chunk;
pub(crate) mod effect;
pub(crate) mod mix;
pub(crate) mod source;
