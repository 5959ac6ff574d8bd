pub(crate) mod blur;
pub(crate) mod pipeline;
pub(crate) mod visual;
